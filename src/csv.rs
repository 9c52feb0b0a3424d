use std::fs;
use std::io::{self, Write};
use std::mem::take;
use std::path::Path;

use anyhow::{Context, Result};

use crate::aggregate::{GOALS_FIELD, PlayerGoals, TEAM_FIELD, TeamGoalSummary, YEAR_FIELD};

/// Header plus rows, as read back from a published file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CsvTable {
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

fn needs_quotes(field: &str) -> bool {
    field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r')
}

pub fn write_row<W: Write>(mut w: W, row: &[String]) -> io::Result<()> {
    let mut first = true;
    for cell in row {
        if !first {
            w.write_all(b",")?;
        } else {
            first = false;
        }
        if needs_quotes(cell) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            w.write_all(cell.as_bytes())?;
        }
    }
    writeln!(w)
}

/// Source columns in first-seen order followed by `Año`. Missing goal values
/// and absent cells are written empty.
pub fn player_rows(players: &PlayerGoals) -> Vec<Vec<String>> {
    let goals_idx = players.columns.iter().position(|c| c == GOALS_FIELD);
    let mut header = players.columns.clone();
    header.push(YEAR_FIELD.to_string());

    let mut out = Vec::with_capacity(players.records.len() + 1);
    out.push(header);
    for record in &players.records {
        let mut row: Vec<String> = record
            .cells
            .iter()
            .enumerate()
            .map(|(idx, cell)| {
                if Some(idx) == goals_idx {
                    record.goals.map(|g| g.to_string()).unwrap_or_default()
                } else {
                    cell.clone().unwrap_or_default()
                }
            })
            .collect();
        row.push(record.year.to_string());
        out.push(row);
    }
    out
}

pub fn team_rows(teams: &[TeamGoalSummary]) -> Vec<Vec<String>> {
    let mut out = Vec::with_capacity(teams.len() + 1);
    out.push(vec![
        TEAM_FIELD.to_string(),
        YEAR_FIELD.to_string(),
        GOALS_FIELD.to_string(),
    ]);
    for team in teams {
        out.push(vec![
            team.team.clone(),
            team.year.to_string(),
            team.total_goals.to_string(),
        ]);
    }
    out
}

/// Writes to a temp file and renames over the target, so a failed write
/// never leaves a half-written dataset behind.
pub fn write_file(path: &Path, rows: &[Vec<String>]) -> Result<usize> {
    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
    {
        fs::create_dir_all(dir).with_context(|| format!("create dir {}", dir.display()))?;
    }
    let mut buf: Vec<u8> = Vec::new();
    for row in rows {
        write_row(&mut buf, row).context("encode csv row")?;
    }
    let tmp = path.with_extension("csv.tmp");
    fs::write(&tmp, buf).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("swap {}", path.display()))?;
    Ok(rows.len().saturating_sub(1))
}

pub fn read_file(path: &Path) -> Result<CsvTable> {
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    Ok(parse_table(raw.trim_start_matches('\u{feff}')))
}

pub fn parse_table(text: &str) -> CsvTable {
    let mut rows = parse_rows(text);
    if rows.is_empty() {
        return CsvTable::default();
    }
    let headers = rows.remove(0);
    CsvTable { headers, rows }
}

/// Quote and CRLF tolerant; blank lines are skipped.
pub fn parse_rows(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut field = String::new();
    let mut row = Vec::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                if in_quotes {
                    if matches!(chars.peek(), Some('"')) {
                        chars.next();
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                } else {
                    in_quotes = true;
                }
            }
            ',' if !in_quotes => row.push(take(&mut field)),
            '\n' | '\r' if !in_quotes => {
                if ch == '\r' && matches!(chars.peek(), Some('\n')) {
                    chars.next();
                }
                row.push(take(&mut field));
                if !(row.len() == 1 && row[0].is_empty()) {
                    rows.push(take(&mut row));
                } else {
                    row.clear();
                }
            }
            _ => field.push(ch),
        }
    }

    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }
    rows
}
