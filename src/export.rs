use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::aggregate::Aggregation;
use crate::config::{PLAYER_DATASET, TEAM_DATASET};
use crate::csv::{player_rows, team_rows};

/// Both datasets as sheets of one workbook, same layout as the CSV files.
pub fn write_workbook(path: &Path, agg: &Aggregation) -> Result<()> {
    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name(PLAYER_DATASET)?;
        write_rows(sheet, &player_rows(&agg.players))?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name(TEAM_DATASET)?;
        write_rows(sheet, &team_rows(&agg.teams))?;
    }

    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;
    Ok(())
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            // Integers below the header row are written as numbers.
            let result = if row_idx > 0
                && let Ok(n) = value.parse::<i64>()
            {
                worksheet.write_number(row_idx as u32, col_idx as u16, n as f64)
            } else {
                worksheet.write_string(row_idx as u32, col_idx as u16, value)
            };
            result.with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}
