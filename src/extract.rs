use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::config::DEFAULT_SECTION_TITLE;

const TITLE_SELECTOR: &str = "div.Table__Title";

/// One season's top-scorer table. Every row has exactly `columns.len()` cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeasonTable {
    pub year: u16,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl SeasonTable {
    pub fn empty(year: u16) -> Self {
        Self {
            year,
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx).map(String::as_str)
    }
}

/// Why a season produced nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Miss {
    TableNotFound,
    NoRows,
}

impl Miss {
    pub fn reason(self) -> &'static str {
        match self {
            Miss::TableNotFound => "table not found",
            Miss::NoRows => "no rows",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableLocator {
    /// First `<table>` after a `div.Table__Title` whose text equals `title`.
    TitledSection { title: String },
    /// First `<table>` anywhere in the document.
    FirstTable,
}

impl TableLocator {
    fn locate<'a>(&self, document: &'a Html) -> Option<ElementRef<'a>> {
        match self {
            TableLocator::TitledSection { title } => {
                let selector = Selector::parse(TITLE_SELECTOR).ok()?;
                let heading = document
                    .select(&selector)
                    .find(|el| stripped_text(*el) == *title)?;
                first_table_after(document, heading)
            }
            TableLocator::FirstTable => {
                let selector = Selector::parse("table").ok()?;
                document.select(&selector).next()
            }
        }
    }
}

/// Ordered locator strategies; the first one that matches wins.
#[derive(Debug, Clone)]
pub struct TableExtractor {
    locators: Vec<TableLocator>,
}

impl Default for TableExtractor {
    fn default() -> Self {
        Self::for_section(DEFAULT_SECTION_TITLE)
    }
}

impl TableExtractor {
    pub fn for_section(title: &str) -> Self {
        Self::with_locators(vec![
            TableLocator::TitledSection {
                title: title.to_string(),
            },
            TableLocator::FirstTable,
        ])
    }

    pub fn with_locators(locators: Vec<TableLocator>) -> Self {
        Self { locators }
    }

    pub fn try_extract(&self, html: &str, year: u16) -> Result<SeasonTable, Miss> {
        let document = Html::parse_document(html);
        let Some((locator, table)) = self
            .locators
            .iter()
            .find_map(|locator| locator.locate(&document).map(|table| (locator, table)))
        else {
            return Err(Miss::TableNotFound);
        };
        debug!(year, ?locator, "table located");

        let (columns, rows) = parse_table(table);
        if columns.is_empty() || rows.is_empty() {
            return Err(Miss::NoRows);
        }
        Ok(SeasonTable {
            year,
            columns,
            rows,
        })
    }

    /// Misses are logged and come back as an empty table, never as an error.
    pub fn extract(&self, html: &str, year: u16) -> SeasonTable {
        match self.try_extract(html, year) {
            Ok(table) => table,
            Err(miss) => {
                warn!(year, reason = miss.reason(), "season skipped");
                SeasonTable::empty(year)
            }
        }
    }
}

fn first_table_after<'a>(document: &'a Html, anchor: ElementRef<'a>) -> Option<ElementRef<'a>> {
    let anchor_id = anchor.id();
    let mut seen_anchor = false;
    for node in document.tree.root().descendants() {
        if node.id() == anchor_id {
            seen_anchor = true;
            continue;
        }
        if !seen_anchor {
            continue;
        }
        if let Some(el) = ElementRef::wrap(node)
            && el.value().name() == "table"
        {
            return Some(el);
        }
    }
    None
}

fn parse_table(table: ElementRef<'_>) -> (Vec<String>, Vec<Vec<String>>) {
    let (Ok(tr), Ok(th), Ok(td)) = (
        Selector::parse("tr"),
        Selector::parse("th"),
        Selector::parse("td"),
    ) else {
        return (Vec::new(), Vec::new());
    };

    let mut trs = table.select(&tr);
    let Some(header_row) = trs.next() else {
        return (Vec::new(), Vec::new());
    };
    let columns: Vec<String> = header_row.select(&th).map(stripped_text).collect();

    let rows = trs
        .map(|row| row.select(&td).map(stripped_text).collect::<Vec<_>>())
        .filter(|cells| cells.len() == columns.len())
        .collect();
    (columns, rows)
}

/// Concatenation of every text node, each trimmed.
fn stripped_text(el: ElementRef<'_>) -> String {
    el.text().map(str::trim).filter(|s| !s.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stripped_text_joins_trimmed_fragments() {
        let doc = Html::parse_fragment("<p>  Lionel <b> Messi </b>\n</p>");
        let p = Selector::parse("p").unwrap();
        let el = doc.select(&p).next().unwrap();
        assert_eq!(stripped_text(el), "LionelMessi");
    }

    #[test]
    fn header_only_table_is_no_rows() {
        let html = "<table><tr><th>Nombre</th><th>G</th></tr></table>";
        let miss = TableExtractor::default().try_extract(html, 2002).unwrap_err();
        assert_eq!(miss, Miss::NoRows);
    }

    #[test]
    fn table_without_header_cells_is_no_rows() {
        let html = "<table><tr><td>a</td></tr><tr><td>b</td></tr></table>";
        let miss = TableExtractor::default().try_extract(html, 2002).unwrap_err();
        assert_eq!(miss, Miss::NoRows);
    }

    #[test]
    fn extract_returns_empty_sentinel_on_miss() {
        let table = TableExtractor::default().extract("<p>nothing</p>", 2010);
        assert!(table.is_empty());
        assert_eq!(table.year, 2010);
    }
}
