//! Turns registry pages into records.
//!
//! Both page kinds carry their data in `table.table` rows. A search page has
//! one row per candidate name (`td` cells: name, count, ...), a detail page has
//! one `th`/`td` pair per field.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use crate::error::LookupError;
use crate::fetcher::Page;
use crate::record::{capitalize, DetailLink, NameRecord};

static ROWS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table.table tbody tr").unwrap());
static TD: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());
static TH: LazyLock<Selector> = LazyLock::new(|| Selector::parse("th").unwrap());
static ANCHOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Record(NameRecord),
    Detail(DetailLink),
    /// The registry has no entry for the query.
    NotFound,
    /// Rows came back but none named exactly the query.
    Ambiguous,
}

enum RowHit<'a> {
    Empty,
    Match(ElementRef<'a>, Vec<String>),
}

/// Search page: pick the row named exactly `expected` (case-insensitive).
pub fn extract_list(page: &Page, expected: &str) -> Result<Extraction, LookupError> {
    let html = Html::parse_document(&page.body);
    let expected = expected.trim().to_lowercase();
    let mut scanned = 0usize;

    // First cell-less row or first exact name match decides; "Bogdans" never matches "Dans".
    let hit = html
        .select(&ROWS)
        .inspect(|_| scanned += 1)
        .find_map(|row| {
            let cells: Vec<String> = row.select(&TD).map(cell_text).collect();
            match cells.first() {
                None => Some(RowHit::Empty),
                Some(first) if first.to_lowercase() == expected => Some(RowHit::Match(row, cells)),
                Some(_) => None,
            }
        });

    match hit {
        Some(RowHit::Empty) => Ok(Extraction::NotFound),
        None if scanned == 0 => Ok(Extraction::NotFound),
        None => Ok(Extraction::Ambiguous),
        Some(RowHit::Match(row, cells)) => {
            let href = row
                .select(&ANCHOR)
                .next()
                .and_then(|a| a.value().attr("href"))
                .map(str::trim)
                .filter(|h| !h.is_empty());

            if let Some(target) = href {
                return Ok(Extraction::Detail(DetailLink {
                    target: target.to_string(),
                }));
            }

            let count = cells
                .get(1)
                .ok_or_else(|| LookupError::MalformedRecord(format!("row for {} has no count cell", cells[0])))?;
            Ok(Extraction::Record(NameRecord {
                name: capitalize(&cells[0]),
                count: parse_count(count)?,
                explanation: None,
            }))
        }
    }
}

/// Field labels on a detail page, as the registry prints them.
const NAME_LABEL: &str = "Vārds";
const COUNT_LABEL: &str = "Sastopams";
const EXPLANATION_LABEL: &str = "Skaidrojums";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DetailField {
    Name,
    Count,
    Explanation,
}

impl DetailField {
    fn from_label(label: &str) -> Option<Self> {
        match label {
            NAME_LABEL => Some(Self::Name),
            COUNT_LABEL => Some(Self::Count),
            EXPLANATION_LABEL => Some(Self::Explanation),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct RecordBuilder {
    name: Option<String>,
    count: Option<u64>,
    explanation: Option<String>,
}

impl RecordBuilder {
    fn set(&mut self, field: DetailField, value: &str) -> Result<(), LookupError> {
        match field {
            DetailField::Name => self.name = Some(capitalize(value)).filter(|n| !n.is_empty()),
            DetailField::Count => self.count = Some(parse_count(value)?),
            DetailField::Explanation => {
                self.explanation = Some(value.to_string()).filter(|e| !e.is_empty())
            }
        }
        Ok(())
    }

    fn build(self) -> Result<NameRecord, LookupError> {
        let name = self
            .name
            .ok_or_else(|| LookupError::MalformedRecord("detail page has no name".into()))?;
        let count = self
            .count
            .ok_or_else(|| LookupError::MalformedRecord(format!("detail page for {} has no count", name)))?;
        Ok(NameRecord {
            name,
            count,
            explanation: self.explanation,
        })
    }
}

/// Detail page: one `th` label / `td` value pair per field.
pub fn extract_detail(page: &Page) -> Result<NameRecord, LookupError> {
    let html = Html::parse_document(&page.body);
    let mut builder = RecordBuilder::default();

    for row in html.select(&ROWS) {
        let (Some(key), Some(value)) = (row.select(&TH).next(), row.select(&TD).next()) else {
            continue;
        };
        if let Some(field) = DetailField::from_label(&cell_text(key)) {
            builder.set(field, &cell_text(value))?;
        }
    }

    builder.build()
}

fn cell_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn parse_count(raw: &str) -> Result<u64, LookupError> {
    raw.trim()
        .parse()
        .map_err(|_| LookupError::MalformedRecord(format!("count is not a number: {:?}", raw)))
}

// ── Tests ──
