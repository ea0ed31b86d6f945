//! Table location and row mapping over rendered markup.
//!
//! The source renders one `<table class="table-type1">` with a `<thead>`
//! header row and data rows in `<tbody>`. Summary and separator rows carry
//! fewer cells than a station row and are dropped.

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};

use crate::dataset::ExtractionRequest;
use crate::error::ExtractError;
use crate::record::{CaptureTime, Extraction, Record};

/// Header and body cell text of one table, before any mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

fn selector(css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|e| ExtractError::InvalidSelector(format!("`{css}`: {e}")))
}

/// Text of an element with each text node trimmed and the pieces joined.
fn cell_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

fn child_elements<'a>(
    parent: ElementRef<'a>,
    names: &'a [&'a str],
) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    parent
        .children()
        .filter_map(ElementRef::wrap)
        .filter(move |el| names.contains(&el.value().name()))
}

/// Locate the first element matching `table_selector` and read its cells.
pub fn parse_table(markup: &str, table_selector: &str) -> Result<RawTable, ExtractError> {
    let table_sel = selector(table_selector)?;
    let header_sel = selector("th")?;
    let row_sel = selector("tr")?;

    let document = Html::parse_document(markup);
    let table = document
        .select(&table_sel)
        .next()
        .ok_or_else(|| ExtractError::TableNotFound {
            selector: table_selector.to_string(),
        })?;

    let thead = child_elements(table, &["thead"])
        .next()
        .ok_or(ExtractError::MissingSection("thead"))?;
    let headers: Vec<String> = thead.select(&header_sel).map(cell_text).collect();

    // html5ever wraps bare rows in an implicit tbody; none at all means no rows.
    let rows: Vec<Vec<String>> = match child_elements(table, &["tbody"]).next() {
        Some(tbody) => tbody
            .select(&row_sel)
            .map(|row| child_elements(row, &["th", "td"]).map(cell_text).collect())
            .collect(),
        None => Vec::new(),
    };

    Ok(RawTable { headers, rows })
}

impl RawTable {
    /// Map qualifying rows to records sharing `captured_at`; rows with fewer
    /// than `min_columns` cells are skipped.
    pub fn into_extraction(
        self,
        request: &ExtractionRequest,
        captured_at: CaptureTime,
    ) -> Extraction {
        let total = self.rows.len();
        let mut records = Vec::with_capacity(total);
        for (index, cells) in self.rows.into_iter().enumerate() {
            if cells.len() < request.min_columns {
                debug!(
                    target: "extract.table",
                    dataset = request.dataset,
                    row = index,
                    cells = cells.len(),
                    min_columns = request.min_columns,
                    "row.skipped"
                );
                continue;
            }
            records.push(Record::from_cells(request.fields, cells, captured_at));
        }

        info!(
            target: "extract.table",
            dataset = request.dataset,
            rows = total,
            records = records.len(),
            skipped = total - records.len(),
            "table.parsed"
        );

        Extraction {
            dataset: request.dataset,
            headers: self.headers,
            records,
            fields: request.fields,
            captured_at,
        }
    }
}

/// Parse `markup` for `request` in one step.
pub fn extract(
    markup: &str,
    request: &ExtractionRequest,
    captured_at: CaptureTime,
) -> Result<Extraction, ExtractError> {
    Ok(parse_table(markup, request.selector)?.into_extraction(request, captured_at))
}
