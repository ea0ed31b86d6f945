use ffws_web::{Dataset, Extraction};
use std::fmt::Write;

/// Markdown rendering of one extraction, headed by its capture time.
///
/// Column titles come from the page's own header row when it lines up with
/// the record fields, otherwise from the field names.
pub fn render_table(dataset: Dataset, extraction: &Extraction) -> String {
    if extraction.is_empty() {
        return format!("No {} data available\n", dataset.label());
    }

    let titles: Vec<&str> = if extraction.headers.len() == extraction.fields.len() {
        extraction.headers.iter().map(String::as_str).collect()
    } else {
        extraction.fields.to_vec()
    };

    let mut out = String::new();
    let _ = writeln!(out, "\n# Time : {}", extraction.captured_at);
    push_row(&mut out, titles.iter().copied());
    push_row(&mut out, titles.iter().map(|_| "---"));
    for record in &extraction.records {
        push_row(&mut out, record.fields().map(|(_, value)| value));
    }
    out
}

fn push_row<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>) {
    out.push('|');
    for cell in cells {
        let _ = write!(out, " {} |", cell.replace('|', "\\|"));
    }
    out.push('\n');
}
