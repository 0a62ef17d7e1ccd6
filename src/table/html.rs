// src/table/html.rs

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, trace};

use super::{Cell, RawTable};

static TABLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("table").expect("CSS selector for tables should be valid"));

static DATA_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(資料日期|日期|Data\s*Date)\s*[:：]?\s*(\d{4}[/-]\d{2}[/-]\d{2})")
        .expect("data date regex should compile")
});

/// Upper bound on a single cell's `colspan`, so a bogus attribute can't blow up a row.
const MAX_COLSPAN: usize = 64;

/// One `<tr>`, split into its header-ness and expanded cell texts.
struct HtmlRow {
    all_th: bool,
    cells: Vec<Option<String>>,
}

fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn element_children<'a>(el: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    el.children().filter_map(ElementRef::wrap)
}

fn read_row(tr: ElementRef<'_>) -> HtmlRow {
    let mut cells = Vec::new();
    let mut all_th = true;
    let mut any = false;
    for cell in element_children(tr) {
        let name = cell.value().name();
        if name != "td" && name != "th" {
            continue;
        }
        any = true;
        all_th &= name == "th";
        let text = collapse_ws(&cell.text().collect::<Vec<_>>().join(" "));
        let value = if text.is_empty() { None } else { Some(text) };
        let span = cell
            .value()
            .attr("colspan")
            .and_then(|s| s.trim().parse::<usize>().ok())
            .unwrap_or(1)
            .clamp(1, MAX_COLSPAN);
        for _ in 0..span {
            cells.push(value.clone());
        }
    }
    HtmlRow {
        all_th: all_th && any,
        cells,
    }
}

/// Rows that belong to `table` itself (not to tables nested inside it).
fn table_rows(table: ElementRef<'_>) -> (Vec<HtmlRow>, Vec<HtmlRow>) {
    let mut head = Vec::new();
    let mut body = Vec::new();
    for child in element_children(table) {
        match child.value().name() {
            "tr" => body.push(read_row(child)),
            "thead" => head.extend(
                element_children(child)
                    .filter(|e| e.value().name() == "tr")
                    .map(read_row),
            ),
            "tbody" | "tfoot" => body.extend(
                element_children(child)
                    .filter(|e| e.value().name() == "tr")
                    .map(read_row),
            ),
            _ => {}
        }
    }
    (head, body)
}

fn build_table(head: Vec<HtmlRow>, mut body: Vec<HtmlRow>) -> Option<RawTable> {
    // header: last <thead> row, else a leading all-<th> row, else positional
    let header: Vec<Option<String>> = match head.into_iter().last() {
        Some(row) => row.cells,
        None if body.first().map_or(false, |r| r.all_th) => body.remove(0).cells,
        None => Vec::new(),
    };

    body.retain(|r| !r.cells.is_empty());
    let width = body
        .iter()
        .map(|r| r.cells.len())
        .chain(std::iter::once(header.len()))
        .max()
        .unwrap_or(0);
    if width == 0 {
        return None;
    }

    let columns = (0..width)
        .map(|i| {
            header
                .get(i)
                .cloned()
                .flatten()
                .unwrap_or_else(|| i.to_string())
        })
        .collect();
    let rows = body
        .into_iter()
        .map(|r| {
            let mut cells: Vec<Option<Cell>> =
                r.cells.into_iter().map(|c| c.map(Cell::Text)).collect();
            cells.resize(width, None);
            cells
        })
        .collect();

    Some(RawTable::new(columns, rows))
}

/// Extract every `<table>` in the document, in document order.
pub fn read_html_tables(html: &str) -> Vec<RawTable> {
    let doc = Html::parse_document(html);
    let tables: Vec<RawTable> = doc
        .select(&TABLE_SELECTOR)
        .filter_map(|t| {
            let (head, body) = table_rows(t);
            build_table(head, body)
        })
        .collect();
    debug!(count = tables.len(), "extracted html tables");
    tables
}

/// Visible document text, whitespace-collapsed.
pub fn page_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    collapse_ws(&doc.root_element().text().collect::<Vec<_>>().join(" "))
}

/// Find a "data date" label in page text and return it as `YYYY/MM/DD`.
pub fn extract_data_date(text: &str) -> Option<String> {
    let caps = DATA_DATE_RE.captures(text)?;
    let date = caps.get(2)?.as_str().replace('-', "/");
    trace!(label = &caps[1], %date, "found data date");
    Some(date)
}
