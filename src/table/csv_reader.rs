// src/table/csv_reader.rs

use anyhow::{Context, Result};
use csv::ReaderBuilder;
use tracing::debug;

use super::{Cell, RawTable};

/// Read a provider CSV export into a single raw table.
///
/// The first record is the header. Records may be ragged; blank fields become missing.
pub fn read_csv_table(text: &str) -> Result<RawTable> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let columns: Vec<String> = rdr
        .headers()
        .context("reading CSV header row")?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            // Excel exports lead with a BOM on the first header
            if i == 0 {
                h.trim_start_matches('\u{feff}').to_string()
            } else {
                h.to_string()
            }
        })
        .collect();

    let mut rows = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("CSV parse error at record {}", idx))?;
        rows.push(
            record
                .iter()
                .map(|field| {
                    let field = field.trim();
                    if field.is_empty() {
                        None
                    } else {
                        Some(Cell::text(field))
                    }
                })
                .collect(),
        );
    }

    debug!(columns = columns.len(), rows = rows.len(), "read csv table");
    Ok(RawTable::new(columns, rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_header_and_rows() -> Result<()> {
        let text = "\u{feff}Ticker,Name,Weight (%),Shares\nAAPL,Apple Inc.,7.1%,\"1,200\"\nMSFT,Microsoft,,\n";
        let table = read_csv_table(text)?;
        assert_eq!(table.columns, vec!["Ticker", "Name", "Weight (%)", "Shares"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.value(0, 3), Some(&Cell::text("1,200")));
        assert_eq!(table.value(1, 2), None);
        Ok(())
    }

    #[test]
    fn test_ragged_records_allowed() -> Result<()> {
        let table = read_csv_table("a,b,c\n1\n1,2,3,4\n")?;
        assert_eq!(table.rows[0].len(), 1);
        assert_eq!(table.rows[1].len(), 4);
        Ok(())
    }
}
