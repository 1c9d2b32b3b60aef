//! Header-driven, forgiving CSV parser for product import files.
//!
//! Field names come from the header row (trimmed, lowercased). Bad rows are
//! skipped with a warning, never fatal to the batch: a row is dropped when its
//! field count differs from the header's or when `id`/`title` is missing.
//! `price` and `count` are coerced numerically, with unparseable values
//! becoming 0. Only a file with no data rows at all fails the parse.

use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

/// Errors that fail an entire import file.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("CSV file is empty or has no data rows")]
    Empty,

    #[error("failed to read CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// One product row parsed out of an import file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub count: i32,
}

/// Positions of the recognized columns within the header row.
struct ColumnMap {
    width: usize,
    id: Option<usize>,
    title: Option<usize>,
    description: Option<usize>,
    price: Option<usize>,
    count: Option<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &[String]) -> Self {
        let position = |name: &str| headers.iter().position(|h| h == name);
        Self {
            width: headers.len(),
            id: position("id"),
            title: position("title"),
            description: position("description"),
            price: position("price"),
            count: position("count"),
        }
    }

    fn text(&self, record: &StringRecord, column: Option<usize>) -> String {
        column
            .and_then(|i| record.get(i))
            .unwrap_or_default()
            .to_string()
    }
}

/// Parse CSV content into product records.
pub fn parse_products(content: &str) -> Result<Vec<ProductRecord>, ParseError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();

    if headers.is_empty() || headers.iter().all(String::is_empty) {
        return Err(ParseError::Empty);
    }

    let columns = ColumnMap::from_headers(&headers);
    let mut records = Vec::new();
    let mut data_rows = 0usize;

    for (index, result) in reader.records().enumerate() {
        let record = result?;
        // Header is line 1, first data row is line 2
        let line = index + 2;
        data_rows += 1;

        if record.len() != columns.width {
            warn!(
                line,
                expected = columns.width,
                found = record.len(),
                "Skipping line: column count mismatch"
            );
            continue;
        }

        let id = columns.text(&record, columns.id);
        let title = columns.text(&record, columns.title);

        if id.is_empty() || title.is_empty() {
            warn!(line, "Skipping line: missing required fields (id or title)");
            continue;
        }

        records.push(ProductRecord {
            id,
            title,
            description: columns.text(&record, columns.description),
            price: parse_number(&columns.text(&record, columns.price)),
            count: parse_number::<f64>(&columns.text(&record, columns.count)) as i32,
        });
    }

    if data_rows == 0 {
        return Err(ParseError::Empty);
    }

    Ok(records)
}

/// Numeric coercion with the forgiving fallback: unparseable values become 0.
fn parse_number<T: std::str::FromStr + Default>(value: &str) -> T {
    value.parse().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_row_round_trips() {
        let csv = "id,title,description,price,count\n\
                   p-1,Widget,A widget,9.99,3\n";

        let records = parse_products(csv).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0],
            ProductRecord {
                id: "p-1".to_string(),
                title: "Widget".to_string(),
                description: "A widget".to_string(),
                price: 9.99,
                count: 3,
            }
        );
    }

    #[test]
    fn header_names_are_case_insensitive_and_trimmed() {
        let csv = " ID , Title ,Description, PRICE ,Count\n\
                   p-1,Widget,desc,5,1\n";

        let records = parse_products(csv).unwrap();
        assert_eq!(records[0].id, "p-1");
        assert_eq!(records[0].price, 5.0);
        assert_eq!(records[0].count, 1);
    }

    #[test]
    fn non_numeric_price_coerces_to_zero_without_dropping_the_row() {
        let csv = "id,title,description,price,count\n\
                   p-1,Widget,desc,cheap,4\n";

        let records = parse_products(csv).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].price, 0.0);
        assert_eq!(records[0].count, 4);
    }

    #[test]
    fn mismatched_column_count_skips_only_that_row() {
        let csv = "id,title,description,price,count\n\
                   p-1,Widget,desc,1.0\n\
                   p-2,Gadget,desc,2.0,5\n";

        let records = parse_products(csv).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "p-2");
    }

    #[test]
    fn rows_missing_id_or_title_are_skipped() {
        let csv = "id,title,description,price,count\n\
                   ,Widget,desc,1.0,1\n\
                   p-2,,desc,2.0,2\n\
                   p-3,Gadget,desc,3.0,3\n";

        let records = parse_products(csv).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "p-3");
    }

    #[test]
    fn header_only_file_is_an_explicit_error() {
        let csv = "id,title,description,price,count\n";

        let err = parse_products(csv).unwrap_err();
        assert!(matches!(err, ParseError::Empty));
        assert_eq!(err.to_string(), "CSV file is empty or has no data rows");
    }

    #[test]
    fn empty_file_is_an_explicit_error() {
        assert!(matches!(parse_products(""), Err(ParseError::Empty)));
        assert!(matches!(parse_products("\n\n"), Err(ParseError::Empty)));
    }

    #[test]
    fn blank_lines_between_rows_are_ignored() {
        let csv = "id,title,description,price,count\n\
                   \n\
                   p-1,Widget,desc,1.0,1\n\
                   \n";

        let records = parse_products(csv).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn quoted_fields_keep_embedded_commas() {
        let csv = "id,title,description,price,count\n\
                   p-1,\"Widget, deluxe\",\"big, shiny\",9.99,2\n";

        let records = parse_products(csv).unwrap();
        assert_eq!(records[0].title, "Widget, deluxe");
        assert_eq!(records[0].description, "big, shiny");
    }

    #[test]
    fn values_are_trimmed() {
        let csv = "id,title,description,price,count\n\
                   \x20p-1 , Widget ,  desc , 1.5 , 2 \n";

        let records = parse_products(csv).unwrap();
        assert_eq!(records[0].id, "p-1");
        assert_eq!(records[0].title, "Widget");
        assert_eq!(records[0].price, 1.5);
    }

    #[test]
    fn fractional_count_truncates() {
        let csv = "id,title,description,price,count\n\
                   p-1,Widget,desc,1.0,2.9\n";

        let records = parse_products(csv).unwrap();
        assert_eq!(records[0].count, 2);
    }
}
