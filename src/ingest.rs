use anyhow::{Result, bail};
use tracing::debug;

use crate::bulk::{BulkPriceParser, compose_bulk_name};
use crate::model::NewItem;
use crate::util::format_price;

/// The sectioned sheet layout carries no stock column.
pub const DEFAULT_IMPORT_STOCK: u32 = 100;

pub const DEFAULT_CATEGORY: &str = "General";

/// Category section markers seen in real sheets, with the canonical category
/// name each one maps to. Matching is a case-insensitive substring check on
/// the first cell.
const CATEGORY_MARKERS: &[(&str, &str)] = &[
    ("snack", "SNACKS"),
    ("chips", "SNACKS"),
    ("candy", "CANDIES"),
    ("candies", "CANDIES"),
    ("beverage", "BEVERAGES"),
    ("drink", "BEVERAGES"),
    ("juice", "BEVERAGES"),
    ("canned", "CANNED GOODS"),
    ("noodle", "NOODLES"),
    ("rice", "RICE"),
    ("condiment", "CONDIMENTS"),
    ("sauce", "CONDIMENTS"),
    ("toiletr", "TOILETRIES"),
    ("personal care", "TOILETRIES"),
    ("household", "HOUSEHOLD"),
    ("detergent", "HOUSEHOLD"),
    ("school", "SCHOOL SUPPLIES"),
    ("bread", "BREAD"),
    ("biscuit", "BISCUITS"),
    ("frozen", "FROZEN"),
    ("cigarette", "CIGARETTES"),
];

/// Table header cells, matched exactly (case-insensitive) against the first
/// cell of a row in the sectioned layout and against the name cell in the
/// category-column layout.
const TABLE_HEADER_MARKERS: &[&str] = &[
    "product - items",
    "product",
    "products",
    "item",
    "items",
    "item name",
    "name",
    "retail price",
    "price",
    "stocks",
    "stock",
    "category",
];

/// Minimum length for a lone cell to count as a category header in the
/// flexible layout's permissive heuristic.
const PERMISSIVE_CATEGORY_MIN_LEN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStrategy {
    Sectioned,
    CategoryColumn,
    Flexible,
}

impl IngestStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            IngestStrategy::Sectioned => "sectioned",
            IngestStrategy::CategoryColumn => "category-column",
            IngestStrategy::Flexible => "flexible",
        }
    }
}

#[derive(Debug)]
pub struct IngestOutcome {
    pub records: Vec<NewItem>,
    pub strategy: IngestStrategy,
    pub rows_seen: usize,
    pub rows_skipped: usize,
    pub warnings: Vec<String>,
}

/// Reconstructs inventory records from loosely formatted spreadsheet rows.
/// Works on trimmed cell strings; the import command owns the workbook read
/// and the duplicate check, this type owns only the row heuristics.
#[derive(Debug)]
pub struct SpreadsheetIngester {
    bulk: BulkPriceParser,
}

#[derive(Debug)]
enum PriceCell {
    Numeric(f64),
    Bulk { quantity: u32, pack_price: f64, unit_price: f64 },
    Missing,
    Invalid,
}

impl SpreadsheetIngester {
    pub fn new() -> Result<Self> {
        Ok(Self {
            bulk: BulkPriceParser::new()?,
        })
    }

    /// Primary entry point: the sectioned layout first, the category-column
    /// layout only if the first pass produced nothing. The two are never mixed
    /// on a partial match.
    pub fn ingest(&self, rows: &[Vec<String>]) -> Result<IngestOutcome> {
        let sectioned = self.parse_sectioned(rows);
        if !sectioned.records.is_empty() {
            return Ok(sectioned);
        }

        let fallback = self.parse_category_column(rows);
        if !fallback.records.is_empty() {
            return Ok(fallback);
        }

        bail!("could not detect file format: no usable rows in either known layout");
    }

    /// Interactive upload variant: header-row auto-detection, fixed column
    /// order when no header exists, and a looser category heuristic.
    pub fn ingest_flexible(&self, rows: &[Vec<String>]) -> Result<IngestOutcome> {
        let outcome = self.parse_flexible(rows);
        if outcome.records.is_empty() {
            bail!("could not detect file format: no usable rows in the upload");
        }
        Ok(outcome)
    }

    fn parse_sectioned(&self, rows: &[Vec<String>]) -> IngestOutcome {
        let mut outcome = IngestOutcome {
            records: Vec::new(),
            strategy: IngestStrategy::Sectioned,
            rows_seen: 0,
            rows_skipped: 0,
            warnings: Vec::new(),
        };
        let mut current_category = DEFAULT_CATEGORY.to_string();

        for (index, row) in rows.iter().enumerate() {
            let Some(first) = first_non_empty(row) else {
                continue;
            };
            outcome.rows_seen += 1;

            // Section headers are lone labels; requiring the rest of the row
            // to be empty keeps products like "Max Candy (4 for 5)" out of
            // the marker match.
            if is_single_cell_row(row) {
                if let Some(category) = canonical_category(first) {
                    current_category = category;
                    continue;
                }
            }

            if is_table_header(first) {
                continue;
            }

            let name = row.first().map(String::as_str).unwrap_or("").trim();
            let price_cell = row.get(1).map(String::as_str).unwrap_or("");
            self.push_product(&mut outcome, index, name, price_cell, None, &current_category);
        }

        outcome
    }

    fn parse_category_column(&self, rows: &[Vec<String>]) -> IngestOutcome {
        let mut outcome = IngestOutcome {
            records: Vec::new(),
            strategy: IngestStrategy::CategoryColumn,
            rows_seen: 0,
            rows_skipped: 0,
            warnings: Vec::new(),
        };

        for (index, row) in rows.iter().enumerate() {
            if first_non_empty(row).is_none() {
                continue;
            }
            outcome.rows_seen += 1;

            let name = row.get(1).map(String::as_str).unwrap_or("").trim();
            if name.is_empty() || is_table_header(name) {
                continue;
            }

            let category_cell = row.first().map(String::as_str).unwrap_or("").trim();
            let category = if category_cell.is_empty() {
                DEFAULT_CATEGORY.to_string()
            } else {
                canonical_category(category_cell).unwrap_or_else(|| category_cell.to_string())
            };

            let price_cell = row.get(2).map(String::as_str).unwrap_or("");
            self.push_product(&mut outcome, index, name, price_cell, None, &category);
        }

        outcome
    }

    fn parse_flexible(&self, rows: &[Vec<String>]) -> IngestOutcome {
        let mut outcome = IngestOutcome {
            records: Vec::new(),
            strategy: IngestStrategy::Flexible,
            rows_seen: 0,
            rows_skipped: 0,
            warnings: Vec::new(),
        };

        let header = detect_header_row(rows);
        let columns = header
            .as_ref()
            .map(|found| found.columns)
            .unwrap_or(ColumnMap {
                name: 0,
                price: 1,
                stock: Some(2),
                category: Some(3),
            });
        let first_data_row = header.as_ref().map(|found| found.row_index + 1).unwrap_or(0);
        let mut current_category = DEFAULT_CATEGORY.to_string();

        for (index, row) in rows.iter().enumerate().skip(first_data_row) {
            let Some(first) = first_non_empty(row) else {
                continue;
            };
            outcome.rows_seen += 1;

            // Header detection already failed when `header` is None, so a lone
            // non-price cell is the only signal left for a section change.
            if header.is_none()
                && is_single_cell_row(row)
                && first.chars().count() > PERMISSIVE_CATEGORY_MIN_LEN
                && !is_price_like(first)
            {
                current_category =
                    canonical_category(first).unwrap_or_else(|| first.to_string());
                continue;
            }

            let name = cell(row, columns.name);
            if name.is_empty() || is_table_header(name) {
                continue;
            }

            let stock = columns
                .stock
                .map(|column| cell(row, column))
                .and_then(|text| text.parse::<u32>().ok());

            let category = columns
                .category
                .map(|column| cell(row, column))
                .filter(|text| !text.is_empty())
                .map(|text| canonical_category(text).unwrap_or_else(|| text.to_string()))
                .unwrap_or_else(|| current_category.clone());

            let price_text = cell(row, columns.price);
            self.push_product(&mut outcome, index, name, price_text, stock, &category);
        }

        outcome
    }

    fn push_product(
        &self,
        outcome: &mut IngestOutcome,
        row_index: usize,
        name: &str,
        price_cell: &str,
        stock: Option<u32>,
        category: &str,
    ) {
        if name.is_empty() {
            outcome.rows_skipped += 1;
            debug!(row = row_index + 1, "skipping row without an item name");
            return;
        }

        match self.parse_price_cell(price_cell) {
            PriceCell::Numeric(value) => outcome.records.push(NewItem {
                name: name.to_string(),
                price: format_price(value),
                stock: stock.unwrap_or(DEFAULT_IMPORT_STOCK),
                category: category.to_string(),
            }),
            PriceCell::Bulk {
                quantity,
                pack_price,
                unit_price,
            } => outcome.records.push(NewItem {
                name: compose_bulk_name(name, quantity, pack_price),
                price: format_price(unit_price),
                stock: stock.unwrap_or(DEFAULT_IMPORT_STOCK),
                category: category.to_string(),
            }),
            PriceCell::Missing => {
                outcome.rows_skipped += 1;
                let warning = format!("row {}: {:?} has no price, skipped", row_index + 1, name);
                debug!(row = row_index + 1, item = %name, "skipping row without a price");
                outcome.warnings.push(warning);
            }
            PriceCell::Invalid => {
                outcome.rows_skipped += 1;
                let warning = format!(
                    "row {}: {:?} has unparseable price {:?}, skipped",
                    row_index + 1,
                    name,
                    price_cell.trim()
                );
                debug!(row = row_index + 1, item = %name, price = %price_cell.trim(), "skipping row with unparseable price");
                outcome.warnings.push(warning);
            }
        }
    }

    fn parse_price_cell(&self, text: &str) -> PriceCell {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return PriceCell::Missing;
        }

        let stripped = strip_currency(trimmed);
        if let Ok(value) = stripped.parse::<f64>() {
            if value > 0.0 {
                return PriceCell::Numeric(value);
            }
            return PriceCell::Invalid;
        }

        // "4 for 5 pesos" in a price cell is advertised input, not noise.
        if let Some(terms) = self.bulk.detect(trimmed) {
            return PriceCell::Bulk {
                quantity: terms.quantity,
                pack_price: terms.pack_price,
                unit_price: terms.unit_price,
            };
        }

        PriceCell::Invalid
    }
}

#[derive(Debug, Clone, Copy)]
struct ColumnMap {
    name: usize,
    price: usize,
    stock: Option<usize>,
    category: Option<usize>,
}

#[derive(Debug)]
struct HeaderRow {
    row_index: usize,
    columns: ColumnMap,
}

fn detect_header_row(rows: &[Vec<String>]) -> Option<HeaderRow> {
    for (row_index, row) in rows.iter().enumerate() {
        let mut name = None;
        let mut price = None;
        let mut stock = None;
        let mut category = None;

        for (column, text) in row.iter().enumerate() {
            let lower = text.trim().to_lowercase();
            if lower.is_empty() {
                continue;
            }
            if name.is_none()
                && (lower.contains("item") || lower.contains("name") || lower.contains("product"))
            {
                name = Some(column);
            } else if price.is_none() && lower.contains("price") {
                price = Some(column);
            } else if stock.is_none() && (lower.contains("stock") || lower.contains("qty")) {
                stock = Some(column);
            } else if category.is_none() && lower.contains("category") {
                category = Some(column);
            }
        }

        if let (Some(name), Some(price)) = (name, price) {
            return Some(HeaderRow {
                row_index,
                columns: ColumnMap {
                    name,
                    price,
                    stock,
                    category,
                },
            });
        }
    }

    None
}

fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(String::as_str).unwrap_or("").trim()
}

fn first_non_empty(row: &[String]) -> Option<&str> {
    row.iter().map(|text| text.trim()).find(|text| !text.is_empty())
}

fn is_single_cell_row(row: &[String]) -> bool {
    row.iter().filter(|text| !text.trim().is_empty()).count() == 1
}

fn canonical_category(text: &str) -> Option<String> {
    let lower = text.trim().to_lowercase();
    for (marker, canonical) in CATEGORY_MARKERS {
        if lower.contains(marker) {
            return Some((*canonical).to_string());
        }
    }
    None
}

fn is_table_header(text: &str) -> bool {
    let lower = text.trim().to_lowercase();
    TABLE_HEADER_MARKERS.iter().any(|marker| *marker == lower)
}

fn is_price_like(text: &str) -> bool {
    if text.contains('\u{20B1}') || text.contains('$') {
        return true;
    }
    strip_currency(text).parse::<f64>().is_ok()
}

/// Strip peso/dollar signs, thousands separators, and "P"/"PHP" prefixes so
/// "₱1,250.00" and "P18" both parse.
fn strip_currency(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .filter(|c| !matches!(c, '\u{20B1}' | '$' | ','))
        .collect();
    let trimmed = cleaned.trim();
    let lower = trimmed.to_lowercase();

    for prefix in ["php", "p"] {
        if let Some(rest) = lower.strip_prefix(prefix) {
            if rest
                .trim_start()
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_digit() || c == '.')
            {
                return trimmed[prefix.len()..].trim().to_string();
            }
        }
    }

    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ingester() -> SpreadsheetIngester {
        SpreadsheetIngester::new().expect("ingester should build")
    }

    fn rows(raw: &[&[&str]]) -> Vec<Vec<String>> {
        raw.iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect()
    }

    #[test]
    fn sectioned_layout_tracks_category_headers_and_skips_table_headers() {
        let sheet = rows(&[
            &["SNACKS"],
            &["Nova", "18"],
            &["Product - Items", "Retail Price", "Stocks"],
            &["V Fresh", "4 for 5 pesos"],
        ]);

        let outcome = ingester().ingest(&sheet).expect("sheet should parse");
        assert_eq!(outcome.strategy, IngestStrategy::Sectioned);
        assert_eq!(outcome.records.len(), 2);

        let nova = &outcome.records[0];
        assert_eq!(nova.name, "Nova");
        assert_eq!(nova.price, "18.00");
        assert_eq!(nova.stock, DEFAULT_IMPORT_STOCK);
        assert_eq!(nova.category, "SNACKS");

        let v_fresh = &outcome.records[1];
        assert_eq!(v_fresh.name, "V Fresh (4 for 5)");
        assert_eq!(v_fresh.price, "1.25");
        assert_eq!(v_fresh.category, "SNACKS");
    }

    #[test]
    fn sectioned_layout_defaults_to_general_before_any_header() {
        let sheet = rows(&[&["Skyflakes", "12.50"]]);
        let outcome = ingester().ingest(&sheet).expect("sheet should parse");
        assert_eq!(outcome.records[0].category, "General");
    }

    #[test]
    fn sectioned_layout_does_not_eat_products_that_contain_marker_words() {
        let sheet = rows(&[&["CANDIES"], &["Max Candy (4 for 5)", "1.25"]]);
        let outcome = ingester().ingest(&sheet).expect("sheet should parse");
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].name, "Max Candy (4 for 5)");
        assert_eq!(outcome.records[0].category, "CANDIES");
    }

    #[test]
    fn sectioned_layout_skips_rows_with_bad_prices_but_keeps_going() {
        let sheet = rows(&[
            &["SNACKS"],
            &["Nova", "18"],
            &["Freebie", "0"],
            &["Mystery", "n/a"],
            &["Piattos", "22.50"],
        ]);

        let outcome = ingester().ingest(&sheet).expect("sheet should parse");
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.rows_skipped, 2);
        assert_eq!(outcome.warnings.len(), 2);
    }

    #[test]
    fn category_column_layout_is_used_only_when_sectioned_finds_nothing() {
        let sheet = rows(&[
            &["Category", "Item Name", "Price"],
            &["Snacks", "Nova", "18"],
            &["Beverages", "Royal 8oz", "20"],
            &["", "Skyflakes", "12.50"],
        ]);

        let outcome = ingester().ingest(&sheet).expect("sheet should parse");
        assert_eq!(outcome.strategy, IngestStrategy::CategoryColumn);
        assert_eq!(outcome.records.len(), 3);
        assert_eq!(outcome.records[0].category, "SNACKS");
        assert_eq!(outcome.records[1].category, "BEVERAGES");
        assert_eq!(outcome.records[2].category, "General");
    }

    #[test]
    fn undetectable_format_is_an_error_not_a_panic() {
        let sheet = rows(&[&["only text"], &["more text"]]);
        let err = ingester().ingest(&sheet).expect_err("should not parse");
        assert!(err.to_string().contains("could not detect file format"));
    }

    #[test]
    fn flexible_layout_maps_columns_from_a_header_row() {
        let sheet = rows(&[
            &["Item Name", "Category", "Price", "Stock"],
            &["Nova", "Snacks", "18", "50"],
            &["Royal 8oz", "Beverages", "20", ""],
        ]);

        let outcome = ingester()
            .ingest_flexible(&sheet)
            .expect("upload should parse");
        assert_eq!(outcome.strategy, IngestStrategy::Flexible);
        assert_eq!(outcome.records.len(), 2);

        let nova = &outcome.records[0];
        assert_eq!(nova.stock, 50);
        assert_eq!(nova.category, "SNACKS");
        // Header row names a price column even though it sits after category.
        assert_eq!(nova.price, "18.00");

        assert_eq!(outcome.records[1].stock, DEFAULT_IMPORT_STOCK);
    }

    #[test]
    fn flexible_layout_without_header_assumes_fixed_column_order() {
        let sheet = rows(&[
            &["Nova", "18", "50", "Snacks"],
            &["Royal 8oz", "20", "", ""],
        ]);

        let outcome = ingester()
            .ingest_flexible(&sheet)
            .expect("upload should parse");
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.records[0].stock, 50);
        assert_eq!(outcome.records[0].category, "SNACKS");
        assert_eq!(outcome.records[1].category, "General");
    }

    #[test]
    fn flexible_layout_treats_lone_long_cells_as_category_headers() {
        let sheet = rows(&[
            &["Instant Noodles"],
            &["Lucky Me", "15", "", ""],
            &["₱20"],
            &["Pancit Canton", "16", "", ""],
        ]);

        let outcome = ingester()
            .ingest_flexible(&sheet)
            .expect("upload should parse");
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.records[0].category, "NOODLES");
        // A lone price-looking cell is noise, not a section change.
        assert_eq!(outcome.records[1].category, "NOODLES");
        assert_eq!(outcome.rows_skipped, 1);
    }

    #[test]
    fn currency_symbols_and_separators_are_stripped_from_prices() {
        let sheet = rows(&[
            &["Rice 25kg", "\u{20B1}1,250.00"],
            &["Bear Brand", "P42.75"],
            &["Milo Sachet", "PHP 11"],
        ]);

        let outcome = ingester().ingest(&sheet).expect("sheet should parse");
        assert_eq!(outcome.records[0].price, "1250.00");
        assert_eq!(outcome.records[1].price, "42.75");
        assert_eq!(outcome.records[2].price, "11.00");
    }
}
