//! Monthly income/expense table import
//!
//! Expected columns:
//! - `month_num` (1..12), or an all-integer `month` column
//! - `income<suffix>` (e.g. `income_lkr`)
//! - `<category><suffix>` for each expense category (rent_lkr, food_lkr, ...)
//! - optional `member_id` / `member_role` (family mode)

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::{debug, info, warn};

use crate::config::RecommenderConfig;
use crate::error::{Error, Result};
use crate::models::{AccountMode, Record, RecordTable, DEFAULT_MEMBER_ROLE, HOUSEHOLD_MEMBER_ID};

const MONTH_COLUMN: &str = "month_num";
const MONTH_FALLBACK_COLUMN: &str = "month";
const MEMBER_ID_COLUMN: &str = "member_id";
const MEMBER_ROLE_COLUMN: &str = "member_role";

/// An untyped in-memory table (headers plus string cells)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Build from string slices (convenient for in-memory tables)
    pub fn from_rows(headers: &[&str], rows: &[Vec<&str>]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        }
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(String::as_str).unwrap_or("")
}

/// Read a delimited table from any reader
pub fn read_csv<R: Read>(reader: R) -> Result<RawTable> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();
    let mut rows = Vec::new();
    for result in rdr.records() {
        let record: StringRecord = result?;
        rows.push(record.iter().map(|c| c.to_string()).collect());
    }

    debug!("Read {} rows with {} columns", rows.len(), headers.len());
    Ok(RawTable { headers, rows })
}

/// Read a CSV file from disk
pub fn read_csv_path(path: &Path) -> Result<RawTable> {
    if !path.exists() {
        return Err(Error::Schema(format!(
            "Invalid file path: {}",
            path.display()
        )));
    }
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);
    if !is_csv {
        return Err(Error::Schema(format!(
            "Only CSV files are supported: {}",
            path.display()
        )));
    }

    info!("Loading data from {}", path.display());
    read_csv(File::open(path)?)
}

/// Validate the table's schema and coerce it into typed records
pub fn parse_records(
    table: &RawTable,
    config: &RecommenderConfig,
    mode: AccountMode,
) -> Result<RecordTable> {
    let month_idx = resolve_month_column(table)?;

    let suffix = config.currency_suffix();
    let income_column = config.income_column();
    let income_idx = table.column_index(&income_column).ok_or_else(|| {
        Error::Schema(format!(
            "Missing required columns: [\"{}\"]",
            income_column
        ))
    })?;

    let expense_columns: Vec<(usize, String)> = table
        .headers
        .iter()
        .enumerate()
        .filter(|(_, h)| h.ends_with(&suffix) && **h != income_column)
        .map(|(i, h)| (i, h.clone()))
        .collect();
    if expense_columns.is_empty() {
        return Err(Error::Schema(format!(
            "No expense columns ending with '{}' (besides income)",
            suffix
        )));
    }

    let (member_idx, role_idx) = match mode {
        AccountMode::Single => (None, None),
        AccountMode::Family => {
            let member_idx = table.column_index(MEMBER_ID_COLUMN);
            if member_idx.is_none() {
                warn!(
                    "Family account without '{}'; treating as one household row per month",
                    MEMBER_ID_COLUMN
                );
            }
            (member_idx, table.column_index(MEMBER_ROLE_COLUMN))
        }
    };

    let mut records = Vec::with_capacity(table.rows.len());
    for (line, row) in table.rows.iter().enumerate() {
        let month_num = parse_month(cell(row, month_idx)).ok_or_else(|| {
            Error::Schema(format!(
                "Row {}: month_num must be an integer 1..12, got '{}'",
                line + 1,
                cell(row, month_idx)
            ))
        })?;

        let member_id = member_idx
            .map(|i| cell(row, i).to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| HOUSEHOLD_MEMBER_ID.to_string());
        let member_role = role_idx
            .map(|i| cell(row, i).to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_MEMBER_ROLE.to_string());

        let expenses: BTreeMap<String, f64> = expense_columns
            .iter()
            .map(|(i, name)| (name.clone(), coerce_amount(cell(row, *i))))
            .collect();

        records.push(Record {
            month_num,
            member_id,
            member_role,
            income: coerce_amount(cell(row, income_idx)),
            expenses,
        });
    }

    debug!(
        "Parsed {} records with {} expense columns",
        records.len(),
        expense_columns.len()
    );

    Ok(RecordTable {
        income_column,
        expense_columns: expense_columns.into_iter().map(|(_, name)| name).collect(),
        records,
    })
}

/// Find `month_num`, falling back to an all-integer `month` column
fn resolve_month_column(table: &RawTable) -> Result<usize> {
    if let Some(idx) = table.column_index(MONTH_COLUMN) {
        return Ok(idx);
    }
    if let Some(idx) = table.column_index(MONTH_FALLBACK_COLUMN) {
        let all_integers = table
            .rows
            .iter()
            .all(|row| cell(row, idx).parse::<i64>().is_ok());
        if all_integers {
            debug!("Using '{}' as '{}'", MONTH_FALLBACK_COLUMN, MONTH_COLUMN);
            return Ok(idx);
        }
    }
    Err(Error::Schema(format!(
        "Table must include an integer '{}' column (1..12)",
        MONTH_COLUMN
    )))
}

fn parse_month(s: &str) -> Option<u32> {
    let s = s.trim();
    let month = match s.parse::<u32>() {
        Ok(m) => m,
        Err(_) => {
            let f = s.parse::<f64>().ok()?;
            if f.fract() != 0.0 || f < 0.0 {
                return None;
            }
            f as u32
        }
    };
    (1..=12).contains(&month).then_some(month)
}

/// Coerce a money cell; anything unusable becomes 0
///
/// Thousands separators and one leading currency token (`Rs`, `Rs.`,
/// `LKR`, `$`) are dropped; the rest must parse as a number on its own.
fn coerce_amount(s: &str) -> f64 {
    let cleaned = s.trim().replace(',', "");
    let number = strip_currency(&cleaned).trim();

    match number.parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => v,
        _ => 0.0,
    }
}

fn strip_currency(s: &str) -> &str {
    let letters = s.find(|c: char| !c.is_alphabetic()).unwrap_or(s.len());
    if letters > 0 {
        let rest = &s[letters..];
        return rest.strip_prefix('.').unwrap_or(rest);
    }
    match s.chars().next() {
        Some(c) if !c.is_ascii() && !c.is_alphanumeric() => &s[c.len_utf8()..],
        Some('$') => &s[1..],
        _ => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RecommenderConfig {
        RecommenderConfig::default()
    }

    #[test]
    fn test_coerce_amount() {
        assert_eq!(coerce_amount("1,234.50"), 1234.5);
        assert_eq!(coerce_amount(" Rs 30000 "), 30000.0);
        assert_eq!(coerce_amount(""), 0.0);
        assert_eq!(coerce_amount("n/a"), 0.0);
        assert_eq!(coerce_amount("-50"), 0.0);
        assert_eq!(coerce_amount("NaN"), 0.0);
        assert_eq!(coerce_amount("inf"), 0.0);
    }

    #[test]
    fn test_coerce_amount_currency_prefix() {
        assert_eq!(coerce_amount("Rs. 30000"), 30000.0);
        assert_eq!(coerce_amount("Rs.1,500"), 1500.0);
        assert_eq!(coerce_amount("LKR 2,000.75"), 2000.75);
        assert_eq!(coerce_amount("$45"), 45.0);
        assert_eq!(coerce_amount("€ 12.5"), 12.5);
    }

    #[test]
    fn test_coerce_amount_rejects_mixed_text() {
        assert_eq!(coerce_amount("1 to 2"), 0.0);
        assert_eq!(coerce_amount("30000 approx"), 0.0);
        assert_eq!(coerce_amount("Rs. 3O000"), 0.0);
        assert_eq!(coerce_amount("12-34"), 0.0);
    }

    #[test]
    fn test_parse_month() {
        assert_eq!(parse_month("1"), Some(1));
        assert_eq!(parse_month("12.0"), Some(12));
        assert_eq!(parse_month("13"), None);
        assert_eq!(parse_month("0"), None);
        assert_eq!(parse_month("2.5"), None);
        assert_eq!(parse_month("jan"), None);
    }

    #[test]
    fn test_read_csv_and_parse() {
        let csv = "month_num,income_lkr,rent_lkr,food_lkr,notes\n\
                   1,100000,30000,20000,first\n\
                   2, 100000 ,30000,bad,second\n";
        let table = read_csv(csv.as_bytes()).unwrap();
        assert_eq!(table.rows.len(), 2);

        let parsed = parse_records(&table, &config(), AccountMode::Single).unwrap();
        assert_eq!(parsed.income_column, "income_lkr");
        assert_eq!(parsed.expense_columns, vec!["rent_lkr", "food_lkr"]);
        assert_eq!(parsed.records[1].income, 100000.0);
        assert_eq!(parsed.records[1].expense("food_lkr"), 0.0);
        assert_eq!(parsed.records[0].member_id, HOUSEHOLD_MEMBER_ID);
    }

    #[test]
    fn test_missing_month_column() {
        let table = RawTable::from_rows(&["income_lkr", "rent_lkr"], &[vec!["1", "2"]]);
        let err = parse_records(&table, &config(), AccountMode::Single).unwrap_err();
        assert!(matches!(err, Error::Schema(_)));
    }

    #[test]
    fn test_month_fallback_column() {
        let table = RawTable::from_rows(
            &["month", "income_lkr", "rent_lkr"],
            &[vec!["3", "100", "50"]],
        );
        let parsed = parse_records(&table, &config(), AccountMode::Single).unwrap();
        assert_eq!(parsed.records[0].month_num, 3);

        let table = RawTable::from_rows(
            &["month", "income_lkr", "rent_lkr"],
            &[vec!["March", "100", "50"]],
        );
        assert!(parse_records(&table, &config(), AccountMode::Single).is_err());
    }

    #[test]
    fn test_missing_income_column() {
        let table = RawTable::from_rows(&["month_num", "rent_lkr"], &[vec!["1", "2"]]);
        let err = parse_records(&table, &config(), AccountMode::Single).unwrap_err();
        assert!(err.to_string().contains("income_lkr"));
    }

    #[test]
    fn test_no_expense_columns() {
        let table = RawTable::from_rows(&["month_num", "income_lkr"], &[vec!["1", "2"]]);
        let err = parse_records(&table, &config(), AccountMode::Single).unwrap_err();
        assert!(err.to_string().contains("No expense columns"));
    }

    #[test]
    fn test_month_out_of_range() {
        let table = RawTable::from_rows(
            &["month_num", "income_lkr", "rent_lkr"],
            &[vec!["13", "100", "50"]],
        );
        let err = parse_records(&table, &config(), AccountMode::Single).unwrap_err();
        assert!(matches!(err, Error::Schema(_)));
    }

    #[test]
    fn test_family_member_defaults() {
        let table = RawTable::from_rows(
            &["month_num", "member_role", "income_lkr", "fun_lkr"],
            &[vec!["1", "", "100", "10"], vec!["1", "Child", "0", "5"]],
        );
        let parsed = parse_records(&table, &config(), AccountMode::Family).unwrap();
        assert!(parsed.records.iter().all(|r| r.member_id == "H1"));
        assert_eq!(parsed.records[0].member_role, "Adult");
        assert_eq!(parsed.records[1].member_role, "Child");
    }

    #[test]
    fn test_single_mode_ignores_members() {
        let table = RawTable::from_rows(
            &["month_num", "member_id", "member_role", "income_lkr", "fun_lkr"],
            &[vec!["1", "M2", "Child", "100", "10"]],
        );
        let parsed = parse_records(&table, &config(), AccountMode::Single).unwrap();
        assert_eq!(parsed.records[0].member_id, "H1");
        assert_eq!(parsed.records[0].member_role, "Adult");
    }

    #[test]
    fn test_read_csv_path_rejects_non_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.txt");
        std::fs::write(&path, "month_num,income_lkr\n").unwrap();
        let err = read_csv_path(&path).unwrap_err();
        assert!(err.to_string().contains("Only CSV"));

        let err = read_csv_path(&dir.path().join("missing.csv")).unwrap_err();
        assert!(err.to_string().contains("Invalid file path"));
    }
}
