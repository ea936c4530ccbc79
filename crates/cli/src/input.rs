use csv::StringRecord;
use funding_solver::{FundingCap, FundingParams, Recipient};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const PEOPLE_SERVED: &str = "people_served";
pub const INCENTIVE: &str = "incentive";
pub const PER_CENTER_CAP: &str = "per_center_cap";
pub const PROGRAM_NAME: &str = "program_name";
pub const PAST_FUNDING: &str = "past_funding";

pub const REQUIRED_COLUMNS: [&str; 2] = [PEOPLE_SERVED, INCENTIVE];

pub type Result<T> = std::result::Result<T, InputError>;

#[derive(Error, Debug)]
pub enum InputError {
    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV must contain 'people_served' and 'incentive' columns (missing: {})", .missing.join(", "))]
    MissingColumns { missing: Vec<String> },

    #[error("CSV contains no data rows")]
    Empty,

    #[error("Missing value in column '{column}' at row {row}")]
    MissingValue { row: usize, column: String },

    #[error("Invalid number '{value}' in column '{column}' at row {row}")]
    InvalidNumber {
        row: usize,
        column: String,
        value: String,
    },

    #[error("Negative value {value} in column '{column}' at row {row}")]
    NegativeValue {
        row: usize,
        column: String,
        value: f64,
    },

    #[error("Invalid input: Ensure Total Funding > 0, Base Funding >= 0, Unincorporated Funding >= 0, and Cap >= 0 ({0})")]
    InvalidParameters(String),
}

impl InputError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Open { .. } => "io",
            Self::InvalidParameters(_) => "invalid_parameter",
            Self::Empty => "empty_input",
            _ => "invalid_input",
        }
    }
}

/// Parsed recipient table: raw rows for passthrough plus the solver's view
#[derive(Debug, Clone)]
pub struct CenterTable {
    pub headers: Vec<String>,
    pub records: Vec<StringRecord>,
    pub recipients: Vec<Recipient>,
    pub program_names: Option<Vec<String>>,
    pub past_funding: Option<Vec<Option<f64>>>,
}

impl CenterTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }

    pub fn program_name(&self, index: usize) -> Option<&str> {
        self.program_names
            .as_ref()
            .and_then(|names| names.get(index))
            .map(String::as_str)
    }

    pub fn past_funding_at(&self, index: usize) -> Option<f64> {
        self.past_funding
            .as_ref()
            .and_then(|values| values.get(index).copied().flatten())
    }

    /// Sum of `past_funding`, skipping blank cells; `None` without the column
    pub fn historical_total(&self) -> Option<f64> {
        self.past_funding
            .as_ref()
            .map(|values| values.iter().flatten().sum())
    }

    pub fn people_served_total(&self) -> f64 {
        self.recipients.iter().map(|r| r.people_served).sum()
    }
}

pub fn read_centers(path: &Path) -> Result<CenterTable> {
    let file = File::open(path).map_err(|source| InputError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let table = parse_centers(file)?;
    log::debug!("Loaded {} centers from {}", table.len(), path.display());
    Ok(table)
}

pub fn parse_centers<R: io::Read>(reader: R) -> Result<CenterTable> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|col| !headers.iter().any(|h| h == *col))
        .map(|col| col.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(InputError::MissingColumns { missing });
    }

    let column = |name: &str| headers.iter().position(|h| h == name);
    let people_col = column(PEOPLE_SERVED).unwrap_or_default();
    let incentive_col = column(INCENTIVE).unwrap_or_default();
    let cap_col = column(PER_CENTER_CAP);
    let name_col = column(PROGRAM_NAME);
    let past_col = column(PAST_FUNDING);

    let mut records = Vec::new();
    let mut recipients = Vec::new();
    let mut program_names = name_col.map(|_| Vec::new());
    let mut past_funding = past_col.map(|_| Vec::new());

    for (idx, record) in reader.records().enumerate() {
        let record = record?;
        let row = idx + 1;

        let people_served = required_number(&record, people_col, row, PEOPLE_SERVED)?;
        let incentive = required_number(&record, incentive_col, row, INCENTIVE)?;
        let cap = match cap_col {
            Some(col) => optional_number(&record, col, row, PER_CENTER_CAP)?,
            None => None,
        };
        recipients.push(
            Recipient::new(people_served, incentive).with_cap(FundingCap::from_optional(cap)),
        );

        if let (Some(col), Some(names)) = (name_col, program_names.as_mut()) {
            names.push(record.get(col).unwrap_or_default().to_string());
        }
        if let (Some(col), Some(past)) = (past_col, past_funding.as_mut()) {
            past.push(optional_number(&record, col, row, PAST_FUNDING)?);
        }
        records.push(record);
    }

    if records.is_empty() {
        return Err(InputError::Empty);
    }

    Ok(CenterTable {
        headers,
        records,
        recipients,
        program_names,
        past_funding,
    })
}

fn required_number(record: &StringRecord, col: usize, row: usize, column: &str) -> Result<f64> {
    optional_number(record, col, row, column)?.ok_or_else(|| InputError::MissingValue {
        row,
        column: column.to_string(),
    })
}

fn optional_number(
    record: &StringRecord,
    col: usize,
    row: usize,
    column: &str,
) -> Result<Option<f64>> {
    let raw = record.get(col).unwrap_or_default();
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    let value: f64 = raw.parse().map_err(|_| InputError::InvalidNumber {
        row,
        column: column.to_string(),
        value: raw.to_string(),
    })?;
    if !value.is_finite() {
        return Err(InputError::InvalidNumber {
            row,
            column: column.to_string(),
            value: raw.to_string(),
        });
    }
    if value < 0.0 {
        return Err(InputError::NegativeValue {
            row,
            column: column.to_string(),
            value,
        });
    }
    Ok(Some(value))
}

/// Validate the four scalar parameters and build solver parameters
pub fn funding_params(
    total_funding: f64,
    base_funding: f64,
    unincorporated_funding: f64,
    cap: f64,
) -> Result<FundingParams> {
    let mut problems = Vec::new();
    if !(total_funding.is_finite() && total_funding > 0.0) {
        problems.push(format!("total_funding={total_funding}"));
    }
    for (name, value) in [
        ("base_funding", base_funding),
        ("unincorporated_funding", unincorporated_funding),
        ("cap", cap),
    ] {
        if !(value.is_finite() && value >= 0.0) {
            problems.push(format!("{name}={value}"));
        }
    }
    if !problems.is_empty() {
        return Err(InputError::InvalidParameters(problems.join(", ")));
    }

    Ok(FundingParams::new(total_funding)
        .base_funding(base_funding)
        .unincorporated_funding(unincorporated_funding)
        .global_cap(cap))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(text: &str) -> Result<CenterTable> {
        parse_centers(text.as_bytes())
    }

    #[test]
    fn parses_required_and_optional_columns() {
        let table = parse(
            "program_name,people_served,incentive,per_center_cap,past_funding,region\n\
             Oak Grove,100,0,5000,900,north\n\
             Pine Hill,200,1,,1100,south\n\
             Elm Park,50,0,0,,east\n",
        )
        .unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.headers.len(), 6);
        assert_eq!(table.recipients[0].per_center_cap, FundingCap::Limit(5000.0));
        assert_eq!(table.recipients[1].per_center_cap, FundingCap::Unbounded);
        assert_eq!(table.recipients[2].per_center_cap, FundingCap::Unbounded);
        assert_eq!(table.recipients[1].incentive, 1.0);
        assert_eq!(table.program_name(1), Some("Pine Hill"));
        assert_eq!(table.past_funding_at(2), None);
        assert_eq!(table.historical_total(), Some(2000.0));
        assert_eq!(table.people_served_total(), 350.0);
        assert_eq!(&table.records[0][5], "north");
    }

    #[test]
    fn missing_required_columns_are_named() {
        let err = parse("people_served,program_name\n10,A\n").unwrap_err();
        match &err {
            InputError::MissingColumns { missing } => assert_eq!(missing, &vec!["incentive"]),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("'people_served' and 'incentive'"));
        assert_eq!(err.code(), "invalid_input");
    }

    #[test]
    fn blank_required_cell_is_missing_value() {
        let err = parse("people_served,incentive\n10,0\n,1\n").unwrap_err();
        assert!(matches!(
            err,
            InputError::MissingValue { row: 2, ref column } if column == "people_served"
        ));
    }

    #[test]
    fn non_numeric_and_negative_cells_are_rejected() {
        let err = parse("people_served,incentive\nlots,0\n").unwrap_err();
        assert!(matches!(err, InputError::InvalidNumber { row: 1, .. }));

        let err = parse("people_served,incentive\n10,-1\n").unwrap_err();
        assert!(matches!(err, InputError::NegativeValue { value, .. } if value == -1.0));

        let err = parse("people_served,incentive\ninf,0\n").unwrap_err();
        assert!(matches!(err, InputError::InvalidNumber { .. }));
    }

    #[test]
    fn header_only_file_is_empty() {
        let err = parse("people_served,incentive\n").unwrap_err();
        assert!(matches!(err, InputError::Empty));
        assert_eq!(err.code(), "empty_input");
    }

    #[test]
    fn ragged_rows_are_csv_errors() {
        let err = parse("people_served,incentive\n10,0,extra\n").unwrap_err();
        assert!(matches!(err, InputError::Csv(_)));
    }

    #[test]
    fn table_without_history_has_no_historical_total() {
        let table = parse("people_served,incentive\n1,0\n").unwrap();
        assert_eq!(table.historical_total(), None);
        assert_eq!(table.program_name(0), None);
    }

    #[test]
    fn funding_params_validation() {
        let params = funding_params(1000.0, 10.0, 5.0, 0.0).unwrap();
        assert_eq!(params.global_cap, FundingCap::Unbounded);
        assert_eq!(params.base_funding, 10.0);

        let err = funding_params(0.0, -1.0, 0.0, 0.0).unwrap_err();
        assert_eq!(err.code(), "invalid_parameter");
        let message = err.to_string();
        assert!(message.contains("total_funding=0"));
        assert!(message.contains("base_funding=-1"));
    }
}
