//! Raw CSV row parsing for case files and economic payloads.
//!
//! Case files: `date,county,state,fips,cases,deaths` (counties) and
//! `date,state,fips,cases,deaths` (states). Economic payloads: a header row,
//! then `date,value` with `.` marking a missing observation.

use super::provider::DataError;
use super::sources::EconomicSourceSpec;
use crate::domain::{EconomicSeries, RegionKey};
use chrono::NaiveDate;
use serde::Deserialize;

/// One parsed case/death row, before grouping.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseRow {
    pub date: NaiveDate,
    pub key: RegionKey,
    pub cases: u64,
    pub deaths: u64,
}

#[derive(Debug, Deserialize)]
struct CountyRecord {
    date: NaiveDate,
    county: String,
    state: String,
    cases: u64,
    deaths: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct StateRecord {
    date: NaiveDate,
    state: String,
    cases: u64,
    deaths: Option<u64>,
}

/// Parse the county-level case file.
pub fn parse_county_rows(bytes: &[u8], file: &str) -> Result<Vec<CaseRow>, DataError> {
    let mut reader = csv::Reader::from_reader(bytes);
    let mut rows = Vec::new();
    for (i, record) in reader.deserialize::<CountyRecord>().enumerate() {
        let r = record.map_err(|e| parse_error(file, i, e))?;
        rows.push(CaseRow {
            date: r.date,
            key: RegionKey::county(r.county, r.state),
            cases: r.cases,
            deaths: r.deaths.unwrap_or(0),
        });
    }
    Ok(rows)
}

/// Parse the state-level case file.
pub fn parse_state_rows(bytes: &[u8], file: &str) -> Result<Vec<CaseRow>, DataError> {
    let mut reader = csv::Reader::from_reader(bytes);
    let mut rows = Vec::new();
    for (i, record) in reader.deserialize::<StateRecord>().enumerate() {
        let r = record.map_err(|e| parse_error(file, i, e))?;
        rows.push(CaseRow {
            date: r.date,
            key: RegionKey::state(r.state),
            cases: r.cases,
            deaths: r.deaths.unwrap_or(0),
        });
    }
    Ok(rows)
}

/// Parse a two-column economic payload and apply the source's transform.
///
/// The header names are ignored (FRED has used both `DATE` and
/// `observation_date`). Output is sorted by date.
pub fn parse_economic(bytes: &[u8], spec: &EconomicSourceSpec) -> Result<EconomicSeries, DataError> {
    let mut reader = csv::Reader::from_reader(bytes);
    let mut pairs = Vec::new();

    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(|e| parse_error(&spec.code, i, e))?;
        let date_field = record.get(0).unwrap_or("").trim();
        let value_field = record.get(1).unwrap_or("").trim();

        if value_field.is_empty() || value_field == "." {
            continue;
        }

        let date = NaiveDate::parse_from_str(date_field, "%Y-%m-%d")
            .map_err(|e| parse_error(&spec.code, i, format!("date '{date_field}': {e}")))?;
        let value: f64 = value_field
            .parse()
            .map_err(|e| parse_error(&spec.code, i, format!("value '{value_field}': {e}")))?;

        pairs.push((date, spec.transform.apply(value)));
    }

    pairs.sort_by_key(|(date, _)| *date);
    Ok(EconomicSeries::from_pairs(pairs))
}

/// Row numbers are 1-based and count the header line.
fn parse_error(file: &str, index: usize, reason: impl ToString) -> DataError {
    DataError::Parse {
        file: file.to_string(),
        row: index + 2,
        reason: reason.to_string(),
    }
}
