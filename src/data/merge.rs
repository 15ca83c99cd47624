//! Daily event counts joined onto a date-indexed target table

use super::dataset::{Column, DataType, Dataset, Value};
use crate::convert::parse_timestamp;
use crate::error::{Error, Result};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use tracing::debug;

/// Parse every cell of a date column. Missing cells stay `None`.
fn parse_dates(dataset: &Dataset, column: &str) -> Result<Vec<Option<NaiveDateTime>>> {
    dataset
        .column(column)?
        .values()
        .iter()
        .map(|value| match value {
            v if v.is_missing() => Ok(None),
            Value::DateTime(dt) => Ok(Some(*dt)),
            Value::Str(s) => parse_timestamp(s).map(Some),
            other => Err(Error::invalid_input(format!(
                "column `{column}` holds {} value `{other}`, expected a date",
                other.kind()
            ))),
        })
        .collect()
}

/// Count `counts_source` rows per calendar day and left-join the counts onto
/// `target` as a new `int64` column named `output_column`.
///
/// Every target row appears exactly once; days without events get `0`. The
/// target date column is replaced by its parsed timestamps and rows are
/// sorted ascending by it, with missing dates last.
pub fn merge_and_sort(
    counts_source: &Dataset,
    target: &Dataset,
    date_col_source: &str,
    date_col_target: &str,
    output_column: &str,
) -> Result<Dataset> {
    if target.column(output_column).is_ok() {
        return Err(Error::invalid_input(format!(
            "target already has a column named `{output_column}`"
        )));
    }

    let mut daily: HashMap<NaiveDate, i64> = HashMap::new();
    for dt in parse_dates(counts_source, date_col_source)?.into_iter().flatten() {
        *daily.entry(dt.date()).or_insert(0) += 1;
    }

    let target_dates = parse_dates(target, date_col_target)?;
    let counts: Vec<Value> = target_dates
        .iter()
        .map(|dt| {
            let count = dt.and_then(|d| daily.get(&d.date()).copied()).unwrap_or(0);
            Value::Int(count)
        })
        .collect();

    let mut merged = target.clone();
    merged.set_column(Column::with_dtype(
        date_col_target,
        DataType::DateTime,
        target_dates
            .iter()
            .map(|dt| dt.map_or(Value::Null, Value::DateTime))
            .collect(),
    ))?;
    merged.set_column(Column::with_dtype(output_column, DataType::Int64, counts))?;

    let mut order: Vec<usize> = (0..merged.n_rows()).collect();
    order.sort_by_key(|&i| (target_dates[i].is_none(), target_dates[i]));

    debug!(
        source_rows = counts_source.n_rows(),
        target_rows = target.n_rows(),
        days_with_events = daily.len(),
        "Merged daily counts"
    );

    Ok(merged.take(&order))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records(values: serde_json::Value) -> Dataset {
        Dataset::from_records(values.as_array().unwrap()).unwrap()
    }

    fn counts_of(ds: &Dataset, column: &str) -> Vec<i64> {
        ds.column(column)
            .unwrap()
            .values()
            .iter()
            .map(|v| v.as_i64().unwrap())
            .collect()
    }

    #[test]
    fn test_merge_fills_missing_days_with_zero() {
        let events = records(json!([
            {"posted": "2024-01-01 09:00:00"},
            {"posted": "2024-01-01 12:30:00"},
            {"posted": "2024-01-01"},
            {"posted": "2024-01-03 23:59:59"}
        ]));
        let target = records(json!([
            {"date": "2024-01-03", "price": 3.0},
            {"date": "2024-01-01", "price": 1.0},
            {"date": "2024-01-02", "price": 2.0}
        ]));

        let merged = merge_and_sort(&events, &target, "posted", "date", "post_count").unwrap();

        assert_eq!(merged.column_names(), vec!["date", "price", "post_count"]);
        assert_eq!(counts_of(&merged, "post_count"), vec![3, 0, 1]);
        assert_eq!(merged.column("post_count").unwrap().dtype(), DataType::Int64);

        let prices: Vec<f64> = merged
            .column("price")
            .unwrap()
            .values()
            .iter()
            .map(|v| v.as_f64().unwrap())
            .collect();
        assert_eq!(prices, vec![1.0, 2.0, 3.0]);

        let date = merged.column("date").unwrap();
        assert_eq!(date.dtype(), DataType::DateTime);
        assert_eq!(
            date.values()[0].as_datetime().unwrap().date(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        );
    }

    #[test]
    fn test_merge_keeps_every_target_row() {
        let events = records(json!([{"d": "2024-02-01"}]));
        let target = records(json!([
            {"d": "2024-02-01"},
            {"d": "2024-02-01"},
            {"d": null},
            {"d": "2024-01-15"}
        ]));

        let merged = merge_and_sort(&events, &target, "d", "d", "n").unwrap();
        assert_eq!(merged.n_rows(), 4);
        assert_eq!(counts_of(&merged, "n"), vec![0, 1, 1, 0]);
        assert!(merged.column("d").unwrap().values()[3].is_missing());
    }

    #[test]
    fn test_merge_with_empty_source() {
        let events = records(json!([{"d": null}]));
        let target = records(json!([{"d": "2024-02-01"}]));
        let merged = merge_and_sort(&events, &target, "d", "d", "n").unwrap();
        assert_eq!(counts_of(&merged, "n"), vec![0]);
    }

    #[test]
    fn test_merge_errors() {
        let events = records(json!([{"d": "2024-02-01"}]));
        let target = records(json!([{"d": "2024-02-01", "n": 1}]));

        assert!(matches!(
            merge_and_sort(&events, &target, "missing", "d", "count"),
            Err(Error::UnknownColumn(_))
        ));
        assert!(matches!(
            merge_and_sort(&events, &target, "d", "d", "n"),
            Err(Error::InvalidInput(_))
        ));

        let bad = records(json!([{"d": "someday"}]));
        assert!(merge_and_sort(&bad, &target, "d", "d", "count").is_err());

        let numeric = records(json!([{"d": 20240201}]));
        assert!(merge_and_sort(&numeric, &target, "d", "d", "count").is_err());
    }
}
