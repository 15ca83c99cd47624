//! Data quality checks over a [`Dataset`].
//!
//! Each check is independent and stateless and returns a [`CheckOutcome`]:
//! either [`CheckOutcome::Clean`] or one summary row per offending column or
//! value.

use super::dataset::{Dataset, Value, ValueKind};
use crate::error::{Error, Result};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::info;

/// Summary row type of a check.
pub trait IssueRow: fmt::Display {
    /// Message rendered when nothing was found.
    const CLEAN_MESSAGE: &'static str;
}

/// Result of a single check.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "issues", rename_all = "lowercase")]
pub enum CheckOutcome<T> {
    Clean,
    Issues(Vec<T>),
}

impl<T> CheckOutcome<T> {
    fn from_rows(rows: Vec<T>) -> Self {
        if rows.is_empty() {
            CheckOutcome::Clean
        } else {
            CheckOutcome::Issues(rows)
        }
    }

    pub fn is_clean(&self) -> bool {
        matches!(self, CheckOutcome::Clean)
    }

    pub fn issues(&self) -> &[T] {
        match self {
            CheckOutcome::Clean => &[],
            CheckOutcome::Issues(rows) => rows,
        }
    }
}

impl<T: IssueRow> fmt::Display for CheckOutcome<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckOutcome::Clean => f.write_str(T::CLEAN_MESSAGE),
            CheckOutcome::Issues(rows) => {
                for row in rows {
                    writeln!(f, "{row}")?;
                }
                Ok(())
            }
        }
    }
}

/// Column with at least one missing cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingColumn {
    pub column: String,
    pub missing_values: usize,
    /// Relative to the row count
    pub percentage_missing: f64,
}

impl IssueRow for MissingColumn {
    const CLEAN_MESSAGE: &'static str = "Success: No missing values.";
}

impl fmt::Display for MissingColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} missing ({:.2}%)",
            self.column, self.missing_values, self.percentage_missing
        )
    }
}

/// First-column value shared by duplicated rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateGroup {
    pub column: String,
    pub value: Value,
    pub number_of_duplicates: usize,
}

impl IssueRow for DuplicateGroup {
    const CLEAN_MESSAGE: &'static str = "Success: No duplicated values.";
}

impl fmt::Display for DuplicateGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}={}: {} duplicates",
            self.column, self.value, self.number_of_duplicates
        )
    }
}

/// Column whose cells carry more than one value kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MixedTypeColumn {
    pub column: String,
    pub data_types: Vec<ValueKind>,
    pub number_of_data_types: usize,
}

impl IssueRow for MixedTypeColumn {
    const CLEAN_MESSAGE: &'static str = "Success: Data types per column are uniform.";
}

impl fmt::Display for MixedTypeColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kinds: Vec<String> = self.data_types.iter().map(ToString::to_string).collect();
        write!(
            f,
            "{}: {} types [{}]",
            self.column,
            self.number_of_data_types,
            kinds.join(", ")
        )
    }
}

/// Anomaly count for one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalySummary {
    pub column: String,
    pub number_of_anomalies: usize,
}

impl IssueRow for AnomalySummary {
    const CLEAN_MESSAGE: &'static str = "Success: No anomalies detected.";
}

impl fmt::Display for AnomalySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} anomalies", self.column, self.number_of_anomalies)
    }
}

/// Per-column missing counts; percentage is relative to the row count.
pub fn check_missing_data(dataset: &Dataset) -> CheckOutcome<MissingColumn> {
    let rows = dataset.n_rows();
    let issues = dataset
        .columns()
        .iter()
        .filter_map(|column| {
            let missing = column.missing_count();
            (missing > 0).then(|| MissingColumn {
                column: column.name().to_string(),
                missing_values: missing,
                percentage_missing: missing as f64 / rows as f64 * 100.0,
            })
        })
        .collect();
    CheckOutcome::from_rows(issues)
}

/// Missing cells as a percentage of all cells. `0.0` for an empty dataset.
pub fn get_total_missing_percentage(dataset: &Dataset) -> f64 {
    let size = dataset.size();
    if size == 0 {
        return 0.0;
    }
    let missing: usize = dataset.columns().iter().map(|c| c.missing_count()).sum();
    missing as f64 / size as f64 * 100.0
}

/// Rows repeating an earlier row, summarized by first-column value.
///
/// The count for a value is the number of rows carrying it that belong to a
/// duplicated group, first occurrences included.
pub fn check_duplicates(dataset: &Dataset) -> CheckOutcome<DuplicateGroup> {
    let Some(first_column) = dataset.columns().first() else {
        return CheckOutcome::Clean;
    };

    let mut occurrences: HashMap<Vec<&Value>, usize> = HashMap::new();
    for i in 0..dataset.n_rows() {
        *occurrences.entry(dataset.row(i)).or_insert(0) += 1;
    }

    // (first-column value, count) in order of first appearance
    let mut groups: Vec<(&Value, usize)> = Vec::new();
    let mut seen_rows: HashSet<Vec<&Value>> = HashSet::new();
    for i in 0..dataset.n_rows() {
        let row = dataset.row(i);
        let count = occurrences[&row];
        if count < 2 || !seen_rows.insert(row) {
            continue;
        }
        let key = &first_column.values()[i];
        match groups.iter_mut().find(|g| g.0 == key) {
            Some(group) => group.1 += count,
            None => groups.push((key, count)),
        }
    }

    let issues = groups
        .into_iter()
        .map(|(value, count)| DuplicateGroup {
            column: first_column.name().to_string(),
            value: value.clone(),
            number_of_duplicates: count,
        })
        .collect();
    CheckOutcome::from_rows(issues)
}

/// Columns whose non-missing cells span more than one value kind.
pub fn check_data_types(dataset: &Dataset) -> CheckOutcome<MixedTypeColumn> {
    let issues = dataset
        .columns()
        .iter()
        .filter_map(|column| {
            let mut kinds: Vec<ValueKind> = Vec::new();
            for value in column.values().iter().filter(|v| !v.is_missing()) {
                if !kinds.contains(&value.kind()) {
                    kinds.push(value.kind());
                }
            }
            (kinds.len() > 1).then(|| MixedTypeColumn {
                column: column.name().to_string(),
                number_of_data_types: kinds.len(),
                data_types: kinds,
            })
        })
        .collect();
    CheckOutcome::from_rows(issues)
}

/// Names of columns declared `int64` or `float64`.
pub fn get_numeric_columns(dataset: &Dataset) -> Vec<String> {
    dataset
        .columns()
        .iter()
        .filter(|c| c.dtype().is_numeric())
        .map(|c| c.name().to_string())
        .collect()
}

/// Count out-of-range values in a numeric column.
///
/// With both bounds, anomalies are values outside `[lower, upper]`. With
/// either bound absent, anomalies are cells that are not numbers at all.
/// Missing cells are never anomalies.
pub fn check_numeric_anomalies(
    dataset: &Dataset,
    column: &str,
    lower_bound: Option<f64>,
    upper_bound: Option<f64>,
) -> Result<CheckOutcome<AnomalySummary>> {
    let col = dataset.column(column)?;
    if !col.dtype().is_numeric() {
        return Err(Error::NonNumericColumn {
            column: column.to_string(),
            dtype: col.dtype(),
        });
    }

    let present = col.values().iter().filter(|v| !v.is_missing());
    let anomalies = match (lower_bound, upper_bound) {
        (Some(lower), Some(upper)) => present
            .filter(|v| v.as_f64().is_some_and(|x| x < lower || x > upper))
            .count(),
        _ => present.filter(|v| !v.is_numeric()).count(),
    };

    Ok(CheckOutcome::from_rows(if anomalies > 0 {
        vec![AnomalySummary {
            column: column.to_string(),
            number_of_anomalies: anomalies,
        }]
    } else {
        Vec::new()
    }))
}

/// All table-wide checks in one pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityReport {
    pub rows: usize,
    pub columns: usize,
    pub total_missing_percentage: f64,
    pub missing: CheckOutcome<MissingColumn>,
    pub duplicates: CheckOutcome<DuplicateGroup>,
    pub data_types: CheckOutcome<MixedTypeColumn>,
    pub numeric_columns: Vec<String>,
}

impl QualityReport {
    pub fn is_clean(&self) -> bool {
        self.missing.is_clean() && self.duplicates.is_clean() && self.data_types.is_clean()
    }
}

/// Run every table-wide check and log a one-line summary.
pub fn inspect(dataset: &Dataset) -> QualityReport {
    let report = QualityReport {
        rows: dataset.n_rows(),
        columns: dataset.n_cols(),
        total_missing_percentage: get_total_missing_percentage(dataset),
        missing: check_missing_data(dataset),
        duplicates: check_duplicates(dataset),
        data_types: check_data_types(dataset),
        numeric_columns: get_numeric_columns(dataset),
    };

    info!(
        rows = report.rows,
        columns = report.columns,
        missing_pct = report.total_missing_percentage,
        missing_columns = report.missing.issues().len(),
        duplicate_groups = report.duplicates.issues().len(),
        mixed_type_columns = report.data_types.issues().len(),
        "Data quality inspection complete"
    );

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::{Column, DataType};
    use serde_json::json;

    fn records(values: serde_json::Value) -> Dataset {
        Dataset::from_records(values.as_array().unwrap()).unwrap()
    }

    #[test]
    fn test_missing_data_summary() {
        let ds = records(json!([
            {"a": 1, "b": null},
            {"a": 2, "b": "x"},
            {"a": null, "b": null},
            {"a": 4, "b": "y"}
        ]));

        let outcome = check_missing_data(&ds);
        let issues = outcome.issues();
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].column, "a");
        assert_eq!(issues[0].missing_values, 1);
        assert_eq!(issues[0].percentage_missing, 25.0);
        assert_eq!(issues[1].missing_values, 2);
        assert_eq!(issues[1].percentage_missing, 50.0);
    }

    #[test]
    fn test_no_missing_data() {
        let ds = records(json!([{"a": 1}, {"a": 2}]));
        let outcome = check_missing_data(&ds);
        assert!(outcome.is_clean());
        assert_eq!(outcome.to_string(), "Success: No missing values.");
        assert_eq!(get_total_missing_percentage(&ds), 0.0);
    }

    #[test]
    fn test_total_missing_percentage() {
        let all_missing = records(json!([{"a": null, "b": null}, {"a": null, "b": null}]));
        assert_eq!(get_total_missing_percentage(&all_missing), 100.0);

        // 1 of 6 cells missing, NaN included
        let ds = Dataset::new(vec![
            Column::new("a", vec![Value::Int(1), Value::Int(2), Value::Int(3)]),
            Column::new("b", vec![Value::Float(1.0), Value::Float(f64::NAN), Value::Float(0.5)]),
        ])
        .unwrap();
        assert!((get_total_missing_percentage(&ds) - 100.0 / 6.0).abs() < 1e-9);

        assert_eq!(get_total_missing_percentage(&Dataset::default()), 0.0);
    }

    #[test]
    fn test_duplicates_reported_by_first_column() {
        let ds = records(json!([{"id": 1}, {"id": 1}, {"id": 2}]));
        let outcome = check_duplicates(&ds);

        assert_eq!(
            outcome.issues(),
            &[DuplicateGroup {
                column: "id".to_string(),
                value: Value::Int(1),
                number_of_duplicates: 2,
            }]
        );
    }

    #[test]
    fn test_no_duplicates() {
        let ds = records(json!([{"id": 1, "v": "a"}, {"id": 1, "v": "b"}, {"id": 2, "v": "a"}]));
        let outcome = check_duplicates(&ds);
        assert!(outcome.is_clean());
        assert_eq!(outcome.to_string(), "Success: No duplicated values.");
    }

    #[test]
    fn test_duplicates_grouped_across_distinct_rows() {
        let ds = records(json!([
            {"id": 7, "v": "a"},
            {"id": 3, "v": "z"},
            {"id": 7, "v": "a"},
            {"id": 7, "v": "b"},
            {"id": 7, "v": "b"},
            {"id": 3, "v": "z"},
            {"id": 3, "v": "z"}
        ]));
        let issues = check_duplicates(&ds);
        let summary: Vec<(Value, usize)> = issues
            .issues()
            .iter()
            .map(|g| (g.value.clone(), g.number_of_duplicates))
            .collect();
        assert_eq!(summary, vec![(Value::Int(7), 4), (Value::Int(3), 3)]);
    }

    #[test]
    fn test_duplicate_rows_with_missing_cells() {
        let ds = records(json!([{"id": 1, "v": null}, {"id": 1, "v": null}]));
        assert_eq!(check_duplicates(&ds).issues().len(), 1);
    }

    #[test]
    fn test_mixed_data_types() {
        let ds = records(json!([
            {"a": 1, "b": "x", "c": 1},
            {"a": "two", "b": "y", "c": 2.5},
            {"a": 3, "b": null, "c": null}
        ]));

        let outcome = check_data_types(&ds);
        let issues = outcome.issues();
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].column, "a");
        assert_eq!(issues[0].data_types, vec![ValueKind::Integer, ValueKind::String]);
        assert_eq!(issues[0].number_of_data_types, 2);
        assert_eq!(issues[1].column, "c");
    }

    #[test]
    fn test_uniform_data_types() {
        let ds = records(json!([{"a": 1, "b": "x"}, {"a": 2, "b": null}]));
        let outcome = check_data_types(&ds);
        assert_eq!(outcome.to_string(), "Success: Data types per column are uniform.");
    }

    #[test]
    fn test_numeric_columns() {
        let ds = records(json!([
            {"id": 1, "name": "a", "score": 0.5, "flag": true},
            {"id": 2, "name": "b", "score": 1, "flag": false}
        ]));
        assert_eq!(get_numeric_columns(&ds), vec!["id", "score"]);
    }

    #[test]
    fn test_numeric_anomalies_with_bounds() {
        let ds = records(json!([{"v": 5}, {"v": 150}, {"v": -3}, {"v": 50}]));
        let outcome = check_numeric_anomalies(&ds, "v", Some(0.0), Some(100.0)).unwrap();
        assert_eq!(
            outcome.issues(),
            &[AnomalySummary {
                column: "v".to_string(),
                number_of_anomalies: 2,
            }]
        );
    }

    #[test]
    fn test_numeric_anomalies_clean() {
        let ds = records(json!([{"v": 5}, {"v": null}, {"v": 50}]));
        let outcome = check_numeric_anomalies(&ds, "v", Some(0.0), Some(100.0)).unwrap();
        assert_eq!(outcome.to_string(), "Success: No anomalies detected.");
    }

    #[test]
    fn test_numeric_anomalies_without_bounds_checks_kinds() {
        let ds = Dataset::new(vec![Column::with_dtype(
            "v",
            DataType::Float64,
            vec![Value::Float(1.0), Value::from("oops"), Value::Null, Value::Int(2)],
        )])
        .unwrap();

        let outcome = check_numeric_anomalies(&ds, "v", None, None).unwrap();
        assert_eq!(outcome.issues()[0].number_of_anomalies, 1);

        // a single bound falls back to the kind check
        let outcome = check_numeric_anomalies(&ds, "v", Some(0.0), None).unwrap();
        assert_eq!(outcome.issues()[0].number_of_anomalies, 1);
    }

    #[test]
    fn test_numeric_anomalies_errors() {
        let ds = records(json!([{"v": 1, "s": "a"}]));
        assert!(matches!(
            check_numeric_anomalies(&ds, "s", None, None),
            Err(Error::NonNumericColumn { .. })
        ));
        assert!(matches!(
            check_numeric_anomalies(&ds, "missing", None, None),
            Err(Error::UnknownColumn(_))
        ));
    }

    #[test]
    fn test_inspect_report() {
        let ds = records(json!([{"id": 1, "v": 2}, {"id": 1, "v": 2}, {"id": 2, "v": null}]));
        let report = inspect(&ds);

        assert_eq!(report.rows, 3);
        assert_eq!(report.columns, 2);
        assert!(!report.is_clean());
        assert_eq!(report.missing.issues().len(), 1);
        assert_eq!(report.duplicates.issues().len(), 1);
        assert!(report.data_types.is_clean());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["data_types"]["status"], "clean");
        assert_eq!(json["duplicates"]["status"], "issues");
    }
}
