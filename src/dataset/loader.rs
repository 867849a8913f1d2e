//! CSV loader for the crop recommendation table.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use ndarray::Array2;
use thiserror::Error;

use crate::ml::random_forest::TrainDataset;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Failed to open dataset {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Dataset is missing required column `{column}`")]
    MissingColumn { column: String },
    #[error("Line {line} has no value for column `{column}`")]
    MissingCell { line: u64, column: String },
    #[error("Line {line} column `{column}` is not numeric: {value:?}")]
    InvalidNumber {
        line: u64,
        column: String,
        value: String,
        source: std::num::ParseFloatError,
    },
    #[error("feature matrix shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

/// Feature matrix and label column selected from a CSV table.
#[derive(Debug, Clone)]
pub struct TrainingTable {
    /// Feature column names in matrix column order.
    pub feature_names: Vec<String>,
    /// Shape: `[n_rows][feature_names.len()]`.
    pub x: Array2<f32>,
    /// Raw label per row, aligned with `x`.
    pub labels: Vec<String>,
}

impl TrainingTable {
    /// Number of samples.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Enumerate unique labels in deterministic order.
    pub fn classes(&self) -> Vec<String> {
        self.class_index_map()
            .into_keys()
            .map(str::to_string)
            .collect()
    }

    /// Map each unique label to its index in [`TrainingTable::classes`].
    pub fn class_index_map(&self) -> BTreeMap<&str, usize> {
        let mut map: BTreeMap<&str, usize> =
            self.labels.iter().map(|label| (label.as_str(), 0)).collect();
        for (idx, slot) in map.values_mut().enumerate() {
            *slot = idx;
        }
        map
    }

    /// Encode labels as indices into [`TrainingTable::classes`].
    pub fn encode_labels(&self) -> (Vec<String>, Vec<usize>) {
        let class_map = self.class_index_map();
        let y = self
            .labels
            .iter()
            .map(|label| class_map[label.as_str()])
            .collect();
        let classes = class_map.into_keys().map(str::to_string).collect();
        (classes, y)
    }

    /// Convert into the training representation used by the forest.
    pub fn into_train_dataset(self) -> TrainDataset {
        let (classes, y) = self.encode_labels();
        TrainDataset {
            feature_names: self.feature_names,
            classes,
            x: self.x,
            y,
        }
    }
}

/// Load `features` (in the given order) and `target` from a CSV file with a header row.
pub fn load_training_table(
    path: &Path,
    features: &[&str],
    target: &str,
) -> Result<TrainingTable, DatasetError> {
    let file = File::open(path).map_err(|source| DatasetError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    read_training_table(file, features, target)
}

/// Same as [`load_training_table`] over any reader.
pub fn read_training_table<R: Read>(
    reader: R,
    features: &[&str],
    target: &str,
) -> Result<TrainingTable, DatasetError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);
    let headers = reader.headers()?.clone();
    let column_index = |name: &str| {
        headers
            .iter()
            .position(|header| header == name)
            .ok_or_else(|| DatasetError::MissingColumn {
                column: name.to_string(),
            })
    };
    let feature_idx = features
        .iter()
        .map(|&name| column_index(name))
        .collect::<Result<Vec<_>, _>>()?;
    let target_idx = column_index(target)?;

    let mut values = Vec::new();
    let mut labels = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        // Header is line 1.
        let line = record
            .position()
            .map_or(row as u64 + 2, |position| position.line());
        for (&idx, &name) in feature_idx.iter().zip(features) {
            let cell = record.get(idx).ok_or_else(|| DatasetError::MissingCell {
                line,
                column: name.to_string(),
            })?;
            let value = cell
                .trim()
                .parse::<f32>()
                .map_err(|source| DatasetError::InvalidNumber {
                    line,
                    column: name.to_string(),
                    value: cell.to_string(),
                    source,
                })?;
            values.push(value);
        }
        let label = record
            .get(target_idx)
            .ok_or_else(|| DatasetError::MissingCell {
                line,
                column: target.to_string(),
            })?;
        labels.push(label.to_string());
    }

    let x = Array2::from_shape_vec((labels.len(), features.len()), values)?;
    Ok(TrainingTable {
        feature_names: features.iter().map(|name| name.to_string()).collect(),
        x,
        labels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEATURES: [&str; 3] = ["N", "P", "K"];

    #[test]
    fn selects_columns_by_name_in_requested_order() {
        let csv = "K,label,extra,N,P\n3,rice,x,1,2\n30,maize,y,10,20\n";
        let table = read_training_table(csv.as_bytes(), &FEATURES, "label").unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.feature_names, vec!["N", "P", "K"]);
        assert_eq!(table.x.row(0).to_vec(), vec![1.0, 2.0, 3.0]);
        assert_eq!(table.x.row(1).to_vec(), vec![10.0, 20.0, 30.0]);
        assert_eq!(table.labels, vec!["rice", "maize"]);
    }

    #[test]
    fn missing_feature_column_is_reported() {
        let csv = "N,P,label\n1,2,rice\n";
        let err = read_training_table(csv.as_bytes(), &FEATURES, "label").unwrap_err();
        match err {
            DatasetError::MissingColumn { column } => assert_eq!(column, "K"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_target_column_is_reported() {
        let csv = "N,P,K\n1,2,3\n";
        let err = read_training_table(csv.as_bytes(), &FEATURES, "label").unwrap_err();
        assert!(matches!(err, DatasetError::MissingColumn { column } if column == "label"));
    }

    #[test]
    fn non_numeric_feature_is_rejected() {
        let csv = "N,P,K,label\n1,two,3,rice\n";
        let err = read_training_table(csv.as_bytes(), &FEATURES, "label").unwrap_err();
        assert!(matches!(
            err,
            DatasetError::InvalidNumber { line: 2, ref column, .. } if column == "P"
        ));
    }

    #[test]
    fn invalid_number_reports_file_line() {
        let csv = "N,P,K,label\n1,2,3,rice\n4,5,6,maize\n7,8,x,rice\n";
        let err = read_training_table(csv.as_bytes(), &FEATURES, "label").unwrap_err();
        assert!(matches!(err, DatasetError::InvalidNumber { line: 4, .. }));
        assert!(err.to_string().starts_with("Line 4 column `K`"));
    }

    #[test]
    fn ragged_row_is_a_csv_error() {
        let csv = "N,P,K,label\n1,2,3\n";
        let err = read_training_table(csv.as_bytes(), &FEATURES, "label").unwrap_err();
        assert!(matches!(err, DatasetError::Csv(_)));
    }

    #[test]
    fn header_only_file_yields_empty_table() {
        let csv = "N,P,K,label\n";
        let table = read_training_table(csv.as_bytes(), &FEATURES, "label").unwrap();
        assert!(table.is_empty());
        assert_eq!(table.x.dim(), (0, 3));
    }

    #[test]
    fn labels_encode_against_sorted_classes() {
        let csv = "N,P,K,label\n1,1,1,rice\n2,2,2,apple\n3,3,3,rice\n";
        let table = read_training_table(csv.as_bytes(), &FEATURES, "label").unwrap();
        let (classes, y) = table.encode_labels();
        assert_eq!(classes, vec!["apple", "rice"]);
        assert_eq!(y, vec![1, 0, 1]);
        assert_eq!(
            table.class_index_map().into_iter().collect::<Vec<_>>(),
            vec![("apple", 0), ("rice", 1)]
        );

        let dataset = table.into_train_dataset();
        assert_eq!(dataset.classes, vec!["apple", "rice"]);
        assert_eq!(dataset.y, vec![1, 0, 1]);
        assert_eq!(dataset.x.dim(), (3, 3));
    }

    #[test]
    fn missing_file_reports_path() {
        let path = Path::new("/definitely/not/here.csv");
        let err = load_training_table(path, &FEATURES, "label").unwrap_err();
        match err {
            DatasetError::Open { path: reported, .. } => assert_eq!(reported, path),
            other => panic!("unexpected error: {other}"),
        }
    }
}
