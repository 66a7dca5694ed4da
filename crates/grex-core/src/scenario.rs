//! Scenario matrix for scenario-indexed OPF.
//!
//! Each row is one observation: a joint draw of demand multipliers (addressed
//! by bus area id) and generator availability multipliers (addressed by the
//! generator's series id). The last column holds the observation weight.

use crate::error::{NetworkError, NetworkResult};
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSet {
    rows: Vec<Vec<f64>>,
    series: usize,
}

impl ScenarioSet {
    /// Validate a rectangular observation × (series + weight) matrix.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> NetworkResult<Self> {
        let width = rows
            .first()
            .map(Vec::len)
            .ok_or_else(|| NetworkError::Scenario("scenario matrix has no observations".into()))?;
        if width < 2 {
            return Err(NetworkError::Scenario(format!(
                "scenario matrix needs at least one series and a weight column, got {width} column(s)"
            )));
        }
        for (i, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(NetworkError::Scenario(format!(
                    "observation {i} has {} columns, expected {width}",
                    row.len()
                )));
            }
            if let Some(v) = row.iter().find(|v| !v.is_finite()) {
                return Err(NetworkError::Scenario(format!(
                    "observation {i} holds non-finite value {v}"
                )));
            }
            if row[width - 1] < 0.0 {
                return Err(NetworkError::Scenario(format!(
                    "observation {i} has negative weight {}",
                    row[width - 1]
                )));
            }
        }
        Ok(Self {
            rows,
            series: width - 1,
        })
    }

    /// Read headerless comma-separated numbers.
    pub fn from_csv_reader<R: Read>(reader: R) -> NetworkResult<Self> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(false)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut rows = Vec::new();
        for (i, record) in rdr.records().enumerate() {
            let record = record
                .map_err(|e| NetworkError::Scenario(format!("reading observation {i}: {e}")))?;
            let row = record
                .iter()
                .map(|field| {
                    field.parse::<f64>().map_err(|e| {
                        NetworkError::Scenario(format!("observation {i}: '{field}': {e}"))
                    })
                })
                .collect::<NetworkResult<Vec<f64>>>()?;
            rows.push(row);
        }
        Self::from_rows(rows)
    }

    pub fn from_csv_path(path: impl AsRef<Path>) -> NetworkResult<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| {
            NetworkError::Scenario(format!("opening scenario file {}: {e}", path.display()))
        })?;
        Self::from_csv_reader(file)
    }

    pub fn observations(&self) -> usize {
        self.rows.len()
    }

    /// Number of series columns (weight excluded).
    pub fn series_count(&self) -> usize {
        self.series
    }

    pub fn weight(&self, observation: usize) -> Option<f64> {
        self.rows.get(observation).map(|r| r[self.series])
    }

    pub fn weights(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r[self.series]).collect()
    }

    /// Multiplier of `series` in `observation`; `None` when out of range.
    pub fn value(&self, observation: usize, series: usize) -> Option<f64> {
        if series >= self.series {
            return None;
        }
        self.rows.get(observation).map(|r| r[series])
    }

    /// Availability multiplier for an optional generator series (1 when absent).
    pub fn availability(&self, observation: usize, series: Option<usize>) -> Option<f64> {
        match series {
            Some(s) => self.value(observation, s),
            None => Some(1.0),
        }
    }

    /// Copy without the observations whose weight is zero.
    pub fn without_zero_weight(&self) -> NetworkResult<Self> {
        let rows = self
            .rows
            .iter()
            .filter(|r| r[self.series] != 0.0)
            .cloned()
            .collect();
        Self::from_rows(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rows_splits_weight_column() {
        let set = ScenarioSet::from_rows(vec![vec![1.0, 0.5, 0.25], vec![0.8, 1.0, 0.75]]).unwrap();
        assert_eq!(set.observations(), 2);
        assert_eq!(set.series_count(), 2);
        assert_eq!(set.weights(), vec![0.25, 0.75]);
        assert_eq!(set.value(1, 0), Some(0.8));
        assert_eq!(set.value(1, 2), None);
        assert_eq!(set.availability(0, None), Some(1.0));
    }

    #[test]
    fn test_ragged_matrix_rejected() {
        let err = ScenarioSet::from_rows(vec![vec![1.0, 1.0], vec![1.0]]).unwrap_err();
        assert!(matches!(err, NetworkError::Scenario(_)));
    }

    #[test]
    fn test_csv_reader_parses_headerless_rows() {
        let data = "1.0, 0.9, 0.5\n0.7, 1.0, 0.5\n";
        let set = ScenarioSet::from_csv_reader(data.as_bytes()).unwrap();
        assert_eq!(set.observations(), 2);
        assert_eq!(set.value(0, 1), Some(0.9));
    }

    #[test]
    fn test_zero_weight_filter() {
        let set = ScenarioSet::from_rows(vec![vec![1.0, 0.0], vec![0.5, 1.0]]).unwrap();
        let kept = set.without_zero_weight().unwrap();
        assert_eq!(kept.observations(), 1);
        assert_eq!(kept.value(0, 0), Some(0.5));
    }
}
