//! Standard (z-score) feature scaling

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Per-column mean and standard deviation learned from training rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    means: Vec<f64>,
    /// Population std; zero-variance columns store 1.0
    scales: Vec<f64>,
}

impl StandardScaler {
    /// Learn column statistics from `x` (rows of equal width)
    pub fn fit(x: &[Vec<f64>]) -> Result<Self> {
        let width = check_matrix(x)?;
        let n = x.len() as f64;

        let means: Vec<f64> = (0..width)
            .map(|j| x.iter().map(|row| row[j]).sum::<f64>() / n)
            .collect();
        let scales = (0..width)
            .map(|j| {
                let var = x.iter().map(|row| (row[j] - means[j]).powi(2)).sum::<f64>() / n;
                let std = var.sqrt();
                if std > 0.0 && std.is_finite() {
                    std
                } else {
                    1.0
                }
            })
            .collect();

        Ok(Self { means, scales })
    }

    pub fn n_features(&self) -> usize {
        self.means.len()
    }

    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>> {
        if row.len() != self.means.len() {
            return Err(Error::InvalidArgument(format!(
                "scaler expects {} features, got {}",
                self.means.len(),
                row.len()
            )));
        }
        Ok(row
            .iter()
            .zip(self.means.iter().zip(&self.scales))
            .map(|(v, (mean, scale))| (v - mean) / scale)
            .collect())
    }

    pub fn transform(&self, x: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        x.iter().map(|row| self.transform_row(row)).collect()
    }
}

/// Non-empty matrix with equal-width rows; returns the width
pub(crate) fn check_matrix(x: &[Vec<f64>]) -> Result<usize> {
    let width = x
        .first()
        .map(Vec::len)
        .ok_or_else(|| Error::InvalidArgument("empty feature matrix".into()))?;
    if width == 0 || x.iter().any(|row| row.len() != width) {
        return Err(Error::InvalidArgument(
            "feature rows must be non-empty and of equal width".into(),
        ));
    }
    Ok(width)
}
