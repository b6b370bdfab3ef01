//! Per-dimension standardization of feature matrices

/// Zero mean, unit variance per column. Constant columns keep a scale of 1.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    /// Fit on `rows`, which must all share one length
    pub fn fit(rows: &[Vec<f64>]) -> Option<Self> {
        let dim = rows.first()?.len();
        if rows.iter().any(|r| r.len() != dim) {
            return None;
        }

        let n = rows.len() as f64;
        let mut mean = vec![0.0; dim];
        for row in rows {
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut variance = vec![0.0; dim];
        for row in rows {
            for ((var, v), m) in variance.iter_mut().zip(row).zip(&mean) {
                *var += (v - m) * (v - m);
            }
        }

        let scale = variance
            .into_iter()
            .map(|var| {
                let std = (var / n).sqrt();
                if std > f64::EPSILON {
                    std
                } else {
                    1.0
                }
            })
            .collect();

        Some(Self { mean, scale })
    }

    pub fn transform(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.iter()
            .map(|row| {
                row.iter()
                    .zip(&self.mean)
                    .zip(&self.scale)
                    .map(|((v, m), s)| (v - m) / s)
                    .collect()
            })
            .collect()
    }

    pub fn fit_transform(rows: &[Vec<f64>]) -> Option<Vec<Vec<f64>>> {
        Some(Self::fit(rows)?.transform(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_are_standardized() {
        let rows = vec![vec![1.0, 10.0], vec![3.0, 10.0], vec![5.0, 10.0]];
        let scaled = StandardScaler::fit_transform(&rows).unwrap();

        let std = (8.0f64 / 3.0).sqrt();
        assert!((scaled[0][0] + 2.0 / std).abs() < 1e-12);
        assert!(scaled[1][0].abs() < 1e-12);
        assert!((scaled[2][0] - 2.0 / std).abs() < 1e-12);

        // constant column centers to zero instead of dividing by zero
        assert!(scaled.iter().all(|r| r[1] == 0.0));
    }

    #[test]
    fn test_single_row_becomes_zeros() {
        let scaled = StandardScaler::fit_transform(&[vec![4.0, 2.0, 9.0]]).unwrap();
        assert_eq!(scaled, vec![vec![0.0, 0.0, 0.0]]);
    }

    #[test]
    fn test_empty_or_ragged_input() {
        assert!(StandardScaler::fit(&[]).is_none());
        assert!(StandardScaler::fit(&[vec![1.0], vec![1.0, 2.0]]).is_none());
    }
}
