//! Нормализация данных

#![allow(non_snake_case)]

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{PreprocessingError, Result};

/// Стандартизация по колонкам: (X - mean) / std
///
/// С `with_mean = false` центрирование не выполняется, нули остаются нулями
/// (нужно для one-hot индикаторов).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataNormalizer {
    with_mean: bool,
    mean: Option<Array1<f64>>,
    std: Option<Array1<f64>>,
    is_fitted: bool,
}

impl DataNormalizer {
    pub fn new() -> Self {
        Self {
            with_mean: true,
            mean: None,
            std: None,
            is_fitted: false,
        }
    }

    pub fn without_mean() -> Self {
        Self {
            with_mean: false,
            ..Self::new()
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    pub fn mean(&self) -> Option<&Array1<f64>> {
        self.mean.as_ref()
    }

    pub fn scale(&self) -> Option<&Array1<f64>> {
        self.std.as_ref()
    }

    pub fn fit(&mut self, X: &Array2<f64>) -> Result<()> {
        if X.nrows() == 0 {
            return Err(PreprocessingError::fit("Empty dataset"));
        }
        if X.iter().any(|v| !v.is_finite()) {
            return Err(PreprocessingError::fit(
                "Normalizer input contains NaN or infinite values",
            ));
        }

        // Среднее и стандартное отклонение (ddof = 0) по каждому признаку
        self.mean = Some(
            X.mean_axis(Axis(0))
                .ok_or_else(|| PreprocessingError::fit("Failed to compute mean"))?,
        );
        self.std = Some(X.std_axis(Axis(0), 0.0));

        // Избегаем деления на ноль
        if let Some(ref mut std) = self.std {
            for val in std.iter_mut() {
                if *val < 1e-10 {
                    *val = 1.0;
                }
            }
        }

        self.is_fitted = true;
        Ok(())
    }

    pub fn transform(&self, X: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(PreprocessingError::fit("Normalizer not fitted"));
        }

        let mean = self
            .mean
            .as_ref()
            .ok_or_else(|| PreprocessingError::fit("Mean not computed"))?;
        let std = self
            .std
            .as_ref()
            .ok_or_else(|| PreprocessingError::fit("Std not computed"))?;

        if X.ncols() != std.len() {
            return Err(PreprocessingError::schema(format!(
                "Normalizer expects {} features, got {}",
                std.len(),
                X.ncols()
            )));
        }

        let mut normalized = X.clone();
        for mut row in normalized.rows_mut() {
            for (i, val) in row.iter_mut().enumerate() {
                if self.with_mean {
                    *val -= mean[i];
                }
                *val /= std[i];
            }
        }

        Ok(normalized)
    }

    pub fn fit_transform(&mut self, X: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(X)?;
        self.transform(X)
    }
}

impl Default for DataNormalizer {
    fn default() -> Self {
        Self::new()
    }
}
