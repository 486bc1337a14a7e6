//! One-hot кодирование категориальных признаков

use std::collections::BTreeSet;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{PreprocessingError, Result};

/// Поведение для категорий, не встреченных при обучении
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleUnknown {
    /// Все индикаторы признака остаются нулями
    #[default]
    Ignore,
    Error,
}

/// Один индикатор на каждую категорию; категории отсортированы и фиксируются после fit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneHotEncoder {
    columns: Vec<String>,
    handle_unknown: HandleUnknown,
    categories: Option<Vec<Vec<String>>>,
}

impl OneHotEncoder {
    pub fn new(columns: Vec<String>, handle_unknown: HandleUnknown) -> Self {
        Self {
            columns,
            handle_unknown,
            categories: None,
        }
    }

    pub fn categories(&self) -> Option<&[Vec<String>]> {
        self.categories.as_deref()
    }

    pub fn n_features_out(&self) -> usize {
        self.categories
            .as_ref()
            .map(|cats| cats.iter().map(Vec::len).sum())
            .unwrap_or(0)
    }

    /// Имена выходных колонок вида `<колонка>_<категория>`
    pub fn feature_names(&self) -> Vec<String> {
        let Some(categories) = &self.categories else {
            return Vec::new();
        };
        self.columns
            .iter()
            .zip(categories)
            .flat_map(|(name, cats)| cats.iter().map(move |cat| format!("{}_{}", name, cat)))
            .collect()
    }

    fn check_width(&self, data: &[Vec<String>]) -> Result<()> {
        if data.len() != self.columns.len() {
            return Err(PreprocessingError::schema(format!(
                "OneHotEncoder expects {} columns, got {}",
                self.columns.len(),
                data.len()
            )));
        }
        Ok(())
    }

    /// `data` - колонки без пропусков в порядке `columns`
    pub fn fit(&mut self, data: &[Vec<String>]) -> Result<()> {
        self.check_width(data)?;
        if data.first().map_or(true, Vec::is_empty) {
            return Err(PreprocessingError::fit("Cannot fit OneHotEncoder on empty data"));
        }

        let categories: Vec<Vec<String>> = data
            .iter()
            .map(|col| {
                col.iter()
                    .cloned()
                    .collect::<BTreeSet<String>>()
                    .into_iter()
                    .collect()
            })
            .collect();

        self.categories = Some(categories);
        Ok(())
    }

    pub fn transform(&self, data: &[Vec<String>]) -> Result<Array2<f64>> {
        let categories = self
            .categories
            .as_ref()
            .ok_or_else(|| PreprocessingError::fit("OneHotEncoder not fitted"))?;
        self.check_width(data)?;

        let n_rows = data.first().map(Vec::len).unwrap_or(0);
        let mut encoded = Array2::zeros((n_rows, self.n_features_out()));

        let mut offset = 0;
        for ((name, col), cats) in self.columns.iter().zip(data).zip(categories) {
            if col.len() != n_rows {
                return Err(PreprocessingError::schema(format!(
                    "column '{}' has {} rows, expected {}",
                    name,
                    col.len(),
                    n_rows
                )));
            }

            for (row, value) in col.iter().enumerate() {
                match cats.binary_search(value) {
                    Ok(idx) => encoded[[row, offset + idx]] = 1.0,
                    Err(_) if self.handle_unknown == HandleUnknown::Error => {
                        return Err(PreprocessingError::schema(format!(
                            "unknown category '{}' in column '{}'",
                            value, name
                        )));
                    }
                    Err(_) => {
                        tracing::debug!(column = %name, category = %value, "unknown category encoded as zeros");
                    }
                }
            }

            offset += cats.len();
        }

        Ok(encoded)
    }

    pub fn fit_transform(&mut self, data: &[Vec<String>]) -> Result<Array2<f64>> {
        self.fit(data)?;
        self.transform(data)
    }
}
