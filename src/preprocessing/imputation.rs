//! Заполнение пропусков статистиками обучающей выборки

#![allow(non_snake_case)]

use std::collections::BTreeMap;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{PreprocessingError, Result};
use crate::types::Table;

/// Медиана непустых значений; для чётного числа - среднее двух центральных
pub fn median(values: &[f64]) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));

    let n = sorted.len();
    if n % 2 == 0 {
        Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0)
    } else {
        Some(sorted[n / 2])
    }
}

/// Самое частое значение; при равенстве - лексикографически меньшее
pub fn most_frequent(values: &[Option<String>]) -> Option<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for value in values.iter().flatten() {
        *counts.entry(value.as_str()).or_insert(0) += 1;
    }

    let mut best: Option<(&str, usize)> = None;
    for (value, count) in counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value.to_string())
}

/// Импутер числовых колонок: пропуски (NaN) заменяются медианой
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumericImputer {
    columns: Vec<String>,
    statistics: Option<Array1<f64>>,
}

impl NumericImputer {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            statistics: None,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn statistics(&self) -> Option<&Array1<f64>> {
        self.statistics.as_ref()
    }

    fn select(&self, table: &Table) -> Result<Array2<f64>> {
        let mut X = Array2::zeros((table.n_rows(), self.columns.len()));
        for (j, name) in self.columns.iter().enumerate() {
            X.column_mut(j).assign(&table.numeric_column(name)?);
        }
        Ok(X)
    }

    pub fn fit(&mut self, table: &Table) -> Result<()> {
        if table.n_rows() == 0 {
            return Err(PreprocessingError::fit("Cannot fit imputer on empty data"));
        }

        let X = self.select(table)?;
        let mut stats = Array1::zeros(self.columns.len());
        for (j, name) in self.columns.iter().enumerate() {
            let values = X.column(j).to_vec();
            stats[j] = median(&values).ok_or_else(|| {
                PreprocessingError::fit(format!(
                    "column '{}' has no observed values to impute from",
                    name
                ))
            })?;
        }

        self.statistics = Some(stats);
        Ok(())
    }

    pub fn transform(&self, table: &Table) -> Result<Array2<f64>> {
        let stats = self
            .statistics
            .as_ref()
            .ok_or_else(|| PreprocessingError::fit("Imputer not fitted"))?;

        let mut X = self.select(table)?;
        for mut row in X.rows_mut() {
            for (j, val) in row.iter_mut().enumerate() {
                if val.is_nan() {
                    *val = stats[j];
                }
            }
        }
        Ok(X)
    }
}

/// Импутер категориальных колонок: пропуски заменяются модой
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoricalImputer {
    columns: Vec<String>,
    fill_values: Option<Vec<String>>,
}

impl CategoricalImputer {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            fill_values: None,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn fill_values(&self) -> Option<&[String]> {
        self.fill_values.as_deref()
    }

    pub fn fit(&mut self, table: &Table) -> Result<()> {
        if table.n_rows() == 0 {
            return Err(PreprocessingError::fit("Cannot fit imputer on empty data"));
        }

        let mut fill = Vec::with_capacity(self.columns.len());
        for name in &self.columns {
            let values = table.categorical_column(name)?;
            let mode = most_frequent(&values).ok_or_else(|| {
                PreprocessingError::fit(format!(
                    "column '{}' has no observed values to impute from",
                    name
                ))
            })?;
            fill.push(mode);
        }

        self.fill_values = Some(fill);
        Ok(())
    }

    /// Возвращает колонки без пропусков в порядке `columns`
    pub fn transform(&self, table: &Table) -> Result<Vec<Vec<String>>> {
        let fill = self
            .fill_values
            .as_ref()
            .ok_or_else(|| PreprocessingError::fit("Imputer not fitted"))?;

        self.columns
            .iter()
            .zip(fill)
            .map(|(name, mode)| {
                Ok(table
                    .categorical_column(name)?
                    .into_iter()
                    .map(|cell| cell.unwrap_or_else(|| mode.clone()))
                    .collect())
            })
            .collect()
    }
}
