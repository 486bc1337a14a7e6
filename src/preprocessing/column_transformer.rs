//! ColumnTransformer: независимые подпайплайны по подмножествам колонок,
//! результаты склеиваются по столбцам в порядке объявления.
//!
//! Колонки, не попавшие ни в один подпайплайн, отбрасываются.

use ndarray::{concatenate, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{PreprocessingError, Result};
use crate::preprocessing::pipeline::SubPipeline;
use crate::types::Table;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnEntry {
    pub name: String,
    pub columns: Vec<String>,
    pub pipeline: SubPipeline,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnTransformer {
    entries: Vec<ColumnEntry>,
    n_features_out: Option<usize>,
    is_fitted: bool,
}

impl ColumnTransformer {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            n_features_out: None,
            is_fitted: false,
        }
    }

    /// Добавление подпайплайна для набора колонок
    pub fn with_entry(mut self, name: &str, columns: Vec<String>, pipeline: SubPipeline) -> Self {
        self.entries.push(ColumnEntry {
            name: name.to_string(),
            columns,
            pipeline,
        });
        self
    }

    pub fn entries(&self) -> &[ColumnEntry] {
        &self.entries
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Входные колонки, которые требуются для transform
    pub fn required_columns(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .flat_map(|e| e.columns.iter().map(String::as_str))
    }

    pub fn n_features_out(&self) -> Option<usize> {
        self.n_features_out
    }

    /// Имена выходных колонок: `<подпайплайн>__<признак>`
    pub fn feature_names_out(&self) -> Result<Vec<String>> {
        if !self.is_fitted {
            return Err(PreprocessingError::fit("ColumnTransformer not fitted"));
        }
        Ok(self
            .entries
            .iter()
            .flat_map(|e| {
                e.pipeline
                    .feature_names()
                    .into_iter()
                    .map(move |f| format!("{}__{}", e.name, f))
            })
            .collect())
    }

    fn check_columns(&self, table: &Table) -> Result<()> {
        let missing: Vec<&str> = self
            .required_columns()
            .filter(|c| !table.has_column(c))
            .collect();
        if !missing.is_empty() {
            return Err(PreprocessingError::schema(format!(
                "required columns are missing: {}",
                missing.join(", ")
            )));
        }
        Ok(())
    }

    fn concat(parts: &[Array2<f64>], n_rows: usize) -> Result<Array2<f64>> {
        if parts.is_empty() {
            return Ok(Array2::zeros((n_rows, 0)));
        }
        let views: Vec<ArrayView2<f64>> = parts.iter().map(|p| p.view()).collect();
        concatenate(Axis(1), &views)
            .map_err(|e| PreprocessingError::schema(format!("cannot concatenate outputs: {}", e)))
    }

    /// Обучение и преобразование обучающей выборки. Повторное обучение запрещено.
    pub fn fit_transform(&mut self, table: &Table) -> Result<Array2<f64>> {
        if self.is_fitted {
            return Err(PreprocessingError::fit("ColumnTransformer is already fitted"));
        }
        if table.n_rows() == 0 {
            return Err(PreprocessingError::fit("Cannot fit on an empty table"));
        }
        self.check_columns(table)?;

        let mut parts = Vec::with_capacity(self.entries.len());
        for entry in &mut self.entries {
            let out = entry.pipeline.fit_transform(table)?;
            tracing::debug!(transformer = %entry.name, features = out.ncols(), "sub-pipeline fitted");
            parts.push(out);
        }

        let out = Self::concat(&parts, table.n_rows())?;
        self.n_features_out = Some(out.ncols());
        self.is_fitted = true;
        Ok(out)
    }

    pub fn fit(&mut self, table: &Table) -> Result<()> {
        self.fit_transform(table).map(|_| ())
    }

    /// Преобразование с уже выученными параметрами
    pub fn transform(&self, table: &Table) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(PreprocessingError::fit("ColumnTransformer not fitted"));
        }
        self.check_columns(table)?;

        let parts = self
            .entries
            .iter()
            .map(|e| e.pipeline.transform(table))
            .collect::<Result<Vec<_>>>()?;

        Self::concat(&parts, table.n_rows())
    }
}

impl Default for ColumnTransformer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::encoding::HandleUnknown;
    use crate::preprocessing::pipeline::{CategoricalPipeline, NumericPipeline};
    use crate::types::to_cell;

    fn table(columns: &[&str], data: &[&[&str]]) -> Table {
        Table::new(
            columns.iter().map(|c| c.to_string()).collect(),
            data.iter()
                .map(|col| col.iter().map(|v| to_cell(v)).collect())
                .collect(),
        )
        .unwrap()
    }

    fn transformer() -> ColumnTransformer {
        ColumnTransformer::new()
            .with_entry(
                "num",
                vec!["score".to_string()],
                SubPipeline::Numeric(NumericPipeline::new(vec!["score".to_string()])),
            )
            .with_entry(
                "cat",
                vec!["color".to_string()],
                SubPipeline::Categorical(CategoricalPipeline::new(
                    vec!["color".to_string()],
                    HandleUnknown::Ignore,
                )),
            )
    }

    #[test]
    fn test_fit_transform_concatenates_in_order() {
        let train = table(
            &["color", "score", "unused"],
            &[&["red", "blue", "red"], &["1", "2", "3"], &["x", "y", "z"]],
        );
        let mut ct = transformer();
        let out = ct.fit_transform(&train).unwrap();

        assert_eq!(out.shape(), &[3, 3]);
        assert_eq!(ct.n_features_out(), Some(3));
        assert_eq!(
            ct.feature_names_out().unwrap(),
            vec![
                "num__score".to_string(),
                "cat__color_blue".to_string(),
                "cat__color_red".to_string()
            ]
        );
        // Первый столбец стандартизован
        assert!(out[[1, 0]].abs() < 1e-10);
    }

    #[test]
    fn test_refit_is_rejected() {
        let train = table(&["color", "score"], &[&["red"], &["1"]]);
        let mut ct = transformer();
        ct.fit(&train).unwrap();
        assert!(matches!(ct.fit(&train), Err(PreprocessingError::Fit(_))));
    }

    #[test]
    fn test_transform_before_fit() {
        let test = table(&["color", "score"], &[&["red"], &["1"]]);
        assert!(matches!(
            transformer().transform(&test),
            Err(PreprocessingError::Fit(_))
        ));
        assert!(transformer().feature_names_out().is_err());
    }

    #[test]
    fn test_missing_columns_reported() {
        let train = table(&["color"], &[&["red"]]);
        let err = transformer().fit_transform(&train).unwrap_err();
        assert!(matches!(err, PreprocessingError::Schema(ref msg) if msg.contains("score")));
    }

    #[test]
    fn test_transform_unseen_category_zeroes() {
        let train = table(&["color", "score"], &[&["red", "blue"], &["1", "2"]]);
        let test = table(&["color", "score"], &[&["green"], &["5"]]);
        let mut ct = transformer();
        ct.fit(&train).unwrap();

        let out = ct.transform(&test).unwrap();
        assert_eq!(out.shape(), &[1, 3]);
        assert_eq!(out[[0, 1]], 0.0);
        assert_eq!(out[[0, 2]], 0.0);
    }

    #[test]
    fn test_empty_table_cannot_fit() {
        let train = table(&["color", "score"], &[&[], &[]]);
        assert!(matches!(
            transformer().fit_transform(&train),
            Err(PreprocessingError::Fit(_))
        ));
    }
}
