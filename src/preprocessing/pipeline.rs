//! Подпайплайны для числовых и категориальных колонок

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::preprocessing::encoding::{HandleUnknown, OneHotEncoder};
use crate::preprocessing::imputation::{CategoricalImputer, NumericImputer};
use crate::preprocessing::normalization::DataNormalizer;
use crate::types::Table;

/// Импутация медианой -> стандартизация
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumericPipeline {
    imputer: NumericImputer,
    scaler: DataNormalizer,
}

impl NumericPipeline {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            imputer: NumericImputer::new(columns),
            scaler: DataNormalizer::new(),
        }
    }

    pub fn imputer(&self) -> &NumericImputer {
        &self.imputer
    }

    pub fn scaler(&self) -> &DataNormalizer {
        &self.scaler
    }

    pub fn fit_transform(&mut self, table: &Table) -> Result<Array2<f64>> {
        self.imputer.fit(table)?;
        let imputed = self.imputer.transform(table)?;
        self.scaler.fit_transform(&imputed)
    }

    pub fn transform(&self, table: &Table) -> Result<Array2<f64>> {
        let imputed = self.imputer.transform(table)?;
        self.scaler.transform(&imputed)
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.imputer.columns().to_vec()
    }
}

/// Импутация модой -> one-hot -> масштабирование без центрирования
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoricalPipeline {
    imputer: CategoricalImputer,
    encoder: OneHotEncoder,
    scaler: DataNormalizer,
}

impl CategoricalPipeline {
    pub fn new(columns: Vec<String>, handle_unknown: HandleUnknown) -> Self {
        Self {
            imputer: CategoricalImputer::new(columns.clone()),
            encoder: OneHotEncoder::new(columns, handle_unknown),
            scaler: DataNormalizer::without_mean(),
        }
    }

    pub fn imputer(&self) -> &CategoricalImputer {
        &self.imputer
    }

    pub fn scaler(&self) -> &DataNormalizer {
        &self.scaler
    }

    pub fn fit_transform(&mut self, table: &Table) -> Result<Array2<f64>> {
        self.imputer.fit(table)?;
        let imputed = self.imputer.transform(table)?;
        let encoded = self.encoder.fit_transform(&imputed)?;
        self.scaler.fit_transform(&encoded)
    }

    pub fn transform(&self, table: &Table) -> Result<Array2<f64>> {
        let imputed = self.imputer.transform(table)?;
        let encoded = self.encoder.transform(&imputed)?;
        self.scaler.transform(&encoded)
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.encoder.feature_names()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SubPipeline {
    Numeric(NumericPipeline),
    Categorical(CategoricalPipeline),
}

impl SubPipeline {
    pub fn fit_transform(&mut self, table: &Table) -> Result<Array2<f64>> {
        match self {
            SubPipeline::Numeric(p) => p.fit_transform(table),
            SubPipeline::Categorical(p) => p.fit_transform(table),
        }
    }

    pub fn transform(&self, table: &Table) -> Result<Array2<f64>> {
        match self {
            SubPipeline::Numeric(p) => p.transform(table),
            SubPipeline::Categorical(p) => p.transform(table),
        }
    }

    pub fn feature_names(&self) -> Vec<String> {
        match self {
            SubPipeline::Numeric(p) => p.feature_names(),
            SubPipeline::Categorical(p) => p.feature_names(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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

    #[test]
    fn test_numeric_pipeline_imputes_before_scaling() {
        let train = table(&["writing_score"], &[&["70", "", "90"]]);
        let mut pipeline = NumericPipeline::new(vec!["writing_score".to_string()]);
        let out = pipeline.fit_transform(&train).unwrap();

        // 70, 80 (медиана), 90 -> среднее 80
        assert_eq!(pipeline.imputer().statistics().unwrap()[0], 80.0);
        assert!((pipeline.scaler().mean().unwrap()[0] - 80.0).abs() < 1e-10);
        assert!(out[[1, 0]].abs() < 1e-10);
    }

    #[test]
    fn test_categorical_pipeline_scales_without_centering() {
        let train = table(&["gender"], &[&["female", "male", "male", "female"]]);
        let mut pipeline =
            CategoricalPipeline::new(vec!["gender".to_string()], HandleUnknown::Ignore);
        let out = pipeline.fit_transform(&train).unwrap();

        // Индикатор 0/1 с p = 0.5: std = 0.5
        assert_eq!(out.shape(), &[4, 2]);
        assert_eq!(pipeline.scaler().scale().unwrap().to_vec(), vec![0.5, 0.5]);
        assert!((out[[0, 0]] - 2.0).abs() < 1e-10);
        assert_eq!(out[[0, 1]], 0.0);
        assert!(out.iter().all(|v| *v >= 0.0));
        assert_eq!(
            pipeline.feature_names(),
            vec!["gender_female".to_string(), "gender_male".to_string()]
        );
    }

    #[test]
    fn test_categorical_pipeline_imputes_mode() {
        let train = table(&["lunch"], &[&["standard", "standard", "", "free/reduced"]]);
        let mut pipeline = CategoricalPipeline::new(vec!["lunch".to_string()], HandleUnknown::Ignore);
        let out = pipeline.fit_transform(&train).unwrap();

        assert_eq!(pipeline.imputer().fill_values().unwrap(), &["standard".to_string()]);
        // Пропуск заполнен "standard" -> индикатор "lunch_standard"
        assert_eq!(out[[2, 0]], 0.0);
        assert!(out[[2, 1]] > 0.0);
    }
}
