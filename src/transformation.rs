//! Трансформация данных: сборка препроцессора и применение к train/test

use std::path::{Path, PathBuf};

use linfa::{Dataset, DatasetBase};
use ndarray::{concatenate, s, Array1, Array2, Axis, Ix1};

use crate::artifact;
use crate::config::{AppConfig, ColumnRoles, PreprocessingConfig};
use crate::data;
use crate::error::{PipelineError, PipelineStage, PreprocessingError, Result, StageContext};
use crate::preprocessing::{CategoricalPipeline, ColumnTransformer, NumericPipeline, SubPipeline};
use crate::types::Table;

/// Необученный препроцессор: "num" (медиана -> стандартизация),
/// затем "cat" (мода -> one-hot -> масштаб без центрирования)
pub fn build_preprocessor(roles: &ColumnRoles, config: &PreprocessingConfig) -> ColumnTransformer {
    let mut preprocessor = ColumnTransformer::new();

    if !roles.numeric.is_empty() {
        preprocessor = preprocessor.with_entry(
            "num",
            roles.numeric.clone(),
            SubPipeline::Numeric(NumericPipeline::new(roles.numeric.clone())),
        );
    }
    if !roles.categorical.is_empty() {
        preprocessor = preprocessor.with_entry(
            "cat",
            roles.categorical.clone(),
            SubPipeline::Categorical(CategoricalPipeline::new(
                roles.categorical.clone(),
                config.handle_unknown,
            )),
        );
    }

    preprocessor
}

/// Целевая колонка добавляется последней, без изменений
pub fn append_target(features: &Array2<f64>, target: &Array1<f64>) -> Result<Array2<f64>> {
    if features.nrows() != target.len() {
        return Err(PreprocessingError::schema(format!(
            "{} feature rows but {} target values",
            features.nrows(),
            target.len()
        )));
    }
    concatenate(Axis(1), &[features.view(), target.view().insert_axis(Axis(1))])
        .map_err(|e| PreprocessingError::schema(e.to_string()))
}

/// Результат трансформации: признаки + целевая колонка последней
#[derive(Debug, Clone)]
pub struct TransformationOutput {
    pub train: Array2<f64>,
    pub test: Array2<f64>,
    pub preprocessor_path: PathBuf,
    pub feature_names: Vec<String>,
}

impl TransformationOutput {
    fn to_dataset(arr: &Array2<f64>, feature_names: &[String]) -> Dataset<f64, f64, Ix1> {
        let n_features = arr.ncols() - 1;
        let records = arr.slice(s![.., ..n_features]).to_owned();
        let targets = arr.column(n_features).to_owned();
        DatasetBase::new(records, targets).with_feature_names(feature_names.to_vec())
    }

    /// Датасет linfa для обучения модели
    pub fn train_dataset(&self) -> Dataset<f64, f64, Ix1> {
        Self::to_dataset(&self.train, &self.feature_names)
    }

    pub fn test_dataset(&self) -> Dataset<f64, f64, Ix1> {
        Self::to_dataset(&self.test, &self.feature_names)
    }
}

pub struct DataTransformation {
    config: AppConfig,
}

impl DataTransformation {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn preprocessor_path(&self) -> &Path {
        &self.config.artifacts.preprocessor_path
    }

    pub fn get_data_transformer_object(&self) -> std::result::Result<ColumnTransformer, PipelineError> {
        self.config.columns.validate().stage(PipelineStage::Build)?;
        let preprocessor = build_preprocessor(&self.config.columns, &self.config.preprocessing);
        tracing::info!(
            numeric = ?self.config.columns.numeric,
            categorical = ?self.config.columns.categorical,
            "Data preprocessing pipeline created"
        );
        Ok(preprocessor)
    }

    /// Полный цикл: load -> build -> split -> fit_transform -> transform -> recombine -> persist
    pub fn initiate_data_transformation(
        &self,
        train_path: impl AsRef<Path>,
        test_path: impl AsRef<Path>,
    ) -> std::result::Result<TransformationOutput, PipelineError> {
        let train_df = data::read_csv(train_path).stage(PipelineStage::Load)?;
        let test_df = data::read_csv(test_path).stage(PipelineStage::Load)?;
        tracing::info!(
            train_rows = train_df.n_rows(),
            test_rows = test_df.n_rows(),
            "Reading train and test data completed"
        );

        self.transform_tables(&train_df, &test_df)
    }

    /// То же, что `initiate_data_transformation`, для уже загруженных таблиц
    pub fn transform_tables(
        &self,
        train_df: &Table,
        test_df: &Table,
    ) -> std::result::Result<TransformationOutput, PipelineError> {
        let mut preprocessor = self.get_data_transformer_object()?;

        let target = self.config.columns.target.as_str();
        let (input_train, target_train) = train_df.split_target(target).stage(PipelineStage::Split)?;
        let (input_test, target_test) = test_df.split_target(target).stage(PipelineStage::Split)?;

        tracing::info!("Applying preprocessing on training and testing data");
        let train_features = preprocessor
            .fit_transform(&input_train)
            .stage(PipelineStage::FitTransform)?;
        let test_features = preprocessor
            .transform(&input_test)
            .stage(PipelineStage::Transform)?;

        let train = append_target(&train_features, &target_train).stage(PipelineStage::Recombine)?;
        let test = append_target(&test_features, &target_test).stage(PipelineStage::Recombine)?;
        let feature_names = preprocessor
            .feature_names_out()
            .stage(PipelineStage::Recombine)?;
        tracing::info!(
            train_shape = ?train.shape(),
            test_shape = ?test.shape(),
            "Transformation completed"
        );

        let preprocessor_path = self.preprocessor_path().to_path_buf();
        artifact::save_preprocessor(&preprocessor_path, &preprocessor).stage(PipelineStage::Persist)?;
        tracing::info!(path = %preprocessor_path.display(), "Saved preprocessing object");

        Ok(TransformationOutput {
            train,
            test,
            preprocessor_path,
            feature_names,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::HandleUnknown;
    use crate::types::to_cell;
    use linfa::dataset::Records;
    use ndarray::array;

    const COLUMNS: [&str; 8] = [
        "gender",
        "race_ethnicity",
        "parental_level_of_education",
        "lunch",
        "test_preparation_course",
        "math_score",
        "reading_score",
        "writing_score",
    ];

    fn student_table(rows: &[[&str; 8]]) -> Table {
        Table::from_rows(
            COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows.iter().map(|r| r.iter().map(|v| to_cell(v)).collect()).collect(),
        )
        .unwrap()
    }

    fn train_rows() -> Vec<[&'static str; 8]> {
        vec![
            ["female", "group B", "bachelor's degree", "standard", "none", "72", "72", "74"],
            ["female", "group C", "some college", "standard", "completed", "69", "90", "88"],
            ["male", "group A", "associate's degree", "free/reduced", "none", "47", "57", "44"],
            ["male", "group C", "some college", "standard", "none", "76", "78", "75"],
            ["female", "group B", "master's degree", "standard", "none", "90", "95", "93"],
        ]
    }

    fn test_rows() -> Vec<[&'static str; 8]> {
        vec![
            ["male", "group E", "high school", "standard", "completed", "88", "", "86"],
            ["female", "group B", "some college", "free/reduced", "none", "40", "43", "39"],
        ]
    }

    fn transformation(dir: &Path) -> DataTransformation {
        let mut config = AppConfig::default();
        config.artifacts.preprocessor_path = dir.join("artifacts").join("preprocessor.bin");
        DataTransformation::new(config)
    }

    #[test]
    fn test_build_preprocessor_is_unfitted() {
        let preprocessor =
            build_preprocessor(&ColumnRoles::default(), &PreprocessingConfig::default());
        assert!(!preprocessor.is_fitted());
        assert_eq!(preprocessor.entries().len(), 2);
        assert_eq!(preprocessor.entries()[0].name, "num");
        assert_eq!(preprocessor.entries()[1].name, "cat");
    }

    #[test]
    fn test_append_target() {
        let out = append_target(&array![[1.0], [2.0]], &array![65.0, 70.0]).unwrap();
        assert_eq!(out, array![[1.0, 65.0], [2.0, 70.0]]);
        assert!(append_target(&array![[1.0]], &array![1.0, 2.0]).is_err());
    }

    #[test]
    fn test_shapes_and_target_isolation() {
        let dir = tempfile::tempdir().unwrap();
        let out = transformation(dir.path())
            .transform_tables(&student_table(&train_rows()), &student_table(&test_rows()))
            .unwrap();

        // 2 числовых + (2 + 3 + 4 + 2 + 2) категорий + цель
        let expected_cols = 2 + 13 + 1;
        assert_eq!(out.train.shape(), &[5, expected_cols]);
        assert_eq!(out.test.shape(), &[2, expected_cols]);
        assert_eq!(out.feature_names.len(), expected_cols - 1);

        assert_eq!(
            out.train.column(expected_cols - 1).to_vec(),
            vec![72.0, 69.0, 47.0, 76.0, 90.0]
        );
        assert_eq!(out.test.column(expected_cols - 1).to_vec(), vec![88.0, 40.0]);
        assert!(out.preprocessor_path.exists());
    }

    #[test]
    fn test_unseen_category_in_test_is_zero() {
        let dir = tempfile::tempdir().unwrap();
        let out = transformation(dir.path())
            .transform_tables(&student_table(&train_rows()), &student_table(&test_rows()))
            .unwrap();

        // "group E" не встречалась в train: все индикаторы race_ethnicity нулевые
        let race_cols: Vec<usize> = out
            .feature_names
            .iter()
            .enumerate()
            .filter(|(_, n)| n.starts_with("cat__race_ethnicity_"))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(race_cols.len(), 3);
        for idx in race_cols {
            assert_eq!(out.test[[0, idx]], 0.0);
        }
    }

    #[test]
    fn test_unseen_category_error_policy() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.artifacts.preprocessor_path = dir.path().join("preprocessor.bin");
        config.preprocessing.handle_unknown = HandleUnknown::Error;

        let err = DataTransformation::new(config)
            .transform_tables(&student_table(&train_rows()), &student_table(&test_rows()))
            .unwrap_err();
        assert_eq!(err.stage, PipelineStage::Transform);
        assert!(matches!(err.source, PreprocessingError::Schema(_)));
    }

    #[test]
    fn test_no_leakage_from_test() {
        let dir = tempfile::tempdir().unwrap();
        let transformation = transformation(dir.path());
        let train = student_table(&train_rows());

        let first = transformation
            .transform_tables(&train, &student_table(&test_rows()))
            .unwrap();
        let mut other_test = test_rows();
        other_test[1][6] = "1000";
        let second = transformation
            .transform_tables(&train, &student_table(&other_test))
            .unwrap();

        assert_eq!(first.train, second.train);
        // Первая строка test не менялась, её кодирование тоже
        assert_eq!(first.test.row(0), second.test.row(0));
    }

    #[test]
    fn test_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let transformation = transformation(dir.path());
        let train = student_table(&train_rows());
        let test = student_table(&test_rows());

        let a = transformation.transform_tables(&train, &test).unwrap();
        let bytes_a = std::fs::read(&a.preprocessor_path).unwrap();
        let b = transformation.transform_tables(&train, &test).unwrap();
        let bytes_b = std::fs::read(&b.preprocessor_path).unwrap();

        assert_eq!(a.train, b.train);
        assert_eq!(a.test, b.test);
        assert_eq!(bytes_a, bytes_b);
    }

    #[test]
    fn test_missing_target_is_split_error() {
        let dir = tempfile::tempdir().unwrap();
        let train = student_table(&train_rows());
        let test = Table::from_rows(vec!["gender".to_string()], vec![vec![to_cell("male")]]).unwrap();

        let err = transformation(dir.path())
            .transform_tables(&train, &test)
            .unwrap_err();
        assert_eq!(err.stage, PipelineStage::Split);
        assert!(matches!(err.source, PreprocessingError::Schema(_)));
    }

    #[test]
    fn test_missing_feature_column_is_schema_error() {
        let dir = tempfile::tempdir().unwrap();
        let train = student_table(&train_rows());
        let test = Table::from_rows(
            vec!["gender".to_string(), "math_score".to_string()],
            vec![vec![to_cell("male"), to_cell("50")]],
        )
        .unwrap();

        let err = transformation(dir.path())
            .transform_tables(&train, &test)
            .unwrap_err();
        assert_eq!(err.stage, PipelineStage::Transform);
        assert!(matches!(err.source, PreprocessingError::Schema(_)));
    }

    #[test]
    fn test_all_missing_numeric_column_is_fit_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut rows = train_rows();
        for row in rows.iter_mut() {
            row[7] = "";
        }

        let err = transformation(dir.path())
            .transform_tables(&student_table(&rows), &student_table(&test_rows()))
            .unwrap_err();
        assert_eq!(err.stage, PipelineStage::FitTransform);
        assert!(matches!(err.source, PreprocessingError::Fit(_)));
    }

    #[test]
    fn test_artifact_write_failure_is_persist_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        // Путь указывает на существующий каталог
        config.artifacts.preprocessor_path = dir.path().to_path_buf();

        let err = DataTransformation::new(config)
            .transform_tables(&student_table(&train_rows()), &student_table(&test_rows()))
            .unwrap_err();
        assert_eq!(err.stage, PipelineStage::Persist);
        assert!(matches!(err.source, PreprocessingError::Io { .. }));
    }

    #[test]
    fn test_overlapping_roles_is_build_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.artifacts.preprocessor_path = dir.path().join("preprocessor.bin");
        config.columns.categorical.push("reading_score".to_string());

        let err = DataTransformation::new(config)
            .transform_tables(&student_table(&train_rows()), &student_table(&test_rows()))
            .unwrap_err();
        assert_eq!(err.stage, PipelineStage::Build);
        assert!(matches!(err.source, PreprocessingError::Config(_)));
        assert!(!dir.path().join("preprocessor.bin").exists());
    }

    #[test]
    fn test_datasets_for_training() {
        let dir = tempfile::tempdir().unwrap();
        let out = transformation(dir.path())
            .transform_tables(&student_table(&train_rows()), &student_table(&test_rows()))
            .unwrap();

        let train = out.train_dataset();
        assert_eq!(train.nsamples(), 5);
        assert_eq!(train.nfeatures(), out.feature_names.len());
        assert_eq!(train.targets.to_vec(), vec![72.0, 69.0, 47.0, 76.0, 90.0]);
        assert_eq!(out.test_dataset().nsamples(), 2);
    }
}
