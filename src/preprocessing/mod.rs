/// Модуль предобработки данных

pub mod column_transformer;
pub mod encoding;
pub mod imputation;
pub mod normalization;
pub mod pipeline;

pub use column_transformer::{ColumnEntry, ColumnTransformer};
pub use encoding::{HandleUnknown, OneHotEncoder};
pub use imputation::{CategoricalImputer, NumericImputer};
pub use normalization::DataNormalizer;
pub use pipeline::{CategoricalPipeline, NumericPipeline, SubPipeline};
