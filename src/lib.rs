//! Student Prep - предобработка признаков для задачи предсказания math_score

pub mod artifact;
pub mod config;
pub mod data;
pub mod error;
pub mod preprocessing;
pub mod server;
pub mod transformation;
pub mod types;

pub use config::{load_config, AppConfig, ColumnRoles};
pub use error::{PipelineError, PipelineStage, PreprocessingError};
pub use preprocessing::*;
pub use transformation::{build_preprocessor, DataTransformation, TransformationOutput};
pub use types::Table;
