//! Ошибки предобработки и пайплайна трансформации

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Типизированная ошибка любой операции предобработки
#[derive(Debug, Error)]
pub enum PreprocessingError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Fit error: {0}")]
    Fit(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PreprocessingError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    pub fn fit(msg: impl Into<String>) -> Self {
        Self::Fit(msg.into())
    }

    pub fn missing_column(name: &str) -> Self {
        Self::Schema(format!("required column '{}' is missing", name))
    }
}

impl From<bincode::Error> for PreprocessingError {
    fn from(err: bincode::Error) -> Self {
        PreprocessingError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PreprocessingError>;

/// Этап пайплайна, на котором произошла ошибка
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Load,
    Build,
    Split,
    FitTransform,
    Transform,
    Recombine,
    Persist,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Load => "load",
            PipelineStage::Build => "build",
            PipelineStage::Split => "split",
            PipelineStage::FitTransform => "fit_transform",
            PipelineStage::Transform => "transform",
            PipelineStage::Recombine => "recombine",
            PipelineStage::Persist => "persist",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Единая ошибка оркестратора: этап + исходная причина
#[derive(Debug, Error)]
#[error("data transformation failed at stage '{stage}': {source}")]
pub struct PipelineError {
    pub stage: PipelineStage,
    #[source]
    pub source: PreprocessingError,
}

impl PipelineError {
    pub fn new(stage: PipelineStage, source: PreprocessingError) -> Self {
        Self { stage, source }
    }
}

/// Привязка ошибки к этапу пайплайна
pub trait StageContext<T> {
    fn stage(self, stage: PipelineStage) -> std::result::Result<T, PipelineError>;
}

impl<T> StageContext<T> for Result<T> {
    fn stage(self, stage: PipelineStage) -> std::result::Result<T, PipelineError> {
        self.map_err(|source| {
            tracing::error!(stage = stage.as_str(), error = %source, "pipeline stage failed");
            PipelineError::new(stage, source)
        })
    }
}
