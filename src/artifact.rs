//! Сохранение и загрузка обученного препроцессора (bincode)

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PreprocessingError, Result};
use crate::preprocessing::ColumnTransformer;

/// Версия формата артефакта; меняется при несовместимых изменениях структуры
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct ArtifactRef<'a> {
    version: u32,
    preprocessor: &'a ColumnTransformer,
}

#[derive(Deserialize)]
struct Artifact {
    version: u32,
    preprocessor: ColumnTransformer,
}

pub fn to_bytes(preprocessor: &ColumnTransformer) -> Result<Vec<u8>> {
    if !preprocessor.is_fitted() {
        return Err(PreprocessingError::fit("refusing to persist an unfitted preprocessor"));
    }
    Ok(bincode::serialize(&ArtifactRef {
        version: ARTIFACT_FORMAT_VERSION,
        preprocessor,
    })?)
}

pub fn from_bytes(bytes: &[u8]) -> Result<ColumnTransformer> {
    let artifact: Artifact = bincode::deserialize(bytes)?;
    if artifact.version != ARTIFACT_FORMAT_VERSION {
        return Err(PreprocessingError::Serialization(format!(
            "unsupported artifact version {}, expected {}",
            artifact.version, ARTIFACT_FORMAT_VERSION
        )));
    }
    Ok(artifact.preprocessor)
}

/// Запись артефакта; родительские каталоги создаются при необходимости
pub fn save_preprocessor(path: impl AsRef<Path>, preprocessor: &ColumnTransformer) -> Result<()> {
    let path = path.as_ref();
    let bytes = to_bytes(preprocessor)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| PreprocessingError::io(parent, e))?;
    }
    std::fs::write(path, &bytes).map_err(|e| PreprocessingError::io(path, e))?;

    tracing::debug!(path = %path.display(), bytes = bytes.len(), "preprocessor written");
    Ok(())
}

pub fn load_preprocessor(path: impl AsRef<Path>) -> Result<ColumnTransformer> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| PreprocessingError::io(path, e))?;
    from_bytes(&bytes)
}
