//! Конфигурация: роли колонок, путь артефакта, параметры сервера
//!
//! Слои (от низшего приоритета к высшему): встроенные значения по умолчанию,
//! файл `student-prep.toml`, переменные окружения `STUDENT_PREP_*`
//! (вложенные ключи через `__`, например `STUDENT_PREP_SERVER__PORT`).

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{PreprocessingError, Result};
use crate::preprocessing::HandleUnknown;

pub const DEFAULT_CONFIG_FILE: &str = "student-prep.toml";
pub const ENV_PREFIX: &str = "STUDENT_PREP_";

/// Статическое назначение ролей колонкам. Из данных не выводится.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRoles {
    pub numeric: Vec<String>,
    pub categorical: Vec<String>,
    pub target: String,
}

impl Default for ColumnRoles {
    fn default() -> Self {
        Self {
            numeric: vec!["writing_score".to_string(), "reading_score".to_string()],
            categorical: vec![
                "gender".to_string(),
                "race_ethnicity".to_string(),
                "parental_level_of_education".to_string(),
                "lunch".to_string(),
                "test_preparation_course".to_string(),
            ],
            target: "math_score".to_string(),
        }
    }
}

impl ColumnRoles {
    /// Роли должны быть непустыми и не пересекаться
    pub fn validate(&self) -> Result<()> {
        if self.numeric.is_empty() && self.categorical.is_empty() {
            return Err(PreprocessingError::Config(
                "at least one numeric or categorical column is required".to_string(),
            ));
        }
        if self.target.is_empty() {
            return Err(PreprocessingError::Config("target column name is empty".to_string()));
        }

        let mut seen = HashSet::new();
        let all = self
            .numeric
            .iter()
            .chain(&self.categorical)
            .chain(std::iter::once(&self.target));
        for name in all {
            if !seen.insert(name.as_str()) {
                return Err(PreprocessingError::Config(format!(
                    "column '{}' is assigned more than one role",
                    name
                )));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreprocessingConfig {
    #[serde(default)]
    pub handle_unknown: HandleUnknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactConfig {
    #[serde(default = "default_preprocessor_path")]
    pub preprocessor_path: PathBuf,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            preprocessor_path: default_preprocessor_path(),
        }
    }
}

fn default_preprocessor_path() -> PathBuf {
    Path::new("artifacts").join("preprocessor.bin")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub columns: ColumnRoles,
    #[serde(default)]
    pub preprocessing: PreprocessingConfig,
    #[serde(default)]
    pub artifacts: ArtifactConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Загрузка конфигурации из слоёв
///
/// Явно переданный файл обязан существовать; файл по умолчанию необязателен.
pub fn load_config(config_file: Option<&Path>) -> Result<AppConfig> {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

    match config_file {
        Some(path) => {
            if !path.exists() {
                return Err(PreprocessingError::Config(format!(
                    "config file {} does not exist",
                    path.display()
                )));
            }
            figment = figment.merge(Toml::file(path));
        }
        None => {
            let default_file = Path::new(DEFAULT_CONFIG_FILE);
            if default_file.exists() {
                figment = figment.merge(Toml::file(default_file));
            }
        }
    }

    figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: AppConfig = figment
        .extract()
        .map_err(|e| PreprocessingError::Config(e.to_string()))?;
    config.columns.validate()?;
    Ok(config)
}
