/// Типы данных: таблица в памяти и модели запросов API

use std::collections::HashSet;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::{PreprocessingError, Result};

/// Ячейка таблицы: `None` означает пропущенное значение
pub type Cell = Option<String>;

/// Запись для инференса: имя колонки -> значение
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Маркеры пропусков в формате pandas `read_csv` (регистрозависимо, "none" остаётся категорией)
pub const MISSING_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

pub fn is_missing_marker(raw: &str) -> bool {
    MISSING_MARKERS.contains(&raw.trim())
}

/// Нормализация сырого значения в ячейку
pub fn to_cell(raw: &str) -> Cell {
    if is_missing_marker(raw) {
        None
    } else {
        Some(raw.trim().to_string())
    }
}

/// Таблица, полностью материализованная в памяти, хранится по колонкам
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    data: Vec<Vec<Cell>>,
    n_rows: usize,
}

impl Table {
    /// Создание из колонок одинаковой длины
    pub fn new(columns: Vec<String>, data: Vec<Vec<Cell>>) -> Result<Self> {
        if columns.len() != data.len() {
            return Err(PreprocessingError::schema(format!(
                "{} column names for {} columns",
                columns.len(),
                data.len()
            )));
        }

        let mut seen = HashSet::new();
        for name in &columns {
            if !seen.insert(name.as_str()) {
                return Err(PreprocessingError::schema(format!("duplicate column '{}'", name)));
            }
        }

        let n_rows = data.first().map(Vec::len).unwrap_or(0);
        if let Some((idx, col)) = data.iter().enumerate().find(|(_, c)| c.len() != n_rows) {
            return Err(PreprocessingError::schema(format!(
                "column '{}' has {} rows, expected {}",
                columns[idx],
                col.len(),
                n_rows
            )));
        }

        Ok(Self {
            columns,
            data,
            n_rows,
        })
    }

    /// Создание из строк (порядок ячеек как в `columns`)
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self> {
        let n_cols = columns.len();
        let mut data: Vec<Vec<Cell>> = vec![Vec::with_capacity(rows.len()); n_cols];

        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != n_cols {
                return Err(PreprocessingError::schema(format!(
                    "row {} has {} fields, expected {}",
                    i,
                    row.len(),
                    n_cols
                )));
            }
            for (col, cell) in data.iter_mut().zip(row) {
                col.push(cell);
            }
        }

        Self::new(columns, data)
    }

    /// Создание из JSON-записей; отсутствующий ключ считается пропуском
    pub fn from_records(records: &[Record]) -> Result<Self> {
        let mut columns: Vec<String> = Vec::new();
        for record in records {
            for key in record.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }

        let mut rows = Vec::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            let mut row = Vec::with_capacity(columns.len());
            for name in &columns {
                let cell = match record.get(name) {
                    None | Some(serde_json::Value::Null) => None,
                    Some(serde_json::Value::String(s)) => to_cell(s),
                    Some(serde_json::Value::Number(n)) => Some(n.to_string()),
                    Some(serde_json::Value::Bool(b)) => Some(b.to_string()),
                    Some(other) => {
                        return Err(PreprocessingError::schema(format!(
                            "record {} field '{}' has unsupported value {}",
                            i, name, other
                        )))
                    }
                };
                row.push(cell);
            }
            rows.push(row);
        }

        Self::from_rows(columns, rows)
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn column(&self, name: &str) -> Result<&[Cell]> {
        self.columns
            .iter()
            .position(|c| c == name)
            .map(|idx| self.data[idx].as_slice())
            .ok_or_else(|| PreprocessingError::missing_column(name))
    }

    /// Числовое представление колонки, пропуски -> NaN
    pub fn numeric_column(&self, name: &str) -> Result<Array1<f64>> {
        let cells = self.column(name)?;
        cells
            .iter()
            .enumerate()
            .map(|(row, cell)| match cell {
                None => Ok(f64::NAN),
                Some(raw) => raw.trim().parse::<f64>().map_err(|_| {
                    PreprocessingError::schema(format!(
                        "column '{}' row {}: '{}' is not numeric",
                        name, row, raw
                    ))
                }),
            })
            .collect()
    }

    pub fn categorical_column(&self, name: &str) -> Result<Vec<Option<String>>> {
        Ok(self.column(name)?.to_vec())
    }

    /// Отделение целевой колонки от признаков
    pub fn split_target(&self, target: &str) -> Result<(Table, Array1<f64>)> {
        let y = self.numeric_column(target)?;
        let idx = self
            .columns
            .iter()
            .position(|c| c == target)
            .ok_or_else(|| PreprocessingError::missing_column(target))?;

        let mut columns = self.columns.clone();
        let mut data = self.data.clone();
        columns.remove(idx);
        data.remove(idx);

        let features = Table {
            columns,
            data,
            n_rows: self.n_rows,
        };
        Ok((features, y))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformRequest {
    pub records: Vec<Record>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformResponse {
    pub feature_names: Vec<String>,
    pub features: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureNamesResponse {
    pub feature_names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
