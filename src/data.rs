//! Загрузка и выгрузка CSV

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use csv::{ReaderBuilder, WriterBuilder};
use ndarray::Array2;

use crate::error::{PreprocessingError, Result};
use crate::types::{to_cell, Table};

fn csv_error(path: &Path, err: csv::Error) -> PreprocessingError {
    if err.is_io_error() {
        match err.into_kind() {
            csv::ErrorKind::Io(io) => PreprocessingError::io(path, io),
            other => PreprocessingError::schema(format!("{}: {:?}", path.display(), other)),
        }
    } else {
        PreprocessingError::schema(format!("{}: {}", path.display(), err))
    }
}

/// Чтение CSV с заголовком в таблицу
pub fn read_csv(path: impl AsRef<Path>) -> Result<Table> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| PreprocessingError::io(path, e))?;
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .from_reader(BufReader::new(file));

    let columns: Vec<String> = rdr
        .headers()
        .map_err(|e| csv_error(path, e))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if columns.is_empty() || columns.iter().all(String::is_empty) {
        return Err(PreprocessingError::schema(format!(
            "{}: missing header row",
            path.display()
        )));
    }

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| csv_error(path, e))?;
        rows.push(record.iter().map(to_cell).collect());
    }

    let table = Table::from_rows(columns, rows)?;
    tracing::debug!(
        path = %path.display(),
        rows = table.n_rows(),
        cols = table.n_cols(),
        "CSV loaded"
    );
    Ok(table)
}

/// Запись матрицы признаков в CSV с заголовком
pub fn write_csv(path: impl AsRef<Path>, header: &[String], matrix: &Array2<f64>) -> Result<()> {
    let path = path.as_ref();
    if header.len() != matrix.ncols() {
        return Err(PreprocessingError::schema(format!(
            "{} header names for {} columns",
            header.len(),
            matrix.ncols()
        )));
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| PreprocessingError::io(parent, e))?;
    }

    let file = File::create(path).map_err(|e| PreprocessingError::io(path, e))?;
    let mut wtr = WriterBuilder::new().from_writer(BufWriter::new(file));

    wtr.write_record(header).map_err(|e| csv_error(path, e))?;
    for row in matrix.rows() {
        wtr.write_record(row.iter().map(|v| v.to_string()))
            .map_err(|e| csv_error(path, e))?;
    }
    wtr.flush().map_err(|e| PreprocessingError::io(path, e))?;

    Ok(())
}
