//! Thin adapters between files and [`Attributes`] rows / serialized records.

use std::{
    fs::File,
    io::{BufRead, BufReader, Write},
    path::Path,
};

use indexmap::IndexMap;
use serde_json::Value;
use snafu::ResultExt;
use tracing::*;

use crate::{
    error::{CsvSnafu, HierError, IoSnafu, JsonSnafu},
    layout::{record::Attributes, registry::Registry},
};

/// Read annotation rows from `path`.
///
/// `.csv` files need a header line (Open Images layout: `ImageID`,
/// `LabelName`, `XMin`, ...); every cell is kept as a string. `.jsonl` files
/// hold one JSON object per line. Anything else must be a JSON array of
/// objects.
pub fn read_rows(path: impl AsRef<Path>) -> Result<Vec<Attributes>, HierError> {
    let path = path.as_ref();
    let path_name = path.display().to_string();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    let rows = match extension.as_deref() {
        Some("csv") => read_csv(path, &path_name)?,
        Some("jsonl") => read_json_lines(path, &path_name)?,
        _ => {
            let file = File::open(path).context(IoSnafu { path: &path_name })?;
            serde_json::from_reader(BufReader::new(file)).context(JsonSnafu {
                stage: format!("parse {path_name}"),
            })?
        }
    };

    info!("read {} annotation rows from {}", rows.len(), path_name);
    Ok(rows)
}

fn read_csv(path: &Path, path_name: &str) -> Result<Vec<Attributes>, HierError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .context(CsvSnafu { path: path_name })?;

    reader
        .deserialize::<IndexMap<String, String>>()
        .map(|record| -> Result<Attributes, HierError> {
            let record = record.context(CsvSnafu { path: path_name })?;
            Ok(record
                .into_iter()
                .map(|(key, value)| (key, Value::String(value)))
                .collect())
        })
        .collect()
}

fn read_json_lines(path: &Path, path_name: &str) -> Result<Vec<Attributes>, HierError> {
    let file = File::open(path).context(IoSnafu { path: path_name })?;
    let mut rows = Vec::new();

    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line.context(IoSnafu { path: path_name })?;
        if line.trim().is_empty() {
            continue;
        }
        let row = serde_json::from_str(&line).context(JsonSnafu {
            stage: format!("parse {path_name} line {}", line_no + 1),
        })?;
        rows.push(row);
    }

    Ok(rows)
}

/// Write every record as one pretty-printed JSON array, in registry order.
pub fn write_records<W: Write>(
    registry: &Registry,
    writer: W,
    overlap_info: bool,
) -> Result<(), HierError> {
    let records = registry
        .iter()
        .map(|record| record.to_json_value(overlap_info))
        .collect::<Result<Vec<_>, _>>()?;

    serde_json::to_writer_pretty(writer, &records).context(JsonSnafu {
        stage: "write records",
    })
}
