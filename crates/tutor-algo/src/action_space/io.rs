//! Arrow IPC persistence for action spaces.
//!
//! One file per disabled-line configuration. The stream holds a single
//! schema with one non-null `UInt8` column per topology-vector position
//! (`obj_0 … obj_{N-1}`) and one row per action. Schema metadata carries:
//!
//! - `disabled_line`: `"none"` or the line index
//! - `n_objects`: number of columns
//! - `fingerprint`: digest of the rules and substation scope used to build
//!   it (absent for spaces assembled from raw rows)
//!
//! Substation grouping is not stored; it is re-derived from the grid
//! topology on load.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, UInt8Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::error::ArrowError;
use arrow::ipc::reader::StreamReader;
use arrow::ipc::writer::StreamWriter;
use arrow::record_batch::RecordBatch;
use tracing::debug;
use tutor_core::{GridTopology, LineId, TutorError, TutorResult};

use super::index::ActionSpace;

pub const FILE_EXTENSION: &str = "arrow";
const META_DISABLED_LINE: &str = "disabled_line";
const META_N_OBJECTS: &str = "n_objects";
const META_FINGERPRINT: &str = "fingerprint";

fn arrow_err(err: ArrowError) -> TutorError {
    TutorError::Parse(format!("arrow: {}", err))
}

/// `action_space.arrow`, or `action_space_lout{N}.arrow` with line N out.
pub fn file_name_for(disabled_line: Option<LineId>) -> String {
    match disabled_line {
        None => format!("action_space.{}", FILE_EXTENSION),
        Some(line) => format!("action_space_lout{}.{}", line, FILE_EXTENSION),
    }
}

pub fn column_name(index: usize) -> String {
    format!("obj_{}", index)
}

pub fn action_space_schema(
    n_objects: usize,
    disabled_line: Option<LineId>,
    fingerprint: Option<&str>,
) -> Schema {
    let fields: Vec<Field> = (0..n_objects)
        .map(|i| Field::new(column_name(i), DataType::UInt8, false))
        .collect();
    let mut metadata = HashMap::new();
    metadata.insert(
        META_DISABLED_LINE.to_string(),
        disabled_line.map_or_else(|| "none".to_string(), |l| l.to_string()),
    );
    metadata.insert(META_N_OBJECTS.to_string(), n_objects.to_string());
    if let Some(fp) = fingerprint {
        metadata.insert(META_FINGERPRINT.to_string(), fp.to_string());
    }
    Schema::new_with_metadata(fields, metadata)
}

/// Write an action space to Arrow IPC stream format.
pub fn write_action_space<W: Write>(space: &ActionSpace, writer: W) -> TutorResult<()> {
    let n = space.n_objects();
    let schema = Arc::new(action_space_schema(
        n,
        space.disabled_line(),
        space.fingerprint(),
    ));

    let columns: Vec<ArrayRef> = (0..n)
        .map(|c| Arc::new(UInt8Array::from_iter_values(space.rows().map(|row| row[c]))) as ArrayRef)
        .collect();
    let batch = RecordBatch::try_new(schema.clone(), columns).map_err(arrow_err)?;

    let mut ipc_writer = StreamWriter::try_new(writer, &schema).map_err(arrow_err)?;
    ipc_writer.write(&batch).map_err(arrow_err)?;
    ipc_writer.finish().map_err(arrow_err)?;
    Ok(())
}

fn parse_disabled_line(schema: &Schema) -> TutorResult<Option<LineId>> {
    match schema.metadata().get(META_DISABLED_LINE).map(String::as_str) {
        None | Some("none") => Ok(None),
        Some(raw) => raw
            .parse::<usize>()
            .map(|v| Some(LineId::new(v)))
            .map_err(|_| TutorError::Parse(format!("bad disabled_line metadata '{}'", raw))),
    }
}

/// Read an action space from Arrow IPC stream format.
pub fn read_action_space<R: Read>(reader: R, grid: &GridTopology) -> TutorResult<ActionSpace> {
    let stream_reader = StreamReader::try_new(reader, None).map_err(arrow_err)?;
    let schema = stream_reader.schema();

    let n = grid.n_objects();
    if schema.fields().len() != n {
        return Err(TutorError::Validation(format!(
            "action space has {} columns, grid '{}' has {} objects",
            schema.fields().len(),
            grid.name(),
            n
        )));
    }
    let disabled_line = parse_disabled_line(&schema)?;
    let fingerprint = schema.metadata().get(META_FINGERPRINT).cloned();
    let names: Vec<String> = (0..n).map(column_name).collect();

    let mut data = Vec::new();
    for batch_result in stream_reader {
        let batch = batch_result.map_err(arrow_err)?;
        let columns = names
            .iter()
            .map(|name| {
                batch
                    .column_by_name(name)
                    .and_then(|col| col.as_any().downcast_ref::<UInt8Array>())
                    .ok_or_else(|| TutorError::Parse(format!("missing UInt8 column '{}'", name)))
            })
            .collect::<TutorResult<Vec<&UInt8Array>>>()?;

        data.reserve(batch.num_rows() * n);
        for row in 0..batch.num_rows() {
            for (c, col) in columns.iter().enumerate() {
                if col.is_null(row) {
                    return Err(TutorError::Parse(format!(
                        "null at row {} of {}",
                        row, names[c]
                    )));
                }
                data.push(col.value(row));
            }
        }
    }

    Ok(ActionSpace::from_dense(grid, disabled_line, data)?.with_fingerprint(fingerprint))
}

impl ActionSpace {
    /// Persist to `path`, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> TutorResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        write_action_space(self, &mut writer)?;
        writer.flush()?;
        debug!(path = %path.display(), actions = self.len(), "saved action space");
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>, grid: &GridTopology) -> TutorResult<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let space = read_action_space(BufReader::new(file), grid)?;
        debug!(path = %path.display(), actions = space.len(), "loaded action space");
        Ok(space)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action_space::ActionSpaceBuilder;
    use std::io::Cursor;

    fn grid() -> GridTopology {
        GridTopology::from_json_str(
            r#"{
                "n_line": 3,
                "substations": [
                    { "id": 0, "loads_id": [0], "generators_id": [0], "lines_or_id": [0, 1, 2] },
                    { "id": 1, "lines_ex_id": [0, 1, 2] }
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_file_names() {
        assert_eq!(file_name_for(None), "action_space.arrow");
        assert_eq!(
            file_name_for(Some(LineId::new(18))),
            "action_space_lout18.arrow"
        );
    }

    #[test]
    fn test_in_memory_round_trip() {
        let grid = grid();
        let space = ActionSpaceBuilder::new(&grid)
            .disabled_line(Some(LineId::new(2)))
            .build()
            .unwrap();

        let mut buffer = Vec::new();
        write_action_space(&space, &mut buffer).unwrap();
        let loaded = read_action_space(Cursor::new(buffer), &grid).unwrap();

        assert_eq!(loaded.as_dense(), space.as_dense());
        assert_eq!(loaded.disabled_line(), Some(LineId::new(2)));
        assert_eq!(loaded.substations(), space.substations());
        assert!(space.fingerprint().is_some());
        assert_eq!(loaded.fingerprint(), space.fingerprint());
    }

    #[test]
    fn test_width_mismatch_rejected() {
        let grid = grid();
        let space = ActionSpaceBuilder::new(&grid).build().unwrap();
        let mut buffer = Vec::new();
        write_action_space(&space, &mut buffer).unwrap();

        let other = GridTopology::from_json_str(
            r#"{ "n_line": 1, "substations": [
                { "id": 0, "lines_or_id": [0] }, { "id": 1, "lines_ex_id": [0] }
            ] }"#,
        )
        .unwrap();
        let err = read_action_space(Cursor::new(buffer), &other).unwrap_err();
        assert!(matches!(err, TutorError::Validation(_)));
    }

    #[test]
    fn test_garbage_is_parse_error() {
        let grid = grid();
        let err = read_action_space(Cursor::new(b"not arrow".to_vec()), &grid).unwrap_err();
        assert!(matches!(err, TutorError::Parse(_)));
    }
}
