//! JSON file helpers with tmp-file + rename writes

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use calorie_types::StoreError;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Read and decode `path`; `None` when the file is missing or blank
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    if !path.exists() {
        return Ok(None);
    }

    let metadata = fs::metadata(path)?;
    if metadata.len() == 0 {
        return Ok(None);
    }

    let reader = BufReader::new(File::open(path)?);
    serde_json::from_reader(reader)
        .map(Some)
        .map_err(|e| StoreError::Corrupted(format!("{}: {}", path.display(), e)))
}

/// Encode `value` to `path` atomically.
///
/// The data is written and fsynced to a sibling `.tmp` file which is then
/// renamed over the target, so readers never observe a partial file.
pub fn save_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("json.tmp");
    {
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
    }

    fs::rename(&tmp_path, path)?;
    Ok(())
}
