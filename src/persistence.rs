// File: src/persistence.rs
use crate::error::RaterResult;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Writes `value` to `path` as a bincode snapshot.
///
/// The bytes go to a temp file in the same directory which is then renamed
/// over `path`, so readers never see a half-written snapshot.
pub fn save_to_disk<T: Serialize>(value: &T, path: &Path) -> RaterResult<()> {
    let parent_dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent_dir)?;

    let temp_file = NamedTempFile::new_in(parent_dir)?;
    {
        let mut writer = BufWriter::new(&temp_file);
        bincode::serialize_into(&mut writer, value)?;
        writer.flush()?;
    }

    temp_file.persist(path).map_err(|e| e.error)?;
    tracing::info!(path = %path.display(), "snapshot saved");
    Ok(())
}

pub fn load_from_disk<T: DeserializeOwned>(path: &Path) -> RaterResult<T> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    Ok(bincode::deserialize_from(reader)?)
}

/// Loads a snapshot, or builds a fresh value when the file is missing or unreadable.
pub fn load_or_else<T: DeserializeOwned>(path: &Path, fresh: impl FnOnce() -> T) -> T {
    if !path.exists() {
        return fresh();
    }
    match load_from_disk(path) {
        Ok(value) => {
            tracing::info!(path = %path.display(), "snapshot loaded");
            value
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "unreadable snapshot, starting empty");
            fresh()
        }
    }
}
