//! Filesystem helpers shared by the file-backed pipeline stages.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;

/// Returns the most recently modified file in `dir` whose name satisfies `matches`.
///
/// A missing directory yields `Ok(None)`, same as a directory with no matches.
pub fn latest_matching<F>(dir: &Path, matches: F) -> Result<Option<PathBuf>>
where
    F: Fn(&str) -> bool,
{
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err).with_context(|| format!("failed to list {:?}", dir)),
    };

    let mut newest: Option<(SystemTime, PathBuf)> = None;
    for entry in entries {
        let entry = entry.with_context(|| format!("failed to read entry in {:?}", dir))?;
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        if !matches(name) {
            continue;
        }
        let metadata = entry
            .metadata()
            .with_context(|| format!("failed to stat {:?}", entry.path()))?;
        if !metadata.is_file() {
            continue;
        }
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        let is_newer = newest
            .as_ref()
            .map_or(true, |(current, _)| modified > *current);
        if is_newer {
            newest = Some((modified, entry.path()));
        }
    }
    Ok(newest.map(|(_, path)| path))
}

/// Reads and deserializes a JSON document.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("failed to open {:?}", path))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("invalid JSON in {:?}", path))
}

/// Writes `value` as 4-space indented JSON, creating parent directories first.
pub fn write_json_pretty<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("failed to create {:?}", parent))?;
    }
    let file = File::create(path).with_context(|| format!("failed to create {:?}", path))?;
    let mut writer = BufWriter::new(file);
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(b"    "));
    value
        .serialize(&mut serializer)
        .with_context(|| format!("failed to serialize {:?}", path))?;
    writer.flush()?;
    Ok(())
}
