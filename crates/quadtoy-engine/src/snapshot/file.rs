use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use image::{ImageFormat, RgbaImage};

/// Milliseconds since the Unix epoch (0 if the clock is before it).
pub fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

pub fn file_name(timestamp_ms: u128) -> String {
    format!("{timestamp_ms}.png")
}

/// Encodes `image` as PNG into `directory/<timestamp_ms>.png`.
///
/// The bytes land in a `.part` sibling first and are renamed into place, so
/// a failed write never leaves a truncated PNG behind.
pub fn save(image: &RgbaImage, directory: &Path, timestamp_ms: u128) -> Result<PathBuf> {
    fs::create_dir_all(directory)
        .with_context(|| format!("failed to create {}", directory.display()))?;

    let path = directory.join(file_name(timestamp_ms));
    let part = PartialFile::new(path.with_extension("png.part"));

    image
        .save_with_format(part.path(), ImageFormat::Png)
        .with_context(|| format!("failed to encode {}", part.path().display()))?;

    part.commit(&path)?;
    Ok(path)
}

/// Temporary file removed on drop unless committed.
struct PartialFile {
    path: PathBuf,
    committed: bool,
}

impl PartialFile {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            committed: false,
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn commit(mut self, dest: &Path) -> Result<()> {
        fs::rename(&self.path, dest)
            .with_context(|| format!("failed to move snapshot to {}", dest.display()))?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.path);
        }
    }
}
