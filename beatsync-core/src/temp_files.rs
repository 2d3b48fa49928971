//! Temporary file management utilities.
//!
//! Helpers for the scratch directory that holds rendered segments and the
//! concat list, and for the hidden temporary file the final encode writes
//! before it is renamed onto the output path. Both rely on the tempfile
//! crate's Drop impls, so scratch data is removed on every exit path.

use crate::config::SyncConfig;
use crate::error::CoreResult;
use std::path::{Path, PathBuf};
use tempfile::{Builder as TempFileBuilder, NamedTempFile, TempDir};

/// Creates a scratch directory with prefix. Auto-cleaned when dropped.
///
/// The directory is created under `config.temp_dir` when set, otherwise
/// under `fallback_base` (normally the output file's directory).
pub fn create_temp_dir(config: &SyncConfig, fallback_base: &Path, prefix: &str) -> CoreResult<TempDir> {
    let temp_base_dir = config.temp_dir.as_deref().unwrap_or(fallback_base);
    std::fs::create_dir_all(temp_base_dir)?;

    Ok(TempFileBuilder::new()
        .prefix(prefix)
        .tempdir_in(temp_base_dir)?)
}

/// Creates a temporary file with prefix and extension. Auto-deleted when dropped.
pub fn create_temp_file(dir: &Path, prefix: &str, extension: &str) -> CoreResult<NamedTempFile> {
    std::fs::create_dir_all(dir)?;
    let temp_file = TempFileBuilder::new()
        .prefix(&format!("{prefix}_"))
        .suffix(&format!(".{extension}"))
        .tempfile_in(dir)?;

    Ok(temp_file)
}

/// Returns a temporary file path with random suffix. Does not create the file.
pub fn create_temp_file_path(dir: &Path, prefix: &str, extension: &str) -> PathBuf {
    use rand::distributions::Alphanumeric;
    use rand::{Rng, thread_rng};

    let random_suffix: String = thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();

    let filename = format!("{prefix}_{random_suffix}.{extension}");
    dir.join(filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_dir_honours_configured_base() {
        let base = tempfile::tempdir().unwrap();
        let other = tempfile::tempdir().unwrap();
        let config = SyncConfig {
            temp_dir: Some(base.path().join("scratch")),
            ..SyncConfig::default()
        };
        let dir = create_temp_dir(&config, other.path(), "beatsync_").unwrap();
        assert!(dir.path().starts_with(base.path().join("scratch")));
        let kept = dir.path().to_path_buf();
        drop(dir);
        assert!(!kept.exists());
    }

    #[test]
    fn temp_file_path_is_unique_and_not_created() {
        let base = tempfile::tempdir().unwrap();
        let a = create_temp_file_path(base.path(), "segment_0000", "mp4");
        let b = create_temp_file_path(base.path(), "segment_0000", "mp4");
        assert_ne!(a, b);
        assert!(!a.exists());
        assert_eq!(a.extension().unwrap(), "mp4");
    }

    #[test]
    fn temp_file_is_created_in_dir() {
        let base = tempfile::tempdir().unwrap();
        let file = create_temp_file(&base.path().join("nested"), ".output", "mp4").unwrap();
        assert!(file.path().starts_with(base.path().join("nested")));
        assert!(file.path().exists());
    }
}
