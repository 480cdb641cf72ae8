//! Constitution file loading.

use std::path::Path;

use tracing::info;

use crate::constitution::Constitution;
use crate::error::{PolicyError, PolicyResult};

/// Load and validate a constitution from a YAML file.
///
/// # Errors
///
/// Returns a [`PolicyError`] when the file is missing, unreadable, not
/// valid YAML, or fails validation.
pub fn load_constitution(path: &Path) -> PolicyResult<Constitution> {
    if !path.exists() {
        return Err(PolicyError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let raw = std::fs::read_to_string(path).map_err(|source| PolicyError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let constitution: Constitution =
        serde_yaml::from_str(&raw).map_err(|source| PolicyError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    constitution.validate()?;
    info!(path = %path.display(), "constitution loaded");
    Ok(constitution)
}
