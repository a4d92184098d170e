//! JSON session state file

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tenure_api::PersistedRecord;
use tracing::{debug, warn};

use crate::{StateStore, StoreResult};

/// Session record stored as one small JSON file.
///
/// Writes go to a sibling temp file which is then renamed over the target,
/// so a reader sees either the old record or the new one. A file that does
/// not parse is reported as absent.
pub struct JsonStateFile {
    path: PathBuf,
}

impl JsonStateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl StateStore for JsonStateFile {
    fn load_record(&self) -> StoreResult<Option<PersistedRecord>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str::<PersistedRecord>(&content) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring unreadable state file");
                Ok(None)
            }
        }
    }

    fn save_record(&self, record: &PersistedRecord) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string(record)?;
        let temp = self.temp_path();
        fs::write(&temp, json)?;
        fs::rename(&temp, &self.path)?;

        debug!(path = %self.path.display(), "State file saved");
        Ok(())
    }

    fn clear_record(&self) -> StoreResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "State file removed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
