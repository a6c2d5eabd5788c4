use std::io::Write;
use std::path::{Path, PathBuf};

use omm_core::{AudioError, ChimePlayer};

/// Chime stand-in for a terminal: rings the bell.
///
/// The asset is checked at load time so a missing file is reported once at
/// startup, the same as a player that failed to decode it.
#[derive(Debug)]
pub struct TerminalChime {
    path: PathBuf,
}

impl TerminalChime {
    pub fn load(path: &Path) -> Result<Self, AudioError> {
        let meta = std::fs::metadata(path).map_err(|e| AudioError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        if !meta.is_file() {
            return Err(AudioError::LoadFailed {
                path: path.to_path_buf(),
                message: "not a file".into(),
            });
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }
}

impl ChimePlayer for TerminalChime {
    fn rewind_and_play(&mut self) -> Result<(), AudioError> {
        tracing::debug!(path = %self.path.display(), "chime");
        let mut out = std::io::stdout();
        out.write_all(b"\x07")
            .and_then(|_| out.flush())
            .map_err(|e| AudioError::Playback(e.to_string()))
    }
}
