use super::open_append;
use crate::error::{ControlError, ControlResult};
use log::{debug, info};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Best-effort writer for outbound payload lines.
///
/// Unlike the command pipe this channel is never opened implicitly: the
/// lifecycle controller opens it on `START` once a message source has been
/// declared, and until then every send is dropped.
pub struct MessageEmitter {
    path: PathBuf,
    file: Option<File>,
}

impl MessageEmitter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    pub fn open(&mut self) -> ControlResult<()> {
        if self.file.is_none() {
            let file = open_append(&self.path).map_err(|e| {
                ControlError::io(format!("Failed to open transmit pipe {:?}", self.path), e)
            })?;
            info!("[TX] Opened transmit pipe {:?}", self.path);
            self.file = Some(file);
        }
        Ok(())
    }

    pub fn close(&mut self) {
        if self.file.take().is_some() {
            info!("[TX] Closed transmit pipe {:?}", self.path);
        }
    }

    pub fn send_message(&mut self, payload: &str) -> ControlResult<()> {
        let Some(file) = self.file.as_mut() else {
            debug!("[TX] Transmit pipe not open, dropping message");
            return Ok(());
        };
        file.write_all(format!("{}\n", payload).as_bytes())
            .map_err(|e| ControlError::io(format!("Failed to write message to {:?}", self.path), e))
    }
}
