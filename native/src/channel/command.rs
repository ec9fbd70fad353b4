use super::open_append;
use crate::error::{ControlError, ControlResult};
use log::{debug, info};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Destination for serialized engine commands.
pub trait CommandSink {
    fn send(&mut self, command: &str) -> ControlResult<()>;
}

/// Append-only writer for the engine command pipe, opened on first use.
pub struct CommandEmitter {
    path: PathBuf,
    file: Option<File>,
}

impl CommandEmitter {
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

    /// Release the pipe handle. The next `send` reopens it.
    pub fn close(&mut self) {
        if self.file.take().is_some() {
            info!("[CMD] Closed command pipe {:?}", self.path);
        }
    }

    fn file(&mut self) -> ControlResult<&mut File> {
        if self.file.is_none() {
            let file = open_append(&self.path).map_err(|e| {
                ControlError::io(format!("Failed to open command pipe {:?}", self.path), e)
            })?;
            info!("[CMD] Opened command pipe {:?}", self.path);
            self.file = Some(file);
        }
        self.file.as_mut().ok_or(ControlError::ChannelUnavailable("Command"))
    }
}

impl CommandSink for CommandEmitter {
    fn send(&mut self, command: &str) -> ControlResult<()> {
        let line = format!("{}\n", command);
        let path = self.path.clone();
        self.file()?
            .write_all(line.as_bytes())
            .map_err(|e| ControlError::io(format!("Failed to write command to {:?}", path), e))?;
        debug!("[CMD] {}", command);
        Ok(())
    }
}

#[cfg(test)]
impl CommandSink for Vec<String> {
    fn send(&mut self, command: &str) -> ControlResult<()> {
        self.push(command.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn opens_lazily_and_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("command.pipe");
        fs::write(&path, "RESET\n").unwrap();

        let mut emitter = CommandEmitter::new(&path);
        assert!(!emitter.is_open());

        emitter.send("START").unwrap();
        assert!(emitter.is_open());
        emitter.send("STOP").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "RESET\nSTART\nSTOP\n");
    }

    #[test]
    fn reopens_after_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("command.pipe");

        let mut emitter = CommandEmitter::new(&path);
        emitter.send("RESET").unwrap();
        emitter.close();
        assert!(!emitter.is_open());
        emitter.send("START").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "RESET\nSTART\n");
    }

    #[test]
    fn open_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let mut emitter = CommandEmitter::new(dir.path().join("missing").join("command.pipe"));

        let err = emitter.send("RESET").unwrap_err();
        assert!(matches!(err, ControlError::Io { .. }));
        assert!(!emitter.is_open());
    }
}
