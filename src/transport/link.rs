use anyhow::{Context, Result};
use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::Path,
    sync::{Arc, Mutex},
};

use super::{ActuatorCommand, ActuatorTransport};

/// Newline-terminated text link, one command per line.
pub struct LineLink<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> LineLink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl LineLink<File> {
    /// Opens an already-configured serial device (or any writable path).
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(false)
            .open(path)
            .with_context(|| format!("failed to open actuator link {}", path.display()))?;
        Ok(Self::new(file))
    }
}

impl<W: Write + Send> ActuatorTransport for LineLink<W> {
    fn send(&mut self, command: &ActuatorCommand) -> Result<()> {
        writeln!(self.writer, "{}", command.as_line()).context("actuator write failed")?;
        self.writer.flush().context("actuator flush failed")
    }
}

/// Keeps every command in memory. Used when no device is configured.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    sent: Arc<Mutex<Vec<ActuatorCommand>>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<ActuatorCommand> {
        match self.sent.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl ActuatorTransport for RecordingTransport {
    fn send(&mut self, command: &ActuatorCommand) -> Result<()> {
        let mut guard = match self.sent.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.push(*command);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arm::ArmAxis;

    #[test]
    fn writes_one_line_per_command() {
        let mut link = LineLink::new(Vec::new());
        link.send(&ActuatorCommand::Unlock).unwrap();
        link.send(&ActuatorCommand::Arm {
            axis: ArmAxis::X,
            degrees: 12.34,
        })
        .unwrap();
        let written = String::from_utf8(link.into_inner()).unwrap();
        assert_eq!(written, "U\nX,12.3\n");
    }

    #[test]
    fn open_fails_for_missing_device() {
        let path = std::env::temp_dir()
            .join(format!("gesturelock-missing-{}", uuid::Uuid::new_v4()))
            .join("tty");
        assert!(LineLink::open(&path).is_err());
    }
}
