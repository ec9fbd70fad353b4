// Byte-stream channels shared with the radio engine: the command pipe, the
// transmit/receive message pipes and the availability probe over them.

pub mod command;
pub mod message;
pub mod probe;
pub mod reader;

pub use command::{CommandEmitter, CommandSink};
pub use message::MessageEmitter;
pub use probe::{probe_channels, ChannelStatus, StatusReport};
pub use reader::{poll_until_message, LineMessageReader, ReadStep, ReceiveBuffer};

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

/// Open a channel for appending, creating a plain file if nothing exists yet.
pub(crate) fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().append(true).create(true).open(path)
}

/// Open a channel for reading without blocking on a missing writer.
#[cfg(unix)]
pub(crate) fn open_nonblocking_read(path: &Path) -> io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;

    OpenOptions::new()
        .read(true)
        .custom_flags(libc::O_NONBLOCK)
        .open(path)
}

#[cfg(not(unix))]
pub(crate) fn open_nonblocking_read(path: &Path) -> io::Result<File> {
    OpenOptions::new().read(true).open(path)
}
