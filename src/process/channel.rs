/*!
 * Process Channels
 * Pipe pairs connecting the supervisor to a child's stdin and stdout
 */

use crate::core::guard::{FdGuard, Guard, GuardError};
use crate::core::types::Pid;
use std::io::{self, Read, Write};
use std::os::fd::{OwnedFd, RawFd};

/// Parent-side end of the child's stdout
#[derive(Debug)]
pub struct ChannelReader {
    guard: FdGuard,
}

/// Parent-side end of the child's stdin
#[derive(Debug)]
pub struct ChannelWriter {
    guard: FdGuard,
}

impl ChannelReader {
    /// Raw descriptor while open
    pub fn raw_fd(&self) -> Option<RawFd> {
        self.guard.raw_fd()
    }

    /// Close now instead of on drop
    pub fn close(mut self) -> io::Result<()> {
        self.guard.release().map_err(guard_to_io)
    }

    pub(crate) fn attach(&mut self, pid: Pid) {
        self.guard.set_pid(pid);
    }
}

impl ChannelWriter {
    /// Raw descriptor while open
    pub fn raw_fd(&self) -> Option<RawFd> {
        self.guard.raw_fd()
    }

    /// Close now, delivering EOF to the child
    pub fn close(mut self) -> io::Result<()> {
        self.guard.release().map_err(guard_to_io)
    }

    pub(crate) fn attach(&mut self, pid: Pid) {
        self.guard.set_pid(pid);
    }
}

impl Read for ChannelReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.guard.file_mut().map_err(guard_to_io)?.read(buf)
    }
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.guard.file_mut().map_err(guard_to_io)?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.guard.file_mut().map_err(guard_to_io)?.flush()
    }
}

fn guard_to_io(err: GuardError) -> io::Error {
    match err {
        GuardError::AlreadyReleased => io::Error::new(io::ErrorKind::BrokenPipe, "channel closed"),
        GuardError::OperationFailed(msg) => io::Error::other(msg),
    }
}

/// Both pipes of a spawn attempt, before the child exists
///
/// The child-side ends are handed to the child as stdin/stdout and must be
/// dropped in the parent right after process creation.
pub(crate) struct ChannelSet {
    pub child_stdin: OwnedFd,
    pub child_stdout: OwnedFd,
    pub writer: ChannelWriter,
    pub reader: ChannelReader,
}

impl ChannelSet {
    /// Create both pipes with close-on-exec set on every end
    ///
    /// On failure any pipe already created is closed by its guards.
    pub fn create() -> io::Result<Self> {
        let (stdin_read, stdin_write) = cloexec_pipe()?;
        let (stdout_read, stdout_write) = cloexec_pipe()?;

        Ok(Self {
            child_stdin: stdin_read,
            child_stdout: stdout_write,
            writer: ChannelWriter {
                guard: FdGuard::new(stdin_write, "stdin"),
            },
            reader: ChannelReader {
                guard: FdGuard::new(stdout_read, "stdout"),
            },
        })
    }
}

#[cfg(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "dragonfly"
))]
fn cloexec_pipe() -> io::Result<(OwnedFd, OwnedFd)> {
    use nix::fcntl::OFlag;
    Ok(nix::unistd::pipe2(OFlag::O_CLOEXEC)?)
}

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "dragonfly"
)))]
fn cloexec_pipe() -> io::Result<(OwnedFd, OwnedFd)> {
    use nix::fcntl::{fcntl, FcntlArg, FdFlag};
    use std::os::fd::AsRawFd;

    let (read_end, write_end) = nix::unistd::pipe()?;
    for fd in [&read_end, &write_end] {
        fcntl(fd.as_raw_fd(), FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC))?;
    }
    Ok((read_end, write_end))
}
