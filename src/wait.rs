//! Platform I/O primitives driven by the [`Accessor`](crate::Accessor)
//!
//! Two I/O models are supported, selected by target:
//!
//! - readiness polling ([`SelectWaiter`], unix): the device is in non-blocking mode, an attempt
//!   that would block returns `WouldBlock`, and `select(2)` waits for the descriptor with a
//!   short timeout;
//! - completion ([`OverlappedWaiter`], windows): each attempt issues an overlapped operation and
//!   waits for its completion event, so attempts never return `WouldBlock`.
//!
//! Both implement [`Waiter`], and the accessor loop is written once against that trait.

use std::io;
use std::time::Duration;

#[cfg(unix)]
mod select;
#[cfg(unix)]
pub use select::SelectWaiter;

#[cfg(windows)]
mod overlapped;
#[cfg(windows)]
pub use overlapped::OverlappedWaiter;

/// The waiter used by [`Interface::accessor`](crate::Interface::accessor)
#[cfg(unix)]
pub type DefaultWaiter = SelectWaiter;
#[cfg(windows)]
pub type DefaultWaiter = OverlappedWaiter;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Direction {
    Read,
    Write,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Readiness {
    Ready,
    TimedOut,
}

/// Raw value of a device handle: a file descriptor on unix, a `HANDLE` on windows
///
/// Stored as an integer so that it can live in an atomic slot. The value `-1` is never a valid
/// handle on either platform.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Handle(pub(crate) isize);

impl Handle {
    #[cfg(unix)]
    pub fn from_raw_fd(fd: std::os::unix::io::RawFd) -> Handle {
        Handle(fd as isize)
    }

    #[cfg(unix)]
    pub fn as_raw_fd(self) -> std::os::unix::io::RawFd {
        self.0 as std::os::unix::io::RawFd
    }

    #[cfg(windows)]
    pub fn from_raw_handle(handle: std::os::windows::io::RawHandle) -> Handle {
        Handle(handle as isize)
    }

    #[cfg(windows)]
    pub fn as_raw_handle(self) -> std::os::windows::io::RawHandle {
        self.0 as std::os::windows::io::RawHandle
    }
}

/// I/O primitives used by an accessor
///
/// `read` and `write` make one attempt. An attempt that transferred nothing because the device
/// was not ready returns an error of kind `WouldBlock`; an attempt that should simply be retried
/// returns `Interrupted`. In both cases the accessor re-checks whether it was stopped, calls
/// [`wait_ready`](Waiter::wait_ready), and tries again. Any other result goes straight back to
/// the caller.
pub trait Waiter: Send + Sync {
    /// Called once when an accessor is created over `handle`
    fn prepare(&self, handle: Handle) -> io::Result<()> {
        let _ = handle;
        Ok(())
    }

    fn read(&self, handle: Handle, buf: &mut [u8]) -> io::Result<usize>;

    fn write(&self, handle: Handle, buf: &[u8]) -> io::Result<usize>;

    /// Block until `handle` is ready for `direction`, or until `timeout` elapses
    ///
    /// A timeout is not an error. Completion-based waiters may ignore `timeout`.
    fn wait_ready(
        &self,
        handle: Handle,
        direction: Direction,
        timeout: Duration,
    ) -> io::Result<Readiness>;

    /// Called once, by the thread that stopped the accessor
    ///
    /// Waiters that can abort operations in flight do it here.
    fn cancel(&self, handle: Handle) -> io::Result<()> {
        let _ = handle;
        Ok(())
    }
}
