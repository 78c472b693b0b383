//! Cancellable blocking access to a device
//!
//! Reading from a TUN/TAP device blocks until a packet shows up, which may be never. An
//! [`Accessor`] does the same blocking reads and writes, but can be stopped from any other
//! thread: once [`stop`](Accessor::stop) returns, every operation in progress finishes within
//! about one poll timeout, and every later operation fails immediately.
//!
//! ```rust,no_run
//! # fn main() -> std::io::Result<()> {
//! # #[cfg(target_os = "linux")]
//! # {
//! use taptun::Interface;
//!
//! let tap = Interface::new_tap("tap0")?;
//! let accessor = tap.accessor()?;
//! std::thread::scope(|s| {
//!     s.spawn(|| {
//!         let mut frame = [0u8; 1514];
//!         while let Ok(n) = accessor.read(&mut frame) {
//!             println!("{} bytes", n);
//!         }
//!     });
//!     accessor.stop();
//! });
//! # }
//! # Ok(())
//! # }
//! ```

use std::io;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicIsize, Ordering};
use std::time::Duration;

use tracing::{debug, trace};

use crate::device::Interface;
use crate::error;
use crate::wait::{DefaultWaiter, Direction, Handle, Readiness, Waiter};

/// Default upper bound on a single readiness wait
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(1);

/// Accessor settings
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AccessorConfig {
    /// Upper bound on a single readiness wait, and so on the time a blocked operation takes to
    /// notice that the accessor was stopped
    pub poll_timeout: Duration,
}

impl AccessorConfig {
    pub fn with_poll_timeout(mut self, poll_timeout: Duration) -> AccessorConfig {
        self.poll_timeout = poll_timeout;
        self
    }
}

impl Default for AccessorConfig {
    fn default() -> Self {
        AccessorConfig {
            poll_timeout: DEFAULT_POLL_TIMEOUT,
        }
    }
}

const STOPPED: isize = -1;

/// Current device handle, or the stopped marker. Transitions only once, to stopped.
#[derive(Debug)]
struct HandleSlot(AtomicIsize);

impl HandleSlot {
    fn new(handle: Handle) -> HandleSlot {
        HandleSlot(AtomicIsize::new(handle.0))
    }

    fn load(&self) -> Option<Handle> {
        match self.0.load(Ordering::Acquire) {
            STOPPED => None,
            raw => Some(Handle(raw)),
        }
    }

    /// Swap in the stopped marker. Returns the previous handle if this call made the transition.
    fn stop(&self) -> Option<Handle> {
        let mut current = self.0.load(Ordering::Acquire);
        loop {
            if current == STOPPED {
                return None;
            }
            match self.0.compare_exchange_weak(
                current,
                STOPPED,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Some(Handle(current)),
                Err(actual) => current = actual,
            }
        }
    }
}

/// Cancellable reader and writer over an [`Interface`]
///
/// Obtained from [`Interface::accessor`]. `read`, `write` and `stop` take `&self`, so one
/// accessor can be shared between a reading thread, a writing thread and whoever decides to
/// stop them. The accessor borrows the interface and never closes it; drop the accessor, then
/// [`close`](Interface::close) the interface.
///
/// A stopped accessor stays stopped. Operations on it fail with an error for which
/// [`is_stopped`](crate::is_stopped) is true, without touching the device.
#[derive(Debug)]
pub struct Accessor<'a, W: Waiter = DefaultWaiter> {
    slot: HandleSlot,
    waiter: W,
    config: AccessorConfig,
    _device: PhantomData<&'a Interface>,
}

impl<'a, W: Waiter> Accessor<'a, W> {
    /// Create an accessor driven by a custom [`Waiter`]
    pub fn with_waiter(
        device: &'a Interface,
        waiter: W,
        config: AccessorConfig,
    ) -> io::Result<Accessor<'a, W>> {
        Accessor::from_handle(device.handle(), waiter, config)
    }

    pub(crate) fn from_handle(
        handle: Handle,
        waiter: W,
        config: AccessorConfig,
    ) -> io::Result<Accessor<'a, W>> {
        if handle.0 == STOPPED {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "invalid handle"));
        }
        waiter.prepare(handle)?;
        debug!(?handle, poll_timeout = ?config.poll_timeout, "accessor created");
        Ok(Accessor {
            slot: HandleSlot::new(handle),
            waiter,
            config,
            _device: PhantomData,
        })
    }

    pub fn config(&self) -> &AccessorConfig {
        &self.config
    }

    /// Read one packet (or frame) into `buf`, blocking until data is available
    ///
    /// Returns the number of bytes read. Fails with a stopped error if the accessor is, or
    /// becomes, stopped before any byte was transferred.
    pub fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        self.transfer(Direction::Read, |waiter, handle| waiter.read(handle, buf))
    }

    /// Write one packet (or frame) from `buf`, blocking until the device accepts it
    ///
    /// A short write is returned as is, it is not retried.
    pub fn write(&self, buf: &[u8]) -> io::Result<usize> {
        self.transfer(Direction::Write, |waiter, handle| waiter.write(handle, buf))
    }

    /// Stop the accessor
    ///
    /// Returns true for the call that stopped it, false if it was already stopped. Blocked
    /// operations return within about one poll timeout.
    pub fn stop(&self) -> bool {
        match self.slot.stop() {
            Some(handle) => {
                debug!(?handle, "accessor stopped");
                if let Err(e) = self.waiter.cancel(handle) {
                    debug!("cancelling pending I/O failed: {}", e);
                }
                true
            }
            None => false,
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.slot.load().is_none()
    }

    fn transfer<F>(&self, direction: Direction, mut attempt: F) -> io::Result<usize>
    where
        F: FnMut(&W, Handle) -> io::Result<usize>,
    {
        let mut ready = true;
        loop {
            let handle = self.slot.load().ok_or_else(error::stopped)?;
            if ready {
                match attempt(&self.waiter, handle) {
                    Err(e)
                        if e.kind() == io::ErrorKind::WouldBlock
                            || e.kind() == io::ErrorKind::Interrupted => {}
                    r => return r,
                }
            }
            ready = self
                .waiter
                .wait_ready(handle, direction, self.config.poll_timeout)?
                == Readiness::Ready;
            if !ready {
                trace!(?direction, "poll timeout");
            }
        }
    }
}

impl<W: Waiter> io::Read for &Accessor<'_, W> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Accessor::read(*self, buf)
    }
}

impl<W: Waiter> io::Read for Accessor<'_, W> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Accessor::read(self, buf)
    }
}

impl<W: Waiter> io::Write for &Accessor<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Accessor::write(*self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<W: Waiter> io::Write for Accessor<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Accessor::write(self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
