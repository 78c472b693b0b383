//! TUN and TAP devices
//!
//! An [`Interface`] owns the handle of an open device, along with its kind and name. Reading
//! from it returns one packet (TUN) or one Ethernet frame (TAP) per call, and writing injects
//! one. On Linux the device can be created here; on other systems the handle is opened by
//! platform code and wrapped with [`Interface::from_file`].

use std::fmt;
use std::fs::File;
use std::io::{self, Read, Write};

use tracing::debug;

use crate::accessor::{Accessor, AccessorConfig};
use crate::wait::{DefaultWaiter, Handle};

/// Longest accepted interface name, in bytes
pub const MAX_NAME_LEN: usize = 16;

/// Layer of the traffic carried by a device
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum DeviceKind {
    /// IP packets, layer 3
    Tun,
    /// Ethernet frames, layer 2
    Tap,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DeviceKind::Tun => f.write_str("tun"),
            DeviceKind::Tap => f.write_str("tap"),
        }
    }
}

/// An open TUN or TAP device
///
/// The handle is released when the interface is dropped, or explicitly with
/// [`close`](Interface::close) to see the error. Accessors borrow the interface, so it cannot
/// be closed while one is alive.
#[derive(Debug)]
pub struct Interface {
    kind: DeviceKind,
    name: String,
    file: File,
}

impl Interface {
    /// Wrap an already open device handle
    ///
    /// Fails if `name` is longer than [`MAX_NAME_LEN`] bytes.
    pub fn from_file<S: Into<String>>(
        kind: DeviceKind,
        name: S,
        file: File,
    ) -> io::Result<Interface> {
        let name = name.into();
        if name.len() > MAX_NAME_LEN {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("interface name '{}' is too long", name),
            ));
        }
        Ok(Interface { kind, name, file })
    }

    /// Create (or attach to) the TUN device `name`
    ///
    /// An empty name lets the kernel pick one, see [`name`](Interface::name).
    #[cfg(target_os = "linux")]
    pub fn new_tun(name: &str) -> io::Result<Interface> {
        Self::create(DeviceKind::Tun, name)
    }

    /// Create (or attach to) the TAP device `name`
    #[cfg(target_os = "linux")]
    pub fn new_tap(name: &str) -> io::Result<Interface> {
        Self::create(DeviceKind::Tap, name)
    }

    #[cfg(target_os = "linux")]
    fn create(kind: DeviceKind, name: &str) -> io::Result<Interface> {
        let (file, name) = linux::open(kind, name)?;
        debug!(%kind, %name, "device created");
        Interface::from_file(kind, name, file)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    pub fn is_tun(&self) -> bool {
        self.kind == DeviceKind::Tun
    }

    pub fn is_tap(&self) -> bool {
        self.kind == DeviceKind::Tap
    }

    /// A cancellable accessor with the default settings
    ///
    /// On unix this puts the device in non-blocking mode, which stays in effect after the
    /// accessor is dropped; direct reads on the interface may then fail with `WouldBlock`.
    pub fn accessor(&self) -> io::Result<Accessor<'_>> {
        self.accessor_with_config(AccessorConfig::default())
    }

    pub fn accessor_with_config(&self, config: AccessorConfig) -> io::Result<Accessor<'_>> {
        Accessor::with_waiter(self, DefaultWaiter::default(), config)
    }

    /// Release the device handle, reporting a failure to do so
    #[cfg(unix)]
    pub fn close(self) -> io::Result<()> {
        use std::os::unix::io::IntoRawFd;

        debug!(kind = %self.kind, name = %self.name, "closing device");
        let fd = self.file.into_raw_fd();
        if unsafe { libc::close(fd) } < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// Release the device handle, reporting a failure to do so
    #[cfg(windows)]
    pub fn close(self) -> io::Result<()> {
        use std::os::windows::io::IntoRawHandle;
        use windows::Win32::Foundation::{CloseHandle, HANDLE};

        debug!(kind = %self.kind, name = %self.name, "closing device");
        let handle = self.file.into_raw_handle();
        unsafe { CloseHandle(HANDLE(handle)) }
            .map_err(|e| io::Error::from_raw_os_error(e.code().0 & 0xffff))
    }

    #[cfg(unix)]
    pub(crate) fn handle(&self) -> Handle {
        use std::os::unix::io::AsRawFd;
        Handle::from_raw_fd(self.file.as_raw_fd())
    }

    #[cfg(windows)]
    pub(crate) fn handle(&self) -> Handle {
        use std::os::windows::io::AsRawHandle;
        Handle::from_raw_handle(self.file.as_raw_handle())
    }
}

#[cfg(unix)]
impl std::os::unix::io::AsRawFd for Interface {
    fn as_raw_fd(&self) -> std::os::unix::io::RawFd {
        self.handle().as_raw_fd()
    }
}

#[cfg(windows)]
impl std::os::windows::io::AsRawHandle for Interface {
    fn as_raw_handle(&self) -> std::os::windows::io::RawHandle {
        self.handle().as_raw_handle()
    }
}

// Overlapped handles need an OVERLAPPED record on every call, so plain File I/O cannot be used.
#[cfg(windows)]
impl Read for &Interface {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        use crate::wait::Waiter;
        DefaultWaiter::default().read(self.handle(), buf)
    }
}

#[cfg(windows)]
impl Write for &Interface {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        use crate::wait::Waiter;
        DefaultWaiter::default().write(self.handle(), buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(unix)]
impl Read for &Interface {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (&self.file).read(buf)
    }
}

#[cfg(unix)]
impl Write for &Interface {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (&self.file).write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Read for Interface {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (&*self).read(buf)
    }
}

impl Write for Interface {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (&*self).write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(target_os = "linux")]
mod linux {
    use super::DeviceKind;
    use std::fs::{File, OpenOptions};
    use std::io;
    use std::os::unix::io::AsRawFd;

    const TUN_PATH: &str = "/dev/net/tun";
    const TUNSETIFF: libc::c_ulong = 0x4004_54ca;

    // struct ifreq, with only the flags member of the union
    #[repr(C)]
    struct IfReq {
        name: [u8; libc::IFNAMSIZ],
        flags: libc::c_short,
        _pad: [u8; 22],
    }

    /// Open the clone device and bind it to `name`. Returns the name assigned by the kernel.
    pub(super) fn open(kind: DeviceKind, name: &str) -> io::Result<(File, String)> {
        // one byte is kept for the terminating NUL
        if name.len() >= libc::IFNAMSIZ {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("interface name '{}' is too long", name),
            ));
        }
        let file = OpenOptions::new().read(true).write(true).open(TUN_PATH)?;
        let kind_flag = match kind {
            DeviceKind::Tun => libc::IFF_TUN,
            DeviceKind::Tap => libc::IFF_TAP,
        };
        let mut req = IfReq {
            name: [0; libc::IFNAMSIZ],
            flags: (kind_flag | libc::IFF_NO_PI) as libc::c_short,
            _pad: [0; 22],
        };
        req.name[..name.len()].copy_from_slice(name.as_bytes());
        let ret = unsafe { libc::ioctl(file.as_raw_fd(), TUNSETIFF as _, &mut req as *mut IfReq) };
        if ret < 0 {
            return Err(io::Error::last_os_error());
        }
        let len = req
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(req.name.len());
        Ok((file, String::from_utf8_lossy(&req.name[..len]).into_owned()))
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_ifreq_layout() {
            assert_eq!(std::mem::size_of::<IfReq>(), 40);
        }

        #[test]
        fn test_name_too_long() {
            let e = open(DeviceKind::Tap, "a-very-long-ifname").unwrap_err();
            assert_eq!(e.kind(), io::ErrorKind::InvalidInput);
        }
    }
}
