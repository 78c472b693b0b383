use std::io;
use std::mem;
use std::os::unix::io::RawFd;
use std::ptr;
use std::time::Duration;

use super::{Direction, Handle, Readiness, Waiter};

// Word type of `fd_set`. The kernel interface is a plain bitset of these words, see
// select(2); libc keeps the field private, so the set is built here and passed by pointer.
#[cfg(any(target_vendor = "apple", target_os = "openbsd", target_os = "netbsd"))]
type FdMask = u32;
#[cfg(not(any(target_vendor = "apple", target_os = "openbsd", target_os = "netbsd")))]
type FdMask = libc::c_ulong;

const FD_SETSIZE: usize = libc::FD_SETSIZE as usize;
const FD_WORDS: usize = FD_SETSIZE / FdMask::BITS as usize;

#[repr(C)]
struct FdSet {
    bits: [FdMask; FD_WORDS],
}

const _: () = assert!(mem::size_of::<FdSet>() == mem::size_of::<libc::fd_set>());

impl FdSet {
    /// A set holding only `fd`
    fn single(fd: RawFd) -> io::Result<FdSet> {
        let mut set = FdSet {
            bits: [0; FD_WORDS],
        };
        let (index, offset) = bit_position(fd, FdMask::BITS)?;
        let word = set
            .bits
            .get_mut(index)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "descriptor out of range"))?;
        *word |= (1 as FdMask) << offset;
        Ok(set)
    }

    fn as_mut_ptr(&mut self) -> *mut libc::fd_set {
        (self as *mut FdSet).cast()
    }
}

/// Word index and bit offset of `fd` in a bitset made of `word_bits`-bit words
///
/// Word sizes other than 16, 32, 64 and 128 bits are rejected.
pub(crate) fn bit_position(fd: RawFd, word_bits: u32) -> io::Result<(usize, u32)> {
    if fd < 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "negative file descriptor",
        ));
    }
    let (shift, mask) = match word_bits {
        16 => (4, 0x0f),
        32 => (5, 0x1f),
        64 => (6, 0x3f),
        128 => (7, 0x7f),
        _ => {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "unexpected fd_set word size",
            ))
        }
    };
    Ok(((fd >> shift) as usize, (fd & mask) as u32))
}

/// Readiness waiter based on `select(2)`
///
/// Descriptors must be below `FD_SETSIZE`; [`prepare`](Waiter::prepare) checks it and puts the
/// descriptor in non-blocking mode.
#[derive(Clone, Copy, Debug, Default)]
pub struct SelectWaiter;

impl Waiter for SelectWaiter {
    fn prepare(&self, handle: Handle) -> io::Result<()> {
        let fd = handle.as_raw_fd();
        if fd < 0 || fd as usize >= FD_SETSIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "file descriptor cannot be used with select(2)",
            ));
        }
        let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
        if flags < 0 {
            return Err(io::Error::last_os_error());
        }
        if flags & libc::O_NONBLOCK == 0
            && unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) } < 0
        {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn read(&self, handle: Handle, buf: &mut [u8]) -> io::Result<usize> {
        match unsafe { libc::read(handle.as_raw_fd(), buf.as_mut_ptr().cast(), buf.len()) } {
            -1 => Err(io::Error::last_os_error()),
            n => Ok(n as usize),
        }
    }

    fn write(&self, handle: Handle, buf: &[u8]) -> io::Result<usize> {
        match unsafe { libc::write(handle.as_raw_fd(), buf.as_ptr().cast(), buf.len()) } {
            -1 => Err(io::Error::last_os_error()),
            n => Ok(n as usize),
        }
    }

    /// Also watches the exception set, so device errors wake the wait up early.
    fn wait_ready(
        &self,
        handle: Handle,
        direction: Direction,
        timeout: Duration,
    ) -> io::Result<Readiness> {
        let fd = handle.as_raw_fd();
        let mut set = FdSet::single(fd)?;
        let mut eset = FdSet::single(fd)?;
        let mut tv = libc::timeval {
            tv_sec: timeout.as_secs() as libc::time_t,
            tv_usec: timeout.subsec_micros() as libc::suseconds_t,
        };
        let (rset, wset) = match direction {
            Direction::Read => (set.as_mut_ptr(), ptr::null_mut()),
            Direction::Write => (ptr::null_mut(), set.as_mut_ptr()),
        };
        let n = unsafe { libc::select(fd + 1, rset, wset, eset.as_mut_ptr(), &mut tv) };
        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(Readiness::TimedOut);
            }
            return Err(err);
        }
        // only one descriptor is watched, no need to check which one is ready
        if n > 0 {
            Ok(Readiness::Ready)
        } else {
            Ok(Readiness::TimedOut)
        }
    }
}
