use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use windows::Win32::Foundation::{
    CloseHandle, ERROR_IO_PENDING, ERROR_OPERATION_ABORTED, HANDLE, WAIT_FAILED,
};
use windows::Win32::Storage::FileSystem::{ReadFile, WriteFile};
use windows::Win32::System::Threading::{CreateEventW, WaitForSingleObject, INFINITE};
use windows::Win32::System::IO::{CancelIoEx, GetOverlappedResult, OVERLAPPED};

use super::{Direction, Handle, Readiness, Waiter};

/// Completion waiter based on overlapped I/O
///
/// The device handle must have been opened with `FILE_FLAG_OVERLAPPED`. Each attempt issues
/// one operation with its own event and blocks until it completes.
///
/// [`cancel`](Waiter::cancel) raises a flag, then aborts the operation in flight with
/// `CancelIoEx`. An attempt issued after the flag was raised cancels itself as soon as it is
/// pending, so an operation started concurrently with the stop cannot block forever. The
/// cancelled attempt reports `Interrupted`, and the accessor then sees that it was stopped.
#[derive(Debug, Default)]
pub struct OverlappedWaiter {
    cancelled: AtomicBool,
}

/// Manual-reset event, closed on drop
struct Event(HANDLE);

impl Event {
    fn new() -> io::Result<Event> {
        let handle = unsafe { CreateEventW(None, true, false, None) }.map_err(os_error)?;
        Ok(Event(handle))
    }
}

impl Drop for Event {
    fn drop(&mut self) {
        unsafe {
            let _ = CloseHandle(self.0);
        }
    }
}

fn os_error(e: windows::core::Error) -> io::Error {
    // HRESULT_FROM_WIN32 keeps the win32 code in the low word
    io::Error::from_raw_os_error(e.code().0 & 0xffff)
}

fn cancelled_error() -> io::Error {
    io::Error::new(io::ErrorKind::Interrupted, "pending operation cancelled")
}

impl OverlappedWaiter {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Wait for an issued operation and collect its byte count
    fn complete(
        &self,
        handle: HANDLE,
        issued: windows::core::Result<()>,
        overlapped: &OVERLAPPED,
        event: &Event,
    ) -> io::Result<usize> {
        if let Err(e) = issued {
            if e.code() != ERROR_IO_PENDING.to_hresult() {
                return Err(os_error(e));
            }
            // cancel() may have run before this operation existed
            if self.is_cancelled() {
                unsafe {
                    let _ = CancelIoEx(handle, Some(overlapped as *const OVERLAPPED));
                }
            }
            if unsafe { WaitForSingleObject(event.0, INFINITE) } == WAIT_FAILED {
                let err = io::Error::last_os_error();
                // the kernel must be done with the buffer and the OVERLAPPED record before
                // they are released
                unsafe {
                    let _ = CancelIoEx(handle, Some(overlapped as *const OVERLAPPED));
                    let mut transferred = 0u32;
                    let _ = GetOverlappedResult(handle, overlapped, &mut transferred, true);
                }
                return Err(err);
            }
        }
        let mut transferred = 0u32;
        match unsafe { GetOverlappedResult(handle, overlapped, &mut transferred, false) } {
            Ok(()) => Ok(transferred as usize),
            Err(e) if e.code() == ERROR_OPERATION_ABORTED.to_hresult() => Err(cancelled_error()),
            Err(e) => Err(os_error(e)),
        }
    }
}

impl Waiter for OverlappedWaiter {
    fn prepare(&self, handle: Handle) -> io::Result<()> {
        if handle.as_raw_handle().is_null() {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "null handle"));
        }
        Ok(())
    }

    fn read(&self, handle: Handle, buf: &mut [u8]) -> io::Result<usize> {
        if self.is_cancelled() {
            return Err(cancelled_error());
        }
        let handle = HANDLE(handle.as_raw_handle());
        let event = Event::new()?;
        let mut overlapped = OVERLAPPED {
            hEvent: event.0,
            ..Default::default()
        };
        let issued =
            unsafe { ReadFile(handle, Some(buf), None, Some(&mut overlapped as *mut _)) };
        self.complete(handle, issued, &overlapped, &event)
    }

    fn write(&self, handle: Handle, buf: &[u8]) -> io::Result<usize> {
        if self.is_cancelled() {
            return Err(cancelled_error());
        }
        let handle = HANDLE(handle.as_raw_handle());
        let event = Event::new()?;
        let mut overlapped = OVERLAPPED {
            hEvent: event.0,
            ..Default::default()
        };
        let issued =
            unsafe { WriteFile(handle, Some(buf), None, Some(&mut overlapped as *mut _)) };
        self.complete(handle, issued, &overlapped, &event)
    }

    /// Attempts block until completion, so there is never anything to wait for here.
    fn wait_ready(&self, _: Handle, _: Direction, _: Duration) -> io::Result<Readiness> {
        Ok(Readiness::Ready)
    }

    fn cancel(&self, handle: Handle) -> io::Result<()> {
        self.cancelled.store(true, Ordering::SeqCst);
        unsafe { CancelIoEx(HANDLE(handle.as_raw_handle()), None) }.map_err(os_error)
    }
}
