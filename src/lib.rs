//! # TUN/TAP access and packet decoding
//!
//! This crate provides the pieces needed to exchange traffic with a virtual network interface
//! and to inspect it:
//!
//! - [`Interface`]: an open TUN (IP packets) or TAP (Ethernet frames) device;
//! - [`Accessor`]: blocking reads and writes on a device that another thread can cancel at any
//!   time with [`Accessor::stop`];
//! - [`pcap`]: a streaming reader for legacy pcap capture files, in either byte order;
//! - [`ethernet`] and [`ipv4`]: zero-copy field accessors over raw frames and packets.
//!
//! The decoders never panic on malformed input and never read outside the buffer they are
//! given. Errors are reported with [`PcapError`] and [`FrameError`].
//!
//! # Example: reading a capture file
//!
//! ```rust,no_run
//! use taptun::ethernet::{mac_destination, mac_ethertype, mac_source};
//! use taptun::pcap::PcapReader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let reader = PcapReader::open("capture.pcap")?;
//! for packet in reader {
//!     let packet = packet?;
//!     let frame = &packet.data;
//!     println!(
//!         "{} -> {} ({})",
//!         mac_source(frame)?,
//!         mac_destination(frame)?,
//!         mac_ethertype(frame)?
//!     );
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Example: stopping a blocked reader
//!
//! An [`Accessor`] is shared by reference between threads. `read` blocks until a frame
//! arrives; `stop` makes it return an error for which [`is_stopped`] is true.
//!
//! ```rust,no_run
//! # fn main() -> std::io::Result<()> {
//! # #[cfg(target_os = "linux")]
//! # {
//! use taptun::{is_stopped, Interface};
//!
//! let tap = Interface::new_tap("tap0")?;
//! let accessor = tap.accessor()?;
//! std::thread::scope(|s| {
//!     let reader = s.spawn(|| accessor.read(&mut [0u8; 1514]));
//!     accessor.stop();
//!     if let Err(e) = reader.join().unwrap() {
//!         assert!(is_stopped(&e));
//!     }
//! });
//! drop(accessor);
//! tap.close()?;
//! # }
//! # Ok(())
//! # }
//! ```

#[cfg(not(any(unix, windows)))]
compile_error!("only unix and windows targets are supported");

mod endianness;
mod error;
mod linktype;
mod utils;
pub use endianness::ByteOrder;
pub use error::*;
pub use linktype::*;

mod accessor;
mod device;
pub mod wait;
pub use accessor::*;
pub use device::*;

pub mod ethernet;
pub mod ipv4;
pub mod pcap;
