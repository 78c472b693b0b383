//! PCAP file format
//!
//! See <https://wiki.wireshark.org/Development/LibpcapFileFormat> for details.
//!
//! A capture file starts with a 24-byte global header, followed by zero or more records. Each
//! record is a 16-byte record header immediately followed by the captured bytes. All integers
//! use the byte order of the machine that wrote the file; it is detected from the magic number
//! when the file is opened and then used for every record.
//!
//! Two ways of reading are offered. The [`PcapReader`] streams packets from any
//! [`Read`](std::io::Read) source using a circular buffer, so memory usage does not depend on
//! the file size. For data already in memory, [`parse_pcap_header`] and
//! [`parse_pcap_record`] / [`parse_pcap_record_be`] can be called directly.
//!
//! Only version 2.4 files with Ethernet link type are accepted. Anything else is rejected when
//! the file is opened, never decoded on a best-effort basis.

mod header;
mod reader;
mod record;

pub use header::*;
pub use reader::*;
pub use record::*;
