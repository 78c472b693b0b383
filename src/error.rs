use crate::linktype::Linktype;
use nom::error::{ErrorKind, ParseError};
use std::io;
use thiserror::Error;

/// Errors raised while decoding a capture container
#[derive(Debug, Error)]
pub enum PcapError {
    /// The magic number matched neither byte order
    #[error("unsupported file format")]
    HeaderNotRecognized,
    #[error("unsupported version {major}.{minor}")]
    UnsupportedVersion { major: u16, minor: u16 },
    #[error("unsupported link type {0}")]
    UnsupportedLinktype(Linktype),
    /// A record header declares more captured bytes than the packet originally had
    #[error("invalid record: captured length {caplen} exceeds original length {origlen}")]
    InvalidRecord { caplen: u32, origlen: u32 },
    /// The input ended inside a header or a record
    #[error("unexpected end of file")]
    UnexpectedEof,
    #[error("read error: {0}")]
    Io(#[from] io::Error),
    #[error("nom error: {0:?}")]
    NomError(ErrorKind),
}

impl<I> ParseError<I> for PcapError {
    fn from_error_kind(_input: I, kind: ErrorKind) -> Self {
        PcapError::NomError(kind)
    }
    fn append(_input: I, kind: ErrorKind, _other: Self) -> Self {
        PcapError::NomError(kind)
    }
}

/// Errors raised by the frame and IPv4 field accessors
///
/// The accessors never index past the end of the buffer they are given; a buffer too short for
/// the requested field is reported here instead.
#[derive(Clone, Copy, Debug, Error, Eq, PartialEq)]
pub enum FrameError {
    #[error("buffer too short: {needed} bytes needed, {len} available")]
    TooShort { needed: usize, len: usize },
    /// IPv4 header length field below the 20-byte minimum
    #[error("invalid IPv4 header length {0}")]
    InvalidHeaderLength(u8),
}

#[derive(Debug, Error)]
#[error("accessor stopped")]
struct Stopped;

/// The error returned by every read or write on a stopped accessor.
///
/// Its kind is `UnexpectedEof`, so stream consumers treat it as a regular end of stream. Use
/// [`is_stopped`] to tell it apart from a device that went away.
pub fn stopped() -> io::Error {
    io::Error::new(io::ErrorKind::UnexpectedEof, Stopped)
}

/// Returns true if `err` was produced by a stopped accessor
pub fn is_stopped(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::UnexpectedEof
        && err.get_ref().map_or(false, |inner| inner.is::<Stopped>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stopped_error_is_eof() {
        let e = stopped();
        assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof);
        assert!(is_stopped(&e));
        assert_eq!(e.to_string(), "accessor stopped");
    }

    #[test]
    fn plain_eof_is_not_stopped() {
        let e = io::Error::from(io::ErrorKind::UnexpectedEof);
        assert!(!is_stopped(&e));
        let e = io::Error::new(io::ErrorKind::UnexpectedEof, "remote closed");
        assert!(!is_stopped(&e));
    }

    #[test]
    fn pcap_error_messages() {
        let e = PcapError::UnsupportedVersion { major: 2, minor: 3 };
        assert_eq!(e.to_string(), "unsupported version 2.3");
        let e = PcapError::UnsupportedLinktype(Linktype::RAW);
        assert_eq!(e.to_string(), "unsupported link type RAW");
        assert_eq!(
            PcapError::HeaderNotRecognized.to_string(),
            "unsupported file format"
        );
    }
}
