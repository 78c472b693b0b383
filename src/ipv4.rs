//! IPv4 header accessors
//!
//! Same approach as the [`ethernet`](crate::ethernet) accessors: fields are read in place from
//! the packet buffer, usually the payload returned by
//! [`mac_payload`](crate::ethernet::mac_payload), with bounds checks on every access.

use crate::error::FrameError;
use crate::utils::{array_ref, tail};
use std::net::Ipv4Addr;

/// Size of an IPv4 header without options
pub const IPV4_MIN_HEADER_LEN: usize = 20;

/// True if the version nibble of the first byte is 4
pub fn is_ipv4(packet: &[u8]) -> bool {
    packet.first().map_or(false, |b| b >> 4 == 4)
}

/// Header length in bytes, from the IHL field
pub fn ipv4_header_len(packet: &[u8]) -> Result<usize, FrameError> {
    let ihl = array_ref::<1>(packet, 0)?[0] & 0x0f;
    if usize::from(ihl) * 4 < IPV4_MIN_HEADER_LEN {
        return Err(FrameError::InvalidHeaderLength(ihl));
    }
    Ok(usize::from(ihl) * 4)
}

/// Transport protocol number
pub fn ipv4_protocol(packet: &[u8]) -> Result<u8, FrameError> {
    array_ref::<1>(packet, 9).map(|b| b[0])
}

pub fn ipv4_source(packet: &[u8]) -> Result<Ipv4Addr, FrameError> {
    array_ref::<4>(packet, 12).map(|b| Ipv4Addr::from(*b))
}

pub fn ipv4_destination(packet: &[u8]) -> Result<Ipv4Addr, FrameError> {
    array_ref::<4>(packet, 16).map(|b| Ipv4Addr::from(*b))
}

/// Everything after the header, options included in the header
pub fn ipv4_payload(packet: &[u8]) -> Result<&[u8], FrameError> {
    let len = ipv4_header_len(packet)?;
    tail(packet, len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    // UDP 10.0.0.1 -> 10.0.0.2, 4 bytes of payload
    const PACKET: &[u8] = &hex!(
        "
45 00 00 20 00 01 00 00 40 11 66 cb 0a 00 00 01
0a 00 00 02 de ad be ef"
    );

    #[test]
    fn test_fields() {
        assert!(is_ipv4(PACKET));
        assert_eq!(ipv4_header_len(PACKET), Ok(20));
        assert_eq!(ipv4_protocol(PACKET), Ok(17));
        assert_eq!(ipv4_source(PACKET), Ok(Ipv4Addr::new(10, 0, 0, 1)));
        assert_eq!(ipv4_destination(PACKET), Ok(Ipv4Addr::new(10, 0, 0, 2)));
        assert_eq!(ipv4_payload(PACKET), Ok(&hex!("de ad be ef")[..]));
    }

    #[test]
    fn test_options() {
        let mut p = PACKET[..20].to_vec();
        p[0] = 0x46;
        p.extend_from_slice(&[1, 1, 1, 0]);
        p.extend_from_slice(&PACKET[20..]);
        assert_eq!(ipv4_header_len(&p), Ok(24));
        assert_eq!(ipv4_payload(&p), Ok(&hex!("de ad be ef")[..]));
    }

    #[test]
    fn test_not_ipv4() {
        assert!(!is_ipv4(&[]));
        assert!(!is_ipv4(&[0x60, 0, 0, 0]));
    }

    #[test]
    fn test_bad_lengths() {
        assert_eq!(
            ipv4_header_len(&[0x44]),
            Err(FrameError::InvalidHeaderLength(4))
        );
        assert!(ipv4_source(&PACKET[..15]).is_err());
        assert_eq!(
            ipv4_destination(&PACKET[..19]),
            Err(FrameError::TooShort { needed: 20, len: 19 })
        );
        assert!(ipv4_payload(&PACKET[..19]).is_err());
        assert!(ipv4_header_len(&[]).is_err());
    }
}
