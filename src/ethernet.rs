//! Ethernet frame accessors
//!
//! These functions read fields directly from a frame buffer, as received from a TAP device or
//! stored in a capture record. Nothing is parsed ahead of time or cached: each call looks at the
//! bytes it needs and nothing else.
//!
//! Layout of a frame (without the trailing FCS, which is not captured):
//!
//! ```text
//! 0      6      12            12+t       14+t
//! | dst  | src  | tags (t=0,4,8) | ethertype | payload ...
//! ```
//!
//! Every accessor checks that the buffer is long enough for the field it reads, and returns
//! [`FrameError::TooShort`] otherwise.

use crate::error::FrameError;
use crate::utils::{array_ref, be_u16_at, tail};
use rusticata_macros::newtype_enum;
use std::fmt;

/// Length of an untagged Ethernet header
pub const ETHERNET_HEADER_LEN: usize = 14;

const ETHERTYPE_OFFSET: usize = 12;

/// A 48-bit MAC address
#[derive(Clone, Copy, Default, Eq, Hash, PartialEq)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    pub const BROADCAST: MacAddr = MacAddr([0xff; 6]);

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// `ff:ff:ff:ff:ff:ff`
    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    /// IPv4 multicast addresses start with the `01:00:5e` prefix
    pub fn is_ipv4_multicast(&self) -> bool {
        self.0[..3] == [0x01, 0x00, 0x5e]
    }

    /// IPv6 multicast addresses start with the `33:33` prefix
    pub fn is_ipv6_multicast(&self) -> bool {
        self.0[..2] == [0x33, 0x33]
    }
}

impl From<[u8; 6]> for MacAddr {
    fn from(octets: [u8; 6]) -> MacAddr {
        MacAddr(octets)
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let o = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            o[0], o[1], o[2], o[3], o[4], o[5]
        )
    }
}

impl fmt::Debug for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "MacAddr({})", self)
    }
}

/// Ethertype, or tag protocol identifier when found in the ethertype position
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct EtherType(pub u16);

newtype_enum! {
impl display EtherType {
    IPV4 = 0x0800,
    ARP = 0x0806,
    VLAN = 0x8100,
    IPV6 = 0x86dd,
    // 802.1ad provider bridging
    QINQ = 0x88a8,
    // pre-standard Q-in-Q values
    QINQ_9100 = 0x9100,
    QINQ_9200 = 0x9200,
}
}

/// Whether, and how, a frame carries 802.1Q tags
///
/// The discriminant is the number of bytes taken by the tags.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Tagging {
    NotTagged = 0,
    Tagged = 4,
    DoubleTagged = 8,
}

impl Tagging {
    /// Number of bytes between the source address and the ethertype
    #[inline]
    pub const fn len(self) -> usize {
        self as usize
    }
}

/// Destination address, bytes `[0, 6)`
pub fn mac_destination(frame: &[u8]) -> Result<MacAddr, FrameError> {
    array_ref::<6>(frame, 0).map(|a| MacAddr(*a))
}

/// Source address, bytes `[6, 12)`
pub fn mac_source(frame: &[u8]) -> Result<MacAddr, FrameError> {
    array_ref::<6>(frame, 6).map(|a| MacAddr(*a))
}

/// Detect 802.1Q tagging
///
/// The checks run in this order:
/// 1. a `0x8100` TPID followed by a second `0x8100` TPID at offset 16 is Q-in-Q
/// 2. a lone `0x8100` TPID is a single tag
/// 3. the legacy `0x9100` and `0x9200` values are Q-in-Q
/// 4. the 802.1ad `0x88a8` value is Q-in-Q
///
/// Anything else is untagged.
pub fn mac_tagging(frame: &[u8]) -> Result<Tagging, FrameError> {
    let tpid = EtherType(be_u16_at(frame, ETHERTYPE_OFFSET)?);
    let tagging = match tpid {
        EtherType::VLAN => {
            if EtherType(be_u16_at(frame, ETHERTYPE_OFFSET + 4)?) == EtherType::VLAN {
                Tagging::DoubleTagged
            } else {
                Tagging::Tagged
            }
        }
        EtherType::QINQ_9100 | EtherType::QINQ_9200 => Tagging::DoubleTagged,
        EtherType::QINQ => Tagging::DoubleTagged,
        _ => Tagging::NotTagged,
    };
    Ok(tagging)
}

/// The ethertype following the tags, if any
pub fn mac_ethertype(frame: &[u8]) -> Result<EtherType, FrameError> {
    let offset = ETHERTYPE_OFFSET + mac_tagging(frame)?.len();
    be_u16_at(frame, offset).map(EtherType)
}

/// Everything after the ethertype
pub fn mac_payload(frame: &[u8]) -> Result<&[u8], FrameError> {
    let offset = ETHERTYPE_OFFSET + mac_tagging(frame)?.len() + 2;
    tail(frame, offset)
}
