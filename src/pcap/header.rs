use nom::IResult;

use crate::endianness::{ByteOrder, PcapBE, PcapEndianness, PcapLE};
use crate::error::PcapError;
use crate::linktype::Linktype;

/// Magic number, as read in the byte order of the file
pub const PCAP_MAGIC: u32 = 0xa1b2_c3d4;

/// Size of the global header, in bytes
pub const PCAP_HEADER_LEN: usize = 24;

/// PCAP global header
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PcapHeader {
    /// Byte order used by every integer in the file
    pub byte_order: ByteOrder,
    /// Version major number (must be 2)
    pub version_major: u16,
    /// Version minor number (must be 4)
    pub version_minor: u16,
    /// The correction time in seconds between GMT (UTC) and the local timezone of the following
    /// packet header timestamps. Ignored.
    pub thiszone: i32,
    /// In theory, the accuracy of time stamps in the capture; in practice, all tools set it to 0
    pub sigfigs: u32,
    /// max len of captured packets, in octets
    pub snaplen: u32,
    /// Data link type
    pub network: Linktype,
}

impl PcapHeader {
    pub fn new(byte_order: ByteOrder) -> PcapHeader {
        PcapHeader {
            byte_order,
            version_major: 2,
            version_minor: 4,
            thiszone: 0,
            sigfigs: 0,
            snaplen: 0,
            network: Linktype::ETHERNET,
        }
    }

    pub fn is_bigendian(&self) -> bool {
        self.byte_order == ByteOrder::BigEndian
    }

    /// Check that the records following this header can be decoded
    ///
    /// Version must be exactly 2.4, and the link type must be Ethernet.
    pub fn validate(&self) -> Result<(), PcapError> {
        if (self.version_major, self.version_minor) != (2, 4) {
            return Err(PcapError::UnsupportedVersion {
                major: self.version_major,
                minor: self.version_minor,
            });
        }
        if self.network != Linktype::ETHERNET {
            return Err(PcapError::UnsupportedLinktype(self.network));
        }
        Ok(())
    }
}

fn parse_pcap_header_e<En: PcapEndianness>(i: &[u8]) -> IResult<&[u8], PcapHeader, PcapError> {
    let (i, magic_number) = En::parse_u32(i)?;
    if magic_number != PCAP_MAGIC {
        return Err(nom::Err::Error(PcapError::HeaderNotRecognized));
    }
    let (i, version_major) = En::parse_u16(i)?;
    let (i, version_minor) = En::parse_u16(i)?;
    let (i, thiszone) = En::parse_i32(i)?;
    let (i, sigfigs) = En::parse_u32(i)?;
    let (i, snaplen) = En::parse_u32(i)?;
    let (i, network) = En::parse_u32(i)?;
    let header = PcapHeader {
        byte_order: En::ORDER,
        version_major,
        version_minor,
        thiszone,
        sigfigs,
        snaplen,
        network: Linktype(network),
    };
    Ok((i, header))
}

/// Read the PCAP global header
///
/// The magic number is tried as big-endian first, then as little-endian; the first byte order
/// that matches is used for the rest of the header. If neither matches, the error is
/// [`PcapError::HeaderNotRecognized`].
///
/// The header is not validated, see [`PcapHeader::validate`].
pub fn parse_pcap_header(i: &[u8]) -> IResult<&[u8], PcapHeader, PcapError> {
    match parse_pcap_header_e::<PcapBE>(i) {
        Err(nom::Err::Error(PcapError::HeaderNotRecognized)) => parse_pcap_header_e::<PcapLE>(i),
        r => r,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use hex_literal::hex;

    pub const PCAP_HDR_LE: &[u8] = &hex!(
        "
D4 C3 B2 A1 02 00 04 00 00 00 00 00 00 00 00 00
00 00 04 00 01 00 00 00"
    );

    pub const PCAP_HDR_BE: &[u8] = &hex!(
        "
A1 B2 C3 D4 00 02 00 04 00 00 00 00 00 00 00 00
00 04 00 00 00 00 00 01"
    );

    #[test]
    fn test_parse_pcap_header_le() {
        let (rem, hdr) = parse_pcap_header(PCAP_HDR_LE).expect("header parsing failed");
        assert!(rem.is_empty());
        assert_eq!(hdr.byte_order, ByteOrder::LittleEndian);
        assert_eq!(hdr.version_major, 2);
        assert_eq!(hdr.version_minor, 4);
        assert_eq!(hdr.snaplen, 262_144);
        assert_eq!(hdr.network, Linktype::ETHERNET);
        assert!(hdr.validate().is_ok());
    }

    #[test]
    fn test_parse_pcap_header_be() {
        let (rem, hdr) = parse_pcap_header(PCAP_HDR_BE).expect("header parsing failed");
        assert!(rem.is_empty());
        assert!(hdr.is_bigendian());
        assert_eq!(hdr.snaplen, 262_144);
        assert!(hdr.validate().is_ok());
    }

    #[test]
    fn test_both_orders_agree() {
        let (_, le) = parse_pcap_header(PCAP_HDR_LE).unwrap();
        let (_, be) = parse_pcap_header(PCAP_HDR_BE).unwrap();
        assert_eq!(
            PcapHeader {
                byte_order: ByteOrder::BigEndian,
                ..le
            },
            be
        );
    }

    #[test]
    fn test_bad_magic() {
        // nanosecond-precision magic is not supported
        let hdr = hex!(
            "
4D 3C B2 A1 02 00 04 00 00 00 00 00 00 00 00 00
00 00 04 00 01 00 00 00"
        );
        assert!(matches!(
            parse_pcap_header(&hdr),
            Err(nom::Err::Error(PcapError::HeaderNotRecognized))
        ));
    }

    #[test]
    fn test_short_header_is_incomplete() {
        assert!(matches!(
            parse_pcap_header(&PCAP_HDR_LE[..10]),
            Err(nom::Err::Incomplete(_))
        ));
    }

    #[test]
    fn test_validate() {
        let mut hdr = PcapHeader::new(ByteOrder::LittleEndian);
        assert!(hdr.validate().is_ok());
        hdr.version_minor = 3;
        assert!(matches!(
            hdr.validate(),
            Err(PcapError::UnsupportedVersion { major: 2, minor: 3 })
        ));
        hdr.version_minor = 4;
        hdr.network = Linktype::LINUX_SLL;
        assert!(matches!(
            hdr.validate(),
            Err(PcapError::UnsupportedLinktype(Linktype::LINUX_SLL))
        ));
    }
}
