use nom::bytes::streaming::take;
use nom::IResult;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::endianness::{PcapBE, PcapEndianness, PcapLE};
use crate::error::PcapError;

/// Size of a record header, in bytes
pub const PCAP_RECORD_HEADER_LEN: usize = 16;

/// A record of a legacy Pcap file, borrowing its data from the input
#[derive(Debug)]
pub struct LegacyPcapBlock<'a> {
    pub ts_sec: u32,
    pub ts_usec: u32,
    pub caplen: u32,
    pub origlen: u32,
    pub data: &'a [u8],
}

impl<'a> LegacyPcapBlock<'a> {
    /// The date and time when this packet was captured
    pub fn timestamp(&self) -> SystemTime {
        UNIX_EPOCH
            + Duration::from_secs(u64::from(self.ts_sec))
            + Duration::from_micros(u64::from(self.ts_usec))
    }

    /// True if fewer bytes were saved than the packet had on the wire
    pub fn is_truncated(&self) -> bool {
        self.caplen != self.origlen
    }
}

/// A captured packet, owning its data
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PcapPacket {
    pub timestamp: SystemTime,
    /// The captured length is smaller than the original length
    pub truncated: bool,
    pub data: Vec<u8>,
}

impl<'a> From<LegacyPcapBlock<'a>> for PcapPacket {
    fn from(b: LegacyPcapBlock<'a>) -> PcapPacket {
        PcapPacket {
            timestamp: b.timestamp(),
            truncated: b.is_truncated(),
            data: b.data.to_vec(),
        }
    }
}

fn parse_pcap_record_e<En: PcapEndianness>(
    i: &[u8],
) -> IResult<&[u8], LegacyPcapBlock, PcapError> {
    if i.len() < PCAP_RECORD_HEADER_LEN {
        return Err(nom::Err::Incomplete(nom::Needed::new(
            PCAP_RECORD_HEADER_LEN - i.len(),
        )));
    }
    let (i, ts_sec) = En::parse_u32(i)?;
    let (i, ts_usec) = En::parse_u32(i)?;
    let (i, caplen) = En::parse_u32(i)?;
    let (i, origlen) = En::parse_u32(i)?;
    if caplen > origlen {
        return Err(nom::Err::Failure(PcapError::InvalidRecord { caplen, origlen }));
    }
    let (i, data) = take(caplen as usize)(i)?;
    let block = LegacyPcapBlock {
        ts_sec,
        ts_usec,
        caplen,
        origlen,
        data,
    };
    Ok((i, block))
}

/// Read a PCAP record header and data
///
/// Each PCAP record starts with a small header, and is followed by packet data.
/// Returns `Incomplete` if the input ends before the end of the record.
pub fn parse_pcap_record(i: &[u8]) -> IResult<&[u8], LegacyPcapBlock, PcapError> {
    parse_pcap_record_e::<PcapLE>(i)
}

/// Read a PCAP record header and data (big-endian)
pub fn parse_pcap_record_be(i: &[u8]) -> IResult<&[u8], LegacyPcapBlock, PcapError> {
    parse_pcap_record_e::<PcapBE>(i)
}
