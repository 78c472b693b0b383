use rusticata_macros::newtype_enum;

/// Data link type
///
/// The link-layer header type specifies the type of headers at the beginning
/// of each captured packet. Only `ETHERNET` captures can be read; the other
/// names exist so that rejected files get a readable error message.
///
/// See <http://www.tcpdump.org/linktypes.html>
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Linktype(pub u32);

newtype_enum! {
impl display Linktype {
    NULL = 0,
    ETHERNET = 1,

    IEEE802_5 = 6,
    PPP = 9,
    FDDI = 10,

    RAW = 101,
    IEEE802_11 = 105,

    LOOP = 108,
    LINUX_SLL = 113,
    IEEE802_11_RADIOTAP = 127,
    LINUX_SLL2 = 276,

    IPV4 = 228,
    IPV6 = 229,

    NFLOG = 239,
}
}
