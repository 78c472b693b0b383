use nom::error::ParseError;
use nom::number::streaming::{be_i32, be_u16, be_u32, le_i32, le_u16, le_u32};
use nom::IResult;

/// Byte order of a capture file, fixed once the header has been recognized
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ByteOrder {
    BigEndian,
    LittleEndian,
}

/// Integer parsers for one byte order, selected at compile time by the container parsers
pub(crate) trait PcapEndianness {
    const ORDER: ByteOrder;

    fn parse_u16<'a, E: ParseError<&'a [u8]>>(i: &'a [u8]) -> IResult<&'a [u8], u16, E>;
    fn parse_u32<'a, E: ParseError<&'a [u8]>>(i: &'a [u8]) -> IResult<&'a [u8], u32, E>;
    fn parse_i32<'a, E: ParseError<&'a [u8]>>(i: &'a [u8]) -> IResult<&'a [u8], i32, E>;
}

macro_rules! byte_order_parsers {
    ($name:ident, $order:ident, $u16:ident, $u32:ident, $i32:ident) => {
        pub(crate) struct $name;

        impl PcapEndianness for $name {
            const ORDER: ByteOrder = ByteOrder::$order;

            #[inline]
            fn parse_u16<'a, E: ParseError<&'a [u8]>>(i: &'a [u8]) -> IResult<&'a [u8], u16, E> {
                $u16(i)
            }

            #[inline]
            fn parse_u32<'a, E: ParseError<&'a [u8]>>(i: &'a [u8]) -> IResult<&'a [u8], u32, E> {
                $u32(i)
            }

            #[inline]
            fn parse_i32<'a, E: ParseError<&'a [u8]>>(i: &'a [u8]) -> IResult<&'a [u8], i32, E> {
                $i32(i)
            }
        }
    };
}

byte_order_parsers!(PcapBE, BigEndian, be_u16, be_u32, be_i32);
byte_order_parsers!(PcapLE, LittleEndian, le_u16, le_u32, le_i32);

#[cfg(test)]
mod tests {
    use super::*;
    use nom::error::Error;

    #[test]
    fn test_same_bytes_both_orders() {
        let b = [0x12, 0x34, 0x56, 0x78];
        let (_, be) = PcapBE::parse_u32::<Error<&[u8]>>(&b).unwrap();
        let (_, le) = PcapLE::parse_u32::<Error<&[u8]>>(&b).unwrap();
        assert_eq!(be, 0x1234_5678);
        assert_eq!(le, 0x7856_3412);
        let (rem, v) = PcapLE::parse_u16::<Error<&[u8]>>(&b).unwrap();
        assert_eq!((rem.len(), v), (2, 0x3412));
        let (_, v) = PcapBE::parse_i32::<Error<&[u8]>>(&[0xff; 4]).unwrap();
        assert_eq!(v, -1);
        assert!(PcapBE::parse_u32::<Error<&[u8]>>(&b[..3]).is_err());
    }
}
