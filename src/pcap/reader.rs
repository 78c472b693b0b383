use crate::endianness::ByteOrder;
use crate::error::PcapError;
use crate::pcap::{
    parse_pcap_header, parse_pcap_record, parse_pcap_record_be, LegacyPcapBlock, PcapHeader,
    PcapPacket,
};
use circular::Buffer;
use nom::{IResult, Needed, Offset};
use std::fs::File;
use std::io::{self, Read};
use std::iter::FusedIterator;
use std::path::Path;
use tracing::{debug, trace};

/// Initial size of the circular buffer
pub const DEFAULT_CAPACITY: usize = 65536;

/// Streaming reader over a legacy pcap file
///
/// This reader is a streaming parser based on a circular buffer, which means memory usage
/// is constant (bounded by the largest record), and that it can be used on huge files or
/// infinite streams. The buffer grows when a single record does not fit.
///
/// The global header is read and validated when the reader is created: the byte order is
/// detected from the magic number, and files that are not version 2.4 or do not contain
/// Ethernet frames are rejected. The byte order then stays fixed for every record.
///
/// Packets are returned one at a time by [`next_packet`](PcapReader::next_packet), or through
/// the [`Iterator`] implementation. The sequence is forward-only; reopen the file to start
/// over.
///
/// ## Example
///
/// ```rust,no_run
/// use taptun::pcap::PcapReader;
///
/// let mut reader = PcapReader::open("capture.pcap").expect("PcapReader");
/// while let Some(packet) = reader.next_packet().expect("read error") {
///     println!("{} bytes, truncated: {}", packet.data.len(), packet.truncated);
/// }
/// ```
pub struct PcapReader<R>
where
    R: Read,
{
    header: PcapHeader,
    reader: R,
    buffer: Buffer,
    reader_exhausted: bool,
    finished: bool,
    parse: RecordParseFn,
}

type RecordParseFn = fn(&[u8]) -> IResult<&[u8], LegacyPcapBlock, PcapError>;

impl PcapReader<File> {
    /// Open the capture file at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<PcapReader<File>, PcapError> {
        let file = File::open(path)?;
        PcapReader::new(file)
    }
}

impl<R> PcapReader<R>
where
    R: Read,
{
    /// Creates a new `PcapReader<R>` with the default buffer capacity.
    pub fn new(reader: R) -> Result<PcapReader<R>, PcapError> {
        Self::with_capacity(DEFAULT_CAPACITY, reader)
    }

    /// Creates a new `PcapReader<R>` with the provided buffer capacity.
    pub fn with_capacity(capacity: usize, mut reader: R) -> Result<PcapReader<R>, PcapError> {
        let mut buffer = Buffer::with_capacity(capacity.max(1));
        let mut reader_exhausted = false;
        let header = loop {
            let data = buffer.data();
            match parse_pcap_header(data) {
                Ok((rem, header)) => {
                    let offset = data.offset(rem);
                    buffer.consume(offset);
                    break header;
                }
                Err(nom::Err::Incomplete(needed)) => {
                    if reader_exhausted {
                        return Err(PcapError::UnexpectedEof);
                    }
                    reserve(&mut buffer, needed);
                    reader_exhausted = fill(&mut buffer, &mut reader)?;
                }
                Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => return Err(e),
            }
        };
        header.validate()?;
        debug!(
            byte_order = ?header.byte_order,
            snaplen = header.snaplen,
            "pcap header accepted"
        );
        let parse = match header.byte_order {
            ByteOrder::BigEndian => parse_pcap_record_be,
            ByteOrder::LittleEndian => parse_pcap_record,
        };
        Ok(PcapReader {
            header,
            reader,
            buffer,
            reader_exhausted,
            finished: false,
            parse,
        })
    }

    /// The global header of the file
    pub fn header(&self) -> &PcapHeader {
        &self.header
    }

    /// The byte order detected when the file was opened
    pub fn byte_order(&self) -> ByteOrder {
        self.header.byte_order
    }

    /// Read the next packet
    ///
    /// Returns `Ok(None)` when the input ends exactly on a record boundary. Input ending in the
    /// middle of a record is an error ([`PcapError::UnexpectedEof`]), as is any read error.
    pub fn next_packet(&mut self) -> Result<Option<PcapPacket>, PcapError> {
        loop {
            if self.buffer.available_data() == 0 && self.reader_exhausted {
                return Ok(None);
            }
            let data = self.buffer.data();
            match (self.parse)(data) {
                Ok((rem, block)) => {
                    let offset = data.offset(rem);
                    let packet = PcapPacket::from(block);
                    self.buffer.consume(offset);
                    return Ok(Some(packet));
                }
                Err(nom::Err::Incomplete(needed)) => {
                    if self.reader_exhausted {
                        // expected more bytes but reader is EOF, truncated pcap
                        return Err(PcapError::UnexpectedEof);
                    }
                    reserve(&mut self.buffer, needed);
                    self.reader_exhausted = fill(&mut self.buffer, &mut self.reader)?;
                }
                Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => return Err(e),
            }
        }
    }

    /// Consumes the reader, returning the underlying source
    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Close the reader and the underlying source
    pub fn close(self) {
        drop(self.reader)
    }
}

impl<R> Iterator for PcapReader<R>
where
    R: Read,
{
    type Item = Result<PcapPacket, PcapError>;

    /// Stops after the last packet, or after the first error.
    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let item = self.next_packet().transpose();
        if !matches!(item, Some(Ok(_))) {
            self.finished = true;
        }
        item
    }
}

impl<R> FusedIterator for PcapReader<R> where R: Read {}

/// Grow the buffer towards what the parser asked for
///
/// Capacity at most doubles per call. The length fields come from the input, so the buffer
/// only reaches a record's declared size once that many bytes have actually been read.
fn reserve(buffer: &mut Buffer, needed: Needed) {
    let capacity = buffer.capacity();
    let required = match needed {
        Needed::Size(n) => buffer.available_data().saturating_add(usize::from(n)),
        Needed::Unknown => buffer.available_data() + 1,
    };
    if required > capacity {
        let target = required.min(capacity.saturating_mul(2));
        trace!(from = capacity, to = target, "growing pcap buffer");
        buffer.grow(target);
    }
}

/// Read more data into the buffer, returns true if the source is exhausted
fn fill<R: Read>(buffer: &mut Buffer, reader: &mut R) -> io::Result<bool> {
    buffer.shift();
    let space = buffer.space();
    // check if available space is empty, so we can distinguish
    // a read() returning 0 because of EOF or because we requested 0
    if space.is_empty() {
        return Ok(false);
    }
    let sz = loop {
        match reader.read(space) {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            r => break r?,
        }
    };
    buffer.fill(sz);
    Ok(sz == 0)
}
