//! Packet framing for the data and acknowledgement headers.
//!
//! Both headers are fixed-size and little-endian; this is the one place
//! the on-wire format is pinned down so any two hosts running this crate
//! can interoperate regardless of native byte order.

use std::io::{self, Cursor, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::seq::Seq;

/// Reserved sequence value marking end-of-stream on the wire.
pub const EOF_SEQ: i16 = -5;

pub const MAX_PACKET: usize = 1472;
pub const DATA_HEADER_LEN: usize = 2 + 16;
pub const MAX_PAYLOAD: usize = MAX_PACKET - DATA_HEADER_LEN;
pub const ACK_HEADER_LEN: usize = 2 + 16 + 8;

/// A data-packet sequence number: either a real in-window `Seq` or the
/// out-of-band end-of-stream sentinel. Kept distinct from `Seq` because
/// the sentinel is not a member of the modular sequence space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeqOrEof {
    Data(Seq),
    Eof,
}

/// Elapsed time since the sender started, as whole seconds plus a
/// microsecond remainder. Portable replacement for a raw platform
/// `timeval`/`timespec`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Timestamp {
    pub sec: i64,
    pub usec: i64,
}

impl Timestamp {
    pub fn from_micros(total_us: i64) -> Self {
        Timestamp {
            sec: total_us.div_euclid(1_000_000),
            usec: total_us.rem_euclid(1_000_000),
        }
    }

    pub fn as_micros(self) -> i64 {
        self.sec * 1_000_000 + self.usec
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataHeader {
    pub seq: SeqOrEof,
    pub timestamp: Timestamp,
}

impl DataHeader {
    pub fn encode<W: Write>(&self, mut w: W) -> io::Result<()> {
        let raw: i16 = match self.seq {
            SeqOrEof::Data(s) => s.0 as i16,
            SeqOrEof::Eof => EOF_SEQ,
        };
        w.write_i16::<LittleEndian>(raw)?;
        w.write_i64::<LittleEndian>(self.timestamp.sec)?;
        w.write_i64::<LittleEndian>(self.timestamp.usec)?;
        Ok(())
    }

    pub fn decode<R: Read>(mut r: R) -> io::Result<Self> {
        let raw = r.read_i16::<LittleEndian>()?;
        let sec = r.read_i64::<LittleEndian>()?;
        let usec = r.read_i64::<LittleEndian>()?;
        let seq = if raw == EOF_SEQ {
            SeqOrEof::Eof
        } else {
            SeqOrEof::Data(Seq::new(raw as u8))
        };
        Ok(DataHeader {
            seq,
            timestamp: Timestamp { sec, usec },
        })
    }
}

/// Build a full data datagram: header followed by payload.
pub fn encode_data_packet(header: &DataHeader, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(DATA_HEADER_LEN + payload.len());
    header.encode(&mut buf).expect("writing to Vec cannot fail");
    buf.extend_from_slice(payload);
    buf
}

/// Split a received datagram into its header and payload slice.
pub fn decode_data_packet(datagram: &[u8]) -> io::Result<(DataHeader, &[u8])> {
    if datagram.len() < DATA_HEADER_LEN {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "datagram shorter than data header",
        ));
    }
    let header = DataHeader::decode(Cursor::new(&datagram[..DATA_HEADER_LEN]))?;
    Ok((header, &datagram[DATA_HEADER_LEN..]))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckHeader {
    pub next_seq: Seq,
    pub timestamp: Timestamp,
    pub window: u64,
}

impl AckHeader {
    pub fn encode<W: Write>(&self, mut w: W) -> io::Result<()> {
        w.write_i16::<LittleEndian>(self.next_seq.0 as i16)?;
        w.write_i64::<LittleEndian>(self.timestamp.sec)?;
        w.write_i64::<LittleEndian>(self.timestamp.usec)?;
        w.write_u64::<LittleEndian>(self.window)?;
        Ok(())
    }

    pub fn decode<R: Read>(mut r: R) -> io::Result<Self> {
        let raw = r.read_i16::<LittleEndian>()?;
        let sec = r.read_i64::<LittleEndian>()?;
        let usec = r.read_i64::<LittleEndian>()?;
        let window = r.read_u64::<LittleEndian>()?;
        Ok(AckHeader {
            next_seq: Seq::new(raw as u8),
            timestamp: Timestamp { sec, usec },
            window,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(ACK_HEADER_LEN);
        self.encode(&mut buf).expect("writing to Vec cannot fail");
        buf
    }

    pub fn from_bytes(datagram: &[u8]) -> io::Result<Self> {
        if datagram.len() < ACK_HEADER_LEN {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "datagram shorter than ack header",
            ));
        }
        Self::decode(Cursor::new(&datagram[..ACK_HEADER_LEN]))
    }
}
