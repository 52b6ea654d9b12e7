//! The wire protocol: a fixed 16-byte header, optionally followed by a
//! payload of `header.size` bytes.
//!
//! Grounded on `protocol.c`/`protocol_funcs.c`: `proto_send_packet` stamps
//! the packet's timestamp and converts the three 4-byte fields to network
//! byte order before writing; `proto_recv_packet` does the inverse and
//! rejects a `NONE`-typed packet on either side. The original stamps the
//! timestamp at `proto_init_packet` time; this codec stamps immediately
//! before encoding, which is observationally identical since nothing ever
//! blocks between building a packet and sending it.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use mvkv::error::{CResult, Error};
use std::io::{Read, Write};
use std::time::Instant;
use strum_macros::Display;

const HEADER_LEN: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
#[repr(u8)]
pub enum PacketType {
    None = 0,
    Put = 1,
    Get = 2,
    Data = 3,
    Commit = 4,
    Reply = 5,
}

impl PacketType {
    fn from_byte(b: u8) -> CResult<Self> {
        Ok(match b {
            0 => PacketType::None,
            1 => PacketType::Put,
            2 => PacketType::Get,
            3 => PacketType::Data,
            4 => PacketType::Commit,
            5 => PacketType::Reply,
            other => return Err(Error::Protocol(format!("unknown packet type {other}"))),
        })
    }
}

/// Mirrors `TRANS_STATUS`'s wire encoding: 0 PENDING, 1 COMMITTED, 2 ABORTED.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ReplyStatus {
    Pending = 0,
    Committed = 1,
    Aborted = 2,
}

impl From<mvkv::transaction::Status> for ReplyStatus {
    fn from(s: mvkv::transaction::Status) -> Self {
        match s {
            mvkv::transaction::Status::Pending => ReplyStatus::Pending,
            mvkv::transaction::Status::Committed => ReplyStatus::Committed,
            mvkv::transaction::Status::Aborted => ReplyStatus::Aborted,
        }
    }
}

pub struct Header {
    pub kind: PacketType,
    pub status: ReplyStatus,
    pub null: bool,
    pub size: u32,
    pub timestamp_sec: u32,
    pub timestamp_nsec: u32,
}

impl Header {
    pub fn new(kind: PacketType, status: ReplyStatus, null: bool, size: u32) -> Self {
        Header { kind, status, null, size, timestamp_sec: 0, timestamp_nsec: 0 }
    }
}

pub struct Packet {
    pub header: Header,
    pub payload: Vec<u8>,
}

/// Monotonic reference point used to stamp outgoing packets; mirrors the
/// original's use of `CLOCK_MONOTONIC` rather than wall-clock time.
static CLOCK_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

fn monotonic_stamp() -> (u32, u32) {
    let start = CLOCK_START.get_or_init(Instant::now);
    let elapsed = start.elapsed();
    (elapsed.as_secs() as u32, elapsed.subsec_nanos())
}

/// Sends a packet, rejecting `PacketType::None` as the original's
/// `check_pkt_type` does.
pub fn send_packet<W: Write>(w: &mut W, mut header: Header, payload: &[u8]) -> CResult<()> {
    if header.kind == PacketType::None {
        return Err(Error::Protocol("refusing to send a NONE packet".into()));
    }
    let (sec, nsec) = monotonic_stamp();
    header.timestamp_sec = sec;
    header.timestamp_nsec = nsec;
    header.size = payload.len() as u32;

    let mut buf = Vec::with_capacity(HEADER_LEN);
    buf.push(header.kind as u8);
    buf.push(header.status as u8);
    buf.push(header.null as u8);
    buf.push(0); // pad
    buf.write_u32::<BigEndian>(header.size)?;
    buf.write_u32::<BigEndian>(header.timestamp_sec)?;
    buf.write_u32::<BigEndian>(header.timestamp_nsec)?;
    debug_assert_eq!(buf.len(), HEADER_LEN);

    w.write_all(&buf)?;
    if !payload.is_empty() {
        w.write_all(payload)?;
    }
    Ok(())
}

/// Receives a packet, rejecting `PacketType::None` on either side exactly
/// as `proto_recv_packet` does.
pub fn recv_packet<R: Read>(r: &mut R) -> CResult<Packet> {
    let mut buf = [0u8; HEADER_LEN];
    r.read_exact(&mut buf)?;

    let kind = PacketType::from_byte(buf[0])?;
    if kind == PacketType::None {
        return Err(Error::Protocol("received a NONE packet".into()));
    }
    let status = match buf[1] {
        0 => ReplyStatus::Pending,
        1 => ReplyStatus::Committed,
        2 => ReplyStatus::Aborted,
        other => return Err(Error::Protocol(format!("unknown status {other}"))),
    };
    let null = buf[2] != 0;
    let mut rest = &buf[4..];
    let size = rest.read_u32::<BigEndian>()?;
    let timestamp_sec = rest.read_u32::<BigEndian>()?;
    let timestamp_nsec = rest.read_u32::<BigEndian>()?;

    let mut payload = vec![0u8; size as usize];
    if size > 0 {
        r.read_exact(&mut payload)?;
    }

    Ok(Packet {
        header: Header { kind, status, null, size, timestamp_sec, timestamp_nsec },
        payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    #[test]
    fn round_trips_a_data_packet() {
        let mut buf = Vec::new();
        send_packet(&mut buf, Header::new(PacketType::Data, ReplyStatus::Pending, false, 0), b"hello").unwrap();

        let mut cursor = Cursor::new(buf);
        let pkt = recv_packet(&mut cursor).unwrap();
        assert_eq!(pkt.header.kind, PacketType::Data);
        assert_eq!(pkt.header.null, false);
        assert_eq!(pkt.payload, b"hello");
    }

    #[test]
    fn round_trips_a_null_payload() {
        let mut buf = Vec::new();
        send_packet(&mut buf, Header::new(PacketType::Data, ReplyStatus::Pending, true, 0), &[]).unwrap();

        let mut cursor = Cursor::new(buf);
        let pkt = recv_packet(&mut cursor).unwrap();
        assert!(pkt.header.null);
        assert!(pkt.payload.is_empty());
    }

    #[test]
    fn rejects_none_type_on_send() {
        let mut buf = Vec::new();
        let err = send_packet(&mut buf, Header::new(PacketType::None, ReplyStatus::Pending, false, 0), &[]);
        assert!(err.is_err());
    }

    #[test]
    fn rejects_none_type_on_receive() {
        let mut buf = [0u8; HEADER_LEN].to_vec();
        buf[0] = PacketType::None as u8;
        let mut cursor = Cursor::new(buf);
        assert!(recv_packet(&mut cursor).is_err());
    }
}
