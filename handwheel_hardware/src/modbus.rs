//! Modbus RTU slave over a byte-oriented serial link.
//!
//! Supports the register functions a handwheel needs: read holding (0x03),
//! read input (0x04, same bank), write single (0x06) and write multiple
//! (0x10). Everything else is answered with an illegal-function exception.
//! Frames for other slaves are dropped silently; frames with a bad CRC are
//! dropped and counted.
//!
//! A read that returns no bytes is the inter-frame silence: whatever is still
//! buffered then and does not decode as a frame is discarded, so a reply from
//! another slave can never be glued onto the next request.

use std::sync::Arc;

use handwheel_traits::{BusOutcome, BusTransport, RegisterBank};

use crate::error::{HwError, Result};

pub const READ_HOLDING: u8 = 0x03;
pub const READ_INPUT: u8 = 0x04;
pub const WRITE_SINGLE: u8 = 0x06;
pub const WRITE_MULTIPLE: u8 = 0x10;

pub const ILLEGAL_FUNCTION: u8 = 0x01;
pub const ILLEGAL_DATA_ADDRESS: u8 = 0x02;
pub const ILLEGAL_DATA_VALUE: u8 = 0x03;

/// Address every slave accepts writes on, without replying.
pub const BROADCAST: u8 = 0;
/// Largest register count a single read may ask for.
pub const MAX_READ: u16 = 125;
/// Largest register count a single write-multiple may carry.
pub const MAX_WRITE: u16 = 123;
/// Longest RTU frame on the wire.
pub const MAX_FRAME: usize = 256;

/// CRC-16/MODBUS (reflected poly 0xA001, init 0xFFFF).
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &b in data {
        crc ^= u16::from(b);
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ 0xA001;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}

/// Append the CRC, low byte first.
fn push_crc(frame: &mut Vec<u8>) {
    let crc = crc16(frame);
    frame.extend_from_slice(&crc.to_le_bytes());
}

fn be16(hi: u8, lo: u8) -> u16 {
    u16::from_be_bytes([hi, lo])
}

/// A request PDU addressed to some slave.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Read { function: u8, start: u16, count: u16 },
    WriteSingle { addr: u16, value: u16 },
    WriteMultiple { start: u16, values: Vec<u16> },
    /// Known function with an inconsistent body (byte count mismatch).
    Malformed { function: u8 },
    Unsupported { function: u8 },
}

impl Request {
    pub fn function(&self) -> u8 {
        match self {
            Self::Read { function, .. }
            | Self::Malformed { function }
            | Self::Unsupported { function } => *function,
            Self::WriteSingle { .. } => WRITE_SINGLE,
            Self::WriteMultiple { .. } => WRITE_MULTIPLE,
        }
    }
}

/// Result of scanning the receive buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// Not enough bytes yet.
    Incomplete,
    /// A well-formed frame of `len` bytes.
    Frame {
        address: u8,
        request: Request,
        len: usize,
    },
    /// `len` bytes that failed the CRC.
    Invalid { len: usize },
}

/// Try to decode one RTU frame from the start of `buf`.
///
/// Frame length follows from the function code. For unknown codes the
/// length is unknown; with `line_idle` the whole buffer is taken as the frame
/// (the inter-frame silence has been observed).
pub fn decode(buf: &[u8], line_idle: bool) -> Decoded {
    if buf.len() < 2 {
        return Decoded::Incomplete;
    }
    let function = buf[1];
    let len = match function {
        READ_HOLDING | READ_INPUT | WRITE_SINGLE => 8,
        WRITE_MULTIPLE => {
            if buf.len() < 7 {
                return Decoded::Incomplete;
            }
            9 + usize::from(buf[6])
        }
        _ if line_idle && buf.len() >= 4 => buf.len(),
        _ => return Decoded::Incomplete,
    };
    if buf.len() < len {
        return Decoded::Incomplete;
    }
    let frame = &buf[..len];
    let (body, crc) = frame.split_at(len - 2);
    if crc16(body) != u16::from_le_bytes([crc[0], crc[1]]) {
        return Decoded::Invalid { len };
    }

    let request = match function {
        READ_HOLDING | READ_INPUT => Request::Read {
            function,
            start: be16(body[2], body[3]),
            count: be16(body[4], body[5]),
        },
        WRITE_SINGLE => Request::WriteSingle {
            addr: be16(body[2], body[3]),
            value: be16(body[4], body[5]),
        },
        WRITE_MULTIPLE => {
            let count = be16(body[4], body[5]);
            let data = &body[7..];
            if data.len() != usize::from(count) * 2 {
                Request::Malformed { function }
            } else {
                Request::WriteMultiple {
                    start: be16(body[2], body[3]),
                    values: data.chunks_exact(2).map(|c| be16(c[0], c[1])).collect(),
                }
            }
        }
        _ => Request::Unsupported { function },
    };
    Decoded::Frame {
        address: body[0],
        request,
        len,
    }
}

fn exception(address: u8, function: u8, code: u8) -> Vec<u8> {
    let mut f = vec![address, function | 0x80, code];
    push_crc(&mut f);
    f
}

/// Execute `request` against `bank` and build the reply frame.
///
/// Returns `None` for broadcasts, which are executed (writes only) but never
/// answered.
pub fn execute(bank: &RegisterBank, address: u8, request: &Request) -> Option<Vec<u8>> {
    let broadcast = address == BROADCAST;
    let reply = match request {
        Request::Read {
            function,
            start,
            count,
        } => {
            if broadcast {
                return None;
            }
            if *count == 0 || *count > MAX_READ {
                return Some(exception(address, *function, ILLEGAL_DATA_VALUE));
            }
            let mut regs = vec![0u16; usize::from(*count)];
            if !bank.read_into(*start, &mut regs) {
                return Some(exception(address, *function, ILLEGAL_DATA_ADDRESS));
            }
            let mut f = Vec::with_capacity(5 + regs.len() * 2);
            f.extend_from_slice(&[address, *function]);
            // count <= 125, so the byte count fits in a u8
            f.push(u8::try_from(regs.len() * 2).unwrap_or(u8::MAX));
            for r in regs {
                f.extend_from_slice(&r.to_be_bytes());
            }
            push_crc(&mut f);
            f
        }
        Request::WriteSingle { addr, value } => {
            if !bank.set(*addr, *value) {
                return (!broadcast).then(|| exception(address, WRITE_SINGLE, ILLEGAL_DATA_ADDRESS));
            }
            let mut f = vec![address, WRITE_SINGLE];
            f.extend_from_slice(&addr.to_be_bytes());
            f.extend_from_slice(&value.to_be_bytes());
            push_crc(&mut f);
            f
        }
        Request::WriteMultiple { start, values } => {
            let count = u16::try_from(values.len()).unwrap_or(u16::MAX);
            if count == 0 || count > MAX_WRITE {
                return (!broadcast).then(|| exception(address, WRITE_MULTIPLE, ILLEGAL_DATA_VALUE));
            }
            // Validate the whole range before touching any register.
            if !bank.contains_range(*start, count) {
                return (!broadcast).then(|| exception(address, WRITE_MULTIPLE, ILLEGAL_DATA_ADDRESS));
            }
            for (offset, v) in (0u16..).zip(values) {
                bank.set(start + offset, *v);
            }
            let mut f = vec![address, WRITE_MULTIPLE];
            f.extend_from_slice(&start.to_be_bytes());
            f.extend_from_slice(&count.to_be_bytes());
            push_crc(&mut f);
            f
        }
        Request::Malformed { function } => exception(address, *function, ILLEGAL_DATA_VALUE),
        Request::Unsupported { function } => exception(address, *function, ILLEGAL_FUNCTION),
    };
    (!broadcast).then_some(reply)
}

/// Build a read-holding-registers request (master side).
pub fn read_request(slave: u8, start: u16, count: u16) -> Vec<u8> {
    let mut f = vec![slave, READ_HOLDING];
    f.extend_from_slice(&start.to_be_bytes());
    f.extend_from_slice(&count.to_be_bytes());
    push_crc(&mut f);
    f
}

/// Parse the reply to `read_request` (master side).
pub fn parse_read_reply(slave: u8, frame: &[u8]) -> Result<Vec<u16>> {
    if frame.len() < 5 {
        return Err(HwError::Frame("reply too short"));
    }
    let (body, crc) = frame.split_at(frame.len() - 2);
    if crc16(body) != u16::from_le_bytes([crc[0], crc[1]]) {
        return Err(HwError::Frame("reply crc mismatch"));
    }
    if body[0] != slave {
        return Err(HwError::Frame("reply from wrong slave"));
    }
    if body[1] & 0x80 != 0 {
        return Err(HwError::Frame("exception reply"));
    }
    let data = &body[3..];
    if data.len() != usize::from(body[2]) || data.len() % 2 != 0 {
        return Err(HwError::Frame("reply byte count mismatch"));
    }
    Ok(data.chunks_exact(2).map(|c| be16(c[0], c[1])).collect())
}

/// Byte-oriented serial port the slave runs on.
pub trait SerialLink {
    /// Copy whatever bytes are pending into `buf` without blocking; `Ok(0)`
    /// when the line is quiet.
    fn read_nonblocking(&mut self, buf: &mut [u8]) -> std::io::Result<usize>;
    fn write_frame(&mut self, frame: &[u8]) -> std::io::Result<()>;
}

/// Slave-side counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlaveCounters {
    pub served: u64,
    pub exceptions: u64,
    pub foreign: u64,
    pub crc_errors: u64,
    pub dropped: u64,
}

/// RTU slave servicing a shared register bank.
pub struct ModbusSlave<S: SerialLink> {
    link: S,
    bank: Arc<RegisterBank>,
    address: u8,
    rx: Vec<u8>,
    counters: SlaveCounters,
}

impl<S: SerialLink> ModbusSlave<S> {
    pub fn new(link: S, bank: Arc<RegisterBank>, address: u8) -> Self {
        Self {
            link,
            bank,
            address,
            rx: Vec::with_capacity(MAX_FRAME),
            counters: SlaveCounters::default(),
        }
    }

    pub fn counters(&self) -> SlaveCounters {
        self.counters
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Pull pending bytes and service at most one complete frame.
    pub fn service(&mut self) -> Result<BusOutcome> {
        let mut chunk = [0u8; 64];
        let n = self.link.read_nonblocking(&mut chunk)?;
        self.rx.extend_from_slice(&chunk[..n]);
        if self.rx.is_empty() {
            return Ok(BusOutcome::Idle);
        }
        if self.rx.len() > MAX_FRAME {
            self.rx.clear();
            self.counters.dropped += 1;
            return Err(HwError::Frame("receive buffer overrun"));
        }

        let line_idle = n == 0;
        match decode(&self.rx, line_idle) {
            Decoded::Incomplete if line_idle => {
                tracing::debug!(bytes = self.rx.len(), "dropping partial frame");
                self.rx.clear();
                self.counters.dropped += 1;
                Ok(BusOutcome::Ignored)
            }
            Decoded::Invalid { len } if line_idle => {
                tracing::debug!(len, bytes = self.rx.len(), "modbus crc mismatch");
                self.rx.clear();
                self.counters.crc_errors += 1;
                Ok(BusOutcome::Ignored)
            }
            // Still receiving; the frame boundary is not known yet.
            Decoded::Incomplete | Decoded::Invalid { .. } => Ok(BusOutcome::Idle),
            Decoded::Frame {
                address,
                request,
                len,
            } => {
                self.rx.drain(..len);
                if address != self.address && address != BROADCAST {
                    self.counters.foreign += 1;
                    return Ok(BusOutcome::Ignored);
                }
                tracing::trace!(address, ?request, "modbus request");
                if let Some(reply) = execute(&self.bank, address, &request) {
                    if reply[1] & 0x80 != 0 {
                        self.counters.exceptions += 1;
                        tracing::debug!(function = request.function(), code = reply[2], "modbus exception");
                    }
                    self.link.write_frame(&reply)?;
                }
                self.counters.served += 1;
                Ok(BusOutcome::Served)
            }
        }
    }
}

impl<S: SerialLink> BusTransport for ModbusSlave<S> {
    fn receive(&mut self) -> std::result::Result<BusOutcome, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.service()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn framed(mut body: Vec<u8>) -> Vec<u8> {
        push_crc(&mut body);
        body
    }

    #[test]
    fn crc_matches_reference_frame() {
        // Read 2 holding registers at 0 from slave 1: 01 03 00 00 00 02 C4 0B
        assert_eq!(
            read_request(1, 0, 2),
            vec![0x01, 0x03, 0x00, 0x00, 0x00, 0x02, 0xC4, 0x0B]
        );
    }

    #[test]
    fn decode_waits_for_full_frame() {
        let f = read_request(3, 0, 4);
        assert_eq!(decode(&f[..5], false), Decoded::Incomplete);
        assert!(matches!(decode(&f, false), Decoded::Frame { len: 8, .. }));
    }

    #[test]
    fn corrupted_crc_is_invalid() {
        let mut f = read_request(3, 0, 4);
        f[7] ^= 0xFF;
        assert_eq!(decode(&f, false), Decoded::Invalid { len: 8 });
    }

    #[test]
    fn unknown_function_needs_idle_line() {
        let f = framed(vec![3, 0x2B, 0x0E, 0x01, 0x00]);
        assert_eq!(decode(&f, false), Decoded::Incomplete);
        assert!(matches!(
            decode(&f, true),
            Decoded::Frame {
                request: Request::Unsupported { function: 0x2B },
                ..
            }
        ));
    }

    #[test]
    fn read_returns_big_endian_registers() {
        let bank = RegisterBank::new(4);
        bank.set(0, 0x1234);
        bank.set(1, 0xFFFE);
        let reply = execute(
            &bank,
            3,
            &Request::Read {
                function: READ_HOLDING,
                start: 0,
                count: 2,
            },
        )
        .expect("reply");
        assert_eq!(&reply[..7], &[3, 0x03, 4, 0x12, 0x34, 0xFF, 0xFE]);
        assert_eq!(parse_read_reply(3, &reply).expect("parse"), vec![0x1234, 0xFFFE]);
    }

    #[rstest]
    #[case::past_end(Request::Read { function: READ_HOLDING, start: 3, count: 2 }, ILLEGAL_DATA_ADDRESS)]
    #[case::zero_count(Request::Read { function: READ_INPUT, start: 0, count: 0 }, ILLEGAL_DATA_VALUE)]
    #[case::write_past_end(Request::WriteSingle { addr: 9, value: 1 }, ILLEGAL_DATA_ADDRESS)]
    #[case::multi_past_end(Request::WriteMultiple { start: 3, values: vec![1, 2] }, ILLEGAL_DATA_ADDRESS)]
    #[case::unsupported(Request::Unsupported { function: 0x05 }, ILLEGAL_FUNCTION)]
    fn bad_requests_get_exceptions(#[case] req: Request, #[case] code: u8) {
        let bank = RegisterBank::new(4);
        let reply = execute(&bank, 3, &req).expect("reply");
        assert_eq!(reply[1], req.function() | 0x80);
        assert_eq!(reply[2], code);
        assert_eq!(bank.snapshot(), vec![0, 0, 0, 0]);
    }

    #[test]
    fn broadcast_write_applies_silently() {
        let bank = RegisterBank::new(4);
        let reply = execute(
            &bank,
            BROADCAST,
            &Request::WriteMultiple {
                start: 2,
                values: vec![7, 8],
            },
        );
        assert_eq!(reply, None);
        assert_eq!(bank.snapshot(), vec![0, 0, 7, 8]);
    }

    #[test]
    fn write_multiple_byte_count_mismatch_is_malformed() {
        let f = framed(vec![3, 0x10, 0, 0, 0, 2, 2, 0, 1]);
        assert!(matches!(
            decode(&f, false),
            Decoded::Frame {
                request: Request::Malformed { function: WRITE_MULTIPLE },
                ..
            }
        ));
    }
}
