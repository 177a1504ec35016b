//! Frame codec and payload encoding.
//!
//! Frame layout (header is always network byte order; this implementation
//! also standardizes every payload's multi-byte fields to network byte
//! order, resolving the open question in the design notes about sender-native
//! payload endianness):
//!
//! ```text
//! offset  size  field
//! 0       4     payload length L (u32), 0 <= L <= MAX_PAYLOAD_SIZE
//! 4       2     opcode (u16)
//! 6       2     checksum (u16) of the plaintext payload, or 0 if L == 0
//! 8       L     payload, XORed with XOR_KEY
//! ```

use std::io::{Read, Write};
use std::net::TcpStream;

use crate::config::{MAX_CHAT_TEXT_LEN, MAX_NAME_LEN, MAX_PAYLOAD_SIZE, MAX_PLAYERS, XOR_KEY};
use crate::error::WireError;

pub mod opcode {
    // PLAYER_JOIN/LEAVE/DIE are reserved wire opcodes (empty payload); this
    // implementation conveys those events as SYSTEM chat lines instead of
    // emitting them, matching the original protocol's own usage.
    pub const LOGIN_REQ: u16 = 0x0001;
    pub const LOGIN_RESP: u16 = 0x0002;
    pub const MOVE: u16 = 0x0003;
    pub const MAP_UPDATE: u16 = 0x0004;
    pub const CHAT_SEND: u16 = 0x0005;
    pub const CHAT_RECV: u16 = 0x0006;
    pub const PLAYER_JOIN: u16 = 0x0007;
    pub const PLAYER_LEAVE: u16 = 0x0008;
    pub const PLAYER_DIE: u16 = 0x0009;
    pub const LOGOUT: u16 = 0x000A;
    pub const HEARTBEAT: u16 = 0x0010;
    pub const HEARTBEAT_ACK: u16 = 0x0011;
    pub const ERROR: u16 = 0x00FF;
}

/// Sum of the plaintext payload bytes, truncated to 16 bits.
pub fn checksum(data: &[u8]) -> u16 {
    let sum: u32 = data.iter().map(|&b| b as u32).sum();
    (sum & 0xFFFF) as u16
}

/// XOR every byte with `XOR_KEY`. Applying it twice is the identity, so the
/// same function obfuscates on send and de-obfuscates on receive.
pub fn xor_cipher(data: &mut [u8]) {
    for b in data.iter_mut() {
        *b ^= XOR_KEY;
    }
}

/// Writes one frame: header followed by the obfuscated payload.
pub fn send(stream: &mut TcpStream, opcode: u16, payload: &[u8]) -> Result<(), WireError> {
    let len = payload.len() as u32;
    if len > MAX_PAYLOAD_SIZE {
        return Err(WireError::PayloadTooLarge {
            len,
            max: MAX_PAYLOAD_SIZE,
        });
    }

    let cksum = if payload.is_empty() {
        0
    } else {
        checksum(payload)
    };

    let mut header = [0u8; 8];
    header[0..4].copy_from_slice(&len.to_be_bytes());
    header[4..6].copy_from_slice(&opcode.to_be_bytes());
    header[6..8].copy_from_slice(&cksum.to_be_bytes());
    stream.write_all(&header)?;

    if !payload.is_empty() {
        let mut obfuscated = payload.to_vec();
        xor_cipher(&mut obfuscated);
        stream.write_all(&obfuscated)?;
    }

    Ok(())
}

/// Reads exactly one frame, verifying its checksum. Any read failure — a
/// truncated header, an oversized length, or a checksum mismatch — is
/// reported as a `WireError` and is terminal for the connection per §7.
pub fn recv(stream: &mut TcpStream) -> Result<(u16, Vec<u8>), WireError> {
    let mut header = [0u8; 8];
    read_exact(stream, &mut header)?;

    let len = u32::from_be_bytes(header[0..4].try_into().unwrap());
    let opcode = u16::from_be_bytes(header[4..6].try_into().unwrap());
    let expected_checksum = u16::from_be_bytes(header[6..8].try_into().unwrap());

    if len > MAX_PAYLOAD_SIZE {
        return Err(WireError::PayloadTooLarge {
            len,
            max: MAX_PAYLOAD_SIZE,
        });
    }

    if len == 0 {
        return Ok((opcode, Vec::new()));
    }

    let mut payload = vec![0u8; len as usize];
    read_exact(stream, &mut payload)?;
    xor_cipher(&mut payload);

    let actual_checksum = checksum(&payload);
    if actual_checksum != expected_checksum {
        return Err(WireError::ChecksumMismatch {
            expected: expected_checksum,
            actual: actual_checksum,
        });
    }

    Ok((opcode, payload))
}

/// Waits up to `timeout_ms` for a frame, then delegates to `recv`. Used only
/// by ancillary tools (the synthetic-client harness); the serving path uses
/// a short steady-state read timeout instead, see `session.rs`.
pub fn recv_with_deadline(
    stream: &mut TcpStream,
    timeout_ms: u64,
) -> Result<(u16, Vec<u8>), WireError> {
    stream.set_read_timeout(Some(std::time::Duration::from_millis(timeout_ms)))?;
    match recv(stream) {
        Err(WireError::Io(e)) if is_timeout(&e) => Err(WireError::Timeout),
        other => other,
    }
}

pub fn is_timeout(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
    )
}

fn read_exact(stream: &mut TcpStream, buf: &mut [u8]) -> Result<(), WireError> {
    match stream.read_exact(buf) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(WireError::TransportClosed),
        Err(e) => Err(WireError::Io(e)),
    }
}

/// Copies `s` into a fixed-size, NUL-padded/truncated buffer.
pub fn encode_fixed_str(s: &str, out: &mut [u8]) {
    let bytes = s.as_bytes();
    let n = bytes.len().min(out.len() - 1);
    out[..n].copy_from_slice(&bytes[..n]);
    for b in &mut out[n..] {
        *b = 0;
    }
}

/// Reads a fixed-size buffer back as a string, stopping at the first NUL.
pub fn decode_fixed_str(buf: &[u8]) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

#[derive(Debug, Clone)]
pub struct LoginReqPayload {
    pub name: String,
    pub is_ai: bool,
}

impl LoginReqPayload {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; MAX_NAME_LEN + 1];
        encode_fixed_str(&self.name, &mut buf[0..MAX_NAME_LEN]);
        buf[MAX_NAME_LEN] = self.is_ai as u8;
        buf
    }

    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < MAX_NAME_LEN + 1 {
            return None;
        }
        Some(Self {
            name: decode_fixed_str(&buf[0..MAX_NAME_LEN]),
            is_ai: buf[MAX_NAME_LEN] != 0,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LoginRespPayload {
    pub player_id: u32,
    pub color: u8,
    pub grid_width: u16,
    pub grid_height: u16,
}

impl LoginRespPayload {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(9);
        buf.extend_from_slice(&self.player_id.to_be_bytes());
        buf.push(self.color);
        buf.extend_from_slice(&self.grid_width.to_be_bytes());
        buf.extend_from_slice(&self.grid_height.to_be_bytes());
        buf
    }

    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < 9 {
            return None;
        }
        Some(Self {
            player_id: u32::from_be_bytes(buf[0..4].try_into().unwrap()),
            color: buf[4],
            grid_width: u16::from_be_bytes(buf[5..7].try_into().unwrap()),
            grid_height: u16::from_be_bytes(buf[7..9].try_into().unwrap()),
        })
    }
}

/// One map snapshot: the rendered grid plus the per-slot scoreboard.
#[derive(Debug, Clone)]
pub struct MapUpdatePayload {
    pub tick: u64,
    pub width: u16,
    pub height: u16,
    /// Row-major, `width * height` cell codes.
    pub map: Vec<u8>,
    pub scores: Vec<i32>,
    pub alive: Vec<u8>,
    pub active: Vec<u8>,
    pub names: Vec<String>,
}

impl MapUpdatePayload {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(
            4 + self.map.len() + MAX_PLAYERS * (4 + 1 + 1 + MAX_NAME_LEN),
        );
        buf.extend_from_slice(&(self.tick as u32).to_be_bytes());
        buf.extend_from_slice(&self.map);
        for score in &self.scores {
            buf.extend_from_slice(&score.to_be_bytes());
        }
        buf.extend_from_slice(&self.alive);
        buf.extend_from_slice(&self.active);
        let mut name_buf = [0u8; MAX_NAME_LEN];
        for name in &self.names {
            encode_fixed_str(name, &mut name_buf);
            buf.extend_from_slice(&name_buf);
        }
        buf
    }

    pub fn decode(buf: &[u8], width: u16, height: u16) -> Option<Self> {
        let map_len = width as usize * height as usize;
        let mut i = 0usize;
        let tick = u32::from_be_bytes(buf.get(i..i + 4)?.try_into().ok()?) as u64;
        i += 4;
        let map = buf.get(i..i + map_len)?.to_vec();
        i += map_len;

        let mut scores = Vec::with_capacity(MAX_PLAYERS);
        for _ in 0..MAX_PLAYERS {
            scores.push(i32::from_be_bytes(buf.get(i..i + 4)?.try_into().ok()?));
            i += 4;
        }

        let alive = buf.get(i..i + MAX_PLAYERS)?.to_vec();
        i += MAX_PLAYERS;
        let active = buf.get(i..i + MAX_PLAYERS)?.to_vec();
        i += MAX_PLAYERS;

        let mut names = Vec::with_capacity(MAX_PLAYERS);
        for _ in 0..MAX_PLAYERS {
            names.push(decode_fixed_str(buf.get(i..i + MAX_NAME_LEN)?));
            i += MAX_NAME_LEN;
        }

        Some(Self {
            tick,
            width,
            height,
            map,
            scores,
            alive,
            active,
            names,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ChatSendPayload {
    pub text: String,
}

impl ChatSendPayload {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; MAX_CHAT_TEXT_LEN];
        encode_fixed_str(&self.text, &mut buf);
        buf
    }

    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.is_empty() {
            return None;
        }
        Some(Self {
            text: decode_fixed_str(buf),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ChatRecvPayload {
    pub sender_id: u32,
    pub sender_name: String,
    pub text: String,
}

impl ChatRecvPayload {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(4 + MAX_NAME_LEN + MAX_CHAT_TEXT_LEN);
        buf.extend_from_slice(&self.sender_id.to_be_bytes());
        let mut name_buf = [0u8; MAX_NAME_LEN];
        encode_fixed_str(&self.sender_name, &mut name_buf);
        buf.extend_from_slice(&name_buf);
        let mut text_buf = [0u8; MAX_CHAT_TEXT_LEN];
        encode_fixed_str(&self.text, &mut text_buf);
        buf.extend_from_slice(&text_buf);
        buf
    }

    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < 4 + MAX_NAME_LEN + MAX_CHAT_TEXT_LEN {
            return None;
        }
        Some(Self {
            sender_id: u32::from_be_bytes(buf[0..4].try_into().unwrap()),
            sender_name: decode_fixed_str(&buf[4..4 + MAX_NAME_LEN]),
            text: decode_fixed_str(&buf[4 + MAX_NAME_LEN..4 + MAX_NAME_LEN + MAX_CHAT_TEXT_LEN]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_is_sum_truncated_to_16_bits() {
        let data = vec![0xFFu8; 1000];
        let expected = ((0xFFu32 * 1000) & 0xFFFF) as u16;
        assert_eq!(checksum(&data), expected);
    }

    #[test]
    fn xor_cipher_is_an_involution() {
        let original = b"hello world".to_vec();
        let mut data = original.clone();
        xor_cipher(&mut data);
        assert_ne!(data, original);
        xor_cipher(&mut data);
        assert_eq!(data, original);
    }

    #[test]
    fn fixed_str_round_trips_under_the_limit() {
        let mut buf = [0u8; MAX_NAME_LEN];
        encode_fixed_str("alice", &mut buf);
        assert_eq!(decode_fixed_str(&buf), "alice");
    }

    #[test]
    fn fixed_str_truncates_to_capacity_minus_one() {
        let mut buf = [0u8; MAX_NAME_LEN];
        encode_fixed_str("a_name_that_is_far_too_long_for_the_buffer", &mut buf);
        let decoded = decode_fixed_str(&buf);
        assert_eq!(decoded.len(), MAX_NAME_LEN - 1);
    }

    #[test]
    fn login_req_round_trips() {
        let payload = LoginReqPayload {
            name: "bob".to_string(),
            is_ai: true,
        };
        let encoded = payload.encode();
        let decoded = LoginReqPayload::decode(&encoded).unwrap();
        assert_eq!(decoded.name, "bob");
        assert!(decoded.is_ai);
    }

    #[test]
    fn login_resp_round_trips() {
        let payload = LoginRespPayload {
            player_id: 42,
            color: 3,
            grid_width: 50,
            grid_height: 50,
        };
        let encoded = payload.encode();
        let decoded = LoginRespPayload::decode(&encoded).unwrap();
        assert_eq!(decoded.player_id, 42);
        assert_eq!(decoded.color, 3);
        assert_eq!(decoded.grid_width, 50);
        assert_eq!(decoded.grid_height, 50);
    }

    #[test]
    fn chat_recv_round_trips() {
        let payload = ChatRecvPayload {
            sender_id: 7,
            sender_name: "carol".to_string(),
            text: "hi there".to_string(),
        };
        let encoded = payload.encode();
        let decoded = ChatRecvPayload::decode(&encoded).unwrap();
        assert_eq!(decoded.sender_id, 7);
        assert_eq!(decoded.sender_name, "carol");
        assert_eq!(decoded.text, "hi there");
    }
}
