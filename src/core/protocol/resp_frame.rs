// src/core/protocol/resp_frame.rs

//! RESP2 frames and the `tokio_util` codec used by the RESP persistence
//! gateway to talk to a Redis-compatible store.

use crate::core::RankError;
use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

const CRLF: &[u8] = b"\r\n";
const CRLF_LEN: usize = 2;

// Limits on what a reply may announce before it is rejected.
const MAX_FRAME_ELEMENTS: usize = 1_024 * 1_024;
const MAX_BULK_STRING_SIZE: usize = 512 * 1024 * 1024;
const MAX_RECURSION_DEPTH: usize = 32;

#[derive(Debug, Clone, PartialEq)]
pub enum RespFrame {
    SimpleString(String),
    Error(String),
    Integer(i64),
    BulkString(Bytes),
    Null,
    NullArray,
    Array(Vec<RespFrame>),
}

impl RespFrame {
    /// Builds a command frame: an array of bulk strings.
    pub fn command<I, B>(parts: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        RespFrame::Array(
            parts
                .into_iter()
                .map(|p| RespFrame::BulkString(p.into()))
                .collect(),
        )
    }

    pub fn encode_to_vec(&self) -> Result<Vec<u8>, RankError> {
        let mut buf = BytesMut::new();
        RespFrameCodec.encode(self.clone(), &mut buf)?;
        Ok(buf.to_vec())
    }

    /// Interprets a reply as an optional bulk payload (`GET`).
    pub fn into_optional_bytes(self) -> Result<Option<Bytes>, RankError> {
        match self {
            RespFrame::BulkString(b) => Ok(Some(b)),
            RespFrame::SimpleString(s) => Ok(Some(Bytes::from(s))),
            RespFrame::Null => Ok(None),
            other => Err(unexpected("bulk string", &other)),
        }
    }

    /// Interprets a reply as a flat array of bulk payloads (`HGETALL`).
    pub fn into_bytes_array(self) -> Result<Vec<Bytes>, RankError> {
        match self {
            RespFrame::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    RespFrame::BulkString(b) => Ok(b),
                    other => Err(unexpected("bulk string element", &other)),
                })
                .collect(),
            RespFrame::NullArray => Ok(Vec::new()),
            other => Err(unexpected("array", &other)),
        }
    }

    /// Accepts `+OK` or an integer count as acknowledgement of a write.
    pub fn expect_ack(self) -> Result<(), RankError> {
        match self {
            RespFrame::SimpleString(_) | RespFrame::Integer(_) => Ok(()),
            other => Err(unexpected("acknowledgement", &other)),
        }
    }
}

fn unexpected(wanted: &str, got: &RespFrame) -> RankError {
    RankError::Gateway(format!("expected {wanted} reply, got {got:?}"))
}

#[derive(Debug, Default)]
pub struct RespFrameCodec;

impl Encoder<RespFrame> for RespFrameCodec {
    type Error = RankError;

    fn encode(&mut self, item: RespFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            RespFrame::SimpleString(s) => write_line(dst, b'+', s.as_bytes()),
            RespFrame::Error(s) => write_line(dst, b'-', s.as_bytes()),
            RespFrame::Integer(i) => write_line(dst, b':', i.to_string().as_bytes()),
            RespFrame::BulkString(b) => {
                write_line(dst, b'$', b.len().to_string().as_bytes());
                dst.extend_from_slice(&b);
                dst.extend_from_slice(CRLF);
            }
            RespFrame::Null => dst.extend_from_slice(b"$-1\r\n"),
            RespFrame::NullArray => dst.extend_from_slice(b"*-1\r\n"),
            RespFrame::Array(items) => {
                write_line(dst, b'*', items.len().to_string().as_bytes());
                for frame in items {
                    self.encode(frame, dst)?;
                }
            }
        }
        Ok(())
    }
}

fn write_line(dst: &mut BytesMut, prefix: u8, body: &[u8]) {
    dst.reserve(body.len() + 1 + CRLF_LEN);
    dst.extend_from_slice(&[prefix]);
    dst.extend_from_slice(body);
    dst.extend_from_slice(CRLF);
}

impl Decoder for RespFrameCodec {
    type Item = RespFrame;
    type Error = RankError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        let mut cursor = &src[..];
        match parse_frame(&mut cursor, 0) {
            Ok(frame) => {
                let consumed = src.len() - cursor.len();
                src.advance(consumed);
                Ok(Some(frame))
            }
            // Not enough bytes buffered yet; wait for more.
            Err(RankError::IncompleteData) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Parses one frame from the front of `cursor`, advancing it past the frame.
fn parse_frame(cursor: &mut &[u8], depth: usize) -> Result<RespFrame, RankError> {
    if depth > MAX_RECURSION_DEPTH {
        return Err(RankError::Gateway(
            "RESP nesting depth limit exceeded".to_string(),
        ));
    }
    let Some((&prefix, rest)) = cursor.split_first() else {
        return Err(RankError::IncompleteData);
    };
    *cursor = rest;

    match prefix {
        b'+' => Ok(RespFrame::SimpleString(read_text(cursor)?)),
        b'-' => Ok(RespFrame::Error(read_text(cursor)?)),
        b':' => Ok(RespFrame::Integer(read_number(cursor)?)),
        b'$' => {
            let len = read_number(cursor)?;
            if len == -1 {
                return Ok(RespFrame::Null);
            }
            let len = usize::try_from(len).map_err(|_| RankError::SyntaxError)?;
            if len > MAX_BULK_STRING_SIZE {
                return Err(RankError::SyntaxError);
            }
            if cursor.len() < len + CRLF_LEN {
                return Err(RankError::IncompleteData);
            }
            if &cursor[len..len + CRLF_LEN] != CRLF {
                return Err(RankError::SyntaxError);
            }
            let data = Bytes::copy_from_slice(&cursor[..len]);
            *cursor = &cursor[len + CRLF_LEN..];
            Ok(RespFrame::BulkString(data))
        }
        b'*' => {
            let len = read_number(cursor)?;
            if len == -1 {
                return Ok(RespFrame::NullArray);
            }
            let len = usize::try_from(len).map_err(|_| RankError::SyntaxError)?;
            if len > MAX_FRAME_ELEMENTS {
                return Err(RankError::SyntaxError);
            }
            let mut items = Vec::with_capacity(len.min(1024));
            for _ in 0..len {
                items.push(parse_frame(cursor, depth + 1)?);
            }
            Ok(RespFrame::Array(items))
        }
        _ => Err(RankError::SyntaxError),
    }
}

fn read_line<'a>(cursor: &mut &'a [u8]) -> Result<&'a [u8], RankError> {
    let pos = cursor
        .windows(CRLF_LEN)
        .position(|w| w == CRLF)
        .ok_or(RankError::IncompleteData)?;
    let line = &cursor[..pos];
    *cursor = &cursor[pos + CRLF_LEN..];
    Ok(line)
}

fn read_text(cursor: &mut &[u8]) -> Result<String, RankError> {
    Ok(String::from_utf8_lossy(read_line(cursor)?).into_owned())
}

fn read_number(cursor: &mut &[u8]) -> Result<i64, RankError> {
    std::str::from_utf8(read_line(cursor)?)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or(RankError::SyntaxError)
}
