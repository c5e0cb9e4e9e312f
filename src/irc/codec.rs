//! Line codec for the client connection.
//!
//! Reads CRLF (or bare LF) terminated lines and writes [`Message`]s with a
//! CRLF terminator. Invalid UTF-8 is decoded lossily; servers relay whatever
//! bytes users send and one bad line must not tear down the session.

use bytes::{BufMut, BytesMut};
use mxbl_proto::Message;
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder};

/// 8191 bytes of tags plus the 512 byte RFC 1459 body.
pub const MAX_LINE_LEN: usize = 8191 + 512;

/// Errors produced while framing lines.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("line too long: {actual} bytes (limit {limit})")]
    LineTooLong { actual: usize, limit: usize },
}

/// Newline-delimited codec with a bounded line length.
pub struct IrcLineCodec {
    /// Index of next byte to check for newline.
    next_index: usize,
    max_len: usize,
}

impl IrcLineCodec {
    pub fn new() -> Self {
        Self::with_max_len(MAX_LINE_LEN)
    }

    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            next_index: 0,
            max_len,
        }
    }
}

impl Default for IrcLineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for IrcLineCodec {
    type Item = String;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, CodecError> {
        let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') else {
            self.next_index = src.len();
            if src.len() > self.max_len {
                return Err(CodecError::LineTooLong {
                    actual: src.len(),
                    limit: self.max_len,
                });
            }
            return Ok(None);
        };

        let line = src.split_to(self.next_index + offset + 1);
        self.next_index = 0;

        if line.len() > self.max_len {
            return Err(CodecError::LineTooLong {
                actual: line.len(),
                limit: self.max_len,
            });
        }

        let text = String::from_utf8_lossy(&line);
        Ok(Some(text.trim_end_matches(['\r', '\n']).to_owned()))
    }
}

impl Encoder<Message> for IrcLineCodec {
    type Error = CodecError;

    fn encode(&mut self, msg: Message, dst: &mut BytesMut) -> Result<(), CodecError> {
        let line = msg.to_string();
        dst.reserve(line.len() + 2);
        dst.put_slice(line.as_bytes());
        dst.put_slice(b"\r\n");
        Ok(())
    }
}
