//! Frame codec.
//!
//! Messages are framed as:
//! - 4 bytes: network magic
//! - 4 bytes: command opcode
//! - 4 bytes: payload length
//! - N bytes: message payload
//!
//! All header fields are big-endian. The length is checked against the
//! command's own payload bound before any payload byte is buffered.

use std::io::Cursor;

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{WireError, WireResult};
use crate::messages::{Command, Message};
use crate::network::BitcoinNet;
use crate::PROTOCOL_VERSION;

/// Header size: magic + command + length.
pub const HEADER_SIZE: usize = 12;

/// Codec for network-tagged message frames.
#[derive(Debug)]
pub struct MessageCodec {
    net: BitcoinNet,
    pver: u32,
    /// Command and payload length of the frame being read, once its header
    /// has been parsed.
    current: Option<(Command, usize)>,
}

impl MessageCodec {
    /// Create a codec for `net` at the current protocol version.
    pub fn new(net: BitcoinNet) -> Self {
        Self::with_version(net, PROTOCOL_VERSION)
    }

    pub fn with_version(net: BitcoinNet, pver: u32) -> Self {
        Self {
            net,
            pver,
            current: None,
        }
    }

    pub fn network(&self) -> BitcoinNet {
        self.net
    }

    fn read_header(&self, src: &BytesMut) -> WireResult<(Command, usize)> {
        let mut header = &src[..HEADER_SIZE];

        let magic = header.get_u32();
        if magic != self.net.magic() {
            return Err(WireError::InvalidMagic {
                expected: self.net.magic(),
                actual: magic,
            });
        }

        let command = Command::try_from(header.get_u32())?;

        let length = header.get_u32() as usize;
        let max = command.max_payload_length(self.pver) as usize;
        if length > max {
            return Err(WireError::PayloadTooLarge {
                command,
                size: length,
                max,
            });
        }

        Ok((command, length))
    }
}

impl Decoder for MessageCodec {
    type Item = Message;
    type Error = WireError;

    fn decode(&mut self, src: &mut BytesMut) -> WireResult<Option<Self::Item>> {
        let (command, length) = match self.current {
            Some(current) => current,
            None => {
                if src.len() < HEADER_SIZE {
                    return Ok(None);
                }
                let current = self.read_header(src)?;
                self.current = Some(current);
                current
            }
        };

        if src.len() < HEADER_SIZE + length {
            src.reserve(HEADER_SIZE + length - src.len());
            return Ok(None);
        }

        src.advance(HEADER_SIZE);
        let payload = src.split_to(length);
        self.current = None;

        let mut cursor = Cursor::new(&payload[..]);
        let message = Message::decode_payload(command, &mut cursor, self.pver)?;

        let remaining = length - cursor.position() as usize;
        if remaining > 0 {
            return Err(WireError::TrailingBytes { command, remaining });
        }

        Ok(Some(message))
    }
}

impl Encoder<Message> for MessageCodec {
    type Error = WireError;

    fn encode(&mut self, message: Message, dst: &mut BytesMut) -> WireResult<()> {
        let command = message.command();

        let mut payload = Vec::with_capacity(message.max_payload_length(self.pver) as usize);
        message.encode(&mut payload, self.pver)?;

        let max = message.max_payload_length(self.pver) as usize;
        if payload.len() > max {
            return Err(WireError::PayloadTooLarge {
                command,
                size: payload.len(),
                max,
            });
        }

        dst.reserve(HEADER_SIZE + payload.len());
        dst.put_u32(self.net.magic());
        dst.put_u32(command.code());
        dst.put_u32(payload.len() as u32);
        dst.put_slice(&payload);

        Ok(())
    }
}
