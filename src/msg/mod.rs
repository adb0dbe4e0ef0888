//! Typed SSH messages and their binary representation.

use crate::{wire::Buffer, Error, Result};

pub mod kex;
pub mod trans;

/// A message of the protocol, able to encode and decode itself
/// from the payload of a [`Packet`].
pub trait Message: Sized {
    /// The message number identifying this message on the wire.
    const NUMBER: u8;

    /// Encode the fields of the message, the number excluded.
    fn encode(&self, buffer: &mut Buffer);

    /// Decode the fields of the message, the number excluded.
    fn decode(buffer: &mut Buffer) -> Result<Self>;
}

/// A packet's decrypted, decompressed payload; `payload[0]` is the
/// message number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// The payload of the packet.
    pub payload: Vec<u8>,
}

impl Packet {
    /// Minimal size of a packet on the wire, MAC excluded,
    /// as mandated by the RFC.
    pub const MIN_SIZE: usize = 16;

    /// The message number of the packet, if any.
    pub fn message_number(&self) -> Option<u8> {
        self.payload.first().copied()
    }

    /// Interpret the payload as a `T` message.
    ///
    /// Fails with [`Error::UnexpectedMessage`] when the message number
    /// differs from `T`'s.
    pub fn to<T: Message>(&self) -> Result<T> {
        let mut buffer = Buffer::from(&self.payload[..]);

        if buffer.get_u8()? != T::NUMBER {
            return Err(Error::UnexpectedMessage);
        }

        T::decode(&mut buffer)
    }
}

/// Conversion to a [`Packet`], either from a payload or by
/// encoding a [`Message`].
pub trait IntoPacket {
    /// Perform the conversion.
    fn into_packet(self) -> Packet;
}

impl IntoPacket for Packet {
    fn into_packet(self) -> Packet {
        self
    }
}

impl<T: Message> IntoPacket for &T {
    fn into_packet(self) -> Packet {
        let mut buffer = Buffer::new();

        buffer.put_u8(T::NUMBER);
        self.encode(&mut buffer);

        Packet {
            payload: buffer.into_vec(),
        }
    }
}
