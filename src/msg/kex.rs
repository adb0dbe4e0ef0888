//! Messages involved in the SSH's **key-exchange** part of the protocol,
//! as defined in the [RFC 4253](https://datatracker.ietf.org/doc/html/rfc4253)
//! and the [RFC 4419](https://datatracker.ietf.org/doc/html/rfc4419).
//!
//! `SSH_MSG_KEXDH_REPLY` and `SSH_MSG_KEX_DH_GEX_GROUP` share the
//! message number `31`; which one is on the wire depends solely on the
//! key-exchange in progress, so callers decode by state, never by number.

use crate::{
    wire::{Buffer, MpInt},
    Result,
};

use super::Message;

/// The `SSH_MSG_KEXDH_INIT` message.
///
/// see <https://datatracker.ietf.org/doc/html/rfc4253#section-8>.
#[derive(Debug, Clone)]
pub struct KexDhInit {
    /// The client's exchange value `e = g^x mod p`.
    pub e: MpInt,
}

impl Message for KexDhInit {
    const NUMBER: u8 = 30;

    fn encode(&self, buffer: &mut Buffer) {
        buffer.put_mpint(&self.e);
    }

    fn decode(buffer: &mut Buffer) -> Result<Self> {
        Ok(Self {
            e: buffer.get_mpint()?,
        })
    }
}

/// The `SSH_MSG_KEXDH_REPLY` message.
///
/// see <https://datatracker.ietf.org/doc/html/rfc4253#section-8>.
#[derive(Debug, Clone)]
pub struct KexDhReply {
    /// The server's public host key blob `K_S`.
    pub k_s: Vec<u8>,

    /// The server's exchange value `f = g^y mod p`.
    pub f: MpInt,

    /// The signature of the exchange hash `H` with the host key.
    pub signature: Vec<u8>,
}

impl Message for KexDhReply {
    const NUMBER: u8 = 31;

    fn encode(&self, buffer: &mut Buffer) {
        buffer.put_string(&self.k_s);
        buffer.put_mpint(&self.f);
        buffer.put_string(&self.signature);
    }

    fn decode(buffer: &mut Buffer) -> Result<Self> {
        Ok(Self {
            k_s: buffer.get_string()?,
            f: buffer.get_mpint()?,
            signature: buffer.get_string()?,
        })
    }
}

/// The `SSH_MSG_KEX_DH_GEX_REQUEST` message.
///
/// see <https://datatracker.ietf.org/doc/html/rfc4419#section-3>.
#[derive(Debug, Clone)]
pub struct GexRequest {
    /// Minimal acceptable group size, in bits.
    pub min: u32,

    /// Preferred group size, in bits.
    pub n: u32,

    /// Maximal acceptable group size, in bits.
    pub max: u32,
}

impl Message for GexRequest {
    const NUMBER: u8 = 34;

    fn encode(&self, buffer: &mut Buffer) {
        buffer.put_u32(self.min);
        buffer.put_u32(self.n);
        buffer.put_u32(self.max);
    }

    fn decode(buffer: &mut Buffer) -> Result<Self> {
        Ok(Self {
            min: buffer.get_u32()?,
            n: buffer.get_u32()?,
            max: buffer.get_u32()?,
        })
    }
}

/// The `SSH_MSG_KEX_DH_GEX_GROUP` message.
///
/// see <https://datatracker.ietf.org/doc/html/rfc4419#section-3>.
#[derive(Debug, Clone)]
pub struct GexGroup {
    /// The safe prime of the group chosen by the server.
    pub p: MpInt,

    /// The generator for the subgroup.
    pub g: MpInt,
}

impl Message for GexGroup {
    const NUMBER: u8 = 31;

    fn encode(&self, buffer: &mut Buffer) {
        buffer.put_mpint(&self.p);
        buffer.put_mpint(&self.g);
    }

    fn decode(buffer: &mut Buffer) -> Result<Self> {
        Ok(Self {
            p: buffer.get_mpint()?,
            g: buffer.get_mpint()?,
        })
    }
}

/// The `SSH_MSG_KEX_DH_GEX_INIT` message.
///
/// see <https://datatracker.ietf.org/doc/html/rfc4419#section-3>.
#[derive(Debug, Clone)]
pub struct GexInit {
    /// The client's exchange value `e = g^x mod p`.
    pub e: MpInt,
}

impl Message for GexInit {
    const NUMBER: u8 = 32;

    fn encode(&self, buffer: &mut Buffer) {
        buffer.put_mpint(&self.e);
    }

    fn decode(buffer: &mut Buffer) -> Result<Self> {
        Ok(Self {
            e: buffer.get_mpint()?,
        })
    }
}

/// The `SSH_MSG_KEX_DH_GEX_REPLY` message.
///
/// see <https://datatracker.ietf.org/doc/html/rfc4419#section-3>.
#[derive(Debug, Clone)]
pub struct GexReply {
    /// The server's public host key blob `K_S`.
    pub k_s: Vec<u8>,

    /// The server's exchange value `f = g^y mod p`.
    pub f: MpInt,

    /// The signature of the exchange hash `H` with the host key.
    pub signature: Vec<u8>,
}

impl Message for GexReply {
    const NUMBER: u8 = 33;

    fn encode(&self, buffer: &mut Buffer) {
        buffer.put_string(&self.k_s);
        buffer.put_mpint(&self.f);
        buffer.put_string(&self.signature);
    }

    fn decode(buffer: &mut Buffer) -> Result<Self> {
        Ok(Self {
            k_s: buffer.get_string()?,
            f: buffer.get_mpint()?,
            signature: buffer.get_string()?,
        })
    }
}
