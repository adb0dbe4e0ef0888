//! The exchange-hash preimages, hashed to produce `H`.

use digest::Digest;

use crate::wire::{Buffer, MpInt};

/// The exchange hash preimage for the fixed-group `diffie-hellman-*`
/// kexes, computed as the hash of the concatenation of the following.
///
/// see <https://datatracker.ietf.org/doc/html/rfc4253#section-8>.
pub(super) struct DhExchange<'e> {
    /// Client's identification string (`\r` and `\n` excluded).
    pub v_c: &'e [u8],

    /// Server's identification string (`\r` and `\n` excluded).
    pub v_s: &'e [u8],

    /// Payload of the client's `SSH_MSG_KEXINIT` message.
    pub i_c: &'e [u8],

    /// Payload of the server's `SSH_MSG_KEXINIT` message.
    pub i_s: &'e [u8],

    /// Server's public host key blob.
    pub k_s: &'e [u8],

    /// Client's exchange value.
    pub e: &'e MpInt,

    /// Server's exchange value.
    pub f: &'e MpInt,

    /// Computed shared secret.
    pub k: &'e MpInt,
}

impl DhExchange<'_> {
    /// Produce the exchange hash with the specified digest algorithm.
    pub fn hash<D: Digest>(&self) -> digest::Output<D> {
        let mut buffer = Buffer::new();

        buffer.put_string(self.v_c);
        buffer.put_string(self.v_s);
        buffer.put_string(self.i_c);
        buffer.put_string(self.i_s);
        buffer.put_string(self.k_s);
        buffer.put_mpint(self.e);
        buffer.put_mpint(self.f);
        buffer.put_mpint(self.k);

        let digest = D::digest(buffer.as_slice());
        buffer.clear();

        digest
    }
}

/// The exchange hash preimage for the `diffie-hellman-group-exchange-*`
/// kexes, which additionally binds the group negociation.
///
/// see <https://datatracker.ietf.org/doc/html/rfc4419#section-3>.
pub(super) struct GexExchange<'e> {
    /// Client's identification string (`\r` and `\n` excluded).
    pub v_c: &'e [u8],

    /// Server's identification string (`\r` and `\n` excluded).
    pub v_s: &'e [u8],

    /// Payload of the client's `SSH_MSG_KEXINIT` message.
    pub i_c: &'e [u8],

    /// Payload of the server's `SSH_MSG_KEXINIT` message.
    pub i_s: &'e [u8],

    /// Server's public host key blob.
    pub k_s: &'e [u8],

    /// Requested minimal group size, in bits.
    pub min: u32,

    /// Requested preferred group size, in bits.
    pub n: u32,

    /// Requested maximal group size, in bits.
    pub max: u32,

    /// The group's safe prime.
    pub p: &'e MpInt,

    /// The group's generator.
    pub g: &'e MpInt,

    /// Client's exchange value.
    pub e: &'e MpInt,

    /// Server's exchange value.
    pub f: &'e MpInt,

    /// Computed shared secret.
    pub k: &'e MpInt,
}

impl GexExchange<'_> {
    /// Produce the exchange hash with the specified digest algorithm.
    pub fn hash<D: Digest>(&self) -> digest::Output<D> {
        let mut buffer = Buffer::new();

        buffer.put_string(self.v_c);
        buffer.put_string(self.v_s);
        buffer.put_string(self.i_c);
        buffer.put_string(self.i_s);
        buffer.put_string(self.k_s);
        buffer.put_u32(self.min);
        buffer.put_u32(self.n);
        buffer.put_u32(self.max);
        buffer.put_mpint(self.p);
        buffer.put_mpint(self.g);
        buffer.put_mpint(self.e);
        buffer.put_mpint(self.f);
        buffer.put_mpint(self.k);

        let digest = D::digest(buffer.as_slice());
        buffer.clear();

        digest
    }
}
