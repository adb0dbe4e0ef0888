//! The per-direction transform pipeline applied to every packet:
//! compression, padding, integrity and encryption.

use rand::Rng;
use secrecy::ExposeSecret;

use crate::{
    algorithm::{self, CipherState},
    msg::Packet,
    Result,
};

use super::Keys;

/// The transport contexts of both directions, `tx` being
/// client-to-server on a client session.
#[derive(Debug, Default)]
pub struct TransportPair {
    /// Inbound context.
    pub rx: Transport,

    /// Outbound context.
    pub tx: Transport,
}

/// The negociated algorithms of one direction, along with the cipher
/// state and the derived key chain.
///
/// A [`Transport`] is exclusively owned by its direction; ciphers and
/// MACs are stateful and must never be shared.
#[derive(Debug, Default)]
pub struct Transport {
    /// The negociated compression algorithm.
    pub compress: algorithm::Compress,

    /// The negociated cipher algorithm.
    pub cipher: algorithm::Cipher,

    /// The negociated MAC algorithm.
    pub hmac: algorithm::Hmac,

    /// The cipher state carried across packets.
    pub state: Option<CipherState>,

    /// The derived key chain.
    pub chain: Keys,
}

impl Transport {
    /// The cipher's block size, floored to the RFC's packet alignment.
    pub fn block_size(&self) -> usize {
        self.cipher.block_size().max(8)
    }

    /// The number of MAC bytes following each encrypted packet.
    pub fn mac_size(&self) -> usize {
        self.hmac.size()
    }

    /// Decrypt `buf` in place, chaining from the previous packet.
    pub fn decrypt<B: AsMut<[u8]>>(&mut self, mut buf: B) -> Result<()> {
        if self.cipher != algorithm::Cipher::None {
            self.cipher.decrypt(
                &mut self.state,
                self.chain.key.expose_secret(),
                self.chain.iv.expose_secret(),
                buf.as_mut(),
            )?;
        }

        Ok(())
    }

    /// Verify the MAC received for the cleartext packet `buf`.
    pub fn open<B: AsRef<[u8]>>(&mut self, buf: B, mac: &[u8], seq: u32) -> Result<()> {
        if self.hmac.size() > 0 {
            self.hmac
                .verify(seq, buf.as_ref(), self.chain.hmac.expose_secret(), mac)?;
        }

        Ok(())
    }

    /// Undo the negociated compression on a received payload.
    pub fn decompress(&mut self, buf: Vec<u8>) -> Result<Vec<u8>> {
        self.compress.decompress(buf)
    }

    /// Apply the negociated compression to an outgoing payload.
    pub fn compress<B: AsRef<[u8]>>(&mut self, buf: B) -> Result<Vec<u8>> {
        self.compress.compress(buf.as_ref())
    }

    fn padding(&self, payload: usize) -> u8 {
        const MIN_PAD_SIZE: usize = 4;

        let align = self.block_size();

        let size = std::mem::size_of::<u32>() + std::mem::size_of::<u8>() + payload;
        let padding = align - size % align;

        let padding = if padding < MIN_PAD_SIZE {
            padding + align
        } else {
            padding
        };

        if size + padding < self.block_size().max(Packet::MIN_SIZE) {
            (padding + align) as u8
        } else {
            padding as u8
        }
    }

    /// Prefix the payload with its padding length and append random
    /// padding, aligning the final packet to the cipher's block size.
    pub fn pad(&mut self, mut buf: Vec<u8>) -> Result<Vec<u8>> {
        let mut rng = rand::thread_rng();

        let padding = self.padding(buf.len());

        // prefix with the size
        let mut padded = vec![padding];
        padded.append(&mut buf);

        // fill with random
        padded.resize_with(padded.len() + padding as usize, || rng.gen());

        Ok(padded)
    }

    /// Encrypt `buf` in place, chaining into the next packet.
    pub fn encrypt<B: AsMut<[u8]>>(&mut self, mut buf: B) -> Result<()> {
        if self.cipher != algorithm::Cipher::None {
            self.cipher.encrypt(
                &mut self.state,
                self.chain.key.expose_secret(),
                self.chain.iv.expose_secret(),
                buf.as_mut(),
            )?;
        }

        Ok(())
    }

    /// Produce the MAC for the cleartext packet `buf`.
    pub fn seal<B: AsRef<[u8]>>(&mut self, buf: B, seq: u32) -> Vec<u8> {
        self.hmac
            .sign(seq, buf.as_ref(), self.chain.hmac.expose_secret())
    }
}
