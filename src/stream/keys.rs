//! Derivation of the directional keys from the key-exchange output,
//! as defined in
//! [RFC 4253 § 7.2](https://datatracker.ietf.org/doc/html/rfc4253#section-7.2).

use digest::{Digest, FixedOutputReset};
use secrecy::SecretBox;

use crate::{
    algorithm::{Cipher, Hmac},
    wire::MpInt,
};

/// The derived key chain of one direction: the cipher's initialization
/// vector and key, and the integrity key.
#[derive(Debug, Default)]
pub struct Keys {
    /// Cipher _initialization vector_.
    pub iv: SecretBox<Vec<u8>>,

    /// Cipher _key_.
    pub key: SecretBox<Vec<u8>>,

    /// Hmac _key_.
    pub hmac: SecretBox<Vec<u8>>,
}

impl Keys {
    /// Derive the client-to-server chain, letters `A`, `C` and `E`.
    pub fn as_client<D: Digest + FixedOutputReset>(
        secret: &MpInt,
        hash: &[u8],
        session_id: &[u8],
        cipher: &Cipher,
        hmac: &Hmac,
    ) -> Self {
        Self {
            iv: Self::derive::<D>(secret, hash, b'A', session_id, cipher.iv_size()),
            key: Self::derive::<D>(secret, hash, b'C', session_id, cipher.key_size()),
            hmac: Self::derive::<D>(secret, hash, b'E', session_id, hmac.key_size()),
        }
    }

    /// Derive the server-to-client chain, letters `B`, `D` and `F`.
    pub fn as_server<D: Digest + FixedOutputReset>(
        secret: &MpInt,
        hash: &[u8],
        session_id: &[u8],
        cipher: &Cipher,
        hmac: &Hmac,
    ) -> Self {
        Self {
            iv: Self::derive::<D>(secret, hash, b'B', session_id, cipher.iv_size()),
            key: Self::derive::<D>(secret, hash, b'D', session_id, cipher.key_size()),
            hmac: Self::derive::<D>(secret, hash, b'F', session_id, hmac.key_size()),
        }
    }

    /// Expand `HASH(K || H || letter || session_id)` by re-hashing
    /// `HASH(K || H || K1 || ... || Kn)` until `size` bytes are
    /// produced; `K` is bound in its `mpint` wire representation.
    fn derive<D: Digest + FixedOutputReset>(
        secret: &MpInt,
        hash: &[u8],
        letter: u8,
        session_id: &[u8],
        size: usize,
    ) -> SecretBox<Vec<u8>> {
        SecretBox::<Vec<u8>>::init_with_mut(|key| {
            let mut hasher = D::new()
                .chain_update((secret.len() as u32).to_be_bytes())
                .chain_update(secret)
                .chain_update(hash)
                .chain_update([letter])
                .chain_update(session_id);

            key.extend_from_slice(&hasher.finalize_reset());

            while key.len() < size {
                hasher = hasher
                    .chain_update((secret.len() as u32).to_be_bytes())
                    .chain_update(secret)
                    .chain_update(hash)
                    .chain_update(&*key);

                key.extend_from_slice(&hasher.finalize_reset());
            }

            key.truncate(size);
        })
    }
}
