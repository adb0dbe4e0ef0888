//! SSH **cipher** algorithms.

use cipher::{InnerIvInit, KeyInit, StreamCipher};
use strum::{AsRefStr, EnumString};

use crate::{msg::trans::KexInit, Error, Result};

/// Keystream bytes discarded by the `arcfour128` and `arcfour256`
/// ciphers before any data is processed, as per
/// [RFC 4345](https://datatracker.ietf.org/doc/html/rfc4345).
const ARCFOUR_DISCARD: usize = 1536;

/// The cipher state kept across packets, so that CBC chaining,
/// counters and stream positions carry from one packet to the next.
// TODO: (optimization) Get rid of this Box<dyn> altogether.
pub type CipherState = Box<dyn std::any::Any + Send + Sync>;

pub(crate) fn negociate(clientkex: &KexInit, serverkex: &KexInit) -> Result<(Cipher, Cipher)> {
    Ok((
        clientkex
            .encryption_algorithms_client_to_server
            .preferred_in(&serverkex.encryption_algorithms_client_to_server)
            .ok_or(Error::NoCommonCipher)?
            .parse()
            .map_err(|_| Error::NoCommonCipher)?,
        clientkex
            .encryption_algorithms_server_to_client
            .preferred_in(&serverkex.encryption_algorithms_server_to_client)
            .ok_or(Error::NoCommonCipher)?
            .parse()
            .map_err(|_| Error::NoCommonCipher)?,
    ))
}

/// SSH cipher algorithms.
#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq, EnumString, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum Cipher {
    /// AES-256 in counter (CTR) mode.
    Aes256Ctr,

    /// AES-192 in counter (CTR) mode.
    Aes192Ctr,

    /// AES-128 in counter (CTR) mode.
    Aes128Ctr,

    /// AES-256 in cipher block chaining (CBC) mode.
    Aes256Cbc,

    /// AES-192 in cipher block chaining (CBC) mode.
    Aes192Cbc,

    /// AES-128 in cipher block chaining (CBC) mode.
    Aes128Cbc,

    /// TripleDES in cipher block chaining (CBC) mode.
    #[strum(serialize = "3des-cbc")]
    TDesCbc,

    /// Blowfish in cipher block chaining (CBC) mode.
    BlowfishCbc,

    /// RC4 with 1536 discarded keystream bytes, 256-bit key.
    Arcfour256,

    /// RC4 with 1536 discarded keystream bytes, 128-bit key.
    Arcfour128,

    /// Plain RC4, 128-bit key, as specified in
    /// [RFC 4253 § 6.3](https://datatracker.ietf.org/doc/html/rfc4253#section-6.3).
    Arcfour,

    /// No cipher algorithm.
    #[default]
    None,
}

impl Cipher {
    /// This method is a hack to solve deduplication of the enum
    /// variants and to store the cipher states inside a dynamically
    /// typed `Box<dyn std::any::Any>`.
    fn state<'s, T: cipher::KeyIvInit + Send + Sync + 'static>(
        state: &'s mut Option<CipherState>,
        key: &[u8],
        iv: &[u8],
    ) -> &'s mut T {
        state
            .get_or_insert_with(|| {
                Box::new(T::new_from_slices(key, iv).expect("Key derivation failed horribly"))
            })
            .downcast_mut()
            .expect("State changed in the meanwhile")
    }

    /// Same lazy-initialization hack for key-only stream ciphers,
    /// draining `discard` keystream bytes on creation.
    fn stream_state<'s, T: KeyInit + StreamCipher + Send + Sync + 'static>(
        state: &'s mut Option<CipherState>,
        key: &[u8],
        discard: usize,
    ) -> &'s mut T {
        state
            .get_or_insert_with(|| {
                let mut cipher =
                    T::new_from_slice(key).expect("Key derivation failed horribly");
                cipher.apply_keystream(&mut vec![0; discard]);

                Box::new(cipher)
            })
            .downcast_mut()
            .expect("State changed in the meanwhile")
    }

    /// Blowfish carries a variable-length key, which rules out the
    /// generic [`cipher::KeyIvInit`] path above.
    fn blowfish_state<'s, M: InnerIvInit<Inner = blowfish::Blowfish> + Send + Sync + 'static>(
        state: &'s mut Option<CipherState>,
        key: &[u8],
        iv: &[u8],
    ) -> &'s mut M {
        state
            .get_or_insert_with(|| {
                let inner = blowfish::Blowfish::new_from_slice(key)
                    .expect("Key derivation failed horribly");

                Box::new(
                    M::inner_iv_slice_init(inner, iv).expect("Key derivation failed horribly"),
                )
            })
            .downcast_mut()
            .expect("State changed in the meanwhile")
    }

    fn ctr<C: ctr::cipher::StreamCipher>(cipher: &mut C, buffer: &mut [u8]) -> Result<()> {
        cipher
            .try_apply_keystream(buffer)
            .map_err(|_| Error::Cipher)
    }

    pub(crate) fn encrypt(
        &mut self,
        state: &mut Option<CipherState>,
        key: &[u8],
        iv: &[u8],
        buffer: &mut [u8],
    ) -> Result<()> {
        fn cbc<C: cbc::cipher::BlockEncryptMut>(cipher: &mut C, buffer: &mut [u8]) -> Result<()> {
            use cbc::cipher::inout;

            let data = inout::InOutBufReserved::from_mut_slice(buffer, buffer.len())
                .map_err(|_| Error::Cipher)?;

            let mut buf = data
                .into_padded_blocks::<cbc::cipher::block_padding::NoPadding, C::BlockSize>()
                .map_err(|_| Error::Cipher)?;

            cipher.encrypt_blocks_inout_mut(buf.get_blocks());
            if let Some(block) = buf.get_tail_block() {
                cipher.encrypt_block_inout_mut(block);
            }

            Ok(())
        }

        match self {
            Self::Aes256Ctr => Self::ctr(
                Self::state::<ctr::Ctr128BE<aes::Aes256>>(state, key, iv),
                buffer,
            ),
            Self::Aes192Ctr => Self::ctr(
                Self::state::<ctr::Ctr128BE<aes::Aes192>>(state, key, iv),
                buffer,
            ),
            Self::Aes128Ctr => Self::ctr(
                Self::state::<ctr::Ctr128BE<aes::Aes128>>(state, key, iv),
                buffer,
            ),
            Self::Aes256Cbc => cbc(
                Self::state::<cbc::Encryptor<aes::Aes256>>(state, key, iv),
                buffer,
            ),
            Self::Aes192Cbc => cbc(
                Self::state::<cbc::Encryptor<aes::Aes192>>(state, key, iv),
                buffer,
            ),
            Self::Aes128Cbc => cbc(
                Self::state::<cbc::Encryptor<aes::Aes128>>(state, key, iv),
                buffer,
            ),
            Self::TDesCbc => cbc(
                Self::state::<cbc::Encryptor<des::TdesEde3>>(state, key, iv),
                buffer,
            ),
            Self::BlowfishCbc => cbc(
                Self::blowfish_state::<cbc::Encryptor<blowfish::Blowfish>>(state, key, iv),
                buffer,
            ),
            Self::Arcfour256 => Self::ctr(
                Self::stream_state::<rc4::Rc4<cipher::consts::U32>>(state, key, ARCFOUR_DISCARD),
                buffer,
            ),
            Self::Arcfour128 => Self::ctr(
                Self::stream_state::<rc4::Rc4<cipher::consts::U16>>(state, key, ARCFOUR_DISCARD),
                buffer,
            ),
            Self::Arcfour => Self::ctr(
                Self::stream_state::<rc4::Rc4<cipher::consts::U16>>(state, key, 0),
                buffer,
            ),
            Self::None => Ok(()),
        }
    }

    pub(crate) fn decrypt(
        &mut self,
        state: &mut Option<CipherState>,
        key: &[u8],
        iv: &[u8],
        buffer: &mut [u8],
    ) -> Result<()> {
        fn cbc<C: cbc::cipher::BlockDecryptMut>(cipher: &mut C, buffer: &mut [u8]) -> Result<()> {
            use cbc::cipher::inout;

            let data = inout::InOutBufReserved::from_mut_slice(buffer, buffer.len())
                .map_err(|_| Error::Cipher)?;

            let mut buf = data
                .into_padded_blocks::<cbc::cipher::block_padding::NoPadding, C::BlockSize>()
                .map_err(|_| Error::Cipher)?;

            cipher.decrypt_blocks_inout_mut(buf.get_blocks());
            if let Some(block) = buf.get_tail_block() {
                cipher.decrypt_block_inout_mut(block);
            }

            Ok(())
        }

        match self {
            // Keystream ciphers encrypt and decrypt the same way.
            Self::Aes256Ctr
            | Self::Aes192Ctr
            | Self::Aes128Ctr
            | Self::Arcfour256
            | Self::Arcfour128
            | Self::Arcfour => self.encrypt(state, key, iv, buffer),
            Self::Aes256Cbc => cbc(
                Self::state::<cbc::Decryptor<aes::Aes256>>(state, key, iv),
                buffer,
            ),
            Self::Aes192Cbc => cbc(
                Self::state::<cbc::Decryptor<aes::Aes192>>(state, key, iv),
                buffer,
            ),
            Self::Aes128Cbc => cbc(
                Self::state::<cbc::Decryptor<aes::Aes128>>(state, key, iv),
                buffer,
            ),
            Self::TDesCbc => cbc(
                Self::state::<cbc::Decryptor<des::TdesEde3>>(state, key, iv),
                buffer,
            ),
            Self::BlowfishCbc => cbc(
                Self::blowfish_state::<cbc::Decryptor<blowfish::Blowfish>>(state, key, iv),
                buffer,
            ),
            Self::None => Ok(()),
        }
    }

    /// The cipher's block size in bytes; keystream ciphers report `8`,
    /// which is also the packet alignment floor.
    pub(crate) fn block_size(&self) -> usize {
        match self {
            Self::None
            | Self::TDesCbc
            | Self::BlowfishCbc
            | Self::Arcfour256
            | Self::Arcfour128
            | Self::Arcfour => 8,
            Self::Aes128Cbc
            | Self::Aes192Cbc
            | Self::Aes256Cbc
            | Self::Aes128Ctr
            | Self::Aes192Ctr
            | Self::Aes256Ctr => 16,
        }
    }

    pub(crate) fn key_size(&self) -> usize {
        match self {
            Self::None => 0,
            Self::Aes128Cbc
            | Self::Aes128Ctr
            | Self::BlowfishCbc
            | Self::Arcfour128
            | Self::Arcfour => 16,
            Self::TDesCbc | Self::Aes192Cbc | Self::Aes192Ctr => 24,
            Self::Aes256Cbc | Self::Aes256Ctr | Self::Arcfour256 => 32,
        }
    }

    pub(crate) fn iv_size(&self) -> usize {
        match self {
            Self::None | Self::Arcfour256 | Self::Arcfour128 | Self::Arcfour => 0,
            Self::TDesCbc | Self::BlowfishCbc => 8,
            Self::Aes128Cbc
            | Self::Aes192Cbc
            | Self::Aes256Cbc
            | Self::Aes128Ctr
            | Self::Aes192Ctr
            | Self::Aes256Ctr => 16,
        }
    }
}
