//! SSH **MAC** algorithms.

use digest::OutputSizeUser;
use md5::Md5;
use sha1::Sha1;
use sha2::Sha256;
use strum::{AsRefStr, EnumString};

use crate::{msg::trans::KexInit, Error, Result};

pub(crate) fn negociate(clientkex: &KexInit, serverkex: &KexInit) -> Result<(Hmac, Hmac)> {
    Ok((
        clientkex
            .mac_algorithms_client_to_server
            .preferred_in(&serverkex.mac_algorithms_client_to_server)
            .ok_or(Error::NoCommonHmac)?
            .parse()
            .map_err(|_| Error::NoCommonHmac)?,
        clientkex
            .mac_algorithms_server_to_client
            .preferred_in(&serverkex.mac_algorithms_server_to_client)
            .ok_or(Error::NoCommonHmac)?
            .parse()
            .map_err(|_| Error::NoCommonHmac)?,
    ))
}

/// SSH hmac algorithms.
///
/// The MAC is computed over the concatenation of the packet sequence
/// number, as a big-endian `uint32`, and the cleartext packet; the
/// `-96` variants transmit only the leftmost 12 bytes of the digest.
#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq, EnumString, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum Hmac {
    /// HMAC with sha-2-256 digest.
    #[strum(serialize = "hmac-sha2-256")]
    HmacSha256,

    /// HMAC with sha-1 digest.
    HmacSha1,

    /// HMAC with sha-1 digest, truncated to 96 bits.
    #[strum(serialize = "hmac-sha1-96")]
    HmacSha196,

    /// HMAC with md5 digest.
    HmacMd5,

    /// HMAC with md5 digest, truncated to 96 bits.
    #[strum(serialize = "hmac-md5-96")]
    HmacMd596,

    /// No HMAC algorithm.
    #[default]
    None,
}

impl Hmac {
    pub(crate) fn verify(
        &self,
        seq: u32,
        buf: &[u8],
        key: &[u8],
        mac: &[u8],
    ) -> Result<(), digest::MacError> {
        fn verify<D: digest::Mac + digest::KeyInit>(
            seq: u32,
            buf: &[u8],
            key: &[u8],
            mac: &[u8],
            truncated: bool,
        ) -> Result<(), digest::MacError> {
            let computed = <D as digest::Mac>::new_from_slice(key)
                .expect("Key derivation failed horribly")
                .chain_update(seq.to_be_bytes())
                .chain_update(buf);

            if truncated {
                computed.verify_truncated_left(mac)
            } else {
                computed.verify_slice(mac)
            }
        }

        match self {
            Self::HmacSha256 => verify::<hmac::Hmac<Sha256>>(seq, buf, key, mac, false),
            Self::HmacSha1 => verify::<hmac::Hmac<Sha1>>(seq, buf, key, mac, false),
            Self::HmacSha196 => verify::<hmac::Hmac<Sha1>>(seq, buf, key, mac, true),
            Self::HmacMd5 => verify::<hmac::Hmac<Md5>>(seq, buf, key, mac, false),
            Self::HmacMd596 => verify::<hmac::Hmac<Md5>>(seq, buf, key, mac, true),
            Self::None => Ok(()),
        }
    }

    pub(crate) fn sign(&self, seq: u32, buf: &[u8], key: &[u8]) -> Vec<u8> {
        fn sign<D: digest::Mac + digest::KeyInit>(seq: u32, buf: &[u8], key: &[u8]) -> Vec<u8> {
            <D as digest::Mac>::new_from_slice(key)
                .expect("Key derivation failed horribly")
                .chain_update(seq.to_be_bytes())
                .chain_update(buf)
                .finalize()
                .into_bytes()
                .to_vec()
        }

        let mut mac = match self {
            Self::HmacSha256 => sign::<hmac::Hmac<Sha256>>(seq, buf, key),
            Self::HmacSha1 | Self::HmacSha196 => sign::<hmac::Hmac<Sha1>>(seq, buf, key),
            Self::HmacMd5 | Self::HmacMd596 => sign::<hmac::Hmac<Md5>>(seq, buf, key),
            Self::None => Default::default(),
        };
        mac.truncate(self.size());

        mac
    }

    /// The number of MAC bytes actually transmitted on the wire.
    pub(crate) fn size(&self) -> usize {
        match self {
            Self::HmacSha256 => Sha256::output_size(),
            Self::HmacSha1 => Sha1::output_size(),
            Self::HmacMd5 => Md5::output_size(),
            Self::HmacSha196 | Self::HmacMd596 => 12,
            Self::None => 0,
        }
    }

    /// The integrity key length, which for the truncated variants is
    /// still the underlying digest size.
    pub(crate) fn key_size(&self) -> usize {
        match self {
            Self::HmacSha256 => Sha256::output_size(),
            Self::HmacSha1 | Self::HmacSha196 => Sha1::output_size(),
            Self::HmacMd5 | Self::HmacMd596 => Md5::output_size(),
            Self::None => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signatures_verify_and_bind_the_sequence_number() {
        let key = [0x42; 32];

        for hmac in [
            Hmac::HmacSha256,
            Hmac::HmacSha1,
            Hmac::HmacSha196,
            Hmac::HmacMd5,
            Hmac::HmacMd596,
        ] {
            let mac = hmac.sign(7, b"some packet", &key[..hmac.key_size()]);

            assert_eq!(mac.len(), hmac.size());
            assert!(hmac
                .verify(7, b"some packet", &key[..hmac.key_size()], &mac)
                .is_ok());
            assert!(hmac
                .verify(8, b"some packet", &key[..hmac.key_size()], &mac)
                .is_err());
        }
    }

    #[test]
    fn truncated_variants_transmit_twelve_bytes() {
        assert_eq!(Hmac::HmacSha196.size(), 12);
        assert_eq!(Hmac::HmacMd596.size(), 12);
        assert_eq!(Hmac::HmacSha196.key_size(), 20);
        assert_eq!(Hmac::HmacMd596.key_size(), 16);
    }
}
