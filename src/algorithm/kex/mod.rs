//! SSH **key-exchange** algorithms.

use sha1::Sha1;
use sha2::Sha256;
use strum::{AsRefStr, EnumString};

use crate::{
    msg::trans::KexInit,
    stream::{Stream, TransportPair},
    wire::Id,
    Error, Pipe, Result,
};

use super::Proposal;

mod dh;
mod exchange;
mod group;
mod group_exchange;

pub(crate) fn negociate(clientkex: &KexInit, serverkex: &KexInit) -> Result<Kex> {
    clientkex
        .kex_algorithms
        .preferred_in(&serverkex.kex_algorithms)
        .ok_or(Error::NoCommonKex)?
        .parse()
        .map_err(|_| Error::NoCommonKex)
}

/// Everything a successful key-exchange produces: the transport
/// contexts to install at the `SSH_MSG_NEWKEYS` boundary, the exchange
/// hash `H` and the server's verified host key.
pub(crate) struct KexOutput {
    pub pair: TransportPair,
    pub hash: Vec<u8>,
    pub server_key: ssh_key::PublicKey,
    pub server_key_blob: Vec<u8>,
}

/// SSH key-exchange algorithms.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, EnumString, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum Kex {
    /// Negociated-group Diffie-Hellman with sha-2-256 digest.
    DiffieHellmanGroupExchangeSha256,

    /// Negociated-group Diffie-Hellman with sha-1 digest.
    DiffieHellmanGroupExchangeSha1,

    /// 2048-bit MODP group Diffie-Hellman with sha-1 digest.
    DiffieHellmanGroup14Sha1,

    /// 1024-bit MODP group Diffie-Hellman with sha-1 digest.
    DiffieHellmanGroup1Sha1,
}

impl Kex {
    /// The name of the hash algorithm behind this kex, as needed by
    /// the authentication layer to bind signatures to the session.
    pub fn hash_algorithm(&self) -> &'static str {
        match self {
            Self::DiffieHellmanGroupExchangeSha256 => "sha-256",
            Self::DiffieHellmanGroupExchangeSha1
            | Self::DiffieHellmanGroup14Sha1
            | Self::DiffieHellmanGroup1Sha1 => "sha-1",
        }
    }

    pub(crate) async fn as_client(
        &self,
        stream: &mut Stream<impl Pipe>,
        v_c: &Id,
        v_s: &Id,
        i_c: &[u8],
        i_s: &[u8],
        proposal: &Proposal,
    ) -> Result<KexOutput> {
        match self {
            Self::DiffieHellmanGroupExchangeSha256 => {
                group_exchange::as_client::<Sha256>(stream, v_c, v_s, i_c, i_s, proposal).await
            }
            Self::DiffieHellmanGroupExchangeSha1 => {
                group_exchange::as_client::<Sha1>(stream, v_c, v_s, i_c, i_s, proposal).await
            }
            Self::DiffieHellmanGroup14Sha1 => {
                group::as_client::<Sha1>(stream, dh::Group::group14(), v_c, v_s, i_c, i_s, proposal)
                    .await
            }
            Self::DiffieHellmanGroup1Sha1 => {
                group::as_client::<Sha1>(stream, dh::Group::group1(), v_c, v_s, i_c, i_s, proposal)
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_parse_to_the_expected_variants() {
        assert_eq!(
            "diffie-hellman-group-exchange-sha256".parse(),
            Ok(Kex::DiffieHellmanGroupExchangeSha256)
        );
        assert_eq!(
            "diffie-hellman-group14-sha1".parse(),
            Ok(Kex::DiffieHellmanGroup14Sha1)
        );
        assert_eq!(
            "diffie-hellman-group1-sha1".parse(),
            Ok(Kex::DiffieHellmanGroup1Sha1)
        );
        assert!("curve25519-sha256".parse::<Kex>().is_err());
    }
}
