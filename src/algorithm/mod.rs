//! Supported algorithms for **compression**, **encryption**, **integrity**,
//! **host keys** and **key-exchange**, along with the negociation procedure
//! over two `SSH_MSG_KEXINIT` proposals.

use crate::{msg::trans::KexInit, Result};

pub mod cipher;
pub use cipher::Cipher;
pub(crate) use cipher::CipherState;

pub mod compress;
pub use compress::Compress;

pub mod hmac;
pub use hmac::Hmac;

pub(crate) mod kex;
pub use kex::Kex;

pub mod key;
pub use key::Key;

/// The outcome of negociating every category of two `SSH_MSG_KEXINIT`
/// proposals: for each one, the client's first preference that the
/// server also supports.
#[derive(Debug, Clone)]
pub struct Proposal {
    /// The negociated key-exchange algorithm.
    pub kex: Kex,

    /// The negociated host key algorithm.
    pub key: Key,

    /// The negociated ciphers, `(client-to-server, server-to-client)`.
    pub ciphers: (Cipher, Cipher),

    /// The negociated MACs, `(client-to-server, server-to-client)`.
    pub hmacs: (Hmac, Hmac),

    /// The negociated compressions, `(client-to-server, server-to-client)`.
    pub compressions: (Compress, Compress),

    /// Whether both sides' first preferences for the kex and host key
    /// algorithms agreed, which validates a peer's guessed first
    /// kex packet.
    pub guessed_right: bool,
}

impl Proposal {
    /// Assemble the pending transport contexts from the negociated
    /// algorithms and freshly derived key chains.
    pub(crate) fn transport_pair(
        &self,
        client_keys: crate::stream::Keys,
        server_keys: crate::stream::Keys,
    ) -> crate::stream::TransportPair {
        crate::stream::TransportPair {
            rx: crate::stream::Transport {
                chain: server_keys,
                state: None,
                cipher: self.ciphers.1.clone(),
                hmac: self.hmacs.1.clone(),
                compress: self.compressions.1.clone(),
            },
            tx: crate::stream::Transport {
                chain: client_keys,
                state: None,
                cipher: self.ciphers.0.clone(),
                hmac: self.hmacs.0.clone(),
                compress: self.compressions.0.clone(),
            },
        }
    }
}

/// Negociate every algorithm category between the two proposals,
/// client preference first, as per
/// [RFC 4253 § 7.1](https://datatracker.ietf.org/doc/html/rfc4253#section-7.1).
///
/// Languages are not negociated, both sides being free to leave
/// them empty.
pub fn negociate(clientkex: &KexInit, serverkex: &KexInit) -> Result<Proposal> {
    let kex = kex::negociate(clientkex, serverkex)?;
    let key = key::negociate(clientkex, serverkex)?;

    let guessed_right = clientkex.kex_algorithms.first() == serverkex.kex_algorithms.first()
        && clientkex.server_host_key_algorithms.first()
            == serverkex.server_host_key_algorithms.first();

    Ok(Proposal {
        kex,
        key,
        ciphers: cipher::negociate(clientkex, serverkex)?,
        hmacs: hmac::negociate(clientkex, serverkex)?,
        compressions: compress::negociate(clientkex, serverkex)?,
        guessed_right,
    })
}
