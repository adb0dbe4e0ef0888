//! Client-side session configuration, frozen at session construction.

use std::{sync::Arc, time::Duration};

use rand::RngCore;
use strum::EnumString;

use crate::{
    algorithm::{Cipher, Compress, Hmac, Kex, Key},
    interact::Interaction,
    knownhosts::KnownHosts,
    msg::trans::KexInit,
    wire::{Id, NameList},
};

/// A _client_-side session configuration.
#[derive(Clone)]
pub struct Client {
    /// [`Id`] for this _client_ session.
    pub id: Id,

    /// Timeout for sending and receiving packets.
    pub timeout: Duration,

    /// The algorithms enabled for this _client_ session.
    pub algorithms: Algorithms,

    /// The policy applied to host keys missing from or conflicting
    /// with the known-hosts repository.
    pub strict_host_key_checking: StrictHostKeyChecking,

    /// Whether newly recorded hosts are hashed in the repository.
    pub hash_known_hosts: bool,

    /// The known-hosts repository consulted on every key-exchange.
    pub known_hosts: Option<Arc<dyn KnownHosts>>,

    /// The handle prompted on host-key decisions, when present.
    pub interaction: Option<Arc<dyn Interaction>>,
}

impl Default for Client {
    fn default() -> Self {
        Self {
            id: Id::v2(
                concat!(env!("CARGO_PKG_NAME"), "_", env!("CARGO_PKG_VERSION")),
                None::<&str>,
            ),
            timeout: Duration::from_secs(120),
            algorithms: Default::default(),
            strict_host_key_checking: Default::default(),
            hash_known_hosts: false,
            known_hosts: None,
            interaction: None,
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("id", &self.id)
            .field("timeout", &self.timeout)
            .field("algorithms", &self.algorithms)
            .field("strict_host_key_checking", &self.strict_host_key_checking)
            .field("hash_known_hosts", &self.hash_known_hosts)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Generate a `SSH_MSG_KEXINIT` message from the config.
    pub(crate) fn kexinit(&self) -> KexInit {
        let mut cookie = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut cookie);

        KexInit {
            cookie,
            kex_algorithms: NameList::new(&self.algorithms.kexs),
            server_host_key_algorithms: NameList::new(&self.algorithms.keys),
            encryption_algorithms_client_to_server: NameList::new(&self.algorithms.ciphers),
            encryption_algorithms_server_to_client: NameList::new(&self.algorithms.ciphers),
            mac_algorithms_client_to_server: NameList::new(&self.algorithms.macs),
            mac_algorithms_server_to_client: NameList::new(&self.algorithms.macs),
            compression_algorithms_client_to_server: NameList::new(&self.algorithms.compressions),
            compression_algorithms_server_to_client: NameList::new(&self.algorithms.compressions),
            languages_client_to_server: Default::default(),
            languages_server_to_client: Default::default(),
            first_kex_packet_follows: false,
        }
    }
}

/// Algorithms for a _client_-side session, in preference order.
#[derive(Debug, Clone)]
pub struct Algorithms {
    /// Enabled algorithms for _key-exchange_.
    pub kexs: Vec<Kex>,

    /// Enabled algorithms for _server host key signature_.
    pub keys: Vec<Key>,

    /// Enabled algorithms for _encryption & decryption_.
    pub ciphers: Vec<Cipher>,

    /// Enabled algorithms for _hmac_.
    pub macs: Vec<Hmac>,

    /// Enabled algorithms for _compression_.
    pub compressions: Vec<Compress>,
}

impl Default for Algorithms {
    fn default() -> Self {
        Self {
            kexs: vec![
                Kex::DiffieHellmanGroupExchangeSha256,
                Kex::DiffieHellmanGroup14Sha1,
                Kex::DiffieHellmanGroupExchangeSha1,
                Kex::DiffieHellmanGroup1Sha1,
            ],
            keys: vec![Key::SshRsa, Key::SshDss],
            ciphers: vec![
                Cipher::Aes128Ctr,
                Cipher::Aes192Ctr,
                Cipher::Aes256Ctr,
                Cipher::Aes128Cbc,
                Cipher::Aes192Cbc,
                Cipher::Aes256Cbc,
                Cipher::TDesCbc,
                Cipher::BlowfishCbc,
                Cipher::Arcfour128,
                Cipher::Arcfour256,
                Cipher::Arcfour,
            ],
            macs: vec![
                Hmac::HmacSha256,
                Hmac::HmacSha1,
                Hmac::HmacSha196,
                Hmac::HmacMd5,
                Hmac::HmacMd596,
            ],
            compressions: vec![Compress::None, Compress::Zlib, Compress::ZlibOpenssh],
        }
    }
}

/// The host key checking policy, mirroring the `StrictHostKeyChecking`
/// option of usual clients.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum StrictHostKeyChecking {
    /// Never connect to a host missing from the repository, nor to one
    /// whose key changed.
    Yes,

    /// Prompt the user on unknown or changed keys; refuse without a
    /// user to ask.
    #[default]
    Ask,

    /// Record unknown hosts silently; changed keys still require an
    /// explicit go-ahead.
    No,
}
