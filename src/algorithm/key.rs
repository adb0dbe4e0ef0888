//! SSH **host key** algorithms.

use strum::{AsRefStr, EnumString};

use crate::{msg::trans::KexInit, Error, Result};

pub(crate) fn negociate(clientkex: &KexInit, serverkex: &KexInit) -> Result<Key> {
    clientkex
        .server_host_key_algorithms
        .preferred_in(&serverkex.server_host_key_algorithms)
        .ok_or(Error::NoCommonKey)?
        .parse()
        .map_err(|_| Error::NoCommonKey)
}

/// SSH host key algorithms.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr)]
pub enum Key {
    /// RSA signatures with SHA-1, under the `ssh-rsa` blob format.
    #[strum(serialize = "ssh-rsa")]
    SshRsa,

    /// DSA signatures, under the `ssh-dss` blob format.
    #[strum(serialize = "ssh-dss")]
    SshDss,
}

impl Key {
    /// The variant matching a decoded host key, if any.
    pub(crate) fn from_algorithm(algorithm: &ssh_key::Algorithm) -> Option<Self> {
        match algorithm {
            ssh_key::Algorithm::Rsa { .. } => Some(Self::SshRsa),
            ssh_key::Algorithm::Dsa => Some(Self::SshDss),
            _ => None,
        }
    }
}
