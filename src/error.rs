//! Collection of error handling types and aliases.

use thiserror::Error;

use crate::msg::trans::DisconnectReason;

/// The disconnection side for [`DisconnectedError`].
#[derive(Debug, Clone)]
pub enum DisconnectedBy {
    /// The session has been disconnected by _us_.
    Us,

    /// The session has been disconnected by _them_.
    Them,
}

/// The error type describing disconnect.
#[must_use]
#[derive(Debug, Error, Clone)]
#[error("The session has been disconnected by {by:?} for {reason:?}: {description}")]
pub struct DisconnectedError {
    /// Side that sent the disconnect message.
    pub by: DisconnectedBy,

    /// Reason for disconnect.
    pub reason: DisconnectReason,

    /// Description of the disconnect reason.
    pub description: String,
}

/// The error types that can occur when manipulating this crate.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    /// I/O Error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A typed read overran the buffered packet.
    #[error("Attempted to read past the end of the packet")]
    TruncatedPacket,

    /// A wire value did not decode to its declared type.
    #[error("Malformed wire value: {0}")]
    InvalidFormat(&'static str),

    /// Framing violation, out-of-bounds length or padding.
    #[error("Protocol violation: {0}")]
    Protocol(&'static str),

    /// The message received was unexpected in the current context.
    #[error("Peer sent a message that made no sense in the current context")]
    UnexpectedMessage,

    /// SSH Key error.
    #[error(transparent)]
    Key(#[from] ssh_key::Error),

    /// Packet integrity error.
    #[error(transparent)]
    Integrity(#[from] digest::MacError),

    /// Signature error during the key-exchange.
    #[error(transparent)]
    Signature(#[from] signature::Error),

    /// No common kex algorithm found between both sides.
    #[error("Unable to negociate a common kex algorithm")]
    NoCommonKex,

    /// No common key algorithm found between both sides.
    #[error("Unable to negociate a common host key algorithm")]
    NoCommonKey,

    /// No common cipher algorithm found between both sides.
    #[error("Unable to negociate a common encryption algorithm")]
    NoCommonCipher,

    /// No common hmac algorithm found between both sides.
    #[error("Unable to negociate a common HMAC algorithm")]
    NoCommonHmac,

    /// No common compression algorithm found between both sides.
    #[error("Unable to negociate a common compression algorithm")]
    NoCommonCompression,

    /// The `none` cipher or MAC was selected on an unauthenticated session.
    #[error("The 'none' algorithm is not acceptable before authentication succeeded")]
    NoneNotAllowed,

    /// Protocol error in the key-exchange.
    #[error("Error in the kex-exchange algorithm")]
    KexError,

    /// Error while encrypting or decrypting messages.
    #[error("The cipher ended up in an error")]
    Cipher,

    /// The server host key differs from the one on record.
    #[error("Host key for `{host}` has changed")]
    HostKeyMismatch {
        /// Host whose key changed.
        host: String,
    },

    /// The server host key is not present in the repository.
    #[error("Host key for `{host}` is unknown")]
    HostKeyUnknown {
        /// Host whose key is unknown.
        host: String,
    },

    /// A prompt was declined, or no user interaction handle was available
    /// to answer it.
    #[error("The operation was cancelled at a user prompt")]
    Cancelled,

    /// The session has been disconnected.
    #[error(transparent)]
    Disconnected(#[from] DisconnectedError),
}

impl Error {
    /// The [`DisconnectReason`] to report to the peer before
    /// tearing down the session over this error.
    pub(crate) fn disconnect_reason(&self) -> DisconnectReason {
        match self {
            Self::TruncatedPacket
            | Self::InvalidFormat(_)
            | Self::Protocol(_)
            | Self::UnexpectedMessage => DisconnectReason::ProtocolError,

            Self::Integrity(_) => DisconnectReason::MacError,

            Self::NoCommonKex
            | Self::NoCommonKey
            | Self::NoCommonCipher
            | Self::NoCommonHmac
            | Self::NoCommonCompression
            | Self::NoneNotAllowed
            | Self::KexError
            | Self::Signature(_)
            | Self::Key(_) => DisconnectReason::KeyExchangeFailed,

            Self::HostKeyMismatch { .. } | Self::HostKeyUnknown { .. } => {
                DisconnectReason::HostKeyNotVerifiable
            }

            _ => DisconnectReason::ByApplication,
        }
    }
}

/// A handy [`std::result::Result`] type alias bounding the [`enum@Error`] struct as `E`.
pub type Result<T, E = Error> = std::result::Result<T, E>;
