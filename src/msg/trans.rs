//! Messages involved in the SSH's **transport** part of the protocol,
//! as defined in the [RFC 4253](https://datatracker.ietf.org/doc/html/rfc4253).

use crate::{
    wire::{Buffer, NameList},
    Result,
};

use super::Message;

/// The `SSH_MSG_DISCONNECT` message.
///
/// see <https://datatracker.ietf.org/doc/html/rfc4253#section-11.1>.
#[derive(Debug, Clone)]
pub struct Disconnect {
    /// SSH_MSG_DISCONNECT's _reason code_.
    pub reason: DisconnectReason,

    /// SSH_MSG_DISCONNECT's _description_.
    pub description: String,

    /// SSH_MSG_DISCONNECT's _language tag_.
    pub language: String,
}

impl Message for Disconnect {
    const NUMBER: u8 = 1;

    fn encode(&self, buffer: &mut Buffer) {
        buffer.put_u32(self.reason.into());
        buffer.put_string(self.description.as_bytes());
        buffer.put_string(self.language.as_bytes());
    }

    fn decode(buffer: &mut Buffer) -> Result<Self> {
        Ok(Self {
            reason: buffer.get_u32()?.into(),
            description: String::from_utf8_lossy(&buffer.get_string()?).into_owned(),
            language: String::from_utf8_lossy(&buffer.get_string()?).into_owned(),
        })
    }
}

/// The `reason` for disconnect in the `SSH_MSG_DISCONNECT` message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// `SSH_DISCONNECT_HOST_NOT_ALLOWED_TO_CONNECT`.
    HostNotAllowedToConnect,

    /// `SSH_DISCONNECT_PROTOCOL_ERROR`.
    ProtocolError,

    /// `SSH_DISCONNECT_KEY_EXCHANGE_FAILED`.
    KeyExchangeFailed,

    /// `SSH_DISCONNECT_RESERVED`.
    Reserved,

    /// `SSH_DISCONNECT_MAC_ERROR`.
    MacError,

    /// `SSH_DISCONNECT_COMPRESSION_ERROR`.
    CompressionError,

    /// `SSH_DISCONNECT_SERVICE_NOT_AVAILABLE`.
    ServiceNotAvailable,

    /// `SSH_DISCONNECT_PROTOCOL_VERSION_NOT_SUPPORTED`.
    ProtocolVersionNotSupported,

    /// `SSH_DISCONNECT_HOST_KEY_NOT_VERIFIABLE`.
    HostKeyNotVerifiable,

    /// `SSH_DISCONNECT_CONNECTION_LOST`.
    ConnectionLost,

    /// `SSH_DISCONNECT_BY_APPLICATION`.
    ByApplication,

    /// `SSH_DISCONNECT_TOO_MANY_CONNECTIONS`.
    TooManyConnections,

    /// `SSH_DISCONNECT_AUTH_CANCELLED_BY_USER`.
    AuthCancelledByUser,

    /// `SSH_DISCONNECT_NO_MORE_AUTH_METHODS_AVAILABLE`.
    NoMoreAuthMethodsAvailable,

    /// `SSH_DISCONNECT_ILLEGAL_USER_NAME`.
    IllegalUserName,

    /// Any other disconnect reason, may be non-standard.
    Other(u32),
}

impl From<DisconnectReason> for u32 {
    fn from(reason: DisconnectReason) -> Self {
        match reason {
            DisconnectReason::HostNotAllowedToConnect => 1,
            DisconnectReason::ProtocolError => 2,
            DisconnectReason::KeyExchangeFailed => 3,
            DisconnectReason::Reserved => 4,
            DisconnectReason::MacError => 5,
            DisconnectReason::CompressionError => 6,
            DisconnectReason::ServiceNotAvailable => 7,
            DisconnectReason::ProtocolVersionNotSupported => 8,
            DisconnectReason::HostKeyNotVerifiable => 9,
            DisconnectReason::ConnectionLost => 10,
            DisconnectReason::ByApplication => 11,
            DisconnectReason::TooManyConnections => 12,
            DisconnectReason::AuthCancelledByUser => 13,
            DisconnectReason::NoMoreAuthMethodsAvailable => 14,
            DisconnectReason::IllegalUserName => 15,
            DisconnectReason::Other(code) => code,
        }
    }
}

impl From<u32> for DisconnectReason {
    fn from(code: u32) -> Self {
        match code {
            1 => Self::HostNotAllowedToConnect,
            2 => Self::ProtocolError,
            3 => Self::KeyExchangeFailed,
            4 => Self::Reserved,
            5 => Self::MacError,
            6 => Self::CompressionError,
            7 => Self::ServiceNotAvailable,
            8 => Self::ProtocolVersionNotSupported,
            9 => Self::HostKeyNotVerifiable,
            10 => Self::ConnectionLost,
            11 => Self::ByApplication,
            12 => Self::TooManyConnections,
            13 => Self::AuthCancelledByUser,
            14 => Self::NoMoreAuthMethodsAvailable,
            15 => Self::IllegalUserName,
            code => Self::Other(code),
        }
    }
}

/// The `SSH_MSG_IGNORE` message.
///
/// see <https://datatracker.ietf.org/doc/html/rfc4253#section-11.2>.
#[derive(Debug, Clone)]
pub struct Ignore {
    /// SSH_MSG_IGNORE's _data_.
    pub data: Vec<u8>,
}

impl Message for Ignore {
    const NUMBER: u8 = 2;

    fn encode(&self, buffer: &mut Buffer) {
        buffer.put_string(&self.data);
    }

    fn decode(buffer: &mut Buffer) -> Result<Self> {
        Ok(Self {
            data: buffer.get_string()?,
        })
    }
}

/// The `SSH_MSG_UNIMPLEMENTED` message.
///
/// see <https://datatracker.ietf.org/doc/html/rfc4253#section-11.4>.
#[derive(Debug, Clone)]
pub struct Unimplemented {
    /// SSH_MSG_UNIMPLEMENTED's _packet sequence number of rejected message_.
    pub seq: u32,
}

impl Message for Unimplemented {
    const NUMBER: u8 = 3;

    fn encode(&self, buffer: &mut Buffer) {
        buffer.put_u32(self.seq);
    }

    fn decode(buffer: &mut Buffer) -> Result<Self> {
        Ok(Self {
            seq: buffer.get_u32()?,
        })
    }
}

/// The `SSH_MSG_DEBUG` message.
///
/// see <https://datatracker.ietf.org/doc/html/rfc4253#section-11.3>.
#[derive(Debug, Clone)]
pub struct Debug {
    /// SSH_MSG_DEBUG's _always_display_.
    pub always_display: bool,

    /// SSH_MSG_DEBUG's _message_.
    pub message: String,

    /// SSH_MSG_DEBUG's _language tag_.
    pub language: String,
}

impl Message for Debug {
    const NUMBER: u8 = 4;

    fn encode(&self, buffer: &mut Buffer) {
        buffer.put_bool(self.always_display);
        buffer.put_string(self.message.as_bytes());
        buffer.put_string(self.language.as_bytes());
    }

    fn decode(buffer: &mut Buffer) -> Result<Self> {
        Ok(Self {
            always_display: buffer.get_bool()?,
            message: String::from_utf8_lossy(&buffer.get_string()?).into_owned(),
            language: String::from_utf8_lossy(&buffer.get_string()?).into_owned(),
        })
    }
}

/// The `SSH_MSG_SERVICE_REQUEST` message.
///
/// see <https://datatracker.ietf.org/doc/html/rfc4253#section-10>.
#[derive(Debug, Clone)]
pub struct ServiceRequest {
    /// SSH_MSG_SERVICE_REQUEST's _service name_.
    pub service_name: String,
}

impl Message for ServiceRequest {
    const NUMBER: u8 = 5;

    fn encode(&self, buffer: &mut Buffer) {
        buffer.put_string(self.service_name.as_bytes());
    }

    fn decode(buffer: &mut Buffer) -> Result<Self> {
        Ok(Self {
            service_name: String::from_utf8_lossy(&buffer.get_string()?).into_owned(),
        })
    }
}

/// The `SSH_MSG_SERVICE_ACCEPT` message.
///
/// see <https://datatracker.ietf.org/doc/html/rfc4253#section-10>.
#[derive(Debug, Clone)]
pub struct ServiceAccept {
    /// SSH_MSG_SERVICE_ACCEPT's _service name_.
    pub service_name: String,
}

impl Message for ServiceAccept {
    const NUMBER: u8 = 6;

    fn encode(&self, buffer: &mut Buffer) {
        buffer.put_string(self.service_name.as_bytes());
    }

    fn decode(buffer: &mut Buffer) -> Result<Self> {
        Ok(Self {
            service_name: String::from_utf8_lossy(&buffer.get_string()?).into_owned(),
        })
    }
}

/// The `SSH_MSG_KEXINIT` message.
///
/// see <https://datatracker.ietf.org/doc/html/rfc4253#section-7.1>.
#[derive(Debug, Clone)]
pub struct KexInit {
    /// SSH_MSG_KEXINIT's _cookie_.
    pub cookie: [u8; 16],

    /// SSH_MSG_KEXINIT's _kex_algorithms_.
    pub kex_algorithms: NameList,

    /// SSH_MSG_KEXINIT's _server_host_key_algorithms_.
    pub server_host_key_algorithms: NameList,

    /// SSH_MSG_KEXINIT's _encryption_algorithms_client_to_server_.
    pub encryption_algorithms_client_to_server: NameList,

    /// SSH_MSG_KEXINIT's _encryption_algorithms_server_to_client_.
    pub encryption_algorithms_server_to_client: NameList,

    /// SSH_MSG_KEXINIT's _mac_algorithms_client_to_server_.
    pub mac_algorithms_client_to_server: NameList,

    /// SSH_MSG_KEXINIT's _mac_algorithms_server_to_client_.
    pub mac_algorithms_server_to_client: NameList,

    /// SSH_MSG_KEXINIT's _compression_algorithms_client_to_server_.
    pub compression_algorithms_client_to_server: NameList,

    /// SSH_MSG_KEXINIT's _compression_algorithms_server_to_client_.
    pub compression_algorithms_server_to_client: NameList,

    /// SSH_MSG_KEXINIT's _languages_client_to_server_.
    pub languages_client_to_server: NameList,

    /// SSH_MSG_KEXINIT's _languages_server_to_client_.
    pub languages_server_to_client: NameList,

    /// SSH_MSG_KEXINIT's _first_kex_packet_follows_.
    pub first_kex_packet_follows: bool,
}

impl Message for KexInit {
    const NUMBER: u8 = 20;

    fn encode(&self, buffer: &mut Buffer) {
        buffer.put_bytes(&self.cookie);
        buffer.put_name_list(&self.kex_algorithms);
        buffer.put_name_list(&self.server_host_key_algorithms);
        buffer.put_name_list(&self.encryption_algorithms_client_to_server);
        buffer.put_name_list(&self.encryption_algorithms_server_to_client);
        buffer.put_name_list(&self.mac_algorithms_client_to_server);
        buffer.put_name_list(&self.mac_algorithms_server_to_client);
        buffer.put_name_list(&self.compression_algorithms_client_to_server);
        buffer.put_name_list(&self.compression_algorithms_server_to_client);
        buffer.put_name_list(&self.languages_client_to_server);
        buffer.put_name_list(&self.languages_server_to_client);
        buffer.put_bool(self.first_kex_packet_follows);
        buffer.put_u32(0); // reserved
    }

    fn decode(buffer: &mut Buffer) -> Result<Self> {
        let message = Self {
            cookie: buffer.get_array()?,
            kex_algorithms: buffer.get_name_list()?,
            server_host_key_algorithms: buffer.get_name_list()?,
            encryption_algorithms_client_to_server: buffer.get_name_list()?,
            encryption_algorithms_server_to_client: buffer.get_name_list()?,
            mac_algorithms_client_to_server: buffer.get_name_list()?,
            mac_algorithms_server_to_client: buffer.get_name_list()?,
            compression_algorithms_client_to_server: buffer.get_name_list()?,
            compression_algorithms_server_to_client: buffer.get_name_list()?,
            languages_client_to_server: buffer.get_name_list()?,
            languages_server_to_client: buffer.get_name_list()?,
            first_kex_packet_follows: buffer.get_bool()?,
        };
        let _ = buffer.get_u32()?; // reserved

        Ok(message)
    }
}

/// The `SSH_MSG_NEWKEYS` message.
///
/// see <https://datatracker.ietf.org/doc/html/rfc4253#section-7.3>.
#[derive(Debug, Clone)]
pub struct NewKeys;

impl Message for NewKeys {
    const NUMBER: u8 = 21;

    fn encode(&self, _buffer: &mut Buffer) {}

    fn decode(_buffer: &mut Buffer) -> Result<Self> {
        Ok(Self)
    }
}
