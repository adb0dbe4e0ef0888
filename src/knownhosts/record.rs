//! A single `known_hosts` record, with either plain or hashed hosts.

use base64ct::{Base64, Encoding};
use hmac::Mac;
use rand::RngCore;
use sha1::Sha1;
use strum::EnumString;

/// Length of the salt and digest of hashed hosts, which is the
/// output size of the HMAC-SHA-1 they are built with.
const HASH_SIZE: usize = 20;

/// The key type of a record, from the leading name of its key blob.
#[derive(Debug, Clone, PartialEq, Eq, EnumString)]
pub enum KeyKind {
    /// An `ssh-rsa` key.
    #[strum(serialize = "ssh-rsa")]
    SshRsa,

    /// An `ssh-dss` key.
    #[strum(serialize = "ssh-dss")]
    SshDss,

    /// A key type this crate does not negociate, kept verbatim so the
    /// record round-trips through the repository untouched.
    #[strum(default)]
    Unknown(String),
}

impl KeyKind {
    /// The wire name of the key type.
    pub fn as_str(&self) -> &str {
        match self {
            Self::SshRsa => "ssh-rsa",
            Self::SshDss => "ssh-dss",
            Self::Unknown(name) => name,
        }
    }

    /// Extract the key type from the leading name of a key blob.
    pub fn from_blob(blob: &[u8]) -> Self {
        let name = crate::wire::Buffer::from(blob)
            .get_string()
            .ok()
            .and_then(|name| String::from_utf8(name).ok())
            .unwrap_or_default();

        match name.parse() {
            Ok(kind) => kind,
            Err(_) => Self::Unknown(name),
        }
    }
}

impl std::fmt::Display for KeyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The host part of a record: either a set of lowercased names, or a
/// salted HMAC-SHA-1 digest of a single name.
///
/// The two forms are exclusive by construction; a record never holds
/// both a readable host and its hash.
#[derive(Debug, Clone)]
enum Host {
    Plain(Vec<String>),
    Hashed { salt: Vec<u8>, digest: Vec<u8> },
}

/// One `known_hosts` record: a host specification, a key type and the
/// raw key blob, immutable once constructed.
#[derive(Debug, Clone)]
pub struct Record {
    host: Host,
    kind: KeyKind,
    key: Vec<u8>,
    comment: Option<String>,
}

impl Record {
    /// Create a record for a comma-separated list of plain hosts.
    pub fn plain(hosts: &str, kind: KeyKind, key: Vec<u8>) -> Self {
        Self {
            host: Host::Plain(
                hosts
                    .split(',')
                    .filter(|host| !host.is_empty())
                    .map(str::to_lowercase)
                    .collect(),
            ),
            kind,
            key,
            comment: None,
        }
    }

    /// Create a record hiding `host` behind a freshly salted
    /// HMAC-SHA-1 digest.
    pub fn hashed(host: &str, kind: KeyKind, key: Vec<u8>) -> Self {
        let mut salt = vec![0u8; HASH_SIZE];
        rand::thread_rng().fill_bytes(&mut salt);

        let digest = hmac::Hmac::<Sha1>::new_from_slice(&salt)
            .expect("Hmac accepts any key length")
            .chain_update(host.to_lowercase().as_bytes())
            .finalize()
            .into_bytes()
            .to_vec();

        Self {
            host: Host::Hashed { salt, digest },
            kind,
            key,
            comment: None,
        }
    }

    /// The key type of the record.
    pub fn kind(&self) -> &KeyKind {
        &self.kind
    }

    /// The raw key blob of the record.
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// Whether the record's hosts are hashed.
    pub fn is_hashed(&self) -> bool {
        matches!(self.host, Host::Hashed { .. })
    }

    /// Whether the record covers `host`; hashed hosts are matched by
    /// recomputing the digest, compared in constant time.
    pub fn matches_host(&self, host: &str) -> bool {
        let host = host.to_lowercase();

        match &self.host {
            Host::Plain(hosts) => hosts.iter().any(|entry| *entry == host),
            Host::Hashed { salt, digest } => hmac::Hmac::<Sha1>::new_from_slice(salt)
                .expect("Hmac accepts any key length")
                .chain_update(host.as_bytes())
                .verify_slice(digest)
                .is_ok(),
        }
    }

    /// Parse one line of the OpenSSH `known_hosts` format.
    pub(super) fn parse_line(line: &str) -> Option<Self> {
        let mut fields = line.split_whitespace();

        let hosts = fields.next()?;
        let kind = fields.next()?;
        let key = Base64::decode_vec(fields.next()?).ok()?;

        let comment = {
            let comment = fields.collect::<Vec<_>>().join(" ");

            (!comment.is_empty()).then_some(comment)
        };

        let host = match hosts.strip_prefix("|1|") {
            Some(hashed) => {
                let (salt, digest) = hashed.split_once('|')?;

                Host::Hashed {
                    salt: Base64::decode_vec(salt).ok()?,
                    digest: Base64::decode_vec(digest).ok()?,
                }
            }
            None => Host::Plain(
                hosts
                    .split(',')
                    .filter(|host| !host.is_empty())
                    .map(str::to_lowercase)
                    .collect(),
            ),
        };

        Some(Self {
            host,
            kind: match kind.parse() {
                Ok(kind) => kind,
                Err(_) => KeyKind::Unknown(kind.into()),
            },
            key,
            comment,
        })
    }

    /// Serialize the record back to one line of the OpenSSH
    /// `known_hosts` format.
    pub(super) fn to_line(&self) -> String {
        let hosts = match &self.host {
            Host::Plain(hosts) => hosts.join(","),
            Host::Hashed { salt, digest } => format!(
                "|1|{}|{}",
                Base64::encode_string(salt),
                Base64::encode_string(digest)
            ),
        };

        let mut line = format!("{hosts} {} {}", self.kind, Base64::encode_string(&self.key));

        if let Some(comment) = &self.comment {
            line.push(' ');
            line.push_str(comment);
        }

        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_records_match_any_of_their_hosts() {
        let record = Record::plain("Github.com,192.30.255.113", KeyKind::SshRsa, vec![1, 2, 3]);

        assert!(record.matches_host("github.com"));
        assert!(record.matches_host("GITHUB.COM"));
        assert!(record.matches_host("192.30.255.113"));
        assert!(!record.matches_host("gitlab.com"));
        assert!(!record.is_hashed());
    }

    #[test]
    fn hashed_records_match_only_the_hashed_host() {
        let record = Record::hashed("github.com", KeyKind::SshRsa, vec![1, 2, 3]);

        assert!(record.is_hashed());
        assert!(record.matches_host("github.com"));
        assert!(record.matches_host("GitHub.com"));
        assert!(!record.matches_host("github.com."));
        assert!(!record.matches_host("gitlab.com"));
    }

    #[test]
    fn two_hashes_of_one_host_use_distinct_salts() {
        let one = Record::hashed("github.com", KeyKind::SshRsa, vec![]).to_line();
        let two = Record::hashed("github.com", KeyKind::SshRsa, vec![]).to_line();

        assert_ne!(one, two);
    }

    #[test]
    fn lines_round_trip() {
        let line = "github.com,192.30.255.113 ssh-rsa AQID";
        assert_eq!(Record::parse_line(line).unwrap().to_line(), line);

        let line = Record::hashed("github.com", KeyKind::SshDss, vec![1, 2, 3]).to_line();
        let reparsed = Record::parse_line(&line).unwrap();

        assert!(line.starts_with("|1|"));
        assert!(reparsed.is_hashed());
        assert!(reparsed.matches_host("github.com"));
        assert_eq!(reparsed.to_line(), line);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        assert!(Record::parse_line("").is_none());
        assert!(Record::parse_line("host-only").is_none());
        assert!(Record::parse_line("host ssh-rsa not*base64").is_none());
    }

    #[test]
    fn the_kind_comes_from_the_blob_name() {
        let mut blob = crate::wire::Buffer::new();
        blob.put_string(b"ssh-rsa");
        blob.put_bytes(&[0; 16]);

        assert_eq!(KeyKind::from_blob(blob.as_slice()), KeyKind::SshRsa);
        assert_eq!(
            KeyKind::from_blob(&[0, 0, 0, 1, b'x']),
            KeyKind::Unknown("x".into())
        );
    }
}
