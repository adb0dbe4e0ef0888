//! The identification string exchanged before any packet, as defined in
//! [RFC 4253 § 4.2](https://datatracker.ietf.org/doc/html/rfc4253#section-4.2).

use futures::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::{Error, Result};

/// Maximum length of the identification string, `\r\n` included.
const MAX_ID_LEN: usize = 255;

/// The SSH identification banner, e.g. `SSH-2.0-vngx_0.10.0`.
///
/// The stored form excludes the trailing `CR LF`, which is also the
/// form bound into the key-exchange hash as `V_C`/`V_S`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Id {
    protoversion: String,
    softwareversion: String,
    comments: Option<String>,
}

impl Id {
    /// Create an [`Id`] for protocol version `2.0`.
    pub fn v2(softwareversion: impl Into<String>, comments: Option<impl Into<String>>) -> Self {
        Self {
            protoversion: "2.0".into(),
            softwareversion: softwareversion.into(),
            comments: comments.map(Into::into),
        }
    }

    /// The `protoversion` part of the banner.
    pub fn protoversion(&self) -> &str {
        &self.protoversion
    }

    /// The `softwareversion` part of the banner.
    pub fn softwareversion(&self) -> &str {
        &self.softwareversion
    }

    /// Read an [`Id`] from the stream, skipping any pre-banner lines
    /// the server may emit before its identification string.
    pub async fn from_async_reader(reader: &mut (impl AsyncBufRead + Unpin)) -> Result<Self> {
        let mut line = String::new();

        loop {
            line.clear();

            if reader.read_line(&mut line).await? == 0 {
                return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
            }

            if line.starts_with("SSH-") {
                if line.len() > MAX_ID_LEN {
                    return Err(Error::Protocol("identification string too long"));
                }

                return line.parse();
            }

            tracing::debug!("Skipped pre-banner line: {:?}", line.trim_end());
        }
    }

    /// Write the [`Id`] to the stream, `CR LF` terminated.
    pub async fn to_async_writer(&self, writer: &mut (impl AsyncWrite + Unpin)) -> Result<()> {
        writer
            .write_all(format!("{self}\r\n").as_bytes())
            .await
            .map_err(Into::into)
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SSH-{}-{}", self.protoversion, self.softwareversion)?;

        if let Some(comments) = &self.comments {
            write!(f, " {comments}")?;
        }

        Ok(())
    }
}

impl std::str::FromStr for Id {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim_end_matches(['\r', '\n']);

        let rest = line
            .strip_prefix("SSH-")
            .ok_or(Error::Protocol("identification string misses `SSH-`"))?;

        let (protoversion, rest) = rest
            .split_once('-')
            .ok_or(Error::Protocol("identification string misses a version"))?;

        let (softwareversion, comments) = match rest.split_once(' ') {
            Some((softwareversion, comments)) => (softwareversion, Some(comments)),
            None => (rest, None),
        };

        if softwareversion.is_empty() {
            return Err(Error::Protocol("identification string misses a software"));
        }

        Ok(Self {
            protoversion: protoversion.into(),
            softwareversion: softwareversion.into(),
            comments: comments.map(Into::into),
        })
    }
}
