//! A session wrapping a `stream` to handle the **key-exchange**,
//! host verification and **[`SSH-TRANS`]** layer messages.
//!
//! [`SSH-TRANS`]: https://datatracker.ietf.org/doc/html/rfc4253

use either::Either;
use futures::{AsyncBufRead, AsyncWrite, AsyncWriteExt};
use futures_time::future::FutureExt;

use crate::{
    algorithm::{self, kex::KexOutput, Cipher, Hmac, Kex},
    error::{DisconnectedBy, DisconnectedError},
    knownhosts::{Check, KeyKind, Record},
    msg::{
        trans::{
            Debug, Disconnect, DisconnectReason, Ignore, KexInit, NewKeys, ServiceAccept,
            ServiceRequest, Unimplemented,
        },
        IntoPacket, Packet,
    },
    stream::{Stream, PACKET_SIZE_LIMIT_AUTHENTICATED},
    wire::Id,
    Error, Result,
};

pub mod client;
use client::{Client, StrictHostKeyChecking};

/// A trait alias for something _pipe-alike_, implementing
/// [`AsyncBufRead`] and [`AsyncWrite`].
pub trait Pipe: AsyncBufRead + AsyncWrite + Unpin + Send + Sync + 'static {}
impl<T: AsyncBufRead + AsyncWrite + Unpin + Send + Sync + 'static> Pipe for T {}

/// A client session to an SSH server, driving the transport state
/// machine: banner exchange at construction, then key-exchange,
/// host-key verification and re-keys transparently from
/// [`Session::recv`] and [`Session::send`].
pub struct Session<IO: Pipe> {
    stream: Either<Stream<IO>, DisconnectedError>,
    config: Client,
    host: String,

    peer_id: Id,

    /// The current exchange hash and kex algorithm, kept for the
    /// authentication layer's session binding.
    exchange: Option<(Vec<u8>, Kex)>,

    authenticated: bool,
}

impl<IO: Pipe> Session<IO> {
    /// Create a new [`Session`] from a [`Pipe`] stream by exchanging
    /// identification banners; `host` is the name the server will be
    /// checked under in the known-hosts repository.
    pub async fn new(mut stream: IO, host: impl Into<String>, config: Client) -> Result<Self> {
        config.id.to_async_writer(&mut stream).await?;
        stream.flush().await?;

        let timeout: futures_time::time::Duration = config.timeout.into();
        let peer_id = Id::from_async_reader(&mut stream)
            .timeout(timeout)
            .await??;

        let stream = Stream::new(stream, config.timeout);

        tracing::debug!("Session started with peer `{peer_id}`");

        Ok(Self {
            stream: Either::Left(stream),
            config,
            host: host.into(),
            peer_id,
            exchange: None,
            authenticated: false,
        })
    }

    /// Access the [`Id`] of the connected peer.
    pub fn peer_id(&self) -> &Id {
        &self.peer_id
    }

    /// The session identifier: the exchange hash of the very first
    /// key-exchange, unchanged by re-keys.
    pub fn session_id(&self) -> Option<&[u8]> {
        self.stream.as_ref().left().and_then(Stream::session_id)
    }

    /// The current exchange hash `H` and the name of the hash
    /// algorithm that produced it.
    pub fn kex_hash(&self) -> Option<(&[u8], &'static str)> {
        self.exchange
            .as_ref()
            .map(|(hash, kex)| (hash.as_slice(), kex.hash_algorithm()))
    }

    /// Record that user authentication succeeded, lifting the inbound
    /// packet-size bound and the prohibition of `none` algorithms.
    pub fn set_authenticated(&mut self) {
        self.authenticated = true;

        if let Either::Left(stream) = &mut self.stream {
            stream.with_limit(PACKET_SIZE_LIMIT_AUTHENTICATED);
        }
    }

    /// Waits until the [`Session`] becomes readable, mainly to be used
    /// with [`Session::recv`] in [`futures::select`], since the `recv`
    /// method is **not cancel-safe**.
    pub async fn readable(&mut self) -> Result<()> {
        match &mut self.stream {
            Either::Left(stream) => stream.fill_buf().await,
            Either::Right(err) => Err(err.clone().into()),
        }
    }

    /// Receive a _packet_ from the connected peer.
    ///
    /// Transport-layer messages (`SSH_MSG_KEXINIT`, `SSH_MSG_IGNORE`,
    /// `SSH_MSG_DEBUG`, `SSH_MSG_UNIMPLEMENTED`, `SSH_MSG_DISCONNECT`)
    /// are handled transparently and never surface here.
    ///
    /// # Cancel safety
    /// This method is **not cancel-safe**, if used within a
    /// [`futures::select`] call, some data may be partially received.
    pub async fn recv(&mut self) -> Result<Packet> {
        loop {
            let kexinit = {
                let stream = match &mut self.stream {
                    Either::Left(stream) => stream,
                    Either::Right(err) => return Err(err.clone().into()),
                };

                stream.is_rekeyable() || stream.peek().await?.to::<KexInit>().is_ok()
            };

            if kexinit {
                if let Err(err) = self.kex().await {
                    return Err(self.failed(err).await);
                }

                continue;
            }

            let stream = match &mut self.stream {
                Either::Left(stream) => stream,
                Either::Right(err) => return Err(err.clone().into()),
            };
            let packet = stream.recv().await?;

            if let Ok(Disconnect {
                reason,
                description,
                ..
            }) = packet.to()
            {
                tracing::warn!("Peer disconnected with `{reason:?}`: {description}");

                self.stream = Either::Right(DisconnectedError {
                    by: DisconnectedBy::Them,
                    reason,
                    description,
                });
            } else if let Ok(Ignore { data }) = packet.to() {
                tracing::debug!("Received an 'ignore' message with length {}", data.len());
            } else if let Ok(Unimplemented { seq }) = packet.to() {
                tracing::debug!("Received an 'unimplemented' message about packet #{seq}");
            } else if let Ok(Debug { message, .. }) = packet.to() {
                tracing::debug!("Received a 'debug' message: {message}");
            } else {
                break Ok(packet);
            }
        }
    }

    /// Send a _packet_ to the connected peer, running any pending
    /// key-exchange beforehand.
    pub async fn send(&mut self, packet: impl IntoPacket) -> Result<()> {
        let packet = packet.into_packet();

        let kexinit = {
            let stream = match &mut self.stream {
                Either::Left(stream) => stream,
                Either::Right(err) => return Err(err.clone().into()),
            };

            stream.is_rekeyable()
                || (stream.is_readable().await? && stream.peek().await?.to::<KexInit>().is_ok())
        };

        if kexinit {
            if let Err(err) = self.kex().await {
                return Err(self.failed(err).await);
            }
        }

        match &mut self.stream {
            Either::Left(stream) => stream.send(packet).await,
            Either::Right(err) => Err(err.clone().into()),
        }
    }

    /// Send a _disconnect message_ to the peer and shutdown the session.
    pub async fn disconnect(
        &mut self,
        reason: DisconnectReason,
        description: impl Into<String>,
    ) -> DisconnectedError {
        let stream = match &mut self.stream {
            Either::Left(stream) => stream,
            Either::Right(err) => return err.clone(),
        };

        let message = Disconnect {
            reason,
            description: description.into(),
            language: Default::default(),
        };
        if let Err(Error::Disconnected(err)) = stream.send(&message).await {
            return err;
        }

        let err = DisconnectedError {
            by: DisconnectedBy::Us,
            reason: message.reason,
            description: message.description,
        };
        self.stream = Either::Right(err.clone());

        err
    }

    /// Request a _service_ from the peer, as the authentication layer
    /// does with `ssh-userauth` once the transport is ready.
    pub async fn request_service(&mut self, service_name: &str) -> Result<()> {
        self.send(&ServiceRequest {
            service_name: service_name.into(),
        })
        .await?;

        let packet = self.recv().await?;
        match packet.to::<ServiceAccept>() {
            Ok(accept) if accept.service_name == service_name => Ok(()),
            _ => Err(self.failed(Error::UnexpectedMessage).await),
        }
    }

    /// Report `err` to the peer as a `SSH_MSG_DISCONNECT` with the
    /// matching reason code, then surface it to the caller.
    async fn failed(&mut self, err: Error) -> Error {
        match err {
            Error::Disconnected(err) => err.into(),
            err => {
                let _ = self
                    .disconnect(err.disconnect_reason(), err.to_string())
                    .await;

                err
            }
        }
    }

    /// Run a complete key-exchange: `SSH_MSG_KEXINIT` both ways,
    /// negociation, the kex algorithm proper, host verification and
    /// the `SSH_MSG_NEWKEYS` switch.
    async fn kex(&mut self) -> Result<()> {
        tracing::debug!("Starting key-exchange procedure");

        let stream = match &mut self.stream {
            Either::Left(stream) => stream,
            Either::Right(err) => return Err(err.clone().into()),
        };

        let kexinit = self.config.kexinit();
        let i_c = (&kexinit).into_packet();
        stream.send(i_c.clone()).await?;

        let peer_packet = stream.recv().await?;
        let peerkexinit = peer_packet.to::<KexInit>()?;
        let i_s = peer_packet.payload;

        let proposal = algorithm::negociate(&kexinit, &peerkexinit)?;

        if !self.authenticated
            && (proposal.ciphers.0 == Cipher::None
                || proposal.ciphers.1 == Cipher::None
                || proposal.hmacs.0 == Hmac::None
                || proposal.hmacs.1 == Hmac::None)
        {
            return Err(Error::NoneNotAllowed);
        }

        if peerkexinit.first_kex_packet_follows && !proposal.guessed_right {
            // The peer guessed our preferences wrong, its speculative
            // first kex packet is discarded.
            let _ = stream.recv().await?;
        }

        let output = proposal
            .kex
            .as_client(
                stream,
                &self.config.id,
                &self.peer_id,
                &i_c.payload,
                &i_s,
                &proposal,
            )
            .await?;

        Self::verify_host(&self.config, &self.host, &output)?;

        stream.send(&NewKeys).await?;
        stream.recv().await?.to::<NewKeys>()?;

        stream.with_transport(output.pair);

        tracing::debug!(
            "Key exchange success, negociated `{}` with `{}` host key",
            proposal.kex.as_ref(),
            proposal.key.as_ref(),
        );

        self.exchange = Some((output.hash, proposal.kex));

        Ok(())
    }

    /// Enforce the host-key policy over the known-hosts repository,
    /// per the `StrictHostKeyChecking` mode.
    fn verify_host(config: &Client, host: &str, output: &KexOutput) -> Result<()> {
        let repository = config.known_hosts.as_deref();
        let interaction = config.interaction.as_deref();

        let disposition = repository
            .map_or(Check::NotIncluded, |repository| {
                repository.check(host, &output.server_key_blob)
            });

        let algorithm = output.server_key.algorithm();
        let fingerprint = output.server_key.fingerprint(Default::default());
        let repository_id = repository
            .map(|repository| repository.repository_id())
            .unwrap_or_else(|| "<none>".into());

        let kind = match algorithm.as_str().parse::<KeyKind>() {
            Ok(kind) => kind,
            Err(_) => KeyKind::Unknown(algorithm.as_str().into()),
        };
        let record = || {
            if config.hash_known_hosts {
                Record::hashed(host, kind.clone(), output.server_key_blob.clone())
            } else {
                Record::plain(host, kind.clone(), output.server_key_blob.clone())
            }
        };

        match disposition {
            Check::Ok => Ok(()),

            Check::Changed => {
                let warning = format!(
                    "REMOTE HOST IDENTIFICATION HAS CHANGED for `{host}`! \
                     The {algorithm} key sent by the remote host has fingerprint {fingerprint}, \
                     which does not match the record in `{repository_id}`.",
                    algorithm = algorithm.as_str(),
                );
                tracing::warn!("{warning}");

                match interaction {
                    _ if config.strict_host_key_checking == StrictHostKeyChecking::Yes => {
                        Err(Error::HostKeyMismatch { host: host.into() })
                    }
                    Some(interaction)
                        if interaction.prompt_yes_no(&format!(
                            "{warning} Replace the old key and connect anyway?"
                        )) =>
                    {
                        if let Some(repository) = repository {
                            repository.remove(host, Some(&kind), None)?;

                            if let Err(err) = repository.add(record(), Some(interaction)) {
                                tracing::warn!("Unable to record the new host key: {err}");
                            }
                        }

                        Ok(())
                    }
                    _ => Err(Error::HostKeyMismatch { host: host.into() }),
                }
            }

            Check::NotIncluded => match config.strict_host_key_checking {
                StrictHostKeyChecking::Yes => Err(Error::HostKeyUnknown { host: host.into() }),

                StrictHostKeyChecking::No => {
                    if let Some(repository) = repository {
                        if let Err(err) = repository.add(record(), interaction) {
                            tracing::warn!("Unable to record the host key: {err}");
                        }
                    }

                    Ok(())
                }

                StrictHostKeyChecking::Ask => {
                    let prompt = format!(
                        "The authenticity of host `{host}` can't be established. \
                         Its {algorithm} key fingerprint is {fingerprint}. \
                         Are you sure you want to continue connecting?",
                        algorithm = algorithm.as_str(),
                    );

                    match interaction {
                        Some(interaction) if interaction.prompt_yes_no(&prompt) => {
                            if let Some(repository) = repository {
                                if let Err(err) = repository.add(record(), Some(interaction)) {
                                    tracing::warn!("Unable to record the host key: {err}");
                                }
                            }

                            Ok(())
                        }
                        Some(_) => Err(Error::Cancelled),
                        None => Err(Error::HostKeyUnknown { host: host.into() }),
                    }
                }
            },
        }
    }
}
