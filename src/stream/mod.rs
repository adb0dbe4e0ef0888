//! Primitives to frame, protect and sequence _packets_ over a
//! [`Pipe`] stream.

use futures::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, FutureExt};
use futures_time::{future::FutureExt as _, time::Duration};

use crate::{
    msg::{IntoPacket, Packet},
    Error, Pipe, Result,
};

mod counter;
use counter::IoCounter;

mod transport;
pub use transport::{Transport, TransportPair};

mod keys;
pub use keys::Keys;

/// Largest tolerated `packet_length` before the session is
/// authenticated.
pub(crate) const PACKET_SIZE_LIMIT: usize = 0x40000;

/// Largest tolerated `packet_length` once the session is
/// authenticated.
pub(crate) const PACKET_SIZE_LIMIT_AUTHENTICATED: usize = 0x100000;

/// Re-key after 1GiB of exchanged data as recommended per the RFC.
const REKEY_BYTES_THRESHOLD: usize = 0x40000000;

/// A wrapper around a [`Pipe`] to interface with the SSH binary
/// packet protocol.
///
/// The [`Stream`] owns the directional sequence numbers, the current
/// transport contexts and the immutable session identifier; sequence
/// numbers wrap at `2^32` and are never reset, not even by a re-key.
pub struct Stream<S> {
    inner: IoCounter<S>,
    timeout: Duration,

    /// The pair of transport algorithms and keys computed from the key exchange.
    transport: TransportPair,

    /// The session identifier derived from the first key exchange.
    session: Option<Vec<u8>>,

    /// Largest tolerated `packet_length` for inbound packets.
    limit: usize,

    /// Sequence number for the `tx` side.
    txseq: u32,

    /// Sequence number for the `rx` side.
    rxseq: u32,

    /// A buffer for the `peek` method.
    buffer: Option<Packet>,
}

impl<S> Stream<S>
where
    S: Pipe,
{
    /// Wrap a [`Pipe`] into a [`Stream`], with no transforms installed.
    pub fn new(stream: S, timeout: std::time::Duration) -> Self {
        Self {
            inner: IoCounter::new(stream),
            timeout: timeout.into(),
            transport: Default::default(),
            session: None,
            limit: PACKET_SIZE_LIMIT,
            txseq: 0,
            rxseq: 0,
            buffer: None,
        }
    }

    /// Whether a key-exchange needs to happen, either because none
    /// completed yet or because enough traffic flowed to warrant a
    /// re-key.
    pub fn is_rekeyable(&self) -> bool {
        self.session.is_none() || self.inner.count() > REKEY_BYTES_THRESHOLD
    }

    /// Install freshly negociated transport contexts, which happens at
    /// the `SSH_MSG_NEWKEYS` boundary.
    pub fn with_transport(&mut self, transport: TransportPair) {
        self.transport = transport;
        self.inner.reset();
    }

    /// Record the session identifier on the very first key-exchange;
    /// subsequent calls keep the original untouched.
    pub fn with_session(&mut self, session: &[u8]) -> &[u8] {
        self.session.get_or_insert_with(|| session.to_vec())
    }

    /// The session identifier, fixed by the first key-exchange.
    pub fn session_id(&self) -> Option<&[u8]> {
        self.session.as_deref()
    }

    /// Raise the inbound packet size bound, once authenticated.
    pub fn with_limit(&mut self, limit: usize) {
        self.limit = limit;
    }

    #[cfg(test)]
    fn into_inner(self) -> S {
        self.inner.into_inner()
    }

    /// Wait for inbound data to become available.
    pub async fn fill_buf(&mut self) -> Result<()> {
        self.inner.fill_buf().await?;

        Ok(())
    }

    /// Poll the stream to detect whether data is immediately readable.
    pub async fn is_readable(&mut self) -> Result<bool> {
        futures::select_biased! {
            buf = self.inner.fill_buf().fuse() => {
                buf?;

                Ok(true)
            }
            _ = futures::future::ready(()).fuse() => {
                Ok(false)
            }
        }
    }

    /// Receive and decrypt a _packet_ from the peer without removing
    /// it from the queue.
    pub async fn peek(&mut self) -> Result<&Packet> {
        let packet = self.recv().await?;

        Ok(self.buffer.insert(packet))
    }

    /// Receive and decrypt a _packet_ from the peer.
    pub async fn recv(&mut self) -> Result<Packet> {
        match self.buffer.take() {
            Some(packet) => Ok(packet),
            None => {
                let timeout = self.timeout;
                let packet = self.read_packet().timeout(timeout).await??;

                tracing::trace!(
                    "<~- #{}: ^{:#x} ({} bytes)",
                    self.rxseq,
                    packet.payload.first().copied().unwrap_or_default(),
                    packet.payload.len(),
                );

                self.rxseq = self.rxseq.wrapping_add(1);

                Ok(packet)
            }
        }
    }

    /// Encrypt and send a _packet_ to the peer.
    pub async fn send(&mut self, packet: impl IntoPacket) -> Result<()> {
        let packet = packet.into_packet();

        tracing::trace!(
            "-~> #{}: ^{:#x} ({} bytes)",
            self.txseq,
            packet.payload.first().copied().unwrap_or_default(),
            packet.payload.len(),
        );

        let timeout = self.timeout;
        self.write_packet(packet.payload).timeout(timeout).await??;
        self.inner.flush().await?;

        self.txseq = self.txseq.wrapping_add(1);

        Ok(())
    }

    /// Read one packet off the wire: decrypt the first block to learn
    /// the length, decrypt the remainder, verify the MAC over
    /// `seq || cleartext`, strip the padding and decompress.
    async fn read_packet(&mut self) -> Result<Packet> {
        let block_size = self.transport.rx.block_size();

        let mut packet = vec![0u8; block_size];
        self.inner.read_exact(&mut packet).await?;
        self.transport.rx.decrypt(&mut packet)?;

        let packet_length =
            u32::from_be_bytes([packet[0], packet[1], packet[2], packet[3]]) as usize;

        if !(5..=self.limit).contains(&packet_length) {
            return Err(Error::Protocol("packet length out of bounds"));
        }
        if (4 + packet_length) % block_size != 0 {
            return Err(Error::Protocol("packet length not block-aligned"));
        }

        packet.resize(4 + packet_length, 0);
        self.inner.read_exact(&mut packet[block_size..]).await?;
        self.transport.rx.decrypt(&mut packet[block_size..])?;

        let mac_size = self.transport.rx.mac_size();
        if mac_size > 0 {
            let mut mac = vec![0u8; mac_size];
            self.inner.read_exact(&mut mac).await?;

            self.transport.rx.open(&packet, &mac, self.rxseq)?;
        }

        let padding_length = packet[4] as usize;
        if padding_length < 4 || padding_length > packet_length - 1 {
            return Err(Error::Protocol("illegal padding length"));
        }

        let payload = packet[5..4 + packet_length - padding_length].to_vec();
        let payload = self.transport.rx.decompress(payload)?;

        Ok(Packet { payload })
    }

    /// Write one packet onto the wire: compress, pad, MAC the
    /// cleartext under `seq || cleartext`, then encrypt.
    async fn write_packet(&mut self, payload: Vec<u8>) -> Result<()> {
        let payload = self.transport.tx.compress(payload)?;
        let padded = self.transport.tx.pad(payload)?;

        let mut packet = Vec::with_capacity(4 + padded.len());
        packet.extend_from_slice(&(padded.len() as u32).to_be_bytes());
        packet.extend_from_slice(&padded);

        let mac = self.transport.tx.seal(&packet, self.txseq);

        self.transport.tx.encrypt(&mut packet)?;
        packet.extend_from_slice(&mac);

        self.inner.write_all(&packet).await?;

        Ok(())
    }
}
