//! The `diffie-hellman-group-exchange-*` key-exchanges of
//! [RFC 4419](https://datatracker.ietf.org/doc/html/rfc4419), where the
//! group itself is negociated before the exchange proper.

use digest::{Digest, FixedOutputReset};
use secrecy::ExposeSecret;
use signature::Verifier;
use ssh_key::Signature;

use crate::{
    algorithm::{key::Key, Proposal},
    msg::kex::{GexGroup, GexInit, GexReply, GexRequest},
    stream::{Keys, Stream},
    wire::Id,
    Error, Pipe, Result,
};

use super::{
    dh::{Dh, Group},
    exchange::GexExchange,
    KexOutput,
};

/// Group size preferences sent in `SSH_MSG_KEX_DH_GEX_REQUEST`;
/// the RFC recommends requesting at least 2048-bit groups.
const MIN_BITS: u32 = 1024;
const PREFERRED_BITS: u32 = 2048;
const MAX_BITS: u32 = 8192;

pub(super) async fn as_client<H: Digest + FixedOutputReset>(
    stream: &mut Stream<impl Pipe>,
    v_c: &Id,
    v_s: &Id,
    i_c: &[u8],
    i_s: &[u8],
    proposal: &Proposal,
) -> Result<KexOutput> {
    let (v_c, v_s) = (v_c.to_string(), v_s.to_string());

    stream
        .send(&GexRequest {
            min: MIN_BITS,
            n: PREFERRED_BITS,
            max: MAX_BITS,
        })
        .await?;

    // `SSH_MSG_KEX_DH_GEX_GROUP` shares its number with
    // `SSH_MSG_KEXDH_REPLY`; after a GEX_REQUEST only the former
    // can be on the wire.
    let negociated_group: GexGroup = stream.recv().await?.to()?;

    let group = Group::from_mpints(&negociated_group.p, &negociated_group.g)?;
    if !(MIN_BITS as usize..=MAX_BITS as usize).contains(&group.bits()) {
        return Err(Error::KexError);
    }

    let dh = Dh::generate(group);
    let e = dh.public();

    stream.send(&GexInit { e: e.clone() }).await?;

    let reply: GexReply = stream.recv().await?.to()?;

    let secret = dh.exchange(&reply.f)?;

    let server_key = ssh_key::PublicKey::from_bytes(&reply.k_s)?;
    if Key::from_algorithm(&server_key.algorithm()) != Some(proposal.key) {
        return Err(Error::KexError);
    }

    let hash = GexExchange {
        v_c: v_c.as_bytes(),
        v_s: v_s.as_bytes(),
        i_c,
        i_s,
        k_s: &reply.k_s,
        min: MIN_BITS,
        n: PREFERRED_BITS,
        max: MAX_BITS,
        p: &negociated_group.p,
        g: &negociated_group.g,
        e: &e,
        f: &reply.f,
        k: secret.expose_secret(),
    }
    .hash::<H>();

    Verifier::verify(
        &server_key,
        &hash,
        &Signature::try_from(reply.signature.as_ref())?,
    )?;

    let session_id = stream.with_session(&hash);

    let (client_keys, server_keys) = (
        Keys::as_client::<H>(
            secret.expose_secret(),
            &hash,
            session_id,
            &proposal.ciphers.0,
            &proposal.hmacs.0,
        ),
        Keys::as_server::<H>(
            secret.expose_secret(),
            &hash,
            session_id,
            &proposal.ciphers.1,
            &proposal.hmacs.1,
        ),
    );

    Ok(KexOutput {
        pair: proposal.transport_pair(client_keys, server_keys),
        hash: hash.to_vec(),
        server_key,
        server_key_blob: reply.k_s,
    })
}
