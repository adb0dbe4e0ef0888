//! The fixed-group `diffie-hellman-group1-sha1` and
//! `diffie-hellman-group14-sha1` key-exchanges.

use digest::{Digest, FixedOutputReset};
use secrecy::ExposeSecret;
use signature::Verifier;
use ssh_key::Signature;

use crate::{
    algorithm::{key::Key, Proposal},
    msg::kex::{KexDhInit, KexDhReply},
    stream::{Keys, Stream},
    wire::Id,
    Error, Pipe, Result,
};

use super::{
    dh::{Dh, Group},
    exchange::DhExchange,
    KexOutput,
};

pub(super) async fn as_client<H: Digest + FixedOutputReset>(
    stream: &mut Stream<impl Pipe>,
    group: Group,
    v_c: &Id,
    v_s: &Id,
    i_c: &[u8],
    i_s: &[u8],
    proposal: &Proposal,
) -> Result<KexOutput> {
    let (v_c, v_s) = (v_c.to_string(), v_s.to_string());

    let dh = Dh::generate(group);
    let e = dh.public();

    stream.send(&KexDhInit { e: e.clone() }).await?;

    let reply: KexDhReply = stream.recv().await?.to()?;

    let secret = dh.exchange(&reply.f)?;

    let server_key = ssh_key::PublicKey::from_bytes(&reply.k_s)?;
    if Key::from_algorithm(&server_key.algorithm()) != Some(proposal.key) {
        return Err(Error::KexError);
    }

    let hash = DhExchange {
        v_c: v_c.as_bytes(),
        v_s: v_s.as_bytes(),
        i_c,
        i_s,
        k_s: &reply.k_s,
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
