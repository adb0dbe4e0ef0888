#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use async_std::net::TcpStream;
use futures::io::BufReader;
use rstest::rstest;

use vngx::{
    knownhosts::FileKnownHosts,
    msg::trans::{DisconnectReason, ServiceAccept},
    session::client::{Algorithms, Client, StrictHostKeyChecking},
    Session,
};

mod common;

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init()
        .ok();
}

fn client_for(
    cipher: &str,
    mac: &str,
    kex: &str,
    known_hosts: Arc<FileKnownHosts>,
    strict: StrictHostKeyChecking,
) -> Client {
    Client {
        algorithms: Algorithms {
            kexs: vec![kex.parse().unwrap()],
            ciphers: vec![cipher.parse().unwrap()],
            macs: vec![mac.parse().unwrap()],
            ..Default::default()
        },
        strict_host_key_checking: strict,
        known_hosts: Some(known_hosts),
        ..Default::default()
    }
}

#[rstest]
#[case("aes128-ctr", "hmac-sha1", "diffie-hellman-group14-sha1")]
#[case("aes192-ctr", "hmac-sha2-256", "diffie-hellman-group14-sha1")]
#[case("aes256-ctr", "hmac-sha1-96", "diffie-hellman-group14-sha1")]
#[case("aes128-cbc", "hmac-md5", "diffie-hellman-group14-sha1")]
#[case("aes192-cbc", "hmac-sha1", "diffie-hellman-group14-sha1")]
#[case("aes256-cbc", "hmac-sha2-256", "diffie-hellman-group14-sha1")]
#[case("3des-cbc", "hmac-md5-96", "diffie-hellman-group14-sha1")]
#[case("blowfish-cbc", "hmac-sha1", "diffie-hellman-group14-sha1")]
#[case("arcfour", "hmac-sha1", "diffie-hellman-group14-sha1")]
#[case("arcfour128", "hmac-sha1", "diffie-hellman-group14-sha1")]
#[case("arcfour256", "hmac-sha2-256", "diffie-hellman-group14-sha1")]
#[case("aes128-ctr", "hmac-sha1", "diffie-hellman-group1-sha1")]
#[case("aes128-ctr", "hmac-sha1", "diffie-hellman-group-exchange-sha1")]
#[case("aes128-ctr", "hmac-sha1", "diffie-hellman-group-exchange-sha256")]
#[case("aes256-ctr", "hmac-sha2-256", "diffie-hellman-group-exchange-sha256")]
#[async_std::test]
async fn end_to_end(
    #[case] cipher: &'static str,
    #[case] mac: &'static str,
    #[case] kex: &'static str,
) -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let (addr, handle) = common::server(common::ServerConfig {
        kex,
        cipher,
        mac,
        rekey: false,
        key: common::host_key(),
    })
    .await?;

    tracing::info!("cipher::{cipher}, mac::{mac}, kex::{kex}, bound to {addr}");

    let known_hosts = Arc::new(FileKnownHosts::open(common::scratch_path("e2e"))?);

    let stream = BufReader::new(TcpStream::connect(addr).await?);
    let mut client = Session::new(
        stream,
        "127.0.0.1",
        client_for(cipher, mac, kex, known_hosts, StrictHostKeyChecking::No),
    )
    .await?;

    assert_eq!(client.peer_id().to_string(), "SSH-2.0-OpenSSH_8.9");

    client.request_service("ssh-userauth").await?;

    assert!(client.session_id().is_some());
    let (_, hash_algorithm) = client.kex_hash().unwrap();
    assert_eq!(
        hash_algorithm,
        if kex.ends_with("sha256") {
            "sha-256"
        } else {
            "sha-1"
        }
    );

    let _ = client
        .disconnect(DisconnectReason::ByApplication, "bbbb")
        .await;

    let disconnect = handle.await?;
    assert_eq!(disconnect.reason, DisconnectReason::ByApplication);

    Ok(())
}

#[async_std::test]
async fn rekey_preserves_the_session_id() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let (addr, handle) = common::server(common::ServerConfig {
        kex: "diffie-hellman-group14-sha1",
        cipher: "aes128-ctr",
        mac: "hmac-sha1",
        rekey: true,
        key: common::host_key(),
    })
    .await?;

    let known_hosts = Arc::new(FileKnownHosts::open(common::scratch_path("rekey"))?);

    let stream = BufReader::new(TcpStream::connect(addr).await?);
    let mut client = Session::new(
        stream,
        "127.0.0.1",
        client_for(
            "aes128-ctr",
            "hmac-sha1",
            "diffie-hellman-group14-sha1",
            known_hosts,
            StrictHostKeyChecking::No,
        ),
    )
    .await?;

    client.request_service("ssh-userauth").await?;

    let session_id = client.session_id().unwrap().to_vec();
    let first_hash = client.kex_hash().unwrap().0.to_vec();
    assert_eq!(session_id, first_hash);

    // The server re-keys before this marker; `recv` handles the
    // `SSH_MSG_KEXINIT` transparently and yields the marker.
    let marker: ServiceAccept = client.recv().await?.to()?;
    assert_eq!(marker.service_name, "rekeyed");

    let second_hash = client.kex_hash().unwrap().0.to_vec();
    assert_ne!(second_hash, first_hash);
    assert_eq!(client.session_id().unwrap(), &session_id[..]);

    let _ = client
        .disconnect(DisconnectReason::ByApplication, "done")
        .await;

    handle.await?;

    Ok(())
}
