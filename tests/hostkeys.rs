#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use async_std::net::TcpStream;
use futures::io::BufReader;

use vngx::{
    interact::Interaction,
    knownhosts::{Check, FileKnownHosts, KnownHosts},
    msg::trans::DisconnectReason,
    session::client::{Algorithms, Client, StrictHostKeyChecking},
    Error, Session,
};

mod common;

fn client_for(
    known_hosts: Arc<FileKnownHosts>,
    strict: StrictHostKeyChecking,
    interaction: Option<Arc<dyn Interaction>>,
    hash_known_hosts: bool,
) -> Client {
    Client {
        algorithms: Algorithms {
            kexs: vec!["diffie-hellman-group14-sha1".parse().unwrap()],
            ciphers: vec!["aes128-ctr".parse().unwrap()],
            macs: vec!["hmac-sha1".parse().unwrap()],
            ..Default::default()
        },
        strict_host_key_checking: strict,
        hash_known_hosts,
        known_hosts: Some(known_hosts),
        interaction,
        ..Default::default()
    }
}

fn config(key: ssh_key::PrivateKey) -> common::ServerConfig {
    common::ServerConfig {
        kex: "diffie-hellman-group14-sha1",
        cipher: "aes128-ctr",
        mac: "hmac-sha1",
        rekey: false,
        key,
    }
}

#[async_std::test]
async fn unknown_host_is_refused_under_strict_checking() -> Result<(), Box<dyn std::error::Error>>
{
    let (addr, handle) = common::server(config(common::host_key())).await?;

    let known_hosts = Arc::new(FileKnownHosts::open(common::scratch_path("unknown"))?);

    let stream = BufReader::new(TcpStream::connect(addr).await?);
    let mut client = Session::new(
        stream,
        "127.0.0.1",
        client_for(known_hosts, StrictHostKeyChecking::Yes, None, false),
    )
    .await?;

    let err = client.request_service("ssh-userauth").await.unwrap_err();
    assert!(matches!(err, Error::HostKeyUnknown { .. }));

    let disconnect = handle.await?;
    assert_eq!(disconnect.reason, DisconnectReason::HostKeyNotVerifiable);

    Ok(())
}

#[async_std::test]
async fn unknown_host_is_prompted_then_recorded_under_ask() -> Result<(), Box<dyn std::error::Error>>
{
    let key = common::host_key();
    let path = common::scratch_path("ask");

    let interaction = Arc::new(common::Approving::default());

    {
        let (addr, handle) = common::server(config(key.clone())).await?;

        let known_hosts = Arc::new(FileKnownHosts::open(&path)?);
        let stream = BufReader::new(TcpStream::connect(addr).await?);
        let mut client = Session::new(
            stream,
            "127.0.0.1",
            client_for(
                known_hosts,
                StrictHostKeyChecking::Ask,
                Some(interaction.clone()),
                false,
            ),
        )
        .await?;

        client.request_service("ssh-userauth").await?;
        let _ = client
            .disconnect(DisconnectReason::ByApplication, "done")
            .await;
        handle.await?;
    }

    let prompts = interaction.prompts.lock().unwrap().clone();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("authenticity"));
    assert!(prompts[0].contains("fingerprint"));

    // The assent recorded the key, a strict re-connect now succeeds.
    {
        let (addr, handle) = common::server(config(key)).await?;

        let known_hosts = Arc::new(FileKnownHosts::open(&path)?);
        let stream = BufReader::new(TcpStream::connect(addr).await?);
        let mut client = Session::new(
            stream,
            "127.0.0.1",
            client_for(known_hosts, StrictHostKeyChecking::Yes, None, false),
        )
        .await?;

        client.request_service("ssh-userauth").await?;
        let _ = client
            .disconnect(DisconnectReason::ByApplication, "done")
            .await;
        handle.await?;
    }

    std::fs::remove_file(path).ok();

    Ok(())
}

#[async_std::test]
async fn changed_host_key_is_refused() -> Result<(), Box<dyn std::error::Error>> {
    let path = common::scratch_path("changed");

    // First contact records the original key.
    {
        let (addr, handle) = common::server(config(common::host_key())).await?;

        let known_hosts = Arc::new(FileKnownHosts::open(&path)?);
        let stream = BufReader::new(TcpStream::connect(addr).await?);
        let mut client = Session::new(
            stream,
            "127.0.0.1",
            client_for(known_hosts, StrictHostKeyChecking::No, None, false),
        )
        .await?;

        client.request_service("ssh-userauth").await?;
        let _ = client
            .disconnect(DisconnectReason::ByApplication, "done")
            .await;
        handle.await?;
    }

    // The server now presents a different key.
    let (addr, handle) = common::server(config(common::host_key())).await?;

    let known_hosts = Arc::new(FileKnownHosts::open(&path)?);
    let stream = BufReader::new(TcpStream::connect(addr).await?);
    let mut client = Session::new(
        stream,
        "127.0.0.1",
        client_for(known_hosts, StrictHostKeyChecking::Yes, None, false),
    )
    .await?;

    let err = client.request_service("ssh-userauth").await.unwrap_err();
    assert!(matches!(err, Error::HostKeyMismatch { .. }));

    let disconnect = handle.await?;
    assert_eq!(disconnect.reason, DisconnectReason::HostKeyNotVerifiable);

    std::fs::remove_file(path).ok();

    Ok(())
}

#[async_std::test]
async fn hosts_can_be_recorded_hashed() -> Result<(), Box<dyn std::error::Error>> {
    let path = common::scratch_path("hashed");

    let (addr, handle) = common::server(config(common::host_key())).await?;

    let known_hosts = Arc::new(FileKnownHosts::open(&path)?);
    let stream = BufReader::new(TcpStream::connect(addr).await?);
    let mut client = Session::new(
        stream,
        "127.0.0.1",
        client_for(known_hosts, StrictHostKeyChecking::No, None, true),
    )
    .await?;

    client.request_service("ssh-userauth").await?;
    let _ = client
        .disconnect(DisconnectReason::ByApplication, "done")
        .await;
    handle.await?;

    let contents = std::fs::read_to_string(&path)?;
    assert!(contents.starts_with("|1|"));
    assert!(!contents.contains("127.0.0.1"));

    let reloaded = FileKnownHosts::open(&path)?;
    let records = reloaded.host_keys(Some("127.0.0.1"), None);
    assert_eq!(records.len(), 1);
    assert_eq!(
        reloaded.check("127.0.0.1", records[0].key()),
        Check::Ok
    );

    std::fs::remove_file(path).ok();

    Ok(())
}

#[async_std::test]
async fn the_none_cipher_is_refused_before_authentication(
) -> Result<(), Box<dyn std::error::Error>> {
    let (addr, _handle) = common::server(common::ServerConfig {
        kex: "diffie-hellman-group14-sha1",
        cipher: "none",
        mac: "hmac-sha1",
        rekey: false,
        key: common::host_key(),
    })
    .await?;

    let known_hosts = Arc::new(FileKnownHosts::open(common::scratch_path("none"))?);

    let stream = BufReader::new(TcpStream::connect(addr).await?);
    let mut client = Session::new(
        stream,
        "127.0.0.1",
        Client {
            algorithms: Algorithms {
                kexs: vec!["diffie-hellman-group14-sha1".parse().unwrap()],
                ciphers: vec!["none".parse().unwrap()],
                macs: vec!["hmac-sha1".parse().unwrap()],
                ..Default::default()
            },
            strict_host_key_checking: StrictHostKeyChecking::No,
            known_hosts: Some(known_hosts),
            ..Default::default()
        },
    )
    .await?;

    let err = client.request_service("ssh-userauth").await.unwrap_err();
    assert!(matches!(err, Error::NoneNotAllowed));

    Ok(())
}
