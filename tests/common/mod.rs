//! An in-process scripted SSH server, speaking just enough of the
//! protocol to exercise the client's transport state machine.

use std::{net::SocketAddr, path::PathBuf, sync::Mutex, time::Duration};

use async_std::{net::TcpListener, stream::StreamExt, task::JoinHandle};
use digest::{Digest, FixedOutputReset};
use futures::io::BufReader;
use num_bigint_dig::{BigUint, RandBigInt};
use rsa::pkcs1v15::SigningKey;
use sha1::Sha1;
use sha2::{Sha256, Sha512};
use signature::Signer;

use vngx::{
    algorithm::{Cipher, Compress, Hmac},
    interact::Interaction,
    msg::{
        kex::{GexGroup, GexInit, GexReply, GexRequest, KexDhInit, KexDhReply},
        trans::{Disconnect, KexInit, NewKeys, ServiceAccept, ServiceRequest},
        IntoPacket, Message, Packet,
    },
    stream::{Keys, Stream, Transport, TransportPair},
    wire::{Buffer, Id, MpInt, NameList},
    Result,
};

const GROUP1_P: &[u8] = b"\
FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD129024E088A67CC74\
020BBEA63B139B22514A08798E3404DDEF9519B3CD3A431B302B0A6DF25F1437\
4FE1356D6D51C245E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED\
EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE65381FFFFFFFFFFFFFFFF";

const GROUP14_P: &[u8] = b"\
FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD129024E088A67CC74\
020BBEA63B139B22514A08798E3404DDEF9519B3CD3A431B302B0A6DF25F1437\
4FE1356D6D51C245E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED\
EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE45B3DC2007CB8A163BF05\
98DA48361C55D39A69163FA8FD24CF5F83655D23DCA3AD961C62F356208552BB\
9ED529077096966D670C354E4ABC9804F1746C08CA18217C32905E462E36CE3B\
E39E772C180E86039B2783A2EC07A28FB5C55DF06F4C52C9DE2BCBF695581718\
3995497CEA956AE515D2261898FA051015728E5A8AACAA68FFFFFFFFFFFFFFFF";

/// What the scripted server should negociate and do.
pub struct ServerConfig {
    pub kex: &'static str,
    pub cipher: &'static str,
    pub mac: &'static str,

    /// Initiate a re-key right after accepting the first service
    /// request, then send a `rekeyed` marker.
    pub rekey: bool,

    pub key: ssh_key::PrivateKey,
}

/// Generate a fresh RSA host key.
pub fn host_key() -> ssh_key::PrivateKey {
    let keypair = ssh_key::private::RsaKeypair::random(&mut rand::thread_rng(), 2048)
        .expect("RSA generation");

    ssh_key::PrivateKey::new(ssh_key::private::KeypairData::Rsa(keypair), "host")
        .expect("host key")
}

/// A scratch path under the system temporary directory.
pub fn scratch_path(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!("vngx-test-{tag}-{}", rand::random::<u64>()))
}

/// An [`Interaction`] handle answering yes to everything, recording
/// the prompts it was shown.
#[derive(Default)]
pub struct Approving {
    pub prompts: Mutex<Vec<String>>,
}

impl Interaction for Approving {
    fn prompt_yes_no(&self, message: &str) -> bool {
        self.prompts.lock().unwrap().push(message.into());

        true
    }

    fn show_message(&self, _message: &str) {}

    fn get_password(&self, _prompt: &str) -> Option<secrecy::SecretString> {
        None
    }

    fn get_passphrase(&self, _prompt: &str) -> Option<secrecy::SecretString> {
        None
    }
}

/// Spawn the scripted server; the returned handle resolves with the
/// `SSH_MSG_DISCONNECT` that ended the conversation.
pub async fn server(config: ServerConfig) -> Result<(SocketAddr, JoinHandle<Result<Disconnect>>)> {
    let socket = TcpListener::bind(("127.0.0.1", 0)).await?;
    let addr = socket.local_addr()?;

    let handle = async_std::task::spawn(async move {
        let stream = socket.incoming().next().await.expect("one connection")?;
        let mut stream = BufReader::new(stream);

        let server_id = Id::v2("OpenSSH_8.9", None::<&str>);
        server_id.to_async_writer(&mut stream).await?;

        let client_id = Id::from_async_reader(&mut stream).await?;
        assert!(client_id.to_string().starts_with("SSH-2.0-"));

        let mut stream = Stream::new(stream, Duration::from_secs(5));

        if let Some(disconnect) = kex(&mut stream, &config, &client_id, &server_id, None).await? {
            return Ok(disconnect);
        }

        loop {
            let packet = stream.recv().await?;

            match packet.message_number() {
                Some(ServiceRequest::NUMBER) => {
                    let request: ServiceRequest = packet.to()?;

                    stream
                        .send(&ServiceAccept {
                            service_name: request.service_name,
                        })
                        .await?;

                    if config.rekey {
                        if let Some(disconnect) =
                            kex(&mut stream, &config, &client_id, &server_id, None).await?
                        {
                            return Ok(disconnect);
                        }

                        stream
                            .send(&ServiceAccept {
                                service_name: "rekeyed".into(),
                            })
                            .await?;
                    }
                }
                Some(Disconnect::NUMBER) => return packet.to(),
                Some(KexInit::NUMBER) => {
                    // Client-initiated re-key.
                    if let Some(disconnect) =
                        kex(&mut stream, &config, &client_id, &server_id, Some(packet)).await?
                    {
                        return Ok(disconnect);
                    }
                }
                _ => continue,
            }
        }
    });

    Ok((addr, handle))
}

/// Run the server side of one complete key-exchange; returns the
/// disconnect message if the client aborted instead of `NEWKEYS`-ing.
async fn kex<S: vngx::Pipe>(
    stream: &mut Stream<S>,
    config: &ServerConfig,
    client_id: &Id,
    server_id: &Id,
    received: Option<Packet>,
) -> Result<Option<Disconnect>> {
    let serverkex = KexInit {
        cookie: rand::random(),
        kex_algorithms: NameList::new([config.kex]),
        server_host_key_algorithms: NameList::new(["ssh-rsa"]),
        encryption_algorithms_client_to_server: NameList::new([config.cipher]),
        encryption_algorithms_server_to_client: NameList::new([config.cipher]),
        mac_algorithms_client_to_server: NameList::new([config.mac]),
        mac_algorithms_server_to_client: NameList::new([config.mac]),
        compression_algorithms_client_to_server: NameList::new(["none"]),
        compression_algorithms_server_to_client: NameList::new(["none"]),
        languages_client_to_server: NameList::default(),
        languages_server_to_client: NameList::default(),
        first_kex_packet_follows: false,
    };
    let i_s = (&serverkex).into_packet();
    stream.send(i_s.clone()).await?;

    let client_packet = match received {
        Some(packet) => packet,
        None => stream.recv().await?,
    };
    client_packet.to::<KexInit>()?;
    let i_c = client_packet.payload;

    let cipher: Cipher = config.cipher.parse().expect("cipher name");
    let hmac: Hmac = config.mac.parse().expect("mac name");

    let (v_c, v_s) = (client_id.to_string(), server_id.to_string());

    let pair = match config.kex {
        "diffie-hellman-group14-sha1" => {
            fixed::<Sha1, _>(stream, GROUP14_P, config, &v_c, &v_s, &i_c, &i_s.payload, &cipher, &hmac).await?
        }
        "diffie-hellman-group1-sha1" => {
            fixed::<Sha1, _>(stream, GROUP1_P, config, &v_c, &v_s, &i_c, &i_s.payload, &cipher, &hmac).await?
        }
        "diffie-hellman-group-exchange-sha256" => {
            gex::<Sha256, _>(stream, config, &v_c, &v_s, &i_c, &i_s.payload, &cipher, &hmac).await?
        }
        "diffie-hellman-group-exchange-sha1" => {
            gex::<Sha1, _>(stream, config, &v_c, &v_s, &i_c, &i_s.payload, &cipher, &hmac).await?
        }
        other => panic!("the scripted server does not speak {other}"),
    };

    stream.send(&NewKeys).await?;

    let packet = stream.recv().await?;
    if let Ok(disconnect) = packet.to::<Disconnect>() {
        return Ok(Some(disconnect));
    }
    packet.to::<NewKeys>()?;

    stream.with_transport(pair);

    Ok(None)
}

struct Agreed {
    f: MpInt,
    k: MpInt,
    k_s: Vec<u8>,
}

/// The server half of the Diffie-Hellman arithmetic over `(p, 2)`.
fn agree(p_hex: &[u8], e: &MpInt, key: &ssh_key::PrivateKey) -> Agreed {
    let p = BigUint::parse_bytes(p_hex, 16).expect("group constant");
    let g = BigUint::from(2u8);

    let e = BigUint::from_bytes_be(e.as_bytes());

    let y = rand::thread_rng().gen_biguint_range(&BigUint::from(2u8), &(&p - 1u8));
    let f = g.modpow(&y, &p);
    let k = e.modpow(&y, &p);

    Agreed {
        f: MpInt::positive(&f.to_bytes_be()),
        k: MpInt::positive(&k.to_bytes_be()),
        k_s: key.public_key().to_bytes().expect("host key blob"),
    }
}

/// Sign the exchange hash, encoding the signature as its wire blob.
fn sign(key: &ssh_key::PrivateKey, hash: &[u8]) -> Vec<u8> {
    let signature: ssh_key::Signature = match key.key_data() {
        // ssh-key 0.6.7's `TryFrom<&RsaKeypair> for rsa::RsaPrivateKey`
        // builds the key from `p` twice instead of `p` and `q`, which
        // makes every RSA signature produced through its `Signer` impl
        // invalid. Rebuild the `rsa` crate's key from the correct prime
        // factors and sign with it directly instead.
        ssh_key::private::KeypairData::Rsa(keypair) => sign_rsa(keypair, hash),
        _ => Signer::sign(key, hash),
    };

    let mut blob = Buffer::new();
    blob.put_string(signature.algorithm().as_str().as_bytes());
    blob.put_string(signature.as_bytes());

    blob.into_vec()
}

fn sign_rsa(keypair: &ssh_key::private::RsaKeypair, message: &[u8]) -> ssh_key::Signature {
    let n = BigUint::from_bytes_be(keypair.public.n.as_bytes());
    let e = BigUint::from_bytes_be(keypair.public.e.as_bytes());
    let d = BigUint::from_bytes_be(keypair.private.d.as_bytes());
    let p = BigUint::from_bytes_be(keypair.private.p.as_bytes());
    let q = BigUint::from_bytes_be(keypair.private.q.as_bytes());

    let private_key = rsa::RsaPrivateKey::from_components(n, e, d, vec![p, q])
        .expect("well-formed RSA key components");

    let data = SigningKey::<Sha512>::new(private_key)
        .try_sign(message)
        .expect("RSA signing")
        .to_vec();

    ssh_key::Signature::new(
        ssh_key::Algorithm::Rsa {
            hash: Some(ssh_key::HashAlg::Sha512),
        },
        data,
    )
    .expect("well-formed signature")
}

fn keys<D: Digest + FixedOutputReset, S: vngx::Pipe>(
    stream: &mut Stream<S>,
    agreed: &Agreed,
    hash: &[u8],
    cipher: &Cipher,
    hmac: &Hmac,
) -> TransportPair {
    let session_id = stream.with_session(hash).to_vec();

    TransportPair {
        rx: Transport {
            chain: Keys::as_client::<D>(&agreed.k, hash, &session_id, cipher, hmac),
            state: None,
            cipher: cipher.clone(),
            hmac: hmac.clone(),
            compress: Compress::None,
        },
        tx: Transport {
            chain: Keys::as_server::<D>(&agreed.k, hash, &session_id, cipher, hmac),
            state: None,
            cipher: cipher.clone(),
            hmac: hmac.clone(),
            compress: Compress::None,
        },
    }
}

#[allow(clippy::too_many_arguments)]
async fn fixed<D: Digest + FixedOutputReset, S: vngx::Pipe>(
    stream: &mut Stream<S>,
    p_hex: &[u8],
    config: &ServerConfig,
    v_c: &str,
    v_s: &str,
    i_c: &[u8],
    i_s: &[u8],
    cipher: &Cipher,
    hmac: &Hmac,
) -> Result<TransportPair> {
    let init: KexDhInit = stream.recv().await?.to()?;

    let agreed = agree(p_hex, &init.e, &config.key);

    let mut preimage = Buffer::new();
    preimage.put_string(v_c.as_bytes());
    preimage.put_string(v_s.as_bytes());
    preimage.put_string(i_c);
    preimage.put_string(i_s);
    preimage.put_string(&agreed.k_s);
    preimage.put_mpint(&init.e);
    preimage.put_mpint(&agreed.f);
    preimage.put_mpint(&agreed.k);
    let hash = D::digest(preimage.as_slice()).to_vec();

    stream
        .send(&KexDhReply {
            k_s: agreed.k_s.clone(),
            f: agreed.f.clone(),
            signature: sign(&config.key, &hash),
        })
        .await?;

    Ok(keys::<D, _>(stream, &agreed, &hash, cipher, hmac))
}

#[allow(clippy::too_many_arguments)]
async fn gex<D: Digest + FixedOutputReset, S: vngx::Pipe>(
    stream: &mut Stream<S>,
    config: &ServerConfig,
    v_c: &str,
    v_s: &str,
    i_c: &[u8],
    i_s: &[u8],
    cipher: &Cipher,
    hmac: &Hmac,
) -> Result<TransportPair> {
    let request: GexRequest = stream.recv().await?.to()?;

    let p = MpInt::positive(
        &BigUint::parse_bytes(GROUP14_P, 16)
            .expect("group constant")
            .to_bytes_be(),
    );
    let g = MpInt::positive(&[2]);

    stream
        .send(&GexGroup {
            p: p.clone(),
            g: g.clone(),
        })
        .await?;

    let init: GexInit = stream.recv().await?.to()?;

    let agreed = agree(GROUP14_P, &init.e, &config.key);

    let mut preimage = Buffer::new();
    preimage.put_string(v_c.as_bytes());
    preimage.put_string(v_s.as_bytes());
    preimage.put_string(i_c);
    preimage.put_string(i_s);
    preimage.put_string(&agreed.k_s);
    preimage.put_u32(request.min);
    preimage.put_u32(request.n);
    preimage.put_u32(request.max);
    preimage.put_mpint(&p);
    preimage.put_mpint(&g);
    preimage.put_mpint(&init.e);
    preimage.put_mpint(&agreed.f);
    preimage.put_mpint(&agreed.k);
    let hash = D::digest(preimage.as_slice()).to_vec();

    stream
        .send(&GexReply {
            k_s: agreed.k_s.clone(),
            f: agreed.f.clone(),
            signature: sign(&config.key, &hash),
        })
        .await?;

    Ok(keys::<D, _>(stream, &agreed, &hash, cipher, hmac))
}
