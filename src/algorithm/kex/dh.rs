//! The finite-field Diffie-Hellman engine behind the `diffie-hellman-*`
//! key-exchange algorithms.

use num_bigint_dig::{BigUint, RandBigInt};
use secrecy::SecretBox;

use crate::{
    wire::MpInt,
    Error, Result,
};

/// The 1024-bit MODP group ("Oakley Group 2") of
/// [RFC 2409 § 6.2](https://datatracker.ietf.org/doc/html/rfc2409#section-6.2).
const GROUP1_P: &[u8] = b"\
FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD129024E088A67CC74\
020BBEA63B139B22514A08798E3404DDEF9519B3CD3A431B302B0A6DF25F1437\
4FE1356D6D51C245E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED\
EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE65381FFFFFFFFFFFFFFFF";

/// The 2048-bit MODP group of
/// [RFC 3526 § 3](https://datatracker.ietf.org/doc/html/rfc3526#section-3).
const GROUP14_P: &[u8] = b"\
FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD129024E088A67CC74\
020BBEA63B139B22514A08798E3404DDEF9519B3CD3A431B302B0A6DF25F1437\
4FE1356D6D51C245E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED\
EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE45B3DC2007CB8A163BF05\
98DA48361C55D39A69163FA8FD24CF5F83655D23DCA3AD961C62F356208552BB\
9ED529077096966D670C354E4ABC9804F1746C08CA18217C32905E462E36CE3B\
E39E772C180E86039B2783A2EC07A28FB5C55DF06F4C52C9DE2BCBF695581718\
3995497CEA956AE515D2261898FA051015728E5A8AACAA68FFFFFFFFFFFFFFFF";

/// A multiplicative group for the exchange, either one of the
/// well-known fixed groups or one received from the server during a
/// group exchange.
pub(crate) struct Group {
    p: BigUint,
    g: BigUint,
}

impl Group {
    pub fn group1() -> Self {
        Self {
            p: BigUint::parse_bytes(GROUP1_P, 16).expect("The group constant is well-formed"),
            g: BigUint::from(2u8),
        }
    }

    pub fn group14() -> Self {
        Self {
            p: BigUint::parse_bytes(GROUP14_P, 16).expect("The group constant is well-formed"),
            g: BigUint::from(2u8),
        }
    }

    /// Build a group from the wire representation of `(p, g)`,
    /// as found in `SSH_MSG_KEX_DH_GEX_GROUP`.
    pub fn from_mpints(p: &MpInt, g: &MpInt) -> Result<Self> {
        if p.is_negative() || g.is_negative() {
            return Err(Error::KexError);
        }

        let p = BigUint::from_bytes_be(p.as_bytes());
        let g = BigUint::from_bytes_be(g.as_bytes());

        if g < BigUint::from(2u8) || g >= p {
            return Err(Error::KexError);
        }

        Ok(Self { p, g })
    }

    /// The size of the group's prime modulus, in bits.
    pub fn bits(&self) -> usize {
        self.p.bits()
    }

    /// Whether `value` lies in the exchange-value range `[1, p-1]`.
    fn contains(&self, value: &BigUint) -> bool {
        *value >= BigUint::from(1u8) && *value < self.p
    }
}

/// One side of a Diffie-Hellman exchange over a [`Group`]: the private
/// exponent `x` and the public exchange value `e = g^x mod p`.
pub(crate) struct Dh {
    group: Group,
    x: BigUint,
    e: BigUint,
}

impl Dh {
    /// Generate an exchange over `group` with a fresh private exponent.
    pub fn generate(group: Group) -> Self {
        let mut rng = rand::thread_rng();

        let low = BigUint::from(2u8);
        let high = &group.p - 1u8;

        loop {
            let x = rng.gen_biguint_range(&low, &high);
            let e = group.g.modpow(&x, &group.p);

            if group.contains(&e) {
                break Self { group, x, e };
            }
        }
    }

    /// The public exchange value `e`, in wire representation.
    pub fn public(&self) -> MpInt {
        MpInt::positive(&self.e.to_bytes_be())
    }

    /// Compute the shared secret `K = f^x mod p` from the peer's
    /// exchange value, failing when `f` falls outside `[1, p-1]`.
    pub fn exchange(self, f: &MpInt) -> Result<SecretBox<MpInt>> {
        if f.is_negative() {
            return Err(Error::KexError);
        }

        let f = BigUint::from_bytes_be(f.as_bytes());

        if !self.group.contains(&f) {
            return Err(Error::KexError);
        }

        let k = f.modpow(&self.x, &self.group.p);

        Ok(SecretBox::new(Box::new(MpInt::positive(&k.to_bytes_be()))))
    }
}
