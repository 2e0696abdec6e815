use crate::{Error, Hash256, PublicKey, Signature, DST, SECRET_KEY_BYTES_LEN};
use ethereum_hashing::hash;

/// A BLS12-381 secret key.
///
/// Deliberately avoids implementing `Debug`, `Serialize` or SSZ traits so key material cannot leak
/// into logs or wire encodings.
#[derive(Clone)]
pub struct SecretKey {
    point: blst::min_pk::SecretKey,
}

impl SecretKey {
    /// Derive a secret key from at least 32 bytes of input key material.
    pub fn key_gen(ikm: &[u8]) -> Result<Self, Error> {
        let point = blst::min_pk::SecretKey::key_gen(ikm, &[]).map_err(Error::BlstError)?;
        Ok(Self { point })
    }

    /// Generate a fresh random secret key.
    pub fn random() -> Self {
        let mut ikm = [0; 32];
        rand::Rng::fill(&mut rand::thread_rng(), &mut ikm[..]);
        Self::key_gen(&ikm).expect("32 bytes of ikm is always sufficient")
    }

    /// Derive the secret key whose input key material is `hash(index)`.
    ///
    /// Only suitable for tests; produces the same key for the same index on every run.
    pub fn deterministic(index: u64) -> Result<Self, Error> {
        Self::key_gen(&hash(&index.to_le_bytes()))
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_point(self.point.sk_to_pk())
    }

    pub fn sign(&self, msg: Hash256) -> Signature {
        Signature::from_point(self.point.sign(msg.as_bytes(), DST, &[]))
    }

    pub fn serialize(&self) -> [u8; SECRET_KEY_BYTES_LEN] {
        self.point.to_bytes()
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        let point = blst::min_pk::SecretKey::from_bytes(bytes).map_err(Error::BlstError)?;
        Ok(Self { point })
    }
}
