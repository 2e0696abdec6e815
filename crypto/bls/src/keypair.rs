use crate::{PublicKey, SecretKey};

/// A convenience pairing of a secret key and its public key.
#[derive(Clone)]
pub struct Keypair {
    pub pk: PublicKey,
    pub sk: SecretKey,
}

impl Keypair {
    pub fn random() -> Self {
        let sk = SecretKey::random();
        Self {
            pk: sk.public_key(),
            sk,
        }
    }

    /// A keypair derived solely from `index`. Test use only.
    pub fn deterministic(index: u64) -> Self {
        let sk = SecretKey::deterministic(index).expect("hashed ikm is 32 bytes");
        Self {
            pk: sk.public_key(),
            sk,
        }
    }
}

impl std::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Keypair({:?})", self.pk)
    }
}
