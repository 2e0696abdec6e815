use crate::macros::impl_byte_wrapper;
use crate::{Error, PublicKey, PUBLIC_KEY_BYTES_LEN};

/// The 48-byte compressed encoding of a public key, as it appears on the wire and in state.
///
/// Decompression is deferred until a signature actually needs verifying; most keys in the
/// validator registry are never used on the hot path.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKeyBytes {
    bytes: [u8; PUBLIC_KEY_BYTES_LEN],
}

impl_byte_wrapper!(PublicKeyBytes, PUBLIC_KEY_BYTES_LEN);

impl PublicKeyBytes {
    /// All-zero bytes. Not a valid public key; used as a placeholder.
    pub fn empty() -> Self {
        Self {
            bytes: [0; PUBLIC_KEY_BYTES_LEN],
        }
    }

    pub fn decompress(&self) -> Result<PublicKey, Error> {
        PublicKey::deserialize(&self.bytes)
    }
}

impl From<&PublicKey> for PublicKeyBytes {
    fn from(pk: &PublicKey) -> Self {
        pk.compress()
    }
}

impl Default for PublicKeyBytes {
    fn default() -> Self {
        Self::empty()
    }
}
