use crate::macros::impl_byte_wrapper;
use crate::{Error, Signature, INFINITY_SIGNATURE, SIGNATURE_BYTES_LEN};

/// The 96-byte compressed encoding of a signature, as carried inside consensus containers.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SignatureBytes {
    bytes: [u8; SIGNATURE_BYTES_LEN],
}

impl_byte_wrapper!(SignatureBytes, SIGNATURE_BYTES_LEN);

impl SignatureBytes {
    /// The point-at-infinity encoding, used where a signature is structurally required but carries
    /// no authority (genesis blocks, unsigned test fixtures).
    pub fn empty() -> Self {
        Self {
            bytes: INFINITY_SIGNATURE,
        }
    }

    pub fn is_infinity(&self) -> bool {
        self.bytes == INFINITY_SIGNATURE
    }

    pub fn decompress(&self) -> Result<Signature, Error> {
        Signature::deserialize(&self.bytes)
    }
}

impl From<&Signature> for SignatureBytes {
    fn from(sig: &Signature) -> Self {
        Self {
            bytes: sig.serialize(),
        }
    }
}

impl Default for SignatureBytes {
    fn default() -> Self {
        Self::empty()
    }
}
