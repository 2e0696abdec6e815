use crate::{Error, PublicKeyBytes, PUBLIC_KEY_BYTES_LEN};

/// A decompressed, subgroup-checked BLS12-381 public key.
#[derive(Clone)]
pub struct PublicKey {
    point: blst::min_pk::PublicKey,
}

impl PublicKey {
    pub(crate) fn from_point(point: blst::min_pk::PublicKey) -> Self {
        Self { point }
    }

    pub(crate) fn point(&self) -> &blst::min_pk::PublicKey {
        &self.point
    }

    /// Decompress and validate a public key from its 48-byte compressed form.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() != PUBLIC_KEY_BYTES_LEN {
            return Err(Error::InvalidByteLength {
                got: bytes.len(),
                expected: PUBLIC_KEY_BYTES_LEN,
            });
        }
        let point = blst::min_pk::PublicKey::key_validate(bytes).map_err(Error::BlstError)?;
        Ok(Self { point })
    }

    pub fn serialize(&self) -> [u8; PUBLIC_KEY_BYTES_LEN] {
        self.point.compress()
    }

    pub fn compress(&self) -> PublicKeyBytes {
        PublicKeyBytes::deserialize(&self.serialize())
            .expect("compressed bytes have the correct length")
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.serialize() == other.serialize()
    }
}

impl Eq for PublicKey {}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.serialize()))
    }
}
