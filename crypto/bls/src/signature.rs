use crate::{Error, Hash256, PublicKey, DST, INFINITY_SIGNATURE, SIGNATURE_BYTES_LEN};

/// A decompressed BLS12-381 signature.
#[derive(Clone)]
pub struct Signature {
    point: blst::min_pk::Signature,
}

impl Signature {
    pub(crate) fn from_point(point: blst::min_pk::Signature) -> Self {
        Self { point }
    }

    pub(crate) fn point(&self) -> &blst::min_pk::Signature {
        &self.point
    }

    /// The point at infinity, standing in wherever a signature is structurally required but never
    /// verified (e.g. the genesis block).
    pub fn infinity() -> Self {
        Self::deserialize(&INFINITY_SIGNATURE).expect("infinity signature decodes")
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() != SIGNATURE_BYTES_LEN {
            return Err(Error::InvalidByteLength {
                got: bytes.len(),
                expected: SIGNATURE_BYTES_LEN,
            });
        }
        let point = blst::min_pk::Signature::from_bytes(bytes).map_err(Error::BlstError)?;
        Ok(Self { point })
    }

    pub fn serialize(&self) -> [u8; SIGNATURE_BYTES_LEN] {
        self.point.compress()
    }

    /// Verify `self` against a single public key and 32-byte message root.
    pub fn verify(&self, pubkey: &PublicKey, msg: Hash256) -> bool {
        if cfg!(feature = "fake_crypto") {
            return true;
        }
        self.point
            .verify(true, msg.as_bytes(), DST, &[], pubkey.point(), true)
            == blst::BLST_ERROR::BLST_SUCCESS
    }
}

impl PartialEq for Signature {
    fn eq(&self, other: &Self) -> bool {
        self.serialize()[..] == other.serialize()[..]
    }
}

impl Eq for Signature {}

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(&self.serialize()[..]))
    }
}
