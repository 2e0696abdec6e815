use serde::de::Error;
use serde_derive::{Deserialize, Serialize};

pub const GRAFFITI_BYTES_LEN: usize = 32;

/// The 32-byte arbitrary data field a proposer may attach to its block.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Graffiti(#[serde(with = "serde_graffiti")] pub [u8; GRAFFITI_BYTES_LEN]);

impl Graffiti {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; GRAFFITI_BYTES_LEN]> for Graffiti {
    fn from(bytes: [u8; GRAFFITI_BYTES_LEN]) -> Self {
        Self(bytes)
    }
}

pub mod serde_graffiti {
    use super::*;

    pub fn serialize<S: serde::Serializer>(
        bytes: &[u8; GRAFFITI_BYTES_LEN],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> Result<[u8; GRAFFITI_BYTES_LEN], D::Error> {
        let s: String = serde::Deserialize::deserialize(deserializer)?;
        let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(&s))
            .map_err(|e| D::Error::custom(format!("invalid hex: {:?}", e)))?;
        if bytes.len() != GRAFFITI_BYTES_LEN {
            return Err(D::Error::custom(format!(
                "incorrect byte length {}, expected {}",
                bytes.len(),
                GRAFFITI_BYTES_LEN
            )));
        }
        let mut array = [0; GRAFFITI_BYTES_LEN];
        array.copy_from_slice(&bytes);
        Ok(array)
    }
}

impl ssz::Encode for Graffiti {
    fn is_ssz_fixed_len() -> bool {
        true
    }

    fn ssz_fixed_len() -> usize {
        GRAFFITI_BYTES_LEN
    }

    fn ssz_bytes_len(&self) -> usize {
        GRAFFITI_BYTES_LEN
    }

    fn ssz_append(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.0)
    }
}

impl ssz::Decode for Graffiti {
    fn is_ssz_fixed_len() -> bool {
        true
    }

    fn ssz_fixed_len() -> usize {
        GRAFFITI_BYTES_LEN
    }

    fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, ssz::DecodeError> {
        if bytes.len() != GRAFFITI_BYTES_LEN {
            return Err(ssz::DecodeError::InvalidByteLength {
                len: bytes.len(),
                expected: GRAFFITI_BYTES_LEN,
            });
        }
        let mut array = [0; GRAFFITI_BYTES_LEN];
        array.copy_from_slice(bytes);
        Ok(Self(array))
    }
}

impl tree_hash::TreeHash for Graffiti {
    fn tree_hash_type() -> tree_hash::TreeHashType {
        tree_hash::TreeHashType::Vector
    }

    fn tree_hash_packed_encoding(&self) -> tree_hash::PackedEncoding {
        unreachable!("Vector should never be packed.")
    }

    fn tree_hash_packing_factor() -> usize {
        unreachable!("Vector should never be packed.")
    }

    fn tree_hash_root(&self) -> tree_hash::Hash256 {
        tree_hash::merkle_root(&self.0, 0)
    }
}
