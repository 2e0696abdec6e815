use crate::consts::NUM_FLAG_INDICES;
use safe_arith::{ArithError, SafeArith};
use serde_derive::{Deserialize, Serialize};

/// Per-validator, per-epoch attestation participation record: one bit per timeliness flag.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipationFlags {
    #[serde(with = "serde_utils::quoted_u8")]
    bits: u8,
}

impl ParticipationFlags {
    pub fn add_flag(&mut self, flag_index: usize) -> Result<(), ArithError> {
        if flag_index >= NUM_FLAG_INDICES {
            return Err(ArithError::Overflow);
        }
        self.bits |= 1u8.safe_shl(flag_index as u32)?;
        Ok(())
    }

    pub fn has_flag(&self, flag_index: usize) -> Result<bool, ArithError> {
        if flag_index >= NUM_FLAG_INDICES {
            return Err(ArithError::Overflow);
        }
        let mask = 1u8.safe_shl(flag_index as u32)?;
        Ok(self.bits & mask == mask)
    }

    pub fn into_u8(self) -> u8 {
        self.bits
    }
}

impl ssz::Encode for ParticipationFlags {
    fn is_ssz_fixed_len() -> bool {
        <u8 as ssz::Encode>::is_ssz_fixed_len()
    }

    fn ssz_fixed_len() -> usize {
        <u8 as ssz::Encode>::ssz_fixed_len()
    }

    fn ssz_bytes_len(&self) -> usize {
        self.bits.ssz_bytes_len()
    }

    fn ssz_append(&self, buf: &mut Vec<u8>) {
        self.bits.ssz_append(buf)
    }
}

impl ssz::Decode for ParticipationFlags {
    fn is_ssz_fixed_len() -> bool {
        <u8 as ssz::Decode>::is_ssz_fixed_len()
    }

    fn ssz_fixed_len() -> usize {
        <u8 as ssz::Decode>::ssz_fixed_len()
    }

    fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, ssz::DecodeError> {
        u8::from_ssz_bytes(bytes).map(|bits| Self { bits })
    }
}

impl tree_hash::TreeHash for ParticipationFlags {
    fn tree_hash_type() -> tree_hash::TreeHashType {
        u8::tree_hash_type()
    }

    fn tree_hash_packed_encoding(&self) -> tree_hash::PackedEncoding {
        self.bits.tree_hash_packed_encoding()
    }

    fn tree_hash_packing_factor() -> usize {
        u8::tree_hash_packing_factor()
    }

    fn tree_hash_root(&self) -> tree_hash::Hash256 {
        self.bits.tree_hash_root()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_query_flags() {
        let mut flags = ParticipationFlags::default();
        for i in 0..NUM_FLAG_INDICES {
            assert!(!flags.has_flag(i).unwrap());
            flags.add_flag(i).unwrap();
            assert!(flags.has_flag(i).unwrap());
        }
        assert_eq!(flags.into_u8(), 0b111);
    }

    #[test]
    fn out_of_bounds_flag_is_an_error() {
        let mut flags = ParticipationFlags::default();
        assert!(flags.add_flag(NUM_FLAG_INDICES).is_err());
        assert!(flags.has_flag(NUM_FLAG_INDICES).is_err());
    }
}
