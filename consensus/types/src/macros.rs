/// Implements SSZ encoding/decoding and tree hashing for a `u64` newtype by delegating to the
/// inner integer.
macro_rules! impl_u64_codec {
    ($type: ident) => {
        impl ssz::Encode for $type {
            fn is_ssz_fixed_len() -> bool {
                <u64 as ssz::Encode>::is_ssz_fixed_len()
            }

            fn ssz_fixed_len() -> usize {
                <u64 as ssz::Encode>::ssz_fixed_len()
            }

            fn ssz_bytes_len(&self) -> usize {
                self.0.ssz_bytes_len()
            }

            fn ssz_append(&self, buf: &mut Vec<u8>) {
                self.0.ssz_append(buf)
            }
        }

        impl ssz::Decode for $type {
            fn is_ssz_fixed_len() -> bool {
                <u64 as ssz::Decode>::is_ssz_fixed_len()
            }

            fn ssz_fixed_len() -> usize {
                <u64 as ssz::Decode>::ssz_fixed_len()
            }

            fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, ssz::DecodeError> {
                u64::from_ssz_bytes(bytes).map(Self)
            }
        }

        impl tree_hash::TreeHash for $type {
            fn tree_hash_type() -> tree_hash::TreeHashType {
                u64::tree_hash_type()
            }

            fn tree_hash_packed_encoding(&self) -> tree_hash::PackedEncoding {
                self.0.tree_hash_packed_encoding()
            }

            fn tree_hash_packing_factor() -> usize {
                u64::tree_hash_packing_factor()
            }

            fn tree_hash_root(&self) -> tree_hash::Hash256 {
                self.0.tree_hash_root()
            }
        }
    };
}

/// Implements saturating `std::ops` arithmetic and `u64` comparisons for a `u64` newtype,
/// alongside checked `safe_*` helpers that propagate `ArithError`.
macro_rules! impl_u64_math {
    ($type: ident) => {
        impl $type {
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            pub const fn as_u64(&self) -> u64 {
                self.0
            }

            pub const fn as_usize(&self) -> usize {
                self.0 as usize
            }

            pub fn max_value() -> Self {
                Self(u64::MAX)
            }

            pub fn saturating_add<T: Into<u64>>(&self, other: T) -> Self {
                Self(self.0.saturating_add(other.into()))
            }

            pub fn saturating_sub<T: Into<u64>>(&self, other: T) -> Self {
                Self(self.0.saturating_sub(other.into()))
            }

            pub fn safe_add<T: Into<u64>>(&self, other: T) -> safe_arith::Result<Self> {
                self.0
                    .checked_add(other.into())
                    .map(Self)
                    .ok_or(safe_arith::ArithError::Overflow)
            }

            pub fn safe_sub<T: Into<u64>>(&self, other: T) -> safe_arith::Result<Self> {
                self.0
                    .checked_sub(other.into())
                    .map(Self)
                    .ok_or(safe_arith::ArithError::Overflow)
            }

            pub fn safe_mul<T: Into<u64>>(&self, other: T) -> safe_arith::Result<Self> {
                self.0
                    .checked_mul(other.into())
                    .map(Self)
                    .ok_or(safe_arith::ArithError::Overflow)
            }

            pub fn safe_div<T: Into<u64>>(&self, other: T) -> safe_arith::Result<Self> {
                self.0
                    .checked_div(other.into())
                    .map(Self)
                    .ok_or(safe_arith::ArithError::DivisionByZero)
            }

            pub fn safe_rem<T: Into<u64>>(&self, other: T) -> safe_arith::Result<Self> {
                self.0
                    .checked_rem(other.into())
                    .map(Self)
                    .ok_or(safe_arith::ArithError::DivisionByZero)
            }

            pub fn safe_add_assign<T: Into<u64>>(&mut self, other: T) -> safe_arith::Result<()> {
                *self = self.safe_add(other)?;
                Ok(())
            }

            pub fn safe_sub_assign<T: Into<u64>>(&mut self, other: T) -> safe_arith::Result<()> {
                *self = self.safe_sub(other)?;
                Ok(())
            }
        }

        impl From<u64> for $type {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl From<$type> for u64 {
            fn from(value: $type) -> u64 {
                value.0
            }
        }

        impl std::ops::Add<$type> for $type {
            type Output = Self;
            fn add(self, other: Self) -> Self {
                Self(self.0.saturating_add(other.0))
            }
        }

        impl std::ops::Add<u64> for $type {
            type Output = Self;
            fn add(self, other: u64) -> Self {
                Self(self.0.saturating_add(other))
            }
        }

        impl std::ops::AddAssign for $type {
            fn add_assign(&mut self, other: Self) {
                self.0 = self.0.saturating_add(other.0)
            }
        }

        impl std::ops::Sub<$type> for $type {
            type Output = Self;
            fn sub(self, other: Self) -> Self {
                Self(self.0.saturating_sub(other.0))
            }
        }

        impl std::ops::Sub<u64> for $type {
            type Output = Self;
            fn sub(self, other: u64) -> Self {
                Self(self.0.saturating_sub(other))
            }
        }

        impl std::ops::SubAssign for $type {
            fn sub_assign(&mut self, other: Self) {
                self.0 = self.0.saturating_sub(other.0)
            }
        }

        impl std::ops::Mul<u64> for $type {
            type Output = Self;
            fn mul(self, other: u64) -> Self {
                Self(self.0.saturating_mul(other))
            }
        }

        impl std::ops::Div<u64> for $type {
            type Output = Self;
            fn div(self, other: u64) -> Self {
                Self(self.0.checked_div(other).expect("division by zero"))
            }
        }

        impl std::ops::Rem<u64> for $type {
            type Output = Self;
            fn rem(self, other: u64) -> Self {
                Self(self.0.checked_rem(other).expect("remainder by zero"))
            }
        }

        impl PartialEq<u64> for $type {
            fn eq(&self, other: &u64) -> bool {
                self.0 == *other
            }
        }

        impl PartialOrd<u64> for $type {
            fn partial_cmp(&self, other: &u64) -> Option<std::cmp::Ordering> {
                self.0.partial_cmp(other)
            }
        }

        impl std::fmt::Display for $type {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}
