//! A wrapper around the `blst` BLS12-381 library, exposing only the primitives the beacon chain
//! requires: signing, verification and fast-aggregate verification over 32-byte message roots.
//!
//! The `fake_crypto` feature turns every verification into a no-op that returns `true`. It exists
//! for benchmarking and interop testing and must never be enabled in production builds.

mod aggregate_public_key;
mod aggregate_signature;
mod keypair;
mod macros;
mod public_key;
mod public_key_bytes;
mod secret_key;
mod signature;
mod signature_bytes;

pub use aggregate_public_key::AggregatePublicKey;
pub use aggregate_signature::AggregateSignature;
pub use keypair::Keypair;
pub use public_key::PublicKey;
pub use public_key_bytes::PublicKeyBytes;
pub use secret_key::SecretKey;
pub use signature::Signature;
pub use signature_bytes::SignatureBytes;

pub use ethereum_types::H256 as Hash256;

pub const PUBLIC_KEY_BYTES_LEN: usize = 48;
pub const SIGNATURE_BYTES_LEN: usize = 96;
pub const SECRET_KEY_BYTES_LEN: usize = 32;

/// The compressed encoding of the G2 point at infinity, used as the placeholder signature.
pub const INFINITY_SIGNATURE: [u8; SIGNATURE_BYTES_LEN] = [
    0xc0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0,
];

/// The domain separation tag for beacon-chain proof-of-possession signatures.
pub const DST: &[u8] = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_POP_";

#[derive(Debug, PartialEq, Clone)]
pub enum Error {
    /// An error was raised from the `blst` library.
    BlstError(blst::BLST_ERROR),
    /// The provided bytes were an incorrect length.
    InvalidByteLength { got: usize, expected: usize },
    /// The provided hex string was invalid.
    InvalidHexString,
    /// The secret key seed material was too short.
    InsufficientIkm,
}

impl From<blst::BLST_ERROR> for Error {
    fn from(e: blst::BLST_ERROR) -> Error {
        Error::BlstError(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify() {
        let sk = SecretKey::deterministic(42).unwrap();
        let pk = sk.public_key();
        let msg = Hash256::from_low_u64_be(7);

        let sig = sk.sign(msg);
        assert!(sig.verify(&pk, msg));
        assert!(!sig.verify(&pk, Hash256::from_low_u64_be(8)));
    }

    #[test]
    fn fast_aggregate_verify() {
        let msg = Hash256::from_low_u64_be(99);
        let keypairs = (0..4u64).map(Keypair::deterministic).collect::<Vec<_>>();

        let mut agg = AggregateSignature::infinity();
        for keypair in &keypairs {
            agg.add_assign(&keypair.sk.sign(msg));
        }

        let pubkey_refs = keypairs.iter().map(|k| &k.pk).collect::<Vec<_>>();
        assert!(agg.fast_aggregate_verify(msg, &pubkey_refs));
        assert!(!agg.fast_aggregate_verify(msg, &pubkey_refs[..3].to_vec()));
    }

    #[test]
    fn compression_round_trip() {
        let keypair = Keypair::deterministic(3);
        let bytes = keypair.pk.compress();
        let decompressed = bytes.decompress().unwrap();
        assert_eq!(decompressed, keypair.pk);

        let sig = keypair.sk.sign(Hash256::zero());
        let sig_bytes = SignatureBytes::from(&sig);
        assert_eq!(sig_bytes.decompress().unwrap(), sig);
    }

    #[test]
    fn infinity_signature_decompresses() {
        let bytes = SignatureBytes::empty();
        bytes.decompress().expect("infinity point should decode");
    }
}
