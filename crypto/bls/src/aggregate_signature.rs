use crate::{Error, Hash256, PublicKey, Signature, SignatureBytes, DST};

/// An aggregate of one or more BLS12-381 signatures.
#[derive(Clone)]
pub struct AggregateSignature {
    point: blst::min_pk::Signature,
    is_infinity: bool,
}

impl AggregateSignature {
    /// The additive identity: an aggregate over the empty set of signatures.
    pub fn infinity() -> Self {
        Self {
            point: Signature::infinity().point().clone(),
            is_infinity: true,
        }
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        let signature = Signature::deserialize(bytes)?;
        let is_infinity = SignatureBytes::from(&signature).is_infinity();
        Ok(Self {
            point: signature.point().clone(),
            is_infinity,
        })
    }

    pub fn serialize(&self) -> [u8; crate::SIGNATURE_BYTES_LEN] {
        self.point.compress()
    }

    pub fn add_assign(&mut self, other: &Signature) {
        if self.is_infinity {
            self.point = other.point().clone();
            self.is_infinity = false;
        } else {
            let mut agg = blst::min_pk::AggregateSignature::from_signature(&self.point);
            if agg.add_signature(other.point(), false).is_ok() {
                self.point = agg.to_signature();
            }
        }
    }

    /// Verify `self` against a single message root signed by every one of `pubkeys`.
    pub fn fast_aggregate_verify(&self, msg: Hash256, pubkeys: &[&PublicKey]) -> bool {
        if cfg!(feature = "fake_crypto") {
            return true;
        }
        if pubkeys.is_empty() {
            return false;
        }
        let points = pubkeys.iter().map(|pk| pk.point()).collect::<Vec<_>>();
        self.point
            .fast_aggregate_verify(true, msg.as_bytes(), DST, &points)
            == blst::BLST_ERROR::BLST_SUCCESS
    }

    /// Verify `self` against a distinct message per public key (e.g. batched distinct-message
    /// verification). Message and key slices must be the same length.
    pub fn aggregate_verify(&self, msgs: &[Hash256], pubkeys: &[&PublicKey]) -> bool {
        if cfg!(feature = "fake_crypto") {
            return true;
        }
        if pubkeys.is_empty() || msgs.len() != pubkeys.len() {
            return false;
        }
        let msg_refs = msgs.iter().map(|m| m.as_bytes()).collect::<Vec<_>>();
        let points = pubkeys.iter().map(|pk| pk.point()).collect::<Vec<_>>();
        self.point.aggregate_verify(true, &msg_refs, DST, &points, true)
            == blst::BLST_ERROR::BLST_SUCCESS
    }
}

impl From<&AggregateSignature> for SignatureBytes {
    fn from(agg: &AggregateSignature) -> Self {
        SignatureBytes::deserialize(&agg.serialize()).expect("serialized length is fixed")
    }
}

impl PartialEq for AggregateSignature {
    fn eq(&self, other: &Self) -> bool {
        self.serialize()[..] == other.serialize()[..]
    }
}

impl Eq for AggregateSignature {}

impl std::fmt::Debug for AggregateSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(&self.serialize()[..]))
    }
}
