use crate::{Error, PublicKey};

/// An aggregate of one or more BLS12-381 public keys.
#[derive(Clone)]
pub struct AggregatePublicKey {
    point: blst::min_pk::AggregatePublicKey,
}

impl AggregatePublicKey {
    /// Aggregate a non-empty set of public keys.
    pub fn aggregate(pubkeys: &[&PublicKey]) -> Result<Self, Error> {
        let points = pubkeys.iter().map(|pk| pk.point()).collect::<Vec<_>>();
        let point = blst::min_pk::AggregatePublicKey::aggregate(&points, false)
            .map_err(Error::BlstError)?;
        Ok(Self { point })
    }

    pub fn to_public_key(&self) -> PublicKey {
        PublicKey::from_point(self.point.to_public_key())
    }
}
