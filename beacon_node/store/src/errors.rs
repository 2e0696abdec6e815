use ssz::DecodeError;
use types::{BeaconStateError, Hash256, Slot};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    SszDecodeError(DecodeError),
    BeaconStateError(BeaconStateError),
    BlockNotFound(Hash256),
    /// A state was requested that the store cannot reconstruct.
    MissingState(Hash256),
    /// Replay from a snapshot did not reach the requested slot.
    ReplayIncomplete {
        target_slot: Slot,
        reached_slot: Slot,
    },
    BlockReplayError(state_processing::BlockReplayError),
    DBError {
        message: String,
    },
}

impl From<DecodeError> for Error {
    fn from(e: DecodeError) -> Error {
        Error::SszDecodeError(e)
    }
}

impl From<BeaconStateError> for Error {
    fn from(e: BeaconStateError) -> Error {
        Error::BeaconStateError(e)
    }
}

impl From<state_processing::BlockReplayError> for Error {
    fn from(e: state_processing::BlockReplayError) -> Error {
        Error::BlockReplayError(e)
    }
}

#[derive(Debug)]
pub struct DBError {
    pub message: String,
}

impl DBError {
    pub fn new(message: String) -> Self {
        Self { message }
    }
}

impl From<DBError> for Error {
    fn from(e: DBError) -> Error {
        Error::DBError { message: e.message }
    }
}
