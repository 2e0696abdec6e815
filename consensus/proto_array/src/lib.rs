mod error;
pub mod proto_array;
pub mod proto_array_fork_choice;
mod ssz_container;

pub use crate::error::Error;
pub use crate::proto_array::{Block, ExecutionStatus, ProtoArray, ProtoNode};
pub use crate::proto_array_fork_choice::{ElasticList, ProtoArrayForkChoice, VoteTracker};
pub use crate::ssz_container::SszContainer;
