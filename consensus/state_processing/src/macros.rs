/// Reject a block when `condition` does not hold, evaluating to the given error.
macro_rules! block_verify {
    ($condition: expr, $result: expr) => {
        if !$condition {
            return Err($result);
        }
    };
}

/// Shorthand for `BlockOperationError::invalid`, mirroring how operation checks read in the
/// consensus specification.
macro_rules! verify {
    ($condition: expr, $result: expr) => {
        if !$condition {
            return Err(crate::per_block_processing::errors::BlockOperationError::invalid($result));
        }
    };
}
