/// Provides a summary of an epoch transition, useful to observers that want to know how FFG voting
/// went without re-deriving it from the post-state.
#[derive(Debug, PartialEq, Clone)]
pub struct EpochProcessingSummary {
    pub total_active_balance: u64,
    pub previous_epoch_target_attesting_balance: u64,
    pub current_epoch_target_attesting_balance: u64,
}
