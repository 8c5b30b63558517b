//! Post-connect join ordering.
//!
//! Descriptors list join actions with an integer `sequence`; joins are issued
//! in ascending sequence order, ties keeping their configured order. A channel
//! without an explicit key is always requested with an empty key, never a
//! missing argument.

use crate::config::JoinAction;

/// One concrete join request, key normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRequest {
    /// Channel name.
    pub channel: String,
    /// Channel key; empty when the channel has none.
    pub key: String,
}

/// Order the descriptor's join actions for execution.
///
/// Stable sort by ascending `sequence`, so actions sharing a sequence keep
/// their original list order.
pub fn sorted_joins(actions: &[JoinAction]) -> Vec<JoinRequest> {
    let mut ordered: Vec<&JoinAction> = actions.iter().collect();
    ordered.sort_by_key(|action| action.sequence);
    ordered
        .into_iter()
        .map(|action| JoinRequest {
            channel: action.channel.clone(),
            key: action.key.clone().unwrap_or_default(),
        })
        .collect()
}
