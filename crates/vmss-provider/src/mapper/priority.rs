use snafu::ensure;

use super::{
    EvictionPolicyNotAllowedSnafu, EvictionPolicyRequiredSnafu, Result, optional_enum,
};
use crate::{
    model::{EvictionPolicy, Priority},
    value::Block,
};

/// An eviction policy only applies to, and is required for, low priority
/// instances.
pub(super) fn expand_priority(config: &Block) -> Result<(Priority, Option<EvictionPolicy>)> {
    let priority = optional_enum(config, "priority")?.unwrap_or_default();
    let eviction_policy = optional_enum(config, "eviction_policy")?;

    ensure!(
        eviction_policy.is_none() || priority == Priority::Low,
        EvictionPolicyNotAllowedSnafu { priority }
    );
    ensure!(
        eviction_policy.is_some() || priority != Priority::Low,
        EvictionPolicyRequiredSnafu
    );

    Ok((priority, eviction_policy))
}
