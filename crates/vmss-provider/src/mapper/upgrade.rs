use snafu::ensure;

use super::{
    AutomaticPolicyNotAllowedSnafu, AutomaticPolicyRequiredSnafu, Result,
    RollingPolicyNotAllowedSnafu, RollingPolicyRequiredSnafu, flatten_enum, optional_enum,
    to_i32,
};
use crate::{
    model::{
        AutomaticOsUpgradePolicy, RollingUpgradePolicy, SubResource, UpgradeMode, UpgradePolicy,
    },
    value::{Block, Value},
};

/// How instances receive changes to the scale set model. Each mode carries
/// exactly the policy it needs, so a policy can never disagree with the mode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UpgradeSettings {
    Manual,
    Automatic(AutomaticOsUpgradePolicy),
    Rolling {
        policy: RollingUpgradePolicy,

        /// The load balancer probe used to decide whether an upgraded
        /// instance is healthy.
        health_probe_id: String,
    },
}

impl UpgradeSettings {
    /// Reads `upgrade_mode` together with the `automatic_os_upgrade_policy`
    /// and `rolling_upgrade_policy` blocks.
    pub fn from_config(config: &Block) -> Result<Self> {
        let mode = optional_enum(config, "upgrade_mode")?.unwrap_or_default();
        let automatic = config.first_block("automatic_os_upgrade_policy")?;
        let rolling = config.first_block("rolling_upgrade_policy")?;

        ensure!(
            automatic.is_none() || mode == UpgradeMode::Automatic,
            AutomaticPolicyNotAllowedSnafu { mode }
        );
        ensure!(
            rolling.is_none() || mode == UpgradeMode::Rolling,
            RollingPolicyNotAllowedSnafu { mode }
        );

        match mode {
            UpgradeMode::Manual => Ok(Self::Manual),
            UpgradeMode::Automatic => {
                let Some(raw) = automatic else {
                    return AutomaticPolicyRequiredSnafu.fail();
                };

                Ok(Self::Automatic(AutomaticOsUpgradePolicy {
                    disable_automatic_rollback: Some(
                        raw.bool_or("disable_automatic_rollback", false)?,
                    ),
                    enable_automatic_os_upgrade: Some(
                        raw.bool_or("enable_automatic_os_upgrade", false)?,
                    ),
                }))
            }
            UpgradeMode::Rolling => {
                let Some(raw) = rolling else {
                    return RollingPolicyRequiredSnafu.fail();
                };

                let percent = |field: &'static str| -> Result<Option<i32>> {
                    to_i32(field, raw.required_int(field)?).map(Some)
                };

                Ok(Self::Rolling {
                    policy: RollingUpgradePolicy {
                        max_batch_instance_percent: percent("max_batch_instance_percent")?,
                        max_unhealthy_instance_percent: percent("max_unhealthy_instance_percent")?,
                        max_unhealthy_upgraded_instance_percent: percent(
                            "max_unhealthy_upgraded_instance_percent",
                        )?,
                        pause_time_between_batches: Some(
                            raw.required_str("pause_time_between_batches")?.to_owned(),
                        ),
                    },
                    health_probe_id: raw.required_str("health_probe_id")?.to_owned(),
                })
            }
        }
    }

    pub fn mode(&self) -> UpgradeMode {
        match self {
            Self::Manual => UpgradeMode::Manual,
            Self::Automatic(_) => UpgradeMode::Automatic,
            Self::Rolling { .. } => UpgradeMode::Rolling,
        }
    }

    /// Lowers the settings into the API representation. The health probe of
    /// a rolling upgrade belongs to the network profile and is returned
    /// separately.
    pub fn into_upgrade_policy(self) -> (UpgradePolicy, Option<SubResource>) {
        let mode = Some(self.mode());

        match self {
            Self::Manual => (
                UpgradePolicy {
                    mode,
                    ..Default::default()
                },
                None,
            ),
            Self::Automatic(policy) => (
                UpgradePolicy {
                    mode,
                    automatic_os_upgrade_policy: Some(policy),
                    rolling_upgrade_policy: None,
                },
                None,
            ),
            Self::Rolling {
                policy,
                health_probe_id,
            } => (
                UpgradePolicy {
                    mode,
                    automatic_os_upgrade_policy: None,
                    rolling_upgrade_policy: Some(policy),
                },
                Some(SubResource::new(health_probe_id)),
            ),
        }
    }
}

/// Writes `upgrade_mode` and both policy blocks.
pub(super) fn flatten_upgrade_policy(
    input: Option<&UpgradePolicy>,
    health_probe: Option<&SubResource>,
    block: &mut Block,
) {
    let automatic = input
        .and_then(|policy| policy.automatic_os_upgrade_policy.as_ref())
        .map(|policy| {
            Block::new()
                .with(
                    "disable_automatic_rollback",
                    policy.disable_automatic_rollback.unwrap_or_default(),
                )
                .with(
                    "enable_automatic_os_upgrade",
                    policy.enable_automatic_os_upgrade.unwrap_or_default(),
                )
        })
        .map_or_else(Value::empty_list, Value::single);

    let rolling = input
        .and_then(|policy| policy.rolling_upgrade_policy.as_ref())
        .map(|policy| {
            Block::new()
                .with(
                    "max_batch_instance_percent",
                    policy.max_batch_instance_percent.unwrap_or_default(),
                )
                .with(
                    "max_unhealthy_instance_percent",
                    policy.max_unhealthy_instance_percent.unwrap_or_default(),
                )
                .with(
                    "max_unhealthy_upgraded_instance_percent",
                    policy
                        .max_unhealthy_upgraded_instance_percent
                        .unwrap_or_default(),
                )
                .with(
                    "pause_time_between_batches",
                    policy.pause_time_between_batches.clone().unwrap_or_default(),
                )
                .with(
                    "health_probe_id",
                    health_probe
                        .and_then(|probe| probe.id.clone())
                        .unwrap_or_default(),
                )
        })
        .map_or_else(Value::empty_list, Value::single);

    block.insert(
        "upgrade_mode",
        flatten_enum(input.and_then(|policy| policy.mode.as_ref())),
    );
    block.insert("automatic_os_upgrade_policy", automatic);
    block.insert("rolling_upgrade_policy", rolling);
}
