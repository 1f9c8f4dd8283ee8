//! Conversion between configuration trees and the typed API model.
//!
//! *Expanding* turns a configuration [`Block`] into a request body and checks
//! the cross-field rules a schema cannot express. *Flattening* turns an API
//! response back into a configuration [`Block`], substituting zero values for
//! everything the response omits.
//!
//! Each nested block has exactly one `expand_*`/`flatten_*` pair. The
//! operating system specific parts of the OS profile live behind the adapters
//! in [`os_profile`].

use std::{fmt::Display, num::TryFromIntError, str::FromStr};

use snafu::{OptionExt as _, ResultExt as _, Snafu, ensure};
use tracing::debug;

use crate::{
    error::ErrorKind,
    identity::{self, ScaleSetId},
    model::{
        NetworkProfile, OperatingSystemType, Priority, Sku, StorageProfile, SubResource,
        UpdateNetworkProfile, UpdateOsDisk, UpdateOsProfile, UpdateProperties,
        UpdateStorageProfile, UpdateVirtualMachineProfile, UpgradeMode, VirtualMachineProfile,
        VirtualMachineScaleSet, VirtualMachineScaleSetProperties, VirtualMachineScaleSetUpdate,
    },
    value::{self, Block, Value},
};

mod capabilities;
mod image;
mod network;
mod os_disk;
mod os_profile;
mod priority;
mod upgrade;

pub use os_profile::ssh_key_path;
pub use upgrade::UpgradeSettings;

/// Scale sets are always created in the standard tier, even for promotional
/// SKUs.
pub const SKU_TIER: &str = "Standard";

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to read configuration"), context(false))]
    ReadConfig { source: value::Error },

    #[snafu(display("a {field:?} block must be specified"))]
    MissingBlock { field: &'static str },

    #[snafu(display("{value:?} is not a valid value for {field:?}"))]
    ParseEnum {
        source: strum::ParseError,
        field: &'static str,
        value: String,
    },

    #[snafu(display("{value} is out of range for {field:?}"))]
    IntOutOfRange {
        source: TryFromIntError,
        field: &'static str,
        value: i64,
    },

    #[snafu(display(
        "an `automatic_os_upgrade_policy` block cannot be specified when `upgrade_mode` is set to {mode:?}"
    ))]
    AutomaticPolicyNotAllowed { mode: UpgradeMode },

    #[snafu(display(
        "an `automatic_os_upgrade_policy` block must be specified when `upgrade_mode` is set to `Automatic`"
    ))]
    AutomaticPolicyRequired,

    #[snafu(display(
        "a `rolling_upgrade_policy` block cannot be specified when `upgrade_mode` is set to {mode:?}"
    ))]
    RollingPolicyNotAllowed { mode: UpgradeMode },

    #[snafu(display(
        "a `rolling_upgrade_policy` block must be specified when `upgrade_mode` is set to `Rolling`"
    ))]
    RollingPolicyRequired,

    #[snafu(display(
        "an `eviction_policy` can only be specified when `priority` is set to `Low`, not {priority:?}"
    ))]
    EvictionPolicyNotAllowed { priority: Priority },

    #[snafu(display("an `eviction_policy` must be specified when `priority` is set to `Low`"))]
    EvictionPolicyRequired,

    #[snafu(display("`zone_balance` can only be set to `true` when zones are specified"))]
    ZoneBalanceWithoutZones,

    #[snafu(display("either a `source_image_id` or a `source_image_reference` block must be specified"))]
    MissingSourceImage,

    #[snafu(display(
        "at least one ssh key or an `admin_password` must be specified if `disable_password_authentication` is enabled"
    ))]
    MissingAuthentication,

    #[snafu(display("the ssh key path {path:?} does not match the expected user home layout"))]
    UnexpectedSshKeyPath { path: String },

    #[snafu(display("the scale set response does not contain any properties"))]
    MissingProperties,

    #[snafu(display("the scale set response contains an invalid id"))]
    ParseResponseId { source: identity::Error },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ReadConfig { .. }
            | Error::MissingBlock { .. }
            | Error::ParseEnum { .. }
            | Error::IntOutOfRange { .. } => ErrorKind::InvalidConfiguration,

            Error::AutomaticPolicyNotAllowed { .. }
            | Error::AutomaticPolicyRequired
            | Error::RollingPolicyNotAllowed { .. }
            | Error::RollingPolicyRequired
            | Error::EvictionPolicyNotAllowed { .. }
            | Error::EvictionPolicyRequired
            | Error::ZoneBalanceWithoutZones => ErrorKind::InvalidCombination,

            Error::MissingSourceImage | Error::MissingAuthentication => {
                ErrorKind::MissingRequiredAlternative
            }

            Error::UnexpectedSshKeyPath { .. } | Error::MissingProperties => {
                ErrorKind::InvalidResponse
            }

            Error::ParseResponseId { .. } => ErrorKind::InvalidIdentity,
        }
    }
}

/// A set of top-level fields which the partial update API replaces as a
/// whole.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::Display,
    strum::EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum UpdateGroup {
    OsProfile,
    Storage,
    Network,
    Tags,
    Scale,
    UpgradePolicy,
}

impl UpdateGroup {
    /// The configuration fields belonging to this group. Fields which only
    /// exist for one operating system are listed for both.
    pub fn fields(self) -> &'static [&'static str] {
        match self {
            UpdateGroup::OsProfile => &[
                "admin_ssh_key",
                "custom_data",
                "disable_password_authentication",
                "enable_automatic_updates",
                "provision_vm_agent",
                "timezone",
            ],
            UpdateGroup::Storage => &["os_disk", "source_image_id", "source_image_reference"],
            UpdateGroup::Network => &["network_interface"],
            UpdateGroup::Tags => &["tags"],
            UpdateGroup::Scale => &["instances", "sku"],
            UpdateGroup::UpgradePolicy => &[
                "automatic_os_upgrade_policy",
                "rolling_upgrade_policy",
                "upgrade_mode",
            ],
        }
    }
}

/// Lower-cases a location and strips all spaces, so `West Europe` and
/// `westeurope` compare equal.
pub fn normalize_location(location: &str) -> String {
    location.replace(' ', "").to_lowercase()
}

/// Builds the request body creating the scale set `name` from `config`.
pub fn expand_scale_set(
    os_type: OperatingSystemType,
    name: &str,
    config: &Block,
) -> Result<VirtualMachineScaleSet> {
    let additional_capabilities =
        capabilities::expand_additional_capabilities(config.first_block("additional_capabilities")?)?;

    let network_interfaces =
        network::expand_network_interfaces(&config.blocks("network_interface")?)?;

    let os_disk = os_disk::expand_os_disk(
        config
            .first_block("os_disk")?
            .context(MissingBlockSnafu { field: "os_disk" })?,
        os_type,
    )?;

    let image_reference = image::expand_source_image(config)?;
    let upgrade_settings = UpgradeSettings::from_config(config)?;
    let os_profile = os_profile::expand_os_profile(os_type, name, config)?;
    let (priority, eviction_policy) = priority::expand_priority(config)?;

    let zones = config.strings("zones")?;
    let zone_balance = config.bool_or("zone_balance", false)?;
    ensure!(!zone_balance || !zones.is_empty(), ZoneBalanceWithoutZonesSnafu);

    let (upgrade_policy, health_probe) = upgrade_settings.into_upgrade_policy();
    debug!(
        upgrade.mode = %upgrade_policy.mode.unwrap_or_default(),
        network_interfaces = network_interfaces.len(),
        "expanded scale set configuration"
    );

    let virtual_machine_profile = VirtualMachineProfile {
        os_profile: Some(os_profile),
        storage_profile: Some(StorageProfile {
            image_reference: Some(image_reference),
            os_disk: Some(os_disk),
            // Data disks are not managed by this resource yet
            data_disks: Some(Vec::new()),
        }),
        network_profile: Some(NetworkProfile {
            health_probe,
            network_interface_configurations: Some(network_interfaces),
        }),
        priority: Some(priority),
        eviction_policy,
    };

    Ok(VirtualMachineScaleSet {
        location: Some(normalize_location(config.required_str("location")?)),
        sku: Some(Sku {
            name: Some(config.required_str("sku")?.to_owned()),
            tier: Some(SKU_TIER.to_owned()),
            capacity: Some(config.required_int("instances")?),
        }),
        tags: Some(config.string_map("tags")?),
        zones: (!zones.is_empty()).then(|| zones.iter().map(|zone| (*zone).to_owned()).collect()),
        properties: Some(VirtualMachineScaleSetProperties {
            upgrade_policy: Some(upgrade_policy),
            virtual_machine_profile: Some(virtual_machine_profile),
            overprovision: Some(config.bool_or("overprovision", false)?),
            do_not_run_extensions_on_overprovisioned_vms: Some(
                config.bool_or("do_not_run_extensions_on_overprovisioned_machines", false)?,
            ),
            single_placement_group: Some(config.bool_or("single_placement_group", false)?),
            zone_balance: zone_balance.then_some(true),
            proximity_placement_group: sub_resource(
                config.optional_str("proximity_placement_group_id")?,
            ),
            additional_capabilities: Some(additional_capabilities),
            ..Default::default()
        }),
        ..Default::default()
    })
}

/// Builds a partial update body containing only the given `groups`.
///
/// The whole configuration is expanded first, so all cross-field rules are
/// checked even for groups which did not change.
pub fn expand_update(
    os_type: OperatingSystemType,
    name: &str,
    config: &Block,
    groups: &[UpdateGroup],
) -> Result<VirtualMachineScaleSetUpdate> {
    let full = expand_scale_set(os_type, name, config)?;
    let properties = full.properties.unwrap_or_default();
    let profile = properties.virtual_machine_profile.unwrap_or_default();
    let network_profile = profile.network_profile.unwrap_or_default();

    let mut update = VirtualMachineScaleSetUpdate::default();
    let mut update_properties = UpdateProperties::default();
    let mut update_profile = UpdateVirtualMachineProfile::default();

    for group in groups {
        match group {
            UpdateGroup::OsProfile => {
                update_profile.os_profile = profile.os_profile.clone().map(|os_profile| {
                    UpdateOsProfile {
                        custom_data: os_profile.custom_data,
                        linux_configuration: os_profile.linux_configuration,
                        windows_configuration: os_profile.windows_configuration,
                    }
                });
            }
            UpdateGroup::Storage => {
                update_profile.storage_profile =
                    profile.storage_profile.clone().map(|storage| UpdateStorageProfile {
                        image_reference: storage.image_reference,
                        os_disk: storage.os_disk.map(|os_disk| UpdateOsDisk {
                            caching: os_disk.caching,
                            write_accelerator_enabled: os_disk.write_accelerator_enabled,
                            disk_size_gb: os_disk.disk_size_gb,
                            managed_disk: os_disk.managed_disk,
                        }),
                    });
            }
            UpdateGroup::Network => {
                update_profile.network_profile = Some(UpdateNetworkProfile {
                    health_probe: network_profile.health_probe.clone(),
                    network_interface_configurations: network_profile
                        .network_interface_configurations
                        .clone(),
                });
            }
            UpdateGroup::Tags => update.tags = Some(full.tags.clone().unwrap_or_default()),
            UpdateGroup::Scale => update.sku = full.sku.clone(),
            UpdateGroup::UpgradePolicy => {
                update_properties.upgrade_policy = properties.upgrade_policy.clone();
                if let Some(health_probe) = &network_profile.health_probe {
                    update_profile
                        .network_profile
                        .get_or_insert_with(UpdateNetworkProfile::default)
                        .health_probe = Some(health_probe.clone());
                }
            }
        }
    }

    if !update_profile.is_empty() {
        update_properties.virtual_machine_profile = Some(update_profile);
    }
    if !update_properties.is_empty() {
        update.properties = Some(update_properties);
    }

    Ok(update)
}

/// Turns an API response into a configuration tree.
///
/// Write-only fields (`admin_password` and `custom_data`) are never returned
/// by the API and are carried over from `prior` instead.
pub fn flatten_scale_set(
    os_type: OperatingSystemType,
    response: &VirtualMachineScaleSet,
    prior: &Block,
) -> Result<Block> {
    let properties = response.properties.as_ref().context(MissingPropertiesSnafu)?;

    let mut block = Block::new();

    match response.id.as_deref() {
        Some(id) => {
            let id: ScaleSetId = id.parse().context(ParseResponseIdSnafu)?;
            block.insert("name", id.name());
            block.insert("resource_group_name", id.resource_group());
        }
        None => {
            for key in ["name", "resource_group_name"] {
                if let Some(value) = prior.get(key) {
                    block.insert(key, value.clone());
                }
            }
            if let Some(name) = &response.name {
                block.insert("name", name.as_str());
            }
        }
    }

    if let Some(location) = &response.location {
        block.insert("location", normalize_location(location));
    }

    let sku = response.sku.as_ref();
    block.insert(
        "sku",
        sku.and_then(|sku| sku.name.clone()).unwrap_or_default(),
    );
    block.insert(
        "instances",
        sku.and_then(|sku| sku.capacity).unwrap_or_default(),
    );

    block.insert(
        "additional_capabilities",
        capabilities::flatten_additional_capabilities(properties.additional_capabilities.as_ref()),
    );
    block.insert(
        "do_not_run_extensions_on_overprovisioned_machines",
        properties
            .do_not_run_extensions_on_overprovisioned_vms
            .unwrap_or_default(),
    );
    block.insert("overprovision", properties.overprovision.unwrap_or_default());
    block.insert(
        "proximity_placement_group_id",
        flatten_id(properties.proximity_placement_group.as_ref()),
    );
    block.insert(
        "single_placement_group",
        properties.single_placement_group.unwrap_or_default(),
    );
    block.insert("unique_id", properties.unique_id.clone().unwrap_or_default());
    block.insert("zone_balance", properties.zone_balance.unwrap_or_default());

    let profile = properties.virtual_machine_profile.as_ref();
    block.insert(
        "priority",
        flatten_enum(profile.and_then(|profile| profile.priority.as_ref())),
    );
    block.insert(
        "eviction_policy",
        flatten_enum(profile.and_then(|profile| profile.eviction_policy.as_ref())),
    );

    let storage_profile = profile.and_then(|profile| profile.storage_profile.as_ref());
    let image_reference = storage_profile.and_then(|storage| storage.image_reference.as_ref());
    block.insert(
        "os_disk",
        os_disk::flatten_os_disk(storage_profile.and_then(|storage| storage.os_disk.as_ref())),
    );
    image::flatten_source_image(image_reference, &mut block);

    os_profile::flatten_os_profile(
        os_type,
        profile.and_then(|profile| profile.os_profile.as_ref()),
        &mut block,
    )?;

    let network_profile = profile.and_then(|profile| profile.network_profile.as_ref());
    block.insert(
        "network_interface",
        network::flatten_network_interfaces(
            network_profile.and_then(|network| network.network_interface_configurations.as_ref()),
        ),
    );

    upgrade::flatten_upgrade_policy(
        properties.upgrade_policy.as_ref(),
        network_profile.and_then(|network| network.health_probe.as_ref()),
        &mut block,
    );

    block.insert(
        "zones",
        Value::string_list(response.zones.iter().flatten()),
    );
    block.insert(
        "tags",
        response
            .tags
            .iter()
            .flatten()
            .map(|(key, value)| (key.clone(), Value::from(value.as_str())))
            .collect::<Block>(),
    );

    for key in ["admin_password", "custom_data"] {
        if let Some(value) = prior.get(key) {
            block.insert(key, value.clone());
        }
    }

    Ok(block)
}

fn parse_enum<T>(field: &'static str, value: &str) -> Result<T>
where
    T: FromStr<Err = strum::ParseError>,
{
    value.parse().context(ParseEnumSnafu { field, value })
}

fn required_enum<T>(block: &Block, field: &'static str) -> Result<T>
where
    T: FromStr<Err = strum::ParseError>,
{
    parse_enum(field, block.required_str(field)?)
}

fn optional_enum<T>(block: &Block, field: &'static str) -> Result<Option<T>>
where
    T: FromStr<Err = strum::ParseError>,
{
    block
        .optional_str(field)?
        .map(|value| parse_enum(field, value))
        .transpose()
}

fn to_i32(field: &'static str, value: i64) -> Result<i32> {
    i32::try_from(value).context(IntOutOfRangeSnafu { field, value })
}

fn optional_i32(block: &Block, field: &'static str) -> Result<Option<i32>> {
    block
        .optional_int(field)?
        .map(|value| to_i32(field, value))
        .transpose()
}

fn sub_resource(id: Option<&str>) -> Option<SubResource> {
    id.map(SubResource::new)
}

/// Empty id lists are sent as absent.
fn sub_resources(ids: &[&str]) -> Option<Vec<SubResource>> {
    (!ids.is_empty()).then(|| ids.iter().copied().map(SubResource::new).collect())
}

fn flatten_id(resource: Option<&SubResource>) -> String {
    resource
        .and_then(|resource| resource.id.clone())
        .unwrap_or_default()
}

fn flatten_ids(resources: Option<&Vec<SubResource>>) -> Value {
    Value::string_set(
        resources
            .into_iter()
            .flatten()
            .filter_map(|resource| resource.id.as_deref()),
    )
}

fn flatten_enum<T: Display>(value: Option<&T>) -> String {
    value.map(ToString::to_string).unwrap_or_default()
}
