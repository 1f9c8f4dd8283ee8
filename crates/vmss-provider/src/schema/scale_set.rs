use strum::VariantNames as _;

use super::{FieldSchema, FieldType, Schema, ValidatorFn};
use crate::model::{
    CachingType, DiffDiskOption, EvictionPolicy, IpVersion, OperatingSystemType, Priority,
    StorageAccountType, UpgradeMode,
};

/// The complete schema of a virtual machine scale set for the given
/// operating system.
pub fn resource_schema(os_type: OperatingSystemType) -> Schema {
    let schema = Schema::new()
        .field(
            "name",
            FieldSchema::required(FieldType::String)
                .with_validator(ValidatorFn::LinuxName)
                .force_new(),
        )
        .field(
            "resource_group_name",
            FieldSchema::required(FieldType::String)
                .with_validator(ValidatorFn::NoEmptyStrings)
                .force_new(),
        )
        .field(
            "location",
            FieldSchema::required(FieldType::String)
                .with_validator(ValidatorFn::NoEmptyStrings)
                .force_new(),
        )
        .field(
            "admin_username",
            FieldSchema::required(FieldType::String).with_validator(ValidatorFn::NoEmptyStrings),
        )
        .field(
            "network_interface",
            FieldSchema::required(FieldType::block_list(network_interface_schema())),
        )
        .field(
            "os_disk",
            FieldSchema::required(FieldType::block_list(os_disk_schema())).with_max_items(1),
        )
        .field(
            "instances",
            FieldSchema::required(FieldType::Int).with_validator(ValidatorFn::IntAtLeast(0)),
        )
        .field(
            "sku",
            FieldSchema::required(FieldType::String).with_validator(ValidatorFn::NoEmptyStrings),
        )
        .field(
            "additional_capabilities",
            FieldSchema::optional(FieldType::block_list(
                Schema::new().field(
                    "ultra_ssd_enabled",
                    FieldSchema::optional(FieldType::Bool).with_default(false),
                ),
            ))
            .with_max_items(1),
        )
        .field(
            "custom_data",
            FieldSchema::optional(FieldType::String)
                .with_validator(ValidatorFn::Base64)
                .force_new()
                .sensitive(),
        )
        .field(
            "do_not_run_extensions_on_overprovisioned_machines",
            FieldSchema::optional(FieldType::Bool).with_default(false),
        )
        .field(
            "eviction_policy",
            FieldSchema::optional(FieldType::String)
                .with_validator(ValidatorFn::StringInSlice(EvictionPolicy::VARIANTS))
                .force_new(),
        )
        .field(
            "overprovision",
            FieldSchema::optional(FieldType::Bool).with_default(false),
        )
        .field(
            "priority",
            FieldSchema::optional(FieldType::String)
                .with_default(Priority::Regular.to_string())
                .with_validator(ValidatorFn::StringInSlice(Priority::VARIANTS))
                .force_new(),
        )
        .field(
            "provision_vm_agent",
            FieldSchema::optional(FieldType::Bool)
                .with_default(true)
                .force_new(),
        )
        .field(
            "proximity_placement_group_id",
            FieldSchema::optional(FieldType::String).with_validator(ValidatorFn::ResourceId),
        )
        .field(
            "single_placement_group",
            FieldSchema::optional(FieldType::Bool).with_default(false),
        )
        .field(
            "source_image_id",
            FieldSchema::optional(FieldType::String).with_validator(ValidatorFn::ResourceId),
        )
        .field(
            "source_image_reference",
            FieldSchema::optional(FieldType::block_list(source_image_reference_schema()))
                .with_max_items(1)
                .conflicts_with(&["source_image_id"]),
        )
        .field("tags", FieldSchema::optional(FieldType::Map))
        .field(
            "upgrade_mode",
            FieldSchema::optional(FieldType::String)
                .with_default(UpgradeMode::Manual.to_string())
                .with_validator(ValidatorFn::StringInSlice(UpgradeMode::VARIANTS)),
        )
        .field(
            "automatic_os_upgrade_policy",
            FieldSchema::optional(FieldType::block_list(automatic_os_upgrade_policy_schema()))
                .with_max_items(1),
        )
        .field(
            "rolling_upgrade_policy",
            FieldSchema::optional(FieldType::block_list(rolling_upgrade_policy_schema()))
                .with_max_items(1),
        )
        .field(
            "zone_balance",
            FieldSchema::optional(FieldType::Bool)
                .with_default(false)
                .force_new(),
        )
        .field(
            "zones",
            FieldSchema::optional(FieldType::string_list()).force_new(),
        )
        .field("unique_id", FieldSchema::computed(FieldType::String));

    match os_type {
        OperatingSystemType::Linux => linux_fields(schema),
        OperatingSystemType::Windows => windows_fields(schema),
    }
}

fn linux_fields(schema: Schema) -> Schema {
    schema
        .field(
            "admin_password",
            FieldSchema::optional(FieldType::String).sensitive(),
        )
        .field(
            "admin_ssh_key",
            FieldSchema::optional(FieldType::block_set(
                Schema::new()
                    .field(
                        "username",
                        FieldSchema::required(FieldType::String)
                            .with_validator(ValidatorFn::NoEmptyStrings),
                    )
                    .field(
                        "public_key",
                        FieldSchema::required(FieldType::String)
                            .with_validator(ValidatorFn::NoEmptyStrings),
                    ),
            )),
        )
        .field(
            "computer_name_prefix",
            // The API reuses the scale set name when no prefix is given
            FieldSchema::optional_computed(FieldType::String)
                .with_validator(ValidatorFn::LinuxName)
                .force_new(),
        )
        .field(
            "disable_password_authentication",
            FieldSchema::optional(FieldType::Bool).with_default(true),
        )
}

fn windows_fields(schema: Schema) -> Schema {
    schema
        .field(
            "admin_password",
            FieldSchema::required(FieldType::String)
                .with_validator(ValidatorFn::NoEmptyStrings)
                .force_new()
                .sensitive(),
        )
        .field(
            "computer_name_prefix",
            FieldSchema::optional_computed(FieldType::String)
                .with_validator(ValidatorFn::WindowsComputerNamePrefix)
                .force_new(),
        )
        .field(
            "enable_automatic_updates",
            FieldSchema::optional(FieldType::Bool).with_default(true),
        )
        .field("timezone", FieldSchema::optional(FieldType::String))
}

fn network_interface_schema() -> Schema {
    Schema::new()
        .field(
            "name",
            FieldSchema::required(FieldType::String).with_validator(ValidatorFn::NoEmptyStrings),
        )
        .field(
            "dns_servers",
            FieldSchema::optional(FieldType::list(
                FieldSchema::elem(FieldType::String).with_validator(ValidatorFn::NoEmptyStrings),
            )),
        )
        .field(
            "enable_accelerated_networking",
            FieldSchema::optional(FieldType::Bool).with_default(false),
        )
        .field(
            "enable_ip_forwarding",
            FieldSchema::optional(FieldType::Bool).with_default(false),
        )
        .field(
            "network_security_group_id",
            FieldSchema::optional(FieldType::String)
                .with_validator(ValidatorFn::ResourceIdOrEmpty),
        )
        .field(
            "primary",
            FieldSchema::optional(FieldType::Bool).with_default(false),
        )
        .field(
            "ip_configuration",
            FieldSchema::required(FieldType::block_list(ip_configuration_schema())),
        )
}

fn ip_configuration_schema() -> Schema {
    Schema::new()
        .field(
            "name",
            FieldSchema::required(FieldType::String).with_validator(ValidatorFn::NoEmptyStrings),
        )
        .field(
            "subnet_id",
            FieldSchema::required(FieldType::String).with_validator(ValidatorFn::ResourceId),
        )
        .field(
            "application_gateway_backend_address_pool_ids",
            FieldSchema::optional(resource_id_set()),
        )
        .field(
            "application_security_group_ids",
            FieldSchema::optional(resource_id_set()).with_max_items(20),
        )
        .field(
            "load_balancer_backend_address_pool_ids",
            FieldSchema::optional(resource_id_set()),
        )
        .field(
            "load_balancer_inbound_nat_rules_ids",
            FieldSchema::optional(resource_id_set()),
        )
        .field(
            "primary",
            FieldSchema::optional(FieldType::Bool).with_default(false),
        )
        .field(
            "version",
            FieldSchema::optional(FieldType::String)
                .with_default(IpVersion::Ipv4.to_string())
                .with_validator(ValidatorFn::StringInSlice(IpVersion::VARIANTS)),
        )
        .field(
            "public_ip_address",
            FieldSchema::optional(FieldType::block_list(public_ip_address_schema())),
        )
}

fn public_ip_address_schema() -> Schema {
    Schema::new()
        .field(
            "name",
            FieldSchema::required(FieldType::String).with_validator(ValidatorFn::NoEmptyStrings),
        )
        .field(
            "domain_name_label",
            FieldSchema::optional(FieldType::String).with_validator(ValidatorFn::NoEmptyStrings),
        )
        .field(
            "idle_timeout_in_minutes",
            FieldSchema::optional_computed(FieldType::Int)
                .with_validator(ValidatorFn::IntBetween(4, 32)),
        )
        .field(
            "ip_tag",
            FieldSchema::optional(FieldType::block_list(
                Schema::new()
                    .field(
                        "tag",
                        FieldSchema::required(FieldType::String)
                            .with_validator(ValidatorFn::NoEmptyStrings),
                    )
                    .field(
                        "type",
                        FieldSchema::required(FieldType::String)
                            .with_validator(ValidatorFn::NoEmptyStrings),
                    ),
            )),
        )
        .field(
            "public_ip_prefix_id",
            FieldSchema::optional(FieldType::String)
                .with_validator(ValidatorFn::ResourceIdOrEmpty),
        )
}

fn os_disk_schema() -> Schema {
    Schema::new()
        .field(
            "caching",
            FieldSchema::required(FieldType::String)
                .with_validator(ValidatorFn::StringInSlice(CachingType::VARIANTS)),
        )
        .field(
            "storage_account_type",
            FieldSchema::required(FieldType::String)
                .with_validator(ValidatorFn::StringInSlice(StorageAccountType::VARIANTS)),
        )
        .field(
            "diff_disk_settings",
            FieldSchema::optional(FieldType::block_list(
                Schema::new().field(
                    "option",
                    FieldSchema::required(FieldType::String)
                        .with_validator(ValidatorFn::StringInSlice(DiffDiskOption::VARIANTS)),
                ),
            ))
            .with_max_items(1)
            .force_new(),
        )
        .field(
            "disk_size_gb",
            FieldSchema::optional_computed(FieldType::Int)
                .with_validator(ValidatorFn::IntBetween(0, 1023)),
        )
        .field(
            "write_accelerator_enabled",
            FieldSchema::optional(FieldType::Bool).with_default(false),
        )
}

fn source_image_reference_schema() -> Schema {
    let required = || FieldSchema::required(FieldType::String);

    Schema::new()
        .field("publisher", required())
        .field("offer", required())
        .field("sku", required())
        .field("version", required())
}

fn automatic_os_upgrade_policy_schema() -> Schema {
    Schema::new()
        .field(
            "disable_automatic_rollback",
            FieldSchema::required(FieldType::Bool),
        )
        .field(
            "enable_automatic_os_upgrade",
            FieldSchema::required(FieldType::Bool),
        )
}

fn rolling_upgrade_policy_schema() -> Schema {
    Schema::new()
        .field(
            "max_batch_instance_percent",
            FieldSchema::required(FieldType::Int),
        )
        .field(
            "max_unhealthy_instance_percent",
            FieldSchema::required(FieldType::Int),
        )
        .field(
            "max_unhealthy_upgraded_instance_percent",
            FieldSchema::required(FieldType::Int),
        )
        .field(
            "pause_time_between_batches",
            FieldSchema::required(FieldType::String),
        )
        .field(
            "health_probe_id",
            FieldSchema::required(FieldType::String).with_validator(ValidatorFn::ResourceId),
        )
}

fn resource_id_set() -> FieldType {
    FieldType::set(FieldSchema::elem(FieldType::String).with_validator(ValidatorFn::ResourceId))
}
