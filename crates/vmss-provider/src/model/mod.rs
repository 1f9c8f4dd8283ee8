//! Typed request and response bodies of the compute management API for
//! virtual machine scale sets.
//!
//! Every field is optional. The API omits fields with server-side defaults,
//! and an absent field must stay distinguishable from one set to its zero
//! value.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

mod enums;
mod update;

pub use enums::*;
pub use update::*;

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineScaleSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<Sku>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub zones: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<VirtualMachineScaleSetProperties>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sku {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<i64>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineScaleSetProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upgrade_policy: Option<UpgradePolicy>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub virtual_machine_profile: Option<VirtualMachineProfile>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub overprovision: Option<bool>,

    #[serde(
        rename = "doNotRunExtensionsOnOverprovisionedVMs",
        skip_serializing_if = "Option::is_none"
    )]
    pub do_not_run_extensions_on_overprovisioned_vms: Option<bool>,

    /// Assigned by the API, never sent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub single_placement_group: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_balance: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub proximity_placement_group: Option<SubResource>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_capabilities: Option<AdditionalCapabilities>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradePolicy {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<UpgradeMode>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rolling_upgrade_policy: Option<RollingUpgradePolicy>,

    #[serde(
        rename = "automaticOSUpgradePolicy",
        skip_serializing_if = "Option::is_none"
    )]
    pub automatic_os_upgrade_policy: Option<AutomaticOsUpgradePolicy>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollingUpgradePolicy {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_batch_instance_percent: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_unhealthy_instance_percent: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_unhealthy_upgraded_instance_percent: Option<i32>,

    /// An ISO 8601 duration, like `PT0S`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pause_time_between_batches: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomaticOsUpgradePolicy {
    #[serde(
        rename = "enableAutomaticOSUpgrade",
        skip_serializing_if = "Option::is_none"
    )]
    pub enable_automatic_os_upgrade: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_automatic_rollback: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os_profile: Option<OsProfile>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_profile: Option<StorageProfile>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_profile: Option<NetworkProfile>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub eviction_policy: Option<EvictionPolicy>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OsProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub computer_name_prefix: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_username: Option<String>,

    /// Write-only, the API never returns it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_password: Option<String>,

    /// Write-only, the API never returns it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub windows_configuration: Option<WindowsConfiguration>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub linux_configuration: Option<LinuxConfiguration>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinuxConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_password_authentication: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssh: Option<SshConfiguration>,

    #[serde(rename = "provisionVMAgent", skip_serializing_if = "Option::is_none")]
    pub provision_vm_agent: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SshConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_keys: Option<Vec<SshPublicKey>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SshPublicKey {
    /// The file on the instance the key is written to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_data: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowsConfiguration {
    #[serde(rename = "provisionVMAgent", skip_serializing_if = "Option::is_none")]
    pub provision_vm_agent: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_automatic_updates: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_reference: Option<ImageReference>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub os_disk: Option<OsDisk>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_disks: Option<Vec<DataDisk>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageReference {
    /// A custom image, mutually exclusive with the marketplace fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OsDisk {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub caching: Option<CachingType>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_accelerator_enabled: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_option: Option<DiskCreateOption>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff_disk_settings: Option<DiffDiskSettings>,

    #[serde(rename = "diskSizeGB", skip_serializing_if = "Option::is_none")]
    pub disk_size_gb: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub os_type: Option<OperatingSystemType>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub managed_disk: Option<ManagedDiskParameters>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataDisk {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lun: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub caching: Option<CachingType>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_option: Option<DiskCreateOption>,

    #[serde(rename = "diskSizeGB", skip_serializing_if = "Option::is_none")]
    pub disk_size_gb: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub managed_disk: Option<ManagedDiskParameters>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffDiskSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option: Option<DiffDiskOption>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedDiskParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_account_type: Option<StorageAccountType>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkProfile {
    /// The load balancer probe used to determine instance health during
    /// rolling upgrades.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_probe: Option<SubResource>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_interface_configurations: Option<Vec<NetworkInterfaceConfiguration>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterfaceConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<NetworkInterfaceConfigurationProperties>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterfaceConfigurationProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_accelerated_networking: Option<bool>,

    #[serde(rename = "enableIPForwarding", skip_serializing_if = "Option::is_none")]
    pub enable_ip_forwarding: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_security_group: Option<SubResource>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_settings: Option<NetworkInterfaceDnsSettings>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_configurations: Option<Vec<IpConfiguration>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterfaceDnsSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_servers: Option<Vec<String>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IpConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<IpConfigurationProperties>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IpConfigurationProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet: Option<SubResource>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary: Option<bool>,

    #[serde(
        rename = "publicIPAddressConfiguration",
        skip_serializing_if = "Option::is_none"
    )]
    pub public_ip_address_configuration: Option<PublicIpAddressConfiguration>,

    #[serde(
        rename = "privateIPAddressVersion",
        skip_serializing_if = "Option::is_none"
    )]
    pub private_ip_address_version: Option<IpVersion>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_gateway_backend_address_pools: Option<Vec<SubResource>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_security_groups: Option<Vec<SubResource>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_balancer_backend_address_pools: Option<Vec<SubResource>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_balancer_inbound_nat_pools: Option<Vec<SubResource>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicIpAddressConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<PublicIpAddressConfigurationProperties>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicIpAddressConfigurationProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle_timeout_in_minutes: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_settings: Option<PublicIpAddressDnsSettings>,

    #[serde(rename = "ipTags", skip_serializing_if = "Option::is_none")]
    pub ip_tags: Option<Vec<IpTag>>,

    #[serde(rename = "publicIPPrefix", skip_serializing_if = "Option::is_none")]
    pub public_ip_prefix: Option<SubResource>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicIpAddressDnsSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_name_label: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IpTag {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_tag_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalCapabilities {
    #[serde(rename = "ultraSSDEnabled", skip_serializing_if = "Option::is_none")]
    pub ultra_ssd_enabled: Option<bool>,
}

/// A reference to another resource by its id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SubResource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl SubResource {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    #[test]
    fn deserialize_response() {
        let response = indoc! {r#"
            {
              "id": "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Compute/virtualMachineScaleSets/vmss",
              "name": "vmss",
              "location": "westeurope",
              "sku": { "name": "Standard_F2", "tier": "Standard", "capacity": 2 },
              "properties": {
                "uniqueId": "e8b4f2a4-0000-0000-0000-000000000000",
                "doNotRunExtensionsOnOverprovisionedVMs": false,
                "upgradePolicy": { "mode": "Manual" },
                "virtualMachineProfile": {
                  "storageProfile": {
                    "osDisk": { "caching": "ReadWrite", "diskSizeGB": 30, "managedDisk": { "storageAccountType": "Standard_LRS" } }
                  },
                  "networkProfile": {
                    "networkInterfaceConfigurations": [
                      { "name": "nic", "properties": { "primary": true, "enableIPForwarding": false } }
                    ]
                  }
                }
              }
            }
        "#};

        let vmss: VirtualMachineScaleSet = serde_json::from_str(response).unwrap();
        let properties = vmss.properties.unwrap();

        assert_eq!(vmss.sku.unwrap().capacity, Some(2));
        assert_eq!(properties.do_not_run_extensions_on_overprovisioned_vms, Some(false));
        assert_eq!(
            properties.upgrade_policy.unwrap().mode,
            Some(UpgradeMode::Manual)
        );

        let storage = properties
            .virtual_machine_profile
            .unwrap()
            .storage_profile
            .unwrap();
        let os_disk = storage.os_disk.unwrap();
        assert_eq!(os_disk.disk_size_gb, Some(30));
        assert_eq!(
            os_disk.managed_disk.unwrap().storage_account_type,
            Some(StorageAccountType::StandardLrs)
        );
    }

    #[test]
    fn absent_fields_are_not_serialized() {
        let body = VirtualMachineScaleSet {
            location: Some("westeurope".to_owned()),
            properties: Some(VirtualMachineScaleSetProperties {
                additional_capabilities: Some(AdditionalCapabilities {
                    ultra_ssd_enabled: Some(false),
                }),
                ..Default::default()
            }),
            ..Default::default()
        };

        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"location":"westeurope","properties":{"additionalCapabilities":{"ultraSSDEnabled":false}}}"#
        );
    }
}
