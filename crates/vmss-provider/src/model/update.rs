use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{
    CachingType, ImageReference, LinuxConfiguration, ManagedDiskParameters,
    NetworkInterfaceConfiguration, Sku, SubResource, UpgradePolicy, WindowsConfiguration,
};

/// A partial update of an existing scale set. Every group left as `None` is
/// untouched by the API.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineScaleSetUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<Sku>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<UpdateProperties>,
}

impl VirtualMachineScaleSetUpdate {
    /// Returns `true` if the update would not change anything.
    pub fn is_empty(&self) -> bool {
        self.sku.is_none()
            && self.tags.is_none()
            && self.properties.as_ref().is_none_or(UpdateProperties::is_empty)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upgrade_policy: Option<UpgradePolicy>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub virtual_machine_profile: Option<UpdateVirtualMachineProfile>,
}

impl UpdateProperties {
    pub fn is_empty(&self) -> bool {
        self.upgrade_policy.is_none()
            && self
                .virtual_machine_profile
                .as_ref()
                .is_none_or(UpdateVirtualMachineProfile::is_empty)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVirtualMachineProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os_profile: Option<UpdateOsProfile>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_profile: Option<UpdateStorageProfile>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_profile: Option<UpdateNetworkProfile>,
}

impl UpdateVirtualMachineProfile {
    pub fn is_empty(&self) -> bool {
        self.os_profile.is_none() && self.storage_profile.is_none() && self.network_profile.is_none()
    }
}

/// The mutable subset of the OS profile. The admin username and the computer
/// name prefix cannot be changed after creation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOsProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub linux_configuration: Option<LinuxConfiguration>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub windows_configuration: Option<WindowsConfiguration>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStorageProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_reference: Option<ImageReference>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub os_disk: Option<UpdateOsDisk>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOsDisk {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caching: Option<CachingType>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_accelerator_enabled: Option<bool>,

    #[serde(rename = "diskSizeGB", skip_serializing_if = "Option::is_none")]
    pub disk_size_gb: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub managed_disk: Option<ManagedDiskParameters>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNetworkProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_probe: Option<SubResource>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_interface_configurations: Option<Vec<NetworkInterfaceConfiguration>>,
}
