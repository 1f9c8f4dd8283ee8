use serde::{Deserialize, Serialize};

/// How instances pick up changes to the scale set model.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Deserialize,
    Serialize,
    strum::Display,
    strum::EnumString,
    strum::VariantNames,
)]
pub enum UpgradeMode {
    Automatic,
    #[default]
    Manual,
    Rolling,
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Deserialize,
    Serialize,
    strum::Display,
    strum::EnumString,
    strum::VariantNames,
)]
pub enum CachingType {
    None,
    ReadOnly,
    ReadWrite,
}

/// Storage account types supported for OS disks. Ultra SSDs can only be
/// used for data disks.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Deserialize,
    Serialize,
    strum::Display,
    strum::EnumString,
    strum::VariantNames,
)]
pub enum StorageAccountType {
    #[serde(rename = "Premium_LRS")]
    #[strum(serialize = "Premium_LRS")]
    PremiumLrs,

    #[serde(rename = "Standard_LRS")]
    #[strum(serialize = "Standard_LRS")]
    StandardLrs,

    #[serde(rename = "StandardSSD_LRS")]
    #[strum(serialize = "StandardSSD_LRS")]
    StandardSsdLrs,
}

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Deserialize,
    Serialize,
    strum::Display,
    strum::EnumString,
    strum::VariantNames,
)]
pub enum IpVersion {
    #[default]
    #[serde(rename = "IPv4")]
    #[strum(serialize = "IPv4")]
    Ipv4,

    #[serde(rename = "IPv6")]
    #[strum(serialize = "IPv6")]
    Ipv6,
}

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Deserialize,
    Serialize,
    strum::Display,
    strum::EnumString,
    strum::VariantNames,
)]
pub enum Priority {
    Low,
    #[default]
    Regular,
}

/// What happens to low priority instances when they are evicted.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Deserialize,
    Serialize,
    strum::Display,
    strum::EnumString,
    strum::VariantNames,
)]
pub enum EvictionPolicy {
    Deallocate,
    Delete,
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Deserialize,
    Serialize,
    strum::Display,
    strum::EnumString,
    strum::VariantNames,
)]
pub enum DiffDiskOption {
    Local,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, strum::Display)]
pub enum DiskCreateOption {
    FromImage,
    Empty,
    Attach,
}

/// The operating system flavour of a scale set. It decides which OS specific
/// fields exist in the schema and which configuration block is sent.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Deserialize,
    Serialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum OperatingSystemType {
    #[default]
    Linux,
    Windows,
}
