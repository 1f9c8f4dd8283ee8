use super::{Result, flatten_enum, optional_enum, optional_i32, required_enum};
use crate::{
    model::{
        DiffDiskSettings, DiskCreateOption, ManagedDiskParameters, OperatingSystemType, OsDisk,
    },
    value::{Block, Value},
};

pub(super) fn expand_os_disk(raw: &Block, os_type: OperatingSystemType) -> Result<OsDisk> {
    let diff_disk_settings = raw
        .first_block("diff_disk_settings")?
        .map(|settings| -> Result<DiffDiskSettings> {
            Ok(DiffDiskSettings {
                option: optional_enum(settings, "option")?,
            })
        })
        .transpose()?;

    Ok(OsDisk {
        caching: Some(required_enum(raw, "caching")?),
        write_accelerator_enabled: Some(raw.bool_or("write_accelerator_enabled", false)?),
        // A size of 0 means the size of the source image is used
        disk_size_gb: optional_i32(raw, "disk_size_gb")?.filter(|size| *size > 0),
        diff_disk_settings,
        managed_disk: Some(ManagedDiskParameters {
            storage_account_type: Some(required_enum(raw, "storage_account_type")?),
        }),
        create_option: Some(DiskCreateOption::FromImage),
        os_type: Some(os_type),
        name: None,
    })
}

pub(super) fn flatten_os_disk(input: Option<&OsDisk>) -> Value {
    let Some(disk) = input else {
        return Value::empty_list();
    };

    let diff_disk_settings = disk
        .diff_disk_settings
        .as_ref()
        .map(|settings| Block::new().with("option", flatten_enum(settings.option.as_ref())))
        .map_or_else(Value::empty_list, Value::single);

    let storage_account_type = disk
        .managed_disk
        .as_ref()
        .and_then(|managed| managed.storage_account_type.as_ref());

    Value::single(
        Block::new()
            .with("caching", flatten_enum(disk.caching.as_ref()))
            .with("disk_size_gb", disk.disk_size_gb.unwrap_or_default())
            .with("diff_disk_settings", diff_disk_settings)
            .with("storage_account_type", flatten_enum(storage_account_type))
            .with(
                "write_accelerator_enabled",
                disk.write_accelerator_enabled.unwrap_or_default(),
            ),
    )
}
