//! The OS profile and its operating system specific adapters.
//!
//! The shared fields are mapped here. Everything that only exists for one
//! operating system is delegated to the [`linux`] or [`windows`] adapter.

use super::Result;
use crate::{
    model::{OperatingSystemType, OsProfile},
    value::Block,
};

mod linux;
mod windows;

pub use linux::ssh_key_path;

/// The computer name prefix defaults to the name of the scale set.
pub(super) fn expand_os_profile(
    os_type: OperatingSystemType,
    name: &str,
    config: &Block,
) -> Result<OsProfile> {
    let admin_password = config.optional_str("admin_password")?;
    let computer_name_prefix = config.optional_str("computer_name_prefix")?.unwrap_or(name);

    let mut profile = OsProfile {
        computer_name_prefix: Some(computer_name_prefix.to_owned()),
        admin_username: Some(config.required_str("admin_username")?.to_owned()),
        admin_password: admin_password.map(str::to_owned),
        custom_data: config.optional_str("custom_data")?.map(str::to_owned),
        windows_configuration: None,
        linux_configuration: None,
    };

    match os_type {
        OperatingSystemType::Linux => {
            profile.linux_configuration = Some(linux::expand_linux_configuration(
                config,
                admin_password.is_some(),
            )?);
        }
        OperatingSystemType::Windows => {
            profile.windows_configuration = Some(windows::expand_windows_configuration(config)?);
        }
    }

    Ok(profile)
}

/// Writes the OS profile fields into `block`. The admin password and custom
/// data are never returned by the API and are left untouched.
pub(super) fn flatten_os_profile(
    os_type: OperatingSystemType,
    input: Option<&OsProfile>,
    block: &mut Block,
) -> Result<()> {
    block.insert(
        "admin_username",
        input
            .and_then(|profile| profile.admin_username.clone())
            .unwrap_or_default(),
    );
    block.insert(
        "computer_name_prefix",
        input
            .and_then(|profile| profile.computer_name_prefix.clone())
            .unwrap_or_default(),
    );

    match os_type {
        OperatingSystemType::Linux => linux::flatten_linux_configuration(
            input.and_then(|profile| profile.linux_configuration.as_ref()),
            block,
        ),
        OperatingSystemType::Windows => {
            windows::flatten_windows_configuration(
                input.and_then(|profile| profile.windows_configuration.as_ref()),
                block,
            );
            Ok(())
        }
    }
}
