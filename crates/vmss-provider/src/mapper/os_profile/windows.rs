use crate::{mapper::Result, model::WindowsConfiguration, value::Block};

pub(super) fn expand_windows_configuration(config: &Block) -> Result<WindowsConfiguration> {
    // Windows instances cannot be provisioned without a password
    config.required_str("admin_password")?;

    Ok(WindowsConfiguration {
        provision_vm_agent: Some(config.bool_or("provision_vm_agent", true)?),
        enable_automatic_updates: Some(config.bool_or("enable_automatic_updates", true)?),
        time_zone: config.optional_str("timezone")?.map(str::to_owned),
    })
}

pub(super) fn flatten_windows_configuration(
    input: Option<&WindowsConfiguration>,
    block: &mut Block,
) {
    block.insert(
        "enable_automatic_updates",
        input
            .and_then(|windows| windows.enable_automatic_updates)
            .unwrap_or_default(),
    );
    block.insert(
        "provision_vm_agent",
        input
            .and_then(|windows| windows.provision_vm_agent)
            .unwrap_or_default(),
    );
    block.insert(
        "timezone",
        input
            .and_then(|windows| windows.time_zone.clone())
            .unwrap_or_default(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::ErrorKind, value::Value};

    #[test]
    fn defaults() {
        let config = Block::new().with("admin_password", "P@ssw0rd1234!");
        let windows = expand_windows_configuration(&config).unwrap();

        assert_eq!(windows, WindowsConfiguration {
            provision_vm_agent: Some(true),
            enable_automatic_updates: Some(true),
            time_zone: None,
        });
    }

    #[test]
    fn password_is_required() {
        let err = expand_windows_configuration(&Block::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidConfiguration);
    }

    #[test]
    fn timezone_round_trip() {
        let config = Block::new()
            .with("admin_password", "P@ssw0rd1234!")
            .with("timezone", "W. Europe Standard Time");

        let mut block = Block::new();
        flatten_windows_configuration(
            Some(&expand_windows_configuration(&config).unwrap()),
            &mut block,
        );

        assert_eq!(
            block.get("timezone"),
            Some(&Value::from("W. Europe Standard Time"))
        );
    }
}
