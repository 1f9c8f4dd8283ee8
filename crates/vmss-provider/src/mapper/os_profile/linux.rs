use snafu::{OptionExt as _, ensure};

use crate::{
    mapper::{MissingAuthenticationSnafu, Result, UnexpectedSshKeyPathSnafu},
    model::{LinuxConfiguration, SshConfiguration, SshPublicKey},
    value::{Block, Value},
};

const HOME_PREFIX: &str = "/home/";
const AUTHORIZED_KEYS_SUFFIX: &str = "/.ssh/authorized_keys";

/// The file on each instance an admin ssh key of `username` is written to.
pub fn ssh_key_path(username: &str) -> String {
    format!("{HOME_PREFIX}{username}{AUTHORIZED_KEYS_SUFFIX}")
}

fn username_from_path(path: &str) -> Option<&str> {
    path.strip_prefix(HOME_PREFIX)?
        .strip_suffix(AUTHORIZED_KEYS_SUFFIX)
        .filter(|username| !username.is_empty() && !username.contains('/'))
}

pub(super) fn expand_linux_configuration(
    config: &Block,
    has_password: bool,
) -> Result<LinuxConfiguration> {
    let public_keys = expand_ssh_keys(&config.blocks("admin_ssh_key")?)?;
    let disable_password_authentication = config.bool_or("disable_password_authentication", true)?;

    ensure!(
        !disable_password_authentication || has_password || !public_keys.is_empty(),
        MissingAuthenticationSnafu
    );

    Ok(LinuxConfiguration {
        disable_password_authentication: Some(disable_password_authentication),
        ssh: Some(SshConfiguration {
            public_keys: Some(public_keys),
        }),
        provision_vm_agent: Some(config.bool_or("provision_vm_agent", true)?),
    })
}

fn expand_ssh_keys(input: &[&Block]) -> Result<Vec<SshPublicKey>> {
    input
        .iter()
        .map(|raw| -> Result<SshPublicKey> {
            Ok(SshPublicKey {
                path: Some(ssh_key_path(raw.required_str("username")?)),
                key_data: Some(raw.required_str("public_key")?.to_owned()),
            })
        })
        .collect()
}

pub(super) fn flatten_linux_configuration(
    input: Option<&LinuxConfiguration>,
    block: &mut Block,
) -> Result<()> {
    block.insert(
        "disable_password_authentication",
        input
            .and_then(|linux| linux.disable_password_authentication)
            .unwrap_or_default(),
    );
    block.insert(
        "provision_vm_agent",
        input
            .and_then(|linux| linux.provision_vm_agent)
            .unwrap_or_default(),
    );
    block.insert(
        "admin_ssh_key",
        flatten_ssh_keys(input.and_then(|linux| linux.ssh.as_ref()))?,
    );

    Ok(())
}

/// Fails if a key was written anywhere other than a user's
/// `authorized_keys` file, since the username could not be recovered.
fn flatten_ssh_keys(input: Option<&SshConfiguration>) -> Result<Value> {
    let keys = input
        .and_then(|ssh| ssh.public_keys.as_ref())
        .into_iter()
        .flatten()
        .map(|key| {
            let path = key.path.as_deref().unwrap_or_default();
            let username = username_from_path(path).context(UnexpectedSshKeyPathSnafu { path })?;

            Ok(Value::Block(
                Block::new()
                    .with("username", username)
                    .with("public_key", key.key_data.clone().unwrap_or_default()),
            ))
        })
        .collect::<Result<_>>()?;

    Ok(Value::Set(keys))
}
