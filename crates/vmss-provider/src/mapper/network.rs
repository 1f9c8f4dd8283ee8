use super::{
    Result, flatten_enum, flatten_id, flatten_ids, optional_enum, optional_i32, sub_resource,
    sub_resources,
};
use crate::{
    model::{
        IpConfiguration, IpConfigurationProperties, IpTag, NetworkInterfaceConfiguration,
        NetworkInterfaceConfigurationProperties, NetworkInterfaceDnsSettings,
        PublicIpAddressConfiguration, PublicIpAddressConfigurationProperties,
        PublicIpAddressDnsSettings,
    },
    value::{Block, Value},
};

pub(super) fn expand_network_interfaces(
    input: &[&Block],
) -> Result<Vec<NetworkInterfaceConfiguration>> {
    input
        .iter()
        .copied()
        .map(expand_network_interface)
        .collect()
}

fn expand_network_interface(raw: &Block) -> Result<NetworkInterfaceConfiguration> {
    let dns_servers = raw
        .strings("dns_servers")?
        .into_iter()
        .map(str::to_owned)
        .collect();

    let ip_configurations = raw
        .blocks("ip_configuration")?
        .into_iter()
        .map(expand_ip_configuration)
        .collect::<Result<Vec<_>>>()?;

    Ok(NetworkInterfaceConfiguration {
        name: Some(raw.required_str("name")?.to_owned()),
        properties: Some(NetworkInterfaceConfigurationProperties {
            primary: Some(raw.bool_or("primary", false)?),
            enable_accelerated_networking: Some(raw.bool_or("enable_accelerated_networking", false)?),
            enable_ip_forwarding: Some(raw.bool_or("enable_ip_forwarding", false)?),
            network_security_group: sub_resource(raw.optional_str("network_security_group_id")?),
            dns_settings: Some(NetworkInterfaceDnsSettings {
                dns_servers: Some(dns_servers),
            }),
            ip_configurations: Some(ip_configurations),
        }),
    })
}

fn expand_ip_configuration(raw: &Block) -> Result<IpConfiguration> {
    let public_ip_address_configuration = raw
        .first_block("public_ip_address")?
        .map(expand_public_ip_address)
        .transpose()?;

    Ok(IpConfiguration {
        name: Some(raw.required_str("name")?.to_owned()),
        properties: Some(IpConfigurationProperties {
            subnet: sub_resource(Some(raw.required_str("subnet_id")?)),
            primary: Some(raw.bool_or("primary", false)?),
            public_ip_address_configuration,
            private_ip_address_version: Some(optional_enum(raw, "version")?.unwrap_or_default()),
            application_gateway_backend_address_pools: sub_resources(
                &raw.strings("application_gateway_backend_address_pool_ids")?,
            ),
            application_security_groups: sub_resources(
                &raw.strings("application_security_group_ids")?,
            ),
            load_balancer_backend_address_pools: sub_resources(
                &raw.strings("load_balancer_backend_address_pool_ids")?,
            ),
            load_balancer_inbound_nat_pools: sub_resources(
                &raw.strings("load_balancer_inbound_nat_rules_ids")?,
            ),
        }),
    })
}

fn expand_public_ip_address(raw: &Block) -> Result<PublicIpAddressConfiguration> {
    let ip_tags = raw
        .blocks("ip_tag")?
        .into_iter()
        .map(|tag| -> Result<IpTag> {
            Ok(IpTag {
                ip_tag_type: Some(tag.required_str("type")?.to_owned()),
                tag: Some(tag.required_str("tag")?.to_owned()),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let dns_settings = raw
        .optional_str("domain_name_label")?
        .map(|label| PublicIpAddressDnsSettings {
            domain_name_label: Some(label.to_owned()),
        });

    Ok(PublicIpAddressConfiguration {
        name: Some(raw.required_str("name")?.to_owned()),
        properties: Some(PublicIpAddressConfigurationProperties {
            idle_timeout_in_minutes: optional_i32(raw, "idle_timeout_in_minutes")?,
            dns_settings,
            ip_tags: (!ip_tags.is_empty()).then_some(ip_tags),
            public_ip_prefix: sub_resource(raw.optional_str("public_ip_prefix_id")?),
        }),
    })
}

pub(super) fn flatten_network_interfaces(
    input: Option<&Vec<NetworkInterfaceConfiguration>>,
) -> Value {
    Value::List(
        input
            .into_iter()
            .flatten()
            .map(|nic| Value::Block(flatten_network_interface(nic)))
            .collect(),
    )
}

fn flatten_network_interface(input: &NetworkInterfaceConfiguration) -> Block {
    let properties = input.properties.as_ref();

    let dns_servers = properties
        .and_then(|props| props.dns_settings.as_ref())
        .and_then(|settings| settings.dns_servers.as_ref());

    let ip_configurations = properties
        .and_then(|props| props.ip_configurations.as_ref())
        .into_iter()
        .flatten()
        .map(|config| Value::Block(flatten_ip_configuration(config)))
        .collect::<Vec<_>>();

    Block::new()
        .with("name", input.name.clone().unwrap_or_default())
        .with("dns_servers", Value::string_list(dns_servers.into_iter().flatten()))
        .with(
            "enable_accelerated_networking",
            properties
                .and_then(|props| props.enable_accelerated_networking)
                .unwrap_or_default(),
        )
        .with(
            "enable_ip_forwarding",
            properties
                .and_then(|props| props.enable_ip_forwarding)
                .unwrap_or_default(),
        )
        .with("ip_configuration", ip_configurations)
        .with(
            "network_security_group_id",
            flatten_id(properties.and_then(|props| props.network_security_group.as_ref())),
        )
        .with(
            "primary",
            properties.and_then(|props| props.primary).unwrap_or_default(),
        )
}

fn flatten_ip_configuration(input: &IpConfiguration) -> Block {
    let properties = input.properties.as_ref();

    let public_ip_addresses = properties
        .and_then(|props| props.public_ip_address_configuration.as_ref())
        .map(flatten_public_ip_address)
        .map_or_else(Value::empty_list, Value::single);

    Block::new()
        .with("name", input.name.clone().unwrap_or_default())
        .with(
            "primary",
            properties.and_then(|props| props.primary).unwrap_or_default(),
        )
        .with("public_ip_address", public_ip_addresses)
        .with(
            "subnet_id",
            flatten_id(properties.and_then(|props| props.subnet.as_ref())),
        )
        .with(
            "version",
            flatten_enum(properties.and_then(|props| props.private_ip_address_version.as_ref())),
        )
        .with(
            "application_gateway_backend_address_pool_ids",
            flatten_ids(
                properties.and_then(|props| props.application_gateway_backend_address_pools.as_ref()),
            ),
        )
        .with(
            "application_security_group_ids",
            flatten_ids(properties.and_then(|props| props.application_security_groups.as_ref())),
        )
        .with(
            "load_balancer_backend_address_pool_ids",
            flatten_ids(
                properties.and_then(|props| props.load_balancer_backend_address_pools.as_ref()),
            ),
        )
        .with(
            "load_balancer_inbound_nat_rules_ids",
            flatten_ids(properties.and_then(|props| props.load_balancer_inbound_nat_pools.as_ref())),
        )
}

fn flatten_public_ip_address(input: &PublicIpAddressConfiguration) -> Block {
    let properties = input.properties.as_ref();

    let ip_tags = properties
        .and_then(|props| props.ip_tags.as_ref())
        .into_iter()
        .flatten()
        .map(|tag| {
            Value::Block(
                Block::new()
                    .with("tag", tag.tag.clone().unwrap_or_default())
                    .with("type", tag.ip_tag_type.clone().unwrap_or_default()),
            )
        })
        .collect::<Vec<_>>();

    Block::new()
        .with("name", input.name.clone().unwrap_or_default())
        .with(
            "domain_name_label",
            properties
                .and_then(|props| props.dns_settings.as_ref())
                .and_then(|settings| settings.domain_name_label.clone())
                .unwrap_or_default(),
        )
        .with(
            "idle_timeout_in_minutes",
            properties
                .and_then(|props| props.idle_timeout_in_minutes)
                .unwrap_or_default(),
        )
        .with("ip_tag", ip_tags)
        .with(
            "public_ip_prefix_id",
            flatten_id(properties.and_then(|props| props.public_ip_prefix.as_ref())),
        )
}
