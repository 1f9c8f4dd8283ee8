use std::{error::Error as _, time::Duration};

use vmss_provider::{
    cli::ProviderOptions,
    lifecycle::{ErrorKind, ResourceData, ResourceState, ScaleSetResource, UpdateGroup},
    mapper,
    model::OperatingSystemType,
    operation::OperationContext,
    value::{Block, Value},
};

use crate::common::{Call, Completion, FakeScaleSets, SUBNET_ID, linux_config};

mod common;

fn resource() -> ScaleSetResource {
    ScaleSetResource::new(OperatingSystemType::Linux, ProviderOptions::default())
}

fn context() -> OperationContext {
    OperationContext::default().with_poll_interval(Duration::from_secs(1))
}

async fn created(client: &FakeScaleSets) -> ResourceData {
    let mut data = ResourceData::new(linux_config());
    resource()
        .create(client, &context(), &mut data)
        .await
        .unwrap();
    client.take_calls();
    data
}

#[tokio::test(start_paused = true)]
async fn create_password_scale_set() {
    let client = FakeScaleSets::default();
    let mut data = ResourceData::new(linux_config());

    resource()
        .create(&client, &context(), &mut data)
        .await
        .unwrap();

    let calls = client.take_calls();
    assert_eq!(calls.len(), 3, "{calls:?}");
    assert_eq!(calls[0], Call::Get);
    assert_eq!(calls[2], Call::Get);

    let Call::CreateOrUpdate(body) = &calls[1] else {
        panic!("expected a create call, got {:?}", calls[1]);
    };
    let profile = body
        .properties
        .as_ref()
        .and_then(|properties| properties.virtual_machine_profile.as_ref())
        .unwrap();
    assert_eq!(
        profile
            .os_profile
            .as_ref()
            .and_then(|os_profile| os_profile.admin_password.as_deref()),
        Some("P@ssw0rd1234!")
    );

    let interfaces = profile
        .network_profile
        .as_ref()
        .and_then(|network| network.network_interface_configurations.as_ref())
        .unwrap();
    assert_eq!(interfaces.len(), 1);
    assert_eq!(
        interfaces[0]
            .properties
            .as_ref()
            .and_then(|properties| properties.primary),
        Some(true)
    );

    assert_eq!(data.lifecycle, ResourceState::Present);
    let id = data.id.as_ref().unwrap();
    assert_eq!(id.name(), "example-vmss");
    assert_eq!(id.resource_group(), "rg");

    let state = &data.state;
    assert_eq!(state.get("admin_username"), Some(&Value::from("adminuser")));
    assert_eq!(state.get("sku"), Some(&Value::from("Standard_F2")));
    assert_eq!(state.get("instances"), Some(&Value::Int(1)));
    assert_eq!(
        state.get("admin_password"),
        Some(&Value::from("P@ssw0rd1234!"))
    );
    assert_eq!(
        state.blocks("network_interface").unwrap()[0]
            .blocks("ip_configuration")
            .unwrap()[0]
            .required_str("subnet_id")
            .unwrap(),
        SUBNET_ID
    );
}

#[tokio::test(start_paused = true)]
async fn create_existing_scale_set_fails() {
    let client = FakeScaleSets::default();
    let existing =
        mapper::expand_scale_set(OperatingSystemType::Linux, "example-vmss", &linux_config())
            .unwrap();
    client.insert("rg", "example-vmss", existing);

    let mut data = ResourceData::new(linux_config());
    let err = resource()
        .create(&client, &context(), &mut data)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    assert_eq!(client.take_calls(), vec![Call::Get]);
    assert_eq!(data.lifecycle, ResourceState::NotExists);
    assert_eq!(data.id, None);
}

#[tokio::test(start_paused = true)]
async fn create_existing_scale_set_without_check() {
    let client = FakeScaleSets::default();
    let existing =
        mapper::expand_scale_set(OperatingSystemType::Linux, "example-vmss", &linux_config())
            .unwrap();
    client.insert("rg", "example-vmss", existing);

    let resource = ScaleSetResource::new(OperatingSystemType::Linux, ProviderOptions {
        disable_import_existing_check: true,
        ..Default::default()
    });
    let mut data = ResourceData::new(linux_config());
    resource
        .create(&client, &context(), &mut data)
        .await
        .unwrap();

    let calls = client.take_calls();
    assert!(matches!(calls[0], Call::CreateOrUpdate(_)), "{calls:?}");
    assert_eq!(data.lifecycle, ResourceState::Present);
}

#[tokio::test(start_paused = true)]
async fn invalid_configuration_makes_no_calls() {
    let client = FakeScaleSets::default();
    let config = linux_config().with("upgrade_mode", "Rolling");
    let mut data = ResourceData::new(config);

    let err = resource()
        .create(&client, &context(), &mut data)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidCombination);
    assert!(client.take_calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn read_missing_scale_set_clears_state() {
    let client = FakeScaleSets::default();
    let mut data = created(&client).await;

    client.remove("rg", "example-vmss");
    resource()
        .read(&client, &context(), &mut data)
        .await
        .unwrap();

    assert_eq!(data.lifecycle, ResourceState::Deleted);
    assert_eq!(data.id, None);
    assert_eq!(data.state, Block::new());
}

#[tokio::test(start_paused = true)]
async fn read_detects_drift() {
    let client = FakeScaleSets::default();
    let mut data = created(&client).await;

    let mut remote = client.stored("rg", "example-vmss").unwrap();
    remote.sku.as_mut().unwrap().capacity = Some(4);
    client.insert("rg", "example-vmss", remote);

    resource()
        .read(&client, &context(), &mut data)
        .await
        .unwrap();

    assert_eq!(data.state.get("instances"), Some(&Value::Int(4)));
    assert_eq!(
        data.state.get("admin_password"),
        Some(&Value::from("P@ssw0rd1234!"))
    );
    assert!(data.has_change(&resource().schema(), "instances"));
}

#[tokio::test(start_paused = true)]
async fn update_sends_changed_groups_only() {
    let client = FakeScaleSets::default();
    let mut data = created(&client).await;

    data.config = linux_config()
        .with("instances", 3)
        .with("tags", Block::new().with("environment", "production"));
    assert_eq!(data.changed_groups(&resource().schema()), vec![UpdateGroup::Tags, UpdateGroup::Scale]);

    resource()
        .update(&client, &context(), &mut data)
        .await
        .unwrap();

    let calls = client.take_calls();
    let Call::Update(body) = &calls[0] else {
        panic!("expected an update call, got {calls:?}");
    };
    assert_eq!(body.sku.as_ref().and_then(|sku| sku.capacity), Some(3));
    assert_eq!(
        body.tags.as_ref().and_then(|tags| tags.get("environment")),
        Some(&"production".to_owned())
    );
    assert_eq!(body.properties, None);

    assert_eq!(data.lifecycle, ResourceState::Present);
    assert_eq!(data.state.get("instances"), Some(&Value::Int(3)));
    assert!(data.changed_groups(&resource().schema()).is_empty());
}

#[tokio::test(start_paused = true)]
async fn update_without_changes_makes_no_calls() {
    let client = FakeScaleSets::default();
    let mut data = created(&client).await;

    assert!(data.changed_groups(&resource().schema()).is_empty());
    resource()
        .update(&client, &context(), &mut data)
        .await
        .unwrap();

    assert!(client.take_calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn server_assigned_disk_size_is_not_a_change() {
    let client = FakeScaleSets::default();
    let mut data = created(&client).await;

    let mut remote = client.stored("rg", "example-vmss").unwrap();
    remote
        .properties
        .as_mut()
        .and_then(|properties| properties.virtual_machine_profile.as_mut())
        .and_then(|profile| profile.storage_profile.as_mut())
        .and_then(|storage| storage.os_disk.as_mut())
        .unwrap()
        .disk_size_gb = Some(30);
    client.insert("rg", "example-vmss", remote);

    resource()
        .read(&client, &context(), &mut data)
        .await
        .unwrap();
    client.take_calls();

    assert_eq!(
        data.state.blocks("os_disk").unwrap()[0].get("disk_size_gb"),
        Some(&Value::Int(30))
    );
    assert!(data.changed_groups(&resource().schema()).is_empty());

    resource()
        .update(&client, &context(), &mut data)
        .await
        .unwrap();
    assert!(client.take_calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn cancelled_context_sends_nothing() {
    let client = FakeScaleSets::default();
    let context = context();
    context.cancellation().cancel();
    let mut data = ResourceData::new(linux_config());

    let err = resource()
        .create(&client, &context, &mut data)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert!(client.take_calls().is_empty());
    assert_eq!(client.stored("rg", "example-vmss"), None);
    assert_eq!(data.lifecycle, ResourceState::NotExists);
}

#[tokio::test(start_paused = true)]
async fn expired_context_does_not_update() {
    let client = FakeScaleSets::default();
    let mut data = created(&client).await;
    data.config = linux_config().with("instances", 3);

    let context = context().with_timeout(Duration::ZERO);
    let err = resource()
        .update(&client, &context, &mut data)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::DeadlineExceeded);
    assert!(client.take_calls().is_empty());
    assert_eq!(data.lifecycle, ResourceState::Present);

    let stored = client.stored("rg", "example-vmss").unwrap();
    assert_eq!(stored.sku.and_then(|sku| sku.capacity), Some(1));
}

#[tokio::test(start_paused = true)]
async fn cancelled_read_keeps_state() {
    let client = FakeScaleSets::default();
    let mut data = created(&client).await;
    let before = data.clone();

    let context = context();
    context.cancellation().cancel();
    let err = resource()
        .read(&client, &context, &mut data)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert!(client.take_calls().is_empty());
    assert_eq!(data, before);
}

#[tokio::test(start_paused = true)]
async fn delete_scale_set() {
    let client = FakeScaleSets::default();
    let mut data = created(&client).await;

    resource()
        .delete(&client, &context(), &mut data)
        .await
        .unwrap();

    assert_eq!(client.take_calls(), vec![Call::Get, Call::Delete]);
    assert_eq!(client.stored("rg", "example-vmss"), None);
    assert_eq!(data.lifecycle, ResourceState::Deleted);
    assert_eq!(data.id, None);
}

#[tokio::test(start_paused = true)]
async fn delete_missing_scale_set_is_idempotent() {
    let client = FakeScaleSets::default();
    let mut data = created(&client).await;
    client.remove("rg", "example-vmss");

    resource()
        .delete(&client, &context(), &mut data)
        .await
        .unwrap();

    assert_eq!(client.take_calls(), vec![Call::Get]);
    assert_eq!(data.lifecycle, ResourceState::Deleted);
}

#[tokio::test(start_paused = true)]
async fn failed_operation_keeps_remote_message() {
    let client =
        FakeScaleSets::default().with_completion(Completion::Fail("Allocation failed.".to_owned()));
    let mut data = ResourceData::new(linux_config());

    let err = resource()
        .create(&client, &context(), &mut data)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RemoteOperationFailed);
    assert_eq!(
        err.source().unwrap().to_string(),
        "operation failed: Allocation failed."
    );
    assert_eq!(data.lifecycle, ResourceState::Creating);
}

#[tokio::test(start_paused = true)]
async fn cancelled_create() {
    let client = FakeScaleSets::default().with_completion(Completion::Never);
    let context = context();
    let mut data = ResourceData::new(linux_config());

    let token = context.cancellation().clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(30)).await;
        token.cancel();
    });

    let err = resource()
        .create(&client, &context, &mut data)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert_eq!(data.id, None);
    assert_eq!(data.state, Block::new());
}

#[tokio::test(start_paused = true)]
async fn delete_past_deadline() {
    let client = FakeScaleSets::default();
    let mut data = created(&client).await;

    let client = client.with_completion(Completion::Never);
    let context = context().with_timeout(Duration::from_secs(60));

    let err = resource()
        .delete(&client, &context, &mut data)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::DeadlineExceeded);
    assert_eq!(data.lifecycle, ResourceState::Deleting);
}
