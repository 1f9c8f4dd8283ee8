//! An in-memory stand-in for the remote compute API.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use indoc::formatdoc;
use vmss_provider::{
    client::{ApiError, LongRunningOperation, OperationStatus, ScaleSetsClient},
    identity::ScaleSetId,
    model::{
        OperatingSystemType, VirtualMachineScaleSet, VirtualMachineScaleSetUpdate,
    },
    schema,
    value::Block,
};

pub const SUBSCRIPTION_ID: &str = "00000000-0000-0000-0000-000000000000";
pub const SUBNET_ID: &str = "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/vnet/subnets/internal";

/// A password based Linux scale set with a single instance.
pub fn linux_config() -> Block {
    let tree: Block = serde_yaml::from_str(&formatdoc! {"
        name: example-vmss
        resource_group_name: rg
        location: westeurope
        sku: Standard_F2
        instances: 1
        admin_username: adminuser
        admin_password: P@ssw0rd1234!
        disable_password_authentication: false
        source_image_reference:
          - publisher: Canonical
            offer: UbuntuServer
            sku: 16.04-LTS
            version: latest
        os_disk:
          - caching: ReadWrite
            storage_account_type: Standard_LRS
        network_interface:
          - name: example
            primary: true
            ip_configuration:
              - name: internal
                primary: true
                subnet_id: {SUBNET_ID}
    "})
    .unwrap();

    schema::apply(&schema::resource_schema(OperatingSystemType::Linux), &tree).unwrap()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Get,
    CreateOrUpdate(Box<VirtualMachineScaleSet>),
    Update(Box<VirtualMachineScaleSetUpdate>),
    Delete,
}

/// How the long-running operations returned by [`FakeScaleSets`] behave.
#[derive(Clone, Debug)]
pub enum Completion {
    /// Succeeds after reporting `InProgress` the given number of times.
    After(usize),

    /// Fails with the message on the first poll.
    Fail(String),

    /// Never leaves `InProgress`.
    Never,
}

struct State {
    scale_sets: BTreeMap<(String, String), VirtualMachineScaleSet>,
    calls: Vec<Call>,
    completion: Completion,
}

#[derive(Clone)]
pub struct FakeScaleSets {
    state: Arc<Mutex<State>>,
}

impl Default for FakeScaleSets {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                scale_sets: BTreeMap::new(),
                calls: Vec::new(),
                completion: Completion::After(1),
            })),
        }
    }
}

impl FakeScaleSets {
    pub fn with_completion(self, completion: Completion) -> Self {
        self.state.lock().unwrap().completion = completion;
        self
    }

    /// Stores `body` as if it had been created outside of the provider.
    pub fn insert(&self, resource_group: &str, name: &str, body: VirtualMachineScaleSet) {
        let stored = stored(resource_group, name, body);
        self.state
            .lock()
            .unwrap()
            .scale_sets
            .insert(key(resource_group, name), stored);
    }

    pub fn remove(&self, resource_group: &str, name: &str) {
        self.state
            .lock()
            .unwrap()
            .scale_sets
            .remove(&key(resource_group, name));
    }

    pub fn stored(&self, resource_group: &str, name: &str) -> Option<VirtualMachineScaleSet> {
        self.state
            .lock()
            .unwrap()
            .scale_sets
            .get(&key(resource_group, name))
            .cloned()
    }

    /// Takes all calls recorded so far.
    pub fn take_calls(&self) -> Vec<Call> {
        std::mem::take(&mut self.state.lock().unwrap().calls)
    }

    fn operation(&self) -> Box<dyn LongRunningOperation> {
        let completion = self.state.lock().unwrap().completion.clone();
        Box::new(FakeOperation { completion })
    }
}

fn key(resource_group: &str, name: &str) -> (String, String) {
    (resource_group.to_owned(), name.to_owned())
}

/// Adds the server assigned fields and drops everything the API never
/// returns.
fn stored(resource_group: &str, name: &str, mut body: VirtualMachineScaleSet) -> VirtualMachineScaleSet {
    body.id = Some(ScaleSetId::new(SUBSCRIPTION_ID, resource_group, name).to_string());
    body.name = Some(name.to_owned());

    if let Some(properties) = body.properties.as_mut() {
        properties.unique_id = Some("8a0c0a2b-0000-4000-8000-000000000000".to_owned());
        properties.provisioning_state = Some("Succeeded".to_owned());

        if let Some(os_profile) = properties
            .virtual_machine_profile
            .as_mut()
            .and_then(|profile| profile.os_profile.as_mut())
        {
            os_profile.admin_password = None;
            os_profile.custom_data = None;
        }
    }

    body
}

fn not_found(name: &str) -> ApiError {
    ApiError::not_found(format!(
        "The Resource 'Microsoft.Compute/virtualMachineScaleSets/{name}' was not found."
    ))
}

fn apply_update(target: &mut VirtualMachineScaleSet, update: VirtualMachineScaleSetUpdate) {
    if let Some(sku) = update.sku {
        target.sku = Some(sku);
    }
    if let Some(tags) = update.tags {
        target.tags = Some(tags);
    }

    let Some(update) = update.properties else {
        return;
    };
    let properties = target.properties.get_or_insert_with(Default::default);
    if let Some(upgrade_policy) = update.upgrade_policy {
        properties.upgrade_policy = Some(upgrade_policy);
    }

    let Some(update) = update.virtual_machine_profile else {
        return;
    };
    let profile = properties
        .virtual_machine_profile
        .get_or_insert_with(Default::default);

    if let Some(os_profile) = update.os_profile {
        let target = profile.os_profile.get_or_insert_with(Default::default);
        target.linux_configuration = os_profile.linux_configuration;
        target.windows_configuration = os_profile.windows_configuration;
    }
    if let Some(storage_profile) = update.storage_profile {
        let target = profile.storage_profile.get_or_insert_with(Default::default);
        target.image_reference = storage_profile.image_reference;
        if let Some(os_disk) = storage_profile.os_disk {
            let target = target.os_disk.get_or_insert_with(Default::default);
            target.caching = os_disk.caching;
            target.write_accelerator_enabled = os_disk.write_accelerator_enabled;
            target.disk_size_gb = os_disk.disk_size_gb;
            target.managed_disk = os_disk.managed_disk;
        }
    }
    if let Some(network_profile) = update.network_profile {
        let target = profile.network_profile.get_or_insert_with(Default::default);
        if let Some(health_probe) = network_profile.health_probe {
            target.health_probe = Some(health_probe);
        }
        if let Some(interfaces) = network_profile.network_interface_configurations {
            target.network_interface_configurations = Some(interfaces);
        }
    }
}

#[async_trait]
impl ScaleSetsClient for FakeScaleSets {
    async fn get(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<VirtualMachineScaleSet, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Get);
        state
            .scale_sets
            .get(&key(resource_group, name))
            .cloned()
            .ok_or_else(|| not_found(name))
    }

    async fn create_or_update(
        &self,
        resource_group: &str,
        name: &str,
        body: VirtualMachineScaleSet,
    ) -> Result<Box<dyn LongRunningOperation>, ApiError> {
        {
            let mut state = self.state.lock().unwrap();
            state.calls.push(Call::CreateOrUpdate(Box::new(body.clone())));
            state
                .scale_sets
                .insert(key(resource_group, name), stored(resource_group, name, body));
        }
        Ok(self.operation())
    }

    async fn update(
        &self,
        resource_group: &str,
        name: &str,
        body: VirtualMachineScaleSetUpdate,
    ) -> Result<Box<dyn LongRunningOperation>, ApiError> {
        {
            let mut state = self.state.lock().unwrap();
            state.calls.push(Call::Update(Box::new(body.clone())));
            let target = state
                .scale_sets
                .get_mut(&key(resource_group, name))
                .ok_or_else(|| not_found(name))?;
            apply_update(target, body);
        }
        Ok(self.operation())
    }

    async fn delete(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<Box<dyn LongRunningOperation>, ApiError> {
        {
            let mut state = self.state.lock().unwrap();
            state.calls.push(Call::Delete);
            state
                .scale_sets
                .remove(&key(resource_group, name))
                .ok_or_else(|| not_found(name))?;
        }
        Ok(self.operation())
    }
}

struct FakeOperation {
    completion: Completion,
}

#[async_trait]
impl LongRunningOperation for FakeOperation {
    async fn poll(&mut self) -> Result<OperationStatus, ApiError> {
        let status = match &mut self.completion {
            Completion::After(0) => OperationStatus::Succeeded,
            Completion::After(remaining) => {
                *remaining -= 1;
                OperationStatus::InProgress
            }
            Completion::Fail(message) => OperationStatus::Failed {
                message: message.clone(),
            },
            Completion::Never => OperationStatus::InProgress,
        };
        Ok(status)
    }
}
