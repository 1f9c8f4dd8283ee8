//! The create, read, update and delete operations of a scale set.
//!
//! Each operation expands the desired configuration before contacting the
//! remote API, so invalid configurations never cause remote side effects.
//! Mutating calls block until their long-running operation is done and are
//! followed by a read, which replaces the observed state with the server's
//! view.

use snafu::{OptionExt as _, ResultExt as _, Snafu};
use tracing::{Span, debug, info, instrument, warn};

use crate::{
    cli::ProviderOptions,
    client::{ApiError, ScaleSetsClient},
    identity::{self, ScaleSetId},
    mapper,
    model::OperatingSystemType,
    operation::{self, OperationContext},
    schema::{self, Schema},
    value::{self, Block},
};

mod data;

pub use data::{ResourceData, ResourceState};

pub use crate::{error::ErrorKind, mapper::UpdateGroup};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to read {field:?} from the configuration"))]
    ReadIdentity {
        source: value::Error,
        field: &'static str,
    },

    #[snafu(display("invalid scale set configuration"))]
    Expand { source: mapper::Error },

    #[snafu(display(
        "scale set {id} already exists, it needs to be imported to be managed"
    ))]
    AlreadyExists { id: String },

    #[snafu(display("failed to {action} scale set"))]
    Request {
        source: ApiError,
        action: &'static str,
    },

    #[snafu(display("interrupted while trying to {action} scale set"))]
    Interrupted {
        source: operation::Error,
        action: &'static str,
    },

    #[snafu(display("failed to wait for the scale set {action} to complete"))]
    Wait {
        source: operation::Error,
        action: &'static str,
    },

    #[snafu(display("failed to read the scale set response"))]
    Flatten { source: mapper::Error },

    #[snafu(display("the scale set response contains an invalid id"))]
    ParseId { source: identity::Error },

    #[snafu(display("the scale set response does not contain an id"))]
    MissingId,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ReadIdentity { .. } => ErrorKind::InvalidConfiguration,
            Error::Expand { source } | Error::Flatten { source } => source.kind(),
            Error::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Error::Request { source, .. } if source.is_not_found() => ErrorKind::NotFound,
            Error::Request { .. } => ErrorKind::RemoteOperationFailed,
            Error::Interrupted { source, .. } | Error::Wait { source, .. } => source.kind(),
            Error::ParseId { .. } | Error::MissingId => ErrorKind::InvalidIdentity,
        }
    }
}

/// A scale set resource of one operating system flavour.
///
/// The resource holds no state of its own, every operation works on the
/// [`ResourceData`] passed in. One instance can serve any number of scale
/// sets concurrently.
#[derive(Clone, Debug)]
pub struct ScaleSetResource {
    os_type: OperatingSystemType,
    options: ProviderOptions,
}

impl ScaleSetResource {
    pub fn new(os_type: OperatingSystemType, options: ProviderOptions) -> Self {
        Self { os_type, options }
    }

    pub fn os_type(&self) -> OperatingSystemType {
        self.os_type
    }

    pub fn schema(&self) -> Schema {
        schema::resource_schema(self.os_type)
    }

    /// Creates the scale set described by `data.config` and reads it back.
    ///
    /// Fails with [`ErrorKind::AlreadyExists`] if a scale set with the same
    /// name exists, unless the check is disabled.
    #[instrument(
        skip_all,
        fields(scale_set.name, scale_set.resource_group, os_type = %self.os_type)
    )]
    pub async fn create(
        &self,
        client: &dyn ScaleSetsClient,
        context: &OperationContext,
        data: &mut ResourceData,
    ) -> Result<()> {
        let (resource_group, name) = config_target(&data.config)?;
        record_target(&resource_group, &name);

        let body = mapper::expand_scale_set(self.os_type, &name, &data.config)
            .context(ExpandSnafu)?;

        if !self.options.disable_import_existing_check {
            let existing = context
                .run(client.get(&resource_group, &name))
                .await
                .context(InterruptedSnafu { action: "look up" })?;
            match existing {
                Ok(existing) => {
                    let id = existing.id.unwrap_or_else(|| format!("{resource_group}/{name}"));
                    return AlreadyExistsSnafu { id }.fail();
                }
                Err(err) if err.is_not_found() => {}
                Err(source) => return Err(source).context(RequestSnafu { action: "look up" }),
            }
        }

        context
            .check()
            .context(InterruptedSnafu { action: "create" })?;
        data.lifecycle = ResourceState::Creating;
        info!("creating scale set");

        let operation = context
            .run(client.create_or_update(&resource_group, &name, body))
            .await
            .context(InterruptedSnafu { action: "create" })?
            .context(RequestSnafu { action: "create" })?;
        operation::wait_for_completion(operation, context)
            .await
            .context(WaitSnafu { action: "create" })?;

        // The write-only fields of the new state come from the configuration
        data.state = data.config.clone();
        self.read_target(client, context, data, &resource_group, &name)
            .await
    }

    /// Replaces the observed state with the remote scale set.
    ///
    /// A scale set which no longer exists is not an error: the identity and
    /// state are cleared and the resource is marked as deleted.
    #[instrument(
        skip_all,
        fields(scale_set.name, scale_set.resource_group, os_type = %self.os_type)
    )]
    pub async fn read(
        &self,
        client: &dyn ScaleSetsClient,
        context: &OperationContext,
        data: &mut ResourceData,
    ) -> Result<()> {
        let (resource_group, name) = target(data)?;
        record_target(&resource_group, &name);

        self.read_target(client, context, data, &resource_group, &name)
            .await
    }

    /// Sends the groups of `data.config` which differ from `data.state` as a
    /// partial update and reads the scale set back.
    #[instrument(
        skip_all,
        fields(scale_set.name, scale_set.resource_group, os_type = %self.os_type)
    )]
    pub async fn update(
        &self,
        client: &dyn ScaleSetsClient,
        context: &OperationContext,
        data: &mut ResourceData,
    ) -> Result<()> {
        let (resource_group, name) = target(data)?;
        record_target(&resource_group, &name);

        let groups = data.changed_groups(&self.schema());
        let body = mapper::expand_update(self.os_type, &name, &data.config, &groups)
            .context(ExpandSnafu)?;

        if body.is_empty() {
            debug!("scale set is up to date");
            return Ok(());
        }

        context
            .check()
            .context(InterruptedSnafu { action: "update" })?;
        data.lifecycle = ResourceState::Updating;
        info!(?groups, "updating scale set");

        let operation = context
            .run(client.update(&resource_group, &name, body))
            .await
            .context(InterruptedSnafu { action: "update" })?
            .context(RequestSnafu { action: "update" })?;
        operation::wait_for_completion(operation, context)
            .await
            .context(WaitSnafu { action: "update" })?;

        data.state = data.config.clone();
        self.read_target(client, context, data, &resource_group, &name)
            .await
    }

    /// Deletes the scale set. Deleting a scale set which is already gone
    /// succeeds without issuing a delete call.
    #[instrument(
        skip_all,
        fields(scale_set.name, scale_set.resource_group, os_type = %self.os_type)
    )]
    pub async fn delete(
        &self,
        client: &dyn ScaleSetsClient,
        context: &OperationContext,
        data: &mut ResourceData,
    ) -> Result<()> {
        let (resource_group, name) = target(data)?;
        record_target(&resource_group, &name);

        let existing = context
            .run(client.get(&resource_group, &name))
            .await
            .context(InterruptedSnafu { action: "look up" })?;
        match existing {
            Ok(_) => {
                context
                    .check()
                    .context(InterruptedSnafu { action: "delete" })?;
                data.lifecycle = ResourceState::Deleting;
                info!("deleting scale set");

                let deleted = context
                    .run(client.delete(&resource_group, &name))
                    .await
                    .context(InterruptedSnafu { action: "delete" })?;
                match deleted {
                    Ok(operation) => operation::wait_for_completion(operation, context)
                        .await
                        .context(WaitSnafu { action: "delete" })?,
                    Err(err) if err.is_not_found() => {
                        debug!("scale set disappeared while deleting");
                    }
                    Err(source) => return Err(source).context(RequestSnafu { action: "delete" }),
                }
            }
            Err(err) if err.is_not_found() => debug!("scale set is already deleted"),
            Err(source) => return Err(source).context(RequestSnafu { action: "look up" }),
        }

        mark_deleted(data);
        Ok(())
    }

    async fn read_target(
        &self,
        client: &dyn ScaleSetsClient,
        context: &OperationContext,
        data: &mut ResourceData,
        resource_group: &str,
        name: &str,
    ) -> Result<()> {
        let response = context
            .run(client.get(resource_group, name))
            .await
            .context(InterruptedSnafu { action: "read" })?;
        let response = match response {
            Ok(response) => response,
            Err(err) if err.is_not_found() => {
                warn!("scale set was removed outside of the provider, clearing state");
                mark_deleted(data);
                return Ok(());
            }
            Err(source) => return Err(source).context(RequestSnafu { action: "read" }),
        };

        let id = match &response.id {
            Some(id) => id.parse::<ScaleSetId>().context(ParseIdSnafu)?,
            None => data.id.clone().context(MissingIdSnafu)?,
        };

        data.state = mapper::flatten_scale_set(self.os_type, &response, &data.state)
            .context(FlattenSnafu)?;
        data.id = Some(id);
        data.lifecycle = ResourceState::Present;

        Ok(())
    }
}

fn mark_deleted(data: &mut ResourceData) {
    data.id = None;
    data.state = Block::new();
    data.lifecycle = ResourceState::Deleted;
}

/// The resource group and name of an existing scale set. The identity wins
/// over the configuration, which may already describe a renamed scale set.
fn target(data: &ResourceData) -> Result<(String, String)> {
    match &data.id {
        Some(id) => Ok((id.resource_group().to_owned(), id.name().to_owned())),
        None => config_target(&data.config),
    }
}

fn config_target(config: &Block) -> Result<(String, String)> {
    let read = |field: &'static str| {
        config
            .required_str(field)
            .map(str::to_owned)
            .context(ReadIdentitySnafu { field })
    };

    Ok((read("resource_group_name")?, read("name")?))
}

fn record_target(resource_group: &str, name: &str) {
    Span::current()
        .record("scale_set.name", name)
        .record("scale_set.resource_group", resource_group);
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::{mapper::tests::linux_config, operation::Error as OperationError};

    #[rstest]
    #[case(
        Error::AlreadyExists { id: "id".to_owned() },
        ErrorKind::AlreadyExists
    )]
    #[case(
        Error::Request { source: ApiError::not_found("gone"), action: "read" },
        ErrorKind::NotFound
    )]
    #[case(
        Error::Request {
            source: ApiError::new(http::StatusCode::CONFLICT, "busy"),
            action: "update",
        },
        ErrorKind::RemoteOperationFailed
    )]
    #[case(
        Error::Wait { source: OperationError::Cancelled, action: "create" },
        ErrorKind::Cancelled
    )]
    #[case(
        Error::Wait { source: OperationError::DeadlineExceeded, action: "delete" },
        ErrorKind::DeadlineExceeded
    )]
    #[case(
        Error::Expand { source: mapper::Error::ZoneBalanceWithoutZones },
        ErrorKind::InvalidCombination
    )]
    #[case(
        Error::Interrupted { source: OperationError::DeadlineExceeded, action: "update" },
        ErrorKind::DeadlineExceeded
    )]
    #[case(Error::MissingId, ErrorKind::InvalidIdentity)]
    fn error_kinds(#[case] error: Error, #[case] expected: ErrorKind) {
        assert_eq!(error.kind(), expected);
    }

    #[test]
    fn identity_wins_over_configuration() {
        let data = ResourceData::existing(
            ScaleSetId::new("00000000-0000-0000-0000-000000000000", "rg", "old-name"),
            linux_config(),
            Block::new(),
        );

        assert_eq!(
            target(&data).unwrap(),
            ("rg".to_owned(), "old-name".to_owned())
        );
    }

    #[test]
    fn configuration_target() {
        let data = ResourceData::new(linux_config());
        assert_eq!(
            target(&data).unwrap(),
            ("rg".to_owned(), "example-vmss".to_owned())
        );

        let err = target(&ResourceData::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidConfiguration);
    }
}
