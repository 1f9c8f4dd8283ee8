//! Parsing of Azure Resource Manager resource identifiers.
//!
//! An identifier is a path of key/value segment pairs, for example
//! `/subscriptions/{id}/resourceGroups/{group}/providers/{namespace}/{type}/{name}`.

use std::{fmt, str::FromStr};

use snafu::{OptionExt as _, ResultExt as _, Snafu, ensure};

/// The resource provider namespace all scale sets live in.
pub const COMPUTE_PROVIDER: &str = "Microsoft.Compute";

/// The path segment which carries the scale set name.
pub const SCALE_SET_SEGMENT: &str = "virtualMachineScaleSets";

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum Error {
    #[snafu(display("resource id must not be empty"))]
    EmptyInput,

    #[snafu(display("resource id {input:?} contains an empty segment"))]
    EmptySegment { input: String },

    #[snafu(display(
        "resource id {input:?} must consist of key/value pairs, but has an odd number of segments"
    ))]
    OddSegmentCount { input: String },

    #[snafu(display("resource id {input:?} does not contain a subscription id"))]
    MissingSubscription { input: String },

    #[snafu(display("resource id {input:?} does not contain a resource group"))]
    MissingResourceGroup { input: String },

    #[snafu(display("resource id {input:?} does not contain a provider namespace"))]
    MissingProvider { input: String },

    #[snafu(display("resource id {input:?} is missing the `{SCALE_SET_SEGMENT}` element"))]
    MissingScaleSetSegment { input: String },

    #[snafu(display("failed to parse virtual machine scale set id"))]
    ParseScaleSetId { source: Box<Error> },
}

/// A parsed, provider-agnostic resource identifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceId {
    pub subscription_id: String,
    pub resource_group: String,
    pub provider: String,

    /// The remaining key/value segments after the provider namespace, in
    /// their original order.
    pub path: Vec<(String, String)>,
}

impl ResourceId {
    /// Returns the value of the first path segment pair keyed by `key`.
    pub fn path_value(&self, key: &str) -> Option<&str> {
        self.path
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl FromStr for ResourceId {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self> {
        let trimmed = input.trim().trim_matches('/');
        ensure!(!trimmed.is_empty(), EmptyInputSnafu);

        let segments: Vec<&str> = trimmed.split('/').collect();
        ensure!(
            segments.iter().all(|segment| !segment.is_empty()),
            EmptySegmentSnafu { input }
        );
        ensure!(segments.len() % 2 == 0, OddSegmentCountSnafu { input });

        let mut subscription_id = None;
        let mut resource_group = None;
        let mut provider = None;
        let mut path = Vec::new();

        for pair in segments.chunks_exact(2) {
            let &[key, value] = pair else { continue };

            if key.eq_ignore_ascii_case("subscriptions") && subscription_id.is_none() {
                subscription_id = Some(value.to_owned());
            } else if key.eq_ignore_ascii_case("resourceGroups") && resource_group.is_none() {
                resource_group = Some(value.to_owned());
            } else if key.eq_ignore_ascii_case("providers") && provider.is_none() {
                provider = Some(value.to_owned());
            } else {
                path.push((key.to_owned(), value.to_owned()));
            }
        }

        Ok(Self {
            subscription_id: subscription_id.context(MissingSubscriptionSnafu { input })?,
            resource_group: resource_group.context(MissingResourceGroupSnafu { input })?,
            provider: provider.context(MissingProviderSnafu { input })?,
            path,
        })
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/subscriptions/{}/resourceGroups/{}/providers/{}",
            self.subscription_id, self.resource_group, self.provider
        )?;
        for (key, value) in &self.path {
            write!(f, "/{key}/{value}")?;
        }
        Ok(())
    }
}

/// The identity of a virtual machine scale set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScaleSetId {
    base: ResourceId,
    name: String,
}

impl ScaleSetId {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        let name = name.into();
        Self {
            base: ResourceId {
                subscription_id: subscription_id.into(),
                resource_group: resource_group.into(),
                provider: COMPUTE_PROVIDER.to_owned(),
                path: vec![(SCALE_SET_SEGMENT.to_owned(), name.clone())],
            },
            name,
        }
    }

    pub fn subscription_id(&self) -> &str {
        &self.base.subscription_id
    }

    pub fn resource_group(&self) -> &str {
        &self.base.resource_group
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl FromStr for ScaleSetId {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self> {
        let base = ResourceId::from_str(input)
            .map_err(Box::new)
            .context(ParseScaleSetIdSnafu)?;

        let name = base
            .path_value(SCALE_SET_SEGMENT)
            .filter(|name| !name.is_empty())
            .context(MissingScaleSetSegmentSnafu { input })?
            .to_owned();

        Ok(Self { base, name })
    }
}

impl fmt::Display for ScaleSetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.base, f)
    }
}
