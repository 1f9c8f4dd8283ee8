use strum::IntoEnumIterator as _;

use crate::{
    identity::ScaleSetId,
    mapper::UpdateGroup,
    schema::{FieldSchema, Schema},
    value::{Block, Value},
};

/// Where a scale set is in its lifecycle, as far as this invocation knows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, strum::Display)]
pub enum ResourceState {
    #[default]
    NotExists,
    Creating,
    Present,
    Updating,
    Deleting,
    Deleted,
}

/// The snapshot of one resource handed in by the host for a single lifecycle
/// invocation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResourceData {
    /// Known once the scale set has been created or read.
    pub id: Option<ScaleSetId>,

    /// The desired configuration, already checked against the schema.
    pub config: Block,

    /// The configuration last observed on the remote side.
    pub state: Block,

    pub lifecycle: ResourceState,
}

impl ResourceData {
    pub fn new(config: Block) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// A resource which has been read before.
    pub fn existing(id: ScaleSetId, config: Block, state: Block) -> Self {
        Self {
            id: Some(id),
            config,
            state,
            lifecycle: ResourceState::Present,
        }
    }

    /// Returns `true` if the desired value of `field` differs from the
    /// observed one.
    ///
    /// Fields missing on one side are compared against the zero value the
    /// mapper writes for absent fields, so an unset optional field does not
    /// count as changed. Computed fields the configuration leaves out keep
    /// whatever value the remote API assigned, at any nesting level.
    pub fn has_change(&self, schema: &Schema, field: &str) -> bool {
        !equivalent(
            schema.get(field),
            self.config.get(field),
            self.state.get(field),
        )
    }

    /// The update groups containing at least one changed field.
    pub fn changed_groups(&self, schema: &Schema) -> Vec<UpdateGroup> {
        UpdateGroup::iter()
            .filter(|group| {
                group
                    .fields()
                    .iter()
                    .any(|field| self.has_change(schema, field))
            })
            .collect()
    }
}

fn equivalent(field: Option<&FieldSchema>, desired: Option<&Value>, observed: Option<&Value>) -> bool {
    match (desired, observed) {
        (None, None) => true,
        (None, Some(_)) if field.is_some_and(FieldSchema::is_computed) => true,
        (Some(value), None) | (None, Some(value)) => is_zero(value),
        (Some(Value::Block(desired)), Some(Value::Block(observed))) => {
            blocks_equivalent(None, desired, observed)
        }
        (Some(Value::List(desired)), Some(Value::List(observed))) => {
            let schema = field.and_then(FieldSchema::block_schema);
            desired.len() == observed.len()
                && desired.iter().zip(observed).all(|pair| match pair {
                    (Value::Block(desired), Value::Block(observed)) => {
                        blocks_equivalent(schema, desired, observed)
                    }
                    (desired, observed) => equivalent(None, Some(desired), Some(observed)),
                })
        }
        (Some(desired), Some(observed)) => desired == observed,
    }
}

fn blocks_equivalent(schema: Option<&Schema>, desired: &Block, observed: &Block) -> bool {
    desired.keys().chain(observed.keys()).all(|key| {
        equivalent(
            schema.and_then(|schema| schema.get(key)),
            desired.get(key),
            observed.get(key),
        )
    })
}

fn is_zero(value: &Value) -> bool {
    match value {
        Value::Bool(value) => !value,
        Value::Int(value) => *value == 0,
        Value::String(value) => value.is_empty(),
        Value::List(items) => items.is_empty(),
        Value::Set(items) => items.is_empty(),
        Value::Block(block) => block.is_empty(),
    }
}
