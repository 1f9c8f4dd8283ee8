//! Declarative field schema for the scale set resource.
//!
//! A [`Schema`] describes every field of a configuration
//! [`Block`](crate::value::Block): its
//! [`FieldType`], whether it is required, its default and the validator
//! applied to it. [`apply`] checks a configuration tree against a schema and
//! fills in the declared defaults.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::value::Value;

mod apply;
mod scale_set;
pub mod validation;

pub use apply::{FieldPath, Problem, SchemaError, SchemaErrors, apply};
pub use scale_set::resource_schema;
pub use validation::ValidatorFn;

/// Whether a field must be provided by the user or is filled in by the
/// remote API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    Required,
    Optional,

    /// Set by the remote API only, users cannot provide a value.
    Computed,

    /// Set by the user or, when omitted, by the remote API.
    OptionalComputed,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Bool,
    Int,
    String,

    /// An ordered list of elements.
    List(Box<FieldSchema>),

    /// An unordered collection of elements.
    Set(Box<FieldSchema>),

    /// A map of string keys to string values.
    Map,

    /// A nested object, only used as the element of a list or set.
    Block(Schema),
}

impl FieldType {
    pub fn list(elem: FieldSchema) -> Self {
        FieldType::List(Box::new(elem))
    }

    pub fn set(elem: FieldSchema) -> Self {
        FieldType::Set(Box::new(elem))
    }

    /// A list of nested blocks.
    pub fn block_list(schema: Schema) -> Self {
        FieldType::list(FieldSchema::elem(FieldType::Block(schema)))
    }

    /// A set of nested blocks.
    pub fn block_set(schema: Schema) -> Self {
        FieldType::set(FieldSchema::elem(FieldType::Block(schema)))
    }

    pub fn string_list() -> Self {
        FieldType::list(FieldSchema::elem(FieldType::String))
    }

    pub fn string_set() -> Self {
        FieldType::set(FieldSchema::elem(FieldType::String))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FieldSchema {
    #[serde(rename = "type")]
    pub field_type: FieldType,

    pub presence: Presence,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub validator: Option<ValidatorFn>,

    /// Changing the field requires replacing the resource.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub force_new: bool,

    /// The value must never be shown in plans or logs.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub sensitive: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub conflicts_with: Vec<&'static str>,
}

impl FieldSchema {
    fn new(field_type: FieldType, presence: Presence) -> Self {
        Self {
            field_type,
            presence,
            default: None,
            validator: None,
            force_new: false,
            sensitive: false,
            max_items: None,
            conflicts_with: Vec::new(),
        }
    }

    pub fn required(field_type: FieldType) -> Self {
        Self::new(field_type, Presence::Required)
    }

    pub fn optional(field_type: FieldType) -> Self {
        Self::new(field_type, Presence::Optional)
    }

    pub fn computed(field_type: FieldType) -> Self {
        Self::new(field_type, Presence::Computed)
    }

    pub fn optional_computed(field_type: FieldType) -> Self {
        Self::new(field_type, Presence::OptionalComputed)
    }

    /// The schema of a list or set element.
    pub fn elem(field_type: FieldType) -> Self {
        Self::new(field_type, Presence::Required)
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_validator(mut self, validator: ValidatorFn) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = Some(max_items);
        self
    }

    pub fn conflicts_with(mut self, fields: &[&'static str]) -> Self {
        self.conflicts_with.extend_from_slice(fields);
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// Returns `true` if the remote API fills in the field when it is not
    /// configured.
    pub fn is_computed(&self) -> bool {
        matches!(self.presence, Presence::Computed | Presence::OptionalComputed)
    }

    /// The schema of the elements, if this is a list or set of blocks.
    pub fn block_schema(&self) -> Option<&Schema> {
        let elem = match &self.field_type {
            FieldType::List(elem) | FieldType::Set(elem) => elem,
            _ => return None,
        };

        match &elem.field_type {
            FieldType::Block(schema) => Some(schema),
            _ => None,
        }
    }
}

/// The fields of a resource or of a nested block.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Schema(BTreeMap<&'static str, FieldSchema>);

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: &'static str, schema: FieldSchema) -> Self {
        self.0.insert(name, schema);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldSchema> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&&'static str, &FieldSchema)> {
        self.0.iter()
    }

    /// The schema of a nested block field, if `name` is a list or set of
    /// blocks.
    pub fn nested(&self, name: &str) -> Option<&Schema> {
        self.get(name)?.block_schema()
    }
}
