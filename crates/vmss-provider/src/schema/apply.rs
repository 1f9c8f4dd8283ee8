use std::{
    borrow::Cow,
    collections::BTreeSet,
    fmt::{self, Display, Write as _},
};

use snafu::Snafu;

use super::{FieldSchema, FieldType, Presence, Schema, validation};
use crate::value::{Block, Value, ValueKind};

/// The location of a field within a configuration tree, like
/// `network_interface.0.ip_configuration.0.subnet_id`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldPath {
    idents: Vec<String>,
}

impl Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, ident) in self.idents.iter().enumerate() {
            if i > 0 {
                f.write_char('.')?;
            }
            f.write_str(ident)?;
        }
        Ok(())
    }
}

#[derive(Debug, Snafu)]
#[snafu(display("failed to validate {path}"))]
pub struct SchemaError {
    path: FieldPath,

    #[snafu(source)]
    problem: Problem,
}

impl SchemaError {
    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    pub fn problem(&self) -> &Problem {
        &self.problem
    }
}

#[derive(Debug, Snafu)]
pub enum Problem {
    #[snafu(display("field is required"))]
    FieldRequired,

    #[snafu(display("field is not part of the schema"))]
    UnknownField,

    #[snafu(display("field is computed and cannot be set"))]
    ComputedField,

    #[snafu(display("expected a {expected}, but found a {found}"))]
    TypeMismatch {
        expected: ValueKind,
        found: ValueKind,
    },

    #[snafu(display("expected at most {max_items} items, but found {count}"))]
    TooManyItems { count: usize, max_items: usize },

    #[snafu(display("field conflicts with {other:?}"))]
    Conflict { other: &'static str },

    #[snafu(display("invalid value"))]
    InvalidValue { source: validation::Errors },
}

/// All problems found while applying a schema.
#[derive(Debug)]
pub struct SchemaErrors(Vec<SchemaError>);

impl SchemaErrors {
    pub fn iter(&self) -> impl Iterator<Item = &SchemaError> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for SchemaErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            let prefix = match i {
                0 => "",
                _ => ", ",
            };
            write!(f, "{prefix}{path}: {problem}", path = error.path, problem = error.problem)?;
            if let Problem::InvalidValue { source } = &error.problem {
                write!(f, " ({source})")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for SchemaErrors {}

struct Validator<'a> {
    ident: Option<Cow<'a, str>>,
    parent: Option<&'a Validator<'a>>,
}

impl<'a> Validator<'a> {
    fn root() -> Self {
        Validator {
            ident: None,
            parent: None,
        }
    }

    fn field<'b>(&'b self, ident: &'b str) -> Validator<'b> {
        Validator {
            ident: Some(Cow::Borrowed(ident)),
            parent: Some(self),
        }
    }

    fn index(&self, index: usize) -> Validator<'_> {
        Validator {
            ident: Some(Cow::Owned(index.to_string())),
            parent: Some(self),
        }
    }

    fn error(&self, problem: Problem) -> SchemaError {
        let mut idents = Vec::new();
        let mut curr = Some(self);
        while let Some(curr_some) = curr {
            if let Some(ident) = &curr_some.ident {
                idents.push(ident.to_string());
            }
            curr = curr_some.parent;
        }
        idents.reverse();

        SchemaError {
            path: FieldPath { idents },
            problem,
        }
    }
}

/// Checks `tree` against `schema` and returns the tree with all declared
/// defaults filled in and set-typed fields converted to [`Value::Set`].
///
/// Every problem is collected instead of stopping at the first one.
pub fn apply(schema: &Schema, tree: &Block) -> Result<Block, SchemaErrors> {
    let mut errors = Vec::new();
    let block = apply_block(schema, tree, &Validator::root(), &mut errors);

    if errors.is_empty() {
        Ok(block)
    } else {
        Err(SchemaErrors(errors))
    }
}

fn apply_block(
    schema: &Schema,
    tree: &Block,
    validator: &Validator,
    errors: &mut Vec<SchemaError>,
) -> Block {
    for key in tree.keys() {
        if schema.get(key).is_none() {
            errors.push(validator.field(key).error(Problem::UnknownField));
        }
    }

    let mut block = Block::new();
    for (&name, field) in schema.iter() {
        let validator = validator.field(name);

        let value = match tree.get(name) {
            Some(value) if !is_unset(value) => value,
            _ => {
                if let Some(default) = &field.default {
                    block.insert(name, default.clone());
                } else if field.presence == Presence::Required {
                    errors.push(validator.error(Problem::FieldRequired));
                } else if let Some(value) = tree.get(name) {
                    // Keep explicitly empty values so flatten output stays comparable
                    block.insert(name, value.clone());
                }
                continue;
            }
        };

        if field.presence == Presence::Computed {
            errors.push(validator.error(Problem::ComputedField));
            continue;
        }

        for &other in &field.conflicts_with {
            if tree.get(other).is_some_and(|value| !is_unset(value)) {
                errors.push(validator.error(Problem::Conflict { other }));
            }
        }

        if let Some(value) = apply_value(field, value, &validator, errors) {
            block.insert(name, value);
        }
    }

    block
}

fn apply_value(
    field: &FieldSchema,
    value: &Value,
    validator: &Validator,
    errors: &mut Vec<SchemaError>,
) -> Option<Value> {
    let applied = match (&field.field_type, value) {
        (FieldType::Bool, Value::Bool(_))
        | (FieldType::Int, Value::Int(_))
        | (FieldType::String, Value::String(_)) => value.clone(),

        (FieldType::List(elem), Value::List(items)) => {
            check_max_items(field, items.len(), validator, errors);
            Value::List(apply_elements(elem, items.iter(), validator, errors))
        }

        (FieldType::Set(elem), Value::List(_) | Value::Set(_)) => {
            let items = value.elements().unwrap_or_default();
            check_max_items(field, items.len(), validator, errors);
            let elements = apply_elements(elem, items.into_iter(), validator, errors);
            Value::Set(elements.into_iter().collect::<BTreeSet<_>>())
        }

        (FieldType::Map, Value::Block(map)) => {
            for (key, entry) in map.iter() {
                if !matches!(entry, Value::String(_)) {
                    errors.push(validator.field(key).error(Problem::TypeMismatch {
                        expected: ValueKind::String,
                        found: entry.kind(),
                    }));
                }
            }
            value.clone()
        }

        (FieldType::Block(schema), Value::Block(block)) => {
            Value::Block(apply_block(schema, block, validator, errors))
        }

        (field_type, _) => {
            errors.push(validator.error(Problem::TypeMismatch {
                expected: expected_kind(field_type),
                found: value.kind(),
            }));
            return None;
        }
    };

    if let Some(validator_fn) = &field.validator {
        if let Err(source) = validator_fn.validate(&applied) {
            errors.push(validator.error(Problem::InvalidValue { source }));
        }
    }

    Some(applied)
}

fn apply_elements<'v>(
    elem: &FieldSchema,
    items: impl Iterator<Item = &'v Value>,
    validator: &Validator,
    errors: &mut Vec<SchemaError>,
) -> Vec<Value> {
    items
        .enumerate()
        .filter_map(|(index, item)| apply_value(elem, item, &validator.index(index), errors))
        .collect()
}

fn check_max_items(
    field: &FieldSchema,
    count: usize,
    validator: &Validator,
    errors: &mut Vec<SchemaError>,
) {
    if let Some(max_items) = field.max_items {
        if count > max_items {
            errors.push(validator.error(Problem::TooManyItems { count, max_items }));
        }
    }
}

/// Empty lists, sets and blocks count as not being set at all.
fn is_unset(value: &Value) -> bool {
    match value {
        Value::List(items) => items.is_empty(),
        Value::Set(items) => items.is_empty(),
        Value::Block(block) => block.is_empty(),
        _ => false,
    }
}

fn expected_kind(field_type: &FieldType) -> ValueKind {
    match field_type {
        FieldType::Bool => ValueKind::Bool,
        FieldType::Int => ValueKind::Int,
        FieldType::String => ValueKind::String,
        FieldType::List(_) => ValueKind::List,
        FieldType::Set(_) => ValueKind::Set,
        FieldType::Map | FieldType::Block(_) => ValueKind::Block,
    }
}
