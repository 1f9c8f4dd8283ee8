//! The configuration tree: a loosely typed, nested representation of a
//! resource's desired or observed state.
//!
//! A [`Block`] maps field names to [`Value`]s. Blocks are what the mapper
//! reads during expansion and what it produces during flattening. All
//! accessors return a typed [`Error`] instead of panicking when a field has an
//! unexpected shape.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{self, MapAccess, SeqAccess, Visitor},
    ser::{SerializeMap, SerializeSeq},
};
use snafu::{OptionExt, Snafu};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum Error {
    #[snafu(display("field {field:?} is required but missing"))]
    MissingField { field: String },

    #[snafu(display("field {field:?} must be a {expected}, but is a {found}"))]
    UnexpectedType {
        field: String,
        expected: ValueKind,
        found: ValueKind,
    },
}

/// The shape of a [`Value`], used in error messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ValueKind {
    Bool,
    Int,
    String,
    List,
    Set,
    Block,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Value {
    Bool(bool),
    Int(i64),
    String(String),

    /// An ordered list, typically of nested blocks.
    List(Vec<Value>),

    /// An unordered collection without duplicates.
    Set(BTreeSet<Value>),

    Block(Block),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::String(_) => ValueKind::String,
            Value::List(_) => ValueKind::List,
            Value::Set(_) => ValueKind::Set,
            Value::Block(_) => ValueKind::Block,
        }
    }

    /// An empty list, the flattened form of an absent nested object.
    pub fn empty_list() -> Self {
        Value::List(Vec::new())
    }

    /// A list containing exactly one block.
    pub fn single(block: Block) -> Self {
        Value::List(vec![Value::Block(block)])
    }

    pub fn string_list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Value::List(items.into_iter().map(|s| Value::String(s.into())).collect())
    }

    pub fn string_set<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Value::Set(items.into_iter().map(|s| Value::String(s.into())).collect())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_block(&self) -> Option<&Block> {
        match self {
            Value::Block(block) => Some(block),
            _ => None,
        }
    }

    /// Returns the elements of a list or set, in iteration order.
    pub fn elements(&self) -> Option<Vec<&Value>> {
        match self {
            Value::List(items) => Some(items.iter().collect()),
            Value::Set(items) => Some(items.iter().collect()),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value.into())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<Block> for Value {
    fn from(value: Block) -> Self {
        Value::Block(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::List(value)
    }
}

impl From<BTreeSet<Value>> for Value {
    fn from(value: BTreeSet<Value>) -> Self {
        Value::Set(value)
    }
}

/// A nested configuration object. Field order is irrelevant.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Block(BTreeMap<String, Value>);

impl Block {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, used to assemble flattened output.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn required_str(&self, key: &str) -> Result<&str> {
        let value = self.get(key).context(MissingFieldSnafu { field: key })?;
        expect_str(key, value)
    }

    /// Returns [`None`] when the field is missing or an empty string.
    pub fn optional_str(&self, key: &str) -> Result<Option<&str>> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => expect_str(key, value).map(|s| (!s.is_empty()).then_some(s)),
        }
    }

    pub fn bool_or(&self, key: &str, default: bool) -> Result<bool> {
        match self.get(key) {
            None => Ok(default),
            Some(Value::Bool(b)) => Ok(*b),
            Some(other) => unexpected(key, ValueKind::Bool, other),
        }
    }

    pub fn required_int(&self, key: &str) -> Result<i64> {
        self.optional_int(key)?
            .context(MissingFieldSnafu { field: key })
    }

    pub fn optional_int(&self, key: &str) -> Result<Option<i64>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Int(i)) => Ok(Some(*i)),
            Some(other) => unexpected(key, ValueKind::Int, other),
        }
    }

    /// Returns all blocks of a list or set field. A missing field yields no
    /// blocks.
    pub fn blocks(&self, key: &str) -> Result<Vec<&Block>> {
        let Some(value) = self.get(key) else {
            return Ok(Vec::new());
        };

        let elements = value.elements().map_or_else(
            || unexpected(key, ValueKind::List, value),
            Ok,
        )?;

        elements
            .into_iter()
            .map(|element| match element {
                Value::Block(block) => Ok(block),
                other => unexpected(key, ValueKind::Block, other),
            })
            .collect()
    }

    /// Returns the first block of a list field, the usual representation of
    /// an optional nested object.
    pub fn first_block(&self, key: &str) -> Result<Option<&Block>> {
        Ok(self.blocks(key)?.into_iter().next())
    }

    /// Returns the strings of a list or set field. A missing field yields an
    /// empty list.
    pub fn strings(&self, key: &str) -> Result<Vec<&str>> {
        let Some(value) = self.get(key) else {
            return Ok(Vec::new());
        };

        let elements = value.elements().map_or_else(
            || unexpected(key, ValueKind::List, value),
            Ok,
        )?;

        elements
            .into_iter()
            .map(|element| expect_str(key, element))
            .collect()
    }

    /// Returns a nested block of string values, like `tags`.
    pub fn string_map(&self, key: &str) -> Result<BTreeMap<String, String>> {
        let Some(value) = self.get(key) else {
            return Ok(BTreeMap::new());
        };

        let Value::Block(block) = value else {
            return unexpected(key, ValueKind::Block, value);
        };

        block
            .iter()
            .map(|(k, v)| expect_str(key, v).map(|v| (k.clone(), v.to_owned())))
            .collect()
    }
}

impl FromIterator<(String, Value)> for Block {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Block {
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;
    type Item = (String, Value);

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

fn expect_str<'a>(key: &str, value: &'a Value) -> Result<&'a str> {
    match value {
        Value::String(s) => Ok(s),
        other => unexpected(key, ValueKind::String, other),
    }
}

fn unexpected<T>(key: &str, expected: ValueKind, found: &Value) -> Result<T> {
    UnexpectedTypeSnafu {
        field: key,
        expected,
        found: found.kind(),
    }
    .fail()
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::String(s) => serializer.serialize_str(s),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Set(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Block(block) => block.serialize(serializer),
        }
    }
}

impl Serialize for Block {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a bool, integer, string, sequence or map")
    }

    fn visit_bool<E>(self, v: bool) -> Result<Self::Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E> {
        Ok(Value::Int(v))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        i64::try_from(v)
            .map(Value::Int)
            .map_err(|_| E::custom(format!("integer {v} is out of range")))
    }

    fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Err(E::custom(format!(
            "floating point numbers are not supported, found {v}"
        )))
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E> {
        Ok(Value::String(v.to_owned()))
    }

    fn visit_string<E>(self, v: String) -> Result<Self::Value, E> {
        Ok(Value::String(v))
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element::<Option<Value>>()? {
            items.extend(item);
        }
        Ok(Value::List(items))
    }

    fn visit_map<A>(self, map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        BlockVisitor.visit_map(map).map(Value::Block)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ValueVisitor)
    }
}

struct BlockVisitor;

impl<'de> Visitor<'de> for BlockVisitor {
    type Value = Block;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map of field names to values")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut block = Block::new();
        // Explicit nulls mean "unset" and are dropped
        while let Some((key, value)) = map.next_entry::<String, Option<Value>>()? {
            if let Some(value) = value {
                block.insert(key, value);
            }
        }
        Ok(block)
    }
}

impl<'de> Deserialize<'de> for Block {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(BlockVisitor)
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use rstest::rstest;

    use super::*;

    fn tree() -> Block {
        Block::new()
            .with("name", "example")
            .with("empty", "")
            .with("instances", 3)
            .with("overprovision", true)
            .with("zones", Value::string_list(["1", "2"]))
            .with("admin_ssh_key", Value::Set(BTreeSet::from([Value::Block(
                Block::new().with("username", "adminuser"),
            )])))
            .with("tags", Block::new().with("env", "test"))
    }

    #[test]
    fn string_accessors() {
        let tree = tree();

        assert_eq!(tree.required_str("name").unwrap(), "example");
        assert_eq!(tree.optional_str("empty").unwrap(), None);
        assert_eq!(tree.optional_str("missing").unwrap(), None);
        assert_eq!(
            tree.required_str("missing").unwrap_err(),
            Error::MissingField {
                field: "missing".to_owned()
            }
        );
    }

    #[rstest]
    #[case("instances", ValueKind::Bool, ValueKind::Int)]
    #[case("name", ValueKind::Bool, ValueKind::String)]
    fn bool_accessor_rejects_other_types(
        #[case] field: &str,
        #[case] expected: ValueKind,
        #[case] found: ValueKind,
    ) {
        let err = tree().bool_or(field, false).unwrap_err();
        assert_eq!(err, Error::UnexpectedType {
            field: field.to_owned(),
            expected,
            found,
        });
    }

    #[test]
    fn defaults_apply_to_missing_fields() {
        let tree = tree();

        assert!(tree.bool_or("overprovision", false).unwrap());
        assert!(tree.bool_or("missing", true).unwrap());
        assert_eq!(tree.optional_int("instances").unwrap(), Some(3));
        assert_eq!(tree.optional_int("missing").unwrap(), None);
    }

    #[test]
    fn collections() {
        let tree = tree();

        assert_eq!(tree.strings("zones").unwrap(), vec!["1", "2"]);
        assert!(tree.strings("missing").unwrap().is_empty());
        assert_eq!(tree.blocks("admin_ssh_key").unwrap().len(), 1);
        assert!(tree.first_block("missing").unwrap().is_none());
        assert_eq!(
            tree.string_map("tags").unwrap(),
            BTreeMap::from([("env".to_owned(), "test".to_owned())])
        );
        assert!(tree.blocks("name").is_err());
    }

    #[test]
    fn deserialize_drops_nulls() {
        let input = indoc! {"
            name: example
            computer_name_prefix: null
            instances: 2
            network_interface:
              - name: nic
                primary: true
        "};

        let block: Block = serde_yaml::from_str(input).unwrap();

        assert!(!block.contains_key("computer_name_prefix"));
        assert_eq!(block.required_int("instances").unwrap(), 2);
        let nic = block.first_block("network_interface").unwrap().unwrap();
        assert!(nic.bool_or("primary", false).unwrap());
    }

    #[test]
    fn deserialize_rejects_floats() {
        assert!(serde_yaml::from_str::<Block>("instances: 1.5").is_err());
    }

    #[test]
    fn sets_serialize_as_sequences() {
        let block = Block::new().with("ids", Value::string_set(["b", "a"]));
        let json = serde_json::to_string(&block).unwrap();
        assert_eq!(json, r#"{"ids":["a","b"]}"#);
    }
}
