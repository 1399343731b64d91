use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{TypesError, TypesResult};

/// Process-wide unique message identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Generate a fresh identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A pipeline message: an ordered mapping of arbitrary fields.
///
/// The gate only reads a handful of designated fields (control topic,
/// payload, identifier, renege filter); everything else is opaque and is
/// forwarded untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Message(Map<String, Value>);

impl Message {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Build a message from an arbitrary JSON value, which must be an object.
    pub fn from_value(value: Value) -> TypesResult<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(TypesError::NotAnObject(json_kind(&other))),
        }
    }

    /// Builder-style field setter.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(field.into(), value.into())
    }

    /// Read the identifier stored in `id_field`.
    ///
    /// Numeric identifiers are accepted and rendered as strings.
    pub fn id(&self, id_field: &str) -> Option<MessageId> {
        match self.0.get(id_field)? {
            Value::String(s) => Some(MessageId::new(s.clone())),
            Value::Number(n) => Some(MessageId::new(n.to_string())),
            _ => None,
        }
    }

    /// Return the identifier in `id_field`, assigning a fresh one first if
    /// the message carries none.
    pub fn ensure_id(&mut self, id_field: &str) -> MessageId {
        if let Some(id) = self.id(id_field) {
            return id;
        }
        let id = MessageId::generate();
        self.0
            .insert(id_field.to_string(), Value::String(id.as_str().to_string()));
        id
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for Message {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Message {
    type Error = TypesError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Output of one handled event.
///
/// Serialized untagged: a single message renders as its object, a batch as
/// an array of objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Emission {
    /// One message (trigger, peek, pass-through).
    Single(Message),

    /// The whole queue as one collected emission (open, toggle release, flush).
    Batch(Vec<Message>),
}

impl Emission {
    /// Number of messages carried.
    pub fn len(&self) -> usize {
        match self {
            Emission::Single(_) => 1,
            Emission::Batch(batch) => batch.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
