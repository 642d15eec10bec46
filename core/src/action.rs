//! Tagged action payloads.
//!
//! Invoking a registered action runs its transform over the call arguments and
//! tags the resulting fields with the action name. That tagged value is what
//! the reducer matches on:
//!
//! ```
//! use simple_state_core::action::{Action, Fields};
//! use simple_state_core::json;
//!
//! let mut fields = Fields::new();
//! fields.insert("content".into(), json!("world"));
//!
//! let action = Action::tagged("addMessage", fields);
//! assert_eq!(action.action_type(), "addMessage");
//! assert_eq!(action.get_str("content"), Some("world"));
//! assert_eq!(
//!     serde_json::to_value(&action).ok(),
//!     Some(json!({ "type": "addMessage", "content": "world" })),
//! );
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Payload fields produced by an action transform
pub type Fields = Map<String, Value>;

/// Key under which the action name is serialized
pub const TYPE_KEY: &str = "type";

/// Key holding a transform result that is not a JSON object
pub const VALUE_KEY: &str = "value";

/// A transform's fields merged with the `type` tag of the action that produced them
///
/// The tag always wins: a transform that emits its own `type` field has it
/// replaced by the action name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    action_type: String,
    #[serde(flatten)]
    fields: Fields,
}

impl Action {
    /// Tag `fields` with the action name
    #[must_use]
    pub fn tagged(action_type: impl Into<String>, mut fields: Fields) -> Self {
        fields.remove(TYPE_KEY);
        Self {
            action_type: action_type.into(),
            fields,
        }
    }

    /// Tag the result of a transform
    ///
    /// Objects become the payload fields, `null` yields no fields and any
    /// other value is kept under [`VALUE_KEY`].
    #[must_use]
    pub fn from_value(action_type: impl Into<String>, value: Value) -> Self {
        let fields = match value {
            Value::Object(fields) => fields,
            Value::Null => Fields::new(),
            other => {
                let mut fields = Fields::new();
                fields.insert(VALUE_KEY.to_string(), other);
                fields
            },
        };
        Self::tagged(action_type, fields)
    }

    /// An action carrying no fields besides its tag
    #[must_use]
    pub fn bare(action_type: impl Into<String>) -> Self {
        Self::tagged(action_type, Fields::new())
    }

    /// The name of the action that produced this payload
    #[must_use]
    pub fn action_type(&self) -> &str {
        &self.action_type
    }

    /// Whether this payload was produced by the action `name`
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.action_type == name
    }

    /// All payload fields, without the tag
    #[must_use]
    pub const fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Look up a single field
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Look up a string field
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Deserialize the payload fields into a typed value
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error when the fields do not match `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.fields.clone()))
    }

    /// Consume the action, keeping only its fields
    #[must_use]
    pub fn into_fields(self) -> Fields {
        self.fields
    }
}
