use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

pub const ANONYMOUS_USER: &str = "anonymous";

/// A titled, typed entity. Any field beyond `id`, `title` and `type` is kept
/// verbatim in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource {
    /// Builds a new resource from a validated payload. The generated id
    /// replaces any `id` the client sent.
    pub fn from_payload(mut payload: Map<String, Value>) -> Result<Self, serde_json::Error> {
        payload.insert("id".to_string(), Value::String(new_id()));
        serde_json::from_value(Value::Object(payload))
    }

    pub fn author_id(&self) -> Option<&str> {
        self.extra.get("authorId").and_then(Value::as_str)
    }

    /// Shallow merge: keys in `patch` overwrite same-named keys, nested values
    /// are replaced wholesale. A patched `id` is taken as-is.
    pub fn merged(&self, patch: Map<String, Value>) -> Result<Self, serde_json::Error> {
        let mut fields = match serde_json::to_value(self)? {
            Value::Object(fields) => fields,
            _ => Map::new(),
        };
        fields.extend(patch);
        serde_json::from_value(Value::Object(fields))
    }
}

/// A comment on a resource. Unknown keys already in the store are kept in
/// `extra` and written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub id: String,
    pub resource_id: String,
    pub feedback_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub timestamp: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Feedback {
    pub fn new(resource_id: String, feedback_text: String, user_id: Option<String>) -> Self {
        let user_id = user_id
            .filter(|user| !user.is_empty())
            .unwrap_or_else(|| ANONYMOUS_USER.to_string());

        Self {
            id: new_id(),
            resource_id,
            feedback_text,
            user_id: Some(user_id),
            timestamp: now(),
            extra: Map::new(),
        }
    }

    pub fn belongs_to(&self, resource_id: &str, feedback_id: &str) -> bool {
        self.id == feedback_id && self.resource_id == resource_id
    }

    pub fn revise(&mut self, feedback_text: String) {
        self.feedback_text = feedback_text;
        self.timestamp = now();
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFeedback {
    pub feedback_text: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackUpdate {
    pub feedback_text: Option<String>,
}

/// Equality filters of `GET /resources`.
///
/// An empty value disables its filter. A key given more than once matches
/// nothing.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ResourceFilter {
    pub kind: FilterValue,
    pub author_id: FilterValue,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub enum FilterValue {
    #[default]
    Any,
    Empty,
    Exactly(String),
    Conflicting,
}

impl FilterValue {
    fn push(&mut self, value: String) {
        *self = match std::mem::take(self) {
            FilterValue::Any if value.is_empty() => FilterValue::Empty,
            FilterValue::Any => FilterValue::Exactly(value),
            _ => FilterValue::Conflicting,
        };
    }

    fn accepts(&self, actual: Option<&str>) -> bool {
        match self {
            FilterValue::Any | FilterValue::Empty => true,
            FilterValue::Exactly(expected) => actual == Some(expected.as_str()),
            FilterValue::Conflicting => false,
        }
    }
}

impl ResourceFilter {
    /// Builds the filter from decoded query pairs. Unrelated keys are ignored.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut filter = Self::default();
        for (key, value) in pairs {
            match key.as_ref() {
                "type" => filter.kind.push(value.into()),
                "authorId" => filter.author_id.push(value.into()),
                _ => {}
            }
        }
        filter
    }

    pub fn matches(&self, resource: &Resource) -> bool {
        self.kind.accepts(Some(resource.kind.as_str())) && self.author_id.accepts(resource.author_id())
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
