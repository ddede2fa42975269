use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

/// The acting agent of a statement.
///
/// Which of the identifying fields (`mbox`, `openid`, `account`) ends up on
/// the wire is decided by the globally configured identifier preference, not
/// by which fields happen to be set here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Wire `objectType`; agents report `"Agent"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,

    /// Email URI, e.g. `mailto:learner@example.edu`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mbox: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub openid: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<ActorAccount>,
}

impl Actor {
    /// Create an agent actor.
    pub fn agent() -> Self {
        Self {
            object_type: Some("Agent".to_string()),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_mbox(mut self, mbox: impl Into<String>) -> Self {
        self.mbox = Some(mbox.into());
        self
    }

    pub fn with_openid(mut self, openid: impl Into<String>) -> Self {
        self.openid = Some(openid.into());
        self
    }

    pub fn with_account(mut self, account: ActorAccount) -> Self {
        self.account = Some(account);
        self
    }
}

/// Account identifier for an actor: a username scoped to a home page URL.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActorAccount {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub home_page: Option<String>,
}

/// What the actor did, as a verb URI plus per-locale display strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Verb {
    pub id: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub display: BTreeMap<String, String>,
}

impl Verb {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display: BTreeMap::new(),
        }
    }

    pub fn with_display(mut self, locale: impl Into<String>, text: impl Into<String>) -> Self {
        self.display.insert(locale.into(), text.into());
        self
    }
}

/// The learning object the statement is about. Always reported with
/// `objectType = "Activity"` on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearningObject {
    pub id: String,

    /// Per-locale activity names.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_name: Option<BTreeMap<String, String>>,

    /// Activity type URI.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_type: Option<String>,

    /// Per-locale descriptions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<BTreeMap<String, String>>,
}

impl LearningObject {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

/// Optional statement context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Context {
    /// Opaque `contextActivities` mapping, passed through untouched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activities: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructor: Option<Actor>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
}

/// Optional statement result.
///
/// A textual `grade` and the numeric score fields are mutually exclusive on
/// the wire: when `grade` is non-empty the mapper emits a grade
/// classification extension instead of a `score` block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion: Option<bool>,

    /// Elapsed seconds; zero means "not recorded".
    #[serde(default)]
    pub duration_seconds: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub scaled: Option<f64>,
}

/// One learning-activity statement: who did what to which learning object.
///
/// A statement may arrive in three forms, tried in this order:
/// 1. fully populated structured fields (`actor`, `verb`, `object`, ...),
/// 2. a pre-serialized raw key/value document (`raw_map`),
/// 3. already-formed raw JSON text (`raw_json`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<Actor>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub verb: Option<Verb>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub object: Option<LearningObject>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Context>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<StatementResult>,

    #[serde(default, with = "time::serde::rfc3339::option")]
    pub stored: Option<OffsetDateTime>,

    #[serde(default, with = "time::serde::rfc3339::option")]
    pub timestamp: Option<OffsetDateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_map: Option<Map<String, Value>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_json: Option<String>,
}

impl Statement {
    /// Create a fully populated structured statement.
    pub fn new(actor: Actor, verb: Verb, object: LearningObject) -> Self {
        Self {
            actor: Some(actor),
            verb: Some(verb),
            object: Some(object),
            ..Self::default()
        }
    }

    /// Whether all three required structured fields are present.
    pub fn is_populated(&self) -> bool {
        self.actor.is_some() && self.verb.is_some() && self.object.is_some()
    }

    pub fn with_context(mut self, context: Context) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_result(mut self, result: StatementResult) -> Self {
        self.result = Some(result);
        self
    }

    pub fn with_stored(mut self, stored: OffsetDateTime) -> Self {
        self.stored = Some(stored);
        self
    }

    pub fn with_timestamp(mut self, timestamp: OffsetDateTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}
