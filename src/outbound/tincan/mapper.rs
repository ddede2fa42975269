use std::collections::BTreeMap;

use serde_json::{Map, Value};
use sha1::{Digest, Sha1};
use thiserror::Error;
use time::format_description::well_known::Rfc3339;

use crate::config::{ActorIdentifier, MappingSettings};
use crate::domain::{Actor, Context, LearningObject, Statement, StatementResult, Verb};
use crate::outbound::tincan::document::DocumentBuilder;

/// Extension URI carrying the grade classification when a textual grade is
/// present on a result.
const GRADE_EXTENSION_KEY: &str = "http://sakaiproject.org/xapi/extensions/result/classification";
const GRADE_ACTIVITY_PREFIX: &str = "http://sakaiproject.org/xapi/activities/";
const GRADE_ACTIVITY_TYPE: &str =
    "http://sakaiproject.org/xapi/activitytypes/grade_classification";

/// Errors raised while transforming a statement into its wire document.
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("statement missing or malformed required field: {0}")]
    MissingRequired(&'static str),

    #[error("failed to format statement timestamp: {0}")]
    TimestampFormat(String),
}

/// Map a structured statement to its ordered JSON wire document.
///
/// Pure and deterministic: the identifier preference and server base URL are
/// taken from `settings` rather than any ambient state. `actor`, `verb` and
/// `object` are required; `context`, `result`, `stored` and `timestamp` are
/// emitted only when present. Null or empty values never appear in the
/// output.
pub fn map_statement(
    statement: &Statement,
    settings: &MappingSettings,
) -> Result<Map<String, Value>, MappingError> {
    let actor = statement
        .actor
        .as_ref()
        .ok_or(MappingError::MissingRequired("actor"))?;
    let verb = statement
        .verb
        .as_ref()
        .ok_or(MappingError::MissingRequired("verb"))?;
    let object = statement
        .object
        .as_ref()
        .ok_or(MappingError::MissingRequired("object"))?;

    let mut doc = DocumentBuilder::new();
    doc.insert_document("actor", actor_document(actor, settings));
    doc.insert_document("verb", verb_document(verb));
    doc.insert_document("object", object_document(object));

    if let Some(context) = &statement.context {
        doc.insert_document("context", context_document(context, settings));
    }

    if let Some(result) = &statement.result {
        doc.insert_document("result", result_document(result));
    }

    if let Some(stored) = &statement.stored {
        doc.insert_text("stored", Some(&format_timestamp(stored)?));
    }

    if let Some(timestamp) = &statement.timestamp {
        doc.insert_text("timestamp", Some(&format_timestamp(timestamp)?));
    }

    Ok(doc.build())
}

/// Map an actor, emitting exactly the one identifier kind `settings` selects.
fn actor_document(actor: &Actor, settings: &MappingSettings) -> Map<String, Value> {
    let mut doc = DocumentBuilder::new();
    doc.insert_text("name", actor.name.as_deref());
    doc.insert_text("objectType", actor.object_type.as_deref());

    match settings.identifier {
        ActorIdentifier::Mbox => {
            doc.insert_text("mbox", actor.mbox.as_deref());
        }
        ActorIdentifier::MboxSha1Sum => {
            if let Some(mbox) = actor.mbox.as_deref() {
                let digest = hex::encode(Sha1::digest(mbox.as_bytes()));
                doc.insert_text("mbox_sha1sum", Some(&digest));
            }
        }
        ActorIdentifier::Openid => {
            doc.insert_text("openid", actor.openid.as_deref());
        }
        ActorIdentifier::Account => {
            let mut account = DocumentBuilder::new();

            let name = actor
                .account
                .as_ref()
                .and_then(|a| a.name.as_deref())
                .filter(|n| !n.trim().is_empty())
                .unwrap_or("unknown");
            account.insert_text("name", Some(name));

            let home_page = actor
                .account
                .as_ref()
                .and_then(|a| a.home_page.as_deref())
                .filter(|h| !h.trim().is_empty())
                .unwrap_or(&settings.server_url);
            account.insert_text("homePage", Some(home_page));

            doc.insert_document("account", account.build());
        }
    }

    doc.build()
}

fn verb_document(verb: &Verb) -> Map<String, Value> {
    let mut doc = DocumentBuilder::new();
    doc.insert_text("id", Some(&verb.id));
    doc.insert("display", locale_value(Some(&verb.display)));
    doc.build()
}

/// Map a learning object. `objectType` is always reported as `"Activity"`
/// regardless of the domain input.
fn object_document(object: &LearningObject) -> Map<String, Value> {
    let mut definition = DocumentBuilder::new();
    definition.insert("name", locale_value(object.activity_name.as_ref()));
    definition.insert_text("type", object.activity_type.as_deref());
    definition.insert("description", locale_value(object.description.as_ref()));

    let mut doc = DocumentBuilder::new();
    doc.insert_text("id", Some(&object.id));
    doc.insert_text("objectType", Some("Activity"));
    doc.insert_document("definition", definition.build());
    doc.build()
}

fn context_document(context: &Context, settings: &MappingSettings) -> Map<String, Value> {
    let mut doc = DocumentBuilder::new();

    if let Some(activities) = &context.activities {
        doc.insert("contextActivities", activities.clone());
    }

    if let Some(instructor) = &context.instructor {
        doc.insert_document("instructor", actor_document(instructor, settings));
    }

    doc.insert_text("revision", context.revision.as_deref());
    doc.build()
}

/// Map a result. A non-empty textual grade selects the classification
/// extension branch; otherwise the numeric score block is emitted. The two
/// never appear together.
fn result_document(result: &StatementResult) -> Map<String, Value> {
    let mut doc = DocumentBuilder::new();
    doc.insert_bool("completion", result.completion);

    // ISO 8601 duration, only when something was actually measured
    if result.duration_seconds > 0 {
        doc.insert_text("duration", Some(&format!("PT{}S", result.duration_seconds)));
    }

    let grade = result
        .grade
        .as_deref()
        .filter(|g| !g.trim().is_empty());

    match grade {
        None => {
            let mut score = DocumentBuilder::new();
            score.insert_f64("max", result.max);
            score.insert_f64("min", result.min);
            score.insert_f64("raw", result.raw);
            score.insert_f64("scaled", result.scaled);
            doc.insert_document("score", score.build());
        }
        Some(grade) => {
            let mut name = DocumentBuilder::new();
            name.insert_text("en-US", Some(grade));

            let mut definition = DocumentBuilder::new();
            definition.insert_text("type", Some(GRADE_ACTIVITY_TYPE));
            definition.insert_document("name", name.build());

            let mut classification = DocumentBuilder::new();
            classification.insert_text("objectType", Some("activity"));
            classification.insert_text("id", Some(&format!("{GRADE_ACTIVITY_PREFIX}{grade}")));
            classification.insert_document("definition", definition.build());

            let mut extensions = DocumentBuilder::new();
            extensions.insert_document(GRADE_EXTENSION_KEY, classification.build());
            doc.insert_document("extensions", extensions.build());
        }
    }

    doc.insert_bool("success", result.success);
    doc.insert_text("response", result.response.as_deref());
    doc.build()
}

/// Convert a per-locale text mapping to a JSON object, dropping blank
/// entries. `Null` when there is nothing to emit.
fn locale_value(map: Option<&BTreeMap<String, String>>) -> Value {
    match map {
        Some(entries) => {
            let mut doc = DocumentBuilder::new();
            for (locale, text) in entries {
                doc.insert_text(locale, Some(text));
            }
            Value::Object(doc.build())
        }
        None => Value::Null,
    }
}

/// ISO 8601 with time zone.
fn format_timestamp(ts: &time::OffsetDateTime) -> Result<String, MappingError> {
    ts.format(&Rfc3339)
        .map_err(|e| MappingError::TimestampFormat(e.to_string()))
}
