use serde_json::{json, Value};

use crate::error::{ProfileError, Result};

/// Max number of `memorable_events` entries retained; oldest trimmed first.
pub const MAX_MEMORABLE_EVENTS: usize = 20;

const REQUIRED_TOP_LEVEL_KEYS: [&str; 4] =
    ["bot", "user", "memorable_events", "commands_and_agreements"];

/// The default template used on first run, before any conversation has
/// populated the profile.
pub fn default_template() -> Value {
    json!({
        "bot": {
            "name": "",
            "gender": "",
            "birthday": "",
            "role": "",
            "appearance": "",
            "likes": [],
            "dislikes": [],
            "language_style": { "description": "", "examples": [] },
            "personality": { "mbti": "", "description": "", "worldview_and_values": "" },
            "emotions_and_needs": { "long_term": "", "short_term": "" },
            "relationship_with_user": ""
        },
        "user": {
            "name": "",
            "gender": "",
            "birthday": "",
            "personal_facts": [],
            "abilities": [],
            "likes": [],
            "dislikes": [],
            "personality": { "mbti": "", "description": "", "worldview_and_values": "" },
            "emotions_and_needs": { "long_term": "", "short_term": "" }
        },
        "memorable_events": [],
        "commands_and_agreements": []
    })
}

/// Verify the required top-level keys are present and the memorable-events
/// cap holds.
pub fn validate(doc: &Value) -> Result<()> {
    let obj = doc.as_object().ok_or(ProfileError::MissingKey("bot"))?;
    for key in REQUIRED_TOP_LEVEL_KEYS {
        if !obj.contains_key(key) {
            return Err(ProfileError::MissingKey(match key {
                "bot" => "bot",
                "user" => "user",
                "memorable_events" => "memorable_events",
                _ => "commands_and_agreements",
            }));
        }
    }
    if memorable_events_len(doc) > MAX_MEMORABLE_EVENTS {
        return Err(ProfileError::PatchFailed(format!(
            "memorable_events exceeds cap of {MAX_MEMORABLE_EVENTS}"
        )));
    }
    Ok(())
}

pub fn memorable_events_len(doc: &Value) -> usize {
    doc.get("memorable_events")
        .and_then(Value::as_array)
        .map(Vec::len)
        .unwrap_or(0)
}

/// Truncate `memorable_events` to the cap, dropping the oldest entries.
pub fn truncate_memorable_events(doc: &mut Value) {
    if let Some(events) = doc.get_mut("memorable_events").and_then(Value::as_array_mut) {
        if events.len() > MAX_MEMORABLE_EVENTS {
            let excess = events.len() - MAX_MEMORABLE_EVENTS;
            events.drain(0..excess);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_template_validates() {
        assert!(validate(&default_template()).is_ok());
    }

    #[test]
    fn missing_key_rejected() {
        let doc = json!({"bot": {}, "user": {}, "memorable_events": []});
        assert!(validate(&doc).is_err());
    }

    #[test]
    fn truncate_drops_oldest() {
        let mut doc = default_template();
        let events: Vec<Value> = (0..25).map(|i| json!({"time": format!("{i}")})).collect();
        doc["memorable_events"] = json!(events);
        truncate_memorable_events(&mut doc);
        assert_eq!(memorable_events_len(&doc), MAX_MEMORABLE_EVENTS);
        assert_eq!(doc["memorable_events"][0]["time"], "5");
    }
}
