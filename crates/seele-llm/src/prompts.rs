//! Prompt composition: the single-large-cacheable-block system prompt plus
//! the per-turn message sequence, and the three background-call prompts.

use serde_json::Value;

use crate::types::ChatMessage;

const STATIC_INSTRUCTIONS: &str = "\
You are a conversational companion with a persistent memory of this user. \
When you recall something from retrieved history, wrap the reference in \
<blockquote>[time] role: content</blockquote> before continuing your reply. \
You have access to tools; use them when they would materially improve your answer.";

const BEGINNING_SENTINEL: &str = "BEGINNING OF THE CURRENT CONVERSATION.";
const END_SENTINEL: &str = "END OF THE CURRENT CONVERSATION.";
const CURRENT_REQUEST_MARKER: &str = "\u{26A1} [Current Request]";

/// Render the bot-identity, user-profile, memorable-events, and
/// commands-and-agreements sections from the profile document, plus the
/// static instructions and recent-summaries block.
pub fn build_system_prompt(profile: &Value, recent_summaries: &[(i64, String)]) -> String {
    let mut sections = vec![STATIC_INSTRUCTIONS.to_string()];

    sections.push(render_bot_identity(profile));
    sections.push(render_user_profile(profile));

    if let Some(events) = render_memorable_events(profile) {
        sections.push(events);
    }
    if let Some(agreements) = render_commands_and_agreements(profile) {
        sections.push(agreements);
    }

    if !recent_summaries.is_empty() {
        let mut block = String::from("Recent summaries already in context:\n");
        for (_, text) in recent_summaries {
            block.push_str("- ");
            block.push_str(text);
            block.push('\n');
        }
        sections.push(block.trim_end().to_string());
    }

    sections.join("\n\n")
}

fn render_bot_identity(profile: &Value) -> String {
    let bot = &profile["bot"];
    format!(
        "== Bot Identity ==\nName: {}\nPersonality: {}\nLanguage style: {}\nRelationship with user: {}",
        bot["name"].as_str().unwrap_or(""),
        bot["personality"]["description"].as_str().unwrap_or(""),
        bot["language_style"]["description"].as_str().unwrap_or(""),
        bot["relationship_with_user"].as_str().unwrap_or(""),
    )
}

fn render_user_profile(profile: &Value) -> String {
    let user = &profile["user"];
    let facts = join_str_array(&user["personal_facts"]);
    let likes = join_str_array(&user["likes"]);
    format!(
        "== User Profile ==\nName: {}\nFacts: {}\nLikes: {}\nPersonality: {}",
        user["name"].as_str().unwrap_or(""),
        facts,
        likes,
        user["personality"]["description"].as_str().unwrap_or(""),
    )
}

fn render_memorable_events(profile: &Value) -> Option<String> {
    let events = profile["memorable_events"].as_array()?;
    if events.is_empty() {
        return None;
    }
    let mut block = String::from("== Memorable Events ==\n");
    for event in events {
        block.push_str(&format!(
            "- [{}] {}\n",
            event["time"].as_str().unwrap_or(""),
            event["details"].as_str().unwrap_or("")
        ));
    }
    Some(block.trim_end().to_string())
}

fn render_commands_and_agreements(profile: &Value) -> Option<String> {
    let items = profile["commands_and_agreements"].as_array()?;
    if items.is_empty() {
        return None;
    }
    let mut block = String::from("== Commands and Agreements ==\n");
    for item in items {
        if let Some(s) = item.as_str() {
            block.push_str("- ");
            block.push_str(s);
            block.push('\n');
        }
    }
    Some(block.trim_end().to_string())
}

fn join_str_array(value: &Value) -> String {
    value
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default()
}

/// Build the full per-turn message list: system prompt, sentinel
/// begin/end markers around the in-window history (excluding the current
/// input), retrieved memories, the current time, and finally the current
/// user input wrapped with an emphasis marker.
#[allow(clippy::too_many_arguments)]
pub fn build_turn_messages(
    system_prompt: String,
    window_messages_except_last: &[ChatMessage],
    retrieved_summaries_text: Option<&str>,
    retrieved_conversations_text: Option<&str>,
    current_time_str: &str,
    current_user_input: &str,
) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::system(system_prompt)];
    messages.push(ChatMessage::system(BEGINNING_SENTINEL));
    messages.extend_from_slice(window_messages_except_last);
    messages.push(ChatMessage::system(END_SENTINEL));

    if let Some(text) = retrieved_summaries_text {
        if !text.is_empty() {
            messages.push(ChatMessage::system(format!(
                "Related summaries from long-term memory:\n{text}"
            )));
        }
    }
    if let Some(text) = retrieved_conversations_text {
        if !text.is_empty() {
            messages.push(ChatMessage::system(format!(
                "Related past conversations:\n{text}"
            )));
        }
    }

    messages.push(ChatMessage::system(format!("Current time: {current_time_str}")));
    messages.push(ChatMessage::user(format!(
        "{CURRENT_REQUEST_MARKER} {current_user_input}"
    )));

    messages
}

/// Summary prompt: ≤300 words, third person, chronology preserved, covering
/// only the provided messages (each Summary is independent).
pub fn summary_prompt(messages_text: &str) -> String {
    format!(
        "Summarize the following conversation in at most 300 words, in the \
third person, preserving chronological order. Cover only the messages \
below — do not reference any earlier context. Write in the dominant \
language of the conversation. Output only the summary text, no markdown \
fences, no preamble.\n\n{messages_text}"
    )
}

/// Patch prompt: output must be a pure JSON array of RFC 6902 operations.
pub fn memory_update_prompt(
    messages_text: &str,
    current_profile_json: &str,
    first_timestamp: i64,
    last_timestamp: i64,
) -> String {
    format!(
        "Given the conversation below (covering timestamps {first_timestamp} to \
{last_timestamp}) and the current profile document, output a JSON array of \
RFC 6902 JSON Patch operations (add, replace, remove) using JSON-Pointer \
paths that updates the profile with any new facts, preferences, or \
memorable events. Use \"/-\" to append to an array. The \
\"memorable_events\" array must never exceed 20 entries after applying \
your patch — issue \"remove\" operations for the oldest entries before \
any \"add\". Match the language of the conversation. Output only the JSON \
array, no markdown fences, no commentary.\n\nCurrent profile:\n{current_profile_json}\n\nConversation:\n{messages_text}"
    )
}

/// Full-profile prompt: used only as the fallback when patch
/// generation/application fails.
pub fn full_profile_prompt(
    messages_text: &str,
    current_profile_json: &str,
    error_message: &str,
    first_timestamp: i64,
    last_timestamp: i64,
) -> String {
    format!(
        "A previous attempt to patch the profile document failed with: \
\"{error_message}\". Given the conversation below (covering timestamps \
{first_timestamp} to {last_timestamp}) and the current profile document, \
output the ENTIRE replacement profile document as a single JSON object \
conforming to the same schema (top-level keys: bot, user, \
memorable_events, commands_and_agreements). The \"memorable_events\" array \
must not exceed 20 entries, oldest trimmed first. Match the language of \
the conversation. Output only the JSON object, no markdown fences, no \
commentary.\n\nCurrent profile:\n{current_profile_json}\n\nConversation:\n{messages_text}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn system_prompt_includes_identity_and_events() {
        let profile = json!({
            "bot": {"name": "Seele", "personality": {"description": "warm"}, "language_style": {"description": "casual"}, "relationship_with_user": "friend"},
            "user": {"name": "Alice", "personal_facts": ["likes tea"], "likes": ["tea"], "personality": {"description": "curious"}},
            "memorable_events": [{"time": "2024-01-01", "details": "met"}],
            "commands_and_agreements": ["call me Al"]
        });
        let prompt = build_system_prompt(&profile, &[]);
        assert!(prompt.contains("Seele"));
        assert!(prompt.contains("Alice"));
        assert!(prompt.contains("met"));
        assert!(prompt.contains("call me Al"));
    }

    #[test]
    fn turn_messages_wrap_current_input() {
        let messages = build_turn_messages(
            "sys".to_string(),
            &[],
            None,
            None,
            "2024-01-01 10:00:00",
            "hello",
        );
        let last = messages.last().unwrap();
        assert!(last.content.as_ref().unwrap().contains("hello"));
        assert!(last.content.as_ref().unwrap().starts_with('\u{26A1}'));
    }
}
