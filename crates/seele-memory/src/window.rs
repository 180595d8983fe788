use seele_core::Role;
use seele_llm::ChatMessage;

use crate::types::{RecentSummaryRef, WindowMessage};

/// The live portion of the current session: appended-to messages plus the
/// up-to-`RECENT_SUMMARIES_MAX` summaries already folded into the prompt.
/// Authoritative for what the LLM currently "has in front of it" — rebuilt
/// from the store on every restart so a resumed session stays coherent.
#[derive(Debug, Default)]
pub struct ContextWindow {
    messages: Vec<WindowMessage>,
    recent_summaries: Vec<RecentSummaryRef>,
    recent_summaries_max: usize,
}

impl ContextWindow {
    pub fn new(recent_summaries_max: usize) -> Self {
        Self {
            messages: Vec::new(),
            recent_summaries: Vec::new(),
            recent_summaries_max,
        }
    }

    pub fn add_message(&mut self, role: Role, text: String, timestamp: i64) {
        self.messages.push(WindowMessage {
            role,
            text,
            timestamp,
        });
    }

    /// Appends a summary reference, trimming the oldest once capacity is
    /// exceeded.
    pub fn add_summary(&mut self, id: i64, text: String) {
        self.recent_summaries.push(RecentSummaryRef { id, text });
        while self.recent_summaries.len() > self.recent_summaries_max {
            self.recent_summaries.remove(0);
        }
    }

    pub fn total_message_count(&self) -> usize {
        self.messages.len()
    }

    /// The prefix that would be summarized, keeping `keep` newest messages live.
    pub fn messages_for_summary(&self, keep: usize) -> &[WindowMessage] {
        let len = self.messages.len();
        let cut = len.saturating_sub(keep);
        &self.messages[..cut]
    }

    pub fn remove_earliest_messages(&mut self, n: usize) {
        let n = n.min(self.messages.len());
        self.messages.drain(..n);
    }

    pub fn as_chat_messages(&self) -> Vec<ChatMessage> {
        self.messages
            .iter()
            .map(|m| match m.role {
                Role::User => ChatMessage::user(m.text.clone()),
                Role::Assistant => ChatMessage::assistant(m.text.clone()),
            })
            .collect()
    }

    pub fn recent_summary_ids(&self) -> Vec<i64> {
        self.recent_summaries.iter().map(|s| s.id).collect()
    }

    pub fn recent_summaries(&self) -> &[RecentSummaryRef] {
        &self.recent_summaries
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.recent_summaries.clear();
    }

    pub fn messages(&self) -> &[WindowMessage] {
        &self.messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_summary_trims_front_past_capacity() {
        let mut window = ContextWindow::new(2);
        window.add_summary(1, "a".to_string());
        window.add_summary(2, "b".to_string());
        window.add_summary(3, "c".to_string());
        assert_eq!(window.recent_summary_ids(), vec![2, 3]);
    }

    #[test]
    fn messages_for_summary_keeps_suffix() {
        let mut window = ContextWindow::new(3);
        for i in 0..5 {
            window.add_message(Role::User, format!("m{i}"), i as i64);
        }
        let prefix = window.messages_for_summary(2);
        assert_eq!(prefix.len(), 3);
        assert_eq!(prefix[0].text, "m0");
    }

    #[test]
    fn remove_earliest_messages_drops_front() {
        let mut window = ContextWindow::new(3);
        for i in 0..4 {
            window.add_message(Role::User, format!("m{i}"), i as i64);
        }
        window.remove_earliest_messages(2);
        assert_eq!(window.messages().len(), 2);
        assert_eq!(window.messages()[0].text, "m2");
    }

    #[test]
    fn clear_empties_both_compartments() {
        let mut window = ContextWindow::new(3);
        window.add_message(Role::User, "hi".to_string(), 0);
        window.add_summary(1, "s".to_string());
        window.clear();
        assert_eq!(window.total_message_count(), 0);
        assert!(window.recent_summary_ids().is_empty());
    }
}
