use rusqlite::params;
use seele_core::Role;

use crate::{
    error::{Result, StoreError},
    types::{Conversation, ScoredConversation, TimeRange},
    vector::{deserialize_embedding, serialize_embedding, top_k_by_distance},
    Store,
};

impl Store {
    /// Insert a message. Writes the base row and its embedding in one
    /// statement (embedding lives in the same row's BLOB column).
    pub fn insert_conversation(
        &self,
        session_id: i64,
        timestamp: i64,
        role: Role,
        text: &str,
        embedding: Option<&[f32]>,
    ) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let blob = embedding.map(serialize_embedding);
        conn.execute(
            "INSERT INTO conversations (session_id, timestamp, role, text, embedding)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![session_id, timestamp, role.to_string(), text, blob],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// All messages in a session, chronological (oldest first).
    pub fn get_conversations_by_session(
        &self,
        session_id: i64,
        limit: Option<usize>,
    ) -> Result<Vec<Conversation>> {
        let conn = self.conn.lock().unwrap();
        let sql = match limit {
            Some(_) => {
                "SELECT id, session_id, timestamp, role, text FROM conversations
                 WHERE session_id = ?1 ORDER BY timestamp ASC, id ASC LIMIT ?2"
            }
            None => {
                "SELECT id, session_id, timestamp, role, text FROM conversations
                 WHERE session_id = ?1 ORDER BY timestamp ASC, id ASC"
            }
        };
        let mut stmt = conn.prepare(sql)?;
        let rows = if let Some(n) = limit {
            stmt.query_map(params![session_id, n as i64], row_to_conversation)?
                .collect::<std::result::Result<Vec<_>, _>>()?
        } else {
            stmt.query_map(params![session_id], row_to_conversation)?
                .collect::<std::result::Result<Vec<_>, _>>()?
        };
        Ok(rows)
    }

    /// Messages newer than the most recent summary's `last_timestamp` for
    /// this session, or all messages if the session has no summary yet.
    pub fn get_unsummarized_conversations(&self, session_id: i64) -> Result<Vec<Conversation>> {
        let conn = self.conn.lock().unwrap();
        let latest_summary_ts: Option<i64> = conn
            .query_row(
                "SELECT MAX(last_timestamp) FROM summaries WHERE session_id = ?1",
                params![session_id],
                |row| row.get(0),
            )
            .unwrap_or(None);

        let mut stmt = conn.prepare(
            "SELECT id, session_id, timestamp, role, text FROM conversations
             WHERE session_id = ?1 AND timestamp > ?2 ORDER BY timestamp ASC, id ASC",
        )?;
        let rows = stmt
            .query_map(
                params![session_id, latest_summary_ts.unwrap_or(i64::MIN)],
                row_to_conversation,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Messages inside `[start, end]`, used after a matching summary is
    /// found to bind retrieved conversations to its time range.
    pub fn get_conversations_by_time_range(
        &self,
        start_timestamp: i64,
        end_timestamp: i64,
        limit: usize,
    ) -> Result<Vec<Conversation>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, session_id, timestamp, role, text FROM conversations
             WHERE timestamp >= ?1 AND timestamp <= ?2
             ORDER BY timestamp ASC, id ASC LIMIT ?3",
        )?;
        let rows = stmt
            .query_map(
                params![start_timestamp, end_timestamp, limit as i64],
                row_to_conversation,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Vector-similarity search over all messages' embeddings.
    pub fn search_conversations(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredConversation>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, session_id, timestamp, role, text, embedding FROM conversations
             WHERE embedding IS NOT NULL",
        )?;
        let candidates: Vec<(i64, Vec<f32>, Conversation)> = stmt
            .query_map([], |row| {
                let conv = row_to_conversation(row)?;
                let blob: Vec<u8> = row.get(5)?;
                Ok((conv.id, deserialize_embedding(&blob), conv))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(top_k_by_distance(candidates, query_embedding, limit)
            .into_iter()
            .map(|(conversation, distance)| ScoredConversation {
                conversation,
                distance,
            })
            .collect())
    }

    /// Full-text search over message text. `query = None` returns
    /// filter-only results ordered by timestamp descending.
    pub fn search_conversations_by_keyword(
        &self,
        query: Option<&str>,
        limit: usize,
        exclude_session_id: Option<i64>,
        role: Option<Role>,
        range: TimeRange,
    ) -> Result<Vec<Conversation>> {
        if let Some(q) = query {
            validate_fts_query(q)?;
        }

        let conn = self.conn.lock().unwrap();
        let mut clauses = Vec::new();
        let mut sql_params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        let base = if let Some(q) = query {
            sql_params.push(Box::new(q.to_string()));
            "SELECT c.id, c.session_id, c.timestamp, c.role, c.text FROM conversations c
             JOIN fts_conversations f ON f.rowid = c.id
             WHERE f.text MATCH ?"
                .to_string()
        } else {
            "SELECT c.id, c.session_id, c.timestamp, c.role, c.text FROM conversations c WHERE 1=1"
                .to_string()
        };

        if let Some(sid) = exclude_session_id {
            clauses.push("c.session_id != ?".to_string());
            sql_params.push(Box::new(sid));
        }
        if let Some(r) = role {
            clauses.push("c.role = ?".to_string());
            sql_params.push(Box::new(r.to_string()));
        }
        if let Some(start) = range.start {
            clauses.push("c.timestamp >= ?".to_string());
            sql_params.push(Box::new(start));
        }
        if let Some(end) = range.end {
            clauses.push("c.timestamp <= ?".to_string());
            sql_params.push(Box::new(end));
        }

        let mut sql = base;
        for clause in &clauses {
            sql.push_str(" AND ");
            sql.push_str(clause);
        }
        sql.push_str(if query.is_some() {
            " ORDER BY f.rank LIMIT ?"
        } else {
            " ORDER BY c.timestamp DESC LIMIT ?"
        });
        sql_params.push(Box::new(limit as i64));

        let mut stmt = conn.prepare(&sql)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = sql_params.iter().map(|b| b.as_ref()).collect();
        let rows = stmt
            .query_map(param_refs.as_slice(), row_to_conversation)
            .map_err(StoreError::from)?
            .collect::<std::result::Result<Vec<_>, _>>();

        match rows {
            Ok(v) => Ok(v),
            Err(e) => {
                tracing::warn!("conversation keyword search failed: {e}");
                Ok(Vec::new())
            }
        }
    }
}

/// Balanced quotes/parens, no leading/trailing bare operator.
pub(crate) fn validate_fts_query(query: &str) -> Result<()> {
    let quote_count = query.matches('"').count();
    if quote_count % 2 != 0 {
        return Err(StoreError::InvalidFtsQuery {
            reason: "unbalanced quotes".to_string(),
        });
    }
    let open = query.matches('(').count();
    let close = query.matches(')').count();
    if open != close {
        return Err(StoreError::InvalidFtsQuery {
            reason: "unbalanced parentheses".to_string(),
        });
    }
    let trimmed = query.trim();
    let upper = trimmed.to_uppercase();
    for op in ["AND", "OR", "NOT"] {
        let next_char_is_boundary = match trimmed.chars().nth(op.len()) {
            Some(c) => c.is_whitespace(),
            None => true,
        };
        if upper.starts_with(op) && next_char_is_boundary {
            return Err(StoreError::InvalidFtsQuery {
                reason: format!("query must not start with bare operator {op}"),
            });
        }
        if upper.ends_with(op) {
            return Err(StoreError::InvalidFtsQuery {
                reason: format!("query must not end with bare operator {op}"),
            });
        }
    }
    Ok(())
}

fn row_to_conversation(row: &rusqlite::Row) -> rusqlite::Result<Conversation> {
    let role_str: String = row.get(3)?;
    Ok(Conversation {
        id: row.get(0)?,
        session_id: row.get(1)?,
        timestamp: row.get(2)?,
        role: role_str.parse::<Role>().unwrap_or(Role::User),
        text: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_fetch_roundtrip() {
        let store = Store::open_in_memory().unwrap();
        let sid = store.create_session(0).unwrap();
        store
            .insert_conversation(sid, 100, Role::User, "hello world", Some(&[1.0, 0.0]))
            .unwrap();
        let msgs = store.get_conversations_by_session(sid, None).unwrap();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].text, "hello world");
    }

    #[test]
    fn unsummarized_returns_all_without_summary() {
        let store = Store::open_in_memory().unwrap();
        let sid = store.create_session(0).unwrap();
        store.insert_conversation(sid, 100, Role::User, "a", None).unwrap();
        store.insert_conversation(sid, 200, Role::User, "b", None).unwrap();
        let unsummarized = store.get_unsummarized_conversations(sid).unwrap();
        assert_eq!(unsummarized.len(), 2);
    }

    #[test]
    fn fts_search_finds_inserted_text() {
        let store = Store::open_in_memory().unwrap();
        let sid = store.create_session(0).unwrap();
        store
            .insert_conversation(sid, 100, Role::User, "the quick brown fox", None)
            .unwrap();
        let results = store
            .search_conversations_by_keyword(Some("quick"), 10, None, None, TimeRange::default())
            .unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn vector_search_ranks_by_similarity() {
        let store = Store::open_in_memory().unwrap();
        let sid = store.create_session(0).unwrap();
        store
            .insert_conversation(sid, 100, Role::User, "close", Some(&[1.0, 0.0]))
            .unwrap();
        store
            .insert_conversation(sid, 200, Role::User, "far", Some(&[0.0, 1.0]))
            .unwrap();
        let results = store.search_conversations(&[1.0, 0.0], 2).unwrap();
        assert_eq!(results[0].conversation.text, "close");
    }

    #[test]
    fn rejects_unbalanced_fts_query() {
        let store = Store::open_in_memory().unwrap();
        let err = store.search_conversations_by_keyword(
            Some("\"unterminated"),
            10,
            None,
            None,
            TimeRange::default(),
        );
        assert!(err.is_err());
    }
}
