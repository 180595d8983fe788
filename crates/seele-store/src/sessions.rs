use rusqlite::{params, OptionalExtension};

use crate::{
    error::Result,
    types::{Session, SessionStatus},
    Store,
};

impl Store {
    /// Create a new session with the given start time. Does not check for an
    /// existing active session — callers (`MemoryManager`) are responsible
    /// for enforcing at-most-one-active.
    pub fn create_session(&self, start_time: i64) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO sessions (start_time, end_time, status) VALUES (?1, NULL, 'active')",
            params![start_time],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Returns the current active session, if any. At most one should ever
    /// exist by the invariant in `spec.md` §3.
    pub fn get_active_session(&self) -> Result<Option<Session>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, start_time, end_time, status FROM sessions
             WHERE status = 'active' ORDER BY id DESC LIMIT 1",
            [],
            |row| row_to_session(row),
        )
        .optional()
        .map_err(Into::into)
    }

    /// Archive a session, recording its end time.
    pub fn close_session(&self, id: i64, end_time: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE sessions SET status = 'archived', end_time = ?1 WHERE id = ?2",
            params![end_time, id],
        )?;
        Ok(())
    }

    /// Delete a session and cascade to its messages and summaries (and their
    /// embeddings, which live in the same rows).
    pub fn delete_session(&self, id: i64) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM conversations WHERE session_id = ?1", params![id])?;
        tx.execute("DELETE FROM summaries WHERE session_id = ?1", params![id])?;
        tx.execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(())
    }
}

fn row_to_session(row: &rusqlite::Row) -> rusqlite::Result<Session> {
    let status_str: String = row.get(3)?;
    Ok(Session {
        id: row.get(0)?,
        start_time: row.get(1)?,
        end_time: row.get(2)?,
        status: status_str.parse::<SessionStatus>().unwrap_or(SessionStatus::Active),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_fetch_active_session() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.get_active_session().unwrap().is_none());
        let id = store.create_session(1000).unwrap();
        let active = store.get_active_session().unwrap().unwrap();
        assert_eq!(active.id, id);
        assert_eq!(active.status, SessionStatus::Active);
    }

    #[test]
    fn close_session_archives_it() {
        let store = Store::open_in_memory().unwrap();
        let id = store.create_session(1000).unwrap();
        store.close_session(id, 2000).unwrap();
        assert!(store.get_active_session().unwrap().is_none());
    }

    #[test]
    fn delete_session_cascades() {
        let store = Store::open_in_memory().unwrap();
        let id = store.create_session(1000).unwrap();
        store
            .insert_conversation(id, 1001, seele_core::Role::User, "hi", None)
            .unwrap();
        store.delete_session(id).unwrap();
        assert!(store.get_conversations_by_session(id, None).unwrap().is_empty());
    }
}
