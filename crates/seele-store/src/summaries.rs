use rusqlite::{params, OptionalExtension};

use crate::{
    conversations::validate_fts_query,
    error::{Result, StoreError},
    types::{ScoredSummary, Summary, TimeRange},
    vector::{deserialize_embedding, serialize_embedding, top_k_by_distance},
    Store,
};

impl Store {
    pub fn insert_summary(
        &self,
        session_id: i64,
        summary: &str,
        first_timestamp: i64,
        last_timestamp: i64,
        embedding: Option<&[f32]>,
    ) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let blob = embedding.map(serialize_embedding);
        conn.execute(
            "INSERT INTO summaries (session_id, summary, first_timestamp, last_timestamp, embedding)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![session_id, summary, first_timestamp, last_timestamp, blob],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Summaries for a session, newest (`last_timestamp`) first.
    pub fn get_summaries_by_session(&self, session_id: i64) -> Result<Vec<Summary>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, session_id, summary, first_timestamp, last_timestamp FROM summaries
             WHERE session_id = ?1 ORDER BY last_timestamp DESC, id DESC",
        )?;
        let rows = stmt
            .query_map(params![session_id], row_to_summary)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn get_summary_by_id(&self, id: i64) -> Result<Option<Summary>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, session_id, summary, first_timestamp, last_timestamp FROM summaries
             WHERE id = ?1",
            params![id],
            row_to_summary,
        )
        .optional()
        .map_err(Into::into)
    }

    /// Vector-similarity search over summary embeddings, excluding `exclude_ids`.
    pub fn search_summaries(
        &self,
        query_embedding: &[f32],
        limit: usize,
        exclude_ids: &[i64],
    ) -> Result<Vec<ScoredSummary>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, session_id, summary, first_timestamp, last_timestamp, embedding
             FROM summaries WHERE embedding IS NOT NULL",
        )?;
        let candidates: Vec<(i64, Vec<f32>, Summary)> = stmt
            .query_map([], |row| {
                let s = row_to_summary(row)?;
                let blob: Vec<u8> = row.get(5)?;
                Ok((s.id, deserialize_embedding(&blob), s))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?
            .into_iter()
            .filter(|(id, _, _)| !exclude_ids.contains(id))
            .collect();

        Ok(top_k_by_distance(candidates, query_embedding, limit)
            .into_iter()
            .map(|(summary, distance)| ScoredSummary { summary, distance })
            .collect())
    }

    /// Full-text search over summary text. `query = None` returns
    /// filter-only results ordered by timestamp descending.
    pub fn search_summaries_by_keyword(
        &self,
        query: Option<&str>,
        limit: usize,
        exclude_session_id: Option<i64>,
        range: TimeRange,
    ) -> Result<Vec<Summary>> {
        if let Some(q) = query {
            validate_fts_query(q)?;
        }

        let conn = self.conn.lock().unwrap();
        let mut clauses = Vec::new();
        let mut sql_params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        let base = if let Some(q) = query {
            sql_params.push(Box::new(q.to_string()));
            "SELECT s.id, s.session_id, s.summary, s.first_timestamp, s.last_timestamp
             FROM summaries s JOIN fts_summaries f ON f.rowid = s.id
             WHERE f.summary MATCH ?"
                .to_string()
        } else {
            "SELECT s.id, s.session_id, s.summary, s.first_timestamp, s.last_timestamp
             FROM summaries s WHERE 1=1"
                .to_string()
        };

        if let Some(sid) = exclude_session_id {
            clauses.push("s.session_id != ?".to_string());
            sql_params.push(Box::new(sid));
        }
        if let Some(start) = range.start {
            clauses.push("s.last_timestamp >= ?".to_string());
            sql_params.push(Box::new(start));
        }
        if let Some(end) = range.end {
            clauses.push("s.first_timestamp <= ?".to_string());
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
            " ORDER BY s.last_timestamp DESC LIMIT ?"
        });
        sql_params.push(Box::new(limit as i64));

        let mut stmt = conn.prepare(&sql)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = sql_params.iter().map(|b| b.as_ref()).collect();
        let rows = stmt
            .query_map(param_refs.as_slice(), row_to_summary)
            .map_err(StoreError::from)?
            .collect::<std::result::Result<Vec<_>, _>>();

        match rows {
            Ok(v) => Ok(v),
            Err(e) => {
                tracing::warn!("summary keyword search failed: {e}");
                Ok(Vec::new())
            }
        }
    }
}

fn row_to_summary(row: &rusqlite::Row) -> rusqlite::Result<Summary> {
    Ok(Summary {
        id: row.get(0)?,
        session_id: row.get(1)?,
        summary: row.get(2)?,
        first_timestamp: row.get(3)?,
        last_timestamp: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_list_summaries_newest_first() {
        let store = Store::open_in_memory().unwrap();
        let sid = store.create_session(0).unwrap();
        store.insert_summary(sid, "first", 0, 100, None).unwrap();
        store.insert_summary(sid, "second", 101, 200, None).unwrap();
        let summaries = store.get_summaries_by_session(sid).unwrap();
        assert_eq!(summaries[0].summary, "second");
    }

    #[test]
    fn search_summaries_excludes_ids() {
        let store = Store::open_in_memory().unwrap();
        let sid = store.create_session(0).unwrap();
        let id1 = store
            .insert_summary(sid, "a", 0, 100, Some(&[1.0, 0.0]))
            .unwrap();
        store
            .insert_summary(sid, "b", 101, 200, Some(&[1.0, 0.0]))
            .unwrap();
        let results = store.search_summaries(&[1.0, 0.0], 10, &[id1]).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].summary.summary, "b");
    }
}
