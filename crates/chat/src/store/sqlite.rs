//! SQLite-backed store.

use super::ChatStore;
use crate::types::{Citation, NewCitation, Rating, Role, Session, Turn};
use chrono::{DateTime, Utc};
use docent_core::{AppError, AppResult};
use docent_knowledge::DocumentKind;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    scope TEXT NOT NULL,
    owner TEXT,
    title TEXT NOT NULL,
    share_token TEXT,
    created_at TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_sessions_share_token ON sessions(share_token);

CREATE TABLE IF NOT EXISTS turns (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    session_id TEXT NOT NULL,
    role TEXT NOT NULL,
    text TEXT,
    rating TEXT,
    feedback_tag TEXT,
    incomplete INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    FOREIGN KEY (session_id) REFERENCES sessions(id)
);

CREATE INDEX IF NOT EXISTS idx_turns_session ON turns(session_id, seq);

CREATE TABLE IF NOT EXISTS citations (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    turn_id TEXT NOT NULL,
    document_id TEXT NOT NULL,
    title TEXT NOT NULL,
    kind TEXT NOT NULL,
    fragment_id TEXT NOT NULL,
    score REAL NOT NULL,
    FOREIGN KEY (turn_id) REFERENCES turns(id)
);

CREATE INDEX IF NOT EXISTS idx_citations_turn ON citations(turn_id, seq);
"#;

const SESSION_COLUMNS: &str = "id, scope, owner, title, share_token, created_at";
const TURN_COLUMNS: &str =
    "id, session_id, role, text, rating, feedback_tag, incomplete, created_at";
const CITATION_COLUMNS: &str = "id, turn_id, document_id, title, kind, fragment_id, score";

/// Store backed by a single SQLite connection.
///
/// Turns are ordered by an autoincrement sequence, so turns created within
/// the same clock tick still list in creation order.
pub struct SqliteChatStore {
    conn: Mutex<Connection>,
}

impl SqliteChatStore {
    /// Open (or create) the database at `db_path`.
    pub fn open(db_path: &Path) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Store(format!("Failed to create database directory: {}", e))
            })?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| AppError::Store(format!("Failed to open chat database: {}", e)))?;

        tracing::debug!("Opened chat database at {:?}", db_path);
        Self::with_connection(conn)
    }

    /// Private in-memory database.
    pub fn open_in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Store(format!("Failed to open in-memory database: {}", e)))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> AppResult<Self> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| AppError::Store(format!("Failed to create tables: {}", e)))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Store("Chat database lock poisoned".to_string()))
    }
}

fn store_err(context: &str) -> impl FnOnce(rusqlite::Error) -> AppError + '_ {
    move |e| AppError::Store(format!("{}: {}", context, e))
}

fn conversion_error(column: usize, err: AppError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(err))
}

fn parse_time(column: usize, value: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| conversion_error(column, AppError::Store(format!("Bad timestamp: {}", e))))
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<Session> {
    Ok(Session {
        id: row.get(0)?,
        scope: row.get(1)?,
        owner: row.get(2)?,
        title: row.get(3)?,
        share_token: row.get(4)?,
        created_at: parse_time(5, row.get(5)?)?,
    })
}

fn turn_from_row(row: &Row<'_>) -> rusqlite::Result<Turn> {
    let role: String = row.get(2)?;
    let rating: Option<String> = row.get(4)?;

    Ok(Turn {
        id: row.get(0)?,
        session_id: row.get(1)?,
        role: Role::parse(&role).map_err(|e| conversion_error(2, e))?,
        text: row.get(3)?,
        rating: rating
            .as_deref()
            .map(Rating::parse)
            .transpose()
            .map_err(|e| conversion_error(4, e))?,
        feedback_tag: row.get(5)?,
        incomplete: row.get::<_, i64>(6)? != 0,
        created_at: parse_time(7, row.get(7)?)?,
    })
}

fn citation_from_row(row: &Row<'_>) -> rusqlite::Result<Citation> {
    let kind: String = row.get(4)?;

    Ok(Citation {
        id: row.get(0)?,
        turn_id: row.get(1)?,
        document_id: row.get(2)?,
        title: row.get(3)?,
        kind: DocumentKind::parse(&kind).ok_or_else(|| {
            conversion_error(4, AppError::Store(format!("Unknown document kind: {}", kind)))
        })?,
        fragment_id: row.get(5)?,
        score: row.get::<_, f64>(6)? as f32,
    })
}

fn load_turn(conn: &Connection, turn_id: &str) -> AppResult<Option<Turn>> {
    conn.query_row(
        &format!("SELECT {} FROM turns WHERE id = ?1", TURN_COLUMNS),
        params![turn_id],
        turn_from_row,
    )
    .optional()
    .map_err(store_err("Failed to load turn"))
}

fn require_assistant_turn(conn: &Connection, turn_id: &str) -> AppResult<()> {
    let turn = load_turn(conn, turn_id)?
        .ok_or_else(|| AppError::NotFound(format!("Turn {}", turn_id)))?;
    if turn.role != Role::Assistant {
        return Err(AppError::InvalidInput(format!(
            "Turn {} is not an assistant turn",
            turn_id
        )));
    }
    Ok(())
}

fn insert_citation(conn: &Connection, citation: &Citation) -> AppResult<()> {
    conn.execute(
        &format!(
            "INSERT INTO citations ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            CITATION_COLUMNS
        ),
        params![
            citation.id,
            citation.turn_id,
            citation.document_id,
            citation.title,
            citation.kind.as_str(),
            citation.fragment_id,
            citation.score as f64,
        ],
    )
    .map_err(store_err("Failed to insert citation"))?;
    Ok(())
}

fn session_exists(conn: &Connection, session_id: &str) -> AppResult<()> {
    let exists: bool = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM sessions WHERE id = ?1)",
            params![session_id],
            |row| row.get(0),
        )
        .map_err(store_err("Failed to check session"))?;
    if !exists {
        return Err(AppError::NotFound(format!("Session {}", session_id)));
    }
    Ok(())
}

fn insert_turn(conn: &Connection, turn: &Turn) -> AppResult<()> {
    conn.execute(
        &format!(
            "INSERT INTO turns ({}) VALUES (?1, ?2, ?3, ?4, NULL, NULL, ?5, ?6)",
            TURN_COLUMNS
        ),
        params![
            turn.id,
            turn.session_id,
            turn.role.as_str(),
            turn.text,
            turn.incomplete as i64,
            turn.created_at.to_rfc3339(),
        ],
    )
    .map_err(store_err("Failed to insert turn"))?;
    Ok(())
}

fn expect_one_row(changed: usize, what: &str, id: &str) -> AppResult<()> {
    if changed == 0 {
        return Err(AppError::NotFound(format!("{} {}", what, id)));
    }
    Ok(())
}

impl ChatStore for SqliteChatStore {
    fn create_session(&self, scope: &str, owner: Option<&str>, title: &str) -> AppResult<Session> {
        let session = Session::new(scope, owner.map(str::to_string), title);
        self.lock()?
            .execute(
                &format!(
                    "INSERT INTO sessions ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    SESSION_COLUMNS
                ),
                params![
                    session.id,
                    session.scope,
                    session.owner,
                    session.title,
                    session.share_token,
                    session.created_at.to_rfc3339(),
                ],
            )
            .map_err(store_err("Failed to insert session"))?;
        Ok(session)
    }

    fn get_session(&self, session_id: &str) -> AppResult<Option<Session>> {
        self.lock()?
            .query_row(
                &format!("SELECT {} FROM sessions WHERE id = ?1", SESSION_COLUMNS),
                params![session_id],
                session_from_row,
            )
            .optional()
            .map_err(store_err("Failed to load session"))
    }

    fn session_by_share_token(&self, token: &str) -> AppResult<Option<Session>> {
        self.lock()?
            .query_row(
                &format!("SELECT {} FROM sessions WHERE share_token = ?1", SESSION_COLUMNS),
                params![token],
                session_from_row,
            )
            .optional()
            .map_err(store_err("Failed to resolve share token"))
    }

    fn set_share_token(&self, session_id: &str, token: &str) -> AppResult<()> {
        let changed = self
            .lock()?
            .execute(
                "UPDATE sessions SET share_token = ?1 WHERE id = ?2",
                params![token, session_id],
            )
            .map_err(store_err("Failed to set share token"))?;
        expect_one_row(changed, "Session", session_id)
    }

    fn append_turn(&self, session_id: &str, role: Role, text: Option<&str>) -> AppResult<Turn> {
        let conn = self.lock()?;
        session_exists(&conn, session_id)?;

        let turn = Turn::new(session_id, role, text.map(str::to_string));
        insert_turn(&conn, &turn)?;
        Ok(turn)
    }

    fn get_turn(&self, turn_id: &str) -> AppResult<Option<Turn>> {
        let conn = self.lock()?;
        load_turn(&conn, turn_id)
    }

    fn list_turns(&self, session_id: &str) -> AppResult<Vec<Turn>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM turns WHERE session_id = ?1 ORDER BY seq",
                TURN_COLUMNS
            ))
            .map_err(store_err("Failed to prepare turn query"))?;

        let turns = stmt
            .query_map(params![session_id], turn_from_row)
            .map_err(store_err("Failed to query turns"))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(store_err("Failed to read turn"))?;
        Ok(turns)
    }

    fn update_turn_text(&self, turn_id: &str, text: &str) -> AppResult<()> {
        let changed = self
            .lock()?
            .execute(
                "UPDATE turns SET text = ?1 WHERE id = ?2",
                params![text, turn_id],
            )
            .map_err(store_err("Failed to update turn text"))?;
        expect_one_row(changed, "Turn", turn_id)
    }

    fn set_turn_rating(
        &self,
        turn_id: &str,
        rating: Rating,
        feedback_tag: Option<&str>,
    ) -> AppResult<()> {
        let changed = self
            .lock()?
            .execute(
                "UPDATE turns SET rating = ?1, feedback_tag = ?2 WHERE id = ?3",
                params![rating.as_str(), feedback_tag, turn_id],
            )
            .map_err(store_err("Failed to rate turn"))?;
        expect_one_row(changed, "Turn", turn_id)
    }

    fn mark_incomplete(&self, turn_id: &str) -> AppResult<()> {
        let changed = self
            .lock()?
            .execute(
                "UPDATE turns SET incomplete = 1 WHERE id = ?1",
                params![turn_id],
            )
            .map_err(store_err("Failed to mark turn incomplete"))?;
        expect_one_row(changed, "Turn", turn_id)
    }

    fn create_citation(&self, turn_id: &str, citation: &NewCitation) -> AppResult<Citation> {
        let conn = self.lock()?;
        require_assistant_turn(&conn, turn_id)?;

        let created = Citation::new(turn_id, citation);
        insert_citation(&conn, &created)?;
        Ok(created)
    }

    fn list_citations(&self, turn_id: &str) -> AppResult<Vec<Citation>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM citations WHERE turn_id = ?1 ORDER BY seq",
                CITATION_COLUMNS
            ))
            .map_err(store_err("Failed to prepare citation query"))?;

        let citations = stmt
            .query_map(params![turn_id], citation_from_row)
            .map_err(store_err("Failed to query citations"))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(store_err("Failed to read citation"))?;
        Ok(citations)
    }

    fn append_answer(
        &self,
        session_id: &str,
        text: &str,
        incomplete: bool,
        citations: &[NewCitation],
    ) -> AppResult<(Turn, Vec<Citation>)> {
        let mut conn = self.lock()?;
        session_exists(&conn, session_id)?;

        let mut turn = Turn::new(session_id, Role::Assistant, Some(text.to_string()));
        turn.incomplete = incomplete;
        let created: Vec<Citation> = citations
            .iter()
            .map(|c| Citation::new(&turn.id, c))
            .collect();

        let tx = conn
            .transaction()
            .map_err(store_err("Failed to begin transaction"))?;
        insert_turn(&tx, &turn)?;
        for citation in &created {
            insert_citation(&tx, citation)?;
        }
        tx.commit().map_err(store_err("Failed to commit answer"))?;

        Ok((turn, created))
    }

    fn replace_answer(
        &self,
        turn_id: &str,
        text: &str,
        citations: &[NewCitation],
    ) -> AppResult<Vec<Citation>> {
        let mut conn = self.lock()?;
        require_assistant_turn(&conn, turn_id)?;

        let tx = conn
            .transaction()
            .map_err(store_err("Failed to begin transaction"))?;

        tx.execute(
            "UPDATE turns SET text = ?1, incomplete = 0 WHERE id = ?2",
            params![text, turn_id],
        )
        .map_err(store_err("Failed to update turn text"))?;
        tx.execute("DELETE FROM citations WHERE turn_id = ?1", params![turn_id])
            .map_err(store_err("Failed to delete citations"))?;

        let created: Vec<Citation> = citations
            .iter()
            .map(|c| Citation::new(turn_id, c))
            .collect();
        for citation in &created {
            insert_citation(&tx, citation)?;
        }

        tx.commit().map_err(store_err("Failed to commit answer"))?;
        Ok(created)
    }
}
