use rand::Rng;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::AppResult;
use crate::policy::Member;

/// Create a new session for a user. Returns the session token.
pub fn create_session(conn: &Connection, user_id: i64, hours: u64) -> AppResult<String> {
    let token = generate_token();
    let id = uuid::Uuid::now_v7().to_string();

    conn.execute(
        "INSERT INTO sessions (id, user_id, token, expires_at) VALUES (?1, ?2, ?3, datetime('now', ?4))",
        params![id, user_id, token, format!("+{} hours", hours)],
    )?;

    Ok(token)
}

/// Member behind an unexpired session token.
pub fn find_member(conn: &Connection, token: &str) -> AppResult<Option<Member>> {
    let member = conn
        .query_row(
            "SELECT u.id, u.username, u.verified FROM sessions s \
             JOIN users u ON u.id = s.user_id \
             WHERE s.token = ?1 AND s.expires_at > datetime('now')",
            params![token],
            |row| {
                Ok(Member {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    verified: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(member)
}

/// Delete a session by token.
pub fn delete_session(conn: &Connection, token: &str) -> AppResult<()> {
    conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
    Ok(())
}

pub fn purge_expired(conn: &Connection) -> AppResult<usize> {
    Ok(conn.execute("DELETE FROM sessions WHERE expires_at <= datetime('now')", [])?)
}

/// Generate a cryptographically random 32-byte hex token.
fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
