//! Identity store: user records, credentials and verification state.

pub mod verification;

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::models::User;
use crate::error::{AppError, AppResult};
use crate::forms::{ProfileUpdate, Registration};

const USER_COLUMNS: &str =
    "id, username, email, password_hash, about_me, verified, last_seen, profile_picture";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        about_me: row.get(4)?,
        verified: row.get(5)?,
        last_seen: row.get(6)?,
        profile_picture: row.get(7)?,
    })
}

pub fn hash_password(plaintext: &str, cost: u32) -> AppResult<String> {
    bcrypt::hash(plaintext, cost).map_err(|e| AppError::Internal(format!("password hash: {e}")))
}

fn find_by(conn: &Connection, column: &str, value: &dyn rusqlite::ToSql) -> AppResult<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1");
    Ok(conn.query_row(&sql, [value], user_from_row).optional()?)
}

pub fn find_by_id(conn: &Connection, id: i64) -> AppResult<Option<User>> {
    find_by(conn, "id", &id)
}

pub fn find_by_username(conn: &Connection, username: &str) -> AppResult<Option<User>> {
    find_by(conn, "username", &username)
}

pub fn find_by_email(conn: &Connection, email: &str) -> AppResult<Option<User>> {
    find_by(conn, "email", &email)
}

/// Map a UNIQUE violation on `users` to the field that collided.
fn duplicate_field(err: &rusqlite::Error) -> Option<&'static str> {
    match err {
        rusqlite::Error::SqliteFailure(e, Some(msg))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            if msg.contains("users.username") {
                Some("username")
            } else if msg.contains("users.email") {
                Some("email")
            } else {
                None
            }
        }
        _ => None,
    }
}

fn map_duplicate(err: rusqlite::Error) -> AppError {
    match duplicate_field(&err) {
        Some(field) => AppError::Duplicate { field },
        None => err.into(),
    }
}

/// Insert a new user. Username and email collisions are case-sensitive.
pub fn create_user(conn: &Connection, registration: &Registration, cost: u32) -> AppResult<User> {
    if find_by_username(conn, &registration.username)?.is_some() {
        return Err(AppError::Duplicate { field: "username" });
    }
    if find_by_email(conn, &registration.email)?.is_some() {
        return Err(AppError::Duplicate { field: "email" });
    }

    let password_hash = hash_password(&registration.password, cost)?;

    // The unique constraints still catch a concurrent insert between check and write
    conn.execute(
        "INSERT INTO users (username, email, password_hash) VALUES (?1, ?2, ?3)",
        params![registration.username, registration.email, password_hash],
    )
    .map_err(map_duplicate)?;

    let id = conn.last_insert_rowid();
    find_by_id(conn, id)?.ok_or(AppError::NotFound)
}

/// Check credentials. Failure never says which part was wrong.
pub fn authenticate(conn: &Connection, username: &str, password: &str) -> AppResult<User> {
    let user = find_by_username(conn, username)?.ok_or(AppError::InvalidCredentials)?;
    if bcrypt::verify(password, &user.password_hash).unwrap_or(false) {
        Ok(user)
    } else {
        Err(AppError::InvalidCredentials)
    }
}

pub fn set_password(conn: &Connection, user_id: i64, plaintext: &str, cost: u32) -> AppResult<()> {
    let password_hash = hash_password(plaintext, cost)?;
    let rows = conn.execute(
        "UPDATE users SET password_hash = ?1 WHERE id = ?2",
        params![password_hash, user_id],
    )?;
    if rows == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

/// Set `verified = 1`. Repeating it is harmless.
pub fn mark_verified(conn: &Connection, user_id: i64) -> AppResult<()> {
    let rows = conn.execute("UPDATE users SET verified = 1 WHERE id = ?1", params![user_id])?;
    if rows == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

/// Update username and about-me. Keeping the current username is not a collision.
pub fn update_profile(conn: &Connection, user_id: i64, update: &ProfileUpdate) -> AppResult<User> {
    if let Some(existing) = find_by_username(conn, &update.username)? {
        if existing.id != user_id {
            return Err(AppError::Duplicate { field: "username" });
        }
    }

    let about_me = Some(update.about_me.as_str()).filter(|s| !s.is_empty());
    let rows = conn
        .execute(
            "UPDATE users SET username = ?1, about_me = ?2 WHERE id = ?3",
            params![update.username, about_me, user_id],
        )
        .map_err(map_duplicate)?;
    if rows == 0 {
        return Err(AppError::NotFound);
    }
    find_by_id(conn, user_id)?.ok_or(AppError::NotFound)
}

pub fn set_profile_picture(conn: &Connection, user_id: i64, filename: &str) -> AppResult<()> {
    conn.execute(
        "UPDATE users SET profile_picture = ?1 WHERE id = ?2",
        params![filename, user_id],
    )?;
    Ok(())
}

/// Drop any profile picture pointing at one of `filenames`.
pub fn clear_profile_pictures(conn: &Connection, filenames: &[String]) -> AppResult<()> {
    for filename in filenames {
        conn.execute(
            "UPDATE users SET profile_picture = NULL WHERE profile_picture = ?1",
            params![filename],
        )?;
    }
    Ok(())
}

pub fn touch_last_seen(conn: &Connection, user_id: i64) -> AppResult<()> {
    conn.execute(
        "UPDATE users SET last_seen = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') WHERE id = ?1",
        params![user_id],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    const COST: u32 = 4;

    fn registration(username: &str, email: &str) -> Registration {
        Registration {
            username: username.into(),
            email: email.into(),
            password: "hunter2".into(),
        }
    }

    fn count_users(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn create_user_never_stores_plaintext() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let user = create_user(&conn, &registration("alice", "a@x.com"), COST).unwrap();
        assert_eq!(user.username, "alice");
        assert!(!user.verified);
        assert_ne!(user.password_hash, "hunter2");
        assert!(bcrypt::verify("hunter2", &user.password_hash).unwrap());
    }

    #[test]
    fn duplicate_username_or_email_is_rejected_without_mutation() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        create_user(&conn, &registration("alice", "a@x.com"), COST).unwrap();

        let err = create_user(&conn, &registration("alice", "b@x.com"), COST).unwrap_err();
        assert!(matches!(err, AppError::Duplicate { field: "username" }));

        let err = create_user(&conn, &registration("bob", "a@x.com"), COST).unwrap_err();
        assert!(matches!(err, AppError::Duplicate { field: "email" }));

        assert_eq!(count_users(&conn), 1);
    }

    #[test]
    fn uniqueness_is_case_sensitive() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        create_user(&conn, &registration("alice", "a@x.com"), COST).unwrap();
        create_user(&conn, &registration("Alice", "A@x.com"), COST).unwrap();
        assert_eq!(count_users(&conn), 2);
    }

    #[test]
    fn unique_constraint_maps_to_duplicate() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        create_user(&conn, &registration("alice", "a@x.com"), COST).unwrap();
        let err = conn
            .execute(
                "INSERT INTO users (username, email, password_hash) VALUES ('alice', 'z@x.com', 'h')",
                [],
            )
            .unwrap_err();
        assert_eq!(duplicate_field(&err), Some("username"));
    }

    #[test]
    fn authenticate_is_generic_on_failure() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        create_user(&conn, &registration("alice", "a@x.com"), COST).unwrap();

        assert_eq!(authenticate(&conn, "alice", "hunter2").unwrap().username, "alice");
        assert!(matches!(
            authenticate(&conn, "alice", "wrong"),
            Err(AppError::InvalidCredentials)
        ));
        assert!(matches!(
            authenticate(&conn, "nobody", "hunter2"),
            Err(AppError::InvalidCredentials)
        ));
    }

    #[test]
    fn set_password_replaces_credentials() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let user = create_user(&conn, &registration("alice", "a@x.com"), COST).unwrap();
        set_password(&conn, user.id, "new-secret", COST).unwrap();
        assert!(authenticate(&conn, "alice", "hunter2").is_err());
        assert!(authenticate(&conn, "alice", "new-secret").is_ok());
    }

    #[test]
    fn mark_verified_is_idempotent() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let user = create_user(&conn, &registration("alice", "a@x.com"), COST).unwrap();
        mark_verified(&conn, user.id).unwrap();
        mark_verified(&conn, user.id).unwrap();
        assert!(find_by_id(&conn, user.id).unwrap().unwrap().verified);
    }

    #[test]
    fn update_profile_keeps_or_changes_username() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let alice = create_user(&conn, &registration("alice", "a@x.com"), COST).unwrap();
        create_user(&conn, &registration("bob", "b@x.com"), COST).unwrap();

        let same = ProfileUpdate {
            username: "alice".into(),
            about_me: "hi there".into(),
        };
        let updated = update_profile(&conn, alice.id, &same).unwrap();
        assert_eq!(updated.about_me.as_deref(), Some("hi there"));

        let taken = ProfileUpdate {
            username: "bob".into(),
            about_me: String::new(),
        };
        assert!(matches!(
            update_profile(&conn, alice.id, &taken),
            Err(AppError::Duplicate { field: "username" })
        ));

        let renamed = ProfileUpdate {
            username: "alicia".into(),
            about_me: String::new(),
        };
        let updated = update_profile(&conn, alice.id, &renamed).unwrap();
        assert_eq!(updated.username, "alicia");
        assert!(updated.about_me.is_none());
    }
}
