//! Profiles and bearer-token sessions.
//!
//! Session tokens are random, handed out once, and stored only as a SHA-256
//! hex digest. Resolving a token yields the owning profile id, which every
//! other module takes as its `user_id`.

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::types::Profile;
use super::{new_id, now, required};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct NewProfile {
    pub email: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfilePatch {
    pub email: Option<String>,
    pub display_name: Option<String>,
}

/// A freshly issued session. `token` is never stored and cannot be recovered later.
#[derive(Debug, Serialize)]
pub struct IssuedSession {
    pub profile_id: String,
    pub token: String,
    pub expires_at: String,
}

fn validate_email(email: &str) -> Result<String> {
    let email = required(email, "email")?.to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(Error::validation(format!("invalid email address: {email}"))),
    }
}

fn row_to_profile(row: &rusqlite::Row<'_>) -> rusqlite::Result<Profile> {
    Ok(Profile {
        id: row.get(0)?,
        email: row.get(1)?,
        display_name: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

const PROFILE_COLUMNS: &str = "id, email, display_name, created_at, updated_at";

pub fn create_profile(conn: &Connection, input: &NewProfile) -> Result<Profile> {
    let email = validate_email(&input.email)?;
    let display_name = required(&input.display_name, "display_name")?;

    if find_by_email(conn, &email)?.is_some() {
        return Err(Error::validation(format!("email already registered: {email}")));
    }

    let id = new_id();
    let ts = now();
    conn.execute(
        "INSERT INTO profiles (id, email, display_name, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?4)",
        params![id, email, display_name, ts],
    )?;

    tracing::info!(profile_id = %id, "profile created");
    get_profile(conn, &id)
}

pub fn get_profile(conn: &Connection, id: &str) -> Result<Profile> {
    conn.query_row(
        &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = ?1"),
        params![id],
        row_to_profile,
    )
    .optional()?
    .ok_or_else(|| Error::not_found("profile", id))
}

pub fn find_by_email(conn: &Connection, email: &str) -> Result<Option<Profile>> {
    Ok(conn
        .query_row(
            &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE email = ?1"),
            params![email.trim().to_lowercase()],
            row_to_profile,
        )
        .optional()?)
}

pub fn update_profile(conn: &Connection, id: &str, patch: &ProfilePatch) -> Result<Profile> {
    let mut current = get_profile(conn, id)?;

    if let Some(email) = &patch.email {
        let email = validate_email(email)?;
        if email != current.email {
            if let Some(other) = find_by_email(conn, &email)? {
                if other.id != id {
                    return Err(Error::validation(format!("email already registered: {email}")));
                }
            }
            current.email = email;
        }
    }
    if let Some(name) = &patch.display_name {
        current.display_name = required(name, "display_name")?;
    }

    conn.execute(
        "UPDATE profiles SET email = ?1, display_name = ?2, updated_at = ?3 WHERE id = ?4",
        params![current.email, current.display_name, now(), id],
    )?;
    get_profile(conn, id)
}

pub(crate) fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Issue a new session token for `profile_id`, valid for `ttl_days`.
pub fn issue_session(conn: &Connection, profile_id: &str, ttl_days: i64) -> Result<IssuedSession> {
    get_profile(conn, profile_id)?;

    let token = format!(
        "syn_{}{}",
        uuid::Uuid::new_v4().simple(),
        uuid::Uuid::new_v4().simple()
    );
    let created = chrono::Utc::now();
    let expires_at = chrono::TimeDelta::try_days(ttl_days.max(1))
        .and_then(|ttl| created.checked_add_signed(ttl))
        .ok_or_else(|| Error::validation(format!("session ttl of {ttl_days} days is too long")))?
        .to_rfc3339();

    conn.execute(
        "INSERT INTO sessions (token_hash, profile_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
        params![hash_token(&token), profile_id, created.to_rfc3339(), expires_at],
    )?;

    tracing::info!(profile_id = %profile_id, expires_at = %expires_at, "session issued");
    Ok(IssuedSession {
        profile_id: profile_id.to_string(),
        token,
        expires_at,
    })
}

/// Resolve a bearer token to its profile id. Unknown or expired tokens are unauthorized.
pub fn resolve_session(conn: &Connection, token: &str) -> Result<String> {
    let row: Option<(String, String)> = conn
        .query_row(
            "SELECT profile_id, expires_at FROM sessions WHERE token_hash = ?1",
            params![hash_token(token)],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let Some((profile_id, expires_at)) = row else {
        return Err(Error::Unauthorized);
    };

    let expired = chrono::DateTime::parse_from_rfc3339(&expires_at)
        .map(|t| t < chrono::Utc::now())
        .unwrap_or(true);
    if expired {
        tracing::debug!(profile_id = %profile_id, "rejected expired session");
        return Err(Error::Unauthorized);
    }

    Ok(profile_id)
}

/// Revoke a token. Returns `true` if it existed.
pub fn revoke_session(conn: &Connection, token: &str) -> Result<bool> {
    let rows = conn.execute(
        "DELETE FROM sessions WHERE token_hash = ?1",
        params![hash_token(token)],
    )?;
    Ok(rows > 0)
}

/// Delete every expired session row. Returns how many were removed.
pub fn purge_expired_sessions(conn: &Connection) -> Result<usize> {
    Ok(conn.execute(
        "DELETE FROM sessions WHERE expires_at < ?1",
        params![now()],
    )?)
}
