//! CLI `profile` commands: create a profile and hand out session tokens.

use anyhow::Result;

use synapse::brain::profiles::{self, NewProfile};
use synapse::config::SynapseConfig;

/// Create a profile and print its first session token.
pub fn create(config: &SynapseConfig, email: &str, name: &str) -> Result<()> {
    let conn = super::open(config)?;
    let profile = profiles::create_profile(
        &conn,
        &NewProfile {
            email: email.to_string(),
            display_name: name.to_string(),
        },
    )?;
    let session = profiles::issue_session(&conn, &profile.id, config.session.ttl_days)?;

    println!("Created profile {} <{}>", profile.display_name, profile.email);
    println!("Profile id:  {}", profile.id);
    print_token(&session.token, &session.expires_at);
    Ok(())
}

/// Issue another token for an existing profile.
pub fn token(config: &SynapseConfig, email: &str) -> Result<()> {
    let conn = super::open(config)?;
    let profile_id = super::profile_id(&conn, email)?;
    let purged = profiles::purge_expired_sessions(&conn)?;
    if purged > 0 {
        tracing::info!(purged, "expired sessions removed");
    }
    let session = profiles::issue_session(&conn, &profile_id, config.session.ttl_days)?;
    print_token(&session.token, &session.expires_at);
    Ok(())
}

fn print_token(token: &str, expires_at: &str) {
    println!("Token:       {token}");
    println!("Expires:     {expires_at}");
    println!();
    println!("Send it as `Authorization: Bearer <token>`. It is not stored and cannot be shown again.");
}
