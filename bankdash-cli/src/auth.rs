use anyhow::{bail, Context, Result};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tracing::{info, warn};

use bankdash_api::BankClient;
use bankdash_core::{LoginRequest, RegisterRequest, Session, SessionHandle, UserSummary};

use crate::state::session_path;

pub const SESSION_EXPIRED: &str = "Session expired. Run: bankdash login";

pub fn load_session_from(p: &Path) -> Result<Session> {
    if !p.exists() {
        return Ok(Session::default());
    }
    let s = fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
    serde_json::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn save_session_to(p: &Path, session: &Session) -> Result<()> {
    let s = serde_json::to_string_pretty(session)?;
    fs::write(p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn clear_session_at(p: &Path) -> Result<bool> {
    if !p.exists() {
        return Ok(false);
    }
    fs::remove_file(p).with_context(|| format!("remove {}", p.display()))?;
    Ok(true)
}

pub fn load_session() -> Result<Session> {
    load_session_from(&session_path()?)
}

pub fn save_session(session: &Session) -> Result<()> {
    save_session_to(&session_path()?, session)
}

pub fn clear_session() -> Result<bool> {
    clear_session_at(&session_path()?)
}

/// Logout reaction for an `UnauthorizedGuard`: drop the persisted session and
/// point the user at `bankdash login`.
pub fn on_session_expired() {
    if let Err(e) = clear_session() {
        warn!(error = %e, "could not remove session file");
    }
    eprintln!("{SESSION_EXPIRED}");
}

/// Bail early for commands that need a token.
pub fn require_login(session: &SessionHandle) -> Result<()> {
    if session.token().is_none() {
        bail!("Not logged in. Run: bankdash login");
    }
    Ok(())
}

fn prompt_secret(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush().ok();
    let mut s = String::new();
    io::stdin().read_line(&mut s)?;
    Ok(s.trim().to_string())
}

fn password_or_prompt(password: Option<String>) -> Result<String> {
    let password = match password {
        Some(p) => p,
        None => prompt_secret("Password")?,
    };
    if password.is_empty() {
        bail!("password is required");
    }
    Ok(password)
}

pub async fn login(
    client: &BankClient,
    session: &SessionHandle,
    username: String,
    password: Option<String>,
) -> Result<()> {
    let password = password_or_prompt(password)?;
    let token = client
        .login(&LoginRequest {
            username: username.clone(),
            password,
        })
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message("Login failed. Check your credentials.")))?;

    session.establish(
        token,
        UserSummary {
            username: username.clone(),
            account_number: None,
        },
    );

    // Account number only comes with the profile.
    match client.get_profile().await {
        Ok(profile) => session.set_user(UserSummary {
            username: profile.username,
            account_number: profile.account_number,
        }),
        Err(e) => warn!(error = %e, "profile fetch after login failed"),
    }

    save_session(&session.snapshot())?;
    info!(username = %username, "logged in");
    println!("Logged in as {}", username);
    Ok(())
}

pub async fn register(
    client: &BankClient,
    username: String,
    email: String,
    full_name: String,
    password: Option<String>,
) -> Result<()> {
    let password = password_or_prompt(password)?;
    let profile = client
        .register(&RegisterRequest {
            username,
            email,
            password,
            full_name,
        })
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message("Registration failed. Please try again.")))?;

    println!("Registered {}", profile.username);
    if let Some(acct) = profile.account_number {
        println!("Account number: {acct}");
    }
    println!("Next: bankdash login --username {}", profile.username);
    Ok(())
}

pub fn logout(session: &SessionHandle) -> Result<()> {
    let had_token = session.clear();
    let had_file = clear_session()?;
    if had_token || had_file {
        println!("Logged out.");
    } else {
        println!("Not logged in.");
    }
    Ok(())
}
