use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// `~/.bankdash`, or `$BANKDASH_HOME` when set.
pub fn bankdash_home() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("BANKDASH_HOME") {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".bankdash"))
}

pub fn ensure_bankdash_home() -> Result<PathBuf> {
    let dir = bankdash_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

pub fn session_path() -> Result<PathBuf> {
    Ok(ensure_bankdash_home()?.join("session.json"))
}

pub fn log_path() -> Result<PathBuf> {
    Ok(ensure_bankdash_home()?.join("bankdash.log"))
}
