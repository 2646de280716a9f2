use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// `$STAMPCARD_HOME`, or `~/.stampcard`.
pub fn stampcard_home() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("STAMPCARD_HOME") {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".stampcard"))
}

pub fn ensure_stampcard_home() -> Result<PathBuf> {
    let dir = stampcard_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}
