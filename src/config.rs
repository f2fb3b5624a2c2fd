//! Runtime configuration
//!
//! Everything is read from the environment once at startup.

use std::path::PathBuf;

use crate::filter::{DEFAULT_LIMIT, MAX_LIMIT};

pub const DEFAULT_AI_MODEL: &str = "claude-sonnet-4-20250514";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub anthropic_api_key: Option<String>,
    pub ai_model: String,
    pub page_size: u32,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            database_path: database_path_from_env(),
            anthropic_api_key: std::env::var("ANTHROPIC_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            ai_model: std::env::var("NUTRACK_AI_MODEL")
                .unwrap_or_else(|_| DEFAULT_AI_MODEL.to_string()),
            page_size: std::env::var("NUTRACK_PAGE_SIZE")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .map(|n| n.clamp(1, MAX_LIMIT))
                .unwrap_or(DEFAULT_LIMIT),
        }
    }
}

/// Database path from `NUTRACK_DATABASE_PATH`, or `data/nutrack.db` next to the project root
pub fn database_path_from_env() -> PathBuf {
    std::env::var("NUTRACK_DATABASE_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let mut path = std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|p| p.to_path_buf()))
                .unwrap_or_else(|| PathBuf::from("."));

            // Go up from target/release or target/debug to project root
            if path.ends_with("release") || path.ends_with("debug") {
                if let Some(grandparent) = path.parent().and_then(|p| p.parent()) {
                    path = grandparent.to_path_buf();
                }
            }

            path.push("data");
            path.push("nutrack.db");
            path
        })
}
