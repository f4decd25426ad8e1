use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::Deserialize;
use shared::protocol::GENERATE_PATH;
use tracing::warn;

pub const SETTINGS_FILE: &str = "pup.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub api_base_url: String,
    pub download_dir: PathBuf,
    pub download_file_stem: String,
    pub share_hashtag: String,
    pub share_mention: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8080".into(),
            download_dir: PathBuf::from("."),
            download_file_stem: "gnb-transformed-pup".into(),
            share_hashtag: "#GoodNaturedPup".into(),
            share_mention: "@goodnaturedbrand".into(),
        }
    }
}

pub fn load_settings() -> Settings {
    let file_cfg = read_settings_file(Path::new(SETTINGS_FILE));
    let env: HashMap<String, String> = std::env::vars().collect();
    resolve_settings(&file_cfg, &env)
}

/// A missing file is silently empty; an unreadable or malformed one is logged and skipped.
fn read_settings_file(path: &Path) -> HashMap<String, String> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return HashMap::new(),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "config: failed to read settings file");
            return HashMap::new();
        }
    };
    match parse_settings_file(&raw) {
        Ok(cfg) => cfg,
        Err(err) => {
            warn!(path = %path.display(), error = %format!("{err:#}"), "config: ignoring malformed settings file");
            HashMap::new()
        }
    }
}

fn parse_settings_file(raw: &str) -> anyhow::Result<HashMap<String, String>> {
    toml::from_str::<HashMap<String, String>>(raw)
        .with_context(|| format!("failed to parse {SETTINGS_FILE} as flat string keys"))
}

/// Defaults, then the settings file, then the environment.
fn resolve_settings(
    file_cfg: &HashMap<String, String>,
    env: &HashMap<String, String>,
) -> Settings {
    let mut settings = Settings::default();

    if let Some(v) = file_cfg.get("api_base_url") {
        settings.api_base_url = v.clone();
    }
    if let Some(v) = file_cfg.get("download_dir") {
        settings.download_dir = PathBuf::from(v);
    }
    if let Some(v) = file_cfg.get("download_file_stem") {
        settings.download_file_stem = v.clone();
    }
    if let Some(v) = file_cfg.get("share_hashtag") {
        settings.share_hashtag = v.clone();
    }
    if let Some(v) = file_cfg.get("share_mention") {
        settings.share_mention = v.clone();
    }

    if let Some(v) = env.get("PUP_API_BASE_URL") {
        settings.api_base_url = v.clone();
    }
    if let Some(v) = env.get("APP__API_BASE_URL") {
        settings.api_base_url = v.clone();
    }

    if let Some(v) = env.get("PUP_DOWNLOAD_DIR") {
        settings.download_dir = PathBuf::from(v);
    }
    if let Some(v) = env.get("APP__DOWNLOAD_DIR") {
        settings.download_dir = PathBuf::from(v);
    }

    if let Some(v) = env.get("APP__DOWNLOAD_FILE_STEM") {
        if !v.trim().is_empty() {
            settings.download_file_stem = v.clone();
        }
    }
    if let Some(v) = env.get("APP__SHARE_HASHTAG") {
        settings.share_hashtag = v.clone();
    }
    if let Some(v) = env.get("APP__SHARE_MENTION") {
        settings.share_mention = v.clone();
    }

    settings
}

/// Joins the base URL and the generation path without doubling the slash.
pub fn generate_endpoint(base_url: &str) -> String {
    format!("{}{GENERATE_PATH}", base_url.trim().trim_end_matches('/'))
}
