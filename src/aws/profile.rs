//! Shared AWS config and credentials files (`~/.aws/config`,
//! `~/.aws/credentials`).

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_PROFILE: &str = "default";

/// Parsed INI file: section name → key → value.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProfileFile {
    sections: HashMap<String, HashMap<String, String>>,
}

impl ProfileFile {
    pub fn parse(content: &str) -> Self {
        let mut sections: HashMap<String, HashMap<String, String>> = HashMap::new();
        let mut current: Option<String> = None;

        for raw in content.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                let name = name.trim().to_string();
                sections.entry(name.clone()).or_default();
                current = Some(name);
                continue;
            }

            // Keys outside a section and nested sub-properties are ignored.
            let Some(section) = &current else { continue };
            if raw.starts_with(char::is_whitespace) {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                sections
                    .entry(section.clone())
                    .or_default()
                    .insert(key.trim().to_string(), value.trim().to_string());
            }
        }

        Self { sections }
    }

    /// Read and parse a profile file. A missing file is an empty profile set.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read AWS profile file: {}", path.display()))?;
        Ok(Self::parse(&content))
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|s| s.get(key))
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Look up a key for `profile` in the config file, where non-default
    /// profiles live under `[profile <name>]`.
    pub fn config_value(&self, profile: &str, key: &str) -> Option<&str> {
        if profile == DEFAULT_PROFILE {
            self.get(DEFAULT_PROFILE, key)
                .or_else(|| self.get("profile default", key))
        } else {
            self.get(&format!("profile {profile}"), key)
        }
    }

    fn has_config_profile(&self, profile: &str) -> bool {
        self.sections.contains_key(&format!("profile {profile}"))
            || (profile == DEFAULT_PROFILE && self.sections.contains_key(DEFAULT_PROFILE))
    }

    fn has_section(&self, section: &str) -> bool {
        self.sections.contains_key(section)
    }
}

/// Both shared files. A key in the credentials file wins over the same key
/// in the config file.
#[derive(Default, Clone, PartialEq, Eq)]
pub struct ProfileSet {
    config: ProfileFile,
    credentials: ProfileFile,
}

impl ProfileSet {
    pub fn new(config: ProfileFile, credentials: ProfileFile) -> Self {
        Self {
            config,
            credentials,
        }
    }

    pub fn load(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self> {
        let config = match profile_path(lookup, "AWS_CONFIG_FILE", "config") {
            Some(path) => ProfileFile::load(&path)?,
            None => ProfileFile::default(),
        };
        let credentials = match profile_path(lookup, "AWS_SHARED_CREDENTIALS_FILE", "credentials") {
            Some(path) => ProfileFile::load(&path)?,
            None => ProfileFile::default(),
        };
        Ok(Self::new(config, credentials))
    }

    pub fn value(&self, profile: &str, key: &str) -> Option<&str> {
        self.credentials
            .get(profile, key)
            .or_else(|| self.config.config_value(profile, key))
    }

    pub fn contains(&self, profile: &str) -> bool {
        self.credentials.has_section(profile) || self.config.has_config_profile(profile)
    }
}

/// Path from `env_var`, or `~/.aws/<file_name>`.
pub fn profile_path(
    lookup: &dyn Fn(&str) -> Option<String>,
    env_var: &str,
    file_name: &str,
) -> Option<PathBuf> {
    if let Some(path) = lookup(env_var) {
        return Some(PathBuf::from(path));
    }
    dirs::home_dir().map(|home| home.join(".aws").join(file_name))
}
