//! Named settings profiles.
//!
//! Stored as YAML in `~/.speechdesk/config.yaml`:
//!
//! ```yaml
//! current: work
//! contexts:
//!   work:
//!     api_key: dg-...
//!     model_server: http://gpu-box:7860
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Directory under the home directory holding the config file.
pub const CONFIG_DIR: &str = ".speechdesk";
/// Config filename.
pub const CONFIG_FILE: &str = "config.yaml";

/// Saved contexts and the current selection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<String>,

    /// Contexts by name, kept sorted.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub contexts: BTreeMap<String, Context>,

    #[serde(skip)]
    path: PathBuf,
}

/// One profile: transcription credentials plus synthesis model location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_key: String,

    /// Transcription API base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_server: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,

    /// Prefix a remote audio URL must start with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_url_prefix: Option<String>,
}

impl Context {
    /// Request timeout, when one is set and non-zero.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

impl Config {
    /// Loads the config file. A missing or empty file yields an empty config.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Config> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => dirs::home_dir()
                .map(|home| home.join(CONFIG_DIR).join(CONFIG_FILE))
                .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?,
        };

        let mut cfg = match std::fs::read_to_string(&path) {
            Ok(content) if !content.trim().is_empty() => serde_yaml::from_str(&content)?,
            Ok(_) => Config::default(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Config::default(),
            Err(e) => return Err(e.into()),
        };
        cfg.path = path;
        Ok(cfg)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the config, creating its directory.
    pub fn save(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_yaml::to_string(self)?)?;
        Ok(())
    }

    /// Returns the named context, or the current one when no name is given.
    ///
    /// Naming a context that does not exist is an error; having no current
    /// context is not.
    pub fn context(&self, name: Option<&str>) -> anyhow::Result<Option<&Context>> {
        match name.filter(|n| !n.is_empty()) {
            Some(name) => self
                .contexts
                .get(name)
                .map(Some)
                .ok_or_else(|| anyhow::anyhow!("context '{}' not found", name)),
            None => Ok(self.current.as_deref().and_then(|n| self.contexts.get(n))),
        }
    }

    /// Adds or replaces a context and saves.
    pub fn set_context(&mut self, name: &str, ctx: Context) -> anyhow::Result<()> {
        self.contexts.insert(name.to_string(), ctx);
        self.save()
    }

    /// Removes a context and saves. Clears the selection if it pointed there.
    pub fn remove_context(&mut self, name: &str) -> anyhow::Result<()> {
        if self.contexts.remove(name).is_none() {
            anyhow::bail!("context '{}' not found", name);
        }
        if self.current.as_deref() == Some(name) {
            self.current = None;
        }
        self.save()
    }

    /// Makes `name` the current context and saves.
    pub fn select(&mut self, name: &str) -> anyhow::Result<()> {
        if !self.contexts.contains_key(name) {
            anyhow::bail!("context '{}' not found", name);
        }
        self.current = Some(name.to_string());
        self.save()
    }
}

/// Masks an API key for display, keeping four characters at each end.
pub fn mask_api_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}{}", head, "*".repeat(chars.len() - 8), tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_empty_and_not_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);
        let cfg = Config::load(Some(&path)).unwrap();
        assert!(cfg.contexts.is_empty());
        assert!(cfg.context(None).unwrap().is_none());
        assert!(!path.exists());
    }

    #[test]
    fn test_contexts_persist_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);
        let mut cfg = Config::load(Some(&path)).unwrap();

        let work = Context {
            api_key: "dg-key-123456789".to_string(),
            timeout_secs: Some(30),
            model_server: Some("http://127.0.0.1:7860".to_string()),
            ..Default::default()
        };
        cfg.set_context("work", work.clone()).unwrap();
        cfg.set_context("home", Context::default()).unwrap();
        cfg.select("work").unwrap();

        let reloaded = Config::load(Some(&path)).unwrap();
        assert_eq!(reloaded.current.as_deref(), Some("work"));
        let names: Vec<&str> = reloaded.contexts.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["home", "work"]);
        assert_eq!(reloaded.context(None).unwrap(), Some(&work));
        assert_eq!(work.timeout(), Some(Duration::from_secs(30)));
        assert!(reloaded.context(Some("home")).unwrap().is_some());
        assert!(reloaded.context(Some("nope")).is_err());
    }

    #[test]
    fn test_remove_current_clears_selection() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = Config::load(Some(&dir.path().join(CONFIG_FILE))).unwrap();
        cfg.set_context("work", Context::default()).unwrap();
        cfg.select("work").unwrap();

        cfg.remove_context("work").unwrap();
        assert!(cfg.current.is_none());
        assert!(cfg.remove_context("work").is_err());
        assert!(cfg.select("work").is_err());
    }

    #[test]
    fn test_zero_timeout_is_unset() {
        let ctx = Context {
            timeout_secs: Some(0),
            ..Default::default()
        };
        assert_eq!(ctx.timeout(), None);
    }

    #[test]
    fn test_mask_api_key() {
        assert_eq!(mask_api_key("short"), "*****");
        assert_eq!(mask_api_key("abcd1234efgh"), "abcd****efgh");
    }
}
