use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::anyhow;
use config::{Config, File};
use serde::Deserialize;

use crate::prefixes::DEFAULT_LOOKUP_TEMPLATE;

pub const DEFAULT_MAX_LINE_SCAN: usize = 80;

#[derive(Deserialize, Debug, Clone)]
pub struct Settings {
    /// Vocabulary cache directory; searched for when unset
    pub cache_dir: Option<String>,
    /// Remote prefix service, `{prefix}` is substituted
    pub prefix_lookup_url: String,
    /// Lines scanned for prefix declarations
    pub max_line_scan: usize,
    /// Extra namespace -> document overrides
    #[serde(default)]
    pub vocab_sources: HashMap<String, String>,
    pub diagnostics: bool,
    pub max_completions: Option<usize>,
    pub fetch_timeout_secs: u64,
}

impl Settings {
    pub fn new(root_dir: &Path) -> anyhow::Result<Settings> {
        let expanded = shellexpand::tilde("~/.config/rdfls/settings");
        let settings = Config::builder()
            .add_source(File::with_name(&expanded).required(false))
            .add_source(
                File::with_name(&format!(
                    "{}/.rdfls",
                    root_dir
                        .to_str()
                        .ok_or(anyhow!("Can't convert root_dir to str"))?
                ))
                .required(false),
            )
            .set_default("prefix_lookup_url", DEFAULT_LOOKUP_TEMPLATE)?
            .set_default("max_line_scan", DEFAULT_MAX_LINE_SCAN as i64)?
            .set_default("diagnostics", true)?
            .set_default("fetch_timeout_secs", 30)?
            .build()
            .map_err(|err| anyhow!("Build err: {err}"))?;

        let settings = settings.try_deserialize::<Settings>()?;

        anyhow::Ok(settings)
    }

    /// The explicit cache directory if configured, else the first existing
    /// standard location (creating the per-user one if none exists).
    pub fn resolve_cache_dir(&self) -> io::Result<PathBuf> {
        match &self.cache_dir {
            Some(dir) => {
                let dir = PathBuf::from(shellexpand::tilde(dir).into_owned());
                fs::create_dir_all(&dir)?;
                Ok(dir)
            }
            None => find_cache_dir(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            cache_dir: None,
            prefix_lookup_url: DEFAULT_LOOKUP_TEMPLATE.to_string(),
            max_line_scan: DEFAULT_MAX_LINE_SCAN,
            vocab_sources: HashMap::new(),
            diagnostics: true,
            max_completions: None,
            fetch_timeout_secs: 30,
        }
    }
}

/// Look for the graph cache shared with other RDF tools:
/// `$RDF_GRAPH_CACHE` (default `~/.rdf-graph-cache`), then
/// `$XDG_CACHE_HOME/rdf-graph-cache/` and finally
/// `/usr/local/share/rdf-graph-cache/`.
pub fn find_cache_dir() -> io::Result<PathBuf> {
    let env_or = |key: &str, default: &str| {
        std::env::var(key)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(shellexpand::tilde(default).into_owned()))
    };
    let user_cache = env_or("XDG_CACHE_HOME", "~/.cache").join("rdf-graph-cache");

    first_existing_or_create(
        &[
            env_or("RDF_GRAPH_CACHE", "~/.rdf-graph-cache"),
            user_cache.clone(),
            PathBuf::from("/usr/local/share/rdf-graph-cache/"),
        ],
        &user_cache,
    )
}

fn first_existing_or_create(candidates: &[PathBuf], fallback: &Path) -> io::Result<PathBuf> {
    if let Some(found) = candidates.iter().find(|dir| dir.is_dir()) {
        return Ok(found.clone());
    }
    fs::create_dir_all(fallback)?;
    Ok(fallback.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Test: settings from the workspace file override defaults
    #[test]
    fn test_workspace_settings_file() {
        let root = TempDir::new().unwrap();
        fs::write(
            root.path().join(".rdfls.toml"),
            "max_line_scan = 10\ndiagnostics = false\n\n[vocab_sources]\n\"urn:example:\" = \"/tmp/example.ttl\"\n",
        )
        .unwrap();

        let settings = Settings::new(root.path()).unwrap();
        assert_eq!(settings.max_line_scan, 10);
        assert!(!settings.diagnostics);
        assert_eq!(
            settings.vocab_sources.get("urn:example:").map(String::as_str),
            Some("/tmp/example.ttl")
        );
        assert_eq!(settings.prefix_lookup_url, DEFAULT_LOOKUP_TEMPLATE);
    }

    #[test]
    fn test_first_existing_or_create() {
        let root = TempDir::new().unwrap();
        let existing = root.path().join("b");
        fs::create_dir(&existing).unwrap();
        let candidates = [root.path().join("a"), existing.clone()];

        assert_eq!(
            first_existing_or_create(&candidates, &root.path().join("c")).unwrap(),
            existing
        );

        let fallback = root.path().join("d/e");
        assert_eq!(
            first_existing_or_create(&[root.path().join("a")], &fallback).unwrap(),
            fallback
        );
        assert!(fallback.is_dir());
    }

    #[test]
    fn test_explicit_cache_dir_is_created() {
        let root = TempDir::new().unwrap();
        let dir = root.path().join("cache");
        let settings = Settings {
            cache_dir: Some(dir.to_string_lossy().into_owned()),
            ..Settings::default()
        };
        assert_eq!(settings.resolve_cache_dir().unwrap(), dir);
        assert!(dir.is_dir());
    }
}
