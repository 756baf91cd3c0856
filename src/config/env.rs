use std::collections::BTreeMap;
use std::path::Path;

use crate::Result;

/// Key/value source for startup configuration: the process environment,
/// backed by a parsed `.env` file.
#[derive(Clone, Default)]
pub struct Env {
    pub dotenv: BTreeMap<String, String>,
}

// Values are credentials; only the key names are ever printed.
impl std::fmt::Debug for Env {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let keys: Vec<&str> = self.dotenv.keys().map(|key| key.as_str()).collect();
        f.debug_struct("Env").field("dotenv_keys", &keys).finish()
    }
}

impl Env {
    pub fn parse_dotenv(contents: &str) -> Self {
        Self {
            dotenv: parse_dotenv(contents),
        }
    }

    /// Loads `path` if it exists; a missing file yields an empty layer.
    pub async fn load_dotenv(path: impl AsRef<Path>) -> Result<Self> {
        match tokio::fs::read_to_string(path.as_ref()).await {
            Ok(contents) => Ok(Self::parse_dotenv(&contents)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err.into()),
        }
    }

    /// Exported variables win; the `.env` layer only fills gaps.
    pub fn get(&self, key: &str) -> Option<String> {
        std::env::var(key)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .or_else(|| self.dotenv.get(key).cloned())
    }
}

/// `KEY=value` pairs from a `.env` file. Comments, `export ` prefixes and one
/// layer of matching quotes are handled; blank values are dropped.
pub fn parse_dotenv(contents: &str) -> BTreeMap<String, String> {
    contents.lines().filter_map(parse_dotenv_line).collect()
}

fn parse_dotenv_line(raw: &str) -> Option<(String, String)> {
    let line = raw.trim();
    if line.starts_with('#') {
        return None;
    }
    let line = line.strip_prefix("export ").map_or(line, str::trim_start);
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    let value = unquote(value.trim()).trim();
    if key.is_empty() || value.is_empty() {
        return None;
    }
    Some((key.to_string(), value.to_string()))
}

fn unquote(value: &str) -> &str {
    ['"', '\'']
        .into_iter()
        .find_map(|quote| value.strip_prefix(quote)?.strip_suffix(quote))
        .unwrap_or(value)
}
