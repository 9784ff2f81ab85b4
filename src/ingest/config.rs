// src/ingest/config.rs
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_TOPICS_PATH: &str = "DIGEST_TOPICS_PATH";

/// Load the topic list from an explicit path. Supports TOML (`topics = [..]`)
/// or a plain JSON array.
pub fn load_topics_from(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading topics from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_topics(&content, ext.as_str())
        .with_context(|| format!("parsing topics from {}", path.display()))
}

/// Load topics using env var + fallbacks:
/// 1) $DIGEST_TOPICS_PATH
/// 2) config/topics.toml
/// 3) config/topics.json
///
/// No file at all is not an error: the digest then only serves ad hoc topics.
pub fn load_topics_default() -> Result<Vec<String>> {
    if let Ok(p) = std::env::var(ENV_TOPICS_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_topics_from(&pb);
        }
        return Err(anyhow!(
            "{ENV_TOPICS_PATH} points to non-existent path {}",
            pb.display()
        ));
    }
    let toml_p = PathBuf::from("config/topics.toml");
    if toml_p.exists() {
        return load_topics_from(&toml_p);
    }
    let json_p = PathBuf::from("config/topics.json");
    if json_p.exists() {
        return load_topics_from(&json_p);
    }
    Ok(Vec::new())
}

fn parse_topics(s: &str, hint_ext: &str) -> Result<Vec<String>> {
    let try_toml = hint_ext == "toml" || s.contains("topics");
    if try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    if let Ok(v) = parse_json(s) {
        return Ok(v);
    }
    if !try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    Err(anyhow!("unsupported topics format"))
}

fn parse_toml(s: &str) -> Result<Vec<String>> {
    #[derive(serde::Deserialize)]
    struct TomlTopics {
        topics: Vec<String>,
    }
    let v: TomlTopics = toml::from_str(s)?;
    Ok(clean_topics(v.topics))
}

fn parse_json(s: &str) -> Result<Vec<String>> {
    let v: Vec<String> = serde_json::from_str(s)?;
    Ok(clean_topics(v))
}

/// Trim, drop empties, drop case-insensitive duplicates. First spelling and
/// original order win.
pub fn clean_topics<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    use std::collections::HashSet;
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for it in items {
        let t = it.as_ref().trim();
        if !t.is_empty() && seen.insert(t.to_lowercase()) {
            out.push(t.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_trim_and_formats_work() {
        let toml = r#"topics = [" Robotics ", "", "AI safety", "ai SAFETY"]"#;
        let json = r#"["quantum computing", "  Robotics  ", ""]"#;
        assert_eq!(
            parse_topics(toml, "toml").unwrap(),
            vec!["Robotics".to_string(), "AI safety".to_string()]
        );
        assert_eq!(
            parse_topics(json, "json").unwrap(),
            vec!["quantum computing".to_string(), "Robotics".to_string()]
        );
    }

    #[test]
    fn unknown_shape_is_rejected() {
        assert!(parse_topics(r#"{"nope": 1}"#, "json").is_err());
    }
}
