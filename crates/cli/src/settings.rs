//! Claude Code settings merge.
//!
//! Merges a settings input (inline JSON or a file path) into
//! `~/.claude/settings.json`, always enabling project MCP servers so the
//! Gitea tool server gets loaded.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde_json::{Map, Value};
use tracing::info;

/// Merge `settings_input` into the settings file under `home_dir` (the real
/// home directory when `None`). Returns the path written.
pub fn setup_claude_code_settings(
    settings_input: Option<&str>,
    home_dir: Option<&Path>,
) -> Result<PathBuf> {
    let home = match home_dir {
        Some(dir) => dir.to_path_buf(),
        None => dirs::home_dir().context("could not determine home directory")?,
    };
    let claude_dir = home.join(".claude");
    let settings_path = claude_dir.join("settings.json");
    fs::create_dir_all(&claude_dir)
        .with_context(|| format!("failed to create {}", claude_dir.display()))?;

    let mut settings: Map<String, Value> = match fs::read_to_string(&settings_path) {
        Ok(existing) if !existing.trim().is_empty() => serde_json::from_str(&existing)
            .with_context(|| {
                format!(
                    "failed to parse existing settings at {}",
                    settings_path.display()
                )
            })?,
        _ => Map::new(),
    };

    if let Some(input) = settings_input.map(str::trim).filter(|s| !s.is_empty()) {
        let incoming = parse_settings_input(input)?;
        for (key, value) in incoming {
            settings.insert(key, value);
        }
    }

    // project MCP servers must load for the tool server to be reachable
    settings.insert("enableAllProjectMcpServers".to_string(), Value::Bool(true));

    let rendered = serde_json::to_string_pretty(&Value::Object(settings))?;
    fs::write(&settings_path, rendered)
        .with_context(|| format!("failed to write {}", settings_path.display()))?;
    info!(path = %settings_path.display(), "Settings saved");

    Ok(settings_path)
}

/// The input is either inline JSON or a path to a JSON file.
fn parse_settings_input(input: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(input) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => bail!("settings input must be a JSON object"),
        Err(_) => {
            let content = fs::read_to_string(input)
                .with_context(|| format!("failed to read settings file {input}"))?;
            match serde_json::from_str::<Value>(&content)
                .with_context(|| format!("failed to parse settings file {input}"))?
            {
                Value::Object(map) => Ok(map),
                _ => bail!("settings file {input} must contain a JSON object"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_home(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "claude-gitea-settings-{}-{name}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn read_settings(path: &Path) -> Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_creates_settings_with_mcp_flag() {
        let home = temp_home("create");
        let path = setup_claude_code_settings(None, Some(&home)).unwrap();
        let settings = read_settings(&path);
        assert_eq!(settings["enableAllProjectMcpServers"], json!(true));
    }

    #[test]
    fn test_inline_json_merges_over_existing() {
        let home = temp_home("merge");
        let claude_dir = home.join(".claude");
        fs::create_dir_all(&claude_dir).unwrap();
        fs::write(
            claude_dir.join("settings.json"),
            r#"{ "model": "old", "theme": "dark" }"#,
        )
        .unwrap();

        let path =
            setup_claude_code_settings(Some(r#"{ "model": "new" }"#), Some(&home)).unwrap();
        let settings = read_settings(&path);
        assert_eq!(settings["model"], "new");
        assert_eq!(settings["theme"], "dark");
    }

    #[test]
    fn test_mcp_flag_cannot_be_disabled() {
        let home = temp_home("flag");
        let path = setup_claude_code_settings(
            Some(r#"{ "enableAllProjectMcpServers": false }"#),
            Some(&home),
        )
        .unwrap();
        let settings = read_settings(&path);
        assert_eq!(settings["enableAllProjectMcpServers"], json!(true));
    }

    #[test]
    fn test_file_path_input() {
        let home = temp_home("file");
        let input_path = home.join("input-settings.json");
        fs::write(&input_path, r#"{ "permissions": { "allow": ["Bash"] } }"#).unwrap();

        let path = setup_claude_code_settings(
            Some(input_path.to_str().unwrap()),
            Some(&home),
        )
        .unwrap();
        let settings = read_settings(&path);
        assert_eq!(settings["permissions"]["allow"], json!(["Bash"]));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let home = temp_home("missing");
        let err = setup_claude_code_settings(Some("not json and not a file"), Some(&home))
            .unwrap_err();
        assert!(err.to_string().contains("failed to read settings file"));
    }

    #[test]
    fn test_non_object_inline_rejected() {
        let home = temp_home("nonobject");
        let err = setup_claude_code_settings(Some("[1, 2]"), Some(&home)).unwrap_err();
        assert!(err.to_string().contains("must be a JSON object"));
    }
}
