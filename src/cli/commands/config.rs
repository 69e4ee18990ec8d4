//! Config command implementation.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;
use anyhow::Result;

/// Run the config command.
pub fn run_config(action: &ConfigAction, mut settings: Settings) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let toml_str = toml::to_string_pretty(&settings)
                .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;
            println!("{}", toml_str);
        }

        ConfigAction::Set { key, value } => {
            set_value(&mut settings, key, value)?;
            settings.save()?;
            Output::success(&format!("Set {} = {}", key, value));
        }

        ConfigAction::Edit => {
            let config_path = Settings::default_config_path();

            // Create default config if it doesn't exist
            if !config_path.exists() {
                settings.save()?;
                Output::info(&format!("Created default config at {:?}", config_path));
            }

            // Try to open in editor
            let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vim".to_string());

            Output::info(&format!("Opening config in {}...", editor));

            let status = std::process::Command::new(&editor)
                .arg(&config_path)
                .status();

            match status {
                Ok(s) if s.success() => {
                    Output::success("Config saved.");
                }
                Ok(_) => {
                    Output::warning("Editor exited with non-zero status.");
                }
                Err(e) => {
                    Output::error(&format!("Failed to open editor: {}", e));
                    Output::info(&format!("Config file is at: {:?}", config_path));
                }
            }
        }

        ConfigAction::Path => {
            let config_path = Settings::default_config_path();
            println!("{}", config_path.display());
        }
    }

    Ok(())
}

/// Apply a dotted-key assignment to the settings tree.
///
/// The key must name an existing field, and the raw value must parse as
/// that field's type. Unknown keys are rejected rather than silently
/// added to the file.
fn set_value(settings: &mut Settings, key: &str, raw: &str) -> Result<()> {
    let mut root = toml::Value::try_from(settings.clone())
        .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;

    let path: Vec<&str> = key.split('.').collect();
    let (leaf, parents) = path
        .split_last()
        .ok_or_else(|| anyhow::anyhow!("Empty config key"))?;

    let mut node = &mut root;
    for part in parents {
        node = node
            .get_mut(part)
            .ok_or_else(|| anyhow::anyhow!("Unknown config key: {}", key))?;
    }

    let table = node
        .as_table_mut()
        .ok_or_else(|| anyhow::anyhow!("Unknown config key: {}", key))?;
    let current = table
        .get(*leaf)
        .ok_or_else(|| anyhow::anyhow!("Unknown config key: {}", key))?;

    let new_value =
        coerce_value(current, raw).map_err(|e| anyhow::anyhow!("Invalid value for {}: {}", key, e))?;
    table.insert(leaf.to_string(), new_value);

    *settings = root
        .try_into()
        .map_err(|e| anyhow::anyhow!("Invalid value for {}: {}", key, e))?;

    Ok(())
}

/// Parse the raw string into the same TOML type as the existing value.
fn coerce_value(current: &toml::Value, raw: &str) -> std::result::Result<toml::Value, String> {
    use toml::Value;

    match current {
        Value::String(_) => Ok(Value::String(raw.to_string())),
        Value::Integer(_) => raw
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| format!("expected an integer, got '{}'", raw)),
        Value::Float(_) => raw
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| format!("expected a number, got '{}'", raw)),
        Value::Boolean(_) => raw
            .parse::<bool>()
            .map(Value::Boolean)
            .map_err(|_| format!("expected true or false, got '{}'", raw)),
        Value::Array(_) => Ok(Value::Array(
            raw.split(',')
                .map(|part| Value::String(part.trim().to_string()))
                .collect(),
        )),
        _ => Err("unsupported value type".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_string_field() {
        let mut settings = Settings::default();
        set_value(&mut settings, "analysis.model", "gemini-2.5-pro").unwrap();
        assert_eq!(settings.analysis.model, "gemini-2.5-pro");
    }

    #[test]
    fn test_set_integer_field() {
        let mut settings = Settings::default();
        set_value(&mut settings, "retry.max_attempts", "6").unwrap();
        assert_eq!(settings.retry.max_attempts, 6);
    }

    #[test]
    fn test_set_float_field() {
        let mut settings = Settings::default();
        set_value(&mut settings, "retry.multiplier", "3.5").unwrap();
        assert_eq!(settings.retry.multiplier, 3.5);
    }

    #[test]
    fn test_set_host_list() {
        let mut settings = Settings::default();
        set_value(&mut settings, "sources.allowed_hosts", "youtube.com, vimeo.com").unwrap();
        assert_eq!(
            settings.sources.allowed_hosts,
            vec!["youtube.com".to_string(), "vimeo.com".to_string()]
        );
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let mut settings = Settings::default();
        let err = set_value(&mut settings, "general.unknown_field", "x").unwrap_err();
        assert!(err.to_string().contains("Unknown config key"));
    }

    #[test]
    fn test_type_mismatch_is_rejected() {
        let mut settings = Settings::default();
        let err = set_value(&mut settings, "retry.max_attempts", "lots").unwrap_err();
        assert!(err.to_string().contains("expected an integer"));
        // The original value survives a failed set.
        assert_eq!(settings.retry.max_attempts, 4);
    }
}
