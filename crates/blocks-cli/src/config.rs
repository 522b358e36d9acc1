use std::path::Path;
use std::{env, fs};

use blocks_editor_core::ClipboardConfig;
use miette::miette;

/// Config file syntax, picked by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> miette::Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(ConfigFormat::Toml),
            Some("json") => Ok(ConfigFormat::Json),
            _ => Err(miette!(
                help = "use a .toml or .json file",
                "unsupported config file {}",
                path.display()
            )),
        }
    }
}

pub fn load(path: &Path) -> miette::Result<ClipboardConfig> {
    let format = ConfigFormat::from_path(path)?;
    let mut contents = fs::read_to_string(path)
        .map_err(|e| miette!("error reading config file {}: {e}", path.display()))?;
    // substitute environment variables in config file
    for (k, v) in env::vars() {
        contents = contents.replace(&format!("${k}"), &v);
    }
    parse(&contents, format)
}

pub fn parse(contents: &str, format: ConfigFormat) -> miette::Result<ClipboardConfig> {
    let config = match format {
        ConfigFormat::Toml => {
            toml::from_str(contents).map_err(|e| miette!("error parsing config file {e}"))?
        }
        ConfigFormat::Json => serde_json::from_str(contents)
            .map_err(|e| miette!("error parsing config file {e}"))?,
    };
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_partial() {
        let config = parse(
            "settle_delay_ms = 50\ndrag_status_text = \"Dragging\"\n",
            ConfigFormat::Toml,
        )
        .unwrap();
        assert_eq!(config.settle_delay_ms, 50);
        assert_eq!(config.drag_status_text, "Dragging");
        assert_eq!(config.max_depth, ClipboardConfig::default().max_depth);
    }

    #[test]
    fn test_json() {
        let config = parse(r#"{"capture_fallback": false}"#, ConfigFormat::Json).unwrap();
        assert!(!config.capture_fallback);
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_path(Path::new("blocks.toml")).unwrap(),
            ConfigFormat::Toml
        );
        assert!(ConfigFormat::from_path(Path::new("blocks.yaml")).is_err());
    }

    #[test]
    fn test_bad_value_is_an_error() {
        assert!(parse("max_depth = \"deep\"", ConfigFormat::Toml).is_err());
    }
}
