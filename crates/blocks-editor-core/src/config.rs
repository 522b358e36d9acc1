//! Clipboard pipeline configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Longest settle delay before a deferred live status clear.
pub const MAX_SETTLE_DELAY_MS: u64 = 150;

/// Tunables for the paste pipeline and the clipboard interceptor.
///
/// Every field has a default, so partial config files are fine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipboardConfig {
    /// Delay before clearing the live status text after a paste or drop,
    /// letting the editor commit its own update first.
    pub settle_delay_ms: u64,
    /// Deepest HTML nesting accepted from the clipboard.
    pub max_depth: usize,
    /// Largest HTML payload accepted from the clipboard, in bytes.
    pub max_html_bytes: usize,
    /// Id prefix of the wrapper element an external document editor puts
    /// around its exported HTML.
    pub wrapper_id_prefix: String,
    /// Live status text shown while a block is being dragged.
    pub drag_status_text: String,
    /// Install the document-level capture listener after a copy or cut whose
    /// payload could not be rewritten.
    pub capture_fallback: bool,
}

impl Default for ClipboardConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: 100,
            max_depth: 256,
            max_html_bytes: 4 * 1024 * 1024,
            wrapper_id_prefix: "docs-internal-guid-".to_owned(),
            drag_status_text: "Moving block".to_owned(),
            capture_fallback: true,
        }
    }
}

impl ClipboardConfig {
    /// Settle delay, clamped to [`MAX_SETTLE_DELAY_MS`].
    pub fn settle_delay(&self) -> Duration {
        if self.settle_delay_ms > MAX_SETTLE_DELAY_MS {
            tracing::warn!(
                configured = self.settle_delay_ms,
                max = MAX_SETTLE_DELAY_MS,
                "settle delay clamped"
            );
        }
        Duration::from_millis(self.settle_delay_ms.min(MAX_SETTLE_DELAY_MS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settle_delay_is_clamped() {
        let config = ClipboardConfig {
            settle_delay_ms: 900,
            ..Default::default()
        };
        assert_eq!(config.settle_delay(), Duration::from_millis(150));
        assert_eq!(
            ClipboardConfig::default().settle_delay(),
            Duration::from_millis(100)
        );
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: ClipboardConfig = serde_json::from_str(r#"{"max_depth": 12}"#).unwrap();
        assert_eq!(config.max_depth, 12);
        assert_eq!(config.wrapper_id_prefix, "docs-internal-guid-");
        assert!(config.capture_fallback);
    }
}
