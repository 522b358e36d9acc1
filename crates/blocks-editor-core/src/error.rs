//! Error types for the sanitization pipeline.

use miette::Diagnostic;

use crate::platform::PlatformError;

/// Errors raised inside the paste pipeline.
///
/// None of these reach the end user: the pipeline entry points catch them
/// and fall back to scrubbed plain text.
#[derive(thiserror::Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum SanitizeError {
    /// The HTML tree nests deeper than the configured limit.
    #[error("HTML nesting exceeds {max} levels")]
    #[diagnostic(
        code(blocks::too_deep),
        help("raise `max_depth` in the clipboard config if this payload is legitimate")
    )]
    TooDeep { max: usize },

    /// The HTML payload is larger than the configured limit.
    #[error("HTML payload is {len} bytes, limit is {max}")]
    #[diagnostic(code(blocks::payload_too_large))]
    PayloadTooLarge { len: usize, max: usize },

    /// A pipeline stage received a payload it cannot process.
    #[error("stage `{stage}` expected {expected}, got {found}")]
    #[diagnostic(code(blocks::stage_order))]
    StageOrder {
        stage: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    /// Clipboard platform failure.
    #[error("clipboard platform error: {0}")]
    #[diagnostic(code(blocks::platform))]
    Platform(#[from] PlatformError),
}
