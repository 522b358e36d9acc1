//! Paste pipeline: named pure stages from clipboard HTML to a clean document.
//!
//! ```text
//! Markup --Parse--> Tree --Deserialize--> Document --CleanDocument--> Document
//! ```
//!
//! Platform layers with their own HTML parser start at [`Payload::Tree`];
//! `Parse` is the identity there.

use crate::config::ClipboardConfig;
use crate::deserialize::deserialize;
use crate::document::{Document, Node};
use crate::dom::{HtmlNode, parse_html};
use crate::error::SanitizeError;
use crate::fragment::clean_document;
use crate::platform::ClipboardPayload;
use crate::scrub::scrub;

/// One step of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Parse,
    Deserialize,
    CleanDocument,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Parse, Stage::Deserialize, Stage::CleanDocument];

    pub fn name(self) -> &'static str {
        match self {
            Stage::Parse => "parse",
            Stage::Deserialize => "deserialize",
            Stage::CleanDocument => "clean-document",
        }
    }

    /// Run this stage over `payload`.
    pub fn apply(
        self,
        payload: Payload,
        config: &ClipboardConfig,
    ) -> Result<Payload, SanitizeError> {
        match (self, payload) {
            (Stage::Parse, Payload::Markup(markup)) => {
                Ok(Payload::Tree(parse_html(&markup, config)?))
            }
            (Stage::Parse, tree @ Payload::Tree(_)) => Ok(tree),
            (Stage::Deserialize, Payload::Tree(tree)) => {
                Ok(Payload::Document(deserialize(&tree, config)?))
            }
            (Stage::CleanDocument, Payload::Document(doc)) => {
                Ok(Payload::Document(clean_document(&doc)))
            }
            (stage, payload) => Err(SanitizeError::StageOrder {
                stage: stage.name(),
                expected: stage.expects(),
                found: payload.kind(),
            }),
        }
    }

    fn expects(self) -> &'static str {
        match self {
            Stage::Parse => "markup",
            Stage::Deserialize => "tree",
            Stage::CleanDocument => "document",
        }
    }
}

/// Value flowing between stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Markup(String),
    Tree(HtmlNode),
    Document(Document),
}

impl Payload {
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Markup(_) => "markup",
            Payload::Tree(_) => "tree",
            Payload::Document(_) => "document",
        }
    }
}

/// What a paste should insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasteInput {
    Fragment(Document),
    PlainText(String),
    Empty,
}

/// The ordered stage list with its configuration.
#[derive(Debug, Clone)]
pub struct PastePipeline {
    config: ClipboardConfig,
    stages: Vec<Stage>,
}

impl Default for PastePipeline {
    fn default() -> Self {
        Self::new(ClipboardConfig::default())
    }
}

impl PastePipeline {
    pub fn new(config: ClipboardConfig) -> Self {
        Self {
            config,
            stages: Stage::ALL.to_vec(),
        }
    }

    /// A pipeline with a custom stage order.
    pub fn with_stages(config: ClipboardConfig, stages: Vec<Stage>) -> Self {
        Self { config, stages }
    }

    pub fn config(&self) -> &ClipboardConfig {
        &self.config
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Run every stage over `payload` and return the final document.
    pub fn run(&self, payload: Payload) -> Result<Document, SanitizeError> {
        let mut current = payload;
        for stage in &self.stages {
            tracing::debug!(stage = stage.name(), input = current.kind(), "pipeline stage");
            current = stage.apply(current, &self.config)?;
        }
        match current {
            Payload::Document(doc) => Ok(doc),
            other => Err(SanitizeError::StageOrder {
                stage: "output",
                expected: "document",
                found: other.kind(),
            }),
        }
    }

    pub fn run_markup(&self, markup: &str) -> Result<Document, SanitizeError> {
        self.run(Payload::Markup(markup.to_owned()))
    }

    pub fn run_tree(&self, tree: HtmlNode) -> Result<Document, SanitizeError> {
        self.run(Payload::Tree(tree))
    }

    /// Decide what a paste of `payload` inserts. Never fails: pipeline errors
    /// fall back to the scrubbed plain text part.
    pub fn sanitize(&self, payload: &ClipboardPayload) -> PasteInput {
        let text = payload.text.as_deref();
        match payload.html.as_deref() {
            Some(markup) => settle(self.run_markup(markup), text),
            None => plain_text(text),
        }
    }

    /// [`sanitize`](Self::sanitize) for platforms that parse HTML themselves.
    pub fn sanitize_tree(&self, tree: HtmlNode, text: Option<&str>) -> PasteInput {
        settle(self.run_tree(tree), text)
    }
}

fn settle(result: Result<Document, SanitizeError>, text: Option<&str>) -> PasteInput {
    match result {
        Ok(doc) => fragment_or_text(doc, text),
        Err(err) => {
            tracing::warn!(error = %err, "html paste failed, falling back to plain text");
            plain_text(text)
        }
    }
}

/// A document with no text at all (the HTML was nothing but token runs or
/// drag chrome) defers to the plain text part when there is one.
fn fragment_or_text(doc: Document, text: Option<&str>) -> PasteInput {
    let has_content = doc.len_chars() > 0 || has_void(&doc.children);
    if has_content || text.is_none() {
        PasteInput::Fragment(doc)
    } else {
        plain_text(text)
    }
}

fn has_void(nodes: &[Node]) -> bool {
    nodes.iter().any(|node| match node {
        Node::Block(block) => block.kind.is_void() || has_void(&block.children),
        Node::Text(_) => false,
    })
}

fn plain_text(text: Option<&str>) -> PasteInput {
    match text.map(scrub) {
        Some(cleaned) if !cleaned.is_empty() => PasteInput::PlainText(cleaned.into_owned()),
        _ => PasteInput::Empty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::HtmlElement;

    fn payload(html: Option<&str>, text: Option<&str>) -> ClipboardPayload {
        ClipboardPayload::new(html.map(str::to_owned), text.map(str::to_owned))
    }

    #[test]
    fn test_run_markup() {
        let doc = PastePipeline::default()
            .run_markup("<p>dragdrag hello</p>")
            .unwrap();
        assert_eq!(doc.plain_text(), " hello");
    }

    #[test]
    fn test_tree_input_skips_parsing() {
        let tree = HtmlNode::from(
            HtmlElement::new("body").with_child(HtmlElement::new("h1").with_child("Hi drag")),
        );
        let doc = PastePipeline::default().run_tree(tree).unwrap();
        assert_eq!(doc.plain_text(), "Hi ");
    }

    #[test]
    fn test_stage_order_violation() {
        let pipeline = PastePipeline::with_stages(
            ClipboardConfig::default(),
            vec![Stage::Deserialize, Stage::Parse],
        );
        let err = pipeline.run_markup("<p>x</p>").unwrap_err();
        assert!(matches!(
            err,
            SanitizeError::StageOrder {
                stage: "deserialize",
                expected: "tree",
                found: "markup"
            }
        ));
    }

    #[test]
    fn test_unfinished_pipeline_is_an_error() {
        let pipeline = PastePipeline::with_stages(ClipboardConfig::default(), vec![Stage::Parse]);
        let err = pipeline.run_markup("<p>x</p>").unwrap_err();
        assert!(matches!(err, SanitizeError::StageOrder { found: "tree", .. }));
    }

    #[test]
    fn test_sanitize_prefers_html() {
        let input = PastePipeline::default().sanitize(&payload(Some("<p>a</p>"), Some("b")));
        let PasteInput::Fragment(doc) = input else {
            panic!("expected fragment, got {input:?}");
        };
        assert_eq!(doc.plain_text(), "a");
    }

    #[test]
    fn test_sanitize_falls_back_on_error() {
        let config = ClipboardConfig {
            max_html_bytes: 8,
            ..Default::default()
        };
        let input = PastePipeline::new(config).sanitize(&payload(
            Some("<p>way too long for the limit</p>"),
            Some("dragfallback"),
        ));
        assert_eq!(input, PasteInput::PlainText("fallback".into()));
    }

    #[test]
    fn test_sanitize_token_only_html_defers_to_text() {
        let pipeline = PastePipeline::default();
        let input = pipeline.sanitize(&payload(Some("<p>drag</p>"), Some("hello")));
        assert_eq!(input, PasteInput::PlainText("hello".into()));

        // Without text the empty structure is still pasted.
        let input = pipeline.sanitize(&payload(Some("<p>drag</p>"), None));
        assert_eq!(input, PasteInput::Fragment(Document::empty_paragraph()));
    }

    #[test]
    fn test_sanitize_images_count_as_content() {
        let input = PastePipeline::default()
            .sanitize(&payload(Some(r#"<img src="a.png">"#), Some("a.png")));
        assert!(matches!(input, PasteInput::Fragment(_)));
    }

    #[test]
    fn test_sanitize_text_only() {
        let pipeline = PastePipeline::default();
        assert_eq!(
            pipeline.sanitize(&payload(None, Some("dragdrag hi"))),
            PasteInput::PlainText(" hi".into())
        );
        assert_eq!(
            pipeline.sanitize(&payload(None, Some("DRAG"))),
            PasteInput::Empty
        );
        assert_eq!(pipeline.sanitize(&payload(None, None)), PasteInput::Empty);
    }
}
