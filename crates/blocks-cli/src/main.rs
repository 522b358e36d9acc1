use std::io::Read;
use std::path::{Path, PathBuf};

use blocks_editor_core::{
    BlocksEditor, ClipboardConfig, ClipboardInterceptor, ClipboardPayload, CopyOutcome,
    Document, ManualScheduler, MemoryClipboard, scrub,
};
use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

mod config;

#[derive(Parser)]
#[command(version, about = "Blocks - clipboard sanitizer for the blocks rich-text field", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Clipboard config file (.toml or .json)
    #[arg(long, global = true, env = "BLOCKS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Remove the corrupt "drag" token from text
    Scrub {
        /// Text to scrub (read from stdin when omitted)
        text: Option<String>,
    },
    /// Paste a clipboard payload into an empty editor and print the document
    Paste {
        /// File holding the text/html part
        #[arg(long)]
        html: Option<PathBuf>,

        /// File holding the text/plain part
        #[arg(long)]
        text: Option<PathBuf>,
    },
    /// Copy a whole document and print the outgoing clipboard payload
    Copy {
        /// Document JSON file
        document: PathBuf,
    },
}

fn main() -> Result<()> {
    init_miette();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => config::load(path)?,
        None => ClipboardConfig::default(),
    };

    match cli.command {
        Commands::Scrub { text } => {
            let text = match text {
                Some(text) => text,
                None => read_stdin()?,
            };
            print!("{}", scrub(&text));
        }
        Commands::Paste { html, text } => {
            let payload = ClipboardPayload::new(read_opt(html.as_deref())?, read_opt(text.as_deref())?);
            let doc = paste(config, &payload);
            println!("{}", serde_json::to_string_pretty(&doc).into_diagnostic()?);
        }
        Commands::Copy { document } => {
            let json = std::fs::read_to_string(&document)
                .map_err(|e| miette::miette!("error reading {}: {e}", document.display()))?;
            let doc: Document = serde_json::from_str(&json).into_diagnostic()?;
            let payload = copy(config, doc)?;
            println!("text/plain:\n{}", payload.text.unwrap_or_default());
            println!("text/html:\n{}", payload.html.unwrap_or_default());
        }
    }

    Ok(())
}

fn paste(config: ClipboardConfig, payload: &ClipboardPayload) -> Document {
    let scheduler = ManualScheduler::new();
    let interceptor = ClipboardInterceptor::new(config, scheduler.clone());
    let mut editor = BlocksEditor::default();
    let outcome = interceptor.handle_paste(&mut editor, &MemoryClipboard::with_payload(payload));
    scheduler.run_all();
    tracing::info!(?outcome, "pasted");
    editor.into_document()
}

fn copy(config: ClipboardConfig, doc: Document) -> Result<ClipboardPayload> {
    let interceptor = ClipboardInterceptor::new(config, ManualScheduler::new());
    let mut editor = BlocksEditor::new(doc);
    editor.select_all();
    let clipboard = MemoryClipboard::new();
    match interceptor.handle_copy(&editor, &clipboard) {
        CopyOutcome::Written | CopyOutcome::Empty => Ok(clipboard.payload()),
        CopyOutcome::Restricted => Err(miette::miette!("clipboard refused the copy")),
    }
}

fn read_opt(path: Option<&Path>) -> Result<Option<String>> {
    path.map(|path| {
        std::fs::read_to_string(path)
            .map_err(|e| miette::miette!("error reading {}: {e}", path.display()))
    })
    .transpose()
}

fn read_stdin() -> Result<String> {
    let mut text = String::new();
    std::io::stdin().read_to_string(&mut text).into_diagnostic()?;
    Ok(text)
}

fn init_miette() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))
    .expect("couldn't set the miette hook");
    miette::set_panic_hook();
}
