// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Tessera CLI entrypoint.
//!
//! Applies a stored analysis response to a source file and prints the decorated, folded view.
//! `--schema` prints the JSON schema analysis services must answer with.
//!
//! Logging goes to stderr and is filtered by `TESSERA_LOG` (default `warn`).

use std::error::Error;

use tessera::config::OverlayConfig;
use tessera::identity::Tone;
use tessera::model::{BlockId, DocumentId, SourceVersion};
use tessera::overlay::{DocumentOverlay, EventOutcome, UserInteractionEvent};
use tessera::protocol::response_schema;
use tessera::surface::BufferSurface;

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} <source-file> <analysis.json> [--hover <label>] [--focus <label>] [--fold] [--light] [--config <file>]\n  {program} --schema\n\n--hover previews a block, --focus focuses it (dimming the rest), --fold also folds the code\nbetween its ranges (requires --focus).\n--light renders against a light background; TESSERA_THEME=light does the same.\n--config reads an overlay config JSON file; TESSERA_* variables still apply on top."
    );
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct CliOptions {
    schema: bool,
    source: Option<String>,
    analysis: Option<String>,
    hover: Option<String>,
    focus: Option<String>,
    fold: bool,
    light: bool,
    config: Option<String>,
}

fn parse_options(mut args: impl Iterator<Item = String>) -> Result<CliOptions, ()> {
    let mut options = CliOptions::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--schema" => {
                if options.schema {
                    return Err(());
                }
                options.schema = true;
            }
            "--hover" => {
                if options.hover.is_some() {
                    return Err(());
                }
                options.hover = Some(args.next().ok_or(())?);
            }
            "--focus" => {
                if options.focus.is_some() {
                    return Err(());
                }
                options.focus = Some(args.next().ok_or(())?);
            }
            "--fold" => {
                if options.fold {
                    return Err(());
                }
                options.fold = true;
            }
            "--light" => {
                if options.light {
                    return Err(());
                }
                options.light = true;
            }
            "--config" => {
                if options.config.is_some() {
                    return Err(());
                }
                options.config = Some(args.next().ok_or(())?);
            }
            _ if arg.starts_with('-') => return Err(()),
            _ => {
                if options.source.is_none() {
                    options.source = Some(arg);
                } else if options.analysis.is_none() {
                    options.analysis = Some(arg);
                } else {
                    return Err(());
                }
            }
        }
    }

    if options.schema {
        let other = options.source.is_some()
            || options.hover.is_some()
            || options.focus.is_some()
            || options.fold
            || options.light
            || options.config.is_some();
        return if other { Err(()) } else { Ok(options) };
    }

    if options.source.is_none() || options.analysis.is_none() {
        return Err(());
    }

    if options.fold && options.focus.is_none() {
        return Err(());
    }

    Ok(options)
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("TESSERA_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn load_config(options: &CliOptions) -> Result<OverlayConfig, Box<dyn Error>> {
    let mut config = match &options.config {
        Some(path) => OverlayConfig::from_json_str(&std::fs::read_to_string(path)?)?,
        None => OverlayConfig::default(),
    };
    config.apply_env()?;
    if options.light {
        config.tone = Tone::Light;
    }
    Ok(config)
}

fn block_by_label(
    overlay: &DocumentOverlay<BufferSurface>,
    label: &str,
) -> Result<BlockId, Box<dyn Error>> {
    overlay
        .session()
        .result()
        .and_then(|result| result.find_block_by_label(label))
        .map(|block| block.block_id().clone())
        .ok_or_else(|| format!("no block labelled {label:?} in the analysis").into())
}

fn apply(
    overlay: &mut DocumentOverlay<BufferSurface>,
    event: UserInteractionEvent,
) -> Result<(), Box<dyn Error>> {
    match overlay.handle_event(event.clone()) {
        EventOutcome::Applied | EventOutcome::Unchanged => Ok(()),
        outcome => Err(format!("{event:?} was not applied ({outcome:?})").into()),
    }
}

fn run(options: CliOptions) -> Result<(), Box<dyn Error>> {
    if options.schema {
        println!("{}", serde_json::to_string_pretty(&response_schema())?);
        return Ok(());
    }

    let (Some(source_path), Some(analysis_path)) = (&options.source, &options.analysis) else {
        return Err("source and analysis paths are required".into());
    };
    let config = load_config(&options)?;
    let text = std::fs::read_to_string(source_path)?;
    let response = std::fs::read_to_string(analysis_path)?;

    let surface = BufferSurface::from_text(&text, config.colors.background(config.tone));
    let document = DocumentId::new(source_path.as_str())?;
    let mut overlay = DocumentOverlay::new(document, surface, &config)
        .with_document_version(SourceVersion(1));

    let ticket = overlay.begin_analysis()?;
    overlay.complete_analysis(ticket, Ok(response))?;
    if let Some(result) = overlay.session().result() {
        eprintln!("{}", result.intent());
    }

    if let Some(label) = &options.hover {
        let block_id = block_by_label(&overlay, label)?;
        apply(&mut overlay, UserInteractionEvent::HoverBlock(block_id))?;
    }
    if let Some(label) = &options.focus {
        let block_id = block_by_label(&overlay, label)?;
        let event = if options.fold {
            UserInteractionEvent::DoubleClickBlock(block_id)
        } else {
            UserInteractionEvent::ClickBlock(block_id)
        };
        apply(&mut overlay, event)?;
    }

    print!("{}", overlay.surface().render_annotated());
    overlay.dispose();
    Ok(())
}

fn main() {
    let mut args = std::env::args();
    let program = args.next().unwrap_or_else(|| "tessera".to_owned());

    let options = match parse_options(args) {
        Ok(options) => options,
        Err(()) => {
            print_usage(&program);
            std::process::exit(2);
        }
    };

    init_tracing();

    if let Err(err) = run(options) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_options, CliOptions};

    fn parse(args: &[&str]) -> Result<CliOptions, ()> {
        parse_options(args.iter().map(|arg| (*arg).to_owned()))
    }

    #[test]
    fn parses_render_invocation() {
        let options = parse(&["a.rs", "a.json", "--focus", "Core", "--fold", "--light"]).unwrap();
        assert_eq!(options.source.as_deref(), Some("a.rs"));
        assert_eq!(options.analysis.as_deref(), Some("a.json"));
        assert_eq!(options.focus.as_deref(), Some("Core"));
        assert!(options.fold);
        assert!(options.light);
        assert!(!options.schema);
    }

    #[test]
    fn schema_stands_alone() {
        assert!(parse(&["--schema"]).unwrap().schema);
        assert!(parse(&["--schema", "a.rs"]).is_err());
        assert!(parse(&["--schema", "--light"]).is_err());
    }

    #[test]
    fn rejects_incomplete_or_repeated_flags() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["a.rs"]).is_err());
        assert!(parse(&["a.rs", "a.json", "extra"]).is_err());
        assert!(parse(&["a.rs", "a.json", "--hover"]).is_err());
        assert!(parse(&["a.rs", "a.json", "--fold"]).is_err());
        assert!(parse(&["a.rs", "a.json", "--light", "--light"]).is_err());
        assert!(parse(&["a.rs", "a.json", "--unknown"]).is_err());
    }
}
