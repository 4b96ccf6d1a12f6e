//! Commands behind the `vireo` binary.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use vireo_compiler::{
    CompileOptions, EventRecorder, ParseEvent, base_options, create_compiler, parse_html, parse_sfc,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum EmitMode {
    /// Rust source of the render function and the hoisted static trees.
    Render,
    /// The full compile result (AST, source, errors, tips) as JSON.
    Json,
}

/// Knobs shared by `compile` and `parse`.
#[derive(Clone, Debug, Default)]
pub struct TemplateArgs {
    /// Keep comments in the output.
    pub comments: bool,
    /// Interpolation delimiters, e.g. `("[[", "]]")`.
    pub delimiters: Option<(String, String)>,
}

/// Installs the `fmt` subscriber, filtered by `RUST_LOG` (default `warn`).
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // a second call (tests) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Parses `a,b` delimiter pairs given on the command line.
pub fn parse_delimiters(s: &str) -> Result<(String, String), String> {
    match s.split_once(',') {
        Some((open, close)) if !open.is_empty() && !close.is_empty() => {
            Ok((open.to_string(), close.to_string()))
        }
        _ => Err(format!("expected OPEN,CLOSE delimiters, got {s:?}")),
    }
}

/// Reads `input` and returns the template it holds: the `<template>` block
/// of a `.vue`/`.vx` single-file component, or the whole file otherwise.
pub fn load_template(input: &Path) -> Result<String> {
    let src =
        fs::read_to_string(input).with_context(|| format!("failed to read {}", input.display()))?;
    let is_sfc = matches!(
        input.extension().and_then(|e| e.to_str()),
        Some("vue" | "vx")
    );
    if !is_sfc {
        return Ok(src);
    }
    let sfc = parse_sfc(&src).with_context(|| format!("failed to split {}", input.display()))?;
    debug!(
        file = %input.display(),
        styles = sfc.styles.len(),
        has_script = sfc.script.is_some() || sfc.script_setup.is_some(),
        "split single-file component"
    );
    let template = sfc
        .template
        .map(|t| t.content)
        .with_context(|| format!("{} has no <template> block", input.display()))?;
    Ok(template)
}

#[derive(Debug, Serialize)]
pub struct CompileReport {
    pub output: String,
    pub errors: Vec<String>,
    pub tips: Vec<String>,
}

/// Compiles the template in `input`.
///
/// Diagnostics are collected into the report rather than failing; the
/// caller decides whether errors are fatal.
pub fn compile_file(input: &Path, emit: EmitMode, args: &TemplateArgs) -> Result<CompileReport> {
    let template = load_template(input)?;
    let compiler = create_compiler(base_options());
    let options = CompileOptions {
        comments: Some(args.comments),
        delimiters: args.delimiters.clone(),
        ..Default::default()
    };
    let result = compiler.compile(&template, Some(&options));
    info!(
        file = %input.display(),
        errors = result.errors.len(),
        tips = result.tips.len(),
        static_trees = result.static_render_fns.len(),
        "compiled"
    );
    let output = match emit {
        EmitMode::Render => {
            let mut code = result.render.clone();
            for f in &result.static_render_fns {
                code.push_str("\n\n");
                code.push_str(f);
            }
            code.push('\n');
            code
        }
        EmitMode::Json => serde_json::to_string_pretty(&result).context("serialize compile result")?,
    };
    Ok(CompileReport {
        output,
        errors: result.errors,
        tips: result.tips,
    })
}

/// Writes `contents` to `out_dir/<stem>.rs` (or `.json`) and returns the
/// path.
pub fn write_output(input: &Path, out_dir: &Path, emit: EmitMode, contents: &str) -> Result<PathBuf> {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("component");
    let ext = match emit {
        EmitMode::Render => "rs",
        EmitMode::Json => "json",
    };
    fs::create_dir_all(out_dir).with_context(|| format!("failed to create {}", out_dir.display()))?;
    let out_path = out_dir.join(format!("{stem}.{ext}"));
    fs::write(&out_path, contents).with_context(|| format!("failed to write {}", out_path.display()))?;
    Ok(out_path)
}

/// Runs the tokenizer alone and returns its events.
pub fn parse_file(input: &Path, args: &TemplateArgs) -> Result<Vec<ParseEvent>> {
    let template = load_template(input)?;
    let mut options = base_options().parser_options();
    options.should_keep_comment = args.comments;
    let mut recorder = EventRecorder::default();
    parse_html(&template, &options, &mut recorder);
    debug!(events = recorder.events.len(), "tokenized");
    Ok(recorder.events)
}
