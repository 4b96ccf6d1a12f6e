use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use vireo_cli::{EmitMode, TemplateArgs, compile_file, init_logging, parse_delimiters, parse_file, write_output};

#[derive(Parser)]
#[command(name = "vireo", version, about = "Vireo template compiler")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct Shared {
    /// Template file, or a .vue/.vx single-file component
    input: PathBuf,
    /// Keep HTML comments
    #[arg(long)]
    comments: bool,
    /// Interpolation delimiters as OPEN,CLOSE
    #[arg(long, value_parser = parse_delimiters)]
    delimiters: Option<(String, String)>,
}

impl Shared {
    fn template_args(&self) -> TemplateArgs {
        TemplateArgs {
            comments: self.comments,
            delimiters: self.delimiters.clone(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a template into render-function source.
    Compile {
        #[command(flatten)]
        shared: Shared,
        /// Output directory; prints to stdout when omitted
        #[arg(long)]
        out_dir: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = EmitMode::Render)]
        emit: EmitMode,
        /// Exit with an error when the template has compile errors
        #[arg(long)]
        strict: bool,
    },
    /// Print the tokenizer event stream as JSON.
    Parse {
        #[command(flatten)]
        shared: Shared,
    },
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Compile {
            shared,
            out_dir,
            emit,
            strict,
        } => {
            let report = compile_file(&shared.input, emit, &shared.template_args())?;
            for error in &report.errors {
                eprintln!("error: {error}");
            }
            for tip in &report.tips {
                eprintln!("tip: {tip}");
            }
            match out_dir {
                Some(dir) => {
                    let path = write_output(&shared.input, &dir, emit, &report.output)?;
                    println!("Generated: {}", path.display());
                }
                None => print!("{}", report.output),
            }
            if strict && !report.errors.is_empty() {
                anyhow::bail!("{} compile error(s)", report.errors.len());
            }
        }
        Commands::Parse { shared } => {
            let events = parse_file(&shared.input, &shared.template_args())?;
            let json = serde_json::to_string_pretty(&events).context("serialize events")?;
            println!("{json}");
        }
    }
    Ok(())
}
