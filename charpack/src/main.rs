use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

use charpack::batch::{run_batch, SideOutputs, Workflow};
use charpack::config::{EncodeOptions, OptionFlags};
use charpack::emit::AsmWriter;
use charpack::error::ConversionError;

#[derive(Parser)]
#[command(name = "charpack")]
#[command(version, about = "Convert indexed images and LDtk levels to charsets, sprites and tiles", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a charset and charmap per image
    Charset {
        #[command(flatten)]
        args: EncodeArgs,
        /// Indexed PNG images
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
    /// Extract 24x21 sprites per image
    Sprites {
        #[command(flatten)]
        args: EncodeArgs,
        /// Indexed PNG sprite sheets
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
    /// Convert the tile and entity layers of LDtk projects
    Level {
        #[command(flatten)]
        args: EncodeArgs,
        /// LDtk project files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
}

#[derive(Args)]
struct EncodeArgs {
    #[command(flatten)]
    flags: OptionFlags,

    /// JSON file with base options
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory for per-input JSON reports
    #[arg(long)]
    json_dir: Option<PathBuf>,

    /// Directory for per-input preview PNGs (charset only)
    #[arg(long)]
    preview_dir: Option<PathBuf>,
}

impl EncodeArgs {
    fn output(&self) -> io::Result<Box<dyn Write>> {
        Ok(match &self.output {
            Some(path) => Box::new(BufWriter::new(File::create(path)?)),
            None => Box::new(BufWriter::new(io::stdout())),
        })
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("charpack=info")),
        )
        .init();

    let cli = Cli::parse();
    let (workflow, args, inputs) = match cli.command {
        Commands::Charset { args, inputs } => (Workflow::Charset, args, inputs),
        Commands::Sprites { args, inputs } => (Workflow::Sprites, args, inputs),
        Commands::Level { args, inputs } => (Workflow::Level, args, inputs),
    };

    match run(workflow, args, &inputs) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(failures) => {
            error!("{} of {} inputs failed", failures, inputs.len());
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(workflow: Workflow, args: EncodeArgs, inputs: &[PathBuf]) -> Result<usize, ConversionError> {
    let base = EncodeOptions::layered(args.config.as_deref(), &args.flags)?;
    let mut writer = AsmWriter::new(args.output()?, base.dialect);
    let side = SideOutputs {
        json_dir: args.json_dir,
        preview_dir: args.preview_dir,
    };
    run_batch(workflow, &base, inputs, &side, &mut writer)
}
