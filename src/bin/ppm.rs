#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

//! `ppm` - compress or decompress a stream with an adaptive PPM model.
//!
//! Reads stdin and writes stdout unless `-i`/`-o` are given. Diagnostics,
//! progress and the final summary go to stderr.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ppm_stream::{
    decode, encode, LogProgress, Model, ModelConfig, PpmError, StreamOptions, StreamStats,
    SymbolMode,
};

#[derive(Debug, Parser)]
#[command(name = "ppm")]
#[command(about = "PPM compressor with arithmetic coding", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compress symbols into a coded stream
    Encode(Options),
    /// Decompress a coded stream back into symbols
    Decode(Options),
}

#[derive(Debug, Args)]
struct Options {
    /// Number of distinct symbols
    #[arg(short = 'a', long, default_value_t = 256, allow_negative_numbers = true)]
    alphabet: i64,

    /// Longest context used for prediction
    #[arg(short = 'O', long, default_value_t = 5, allow_negative_numbers = true)]
    order: i64,

    /// Escape method: A, B, C or D
    #[arg(short = 'e', long, default_value = "D")]
    escape: String,

    /// Disable full exclusions
    #[arg(short = 'F', long)]
    no_full_exclusions: bool,

    /// Disable update exclusions
    #[arg(short = 'U', long)]
    no_update_exclusions: bool,

    /// One decimal number per line instead of one symbol per byte
    #[arg(short = 'N', long)]
    numbers: bool,

    /// Input file (stdin if omitted)
    #[arg(short = 'i', long)]
    input: Option<PathBuf>,

    /// Output file (stdout if omitted)
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Start from a saved model instead of an empty one
    #[arg(short = 'm', long)]
    model: Option<PathBuf>,

    /// Save the model to this file once the stream is done
    #[arg(long)]
    save: Option<PathBuf>,

    /// Title stored with a saved model
    #[arg(long)]
    title: Option<String>,

    /// Report progress every N symbols (0 disables)
    #[arg(short = 'p', long, default_value_t = 0)]
    progress: u64,

    /// Dump the model after every update
    #[arg(short = 'd', long)]
    dump_model: bool,

    /// Log every coded range
    #[arg(short = 'r', long)]
    ranges: bool,
}

impl Options {
    fn log_level(&self) -> &'static str {
        if self.ranges {
            "trace"
        } else if self.dump_model {
            "debug"
        } else {
            "info"
        }
    }

    fn stream_options(&self) -> StreamOptions {
        StreamOptions {
            progress_interval: self.progress,
            dump_model: self.dump_model,
            symbol_mode: if self.numbers {
                SymbolMode::Numbers
            } else {
                SymbolMode::Bytes
            },
        }
    }

    fn config(&self) -> Result<ModelConfig, PpmError> {
        Ok(ModelConfig::try_new(self.alphabet, self.order, &self.escape)?
            .with_full_exclusions(!self.no_full_exclusions)
            .with_update_exclusions(!self.no_update_exclusions))
    }

    /// Loaded model if `-m` was given, otherwise a fresh one from the flags.
    /// A loaded model keeps its own configuration and the flags go unchecked.
    fn model(&self) -> Result<Model, PpmError> {
        let mut model = match &self.model {
            Some(path) => {
                let model = Model::load(BufReader::new(File::open(path)?))?;
                tracing::info!(
                    path = %path.display(),
                    config = ?model.config(),
                    "using the loaded model's configuration"
                );
                model
            }
            None => Model::new(self.config()?),
        };
        if let Some(title) = &self.title {
            model = model.with_title(title.clone());
        }
        Ok(model)
    }

    fn reader(&self) -> io::Result<Box<dyn BufRead>> {
        Ok(match &self.input {
            Some(path) => Box::new(BufReader::new(File::open(path)?)),
            None => Box::new(io::stdin().lock()),
        })
    }

    fn writer(&self) -> io::Result<Box<dyn Write>> {
        Ok(match &self.output {
            Some(path) => Box::new(BufWriter::new(File::create(path)?)),
            None => Box::new(BufWriter::new(io::stdout().lock())),
        })
    }
}

fn save_model(model: &Model, path: &Path) -> Result<(), PpmError> {
    let mut writer = BufWriter::new(File::create(path)?);
    model.save(&mut writer)?;
    writer.flush()?;
    tracing::info!(path = %path.display(), nodes = model.tree().len(), "saved model");
    Ok(())
}

fn run(command: &Command) -> Result<StreamStats, PpmError> {
    let (options, encoding) = match command {
        Command::Encode(options) => (options, true),
        Command::Decode(options) => (options, false),
    };
    let mut model = options.model()?;
    let stream = options.stream_options();

    let stats = if encoding {
        let source = stream.symbol_mode.source(options.reader()?);
        encode(&mut model, source, options.writer()?, &stream, &mut LogProgress)?
    } else {
        let sink = stream.symbol_mode.sink(options.writer()?);
        decode(&mut model, options.reader()?, sink, &stream, &mut LogProgress)?
    };

    if let Some(path) = &options.save {
        save_model(&model, path)?;
    }
    Ok(stats)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = match &cli.command {
        Command::Encode(options) | Command::Decode(options) => options.log_level(),
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(level))
        .with_writer(io::stderr)
        .init();

    match run(&cli.command) {
        Ok(stats) => {
            eprintln!("{stats}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("ppm: {err}");
            ExitCode::FAILURE
        }
    }
}
