//! Tek Rules CLI
//!
//! Commands: rules, processors
//! Writes the makefile (or a JSON report) to stdout
//! Returns 2 when any file failed

use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use tek_rules::{description_digest, Config, ProcessorRegistry, RulePipeline, ENGINE_VERSION};

#[derive(Parser)]
#[command(name = "tek-rules")]
#[command(about = "Generate makefile rules for derived files")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List processors in dispatch order
    Processors,

    /// Emit rules for the given files
    Rules {
        files: Vec<String>,

        /// Show real commands instead of progress labels
        #[arg(short, long)]
        verbose: bool,

        /// Fail on files no processor claims
        #[arg(long)]
        strict: bool,

        /// Print a JSON report instead of the makefile
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .without_time()
        .init();

    let cli = Cli::parse();

    let mut config = match Config::load_or_default(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("tek-rules: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Processors => {
            for name in ProcessorRegistry::boot().names() {
                println!("{}", name);
            }
            ExitCode::SUCCESS
        }

        Commands::Rules { files, verbose, strict, json } => {
            config.verbose |= verbose;
            config.strict |= strict;

            let pipeline = RulePipeline::new(ProcessorRegistry::boot(), config);
            let mut makefile = pipeline.makefile();
            let report = pipeline.generate_all(&files, &mut makefile);

            let written = if json {
                let digest = match description_digest(&makefile) {
                    Ok(d) => d,
                    Err(e) => {
                        eprintln!("tek-rules: {}", e);
                        return ExitCode::FAILURE;
                    }
                };
                let output = serde_json::json!({
                    "engine_version": ENGINE_VERSION,
                    "digest": digest,
                    "report": report,
                    "targets": makefile.targets(),
                });
                writeln!(io::stdout(), "{:#}", output)
            } else {
                makefile.write_to(&mut io::stdout().lock())
            };

            if let Err(e) = written {
                eprintln!("tek-rules: {}", e);
                return ExitCode::FAILURE;
            }

            if report.has_failures() {
                ExitCode::from(2)
            } else {
                ExitCode::SUCCESS
            }
        }
    }
}
