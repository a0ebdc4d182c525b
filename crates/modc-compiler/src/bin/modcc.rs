//! modc compiler CLI.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use modc_compiler::{CompileOptions, Compiler};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "modcc")]
#[command(about = "modc compiler - resolves module imports and generates plain C sources and headers")]
#[command(version)]
struct Args {
    /// Input module source file (<file>.module.c)
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Regenerate headers even when they look up to date
    #[arg(short, long)]
    force: bool,

    /// Never regenerate an existing header
    #[arg(short, long, conflicts_with = "force")]
    silent: bool,

    /// Emit a build metadata fragment next to the generated source
    #[arg(short, long)]
    makefile: bool,

    /// Print the resolved imports and exports of the entry module
    #[arg(long)]
    dump: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let options = CompileOptions::new(&args.input)
        .force(args.force)
        .silent(args.silent)
        .metadata(args.makefile);

    let output = Compiler::new(options)
        .compile()
        .with_context(|| format!("failed to compile {}", args.input.display()))?;

    if args.dump {
        print!("{}", output.package.borrow().describe());
    }

    if args.verbose {
        eprintln!("Compiled {} modules", output.modules);
        eprintln!("  Source: {}", output.generated.display());
        eprintln!("  Header: {}", output.header.display());
        if let Some(metadata) = &output.metadata {
            eprintln!("  Metadata: {}", metadata.display());
        }
    }

    Ok(())
}
