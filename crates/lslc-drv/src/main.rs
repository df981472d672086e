//! Command line interface.

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser as ClapParser;
use lslc_util::Options;
use tracing_subscriber::EnvFilter;

/// Optimizing LSL-to-LSL compiler.
#[derive(ClapParser, Debug)]
#[command(name = "lslc", version, about)]
struct Cli {
    /// Input file, or - for stdin.
    input: PathBuf,

    /// Output file (stdout when omitted).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Comma-separated option spec applied on top of the defaults,
    /// e.g. "+lazylists,-dcr,emap". Bare names enable.
    #[arg(
        short = 'O',
        long = "options",
        value_name = "SPEC",
        allow_hyphen_values = true
    )]
    optspec: Vec<String>,

    /// Start from the empty option set instead of the defaults.
    #[arg(long)]
    bare: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let (source, filename) = if cli.input.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading stdin")?;
        (buf, "<stdin>".to_string())
    } else {
        let text = std::fs::read_to_string(&cli.input)
            .with_context(|| format!("reading {}", cli.input.display()))?;
        (text, cli.input.display().to_string())
    };

    let mut opts = if cli.bare {
        Options::default()
    } else {
        Options::defaults()
    };
    for spec in &cli.optspec {
        opts.apply_spec(spec);
    }

    let result = lslc_drv::compile(&source, opts, &filename)
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    match &cli.output {
        Some(path) => std::fs::write(path, result.output)
            .with_context(|| format!("writing {}", path.display()))?,
        None => print!("{}", result.output),
    }
    Ok(())
}
