use clap::Parser;
use genmethods_core::ast::Package;
use genmethods_core::config;
use genmethods_core::config::Config;
use genmethods_core::emit;
use genmethods_core::ErrorSource;
use log::LevelFilter;
use std::path::Path;
use std::path::PathBuf;

/// Generates methods for Go functions whose first parameter is a handle type.
#[derive(Parser, Debug)]
#[command(name = "genmethods", version)]
struct Args {
    /// Import path or directory of the Go package. Overrides the config.
    #[arg(long)]
    pkg: Option<String>,

    /// File to write the generated code to, instead of standard output.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Config file. Defaults to `Genmethods.toml` if it exists.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log every function being considered.
    #[arg(short, long)]
    verbose: bool,
}

pub fn main() {
    let args = Args::parse();
    init_logger(args.verbose);
    if let Err(err) = run(args) {
        handle_error(err);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => Config::read(path)?,
        None => Config::read_or_default(Path::new(config::FILENAME))?,
    };
    let path = args.pkg.as_deref().unwrap_or(&config.package);
    let package = Package::load(path)?;
    log::info!(
        "Generating methods for package `{}` at `{}`",
        package.import_path,
        package.dir.display()
    );

    let code = genmethods_core::genmethods(&package, &config)?;
    match &args.output {
        Some(output) => emit::persist(output, &code)?,
        None => print!("{}", code),
    }
    Ok(())
}

fn init_logger(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn handle_error(err_root: anyhow::Error) -> ! {
    if let Some(err) = err_root.downcast_ref::<genmethods_core::Error>() {
        if let ErrorSource::Parse { line, column } = &err.source {
            eprintln!(
                "Syntax error in `{}` at line {} column {}",
                err.file.display(),
                line,
                column
            );
        }
    }
    eprintln!("Error: {:?}", err_root);
    std::process::exit(1);
}
