mod cli;

use std::process;

use anyhow::{Context, Result};
use clap::{error::ErrorKind, Parser};
use git_height::HeightResolver;
use git_repository::Repository;
use tracing::debug;

use cli::Cli;

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => process::exit(0),
                _ => process::exit(128),
            }
        }
    };

    init_logging(&cli);

    if let Some(dir) = &cli.change_dir {
        if let Err(e) = std::env::set_current_dir(dir) {
            eprintln!("fatal: cannot change to '{}': {}", dir.display(), e);
            process::exit(128);
        }
    }

    if let Err(e) = run(&cli) {
        eprintln!("fatal: {e:#}");
        process::exit(128);
    }
}

fn init_logging(cli: &Cli) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(cli.log_level())
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let repo = Repository::discover_with_options(".", cli.odb_options())
        .context("cannot open repository")?;
    debug!(git_dir = %repo.git_dir().display(), "opened repository");

    let mut resolver = HeightResolver::new(&repo, cli.resolver_options())?;
    let resolution = resolver.resolve()?;

    if cli.height_only {
        println!("{}", resolution.height);
    } else {
        println!("{}", resolution.formatted);
    }
    Ok(())
}
