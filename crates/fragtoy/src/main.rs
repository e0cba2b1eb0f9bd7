mod cli;
mod config;
mod paths;
mod run;

use anyhow::Result;
use cli::Command;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Some(Command::Where) => run::print_where(cli.run),
        None => run::run(cli.run),
    }
}
