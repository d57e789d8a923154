//! offroot controller CLI - run helper programs inside an offline root

mod cli;
mod commands;
mod logging;
mod runner;

use clap::Parser;
use cli::{Cli, Commands};
use commands::check_requirements;
use console::style;
use runner::{run_program, verify_signature, RunConfig};

fn main() {
    let cli = Cli::parse();

    logging::init_logger(cli.verbose);

    match cli.command {
        Commands::Run {
            offline_root,
            privilege,
            program,
            args,
        } => {
            let run = RunConfig {
                config_file: cli.config,
                offline_root,
                privilege: privilege.map(Into::into),
                program,
                args,
            };
            match run_program(run) {
                Ok(code) => std::process::exit(code),
                Err(e) => {
                    eprintln!("{} {}", style("error:").red().bold(), e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Verify { file, sigfile } => {
            std::process::exit(verify_signature(&file, &sigfile));
        }
        Commands::Check => check_requirements(),
    }
}
