mod bulk;
mod cli;
mod error;
mod fmt;
mod importer;
mod models;
#[cfg(feature = "pdf")]
mod pdf;
mod settings;
mod statement;
mod window;

use clap::{CommandFactory, Parser};

use cli::{Cli, Commands, ConfigCommands};

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Accounts { file } => cli::accounts::list(&file),
        Commands::Report {
            file,
            account,
            month,
        } => cli::report::run(&file, &account, month.as_deref()),
        #[cfg(feature = "pdf")]
        Commands::Export {
            file,
            account,
            month,
            output,
        } => cli::export::single(&file, &account, month.as_deref(), output),
        #[cfg(feature = "pdf")]
        Commands::Bulk {
            file,
            accounts,
            from,
            to,
            output,
        } => cli::export::bulk(&file, accounts, &from, &to, output),
        Commands::Config { command } => match command {
            ConfigCommands::Show => cli::config::show(),
            ConfigCommands::Set {
                export_dir,
                utility_name,
                info_url,
                phone,
                email,
            } => cli::config::set(export_dir, utility_name, info_url, phone, email),
            ConfigCommands::Rate { year, rate } => cli::config::rate(year, rate),
        },
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "netmeter", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
