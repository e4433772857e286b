pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "sasha",
    about = "Sasha operator CLI",
    long_about = "Inspect Sasha configuration, check readiness, and exercise the command table offline.",
    after_help = "Examples:\n  sasha doctor --json\n  sasha commands\n  sasha dispatch \"s! speak\""
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, Slack token shapes, and command table assembly")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "List the command table in match order")]
    Commands,
    #[command(about = "Route one message through the command table without touching Slack")]
    Dispatch {
        #[arg(help = "Message text, including the trigger word")]
        text: String,
        #[arg(long, default_value = "U0000000000", help = "Slack user id of the sender")]
        user: String,
        #[arg(long, default_value = "C0000000000", help = "Slack channel id of the message")]
        channel: String,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => commands::CommandResult::text(commands::config::run()),
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Commands => commands::table::run(),
        Command::Dispatch { text, user, channel } => {
            commands::dispatch::run(&text, &user, &channel)
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
