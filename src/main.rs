mod cli;
mod commands;
mod config;
mod controller;
mod counters;
mod dnd;
mod logging;
mod modal;
mod model;
mod responsive;
mod schedule;
mod search;
mod ui;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let command = args.command.unwrap_or(cli::Command::Tui);
    match command {
        cli::Command::Tui => commands::tui(args.config, args.log_level),
        cli::Command::Config { init } => commands::config(args.config, init),
    }
}
