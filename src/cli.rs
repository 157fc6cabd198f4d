use clap::{Parser, Subcommand};

use crate::commands::run;

#[derive(Parser)]
#[command(name = "xbatch")]
#[command(about = "Drive account groups through bulk actions against an action server")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one action across an account group
    Run(run::Args),

    /// List supported actions and their endpoints
    Actions,
}
