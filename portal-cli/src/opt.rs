use clap::{Parser, Subcommand};
use clio::Input;
use portal::Role;

#[derive(Debug, Parser)]
#[command(name = "portal", about = "Job portal session client")]
pub struct Opt {
    /// Config file path
    #[arg(short, long, value_parser, default_value = "portal.toml")]
    pub config: Input,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Logs in with email and password
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Creates a new account
    Register {
        #[arg(long)]
        user_name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// One of EMPLOYER, JOBSEEKER, TRAINER, GUEST
        #[arg(long)]
        role: Role,
    },
    /// Lists the roles a user may pick
    Roles,
    /// Picks the role of the logged in user
    ChooseRole {
        /// One of EMPLOYER, JOBSEEKER, TRAINER, GUEST
        role: Role,
    },
    /// Ends the session
    Logout,
    /// Opens a portal path, following redirects
    Open { path: String },
    /// Shows the current session
    Status,
}
