//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Mindmap - manage your mind map documents from the terminal
#[derive(Parser, Debug)]
#[command(name = "mindmap")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the config file (defaults to ~/.mindmap/config.toml)
    #[arg(long, global = true, env = "MINDMAP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in with email and password, or through the OAuth provider
    Login(LoginArgs),

    /// Sign out and forget the stored token
    Logout,

    /// Show who is signed in
    Status,

    /// List mind maps
    List {
        /// Only show mind maps whose name contains this (case-insensitive)
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// Create a new mind map
    Create {
        /// Name of the new mind map
        #[arg(trailing_var_arg = true, required = true)]
        name: Vec<String>,
    },

    /// Rename a mind map
    Rename {
        /// Mind map ID
        id: String,

        /// New name
        #[arg(trailing_var_arg = true, required = true)]
        name: Vec<String>,
    },

    /// Delete a mind map
    Delete {
        /// Mind map ID
        id: String,
    },

    /// Save a mind map
    Save {
        /// Mind map ID
        id: String,
    },

    /// Print a share link for a mind map
    Share {
        /// Mind map ID
        id: String,
    },
}

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Account email
    #[arg(short, long, requires = "password")]
    pub email: Option<String>,

    /// Account password
    #[arg(short, long, env = "MINDMAP_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Open the browser and sign in through the OAuth provider
    #[arg(long, conflicts_with_all = ["email", "code"])]
    pub oauth: bool,

    /// Exchange an authorization code obtained elsewhere
    #[arg(long, conflicts_with = "email")]
    pub code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_rename_joins_name() {
        let cli = Cli::parse_from(["mindmap", "rename", "5", "New", "plan"]);
        match cli.command {
            Commands::Rename { id, name } => {
                assert_eq!(id, "5");
                assert_eq!(name.join(" "), "New plan");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_login_modes_are_exclusive() {
        assert!(Cli::try_parse_from(["mindmap", "login", "--oauth", "--code", "x"]).is_err());
        assert!(Cli::try_parse_from(["mindmap", "login", "-e", "a@b.co"]).is_err());
        let cli = Cli::try_parse_from(["mindmap", "login", "-e", "a@b.co", "-p", "secret1"]).unwrap();
        match cli.command {
            Commands::Login(args) => {
                assert_eq!(args.email.as_deref(), Some("a@b.co"));
                assert!(!args.oauth);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
