//! Command-line interface for userhub.

pub mod commands;

use clap::{Parser, Subcommand};

use crate::domain::UserRole;

/// userhub - accounts, sessions and profiles over a JSON API
#[derive(Debug, Parser)]
#[command(name = "userhub")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
pub enum Commands {
    /// Start the HTTP server and the token cleanup scheduler (default)
    #[command(alias = "daemon")]
    Serve,

    /// Create a default config.toml in the working directory
    Init,

    /// Delete expired refresh tokens once
    PruneTokens,

    /// Change a user's role
    Promote {
        /// Email of the account
        email: String,

        /// One of: user, moderator, admin
        role: UserRole,
    },
}

impl Cli {
    /// The subcommand to run, `serve` when none was given.
    #[must_use]
    pub fn command(self) -> Commands {
        self.command.unwrap_or(Commands::Serve)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_serve() {
        let cli = Cli::try_parse_from(["userhub"]).unwrap();
        assert_eq!(cli.command(), Commands::Serve);

        let cli = Cli::try_parse_from(["userhub", "daemon"]).unwrap();
        assert_eq!(cli.command(), Commands::Serve);
    }

    #[test]
    fn parses_promote() {
        let cli = Cli::try_parse_from(["userhub", "promote", "boss@example.com", "moderator"]).unwrap();
        assert_eq!(
            cli.command(),
            Commands::Promote {
                email: "boss@example.com".to_string(),
                role: UserRole::Moderator,
            }
        );

        assert!(Cli::try_parse_from(["userhub", "promote", "boss@example.com", "root"]).is_err());
    }

    #[test]
    fn parses_prune_tokens() {
        let cli = Cli::try_parse_from(["userhub", "prune-tokens"]).unwrap();
        assert_eq!(cli.command(), Commands::PruneTokens);
    }
}
