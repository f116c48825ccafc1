//! CLI argument parsing types.
//!
//! This module provides the command-line interface structure for the cimi binary.

use std::fs;

use clap::{ArgAction, Parser, Subcommand};

use crate::config::ClientConfig;
use crate::error::{CimiError, Result};
use crate::pagination::SearchParams;
use crate::value::{self, Value};

/// CIMI API command-line interface.
#[derive(Parser, Debug)]
#[command(name = "cimi", about = "CIMI API CLI", version)]
pub struct Cli {
    /// Server root or cloud entry point URL.
    #[arg(long, global = true, env = "CIMI_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Output results as JSON instead of formatted text.
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Log in as this user before running the command.
    #[arg(long, global = true, env = "CIMI_USERNAME", requires = "password")]
    pub username: Option<String>,

    /// Password for `--username`.
    #[arg(long, global = true, env = "CIMI_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Accept invalid TLS certificates.
    #[arg(long, global = true, default_value = "false")]
    pub insecure: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the cloud entry point and its collections.
    Cep,

    /// Get a single resource by id or URL.
    Get {
        /// Resource id (e.g. `credential/123`) or absolute URL.
        reference: String,
    },

    /// Search a collection.
    Search {
        /// Collection name (e.g. `credentials`) or href (e.g. `credential`).
        resource_type: String,

        /// CIMI filter expression.
        #[arg(long)]
        filter: Option<String>,

        /// First position of the window (1-indexed).
        #[arg(long)]
        first: Option<u64>,

        /// Last position of the window (inclusive).
        #[arg(long)]
        last: Option<u64>,

        /// Ordering, e.g. `created:desc`.
        #[arg(long)]
        orderby: Option<String>,

        /// Comma-separated attributes to return.
        #[arg(long)]
        select: Option<String>,

        /// Fetch every matching resource, page by page.
        #[arg(long, conflicts_with_all = ["first", "last"])]
        all: bool,
    },

    /// Create a resource in a collection.
    Add {
        /// Collection name or href.
        resource_type: String,

        /// JSON document, or `@path` to read it from a file.
        #[arg(long)]
        data: String,
    },

    /// Update a resource.
    Edit {
        /// Resource id or absolute URL.
        reference: String,

        /// JSON document, or `@path` to read it from a file.
        #[arg(long)]
        data: String,
    },

    /// Delete a resource.
    Delete {
        /// Resource id or absolute URL.
        reference: String,
    },
}

impl Cli {
    /// Client configuration from the `CIMI_*` environment, with
    /// `--endpoint` and `--insecure` taking precedence.
    ///
    /// # Errors
    ///
    /// Returns an error if an environment setting is invalid.
    pub fn client_config(&self) -> Result<ClientConfig> {
        let mut config = ClientConfig::from_env()?;
        if let Some(endpoint) = &self.endpoint {
            config.endpoint.clone_from(endpoint);
        }
        if self.insecure {
            config.insecure = true;
        }
        Ok(config)
    }
}

impl Command {
    /// Search parameters given on the command line, if this is a search.
    #[must_use]
    pub fn search_params(&self) -> Option<SearchParams> {
        match self {
            Self::Search {
                filter,
                first,
                last,
                orderby,
                select,
                ..
            } => Some(SearchParams {
                filter: filter.clone(),
                first: *first,
                last: *last,
                orderby: orderby.clone(),
                select: select.clone(),
                ..SearchParams::default()
            }),
            _ => None,
        }
    }
}

/// Read a `--data` argument: inline JSON, or `@path` for a file.
///
/// # Errors
///
/// Returns [`CimiError::ConfigMissing`] if the file cannot be read and
/// [`CimiError::MalformedDocument`] if the text is not JSON.
pub fn load_data(arg: &str) -> Result<Value> {
    let text = match arg.strip_prefix('@') {
        Some(path) => fs::read_to_string(path)
            .map_err(|e| CimiError::ConfigMissing(format!("cannot read '{path}': {e}")))?,
        None => arg.to_string(),
    };
    value::decode(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_inline_data() {
        let data = load_data(r#"{"name":"key"}"#).unwrap();
        assert_eq!(data.get_str("name"), Some("key"));
    }

    #[test]
    fn test_load_data_from_missing_file() {
        let err = load_data("@/nonexistent/cimi-data.json").unwrap_err();
        assert!(matches!(err, CimiError::ConfigMissing(_)));
    }

    #[test]
    fn test_load_malformed_data() {
        let err = load_data("{name").unwrap_err();
        assert!(matches!(err, CimiError::MalformedDocument { .. }));
    }
}
