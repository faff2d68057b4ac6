//! Command-line interface

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// MCP server exposing the Apache APISIX Admin API as tools
#[derive(Parser, Debug)]
#[command(name = "apisix-mcp")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long, env = "APISIX_MCP_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        long,
        default_value = "info",
        env = "APISIX_MCP_LOG_LEVEL",
        global = true
    )]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "APISIX_MCP_LOG_FORMAT", global = true)]
    pub log_format: Option<String>,

    /// Admin API base URL, e.g. `http://127.0.0.1:9180/apisix/admin`
    #[arg(long, global = true)]
    pub admin_url: Option<String>,

    /// Admin API key (`env:VAR` reads it from the environment)
    #[arg(long, global = true)]
    pub admin_key: Option<String>,

    /// Data-plane gateway base URL used by `send_request_to_gateway`
    #[arg(long, global = true)]
    pub gateway_url: Option<String>,

    /// Subcommand (optional - defaults to serving over stdio)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Serve MCP over stdin/stdout (default)
    Serve,

    /// Print the tool catalog and exit
    Tools {
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
}

/// Catalog output format
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    Json,
    /// YAML
    Yaml,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_serve_mode() {
        let cli = Cli::try_parse_from(["apisix-mcp"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "apisix-mcp",
            "tools",
            "--admin-url",
            "http://a:1/apisix/admin",
            "--log-format",
            "json",
        ])
        .unwrap();
        assert_eq!(
            cli.command,
            Some(Command::Tools {
                format: OutputFormat::Json
            })
        );
        assert_eq!(cli.admin_url.as_deref(), Some("http://a:1/apisix/admin"));
        assert_eq!(cli.log_format.as_deref(), Some("json"));
    }

    #[test]
    fn tools_yaml_format() {
        let cli = Cli::try_parse_from(["apisix-mcp", "tools", "--format", "yaml"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Command::Tools {
                format: OutputFormat::Yaml
            })
        );
    }
}
