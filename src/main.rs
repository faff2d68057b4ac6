//! APISIX MCP - Apache APISIX Admin API over the Model Context Protocol

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use apisix_mcp::{
    admin::HttpClient,
    cli::{Cli, Command, OutputFormat},
    config::Config,
    server::Server,
    setup_tracing,
    tools::Toolbox,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = setup_tracing(&cli.log_level, cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config.with_overrides(
            cli.admin_url.clone(),
            cli.admin_key.clone(),
            cli.gateway_url.clone(),
        ),
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    let toolbox = match build_toolbox(&config) {
        Ok(toolbox) => toolbox,
        Err(e) => {
            error!(error = %e, "Failed to create HTTP clients");
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Some(Command::Tools { format }) => print_tools(&toolbox, format),
        Some(Command::Serve) | None => run_server(toolbox, &config).await,
    }
}

fn build_toolbox(config: &Config) -> apisix_mcp::Result<Toolbox> {
    let admin = HttpClient::admin(&config.admin)?;
    let gateway = HttpClient::gateway(&config.gateway, &config.admin)?;
    Ok(Toolbox::new(Arc::new(admin), Arc::new(gateway))
        .with_max_attempts(config.gateway.max_attempts))
}

fn print_tools(toolbox: &Toolbox, format: OutputFormat) -> ExitCode {
    let tools = toolbox.tools();
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&tools).map_err(|e| e.to_string()),
        // Through JSON text: arbitrary-precision numbers only serialize natively to JSON
        OutputFormat::Yaml => serde_json::to_string(&tools)
            .map_err(|e| e.to_string())
            .and_then(|json| {
                serde_yaml::from_str::<serde_yaml::Value>(&json).map_err(|e| e.to_string())
            })
            .and_then(|yaml| serde_yaml::to_string(&yaml).map_err(|e| e.to_string())),
    };
    match rendered {
        Ok(text) => {
            println!("{text}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Failed to serialize tools: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run_server(toolbox: Toolbox, config: &Config) -> ExitCode {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        admin = %config.admin.base_url(),
        gateway = %config.gateway.base_url(&config.admin),
        "Starting APISIX MCP server"
    );

    match Server::new(toolbox).serve_stdio().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Server error");
            ExitCode::FAILURE
        }
    }
}
