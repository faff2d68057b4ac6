//! MCP tool catalog and handlers.
//!
//! Handlers never fail the JSON-RPC call: validation errors and failed
//! outcomes come back as `isError: true` results the model can read.

pub mod args;
mod catalog;

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::admin::{HttpTransport, Outcome};
use crate::batch::BatchExecutor;
use crate::dispatch::{Command, Dispatcher};
use crate::error::rpc_codes;
use crate::protocol::{Tool, ToolsCallResult};
use crate::schema::{SchemaRegistry, ValidationError};
use crate::{Error, Result};

pub use catalog::{ToolAction, ToolSpec};

use args::{
    DeleteResourceArgs, GatewayRequestArgs, GetResourceArgs, ListPluginsArgs, PluginSchemaArgs,
};

/// Tool catalog bound to its transports
#[derive(Clone)]
pub struct Toolbox {
    dispatcher: Dispatcher,
    batch: BatchExecutor,
    catalog: Arc<Vec<ToolSpec>>,
}

impl Toolbox {
    /// Toolbox sending resource commands to `admin` and batches to `gateway`
    pub fn new(admin: Arc<dyn HttpTransport>, gateway: Arc<dyn HttpTransport>) -> Self {
        Self {
            dispatcher: Dispatcher::new(admin),
            batch: BatchExecutor::new(gateway),
            catalog: Arc::new(catalog::build(SchemaRegistry::global())),
        }
    }

    /// Cap the attempts one `send_request_to_gateway` call may expand to
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.batch = self.batch.with_max_attempts(max_attempts);
        self
    }

    /// Catalog entries in listing order
    #[must_use]
    pub fn specs(&self) -> &[ToolSpec] {
        &self.catalog
    }

    /// MCP tool definitions in listing order
    #[must_use]
    pub fn tools(&self) -> Vec<Tool> {
        self.catalog.iter().map(ToolSpec::to_tool).collect()
    }

    /// Look up a tool by name
    #[must_use]
    pub fn spec(&self, name: &str) -> Option<&ToolSpec> {
        self.catalog.iter().find(|t| t.name == name)
    }

    /// Run a tool.
    ///
    /// # Errors
    ///
    /// Only an unknown tool name is an error; everything else is reported
    /// inside the returned result.
    pub async fn call(&self, name: &str, arguments: Value) -> Result<ToolsCallResult> {
        let Some(spec) = self.spec(name) else {
            return Err(Error::json_rpc(
                rpc_codes::INVALID_PARAMS,
                format!("Unknown tool: {name}"),
            ));
        };
        debug!(tool = name, "Calling tool");

        let result = match spec.action {
            ToolAction::SendToGateway => self.send_to_gateway(arguments).await,
            action => match command_for(action, arguments) {
                Ok(command) => self
                    .dispatcher
                    .dispatch(&command)
                    .await
                    .map(|outcome| outcome_result(&outcome)),
                Err(e) => Err(e),
            },
        };

        Ok(result.unwrap_or_else(|e| validation_result(&e)))
    }

    async fn send_to_gateway(
        &self,
        arguments: Value,
    ) -> std::result::Result<ToolsCallResult, ValidationError> {
        let args: GatewayRequestArgs = args::parse(arguments)?;
        if args.requests.is_empty() {
            return Err(ValidationError::Arguments(
                "'requests' must contain at least one request".into(),
            ));
        }
        let report = self.batch.execute(&args.requests).await?;
        Ok(ToolsCallResult::text(to_pretty(&report)))
    }
}

/// Translate a tool call into a dispatcher command
fn command_for(action: ToolAction, arguments: Value) -> std::result::Result<Command, ValidationError> {
    match action {
        ToolAction::GetResource => args::parse::<GetResourceArgs>(arguments)?.into_command(),
        ToolAction::DeleteResource => args::parse::<DeleteResourceArgs>(arguments)?.into_command(),
        ToolAction::Upsert(kind) => Ok(Command::Upsert {
            kind,
            input: Value::Object(args::into_object(arguments)?),
        }),
        ToolAction::Patch(kind) => args::split_patch(kind, arguments),
        ToolAction::ListPlugins => {
            let args: ListPluginsArgs = args::parse(arguments)?;
            Ok(Command::ListPlugins {
                subsystem: args.subsystem,
            })
        }
        ToolAction::PluginSchema => {
            let args: PluginSchemaArgs = args::parse(arguments)?;
            Ok(Command::PluginSchema {
                name: args.name,
                subsystem: args.subsystem,
            })
        }
        ToolAction::SendToGateway => Err(ValidationError::Arguments(
            "send_request_to_gateway is not an Admin API command".into(),
        )),
    }
}

/// 2xx: the remote body as sent; anything else: the whole outcome, flagged as an error
fn outcome_result(outcome: &Outcome) -> ToolsCallResult {
    if outcome.is_success() {
        let text = serde_json::to_string(&outcome.data)
            .unwrap_or_else(|e| format!("{{\"error\":\"{e}\"}}"));
        ToolsCallResult::text(text)
    } else {
        ToolsCallResult::error(to_pretty(outcome))
    }
}

fn validation_result(error: &ValidationError) -> ToolsCallResult {
    debug!(error = %error, "Tool input rejected");
    ToolsCallResult::error(to_pretty(&error.to_json()))
}

fn to_pretty<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\":\"{e}\"}}"))
}
