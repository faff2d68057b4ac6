//! Command dispatcher
//!
//! Turns a [`Command`] into one Admin API request and normalizes whatever
//! comes back. Validation errors stop the command before the network is
//! touched; transport failures never escape as errors.

mod plan;

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::admin::{HttpTransport, Outcome, normalize};
use crate::schema::ValidationError;

pub use plan::{
    Command, DEFAULT_PAGE, DEFAULT_PAGE_SIZE, ListQuery, MAX_PAGE_SIZE, MIN_PAGE_SIZE,
};

/// Executes commands against the Admin API
#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn HttpTransport>,
}

impl Dispatcher {
    /// Dispatcher over `transport` (normally an admin-mode `HttpClient`)
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    /// Validate, plan and execute `command`.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the command is rejected locally; no
    /// request is sent in that case. Every remote result, including
    /// timeouts and connection failures, is an `Ok(Outcome)`.
    pub async fn dispatch(&self, command: &Command) -> Result<Outcome, ValidationError> {
        let plan = command.plan().inspect_err(|e| {
            debug!(action = command.action(), error = %e, "Command rejected");
        })?;

        let method = plan.method.clone();
        let target = plan.path_and_query();
        let start = Instant::now();
        let outcome = normalize(self.transport.send(plan).await);

        let kind = command.kind().map_or("-", |k| k.as_str());
        let elapsed_ms = start.elapsed().as_millis();
        if outcome.is_failure() {
            warn!(
                action = command.action(),
                kind,
                %method,
                target = %target,
                status = outcome.status,
                elapsed_ms,
                "Admin API request failed"
            );
        } else {
            info!(
                action = command.action(),
                kind,
                %method,
                target = %target,
                status = outcome.status,
                elapsed_ms,
                "Admin API request completed"
            );
        }
        Ok(outcome)
    }
}
