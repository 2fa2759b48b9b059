//! Connection manager for client lifecycle and project switching.

use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{EngineError, Result};
use crate::odps::{Connector, OdpsClient};

/// An active client with the project it is bound to.
struct ActiveConnection {
    project: String,
    client: Arc<dyn OdpsClient>,
}

/// Lazily creates and holds one client per engine.
///
/// The held client is reused while callers ask for the same project and
/// replaced when they ask for a different one.
pub struct ConnectionManager {
    connector: Box<dyn Connector>,
    default_project: Option<String>,
    active: Option<ActiveConnection>,
}

impl ConnectionManager {
    /// Creates a manager with no active connection.
    pub fn new(connector: Box<dyn Connector>, default_project: Option<String>) -> Self {
        Self {
            connector,
            default_project,
            active: None,
        }
    }

    /// Resolves the project name: the argument, else the default project.
    pub fn resolve_project(&self, db_name: Option<&str>) -> Result<String> {
        db_name
            .or(self.default_project.as_deref())
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(String::from)
            .ok_or_else(|| EngineError::validation("db_name must not be empty"))
    }

    /// Returns the client for a project, connecting if needed.
    pub fn get(&mut self, db_name: Option<&str>) -> Result<Arc<dyn OdpsClient>> {
        let project = self.resolve_project(db_name)?;

        if let Some(active) = &self.active {
            if active.project == project {
                return Ok(Arc::clone(&active.client));
            }
            debug!("Switching project from {} to {}", active.project, project);
            self.release();
        }

        let client = self.connector.connect(&project)?;
        info!("Connected to ODPS project {}", project);

        self.active = Some(ActiveConnection {
            project,
            client: Arc::clone(&client),
        });
        Ok(client)
    }

    /// Drops the held client. A no-op when nothing is held.
    pub fn release(&mut self) {
        if let Some(active) = self.active.take() {
            debug!("Released connection to project {}", active.project);
        }
    }

    /// Check if there's an active connection.
    pub fn is_connected(&self) -> bool {
        self.active.is_some()
    }

    /// Project of the active connection, if any.
    pub fn current_project(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.project.as_str())
    }

    /// The project used when an operation names none.
    pub fn default_project(&self) -> Option<&str> {
        self.default_project.as_deref()
    }
}
