//! Engine glue: sessions and statement dispatch
//!
//! The engine owns one registry; a session owns the current-database
//! pointer. `Session::execute` is the single public operation: lex,
//! parse, then either dispatch a database-management statement straight
//! to the registry or run the plan/execute pipeline against the current
//! database.

use std::sync::Arc;

use tracing::error;

use crate::catalog::Registry;
use crate::config::EngineConfig;
use crate::database::Database;
use crate::error::{Error, Result};
use crate::query::{plan, Executor, QueryOutput};
use crate::sql::{parse_sql, Statement};

pub struct Engine {
    registry: Arc<Registry>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        Ok(Self {
            registry: Arc::new(Registry::new(config.base_dir)?),
        })
    }

    /// Convenience constructor over a base directory.
    pub fn open(base_dir: impl Into<std::path::PathBuf>) -> Result<Self> {
        Self::new(EngineConfig::new(base_dir))
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Start a session. Sessions are independent: each carries its own
    /// current-database pointer over the shared registry.
    pub fn session(&self) -> Session {
        Session {
            registry: Arc::clone(&self.registry),
            current: None,
        }
    }

    /// Persist every loaded database. Shutdown hook for embedders;
    /// failures are logged per database.
    pub fn save_all(&self) {
        self.registry.save_all();
    }
}

pub struct Session {
    registry: Arc<Registry>,
    current: Option<Arc<Database>>,
}

impl Session {
    /// Execute one SQL statement and return its result.
    ///
    /// Statement-level failures (syntax, unknown names, constraint
    /// violations) are expected and surface quietly; only engine-side
    /// failures log at error level.
    pub fn execute(&mut self, sql: &str) -> Result<QueryOutput> {
        let result = self.dispatch(sql);
        if let Err(e) = &result {
            if !e.is_user_error() {
                error!(error = %e, "statement failed");
            }
        }
        result
    }

    fn dispatch(&mut self, sql: &str) -> Result<QueryOutput> {
        let stmt = parse_sql(sql)?;

        match stmt {
            Statement::CreateDatabase(name) => {
                self.registry.create(&name)?;
                Ok(QueryOutput::message(format!("Database '{}' created", name)))
            }
            Statement::DropDatabase(name) => {
                // Dropping the current database clears the session
                // reference first.
                if self.current.as_ref().is_some_and(|db| db.name == name) {
                    self.current = None;
                }
                self.registry.remove(&name)?;
                Ok(QueryOutput::message(format!("Database '{}' dropped", name)))
            }
            Statement::AlterDatabaseRename { name, new_name } => {
                if self.current.as_ref().is_some_and(|db| db.name == name) {
                    self.current = None;
                }
                self.registry.rename(&name, &new_name)?;
                Ok(QueryOutput::message(format!(
                    "Database renamed from '{}' to '{}'",
                    name, new_name
                )))
            }
            Statement::UseDatabase(name) => {
                let db = self.registry.get(&name)?;
                self.current = Some(db);
                Ok(QueryOutput::message(format!(
                    "Switched to database '{}'",
                    name
                )))
            }
            other => {
                let db = self.current.as_ref().ok_or(Error::NoDatabaseSelected)?;
                let node = plan(&other, db)?;
                Executor::new(db).run(&node)
            }
        }
    }

    /// Name of the currently selected database, if any.
    pub fn current_database(&self) -> Option<&str> {
        self.current.as_deref().map(|db| db.name.as_str())
    }
}
