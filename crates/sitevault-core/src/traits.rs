//! Core traits for SiteVault
//!
//! This module defines the seams between the backup engine and its
//! collaborators: the hosting process that activates/deactivates the
//! engine and fires its trigger, and the database the dumper reads from.

use async_trait::async_trait;

use crate::{
    types::{RunReport, SqlValue, TableDef},
    Result,
};

/// Interface the hosting process calls into.
///
/// Replaces the original ambient hook registration with an explicit
/// capability set: the host owns the lifecycle and the engine owns the
/// behavior behind each call.
#[async_trait]
pub trait HostHooks {
    /// Called once when the host activates the engine; registers the
    /// daily trigger. Idempotent.
    async fn on_activate(&self) -> Result<()>;

    /// Called when the host deactivates the engine; removes the trigger
    /// registration if present.
    async fn on_deactivate(&self) -> Result<()>;

    /// Called by the host's scheduling facility when the trigger fires;
    /// runs one full backup pipeline pass.
    async fn on_trigger(&self) -> Result<RunReport>;

    /// Render a plain-text status listing of existing backup artifacts
    /// for the host's presentation surface.
    fn render_status(&self) -> Result<String>;
}

/// Generic tabular-database capability consumed by the dumper.
///
/// An implementation provides table enumeration, the engine-reported
/// creation statement, and typed row data. The dumper never sees the
/// underlying driver.
pub trait TableSource {
    /// All tables visible to the connection, in enumeration order,
    /// each with its creation statement.
    fn tables(&self) -> Result<Vec<TableDef>>;

    /// Every row of `table`, one `SqlValue` per column.
    fn rows(&self, table: &str) -> Result<Vec<Vec<SqlValue>>>;
}
