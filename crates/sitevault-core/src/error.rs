//! Error types for SiteVault
//!
//! This module defines the error types used throughout the SiteVault system.
//! All errors are designed to provide clear context about what went wrong
//! during a backup run and how to fix it.

use std::{io, path::PathBuf};
use thiserror::Error;

/// SiteVault error types
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error during archive, dump or deletion
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Table enumeration or row read failure
    #[error("Query error: {0}")]
    Query(String),

    /// Trigger registration/deregistration failure
    #[error("Scheduling error: {0}")]
    Scheduling(String),

    /// Configuration error
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Compression error
    #[error("Compression failed: {0}")]
    Compression(String),

    /// Invalid backup path
    #[error("Invalid backup path: {0}")]
    InvalidPath(PathBuf),

    /// Another pipeline run already holds the storage-directory lock
    #[error("Backup already in progress for {0}")]
    Busy(PathBuf),

    /// Run report serialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new query error
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Create a new scheduling error
    pub fn scheduling(msg: impl Into<String>) -> Self {
        Self::Scheduling(msg.into())
    }

    /// Create a new compression error
    pub fn compression(msg: impl Into<String>) -> Self {
        Self::Compression(msg.into())
    }
}

/// Result type for SiteVault operations
pub type Result<T> = std::result::Result<T, Error>;
