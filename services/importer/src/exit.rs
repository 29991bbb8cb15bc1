//! Startup failures and the process exit codes they map to.

use std::path::PathBuf;
use std::process::ExitCode;

use thiserror::Error;

pub const GENERIC_FAILURE: u8 = 1;
pub const DATABASE_INIT_FAILED: u8 = 2;
pub const DATABASE_UNREACHABLE: u8 = 3;
pub const DATA_FOLDER_UNUSABLE: u8 = 32;

#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Data folder '{path}' {reason}")]
    DataFolder { path: PathBuf, reason: String },

    #[error("Database not reachable after {attempts} attempts")]
    DatabaseUnreachable { attempts: u8 },

    #[error("Database initialisation failed: {0}")]
    DatabaseInit(String),
}

impl StartupError {
    pub fn code(&self) -> u8 {
        match self {
            StartupError::DataFolder { .. } => DATA_FOLDER_UNUSABLE,
            StartupError::DatabaseUnreachable { .. } => DATABASE_UNREACHABLE,
            StartupError::DatabaseInit(_) => DATABASE_INIT_FAILED,
        }
    }
}

/// Exit code for an error returned from `run`.
pub fn exit_code(err: &anyhow::Error) -> ExitCode {
    let code = err
        .downcast_ref::<StartupError>()
        .map(StartupError::code)
        .unwrap_or(GENERIC_FAILURE);
    ExitCode::from(code)
}
