//! Primary/fallback execution for operations that have an alternate strategy.
//!
//! Each operation runs its primary strategy; if that fails it runs the
//! fallback once; if the fallback fails too, both errors are returned.

use crate::error::CoreError;
use std::fmt;

/// Which strategy produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Primary,
    Fallback,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Primary => f.write_str("primary"),
            Strategy::Fallback => f.write_str("fallback"),
        }
    }
}

/// Both strategies of an operation failed.
#[derive(Debug)]
pub struct FallbackError {
    pub primary: CoreError,
    pub fallback: CoreError,
}

impl fmt::Display for FallbackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "primary: {}; fallback: {}", self.primary, self.fallback)
    }
}

/// Runs `primary`, then `fallback` if it fails.
///
/// `operation` names the operation in log lines.
pub fn with_fallback<T>(
    operation: &str,
    primary: impl FnOnce() -> Result<T, CoreError>,
    fallback: impl FnOnce() -> Result<T, CoreError>,
) -> Result<(T, Strategy), FallbackError> {
    let primary_err = match primary() {
        Ok(value) => return Ok((value, Strategy::Primary)),
        Err(e) => e,
    };
    log::warn!("{operation} failed, retrying with fallback strategy: {primary_err}");

    match fallback() {
        Ok(value) => {
            log::info!("{operation} succeeded with fallback strategy");
            Ok((value, Strategy::Fallback))
        }
        Err(fallback_err) => {
            log::error!("{operation} fallback also failed: {fallback_err}");
            Err(FallbackError {
                primary: primary_err,
                fallback: fallback_err,
            })
        }
    }
}
