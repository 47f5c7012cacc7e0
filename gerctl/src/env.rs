//! `.env` support for the `GERCTL_*` settings.

use std::path::PathBuf;

use tracing::{debug, warn};

/// Fills unset `GERCTL_*` (and `GERCTL_LOG`) variables from the nearest
/// `.env`, searching from the working directory upwards. Variables already
/// set in the process take precedence over the file.
///
/// Runs before logging is set up, so the outcome is handed to [`report`].
pub(crate) fn load_settings() -> dotenvy::Result<PathBuf> {
    dotenvy::dotenv()
}

pub(crate) fn report(loaded: &dotenvy::Result<PathBuf>) {
    match loaded {
        Ok(path) => debug!("node settings read from {}", path.display()),
        Err(e) if e.not_found() => (),
        Err(e) => {
            warn!("ignoring `.env`, node settings come from flags and the environment: {e}")
        }
    }
}
