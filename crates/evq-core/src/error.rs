//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Dashboard synchronisation and rendering core."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use evq_client::ClientError;
use thiserror::Error;

use crate::surface::SurfaceError;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Surface(#[from] SurfaceError),
    #[error("speed {requested} outside 1..={max}")]
    InvalidSpeed { requested: u32, max: u32 },
    /// The command cannot apply in the current session state.
    #[error("{command} ignored: {reason}")]
    CommandIgnored {
        command: &'static str,
        reason: &'static str,
    },
}
