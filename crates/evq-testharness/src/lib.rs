//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Test harness fixtures, fakes and mock backend."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Test doubles for the dashboard: an in-memory simulation backend, surfaces
//! that record what the controller draws, and an HTTP server that exposes the
//! fake backend through the real wire format.

pub mod backend;
pub mod fixtures;
pub mod server;
pub mod surfaces;

pub use backend::{Endpoint, FakeBackend, World};
pub use server::{spawn_mock_server, MockServerBuilder, MockServerHandle};
pub use surfaces::{Recorded, RecordedChart, RecordedMarker, Recorder, RecordingSurface, Slot};
