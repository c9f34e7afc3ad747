//! Authorization for speech recognition and microphone capture
//!
//! The gate is queried synchronously for the current status and asked
//! asynchronously to prompt the user. Platform gates live outside this crate;
//! `StaticPermissionGate` covers headless deployments and tests.

mod gate;
mod static_gate;

pub use gate::{Capability, PermissionGate, PermissionStatus};
pub use static_gate::{PermissionsConfig, StaticPermissionGate};
