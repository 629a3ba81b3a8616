//! cpr_dashboard-lib: CPR telemetry stream client, packet validation, and dashboard rendering

pub mod advisory;
pub mod buffer;
pub mod config;
pub mod connection;
pub mod dashboard;
pub mod indicators;
pub mod message;
pub mod surface;

// runtime plumbing:
pub mod client;
pub mod context;

// re-exports for ergonomic imports:
pub use client::DashboardClient;
pub use config::{ClientConfig, ConfigError, DisplaySettings, Endpoint};
pub use connection::{ConnectionState, Reconnector, RetryPolicy};
pub use context::Context;
pub use dashboard::{Dashboard, FrameOutcome};
pub use message::{PacketError, TelemetryPacket};
pub use surface::{DisplaySurface, UiEvent};
