// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! sleeppod: async client for the 8slp smart-mattress cloud API.
//!
//! One [`PodClient`] per account session. The client authenticates with a
//! password grant, discovers the device and its occupants, and exposes typed
//! accessors over per-user biometric telemetry plus actuation (thermal
//! level, bed-base articulation, alarms, away mode, speaker). Bed presence
//! is derived from heating-level telemetry; the platform has no direct
//! presence sensor.
//!
//! The client performs no scheduling of its own. A host-side poller is
//! expected to call the refresh methods on its own cadence:
//!
//! ```no_run
//! use sleeppod::{Config, PodClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::new("sleeper@example.com", "secret", "America/Los_Angeles")?;
//!     let client = PodClient::new(config)?;
//!     client.start().await?;
//!
//!     client.refresh_device_telemetry().await?;
//!     client.refresh_users().await?;
//!
//!     for user in client.users() {
//!         println!(
//!             "{}: side={} present={} score={:?}",
//!             user.user_id(),
//!             user.side().as_str(),
//!             user.bed_presence(),
//!             user.current_sleep_score(),
//!         );
//!     }
//!     Ok(())
//! }
//! ```

mod auth;
mod http;

pub mod client;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod occupant;
pub mod presence;
pub mod time_utils;
pub mod units;

pub use client::{DeviceFeatures, PodClient};
pub use config::{Config, ConfigError};
pub use error::{PodError, Result};
pub use metrics::{Metric, MetricValue};
pub use models::routine::OneOffAlarm;
pub use models::temperature::SmartStage;
pub use occupant::{
    AwayAction, FitnessSummary, HeatingStats, HeatingValues, Occupant, SessionSummary, Side,
    SleepBreakdown,
};
pub use presence::{PresenceEstimator, PresenceSample};
pub use units::{level_to_temp, temp_to_level, TemperatureUnit};
