// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Top-level client: one logical session per account.
//!
//! `PodClient` owns the device shadow (feature flags plus a bounded ring of
//! telemetry snapshots) and the occupant map. Occupants reach the gateway and
//! the device shadow through the shared [`Core`], whose lifetime the client
//! controls. There are no exit hooks; the session ends when the caller stops
//! polling and drops the client.

use std::collections::VecDeque;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::DateTime;
use chrono_tz::Tz;
use dashmap::DashMap;
use validator::Validate;

use crate::config::Config;
use crate::error::{PodError, Result};
use crate::http::ApiGateway;
use crate::models::device::{DeviceResponse, DeviceSnapshot, SideKey, SideTelemetry};
use crate::models::discovery::{DeviceAssignmentResponse, MeResponse, UserResponse};
use crate::occupant::{Occupant, Side};
use crate::time_utils;

/// Depth of the telemetry ring; presence estimation reads up to this many
/// past samples.
const TELEMETRY_HISTORY: usize = 10;

/// Capability flags derived from the account summary's feature tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeviceFeatures {
    /// The device can cool as well as heat.
    pub cooling: bool,
    /// An articulating base is attached.
    pub base: bool,
    /// The base has a speaker.
    pub speaker: bool,
}

/// Mutable device-side state shared between the client and its occupants.
#[derive(Default)]
pub(crate) struct DeviceShadow {
    device_ids: Vec<String>,
    features: DeviceFeatures,
    /// Telemetry snapshots, newest first, bounded by [`TELEMETRY_HISTORY`].
    telemetry: VecDeque<DeviceSnapshot>,
}

/// Shared session state: configuration, gateway and the device shadow.
pub(crate) struct Core {
    pub(crate) config: Config,
    pub(crate) gateway: ApiGateway,
    device: RwLock<DeviceShadow>,
}

impl Core {
    pub(crate) fn client_url(&self, path: &str) -> String {
        format!("{}{}", self.config.client_api_url, path)
    }

    pub(crate) fn app_url(&self, path: &str) -> String {
        format!("{}{}", self.config.app_api_url, path)
    }

    fn device(&self) -> std::sync::RwLockReadGuard<'_, DeviceShadow> {
        self.device.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn device_mut(&self) -> std::sync::RwLockWriteGuard<'_, DeviceShadow> {
        self.device.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn device_id(&self) -> Option<String> {
        self.device().device_ids.first().cloned()
    }

    pub(crate) fn features(&self) -> DeviceFeatures {
        self.device().features
    }

    /// Current telemetry snapshot, if any has arrived.
    pub(crate) fn current_snapshot(&self) -> Option<DeviceSnapshot> {
        self.device().telemetry.front().cloned()
    }

    /// Current telemetry for one bed half.
    pub(crate) fn side_now(&self, key: SideKey) -> SideTelemetry {
        self.device()
            .telemetry
            .front()
            .map(|snapshot| snapshot.side(key))
            .unwrap_or_default()
    }

    /// Heating level for a side, falling back through the ring when the
    /// current snapshot lacks the key.
    pub(crate) fn heating_level(&self, key: SideKey) -> Option<i32> {
        self.device()
            .telemetry
            .iter()
            .find_map(|snapshot| snapshot.side(key).heating_level)
    }

    /// Heating level `num` refreshes ago; 0 when history does not reach
    /// that far.
    pub(crate) fn past_heating_level(&self, key: SideKey, num: usize) -> i32 {
        if num >= TELEMETRY_HISTORY {
            return 0;
        }
        self.device()
            .telemetry
            .get(num)
            .and_then(|snapshot| snapshot.side(key).heating_level)
            .unwrap_or(0)
    }

    fn record_snapshot(&self, snapshot: DeviceSnapshot) {
        let mut shadow = self.device_mut();
        shadow.telemetry.push_front(snapshot);
        shadow.telemetry.truncate(TELEMETRY_HISTORY);
    }
}

/// Build a [`Core`] seeded with canned telemetry, for unit tests that
/// exercise accessors without a network.
#[cfg(test)]
pub(crate) fn test_core(
    config: Config,
    snapshots: Vec<DeviceSnapshot>,
    features: DeviceFeatures,
) -> Arc<Core> {
    let gateway = ApiGateway::new(&config).expect("gateway should build");
    Arc::new(Core {
        config,
        gateway,
        device: RwLock::new(DeviceShadow {
            device_ids: vec!["test-device".to_string()],
            features,
            telemetry: snapshots.into(),
        }),
    })
}

/// Async client for one account session.
pub struct PodClient {
    core: Arc<Core>,
    occupants: DashMap<String, Arc<Occupant>>,
}

impl PodClient {
    /// Build a client. Fails on invalid configuration; performs no I/O.
    pub fn new(config: Config) -> Result<Self> {
        config
            .validate()
            .map_err(|e| PodError::validation(format!("Invalid configuration: {e}")))?;
        let gateway = ApiGateway::new(&config)?;
        Ok(Self {
            core: Arc::new(Core {
                config,
                gateway,
                device: RwLock::new(DeviceShadow::default()),
            }),
            occupants: DashMap::new(),
        })
    }

    /// Authenticate and run discovery. Call once before polling.
    pub async fn start(&self) -> Result<()> {
        tracing::debug!("Starting session");
        self.core.gateway.ensure_authenticated().await?;
        self.discover_devices().await?;
        self.discover_users().await?;
        Ok(())
    }

    /// End the session. Cached state is dropped; the HTTP pool is released
    /// when the client itself is dropped.
    pub async fn stop(&self) {
        tracing::debug!("Ending session");
        self.occupants.clear();
        *self.core.device_mut() = DeviceShadow::default();
    }

    // ─── Discovery ───────────────────────────────────────────────────────

    /// Fetch the account summary: device ids and capability flags.
    ///
    /// Only the first device is used; multi-device accounts are not
    /// supported.
    pub async fn discover_devices(&self) -> Result<()> {
        let url = self.core.client_url("/users/me");
        let me: MeResponse = self.core.gateway.get(&url).await?;

        let mut device_ids = me.user.devices;
        if let Some(preferred) = &self.core.config.device_id {
            if let Some(pos) = device_ids.iter().position(|id| id == preferred) {
                device_ids.swap(0, pos);
            } else {
                tracing::warn!(
                    device_id = %preferred,
                    "Configured device id not found on account; using first discovered device"
                );
            }
        }
        if device_ids.len() > 1 {
            tracing::warn!(
                count = device_ids.len(),
                "Account has multiple devices; only the first is used"
            );
        }

        let features = DeviceFeatures {
            cooling: me.user.features.iter().any(|f| f == "cooling"),
            base: me.user.features.iter().any(|f| f == "elevation"),
            speaker: me.user.features.iter().any(|f| f == "audio"),
        };

        tracing::debug!(
            devices = ?device_ids,
            cooling = features.cooling,
            base = features.base,
            speaker = features.speaker,
            "Discovered devices"
        );

        let mut shadow = self.core.device_mut();
        shadow.device_ids = device_ids;
        shadow.features = features;
        Ok(())
    }

    /// Resolve which users occupy the bed (away users included) and create
    /// one [`Occupant`] per unique user id.
    pub async fn discover_users(&self) -> Result<()> {
        let device_id = self
            .core
            .device_id()
            .ok_or_else(|| PodError::validation("No device discovered yet"))?;

        let url = self.core.client_url(&format!("/devices/{device_id}"));
        let assignment: DeviceAssignmentResponse = self
            .core
            .gateway
            .get_with_query(
                &url,
                &[("filter", "leftUserId,rightUserId,awaySides".to_string())],
            )
            .await?;
        let assignment = assignment.result;

        let away_ids: Vec<String> = assignment
            .away_sides
            .as_ref()
            .map(|sides| sides.values().cloned().collect())
            .unwrap_or_default();

        for user_id in assignment.user_ids() {
            let url = self.core.client_url(&format!("/users/{user_id}"));
            let profile: UserResponse = self.core.gateway.get(&url).await?;
            let profile = profile.user;

            let declared = profile
                .current_device
                .as_ref()
                .and_then(|device| device.side.as_deref());
            let side = match Side::from_api(declared) {
                Side::Unknown if away_ids.contains(&user_id) => Side::Away,
                Side::Unknown => {
                    tracing::warn!(
                        user_id = %user_id,
                        "User has no side information; defaulting to left for keyed access"
                    );
                    Side::Unknown
                }
                side => side,
            };

            if !self.occupants.contains_key(&user_id) {
                tracing::debug!(user_id = %user_id, ?side, "Discovered occupant");
                let occupant = Arc::new(Occupant::new(
                    Arc::clone(&self.core),
                    user_id.clone(),
                    side,
                    profile,
                ));
                self.occupants.insert(user_id, occupant);
            }
        }
        Ok(())
    }

    // ─── Refresh entry points (driven by the host's poller) ──────────────

    /// Fetch the current device snapshot, fold it into the telemetry ring
    /// and recompute every occupant's presence.
    pub async fn refresh_device_telemetry(&self) -> Result<()> {
        let device_id = self
            .core
            .device_id()
            .ok_or_else(|| PodError::validation("No device discovered yet"))?;

        let url = self.core.client_url(&format!("/devices/{device_id}"));
        let response: DeviceResponse = self.core.gateway.get(&url).await?;
        self.core.record_snapshot(response.result);

        for occupant in self.occupants.iter() {
            occupant.recompute_presence();
        }
        Ok(())
    }

    /// Refresh every occupant's trend/routine/temperature data.
    pub async fn refresh_users(&self) -> Result<()> {
        for occupant in self.users() {
            occupant.refresh().await?;
        }
        Ok(())
    }

    /// Refresh bed-base state. The payload is identical for both sides, so
    /// one representative occupant is queried.
    pub async fn refresh_base_data(&self) -> Result<()> {
        if let Some(user) = self.base_user() {
            user.refresh_base().await?;
        }
        Ok(())
    }

    /// Refresh speaker state for speaker-equipped bases.
    pub async fn refresh_speaker_data(&self) -> Result<()> {
        if let Some(user) = self.speaker_user() {
            user.refresh_speaker().await?;
        }
        Ok(())
    }

    // ─── Occupants ───────────────────────────────────────────────────────

    /// All discovered occupants.
    pub fn users(&self) -> Vec<Arc<Occupant>> {
        self.occupants.iter().map(|e| Arc::clone(e.value())).collect()
    }

    /// Occupant by user id.
    pub fn user(&self, user_id: &str) -> Option<Arc<Occupant>> {
        self.occupants.get(user_id).map(|e| Arc::clone(e.value()))
    }

    /// Occupant by bed side.
    pub fn user_for_side(&self, side: Side) -> Option<Arc<Occupant>> {
        self.occupants
            .iter()
            .find(|e| e.value().side() == side)
            .map(|e| Arc::clone(e.value()))
    }

    /// Representative occupant for base queries.
    pub fn base_user(&self) -> Option<Arc<Occupant>> {
        if !self.has_base() {
            return None;
        }
        self.users().into_iter().next()
    }

    /// Representative occupant for speaker queries.
    pub fn speaker_user(&self) -> Option<Arc<Occupant>> {
        if !self.has_speaker() {
            return None;
        }
        self.users().into_iter().next()
    }

    // ─── Device accessors ────────────────────────────────────────────────

    /// Id of the active device.
    pub fn device_id(&self) -> Option<String> {
        self.core.device_id()
    }

    pub fn is_cooling_capable(&self) -> bool {
        self.core.features().cooling
    }

    pub fn has_base(&self) -> bool {
        self.core.features().base
    }

    pub fn has_speaker(&self) -> bool {
        self.core.features().speaker
    }

    /// Current raw device snapshot.
    pub fn device_data(&self) -> Option<DeviceSnapshot> {
        self.core.current_snapshot()
    }

    pub fn needs_priming(&self) -> Option<bool> {
        self.core.current_snapshot().and_then(|s| s.needs_priming)
    }

    pub fn is_priming(&self) -> Option<bool> {
        self.core.current_snapshot().and_then(|s| s.priming)
    }

    pub fn has_water(&self) -> Option<bool> {
        self.core.current_snapshot().and_then(|s| s.has_water)
    }

    pub fn last_prime(&self) -> Option<DateTime<Tz>> {
        let snapshot = self.core.current_snapshot()?;
        let raw = snapshot.last_prime?;
        time_utils::parse_to_local(&raw, self.core.config.timezone)
    }

    pub fn model_string(&self) -> Option<String> {
        self.core.current_snapshot().and_then(|s| s.model_string)
    }

    pub fn firmware_version(&self) -> Option<String> {
        self.core.current_snapshot().and_then(|s| s.firmware_version)
    }

    pub fn hw_revision(&self) -> Option<String> {
        self.core
            .current_snapshot()
            .and_then(|s| s.sensor_info)
            .and_then(|info| info.hw_revision)
    }

    /// Room temperature across both sides of the bed.
    ///
    /// Occupants with an in-progress session report live readings, so those
    /// are preferred; otherwise the latest settled readings are averaged.
    pub fn room_temperature(&self) -> Option<f64> {
        let mut active: Option<f64> = None;
        let mut settled: Option<f64> = None;

        for occupant in self.users() {
            let Some(current) = occupant.current_room_temp() else {
                continue;
            };
            let slot = if occupant.current_session_processing().unwrap_or(false) {
                &mut active
            } else {
                &mut settled
            };
            *slot = Some(match *slot {
                Some(existing) => (existing + current) / 2.0,
                None => current,
            });
        }

        active.or(settled)
    }
}
