// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bed-base (frame articulation) payloads.
//!
//! The vendor names the two axes "leg" and "torso"; the human-facing
//! terminology is "feet" and "head" (leg = feet, torso = head). The mapping
//! happens in the occupant accessors; these structs keep the wire names.

use serde::Deserialize;
use serde_json::{Map, Value};

use super::device::SideKey;

/// Response of the per-user base endpoint. The payload carries both sides;
/// their contents are currently identical.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BaseData {
    pub left: Option<BaseSide>,
    pub right: Option<BaseSide>,
    pub hardware_info: Option<BaseHardwareInfo>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BaseData {
    pub fn side(&self, key: SideKey) -> Option<&BaseSide> {
        match key {
            SideKey::Left => self.left.as_ref(),
            SideKey::Right => self.right.as_ref(),
        }
    }

    /// Mutable access for optimistic local writes; creates the side record
    /// when the payload lacked it.
    pub fn side_mut(&mut self, key: SideKey) -> &mut BaseSide {
        match key {
            SideKey::Left => self.left.get_or_insert_with(BaseSide::default),
            SideKey::Right => self.right.get_or_insert_with(BaseSide::default),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BaseSide {
    pub leg: Option<BaseAxis>,
    pub torso: Option<BaseAxis>,
    pub preset: Option<BasePreset>,
    pub in_snore_mitigation: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BaseAxis {
    pub current_angle: Option<i64>,
}

/// Named articulation preset; the platform currently ships `sleep`,
/// `relaxing` and `reading`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BasePreset {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BaseHardwareInfo {
    pub sku: Option<String>,
    pub hardware_version: Option<String>,
    pub software_version: Option<String>,
}
