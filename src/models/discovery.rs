// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account, device-assignment and user-profile payloads used during
//! discovery.

use std::collections::HashMap;

use serde::Deserialize;

/// Envelope for the account summary (`/users/me`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MeResponse {
    pub user: AccountSummary,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccountSummary {
    pub user_id: Option<String>,
    pub devices: Vec<String>,
    /// Capability tokens; known values include `cooling`, `elevation`
    /// and `audio`.
    pub features: Vec<String>,
}

/// Envelope for the filtered device-assignment query.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DeviceAssignmentResponse {
    pub result: DeviceAssignment,
}

/// Which user occupies which bed half, plus users currently away.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceAssignment {
    pub left_user_id: Option<String>,
    pub right_user_id: Option<String>,
    /// Present only when at least one user is away; values are user ids.
    pub away_sides: Option<HashMap<String, String>>,
}

impl DeviceAssignment {
    /// Union of every user id the assignment references, away users
    /// included. Order is stable: left, right, then away entries.
    pub fn user_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        let mut push = |id: Option<&String>| {
            if let Some(id) = id {
                if !id.is_empty() && !ids.iter().any(|seen| seen == id) {
                    ids.push(id.clone());
                }
            }
        };
        push(self.left_user_id.as_ref());
        push(self.right_user_id.as_ref());
        if let Some(away) = &self.away_sides {
            // Sort for determinism; map iteration order is arbitrary
            let mut away_ids: Vec<&String> = away.values().collect();
            away_ids.sort();
            for id in away_ids {
                push(Some(id));
            }
        }
        ids
    }
}

/// Envelope for a user profile (`/users/{id}`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserResponse {
    pub user: UserProfile,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    pub user_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub current_device: Option<CurrentDevice>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CurrentDevice {
    pub id: Option<String>,
    pub side: Option<String>,
}

/// Response of the per-user current-device query.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CurrentDeviceResponse {
    pub side: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_ids_union_dedups_and_includes_away() {
        let assignment: DeviceAssignment = serde_json::from_str(
            r#"{
                "leftUserId": "user-l",
                "rightUserId": "user-r",
                "awaySides": {"left": "user-l", "right": "user-away"}
            }"#,
        )
        .unwrap();

        let ids = assignment.user_ids();
        assert_eq!(ids, vec!["user-l", "user-r", "user-away"]);
    }

    #[test]
    fn test_user_ids_with_missing_sides() {
        let assignment: DeviceAssignment =
            serde_json::from_str(r#"{"leftUserId": "solo-user"}"#).unwrap();
        assert_eq!(assignment.user_ids(), vec!["solo-user"]);
    }
}
