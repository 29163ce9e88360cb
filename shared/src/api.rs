//! Request and response bodies of the REST API.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::event::Sensitive;

/// Body of `POST /api/login` and `POST /api/signup`.
#[derive(Serialize)]
pub struct Credentials<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

impl<'a> Credentials<'a> {
    #[must_use]
    pub fn new(email: &'a str, password: &'a Sensitive) -> Self {
        Self {
            email,
            password: password.expose(),
        }
    }
}

impl fmt::Debug for Credentials<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[derive(Deserialize)]
pub struct AuthTokenResponse {
    pub access_token: String,
}

impl fmt::Debug for AuthTokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthTokenResponse([REDACTED])")
    }
}

/// Either an RFC 3339 string or milliseconds since the epoch on the wire.
fn flexible_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Millis(i64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Millis(ms) => Utc
            .timestamp_millis_opt(ms)
            .single()
            .ok_or_else(|| serde::de::Error::custom(format!("timestamp out of range: {ms}"))),
        Raw::Text(s) => parse_timestamp(&s).map_err(serde::de::Error::custom),
    }
}

/// Accepts RFC 3339 and the naive `YYYY-MM-DDTHH:MM:SS[.f]` form, read as UTC.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, String> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| chrono::NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("unrecognised timestamp '{s}'"))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub text: String,
    #[serde(deserialize_with = "flexible_timestamp")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationsResponse {
    #[serde(default)]
    pub notifications: Vec<Notification>,
}

/// Notification thresholds. Distances are nautical miles, angles degrees.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub min_distance: Option<f64>,
    #[serde(default)]
    pub min_angle: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserLocation {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(deserialize_with = "flexible_timestamp")]
    pub reported_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn notification_accepts_both_timestamp_forms() {
        let a: Notification =
            serde_json::from_value(json!({"text": "B738 overhead", "timestamp": "2024-05-01T12:00:00Z"}))
                .expect("rfc3339");
        let b: Notification =
            serde_json::from_value(json!({"text": "B738 overhead", "timestamp": 1_714_564_800_000_i64}))
                .expect("millis");
        assert_eq!(a.timestamp, b.timestamp);
    }

    #[test]
    fn naive_timestamps_are_utc() {
        let loc: UserLocation = serde_json::from_value(json!({
            "latitude": 51.5, "longitude": -0.12, "reported_at": "2024-05-01T12:00:00.250000"
        }))
        .expect("decode");
        assert_eq!(loc.reported_at.timestamp_millis(), 1_714_564_800_250);
    }

    #[test]
    fn missing_notifications_key_is_empty() {
        let r: NotificationsResponse = serde_json::from_value(json!({})).expect("decode");
        assert!(r.notifications.is_empty());
    }

    #[test]
    fn preferences_tolerate_topic_only() {
        let p: Preferences = serde_json::from_value(json!({"topic": "planes-abc"})).expect("decode");
        assert_eq!(p.min_distance, None);
    }

    #[test]
    fn credentials_debug_hides_password() {
        let password = Sensitive::new("hunter2");
        let creds = Credentials::new("a@b.c", &password);
        assert!(!format!("{creds:?}").contains("hunter2"));
        let body = serde_json::to_value(&creds).expect("serialize");
        assert_eq!(body, json!({"email": "a@b.c", "password": "hunter2"}));
    }

    #[test]
    fn token_response_debug_is_redacted() {
        let r: AuthTokenResponse =
            serde_json::from_value(json!({"access_token": "jwt-abc"})).expect("decode");
        assert_eq!(format!("{r:?}"), "AuthTokenResponse([REDACTED])");
    }
}
