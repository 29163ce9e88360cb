use crux_http::Response;
use crux_kv::error::KeyValueError;
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroize;

use crate::api::{AuthTokenResponse, NotificationsResponse, Preferences, UserLocation};
use crate::config::CoreConfig;
use crate::filters::{ConditionType, FilterRule, RuleId};
use crate::model::Screen;

// --- Sensitive wrapper: redacts Debug, zeroizes on Drop ---

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Sensitive(String);

impl Sensitive {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Sensitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl Drop for Sensitive {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

pub type KvResult = Result<Option<Vec<u8>>, KeyValueError>;
pub type HttpResult<T> = crux_http::Result<Response<T>>;

#[derive(Serialize, Deserialize, Debug)]
pub enum Event {
    // lifecycle
    AppStarted,
    Configure(CoreConfig),
    Navigate(Screen),
    DismissError,

    // session
    LoginSubmitted {
        email: String,
        password: Sensitive,
    },
    SignupSubmitted {
        email: String,
        password: Sensitive,
    },
    LogoutRequested,

    // filter editor
    LoadFilters,
    AddRule,
    RenameRule {
        id: RuleId,
        name: String,
    },
    AddCondition {
        id: RuleId,
        condition_type: ConditionType,
    },
    RemoveCondition {
        id: RuleId,
        index: usize,
    },
    UpdateConditionValue {
        id: RuleId,
        index: usize,
        value: String,
    },
    ReorderRules {
        order: Vec<RuleId>,
    },
    MoveRule {
        from: usize,
        to: usize,
    },
    SaveRule {
        id: RuleId,
    },
    DeleteRule {
        id: RuleId,
    },
    DismissRuleError {
        id: RuleId,
    },

    // other screens
    LoadNotifications,
    LoadLocation,
    LoadPreferences,
    PreferencesTopicChanged(String),
    PreferencesMinDistanceChanged(String),
    PreferencesMinAngleChanged(String),
    SavePreferences,

    // effect results, never sent by the shell
    #[serde(skip)]
    TokenRestored(KvResult),
    #[serde(skip)]
    TokenStored(KvResult),
    #[serde(skip)]
    TokenCleared(KvResult),
    #[serde(skip)]
    AuthResponse(Box<HttpResult<AuthTokenResponse>>),
    #[serde(skip)]
    FiltersLoaded {
        epoch: u64,
        result: Box<HttpResult<Vec<FilterRule>>>,
    },
    #[serde(skip)]
    RuleCreated(Box<HttpResult<FilterRule>>),
    #[serde(skip)]
    RuleSaved {
        id: RuleId,
        revision: u64,
        result: Box<HttpResult<Vec<u8>>>,
    },
    #[serde(skip)]
    RuleDeleted {
        id: RuleId,
        result: Box<HttpResult<Vec<u8>>>,
    },
    #[serde(skip)]
    NotificationsLoaded {
        epoch: u64,
        result: Box<HttpResult<NotificationsResponse>>,
    },
    #[serde(skip)]
    LocationLoaded {
        epoch: u64,
        result: Box<HttpResult<UserLocation>>,
    },
    #[serde(skip)]
    PreferencesLoaded {
        epoch: u64,
        result: Box<HttpResult<Preferences>>,
    },
    #[serde(skip)]
    PreferencesSaved(Box<HttpResult<Vec<u8>>>),
}

impl Event {
    /// Stable name for logging. Never includes payloads.
    pub fn name(&self) -> &'static str {
        match self {
            Event::AppStarted => "app_started",
            Event::Configure(_) => "configure",
            Event::Navigate(_) => "navigate",
            Event::DismissError => "dismiss_error",
            Event::LoginSubmitted { .. } => "login_submitted",
            Event::SignupSubmitted { .. } => "signup_submitted",
            Event::LogoutRequested => "logout_requested",
            Event::LoadFilters => "load_filters",
            Event::AddRule => "add_rule",
            Event::RenameRule { .. } => "rename_rule",
            Event::AddCondition { .. } => "add_condition",
            Event::RemoveCondition { .. } => "remove_condition",
            Event::UpdateConditionValue { .. } => "update_condition_value",
            Event::ReorderRules { .. } => "reorder_rules",
            Event::MoveRule { .. } => "move_rule",
            Event::SaveRule { .. } => "save_rule",
            Event::DeleteRule { .. } => "delete_rule",
            Event::DismissRuleError { .. } => "dismiss_rule_error",
            Event::LoadNotifications => "load_notifications",
            Event::LoadLocation => "load_location",
            Event::LoadPreferences => "load_preferences",
            Event::PreferencesTopicChanged(_) => "preferences_topic_changed",
            Event::PreferencesMinDistanceChanged(_) => "preferences_min_distance_changed",
            Event::PreferencesMinAngleChanged(_) => "preferences_min_angle_changed",
            Event::SavePreferences => "save_preferences",
            Event::TokenRestored(_) => "token_restored",
            Event::TokenStored(_) => "token_stored",
            Event::TokenCleared(_) => "token_cleared",
            Event::AuthResponse(_) => "auth_response",
            Event::FiltersLoaded { .. } => "filters_loaded",
            Event::RuleCreated(_) => "rule_created",
            Event::RuleSaved { .. } => "rule_saved",
            Event::RuleDeleted { .. } => "rule_deleted",
            Event::NotificationsLoaded { .. } => "notifications_loaded",
            Event::LocationLoaded { .. } => "location_loaded",
            Event::PreferencesLoaded { .. } => "preferences_loaded",
            Event::PreferencesSaved(_) => "preferences_saved",
        }
    }

    pub fn is_user_initiated(&self) -> bool {
        !matches!(
            self,
            Event::TokenRestored(_)
                | Event::TokenStored(_)
                | Event::TokenCleared(_)
                | Event::AuthResponse(_)
                | Event::FiltersLoaded { .. }
                | Event::RuleCreated(_)
                | Event::RuleSaved { .. }
                | Event::RuleDeleted { .. }
                | Event::NotificationsLoaded { .. }
                | Event::LocationLoaded { .. }
                | Event::PreferencesLoaded { .. }
                | Event::PreferencesSaved(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensitive_debug_is_redacted() {
        let s = Sensitive::new("hunter2");
        assert_eq!(format!("{s:?}"), "[REDACTED]");
        assert_eq!(s.expose(), "hunter2");
    }

    #[test]
    fn login_event_debug_hides_password() {
        let e = Event::LoginSubmitted {
            email: "pilot@example.com".into(),
            password: Sensitive::new("hunter2"),
        };
        let rendered = format!("{e:?}");
        assert!(rendered.contains("pilot@example.com"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn shell_events_deserialize() {
        let e: Event = serde_json::from_str(
            r#"{"UpdateConditionValue":{"id":3,"index":0,"value":"5"}}"#,
        )
        .expect("decode");
        assert!(matches!(
            e,
            Event::UpdateConditionValue { id: RuleId::Numeric(3), index: 0, .. }
        ));

        let e: Event = serde_json::from_str(
            r#"{"AddCondition":{"id":"r-1","condition_type":"aircraft_category"}}"#,
        )
        .expect("decode");
        assert!(matches!(
            e,
            Event::AddCondition { condition_type: ConditionType::AircraftCategory, .. }
        ));
    }

    #[test]
    fn effect_results_are_not_user_initiated() {
        assert!(Event::SaveRule { id: RuleId::from(1) }.is_user_initiated());
        assert!(!Event::TokenStored(Ok(None)).is_user_initiated());
        assert_eq!(Event::LogoutRequested.name(), "logout_requested");
        let dismiss = Event::DismissRuleError { id: RuleId::from(1) };
        assert_eq!(dismiss.name(), "dismiss_rule_error");
        assert!(dismiss.is_user_initiated());
    }
}
