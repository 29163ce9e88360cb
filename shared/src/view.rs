use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{Notification, UserLocation};
use crate::error::{AppError, UserFacingError};
use crate::filters::{
    Condition, ConditionType, FilterList, FilterRule, RuleEntry, RuleId, CATEGORY_OPTIONS,
};
use crate::model::{Loadable, Model, PreferencesForm, Screen};

/// Map span around the reported location, in degrees.
pub const LOCATION_REGION_DELTA_DEG: f64 = 0.01;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ViewModel {
    pub screen: Screen,
    pub state: ViewState,
    pub error: Option<UserFacingError>,
    pub is_authenticated: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewState {
    Launching,
    Login {
        submitting: bool,
        error: Option<UserFacingError>,
    },
    Signup {
        submitting: bool,
        error: Option<UserFacingError>,
    },
    Notifications {
        loading: bool,
        items: Vec<NotificationItem>,
        error: Option<UserFacingError>,
    },
    Location {
        loading: bool,
        marker: Option<LocationMarker>,
        error: Option<UserFacingError>,
    },
    Preferences {
        loading: bool,
        topic: String,
        min_distance: String,
        min_angle: String,
        saving: bool,
        saved: bool,
        error: Option<UserFacingError>,
    },
    Filters {
        loading: bool,
        creating: bool,
        rules: Vec<RuleCard>,
        error: Option<UserFacingError>,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NotificationItem {
    pub text: String,
    pub timestamp: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LocationMarker {
    pub latitude: f64,
    pub longitude: f64,
    pub latitude_delta: f64,
    pub longitude_delta: f64,
    pub last_updated: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RuleCard {
    pub id: RuleId,
    pub name: String,
    pub evaluation_order: Option<u32>,
    pub dirty: bool,
    pub saving: bool,
    pub deleting: bool,
    pub conditions: Vec<ConditionRow>,
    pub addable_types: Vec<ConditionOption>,
    pub error: Option<UserFacingError>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ConditionRow {
    pub index: usize,
    pub condition_type: ConditionType,
    pub label: String,
    pub input: ConditionInput,
    pub removable: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ConditionOption {
    pub condition_type: ConditionType,
    pub label: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConditionInput {
    Numeric { value: String },
    List { value: String },
    Categories { options: Vec<CategoryOption> },
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CategoryOption {
    pub code: String,
    pub label: String,
    pub selected: bool,
}

/// "Just now", "1 minute ago" or "N minutes ago". Timestamps in the future
/// count as just now.
#[must_use]
pub fn format_time_ago(reported_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = (now - reported_at).num_minutes();
    match minutes {
        m if m < 1 => "Just now".into(),
        1 => "1 minute ago".into(),
        m => format!("{m} minutes ago"),
    }
}

fn error_view(error: Option<&AppError>) -> Option<UserFacingError> {
    error.map(UserFacingError::from)
}

fn condition_row(rule: &FilterRule, index: usize, condition: &Condition) -> ConditionRow {
    let condition_type = condition.condition_type();
    let input = match condition_type {
        ConditionType::Distance2d | ConditionType::Distance3d | ConditionType::AngleAboveHorizon => {
            ConditionInput::Numeric {
                value: condition.text().to_string(),
            }
        }
        ConditionType::AircraftType | ConditionType::RegistrationNumber => ConditionInput::List {
            value: condition.text().to_string(),
        },
        ConditionType::AircraftCategory => ConditionInput::Categories {
            options: CATEGORY_OPTIONS
                .iter()
                .map(|(code, label)| CategoryOption {
                    code: (*code).to_string(),
                    label: (*label).to_string(),
                    selected: condition.category_selected(code),
                })
                .collect(),
        },
    };
    ConditionRow {
        index,
        condition_type,
        label: condition_type.label().to_string(),
        input,
        removable: rule.can_remove_condition(index),
    }
}

fn rule_card(entry: &RuleEntry) -> RuleCard {
    let rule = &entry.rule;
    RuleCard {
        id: rule.id.clone(),
        name: rule.name.clone(),
        evaluation_order: rule.evaluation_order,
        dirty: entry.dirty,
        saving: entry.saving,
        deleting: entry.deleting,
        conditions: rule
            .conditions
            .iter()
            .enumerate()
            .map(|(i, c)| condition_row(rule, i, c))
            .collect(),
        addable_types: rule
            .addable_condition_types()
            .into_iter()
            .map(|t| ConditionOption {
                condition_type: t,
                label: t.label().to_string(),
            })
            .collect(),
        error: error_view(entry.error.as_ref()),
    }
}

pub fn rule_cards(list: &FilterList) -> Vec<RuleCard> {
    list.entries().map(rule_card).collect()
}

fn notification_items(notifications: &[Notification]) -> Vec<NotificationItem> {
    notifications
        .iter()
        .map(|n| NotificationItem {
            text: n.text.clone(),
            timestamp: n.timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        })
        .collect()
}

fn location_marker(location: &UserLocation, now: DateTime<Utc>) -> LocationMarker {
    LocationMarker {
        latitude: location.latitude,
        longitude: location.longitude,
        latitude_delta: LOCATION_REGION_DELTA_DEG,
        longitude_delta: LOCATION_REGION_DELTA_DEG,
        last_updated: format_time_ago(location.reported_at, now),
    }
}

fn preferences_state(form: &PreferencesForm) -> ViewState {
    ViewState::Preferences {
        loading: form.load.is_loading(),
        topic: form.topic.clone(),
        min_distance: form.min_distance.clone(),
        min_angle: form.min_angle.clone(),
        saving: form.saving,
        saved: form.saved,
        error: error_view(form.error.as_ref().or(form.load.error())),
    }
}

/// Projects the model for the shell. `now` drives relative timestamps.
#[must_use]
pub fn build_view(model: &Model, now: DateTime<Utc>) -> ViewModel {
    let state = match model.screen {
        Screen::Launching => ViewState::Launching,
        Screen::Login => ViewState::Login {
            submitting: model.auth.submitting,
            error: error_view(model.auth.error.as_ref()),
        },
        Screen::Signup => ViewState::Signup {
            submitting: model.auth.submitting,
            error: error_view(model.auth.error.as_ref()),
        },
        Screen::Notifications => ViewState::Notifications {
            loading: model.notifications.is_loading(),
            items: model
                .notifications
                .value()
                .map(|n| notification_items(n))
                .unwrap_or_default(),
            error: error_view(model.notifications.error()),
        },
        Screen::Location => ViewState::Location {
            loading: model.location.is_loading(),
            marker: model.location.value().map(|l| location_marker(l, now)),
            error: error_view(model.location.error()),
        },
        Screen::Preferences => preferences_state(&model.preferences),
        Screen::Filters => ViewState::Filters {
            loading: matches!(model.filters.load, Loadable::Loading),
            creating: model.filters.creating,
            rules: rule_cards(&model.filters.list),
            error: error_view(
                model
                    .filters
                    .create_error
                    .as_ref()
                    .or(model.filters.load.error()),
            ),
        },
    };

    ViewModel {
        screen: model.screen,
        state,
        error: error_view(model.error.as_ref()),
        is_authenticated: model.is_authenticated(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).single().expect("valid")
    }

    #[test]
    fn time_ago_buckets() {
        assert_eq!(format_time_ago(at(0), at(59)), "Just now");
        assert_eq!(format_time_ago(at(0), at(60)), "1 minute ago");
        assert_eq!(format_time_ago(at(0), at(119)), "1 minute ago");
        assert_eq!(format_time_ago(at(0), at(0) + Duration::minutes(45)), "45 minutes ago");
        assert_eq!(format_time_ago(at(300), at(0)), "Just now");
    }

    #[test]
    fn filters_view_flags_sole_distance_condition() {
        let mut model = Model::default();
        model.screen = Screen::Filters;
        model.filters.list.replace_all(vec![FilterRule {
            id: RuleId::from(1),
            name: "Overhead".into(),
            conditions: vec![
                Condition::max_distance_nm("3"),
                Condition::AircraftCategory("A".into()),
            ],
            evaluation_order: Some(1),
        }]);

        let vm = build_view(&model, at(0));
        let ViewState::Filters { rules, .. } = vm.state else {
            panic!("expected filters view");
        };
        let card = &rules[0];
        assert!(!card.conditions[0].removable);
        assert!(card.conditions[1].removable);
        assert!(matches!(
            &card.conditions[1].input,
            ConditionInput::Categories { options } if options[0].selected && !options[1].selected
        ));
        assert!(!card
            .addable_types
            .iter()
            .any(|o| o.condition_type == ConditionType::Distance2d));
    }

    #[test]
    fn location_view_has_fixed_region() {
        let mut model = Model::default();
        model.screen = Screen::Location;
        model.location = Loadable::Loaded(UserLocation {
            latitude: 51.47,
            longitude: -0.45,
            reported_at: at(0),
        });
        let vm = build_view(&model, at(180));
        let ViewState::Location { marker: Some(marker), .. } = vm.state else {
            panic!("expected marker");
        };
        assert!((marker.latitude_delta - 0.01).abs() < f64::EPSILON);
        assert_eq!(marker.last_updated, "3 minutes ago");
    }

    #[test]
    fn view_state_is_tagged() {
        let value = serde_json::to_value(ViewState::Launching).expect("serialize");
        assert_eq!(value, serde_json::json!({"type": "launching"}));
    }
}
