use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Kind of test a [`Condition`] applies to an aircraft. The serialized names
/// are the API's `type` discriminators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionType {
    #[serde(rename = "2d_distance")]
    Distance2d,
    #[serde(rename = "3d_distance")]
    Distance3d,
    #[serde(rename = "aircraft_type")]
    AircraftType,
    #[serde(rename = "registration_number")]
    RegistrationNumber,
    #[serde(rename = "aircraft_category")]
    AircraftCategory,
    #[serde(rename = "angle_above_horizon")]
    AngleAboveHorizon,
}

impl ConditionType {
    pub const ALL: [ConditionType; 6] = [
        Self::Distance2d,
        Self::Distance3d,
        Self::AircraftType,
        Self::RegistrationNumber,
        Self::AircraftCategory,
        Self::AngleAboveHorizon,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Distance2d => "2d_distance",
            Self::Distance3d => "3d_distance",
            Self::AircraftType => "aircraft_type",
            Self::RegistrationNumber => "registration_number",
            Self::AircraftCategory => "aircraft_category",
            Self::AngleAboveHorizon => "angle_above_horizon",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Distance2d => "2d distance (Nautical Miles)",
            Self::Distance3d => "3d distance (Nautical Miles)",
            Self::AircraftType => "aircraft type (Comma-separated list)",
            Self::RegistrationNumber => "registration number (Comma-separated list)",
            Self::AircraftCategory => "Aircraft Category",
            Self::AngleAboveHorizon => "Angle above the horizon (degrees)",
        }
    }

    #[must_use]
    pub const fn is_distance(self) -> bool {
        matches!(self, Self::Distance2d | Self::Distance3d)
    }
}

impl fmt::Display for ConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category codes offered by the category picker, with their labels.
pub const CATEGORY_OPTIONS: &[(&str, &str)] = &[("A", "Category A"), ("B", "Category B")];

/// One predicate of a filter rule.
///
/// On the wire this is `{"type": ..., "value": ...}` where the value shape
/// depends on the type. Numeric thresholds are kept as the text the user
/// typed; nothing is validated before it is sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCondition", into = "RawCondition")]
pub enum Condition {
    Distance2d { max_distance: String },
    Distance3d { max_distance: String },
    AircraftType(String),
    RegistrationNumber(String),
    AircraftCategory(String),
    AngleAboveHorizon { min_angle: String },
}

impl Condition {
    /// The value a newly added condition starts with.
    #[must_use]
    pub fn empty(condition_type: ConditionType) -> Self {
        Self::with_text(condition_type, String::new())
    }

    #[must_use]
    pub fn with_text(condition_type: ConditionType, text: String) -> Self {
        match condition_type {
            ConditionType::Distance2d => Self::Distance2d { max_distance: text },
            ConditionType::Distance3d => Self::Distance3d { max_distance: text },
            ConditionType::AircraftType => Self::AircraftType(text),
            ConditionType::RegistrationNumber => Self::RegistrationNumber(text),
            ConditionType::AircraftCategory => Self::AircraftCategory(text),
            ConditionType::AngleAboveHorizon => Self::AngleAboveHorizon { min_angle: text },
        }
    }

    #[must_use]
    pub fn max_distance_nm(nautical_miles: impl Into<String>) -> Self {
        Self::Distance2d {
            max_distance: nautical_miles.into(),
        }
    }

    #[must_use]
    pub const fn condition_type(&self) -> ConditionType {
        match self {
            Self::Distance2d { .. } => ConditionType::Distance2d,
            Self::Distance3d { .. } => ConditionType::Distance3d,
            Self::AircraftType(_) => ConditionType::AircraftType,
            Self::RegistrationNumber(_) => ConditionType::RegistrationNumber,
            Self::AircraftCategory(_) => ConditionType::AircraftCategory,
            Self::AngleAboveHorizon { .. } => ConditionType::AngleAboveHorizon,
        }
    }

    #[must_use]
    pub const fn is_distance(&self) -> bool {
        self.condition_type().is_distance()
    }

    /// Raw text of the value, whatever its shape.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Distance2d { max_distance } | Self::Distance3d { max_distance } => max_distance,
            Self::AngleAboveHorizon { min_angle } => min_angle,
            Self::AircraftType(s) | Self::RegistrationNumber(s) | Self::AircraftCategory(s) => s,
        }
    }

    /// Applies user input according to the condition's type.
    ///
    /// Distance and angle types take the text as their threshold, list types
    /// take it verbatim. For categories the input is a single code and the
    /// selection becomes exactly that code.
    pub fn set_input(&mut self, input: impl Into<String>) {
        let input = input.into();
        match self {
            Self::Distance2d { max_distance } | Self::Distance3d { max_distance } => {
                *max_distance = input;
            }
            Self::AngleAboveHorizon { min_angle } => *min_angle = input,
            Self::AircraftType(s) | Self::RegistrationNumber(s) => *s = input,
            Self::AircraftCategory(selected) => *selected = input.trim().to_string(),
        }
    }

    /// Numeric threshold for distance (nautical miles) and angle (degrees)
    /// conditions. `None` for list types or text that is not a finite number.
    #[must_use]
    pub fn parsed_threshold(&self) -> Option<f64> {
        match self {
            Self::Distance2d { max_distance: t }
            | Self::Distance3d { max_distance: t }
            | Self::AngleAboveHorizon { min_angle: t } => {
                t.trim().parse::<f64>().ok().filter(|v| v.is_finite())
            }
            _ => None,
        }
    }

    /// Entries of a comma-separated list value, trimmed, empties dropped.
    #[must_use]
    pub fn list_items(&self) -> Vec<&str> {
        match self {
            Self::AircraftType(s) | Self::RegistrationNumber(s) => s
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Category membership uses substring containment on the stored value.
    #[must_use]
    pub fn category_selected(&self, code: &str) -> bool {
        match self {
            Self::AircraftCategory(selected) => !code.is_empty() && selected.contains(code),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawCondition {
    #[serde(rename = "type")]
    kind: ConditionType,
    #[serde(default)]
    value: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConditionDecodeError {
    #[error("condition '{kind}' expects a value object with '{field}'")]
    MissingField {
        kind: ConditionType,
        field: &'static str,
    },
    #[error("condition '{kind}' has an unsupported value shape")]
    UnsupportedValue { kind: ConditionType },
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Null => Some(String::new()),
        _ => None,
    }
}

fn field_text(
    kind: ConditionType,
    value: &Value,
    field: &'static str,
) -> Result<String, ConditionDecodeError> {
    match value {
        Value::Object(map) => map
            .get(field)
            .and_then(scalar_text)
            .ok_or(ConditionDecodeError::MissingField { kind, field }),
        // Freshly added conditions were historically stored with a bare "" value.
        other => scalar_text(other).ok_or(ConditionDecodeError::UnsupportedValue { kind }),
    }
}

impl TryFrom<RawCondition> for Condition {
    type Error = ConditionDecodeError;

    fn try_from(raw: RawCondition) -> Result<Self, Self::Error> {
        let kind = raw.kind;
        let text = match kind {
            ConditionType::Distance2d | ConditionType::Distance3d => {
                field_text(kind, &raw.value, "max_distance")?
            }
            ConditionType::AngleAboveHorizon => field_text(kind, &raw.value, "min_angle")?,
            ConditionType::AircraftType
            | ConditionType::RegistrationNumber
            | ConditionType::AircraftCategory => match &raw.value {
                Value::Array(items) => items
                    .iter()
                    .filter_map(scalar_text)
                    .collect::<Vec<_>>()
                    .join(","),
                other => scalar_text(other).ok_or(ConditionDecodeError::UnsupportedValue { kind })?,
            },
        };
        Ok(Condition::with_text(kind, text))
    }
}

impl From<Condition> for RawCondition {
    fn from(condition: Condition) -> Self {
        let kind = condition.condition_type();
        let value = match condition {
            Condition::Distance2d { max_distance } | Condition::Distance3d { max_distance } => {
                serde_json::json!({ "max_distance": max_distance })
            }
            Condition::AngleAboveHorizon { min_angle } => serde_json::json!({ "min_angle": min_angle }),
            Condition::AircraftType(s)
            | Condition::RegistrationNumber(s)
            | Condition::AircraftCategory(s) => Value::String(s),
        };
        RawCondition { kind, value }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    mod wire_tests {
        use super::*;

        #[test]
        fn distance_serializes_as_object() {
            let c = Condition::max_distance_nm("3");
            assert_eq!(
                serde_json::to_value(&c).expect("serialize"),
                json!({"type": "2d_distance", "value": {"max_distance": "3"}})
            );
        }

        #[test]
        fn list_serializes_as_string() {
            let c = Condition::AircraftType("A320,B738".into());
            assert_eq!(
                serde_json::to_value(&c).expect("serialize"),
                json!({"type": "aircraft_type", "value": "A320,B738"})
            );
        }

        #[test]
        fn accepts_numeric_thresholds() {
            let c: Condition = serde_json::from_value(
                json!({"type": "3d_distance", "value": {"max_distance": 2.5}}),
            )
            .expect("decode");
            assert_eq!(c, Condition::Distance3d { max_distance: "2.5".into() });
        }

        #[test]
        fn accepts_legacy_empty_string_for_distance() {
            let c: Condition =
                serde_json::from_value(json!({"type": "2d_distance", "value": ""})).expect("decode");
            assert_eq!(c, Condition::Distance2d { max_distance: String::new() });
        }

        #[test]
        fn accepts_missing_value() {
            let c: Condition =
                serde_json::from_value(json!({"type": "registration_number"})).expect("decode");
            assert_eq!(c, Condition::RegistrationNumber(String::new()));
        }

        #[test]
        fn rejects_unknown_type() {
            let r = serde_json::from_value::<Condition>(json!({"type": "speed", "value": "1"}));
            assert!(r.is_err());
        }

        #[test]
        fn rejects_object_without_threshold_field() {
            let r = serde_json::from_value::<Condition>(
                json!({"type": "angle_above_horizon", "value": {"max_distance": "3"}}),
            );
            assert!(r.is_err());
        }
    }

    mod input_tests {
        use super::*;

        #[test]
        fn dispatches_on_type() {
            let mut d = Condition::empty(ConditionType::Distance3d);
            d.set_input("12");
            assert_eq!(d, Condition::Distance3d { max_distance: "12".into() });

            let mut a = Condition::empty(ConditionType::AngleAboveHorizon);
            a.set_input("30");
            assert_eq!(a.parsed_threshold(), Some(30.0));

            let mut r = Condition::empty(ConditionType::RegistrationNumber);
            r.set_input("N123AB, G-ABCD ,");
            assert_eq!(r.list_items(), vec!["N123AB", "G-ABCD"]);
        }

        #[test]
        fn category_selection_replaces_previous_code() {
            let mut c = Condition::empty(ConditionType::AircraftCategory);
            c.set_input("A");
            assert!(c.category_selected("A"));
            c.set_input("B");
            assert!(c.category_selected("B"));
            assert!(!c.category_selected("A"));
        }

        #[test]
        fn non_numeric_threshold_is_none() {
            let c = Condition::max_distance_nm("three");
            assert_eq!(c.parsed_threshold(), None);
            assert_eq!(Condition::max_distance_nm("inf").parsed_threshold(), None);
        }
    }

    #[test]
    fn condition_type_wire_names_decode() {
        for t in ConditionType::ALL {
            let decoded: ConditionType =
                serde_json::from_value(serde_json::Value::String(t.as_str().into()))
                    .expect("wire name");
            assert_eq!(decoded, t);
        }
        assert!(ConditionType::Distance2d.is_distance());
        assert!(!ConditionType::AngleAboveHorizon.is_distance());
    }
}
