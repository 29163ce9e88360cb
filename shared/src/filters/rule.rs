use serde::{Deserialize, Serialize};
use std::fmt;

use super::condition::{Condition, ConditionType};

pub const DEFAULT_RULE_NAME: &str = "New Filter";
pub const DEFAULT_MAX_DISTANCE_NM: &str = "3";

/// Server-assigned rule identifier. Kept in whichever JSON form the server
/// used so it is echoed back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleId {
    Numeric(i64),
    Text(String),
}

impl RuleId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self::Text(id.into())
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RuleId {
    fn from(n: i64) -> Self {
        Self::Numeric(n)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRule {
    pub id: RuleId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation_order: Option<u32>,
}

impl FilterRule {
    #[must_use]
    pub fn has_condition(&self, condition_type: ConditionType) -> bool {
        self.conditions
            .iter()
            .any(|c| c.condition_type() == condition_type)
    }

    /// Types the add-menu should offer: those not already present.
    #[must_use]
    pub fn addable_condition_types(&self) -> Vec<ConditionType> {
        ConditionType::ALL
            .into_iter()
            .filter(|t| !self.has_condition(*t))
            .collect()
    }

    #[must_use]
    pub fn distance_condition_count(&self) -> usize {
        self.conditions.iter().filter(|c| c.is_distance()).count()
    }

    /// False when removing the condition at `index` would leave the rule
    /// without any distance condition, or when the index does not exist.
    #[must_use]
    pub fn can_remove_condition(&self, index: usize) -> bool {
        match self.conditions.get(index) {
            Some(c) if c.is_distance() => self.distance_condition_count() > 1,
            Some(_) => true,
            None => false,
        }
    }
}

/// Body of `POST /api/user/filters`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFilterRule {
    pub name: String,
    pub conditions: Vec<Condition>,
}

impl Default for NewFilterRule {
    fn default() -> Self {
        Self {
            name: DEFAULT_RULE_NAME.to_string(),
            conditions: vec![Condition::max_distance_nm(DEFAULT_MAX_DISTANCE_NM)],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rule(conditions: Vec<Condition>) -> FilterRule {
        FilterRule {
            id: RuleId::from(1),
            name: "r".into(),
            conditions,
            evaluation_order: None,
        }
    }

    #[test]
    fn decodes_numeric_and_text_ids() {
        let a: FilterRule =
            serde_json::from_value(json!({"id": 7, "name": "a", "conditions": []})).expect("decode");
        assert_eq!(a.id, RuleId::Numeric(7));
        assert_eq!(a.id.to_string(), "7");

        let b: FilterRule =
            serde_json::from_value(json!({"id": "abc", "name": "b", "conditions": []}))
                .expect("decode");
        assert_eq!(b.id, RuleId::new("abc"));
    }

    #[test]
    fn evaluation_order_is_omitted_until_set() {
        let mut r = rule(vec![]);
        let v = serde_json::to_value(&r).expect("serialize");
        assert!(v.get("evaluation_order").is_none());

        r.evaluation_order = Some(2);
        let v = serde_json::to_value(&r).expect("serialize");
        assert_eq!(v["evaluation_order"], json!(2));
        assert_eq!(v["id"], json!(1));
    }

    #[test]
    fn default_new_rule_has_one_distance_condition() {
        let body = serde_json::to_value(NewFilterRule::default()).expect("serialize");
        assert_eq!(
            body,
            json!({
                "name": "New Filter",
                "conditions": [{"type": "2d_distance", "value": {"max_distance": "3"}}]
            })
        );
    }

    #[test]
    fn addable_types_exclude_present_ones() {
        let r = rule(vec![
            Condition::max_distance_nm("3"),
            Condition::AircraftType(String::new()),
        ]);
        let addable = r.addable_condition_types();
        assert!(!addable.contains(&ConditionType::Distance2d));
        assert!(!addable.contains(&ConditionType::AircraftType));
        assert_eq!(addable.len(), ConditionType::ALL.len() - 2);
    }

    #[test]
    fn sole_distance_condition_is_not_removable() {
        let r = rule(vec![
            Condition::max_distance_nm("3"),
            Condition::AircraftType("A320".into()),
        ]);
        assert!(!r.can_remove_condition(0));
        assert!(r.can_remove_condition(1));
        assert!(!r.can_remove_condition(2));

        let two = rule(vec![
            Condition::max_distance_nm("3"),
            Condition::Distance3d { max_distance: "5".into() },
        ]);
        assert!(two.can_remove_condition(0));
        assert!(two.can_remove_condition(1));
    }
}
