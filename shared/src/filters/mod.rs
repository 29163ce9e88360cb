//! Filter rules: the condition model, the local editor and local evaluation
//! against aircraft sightings.

mod condition;
mod editor;
mod evaluate;
mod rule;

pub use self::condition::{Condition, ConditionDecodeError, ConditionType, CATEGORY_OPTIONS};
pub use self::editor::{FilterList, PendingSave, RuleEntry};
pub use self::evaluate::{first_matching_rule, Encounter};
pub use self::rule::{FilterRule, NewFilterRule, RuleId, DEFAULT_MAX_DISTANCE_NM, DEFAULT_RULE_NAME};
