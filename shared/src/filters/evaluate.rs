use tracing::debug;

use super::condition::Condition;
use super::rule::FilterRule;
use crate::proximity::{
    angle_above_horizon_deg, closest_approach, AircraftSighting, ClosestApproach, DistanceMetric,
    GeoPoint,
};

/// Predicted geometry of one sighting relative to the observer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Encounter {
    pub surface: ClosestApproach,
    pub slant: ClosestApproach,
    pub angle_deg: f64,
}

impl Encounter {
    /// `None` when the aircraft is on the ground or has no geometric altitude.
    #[must_use]
    pub fn predict(observer: GeoPoint, sighting: &AircraftSighting) -> Option<Self> {
        let start = sighting.airborne_position()?;
        let end = sighting.predicted_position()?;
        let surface = closest_approach(observer, start, end, DistanceMetric::Surface);
        let slant = closest_approach(observer, start, end, DistanceMetric::Slant);
        Some(Self {
            surface,
            slant,
            angle_deg: angle_above_horizon_deg(observer, slant.point),
        })
    }
}

fn matches_list(items: &[&str], value: Option<&str>) -> bool {
    match value {
        Some(v) => items.iter().any(|item| item.eq_ignore_ascii_case(v.trim())),
        None => false,
    }
}

impl Condition {
    /// Whether this condition holds for the sighting. Thresholds that do not
    /// parse never match.
    #[must_use]
    pub fn matches(&self, encounter: &Encounter, sighting: &AircraftSighting) -> bool {
        match self {
            Condition::Distance2d { .. } => self
                .parsed_threshold()
                .is_some_and(|max| encounter.surface.distance_nm <= max),
            Condition::Distance3d { .. } => self
                .parsed_threshold()
                .is_some_and(|max| encounter.slant.distance_nm <= max),
            Condition::AngleAboveHorizon { .. } => self
                .parsed_threshold()
                .is_some_and(|min| encounter.angle_deg > min),
            Condition::AircraftType(_) => {
                matches_list(&self.list_items(), sighting.type_code.as_deref())
            }
            Condition::RegistrationNumber(_) => {
                matches_list(&self.list_items(), sighting.registration.as_deref())
            }
            Condition::AircraftCategory(_) => sighting
                .category
                .as_deref()
                .is_some_and(|code| self.category_selected(code.trim())),
        }
    }
}

impl FilterRule {
    /// A rule matches when every one of its conditions holds. A rule without
    /// conditions never matches.
    #[must_use]
    pub fn matches(&self, observer: GeoPoint, sighting: &AircraftSighting) -> bool {
        if self.conditions.is_empty() {
            return false;
        }
        let Some(encounter) = Encounter::predict(observer, sighting) else {
            debug!(hex = %sighting.hex, "skipping aircraft without airborne position");
            return false;
        };
        self.conditions
            .iter()
            .all(|c| c.matches(&encounter, sighting))
    }
}

/// First rule, in evaluation order, that matches the sighting. Rules without
/// an explicit `evaluation_order` keep their list position behind those with
/// one.
#[must_use]
pub fn first_matching_rule<'a>(
    rules: impl IntoIterator<Item = &'a FilterRule>,
    observer: GeoPoint,
    sighting: &AircraftSighting,
) -> Option<&'a FilterRule> {
    let mut ordered: Vec<(usize, &FilterRule)> = rules.into_iter().enumerate().collect();
    ordered.sort_by_key(|(position, rule)| (rule.evaluation_order.unwrap_or(u32::MAX), *position));
    ordered
        .into_iter()
        .map(|(_, rule)| rule)
        .find(|rule| rule.matches(observer, sighting))
}
