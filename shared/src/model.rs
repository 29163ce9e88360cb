use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::api::{Notification, Preferences, UserLocation};
use crate::config::CoreConfig;
use crate::error::{AppError, ErrorKind};
use crate::filters::FilterList;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    /// Waiting for the stored token to be read.
    #[default]
    Launching,
    Login,
    Signup,
    Notifications,
    Location,
    Preferences,
    Filters,
}

impl Screen {
    pub fn requires_auth(self) -> bool {
        !matches!(self, Screen::Launching | Screen::Login | Screen::Signup)
    }
}

/// Progress of a screen-scoped fetch.
#[derive(Clone, Debug, PartialEq)]
pub enum Loadable<T> {
    Idle,
    Loading,
    Loaded(T),
    Failed(AppError),
}

impl<T> Default for Loadable<T> {
    fn default() -> Self {
        Loadable::Idle
    }
}

impl<T> Loadable<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, Loadable::Loading)
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Loadable::Loaded(v) => Some(v),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&AppError> {
        match self {
            Loadable::Failed(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AuthForm {
    pub submitting: bool,
    pub error: Option<AppError>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FiltersState {
    pub list: FilterList,
    pub load: Loadable<()>,
    pub creating: bool,
    pub create_error: Option<AppError>,
}

/// Preference edits are held as typed text until submitted.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PreferencesForm {
    pub load: Loadable<()>,
    pub topic: String,
    pub min_distance: String,
    pub min_angle: String,
    pub saving: bool,
    pub saved: bool,
    pub error: Option<AppError>,
}

fn format_number(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn parse_non_negative(field: &str, text: &str) -> Result<Option<f64>, AppError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(Some(v)),
        _ => Err(AppError::new(
            ErrorKind::Validation,
            format!("{field} must be a non-negative number"),
        )
        .with_context("field", field)),
    }
}

impl PreferencesForm {
    pub fn fill(&mut self, preferences: &Preferences) {
        self.topic.clone_from(&preferences.topic);
        self.min_distance = format_number(preferences.min_distance);
        self.min_angle = format_number(preferences.min_angle);
        self.saved = false;
    }

    /// Per-field checks before submission.
    pub fn to_preferences(&self) -> Result<Preferences, AppError> {
        Ok(Preferences {
            topic: self.topic.trim().to_string(),
            min_distance: parse_non_negative("Minimum distance", &self.min_distance)?,
            min_angle: parse_non_negative("Minimum angle", &self.min_angle)?,
        })
    }
}

#[derive(Default)]
pub struct Model {
    pub config: CoreConfig,
    pub screen: Screen,
    /// Bumped on every navigation; screen fetches carry the value they were
    /// started with and are ignored once it changes.
    pub epoch: u64,
    pub token: Option<SecretString>,
    pub auth: AuthForm,
    pub filters: FiltersState,
    pub notifications: Loadable<Vec<Notification>>,
    pub location: Loadable<UserLocation>,
    pub preferences: PreferencesForm,
    /// App-wide banner, e.g. session expiry.
    pub error: Option<AppError>,
}

impl Model {
    pub fn is_authenticated(&self) -> bool {
        self.token
            .as_ref()
            .is_some_and(|t| !t.expose_secret().is_empty())
    }

    /// Switches screen and invalidates any in-flight screen fetches.
    pub fn enter(&mut self, screen: Screen) -> u64 {
        self.screen = screen;
        self.epoch = self.epoch.wrapping_add(1);
        self.epoch
    }

    pub fn is_current(&self, epoch: u64) -> bool {
        self.epoch == epoch
    }

    /// Drops the token and everything fetched with it.
    pub fn sign_out(&mut self) {
        self.token = None;
        self.auth = AuthForm::default();
        self.filters = FiltersState::default();
        self.notifications = Loadable::Idle;
        self.location = Loadable::Idle;
        self.preferences = PreferencesForm::default();
    }
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("screen", &self.screen)
            .field("epoch", &self.epoch)
            .field("authenticated", &self.is_authenticated())
            .field("rules", &self.filters.list.len())
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}
