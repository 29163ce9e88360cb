use chrono::Utc;
use crux_http::RequestBuilder;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, error, info, warn};

use crate::api::{AuthTokenResponse, Credentials, NotificationsResponse, Preferences, UserLocation};
use crate::capabilities::http::{response_body, response_status};
use crate::capabilities::kv::{auth_token_key, decode_token, encode_token};
use crate::capabilities::{ApiRequest, Capabilities, Endpoint, HttpMethod};
use crate::config::ApiBase;
use crate::error::{AppError, AppResult, EditError, ErrorKind, ErrorSeverity};
use crate::event::{Event, Sensitive};
use crate::filters::{FilterList, FilterRule, NewFilterRule, PendingSave, RuleId};
use crate::model::{AuthForm, Loadable, Model, Screen};
use crate::view::{build_view, ViewModel};

pub const LOGIN_FAILED_MESSAGE: &str = "An error occurred during login.";
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please sign in again.";

#[derive(Default)]
pub struct App;

impl App {
    /// Resolves an endpoint against the configured base and attaches the
    /// session token when the endpoint needs one.
    fn api(
        model: &Model,
        caps: &Capabilities,
        method: HttpMethod,
        endpoint: Endpoint,
    ) -> AppResult<RequestBuilder<Event>> {
        let base = ApiBase::try_from(&model.config)?;
        let request = ApiRequest::prepare(method, endpoint, &base, model.token.as_ref())?;
        Ok(request.start(&caps.http))
    }

    fn expire_session(model: &mut Model, caps: &Capabilities) {
        warn!(screen = ?model.screen, "session rejected, returning to login");
        caps.key_value.delete(auth_token_key(), Event::TokenCleared);
        model.sign_out();
        model.enter(Screen::Login);
        model.error = Some(AppError::new(
            ErrorKind::Authentication,
            SESSION_EXPIRED_MESSAGE,
        ));
    }

    /// Authentication failures end the session; anything else is handed to
    /// `place` so the owning screen or rule can show it.
    fn handle_api_error(
        model: &mut Model,
        caps: &Capabilities,
        error: AppError,
        place: impl FnOnce(&mut Model, AppError),
    ) {
        if error.requires_reauthentication() {
            Self::expire_session(model, caps);
        } else {
            if error.severity == ErrorSeverity::Fatal {
                error!(code = error.code(), status = ?error.status, "request failed");
            } else {
                warn!(code = error.code(), status = ?error.status, "request failed");
            }
            place(model, error);
        }
    }

    fn navigate(model: &mut Model, caps: &Capabilities, screen: Screen) {
        let target = if screen.requires_auth() && !model.is_authenticated() {
            debug!(requested = ?screen, "not signed in, redirecting to login");
            Screen::Login
        } else {
            screen
        };

        let epoch = model.enter(target);
        debug!(screen = ?target, epoch, "entered screen");

        match target {
            Screen::Launching => {}
            Screen::Login | Screen::Signup => model.auth = AuthForm::default(),
            Screen::Notifications => Self::fetch_notifications(model, caps),
            Screen::Location => Self::fetch_location(model, caps),
            Screen::Preferences => Self::fetch_preferences(model, caps),
            Screen::Filters => Self::fetch_filters(model, caps),
        }
    }

    // --- session ---

    fn submit_credentials(
        model: &mut Model,
        caps: &Capabilities,
        endpoint: Endpoint,
        email: &str,
        password: &Sensitive,
    ) {
        if model.auth.submitting {
            debug!("credentials already submitted");
            return;
        }
        if email.trim().is_empty() || password.is_empty() {
            model.auth.error = Some(AppError::new(
                ErrorKind::Validation,
                "Email and password are required",
            ));
            return;
        }

        let request = Self::api(model, caps, HttpMethod::Post, endpoint).and_then(|builder| {
            builder
                .body_json(&Credentials::new(email.trim(), password))
                .map_err(AppError::from)
        });

        match request {
            Ok(builder) => {
                model.auth.submitting = true;
                model.auth.error = None;
                builder
                    .expect_json::<AuthTokenResponse>()
                    .send(|result| Event::AuthResponse(Box::new(result)));
            }
            Err(e) => model.auth.error = Some(e),
        }
    }

    /// Login and signup failures show the server's explanation when it sent
    /// one, a generic message otherwise.
    fn auth_failure(error: &AppError) -> AppError {
        let message = error
            .server_message()
            .map_or_else(|| LOGIN_FAILED_MESSAGE.to_string(), str::to_string);
        let mut failure = AppError::new(ErrorKind::Validation, message).with_internal(error.to_string());
        failure.status = error.status;
        failure
    }

    // --- screen fetches ---

    fn fetch_filters(model: &mut Model, caps: &Capabilities) {
        let epoch = model.epoch;
        match Self::api(model, caps, HttpMethod::Get, Endpoint::Filters) {
            Ok(builder) => {
                model.filters.load = Loadable::Loading;
                builder
                    .expect_json::<Vec<FilterRule>>()
                    .send(move |result| Event::FiltersLoaded {
                        epoch,
                        result: Box::new(result),
                    });
            }
            Err(e) => Self::handle_api_error(model, caps, e, |m, e| {
                m.filters.load = Loadable::Failed(e);
            }),
        }
    }

    fn fetch_notifications(model: &mut Model, caps: &Capabilities) {
        let epoch = model.epoch;
        match Self::api(model, caps, HttpMethod::Get, Endpoint::Notifications) {
            Ok(builder) => {
                model.notifications = Loadable::Loading;
                builder
                    .expect_json::<NotificationsResponse>()
                    .send(move |result| Event::NotificationsLoaded {
                        epoch,
                        result: Box::new(result),
                    });
            }
            Err(e) => Self::handle_api_error(model, caps, e, |m, e| {
                m.notifications = Loadable::Failed(e);
            }),
        }
    }

    fn fetch_location(model: &mut Model, caps: &Capabilities) {
        let epoch = model.epoch;
        match Self::api(model, caps, HttpMethod::Get, Endpoint::Location) {
            Ok(builder) => {
                model.location = Loadable::Loading;
                builder
                    .expect_json::<UserLocation>()
                    .send(move |result| Event::LocationLoaded {
                        epoch,
                        result: Box::new(result),
                    });
            }
            Err(e) => Self::handle_api_error(model, caps, e, |m, e| {
                m.location = Loadable::Failed(e);
            }),
        }
    }

    fn fetch_preferences(model: &mut Model, caps: &Capabilities) {
        let epoch = model.epoch;
        match Self::api(model, caps, HttpMethod::Get, Endpoint::Preferences) {
            Ok(builder) => {
                model.preferences.load = Loadable::Loading;
                model.preferences.saved = false;
                builder
                    .expect_json::<Preferences>()
                    .send(move |result| Event::PreferencesLoaded {
                        epoch,
                        result: Box::new(result),
                    });
            }
            Err(e) => Self::handle_api_error(model, caps, e, |m, e| {
                m.preferences.load = Loadable::Failed(e);
            }),
        }
    }

    fn is_stale(model: &Model, epoch: u64, what: &'static str) -> bool {
        let stale = !model.is_current(epoch);
        if stale {
            debug!(what, epoch, current = model.epoch, "dropping response for a screen no longer shown");
        }
        stale
    }

    // --- filter editor ---

    fn apply_edit(model: &mut Model, edit: impl FnOnce(&mut FilterList) -> Result<(), EditError>) {
        if let Err(e) = edit(&mut model.filters.list) {
            warn!(error = %e, "filter edit rejected");
            model.error = Some(e.into());
        }
    }

    fn send_save(model: &mut Model, caps: &Capabilities, pending: PendingSave) {
        let PendingSave { rule, revision } = pending;
        let id = rule.id.clone();
        let request = Self::api(model, caps, HttpMethod::Put, Endpoint::Filter(id.clone()))
            .and_then(|builder| builder.body_json(&rule).map_err(AppError::from));

        match request {
            Ok(builder) => {
                info!(rule_id = %id, revision, "saving filter rule");
                builder.send(move |result| Event::RuleSaved {
                    id,
                    revision,
                    result: Box::new(result),
                });
            }
            Err(e) => Self::record_save(model, caps, &id, revision, Err(e)),
        }
    }

    fn record_save(
        model: &mut Model,
        caps: &Capabilities,
        id: &RuleId,
        revision: u64,
        outcome: AppResult<()>,
    ) {
        match outcome {
            Err(e) if e.requires_reauthentication() => Self::expire_session(model, caps),
            outcome => {
                if let Err(e) = &outcome {
                    warn!(rule_id = %id, code = e.code(), "filter rule save failed");
                }
                if let Err(e) = model.filters.list.finish_save(id, revision, outcome) {
                    debug!(error = %e, "save result for a rule no longer listed");
                }
            }
        }
    }

    fn send_delete(model: &mut Model, caps: &Capabilities, id: RuleId) {
        match Self::api(model, caps, HttpMethod::Delete, Endpoint::Filter(id.clone())) {
            Ok(builder) => {
                info!(rule_id = %id, "deleting filter rule");
                builder.send(move |result| Event::RuleDeleted {
                    id,
                    result: Box::new(result),
                });
            }
            Err(e) => Self::record_delete(model, caps, &id, Err(e)),
        }
    }

    fn record_delete(model: &mut Model, caps: &Capabilities, id: &RuleId, outcome: AppResult<()>) {
        match outcome {
            Err(e) if e.requires_reauthentication() => Self::expire_session(model, caps),
            outcome => match model.filters.list.finish_delete(id, outcome) {
                Ok(Some(_)) => info!(rule_id = %id, "filter rule deleted"),
                Ok(None) => warn!(rule_id = %id, "filter rule delete failed"),
                Err(e) => debug!(error = %e, "delete result for a rule no longer listed"),
            },
        }
    }
}

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        debug!(
            event = event.name(),
            user_initiated = event.is_user_initiated(),
            "update"
        );

        match event {
            Event::AppStarted => {
                model.enter(Screen::Launching);
                caps.key_value.get(auth_token_key(), Event::TokenRestored);
                caps.render.render();
            }

            Event::Configure(config) => {
                match ApiBase::parse(&config.api_base_url) {
                    Ok(base) => {
                        info!(api_base = base.as_str(), "core configured");
                        model.config = config;
                    }
                    Err(e) => {
                        warn!(error = %e, "configuration rejected");
                        model.error = Some(e.into());
                    }
                }
                caps.render.render();
            }

            Event::Navigate(screen) => {
                Self::navigate(model, caps, screen);
                caps.render.render();
            }

            Event::DismissError => {
                model.error = None;
                caps.render.render();
            }

            Event::TokenRestored(result) => {
                let restored = result
                    .map_err(|e| AppError::storage(&e))
                    .and_then(decode_token);
                match restored {
                    Ok(Some(token)) => {
                        info!("restored session");
                        model.token = Some(token);
                        Self::navigate(model, caps, Screen::Notifications);
                    }
                    Ok(None) => Self::navigate(model, caps, Screen::Login),
                    Err(e) => {
                        warn!(code = e.code(), "could not read stored session");
                        model.error = Some(e);
                        Self::navigate(model, caps, Screen::Login);
                    }
                }
                caps.render.render();
            }

            // --- session ---
            Event::LoginSubmitted { email, password } => {
                Self::submit_credentials(model, caps, Endpoint::Login, &email, &password);
                caps.render.render();
            }

            Event::SignupSubmitted { email, password } => {
                Self::submit_credentials(model, caps, Endpoint::Signup, &email, &password);
                caps.render.render();
            }

            Event::AuthResponse(result) => {
                model.auth.submitting = false;
                let token = response_body(*result).and_then(|body| {
                    let token = SecretString::new(body.access_token);
                    if token.expose_secret().trim().is_empty() {
                        Err(AppError::new(ErrorKind::Serialization, "Response had no access token"))
                    } else {
                        Ok(token)
                    }
                });

                match token {
                    Ok(token) => {
                        info!("signed in");
                        caps.key_value
                            .set(auth_token_key(), encode_token(&token), Event::TokenStored);
                        model.token = Some(token);
                        model.error = None;
                        Self::navigate(model, caps, Screen::Notifications);
                    }
                    Err(e) => {
                        warn!(code = e.code(), status = ?e.status, "sign in failed");
                        model.auth.error = Some(Self::auth_failure(&e));
                    }
                }
                caps.render.render();
            }

            Event::TokenStored(result) => {
                if let Err(e) = result {
                    warn!(error = %e, "could not persist session token");
                    model.error = Some(AppError::storage(&e));
                    caps.render.render();
                }
            }

            Event::TokenCleared(result) => {
                if let Err(e) = result {
                    warn!(error = %e, "could not remove stored session token");
                }
            }

            Event::LogoutRequested => {
                info!("signing out");
                caps.key_value.delete(auth_token_key(), Event::TokenCleared);
                model.sign_out();
                model.error = None;
                Self::navigate(model, caps, Screen::Login);
                caps.render.render();
            }

            // --- filter editor ---
            Event::LoadFilters => {
                Self::fetch_filters(model, caps);
                caps.render.render();
            }

            Event::FiltersLoaded { epoch, result } => {
                if Self::is_stale(model, epoch, "filters") {
                    return;
                }
                match response_body(*result) {
                    Ok(rules) => {
                        info!(count = rules.len(), "filter rules loaded");
                        model.filters.list.replace_all(rules);
                        model.filters.load = Loadable::Loaded(());
                    }
                    Err(e) => Self::handle_api_error(model, caps, e, |m, e| {
                        m.filters.load = Loadable::Failed(e);
                    }),
                }
                caps.render.render();
            }

            Event::AddRule => {
                if model.filters.creating {
                    debug!("rule creation already in flight");
                    return;
                }
                let request = Self::api(model, caps, HttpMethod::Post, Endpoint::Filters)
                    .and_then(|builder| {
                        builder
                            .body_json(&NewFilterRule::default())
                            .map_err(AppError::from)
                    });
                match request {
                    Ok(builder) => {
                        model.filters.creating = true;
                        model.filters.create_error = None;
                        builder
                            .expect_json::<FilterRule>()
                            .send(|result| Event::RuleCreated(Box::new(result)));
                    }
                    Err(e) => Self::handle_api_error(model, caps, e, |m, e| {
                        m.filters.create_error = Some(e);
                    }),
                }
                caps.render.render();
            }

            Event::RuleCreated(result) => {
                model.filters.creating = false;
                if !model.is_authenticated() {
                    debug!("dropping created rule after sign out");
                    return;
                }
                match response_body(*result) {
                    Ok(rule) => {
                        info!(rule_id = %rule.id, "filter rule created");
                        model.filters.list.push_created(rule);
                    }
                    Err(e) => Self::handle_api_error(model, caps, e, |m, e| {
                        m.filters.create_error = Some(e);
                    }),
                }
                caps.render.render();
            }

            Event::RenameRule { id, name } => {
                Self::apply_edit(model, |list| list.update_name(&id, name));
                caps.render.render();
            }

            Event::AddCondition { id, condition_type } => {
                let present = model
                    .filters
                    .list
                    .get(&id)
                    .is_some_and(|entry| entry.rule.has_condition(condition_type));
                Self::apply_edit(model, |list| {
                    if present {
                        Err(EditError::DuplicateCondition(condition_type))
                    } else {
                        list.add_condition(&id, condition_type)
                    }
                });
                caps.render.render();
            }

            Event::RemoveCondition { id, index } => {
                let guarded = model.filters.list.get(&id).is_some_and(|entry| {
                    index < entry.rule.conditions.len() && !entry.rule.can_remove_condition(index)
                });
                Self::apply_edit(model, |list| {
                    if guarded {
                        Err(EditError::LastDistanceCondition)
                    } else {
                        list.remove_condition(&id, index).map(|_| ())
                    }
                });
                caps.render.render();
            }

            Event::UpdateConditionValue { id, index, value } => {
                Self::apply_edit(model, |list| list.update_condition_value(&id, index, value));
                caps.render.render();
            }

            Event::ReorderRules { order } => {
                Self::apply_edit(model, |list| list.reorder(&order));
                caps.render.render();
            }

            Event::MoveRule { from, to } => {
                Self::apply_edit(model, |list| list.move_rule(from, to));
                caps.render.render();
            }

            Event::SaveRule { id } => {
                match model.filters.list.begin_save(&id) {
                    Ok(pending) => Self::send_save(model, caps, pending),
                    Err(EditError::SaveInFlight(_)) => {
                        debug!(rule_id = %id, "save already in flight");
                    }
                    Err(e) => {
                        warn!(error = %e, "save rejected");
                        model.error = Some(e.into());
                    }
                }
                caps.render.render();
            }

            Event::RuleSaved {
                id,
                revision,
                result,
            } => {
                Self::record_save(model, caps, &id, revision, response_status(*result));
                caps.render.render();
            }

            Event::DeleteRule { id } => {
                match model.filters.list.begin_delete(&id) {
                    Ok(()) => Self::send_delete(model, caps, id),
                    Err(EditError::DeleteInFlight(_)) => {
                        debug!(rule_id = %id, "delete already in flight");
                    }
                    Err(e) => {
                        warn!(error = %e, "delete rejected");
                        model.error = Some(e.into());
                    }
                }
                caps.render.render();
            }

            Event::RuleDeleted { id, result } => {
                Self::record_delete(model, caps, &id, response_status(*result));
                caps.render.render();
            }

            Event::DismissRuleError { id } => {
                Self::apply_edit(model, |list| list.clear_error(&id));
                caps.render.render();
            }

            // --- notifications & location ---
            Event::LoadNotifications => {
                Self::fetch_notifications(model, caps);
                caps.render.render();
            }

            Event::NotificationsLoaded { epoch, result } => {
                if Self::is_stale(model, epoch, "notifications") {
                    return;
                }
                match response_body(*result) {
                    Ok(body) => {
                        debug!(count = body.notifications.len(), "notifications loaded");
                        model.notifications = Loadable::Loaded(body.notifications);
                    }
                    Err(e) => Self::handle_api_error(model, caps, e, |m, e| {
                        m.notifications = Loadable::Failed(e);
                    }),
                }
                caps.render.render();
            }

            Event::LoadLocation => {
                Self::fetch_location(model, caps);
                caps.render.render();
            }

            Event::LocationLoaded { epoch, result } => {
                if Self::is_stale(model, epoch, "location") {
                    return;
                }
                match response_body(*result) {
                    Ok(location) => model.location = Loadable::Loaded(location),
                    Err(e) => Self::handle_api_error(model, caps, e, |m, e| {
                        m.location = Loadable::Failed(e);
                    }),
                }
                caps.render.render();
            }

            // --- preferences ---
            Event::LoadPreferences => {
                Self::fetch_preferences(model, caps);
                caps.render.render();
            }

            Event::PreferencesLoaded { epoch, result } => {
                if Self::is_stale(model, epoch, "preferences") {
                    return;
                }
                match response_body(*result) {
                    Ok(preferences) => {
                        model.preferences.fill(&preferences);
                        model.preferences.load = Loadable::Loaded(());
                    }
                    Err(e) => Self::handle_api_error(model, caps, e, |m, e| {
                        m.preferences.load = Loadable::Failed(e);
                    }),
                }
                caps.render.render();
            }

            Event::PreferencesTopicChanged(topic) => {
                model.preferences.topic = topic;
                model.preferences.saved = false;
                caps.render.render();
            }

            Event::PreferencesMinDistanceChanged(text) => {
                model.preferences.min_distance = text;
                model.preferences.saved = false;
                caps.render.render();
            }

            Event::PreferencesMinAngleChanged(text) => {
                model.preferences.min_angle = text;
                model.preferences.saved = false;
                caps.render.render();
            }

            Event::SavePreferences => {
                if model.preferences.saving {
                    debug!("preferences save already in flight");
                    return;
                }
                let request = model.preferences.to_preferences().and_then(|preferences| {
                    Self::api(model, caps, HttpMethod::Post, Endpoint::Preferences).and_then(
                        |builder| builder.body_json(&preferences).map_err(AppError::from),
                    )
                });
                match request {
                    Ok(builder) => {
                        model.preferences.saving = true;
                        model.preferences.saved = false;
                        model.preferences.error = None;
                        builder.send(|result| Event::PreferencesSaved(Box::new(result)));
                    }
                    Err(e) => Self::handle_api_error(model, caps, e, |m, e| {
                        m.preferences.error = Some(e);
                    }),
                }
                caps.render.render();
            }

            Event::PreferencesSaved(result) => {
                model.preferences.saving = false;
                match response_status(*result) {
                    Ok(()) => {
                        info!("preferences saved");
                        model.preferences.saved = true;
                    }
                    Err(e) => Self::handle_api_error(model, caps, e, |m, e| {
                        m.preferences.error = Some(e);
                    }),
                }
                caps.render.render();
            }
        }
    }

    fn view(&self, model: &Model) -> ViewModel {
        build_view(model, Utc::now())
    }
}
