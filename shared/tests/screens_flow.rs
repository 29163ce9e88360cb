use crux_core::testing::AppTester;
use crux_core::Request;
use crux_http::protocol::{HttpRequest, HttpResponse, HttpResult};
use secrecy::SecretString;
use serde_json::json;
use shared::{App, Effect, ErrorKind, Event, Model, Screen, ViewState};

fn http_request(effects: impl IntoIterator<Item = Effect>) -> Request<HttpRequest> {
    effects
        .into_iter()
        .find_map(Effect::into_http)
        .expect("expected an http request")
}

fn signed_in() -> Model {
    Model {
        token: Some(SecretString::new("jwt-123".to_string())),
        ..Model::default()
    }
}

fn open(app: &AppTester<App, Effect>, model: &mut Model, screen: Screen, body: serde_json::Value) {
    let update = app.update(Event::Navigate(screen), model);
    let mut request = http_request(update.effects);
    let update = app
        .resolve(&mut request, HttpResult::Ok(HttpResponse::ok().json(body).build()))
        .expect("resolve screen fetch");
    for event in update.events {
        app.update(event, model);
    }
}

mod notifications {
    use super::*;

    #[test]
    fn lists_notification_text() {
        let app = AppTester::<App, Effect>::default();
        let mut model = signed_in();
        open(
            &app,
            &mut model,
            Screen::Notifications,
            json!({"notifications": [
                {"text": "B738 overhead at 2.1 nm", "timestamp": "2024-05-01T12:00:00Z"},
                {"text": "A388 approaching", "timestamp": 1_714_564_860_000_i64}
            ]}),
        );

        let view = app.view(&model);
        let ViewState::Notifications { loading, items, error } = view.state else {
            panic!("expected notifications view");
        };
        assert!(!loading);
        assert!(error.is_none());
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].text, "B738 overhead at 2.1 nm");
        assert_eq!(items[0].timestamp, "2024-05-01 12:00:00 UTC");
    }

    #[test]
    fn server_failure_is_retryable() {
        let app = AppTester::<App, Effect>::default();
        let mut model = signed_in();

        let update = app.update(Event::Navigate(Screen::Notifications), &mut model);
        let mut request = http_request(update.effects);
        let update = app
            .resolve(&mut request, HttpResult::Ok(HttpResponse::status(502).build()))
            .expect("resolve notifications");
        for event in update.events {
            app.update(event, &mut model);
        }

        let error = model.notifications.error().expect("error");
        assert_eq!(error.kind, ErrorKind::Server);
        assert!(error.is_retryable());
    }
}

mod location {
    use super::*;

    #[test]
    fn shows_marker_with_fixed_span() {
        let app = AppTester::<App, Effect>::default();
        let mut model = signed_in();
        open(
            &app,
            &mut model,
            Screen::Location,
            json!({"latitude": 51.4700, "longitude": -0.4543, "reported_at": "2024-05-01T12:00:00Z"}),
        );

        let view = app.view(&model);
        let ViewState::Location { marker: Some(marker), .. } = view.state else {
            panic!("expected a location marker");
        };
        assert!((marker.latitude - 51.47).abs() < 1e-9);
        assert!((marker.longitude_delta - 0.01).abs() < 1e-12);
        assert!(marker.last_updated.ends_with("minutes ago"));
    }
}

mod preferences {
    use super::*;

    fn loaded(app: &AppTester<App, Effect>) -> Model {
        let mut model = signed_in();
        open(
            app,
            &mut model,
            Screen::Preferences,
            json!({"topic": "airshow-alerts", "min_distance": 2.0, "min_angle": 15.5}),
        );
        model
    }

    #[test]
    fn load_fills_the_form() {
        let app = AppTester::<App, Effect>::default();
        let model = loaded(&app);

        assert_eq!(model.preferences.topic, "airshow-alerts");
        assert_eq!(model.preferences.min_distance, "2");
        assert_eq!(model.preferences.min_angle, "15.5");
    }

    #[test]
    fn invalid_number_is_not_submitted() {
        let app = AppTester::<App, Effect>::default();
        let mut model = loaded(&app);

        app.update(Event::PreferencesMinAngleChanged("-3".into()), &mut model);
        let update = app.update(Event::SavePreferences, &mut model);

        assert!(update.effects.iter().all(|e| !e.is_http()));
        assert!(!model.preferences.saving);
        assert!(matches!(
            model.preferences.error.as_ref().map(|e| e.kind),
            Some(ErrorKind::Validation)
        ));
    }

    #[test]
    fn save_posts_parsed_values() {
        let app = AppTester::<App, Effect>::default();
        let mut model = loaded(&app);

        app.update(Event::PreferencesMinDistanceChanged("4.5".into()), &mut model);
        app.update(Event::PreferencesMinAngleChanged(String::new()), &mut model);
        let update = app.update(Event::SavePreferences, &mut model);
        assert!(model.preferences.saving);

        let mut request = http_request(update.effects);
        assert_eq!(request.operation.method, "POST");
        assert_eq!(
            request.operation.url,
            "http://localhost:7878/api/user/preferences"
        );
        let body: serde_json::Value =
            serde_json::from_slice(&request.operation.body).expect("json body");
        assert_eq!(
            body,
            json!({"topic": "airshow-alerts", "min_distance": 4.5, "min_angle": null})
        );

        let update = app
            .resolve(&mut request, HttpResult::Ok(HttpResponse::ok().build()))
            .expect("resolve save");
        for event in update.events {
            app.update(event, &mut model);
        }

        assert!(!model.preferences.saving);
        assert!(model.preferences.saved);
    }
}
