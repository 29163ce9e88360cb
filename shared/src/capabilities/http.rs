//! Request construction for the REST API.
//!
//! Every call goes through [`ApiRequest::prepare`], which resolves the
//! endpoint against the configured base, decides whether a bearer token is
//! attached, and stamps a request id for log correlation. An authenticated
//! endpoint without a token never reaches the network.

use crux_http::{Http, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;
use uuid::Uuid;

use crate::config::ApiBase;
use crate::error::{AppError, AppResult, ErrorKind};
use crate::event::Event;
use crate::filters::RuleId;

pub const REQUEST_ID_HEADER: &str = "X-Request-Id";
pub const AUTHORIZATION_HEADER: &str = "Authorization";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthPolicy {
    Bearer,
    /// Login and signup: no token is injected and none is required.
    SkipAuth,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Endpoint {
    Login,
    Signup,
    Filters,
    Filter(RuleId),
    Notifications,
    Preferences,
    Location,
}

impl Endpoint {
    /// Unencoded path segments below the API base.
    pub fn segments(&self) -> Vec<String> {
        let fixed: &[&str] = match self {
            Endpoint::Login => &["api", "login"],
            Endpoint::Signup => &["api", "signup"],
            Endpoint::Filters | Endpoint::Filter(_) => &["api", "user", "filters"],
            Endpoint::Notifications => &["api", "user", "notifications"],
            Endpoint::Preferences => &["api", "user", "preferences"],
            Endpoint::Location => &["api", "user", "location"],
        };
        let mut segments: Vec<String> = fixed.iter().map(|s| (*s).to_string()).collect();
        if let Endpoint::Filter(id) = self {
            segments.push(id.to_string());
        }
        segments
    }

    /// Readable path for logs and error context.
    pub fn path(&self) -> String {
        self.segments().join("/")
    }

    pub const fn auth_policy(&self) -> AuthPolicy {
        match self {
            Endpoint::Login | Endpoint::Signup => AuthPolicy::SkipAuth,
            _ => AuthPolicy::Bearer,
        }
    }
}

/// A request that passed the auth check and is ready to hand to the shell.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub endpoint: Endpoint,
    pub url: Url,
    pub request_id: Uuid,
    bearer: Option<SecretString>,
}

impl ApiRequest {
    #[instrument(level = "debug", skip_all, fields(method = method.as_str(), endpoint = ?endpoint))]
    pub fn prepare(
        method: HttpMethod,
        endpoint: Endpoint,
        base: &ApiBase,
        token: Option<&SecretString>,
    ) -> AppResult<Self> {
        let bearer = match endpoint.auth_policy() {
            AuthPolicy::SkipAuth => None,
            AuthPolicy::Bearer => match token {
                Some(token) if !token.expose_secret().is_empty() => Some(token.clone()),
                _ => {
                    return Err(AppError::new(
                        ErrorKind::Authentication,
                        "No token available, sign in required",
                    )
                    .with_context("endpoint", endpoint.path()));
                }
            },
        };

        if let Endpoint::Filter(id) = &endpoint {
            let raw = id.to_string();
            if matches!(raw.as_str(), "" | "." | "..") {
                return Err(AppError::new(ErrorKind::Validation, "Invalid rule id")
                    .with_context("rule_id", raw));
            }
        }

        let url = base.join(endpoint.segments())?;
        Ok(Self {
            method,
            endpoint,
            url,
            request_id: Uuid::new_v4(),
            bearer,
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.bearer.is_some()
    }

    /// Starts the crux_http request with the auth and correlation headers set.
    pub fn start(&self, http: &Http<Event>) -> RequestBuilder<Event> {
        debug!(
            method = self.method.as_str(),
            url = %self.url,
            request_id = %self.request_id,
            authenticated = self.is_authenticated(),
            "sending api request"
        );

        let builder = match self.method {
            HttpMethod::Get => http.get(self.url.as_str()),
            HttpMethod::Post => http.post(self.url.as_str()),
            HttpMethod::Put => http.put(self.url.as_str()),
            HttpMethod::Delete => http.delete(self.url.as_str()),
        }
        .header(REQUEST_ID_HEADER, self.request_id.to_string());

        match &self.bearer {
            Some(token) => builder.header(
                AUTHORIZATION_HEADER,
                format!("Bearer {}", token.expose_secret()),
            ),
            None => builder,
        }
    }
}

/// Unwraps a JSON response body, classifying any failure.
pub fn response_body<T>(result: crux_http::Result<Response<T>>) -> AppResult<T> {
    let mut response = result.map_err(AppError::from)?;
    response.take_body().ok_or_else(|| {
        AppError::new(ErrorKind::Serialization, "Response had no body")
            .with_context("http_status", u16::from(response.status()).to_string())
    })
}

/// For calls whose response body is irrelevant (PUT, DELETE).
pub fn response_status<T>(result: crux_http::Result<Response<T>>) -> AppResult<()> {
    result.map(|_| ()).map_err(AppError::from)
}
