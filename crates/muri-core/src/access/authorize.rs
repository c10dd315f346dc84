//! Authorization request construction and outcome decoding.
//!
//! The unlock check is a single GET against the resolving endpoint:
//!
//! ```text
//! GET <base>/r/<alias...>[?passcode=<string>][&lat=<f64>&lon=<f64>]
//! ```
//!
//! The canonical wire key for longitude is `lon`; the legacy `long` form is
//! never sent. Coordinates are formatted with Rust's shortest round-trip
//! float representation, which preserves full precision.
//!
//! In programmatic mode the request is issued with redirects disabled and
//! the outcome decoded from the response: a redirect back to the unlock page
//! (or a 401/403) is a rejection, any other redirect or a JSON `redirectUrl`
//! body is a grant. In direct mode the caller hands [`Authorizer::authorize_url`]
//! to the browser and the server drives the redirect itself.

use std::fmt;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, LOCATION};
use reqwest::redirect::Policy;
use url::Url;

use super::geolocate::GeoCoordinate;
use super::requirement::{FailureReason, LinkRequirement, RESOLVE_PATH_PREFIX};
use crate::api::client::{USER_AGENT, resolve_base_url};
use crate::config::Config;

/// Credentials collected for one submission attempt.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub passcode: Option<String>,
    pub coordinate: Option<GeoCoordinate>,
}

impl Credentials {
    /// Returns true when every credential the link requires is present:
    /// a non-empty password if required, a resolved coordinate if required.
    pub fn satisfies(&self, requirement: &LinkRequirement) -> bool {
        let password_ok = !requirement.password_required
            || self.passcode.as_deref().is_some_and(|p| !p.is_empty());
        let location_ok = !requirement.location_required || self.coordinate.is_some();
        password_ok && location_ok
    }
}

/// Categories of transport-level authorization failures.
///
/// Rejections are not errors; they come back as [`AuthOutcome::Rejected`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    /// The request exceeded the configured timeout.
    Timeout,
    /// Connection or transfer failure.
    Network,
    /// The response could not be decoded.
    Parse,
    /// Unexpected HTTP status without an actionable body.
    HttpStatus,
}

/// Structured transport error from the authorization request.
#[derive(Debug, Clone)]
pub struct AuthError {
    pub kind: AuthErrorKind,
    pub message: String,
}

impl AuthError {
    pub fn new(kind: AuthErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout() -> Self {
        Self::new(AuthErrorKind::Timeout, "The authorization request timed out.")
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(AuthErrorKind::Network, message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(AuthErrorKind::Parse, message)
    }

    pub fn http_status(status: u16, body: &str) -> Self {
        // Prefer the server's own message when the body carries one.
        if let Ok(json) = serde_json::from_str::<serde_json::Value>(body)
            && let Some(message) = json.get("message").and_then(|v| v.as_str())
        {
            return Self::new(
                AuthErrorKind::HttpStatus,
                format!("HTTP {status}: {message}"),
            );
        }
        Self::new(AuthErrorKind::HttpStatus, format!("HTTP {status}"))
    }

    /// Returns the retryable message shown to the user.
    ///
    /// Everything but a timeout collapses into the generic form; the details
    /// stay in the log.
    pub fn user_message(&self) -> &'static str {
        match self.kind {
            AuthErrorKind::Timeout => "The request timed out. Please try again.",
            _ => "Authentication failed. Please try again.",
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AuthError {}

/// Where a granted request sends the visitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectTarget {
    /// Absolute URL outside the single-page app; opened by full navigation.
    External(Url),
    /// In-app route, resolved against the service base.
    Internal(Url),
}

impl RedirectTarget {
    pub fn url(&self) -> &Url {
        match self {
            RedirectTarget::External(url) | RedirectTarget::Internal(url) => url,
        }
    }

    pub fn is_external(&self) -> bool {
        matches!(self, RedirectTarget::External(_))
    }
}

/// Result of one submission attempt. Owned transiently; discarded after
/// navigation or error display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Granted(RedirectTarget),
    Rejected { reason: FailureReason },
    /// The server bounced to the unlock page without a failure reason: the
    /// link is protected and the bounce says what to collect. Happens when a
    /// bare short link is opened without credentials.
    CredentialsRequired(LinkRequirement),
}

/// Issues authorization checks against the link service.
pub struct Authorizer {
    base_url: Url,
    http: reqwest::Client,
}

impl Authorizer {
    /// Creates an authorizer from the loaded configuration.
    ///
    /// The client follows no redirects (the Location header is part of the
    /// protocol) and applies the configured request timeout.
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = resolve_base_url(config.effective_base_url())?;

        let mut builder = reqwest::Client::builder()
            .redirect(Policy::none())
            .user_agent(USER_AGENT);
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("build authorization client")?;

        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Builds the authorization URL for a requirement and its credentials.
    ///
    /// Parameters are included iff their factor is required; a link with no
    /// requirements resolves with a bare `/r/<alias>` and no query string.
    pub fn authorize_url(&self, requirement: &LinkRequirement, credentials: &Credentials) -> Url {
        let mut url = self.base_url.clone();

        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty();
            segments.push(RESOLVE_PATH_PREFIX);
            segments.extend(requirement.alias_path.split('/').filter(|s| !s.is_empty()));
        }

        {
            let mut pairs = url.query_pairs_mut();
            if requirement.password_required
                && let Some(passcode) = &credentials.passcode
            {
                pairs.append_pair("passcode", passcode);
            }
            if requirement.location_required
                && let Some(coordinate) = &credentials.coordinate
            {
                pairs.append_pair("lat", &coordinate.latitude.to_string());
                pairs.append_pair("lon", &coordinate.longitude.to_string());
            }
        }

        if url.query() == Some("") {
            url.set_query(None);
        }

        url
    }

    /// Submits one authorization attempt and decodes the outcome.
    ///
    /// The caller must have collected every required credential first (see
    /// [`Credentials::satisfies`]); missing values are simply not sent and
    /// the server will reject the attempt.
    pub async fn submit(
        &self,
        requirement: &LinkRequirement,
        credentials: &Credentials,
    ) -> Result<AuthOutcome, AuthError> {
        let url = self.authorize_url(requirement, credentials);
        tracing::debug!(alias = %requirement.alias_path, "submitting authorization request");

        let response = self
            .http
            .get(url.clone())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    AuthError::timeout()
                } else {
                    AuthError::network(format!("authorization request failed: {err}"))
                }
            })?;

        let status = response.status();

        if status.is_redirection() {
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| AuthError::parse("redirect response without a Location header"))?;

            // A bounce back to the unlock page carries the failure reason.
            if let Some(reason) = rejection_reason(location, requirement, &self.base_url) {
                return Ok(AuthOutcome::Rejected { reason });
            }
            // A bounce without a reason announces the link's requirements.
            if let Some(discovered) = discovered_requirement(location, &self.base_url) {
                return Ok(AuthOutcome::CredentialsRequired(discovered));
            }
            let target = classify_redirect(location, &self.base_url)?;
            return Ok(AuthOutcome::Granted(target));
        }

        if status.is_success() {
            let body = response.text().await.map_err(|err| {
                AuthError::network(format!("failed to read authorization response: {err}"))
            })?;
            // JSON redirectUrl wins; fall back to the request URL itself,
            // which the server resolves once credentials checked out.
            let target = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|json| {
                    json.get("redirectUrl")
                        .and_then(|v| v.as_str())
                        .map(str::to_string)
                })
                .unwrap_or_else(|| url.to_string());
            return Ok(AuthOutcome::Granted(classify_redirect(&target, &self.base_url)?));
        }

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Ok(AuthOutcome::Rejected {
                reason: FailureReason::for_requirement(requirement),
            });
        }

        let body = response.text().await.unwrap_or_default();
        Err(AuthError::http_status(status.as_u16(), &body))
    }
}

/// Decodes a rejection bounce: a redirect whose target carries a
/// `reason`/`error` query parameter.
fn rejection_reason(
    location: &str,
    requirement: &LinkRequirement,
    base: &Url,
) -> Option<FailureReason> {
    let url = base.join(location).ok()?;
    let signal = url
        .query_pairs()
        .find(|(key, _)| key == "reason" || key == "error")
        .map(|(_, value)| value.to_string())?;
    Some(FailureReason::derive(
        &signal,
        requirement.password_required,
        requirement.location_required,
    ))
}

/// Decodes a requirement-announcing bounce: a redirect to the unlock page
/// (identified by its `aliasPath` parameter) with no failure reason.
fn discovered_requirement(location: &str, base: &Url) -> Option<LinkRequirement> {
    let url = base.join(location).ok()?;
    if !url.query_pairs().any(|(key, _)| key == "aliasPath") {
        return None;
    }
    super::requirement::parse_requirement(url.query_pairs()).ok()
}

/// Classifies a redirect target as external or in-app.
///
/// Absolute http(s) URLs are external and upgraded to https before the
/// browser sees them; anything else resolves against the service base.
fn classify_redirect(target: &str, base: &Url) -> Result<RedirectTarget, AuthError> {
    if target.starts_with("http://") || target.starts_with("https://") {
        let upgraded = target.replacen("http://", "https://", 1);
        let url = Url::parse(&upgraded)
            .map_err(|err| AuthError::parse(format!("invalid redirect target: {err}")))?;
        return Ok(RedirectTarget::External(url));
    }

    let url = base
        .join(target)
        .map_err(|err| AuthError::parse(format!("invalid redirect target: {err}")))?;
    Ok(RedirectTarget::Internal(url))
}
