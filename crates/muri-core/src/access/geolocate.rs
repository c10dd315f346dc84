//! Best-effort geolocation through an ordered fallback chain.
//!
//! GPS acquisition is flaky: permission can be denied, the fix can time out,
//! the platform may have no location capability at all. The chain bounds the
//! total wait and always produces *some* coordinate unless permission is
//! denied or every strategy is exhausted:
//!
//! 1. GPS, high accuracy, 10 s timeout
//! 2. GPS, low accuracy, 15 s timeout (only after a transient GPS failure)
//! 3. IP geolocation lookup (~5 km confidence)
//!
//! Permission denial is a hard stop at any point: the chain fails with a
//! permission-specific error and never consults the IP fallback.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use serde::Deserialize;

use crate::config::Config;

/// Assumed confidence radius of an IP-based fix, in meters.
pub const IP_ACCURACY_M: f64 = 5000.0;

const GPS_HIGH_TIMEOUT: Duration = Duration::from_secs(10);
const GPS_LOW_TIMEOUT: Duration = Duration::from_secs(15);

/// Which strategy produced a coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    GpsHigh,
    GpsLow,
    Ip,
    /// Supplied by the user (CLI flags), not acquired.
    Manual,
}

impl Source {
    /// Returns the short display name for this source.
    pub fn display_name(&self) -> &'static str {
        match self {
            Source::GpsHigh => "gps",
            Source::GpsLow => "gps (low accuracy)",
            Source::Ip => "ip lookup",
            Source::Manual => "manual",
        }
    }
}

/// A resolved position. Held in UI state until submission or exit,
/// never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoCoordinate {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_m: Option<f64>,
    pub source: Source,
}

/// Categories of acquisition failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoErrorKind {
    /// The user or platform denied location access. Hard stop.
    PermissionDenied,
    /// No fix could be produced (no signal, capability error).
    Unavailable,
    /// The attempt exceeded its time budget.
    Timeout,
    /// Every strategy failed.
    Exhausted,
}

impl fmt::Display for GeoErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeoErrorKind::PermissionDenied => write!(f, "permission_denied"),
            GeoErrorKind::Unavailable => write!(f, "unavailable"),
            GeoErrorKind::Timeout => write!(f, "timeout"),
            GeoErrorKind::Exhausted => write!(f, "exhausted"),
        }
    }
}

/// Structured acquisition error with kind and a user-facing message.
#[derive(Debug, Clone)]
pub struct GeoError {
    pub kind: GeoErrorKind,
    pub message: String,
}

impl GeoError {
    pub fn new(kind: GeoErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn permission_denied() -> Self {
        Self::new(
            GeoErrorKind::PermissionDenied,
            "Location permission was denied. Allow location access in your device settings and try again.",
        )
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(GeoErrorKind::Unavailable, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(GeoErrorKind::Timeout, message)
    }

    pub fn exhausted() -> Self {
        Self::new(
            GeoErrorKind::Exhausted,
            "Unable to determine your location. Check your device location settings and try again.",
        )
    }
}

impl fmt::Display for GeoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for GeoError {}

/// A raw fix reported by a platform location source.
#[derive(Debug, Clone, Deserialize)]
pub struct RawFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Reported accuracy in meters, when the platform provides one.
    #[serde(default)]
    pub accuracy: Option<f64>,
}

/// Platform location capability.
///
/// The production implementation shells out to a configured command; tests
/// use scripted fakes so the fallback order is verifiable without hardware.
pub trait GpsSource: Send + Sync {
    /// Requests a fix. The caller bounds the wait with a timeout; an
    /// implementation should classify its own failures (notably
    /// [`GeoErrorKind::PermissionDenied`], which stops the whole chain).
    fn fix(&self, high_accuracy: bool) -> BoxFuture<'_, Result<RawFix, GeoError>>;
}

/// GPS source that runs the configured `location_command`.
///
/// The command is invoked with a single argument, `high` or `low`, and must
/// print a JSON object with `latitude`/`longitude` (and optionally
/// `accuracy`) on stdout. Exit code 2 signals denied permission.
pub struct CommandGps {
    program: String,
    args: Vec<String>,
}

impl CommandGps {
    pub fn new(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }
}

impl GpsSource for CommandGps {
    fn fix(&self, high_accuracy: bool) -> BoxFuture<'_, Result<RawFix, GeoError>> {
        Box::pin(async move {
            let mode = if high_accuracy { "high" } else { "low" };
            let output = tokio::process::Command::new(&self.program)
                .args(&self.args)
                .arg(mode)
                .output()
                .await
                .map_err(|err| {
                    GeoError::unavailable(format!("location command failed to start: {err}"))
                })?;

            if output.status.code() == Some(2) {
                return Err(GeoError::permission_denied());
            }
            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(GeoError::unavailable(format!(
                    "location command exited with {}: {}",
                    output.status,
                    stderr.trim()
                )));
            }

            serde_json::from_slice(&output.stdout).map_err(|err| {
                GeoError::unavailable(format!("location command produced invalid output: {err}"))
            })
        })
    }
}

/// Drives the acquisition chain.
pub struct Acquirer {
    gps: Option<Arc<dyn GpsSource>>,
    http: reqwest::Client,
    ip_lookup_url: String,
}

impl Acquirer {
    /// Creates an acquirer from explicit parts.
    pub fn new(gps: Option<Arc<dyn GpsSource>>, ip_lookup_url: impl Into<String>) -> Self {
        Self {
            gps,
            http: reqwest::Client::new(),
            ip_lookup_url: ip_lookup_url.into(),
        }
    }

    /// Creates an acquirer from the loaded configuration.
    ///
    /// With no `location_command` configured the platform location
    /// capability is absent and the chain starts at the IP fallback.
    pub fn from_config(config: &Config) -> Self {
        let gps = config
            .location_command
            .as_deref()
            .and_then(CommandGps::new)
            .map(|gps| Arc::new(gps) as Arc<dyn GpsSource>);
        Self::new(gps, config.ip_lookup_url.clone())
    }

    /// Obtains a best-effort coordinate, walking the fallback chain.
    ///
    /// Fails only on permission denial or when every strategy is exhausted;
    /// the latter carries a single check-your-settings message.
    pub async fn acquire(&self) -> Result<GeoCoordinate, GeoError> {
        if let Some(gps) = &self.gps {
            let attempts = [
                (true, GPS_HIGH_TIMEOUT, Source::GpsHigh),
                (false, GPS_LOW_TIMEOUT, Source::GpsLow),
            ];
            for (high_accuracy, limit, source) in attempts {
                match tokio::time::timeout(limit, gps.fix(high_accuracy)).await {
                    Ok(Ok(fix)) => {
                        return Ok(GeoCoordinate {
                            latitude: fix.latitude,
                            longitude: fix.longitude,
                            accuracy_m: fix.accuracy,
                            source,
                        });
                    }
                    Ok(Err(err)) if err.kind == GeoErrorKind::PermissionDenied => {
                        // Hard stop: retrying or falling back to IP would
                        // not honor the denial.
                        return Err(err);
                    }
                    Ok(Err(err)) => {
                        tracing::warn!(%err, high_accuracy, "gps fix failed, falling back");
                    }
                    Err(_) => {
                        tracing::warn!(high_accuracy, "gps fix timed out, falling back");
                    }
                }
            }
        }

        match self.ip_lookup().await {
            Ok(coordinate) => Ok(coordinate),
            Err(err) => {
                tracing::warn!(%err, "ip geolocation fallback failed");
                Err(GeoError::exhausted())
            }
        }
    }

    async fn ip_lookup(&self) -> Result<GeoCoordinate, GeoError> {
        #[derive(Deserialize)]
        struct IpGeo {
            latitude: f64,
            longitude: f64,
        }

        let response = self
            .http
            .get(&self.ip_lookup_url)
            .send()
            .await
            .map_err(|err| GeoError::unavailable(format!("ip lookup request failed: {err}")))?;

        if !response.status().is_success() {
            return Err(GeoError::unavailable(format!(
                "ip lookup returned HTTP {}",
                response.status().as_u16()
            )));
        }

        let body: IpGeo = response
            .json()
            .await
            .map_err(|err| GeoError::unavailable(format!("ip lookup returned bad JSON: {err}")))?;

        Ok(GeoCoordinate {
            latitude: body.latitude,
            longitude: body.longitude,
            accuracy_m: Some(IP_ACCURACY_M),
            source: Source::Ip,
        })
    }
}
