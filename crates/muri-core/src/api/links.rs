//! Link-creation payloads and validation.
//!
//! Mirrors the website's customize form: nested alias segments, optional
//! passcode, expiry in MST, and a geofence drawn as a center plus radius.

use std::fmt;

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Serialize, Serializer};
use url::Url;

/// Meters per mile, as the form converts radii.
const METERS_PER_MILE: f64 = 1609.34;
/// Meters per foot.
const METERS_PER_FOOT: f64 = 0.3048;

/// Alias segments the service reserves for its own routes.
const RESERVED_ALIASES: [&str; 3] = ["api", "r", "auth"];

/// Minimum length of one alias segment.
const MIN_ALIAS_LEN: usize = 3;

/// Expiry timestamps are entered in MST (UTC-7).
pub fn mst() -> FixedOffset {
    FixedOffset::west_opt(7 * 3600).expect("static offset is in range")
}

/// Normalizes a destination URL the way the form does: `www.` or schemeless
/// input gets an `https://` prefix, then the result must parse.
pub fn normalize_url(input: &str) -> Result<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        anyhow::bail!("Please enter a URL");
    }

    let candidate = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    Url::parse(&candidate)
        .with_context(|| format!("Please enter a valid URL: {trimmed}"))?;
    Ok(candidate)
}

/// Why an alias segment was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasError {
    TooShort,
    Reserved,
}

impl fmt::Display for AliasError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AliasError::TooShort => {
                write!(f, "Alias must be at least {MIN_ALIAS_LEN} characters long")
            }
            AliasError::Reserved => write!(f, "Cannot use restricted words: api, r, auth"),
        }
    }
}

impl std::error::Error for AliasError {}

/// Validates one alias segment.
pub fn validate_alias(segment: &str) -> Result<(), AliasError> {
    if segment.len() < MIN_ALIAS_LEN {
        return Err(AliasError::TooShort);
    }
    if RESERVED_ALIASES.contains(&segment) {
        return Err(AliasError::Reserved);
    }
    Ok(())
}

/// Radius units offered by the geofence editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadiusUnit {
    Miles,
    Feet,
}

impl RadiusUnit {
    /// Converts a radius in this unit to meters.
    pub fn to_meters(&self, value: f64) -> f64 {
        match self {
            RadiusUnit::Miles => value * METERS_PER_MILE,
            RadiusUnit::Feet => value * METERS_PER_FOOT,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "miles" | "mi" => Some(RadiusUnit::Miles),
            "feet" | "ft" => Some(RadiusUnit::Feet),
            _ => None,
        }
    }
}

/// Geofence a protected link permits: a center and a radius in meters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Geofence {
    pub lat: f64,
    pub lon: f64,
    #[serde(rename = "radiusMeters")]
    pub radius_m: f64,
}

impl Geofence {
    pub fn new(lat: f64, lon: f64, radius: f64, unit: RadiusUnit) -> Self {
        Self {
            lat,
            lon,
            radius_m: unit.to_meters(radius),
        }
    }
}

fn serialize_expiry<S>(
    value: &Option<DateTime<FixedOffset>>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(ts) => serializer.serialize_some(&ts.to_rfc3339()),
        None => serializer.serialize_none(),
    }
}

/// Payload for creating a customized link.
#[derive(Debug, Clone, Serialize)]
pub struct CustomLinkRequest {
    /// Normalized destination URL.
    pub link: String,
    /// Alias segments, joined by `/` on the wire.
    #[serde(serialize_with = "serialize_alias")]
    #[serde(rename = "alias")]
    pub aliases: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passcode: Option<String>,
    /// Expiry in MST, RFC 3339 on the wire.
    #[serde(rename = "expiresAt")]
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(serialize_with = "serialize_expiry")]
    pub expires_at: Option<DateTime<FixedOffset>>,
    #[serde(rename = "location")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geofence: Option<Geofence>,
}

fn serialize_alias<S>(aliases: &[String], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&aliases.join("/"))
}

impl CustomLinkRequest {
    /// Builds a validated request: every alias segment checked, destination
    /// normalized.
    pub fn new(link: &str, aliases: Vec<String>) -> Result<Self> {
        if aliases.is_empty() {
            anyhow::bail!("At least one alias is required");
        }
        for segment in &aliases {
            validate_alias(segment).with_context(|| format!("invalid alias '{segment}'"))?;
        }

        Ok(Self {
            link: normalize_url(link)?,
            aliases,
            passcode: None,
            expires_at: None,
            geofence: None,
        })
    }

    /// Sets a passcode requirement.
    pub fn with_passcode(mut self, passcode: impl Into<String>) -> Self {
        self.passcode = Some(passcode.into());
        self
    }

    /// Sets an expiry, which must be in the future (MST).
    pub fn with_expiry(mut self, expires_at: DateTime<FixedOffset>) -> Result<Self> {
        if expires_at <= Utc::now() {
            anyhow::bail!("Expiration date and time must be in the future (MST)");
        }
        self.expires_at = Some(expires_at);
        Ok(self)
    }

    /// Sets a geofence requirement.
    pub fn with_geofence(mut self, geofence: Geofence) -> Self {
        self.geofence = Some(geofence);
        self
    }

    /// Returns the alias segments joined into one path.
    pub fn alias_path(&self) -> String {
        self.aliases.join("/")
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    /// normalize_url: schemeless and www-prefixed input gets https.
    #[test]
    fn test_normalize_url() {
        assert_eq!(
            normalize_url("www.example.com").unwrap(),
            "https://www.example.com"
        );
        assert_eq!(
            normalize_url("example.com/page").unwrap(),
            "https://example.com/page"
        );
        assert_eq!(
            normalize_url("http://example.com").unwrap(),
            "http://example.com"
        );
        assert!(normalize_url("not a url").is_err());
        assert!(normalize_url("   ").is_err());
    }

    /// Alias validation: length and reserved words.
    #[test]
    fn test_validate_alias() {
        assert_eq!(validate_alias("ab"), Err(AliasError::TooShort));
        assert_eq!(validate_alias("api"), Err(AliasError::Reserved));
        assert_eq!(validate_alias("r"), Err(AliasError::TooShort));
        assert_eq!(validate_alias("auth"), Err(AliasError::Reserved));
        assert_eq!(validate_alias("mybrand"), Ok(()));
    }

    /// Radius conversion uses the form's exact factors.
    #[test]
    fn test_radius_to_meters() {
        assert_eq!(RadiusUnit::Miles.to_meters(1.0), 1609.34);
        assert_eq!(RadiusUnit::Feet.to_meters(1.0), 0.3048);
        assert_eq!(RadiusUnit::Miles.to_meters(2.5), 2.5 * 1609.34);
    }

    /// Expiry must be in the future.
    #[test]
    fn test_expiry_must_be_future() {
        let request = CustomLinkRequest::new("example.com", vec!["mybrand".to_string()]).unwrap();

        let past = mst().with_ymd_and_hms(2020, 1, 1, 12, 0, 0).unwrap();
        assert!(request.clone().with_expiry(past).is_err());

        let future = Utc::now().with_timezone(&mst()) + Duration::hours(1);
        assert!(request.with_expiry(future).is_ok());
    }

    /// Payload shape: aliases joined, optional fields omitted when unset.
    #[test]
    fn test_payload_shape() {
        let request = CustomLinkRequest::new(
            "example.com",
            vec!["docs".to_string(), "launch".to_string()],
        )
        .unwrap()
        .with_passcode("abc123")
        .with_geofence(Geofence::new(37.0, -122.0, 1.0, RadiusUnit::Miles));

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["link"], "https://example.com");
        assert_eq!(value["alias"], "docs/launch");
        assert_eq!(value["passcode"], "abc123");
        assert_eq!(value["location"]["radiusMeters"], 1609.34);
        assert!(value.get("expiresAt").is_none());
    }

    /// Invalid alias segments are rejected at construction.
    #[test]
    fn test_new_rejects_bad_aliases() {
        assert!(CustomLinkRequest::new("example.com", vec![]).is_err());
        assert!(CustomLinkRequest::new("example.com", vec!["ab".to_string()]).is_err());
        assert!(
            CustomLinkRequest::new(
                "example.com",
                vec!["good".to_string(), "api".to_string()]
            )
            .is_err()
        );
    }
}
