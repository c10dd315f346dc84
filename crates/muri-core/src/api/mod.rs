//! Client for the link service (shortening and custom-link creation).

pub mod client;
pub mod links;

pub use client::{ApiClient, DEFAULT_BASE_URL, USER_AGENT, resolve_base_url};
pub use links::{AliasError, CustomLinkRequest, Geofence, RadiusUnit, normalize_url, validate_alias};
