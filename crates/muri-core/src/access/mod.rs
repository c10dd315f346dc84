//! The link-access authorization flow.
//!
//! Given a protected short link, work out what the owner required
//! ([`requirement`]), collect the credentials (interactively in the TUI, or
//! from flags), locating the visitor when needed ([`geolocate`]), and submit
//! the check ([`authorize`]).

pub mod authorize;
pub mod geolocate;
pub mod requirement;

use anyhow::Result;
pub use authorize::{AuthError, AuthOutcome, Authorizer, Credentials, RedirectTarget};
pub use geolocate::{Acquirer, GeoCoordinate, GeoError, GeoErrorKind, Source};
pub use requirement::{
    FailureReason, InvalidLinkError, LinkRequirement, parse_link_input, parse_requirement,
};

/// One-shot unlock: acquire a coordinate if the link needs one and none was
/// supplied, then submit.
///
/// Acquisition always completes (or fails) before the server is contacted;
/// an acquisition failure aborts the attempt without a request.
pub async fn unlock(
    authorizer: &Authorizer,
    acquirer: &Acquirer,
    requirement: &LinkRequirement,
    mut credentials: Credentials,
) -> Result<AuthOutcome> {
    if requirement.location_required && credentials.coordinate.is_none() {
        let coordinate = acquirer.acquire().await?;
        tracing::debug!(source = coordinate.source.display_name(), "location resolved");
        credentials.coordinate = Some(coordinate);
    }

    Ok(authorizer.submit(requirement, &credentials).await?)
}
