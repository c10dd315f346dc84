//! Link-requirement interpretation.
//!
//! A protected short link redirects visitors to the unlock page with the
//! requirements encoded in the query string. The server has used two
//! encodings over time and both are still in the wild:
//!
//! - boolean flags: `password_required=true&location_required=true`
//! - composite: `required=pass,loc` (any value containing the `pass` /
//!   `loc` markers)
//!
//! Both are accepted inbound. When the composite parameter is present it
//! wins and the boolean flags are ignored.

use std::fmt;

use url::Url;

/// Marker prefix the service uses for resolving short links.
pub(crate) const RESOLVE_PATH_PREFIX: &str = "r";

/// Which factor a previous unlock attempt failed on.
///
/// The server does not say which check rejected the attempt, so when both
/// factors were required the only honest message is the combined one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    Password,
    Location,
    PasswordOrLocation,
}

impl FailureReason {
    /// Returns the user-facing message for this failure.
    pub fn message(&self) -> &'static str {
        match self {
            FailureReason::Password => "The password you entered was not accepted.",
            FailureReason::Location => "You are outside the area this link permits.",
            FailureReason::PasswordOrLocation => {
                "Access was denied: either the password is wrong or you are outside the permitted area."
            }
        }
    }

    /// Returns the reason matching whatever a link requires: combined when
    /// both factors are active, since the server does not disambiguate.
    pub fn for_requirement(requirement: &LinkRequirement) -> Self {
        match (requirement.password_required, requirement.location_required) {
            (true, false) => FailureReason::Password,
            (false, true) => FailureReason::Location,
            _ => FailureReason::PasswordOrLocation,
        }
    }

    /// Derives a reason from a `reason`/`error` parameter value.
    ///
    /// Markers embedded in the value win; otherwise the reason falls back to
    /// whatever this link requires, combined when both factors were active.
    pub(crate) fn derive(value: &str, password_required: bool, location_required: bool) -> Self {
        let value = value.to_lowercase();
        let names_password = value.contains("pass");
        let names_location = value.contains("loc");
        match (names_password, names_location) {
            (true, true) => FailureReason::PasswordOrLocation,
            (true, false) => FailureReason::Password,
            (false, true) => FailureReason::Location,
            (false, false) => match (password_required, location_required) {
                (true, false) => FailureReason::Password,
                (false, true) => FailureReason::Location,
                _ => FailureReason::PasswordOrLocation,
            },
        }
    }
}

/// The link is missing its alias; nothing can be resolved or unlocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidLinkError;

impl fmt::Display for InvalidLinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "This link is missing its alias and cannot be resolved.")
    }
}

impl std::error::Error for InvalidLinkError {}

/// The credential requirements of one short link, parsed once from the
/// inbound URL. Never mutated; a fresh navigation produces a fresh value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRequirement {
    /// Short-link path segment(s), possibly nested (`docs/launch`).
    pub alias_path: String,
    pub password_required: bool,
    pub location_required: bool,
    /// Set when the server bounced a previous attempt back to the unlock page.
    pub prior_failure: Option<FailureReason>,
}

impl LinkRequirement {
    /// Creates a requirement for a bare alias with nothing to collect.
    pub fn open(alias_path: impl Into<String>) -> Result<Self, InvalidLinkError> {
        let alias_path = alias_path.into();
        if alias_path.trim().is_empty() {
            return Err(InvalidLinkError);
        }
        Ok(Self {
            alias_path,
            password_required: false,
            location_required: false,
            prior_failure: None,
        })
    }

    /// Returns true if any credential must be collected before submission.
    pub fn requires_anything(&self) -> bool {
        self.password_required || self.location_required
    }

    /// Parses a requirement from a full URL.
    ///
    /// Accepts both shapes a terminal user is likely to paste:
    /// - a short link (`https://host/r/<alias...>`), alias from the path
    /// - an unlock-page URL with an `aliasPath` query parameter
    pub fn from_url(url: &Url) -> Result<Self, InvalidLinkError> {
        match parse_requirement(url.query_pairs()) {
            Ok(requirement) => Ok(requirement),
            // No aliasPath parameter; try the /r/<alias...> path form.
            Err(InvalidLinkError) => match alias_from_path(url) {
                Some(alias) => parse_requirement_with_alias(url.query_pairs(), alias),
                None => Err(InvalidLinkError),
            },
        }
    }
}

/// Extracts a multi-segment alias from a `/r/<alias...>` path.
fn alias_from_path(url: &Url) -> Option<String> {
    let mut segments = url.path_segments()?;
    if segments.next()? != RESOLVE_PATH_PREFIX {
        return None;
    }
    let rest: Vec<&str> = segments.filter(|s| !s.is_empty()).collect();
    if rest.is_empty() {
        return None;
    }
    Some(rest.join("/"))
}

/// Parses a `LinkRequirement` from the query pairs of the inbound URL.
///
/// Pure function over the mapping; no shared parser state. Re-parsing the
/// same input yields an identical value.
pub fn parse_requirement<K, V>(
    pairs: impl IntoIterator<Item = (K, V)>,
) -> Result<LinkRequirement, InvalidLinkError>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut alias_path: Option<String> = None;
    let mut flag_password = false;
    let mut flag_location = false;
    let mut composite: Option<String> = None;
    let mut failure_signal: Option<String> = None;

    for (key, value) in pairs {
        let value = value.as_ref();
        match key.as_ref() {
            "aliasPath" => alias_path = Some(value.to_string()),
            "password_required" => flag_password = value == "true",
            "location_required" => flag_location = value == "true",
            "required" => composite = Some(value.to_string()),
            "reason" | "error" => failure_signal = Some(value.to_string()),
            _ => {}
        }
    }

    let alias_path = match alias_path {
        Some(alias) if !alias.trim().is_empty() => alias,
        _ => return Err(InvalidLinkError),
    };

    // Composite encoding wins; flags are only consulted when it is absent.
    let (password_required, location_required) = match composite {
        Some(value) => {
            let value = value.to_lowercase();
            (value.contains("pass"), value.contains("loc"))
        }
        None => (flag_password, flag_location),
    };

    let prior_failure = failure_signal
        .map(|value| FailureReason::derive(&value, password_required, location_required));

    Ok(LinkRequirement {
        alias_path,
        password_required,
        location_required,
        prior_failure,
    })
}

/// Like [`parse_requirement`] but with the alias supplied out of band
/// (taken from a `/r/<alias...>` path rather than the query).
fn parse_requirement_with_alias<K, V>(
    pairs: impl IntoIterator<Item = (K, V)>,
    alias: String,
) -> Result<LinkRequirement, InvalidLinkError>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let alias_pair = [("aliasPath".to_string(), alias)];
    let mapped = pairs
        .into_iter()
        .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string()))
        .filter(|(k, _)| k != "aliasPath")
        .chain(alias_pair);
    parse_requirement(mapped)
}

/// Parses whatever the user handed to the CLI: a full URL or a bare alias.
pub fn parse_link_input(input: &str) -> Result<LinkRequirement, InvalidLinkError> {
    let trimmed = input.trim();
    if let Ok(url) = Url::parse(trimmed) {
        return LinkRequirement::from_url(&url);
    }
    // Bare alias, possibly nested (`docs/launch`).
    LinkRequirement::open(trimmed.trim_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(entries: &[(&str, &str)]) -> Vec<(String, String)> {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    /// Missing or empty alias is a terminal invalid-link state.
    #[test]
    fn test_missing_alias_is_invalid() {
        assert_eq!(
            parse_requirement(pairs(&[("password_required", "true")])),
            Err(InvalidLinkError)
        );
        assert_eq!(
            parse_requirement(pairs(&[("aliasPath", "  ")])),
            Err(InvalidLinkError)
        );
    }

    /// Boolean flags parse strictly: only the literal "true" enables them.
    #[test]
    fn test_boolean_flag_encoding() {
        let req = parse_requirement(pairs(&[
            ("aliasPath", "secure1"),
            ("password_required", "true"),
            ("location_required", "false"),
        ]))
        .unwrap();
        assert!(req.password_required);
        assert!(!req.location_required);

        let req = parse_requirement(pairs(&[
            ("aliasPath", "secure1"),
            ("password_required", "TRUE"),
        ]))
        .unwrap();
        assert!(!req.password_required);
    }

    /// Composite and boolean encodings produce the same requirement.
    #[test]
    fn test_composite_matches_boolean_encoding() {
        let composite = parse_requirement(pairs(&[
            ("aliasPath", "geo1"),
            ("required", "pass,loc"),
        ]))
        .unwrap();
        let flags = parse_requirement(pairs(&[
            ("aliasPath", "geo1"),
            ("password_required", "true"),
            ("location_required", "true"),
        ]))
        .unwrap();
        assert_eq!(composite, flags);
    }

    /// When both encodings appear, the composite wins and flags are ignored.
    #[test]
    fn test_composite_wins_over_flags() {
        let req = parse_requirement(pairs(&[
            ("aliasPath", "mixed"),
            ("password_required", "true"),
            ("location_required", "true"),
            ("required", "loc"),
        ]))
        .unwrap();
        assert!(!req.password_required);
        assert!(req.location_required);
    }

    /// No requirements: the form has nothing to collect.
    #[test]
    fn test_no_requirements() {
        let req = parse_requirement(pairs(&[("aliasPath", "mytest")])).unwrap();
        assert!(!req.requires_anything());
        assert_eq!(req.alias_path, "mytest");
        assert_eq!(req.prior_failure, None);
    }

    /// A reason signal with both factors active must stay ambiguous.
    #[test]
    fn test_failure_reason_ambiguous_when_both_required() {
        let req = parse_requirement(pairs(&[
            ("aliasPath", "vault"),
            ("required", "pass,loc"),
            ("reason", "denied"),
        ]))
        .unwrap();
        assert_eq!(req.prior_failure, Some(FailureReason::PasswordOrLocation));
        assert!(
            FailureReason::PasswordOrLocation
                .message()
                .contains("either the password is wrong")
        );
    }

    /// Markers in the reason value pin the failure to one factor.
    #[test]
    fn test_failure_reason_from_markers() {
        let req = parse_requirement(pairs(&[
            ("aliasPath", "vault"),
            ("required", "pass,loc"),
            ("error", "passcode_mismatch"),
        ]))
        .unwrap();
        assert_eq!(req.prior_failure, Some(FailureReason::Password));

        let req = parse_requirement(pairs(&[
            ("aliasPath", "vault"),
            ("password_required", "true"),
            ("reason", "wrong"),
        ]))
        .unwrap();
        assert_eq!(req.prior_failure, Some(FailureReason::Password));
    }

    /// Re-parsing the same URL yields identical values.
    #[test]
    fn test_parse_is_idempotent() {
        let url = Url::parse(
            "https://www.getmyuri.com/auth?aliasPath=mytest&required=pass,loc&reason=denied",
        )
        .unwrap();
        let first = LinkRequirement::from_url(&url).unwrap();
        let second = LinkRequirement::from_url(&url).unwrap();
        assert_eq!(first, second);
    }

    /// A pasted short link yields the alias from the /r/ path.
    #[test]
    fn test_from_url_short_link_path() {
        let url = Url::parse("https://www.getmyuri.com/r/docs/launch").unwrap();
        let req = LinkRequirement::from_url(&url).unwrap();
        assert_eq!(req.alias_path, "docs/launch");
        assert!(!req.requires_anything());
    }

    /// The aliasPath query parameter wins over the path when both exist.
    #[test]
    fn test_from_url_query_alias_wins() {
        let url =
            Url::parse("https://www.getmyuri.com/r/ignored?aliasPath=actual&required=pass")
                .unwrap();
        let req = LinkRequirement::from_url(&url).unwrap();
        assert_eq!(req.alias_path, "actual");
        assert!(req.password_required);
    }

    /// Bare aliases and full URLs both parse from CLI input.
    #[test]
    fn test_parse_link_input() {
        let req = parse_link_input("mytest").unwrap();
        assert_eq!(req.alias_path, "mytest");

        let req = parse_link_input("https://www.getmyuri.com/r/mytest").unwrap();
        assert_eq!(req.alias_path, "mytest");

        assert_eq!(parse_link_input("   "), Err(InvalidLinkError));
    }
}
