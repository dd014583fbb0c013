//! Router configuration.
//!
//! The recognized keys are exhaustive for the core; descriptor documents
//! carry them under kebab-case names and unknown keys are rejected at parse
//! time.

use serde::Deserialize;

/// How `/path` and `/path/` are reconciled at dispatch time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum TrailingSlash {
    /// Paths match exactly as written; a mismatched trailing slash falls
    /// through to 404 naturally.
    #[serde(rename = "off")]
    Off,
    /// Same observable outcome as `off`, spelled out: a mismatched trailing
    /// slash is a 404 even when the toggled path would match.
    #[serde(rename = "strict-404")]
    Strict404,
    /// A mismatched trailing slash answers `307 Temporary Redirect` to the
    /// canonical path, preserving the raw query string.
    #[serde(rename = "redirect")]
    Redirect,
}

impl Default for TrailingSlash {
    fn default() -> Self {
        TrailingSlash::Off
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RouterOptions {
    #[serde(rename = "trailing-slash")]
    pub trailing_slash: TrailingSlash,

    /// Parse a JSON request body into the bound arguments. On by default.
    #[serde(rename = "parse-post-body")]
    pub parse_post_body: bool,

    /// Serializer selector used when the matched endpoint names none.
    #[serde(rename = "default-serializer")]
    pub default_serializer: Option<String>,

    /// Names resolved against the evaluation environment when the options
    /// are applied to a router.
    #[serde(rename = "not-found-handler")]
    pub not_found_handler: Option<String>,
    #[serde(rename = "method-not-allowed-handler")]
    pub method_not_allowed_handler: Option<String>,
    #[serde(rename = "error-handler")]
    pub error_handler: Option<String>,

    /// Environment deferred expressions fall back to.
    #[serde(rename = "evaluation-environment")]
    pub evaluation_environment: Option<String>,
}

impl Default for RouterOptions {
    fn default() -> Self {
        RouterOptions {
            trailing_slash: TrailingSlash::Off,
            parse_post_body: true,
            default_serializer: None,
            not_found_handler: None,
            method_not_allowed_handler: None,
            error_handler: None,
            evaluation_environment: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_kebab_case_keys() {
        let opts: RouterOptions = serde_yaml::from_str(
            "trailing-slash: redirect\nparse-post-body: false\ndefault-serializer: text\n",
        )
        .unwrap();
        assert_eq!(opts.trailing_slash, TrailingSlash::Redirect);
        assert!(!opts.parse_post_body);
        assert_eq!(opts.default_serializer.as_deref(), Some("text"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(serde_yaml::from_str::<RouterOptions>("keep-alive: true\n").is_err());
    }

    #[test]
    fn defaults_parse_post_body_on() {
        let opts = RouterOptions::default();
        assert!(opts.parse_post_body);
        assert_eq!(opts.trailing_slash, TrailingSlash::Off);
    }
}
