use crate::config::MatcherSpec;
use crate::error::{EngineError, Result};
use crate::message::{is_valid_identifier, Message, Urgency};

/// An executable matcher compiled from a declarative [`MatcherSpec`].
///
/// Matchers are pure predicates over a message: evaluating the same matcher
/// twice against the same message always yields the same result. Negative
/// spec forms compile to `Not` around the positive form rather than to
/// dedicated variants.
#[derive(Debug, Clone, PartialEq)]
pub enum Matcher {
    /// Matches every message, including an absent one.
    All,
    /// Matches nothing; compiled from unset/unrecognized specs.
    Never,
    Not(Box<Matcher>),
    BodyContains(String),
    BodyIs(String),
    TitleContains(String),
    TitleIs(String),
    HostnameContains(String),
    HostnameIs(String),
    ApplicationIs(String),
    UrgencyIsOneOf(Vec<Urgency>),
}

impl Matcher {
    pub fn not(inner: Matcher) -> Matcher {
        Matcher::Not(Box::new(inner))
    }

    /// Evaluates the matcher. An absent message fails every concrete
    /// matcher; `All` still matches it, so `not(All)` does not. These edge
    /// behaviors are load-bearing for callers that probe matchers before a
    /// message exists.
    pub fn matches(&self, message: Option<&Message>) -> bool {
        match self {
            Matcher::All => true,
            Matcher::Never => false,
            Matcher::Not(inner) => !inner.matches(message),
            _ => {
                let Some(message) = message else {
                    return false;
                };
                self.matches_present(message)
            }
        }
    }

    fn matches_present(&self, message: &Message) -> bool {
        match self {
            Matcher::All => true,
            Matcher::Never => false,
            Matcher::Not(inner) => !inner.matches(Some(message)),
            Matcher::BodyContains(substring) => field_contains(message.body.as_deref(), substring),
            Matcher::BodyIs(expected) => field_is(message.body.as_deref(), expected),
            Matcher::TitleContains(substring) => {
                field_contains(non_empty(&message.title), substring)
            }
            Matcher::TitleIs(expected) => field_is(non_empty(&message.title), expected),
            Matcher::HostnameContains(substring) => {
                field_contains(message.hostname.as_deref(), substring)
            }
            Matcher::HostnameIs(expected) => field_is(message.hostname.as_deref(), expected),
            Matcher::ApplicationIs(application_id) => message.application_id == *application_id,
            Matcher::UrgencyIsOneOf(urgencies) => {
                // An empty set matches every urgency. Surprising, but this is
                // the documented behavior callers depend on; do not "fix" it
                // to match-none without a deliberate, visible decision.
                urgencies.is_empty() || urgencies.contains(&message.urgency)
            }
        }
    }
}

// Contains/Is comparisons are case-sensitive and fail on an absent or empty
// field regardless of the expected value.
fn field_contains(field: Option<&str>, substring: &str) -> bool {
    match field {
        Some(value) if !value.is_empty() => value.contains(substring),
        _ => false,
    }
}

fn field_is(field: Option<&str>, expected: &str) -> bool {
    match field {
        Some(value) if !value.is_empty() => value == expected,
        _ => false,
    }
}

fn non_empty(value: &str) -> Option<&str> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn require_non_empty(value: &str, what: &str) -> Result<()> {
    if value.is_empty() {
        Err(EngineError::invalid(format!(
            "matcher requires a non-empty {what}"
        )))
    } else {
        Ok(())
    }
}

/// Compiles a declarative matcher specification into an executable matcher.
///
/// An absent spec matches everything; an unset/unrecognized spec matches
/// nothing. A variant that is present but missing its required payload is a
/// construction-time error, never a silent runtime false.
pub fn matcher_for(spec: Option<&MatcherSpec>) -> Result<Matcher> {
    let Some(spec) = spec else {
        return Ok(Matcher::All);
    };
    let matcher = match spec {
        MatcherSpec::All => Matcher::All,
        MatcherSpec::Unset => Matcher::Never,
        MatcherSpec::BodyContains { substring } => {
            require_non_empty(substring, "substring")?;
            Matcher::BodyContains(substring.clone())
        }
        MatcherSpec::BodyIs { expected } => {
            require_non_empty(expected, "expected body")?;
            Matcher::BodyIs(expected.clone())
        }
        MatcherSpec::BodyDoesNotContain { substring } => {
            require_non_empty(substring, "substring")?;
            Matcher::not(Matcher::BodyContains(substring.clone()))
        }
        MatcherSpec::TitleContains { substring } => {
            require_non_empty(substring, "substring")?;
            Matcher::TitleContains(substring.clone())
        }
        MatcherSpec::TitleIs { expected } => {
            require_non_empty(expected, "expected title")?;
            Matcher::TitleIs(expected.clone())
        }
        MatcherSpec::TitleDoesNotContain { substring } => {
            require_non_empty(substring, "substring")?;
            Matcher::not(Matcher::TitleContains(substring.clone()))
        }
        MatcherSpec::HostnameContains { substring } => {
            require_non_empty(substring, "substring")?;
            Matcher::HostnameContains(substring.clone())
        }
        MatcherSpec::HostnameIs { expected } => {
            require_non_empty(expected, "expected hostname")?;
            Matcher::HostnameIs(expected.clone())
        }
        MatcherSpec::HostnameDoesNotContain { substring } => {
            require_non_empty(substring, "substring")?;
            Matcher::not(Matcher::HostnameContains(substring.clone()))
        }
        MatcherSpec::ApplicationIs { application_id } => {
            if !is_valid_identifier(application_id) {
                return Err(EngineError::invalid(format!(
                    "matcher requires a valid application id, got {application_id:?}"
                )));
            }
            Matcher::ApplicationIs(application_id.clone())
        }
        MatcherSpec::ApplicationIsNot { application_id } => {
            if !is_valid_identifier(application_id) {
                return Err(EngineError::invalid(format!(
                    "matcher requires a valid application id, got {application_id:?}"
                )));
            }
            Matcher::not(Matcher::ApplicationIs(application_id.clone()))
        }
        MatcherSpec::UrgencyIsOneOf { urgencies } => Matcher::UrgencyIsOneOf(urgencies.clone()),
    };
    Ok(matcher)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::testing;

    #[test]
    fn test_absent_spec_matches_everything() {
        let matcher = matcher_for(None).unwrap();
        assert_eq!(matcher, Matcher::All);
        assert!(matcher.matches(Some(&testing::message())));
        assert!(matcher.matches(None));
    }

    #[test]
    fn test_unset_spec_matches_nothing() {
        let matcher = matcher_for(Some(&MatcherSpec::Unset)).unwrap();
        assert_eq!(matcher, Matcher::Never);
        assert!(!matcher.matches(Some(&testing::message())));
        assert!(!matcher.matches(None));
    }

    #[test]
    fn test_null_message_edge_behavior() {
        // All matches an absent message; its negation does not; concrete
        // matchers never match an absent message.
        assert!(Matcher::All.matches(None));
        assert!(!Matcher::not(Matcher::All).matches(None));
        assert!(!Matcher::TitleContains("x".to_string()).matches(None));
        assert!(Matcher::not(Matcher::TitleContains("x".to_string())).matches(None));
    }

    #[test]
    fn test_title_contains_is_case_sensitive() {
        let mut message = testing::message();
        message.title = "Deploy finished".to_string();

        let matcher = matcher_for(Some(&MatcherSpec::TitleContains {
            substring: "Deploy".to_string(),
        }))
        .unwrap();
        assert!(matcher.matches(Some(&message)));

        let matcher = matcher_for(Some(&MatcherSpec::TitleContains {
            substring: "deploy".to_string(),
        }))
        .unwrap();
        assert!(!matcher.matches(Some(&message)));
    }

    #[test]
    fn test_contains_on_absent_or_empty_field_is_false() {
        let mut message = testing::message();
        message.body = None;
        let matcher = matcher_for(Some(&MatcherSpec::BodyContains {
            substring: "anything".to_string(),
        }))
        .unwrap();
        assert!(!matcher.matches(Some(&message)));

        message.body = Some(String::new());
        assert!(!matcher.matches(Some(&message)));
    }

    #[test]
    fn test_is_family_exact_equality() {
        let mut message = testing::message();
        message.hostname = Some("app-host-01".to_string());

        let exact = matcher_for(Some(&MatcherSpec::HostnameIs {
            expected: "app-host-01".to_string(),
        }))
        .unwrap();
        assert!(exact.matches(Some(&message)));

        let partial = matcher_for(Some(&MatcherSpec::HostnameIs {
            expected: "app-host".to_string(),
        }))
        .unwrap();
        assert!(!partial.matches(Some(&message)));
    }

    #[test]
    fn test_negated_forms_are_built_with_not() {
        let matcher = matcher_for(Some(&MatcherSpec::TitleDoesNotContain {
            substring: "heartbeat".to_string(),
        }))
        .unwrap();
        assert_eq!(
            matcher,
            Matcher::not(Matcher::TitleContains("heartbeat".to_string()))
        );

        let mut message = testing::message();
        message.title = "heartbeat ok".to_string();
        assert!(!matcher.matches(Some(&message)));
        message.title = "deploy done".to_string();
        assert!(matcher.matches(Some(&message)));
    }

    #[test]
    fn test_empty_payload_is_a_construction_error() {
        let result = matcher_for(Some(&MatcherSpec::BodyContains {
            substring: String::new(),
        }));
        assert!(matches!(result, Err(EngineError::InvalidArgument(_))));

        let result = matcher_for(Some(&MatcherSpec::TitleIs {
            expected: String::new(),
        }));
        assert!(matches!(result, Err(EngineError::InvalidArgument(_))));
    }

    #[test]
    fn test_application_is_requires_valid_identifier() {
        let result = matcher_for(Some(&MatcherSpec::ApplicationIs {
            application_id: "not-a-uuid".to_string(),
        }));
        assert!(matches!(result, Err(EngineError::InvalidArgument(_))));

        let message = testing::message();
        let matcher = matcher_for(Some(&MatcherSpec::ApplicationIs {
            application_id: message.application_id.clone(),
        }))
        .unwrap();
        assert!(matcher.matches(Some(&message)));

        let other = matcher_for(Some(&MatcherSpec::ApplicationIsNot {
            application_id: message.application_id.clone(),
        }))
        .unwrap();
        assert!(!other.matches(Some(&message)));
    }

    #[test]
    fn test_urgency_is_one_of() {
        let mut message = testing::message();
        message.urgency = Urgency::Medium;

        let matcher = matcher_for(Some(&MatcherSpec::UrgencyIsOneOf {
            urgencies: vec![Urgency::Medium, Urgency::High],
        }))
        .unwrap();
        assert!(matcher.matches(Some(&message)));

        let matcher = matcher_for(Some(&MatcherSpec::UrgencyIsOneOf {
            urgencies: vec![Urgency::Low],
        }))
        .unwrap();
        assert!(!matcher.matches(Some(&message)));
    }

    #[test]
    fn test_empty_urgency_set_matches_all_urgencies() {
        // Current behavior: an empty set matches everything, not nothing.
        // Surprising, but pinned here so any future change is deliberate.
        let matcher = matcher_for(Some(&MatcherSpec::UrgencyIsOneOf { urgencies: vec![] })).unwrap();
        for urgency in [Urgency::Low, Urgency::Medium, Urgency::High] {
            let mut message = testing::message();
            message.urgency = urgency;
            assert!(matcher.matches(Some(&message)));
        }
    }

    #[test]
    fn test_matchers_are_idempotent() {
        let message = testing::message();
        let matcher = matcher_for(Some(&MatcherSpec::TitleContains {
            substring: "Disk".to_string(),
        }))
        .unwrap();
        let first = matcher.matches(Some(&message));
        let second = matcher.matches(Some(&message));
        assert_eq!(first, second);
        assert!(first);
    }
}
