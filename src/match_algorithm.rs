use crate::config::{MatchAlgorithmKind, MatcherSpec};
use crate::matcher::matcher_for;
use crate::message::Message;

/// Decides whether a reaction's matcher list applies to a message.
///
/// A reaction with zero declared matchers never applies, under either
/// algorithm. Specs that fail to compile are dropped, but under AND a
/// dropped spec still counts against the required total, so one bad spec
/// makes the whole reaction non-matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchAlgorithm {
    MatchAll,
    MatchAny,
}

impl From<MatchAlgorithmKind> for MatchAlgorithm {
    fn from(kind: MatchAlgorithmKind) -> Self {
        match kind {
            MatchAlgorithmKind::And => MatchAlgorithm::MatchAll,
            MatchAlgorithmKind::Or => MatchAlgorithm::MatchAny,
        }
    }
}

impl MatchAlgorithm {
    pub fn matches(&self, message: &Message, specs: &[MatcherSpec]) -> bool {
        if specs.is_empty() {
            return false;
        }

        let matchers: Vec<_> = specs
            .iter()
            .filter_map(|spec| match matcher_for(Some(spec)) {
                Ok(matcher) => Some(matcher),
                Err(e) => {
                    log::warn!("Dropping matcher that failed to compile: {e}");
                    None
                }
            })
            .collect();

        match self {
            MatchAlgorithm::MatchAll => {
                let matched = matchers
                    .iter()
                    .filter(|m| m.matches(Some(message)))
                    .count();
                matched == specs.len()
            }
            MatchAlgorithm::MatchAny => matchers.iter().any(|m| m.matches(Some(message))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::testing;

    #[test]
    fn test_empty_matcher_list_never_applies() {
        let message = testing::message();
        assert!(!MatchAlgorithm::MatchAll.matches(&message, &[]));
        assert!(!MatchAlgorithm::MatchAny.matches(&message, &[]));
    }

    #[test]
    fn test_and_requires_every_matcher() {
        let mut message = testing::message();
        message.title = "Disk usage above 90%".to_string();
        message.hostname = Some("app-host-01".to_string());

        let specs = vec![
            MatcherSpec::TitleContains {
                substring: "Disk".to_string(),
            },
            MatcherSpec::HostnameContains {
                substring: "app-host".to_string(),
            },
        ];
        assert!(MatchAlgorithm::MatchAll.matches(&message, &specs));

        let specs = vec![
            MatcherSpec::TitleContains {
                substring: "Disk".to_string(),
            },
            MatcherSpec::HostnameContains {
                substring: "db-host".to_string(),
            },
        ];
        assert!(!MatchAlgorithm::MatchAll.matches(&message, &specs));
    }

    #[test]
    fn test_and_counts_uncompilable_matcher_as_non_match() {
        let message = testing::message();
        // The first spec matches, the second fails to compile; under AND the
        // dropped spec still counts against the required total.
        let specs = vec![
            MatcherSpec::TitleContains {
                substring: "Disk".to_string(),
            },
            MatcherSpec::BodyContains {
                substring: String::new(),
            },
        ];
        assert!(!MatchAlgorithm::MatchAll.matches(&message, &specs));
    }

    #[test]
    fn test_or_requires_at_least_one_matcher() {
        let message = testing::message();
        let specs = vec![
            MatcherSpec::TitleContains {
                substring: "no such title".to_string(),
            },
            MatcherSpec::TitleContains {
                substring: "Disk".to_string(),
            },
        ];
        assert!(MatchAlgorithm::MatchAny.matches(&message, &specs));

        let specs = vec![
            MatcherSpec::TitleContains {
                substring: "no such title".to_string(),
            },
            MatcherSpec::Unset,
        ];
        assert!(!MatchAlgorithm::MatchAny.matches(&message, &specs));
    }

    #[test]
    fn test_or_tolerates_uncompilable_matcher() {
        let message = testing::message();
        let specs = vec![
            MatcherSpec::BodyContains {
                substring: String::new(),
            },
            MatcherSpec::TitleContains {
                substring: "Disk".to_string(),
            },
        ];
        assert!(MatchAlgorithm::MatchAny.matches(&message, &specs));
    }
}
