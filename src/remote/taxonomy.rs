//! Error taxonomy mapper.
//!
//! Turns a classified `Failure` into something a caller can act on: the kind,
//! the diagnostic message and a remediation suggestion keyed by kind.

use serde::Serialize;

use super::outcome::{ErrorKind, Failure};

/// Human-facing description of a remote failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnosis {
    pub kind: ErrorKind,
    pub message: String,
    pub suggestion: &'static str,
}

impl Diagnosis {
    /// One-line message combining headline, diagnostic and suggestion.
    pub fn human_message(&self) -> String {
        format!(
            "{} ({}). {}",
            headline(self.kind),
            self.message,
            self.suggestion
        )
    }
}

/// Describe a failure. Pure and total over `ErrorKind`.
pub fn describe(failure: &Failure) -> Diagnosis {
    Diagnosis {
        kind: failure.kind,
        message: failure.message.clone(),
        suggestion: suggestion(failure.kind),
    }
}

/// Remediation hint for a failure kind.
pub fn suggestion(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Unauthorized => {
            "The API token is missing or expired. Reissue a personal access token and update JIRA_API_TOKEN."
        }
        ErrorKind::Forbidden => {
            "The account has insufficient permission for this operation. Ask a Jira administrator for access to the project."
        }
        ErrorKind::NotFound => {
            "Verify the identifier is correct and that the issue, project or board is accessible to this account."
        }
        ErrorKind::Unreachable | ErrorKind::Timeout => {
            "Verify network reachability of the Jira server and that JIRA_BASE_URL points at it."
        }
        ErrorKind::UpstreamError | ErrorKind::Unknown => {
            "Check the request arguments against the error details and retry the operation."
        }
    }
}

fn headline(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Unauthorized => "Authentication failed",
        ErrorKind::Forbidden => "Permission denied",
        ErrorKind::NotFound => "Resource not found",
        ErrorKind::Unreachable => "Jira server unreachable",
        ErrorKind::Timeout => "Request to Jira timed out",
        ErrorKind::UpstreamError => "Jira returned an error",
        ErrorKind::Unknown => "Request failed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn any_kind() -> impl Strategy<Value = ErrorKind> {
        prop::sample::select(ErrorKind::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn test_describe_is_total(kind in any_kind(), message in ".{0,300}") {
            let diagnosis = describe(&Failure::new(kind, message.clone()));
            prop_assert_eq!(diagnosis.kind, kind);
            prop_assert_eq!(diagnosis.message, message);
            prop_assert!(!diagnosis.suggestion.trim().is_empty());
        }
    }

    #[test]
    fn test_unauthorized_mentions_expired_credential() {
        let failure = Failure::from_response(401, "Unauthorized", "");
        let message = describe(&failure).human_message();
        assert!(message.contains("expired"), "{}", message);
        assert!(message.contains("HTTP 401"), "{}", message);
    }

    #[test]
    fn test_network_kinds_share_reachability_advice() {
        assert_eq!(
            suggestion(ErrorKind::Unreachable),
            suggestion(ErrorKind::Timeout)
        );
        assert!(suggestion(ErrorKind::Timeout).contains("JIRA_BASE_URL"));
    }

    #[test]
    fn test_suggestions_are_keyed_by_kind() {
        assert!(suggestion(ErrorKind::Forbidden).contains("permission"));
        assert!(suggestion(ErrorKind::NotFound).contains("identifier"));
        assert!(suggestion(ErrorKind::Unknown).contains("retry"));
    }
}
