//! Checks run by the front door before a submission is processed.

use crate::error::CoreError;
use crate::form::schema::{FormSettings, FormStatus};

/// Identifies a submitter for the one-response-per-person rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitterKey {
    Email(String),
    IpAddress(String),
}

impl SubmitterKey {
    /// Prefer the email address; fall back to the client IP.
    pub fn resolve(email: Option<&str>, ip_address: Option<&str>) -> Option<Self> {
        let email = email.map(str::trim).filter(|e| !e.is_empty());
        let ip = ip_address.map(str::trim).filter(|ip| !ip.is_empty());
        match (email, ip) {
            (Some(email), _) => Some(Self::Email(email.to_lowercase())),
            (None, Some(ip)) => Some(Self::IpAddress(ip.to_string())),
            (None, None) => None,
        }
    }
}

/// Decide whether a form may accept another response.
///
/// `existing_responses` counts records already stored for the form and
/// `prior_from_submitter` says whether this submitter already responded.
pub fn check_admission(
    settings: &FormSettings,
    status: FormStatus,
    existing_responses: u64,
    prior_from_submitter: bool,
) -> Result<(), CoreError> {
    if status != FormStatus::Published {
        return Err(CoreError::Conflict(
            "Form is not accepting responses".into(),
        ));
    }
    if let Some(max) = settings.max_responses {
        if existing_responses >= u64::from(max) {
            return Err(CoreError::Conflict("Response limit reached".into()));
        }
    }
    if !settings.allow_multiple_responses && prior_from_submitter {
        return Err(CoreError::Conflict(
            "A response from this submitter already exists".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn drafts_are_closed() {
        let err = check_admission(&FormSettings::default(), FormStatus::Draft, 0, false)
            .unwrap_err();
        assert_matches!(err, CoreError::Conflict(_));
    }

    #[test]
    fn response_limit() {
        let settings = FormSettings {
            max_responses: Some(2),
            ..Default::default()
        };
        assert!(check_admission(&settings, FormStatus::Published, 1, false).is_ok());
        assert_matches!(
            check_admission(&settings, FormStatus::Published, 2, false),
            Err(CoreError::Conflict(msg)) if msg == "Response limit reached"
        );
    }

    #[test]
    fn single_response_forms_reject_repeat_submitters() {
        let settings = FormSettings {
            allow_multiple_responses: false,
            ..Default::default()
        };
        assert!(check_admission(&settings, FormStatus::Published, 5, false).is_ok());
        assert!(check_admission(&settings, FormStatus::Published, 5, true).is_err());
        // Repeats are fine when the form allows them.
        assert!(check_admission(&FormSettings::default(), FormStatus::Published, 5, true).is_ok());
    }

    #[test]
    fn submitter_key_prefers_email() {
        assert_eq!(
            SubmitterKey::resolve(Some(" A@B.org "), Some("10.0.0.1")),
            Some(SubmitterKey::Email("a@b.org".into()))
        );
        assert_eq!(
            SubmitterKey::resolve(Some(""), Some("10.0.0.1")),
            Some(SubmitterKey::IpAddress("10.0.0.1".into()))
        );
        assert_eq!(SubmitterKey::resolve(None, None), None);
    }
}
