//! IPC authentication (§4.9, §7 "IPC auth").
//!
//! Each payload may carry `shared_key` and/or `auth_key`. External-only
//! verbs require the shared key to match a configured process-internal
//! secret; when an auth key is configured, every verb additionally
//! requires it regardless of authority class.

#[derive(Debug, Clone, Default)]
pub struct IpcAuth {
    pub shared_key: Option<String>,
    pub auth_key: Option<String>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("authentication failed")]
pub struct AuthFailure;

impl IpcAuth {
    pub fn new(shared_key: Option<String>, auth_key: Option<String>) -> Self {
        Self { shared_key, auth_key }
    }

    /// Checks a request's presented keys against what is configured.
    /// `require_shared_key` is the verb's authority class collapsed to a
    /// bool by the caller (`Authority::ExternalOnly` → `true`).
    pub fn check(
        &self,
        require_shared_key: bool,
        presented_shared: Option<&str>,
        presented_auth: Option<&str>,
    ) -> Result<(), AuthFailure> {
        if require_shared_key {
            match (&self.shared_key, presented_shared) {
                (Some(expected), Some(got)) if expected == got => {}
                (Some(_), _) => return Err(AuthFailure),
                (None, _) => {}
            }
        }
        if let Some(expected) = &self.auth_key {
            if presented_auth != Some(expected.as_str()) {
                return Err(AuthFailure);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_keys_configured_allows_everything() {
        let auth = IpcAuth::default();
        assert!(auth.check(true, None, None).is_ok());
    }

    #[test]
    fn shared_key_mismatch_is_rejected_for_external_only() {
        let auth = IpcAuth::new(Some("secret".into()), None);
        assert!(auth.check(true, Some("wrong"), None).is_err());
        assert!(auth.check(true, Some("secret"), None).is_ok());
    }

    #[test]
    fn shared_key_not_required_for_open_verbs() {
        let auth = IpcAuth::new(Some("secret".into()), None);
        assert!(auth.check(false, None, None).is_ok());
    }

    #[test]
    fn auth_key_required_on_every_verb_when_configured() {
        let auth = IpcAuth::new(None, Some("token".into()));
        assert!(auth.check(false, None, None).is_err());
        assert!(auth.check(false, None, Some("token")).is_ok());
    }
}
