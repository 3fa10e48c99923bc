use std::fmt;

use serde::Serialize;

/// Login payload. Held only for the duration of a login request and never
/// written to storage.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Both fields are required before a request is sent
    pub fn is_complete(&self) -> bool {
        !self.username.trim().is_empty() && !self.password.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_password() {
        let creds = Credentials::new("farmer", "hunter2");
        let shown = format!("{:?}", creds);
        assert!(shown.contains("farmer"));
        assert!(!shown.contains("hunter2"));
    }

    #[test]
    fn test_serializes_login_payload() {
        let creds = Credentials::new("farmer", "hunter2");
        let json = serde_json::to_value(&creds).unwrap();
        assert_eq!(json, serde_json::json!({"username": "farmer", "password": "hunter2"}));
    }

    #[test]
    fn test_is_complete() {
        assert!(Credentials::new("a", "b").is_complete());
        assert!(!Credentials::new("  ", "b").is_complete());
        assert!(!Credentials::new("a", "").is_complete());
    }
}
