use std::fmt;

use base64::{engine::general_purpose, Engine as _};

/// Login/password pair for the tracker's Basic authentication.
#[derive(Clone)]
pub struct Credentials {
    login: String,
    password: String,
}

impl Credentials {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
        }
    }

    pub fn login(&self) -> &str {
        &self.login
    }

    /// Value for the `Authorization` header: `Basic base64(login:password)`.
    pub fn header_value(&self) -> String {
        let encoded =
            general_purpose::STANDARD.encode(format!("{}:{}", self.login, self.password));
        format!("Basic {encoded}")
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &"***")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_value_uses_basic_scheme() {
        let credentials = Credentials::new("Aladdin", "open sesame");
        assert_eq!(
            credentials.header_value(),
            "Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ=="
        );
    }

    #[test]
    fn empty_password_still_encodes_separator() {
        let credentials = Credentials::new("user", "");
        assert_eq!(credentials.header_value(), "Basic dXNlcjo=");
    }

    #[test]
    fn debug_output_hides_password() {
        let credentials = Credentials::new("qa-bot", "hunter2");
        let debug = format!("{credentials:?}");
        assert!(debug.contains("qa-bot"));
        assert!(!debug.contains("hunter2"));
    }
}
