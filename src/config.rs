//! Connection credentials.
//!
//! The credentials are the only configuration the connection layer takes.
//! They are serde-friendly so a host application can keep them in its own
//! TOML config, but loading them is the host's job.

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Immutable username/password/connection-string triple.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    username: String,
    password: String,
    /// Passed to the driver unmodified; its scheme selects the driver.
    connection_string: String,
}

impl Credentials {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        connection_string: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            connection_string: connection_string.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }

    /// Returns the connection string's scheme, lowercased, if it parses as a URL.
    pub fn scheme(&self) -> Option<String> {
        Url::parse(&self.connection_string)
            .ok()
            .map(|url| url.scheme().to_ascii_lowercase())
    }

    /// Returns a display-safe string (no password) for logs.
    ///
    /// Any password embedded in the connection string itself is masked too.
    pub fn display_string(&self) -> String {
        let target = match Url::parse(&self.connection_string) {
            Ok(mut url) if url.password().is_some() => {
                let _ = url.set_password(Some("****"));
                url.to_string()
            }
            _ => self.connection_string.clone(),
        };
        format!("{} @ {}", self.username, target)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"****")
            .field("connection_string", &self.connection_string)
            .finish()
    }
}
