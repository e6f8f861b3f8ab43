//! Bearer token collaborator.
//!
//! Acquiring tokens (login forms, refresh) is out of scope for the chat
//! client; it only asks for the current token at connect time.

/// Supplies the bearer token used to open a chat connection
#[cfg_attr(test, mockall::automock)]
pub trait CredentialSource: Send {
    /// Current token, or `None` when the user is not signed in
    fn bearer_token(&self) -> Option<String>;
}

/// A fixed token (or the lack of one)
#[derive(Debug, Clone, Default)]
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }

    pub fn none() -> Self {
        Self(None)
    }
}

impl From<Option<String>> for StaticToken {
    fn from(token: Option<String>) -> Self {
        Self(token)
    }
}

impl CredentialSource for StaticToken {
    fn bearer_token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Reads the token from an environment variable on every connect
#[derive(Debug, Clone)]
pub struct EnvCredentialSource {
    variable: String,
}

impl EnvCredentialSource {
    pub fn new(variable: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
        }
    }
}

impl CredentialSource for EnvCredentialSource {
    fn bearer_token(&self) -> Option<String> {
        std::env::var(&self.variable).ok()
    }
}
