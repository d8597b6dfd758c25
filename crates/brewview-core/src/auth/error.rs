use thiserror::Error;

/// Failure recorded on the session by a login or logout flow.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Login failed: {0}")]
    LoginFailed(String),

    #[error("Logout failed: {0}")]
    LogoutFailed(String),
}

impl AuthError {
    /// Flatten an error chain into a login failure.
    pub fn login(err: &anyhow::Error) -> Self {
        AuthError::LoginFailed(format!("{:#}", err))
    }

    /// Flatten an error chain into a logout failure.
    pub fn logout(err: &anyhow::Error) -> Self {
        AuthError::LogoutFailed(format!("{:#}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_login_error_keeps_context_chain() {
        let err = Err::<(), _>(anyhow::anyhow!("401"))
            .context("Failed to load user")
            .unwrap_err();
        assert_eq!(
            AuthError::login(&err),
            AuthError::LoginFailed("Failed to load user: 401".to_string())
        );
        assert_eq!(
            AuthError::login(&err).to_string(),
            "Login failed: Failed to load user: 401"
        );
    }
}
