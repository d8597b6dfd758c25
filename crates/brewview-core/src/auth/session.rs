use tracing::debug;

use super::AuthError;
use crate::models::{LoginPayload, User};

/// Coarse state of a session, derived from its flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    LoggedOut,
    Loading,
    LoggedIn,
    LoginFailed,
}

/// Session transitions, for callers that queue them as messages.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    LoginBegin,
    LoginSucceeded(LoginPayload),
    LoginFailed(AuthError),
    LogoutBegin,
    LogoutSucceeded,
    LogoutFailed(AuthError),
    UserUpdated,
}

/// Authentication state of the console.
///
/// Only the transition methods below mutate a session. Each one touches
/// exactly the fields it names; everything else carries over, including a
/// stale `is_authenticated` during a reload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    /// `None` is the empty user mapping.
    pub user_data: Option<User>,
    pub is_authenticated: bool,
    pub is_anonymous: bool,
    pub is_protected: bool,
    pub user_loading: bool,
    pub user_error: Option<AuthError>,
    pub pw_change_required: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, action: SessionAction) {
        match action {
            SessionAction::LoginBegin => self.begin_login(),
            SessionAction::LoginSucceeded(payload) => self.login_succeeded(payload),
            SessionAction::LoginFailed(err) => self.login_failed(err),
            SessionAction::LogoutBegin => self.begin_logout(),
            SessionAction::LogoutSucceeded => self.logout_succeeded(),
            SessionAction::LogoutFailed(err) => self.logout_failed(err),
            SessionAction::UserUpdated => self.user_updated(),
        }
    }

    pub fn begin_login(&mut self) {
        self.user_data = None;
        self.user_loading = true;
        self.user_error = None;
    }

    pub fn login_succeeded(&mut self, payload: LoginPayload) {
        debug!(username = %payload.user.username, "Login succeeded");
        self.is_protected = payload.user.is_protected();
        self.is_anonymous = payload.user.is_anonymous();
        self.user_data = Some(payload.user);
        self.is_authenticated = true;
        self.user_loading = false;
        self.user_error = None;
        self.pw_change_required = payload.pw_change_required;
    }

    pub fn login_failed(&mut self, error: AuthError) {
        debug!(error = %error, "Login failed");
        self.user_data = None;
        self.is_authenticated = false;
        self.is_anonymous = false;
        self.is_protected = false;
        self.user_loading = false;
        self.user_error = Some(error);
    }

    pub fn begin_logout(&mut self) {
        self.user_loading = true;
    }

    pub fn logout_failed(&mut self, error: AuthError) {
        debug!(error = %error, "Logout failed");
        self.user_loading = false;
        self.user_error = Some(error);
    }

    pub fn logout_succeeded(&mut self) {
        self.user_data = None;
        self.is_authenticated = false;
        self.is_anonymous = false;
        self.is_protected = false;
        self.user_loading = false;
        self.user_error = None;
    }

    /// A successful user update satisfies a pending password change.
    pub fn user_updated(&mut self) {
        if self.pw_change_required {
            self.pw_change_required = false;
        }
    }

    pub fn phase(&self) -> SessionPhase {
        if self.user_loading {
            SessionPhase::Loading
        } else if self.user_error.is_some() && !self.is_authenticated {
            SessionPhase::LoginFailed
        } else if self.is_authenticated {
            SessionPhase::LoggedIn
        } else {
            SessionPhase::LoggedOut
        }
    }

    pub fn user(&self) -> Option<&User> {
        self.user_data.as_ref()
    }

    pub fn username(&self) -> Option<&str> {
        self.user_data.as_ref().map(|u| u.username.as_str())
    }
}
