//! Console runtime: the session, catalog and event socket wired together.
//!
//! `Console` owns every piece of mutable client state in a single
//! `ConsoleState` and mutates it from one task. Event subscribers receive the
//! state by reference on each dispatch instead of holding it themselves.
//!
//! Responses are applied as they arrive. There is no request cancellation,
//! so a slow response can overwrite the result of a newer request of the
//! same kind.

pub mod theme;

use std::future::Future;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError};
use crate::auth::{coalesce_permissions, AuthError, Session, TokenStore};
use crate::cache::CacheManager;
use crate::catalog::{SystemCatalog, CATALOG_SUBSCRIBER};
use crate::config::Config;
use crate::events::socket::ConnectAttempt;
use crate::events::{Event, EventDispatcher, EventSocket, ReconnectPolicy};
use crate::models::{LoginPayload, ServerConfig, System, TokenPair, User};
use crate::navigation::{self, Access, NavigationGate, Required, Route, View};

pub use theme::{Themes, DEFAULT_THEME, THEMES};

/// Backend calls the console depends on.
#[allow(async_fn_in_trait)]
pub trait ConsoleApi {
    async fn get_config(&self) -> Result<ServerConfig>;
    async fn issue_token(&self, username: &str, password: &str) -> Result<TokenPair>;
    async fn load_user(&self, token: Option<&str>) -> Result<LoginPayload>;
    async fn set_theme(&self, user_id: &str, theme: &str) -> Result<()>;
    async fn change_password(&self, user_id: &str, current: &str, new: &str) -> Result<()>;
    async fn get_systems(&self) -> Result<Vec<System>>;
    /// Token sent with subsequent authenticated calls.
    fn use_token(&mut self, token: Option<String>);
    fn event_socket_endpoint(&self) -> String;
}

impl ConsoleApi for ApiClient {
    async fn get_config(&self) -> Result<ServerConfig> {
        ApiClient::get_config(self).await
    }

    async fn issue_token(&self, username: &str, password: &str) -> Result<TokenPair> {
        ApiClient::issue_token(self, username, password).await
    }

    async fn load_user(&self, token: Option<&str>) -> Result<LoginPayload> {
        ApiClient::load_user(self, token).await
    }

    async fn set_theme(&self, user_id: &str, theme: &str) -> Result<()> {
        ApiClient::set_theme(self, user_id, theme).await
    }

    async fn change_password(&self, user_id: &str, current: &str, new: &str) -> Result<()> {
        ApiClient::change_password(self, user_id, current, new).await
    }

    async fn get_systems(&self) -> Result<Vec<System>> {
        ApiClient::get_systems(self).await
    }

    fn use_token(&mut self, token: Option<String>) {
        match token {
            Some(token) => self.set_token(token),
            None => self.clear_token(),
        }
    }

    fn event_socket_endpoint(&self) -> String {
        ApiClient::event_socket_endpoint(self)
    }
}

/// All mutable client state, handed to event subscribers on dispatch.
#[derive(Debug, Clone, Default)]
pub struct ConsoleState {
    pub session: Session,
    pub catalog: SystemCatalog,
    pub server_config: ServerConfig,
    pub themes: Themes,
}

/// Where a catalog loaded from the local cache stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedCatalog {
    /// For display, e.g. "5m ago".
    pub age: String,
    pub stale: bool,
}

/// A real, logged-in account rather than the anonymous user.
pub fn is_user(user: Option<&User>) -> bool {
    user.map(|u| !u.is_anonymous()).unwrap_or(false)
}

pub struct Console<A = ApiClient> {
    api: A,
    tokens: TokenStore,
    config: Config,
    cache: Option<CacheManager>,
    state: ConsoleState,
    dispatcher: EventDispatcher<ConsoleState>,
    socket: EventSocket,
    events_tx: mpsc::UnboundedSender<Event>,
    events_rx: mpsc::UnboundedReceiver<Event>,
    gate: NavigationGate,
    reconnect: ReconnectPolicy,
    failed_ticks: u32,
}

impl<A: ConsoleApi> Console<A> {
    pub fn new(api: A, tokens: TokenStore, config: Config) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let socket = EventSocket::new(api.event_socket_endpoint(), events_tx.clone());

        let mut dispatcher = EventDispatcher::new();
        let catalog = dispatcher.subscribe(CATALOG_SUBSCRIBER, |state: &mut ConsoleState, event: &Event| {
            state.catalog.apply(event);
        });
        if let Err(e) = catalog {
            warn!(error = %e, "Catalog will not follow server events");
        }

        let reconnect = config.reconnect_policy();
        Self {
            api,
            tokens,
            config,
            cache: None,
            state: ConsoleState::default(),
            dispatcher,
            socket,
            events_tx,
            events_rx,
            gate: NavigationGate,
            reconnect,
            failed_ticks: 0,
        }
    }

    pub fn with_cache(mut self, cache: CacheManager) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_reconnect_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    // ===== Accessors =====

    pub fn state(&self) -> &ConsoleState {
        &self.state
    }

    pub fn session(&self) -> &Session {
        &self.state.session
    }

    pub fn catalog(&self) -> &SystemCatalog {
        &self.state.catalog
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// Register further event subscribers.
    pub fn dispatcher_mut(&mut self) -> &mut EventDispatcher<ConsoleState> {
        &mut self.dispatcher
    }

    /// Sender feeding the same queue as the event socket.
    pub fn event_sender(&self) -> mpsc::UnboundedSender<Event> {
        self.events_tx.clone()
    }

    pub fn auth_enabled(&self) -> bool {
        self.state.server_config.auth_enabled
    }

    // ===== Configuration =====

    /// Fetch the server configuration, falling back to the cached copy.
    pub async fn load_config(&mut self) -> Result<()> {
        match self.api.get_config().await {
            Ok(server_config) => {
                if let Some(cache) = &self.cache {
                    if let Err(e) = cache.save_server_config(&server_config) {
                        warn!(error = %e, "Failed to cache server config");
                    }
                }
                self.state.server_config = server_config;
                Ok(())
            }
            Err(e) => {
                if let Some(Ok(Some(cached))) = self.cache.as_ref().map(|c| c.load_server_config()) {
                    warn!(error = %format!("{:#}", e), age = %cached.age_display(), "Using cached server config");
                    self.state.server_config = cached.data;
                }
                Err(e)
            }
        }
    }

    // ===== Session flows =====

    /// Install a stored token on the API client.
    pub fn handle_token(&mut self, token: &str) {
        self.api.use_token(Some(token.to_string()));
    }

    fn stored_token(&self) -> Option<String> {
        match self.tokens.get_token() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %format!("{:#}", e), "Failed to read stored token");
                None
            }
        }
    }

    /// Startup: pick up a stored token, connect the socket, load the user.
    /// A user that cannot be loaded is logged out so the session is usable.
    pub async fn initial_load(&mut self) -> Result<()> {
        let token = self.stored_token();
        if let Some(token) = token.as_deref() {
            self.handle_token(token);
        }

        self.socket.connect(token.as_deref());

        if let Err(e) = self.load_user(token.as_deref()).await {
            if ApiError::is_auth_failure_in(&e) {
                info!("Stored token was refused, logging out");
            } else {
                warn!(error = %format!("{:#}", e), "Initial user load failed, logging out");
            }
            self.do_logout().await?;
        }
        Ok(())
    }

    /// Load the user behind `token` and derive its permissions.
    pub async fn load_user(&mut self, token: Option<&str>) -> Result<()> {
        self.state.session.begin_login();

        match self.api.load_user(token).await {
            Ok(mut payload) => {
                let (_, permissions) = coalesce_permissions(&payload.user.roles);
                payload.user.permissions = permissions;

                let theme = payload.user.theme().unwrap_or(DEFAULT_THEME).to_string();
                self.change_theme(&theme, false).await?;

                info!(username = %payload.user.username, "User loaded");
                self.state.session.login_succeeded(payload);
                Ok(())
            }
            Err(e) => {
                self.state.session.login_failed(AuthError::login(&e));
                Err(e)
            }
        }
    }

    /// Reload everything that depends on who the user is.
    pub async fn change_user(&mut self, token: Option<&str>) -> Result<()> {
        self.load_user(token).await?;
        if let Err(e) = self.load_systems().await {
            warn!(error = %format!("{:#}", e), "Failed to reload systems after user change");
        }
        Ok(())
    }

    pub async fn login(&mut self, username: &str, password: &str) -> Result<()> {
        self.state.session.begin_login();

        let pair = match self.api.issue_token(username, password).await {
            Ok(pair) => pair,
            Err(e) => {
                self.state.session.login_failed(AuthError::login(&e));
                return Err(e);
            }
        };

        if let Err(e) = self.store_tokens(&pair) {
            self.state.session.login_failed(AuthError::login(&e));
            return Err(e);
        }
        self.handle_token(&pair.token);

        self.config.last_username = Some(username.to_string());
        if let Err(e) = self.config.save() {
            warn!(error = %format!("{:#}", e), "Failed to save config");
        }

        self.socket.connect(Some(&pair.token));
        self.change_user(Some(&pair.token)).await
    }

    fn store_tokens(&mut self, pair: &TokenPair) -> Result<()> {
        self.tokens.set_token(&pair.token)?;
        if let Some(refresh) = pair.refresh.as_deref() {
            self.tokens.set_refresh(refresh)?;
        }
        Ok(())
    }

    /// Forget the stored tokens and fall back to the anonymous user.
    pub async fn do_logout(&mut self) -> Result<()> {
        self.state.session.begin_logout();

        if let Err(e) = self.tokens.clear_all() {
            self.state.session.logout_failed(AuthError::logout(&e));
            return Err(e);
        }
        self.api.use_token(None);
        self.state.session.logout_succeeded();
        info!("Logged out");

        // Servers with auth enabled may refuse an anonymous user
        if let Err(e) = self.change_user(None).await {
            debug!(error = %format!("{:#}", e), "No anonymous user available");
        }
        Ok(())
    }

    pub async fn update_user_password(&mut self, current: &str, new: &str) -> Result<()> {
        let user_id = self
            .state
            .session
            .user()
            .and_then(|u| u.id.clone())
            .context("No user with an id is loaded")?;
        self.api.change_password(&user_id, current, new).await?;
        self.state.session.user_updated();
        Ok(())
    }

    /// Activate `theme` locally; with `send_update`, also store it on the
    /// server for real users.
    pub async fn change_theme(&mut self, theme: &str, send_update: bool) -> Result<()> {
        self.config.current_theme = Some(theme.to_string());
        if let Err(e) = self.config.save() {
            warn!(error = %format!("{:#}", e), "Failed to save theme");
        }
        self.state.themes.select(theme);

        if !send_update {
            return Ok(());
        }
        let user = self.state.session.user();
        if is_user(user) {
            if let Some(user_id) = user.and_then(|u| u.id.as_deref()) {
                self.api.set_theme(user_id, theme).await?;
            }
        }
        Ok(())
    }

    // ===== Authorization =====

    pub fn has_permission<'a>(&self, required: impl Into<Required<'a>>) -> bool {
        navigation::has_permission(self.auth_enabled(), self.state.session.user(), required)
    }

    pub fn check_view(&self, view: View) -> Access {
        self.gate.check(view, &self.state.session, self.auth_enabled())
    }

    pub fn window_title(&self, parts: &[&str]) -> String {
        parts
            .iter()
            .copied()
            .chain(std::iter::once(self.state.server_config.application_name.as_str()))
            .collect::<Vec<_>>()
            .join(" - ")
    }

    /// Resolve a console path against the server's namespaces.
    pub fn resolve_route(&self, path: &str) -> Option<Route> {
        Route::resolve(path, &self.state.server_config.all_namespaces())
    }

    /// The system a route points at, from the loaded catalog.
    pub fn resolve_system(&self, route: &Route) -> Option<&System> {
        route.system(&self.state.catalog)
    }

    // ===== Catalog =====

    /// Fetch the full catalog. On failure the catalog is emptied.
    pub async fn load_systems(&mut self) -> Result<()> {
        match self.api.get_systems().await {
            Ok(systems) => {
                if let Some(cache) = &self.cache {
                    if let Err(e) = cache.save_systems(&systems) {
                        warn!(error = %e, "Failed to cache systems");
                    }
                }
                self.state.catalog.replace_all(systems);
                Ok(())
            }
            Err(e) => {
                self.state.catalog.clear();
                Err(e)
            }
        }
    }

    /// Fill the catalog from the local cache, if there is one.
    pub fn load_cached_systems(&mut self) -> Result<Option<CachedCatalog>> {
        let Some(cache) = &self.cache else {
            return Ok(None);
        };
        let Some(cached) = cache.load_systems()? else {
            return Ok(None);
        };
        let loaded = CachedCatalog {
            age: cached.age_display(),
            stale: cached.is_stale(),
        };
        if loaded.stale {
            warn!(age = %loaded.age, "Cached system catalog is stale");
        }
        self.state.catalog.replace_all(cached.data);
        Ok(Some(loaded))
    }

    // ===== Events =====

    pub fn handle_event(&mut self, event: &Event) {
        self.dispatcher.dispatch(&mut self.state, event);
    }

    /// Re-issue the stored token to the socket; returns the wait until the
    /// next attempt.
    pub fn reconnect_tick(&mut self) -> std::time::Duration {
        let token = self.stored_token();
        match self.socket.connect(token.as_deref()) {
            ConnectAttempt::TokenRefreshed => self.failed_ticks = 0,
            ConnectAttempt::Opened => self.failed_ticks = self.failed_ticks.saturating_add(1),
        }
        self.reconnect.next_delay(self.failed_ticks)
    }

    /// Process events and reconnect ticks until `shutdown` resolves.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let timer = tokio::time::sleep(self.reconnect.next_delay(0));
        tokio::pin!(timer);

        info!("Console event loop started");
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                Some(event) = self.events_rx.recv() => self.handle_event(&event),
                _ = &mut timer => {
                    let delay = self.reconnect_tick();
                    timer.as_mut().reset(Instant::now() + delay);
                }
            }
        }

        self.socket.disconnect();
        info!("Console event loop stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{SessionPhase, TokenBackend};
    use crate::events::{EventError, SYSTEM_CREATED, SYSTEM_REMOVED, SYSTEM_UPDATED};
    use crate::models::Role;
    use serde_json::json;
    use std::cell::RefCell;

    const GOOD_TOKEN: &str = "good-token";

    struct FakeApi {
        allow_anonymous: bool,
        systems_fail: bool,
        pw_change_required: bool,
        calls: RefCell<Vec<String>>,
        token: Option<String>,
    }

    impl FakeApi {
        fn new() -> Self {
            Self {
                allow_anonymous: true,
                systems_fail: false,
                pw_change_required: false,
                calls: RefCell::new(Vec::new()),
                token: None,
            }
        }

        fn record(&self, call: impl Into<String>) {
            self.calls.borrow_mut().push(call.into());
        }
    }

    impl ConsoleApi for FakeApi {
        async fn get_config(&self) -> Result<ServerConfig> {
            Ok(ServerConfig {
                auth_enabled: true,
                application_name: "Garden".to_string(),
                ..ServerConfig::default()
            })
        }

        async fn issue_token(&self, username: &str, password: &str) -> Result<TokenPair> {
            self.record(format!("issue_token:{}", username));
            if password == "secret" {
                Ok(TokenPair {
                    token: GOOD_TOKEN.to_string(),
                    refresh: Some("refresh".to_string()),
                })
            } else {
                Err(ApiError::Unauthorized.into())
            }
        }

        async fn load_user(&self, token: Option<&str>) -> Result<LoginPayload> {
            self.record(format!("load_user:{}", token.unwrap_or("-")));
            match token {
                Some(GOOD_TOKEN) => {
                    let mut user = User::new("operator");
                    user.id = Some("u1".to_string());
                    user.roles = vec![Role::new("ops")
                        .with_permissions(["bg-job-read"])
                        .with_roles(vec![Role::new("reader").with_permissions(["bg-system-read"])])];
                    user.preferences.theme = Some("slate".to_string());
                    Ok(LoginPayload {
                        user,
                        pw_change_required: self.pw_change_required,
                    })
                }
                Some(_) => Err(ApiError::Unauthorized.into()),
                None if self.allow_anonymous => Ok(LoginPayload {
                    user: User::new("anonymous"),
                    pw_change_required: false,
                }),
                None => Err(ApiError::Unauthorized.into()),
            }
        }

        async fn set_theme(&self, user_id: &str, theme: &str) -> Result<()> {
            self.record(format!("set_theme:{}:{}", user_id, theme));
            Ok(())
        }

        async fn change_password(&self, user_id: &str, _current: &str, _new: &str) -> Result<()> {
            self.record(format!("change_password:{}", user_id));
            Ok(())
        }

        async fn get_systems(&self) -> Result<Vec<System>> {
            self.record("get_systems");
            if self.systems_fail {
                return Err(ApiError::ServerError("down".to_string()).into());
            }
            Ok(serde_json::from_value(json!([
                {"id": "1", "name": "echo", "version": "1.0.0"},
                {"id": "2", "name": "sleeper", "version": "2.0.0"}
            ]))?)
        }

        fn use_token(&mut self, token: Option<String>) {
            self.token = token;
        }

        fn event_socket_endpoint(&self) -> String {
            // Nothing listens here; connects fail fast
            "ws://127.0.0.1:9/api/v1/socket/events/".to_string()
        }
    }

    fn console(api: FakeApi) -> Console<FakeApi> {
        Console::new(api, TokenStore::in_memory(), Config::ephemeral())
    }

    fn calls(console: &Console<FakeApi>) -> Vec<String> {
        console.api.calls.borrow().clone()
    }

    #[tokio::test]
    async fn test_initial_load_with_stored_token() {
        let mut console = console(FakeApi::new());
        console.tokens.set_token(GOOD_TOKEN).unwrap();

        console.initial_load().await.unwrap();

        let session = console.session();
        assert_eq!(session.phase(), SessionPhase::LoggedIn);
        assert_eq!(session.username(), Some("operator"));
        let user = session.user().unwrap();
        assert!(user.permissions.contains("bg-job-read"));
        assert!(user.permissions.contains("bg-system-read"));
        assert_eq!(console.api.token.as_deref(), Some(GOOD_TOKEN));
        assert_eq!(console.state().themes.current(), Some("slate"));
        assert_eq!(console.config().current_theme.as_deref(), Some("slate"));
    }

    #[tokio::test]
    async fn test_initial_load_with_bad_token_logs_out() {
        let mut console = console(FakeApi::new());
        console.tokens.set_token("expired").unwrap();
        console.tokens.set_refresh("old-refresh").unwrap();

        console.initial_load().await.unwrap();

        assert_eq!(console.tokens().get_token().unwrap(), None);
        assert_eq!(console.tokens().get_refresh().unwrap(), None);
        assert_eq!(console.api.token, None);
        let session = console.session();
        assert!(session.is_anonymous);
        assert!(session.is_protected);
        assert_eq!(console.state().themes.current(), Some(DEFAULT_THEME));
        assert_eq!(
            calls(&console),
            vec!["load_user:expired", "load_user:-", "get_systems"]
        );
    }

    #[tokio::test]
    async fn test_initial_load_without_anonymous_user() {
        let mut api = FakeApi::new();
        api.allow_anonymous = false;
        let mut console = console(api);

        console.initial_load().await.unwrap();
        assert_eq!(console.session().phase(), SessionPhase::LoginFailed);
        assert!(!console.session().is_authenticated);
    }

    #[tokio::test]
    async fn test_login_success() {
        let mut console = console(FakeApi::new());
        console.login("operator", "secret").await.unwrap();

        assert_eq!(console.tokens().get_token().unwrap().as_deref(), Some(GOOD_TOKEN));
        assert_eq!(console.tokens().get_refresh().unwrap().as_deref(), Some("refresh"));
        assert!(console.session().is_authenticated);
        assert_eq!(console.session().user_error, None);
        assert_eq!(console.catalog().len(), 2);
        assert_eq!(console.config().last_username.as_deref(), Some("operator"));
    }

    #[tokio::test]
    async fn test_login_bad_password() {
        let mut console = console(FakeApi::new());
        assert!(console.login("operator", "wrong").await.is_err());

        let session = console.session();
        assert_eq!(session.phase(), SessionPhase::LoginFailed);
        assert!(matches!(session.user_error, Some(AuthError::LoginFailed(_))));
        assert_eq!(console.tokens().get_token().unwrap(), None);
    }

    struct LockedBackend;

    impl TokenBackend for LockedBackend {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Ok(Some(GOOD_TOKEN.to_string()))
        }

        fn set(&mut self, _key: &str, _value: &str) -> Result<()> {
            anyhow::bail!("keychain locked")
        }

        fn delete(&mut self, _key: &str) -> Result<()> {
            anyhow::bail!("keychain locked")
        }
    }

    #[tokio::test]
    async fn test_login_token_storage_failure() {
        let mut console = Console::new(
            FakeApi::new(),
            TokenStore::new(Box::new(LockedBackend)),
            Config::ephemeral(),
        );
        let err = console.login("operator", "secret").await.unwrap_err();
        assert_eq!(err.to_string(), "keychain locked");

        let session = console.session();
        assert_eq!(session.phase(), SessionPhase::LoginFailed);
        assert!(!session.user_loading);
        assert!(matches!(session.user_error, Some(AuthError::LoginFailed(ref m)) if m.contains("keychain locked")));
        assert!(!calls(&console).iter().any(|c| c.starts_with("load_user")));
    }

    #[tokio::test]
    async fn test_logout_failure_keeps_session() {
        let mut console = Console::new(
            FakeApi::new(),
            TokenStore::new(Box::new(LockedBackend)),
            Config::ephemeral(),
        );
        console.initial_load().await.unwrap();
        assert!(console.session().is_authenticated);

        assert!(console.do_logout().await.is_err());
        let session = console.session();
        assert!(!session.user_loading);
        assert!(matches!(session.user_error, Some(AuthError::LogoutFailed(_))));
        assert!(session.is_authenticated);
        assert_eq!(session.username(), Some("operator"));
    }

    #[tokio::test]
    async fn test_update_user_password_clears_flag() {
        let mut api = FakeApi::new();
        api.pw_change_required = true;
        let mut console = console(api);
        console.login("operator", "secret").await.unwrap();
        assert!(console.session().pw_change_required);

        console.update_user_password("secret", "better").await.unwrap();
        assert!(!console.session().pw_change_required);
        assert!(calls(&console).contains(&"change_password:u1".to_string()));
    }

    #[tokio::test]
    async fn test_change_theme_sends_update_for_real_users_only() {
        let mut console = console(FakeApi::new());
        console.initial_load().await.unwrap();
        console.change_theme("slate", true).await.unwrap();
        assert!(!calls(&console).iter().any(|c| c.starts_with("set_theme")));

        console.login("operator", "secret").await.unwrap();
        console.change_theme("default", true).await.unwrap();
        assert!(calls(&console).contains(&"set_theme:u1:default".to_string()));
        assert_eq!(console.state().themes.current(), Some("default"));
    }

    #[tokio::test]
    async fn test_load_systems_failure_clears_catalog() {
        let mut console = console(FakeApi::new());
        console.load_systems().await.unwrap();
        assert_eq!(console.catalog().len(), 2);

        console.api.systems_fail = true;
        assert!(console.load_systems().await.is_err());
        assert!(console.catalog().is_empty());
    }

    #[tokio::test]
    async fn test_systems_cache_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let mut console = console(FakeApi::new())
            .with_cache(CacheManager::new(dir.path().to_path_buf()).unwrap());
        assert_eq!(console.load_cached_systems().unwrap(), None);

        console.load_systems().await.unwrap();
        console.state.catalog.clear();
        assert_eq!(
            console.load_cached_systems().unwrap(),
            Some(CachedCatalog {
                age: "just now".to_string(),
                stale: false,
            })
        );
        assert_eq!(console.catalog().len(), 2);
    }

    #[tokio::test]
    async fn test_stale_systems_cache_is_flagged() {
        let dir = tempfile::tempdir().unwrap();
        let cached_at = chrono::Utc::now() - chrono::Duration::hours(3);
        let contents = json!({
            "data": [{"id": "1", "name": "echo", "version": "1.0.0"}],
            "cached_at": cached_at,
        });
        std::fs::write(dir.path().join("systems.json"), contents.to_string()).unwrap();

        let mut console = console(FakeApi::new())
            .with_cache(CacheManager::new(dir.path().to_path_buf()).unwrap());
        let loaded = console.load_cached_systems().unwrap().unwrap();
        assert!(loaded.stale);
        assert_eq!(loaded.age, "3h ago");
        assert_eq!(console.catalog().len(), 1);
    }

    #[tokio::test]
    async fn test_catalog_follows_events() {
        let mut console = console(FakeApi::new());
        console.load_systems().await.unwrap();

        console.handle_event(&Event::new(SYSTEM_CREATED, json!({"id": "3", "name": "new", "version": "1"})));
        console.handle_event(&Event::new(SYSTEM_CREATED, json!({"id": "3", "name": "new", "version": "1"})));
        console.handle_event(&Event::new(SYSTEM_REMOVED, json!({"id": "1"})));
        console.handle_event(&Event::new(SYSTEM_UPDATED, json!({"id": "2", "name": "renamed", "version": "2.0.0"})));
        console.handle_event(&Event::new(SYSTEM_UPDATED, json!({"id": "4", "name": "ghost", "version": "1"})));

        let catalog = console.catalog();
        assert_eq!(catalog.len(), 2);
        assert!(catalog.find_by_id("1").is_none());
        assert_eq!(catalog.find_by_id("2").map(|s| s.name.as_str()), Some("renamed"));
        assert!(catalog.find_by_id("4").is_none());
    }

    #[tokio::test]
    async fn test_catalog_subscriber_cannot_be_silently_replaced() {
        let mut console = console(FakeApi::new());
        let err = console
            .dispatcher_mut()
            .subscribe(CATALOG_SUBSCRIBER, |_: &mut ConsoleState, _: &Event| {})
            .unwrap_err();
        assert_eq!(err, EventError::DuplicateSubscriber(CATALOG_SUBSCRIBER.to_string()));
    }

    #[tokio::test]
    async fn test_run_processes_events_in_order() {
        let mut console = console(FakeApi::new());
        let (done_tx, done_rx) = tokio::sync::oneshot::channel::<Vec<String>>();
        let mut done_tx = Some(done_tx);
        let mut seen = Vec::new();
        console
            .dispatcher_mut()
            .subscribe("event_log", move |_: &mut ConsoleState, event: &Event| {
                seen.push(event.name.clone());
                if event.name == "DONE" {
                    if let Some(tx) = done_tx.take() {
                        let _ = tx.send(std::mem::take(&mut seen));
                    }
                }
            })
            .unwrap();

        let sender = console.event_sender();
        sender.send(Event::new(SYSTEM_CREATED, json!({"id": 1}))).unwrap();
        sender.send(Event::new(SYSTEM_UPDATED, json!({"id": 1, "name": "echo"}))).unwrap();
        sender.send(Event::new(SYSTEM_REMOVED, json!({"id": 1}))).unwrap();
        sender.send(Event::new("DONE", json!(null))).unwrap();

        let (result_tx, result_rx) = tokio::sync::oneshot::channel();
        console
            .run(async move {
                let seen = done_rx.await.unwrap_or_default();
                let _ = result_tx.send(seen);
            })
            .await
            .unwrap();

        assert_eq!(
            result_rx.await.unwrap(),
            vec![SYSTEM_CREATED, SYSTEM_UPDATED, SYSTEM_REMOVED, "DONE"]
        );
        assert!(console.catalog().is_empty());
    }

    #[tokio::test]
    async fn test_authorization_helpers() {
        let mut console = console(FakeApi::new());
        assert!(console.auth_enabled());
        assert!(!console.has_permission("bg-job-read"));
        assert_eq!(console.check_view(View::Jobs), Access::RedirectToLogin);

        console.load_config().await.unwrap();
        console.login("operator", "secret").await.unwrap();
        assert!(console.has_permission("bg-job-read"));
        assert!(console.has_permission(&["bg-user-read", "bg-system-read"]));
        assert_eq!(console.check_view(View::Jobs), Access::Allow);
        assert_eq!(console.check_view(View::UserAdmin), Access::Forbidden);

        console.state.server_config.auth_enabled = false;
        assert!(console.has_permission("bg-user-read"));
        assert_eq!(console.check_view(View::UserAdmin), Access::Allow);
    }

    #[tokio::test]
    async fn test_resolve_route_uses_server_namespaces() {
        let mut console = console(FakeApi::new());
        console.load_config().await.unwrap();
        console.state.server_config.namespaces.local = Some("default".to_string());
        console.state.server_config.namespaces.remote = vec!["east".to_string()];
        console.load_systems().await.unwrap();

        let route = console.resolve_route("/east/systems/2").unwrap();
        assert_eq!(route.view, View::SystemById);
        assert_eq!(route.namespace.as_deref(), Some("east"));
        assert_eq!(console.resolve_system(&route).map(|s| s.name.as_str()), Some("sleeper"));

        let route = console.resolve_route("/default/systems/echo/1.0.0").unwrap();
        assert_eq!(console.resolve_system(&route).map(|s| s.id.as_str()), Some("1"));

        assert!(console.resolve_route("/west/systems").is_none());
        assert_eq!(console.resolve_route("/admin/roles/add").unwrap().view, View::RoleCreate);
    }

    #[tokio::test]
    async fn test_window_title() {
        let mut console = console(FakeApi::new());
        console.load_config().await.unwrap();
        assert_eq!(console.window_title(&["echo", "Systems"]), "echo - Systems - Garden");
        assert_eq!(console.window_title(&[]), "Garden");
    }

    #[tokio::test]
    async fn test_reconnect_tick_uses_fixed_interval() {
        let mut console = console(FakeApi::new());
        assert_eq!(console.reconnect_tick(), std::time::Duration::from_secs(5));
        assert_eq!(console.reconnect_tick(), std::time::Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_reconnect_tick_backs_off_when_down() {
        let mut console = console(FakeApi::new()).with_reconnect_policy(ReconnectPolicy::Backoff {
            base: std::time::Duration::from_secs(1),
            max: std::time::Duration::from_secs(8),
        });
        // Nothing was connected yet, so the first tick counts as a failure
        assert_eq!(console.reconnect_tick(), std::time::Duration::from_secs(2));
    }
}
