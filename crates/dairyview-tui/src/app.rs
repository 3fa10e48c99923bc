//! Application state management for dairyview.
//!
//! This module contains the `App` struct that owns UI state, the per-view
//! snapshots, and the pollers feeding them. Pollers only run for the tab on
//! screen; switching tabs drops them and mounts the new tab's.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use dairyview_core::api::ApiClient;
use dairyview_core::auth::store::keys;
use dairyview_core::auth::{
    AuthState, Authenticator, Credentials, DemoAuthenticator, FileStore, HttpAuthenticator,
    KeyValueStore, MemoryStore, SessionManager,
};
use dairyview_core::models::{DataFreshness, RoutesSnapshot, TanksSnapshot, VolumesSnapshot};
use dairyview_core::poll::{spawn_poller, PollHandle, RequestSequence, SnapshotSlot, Tagged};
use dairyview_core::utils::{current_month, shift_month};
use dairyview_core::{ApiError, Config, DashboardOverview, Gateway};

// ============================================================================
// Constants
// ============================================================================

/// Buffer size for the poll result channel.
const CHANNEL_BUFFER_SIZE: usize = 32;

/// Maximum length for username input.
const MAX_USERNAME_LENGTH: usize = 50;

/// Maximum length for password input.
/// 128 chars accommodates password managers and passphrases.
const MAX_PASSWORD_LENGTH: usize = 128;

/// Number of rows to move on page up/down.
pub const PAGE_SCROLL_SIZE: usize = 10;

// ============================================================================
// Navigation
// ============================================================================

/// Main navigation tabs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Dashboard,
    Tanks,
    Routes,
    Volumes,
}

impl Tab {
    pub const ALL: [Tab; 4] = [Tab::Dashboard, Tab::Tanks, Tab::Routes, Tab::Volumes];

    pub fn title(&self) -> &'static str {
        match self {
            Tab::Dashboard => "Dashboard",
            Tab::Tanks => "Tanks",
            Tab::Routes => "Routes",
            Tab::Volumes => "Volumes",
        }
    }

    /// Get the next tab (wrapping around)
    pub fn next(&self) -> Self {
        match self {
            Tab::Dashboard => Tab::Tanks,
            Tab::Tanks => Tab::Routes,
            Tab::Routes => Tab::Volumes,
            Tab::Volumes => Tab::Dashboard,
        }
    }

    /// Get the previous tab (wrapping around)
    pub fn prev(&self) -> Self {
        match self {
            Tab::Dashboard => Tab::Volumes,
            Tab::Tanks => Tab::Dashboard,
            Tab::Routes => Tab::Tanks,
            Tab::Volumes => Tab::Routes,
        }
    }
}

/// Overall application state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    ShowingHelp,
    LoggingIn,
    ConfirmingQuit,
    Quitting,
}

/// Login form focus state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoginFocus {
    Username,
    Password,
    Button,
}

// ============================================================================
// Poll Results
// ============================================================================

/// Tagged results sent from poll tasks back to the UI loop.
enum ViewUpdate {
    Overview(Tagged<DashboardOverview>),
    Freshness(Tagged<DataFreshness>),
    Tanks(Tagged<TanksSnapshot>),
    Routes(Tagged<RoutesSnapshot>),
    Volumes(Tagged<VolumesSnapshot>),
}

/// One ticket counter per view slot.
#[derive(Default)]
struct Sequences {
    overview: Arc<RequestSequence>,
    freshness: Arc<RequestSequence>,
    tanks: Arc<RequestSequence>,
    routes: Arc<RequestSequence>,
    volumes: Arc<RequestSequence>,
}

// ============================================================================
// Service wiring
// ============================================================================

/// Session manager and gateway, built once at startup.
pub struct Services {
    pub sessions: Arc<SessionManager>,
    pub gateway: Gateway,
    pub demo: bool,
}

impl Services {
    /// Open durable storage, pick the live or demo strategies and restore
    /// any persisted session.
    pub fn connect(config: &Config, force_demo: bool) -> Result<Self> {
        let store: Arc<dyn KeyValueStore> = match config.data_dir().and_then(|dir| FileStore::open(&dir)) {
            Ok(store) => Arc::new(store),
            Err(e) => {
                warn!(error = %e, "Session storage unavailable, sessions will not survive restart");
                Arc::new(MemoryStore::new())
            }
        };
        Self::with_store(config, force_demo, store)
    }

    /// Wire services over `store`. `--demo` or `demo_mode` in config selects
    /// demo mode explicitly; otherwise a persisted demo session keeps it.
    pub fn with_store(config: &Config, force_demo: bool, store: Arc<dyn KeyValueStore>) -> Result<Self> {
        let requested_demo = force_demo || config.demo_mode;
        let stored_demo = store.get(keys::DEMO_MODE).as_deref() == Some("true");
        let demo = requested_demo || stored_demo;

        let authenticator: Arc<dyn Authenticator> = if demo {
            Arc::new(DemoAuthenticator)
        } else {
            let timeout = std::time::Duration::from_secs(config.request_timeout_secs);
            Arc::new(HttpAuthenticator::new(ApiClient::new(&config.api_base_url, timeout)?))
        };

        let sessions = Arc::new(SessionManager::new(store, authenticator));
        if sessions.restore().is_some() && requested_demo && !stored_demo {
            // A live token must never be paired with generated data
            warn!("Demo mode requested over a saved live session, signing out");
            sessions.logout();
        }

        let gateway = Gateway::from_config(config, demo, sessions.clone())?;
        info!(demo, source = gateway.source_name(), "Services ready");

        Ok(Self {
            sessions,
            gateway,
            demo,
        })
    }
}

// ============================================================================
// Main Application Struct
// ============================================================================

/// Main application state container
pub struct App {
    pub config: Config,
    pub sessions: Arc<SessionManager>,
    gateway: Gateway,
    pub demo: bool,

    // UI State
    pub state: AppState,
    pub current_tab: Tab,
    pub tanks_selection: usize,
    pub routes_selection: usize,
    pub volumes_selection: usize,
    pub volumes_month: String,

    // Login form state
    pub login_username: String,
    pub login_password: String,
    pub login_focus: LoginFocus,
    pub login_error: Option<String>,

    // View snapshots
    pub overview: SnapshotSlot<DashboardOverview>,
    pub freshness: SnapshotSlot<DataFreshness>,
    pub tanks: SnapshotSlot<TanksSnapshot>,
    pub routes: SnapshotSlot<RoutesSnapshot>,
    pub volumes: SnapshotSlot<VolumesSnapshot>,
    sequences: Sequences,

    // Pollers for the mounted tab
    pollers: Vec<PollHandle>,
    update_rx: mpsc::Receiver<ViewUpdate>,
    update_tx: mpsc::Sender<ViewUpdate>,
    auth_rx: watch::Receiver<AuthState>,

    // Status message
    pub status_message: Option<String>,
}

impl App {
    pub fn new(config: Config, services: Services) -> Self {
        let (update_tx, update_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let mut auth_rx = services.sessions.subscribe();
        auth_rx.borrow_and_update();

        let login_username = config.last_username.clone().unwrap_or_default();
        let login_password = config.prefill_password.clone().unwrap_or_default();

        Self {
            config,
            sessions: services.sessions,
            gateway: services.gateway,
            demo: services.demo,
            state: AppState::Normal,
            current_tab: Tab::Dashboard,
            tanks_selection: 0,
            routes_selection: 0,
            volumes_selection: 0,
            volumes_month: current_month(),
            login_username,
            login_password,
            login_focus: LoginFocus::Username,
            login_error: None,
            overview: SnapshotSlot::new(),
            freshness: SnapshotSlot::new(),
            tanks: SnapshotSlot::new(),
            routes: SnapshotSlot::new(),
            volumes: SnapshotSlot::new(),
            sequences: Sequences::default(),
            pollers: Vec::new(),
            update_rx,
            update_tx,
            auth_rx,
            status_message: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.sessions.is_authenticated()
    }

    /// Display name of the signed-in dairy
    pub fn tenant_name(&self) -> String {
        self.sessions
            .current()
            .map(|s| s.tenant_name)
            .unwrap_or_else(|| "Not signed in".to_string())
    }

    // =========================================================================
    // Login
    // =========================================================================

    /// Start the login process (show login overlay)
    pub fn start_login(&mut self) {
        self.state = AppState::LoggingIn;
        self.login_focus = if self.login_username.is_empty() {
            LoginFocus::Username
        } else {
            LoginFocus::Password
        };
    }

    /// Attempt login with the credentials from the login form
    pub async fn attempt_login(&mut self) -> Result<()> {
        let credentials = Credentials::new(self.login_username.trim(), self.login_password.clone());
        if !credentials.is_complete() {
            self.login_error = Some("Username and password required".to_string());
            return Err(anyhow::anyhow!("Username and password required"));
        }

        self.login_error = None;
        self.status_message = Some("Signing in...".to_string());

        match self.sessions.login(&credentials).await {
            Ok(session) => {
                self.config.last_username = Some(credentials.username.clone());
                if let Err(e) = self.config.save() {
                    warn!(error = %e, "Failed to save config");
                }

                // Consume the watch change so it is not treated as a fresh transition.
                self.auth_rx.borrow_and_update();
                self.login_password.clear();
                self.state = AppState::Normal;
                self.status_message = Some(format!("Signed in to {}", session.tenant_name));
                self.mount_current_tab();
                Ok(())
            }
            Err(e) => {
                self.status_message = None;
                self.login_error = Some(login_error_message(&e));
                Err(e.into())
            }
        }
    }

    /// Sign out on request. Expiry goes through `on_auth_change` instead.
    pub fn logout(&mut self) {
        self.sessions.logout();
        self.auth_rx.borrow_and_update();
        self.clear_views();
        self.login_password.clear();
        self.login_error = None;
        self.status_message = Some("Signed out".to_string());
        self.start_login();
    }

    // =========================================================================
    // View lifecycle
    // =========================================================================

    pub fn select_tab(&mut self, tab: Tab) {
        if tab != self.current_tab {
            self.current_tab = tab;
            self.mount_current_tab();
        }
    }

    /// Drop the running pollers and start the ones for the current tab.
    pub fn mount_current_tab(&mut self) {
        self.pollers.clear();

        let Some(session) = self.sessions.valid_session() else {
            debug!("No session, not mounting pollers");
            return;
        };
        let tenant = session.tenant_id;
        let tx = self.update_tx.clone();
        let gateway = self.gateway.clone();

        match self.current_tab {
            Tab::Dashboard => {
                self.pollers.push(spawn_poller(
                    Some(self.config.dashboard_interval()),
                    self.sequences.overview.clone(),
                    fetcher(&gateway, &tenant, |g, t| async move { g.overview(&t).await }),
                    ViewUpdate::Overview,
                    tx.clone(),
                ));
                self.pollers.push(spawn_poller(
                    None,
                    self.sequences.freshness.clone(),
                    fetcher(&gateway, &tenant, |g, t| async move { g.data_freshness(&t).await }),
                    ViewUpdate::Freshness,
                    tx,
                ));
            }
            Tab::Tanks => {
                self.pollers.push(spawn_poller(
                    Some(self.config.tanks_interval()),
                    self.sequences.tanks.clone(),
                    fetcher(&gateway, &tenant, |g, t| async move { g.tanks(&t).await }),
                    ViewUpdate::Tanks,
                    tx,
                ));
            }
            Tab::Routes => {
                self.pollers.push(spawn_poller(
                    Some(self.config.routes_interval()),
                    self.sequences.routes.clone(),
                    fetcher(&gateway, &tenant, |g, t| async move { g.routes(&t).await }),
                    ViewUpdate::Routes,
                    tx,
                ));
            }
            Tab::Volumes => {
                let month = self.volumes_month.clone();
                self.pollers.push(spawn_poller(
                    None,
                    self.sequences.volumes.clone(),
                    move || {
                        let gateway = gateway.clone();
                        let tenant = tenant.clone();
                        let month = month.clone();
                        async move { gateway.volumes(&tenant, Some(&month)).await }
                    },
                    ViewUpdate::Volumes,
                    tx,
                ));
            }
        }
        debug!(tab = self.current_tab.title(), pollers = self.pollers.len(), "Tab mounted");
    }

    /// Manual refresh of the current tab
    pub fn refresh_current_tab(&mut self) {
        if self.pollers.is_empty() {
            self.mount_current_tab();
        } else {
            for poller in &self.pollers {
                poller.refresh();
            }
        }
        self.status_message = Some(format!("Refreshing {}...", self.current_tab.title()));
    }

    /// Move the volumes view by `delta` months and refetch.
    pub fn shift_volumes_month(&mut self, delta: i32) {
        self.volumes_month = shift_month(&self.volumes_month, delta);
        self.volumes.reset(self.sequences.volumes.current());
        self.volumes_selection = 0;
        if self.current_tab == Tab::Volumes {
            self.mount_current_tab();
        }
    }

    fn clear_views(&mut self) {
        self.pollers.clear();
        self.overview.reset(self.sequences.overview.current());
        self.freshness.reset(self.sequences.freshness.current());
        self.tanks.reset(self.sequences.tanks.current());
        self.routes.reset(self.sequences.routes.current());
        self.volumes.reset(self.sequences.volumes.current());
    }

    // =========================================================================
    // Background results
    // =========================================================================

    /// React to session changes and fold in finished fetches.
    pub fn check_background_tasks(&mut self) {
        if self.auth_rx.has_changed().unwrap_or(false) {
            let state = self.auth_rx.borrow_and_update().clone();
            self.on_auth_change(state);
        }

        let mut updates = Vec::new();
        while let Ok(update) = self.update_rx.try_recv() {
            updates.push(update);
        }
        for update in updates {
            self.apply_update(update);
        }
    }

    fn on_auth_change(&mut self, state: AuthState) {
        match state {
            AuthState::Anonymous => {
                info!("Session ended, returning to login");
                self.clear_views();
                self.login_password.clear();
                if self.login_error.is_none() {
                    self.login_error = Some("Your session has ended. Please sign in again.".to_string());
                }
                self.status_message = None;
                self.start_login();
            }
            AuthState::Authenticated(_) => {
                if self.pollers.is_empty() {
                    self.mount_current_tab();
                }
            }
            AuthState::Unknown => {}
        }
    }

    fn apply_update(&mut self, update: ViewUpdate) {
        let applied = match update {
            ViewUpdate::Overview(tagged) => self.overview.apply(tagged),
            ViewUpdate::Freshness(tagged) => self.freshness.apply(tagged),
            ViewUpdate::Tanks(tagged) => {
                let applied = self.tanks.apply(tagged);
                let len = self.tanks.get().map(|t| t.tanks.len()).unwrap_or(0);
                self.tanks_selection = clamp_selection(self.tanks_selection, len);
                applied
            }
            ViewUpdate::Routes(tagged) => {
                let applied = self.routes.apply(tagged);
                let len = self.routes.get().map(|r| r.routes.len()).unwrap_or(0);
                self.routes_selection = clamp_selection(self.routes_selection, len);
                applied
            }
            ViewUpdate::Volumes(tagged) => self.volumes.apply(tagged),
        };
        if applied {
            self.status_message = None;
        }
    }

    /// Error of the current tab's primary slot, for the status bar
    pub fn current_error(&self) -> Option<&str> {
        match self.current_tab {
            Tab::Dashboard => self.overview.error(),
            Tab::Tanks => self.tanks.error(),
            Tab::Routes => self.routes.error(),
            Tab::Volumes => self.volumes.error(),
        }
    }

    /// When the current tab's data was last replaced
    pub fn last_updated(&self) -> Option<chrono::DateTime<chrono::Local>> {
        match self.current_tab {
            Tab::Dashboard => self.overview.updated_at(),
            Tab::Tanks => self.tanks.updated_at(),
            Tab::Routes => self.routes.updated_at(),
            Tab::Volumes => self.volumes.updated_at(),
        }
    }

    // =========================================================================
    // Selection
    // =========================================================================

    fn current_list_len(&self) -> usize {
        match self.current_tab {
            Tab::Dashboard => 0,
            Tab::Tanks => self.tanks.get().map(|t| t.tanks.len()).unwrap_or(0),
            Tab::Routes => self.routes.get().map(|r| r.routes.len()).unwrap_or(0),
            Tab::Volumes => self.volumes.get().map(|v| v.customer_summaries().len()).unwrap_or(0),
        }
    }

    fn selection_mut(&mut self) -> Option<&mut usize> {
        match self.current_tab {
            Tab::Dashboard => None,
            Tab::Tanks => Some(&mut self.tanks_selection),
            Tab::Routes => Some(&mut self.routes_selection),
            Tab::Volumes => Some(&mut self.volumes_selection),
        }
    }

    /// Move the current tab's selection by `delta` rows, clamped to the list.
    pub fn move_selection(&mut self, delta: isize) {
        let len = self.current_list_len();
        if let Some(selection) = self.selection_mut() {
            let target = (*selection as isize).saturating_add(delta).max(0) as usize;
            *selection = clamp_selection(target, len);
        }
    }
}

/// Build a poll fetch closure that calls `call` with a fresh gateway/tenant pair.
fn fetcher<T, F, Fut>(gateway: &Gateway, tenant: &str, call: F) -> impl Fn() -> Fut + Send + Sync + 'static
where
    F: Fn(Gateway, String) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<T, ApiError>> + Send + 'static,
{
    let gateway = gateway.clone();
    let tenant = tenant.to_string();
    move || call(gateway.clone(), tenant.clone())
}

fn clamp_selection(selection: usize, len: usize) -> usize {
    selection.min(len.saturating_sub(1))
}

/// User-facing text for a failed login
pub fn login_error_message(error: &ApiError) -> String {
    match error {
        ApiError::InvalidCredentials => error.to_string(),
        ApiError::Network(e) if e.is_timeout() => "Connection timed out. Please try again.".to_string(),
        ApiError::Network(_) => "Unable to connect to server. Check your connection.".to_string(),
        other => format!("Login failed: {}", other),
    }
}

// ============================================================================
// Input validation helpers (exported for use in input.rs)
// ============================================================================

/// Check if a character is valid for input (no control characters)
fn is_valid_input_char(c: char) -> bool {
    !c.is_control()
}

/// Check if a username character should be accepted
pub fn can_add_username_char(current_len: usize, c: char) -> bool {
    current_len < MAX_USERNAME_LENGTH && is_valid_input_char(c)
}

/// Check if a password character should be accepted
pub fn can_add_password_char(current_len: usize, c: char) -> bool {
    current_len < MAX_PASSWORD_LENGTH && is_valid_input_char(c)
}

// ============================================================================
// Tests
// ============================================================================
