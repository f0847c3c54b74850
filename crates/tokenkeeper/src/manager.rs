//! Credential manager.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use tokenkeeper_core::error::{AuthError, InvalidInputError};
use tokenkeeper_core::events::{self, ExpiredEvent, LoginEvent, LogoutEvent, RequestEvent};
use tokenkeeper_core::state::unix_timestamp;
use tokenkeeper_core::{
    AuthenticationState, Claims, Client, CredentialStore, DecodeOptions, Error, Event, Method,
    RequestConfig, Response, Result, Subscription,
};
use tokenkeeper_store::StorageConfig;

use crate::config::JwtConfig;
use crate::hooks::{Authenticate, CredentialsExpired, RefreshCheck};

/// Context action of login requests.
pub const ACTION_LOGIN: &str = "jwt:login";
/// Context action of refresh requests.
pub const ACTION_REFRESH: &str = "jwt:refresh";

/// Priority of the refresh check on outgoing requests.
pub const REFRESH_PRIORITY: i32 = 102;
/// Priority of credential injection on outgoing requests.
pub const AUTHENTICATE_PRIORITY: i32 = 100;
/// Priority of the logout triggered by unrecoverable expiry.
pub const EXPIRED_PRIORITY: i32 = -100;

/// Which configured step a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Login,
    Refresh,
}

/// Manages the credentials of a single session on a [`Client`].
///
/// The manager performs login requests, keeps the received tokens and
/// attaches them to every request sent through the client. Before a
/// request leaves, an expired access token is transparently refreshed when
/// a valid refresh token and a refresh endpoint exist. When the credentials
/// cannot be renewed, an [`ExpiredEvent`] is dispatched, the request fails
/// and the state is cleared through [`logout`](CredentialManager::logout).
///
/// Requests opt out of authentication with `context.authenticate =
/// Some(false)`.
///
/// Concurrent requests that all observe an expired token each trigger their
/// own refresh; refreshes are not coalesced.
///
/// # Example
///
/// ```no_run
/// use serde_json::json;
/// use tokenkeeper::{CredentialManager, JwtConfig, StepConfig};
/// use tokenkeeper_core::{Client, Method};
/// use tokenkeeper_http::ReqwestTransport;
///
/// # async fn example() -> Result<(), tokenkeeper_core::Error> {
/// let client = Client::new(ReqwestTransport::with_base_url("https://api.example.com")?);
/// let config = JwtConfig::new()
///     .login(StepConfig::new().url("/auth").method(Method::Post))
///     .refresh(StepConfig::new().url("/auth/refresh"));
/// let manager = CredentialManager::attach(&client, config)?;
///
/// manager.login(&json!({"username": "alice", "password": "secret"})).await?;
/// let posts = client.get("/posts").await?;
/// # Ok(())
/// # }
/// ```
pub struct CredentialManager {
    client: Client,
    config: JwtConfig,
    session: RwLock<Session>,
    subscriptions: Mutex<Vec<Subscription>>,
}

/// The store and the state it mirrors. Both live under one lock so that a
/// store swap cannot interleave with a state write.
struct Session {
    store: Option<Arc<dyn CredentialStore>>,
    state: Option<AuthenticationState>,
}

impl CredentialManager {
    /// Create a manager and wire it into `client`.
    ///
    /// Reads the persisted state from the configured store and registers
    /// the request hooks and the expiry subscription.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be created or read.
    #[instrument(skip(client, config), fields(storage = ?config.storage.as_ref().map(|s| &s.kind)))]
    pub fn attach(client: &Client, config: JwtConfig) -> Result<Arc<Self>> {
        let store = resolve_store(&config, config.storage.as_ref())?;
        let state = read_store(store.as_deref())?;

        debug!(authenticated = state.is_some(), "Credential manager created");

        let manager = Arc::new(Self {
            client: client.clone(),
            config,
            session: RwLock::new(Session { store, state }),
            subscriptions: Mutex::new(Vec::new()),
        });

        let weak = Arc::downgrade(&manager);
        let subscriptions = vec![
            client.on(
                events::REQUEST,
                REFRESH_PRIORITY,
                Arc::new(RefreshCheck::new(weak.clone())),
            ),
            client.on(
                events::REQUEST,
                AUTHENTICATE_PRIORITY,
                Arc::new(Authenticate::new(weak.clone())),
            ),
            client.on(
                events::EXPIRED,
                EXPIRED_PRIORITY,
                Arc::new(CredentialsExpired::new(weak)),
            ),
        ];
        *manager
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = subscriptions;

        Ok(manager)
    }

    /// Remove the manager's hooks from its client.
    pub fn detach(&self) {
        let subscriptions = std::mem::take(
            &mut *self
                .subscriptions
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for subscription in &subscriptions {
            self.client.dispatcher().off(subscription);
        }
    }

    /// Returns the client this manager is attached to.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Returns the configuration.
    pub fn config(&self) -> &JwtConfig {
        &self.config
    }

    // ========================================================================
    // Storage
    // ========================================================================

    /// Switch to another store, replacing the in-memory state with what the
    /// new store holds. `None` keeps the state in memory only.
    #[instrument(skip(self, storage), fields(kind = ?storage.as_ref().map(|s| &s.kind)))]
    pub fn set_storage(&self, storage: Option<StorageConfig>) -> Result<()> {
        let store = resolve_store(&self.config, storage.as_ref())?;
        let state = read_store(store.as_deref())?;

        *self.session.write().unwrap_or_else(PoisonError::into_inner) =
            Session { store, state };

        info!("Credential store replaced");
        Ok(())
    }

    /// Follow a storage configuration, calling
    /// [`set_storage`](Self::set_storage) on every change.
    ///
    /// The task ends when the sender is dropped or the manager is gone.
    pub fn watch_storage(
        self: &Arc<Self>,
        mut storage: watch::Receiver<Option<StorageConfig>>,
    ) -> JoinHandle<()> {
        let manager = Arc::downgrade(self);
        tokio::spawn(async move {
            while storage.changed().await.is_ok() {
                let config = storage.borrow_and_update().clone();
                let Some(manager) = manager.upgrade() else {
                    break;
                };
                if let Err(err) = manager.set_storage(config) {
                    warn!(error = %err, "Failed to switch credential store");
                }
            }
        })
    }

    /// Backend kind of the current store, if any.
    pub fn store_kind(&self) -> Option<String> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .store
            .as_ref()
            .map(|store| store.kind().to_string())
    }

    // ========================================================================
    // State
    // ========================================================================

    /// Replace the authentication state and persist it.
    ///
    /// # Errors
    ///
    /// Returns an error if the state has an empty token or the store fails.
    /// The in-memory state is replaced even when persisting fails.
    ///
    /// The session lock is held until the store write returns, so a
    /// concurrent [`set_storage`](Self::set_storage) waits for it.
    pub fn set_state(&self, next: Option<AuthenticationState>) -> Result<()> {
        if let Some(state) = &next {
            state.validate()?;
        }

        let mut session = self.session.write().unwrap_or_else(PoisonError::into_inner);
        session.state = next;

        match &session.store {
            Some(store) => store.write(session.state.as_ref()),
            None => Ok(()),
        }
    }

    /// Returns a copy of the current state.
    pub fn state(&self) -> Option<AuthenticationState> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .state
            .clone()
    }

    fn with_state<R>(&self, f: impl FnOnce(Option<&AuthenticationState>) -> R) -> R {
        f(self
            .session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .state
            .as_ref())
    }

    /// Authenticated means an access token is held, expired or not.
    pub fn is_authenticated(&self) -> bool {
        self.with_state(|state| state.is_some())
    }

    /// `true` without a state.
    pub fn is_token_expired(&self) -> bool {
        let now = unix_timestamp();
        self.with_state(|state| state.is_none_or(|s| s.is_token_expired_at(now)))
    }

    /// `true` without a state or without a refresh token.
    pub fn is_refresh_token_expired(&self) -> bool {
        let now = unix_timestamp();
        self.with_state(|state| state.is_none_or(|s| s.is_refresh_token_expired_at(now)))
    }

    /// `None` without a state, otherwise whether both tokens are expired.
    pub fn is_credentials_expired(&self) -> Option<bool> {
        let now = unix_timestamp();
        self.with_state(|state| state.map(|s| s.is_credentials_expired_at(now)))
    }

    pub fn token(&self) -> Option<String> {
        self.with_state(|state| state.map(|s| s.token.clone()))
    }

    pub fn token_expiry(&self) -> Option<i64> {
        self.with_state(|state| state.and_then(|s| s.token_expiry))
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.with_state(|state| state.and_then(|s| s.refresh_token.clone()))
    }

    pub fn refresh_token_expiry(&self) -> Option<i64> {
        self.with_state(|state| state.and_then(|s| s.refresh_token_expiry))
    }

    /// When the current credentials were obtained.
    pub fn authentication_date(&self) -> Option<DateTime<Utc>> {
        self.with_state(|state| state.and_then(AuthenticationState::authentication_date))
    }

    /// Decode a token with the configured options, overridden by `options`.
    pub fn decode(&self, token: &str, options: Option<&DecodeOptions>) -> Result<Claims> {
        let options = match options {
            Some(options) => self.config.decode_options.merged_with(options),
            None => self.config.decode_options.clone(),
        };
        Ok(tokenkeeper_core::claims::decode(token, &options)?)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Perform a login request and keep the received credentials.
    ///
    /// Without a `configure` callback, the credentials are sent as query
    /// parameters for GET (or unset) methods and as the JSON body otherwise.
    ///
    /// # Errors
    ///
    /// Transport errors are returned unchanged. Mapping errors are returned
    /// when the response does not hold usable credentials.
    #[instrument(skip(self, credentials), fields(url = ?self.config.login.url))]
    pub async fn login<C>(&self, credentials: &C) -> Result<Response>
    where
        C: Serialize + ?Sized,
    {
        info!("Logging in");

        let credentials = serde_json::to_value(credentials).map_err(|e| InvalidInputError::Other {
            message: format!("credentials are not serializable: {}", e),
        })?;

        let step = &self.config.login;
        let mut config = step.request_config(ACTION_LOGIN);

        match &step.configure {
            Some(configure) => configure(&credentials, &mut config, self),
            None if matches!(config.method, None | Some(Method::Get)) => {
                config.params = Some(credentials);
            }
            None => config.data = Some(credentials),
        }

        let response = self.client.request(config.clone()).await?;
        self.apply_response(&response, &config, Step::Login).await?;

        debug!("Logged in");
        Ok(response)
    }

    /// Exchange the refresh token for new credentials.
    ///
    /// `trigger` is the request that needed fresh credentials. When it is
    /// given and the refresh fails, an [`ExpiredEvent`] is dispatched before
    /// the error is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if no refresh token is held or the exchange fails.
    #[instrument(skip(self, trigger), fields(url = ?self.config.refresh.url, triggered = trigger.is_some()))]
    pub async fn refresh(&self, trigger: Option<&RequestEvent>) -> Result<Response> {
        info!("Refreshing credentials");

        match self.exchange_refresh_token().await {
            Ok(response) => {
                debug!("Credentials refreshed");
                Ok(response)
            }
            Err(err) => match trigger {
                Some(request) => Err(self.credentials_expired(request, err).await),
                None => Err(err),
            },
        }
    }

    async fn exchange_refresh_token(&self) -> Result<Response> {
        let refresh_token = self.refresh_token().ok_or(AuthError::MissingRefreshToken)?;

        let step = &self.config.refresh;
        let mut config = step.request_config(ACTION_REFRESH);

        match &step.configure {
            Some(configure) => configure(refresh_token.as_str(), &mut config, self),
            None => {
                config.method = Some(Method::Post);
                config.data = Some(serde_json::json!({ "refresh_token": refresh_token }));
            }
        }

        let response = self.client.request(config.clone()).await?;
        self.apply_response(&response, &config, Step::Refresh).await?;
        Ok(response)
    }

    /// Discard the credentials.
    ///
    /// The [`LogoutEvent`] is dispatched first; listener failures are logged
    /// and never prevent the state from being cleared.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<()> {
        info!("Logging out");

        let mut event = Event::from(LogoutEvent);
        if let Err(err) = self.client.dispatch(&mut event, false).await {
            warn!(error = %err, "Logout listeners failed");
        }

        self.set_state(None)
    }

    // ========================================================================
    // Request hooks
    // ========================================================================

    /// Make sure the credentials are usable before `request` is sent.
    pub(crate) async fn refresh_credentials(&self, request: &RequestEvent) -> Result<()> {
        if request.context().authentication_disabled() {
            return Ok(());
        }

        let now = unix_timestamp();
        let Some((access_expired, refresh_expired)) = self.with_state(|state| {
            state.map(|s| (s.is_token_expired_at(now), s.is_refresh_token_expired_at(now)))
        }) else {
            return Ok(());
        };

        if !access_expired {
            return Ok(());
        }

        if refresh_expired || !self.config.refresh.is_configured() {
            warn!(
                refresh_expired,
                refresh_configured = self.config.refresh.is_configured(),
                "Access token expired and cannot be refreshed"
            );
            let err = Error::from(AuthError::UnableToRefresh);
            return Err(self.credentials_expired(request, err).await);
        }

        self.refresh(Some(request)).await.map(|_| ())
    }

    /// Attach the credentials to an outgoing request.
    pub(crate) fn authenticate_request(&self, config: &mut RequestConfig) -> Result<()> {
        if config.context.authentication_disabled() {
            return Ok(());
        }

        let Some(token) = self.token() else {
            return Ok(());
        };

        match &self.config.authenticate {
            Some(authenticate) => authenticate(config, self)?,
            None => config.set_bearer(&token),
        }

        config.context.is_authenticated = true;
        Ok(())
    }

    /// Dispatch an [`ExpiredEvent`] and hand back the error to fail with.
    async fn credentials_expired(&self, request: &RequestEvent, error: Error) -> Error {
        let mut event = Event::from(ExpiredEvent {
            request: request.clone(),
            error: error.clone(),
        });

        if let Err(err) = self.client.dispatch(&mut event, false).await {
            warn!(error = %err, "Expired listeners failed");
        }

        error
    }

    // ========================================================================
    // Response mapping
    // ========================================================================

    async fn apply_response(
        &self,
        response: &Response,
        config: &RequestConfig,
        step: Step,
    ) -> Result<()> {
        let map = match step {
            Step::Login => &self.config.login.map,
            Step::Refresh => &self.config.refresh.map,
        };

        let state = match map {
            Some(map) => map(response, config, self)?,
            None => self.default_state(response)?,
        };

        self.set_state(Some(state.clone()))?;
        let claims = self.decode(&state.token, None)?;

        let mut event = Event::from(LoginEvent {
            response: response.clone(),
            state,
            claims,
        });
        if let Err(err) = self.client.dispatch(&mut event, false).await {
            warn!(error = %err, "Login listeners failed");
        }

        Ok(())
    }

    /// Read `token` and `refresh_token` from the response body.
    fn default_state(&self, response: &Response) -> Result<AuthenticationState> {
        let field = |name: &str| {
            response
                .data
                .get(name)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
        };

        let token = field("token").ok_or_else(|| Error::mapping("response has no 'token'"))?;
        let claims = self.decode(token, None)?;

        let mut state = AuthenticationState::new(token)?
            .with_token_expiry(claims.exp)
            .with_established_at(unix_timestamp());

        if let Some(refresh_token) = field("refresh_token") {
            let claims = self.decode(refresh_token, None)?;
            state = state.with_refresh_token(refresh_token, claims.exp);
        }

        Ok(state)
    }
}

fn resolve_store(
    config: &JwtConfig,
    storage: Option<&StorageConfig>,
) -> Result<Option<Arc<dyn CredentialStore>>> {
    storage
        .map(|storage| config.storage_factory.create(storage))
        .transpose()
}

fn read_store(store: Option<&dyn CredentialStore>) -> Result<Option<AuthenticationState>> {
    match store {
        Some(store) => store.read(),
        None => Ok(None),
    }
}

impl Drop for CredentialManager {
    fn drop(&mut self) {
        self.detach();
    }
}

// Custom Debug impl that hides sensitive data
impl fmt::Debug for CredentialManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialManager")
            .field("config", &self.config)
            .field("store", &self.store_kind())
            .field("state", &self.state())
            .finish()
    }
}
