//! Credential manager configuration.
//!
//! Each customization point is an optional callback: `None` selects the
//! documented default behavior, `Some` replaces it entirely.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use tokenkeeper_core::{
    AuthenticationState, DecodeOptions, Method, RequestConfig, RequestContext, Response, Result,
};
use tokenkeeper_store::{StorageConfig, StorageFactory};

use crate::manager::CredentialManager;

/// Shapes an outgoing login or refresh request from its input.
pub type ConfigureFn<T> = Arc<dyn Fn(&T, &mut RequestConfig, &CredentialManager) + Send + Sync>;

/// Maps a login or refresh response to the next authentication state.
pub type MapFn = Arc<
    dyn Fn(&Response, &RequestConfig, &CredentialManager) -> Result<AuthenticationState>
        + Send
        + Sync,
>;

/// Attaches credentials to an outgoing request.
pub type AuthenticateFn =
    Arc<dyn Fn(&mut RequestConfig, &CredentialManager) -> Result<()> + Send + Sync>;

/// Configuration of the login or refresh exchange.
///
/// `T` is the input handed to [`configure`](StepConfig::configure): the raw
/// credentials (as JSON) for login, the current refresh token for refresh.
pub struct StepConfig<T: ?Sized> {
    pub url: Option<String>,
    pub method: Option<Method>,
    pub headers: BTreeMap<String, String>,
    pub configure: Option<ConfigureFn<T>>,
    pub map: Option<MapFn>,
}

impl<T: ?Sized> StepConfig<T> {
    pub fn new() -> Self {
        Self {
            url: None,
            method: None,
            headers: BTreeMap::new(),
            configure: None,
            map: None,
        }
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Replace the default request shaping.
    pub fn configure<F>(mut self, configure: F) -> Self
    where
        F: Fn(&T, &mut RequestConfig, &CredentialManager) + Send + Sync + 'static,
    {
        self.configure = Some(Arc::new(configure));
        self
    }

    /// Replace the default response-to-state mapping.
    pub fn map<F>(mut self, map: F) -> Self
    where
        F: Fn(&Response, &RequestConfig, &CredentialManager) -> Result<AuthenticationState>
            + Send
            + Sync
            + 'static,
    {
        self.map = Some(Arc::new(map));
        self
    }

    /// A step is usable once it has either a URL or a `configure` callback.
    pub fn is_configured(&self) -> bool {
        self.url.is_some() || self.configure.is_some()
    }

    /// The request this step starts from, before its input is applied.
    pub(crate) fn request_config(&self, action: &str) -> RequestConfig {
        RequestConfig {
            url: self.url.clone(),
            method: self.method,
            headers: self.headers.clone(),
            context: RequestContext::unauthenticated(action),
            ..RequestConfig::default()
        }
    }
}

impl<T: ?Sized> Default for StepConfig<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> Clone for StepConfig<T> {
    fn clone(&self) -> Self {
        Self {
            url: self.url.clone(),
            method: self.method,
            headers: self.headers.clone(),
            configure: self.configure.clone(),
            map: self.map.clone(),
        }
    }
}

impl<T: ?Sized> fmt::Debug for StepConfig<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepConfig")
            .field("url", &self.url)
            .field("method", &self.method)
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .field("configure", &self.configure.is_some())
            .field("map", &self.map.is_some())
            .finish()
    }
}

/// Configuration of a [`CredentialManager`].
///
/// ```
/// use tokenkeeper::{JwtConfig, StepConfig};
/// use tokenkeeper_core::Method;
/// use tokenkeeper_store::StorageConfig;
///
/// let config = JwtConfig::new()
///     .login(StepConfig::new().url("/auth").method(Method::Post))
///     .refresh(StepConfig::new().url("/auth/refresh"))
///     .storage(StorageConfig::memory());
///
/// assert!(config.refresh.is_configured());
/// ```
#[derive(Clone, Default)]
pub struct JwtConfig {
    pub login: StepConfig<Value>,
    pub refresh: StepConfig<str>,
    pub authenticate: Option<AuthenticateFn>,
    pub storage: Option<StorageConfig>,
    /// Resolves `storage` to a backend.
    pub storage_factory: StorageFactory,
    /// Defaults for every [`CredentialManager::decode`] call.
    pub decode_options: DecodeOptions,
}

impl JwtConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn login(mut self, login: StepConfig<Value>) -> Self {
        self.login = login;
        self
    }

    pub fn refresh(mut self, refresh: StepConfig<str>) -> Self {
        self.refresh = refresh;
        self
    }

    /// Replace the default `Authorization: Bearer` header injection.
    pub fn authenticate<F>(mut self, authenticate: F) -> Self
    where
        F: Fn(&mut RequestConfig, &CredentialManager) -> Result<()> + Send + Sync + 'static,
    {
        self.authenticate = Some(Arc::new(authenticate));
        self
    }

    pub fn storage(mut self, storage: StorageConfig) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn storage_factory(mut self, factory: StorageFactory) -> Self {
        self.storage_factory = factory;
        self
    }

    pub fn decode_options(mut self, options: DecodeOptions) -> Self {
        self.decode_options = options;
        self
    }
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("login", &self.login)
            .field("refresh", &self.refresh)
            .field("authenticate", &self.authenticate.is_some())
            .field("storage", &self.storage)
            .field("decode_options", &self.decode_options)
            .finish()
    }
}
