use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

/// Basic-auth credentials for the chat service
#[derive(Clone)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// State only reachable while holding the gate
#[derive(Debug)]
pub struct GateState {
    credentials: Credentials,
    requests: u64,
    failures: u64,
}

impl GateState {
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Books one finished request
    pub fn record(&mut self, succeeded: bool) {
        self.requests += 1;
        if !succeeded {
            self.failures += 1;
        }
    }

    pub fn requests(&self) -> u64 {
        self.requests
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }
}

/// Single mutual-exclusion section every outbound request passes through.
///
/// Constructed once at startup and cloned into the client; holding the guard
/// for the whole request serializes all watchers' traffic.
#[derive(Debug, Clone)]
pub struct RequestGate {
    inner: Arc<Mutex<GateState>>,
}

impl RequestGate {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            inner: Arc::new(Mutex::new(GateState {
                credentials,
                requests: 0,
                failures: 0,
            })),
        }
    }

    /// Waits for exclusive use of the credentials
    pub async fn enter(&self) -> MutexGuard<'_, GateState> {
        self.inner.lock().await
    }
}
