use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::credentials::{CredentialProvider, Credentials};
use crate::domain::DatasetPath;
use crate::endpoints::Endpoints;
use crate::error::SpotError;
use crate::transport::{PortalResponse, PortalTransport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticating,
    Authenticated,
    Closed,
}

#[derive(Debug, Deserialize)]
struct AuthStatus {
    #[serde(default)]
    auth: bool,
}

pub struct Session<T: PortalTransport> {
    transport: Option<T>,
    endpoints: Endpoints,
    username: String,
    state: SessionState,
}

impl<T: PortalTransport> Session<T> {
    pub fn new(transport: T, endpoints: Endpoints) -> Self {
        Self {
            transport: Some(transport),
            endpoints,
            username: String::new(),
            state: SessionState::Unauthenticated,
        }
    }

    pub fn login(
        transport: T,
        endpoints: Endpoints,
        provider: &dyn CredentialProvider,
    ) -> Result<Self, SpotError> {
        let mut session = Self::new(transport, endpoints);
        session.open(&provider.credentials()?)?;
        Ok(session)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn open(&mut self, credentials: &Credentials) -> Result<(), SpotError> {
        let url = self.endpoints.auth();
        let transport = self.transport.as_ref().ok_or(SpotError::SessionClosed)?;

        self.state = SessionState::Authenticating;
        match handshake(transport, &url, credentials) {
            Ok(()) => {
                self.state = SessionState::Authenticated;
                self.username = credentials.username.clone();
                info!(username = %self.username, "authenticated with SPOT");
                Ok(())
            }
            Err(err) => {
                self.state = SessionState::Unauthenticated;
                Err(err)
            }
        }
    }

    pub fn check_authenticated(&self) -> Result<bool, SpotError> {
        let transport = self.transport.as_ref().ok_or(SpotError::SessionClosed)?;
        let url = self.endpoints.auth();
        debug!(%url, "checking authentication");
        let status: AuthStatus = transport.get(&url, &[])?.json(&url)?;
        Ok(status.auth)
    }

    pub fn reauthenticate(
        &mut self,
        provider: &dyn CredentialProvider,
    ) -> Result<bool, SpotError> {
        if self.check_authenticated()? {
            self.state = SessionState::Authenticated;
            return Ok(true);
        }

        info!("SPOT session expired, authentication required");
        self.state = SessionState::Unauthenticated;
        let credentials = provider.credentials()?;
        self.open(&credentials)?;
        self.check_authenticated()
    }

    // Later operations fail with `SessionClosed` without touching the network.
    pub fn close(&mut self) {
        if self.transport.take().is_some() {
            info!(username = %self.username, "closed SPOT session");
        }
        self.state = SessionState::Closed;
    }

    pub(crate) fn resolve(&self, dataset: &str, username: Option<&str>) -> DatasetPath {
        DatasetPath::resolve(dataset, username, &self.username)
    }

    pub(crate) fn get_json<R: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<R, SpotError> {
        self.get(url, query)?.json(url)
    }

    pub(crate) fn get(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<PortalResponse, SpotError> {
        let transport = self.authenticated()?;
        debug!(%url, ?query, "GET");
        transport.get(url, query)?.check_status(url)
    }

    fn authenticated(&self) -> Result<&T, SpotError> {
        match (self.state, self.transport.as_ref()) {
            (SessionState::Closed, _) | (_, None) => Err(SpotError::SessionClosed),
            (SessionState::Authenticated, Some(transport)) => Ok(transport),
            _ => Err(SpotError::NotAuthenticated),
        }
    }
}

fn handshake<T: PortalTransport>(
    transport: &T,
    url: &str,
    credentials: &Credentials,
) -> Result<(), SpotError> {
    debug!(%url, "fetching login page");
    transport.get(url, &[])?.check_status(url)?;

    debug!(%url, username = %credentials.username, "posting credentials");
    let response = transport.post_form(
        url,
        &[
            ("username", credentials.username.as_str()),
            ("password", credentials.password()),
        ],
    )?;
    if matches!(response.status, 401 | 403) {
        return Err(SpotError::Auth(format!(
            "credentials rejected for {} (HTTP {})",
            credentials.username, response.status
        )));
    }

    let status: AuthStatus = response.json(url)?;
    if !status.auth {
        return Err(SpotError::Auth(format!(
            "credentials rejected for {}",
            credentials.username
        )));
    }
    Ok(())
}
