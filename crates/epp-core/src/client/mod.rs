//! EPP client session
//!
//! [`EppClient`] owns one transport and walks the session state machine:
//!
//! ```text
//!  connect/with_transport        login (1000)
//! ───────────────────────▶ Connected ─────────▶ Authenticated
//!                              ▲                      │
//!                              │ logout (1500) or     │
//!        Disconnected ◀────────┴── transport failure ─┘
//! ```
//!
//! Every command is sent and answered before the next one is built, so
//! there is never more than one command in flight. Any transport failure
//! drops the transport; the caller must reconnect and log in again.
//!
//! Operations are grouped by object type in the submodules, as
//! implementations of the capability traits in [`crate::traits::registrar`].

mod contact;
mod domain;
mod host;

pub use domain::{DomainCreated, NameserverDiff};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::command::{Command, CommandFactory};
use crate::config::{DataSet, EppConfig};
use crate::error::{Error, Result};
use crate::response::{Greeting, Response};
use crate::traits::{SessionOps, Transport};

/// EPP session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No usable transport
    Disconnected,
    /// Greeting received, not logged in
    Connected,
    /// Logged in; all commands allowed
    Authenticated,
}

/// Registrar-side EPP client
pub struct EppClient {
    config: EppConfig,
    factory: CommandFactory,
    transport: Option<Box<dyn Transport>>,
    state: SessionState,
    greeting: Option<Greeting>,
}

impl std::fmt::Debug for EppClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EppClient")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("greeting", &self.greeting)
            .finish()
    }
}

impl EppClient {
    /// Open a TLS session to the configured registry and read its greeting
    ///
    /// # Errors
    ///
    /// - `Error::Config`: Invalid configuration or missing TLS material
    /// - `Error::Transport` / `Error::Tls`: Connect or handshake failure
    /// - `Error::Data`: The first frame was not a greeting
    pub async fn connect(config: EppConfig) -> Result<Self> {
        config.validate()?;
        let transport = crate::transport::connect_tls(&config).await?;
        Self::with_transport(config, Box::new(transport)).await
    }

    /// Run a session over an already connected transport
    ///
    /// Only the session-level configuration is validated; TLS settings are
    /// not used.
    pub async fn with_transport(config: EppConfig, transport: Box<dyn Transport>) -> Result<Self> {
        config.validate_session()?;

        let factory = CommandFactory::new(config.transaction_prefix.clone(), config.data_set);
        let mut client = Self {
            config,
            factory,
            transport: Some(transport),
            state: SessionState::Connected,
            greeting: None,
        };

        let raw = client.receive_frame().await?;
        let greeting = Greeting::parse(&raw)?;
        info!(
            "Connected to {} (server date: {:?}, objects: {})",
            greeting.server_id,
            greeting.server_date,
            greeting.object_uris.join(", ")
        );
        client.greeting = Some(greeting);

        Ok(client)
    }

    /// Current session state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Most recent server greeting
    pub fn greeting(&self) -> Option<&Greeting> {
        self.greeting.as_ref()
    }

    /// Data set mode of this session
    pub fn data_set(&self) -> DataSet {
        self.factory.data_set()
    }

    /// Log in and set a new registrar password in the same command
    ///
    /// The new password applies to future sessions; this session stays
    /// authenticated with the old one.
    pub async fn login_with_new_password(&mut self, new_password: &str) -> Result<()> {
        if new_password.is_empty() {
            return Err(Error::validation("New password cannot be empty"));
        }
        self.login_inner(Some(new_password)).await
    }

    /// Shut the transport down without logging out
    pub async fn close(&mut self) -> Result<()> {
        self.state = SessionState::Disconnected;
        match self.transport.take() {
            Some(mut transport) => transport.close().await,
            None => Ok(()),
        }
    }

    async fn login_inner(&mut self, new_password: Option<&str>) -> Result<()> {
        match self.state {
            SessionState::Connected => {}
            SessionState::Authenticated => {
                return Err(Error::validation("Session is already authenticated"));
            }
            SessionState::Disconnected => {
                return Err(Error::validation("Cannot log in: session is disconnected"));
            }
        }

        info!("Logging in as {}", self.config.client_id);
        let command =
            self.factory
                .login(&self.config.client_id, &self.config.password, new_password)?;
        let response = self.exchange(&command).await?;

        if response.code() != 1000 {
            return Err(Error::protocol(response.code(), response.message()));
        }

        self.state = SessionState::Authenticated;
        info!("Logged in as {}", self.config.client_id);
        Ok(())
    }

    /// Fail unless logged in
    fn require_authenticated(&self) -> Result<()> {
        match self.state {
            SessionState::Authenticated => Ok(()),
            _ => Err(Error::validation("Not logged in")),
        }
    }

    /// Drop the transport after a failure
    fn disconnect(&mut self, reason: &Error) {
        if self.transport.take().is_some() {
            warn!("EPP session dropped: {}", reason);
        }
        self.state = SessionState::Disconnected;
    }

    async fn receive_frame(&mut self) -> Result<Vec<u8>> {
        let Some(transport) = self.transport.as_mut() else {
            return Err(Error::transport("Not connected"));
        };
        match transport.receive().await {
            Ok(raw) => Ok(raw),
            Err(e) => {
                self.disconnect(&e);
                Err(e)
            }
        }
    }

    async fn send_frame(&mut self, payload: &[u8]) -> Result<()> {
        let Some(transport) = self.transport.as_mut() else {
            return Err(Error::transport("Not connected"));
        };
        match transport.send(payload).await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.disconnect(&e);
                Err(e)
            }
        }
    }

    /// Send one command and decode its response
    ///
    /// Transport failures disconnect the session. Protocol and data errors
    /// leave it usable.
    async fn exchange(&mut self, command: &Command) -> Result<Response> {
        let label = command.label();
        debug!(
            "Sending {} (clTRID: {})",
            label,
            command.transaction_id().unwrap_or("-")
        );

        self.send_frame(command.xml().as_bytes()).await?;
        let raw = self.receive_frame().await?;

        let response = Response::decode(&raw).inspect_err(|e| {
            debug!("{} failed: {}", label, e);
        })?;
        if let Some(expected) = command.transaction_id() {
            response.check_transaction(expected)?;
        }

        debug!(
            "{} completed with {} (svTRID: {})",
            label,
            response.code(),
            response.sv_trid().unwrap_or("-")
        );
        Ok(response)
    }

    /// Build and exchange a command that needs an authenticated session
    async fn execute(
        &mut self,
        build: impl FnOnce(&CommandFactory) -> Result<Command>,
    ) -> Result<Response> {
        self.require_authenticated()?;
        let command = build(&self.factory)?;
        self.exchange(&command).await
    }
}

#[async_trait]
impl SessionOps for EppClient {
    async fn login(&mut self) -> Result<()> {
        self.login_inner(None).await
    }

    async fn logout(&mut self) -> Result<()> {
        if self.state != SessionState::Authenticated {
            debug!("Logout skipped: not authenticated");
            return Ok(());
        }

        info!("Logging out");
        let command = self.factory.logout()?;
        let response = self.exchange(&command).await?;
        if response.code() != 1500 {
            warn!("Logout answered with {} instead of 1500", response.code());
        }

        if let Err(e) = self.close().await {
            debug!("Transport close after logout failed: {}", e);
        }
        Ok(())
    }

    fn is_authenticated(&self) -> bool {
        self.state == SessionState::Authenticated
    }

    async fn hello(&mut self) -> Result<Greeting> {
        if self.state == SessionState::Disconnected {
            return Err(Error::validation("Cannot send hello: session is disconnected"));
        }

        let command = self.factory.hello()?;
        debug!("Sending hello");
        self.send_frame(command.xml().as_bytes()).await?;
        let raw = self.receive_frame().await?;
        let greeting = Greeting::parse(&raw)?;
        self.greeting = Some(greeting.clone());
        Ok(greeting)
    }
}
