//! Seams between the bot and whatever computes its decisions.

use crate::client::GatewayClient;
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::types::{InputVector, OutputVector, Team};

/// Handle to an external decision agent.
pub trait RemoteAgent {
    /// Compute the action for one observation. The result is returned to the
    /// harness unchanged.
    fn get_output_vector(
        &mut self,
        input: &InputVector,
        team: Team,
    ) -> Result<OutputVector, GatewayError>;
}

impl<A: RemoteAgent + ?Sized> RemoteAgent for Box<A> {
    fn get_output_vector(
        &mut self,
        input: &InputVector,
        team: Team,
    ) -> Result<OutputVector, GatewayError> {
        (**self).get_output_vector(input, team)
    }
}

/// Connection factory injected into [`crate::Bot::initialize`].
pub trait AgentConnector {
    fn connect(&self) -> Result<Box<dyn RemoteAgent>, GatewayError>;
}

impl<F> AgentConnector for F
where
    F: Fn() -> Result<Box<dyn RemoteAgent>, GatewayError>,
{
    fn connect(&self) -> Result<Box<dyn RemoteAgent>, GatewayError> {
        self()
    }
}

/// Production connector: opens a gateway connection and takes one agent handle.
#[derive(Debug, Clone, Default)]
pub struct GatewayConnector {
    pub config: GatewayConfig,
}

impl GatewayConnector {
    pub fn new(config: GatewayConfig) -> Self {
        Self { config }
    }

    pub fn from_env() -> Self {
        Self::new(GatewayConfig::from_env())
    }
}

impl AgentConnector for GatewayConnector {
    fn connect(&self) -> Result<Box<dyn RemoteAgent>, GatewayError> {
        let client = GatewayClient::connect(&self.config)?;
        let agent = client.into_agent().map_err(|e| match e {
            GatewayError::Connection(_) => e,
            other => GatewayError::connection(format!("could not obtain agent: {other}")),
        })?;
        Ok(Box::new(agent))
    }
}
