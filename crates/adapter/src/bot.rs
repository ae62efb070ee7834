//! Bot adapter
//!
//! Bridges the harness game loop to the external decision agent. The adapter
//! holds the team and one remote agent handle; every decision is forwarded
//! verbatim.

use tracing::info;

use crate::agent::{AgentConnector, RemoteAgent};
use crate::error::GatewayError;
use crate::protocol::current_timestamp_ms;
use crate::types::{InputVector, OutputVector, Team, BOT_NAME};

enum BotState {
    Uninitialized,
    Ready {
        team: Team,
        agent: Box<dyn RemoteAgent>,
    },
}

/// Pass-through bot driven by the harness.
pub struct Bot {
    state: BotState,
}

impl Default for Bot {
    fn default() -> Self {
        Self::new()
    }
}

impl Bot {
    /// Create an uninitialized bot; `decide` fails until [`Bot::initialize`] succeeds.
    pub fn new() -> Self {
        Self {
            state: BotState::Uninitialized,
        }
    }

    /// Create and initialize in one step.
    pub fn connect(team: Team, connector: &dyn AgentConnector) -> Result<Self, GatewayError> {
        let mut bot = Self::new();
        bot.initialize(team, connector)?;
        Ok(bot)
    }

    /// Obtain the remote agent handle and fix the team.
    ///
    /// Succeeds at most once per bot. On failure the bot is left exactly as it was.
    pub fn initialize(
        &mut self,
        team: Team,
        connector: &dyn AgentConnector,
    ) -> Result<(), GatewayError> {
        if self.is_ready() {
            return Err(GatewayError::AlreadyInitialized);
        }
        let agent = connector.connect().map_err(|e| match e {
            GatewayError::Connection(_) => e,
            other => GatewayError::connection(other.to_string()),
        })?;
        info!("[Bot] {} ready for team {}", BOT_NAME, team);
        self.state = BotState::Ready { team, agent };
        Ok(())
    }

    /// Display name shown by the harness.
    pub fn name(&self) -> &'static str {
        BOT_NAME
    }

    pub fn team(&self) -> Option<Team> {
        match &self.state {
            BotState::Ready { team, .. } => Some(*team),
            BotState::Uninitialized => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, BotState::Ready { .. })
    }

    /// Forward one observation to the remote agent and return its action.
    pub fn decide(&mut self, input: &InputVector) -> Result<OutputVector, GatewayError> {
        let BotState::Ready { team, agent } = &mut self.state else {
            return Err(GatewayError::NotInitialized);
        };

        println!("{}", diagnostic_line(input));
        agent.get_output_vector(input, *team)
    }
}

/// Per-decision diagnostic: the scalar at the diagnostic index and the wall clock.
pub fn diagnostic_line(input: &InputVector) -> String {
    format_diagnostic(input, current_timestamp_ms())
}

/// `"<value:.4>   <millis>"`; a missing scalar prints as `NaN`.
pub fn format_diagnostic(input: &InputVector, millis: u64) -> String {
    let value = input.diagnostic_value().unwrap_or(f64::NAN);
    format!("{:.4}   {}", value, millis)
}
