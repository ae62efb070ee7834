//! Protocol module - JSON message types for the agent gateway
//!
//! Implements the line-delimited JSON protocol spoken between the bot adapter
//! and the process hosting the decision agent.
//! All messages have: type, seq (sequence number), ts (timestamp in ms)

use serde::{Deserialize, Serialize};

use crate::types::{InputVector, OutputVector, Team};

/// Protocol version spoken by this crate. Peers must share the major version.
pub const PROTOCOL_VERSION: &str = "1.0.0";

/// Major version prefix accepted during the handshake.
pub const PROTOCOL_MAJOR_PREFIX: &str = "1.";

// ============== Client -> Gateway Messages ==============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HelloType {
    #[serde(rename = "hello")]
    Hello,
}

impl Default for HelloType {
    fn default() -> Self {
        Self::Hello
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GetAgentType {
    #[serde(rename = "get_agent")]
    GetAgent,
}

impl Default for GetAgentType {
    fn default() -> Self {
        Self::GetAgent
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GetOutputType {
    #[serde(rename = "get_output")]
    GetOutput,
}

impl Default for GetOutputType {
    fn default() -> Self {
        Self::GetOutput
    }
}

/// Client hello message (first message on every connection)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloMessage {
    #[serde(rename = "type")]
    #[serde(default)]
    pub msg_type: HelloType,
    pub seq: u64,
    pub ts: u64,
    pub client: ClientInfo,
    pub protocol_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

/// Entry point request: asks the gateway for a handle to its agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetAgentMessage {
    #[serde(rename = "type")]
    #[serde(default)]
    pub msg_type: GetAgentType,
    pub seq: u64,
    pub ts: u64,
}

/// Decision request for one frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetOutputMessage {
    #[serde(rename = "type")]
    #[serde(default)]
    pub msg_type: GetOutputType,
    pub seq: u64,
    pub ts: u64,
    pub agent_id: u64,
    pub team: TeamLower,
    pub input: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TeamLower {
    #[serde(rename = "blue")]
    Blue,
    #[serde(rename = "orange")]
    Orange,
}

impl<'de> Deserialize<'de> for TeamLower {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match Team::from_str(&s) {
            Some(team) => Ok(team.into()),
            None => Err(serde::de::Error::custom("invalid team")),
        }
    }
}

impl From<Team> for TeamLower {
    fn from(value: Team) -> Self {
        match value {
            Team::Blue => Self::Blue,
            Team::Orange => Self::Orange,
        }
    }
}

impl From<TeamLower> for Team {
    fn from(value: TeamLower) -> Self {
        match value {
            TeamLower::Blue => Team::Blue,
            TeamLower::Orange => Team::Orange,
        }
    }
}

// ============== Gateway -> Client Messages ==============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WelcomeType {
    #[serde(rename = "welcome")]
    Welcome,
}

impl Default for WelcomeType {
    fn default() -> Self {
        Self::Welcome
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentType {
    #[serde(rename = "agent")]
    Agent,
}

impl Default for AgentType {
    fn default() -> Self {
        Self::Agent
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputType {
    #[serde(rename = "output")]
    Output,
}

impl Default for OutputType {
    fn default() -> Self {
        Self::Output
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorType {
    #[serde(rename = "error")]
    Error,
}

impl Default for ErrorType {
    fn default() -> Self {
        Self::Error
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    #[serde(rename = "handshake_required")]
    HandshakeRequired,
    #[serde(rename = "protocol_mismatch")]
    ProtocolMismatch,
    #[serde(rename = "invalid_request")]
    InvalidRequest,
    #[serde(rename = "unknown_agent")]
    UnknownAgent,
    #[serde(rename = "agent_failure")]
    AgentFailure,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::HandshakeRequired => "handshake_required",
            ErrorCode::ProtocolMismatch => "protocol_mismatch",
            ErrorCode::InvalidRequest => "invalid_request",
            ErrorCode::UnknownAgent => "unknown_agent",
            ErrorCode::AgentFailure => "agent_failure",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Welcome message (response to hello)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WelcomeMessage {
    #[serde(rename = "type")]
    #[serde(default)]
    pub msg_type: WelcomeType,
    pub seq: u64,
    pub ts: u64,
    pub protocol_version: String,
    pub gateway_id: String,
}

/// Agent handle issued in response to get_agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentMessage {
    #[serde(rename = "type")]
    #[serde(default)]
    pub msg_type: AgentType,
    pub seq: u64,
    pub ts: u64,
    pub agent_id: u64,
}

/// Action vector computed by the agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputMessage {
    #[serde(rename = "type")]
    #[serde(default)]
    pub msg_type: OutputType,
    pub seq: u64,
    pub ts: u64,
    pub agent_id: u64,
    pub output: Vec<f64>,
}

/// Error message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorMessage {
    #[serde(rename = "type")]
    #[serde(default)]
    pub msg_type: ErrorType,
    pub seq: u64,
    pub ts: u64,
    pub code: ErrorCode,
    pub message: String,
}

// ============== Message Parsing ==============

/// Parse a request line received by the gateway
pub fn parse_request(json: &str) -> Result<ParsedRequest, serde_json::Error> {
    #[derive(Debug, Deserialize)]
    #[serde(tag = "type")]
    enum InboundRequest {
        #[serde(rename = "hello")]
        Hello(HelloMessage),
        #[serde(rename = "get_agent")]
        GetAgent(GetAgentMessage),
        #[serde(rename = "get_output")]
        GetOutput(GetOutputMessage),
    }

    match serde_json::from_str::<InboundRequest>(json) {
        Ok(InboundRequest::Hello(m)) => Ok(ParsedRequest::Hello(m)),
        Ok(InboundRequest::GetAgent(m)) => Ok(ParsedRequest::GetAgent(m)),
        Ok(InboundRequest::GetOutput(m)) => Ok(ParsedRequest::GetOutput(m)),
        Err(e) => match unknown_type_seq(json, &["hello", "get_agent", "get_output"])? {
            Some(seq) => Ok(ParsedRequest::Unknown(UnknownMessage { seq })),
            None => Err(e),
        },
    }
}

/// Parse a reply line received by the client
pub fn parse_reply(json: &str) -> Result<ParsedReply, serde_json::Error> {
    #[derive(Debug, Deserialize)]
    #[serde(tag = "type")]
    enum InboundReply {
        #[serde(rename = "welcome")]
        Welcome(WelcomeMessage),
        #[serde(rename = "agent")]
        Agent(AgentMessage),
        #[serde(rename = "output")]
        Output(OutputMessage),
        #[serde(rename = "error")]
        Error(ErrorMessage),
    }

    match serde_json::from_str::<InboundReply>(json) {
        Ok(InboundReply::Welcome(m)) => Ok(ParsedReply::Welcome(m)),
        Ok(InboundReply::Agent(m)) => Ok(ParsedReply::Agent(m)),
        Ok(InboundReply::Output(m)) => Ok(ParsedReply::Output(m)),
        Ok(InboundReply::Error(m)) => Ok(ParsedReply::Error(m)),
        Err(e) => match unknown_type_seq(json, &["welcome", "agent", "output", "error"])? {
            Some(seq) => Ok(ParsedReply::Unknown(UnknownMessage { seq })),
            None => Err(e),
        },
    }
}

/// Returns the seq of a message whose type is not in `known`.
///
/// Unknown message types are not a hard parse error for the protocol; a known
/// type that failed to parse is.
fn unknown_type_seq(json: &str, known: &[&str]) -> Result<Option<u64>, serde_json::Error> {
    #[derive(Debug, Deserialize)]
    struct TypeOnly {
        #[serde(rename = "type")]
        msg_type: Option<String>,
        seq: Option<u64>,
    }

    let head = serde_json::from_str::<TypeOnly>(json)?;
    let msg_type = head.msg_type.as_deref().unwrap_or("unknown");
    if known.contains(&msg_type) {
        return Ok(None);
    }
    Ok(Some(head.seq.unwrap_or(0)))
}

/// Parsed request (gateway side)
#[derive(Debug, Clone)]
pub enum ParsedRequest {
    Hello(HelloMessage),
    GetAgent(GetAgentMessage),
    GetOutput(GetOutputMessage),
    Unknown(UnknownMessage),
}

/// Parsed reply (client side)
#[derive(Debug, Clone)]
pub enum ParsedReply {
    Welcome(WelcomeMessage),
    Agent(AgentMessage),
    Output(OutputMessage),
    Error(ErrorMessage),
    Unknown(UnknownMessage),
}

impl ParsedReply {
    pub fn seq(&self) -> u64 {
        match self {
            ParsedReply::Welcome(m) => m.seq,
            ParsedReply::Agent(m) => m.seq,
            ParsedReply::Output(m) => m.seq,
            ParsedReply::Error(m) => m.seq,
            ParsedReply::Unknown(m) => m.seq,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ParsedReply::Welcome(_) => "welcome",
            ParsedReply::Agent(_) => "agent",
            ParsedReply::Output(_) => "output",
            ParsedReply::Error(_) => "error",
            ParsedReply::Unknown(_) => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownMessage {
    pub seq: u64,
}

/// Pull `seq` out of a line that failed to parse as JSON.
pub fn extract_seq_best_effort(s: &str) -> Option<u64> {
    let start = s.find("\"seq\"")?;
    let after_key = &s[start + 5..];
    let colon = after_key.find(':')?;
    let rest = after_key[colon + 1..].trim_start();
    let end = rest.bytes().take_while(|b| b.is_ascii_digit()).count();
    if end == 0 {
        return None;
    }
    rest[..end].parse::<u64>().ok()
}

// ============== Utility Functions ==============

/// Create a hello message
pub fn create_hello(seq: u64, client_name: &str, protocol_version: &str) -> HelloMessage {
    HelloMessage {
        msg_type: HelloType::Hello,
        seq,
        ts: current_timestamp_ms(),
        client: ClientInfo {
            name: client_name.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        protocol_version: protocol_version.to_string(),
    }
}

/// Create a get_agent request
pub fn create_get_agent(seq: u64) -> GetAgentMessage {
    GetAgentMessage {
        msg_type: GetAgentType::GetAgent,
        seq,
        ts: current_timestamp_ms(),
    }
}

/// Create a get_output request
pub fn create_get_output(seq: u64, agent_id: u64, team: Team, input: &InputVector) -> GetOutputMessage {
    GetOutputMessage {
        msg_type: GetOutputType::GetOutput,
        seq,
        ts: current_timestamp_ms(),
        agent_id,
        team: team.into(),
        input: input.as_slice().to_vec(),
    }
}

/// Create a welcome message
pub fn create_welcome(seq: u64, protocol_version: &str) -> WelcomeMessage {
    WelcomeMessage {
        msg_type: WelcomeType::Welcome,
        seq,
        ts: current_timestamp_ms(),
        protocol_version: protocol_version.to_string(),
        gateway_id: "tarebot-gateway".to_string(),
    }
}

/// Create an agent handle reply
pub fn create_agent(seq: u64, agent_id: u64) -> AgentMessage {
    AgentMessage {
        msg_type: AgentType::Agent,
        seq,
        ts: current_timestamp_ms(),
        agent_id,
    }
}

/// Create an output reply
pub fn create_output(seq: u64, agent_id: u64, output: OutputVector) -> OutputMessage {
    OutputMessage {
        msg_type: OutputType::Output,
        seq,
        ts: current_timestamp_ms(),
        agent_id,
        output: output.into_inner(),
    }
}

/// Create an error message
pub fn create_error(seq: u64, code: ErrorCode, message: &str) -> ErrorMessage {
    ErrorMessage {
        msg_type: ErrorType::Error,
        seq,
        ts: current_timestamp_ms(),
        code,
        message: message.to_string(),
    }
}

/// Get current timestamp in milliseconds
pub fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
