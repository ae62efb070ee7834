//! Adapter module - bot control via an external agent gateway
//!
//! This module lets a game harness drive a bot whose decisions are computed
//! by a separate process. The bot itself holds no strategy: it forwards each
//! observation, together with its team, to the remote agent and hands the
//! agent's action vector back to the harness.
//!
//! # Protocol Overview
//!
//! The gateway speaks a **line-delimited JSON protocol** over TCP:
//!
//! 1. **Connection**: Client connects to the gateway (default: 127.0.0.1:25333)
//! 2. **Handshake**: Client sends `hello`, gateway responds with `welcome`
//! 3. **Entry point**: Client sends `get_agent`, gateway issues an agent handle
//! 4. **Decisions**: Client sends `get_output` per frame, gateway replies with `output`
//!
//! # Message Types
//!
//! ## Client → Gateway
//!
//! - **hello**: Initial handshake with client info and protocol version
//! - **get_agent**: Obtain a handle to the hosted agent
//! - **get_output**: Observation vector and team for one decision
//!
//! ## Gateway → Client
//!
//! - **welcome**: Response to hello
//! - **agent**: The issued agent handle
//! - **output**: The agent's action vector
//! - **error**: Error response with code and message
//!
//! # Environment Variables
//!
//! - `TAREBOT_GATEWAY_HOST`: Gateway address (default: "127.0.0.1")
//! - `TAREBOT_GATEWAY_PORT`: Port number (default: 25333)
//! - `TAREBOT_CONNECT_TIMEOUT_MS`: Connect bound (default: 2000)
//! - `TAREBOT_CALL_TIMEOUT_MS`: Per-call bound (default: none, calls block)
//! - `TAREBOT_GATEWAY_LOG_PATH`: Gateway-side wire log file
//!
//! # Example Protocol Flow
//!
//! ```text
//! Client -> Gateway: {"type":"hello","seq":1,"ts":1234567890,"client":{"name":"TareBot","version":"0.1.0"},"protocol_version":"1.0.0"}
//! Gateway -> Client: {"type":"welcome","seq":1,"ts":1234567890,"protocol_version":"1.0.0","gateway_id":"tarebot-gateway"}
//! Client -> Gateway: {"type":"get_agent","seq":2,"ts":1234567891}
//! Gateway -> Client: {"type":"agent","seq":2,"ts":1234567891,"agent_id":1}
//! Client -> Gateway: {"type":"get_output","seq":3,"ts":1234567892,"agent_id":1,"team":"blue","input":[0.0,3.1415]}
//! Gateway -> Client: {"type":"output","seq":3,"ts":1234567892,"agent_id":1,"output":[0.0,3.1415]}
//! ```
//!
//! # Implementation
//!
//! - [`Bot`] is the harness-facing adapter; it is synchronous and blocking
//! - [`GatewayClient`] bridges to tokio with its own single-threaded runtime
//! - [`run_gateway`] hosts any [`DecisionAgent`] for local development and tests
//! - See [`protocol`] for message structure definitions
//!
//! # Testing
//!
//! Run the echo gateway and connect with netcat:
//!
//! ```bash
//! cargo run --bin tarebot-gateway
//! nc 127.0.0.1 25333
//! {"type":"hello","seq":1,"ts":0,"client":{"name":"nc","version":"0"},"protocol_version":"1.0.0"}
//! ```

pub mod agent;
pub mod bot;
pub mod client;
pub mod config;
pub mod error;
pub mod gateway;
pub mod protocol;

pub use tarebot_types as types;

pub use agent::{AgentConnector, GatewayConnector, RemoteAgent};
pub use bot::{diagnostic_line, format_diagnostic, Bot};
pub use client::{GatewayAgent, GatewayClient};
pub use config::GatewayConfig;
pub use error::GatewayError;
pub use gateway::{
    check_tcp_listen_available, echo_factory, run_gateway, AgentFactory, DecisionAgent, EchoAgent,
};
