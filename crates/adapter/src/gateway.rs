//! TCP gateway host
//!
//! Hosts a decision agent behind the line protocol so bots can reach it.
//! Handles incoming connections and manages client lifecycle.
//! Uses tokio for async networking.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::config::GatewayConfig;
use crate::protocol::*;
use crate::types::{InputVector, OutputVector, Team};

/// Agent hosted by the gateway.
pub trait DecisionAgent: Send {
    fn get_output_vector(&mut self, input: &InputVector, team: Team) -> Result<OutputVector, String>;
}

/// Builds one agent per `get_agent` request.
pub type AgentFactory = Arc<dyn Fn() -> Box<dyn DecisionAgent> + Send + Sync>;

/// Returns the observation unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoAgent;

impl DecisionAgent for EchoAgent {
    fn get_output_vector(&mut self, input: &InputVector, _team: Team) -> Result<OutputVector, String> {
        Ok(OutputVector::new(input.as_slice().to_vec()))
    }
}

pub fn echo_factory() -> AgentFactory {
    Arc::new(|| Box::new(EchoAgent) as Box<dyn DecisionAgent>)
}

/// Shared gateway state
struct GatewayState {
    config: GatewayConfig,
    factory: AgentFactory,
    next_agent_id: AtomicU64,
    connected: AtomicUsize,
}

impl GatewayState {
    fn issue_agent_id(&self) -> u64 {
        self.next_agent_id.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// Per-connection protocol state
#[derive(Default)]
struct Session {
    handshaken: bool,
    last_seq: Option<u64>,
    agents: HashMap<u64, Box<dyn DecisionAgent>>,
}

impl Session {
    /// Enforce strictly increasing seq per connection.
    fn check_and_update_seq(&mut self, seq: u64) -> bool {
        match self.last_seq {
            Some(prev) if seq <= prev => false,
            _ => {
                self.last_seq = Some(seq);
                true
            }
        }
    }
}

#[derive(Debug, Clone)]
enum GatewayOutbound {
    Welcome(WelcomeMessage),
    Agent(AgentMessage),
    Output(OutputMessage),
    Error(ErrorMessage),
}

impl GatewayOutbound {
    fn encode(&self, buf: &mut Vec<u8>) -> serde_json::Result<()> {
        fn write<T: Serialize>(buf: &mut Vec<u8>, v: &T) -> serde_json::Result<()> {
            serde_json::to_writer(&mut *buf, v)
        }
        match self {
            GatewayOutbound::Welcome(v) => write(buf, v),
            GatewayOutbound::Agent(v) => write(buf, v),
            GatewayOutbound::Output(v) => write(buf, v),
            GatewayOutbound::Error(v) => write(buf, v),
        }
    }
}

/// Check whether `host:port` can currently be bound.
pub fn check_tcp_listen_available(host: &str, port: u16) -> std::io::Result<()> {
    let listener = std::net::TcpListener::bind((host, port))?;
    drop(listener);
    Ok(())
}

/// Start the gateway
pub async fn run_gateway(
    config: GatewayConfig,
    factory: AgentFactory,
    ready_tx: Option<oneshot::Sender<SocketAddr>>,
) -> anyhow::Result<()> {
    let wire_log_tx = config.log_path.clone().map(spawn_wire_log);

    let listener = TcpListener::bind(config.address()).await?;
    let bound = listener.local_addr()?;
    info!("[Gateway] listening on {}", bound);
    if let Some(tx) = ready_tx {
        let _ = tx.send(bound);
    }

    let state = Arc::new(GatewayState {
        config,
        factory,
        next_agent_id: AtomicU64::new(0),
        connected: AtomicUsize::new(0),
    });
    let mut client_id_counter = 0usize;

    // Accept incoming connections
    loop {
        let (socket, addr) = listener.accept().await?;
        client_id_counter += 1;
        let client_id = client_id_counter;
        let live = state.connected.fetch_add(1, Ordering::Relaxed) + 1;

        info!("[Gateway] client {} connected from {} ({} live)", client_id, addr, live);

        let state = Arc::clone(&state);
        let wire_log_tx = wire_log_tx.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_client(socket, client_id, Arc::clone(&state), wire_log_tx).await {
                error!("[Gateway] client {} error: {}", client_id, e);
            }
            state.connected.fetch_sub(1, Ordering::Relaxed);
            info!("[Gateway] client {} disconnected", client_id);
        });
    }
}

/// Append every wire line to `path`.
fn spawn_wire_log(path: String) -> mpsc::UnboundedSender<Vec<u8>> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
    tokio::spawn(async move {
        use tokio::fs::OpenOptions;

        let mut file = match OpenOptions::new().create(true).append(true).open(&path).await {
            Ok(f) => f,
            Err(e) => {
                warn!("[Gateway] wire log {} unavailable: {}", path, e);
                return;
            }
        };

        while let Some(mut bytes) = rx.recv().await {
            bytes.push(b'\n');
            if file.write_all(&bytes).await.is_err() || file.flush().await.is_err() {
                break;
            }
        }

        let _ = file.flush().await;
    });
    tx
}

/// Handle a single client connection
async fn handle_client(
    socket: TcpStream,
    client_id: usize,
    state: Arc<GatewayState>,
    wire_log_tx: Option<mpsc::UnboundedSender<Vec<u8>>>,
) -> anyhow::Result<()> {
    let (reader, mut writer) = socket.into_split();
    let mut reader = BufReader::new(reader);

    let (tx, mut rx) = mpsc::unbounded_channel::<GatewayOutbound>();

    let wire_log_tx_out = wire_log_tx.clone();
    let write_task = tokio::spawn(async move {
        let mut buf: Vec<u8> = Vec::with_capacity(4096);
        while let Some(msg) = rx.recv().await {
            buf.clear();
            if msg.encode(&mut buf).is_err() {
                continue;
            }
            if let Some(log) = wire_log_tx_out.as_ref() {
                let _ = log.send(buf.clone());
            }
            buf.push(b'\n');
            if writer.write_all(&buf).await.is_err() {
                break;
            }
            if writer.flush().await.is_err() {
                break;
            }
        }
    });

    let mut session = Session::default();
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            break;
        }

        let raw_line = line.trim_end_matches(|c| c == '\n' || c == '\r');
        let trimmed = raw_line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(log) = wire_log_tx.as_ref() {
            let _ = log.send(raw_line.as_bytes().to_vec());
        }

        match handle_request(trimmed, &mut session, &state, client_id) {
            Step::Reply(msg) => {
                let _ = tx.send(msg);
            }
            Step::Close(msg) => {
                let _ = tx.send(msg);
                break;
            }
        }
    }

    // Flush pending replies before the socket closes.
    drop(tx);
    let _ = write_task.await;
    Ok(())
}

enum Step {
    Reply(GatewayOutbound),
    Close(GatewayOutbound),
}

fn reject(seq: u64, code: ErrorCode, message: &str) -> Step {
    Step::Reply(GatewayOutbound::Error(create_error(seq, code, message)))
}

fn handle_request(
    line: &str,
    session: &mut Session,
    state: &GatewayState,
    client_id: usize,
) -> Step {
    let request = match parse_request(line) {
        Ok(r) => r,
        Err(e) => {
            let seq = extract_seq_best_effort(line).unwrap_or(0);
            return reject(seq, ErrorCode::InvalidRequest, &format!("Malformed request: {e}"));
        }
    };

    match request {
        ParsedRequest::Hello(hello) => {
            if session.handshaken && !session.check_and_update_seq(hello.seq) {
                return reject(hello.seq, ErrorCode::InvalidRequest, "seq must be strictly increasing");
            }

            if !hello.protocol_version.starts_with(PROTOCOL_MAJOR_PREFIX) {
                let error = create_error(
                    hello.seq,
                    ErrorCode::ProtocolMismatch,
                    &format!("Protocol version {} not supported", hello.protocol_version),
                );
                return Step::Close(GatewayOutbound::Error(error));
            }

            session.handshaken = true;
            session.last_seq = Some(hello.seq);
            info!(
                "[Gateway] client {} is {} {}",
                client_id, hello.client.name, hello.client.version
            );
            Step::Reply(GatewayOutbound::Welcome(create_welcome(
                hello.seq,
                &state.config.protocol_version,
            )))
        }

        ParsedRequest::GetAgent(req) => {
            if !session.handshaken {
                return reject(req.seq, ErrorCode::HandshakeRequired, "Send hello before get_agent");
            }
            if !session.check_and_update_seq(req.seq) {
                return reject(req.seq, ErrorCode::InvalidRequest, "seq must be strictly increasing");
            }

            let agent_id = state.issue_agent_id();
            session.agents.insert(agent_id, (state.factory)());
            debug!("[Gateway] client {} got agent {}", client_id, agent_id);
            Step::Reply(GatewayOutbound::Agent(create_agent(req.seq, agent_id)))
        }

        ParsedRequest::GetOutput(req) => {
            if !session.handshaken {
                return reject(req.seq, ErrorCode::HandshakeRequired, "Send hello before get_output");
            }
            if !session.check_and_update_seq(req.seq) {
                return reject(req.seq, ErrorCode::InvalidRequest, "seq must be strictly increasing");
            }

            let Some(agent) = session.agents.get_mut(&req.agent_id) else {
                return reject(
                    req.seq,
                    ErrorCode::UnknownAgent,
                    &format!("No agent {} on this connection", req.agent_id),
                );
            };

            let input = InputVector::new(req.input);
            match agent.get_output_vector(&input, req.team.into()) {
                Ok(output) => Step::Reply(GatewayOutbound::Output(create_output(
                    req.seq,
                    req.agent_id,
                    output,
                ))),
                Err(message) => {
                    warn!("[Gateway] agent {} failed: {}", req.agent_id, message);
                    reject(req.seq, ErrorCode::AgentFailure, &message)
                }
            }
        }

        ParsedRequest::Unknown(u) => reject(u.seq, ErrorCode::InvalidRequest, "Unknown message type"),
    }
}
