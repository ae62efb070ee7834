//! Blocking gateway client
//!
//! Provides a synchronous interface over the async TCP connection to the
//! gateway. The client owns a single-threaded tokio runtime and drives every
//! request to completion with `block_on`, so callers on a plain game loop
//! thread never see async code.

use std::time::Duration;

use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::runtime::Runtime;
use tracing::{debug, info};

use crate::agent::RemoteAgent;
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::protocol::*;
use crate::types::{InputVector, OutputVector, Team, BOT_NAME};

struct Connection {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

/// Connection to a running gateway.
pub struct GatewayClient {
    rt: Runtime,
    conn: Connection,
    call_timeout: Option<Duration>,
    next_seq: u64,
    gateway_id: String,
    /// Set once the connection failed; the stream can no longer be trusted.
    broken: Option<String>,
}

impl GatewayClient {
    /// Connect and complete the hello/welcome handshake.
    ///
    /// Every failure on this path is reported as [`GatewayError::Connection`].
    pub fn connect(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| GatewayError::connection(format!("failed to create runtime: {e}")))?;

        let address = config.address();
        let stream = rt
            .block_on(async {
                tokio::time::timeout(config.connect_timeout, TcpStream::connect(&address)).await
            })
            .map_err(|_| GatewayError::connection(format!("timed out connecting to {address}")))?
            .map_err(|e| GatewayError::connection(format!("could not connect to {address}: {e}")))?;
        let _ = stream.set_nodelay(true);

        let (read_half, writer) = stream.into_split();
        let conn = Connection {
            lines: BufReader::new(read_half).lines(),
            writer,
        };

        let mut client = Self {
            rt,
            conn,
            call_timeout: config.call_timeout.or(Some(config.connect_timeout)),
            next_seq: 0,
            gateway_id: String::new(),
            broken: None,
        };

        let seq = client.bump_seq();
        let hello = create_hello(seq, BOT_NAME, &config.protocol_version);
        let welcome = match client.request(seq, &hello) {
            Ok(ParsedReply::Welcome(w)) => w,
            Ok(other) => {
                return Err(GatewayError::connection(format!(
                    "expected welcome, got {}",
                    other.type_name()
                )))
            }
            Err(GatewayError::RemoteCall { code, message }) => {
                return Err(GatewayError::connection(format!(
                    "handshake rejected ({code}): {message}"
                )))
            }
            Err(e) => return Err(GatewayError::connection(format!("handshake failed: {e}"))),
        };

        if !welcome.protocol_version.starts_with(PROTOCOL_MAJOR_PREFIX) {
            return Err(GatewayError::connection(format!(
                "gateway speaks protocol {}",
                welcome.protocol_version
            )));
        }

        info!(
            "[Gateway] connected to {} at {} (protocol {})",
            welcome.gateway_id, address, welcome.protocol_version
        );

        // The handshake is bounded by the connect timeout; calls use the configured bound.
        client.call_timeout = config.call_timeout;
        client.gateway_id = welcome.gateway_id;
        Ok(client)
    }

    pub fn gateway_id(&self) -> &str {
        &self.gateway_id
    }

    /// Entry point: ask the gateway for a handle to its agent.
    pub fn get_agent(&mut self) -> Result<u64, GatewayError> {
        let seq = self.bump_seq();
        match self.request(seq, &create_get_agent(seq))? {
            ParsedReply::Agent(a) => {
                debug!("[Gateway] issued agent {}", a.agent_id);
                Ok(a.agent_id)
            }
            other => Err(GatewayError::Protocol(format!(
                "expected agent, got {}",
                other.type_name()
            ))),
        }
    }

    /// Consume the client and bind it to a freshly issued agent handle.
    pub fn into_agent(mut self) -> Result<GatewayAgent, GatewayError> {
        let agent_id = self.get_agent()?;
        Ok(GatewayAgent {
            client: self,
            agent_id,
        })
    }

    /// One decision round trip.
    pub fn get_output(
        &mut self,
        agent_id: u64,
        team: Team,
        input: &InputVector,
    ) -> Result<OutputVector, GatewayError> {
        let seq = self.bump_seq();
        let msg = create_get_output(seq, agent_id, team, input);
        match self.request(seq, &msg)? {
            ParsedReply::Output(out) if out.agent_id == agent_id => Ok(OutputVector::new(out.output)),
            ParsedReply::Output(out) => Err(GatewayError::Protocol(format!(
                "output for agent {} while calling agent {}",
                out.agent_id, agent_id
            ))),
            other => Err(GatewayError::Protocol(format!(
                "expected output, got {}",
                other.type_name()
            ))),
        }
    }

    fn bump_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    /// Send one request line and wait for the reply carrying the same seq.
    ///
    /// Error replies become [`GatewayError::RemoteCall`]. Any failure that
    /// leaves the reply stream out of step marks the connection unusable.
    fn request<T: Serialize>(&mut self, seq: u64, msg: &T) -> Result<ParsedReply, GatewayError> {
        if let Some(reason) = &self.broken {
            return Err(GatewayError::connection(format!("connection unusable: {reason}")));
        }

        let mut line = serde_json::to_vec(msg)
            .map_err(|e| GatewayError::Protocol(format!("failed to encode request: {e}")))?;
        line.push(b'\n');

        let reply = match self
            .rt
            .block_on(exchange(&mut self.conn, &line, seq, self.call_timeout))
        {
            Ok(r) => r,
            Err(e) => {
                self.broken = Some(e.to_string());
                return Err(e);
            }
        };

        match reply {
            ParsedReply::Error(err) => Err(GatewayError::RemoteCall {
                code: err.code,
                message: err.message,
            }),
            other => Ok(other),
        }
    }
}

async fn exchange(
    conn: &mut Connection,
    line: &[u8],
    seq: u64,
    call_timeout: Option<Duration>,
) -> Result<ParsedReply, GatewayError> {
    match call_timeout {
        Some(limit) => tokio::time::timeout(limit, round_trip(conn, line, seq))
            .await
            .map_err(|_| GatewayError::connection(format!("no reply within {limit:?}")))?,
        None => round_trip(conn, line, seq).await,
    }
}

/// Write `line`, then read replies until the one answering `seq`.
///
/// Replies to earlier requests are dropped. A reply from the future means the
/// stream can no longer be matched to requests.
async fn round_trip(conn: &mut Connection, line: &[u8], seq: u64) -> Result<ParsedReply, GatewayError> {
    conn.writer.write_all(line).await?;
    conn.writer.flush().await?;
    loop {
        let raw = match conn.lines.next_line().await? {
            Some(l) if l.trim().is_empty() => continue,
            Some(l) => l,
            None => return Err(GatewayError::connection("gateway closed the connection")),
        };
        let reply = parse_reply(raw.trim())
            .map_err(|e| GatewayError::Protocol(format!("malformed reply: {e}")))?;

        match reply.seq() {
            s if s == seq => return Ok(reply),
            // The gateway may not know the seq of a request it could not parse.
            0 if matches!(reply, ParsedReply::Error(_)) => return Ok(reply),
            s if s < seq => {
                debug!("[Gateway] dropping stale {} reply (seq {} < {})", reply.type_name(), s, seq);
            }
            s => {
                return Err(GatewayError::Protocol(format!(
                    "reply seq {s} is ahead of request seq {seq}"
                )))
            }
        }
    }
}

/// Remote agent reached through a [`GatewayClient`].
pub struct GatewayAgent {
    client: GatewayClient,
    agent_id: u64,
}

impl RemoteAgent for GatewayAgent {
    fn get_output_vector(
        &mut self,
        input: &InputVector,
        team: Team,
    ) -> Result<OutputVector, GatewayError> {
        self.client.get_output(self.agent_id, team, input)
    }
}
