use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::oneshot;

use tarebot::adapter::protocol::{create_get_agent, create_get_output, create_hello, PROTOCOL_VERSION};
use tarebot::adapter::{echo_factory, run_gateway, GatewayConfig};
use tarebot::types::{InputVector, Team};

type Lines = tokio::io::Lines<BufReader<OwnedReadHalf>>;

async fn start_gateway(config: GatewayConfig) -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let (ready_tx, ready_rx) = oneshot::channel();
    let handle = tokio::spawn(async move {
        let _ = run_gateway(config, echo_factory(), Some(ready_tx)).await;
    });
    let addr = tokio::time::timeout(Duration::from_secs(2), ready_rx)
        .await
        .expect("gateway did not signal ready")
        .expect("ready channel dropped");
    (addr, handle)
}

fn local_config() -> GatewayConfig {
    GatewayConfig {
        port: 0,
        ..GatewayConfig::default()
    }
}

async fn connect(addr: SocketAddr) -> (Lines, OwnedWriteHalf) {
    let stream = TcpStream::connect(addr).await.expect("connect failed");
    let (read_half, write_half) = stream.into_split();
    (BufReader::new(read_half).lines(), write_half)
}

async fn send_line(w: &mut OwnedWriteHalf, line: &str) {
    w.write_all(line.as_bytes()).await.unwrap();
    w.write_all(b"\n").await.unwrap();
    w.flush().await.unwrap();
}

async fn read_json(lines: &mut Lines) -> serde_json::Value {
    let line = tokio::time::timeout(Duration::from_secs(2), lines.next_line())
        .await
        .expect("timeout waiting for line")
        .expect("io error")
        .expect("expected line");
    serde_json::from_str(&line).unwrap()
}

#[tokio::test]
async fn gateway_hello_get_agent_and_output() {
    let (addr, handle) = start_gateway(local_config()).await;
    let (mut lines, mut w) = connect(addr).await;

    let hello = create_hello(1, "raw-test", PROTOCOL_VERSION);
    send_line(&mut w, &serde_json::to_string(&hello).unwrap()).await;
    let welcome = read_json(&mut lines).await;
    assert_eq!(welcome["type"], "welcome");
    assert_eq!(welcome["seq"], 1);
    assert_eq!(welcome["protocol_version"], PROTOCOL_VERSION);

    send_line(&mut w, &serde_json::to_string(&create_get_agent(2)).unwrap()).await;
    let agent = read_json(&mut lines).await;
    assert_eq!(agent["type"], "agent");
    assert_eq!(agent["seq"], 2);
    let agent_id = agent["agent_id"].as_u64().expect("agent_id");

    let input = InputVector::new(vec![0.0, 1.5, 3.1415]);
    let call = create_get_output(3, agent_id, Team::Orange, &input);
    send_line(&mut w, &serde_json::to_string(&call).unwrap()).await;
    let output = read_json(&mut lines).await;
    assert_eq!(output["type"], "output");
    assert_eq!(output["seq"], 3);
    assert_eq!(output["agent_id"], agent_id);
    assert_eq!(output["output"], serde_json::json!([0.0, 1.5, 3.1415]));

    handle.abort();
}

#[tokio::test]
async fn gateway_requires_handshake_first() {
    let (addr, handle) = start_gateway(local_config()).await;
    let (mut lines, mut w) = connect(addr).await;

    send_line(&mut w, &serde_json::to_string(&create_get_agent(1)).unwrap()).await;
    let err = read_json(&mut lines).await;
    assert_eq!(err["type"], "error");
    assert_eq!(err["code"], "handshake_required");
    assert_eq!(err["seq"], 1);

    handle.abort();
}

#[tokio::test]
async fn gateway_rejects_unknown_and_malformed_lines() {
    let (addr, handle) = start_gateway(local_config()).await;
    let (mut lines, mut w) = connect(addr).await;

    send_line(&mut w, r#"{"type":"shutdown","seq":4,"ts":0}"#).await;
    let err = read_json(&mut lines).await;
    assert_eq!(err["code"], "invalid_request");
    assert_eq!(err["seq"], 4);

    send_line(&mut w, r#"{"seq": 5, "type": "hel"#).await;
    let err = read_json(&mut lines).await;
    assert_eq!(err["code"], "invalid_request");
    assert_eq!(err["seq"], 5);

    // The connection stays usable.
    let hello = create_hello(6, "raw-test", PROTOCOL_VERSION);
    send_line(&mut w, &serde_json::to_string(&hello).unwrap()).await;
    assert_eq!(read_json(&mut lines).await["type"], "welcome");

    handle.abort();
}

#[tokio::test]
async fn gateway_closes_on_protocol_mismatch() {
    let (addr, handle) = start_gateway(local_config()).await;
    let (mut lines, mut w) = connect(addr).await;

    let hello = create_hello(1, "future-client", "2.0.0");
    send_line(&mut w, &serde_json::to_string(&hello).unwrap()).await;
    let err = read_json(&mut lines).await;
    assert_eq!(err["code"], "protocol_mismatch");

    let eof = tokio::time::timeout(Duration::from_secs(2), lines.next_line())
        .await
        .expect("timeout waiting for close")
        .expect("io error");
    assert!(eof.is_none(), "gateway should close the connection");

    handle.abort();
}

#[tokio::test]
async fn gateway_rejects_stale_seq() {
    let (addr, handle) = start_gateway(local_config()).await;
    let (mut lines, mut w) = connect(addr).await;

    let hello = create_hello(10, "raw-test", PROTOCOL_VERSION);
    send_line(&mut w, &serde_json::to_string(&hello).unwrap()).await;
    assert_eq!(read_json(&mut lines).await["type"], "welcome");

    send_line(&mut w, &serde_json::to_string(&create_get_agent(10)).unwrap()).await;
    let err = read_json(&mut lines).await;
    assert_eq!(err["code"], "invalid_request");
    assert_eq!(err["message"], "seq must be strictly increasing");

    send_line(&mut w, &serde_json::to_string(&create_get_agent(11)).unwrap()).await;
    assert_eq!(read_json(&mut lines).await["type"], "agent");

    handle.abort();
}

#[tokio::test]
async fn gateway_writes_wire_log() {
    let path = std::env::temp_dir().join(format!("tarebot-wire-{}.jsonl", std::process::id()));
    let _ = std::fs::remove_file(&path);

    let config = GatewayConfig {
        log_path: Some(path.to_string_lossy().into_owned()),
        ..local_config()
    };
    let (addr, handle) = start_gateway(config).await;
    let (mut lines, mut w) = connect(addr).await;

    let hello = create_hello(1, "logged", PROTOCOL_VERSION);
    send_line(&mut w, &serde_json::to_string(&hello).unwrap()).await;
    assert_eq!(read_json(&mut lines).await["type"], "welcome");

    // Writer task appends asynchronously.
    let mut logged = String::new();
    for _ in 0..50 {
        logged = std::fs::read_to_string(&path).unwrap_or_default();
        if logged.lines().count() >= 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let records: Vec<serde_json::Value> = logged
        .lines()
        .map(|l| serde_json::from_str(l).expect("wire log lines are json"))
        .collect();
    assert_eq!(records.len(), 2, "log was: {logged}");
    assert_eq!(records[0]["type"], "hello");
    assert_eq!(records[1]["type"], "welcome");

    handle.abort();
    let _ = std::fs::remove_file(&path);
}
