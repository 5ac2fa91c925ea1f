//! End-to-end scenarios against a real listener on an ephemeral port

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;
use uuid::Uuid;

use hearth_protocol::{
    ClientCodec, ClientMessage, ColorDepth, PtyRequest, Rgb, ServerMessage, PROTOCOL_VERSION,
};

use crate::config::ServerConfig;
use crate::host_key::{tests::sample_key, HostKey};
use crate::registry::RegistryHandle;
use crate::server::Server;
use crate::shutdown::ShutdownReport;

type Client = Framed<TcpStream, ClientCodec>;

const STEP: Duration = Duration::from_secs(2);

struct Harness {
    addr: SocketAddr,
    registry: RegistryHandle,
    stop: Option<oneshot::Sender<()>>,
    server: JoinHandle<ShutdownReport>,
}

impl Harness {
    async fn start(drain: Duration) -> Self {
        crossterm::style::force_color_output(true);

        let config = ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
            drain_timeout_secs: 1,
            ..Default::default()
        };
        let host_key = HostKey::parse(&sample_key()).unwrap();
        let mut server = Server::bind(&config, host_key).await.unwrap();
        server.set_drain_timeout(drain);

        let addr = server.local_addr().unwrap();
        let registry = server.registry();
        let (stop, stopped) = oneshot::channel::<()>();
        let server = tokio::spawn(server.serve(async move {
            let _ = stopped.await;
        }));

        Self {
            addr,
            registry,
            stop: Some(stop),
            server,
        }
    }

    /// Connect and complete the handshake, returning the session id
    async fn connect(&self, width: u16, height: u16, background: Rgb) -> (Client, Uuid) {
        let stream = TcpStream::connect(self.addr).await.unwrap();
        let mut client = Framed::new(stream, ClientCodec::new());
        client
            .send(ClientMessage::Hello {
                protocol_version: PROTOCOL_VERSION,
                term: "xterm-256color".into(),
                pty: Some(PtyRequest {
                    width,
                    height,
                    color: ColorDepth::TrueColor,
                    background: Some(background),
                }),
            })
            .await
            .unwrap();

        match recv(&mut client).await {
            ServerMessage::Welcome { session_id, .. } => (client, session_id),
            other => panic!("expected welcome, got {:?}", other),
        }
    }

    fn signal_shutdown(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }

    async fn sessions(&self) -> Vec<Uuid> {
        let mut ids = self.registry.list().await.unwrap();
        ids.sort();
        ids
    }

    /// Poll until the registry holds exactly `expected`
    async fn wait_for_sessions(&self, mut expected: Vec<Uuid>) {
        expected.sort();
        tokio::time::timeout(STEP, async {
            while self.sessions().await != expected {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("registry never reached the expected sessions");
    }
}

async fn recv(client: &mut Client) -> ServerMessage {
    tokio::time::timeout(STEP, client.next())
        .await
        .expect("timed out waiting for server")
        .expect("connection closed")
        .expect("decode error")
}

async fn recv_frame(client: &mut Client) -> String {
    match recv(client).await {
        ServerMessage::Frame { content } => content,
        other => panic!("expected frame, got {:?}", other),
    }
}

fn visible(frame: &str) -> Vec<String> {
    strip_ansi_escapes::strip_str(frame)
        .split('\n')
        .map(String::from)
        .collect()
}

/// Skip the init frame and the frame for the negotiated size
async fn settle(client: &mut Client) -> String {
    recv_frame(client).await;
    recv_frame(client).await
}

const DARK: Rgb = Rgb::new(0x1a, 0x1b, 0x26);
const DARK_FILL: &str = "48;2;110;163;255";

#[tokio::test]
async fn test_single_session_lifecycle() {
    let mut harness = Harness::start(Duration::from_secs(1)).await;
    let (mut client, id) = harness.connect(80, 24, DARK).await;
    harness.wait_for_sessions(vec![id]).await;

    let init = recv_frame(&mut client).await;
    assert_eq!(visible(&init), vec!["///////hello////////".to_string()]);
    assert!(init.contains(DARK_FILL));

    let first = visible(&recv_frame(&mut client).await);
    assert_eq!(first.len(), 24);
    assert!(first.iter().all(|l| l.len() == 80));
    assert!(first[0].contains("///////hello////////"));

    client
        .send(ClientMessage::Resize { width: 100, height: 30 })
        .await
        .unwrap();
    let resized = visible(&recv_frame(&mut client).await);
    assert_eq!(resized.len(), 30);
    assert!(resized.iter().all(|l| l.len() == 100));
    assert_eq!(&resized[0][40..60], "///////hello////////");

    client.send(ClientMessage::Key { key: "q".into() }).await.unwrap();
    assert_eq!(
        recv(&mut client).await,
        ServerMessage::Closed { reason: "quit".into() }
    );
    harness.wait_for_sessions(vec![]).await;

    harness.signal_shutdown();
    let report = harness.server.await.unwrap();
    assert!(report.drained_naturally());
}

#[tokio::test]
async fn test_quit_is_isolated_and_survivor_is_forced() {
    let drain = Duration::from_millis(300);
    let mut harness = Harness::start(drain).await;

    let (mut a, a_id) = harness.connect(40, 5, DARK).await;
    let (mut b, b_id) = harness.connect(50, 6, Rgb::new(0xff, 0xff, 0xff)).await;
    let (mut c, c_id) = harness.connect(60, 7, DARK).await;
    harness.wait_for_sessions(vec![a_id, b_id, c_id]).await;

    settle(&mut a).await;
    settle(&mut b).await;
    let c_before = settle(&mut c).await;

    a.send(ClientMessage::Key { key: "q".into() }).await.unwrap();
    b.send(ClientMessage::Key { key: "ctrl+c".into() }).await.unwrap();
    assert!(matches!(recv(&mut a).await, ServerMessage::Closed { .. }));
    assert!(matches!(recv(&mut b).await, ServerMessage::Closed { .. }));
    harness.wait_for_sessions(vec![c_id]).await;

    // The survivor still renders its own state
    c.send(ClientMessage::Key { key: "x".into() }).await.unwrap();
    assert_eq!(recv_frame(&mut c).await, c_before);
    c.send(ClientMessage::Resize { width: 61, height: 7 }).await.unwrap();
    let c_after = visible(&recv_frame(&mut c).await);
    assert!(c_after.iter().all(|l| l.len() == 61));

    harness.signal_shutdown();
    let report = tokio::time::timeout(drain + STEP, &mut harness.server)
        .await
        .expect("server did not exit after the drain window")
        .unwrap();

    assert_eq!(report.forced, 1);
    assert!(report.elapsed >= drain);
    assert!(report.elapsed < drain + Duration::from_millis(1500));
    assert_eq!(
        recv(&mut c).await,
        ServerMessage::Closed {
            reason: "server shutting down".into()
        }
    );
    assert!(c.next().await.is_none());
    assert_eq!(harness.registry.live_count(), 0);
}

#[tokio::test]
async fn test_connection_without_terminal_refused() {
    let mut harness = Harness::start(Duration::from_secs(1)).await;

    let stream = TcpStream::connect(harness.addr).await.unwrap();
    let mut client = Framed::new(stream, ClientCodec::new());
    client
        .send(ClientMessage::Hello {
            protocol_version: PROTOCOL_VERSION,
            term: "dumb".into(),
            pty: None,
        })
        .await
        .unwrap();

    assert!(matches!(
        recv(&mut client).await,
        ServerMessage::Rejected { .. }
    ));
    assert!(harness.sessions().await.is_empty());

    // The accept loop keeps going after a refusal
    let (_ok, id) = harness.connect(20, 2, DARK).await;
    harness.wait_for_sessions(vec![id]).await;

    harness.signal_shutdown();
    harness.server.await.unwrap();
}

#[tokio::test]
async fn test_no_new_connections_after_shutdown() {
    let mut harness = Harness::start(Duration::from_millis(100)).await;
    let addr = harness.addr;

    harness.signal_shutdown();
    harness.server.await.unwrap();

    assert!(TcpStream::connect(addr).await.is_err());
}
