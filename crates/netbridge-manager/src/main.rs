//! netbridge echo demo: runs an echo server and a client against each other
//! in one process over the in-process transport.
//!
//! # Usage
//!
//! ```text
//! netbridge-echo [OPTIONS]
//!
//! Options:
//!   --mode   <ip|identity>  Address the server by UDP port or by identity [default: ip]
//!   --port   <PORT>         Listen port (IP mode) or virtual port (identity mode)
//!   --config <PATH>         TOML config file [default: netbridge.toml]
//!   --ticks  <N>            Ticks to run before exiting; 0 runs until Ctrl-C
//! ```
//!
//! # What one tick does
//!
//! ```text
//! pump()
//!  └─ events
//!       ├─ None -> Connecting on an inbound connection: accept, join poll group
//!       ├─ Connected on the client connection:          send first greeting
//!       └─ ClosedByPeer / ProblemDetectedLocally:       close our end
//!  └─ server: echo every message on the poll group back to its sender
//!  └─ client: read replies, send the next greeting or hang up
//! ```

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use netbridge_core::{ConnectionHandle, ConnectionState, Datagram, Event, PeerIdentity, PollGroupHandle, SendFlags};
use netbridge_manager::infrastructure::storage::config::{load_config_from, NetbridgeConfig};
use netbridge_manager::{LocalTransport, NetworkManager};

/// Greetings the client sends before hanging up.
const GREETING_COUNT: u32 = 5;

// ── CLI argument definitions ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Listen on a UDP port, connect by `127.0.0.1:<port>`.
    Ip,
    /// Listen on a virtual port, connect by the local identity.
    Identity,
}

/// Echo server and client over the netbridge connection manager.
#[derive(Debug, Parser)]
#[command(name = "netbridge-echo", about = "In-process echo demo for the netbridge connection manager", version)]
struct Cli {
    #[arg(long, value_enum, default_value_t = Mode::Ip, env = "NETBRIDGE_MODE")]
    mode: Mode,

    /// Overrides `echo.port` (IP mode) or `echo.virtual_port` (identity mode).
    #[arg(long, env = "NETBRIDGE_PORT")]
    port: Option<u16>,

    /// Configuration file; defaults are used when it does not exist.
    #[arg(long, default_value = "netbridge.toml", env = "NETBRIDGE_CONFIG")]
    config: PathBuf,

    /// Overrides `echo.max_ticks`.
    #[arg(long, env = "NETBRIDGE_TICKS")]
    ticks: Option<u64>,
}

impl Cli {
    /// Applies command-line overrides on top of the loaded config.
    fn apply(&self, mut config: NetbridgeConfig) -> NetbridgeConfig {
        if let Some(port) = self.port {
            match self.mode {
                Mode::Ip => config.echo.port = port,
                Mode::Identity => config.echo.virtual_port = i32::from(port),
            }
        }
        if let Some(ticks) = self.ticks {
            config.echo.max_ticks = ticks;
        }
        config
    }
}

// ── Echo session ──────────────────────────────────────────────────────────────

/// Server and client halves of the demo, driven one tick at a time.
struct EchoSession {
    group: PollGroupHandle,
    client: ConnectionHandle,
    greetings_sent: u32,
    replies: u32,
}

impl EchoSession {
    /// Opens the listen socket and starts the client connection.
    fn start(manager: &mut NetworkManager, mode: Mode, config: &NetbridgeConfig) -> anyhow::Result<Self> {
        let group = manager.create_poll_group();
        anyhow::ensure!(group.is_valid(), "could not create poll group");

        let client = match mode {
            Mode::Ip => {
                let port = config.echo.port;
                anyhow::ensure!(
                    manager.create_ip_listen_socket(port).is_valid(),
                    "could not listen on UDP port {port}"
                );
                manager.connect_by_address(&format!("127.0.0.1:{port}"))
            }
            Mode::Identity => {
                let vport = config.echo.virtual_port;
                anyhow::ensure!(
                    manager.create_identity_listen_socket(vport).is_valid(),
                    "could not listen on virtual port {vport}"
                );
                let identity = config.manager.local_identity.to_string();
                manager.connect_by_identity_on_port(&identity, vport)
            }
        };
        anyhow::ensure!(client.is_valid(), "client could not start connecting");

        Ok(Self {
            group,
            client,
            greetings_sent: 0,
            replies: 0,
        })
    }

    /// `true` once the client has hung up.
    fn finished(&self) -> bool {
        self.replies >= GREETING_COUNT
    }

    fn tick(&mut self, manager: &mut NetworkManager) {
        manager.pump();
        while let Some(event) = manager.poll_next_event() {
            self.on_event(manager, event);
        }
        self.serve(manager);
        self.read_replies(manager);
    }

    fn on_event(&mut self, manager: &mut NetworkManager, event: Event) {
        debug!("{event}");
        let conn = event.connection();
        match event.state() {
            ConnectionState::Connecting if event.is_incoming_request() => {
                let inbound = manager.get_connection_info(conn).is_some_and(|info| info.is_inbound());
                if inbound {
                    manager.accept_connection(conn);
                    manager.assign_connection_to_group(conn, self.group);
                }
            }
            ConnectionState::Connected if conn == self.client => {
                info!("client connected");
                self.send_greeting(manager);
            }
            ConnectionState::Connected => info!("server: {conn} joined"),
            ConnectionState::ClosedByPeer | ConnectionState::ProblemDetectedLocally => {
                if let Some(info) = manager.get_connection_info(conn) {
                    info!("{conn} ended: reason {} {:?}", info.end_reason, info.end_debug);
                }
                manager.close_connection(conn);
            }
            _ => {}
        }
    }

    /// Echoes every pending message on the poll group back to its sender.
    fn serve(&mut self, manager: &mut NetworkManager) {
        while let Some(mut msg) = manager.receive_next_message_on_group(self.group) {
            let text = match msg.iterator().get_string() {
                Ok(text) => text,
                Err(e) => {
                    warn!("server: unreadable message from {}: {e}", msg.connection());
                    continue;
                }
            };
            info!("server: {} says {text:?}", msg.connection());
            match echo_datagram(&text) {
                Ok(reply) => manager.send(msg.connection(), reply.as_bytes(), SendFlags::RELIABLE),
                Err(e) => warn!("server: cannot echo: {e}"),
            }
        }
    }

    fn read_replies(&mut self, manager: &mut NetworkManager) {
        if self.finished() {
            return;
        }
        while let Some(mut msg) = manager.receive_next_message(self.client) {
            match msg.iterator().get_string() {
                Ok(reply) => info!("client: got {reply:?}"),
                Err(e) => warn!("client: unreadable reply: {e}"),
            }
            self.replies += 1;
            if self.finished() {
                info!("client: all {GREETING_COUNT} greetings echoed; hanging up");
                manager.close_connection(self.client);
                return;
            }
            self.send_greeting(manager);
        }
    }

    fn send_greeting(&mut self, manager: &mut NetworkManager) {
        self.greetings_sent += 1;
        let mut dg = Datagram::new();
        if let Err(e) = dg.add_string(&format!("Hello from netbridge! #{}", self.greetings_sent)) {
            warn!("client: cannot build greeting: {e}");
            return;
        }
        manager.send_to_client(dg.as_bytes(), SendFlags::RELIABLE);
    }
}

fn echo_datagram(text: &str) -> Result<Datagram, netbridge_core::DatagramError> {
    let mut dg = Datagram::new();
    dg.add_string(&format!("echo: {text}"))?;
    Ok(dg)
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config_from(&cli.config)
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;
    let config = cli.apply(config);

    // `RUST_LOG` wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.manager.log_level)),
        )
        .init();

    let identity = PeerIdentity::new(config.manager.local_identity)
        .context("manager.local_identity must be non-zero")?;
    let transport = LocalTransport::new(identity);
    let mut manager =
        NetworkManager::with_event_capacity(Some(Box::new(transport)), config.manager.event_queue_capacity);

    let mut session = EchoSession::start(&mut manager, cli.mode, &config)?;
    info!("netbridge echo running in {:?} mode.  Press Ctrl-C to exit.", cli.mode);

    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C; shutting down");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => tracing::error!("failed to listen for Ctrl+C signal: {e}"),
        }
    });

    let mut interval = tokio::time::interval(Duration::from_millis(config.echo.tick_ms.max(1)));
    let mut ticks = 0u64;
    while running.load(Ordering::Relaxed) {
        interval.tick().await;
        session.tick(&mut manager);
        ticks += 1;
        if config.echo.max_ticks != 0 && ticks >= config.echo.max_ticks {
            info!("reached {ticks} ticks");
            break;
        }
    }

    if manager.dropped_events() > 0 {
        warn!("{} events were dropped by the bounded event queue", manager.dropped_events());
    }
    info!(
        "netbridge echo stopped: {} greetings sent, {} replies",
        session.greetings_sent, session.replies
    );
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
