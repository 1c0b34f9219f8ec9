mod broker;
mod logger;
mod outbox;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use log::LevelFilter;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, UdpSocket};
use tokio::sync::mpsc;
use tokio::time::Instant;

use mqttsn_gateway::config::GatewayConfig;
use mqttsn_gateway::topic::RegMgr;
use mqttsn_gateway::{Gateway, Session};

use broker::drain_broker_bytes;
use outbox::{GatewayOutbox, SessionOutbox};

const MAX_DATAGRAM: usize = 1500;

#[tokio::main]
async fn main() {
    GatewayLoggerInit::init();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));
    let config = Arc::new(
        GatewayConfig::try_from_path(&config_path).expect("config.toml did not parse as TOML"),
    );

    let broker_addr: SocketAddr = format!(
        "{}:{}",
        config.mqtt_broker_tcp.address, config.mqtt_broker_tcp.port
    )
    .parse()
    .expect("mqtt_broker_tcp did not form a valid socket address");

    let client_socket = Arc::new(
        UdpSocket::bind(&config.mqttsn_udp_bind)
            .await
            .unwrap_or_else(|err| panic!("could not bind {}: {err}", config.mqttsn_udp_bind)),
    );

    log::info!("mqttsn-gatewayd listening on {}", config.mqttsn_udp_bind);

    spawn_advertiser(client_socket.clone(), config.clone());

    let mut sessions: HashMap<SocketAddr, mpsc::UnboundedSender<Bytes>> = HashMap::new();
    let mut recv_buf = vec![0u8; MAX_DATAGRAM];

    loop {
        let (len, peer) = match client_socket.recv_from(&mut recv_buf).await {
            Ok(pair) => pair,
            Err(err) => {
                log::error!("UDP recv failed: {err}");
                continue;
            }
        };
        let datagram = Bytes::copy_from_slice(&recv_buf[..len]);

        let tx = sessions.entry(peer).or_insert_with(|| {
            let (tx, rx) = mpsc::unbounded_channel();
            tokio::spawn(run_session(
                peer,
                rx,
                client_socket.clone(),
                broker_addr,
                config.clone(),
            ));
            tx
        });

        if tx.send(datagram).is_err() {
            sessions.remove(&peer);
        }
    }
}

struct GatewayLoggerInit;

impl GatewayLoggerInit {
    fn init() {
        logger::GatewayLogger::init(LevelFilter::Info).expect("logger already initialized");
    }
}

fn spawn_advertiser(socket: Arc<UdpSocket>, config: Arc<GatewayConfig>) {
    tokio::spawn(async move {
        let gateway = Gateway::new(config.mqttsn_gw_id, config.mqttsn_advertise);
        let mut outbox = GatewayOutbox::default();
        gateway.start(&mut outbox);

        loop {
            for msg in outbox.broadcasts.drain(..) {
                match msg.encode() {
                    Ok(bytes) => {
                        if let Err(err) = socket.send_to(&bytes, &config.mqttsn_udp_broadcast).await
                        {
                            log::warn!("advertise broadcast failed: {err}");
                        }
                    }
                    Err(err) => log::warn!("could not encode ADVERTISE: {err}"),
                }
            }

            let wait_ms = outbox.tick_ms.take().unwrap_or(1000);
            tokio::time::sleep(Duration::from_millis(u64::from(wait_ms))).await;
            gateway.on_tick(&mut outbox);
        }
    });
}

/// One task per MQTT-SN client, multiplexed off the shared UDP socket by
/// peer address. Owns the broker TCP connection and the per-session tick.
async fn run_session(
    peer: SocketAddr,
    mut from_peer: mpsc::UnboundedReceiver<Bytes>,
    client_socket: Arc<UdpSocket>,
    broker_addr: SocketAddr,
    config: Arc<GatewayConfig>,
) {
    let mut reg_mgr = RegMgr::new(config.topic_id_alloc_range().0, config.topic_id_alloc_range().1);
    for (name, id) in config.predefined_topics_for("") {
        reg_mgr.add_predefined(name, id);
    }

    let mut session = Session::new(config.mqttsn_default_client_id.clone(), reg_mgr);
    session.state.retry_period_ms = config.mqttsn_retry_period;
    session.state.retry_count = config.mqttsn_retry_count;
    session.state.pub_only_keep_alive_s = config.mqttsn_pub_only_keep_alive;
    session.state.sleep_pub_acc_limit = config.mqttsn_sleeping_client_msg_limit;

    let mut broker_stream: Option<TcpStream> = None;
    let mut broker_buf = BytesMut::new();
    let mut tcp_read_buf = vec![0u8; 4096];
    let mut next_deadline: Option<Instant> = None;
    let start = Instant::now();

    log::info!("new session for {peer}");

    loop {
        let tick = async {
            match next_deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            maybe_datagram = from_peer.recv() => {
                let Some(bytes) = maybe_datagram else { break };
                let mut outbox = SessionOutbox::new(config.clone());
                let now_ms = start.elapsed().as_millis() as u64;
                if let Err(err) = session.on_client_frame(&mut outbox, &bytes, now_ms) {
                    log::warn!("{peer}: discarding malformed MQTT-SN frame: {err}");
                }
                apply_outbox(&mut session, &mut outbox, &client_socket, peer, &mut broker_stream, broker_addr, &mut next_deadline).await;
            }

            _ = tick, if next_deadline.is_some() => {
                next_deadline = None;
                let mut outbox = SessionOutbox::new(config.clone());
                let now_ms = start.elapsed().as_millis() as u64;
                session.on_tick(&mut outbox, now_ms);
                apply_outbox(&mut session, &mut outbox, &client_socket, peer, &mut broker_stream, broker_addr, &mut next_deadline).await;
            }

            result = read_broker(broker_stream.as_mut(), &mut tcp_read_buf), if broker_stream.is_some() => {
                match result {
                    Ok(0) => {
                        log::warn!("{peer}: broker connection closed");
                        broker_stream = None;
                    }
                    Ok(n) => {
                        broker_buf.extend_from_slice(&tcp_read_buf[..n]);
                        let mut outbox = SessionOutbox::new(config.clone());
                        drain_broker_bytes(&mut session, &mut outbox, &mut broker_buf);
                        apply_outbox(&mut session, &mut outbox, &client_socket, peer, &mut broker_stream, broker_addr, &mut next_deadline).await;
                    }
                    Err(err) => {
                        log::warn!("{peer}: broker read failed: {err}");
                        broker_stream = None;
                    }
                }
            }
        }

        if session.is_terminating() {
            log::info!("{peer}: session terminated");
            break;
        }
    }
}

async fn read_broker(stream: Option<&mut TcpStream>, buf: &mut [u8]) -> std::io::Result<usize> {
    use tokio::io::AsyncReadExt;
    match stream {
        Some(stream) => stream.read(buf).await,
        None => std::future::pending().await,
    }
}

async fn apply_outbox(
    session: &mut Session,
    outbox: &mut SessionOutbox,
    client_socket: &UdpSocket,
    peer: SocketAddr,
    broker_stream: &mut Option<TcpStream>,
    broker_addr: SocketAddr,
    next_deadline: &mut Option<Instant>,
) {
    for msg in outbox.to_client.drain(..) {
        match msg.encode() {
            Ok(bytes) => {
                if let Err(err) = client_socket.send_to(&bytes, peer).await {
                    log::warn!("{peer}: send failed: {err}");
                }
            }
            Err(err) => log::warn!("{peer}: could not encode outgoing frame: {err}"),
        }
    }

    let was_explicit_reconnect = outbox.reconnect_broker;
    if outbox.reconnect_broker {
        *broker_stream = None;
    }

    if broker_stream.is_none() && (was_explicit_reconnect || !outbox.to_broker.is_empty()) {
        match TcpStream::connect(broker_addr).await {
            Ok(stream) => {
                *broker_stream = Some(stream);
                if was_explicit_reconnect {
                    // Nothing is necessarily queued in `outbox.to_broker` here (the
                    // request came from a retry/will-update/missed-ping path, not
                    // from ConnectOp queuing a fresh CONNECT) — give every op a
                    // chance to resend whatever the broker needs first.
                    session.on_broker_reconnected(outbox);
                } else {
                    session.on_broker_connected();
                }
            }
            Err(err) => {
                log::warn!("{peer}: could not reach broker at {broker_addr}: {err}");
            }
        }
    }

    if let Some(stream) = broker_stream.as_mut() {
        for packet in outbox.to_broker.drain(..) {
            match packet.encode() {
                Ok(bytes) => {
                    if let Err(err) = stream.write_all(&bytes).await {
                        log::warn!("{peer}: broker write failed: {err}");
                        *broker_stream = None;
                        break;
                    }
                }
                Err(err) => log::warn!("{peer}: could not encode outgoing broker packet: {err}"),
            }
        }
    } else {
        outbox.to_broker.clear();
    }

    if outbox.tick_cancelled {
        *next_deadline = None;
    }
    if let Some(ms) = outbox.tick_ms {
        *next_deadline = Some(Instant::now() + Duration::from_millis(u64::from(ms)));
    }

    if let Some(client_id) = outbox.newly_connected_client.take() {
        log::info!("{peer}: client '{client_id}' connected");
    }
}
