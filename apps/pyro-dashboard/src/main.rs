//! 热解装置操作面板：现场快照采集、实时转发与操作员控制台。

mod console;
mod render;

use console::Command;
use domain::EndpointConfig;
use pyro_config::{AppConfig, EndpointStore, FieldProtocol, JsonEndpointStore};
use pyro_protocol::{
    DeviceConnector, FieldLink, ModbusTcpConfig, ModbusTcpConnector, SerialAsciiConnector,
    SerialConfig,
};
use pyro_sync::{SyncConfig, SyncEvent, SyncHandle};
use pyro_telemetry::{init_tracing, metrics};
use pyro_transport::{TransportConfig, TransportLink};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    // 从环境变量加载运行配置
    let config = AppConfig::from_env()?;
    // 初始化结构化日志
    init_tracing();

    let store = JsonEndpointStore::new(config.config_path.clone());

    // 转发链路：启动即连接，断线由事件循环自行重连
    let transport = Arc::new(TransportLink::new(transport_config(&config)));
    transport.connect();

    // 现场链路：按接入方式选择连接器
    let field_link = FieldLink::new(field_connector(&config), config.boiler_id);
    let (sync, scheduler) = pyro_sync::spawn(
        field_link,
        transport.clone(),
        SyncConfig {
            poll_interval: config.poll_interval(),
            channel: config.publish_channel.clone(),
        },
    );
    let display = tokio::spawn(display_loop(sync.subscribe()));

    info!(
        config_path = %store.path().display(),
        protocol = ?config.field_protocol,
        "pyro dashboard started"
    );
    if config.auto_connect {
        connect_saved(&sync, &store).await;
    }

    println!("{}", console::HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => console::next_input(line),
            _ = tokio::signal::ctrl_c() => None,
        };
        // stdin 关闭或 Ctrl-C 视同 quit
        let Some(line) = line else { break };

        let command = match console::parse(&line) {
            Ok(command) => command,
            Err(console::ParseError::Empty) => continue,
            Err(err) => {
                println!("{}", err);
                continue;
            }
        };
        match command {
            Command::Save { plant_id, com_port } => {
                match store.save(&EndpointConfig::new(plant_id, com_port)) {
                    Ok(()) => println!("saved to {}", store.path().display()),
                    Err(err) => println!("save failed: {}", err),
                }
            }
            Command::Connect => connect_saved(&sync, &store).await,
            Command::Disconnect => match sync.disconnect_field_link().await {
                Ok(true) => println!("field link closed"),
                Ok(false) => println!("field link was not connected"),
                Err(err) => println!("disconnect failed: {}", err),
            },
            Command::Status => {
                println!("{}", render::render_status(&sync.status(), transport.state()));
                println!("{:?}", metrics().snapshot());
            }
            Command::Help => println!("{}", console::HELP),
            Command::Quit => break,
        }
    }

    if let Err(err) = sync.shutdown().await {
        warn!(error = %err, "scheduler already stopped");
    }
    scheduler.await?;
    display.abort();
    transport.disconnect();
    info!("pyro dashboard stopped");
    Ok(())
}

fn transport_config(config: &AppConfig) -> TransportConfig {
    TransportConfig {
        host: config.mqtt_host.clone(),
        port: config.mqtt_port,
        username: config.mqtt_username.clone(),
        password: config.mqtt_password.clone(),
        topic_prefix: config.mqtt_topic_prefix.clone(),
        qos: config.mqtt_qos,
        auto_reconnect: config.transport_auto_reconnect,
        reconnect_delay: config.transport_reconnect_delay(),
        ..TransportConfig::default()
    }
}

fn field_connector(config: &AppConfig) -> Arc<dyn DeviceConnector> {
    match config.field_protocol {
        FieldProtocol::Serial => Arc::new(SerialAsciiConnector::new(SerialConfig {
            baud_rate: config.field_baud_rate,
            slave_id: config.field_slave_id,
            timeout: config.field_timeout(),
            ..SerialConfig::default()
        })),
        FieldProtocol::Tcp => Arc::new(ModbusTcpConnector::new(ModbusTcpConfig {
            slave_id: config.field_slave_id,
            read_timeout: config.field_timeout(),
            ..ModbusTcpConfig::default()
        })),
    }
}

/// 用最近保存的端点连接现场链路。
async fn connect_saved(sync: &SyncHandle, store: &JsonEndpointStore) {
    let endpoint = store.load();
    let result = sync.connect(&endpoint.plant_id, &endpoint.com_port).await;
    println!(
        "{}",
        console::connect_message(&result, sync.is_field_link_connected(), &endpoint)
    );
}

/// 每份新快照刷新一次显示；现场链路断开即清空。
async fn display_loop(mut events: broadcast::Receiver<SyncEvent>) {
    loop {
        match events.recv().await {
            Ok(SyncEvent::SnapshotUpdated(snapshot)) => {
                println!("{}", render::render_snapshot(&snapshot));
            }
            Ok(SyncEvent::FieldLinkLost { reason }) => {
                println!("field link lost: {}", reason);
                println!("{}", render::NO_TELEMETRY);
            }
            Ok(SyncEvent::FieldLinkClosed) => println!("{}", render::NO_TELEMETRY),
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped = skipped, "display lagged behind snapshots");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
