use domain::EndpointConfig;
use pyro_config::{AppConfig, EndpointStore, FieldProtocol, JsonEndpointStore};

#[test]
fn load_config_from_env() {
    // Rust 2024 中 set_var 需要显式标注 unsafe（测试进程内可控）。
    unsafe {
        std::env::set_var("PYRO_POLL_INTERVAL_MS", "1500");
        std::env::set_var("PYRO_FIELD_PROTOCOL", "tcp");
        std::env::set_var("PYRO_BOILER_ID", "7");
        std::env::set_var("PYRO_TRANSPORT_AUTO_RECONNECT", "off");
    }

    let config = AppConfig::from_env().expect("config");
    assert_eq!(config.poll_interval_ms, 1500);
    assert_eq!(config.field_protocol, FieldProtocol::Tcp);
    assert_eq!(config.boiler_id, 7);
    assert!(!config.transport_auto_reconnect);
    assert_eq!(config.publish_channel, "realtime");
    assert_eq!(config.field_baud_rate, 9600);
    assert_eq!(config.mqtt_port, 1883);
}

#[test]
fn load_returns_zero_value_when_absent() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = JsonEndpointStore::new(dir.path().join("config.json"));

    assert_eq!(store.load(), EndpointConfig::default());
    assert!(!store.path().exists());
}

#[test]
fn save_then_load_round_trips_verbatim() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = JsonEndpointStore::new(dir.path().join("config.json"));

    let config = EndpointConfig::new("  Plant-7 ", "COM9");
    store.save(&config).expect("save");
    assert_eq!(store.load(), config);

    let empty = EndpointConfig::new("", "");
    store.save(&empty).expect("save");
    assert_eq!(store.load(), empty);
}

#[test]
fn corrupt_file_falls_back_to_zero_value() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.json");
    std::fs::write(&path, b"{not json").expect("write");

    let store = JsonEndpointStore::new(path);
    assert_eq!(store.load(), EndpointConfig::default());
}

#[test]
fn save_into_missing_directory_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = JsonEndpointStore::new(dir.path().join("missing").join("config.json"));

    assert!(store.save(&EndpointConfig::new("Plant-7", "COM9")).is_err());
}
