// Loading and writing the TOML configuration file.

use lorabridge::config::Config;
use tempfile::tempdir;

#[tokio::test]
async fn default_file_round_trips() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let path = path.to_str().unwrap();

    Config::create_default(path).await.unwrap();
    let loaded = Config::load(path).await.unwrap();
    let defaults = Config::default();

    assert_eq!(loaded.radio.port, defaults.radio.port);
    assert_eq!(loaded.module, defaults.module);
    assert_eq!(loaded.broker.topic_root.as_deref(), Some("home/mailbox/"));
    assert!(loaded.broker.client_id.starts_with("LoRaBridge"));
    assert!(loaded.problems().is_empty());
}

#[tokio::test]
async fn empty_client_id_is_generated_on_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bridge.toml");
    std::fs::write(
        &path,
        "[radio]\nport = \"/dev/ttyS1\"\n\n[broker]\nhost = \"mqtt.local\"\nclient_id = \"\"\n",
    )
    .unwrap();

    let config = Config::load(path.to_str().unwrap()).await.unwrap();
    assert_eq!(config.broker.host, "mqtt.local");
    assert!(config.broker.client_id.starts_with("LoRaBridge"));
}

#[tokio::test]
async fn missing_file_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nope.toml");
    let err = Config::load(path.to_str().unwrap()).await.unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}

#[tokio::test]
async fn invalid_module_settings_are_reported_not_corrected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        "[radio]\nport = \"/dev/ttyS1\"\n\n[module]\nnetwork_id = 7\npreamble = 20\nrf_power = 30\n",
    )
    .unwrap();

    let config = Config::load(path.to_str().unwrap()).await.unwrap();
    assert_eq!(config.module.parameters.preamble, 20);
    let problems = config.problems();
    assert_eq!(problems.len(), 2);
    assert!(problems.iter().all(|p| p.starts_with("[module]")));
}
