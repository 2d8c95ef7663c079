// Tests for configuration loading

use arealine_voice::Config;
use std::io::Write;

#[test]
fn test_load_bundled_config() {
    // The config shipped with the service must deserialize into the
    // Config struct (catches drift between the TOML and the types)
    let cfg = Config::load("config/arealine-voice").unwrap();

    assert_eq!(cfg.service.name, "arealine-voice");
    assert!(cfg.grid.url.starts_with("nats://"));
    assert!(cfg.grid.auth_token.is_none());
    assert_eq!(cfg.audio.capture_sample_rate, 16000);
    assert_eq!(cfg.audio.frame_samples, 4096);
    assert_eq!(cfg.audio.playback_sample_rate, 24000);
    assert_eq!(cfg.assistant.voice, "Zephyr");
    assert!(cfg.assistant.greeting.contains("Simi"));
    assert!(!cfg.assistant.strict_errors);
}

#[test]
fn test_load_custom_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custom.toml");

    let mut file = std::fs::File::create(&path).unwrap();
    write!(
        file,
        r#"
[service]
name = "voice-test"

[service.http]
bind = "0.0.0.0"
port = 9000

[grid]
url = "nats://grid.internal:4222"
auth_token = "secret-token"

[audio]
capture_sample_rate = 16000
frame_samples = 2048
playback_sample_rate = 24000
fixture_path = "tests/fixtures/voice.wav"

[assistant]
persona = "PERSONA: SIMI"
voice = "Zephyr"
greeting = "How far, Pilot!"
strict_errors = true
"#
    )
    .unwrap();

    let stem = dir.path().join("custom");
    let cfg = Config::load(stem.to_str().unwrap()).unwrap();

    assert_eq!(cfg.service.name, "voice-test");
    assert_eq!(cfg.service.http.port, 9000);
    assert_eq!(cfg.grid.auth_token.as_deref(), Some("secret-token"));
    assert_eq!(cfg.audio.frame_samples, 2048);
    assert_eq!(cfg.audio.fixture_path.as_deref(), Some("tests/fixtures/voice.wav"));
    assert!(cfg.audio.playback_tap.is_none());
    assert!(cfg.assistant.strict_errors);
}

#[test]
fn test_missing_config_fails() {
    assert!(Config::load("/nonexistent/arealine-voice").is_err());
}
