use loadcell_config::{Config, SamplingMode, load_config, load_toml};
use rstest::rstest;
use std::io::Write;

const FULL: &str = r#"
[pins]
hx711_dt = 5
hx711_sck = 6

[hardware]
gain = 64
sensor_read_timeout_ms = 200

[sampling]
mode = "paced"
sample_rate_hz = 80

[calibration]
file = "/var/lib/loadcell/cal.json"
tare_samples = 10
samples = 20
settle_ms = 50
max_attempts = 40
auto_tare = false

[logging]
level = "debug"
rotation = "daily"
"#;

#[test]
fn parses_full_config() {
    let cfg = load_toml(FULL).expect("parse TOML");
    cfg.validate().expect("valid config should pass");
    assert_eq!(cfg.pins.hx711_dt, 5);
    assert_eq!(cfg.hardware.gain, 64);
    assert_eq!(cfg.sampling.mode, SamplingMode::Paced);
    assert_eq!(cfg.sampling.sample_rate_hz, 80);
    assert!(!cfg.calibration.auto_tare);
    assert_eq!(cfg.calibration.file.to_str(), Some("/var/lib/loadcell/cal.json"));
}

#[test]
fn empty_document_uses_defaults() {
    let cfg = load_toml("").expect("empty TOML is a valid config");
    cfg.validate().expect("defaults validate");
    assert_eq!(cfg.pins.hx711_dt, 23);
    assert_eq!(cfg.pins.hx711_sck, 24);
    assert_eq!(cfg.calibration.samples, 20);
    assert_eq!(cfg.calibration.settle_ms, 50);
    assert!(cfg.calibration.auto_tare);
    assert_eq!(cfg.sampling.mode, SamplingMode::Event);
}

#[rstest]
#[case("[hardware]\ngain = 16\n", "hardware.gain")]
#[case("[hardware]\nsensor_read_timeout_ms = 0\n", "sensor_read_timeout_ms")]
#[case("[sampling]\nsample_rate_hz = 0\n", "sample_rate_hz must be > 0")]
#[case("[calibration]\nsamples = 0\n", "calibration.samples")]
#[case("[calibration]\ntare_samples = 0\n", "calibration.tare_samples")]
#[case("[calibration]\nsamples = 50\nmax_attempts = 10\n", "max_attempts")]
#[case("[calibration]\nsettle_ms = 60000\n", "settle_ms")]
#[case("[pins]\nhx711_dt = 5\nhx711_sck = 5\n", "must differ")]
#[case("[logging]\nrotation = \"weekly\"\n", "logging.rotation")]
fn rejects_out_of_range(#[case] toml: &str, #[case] needle: &str) {
    let cfg: Config = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should be rejected");
    assert!(format!("{err}").contains(needle), "error `{err}` lacks `{needle}`");
}

#[test]
fn unknown_sampling_mode_is_a_parse_error() {
    assert!(load_toml("[sampling]\nmode = \"turbo\"\n").is_err());
}

#[test]
fn load_config_reads_and_validates_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("loadcell.toml");
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(FULL.as_bytes()).unwrap();
    let cfg = load_config(&path).expect("load config");
    assert_eq!(cfg.calibration.tare_samples, 10);

    std::fs::write(&path, "[sampling]\nsample_rate_hz = 0\n").unwrap();
    assert!(load_config(&path).is_err());
}

#[test]
fn load_config_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_config(&dir.path().join("nope.toml")).expect_err("missing file");
    assert!(format!("{err}").contains("read config"));
}

#[test]
fn shipped_sample_config_is_valid() {
    let cfg = load_toml(include_str!("../../etc/loadcell.toml")).unwrap();
    cfg.validate().unwrap();
    assert_eq!(cfg.calibration.samples, 20);
    assert!(cfg.calibration.auto_tare);
}
