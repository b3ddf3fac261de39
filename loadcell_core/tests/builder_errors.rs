use loadcell_core::error::BuildError;
use loadcell_core::mocks::{NoopLoadCell, ScriptedLoadCell};
use loadcell_core::{AutoTare, CalibrationCfg, LoadCellScale, MemoryStore, SamplingMode, Timeouts};
use rstest::rstest;

fn expect_invalid(err: eyre::Report, needle: &str) {
    match err.downcast_ref::<BuildError>() {
        Some(BuildError::InvalidConfig(msg)) => assert!(msg.contains(needle), "got: {msg}"),
        other => panic!("expected InvalidConfig, got: {other:?}"),
    }
}

#[rstest]
#[case(CalibrationCfg { tare_samples: 0, ..CalibrationCfg::default() }, "tare_samples")]
#[case(CalibrationCfg { samples: 0, ..CalibrationCfg::default() }, "samples")]
#[case(CalibrationCfg { max_attempts: 10, ..CalibrationCfg::default() }, "max_attempts")]
fn rejects_unusable_calibration_budget(#[case] cfg: CalibrationCfg, #[case] needle: &str) {
    let err = LoadCellScale::builder()
        .with_source(ScriptedLoadCell::constant(0))
        .with_calibration_cfg(cfg)
        .auto_tare(false)
        .build()
        .expect_err("invalid budget");
    expect_invalid(err, needle);
}

#[test]
fn rejects_zero_sensor_timeout() {
    let err = LoadCellScale::builder()
        .with_source(ScriptedLoadCell::constant(0))
        .with_timeouts(Timeouts { sensor_ms: 0 })
        .build()
        .expect_err("zero timeout");
    expect_invalid(err, "sensor_ms");
}

#[test]
fn rejects_zero_paced_rate() {
    let err = LoadCellScale::builder()
        .with_source(ScriptedLoadCell::constant(0))
        .with_sampling(SamplingMode::Paced(0))
        .build()
        .expect_err("zero rate");
    expect_invalid(err, "sample_rate_hz");
}

#[test]
fn failed_auto_tare_does_not_fail_the_build() {
    let scale = LoadCellScale::builder()
        .with_source(NoopLoadCell)
        .with_calibration_cfg(CalibrationCfg {
            tare_samples: 2,
            samples: 2,
            settle_ms: 0,
            max_attempts: 3,
        })
        .with_timeouts(Timeouts { sensor_ms: 1 })
        .build()
        .expect("build succeeds");
    assert!(matches!(scale.startup().auto_tare, AutoTare::Failed(_)));
    assert_eq!(scale.calibration().zero_offset, 0);
}

#[test]
fn auto_tare_zeroes_and_persists() {
    let store = std::sync::Arc::new(MemoryStore::new());
    let scale = LoadCellScale::builder()
        .with_source(ScriptedLoadCell::constant(8_000))
        .with_shared_store(store.clone())
        .build()
        .unwrap();
    assert_eq!(scale.startup().auto_tare, AutoTare::Done { saved: true });
    assert!(!scale.startup().loaded);
    assert_eq!(scale.calibration().zero_offset, 8_000);
    assert!(store.contents().unwrap().contains("\"offset_a\": 8000"));
}
