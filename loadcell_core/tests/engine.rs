use loadcell_core::engine::CalibrationEngine;
use loadcell_core::error::ScaleError;
use loadcell_core::mocks::{NoopLoadCell, ScriptedLoadCell};
use loadcell_core::{CalibrationCfg, CalibrationParameters, SharedCalibration, Timeouts};
use loadcell_traits::Channel;
use loadcell_traits::clock::ManualClock;
use rstest::rstest;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn engine(cfg: CalibrationCfg) -> (CalibrationEngine, ManualClock) {
    let clock = ManualClock::new();
    let e = CalibrationEngine::new(cfg, Timeouts { sensor_ms: 5 }, Arc::new(clock.clone()));
    (e, clock)
}

fn scale_error(r: eyre::Report) -> ScaleError {
    r.downcast_ref::<ScaleError>()
        .cloned()
        .unwrap_or_else(|| panic!("not a ScaleError: {r:?}"))
}

#[test]
fn tare_uses_rounded_mean_of_raw_samples() {
    let (engine, _) = engine(CalibrationCfg {
        tare_samples: 4,
        ..CalibrationCfg::default()
    });
    let source = Mutex::new(ScriptedLoadCell::sequence([
        Some(100),
        Some(101),
        Some(101),
        Some(101),
    ]));
    let shared = SharedCalibration::default();
    let p = engine.tare(&source, &shared).unwrap();
    // mean 100.75
    assert_eq!(p.zero_offset, 101);
    assert_eq!(shared.get().zero_offset, 101);
    assert_eq!(p.reference_unit, 1.0);
}

#[test]
fn tare_skips_absent_ticks() {
    let (engine, _) = engine(CalibrationCfg {
        tare_samples: 3,
        ..CalibrationCfg::default()
    });
    let cell = ScriptedLoadCell::sequence([None, Some(10), None, None, Some(20), Some(30)]);
    let reads = cell.handle();
    let source = Mutex::new(cell);
    let p = engine.tare(&source, &SharedCalibration::default()).unwrap();
    assert_eq!(p.zero_offset, 20);
    assert_eq!(reads.reads(), 6);
}

#[test]
fn tare_averages_what_it_got_when_budget_runs_out() {
    let (engine, _) = engine(CalibrationCfg {
        tare_samples: 5,
        samples: 5,
        settle_ms: 0,
        max_attempts: 6,
    });
    let source = Mutex::new(ScriptedLoadCell::sequence([Some(40), None, Some(60)]));
    let p = engine.tare(&source, &SharedCalibration::default()).unwrap();
    assert_eq!(p.zero_offset, 50);
}

#[test]
fn tare_without_samples_times_out_and_keeps_offset() {
    let (engine, _) = engine(CalibrationCfg::default());
    let shared = SharedCalibration::new(CalibrationParameters {
        zero_offset: 77,
        ..CalibrationParameters::default()
    });
    let err = engine.tare(&Mutex::new(NoopLoadCell), &shared).unwrap_err();
    assert_eq!(scale_error(err), ScaleError::SensorTimeout { attempts: 60 });
    assert_eq!(shared.get().zero_offset, 77);
}

#[rstest]
#[case(0.0)]
#[case(-5.0)]
#[case(f64::NAN)]
#[case(f64::INFINITY)]
fn calibrate_rejects_bad_weight_before_sampling(#[case] weight: f64) {
    let (engine, _) = engine(CalibrationCfg::default());
    let cell = ScriptedLoadCell::constant(1000);
    let reads = cell.handle();
    let err = engine
        .calibrate(&Mutex::new(cell), &SharedCalibration::default(), weight)
        .unwrap_err();
    assert!(matches!(scale_error(err), ScaleError::InvalidArgument(_)));
    assert_eq!(reads.reads(), 0);
}

#[test]
fn calibrate_compensates_with_current_offset() {
    let (engine, clock) = engine(CalibrationCfg::default());
    let shared = SharedCalibration::new(CalibrationParameters {
        zero_offset: 500,
        reference_unit: 1.0,
        channel: Channel::A,
    });
    let p = engine
        .calibrate(&Mutex::new(ScriptedLoadCell::constant(2000)), &shared, 750.0)
        .unwrap();
    assert!((p.reference_unit - 2.0).abs() < 1e-12);
    assert_eq!(p.zero_offset, 500);
    assert_eq!(clock.elapsed(), Duration::from_millis(19 * 50));
}

#[test]
fn calibrate_divides_by_collected_count() {
    let (engine, _) = engine(CalibrationCfg {
        tare_samples: 4,
        samples: 4,
        settle_ms: 0,
        max_attempts: 5,
    });
    // Two samples in five attempts: mean 300, not 150.
    let source = Mutex::new(ScriptedLoadCell::sequence([None, Some(200), None, Some(400)]));
    let p = engine
        .calibrate(&source, &SharedCalibration::default(), 100.0)
        .unwrap();
    assert!((p.reference_unit - 3.0).abs() < 1e-12);
}

#[test]
fn calibrate_with_empty_scale_is_rejected() {
    let (engine, _) = engine(CalibrationCfg::default());
    let shared = SharedCalibration::new(CalibrationParameters {
        zero_offset: 1234,
        reference_unit: 5.0,
        channel: Channel::A,
    });
    let err = engine
        .calibrate(&Mutex::new(ScriptedLoadCell::constant(1234)), &shared, 100.0)
        .unwrap_err();
    assert!(matches!(scale_error(err), ScaleError::Uncalibrated(_)));
    assert_eq!(shared.get().reference_unit, 5.0);
}

#[test]
fn calibrate_without_samples_keeps_parameters() {
    let (engine, _) = engine(CalibrationCfg {
        settle_ms: 0,
        ..CalibrationCfg::default()
    });
    let shared = SharedCalibration::new(CalibrationParameters {
        zero_offset: 9,
        reference_unit: 3.0,
        channel: Channel::A,
    });
    let err = engine
        .calibrate(&Mutex::new(NoopLoadCell), &shared, 100.0)
        .unwrap_err();
    assert!(matches!(scale_error(err), ScaleError::SensorTimeout { .. }));
    assert_eq!(shared.get().reference_unit, 3.0);
    assert_eq!(shared.get().zero_offset, 9);
}

#[test]
fn negative_reference_unit_is_kept() {
    // Load cell wired in reverse: readings drop under load.
    let (engine, _) = engine(CalibrationCfg {
        settle_ms: 0,
        ..CalibrationCfg::default()
    });
    let shared = SharedCalibration::default();
    let p = engine
        .calibrate(&Mutex::new(ScriptedLoadCell::constant(-400)), &shared, 200.0)
        .unwrap();
    assert!((p.reference_unit + 2.0).abs() < 1e-12);
    assert!((p.to_weight(-400).unwrap() - 200.0).abs() < 1e-9);
}

#[test]
fn commit_runs_before_the_next_calibration_call() {
    let (engine, _) = engine(CalibrationCfg::default());
    let first = Mutex::new(ScriptedLoadCell::constant(100));
    let second = Mutex::new(ScriptedLoadCell::constant(700));
    let shared = SharedCalibration::default();

    std::thread::scope(|s| {
        let (p, (blocked, other)) = engine
            .tare_then(&first, &shared, |_| {
                let other = s.spawn(|| engine.tare(&second, &shared));
                std::thread::sleep(Duration::from_millis(50));
                (!other.is_finished(), other)
            })
            .unwrap();
        assert_eq!(p.zero_offset, 100);
        assert!(blocked, "second tare ran while the first was committing");
        assert_eq!(other.join().unwrap().unwrap().zero_offset, 700);
    });
    assert_eq!(shared.get().zero_offset, 700);
}
