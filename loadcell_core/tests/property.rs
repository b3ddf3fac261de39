use loadcell_core::store::{CalibrationStore, FileStore, MemoryStore};
use loadcell_core::{CalibrationParameters, convert};
use loadcell_traits::Channel;
use proptest::prelude::*;

prop_compose! {
    fn params_strategy()(
        zero_offset in -(1i64 << 24)..(1i64 << 24),
        magnitude in 1e-3f64..1e6,
        negative in any::<bool>(),
        channel in prop_oneof![Just(Channel::A), Just(Channel::B)],
    ) -> CalibrationParameters {
        CalibrationParameters {
            zero_offset,
            reference_unit: if negative { -magnitude } else { magnitude },
            channel,
        }
    }
}

proptest! {
    #[test]
    fn memory_store_round_trips(params in params_strategy()) {
        let store = MemoryStore::new();
        store.save(params.channel, &params).unwrap();
        let outcome = store.load(params.channel);
        prop_assert!(outcome.is_loaded());
        prop_assert_eq!(outcome.params(), params);
    }

    #[test]
    fn file_store_round_trips(params in params_strategy()) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("scale_config.json"));
        store.save(params.channel, &params).unwrap();
        let outcome = store.load(params.channel);
        prop_assert!(outcome.is_loaded());
        prop_assert_eq!(outcome.params(), params);
    }

    /// Equal raw steps give equal weight steps, and the offset maps to zero.
    #[test]
    fn conversion_is_linear(
        params in params_strategy(),
        base in -(1i32 << 23)..(1i32 << 23),
        step in 1i32..10_000,
    ) {
        let p = CalibrationParameters { zero_offset: i64::from(base), ..params };
        prop_assert_eq!(convert(base, &p).unwrap(), 0.0);
        let w1 = convert(base + step, &p).unwrap();
        let w2 = convert(base + 2 * step, &p).unwrap();
        let tol = 1e-9 * w1.abs().max(1.0);
        prop_assert!((w2 - 2.0 * w1).abs() <= tol, "w1={} w2={}", w1, w2);
        prop_assert!((w1 * p.reference_unit - f64::from(step)).abs() <= 1e-6 * f64::from(step));
    }
}
