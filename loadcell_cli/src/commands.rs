//! Command implementations: config mapping, source assembly, and output.

use std::io::{BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use eyre::WrapErr;
use loadcell_core::{CalibrationStore, FileStore, LoadCellScale, LoadOutcome, SaveOutcome};
use loadcell_hardware::Gain;
use loadcell_traits::LoadCell;
use serde_json::json;

// Simulation knobs read from the environment (sim backend only).
#[cfg(not(feature = "hardware"))]
const SIM_RAW_ENV: &str = "LOADCELL_SIM_RAW";
/// Raw value the simulator jumps to when asked to place the calibration weight.
const SIM_LOADED_RAW_ENV: &str = "LOADCELL_SIM_LOADED_RAW";
#[cfg(not(feature = "hardware"))]
const SIM_PERIOD_ENV: &str = "LOADCELL_SIM_PERIOD_MS";

pub type Scale = LoadCellScale<Box<dyn LoadCell + Send>>;

/// Everything a command needs besides its own arguments.
pub struct Context {
    pub cfg: loadcell_config::Config,
    pub store_path: PathBuf,
    pub json: bool,
}

impl Context {
    fn gain(&self) -> eyre::Result<Gain> {
        Ok(Gain::try_from(self.cfg.hardware.gain)?)
    }

    fn emit(&self, value: serde_json::Value, text: impl FnOnce() -> String) {
        let mut out = std::io::stdout().lock();
        let line = if self.json { value.to_string() } else { text() };
        let _ = writeln!(out, "{line}");
        let _ = out.flush();
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> eyre::Result<Option<T>> {
    match std::env::var(key) {
        Ok(v) => v
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| eyre::eyre!("{key} must be a number, got {v:?}")),
        Err(_) => Ok(None),
    }
}

/// Source handle plus, for the simulator, the knob that moves its reading.
pub struct Source {
    pub cell: Box<dyn LoadCell + Send>,
    sim: Option<loadcell_hardware::SimHandle>,
}

/// Simulate placing the calibration weight, when a loaded reading is configured.
fn place_weight(sim: Option<&loadcell_hardware::SimHandle>) -> eyre::Result<()> {
    if let (Some(sim), Some(raw)) = (sim, env_parse::<i32>(SIM_LOADED_RAW_ENV)?) {
        tracing::debug!(raw, "simulated weight placed");
        sim.set_raw(raw);
    }
    Ok(())
}

#[cfg(feature = "hardware")]
pub fn make_source(ctx: &Context) -> eyre::Result<Source> {
    let gain = ctx.gain()?;
    let cell = loadcell_hardware::HardwareLoadCell::try_new(
        ctx.cfg.pins.hx711_dt,
        ctx.cfg.pins.hx711_sck,
        gain,
    )
    .wrap_err("open hx711")?;
    tracing::info!(
        dt = ctx.cfg.pins.hx711_dt,
        sck = ctx.cfg.pins.hx711_sck,
        gain = gain.factor(),
        "hx711 ready"
    );
    Ok(Source {
        cell: Box::new(cell),
        sim: None,
    })
}

#[cfg(not(feature = "hardware"))]
pub fn make_source(ctx: &Context) -> eyre::Result<Source> {
    let gain = ctx.gain()?;
    let raw = env_parse::<i32>(SIM_RAW_ENV)?.unwrap_or(0);
    let mut cell = loadcell_hardware::SimulatedLoadCell::new(raw).with_channel(gain.channel());
    if let Some(ms) = env_parse::<u64>(SIM_PERIOD_ENV)? {
        cell = cell.with_period(Duration::from_millis(ms));
    }
    tracing::info!(raw, channel = %gain.channel(), "using simulated load cell");
    let sim = Some(cell.handle());
    Ok(Source {
        cell: Box::new(cell),
        sim,
    })
}

fn build_scale(ctx: &Context, cell: Box<dyn LoadCell + Send>, auto_tare: bool) -> eyre::Result<Scale> {
    LoadCellScale::builder()
        .with_source(cell)
        .with_store(FileStore::new(&ctx.store_path))
        .with_config(&ctx.cfg)
        .auto_tare(auto_tare)
        .build()
}

fn saved_note(outcome: &SaveOutcome, ctx: &Context) -> String {
    match outcome {
        SaveOutcome::Saved => format!("saved to {}", ctx.store_path.display()),
        SaveOutcome::Unsaved(e) => format!("NOT saved: {e}"),
    }
}

fn save_error(outcome: &SaveOutcome) -> Option<String> {
    match outcome {
        SaveOutcome::Saved => None,
        SaveOutcome::Unsaved(e) => Some(e.to_string()),
    }
}

pub fn run_tare(ctx: &Context) -> eyre::Result<()> {
    let source = make_source(ctx)?;
    // Taring twice in a row would only double the wait.
    let scale = build_scale(ctx, source.cell, false)?;
    let outcome = scale.tare().wrap_err("tare")?;
    let p = scale.calibration();
    ctx.emit(
        json!({
            "event": "tare",
            "zero_offset": p.zero_offset,
            "reference_unit": p.reference_unit,
            "saved": outcome.is_saved(),
            "save_error": save_error(&outcome),
        }),
        || format!("Tare complete: zero offset {} ({})", p.zero_offset, saved_note(&outcome, ctx)),
    );
    Ok(())
}

pub fn run_calibrate(ctx: &Context, weight: f64, tare_first: bool) -> eyre::Result<()> {
    // Reject before touching the sensor.
    loadcell_core::engine::check_known_weight(weight)?;
    let Source { cell, sim } = make_source(ctx)?;
    let scale = build_scale(ctx, cell, false)?;

    if tare_first {
        let outcome = scale.tare().wrap_err("tare")?;
        if !ctx.json {
            println!(
                "Tare complete: zero offset {} ({})",
                scale.calibration().zero_offset,
                saved_note(&outcome, ctx)
            );
        }
        prompt_for_weight(weight, ctx.json)?;
        place_weight(sim.as_ref())?;
    }

    let outcome = scale.calibrate(weight).wrap_err("calibrate")?;
    let p = scale.calibration();
    ctx.emit(
        json!({
            "event": "calibrate",
            "known_weight": weight,
            "zero_offset": p.zero_offset,
            "reference_unit": p.reference_unit,
            "saved": outcome.is_saved(),
            "save_error": save_error(&outcome),
        }),
        || {
            format!(
                "Calibration complete: reference unit {:.6} counts/g ({})",
                p.reference_unit,
                saved_note(&outcome, ctx)
            )
        },
    );
    Ok(())
}

/// Ask for the weight to be placed; waits for Enter only on an interactive terminal.
fn prompt_for_weight(weight: f64, json: bool) -> eyre::Result<()> {
    let stdin = std::io::stdin();
    if !stdin.is_terminal() {
        return Ok(());
    }
    if !json {
        print!("Place {weight} g on the scale and press Enter... ");
        std::io::stdout().flush()?;
    }
    let mut line = String::new();
    stdin.lock().read_line(&mut line).wrap_err("read confirmation")?;
    Ok(())
}

pub fn run_watch(
    ctx: &Context,
    interval_ms: u64,
    count: Option<u64>,
    shutdown: Arc<AtomicBool>,
) -> eyre::Result<()> {
    let source = make_source(ctx)?;
    let scale = build_scale(ctx, source.cell, ctx.cfg.calibration.auto_tare)?;
    scale.start_reading()?;
    let interval = Duration::from_millis(interval_ms.max(1));
    let started = Instant::now();
    let mut printed = 0u64;

    // Wait for the first conversion so the first line is a real reading.
    let first_deadline = ctx.cfg.hardware.sensor_read_timeout_ms.saturating_mul(4);
    if !scale.wait_for_conversions(1, Duration::from_millis(first_deadline)) {
        tracing::warn!("no reading yet; printing last known weight");
    }

    while !shutdown.load(Ordering::Relaxed) {
        let w = scale.get_weight();
        ctx.emit(
            json!({
                "event": "weight",
                "elapsed_ms": u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                "weight_g": w,
            }),
            || format!("{w:.1} g"),
        );
        printed += 1;
        if count.is_some_and(|n| printed >= n) {
            break;
        }
        std::thread::sleep(interval);
    }

    scale.stop_reading();
    let stats = scale.stats();
    tracing::info!(
        delivered = stats.delivered,
        converted = stats.converted,
        rejected = stats.rejected,
        "watch finished"
    );
    if ctx.json {
        ctx.emit(
            json!({
                "event": "stopped",
                "delivered": stats.delivered,
                "converted": stats.converted,
                "rejected": stats.rejected,
            }),
            String::new,
        );
    }
    Ok(())
}

pub fn run_show(ctx: &Context) -> eyre::Result<()> {
    let channel = ctx.gain()?.channel();
    let store = FileStore::new(&ctx.store_path);
    let outcome = store.load(channel);
    let p = outcome.params();
    let reason = match &outcome {
        LoadOutcome::Loaded(_) => None,
        LoadOutcome::Defaulted { reason, .. } => Some(reason.to_string()),
    };
    ctx.emit(
        json!({
            "event": "calibration",
            "file": store.describe(),
            "channel": channel.to_string(),
            "zero_offset": p.zero_offset,
            "reference_unit": p.reference_unit,
            "stored": outcome.is_loaded(),
            "defaulted_reason": reason,
        }),
        || match &reason {
            None => format!(
                "{} (channel {channel}): zero offset {}, reference unit {}",
                store.describe(),
                p.zero_offset,
                p.reference_unit
            ),
            Some(r) => format!(
                "{}: {r}; defaults in effect (zero offset {}, reference unit {})",
                store.describe(),
                p.zero_offset,
                p.reference_unit
            ),
        },
    );
    Ok(())
}

pub fn run_self_check(ctx: &Context) -> eyre::Result<()> {
    let mut source = make_source(ctx)?;
    let timeout = Duration::from_millis(ctx.cfg.hardware.sensor_read_timeout_ms);
    let mut last_err = None;
    for attempt in 1..=3u32 {
        match source.cell.read(timeout) {
            Ok(raw) => {
                ctx.emit(
                    json!({ "event": "self_check", "ok": true, "raw": raw, "attempts": attempt }),
                    || format!("OK: raw reading {raw}"),
                );
                return Ok(());
            }
            Err(e) => {
                tracing::debug!(attempt, error = %e, "self-check read failed");
                last_err = Some(e);
            }
        }
    }
    match last_err {
        Some(e) => match e.downcast::<loadcell_hardware::error::HwError>() {
            Ok(hw) => Err(eyre::Report::new(*hw).wrap_err("self-check read")),
            Err(other) => Err(eyre::eyre!("self-check read: {other}")),
        },
        None => Err(eyre::eyre!("self-check read: no attempts made")),
    }
}
