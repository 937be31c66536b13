//! `ofr replay`: the pacing loop.
//!
//! One session call per tick, at `pacing.tick_ms`. The loop ends on the
//! first flushed tick (unless `--loop-tail`), after the tick limit, or on
//! Ctrl-C. New anomalies are appended to the export after every tick.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::TimeDelta;
use ofr_audit::AnomalyWriter;
use ofr_config::{
    report_unused_keys, ConfigMode, ReplaySettings, UnusedKeyPolicy, WindowSettings,
};
use ofr_ledger::{Counters, FoldReport};
use ofr_replay::{ReplaySession, Tick, TimeStep, WindowMode};
use serde::Serialize;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

pub struct ReplayArgs {
    pub config_paths: Vec<PathBuf>,
    pub mode: Option<ConfigMode>,
    pub ticks: Option<u64>,
    pub preview: bool,
    pub loop_tail: bool,
    pub strict_config: bool,
    pub json: bool,
}

/// One printed line per tick.
#[derive(Debug, Serialize)]
struct TickLine {
    tick: u64,
    first_row: usize,
    rows: usize,
    flushed: bool,
    preview: bool,
    report: Option<FoldReport>,
    counters: Counters,
    open_orders: usize,
    anomalies: usize,
}

impl TickLine {
    fn from_tick(t: &Tick<'_>) -> Self {
        TickLine {
            tick: t.seq,
            first_row: t.window.rows.start,
            rows: t.events.len(),
            flushed: t.is_flush(),
            preview: t.is_preview(),
            report: t.report,
            counters: t.counters,
            open_orders: t.open_orders,
            anomalies: t.anomalies.len(),
        }
    }

    fn to_kv(&self) -> String {
        let applied = self.report.map_or(0, |r| r.applied);
        format!(
            "tick={} first_row={} rows={} flushed={} preview={} applied={} open_orders={} cancelled={} executed={} anomalies={}",
            self.tick,
            self.first_row,
            self.rows,
            self.flushed,
            self.preview,
            applied,
            self.open_orders,
            self.counters.cancelled,
            self.counters.executed,
            self.anomalies
        )
    }
}

pub async fn run_replay(args: ReplayArgs) -> Result<()> {
    let loaded = ofr_config::load_layered_yaml(&args.config_paths)?;
    let mut settings = ReplaySettings::from_config_json(&loaded.config_json)?;
    if let Some(mode) = args.mode {
        settings = settings.with_mode(&loaded.config_json, mode)?;
    }

    let policy = if args.strict_config {
        UnusedKeyPolicy::Fail
    } else {
        UnusedKeyPolicy::Warn
    };
    let unused = report_unused_keys(settings.mode(), &loaded.config_json, policy)?;
    for ptr in &unused.unused_leaf_pointers {
        warn!(pointer = %ptr, mode = %unused.mode, "config key not read in this mode");
    }

    let log = super::load_log(&settings.source_path, settings.source_format.as_deref())?;
    info!(
        config_hash = %loaded.config_hash,
        source = %settings.source_path.display(),
        rows = log.len(),
        mode = settings.mode().as_str(),
        "replay starting"
    );

    let mut writer = match &settings.export.anomalies_path {
        Some(p) => Some(
            AnomalyWriter::resume(p, settings.export.hash_chain)
                .with_context(|| format!("open anomaly export {}", p.display()))?,
        ),
        None => None,
    };

    let mode = window_mode(&settings.window);
    let apply = settings.apply_to_ledger && !args.preview;
    let max_ticks = args.ticks.or(settings.pacing.max_ticks);

    let mut session = ReplaySession::new(log);
    let mut exported = 0usize;

    let mut interval = tokio::time::interval(Duration::from_millis(settings.pacing.tick_ms));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        if max_ticks.is_some_and(|m| session.ticks() >= m) {
            info!(ticks = session.ticks(), "tick limit reached");
            break;
        }

        tokio::select! {
            _ = interval.tick() => {}
            _ = &mut ctrl_c => {
                info!("interrupted; stopping replay");
                break;
            }
        }

        let tick = session.advance(mode, apply)?;
        let line = TickLine::from_tick(&tick);
        if args.json {
            println!("{}", serde_json::to_string(&line)?);
        } else {
            println!("{}", line.to_kv());
        }

        if let Some(w) = writer.as_mut() {
            exported += w.append_all(session.ledger().anomalies().since(exported))?;
        }

        if line.flushed && !args.loop_tail {
            break;
        }
    }

    let snap = session.snapshot();
    if args.json {
        println!("{}", serde_json::to_string(&snap)?);
    } else {
        println!(
            "replay_done=true ticks={} rows_total={} watermark={} open_orders={} cancelled={} executed={} anomalies={}",
            snap.ticks,
            snap.rows_total,
            snap.watermark.map_or_else(|| "-".to_string(), |w| w.to_string()),
            snap.open_orders,
            snap.counters.cancelled,
            snap.counters.executed,
            snap.anomalies.len()
        );
        if let Some(w) = &writer {
            println!("anomalies_path={} exported={}", w.path().display(), exported);
        }
    }

    Ok(())
}

fn window_mode(w: &WindowSettings) -> WindowMode {
    match *w {
        WindowSettings::Time {
            step_ms,
            initial_width_ms,
        } => WindowMode::Time(TimeStep::new(millis(step_ms), millis(initial_width_ms))),
        WindowSettings::Count { size_rows } => WindowMode::Count { size: size_rows },
    }
}

fn millis(ms: u64) -> TimeDelta {
    TimeDelta::milliseconds(i64::try_from(ms).unwrap_or(i64::MAX))
}
