//! Structured JSON-lines logging.
//!
//! Design goals:
//! 1. Multi-level granularity (TRACE → FATAL)
//! 2. Domain categories for filtering (`LOG_DOMAINS`)
//! 3. Replay/audit support via sequence numbers and state digests
//!
//! Every record goes to stdout and to a per-run directory under
//! `LOG_DIR/RUN_ID`: trace/debug lines land in `trace.jsonl`, the rest in
//! `events.jsonl`.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::Instant;

use crate::engine::bicameral::{Judgment, Resolution};
use crate::engine::state::PranaState;
use crate::onchain::GravityReading;
use crate::verify::LawViolation;

// =============================================================================
// Log Levels
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    Fatal = 5,
}

impl Level {
    pub fn from_env() -> Self {
        match std::env::var("LOG_LEVEL").as_deref() {
            Ok("trace") => Level::Trace,
            Ok("debug") => Level::Debug,
            Ok("info") => Level::Info,
            Ok("warn") => Level::Warn,
            Ok("error") => Level::Error,
            Ok("fatal") => Level::Fatal,
            _ => Level::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Fatal => "fatal",
        }
    }
}

// =============================================================================
// Log Domains
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Market,  // Ticks, price changes
    Stress,  // Recurrence, neurochemistry
    Shadow,  // Monte Carlo worlds
    Mind,    // Bicameral resolution and judgment
    Chaos,   // On-chain gravity well
    Law,     // Transition checks
    System,  // Startup, shutdown, storage
    Profile, // Timing
    Audit,   // Replay digests
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Market => "market",
            Domain::Stress => "stress",
            Domain::Shadow => "shadow",
            Domain::Mind => "mind",
            Domain::Chaos => "chaos",
            Domain::Law => "law",
            Domain::System => "system",
            Domain::Profile => "profile",
            Domain::Audit => "audit",
        }
    }

    pub fn is_enabled(&self) -> bool {
        // comma-separated list or "all"
        match std::env::var("LOG_DOMAINS").as_deref() {
            Ok("all") | Err(_) => true,
            Ok(domains) => domains.split(',').any(|d| d.trim() == self.as_str()),
        }
    }
}

// =============================================================================
// Run context
// =============================================================================

static LOG_SEQ: AtomicU64 = AtomicU64::new(0);
static RUN_CONTEXT: OnceLock<Option<RunContext>> = OnceLock::new();

fn next_seq() -> u64 {
    LOG_SEQ.fetch_add(1, Ordering::SeqCst)
}

#[derive(Debug)]
struct RunContext {
    run_id: String,
    events: Mutex<BufWriter<File>>,
    trace: Mutex<BufWriter<File>>,
}

fn open_run_context() -> Option<RunContext> {
    let run_id = std::env::var("RUN_ID").unwrap_or_else(|_| format!("r-{}-{}", ts_epoch_ms(), process::id()));
    let base = std::env::var("LOG_DIR").unwrap_or_else(|_| "out/runs".to_string());
    let mut run_dir = PathBuf::from(base);
    run_dir.push(&run_id);
    if let Err(err) = create_dir_all(&run_dir) {
        eprintln!("[log] failed to create run dir: {}", err);
        return None;
    }

    let _ = std::fs::write(
        run_dir.join("manifest.json"),
        json!({
            "run_id": run_id,
            "ts": ts_now(),
            "pid": process::id(),
            "log_dir": run_dir.to_string_lossy(),
        })
        .to_string(),
    );

    let open = |name: &str| match File::create(run_dir.join(name)) {
        Ok(f) => Some(Mutex::new(BufWriter::new(f))),
        Err(err) => {
            eprintln!("[log] failed to create {}: {}", name, err);
            None
        }
    };

    Some(RunContext { events: open("events.jsonl")?, trace: open("trace.jsonl")?, run_id })
}

fn run_context() -> Option<&'static RunContext> {
    RUN_CONTEXT.get_or_init(open_run_context).as_ref()
}

fn write_line(writer: &Mutex<BufWriter<File>>, line: &str) {
    if let Ok(mut w) = writer.lock() {
        let _ = writeln!(w, "{}", line);
        let _ = w.flush();
    }
}

// =============================================================================
// Core logging functions
// =============================================================================

/// RFC3339 timestamp with milliseconds
pub fn ts_now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Epoch milliseconds (for replay correlation)
pub fn ts_epoch_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

/// Emit a structured log entry
pub fn log(level: Level, domain: Domain, event: &str, fields: Map<String, Value>) {
    if level < Level::from_env() || !domain.is_enabled() {
        return;
    }
    emit_record(level, domain.as_str(), event, fields);
}

fn emit_record(level: Level, component: &str, event: &str, mut fields: Map<String, Value>) {
    let ctx = run_context();
    let msg = fields.remove("msg").unwrap_or(Value::String(String::new()));

    let mut entry = Map::new();
    entry.insert("ts".to_string(), json!(ts_now()));
    entry.insert("run_id".to_string(), json!(ctx.map(|c| c.run_id.as_str()).unwrap_or("-")));
    entry.insert("seq".to_string(), json!(next_seq()));
    entry.insert("lvl".to_string(), json!(level.as_str().to_uppercase()));
    entry.insert("component".to_string(), json!(component));
    entry.insert("event".to_string(), json!(event));
    entry.insert("msg".to_string(), msg);
    entry.insert("data".to_string(), Value::Object(fields));

    let line = Value::Object(entry).to_string();
    if let Some(ctx) = ctx {
        match level {
            Level::Trace | Level::Debug => write_line(&ctx.trace, &line),
            _ => write_line(&ctx.events, &line),
        }
    }
    println!("{}", line);
}

// =============================================================================
// Domain-Specific Logging Helpers
// =============================================================================

pub fn log_tick(state: &PranaState, assets: usize) {
    log(
        Level::Debug,
        Domain::Market,
        "tick",
        obj(&[
            ("tick_ts", json!(state.timestamp)),
            ("assets", json!(assets)),
            ("stress", v_num(state.system.stress)),
            ("entropy", v_num(state.system.entropy)),
            ("energy", v_num(state.system.energy)),
            ("fear_index", v_num(state.fear_index)),
            ("threat", v_str(state.threat_state.as_str())),
            ("shadow", json!(state.shadow.interpretation)),
        ]),
    );
}

pub fn log_resolution(r: &Resolution) {
    log(
        Level::Debug,
        Domain::Mind,
        "resolution",
        obj(&[
            ("mode", v_str(r.mode.as_str())),
            ("logic_fear", v_num(r.logic_fear)),
            ("shadow_fear", v_num(r.shadow_fear)),
            ("final_fear", v_num(r.final_fear)),
            ("conflict", v_num(r.conflict_level)),
            ("msg", v_str(&r.narrative)),
        ]),
    );
}

pub fn log_judgment(j: &Judgment, reality: f64) {
    log(
        Level::Info,
        Domain::Mind,
        "judgment",
        obj(&[
            ("verdict", json!(j.verdict)),
            ("reality", v_num(reality)),
            ("dopamine_delta", v_num(j.dopamine_delta)),
            ("energy_delta", v_num(j.energy_delta)),
            ("arrogance", v_num(j.bias.arrogance)),
            ("rigidity", v_num(j.bias.rigidity)),
            ("shame_multiplier", v_num(j.bias.shame_multiplier)),
            ("msg", v_str(&j.confession)),
        ]),
    );
}

pub fn log_gravity(g: &GravityReading) {
    log(
        Level::Debug,
        Domain::Chaos,
        "gravity",
        obj(&[
            ("gravity_index", v_num(g.gravity_index)),
            ("chaos_attractor", v_num(g.chaos_attractor)),
            ("instant_fear", v_num(g.instant_fear)),
            ("alignment", json!(g.alignment_count)),
            ("event_horizon", json!(g.event_horizon)),
            ("dynamic_sleep", json!(g.dynamic_sleep)),
        ]),
    );
}

pub fn log_law_violation(v: &LawViolation) {
    log(
        Level::Warn,
        Domain::Law,
        "law_violation",
        obj(&[
            ("law", v_str(v.law.numeral())),
            ("prev_fear", v_num(v.prev.fear_index)),
            ("curr_fear", v_num(v.curr.fear_index)),
            ("prev_threat", v_str(v.prev.threat_state.as_str())),
            ("curr_threat", v_str(v.curr.threat_state.as_str())),
            ("msg", v_str(&v.detail)),
        ]),
    );
}

/// Log an audit entry for replay verification
pub fn log_audit(event_type: &str, state_hash: &str, input_hash: &str, output_hash: &str) {
    log(
        Level::Info,
        Domain::Audit,
        event_type,
        obj(&[
            ("state_hash", v_str(state_hash)),
            ("input_hash", v_str(input_hash)),
            ("output_hash", v_str(output_hash)),
        ]),
    );
}

// =============================================================================
// Field helpers
// =============================================================================

pub fn obj(pairs: &[(&str, Value)]) -> Map<String, Value> {
    let mut map = Map::new();
    for (k, v) in pairs {
        map.insert((*k).to_string(), v.clone());
    }
    map
}

pub fn v_str(s: &str) -> Value {
    Value::String(s.to_string())
}

pub fn v_num(n: f64) -> Value {
    json!(n)
}

// =============================================================================
// Profiling Scope
// =============================================================================

/// Emits elapsed time at trace level on drop.
pub struct ProfileScope {
    label: &'static str,
    context: Option<Map<String, Value>>,
    started: Instant,
}

impl ProfileScope {
    pub fn new(label: &'static str) -> Self {
        Self { label, context: None, started: Instant::now() }
    }

    pub fn with_context(label: &'static str, fields: &[(&str, Value)]) -> Self {
        Self { label, context: Some(obj(fields)), started: Instant::now() }
    }
}

impl Drop for ProfileScope {
    fn drop(&mut self) {
        let elapsed_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        let mut fields = self.context.take().unwrap_or_default();
        fields.insert("label".to_string(), v_str(self.label));
        fields.insert("elapsed_ms".to_string(), v_num(elapsed_ms));
        log(Level::Trace, Domain::Profile, "profile", fields);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(Level::Trace < Level::Debug);
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warn);
        assert!(Level::Warn < Level::Error);
        assert!(Level::Error < Level::Fatal);
    }

    #[test]
    fn test_obj_helper() {
        let m = obj(&[("key", v_str("value")), ("num", v_num(42.0))]);
        assert_eq!(m.get("key").unwrap(), "value");
        assert_eq!(m.get("num").unwrap(), 42.0);
    }

    #[test]
    fn test_seq_increments() {
        let s1 = next_seq();
        let s2 = next_seq();
        assert!(s2 > s1);
    }

    #[test]
    fn test_domain_names_are_distinct() {
        let all = [
            Domain::Market,
            Domain::Stress,
            Domain::Shadow,
            Domain::Mind,
            Domain::Chaos,
            Domain::Law,
            Domain::System,
            Domain::Profile,
            Domain::Audit,
        ];
        let names: std::collections::HashSet<_> = all.iter().map(|d| d.as_str()).collect();
        assert_eq!(names.len(), all.len());
    }
}
