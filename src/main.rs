use anyhow::Result;
use serde_json::json;
use sha2::{Digest, Sha256};
use tokio::time::{sleep, Duration};

use prana::engine::{Organism, PranaState};
use prana::logging::{
    log, log_audit, log_judgment, log_law_violation, obj, v_num, v_str, Domain, Level, ProfileScope,
};
use prana::onchain::NetworkVitals;
use prana::signals::Tick;
use prana::state::{HostConfig, PranaConfig};
use prana::storage::{load_tick, SnapshotStore};
use prana::verify::assert_prana_laws;

fn tick_hash(tick: &Tick) -> String {
    let bytes = serde_json::to_vec(tick).unwrap_or_default();
    hex::encode(Sha256::digest(&bytes))
}

/// Run one tick against the stored snapshot. Returns the seconds to sleep.
///
/// The previous decision is judged only once its successor passes the laws,
/// so a rejected tick leaves both the snapshot and the resolver bias alone.
fn run_tick(
    organism: &mut Organism,
    store: &SnapshotStore,
    prev: &PranaState,
    tick: &Tick,
    network: &NetworkVitals,
) -> Result<u64> {
    let _scope = ProfileScope::new("host_tick");
    let mut out = organism.step(prev, tick, Some(network));
    let slow = organism.config().onchain.slow_sleep_secs;
    let wait = out.gravity.as_ref().map(|g| g.dynamic_sleep).unwrap_or(slow);

    if let Err(violation) = assert_prana_laws(prev, &out.state, &organism.config().laws) {
        log_law_violation(&violation);
        return Ok(wait);
    }

    // Last tick's decision, judged by the stress that followed it
    if let Some(record) = &prev.mind {
        let reality = out.state.system.stress;
        let judgment = organism.judge(record, reality);
        out.absorb_judgment(&judgment);
        log_judgment(&judgment, reality);
    }

    store.save(&out.state)?;
    log_audit("tick", &prev.digest(), &tick_hash(tick), &out.state_hash);
    log(
        Level::Info,
        Domain::System,
        "state",
        obj(&[
            ("fear_index", v_num(out.state.fear_index)),
            ("threat", v_str(out.state.threat_state.as_str())),
            ("mode", v_str(out.resolution.mode.as_str())),
            ("event_horizon", json!(out.gravity.as_ref().map(|g| g.event_horizon))),
        ]),
    );
    Ok(wait)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = PranaConfig::from_env();
    let host = HostConfig::from_env();
    let store = SnapshotStore::new(&host.state_path);
    let network = NetworkVitals::default();
    let mut organism = Organism::new(cfg, host.seed);

    log(
        Level::Info,
        Domain::System,
        "startup",
        obj(&[
            ("tick_path", v_str(&host.tick_path)),
            ("state_path", v_str(&host.state_path)),
            ("seed", json!(host.seed)),
            ("max_ticks", json!(host.max_ticks)),
        ]),
    );

    let mut ticks = 0u64;
    loop {
        let prev = store.load();
        let wait = match load_tick(&host.tick_path) {
            Ok(tick) => run_tick(&mut organism, &store, &prev, &tick, &network)?,
            Err(err) => {
                log(
                    Level::Warn,
                    Domain::Market,
                    "tick_unavailable",
                    obj(&[("msg", v_str(&format!("{:#}", err)))]),
                );
                organism.config().onchain.slow_sleep_secs
            }
        };

        ticks += 1;
        if host.max_ticks > 0 && ticks >= host.max_ticks {
            break;
        }
        sleep(Duration::from_secs(wait)).await;
    }

    log(Level::Info, Domain::System, "shutdown", obj(&[("ticks", json!(ticks))]));
    Ok(())
}
