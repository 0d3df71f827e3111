//! Periodic background driver.
//!
//! Recomputes the bundle on a fixed cadence - independent of cache
//! staleness - and fans the result out to all WebSocket subscribers. Every
//! per-cycle failure is caught and logged; the loop never terminates on a
//! data-source failure.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use crate::state::AppState;
use crate::ws;

pub fn spawn(state: Arc<AppState>) {
    let period = state.config.refresh_interval;
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(period);
        loop {
            timer.tick().await;

            let bundle = match state.relay.refresh(Utc::now()).await {
                Ok(bundle) => bundle,
                Err(error) => {
                    warn!(%error, "refresh cycle failed, retrying next tick");
                    continue;
                }
            };

            match ws::update_json(&bundle) {
                Ok(json) => {
                    // send() errors only when no subscriber is connected.
                    let receivers = state.updates.send(json).unwrap_or(0);
                    debug!(
                        receivers,
                        symbols = bundle.symbol_count,
                        "published market bundle"
                    );
                }
                Err(error) => warn!(%error, "failed to serialise bundle"),
            }
        }
    });
}
