#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use mnav_tracker::clock::{Clock, FixedClock};
use mnav_tracker::config::{Config, RefreshMode};
use mnav_tracker::market_data::PriceSource;
use mnav_tracker::models::{PriceQuote, PriceTarget};
use mnav_tracker::{TrackerService, TrackerServiceBuilder};
use tokio::sync::Notify;

pub fn fixed_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2025, 8, 1, 12, 0, 0).unwrap(),
    ))
}

/// Holds the first fetch of a cycle until released.
#[derive(Default)]
pub struct Gate {
    entered: Notify,
    release: Notify,
}

impl Gate {
    /// Resolves once a fetch is blocked on the gate.
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }
}

/// Price source with programmable prices. Unknown symbols are absent.
pub struct MockPriceSource {
    clock: Arc<dyn Clock>,
    prices: Mutex<HashMap<String, f64>>,
    calls: Mutex<Vec<PriceTarget>>,
    gate: Option<Arc<Gate>>,
}

impl MockPriceSource {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            prices: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    pub fn with_price(self, symbol: &str, price: f64) -> Self {
        self.set_price(symbol, Some(price));
        self
    }

    pub fn with_gate(mut self, gate: Arc<Gate>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn set_price(&self, symbol: &str, price: Option<f64>) {
        let mut prices = self.prices.lock().unwrap();
        match price {
            Some(price) => prices.insert(symbol.to_string(), price),
            None => prices.remove(symbol),
        };
    }

    pub fn calls(&self) -> Vec<PriceTarget> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl PriceSource for MockPriceSource {
    async fn fetch_price(&self, target: &PriceTarget) -> PriceQuote {
        let first = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(target.clone());
            calls.len() == 1
        };
        if let (true, Some(gate)) = (first, &self.gate) {
            gate.entered.notify_one();
            gate.release.notified().await;
        }

        let price = self.prices.lock().unwrap().get(target.symbol()).copied();
        PriceQuote::new(target.symbol(), price, self.clock.now())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// In-memory service with no inter-call delay.
pub async fn build_service(
    source: Arc<MockPriceSource>,
    clock: Arc<FixedClock>,
    mode: RefreshMode,
) -> anyhow::Result<TrackerService> {
    let mut config = Config::default();
    config.refresh.mode = mode;
    config.refresh.inter_call_delay = Duration::ZERO;

    TrackerServiceBuilder::new(config.resolve(Path::new(".")))
        .with_price_source(source)
        .with_clock(clock)
        .build()
        .await
}
