//! Background catalog fetches. Every lookup runs on its own short-lived
//! worker thread and delivers its result back to the event loop as an
//! `AppEvent::Catalog`, so the terminal stays responsive while the
//! service is slow. Requests are never cancelled; staleness is decided
//! by the resolver when the reply arrives.

use crate::catalog::{CatalogPayload, CatalogReply, CatalogRequest, PumpCatalog};
use crate::AppEvent;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;

/// Dispatches catalog requests onto worker threads and routes their
/// replies into the shared event channel.
pub struct Fetcher {
    catalog: Arc<dyn PumpCatalog>,
    events: Sender<AppEvent>,
}

impl Fetcher {
    pub fn new(catalog: Arc<dyn PumpCatalog>, events: Sender<AppEvent>) -> Self {
        Self { catalog, events }
    }

    /// Issue a request. Returns immediately; the reply arrives later as
    /// an `AppEvent::Catalog` in whatever order the service completes.
    pub fn dispatch(&self, request: CatalogRequest) {
        let catalog = Arc::clone(&self.catalog);
        let events = self.events.clone();
        thread::spawn(move || {
            let result = run(catalog.as_ref(), &request);
            // Send failure means the event loop is gone; nothing to do
            let _ = events.send(AppEvent::Catalog(CatalogReply { request, result }));
        });
    }

    pub fn dispatch_all(&self, requests: Vec<CatalogRequest>) {
        for request in requests {
            self.dispatch(request);
        }
    }
}

fn run(
    catalog: &dyn PumpCatalog,
    request: &CatalogRequest,
) -> std::result::Result<CatalogPayload, String> {
    let result = match request {
        CatalogRequest::Pumps => catalog.list_pumps().map(CatalogPayload::Pumps),
        CatalogRequest::Stages { pump } => catalog.list_stages(pump).map(CatalogPayload::Stages),
        CatalogRequest::TestTypes { pump, stage } => catalog
            .list_test_types(pump, stage)
            .map(CatalogPayload::TestTypes),
        CatalogRequest::SpeedStats { pump, stage, .. } => catalog
            .rated_speed_stats(pump, stage)
            .map(CatalogPayload::SpeedStats),
        CatalogRequest::Curve {
            pump,
            stage,
            test_type,
            rated_speed,
        } => catalog
            .curve(pump, stage, test_type, *rated_speed)
            .map(CatalogPayload::Curve),
    };
    result.map_err(|e| e.to_string())
}

/// Tracks how many curve fetches are still in flight, so the UI knows
/// when to show the loading indicator. Enumerations resolve fast and
/// are not tracked.
#[derive(Debug, Default)]
pub struct RequestTracker {
    inflight_curves: usize,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issued(&mut self, request: &CatalogRequest) {
        if request.is_curve() {
            self.inflight_curves += 1;
        }
    }

    pub fn arrived(&mut self, request: &CatalogRequest) {
        if request.is_curve() {
            self.inflight_curves = self.inflight_curves.saturating_sub(1);
        }
    }

    pub fn loading(&self) -> bool {
        self.inflight_curves > 0
    }
}
