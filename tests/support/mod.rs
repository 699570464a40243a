//! Shared fixtures for the behaviour tests.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use airdex_core::{
    AviationApiClient, AviationConfig, BoundaryIndex, HttpClient, HttpError, HttpRequest,
    HttpResponse, ZoneLookup,
};

/// One scripted transport outcome.
#[derive(Debug, Clone)]
pub enum Step {
    Respond(HttpResponse),
    Fail(HttpError),
    /// Never completes; only a timeout ends the attempt.
    Hang,
}

impl Step {
    pub fn status(status: u16, body: &str) -> Self {
        Self::Respond(HttpResponse::new(status, body))
    }

    pub fn ok(body: &str) -> Self {
        Self::Respond(HttpResponse::ok_json(body))
    }
}

/// In-memory transport replaying scripted steps, then repeating `fallback`.
pub struct ScriptedHttpClient {
    script: Mutex<VecDeque<Step>>,
    fallback: Step,
    calls: AtomicUsize,
    requests: Mutex<Vec<HttpRequest>>,
    call_times: Mutex<Vec<tokio::time::Instant>>,
}

impl ScriptedHttpClient {
    pub fn new(steps: impl IntoIterator<Item = Step>, fallback: Step) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(steps.into_iter().collect()),
            fallback,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            call_times: Mutex::new(Vec::new()),
        })
    }

    pub fn always(step: Step) -> Arc<Self> {
        Self::new([], step)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    /// Tokio-clock instants at which each call started.
    pub fn call_times(&self) -> Vec<tokio::time::Instant> {
        self.call_times.lock().expect("times lock").clone()
    }
}

impl HttpClient for ScriptedHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.call_times
            .lock()
            .expect("times lock")
            .push(tokio::time::Instant::now());
        self.requests.lock().expect("requests lock").push(request);
        let step = self
            .script
            .lock()
            .expect("script lock")
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        Box::pin(async move {
            match step {
                Step::Respond(response) => Ok(response),
                Step::Fail(error) => Err(error),
                Step::Hang => std::future::pending().await,
            }
        })
    }
}

pub const KJFK_BODY: &str = r#"{
    "KJFK": [{
        "site_number": "15793.*A",
        "type": "AIRPORT",
        "facility_name": "JOHN F KENNEDY INTL",
        "faa_ident": "JFK",
        "icao_ident": "KJFK",
        "state": "NY",
        "county": "QUEENS",
        "city": "NEW YORK",
        "latitude": "40-38-23.7400N",
        "latitude_sec": "146303.7400N",
        "longitude": "073-46-43.2930W",
        "longitude_sec": "265603.2930W",
        "elevation": "13",
        "control_tower": "Y"
    }]
}"#;

/// A record for `icao` with no usable position.
pub fn body_without_position(icao: &str, name: &str) -> String {
    format!(
        r#"{{"{icao}": [{{"facility_name": "{name}", "icao_ident": "{icao}", "latitude_sec": "", "longitude_sec": "", "elevation": ""}}]}}"#
    )
}

/// Boundaries with a single zone around the New York area.
pub const NEW_YORK_BOUNDARY: &str = r#"{
    "type": "FeatureCollection",
    "features": [{
        "type": "Feature",
        "properties": {"tzid": "America/New_York"},
        "geometry": {
            "type": "Polygon",
            "coordinates": [[[-80, 38], [-70, 38], [-70, 45], [-80, 45], [-80, 38]]]
        }
    }]
}"#;

pub fn new_york_zones() -> Arc<dyn ZoneLookup> {
    Arc::new(BoundaryIndex::from_geojson_str(NEW_YORK_BOUNDARY).expect("valid boundaries"))
}

/// Default settings pointed at a fake host.
pub fn test_config() -> AviationConfig {
    AviationConfig {
        base_url: String::from("http://aviation.test"),
        ..AviationConfig::default()
    }
}

pub fn client(http: Arc<ScriptedHttpClient>, config: &AviationConfig) -> AviationApiClient {
    config
        .build_client(http, new_york_zones())
        .expect("valid test config")
}
