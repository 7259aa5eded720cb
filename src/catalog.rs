//! Remote catalog boundary: the request/response contract with the pump
//! test data service, plus the HTTP implementation of it.

use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Rated-speed statistics for a `(pump, stage)` pair.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpeedStats {
    pub avg_speed: f64,
    #[serde(default)]
    pub min_speed: f64,
    #[serde(default)]
    pub max_speed: f64,
    #[serde(default)]
    pub common_speeds: Vec<f64>,
}

/// One raw curve point as returned by the service. Order within
/// `CurveResponse::data_points` is meaningful and preserved.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CurvePoint {
    pub flow: f64,
    pub head: f64,
    pub efficiency: f64,
    #[serde(default)]
    pub power: f64,
    #[serde(default)]
    pub impeller_dia: Option<f64>,
    /// Full source-row attribute map, passed through untouched.
    #[serde(default)]
    pub all_data: BTreeMap<String, serde_json::Value>,
}

/// Curve fetch response for a full `(pump, stage, test type, speed)` tuple.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CurveResponse {
    pub pump_type: String,
    pub stage: String,
    pub test_type: String,
    pub rated_speed: f64,
    pub data_points: Vec<CurvePoint>,
}

/// The remote catalog contract. Implementations are blocking; callers
/// run them on worker threads (see `fetch`), never on the event loop.
pub trait PumpCatalog: Send + Sync {
    fn list_pumps(&self) -> Result<Vec<String>>;
    fn list_stages(&self, pump: &str) -> Result<Vec<String>>;
    fn list_test_types(&self, pump: &str, stage: &str) -> Result<Vec<String>>;
    fn rated_speed_stats(&self, pump: &str, stage: &str) -> Result<SpeedStats>;
    fn curve(
        &self,
        pump: &str,
        stage: &str,
        test_type: &str,
        rated_speed: f64,
    ) -> Result<CurveResponse>;
}

/// A single catalog lookup, tagged with the selection scope it was
/// issued for. The scope is what the resolver checks replies against
/// when deciding whether a response is still current.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogRequest {
    Pumps,
    Stages {
        pump: String,
    },
    TestTypes {
        pump: String,
        stage: String,
    },
    SpeedStats {
        pump: String,
        stage: String,
        /// Speed-edit serial at issue time; stats only overwrite the
        /// rated speed if the user has not edited it since.
        speed_edits: u64,
    },
    Curve {
        pump: String,
        stage: String,
        test_type: String,
        rated_speed: f64,
    },
}

impl CatalogRequest {
    pub fn is_curve(&self) -> bool {
        matches!(self, CatalogRequest::Curve { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CatalogPayload {
    Pumps(Vec<String>),
    Stages(Vec<String>),
    TestTypes(Vec<String>),
    SpeedStats(SpeedStats),
    Curve(CurveResponse),
}

/// A completed catalog lookup delivered back to the event loop. Errors
/// are stringified so the reply can cross the event channel.
#[derive(Debug, Clone)]
pub struct CatalogReply {
    pub request: CatalogRequest,
    pub result: std::result::Result<CatalogPayload, String>,
}

#[derive(Debug, Deserialize)]
struct PumpsEnvelope {
    pumps: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct StagesEnvelope {
    stages: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TestTypesEnvelope {
    test_types: Vec<String>,
}

/// HTTP implementation of the catalog contract against the pump test
/// data service's REST endpoints.
pub struct HttpCatalog {
    base: String,
    agent: ureq::Agent,
}

impl HttpCatalog {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_read(timeout)
            .timeout_write(timeout)
            .build();
        Self {
            base: base_url.trim_end_matches('/').to_string(),
            agent,
        }
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}/{}", self.base, path);
        let response = self
            .agent
            .get(&url)
            .call()
            .map_err(|e| eyre!("GET {} failed: {}", url, e))?;
        response
            .into_json::<T>()
            .map_err(|e| eyre!("GET {} returned invalid JSON: {}", url, e))
    }
}

impl PumpCatalog for HttpCatalog {
    fn list_pumps(&self) -> Result<Vec<String>> {
        let envelope: PumpsEnvelope = self.get_json("pumps")?;
        Ok(envelope.pumps)
    }

    fn list_stages(&self, pump: &str) -> Result<Vec<String>> {
        let envelope: StagesEnvelope = self.get_json(&format!("stages/{}", pump))?;
        Ok(envelope.stages)
    }

    fn list_test_types(&self, pump: &str, stage: &str) -> Result<Vec<String>> {
        let envelope: TestTypesEnvelope =
            self.get_json(&format!("test-types/{}/{}", pump, stage))?;
        Ok(envelope.test_types)
    }

    fn rated_speed_stats(&self, pump: &str, stage: &str) -> Result<SpeedStats> {
        self.get_json(&format!("rated-speeds/{}/{}", pump, stage))
    }

    fn curve(
        &self,
        pump: &str,
        stage: &str,
        test_type: &str,
        rated_speed: f64,
    ) -> Result<CurveResponse> {
        let url = format!("{}/curve-data", self.base);
        let response = self
            .agent
            .post(&url)
            .send_json(ureq::json!({
                "pump_type": pump,
                "stage": stage,
                "test_type": test_type,
                "rated_speed": rated_speed,
            }))
            .map_err(|e| eyre!("POST {} failed: {}", url, e))?;
        response
            .into_json::<CurveResponse>()
            .map_err(|e| eyre!("POST {} returned invalid JSON: {}", url, e))
    }
}
