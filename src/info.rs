use crate::states;
use crate::types::{BoundaryFeature, ClickPoint};
use crate::urban::{self, UrbanLookup};
use anyhow::{Context, Result};
use async_trait::async_trait;
use maud::html;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// What an `/eval` endpoint returns.
#[derive(Debug, Clone, Deserialize)]
pub struct InfoResponse {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub info: Map<String, Value>,
    #[serde(rename = "urbanArea", default)]
    pub urban_area: Value,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// One info request. Coordinates are rounded to six decimals, the precision
/// sent on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalRequest {
    pub lat: f64,
    pub lng: f64,
    pub fips: u32,
}

impl EvalRequest {
    pub fn new(click: ClickPoint, fips: u32) -> Self {
        Self {
            lat: round6(click.lat),
            lng: round6(click.lng),
            fips,
        }
    }

    pub fn query(&self) -> [(&'static str, String); 3] {
        [
            ("lat", format!("{:.6}", self.lat)),
            ("lng", format!("{:.6}", self.lng)),
            ("fips", self.fips.to_string()),
        ]
    }
}

fn round6(v: f64) -> f64 {
    (v * 1e6).round() / 1e6
}

#[async_trait]
pub trait InfoSource: Send + Sync {
    async fn fetch(&self, request: &EvalRequest) -> Result<InfoResponse>;
}

/// Calls a remote `/eval` endpoint.
pub struct EvalClient {
    client: reqwest::Client,
    url: String,
}

impl EvalClient {
    pub fn new(endpoint: &str, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            url: format!("{}/eval", endpoint.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl InfoSource for EvalClient {
    async fn fetch(&self, request: &EvalRequest) -> Result<InfoResponse> {
        let response: InfoResponse = self
            .client
            .get(&self.url)
            .query(&request.query())
            .send()
            .await
            .with_context(|| format!("Request to {} failed", self.url))?
            .error_for_status()?
            .json()
            .await
            .context("Failed to decode info response")?;
        Ok(response)
    }
}

/// Runs the eval logic in-process, going through the same JSON shape the
/// endpoint serves.
pub struct LocalEval {
    urban: Arc<dyn UrbanLookup>,
}

impl LocalEval {
    pub fn new(urban: Arc<dyn UrbanLookup>) -> Self {
        Self { urban }
    }
}

#[async_trait]
impl InfoSource for LocalEval {
    async fn fetch(&self, request: &EvalRequest) -> Result<InfoResponse> {
        let query = self.urban.query(request.lat, request.lng).await?;
        let body = serde_json::to_value(urban::evaluate(request.lat, request.lng, &query))?;
        Ok(serde_json::from_value(body)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Popup {
    pub title: String,
    pub lines: Vec<(String, String)>,
}

impl Popup {
    pub fn from_response(response: &InfoResponse, state_name: &str) -> Self {
        let title = response
            .name
            .clone()
            .unwrap_or_else(|| format!("Unincorporated {}", state_name));
        let lines = response
            .info
            .iter()
            .map(|(k, v)| (k.clone(), display_value(v)))
            .collect();
        Self { title, lines }
    }

    pub fn to_html(&self) -> String {
        html! {
            b { (self.title) }
            @for (k, v) in &self.lines {
                br;
                (k) ": " (v)
            }
        }
        .into_string()
    }

    pub fn to_text(&self) -> String {
        let mut text = self.title.clone();
        for (k, v) in &self.lines {
            text.push_str(&format!("\n  {}: {}", k, v));
        }
        text
    }
}

// Browser string conversion: whole floats lose their fraction, arrays join
// with commas, nulls inside arrays become empty.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(i), _, _) => i.to_string(),
            (_, Some(u), _) => u.to_string(),
            (_, _, Some(f)) => f.to_string(),
            _ => n.to_string(),
        },
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(items) => items
            .iter()
            .map(|v| if v.is_null() { String::new() } else { display_value(v) })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

/// Fetches info for a hit and builds its popup. A failed fetch is logged and
/// yields `None`; the user sees nothing.
pub async fn open_popup(source: &dyn InfoSource, state: &BoundaryFeature, click: ClickPoint) -> Option<Popup> {
    let request = EvalRequest::new(click, state.fips);
    match source.fetch(&request).await {
        Ok(response) => {
            debug!(?response, "Info response");
            Some(Popup::from_response(&response, state.name))
        }
        Err(e) => {
            warn!(
                state = state.name,
                lat = request.lat,
                lng = request.lng,
                fips = %states::padded(state.fips),
                "Info request failed: {:#}",
                e
            );
            None
        }
    }
}
