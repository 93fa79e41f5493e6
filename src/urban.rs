use crate::config::UrbanConfig;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;

/// Raw answer of an ArcGIS `query` call, reduced to what the viewer reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UrbanQuery {
    #[serde(default)]
    pub features: Vec<UrbanFeature>,
    // ArcGIS reports failures in the body with a 200 status.
    #[serde(default)]
    pub error: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UrbanFeature {
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default)]
    pub geometry: Option<UrbanGeometry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UrbanGeometry {
    #[serde(default)]
    pub rings: Vec<Vec<Vec<f64>>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Morphology {
    Urban,
    Rural,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvalInfo {
    pub lat: f64,
    pub lng: f64,
    pub morphology: Morphology,
}

/// Body of `GET /eval`.
#[derive(Debug, Clone, Serialize)]
pub struct EvalResponse {
    pub info: EvalInfo,
    pub name: Option<String>,
    #[serde(rename = "urbanArea")]
    pub urban_area: Vec<Vec<Vec<f64>>>,
}

pub fn evaluate(lat: f64, lng: f64, query: &UrbanQuery) -> EvalResponse {
    let first = query.features.first();
    EvalResponse {
        info: EvalInfo {
            lat,
            lng,
            morphology: if query.features.is_empty() {
                Morphology::Rural
            } else {
                Morphology::Urban
            },
        },
        name: first
            .and_then(|f| f.attributes.get("NAME"))
            .and_then(Value::as_str)
            .map(str::to_string),
        urban_area: first
            .and_then(|f| f.geometry.as_ref())
            .map(|g| g.rings.clone())
            .unwrap_or_default(),
    }
}

#[async_trait]
pub trait UrbanLookup: Send + Sync {
    async fn query(&self, lat: f64, lng: f64) -> Result<UrbanQuery>;
}

pub struct TigerWeb {
    client: reqwest::Client,
    url: String,
}

impl TigerWeb {
    pub fn new(config: &UrbanConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            url: config.query_url.clone(),
        })
    }
}

#[async_trait]
impl UrbanLookup for TigerWeb {
    async fn query(&self, lat: f64, lng: f64) -> Result<UrbanQuery> {
        let geometry = format!("{},{}", lng, lat);
        let params = [
            ("where", "1=1"),
            ("geometry", geometry.as_str()),
            ("geometryType", "esriGeometryPoint"),
            ("inSR", "4326"),
            ("spatialRel", "esriSpatialRelIntersects"),
            ("outFields", "BASENAME,NAME,UA,GEOID,LSADC"),
            ("returnGeometry", "true"),
            ("f", "pjson"),
        ];

        debug!("Querying urban areas at {}", geometry);
        let query: UrbanQuery = self
            .client
            .get(&self.url)
            .query(&params)
            .send()
            .await
            .context("Urban area query failed")?
            .error_for_status()
            .context("Urban area service returned an error status")?
            .json()
            .await
            .context("Failed to decode urban area response")?;

        if let Some(error) = &query.error {
            return Err(anyhow!("Urban area service error: {}", error));
        }
        Ok(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn urban_hit() -> UrbanQuery {
        serde_json::from_value(json!({
            "features": [{
                "attributes": {"NAME": "Denver--Aurora, CO", "UA": "23527"},
                "geometry": {"rings": [[[-105.0, 39.0], [-104.0, 39.0], [-104.0, 40.0], [-105.0, 39.0]]]}
            }]
        }))
        .unwrap()
    }

    #[test]
    fn a_returned_area_means_urban() {
        let response = evaluate(39.7, -104.9, &urban_hit());
        let body = serde_json::to_value(&response).unwrap();
        assert_eq!(body["info"]["morphology"], "Urban");
        assert_eq!(body["info"]["lat"], 39.7);
        assert_eq!(body["name"], "Denver--Aurora, CO");
        assert_eq!(body["urbanArea"][0].as_array().unwrap().len(), 4);
    }

    #[test]
    fn no_area_means_rural_with_null_name() {
        let response = evaluate(40.0, -103.0, &UrbanQuery::default());
        let body = serde_json::to_value(&response).unwrap();
        assert_eq!(body["info"]["morphology"], "Rural");
        assert!(body["name"].is_null());
        assert_eq!(body["urbanArea"], json!([]));
    }

    #[test]
    fn info_keys_keep_their_order() {
        let body = serde_json::to_value(evaluate(1.0, 2.0, &UrbanQuery::default())).unwrap();
        let keys: Vec<&String> = body["info"].as_object().unwrap().keys().collect();
        assert_eq!(keys, ["lat", "lng", "morphology"]);
    }

    #[test]
    fn service_errors_are_parsed() {
        let query: UrbanQuery =
            serde_json::from_value(json!({"error": {"code": 400, "message": "Invalid query"}})).unwrap();
        assert!(query.error.is_some());
        assert!(query.features.is_empty());
    }
}
