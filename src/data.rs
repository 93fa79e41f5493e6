use crate::antimeridian;
use crate::config::BoundaryConfig;
use crate::states;
use crate::topology;
use crate::types::{Boundaries, BoundaryFeature};
use anyhow::{anyhow, Context, Result};
use geo::{BoundingRect, Geometry, MultiPolygon, Rect};
use geojson::GeoJson;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

/// Fetches the states and nation documents and prepares them for hit-testing.
pub async fn load_boundaries(config: &BoundaryConfig) -> Result<Boundaries> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .context("Failed to build HTTP client")?;

    let (states_doc, nation_doc) = tokio::try_join!(
        read_source(&client, &config.states),
        read_source(&client, &config.nation),
    )?;

    prepare(config, &states_doc, &nation_doc)
}

async fn read_source(client: &reqwest::Client, source: &str) -> Result<Vec<u8>> {
    if source.starts_with("http://") || source.starts_with("https://") {
        info!("Fetching {}", source);
        let response = client
            .get(source)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", source))?
            .error_for_status()
            .with_context(|| format!("Bad response from {}", source))?;
        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read body of {}", source))?;
        Ok(bytes.to_vec())
    } else {
        info!("Reading {}", source);
        tokio::fs::read(source)
            .await
            .with_context(|| format!("Failed to read boundary file: {}", source))
    }
}

/// Converts raw documents into the allow-listed, antimeridian-corrected set.
pub fn prepare(config: &BoundaryConfig, states_doc: &[u8], nation_doc: &[u8]) -> Result<Boundaries> {
    let mut states = Vec::new();
    for feature in read_features(states_doc, &config.states_object).context("Invalid states document")? {
        let fips = match feature.id.as_deref().and_then(states::parse_fips) {
            Some(fips) => fips,
            None => continue,
        };
        let name = match states::state_name(fips) {
            Some(name) => name,
            None => {
                debug!("Skipping region {} (not in allow-list)", fips);
                continue;
            }
        };
        let geometry = match feature.geometry.and_then(polygonal) {
            Some(g) => g,
            None => continue,
        };
        states.push(BoundaryFeature { fips, name, geometry });
    }

    antimeridian::shift_west(&mut states, &config.antimeridian_ids);

    let nation = read_features(nation_doc, &config.nation_object)
        .context("Invalid nation document")?
        .into_iter()
        .next()
        .and_then(|f| f.geometry)
        .and_then(polygonal)
        .ok_or_else(|| anyhow!("Nation document has no polygon outline"))?;

    info!("Loaded {} state boundaries", states.len());
    Ok(Boundaries { nation, states })
}

/// Bounding box of all states, grown by `padding` of its size on every side.
pub fn view_bounds(states: &[BoundaryFeature], padding: f64) -> Option<Rect<f64>> {
    let rect = states
        .iter()
        .filter_map(|s| s.geometry.bounding_rect())
        .reduce(|a, b| {
            Rect::new(
                geo::Coord { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
                geo::Coord { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
            )
        })?;

    let dx = rect.width() * padding;
    let dy = rect.height() * padding;
    Some(Rect::new(
        geo::Coord { x: rect.min().x - dx, y: rect.min().y - dy },
        geo::Coord { x: rect.max().x + dx, y: rect.max().y + dy },
    ))
}

/// GeoJSON view of the prepared states, as served to the map and written by `export`.
pub fn to_feature_collection(states: &[BoundaryFeature]) -> geojson::FeatureCollection {
    let features = states
        .iter()
        .map(|s| {
            let mut properties = serde_json::Map::new();
            properties.insert("name".to_string(), serde_json::Value::from(s.name));
            geojson::Feature {
                bbox: None,
                geometry: Some(geojson::Geometry::new(geojson::Value::from(&s.geometry))),
                id: Some(geojson::feature::Id::Number(s.fips.into())),
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    geojson::FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

struct SourceFeature {
    id: Option<String>,
    geometry: Option<Geometry<f64>>,
}

#[derive(Deserialize)]
struct Probe {
    #[serde(rename = "type")]
    kind: String,
}

fn read_features(doc: &[u8], object: &str) -> Result<Vec<SourceFeature>> {
    let probe: Probe = serde_json::from_slice(doc).context("Document is not a JSON object with a type")?;

    if probe.kind == "Topology" {
        let features = topology::parse(doc)?.features(object)?;
        return Ok(features
            .into_iter()
            .map(|f| SourceFeature { id: f.id, geometry: f.geometry })
            .collect());
    }

    let document = GeoJson::from_reader(doc).context("Failed to parse GeoJSON")?;
    let features = match document {
        GeoJson::FeatureCollection(fc) => fc.features,
        GeoJson::Feature(f) => vec![f],
        GeoJson::Geometry(g) => vec![geojson::Feature::from(g)],
    };

    features
        .into_iter()
        .map(|feature| {
            let id = match feature.id {
                Some(geojson::feature::Id::String(s)) => Some(s),
                Some(geojson::feature::Id::Number(n)) => Some(n.to_string()),
                None => None,
            };
            let geometry = match feature.geometry {
                Some(g) => {
                    let valid_geo: Geometry<f64> = g
                        .value
                        .try_into()
                        .map_err(|e| anyhow!("Failed to convert geojson geometry: {:?}", e))?;
                    Some(valid_geo)
                }
                None => None,
            };
            Ok(SourceFeature { id, geometry })
        })
        .collect()
}

fn polygonal(geometry: Geometry<f64>) -> Option<MultiPolygon<f64>> {
    match geometry {
        Geometry::MultiPolygon(mp) => Some(mp),
        Geometry::Polygon(p) => Some(MultiPolygon::new(vec![p])),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{NATION, STATES};
    use geo::CoordsIter;

    #[test]
    fn filters_to_allowed_polygonal_states_in_order() {
        let boundaries = prepare(&BoundaryConfig::default(), STATES.as_bytes(), NATION.as_bytes()).unwrap();
        let ids: Vec<u32> = boundaries.states.iter().map(|s| s.fips).collect();
        assert_eq!(ids, vec![8, 2]);
        assert_eq!(boundaries.states[0].name, "Colorado");
        assert_eq!(boundaries.nation.0.len(), 3);
    }

    #[test]
    fn alaska_is_moved_west_of_the_date_line() {
        let boundaries = prepare(&BoundaryConfig::default(), STATES.as_bytes(), NATION.as_bytes()).unwrap();
        let alaska = boundaries.states.iter().find(|s| s.fips == 2).unwrap();
        assert!(alaska.geometry.coords_iter().all(|c| c.x <= 0.0));
        assert!(alaska.geometry.coords_iter().any(|c| c.x == 172.0 - 360.0));
    }

    #[test]
    fn missing_nation_outline_is_an_error() {
        let empty = r#"{"type": "FeatureCollection", "features": []}"#;
        let err = prepare(&BoundaryConfig::default(), STATES.as_bytes(), empty.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("no polygon outline"));
    }

    #[test]
    fn garbage_documents_are_rejected() {
        assert!(prepare(&BoundaryConfig::default(), b"<html>", NATION.as_bytes()).is_err());
        let mut config = BoundaryConfig::default();
        config.states_object = "counties".to_string();
        assert!(prepare(&config, STATES.as_bytes(), NATION.as_bytes()).is_err());
    }

    #[test]
    fn view_bounds_are_padded() {
        let boundaries = prepare(&BoundaryConfig::default(), STATES.as_bytes(), NATION.as_bytes()).unwrap();
        let colorado = &boundaries.states[..1];
        let rect = view_bounds(colorado, 0.10).unwrap();
        assert!((rect.min().x - (-109.7)).abs() < 1e-9);
        assert!((rect.max().x - (-101.3)).abs() < 1e-9);
        assert!((rect.min().y - 36.6).abs() < 1e-9);
        assert!((rect.max().y - 41.4).abs() < 1e-9);
        assert!(view_bounds(&[], 0.10).is_none());
    }

    #[test]
    fn feature_collection_keeps_ids_and_names() {
        let boundaries = prepare(&BoundaryConfig::default(), STATES.as_bytes(), NATION.as_bytes()).unwrap();
        let fc = to_feature_collection(&boundaries.states);
        let body = serde_json::to_value(&fc).unwrap();
        assert_eq!(body["features"][0]["id"], 8);
        assert_eq!(body["features"][0]["properties"]["name"], "Colorado");
        assert_eq!(body["features"][1]["geometry"]["type"], "MultiPolygon");
    }

    #[tokio::test]
    async fn loads_from_local_files() {
        let dir = std::env::temp_dir().join(format!("statepick-data-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let states_path = dir.join("states.json");
        let nation_path = dir.join("nation.json");
        std::fs::write(&states_path, STATES).unwrap();
        std::fs::write(&nation_path, NATION).unwrap();

        let config = BoundaryConfig {
            states: states_path.to_string_lossy().into_owned(),
            nation: nation_path.to_string_lossy().into_owned(),
            ..BoundaryConfig::default()
        };
        let boundaries = load_boundaries(&config).await.unwrap();
        assert_eq!(boundaries.states.len(), 2);

        let missing = BoundaryConfig {
            states: dir.join("nope.json").to_string_lossy().into_owned(),
            ..config
        };
        assert!(load_boundaries(&missing).await.is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
