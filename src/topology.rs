use anyhow::{anyhow, bail, Context, Result};
use geo::{
    Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon,
    Point, Polygon,
};
use rayon::prelude::*;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
pub struct Topology {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub transform: Option<Transform>,
    #[serde(default)]
    pub arcs: Vec<Vec<Vec<f64>>>,
    #[serde(default)]
    pub objects: HashMap<String, TopoGeometry>,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct Transform {
    pub scale: [f64; 2],
    pub translate: [f64; 2],
}

impl Transform {
    fn apply(&self, x: f64, y: f64) -> Coord<f64> {
        Coord {
            x: x * self.scale[0] + self.translate[0],
            y: y * self.scale[1] + self.translate[1],
        }
    }
}

// `type` may be null for empty geometries, so the shape is matched by hand
// rather than through a tagged enum.
#[derive(Debug, Deserialize)]
pub struct TopoGeometry {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub properties: Option<Map<String, Value>>,
    #[serde(default)]
    pub arcs: Option<Value>,
    #[serde(default)]
    pub coordinates: Option<Value>,
    #[serde(default)]
    pub geometries: Option<Vec<TopoGeometry>>,
}

#[derive(Debug, Clone)]
pub struct TopoFeature {
    pub id: Option<String>,
    pub properties: Map<String, Value>,
    pub geometry: Option<Geometry<f64>>,
}

pub fn parse(bytes: &[u8]) -> Result<Topology> {
    let topology: Topology = serde_json::from_slice(bytes).context("Failed to parse TopoJSON")?;
    if topology.kind != "Topology" {
        bail!("Expected a Topology document, found type '{}'", topology.kind);
    }
    Ok(topology)
}

impl Topology {
    /// Converts a named object into features, one per member when the object
    /// is a GeometryCollection.
    pub fn features(&self, object: &str) -> Result<Vec<TopoFeature>> {
        let geometry = self
            .objects
            .get(object)
            .ok_or_else(|| anyhow!("Topology has no object named '{}'", object))?;
        let decoder = Decoder::new(self)?;

        match (geometry.kind.as_deref(), &geometry.geometries) {
            (Some("GeometryCollection"), Some(members)) => members
                .par_iter()
                .map(|g| decoder.feature(g))
                .collect(),
            _ => Ok(vec![decoder.feature(geometry)?]),
        }
    }
}

struct Decoder {
    arcs: Vec<Vec<Coord<f64>>>,
    transform: Option<Transform>,
}

impl Decoder {
    fn new(topology: &Topology) -> Result<Self> {
        let arcs = topology
            .arcs
            .iter()
            .enumerate()
            .map(|(i, arc)| {
                decode_arc(arc, topology.transform.as_ref()).with_context(|| format!("arc {}", i))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            arcs,
            transform: topology.transform,
        })
    }

    fn feature(&self, g: &TopoGeometry) -> Result<TopoFeature> {
        let id = match &g.id {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        Ok(TopoFeature {
            id,
            properties: g.properties.clone().unwrap_or_default(),
            geometry: self.geometry(g)?,
        })
    }

    fn geometry(&self, g: &TopoGeometry) -> Result<Option<Geometry<f64>>> {
        let kind = match g.kind.as_deref() {
            Some(k) => k,
            None => return Ok(None),
        };

        let geometry = match kind {
            "Point" => {
                let position: Vec<f64> = field(&g.coordinates, "coordinates")?;
                Geometry::Point(Point::from(self.position(&position)?))
            }
            "MultiPoint" => {
                let positions: Vec<Vec<f64>> = field(&g.coordinates, "coordinates")?;
                let points = positions
                    .iter()
                    .map(|p| self.position(p).map(Point::from))
                    .collect::<Result<Vec<_>>>()?;
                Geometry::MultiPoint(MultiPoint::new(points))
            }
            "LineString" => {
                let refs: Vec<i64> = field(&g.arcs, "arcs")?;
                Geometry::LineString(LineString::new(self.line(&refs)?))
            }
            "MultiLineString" => {
                let lines: Vec<Vec<i64>> = field(&g.arcs, "arcs")?;
                let lines = lines
                    .iter()
                    .map(|refs| self.line(refs).map(LineString::new))
                    .collect::<Result<Vec<_>>>()?;
                Geometry::MultiLineString(MultiLineString::new(lines))
            }
            "Polygon" => {
                let rings: Vec<Vec<i64>> = field(&g.arcs, "arcs")?;
                Geometry::Polygon(self.polygon(&rings)?)
            }
            "MultiPolygon" => {
                let polygons: Vec<Vec<Vec<i64>>> = field(&g.arcs, "arcs")?;
                let polygons = polygons
                    .iter()
                    .map(|rings| self.polygon(rings))
                    .collect::<Result<Vec<_>>>()?;
                Geometry::MultiPolygon(MultiPolygon::new(polygons))
            }
            "GeometryCollection" => {
                let members = g.geometries.as_deref().unwrap_or_default();
                let mut geometries = Vec::with_capacity(members.len());
                for member in members {
                    if let Some(geometry) = self.geometry(member)? {
                        geometries.push(geometry);
                    }
                }
                Geometry::GeometryCollection(GeometryCollection(geometries))
            }
            other => bail!("Unsupported TopoJSON geometry type '{}'", other),
        };

        Ok(Some(geometry))
    }

    fn position(&self, p: &[f64]) -> Result<Coord<f64>> {
        if p.len() < 2 {
            bail!("Position needs at least two values, got {}", p.len());
        }
        Ok(match &self.transform {
            Some(t) => t.apply(p[0], p[1]),
            None => Coord { x: p[0], y: p[1] },
        })
    }

    /// Stitches arcs together, dropping the shared point at each junction.
    fn stitch(&self, refs: &[i64]) -> Result<Vec<Coord<f64>>> {
        let mut points: Vec<Coord<f64>> = Vec::new();
        for &r in refs {
            let (index, reversed) = if r < 0 { (!r, true) } else { (r, false) };
            let arc = usize::try_from(index)
                .ok()
                .and_then(|i| self.arcs.get(i))
                .ok_or_else(|| anyhow!("Arc reference {} out of range ({} arcs)", r, self.arcs.len()))?;

            points.pop();
            if reversed {
                points.extend(arc.iter().rev().copied());
            } else {
                points.extend(arc.iter().copied());
            }
        }
        Ok(points)
    }

    fn line(&self, refs: &[i64]) -> Result<Vec<Coord<f64>>> {
        let mut points = self.stitch(refs)?;
        if let Some(&first) = points.first() {
            if points.len() < 2 {
                points.push(first);
            }
        }
        Ok(points)
    }

    fn ring(&self, refs: &[i64]) -> Result<LineString<f64>> {
        let mut points = self.stitch(refs)?;
        if let Some(&first) = points.first() {
            while points.len() < 4 {
                points.push(first);
            }
        }
        Ok(LineString::new(points))
    }

    fn polygon(&self, rings: &[Vec<i64>]) -> Result<Polygon<f64>> {
        let mut rings = rings
            .iter()
            .map(|refs| self.ring(refs))
            .collect::<Result<Vec<_>>>()?
            .into_iter();
        let exterior = rings.next().unwrap_or_else(|| LineString::new(Vec::new()));
        Ok(Polygon::new(exterior, rings.collect()))
    }
}

fn decode_arc(arc: &[Vec<f64>], transform: Option<&Transform>) -> Result<Vec<Coord<f64>>> {
    let mut x = 0.0;
    let mut y = 0.0;
    arc.iter()
        .map(|p| {
            if p.len() < 2 {
                bail!("Arc position needs at least two values, got {}", p.len());
            }
            Ok(match transform {
                Some(t) => {
                    x += p[0];
                    y += p[1];
                    t.apply(x, y)
                }
                None => Coord { x: p[0], y: p[1] },
            })
        })
        .collect()
}

fn field<T: serde::de::DeserializeOwned>(value: &Option<Value>, name: &str) -> Result<T> {
    let value = value
        .as_ref()
        .ok_or_else(|| anyhow!("Geometry is missing '{}'", name))?;
    serde_json::from_value(value.clone()).with_context(|| format!("Malformed '{}'", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::coord;

    fn ring_of(geometry: &Geometry<f64>) -> Vec<(f64, f64)> {
        match geometry {
            Geometry::Polygon(p) => p.exterior().coords().map(|c| (c.x, c.y)).collect(),
            other => panic!("expected polygon, got {:?}", other),
        }
    }

    const PLAIN: &str = r#"{
        "type": "Topology",
        "arcs": [
            [[0, 0], [1, 0], [1, 1]],
            [[1, 1], [0, 1], [0, 0]]
        ],
        "objects": {
            "shapes": {
                "type": "GeometryCollection",
                "geometries": [
                    {"type": "Polygon", "id": "01", "arcs": [[0, 1]], "properties": {"name": "forward"}},
                    {"type": "Polygon", "id": 2, "arcs": [[-2, -1]]},
                    {"type": null, "id": "03"}
                ]
            }
        }
    }"#;

    #[test]
    fn stitches_forward_arcs_without_duplicate_junctions() {
        let topology = parse(PLAIN.as_bytes()).unwrap();
        let features = topology.features("shapes").unwrap();
        assert_eq!(features.len(), 3);
        assert_eq!(features[0].id.as_deref(), Some("01"));
        assert_eq!(features[0].properties["name"], "forward");
        assert_eq!(
            ring_of(features[0].geometry.as_ref().unwrap()),
            vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)]
        );
    }

    #[test]
    fn negative_references_walk_arcs_backwards() {
        let topology = parse(PLAIN.as_bytes()).unwrap();
        let features = topology.features("shapes").unwrap();
        assert_eq!(features[1].id.as_deref(), Some("2"));
        assert_eq!(
            ring_of(features[1].geometry.as_ref().unwrap()),
            vec![(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0), (0.0, 0.0)]
        );
    }

    #[test]
    fn null_geometry_yields_feature_without_geometry() {
        let topology = parse(PLAIN.as_bytes()).unwrap();
        let features = topology.features("shapes").unwrap();
        assert_eq!(features[2].id.as_deref(), Some("03"));
        assert!(features[2].geometry.is_none());
    }

    #[test]
    fn quantized_arcs_are_delta_decoded_and_transformed() {
        let doc = r#"{
            "type": "Topology",
            "transform": {"scale": [0.5, 2.0], "translate": [-100.0, 30.0]},
            "arcs": [[[0, 0], [4, 0], [0, 1], [-4, 0], [0, -1]]],
            "objects": {
                "box": {"type": "MultiPolygon", "arcs": [[[0]]]},
                "pin": {"type": "Point", "coordinates": [2, 1]}
            }
        }"#;
        let topology = parse(doc.as_bytes()).unwrap();

        let features = topology.features("box").unwrap();
        assert_eq!(features.len(), 1);
        let mp = match features[0].geometry.as_ref().unwrap() {
            Geometry::MultiPolygon(mp) => mp.clone(),
            other => panic!("expected multipolygon, got {:?}", other),
        };
        let coords: Vec<Coord<f64>> = mp.0[0].exterior().coords().copied().collect();
        assert_eq!(
            coords,
            vec![
                coord! { x: -100.0, y: 30.0 },
                coord! { x: -98.0, y: 30.0 },
                coord! { x: -98.0, y: 32.0 },
                coord! { x: -100.0, y: 32.0 },
                coord! { x: -100.0, y: 30.0 },
            ]
        );

        // Points are transformed but never delta-decoded.
        let pin = topology.features("pin").unwrap();
        assert_eq!(
            pin[0].geometry,
            Some(Geometry::Point(Point::new(-99.0, 32.0)))
        );
    }

    #[test]
    fn short_rings_are_padded() {
        let doc = r#"{
            "type": "Topology",
            "arcs": [[[5, 5], [6, 6]]],
            "objects": {"tiny": {"type": "Polygon", "arcs": [[0]]}}
        }"#;
        let topology = parse(doc.as_bytes()).unwrap();
        let features = topology.features("tiny").unwrap();
        // geo closes the ring, so padding plus closure gives at least four points
        assert!(ring_of(features[0].geometry.as_ref().unwrap()).len() >= 4);
    }

    #[test]
    fn decode_errors_are_reported() {
        let topology = parse(PLAIN.as_bytes()).unwrap();
        assert!(topology.features("missing").is_err());

        let bad_arc = r#"{
            "type": "Topology",
            "arcs": [[[0, 0], [1, 1]]],
            "objects": {"x": {"type": "LineString", "arcs": [7]}}
        }"#;
        let err = parse(bad_arc.as_bytes()).unwrap().features("x").unwrap_err();
        assert!(err.to_string().contains("out of range"));

        assert!(parse(br#"{"type": "FeatureCollection", "features": []}"#).is_err());
    }
}
