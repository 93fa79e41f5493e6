use geo::{MultiPolygon, Point};

/// One state outline, keyed by its FIPS code.
#[derive(Debug, Clone)]
pub struct BoundaryFeature {
    pub fips: u32,
    pub name: &'static str,
    pub geometry: MultiPolygon<f64>,
}

/// Everything the viewer loads at startup. Written once, read thereafter.
#[derive(Debug, Clone)]
pub struct Boundaries {
    pub nation: MultiPolygon<f64>,
    pub states: Vec<BoundaryFeature>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickPoint {
    pub lng: f64,
    pub lat: f64,
}

impl ClickPoint {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// The click plus its copies one world to the east and west.
    pub fn variants(&self) -> [Point<f64>; 3] {
        [
            Point::new(self.lng, self.lat),
            Point::new(self.lng + 360.0, self.lat),
            Point::new(self.lng - 360.0, self.lat),
        ]
    }
}
