use crate::types::BoundaryFeature;
use geo::{Coord, MapCoordsInPlace};
use rayon::prelude::*;
use tracing::debug;

/// Moves every eastern-hemisphere vertex of the listed regions one world to the
/// west, so a region straddling 180° is drawn as one contiguous shape.
pub fn shift_west(features: &mut [BoundaryFeature], region_ids: &[u32]) {
    features
        .par_iter_mut()
        .filter(|f| region_ids.contains(&f.fips))
        .for_each(|feature| {
            debug!("Shifting {} (FIPS {}) across the antimeridian", feature.name, feature.fips);
            feature.geometry.map_coords_in_place(|c: Coord<f64>| {
                if c.x > 0.0 {
                    Coord { x: c.x - 360.0, y: c.y }
                } else {
                    c
                }
            });
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, CoordsIter, MultiPolygon};

    fn aleutians() -> BoundaryFeature {
        // One island on each side of the date line.
        let east = polygon![
            (x: 172.0, y: 52.0), (x: 179.5, y: 52.0), (x: 179.5, y: 53.0), (x: 172.0, y: 53.0),
        ];
        let west = polygon![
            (x: -179.0, y: 51.0), (x: -160.0, y: 51.0), (x: -160.0, y: 60.0), (x: -179.0, y: 60.0),
        ];
        BoundaryFeature { fips: 2, name: "Alaska", geometry: MultiPolygon::new(vec![east, west]) }
    }

    #[test]
    fn positive_longitudes_become_non_positive() {
        let original = aleutians();
        let mut features = vec![original.clone()];
        shift_west(&mut features, &[2]);

        let before: Vec<_> = original.geometry.coords_iter().collect();
        let after: Vec<_> = features[0].geometry.coords_iter().collect();
        assert_eq!(before.len(), after.len());
        for (b, a) in before.iter().zip(&after) {
            assert!(a.x <= 0.0, "{:?} still east of the date line", a);
            if b.x > 0.0 {
                assert_eq!(a.x, b.x - 360.0);
            } else {
                assert_eq!(a.x, b.x);
            }
            assert_eq!(a.y, b.y);
        }
    }

    #[test]
    fn other_regions_are_untouched() {
        let mut guam_like = aleutians();
        guam_like.fips = 66;
        let mut features = vec![guam_like.clone()];
        shift_west(&mut features, &[2]);
        assert_eq!(features[0].geometry, guam_like.geometry);
    }
}
