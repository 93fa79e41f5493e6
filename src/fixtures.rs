// Small boundary documents shared by the unit tests.

// Colorado and Puerto Rico boxes plus a straddling Alaska, all as TopoJSON;
// a line feature for California that must be dropped.
pub const STATES: &str = r#"{
    "type": "Topology",
    "arcs": [
        [[-109, 37], [-102, 37], [-102, 41], [-109, 41], [-109, 37]],
        [[-67, 18], [-65, 18], [-65, 18.5], [-67, 18.5], [-67, 18]],
        [[172, 51], [179, 51], [179, 53], [172, 53], [172, 51]],
        [[-170, 55], [-141, 55], [-141, 70], [-170, 70], [-170, 55]],
        [[-124, 40], [-120, 35]]
    ],
    "objects": {
        "states": {
            "type": "GeometryCollection",
            "geometries": [
                {"type": "Polygon", "id": "08", "arcs": [[0]]},
                {"type": "Polygon", "id": "72", "arcs": [[1]]},
                {"type": "MultiPolygon", "id": "02", "arcs": [[[2]], [[3]]]},
                {"type": "LineString", "id": "06", "arcs": [4]}
            ]
        }
    }
}"#;

pub const NATION: &str = r#"{
    "type": "FeatureCollection",
    "features": [{
        "type": "Feature",
        "properties": {},
        "geometry": {
            "type": "MultiPolygon",
            "coordinates": [
                [[[-125, 24], [-66, 24], [-66, 50], [-125, 50], [-125, 24]]],
                [[[-170, 50], [-140, 50], [-140, 72], [-170, 72], [-170, 50]]],
                [[[170, 50], [180, 50], [180, 55], [170, 55], [170, 50]]]
            ]
        }
    }]
}"#;
