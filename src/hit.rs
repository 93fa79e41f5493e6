use crate::types::{Boundaries, BoundaryFeature, ClickPoint};
use geo::{BoundingRect, Intersects};
use rstar::{RTree, RTreeObject, AABB};

// Bounding box of one state, pointing back into `Boundaries::states`.
struct StateIndex {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for StateIndex {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

/// Answers "which state is under this click", tolerating world-wrapped maps.
pub struct HitTester {
    boundaries: Boundaries,
    tree: RTree<StateIndex>,
}

impl HitTester {
    pub fn new(boundaries: Boundaries) -> Self {
        let items: Vec<StateIndex> = boundaries
            .states
            .iter()
            .enumerate()
            .filter_map(|(index, state)| {
                let rect = state.geometry.bounding_rect()?;
                Some(StateIndex {
                    index,
                    aabb: AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
                })
            })
            .collect();

        Self {
            boundaries,
            tree: RTree::bulk_load(items),
        }
    }

    pub fn boundaries(&self) -> &Boundaries {
        &self.boundaries
    }

    /// True when any world copy of the click lies in the national outline.
    /// Points on the outline count as inside.
    pub fn in_nation(&self, click: ClickPoint) -> bool {
        click
            .variants()
            .iter()
            .any(|p| self.boundaries.nation.intersects(p))
    }

    /// First state, in dataset order, containing any world copy of the click.
    /// Clicks outside the nation never match.
    pub fn locate(&self, click: ClickPoint) -> Option<&BoundaryFeature> {
        if !self.in_nation(click) {
            return None;
        }

        let variants = click.variants();
        let mut candidates: Vec<usize> = variants
            .iter()
            .flat_map(|p| {
                let envelope = AABB::from_point([p.x(), p.y()]);
                self.tree
                    .locate_in_envelope_intersecting(&envelope)
                    .map(|c| c.index)
                    .collect::<Vec<_>>()
            })
            .collect();
        candidates.sort_unstable();
        candidates.dedup();

        candidates
            .into_iter()
            .filter_map(|i| self.boundaries.states.get(i))
            .find(|state| variants.iter().any(|p| state.geometry.intersects(p)))
    }
}
