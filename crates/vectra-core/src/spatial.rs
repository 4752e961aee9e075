use crate::farm::Farm;
use rstar::{PointDistance, RTree, RTreeObject, AABB};

/// Farm index + position stored in the R*-tree. The tree is built once at
/// state construction; farm topology never changes afterwards.
#[derive(Clone, Debug)]
pub struct FarmLocation {
    pub index: usize,
    pub position: [f64; 2],
}

impl RTreeObject for FarmLocation {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

impl PointDistance for FarmLocation {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.position[0] - point[0];
        let dy = self.position[1] - point[1];
        dx * dx + dy * dy
    }
}

/// Build an R*-tree over farm positions via bulk_load (O(n log n)).
pub fn build_index(farms: &[Farm]) -> RTree<FarmLocation> {
    RTree::bulk_load(
        farms
            .iter()
            .enumerate()
            .map(|(index, farm)| FarmLocation {
                index,
                position: farm.position,
            })
            .collect(),
    )
}

/// Indices of farms within `radius` of `center`, sorted ascending.
/// Uses an AABB envelope query then filters by squared Euclidean distance;
/// sorting keeps cached neighbour lists deterministic.
pub fn farms_within(tree: &RTree<FarmLocation>, center: [f64; 2], radius: f64) -> Vec<usize> {
    let envelope = AABB::from_corners(
        [center[0] - radius, center[1] - radius],
        [center[0] + radius, center[1] + radius],
    );
    let r_sq = radius * radius;

    let mut hits: Vec<usize> = tree
        .locate_in_envelope(&envelope)
        .filter(|location| {
            let dx = location.position[0] - center[0];
            let dy = location.position[1] - center[1];
            dx * dx + dy * dy <= r_sq
        })
        .map(|location| location.index)
        .collect();
    hits.sort_unstable();
    hits
}
