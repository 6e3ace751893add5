//! Bounding Volume Hierarchy (BVH) acceleration structure.
//!
//! Built bottom-up with a greedy surface area heuristic: the two unpaired
//! nodes whose union box wastes the least empty space are merged first, until
//! a single root remains. Construction is O(n^3) in the number of bodies,
//! which is fine for the tens to low hundreds of bodies a scene holds
//! (triangle meshes index their own triangles).

use crate::error::{RenderError, Result};
use crate::hittable::{Hittable, RAY_T};
use crate::{Body, BodyId, Intersection, Material, Ray};
use pharos_math::{Aabb, Interval};
use serde::{Deserialize, Serialize};

/// How a query descends when a ray enters both children of a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Traversal {
    /// Explore every child the ray enters and keep the earliest hit.
    #[default]
    Nearest,
    /// Descend only into the child whose box the ray enters first.
    ///
    /// Cheaper, but approximate: when the geometry in that child lies
    /// farther along the ray than geometry in its sibling, the sibling's
    /// (nearer) hit is never found.
    FirstEntered,
}

/// BVH node: a leaf wrapping exactly one body, or a branch with two children.
#[derive(Debug, Clone, PartialEq)]
pub enum BvhNode {
    Leaf {
        body: BodyId,
        bbox: Aabb,
    },
    Branch {
        left: Box<BvhNode>,
        right: Box<BvhNode>,
        bbox: Aabb,
    },
}

static NULL_MATERIAL: Material = Material::Null;

impl BvhNode {
    pub fn bounding_box(&self) -> &Aabb {
        match self {
            BvhNode::Leaf { bbox, .. } | BvhNode::Branch { bbox, .. } => bbox,
        }
    }

    /// The material to shade this node with. Branches, and leaves whose body
    /// is not in `bodies`, carry the null material, which refuses to be shaded.
    pub fn material<'a>(&self, bodies: &'a [Body]) -> &'a Material {
        match self {
            BvhNode::Leaf { body, .. } => bodies.get(body.0).map_or(&NULL_MATERIAL, |b| &b.material),
            BvhNode::Branch { .. } => &NULL_MATERIAL,
        }
    }

    fn leaf_count(&self) -> usize {
        match self {
            BvhNode::Leaf { .. } => 1,
            BvhNode::Branch { left, right, .. } => left.leaf_count() + right.leaf_count(),
        }
    }

    fn branch_count(&self) -> usize {
        match self {
            BvhNode::Leaf { .. } => 0,
            BvhNode::Branch { left, right, .. } => 1 + left.branch_count() + right.branch_count(),
        }
    }

    fn depth(&self) -> usize {
        match self {
            BvhNode::Leaf { .. } => 1,
            BvhNode::Branch { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    fn is_well_formed(&self) -> bool {
        match self {
            BvhNode::Leaf { .. } => true,
            BvhNode::Branch { left, right, bbox } => {
                *bbox == Aabb::surrounding(left.bounding_box(), right.bounding_box())
                    && bbox.encloses(left.bounding_box())
                    && bbox.encloses(right.bounding_box())
                    && left.is_well_formed()
                    && right.is_well_formed()
            }
        }
    }

    /// Earliest hit in this subtree with `t` inside `ray_t`.
    fn nearest(&self, ray: &Ray, ray_t: Interval, bodies: &[Body]) -> Option<Intersection> {
        match self {
            BvhNode::Leaf { body, .. } => bodies
                .get(body.0)?
                .hit(ray, ray_t)
                .map(|hit| Intersection::new(*ray, hit, *body)),
            BvhNode::Branch { left, right, bbox } => {
                if !bbox.hit(&ray.to_math(), ray_t) {
                    return None;
                }
                let hit_left = left.nearest(ray, ray_t, bodies);
                // Only look for something closer on the right
                let right_max = hit_left.map_or(ray_t.max, |hit| hit.time);
                let hit_right = right.nearest(ray, Interval::new(ray_t.min, right_max), bodies);
                Intersection::earliest(hit_left, hit_right)
            }
        }
    }

    /// Single-path descent into whichever child box is entered first.
    fn first_entered(&self, ray: &Ray, bodies: &[Body]) -> Option<Intersection> {
        let math_ray = ray.to_math();
        self.bounding_box().entry_time(&math_ray, RAY_T)?;

        let mut node = self;
        loop {
            match node {
                BvhNode::Leaf { body, .. } => {
                    return bodies
                        .get(body.0)?
                        .hit(ray, RAY_T)
                        .map(|hit| Intersection::new(*ray, hit, *body));
                }
                BvhNode::Branch { left, right, .. } => {
                    let enter_left = left.bounding_box().entry_time(&math_ray, RAY_T);
                    let enter_right = right.bounding_box().entry_time(&math_ray, RAY_T);
                    node = match (enter_left, enter_right) {
                        (None, None) => return None,
                        (Some(_), None) => left,
                        (None, Some(_)) => right,
                        (Some(l), Some(r)) if l <= r => left,
                        (Some(_), Some(_)) => right,
                    };
                }
            }
        }
    }
}

/// The scene's spatial index over its bodies.
#[derive(Debug, Clone, PartialEq)]
pub struct Bvh {
    root: BvhNode,
}

/// Greedy pairing score: how much of the union box's area is real surface.
///
/// Lies in `(0, 2]` for positive areas no larger than their own boxes; equals
/// 2 only when both boxes are the union box. A NaN score (zero-area union)
/// counts as 0.
pub fn pairing_score(area_a: f64, area_b: f64, union: &Aabb) -> f64 {
    let union_area = union.surface_area();
    let score = area_a / union_area + area_b / union_area;
    if score.is_nan() {
        0.0
    } else {
        score
    }
}

/// An unpaired node during construction, with the area it scores with.
struct Candidate {
    node: BvhNode,
    area: f64,
}

impl Candidate {
    fn leaf(id: BodyId, body: &Body) -> Self {
        let bbox = body.bounding_box();
        // Surface area can exceed the box area for folded meshes
        let area = body.surface_area().min(bbox.surface_area());
        Self {
            node: BvhNode::Leaf { body: id, bbox },
            area,
        }
    }

    fn merge(left: Candidate, right: Candidate) -> Self {
        let bbox = Aabb::surrounding(left.node.bounding_box(), right.node.bounding_box());
        Self {
            area: bbox.surface_area(),
            node: BvhNode::Branch {
                left: Box::new(left.node),
                right: Box::new(right.node),
                bbox,
            },
        }
    }
}

impl Bvh {
    /// Build the hierarchy over `bodies`. Leaves refer to bodies by index.
    pub(crate) fn build(bodies: &[Body]) -> Result<Self> {
        if bodies.is_empty() {
            return Err(RenderError::EmptyScene);
        }

        let mut unpaired: Vec<Candidate> = bodies
            .iter()
            .enumerate()
            .map(|(i, body)| Candidate::leaf(BodyId(i), body))
            .collect();

        while unpaired.len() > 1 {
            let (i, j) = best_pair(&unpaired);
            // Remove the higher index first so `i` stays valid
            let right = unpaired.swap_remove(j);
            let left = unpaired.swap_remove(i);
            unpaired.push(Candidate::merge(left, right));
        }

        let root = unpaired
            .pop()
            .map(|candidate| candidate.node)
            .ok_or(RenderError::EmptyScene)?;

        let bvh = Self { root };
        log::debug!(
            "Built BVH: {} leaves, {} branches, depth {}",
            bvh.leaf_count(),
            bvh.branch_count(),
            bvh.depth()
        );
        Ok(bvh)
    }

    pub fn root(&self) -> &BvhNode {
        &self.root
    }

    pub fn bounding_box(&self) -> &Aabb {
        self.root.bounding_box()
    }

    pub fn leaf_count(&self) -> usize {
        self.root.leaf_count()
    }

    pub fn branch_count(&self) -> usize {
        self.root.branch_count()
    }

    pub fn depth(&self) -> usize {
        self.root.depth()
    }

    /// Every branch box is exactly the union of its children's boxes.
    pub fn is_well_formed(&self) -> bool {
        self.root.is_well_formed()
    }

    /// First body the ray hits, if any. `bodies` must be the slice the tree
    /// was built from.
    pub(crate) fn intersect(
        &self,
        ray: &Ray,
        bodies: &[Body],
        traversal: Traversal,
    ) -> Option<Intersection> {
        match traversal {
            Traversal::Nearest => self.root.nearest(ray, RAY_T, bodies),
            Traversal::FirstEntered => self.root.first_entered(ray, bodies),
        }
    }
}

/// Indices `(i, j)` with `i < j` of the highest scoring pair. Ties keep the
/// first pair found; if nothing scores above 0 the first two are paired.
fn best_pair(unpaired: &[Candidate]) -> (usize, usize) {
    let mut best = (0, 1);
    let mut best_score = 0.0;
    for (i, a) in unpaired.iter().enumerate() {
        for (j, b) in unpaired.iter().enumerate().skip(i + 1) {
            let union = Aabb::surrounding(a.node.bounding_box(), b.node.bounding_box());
            let score = pairing_score(a.area, b.area, &union);
            if score > best_score {
                best_score = score;
                best = (i, j);
            }
        }
    }
    best
}
