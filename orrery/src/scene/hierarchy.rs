//! Orbital transform hierarchy.
//!
//! Bodies are stored as a flat pre-order list where each entry carries its
//! nesting depth. Evaluation walks the list once with an explicit matrix stack:
//! the stack is cut back to the entry's depth, the top of the stack is the
//! parent's world matrix, and the entry's own world matrix is pushed for its
//! children. Parents are therefore always finished before any child reads them,
//! and no state survives between evaluations.

use glam::{Mat4, Vec3};
use orrery_types::BodyId;
use rand::Rng;
use smallvec::SmallVec;
use thiserror::Error;

use crate::scene::BodyDesc;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HierarchyError {
    #[error("Hierarchy has no bodies")]
    Empty,
    #[error("Body {id} at position {index} has depth {depth} but the deepest possible parent is at depth {max}")]
    InvalidDepth {
        id: BodyId,
        index: usize,
        depth: usize,
        max: usize,
    },
    #[error("Body {id} appears more than once")]
    DuplicateBody { id: BodyId },
}

/// A body and where it is this frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BodyTransform {
    pub id: BodyId,
    pub world: Mat4,
}

impl BodyTransform {
    pub fn position(&self) -> Vec3 {
        self.world.w_axis.truncate()
    }
}

#[derive(Debug, Clone)]
pub struct Hierarchy {
    root: Mat4,
    bodies: Vec<BodyDesc>,
}

impl Hierarchy {
    /// Validates the pre-order list. `root` is the session-constant system transform
    /// every depth zero body is parented to.
    pub fn new(root: Mat4, bodies: Vec<BodyDesc>) -> Result<Self, HierarchyError> {
        if bodies.is_empty() {
            return Err(HierarchyError::Empty);
        }

        let mut max = 0;
        for (index, body) in bodies.iter().enumerate() {
            if body.depth > max {
                return Err(HierarchyError::InvalidDepth {
                    id: body.id,
                    index,
                    depth: body.depth,
                    max,
                });
            }
            max = body.depth + 1;

            if bodies[..index].iter().any(|b| b.id == body.id) {
                return Err(HierarchyError::DuplicateBody { id: body.id });
            }
        }

        Ok(Self { root, bodies })
    }

    pub fn root(&self) -> Mat4 {
        self.root
    }

    pub fn bodies(&self) -> &[BodyDesc] {
        &self.bodies
    }

    pub fn get(&self, id: BodyId) -> Option<&BodyDesc> {
        self.bodies.iter().find(|b| b.id == id)
    }

    /// The closest preceding body one level shallower, if any.
    pub fn parent_of(&self, id: BodyId) -> Option<BodyId> {
        let index = self.bodies.iter().position(|b| b.id == id)?;
        let depth = self.bodies[index].depth.checked_sub(1)?;
        self.bodies[..index].iter().rev().find(|b| b.depth == depth).map(|b| b.id)
    }

    /// World matrices of every body at elapsed time `t`, in list order.
    pub fn evaluate(&self, t: f32) -> Vec<BodyTransform> {
        let mut out = Vec::with_capacity(self.bodies.len());
        self.evaluate_into(t, &mut out);
        out
    }

    /// Same as [`Hierarchy::evaluate`] but reuses `out`'s allocation.
    pub fn evaluate_into(&self, t: f32, out: &mut Vec<BodyTransform>) {
        profiling::scope!("Hierarchy::evaluate");

        out.clear();

        let mut stack = SmallVec::<[Mat4; 8]>::new();
        stack.push(self.root);

        for body in &self.bodies {
            // stack[0] is the root, stack[n] the world matrix of the open ancestor at depth n - 1.
            stack.truncate(body.depth + 1);
            let parent = stack[body.depth];
            let world = parent * body.orbit.local_matrix(t);
            stack.push(world);

            out.push(BodyTransform { id: body.id, world });
        }
    }
}

/// Random rotation of the whole system about a random axis, at most `max_degrees`,
/// then an offset of up to `max_offset` in each axis.
pub fn random_tilt(rng: &mut impl Rng, max_degrees: f32, max_offset: f32) -> Mat4 {
    let max_degrees = max_degrees.abs();
    let max_offset = max_offset.abs();
    let axis = loop {
        let candidate = Vec3::new(
            rng.gen_range(-1.0..=1.0),
            rng.gen_range(-1.0..=1.0),
            rng.gen_range(-1.0..=1.0),
        );
        let length = candidate.length();
        if length > 1.0e-3 && length <= 1.0 {
            break candidate / length;
        }
    };
    let angle = rng.gen_range(-max_degrees..=max_degrees).to_radians();
    let offset = Vec3::new(
        rng.gen_range(-max_offset..=max_offset),
        rng.gen_range(-max_offset..=max_offset),
        rng.gen_range(-max_offset..=max_offset),
    );

    Mat4::from_translation(offset) * Mat4::from_axis_angle(axis, angle)
}
