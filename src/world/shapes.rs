//! Registry of the collision shapes created for the current scene

use rapier3d::prelude::SharedShape;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

static NEXT_REGISTRY: AtomicU32 = AtomicU32::new(1);

/// Handle to a shape owned by a [`ShapeRegistry`]
///
/// Ids carry the registry they came from, so an id kept across a rebuild
/// never resolves to a shape of the new scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShapeId {
    registry: u32,
    index: usize,
}

pub struct ShapeRegistry {
    id: u32,
    shapes: Vec<SharedShape>,
}

impl ShapeRegistry {
    pub fn new() -> Self {
        Self {
            id: NEXT_REGISTRY.fetch_add(1, Ordering::Relaxed),
            shapes: Vec::new(),
        }
    }

    pub fn register(&mut self, shape: SharedShape) -> ShapeId {
        self.shapes.push(shape);
        ShapeId { registry: self.id, index: self.shapes.len() - 1 }
    }

    pub fn get(&self, id: ShapeId) -> Option<&SharedShape> {
        if id.registry != self.id {
            return None;
        }
        self.shapes.get(id.index)
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Number of colliders (or other holders) still sharing the shape
    pub fn references(&self, id: ShapeId) -> usize {
        self.get(id)
            .map(|shape| Arc::strong_count(&shape.0) - 1)
            .unwrap_or(0)
    }

    /// Destroy every shape, newest first.
    ///
    /// Returns the number of shapes destroyed and how many of them were still
    /// referenced by a collider at the time.
    pub fn clear(&mut self) -> (usize, usize) {
        let mut destroyed = 0;
        let mut still_referenced = 0;
        while let Some(shape) = self.shapes.pop() {
            if Arc::strong_count(&shape.0) > 1 {
                still_referenced += 1;
            }
            destroyed += 1;
        }
        (destroyed, still_referenced)
    }
}

impl Default for ShapeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
