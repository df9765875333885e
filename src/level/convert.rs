//! Turns BSP brushes into convex vertex clouds

use super::bsp::{BspBrush, BspFile, CONTENTS_SOLID};
use super::{ConvexRegionSink, LevelError, LevelResult};
use glam::{Vec3, Vec4};
use std::collections::HashSet;
use tracing::{debug, warn};

const CROSS_EPSILON: f32 = 1e-4;
const QUOTIENT_EPSILON: f32 = 1e-6;
const INSIDE_MARGIN: f32 = 0.01;

/// Plane equations are stored as `(normal, d)` with `normal . p + d = 0` on the plane
pub fn vertices_from_planes(planes: &[Vec4]) -> Vec<Vec3> {
    let mut vertices = Vec::new();
    for (i, n1) in planes.iter().enumerate() {
        for (j, n2) in planes.iter().enumerate().skip(i + 1) {
            for n3 in planes.iter().skip(j + 1) {
                let (a, b, c) = (n1.truncate(), n2.truncate(), n3.truncate());
                let n2n3 = b.cross(c);
                let n3n1 = c.cross(a);
                let n1n2 = a.cross(b);
                if n2n3.length_squared() <= CROSS_EPSILON
                    || n3n1.length_squared() <= CROSS_EPSILON
                    || n1n2.length_squared() <= CROSS_EPSILON
                {
                    continue;
                }

                let quotient = a.dot(n2n3);
                if quotient.abs() <= QUOTIENT_EPSILON {
                    continue;
                }
                let quotient = -1.0 / quotient;
                let vertex = (n2n3 * n1.w + n3n1 * n2.w + n1n2 * n3.w) * quotient;
                if is_inside_planes(planes, vertex, INSIDE_MARGIN) {
                    vertices.push(vertex);
                }
            }
        }
    }
    vertices
}

fn is_inside_planes(planes: &[Vec4], point: Vec3, margin: f32) -> bool {
    planes.iter().all(|plane| plane.truncate().dot(point) + plane.w - margin <= 0.0)
}

pub struct BspConverter {
    scaling: f32,
}

impl BspConverter {
    pub fn new(scaling: f32) -> Self {
        Self { scaling }
    }

    /// Feed every solid brush and every `trigger_push` entity brush to `sink`.
    /// Returns the number of regions emitted.
    pub fn convert(&self, bsp: &BspFile, sink: &mut dyn ConvexRegionSink) -> LevelResult<usize> {
        let mut regions = 0;
        let mut converted = HashSet::new();

        for leaf in &bsp.leaves {
            for slot in range(leaf.first_leaf_brush, leaf.num_leaf_brushes) {
                let brush_index = *lookup(&bsp.leaf_brushes, slot, "leaf brush")?;
                let brush = lookup(&bsp.brushes, brush_index as i64, "brush")?;
                if brush.shader < 0 || converted.contains(&brush_index) {
                    continue;
                }
                let shader = lookup(&bsp.shaders, brush.shader as i64, "shader")?;
                if shader.contents & CONTENTS_SOLID == 0 {
                    continue;
                }
                converted.insert(brush_index);

                let vertices = vertices_from_planes(&self.brush_planes(bsp, brush)?);
                sink.add_convex_vertices(&vertices, false, Vec3::ZERO);
                regions += 1;
            }
        }

        for entity in &bsp.entities {
            if entity.get("classname") != Some("trigger_push") {
                continue;
            }
            let target = entity
                .get("target")
                .and_then(|name| bsp.find_entity("targetname", name))
                .and_then(|target| target.vector("origin"))
                .map(|origin| origin * self.scaling)
                .unwrap_or(Vec3::ZERO);

            let Some(model_index) = entity
                .get("model")
                .and_then(|model| model.strip_prefix('*'))
                .and_then(|index| index.parse::<usize>().ok())
            else {
                warn!("trigger_push without a brush model, skipping");
                continue;
            };
            let Some(model) = bsp.models.get(model_index) else {
                warn!("trigger_push references missing model *{}", model_index);
                continue;
            };

            for brush_index in range(model.first_brush, model.num_brushes) {
                let brush = lookup(&bsp.brushes, brush_index, "brush")?;
                let vertices = vertices_from_planes(&self.brush_planes(bsp, brush)?);
                sink.add_convex_vertices(&vertices, true, target);
                regions += 1;
            }
        }

        debug!("Converted {} convex regions", regions);
        Ok(regions)
    }

    fn brush_planes(&self, bsp: &BspFile, brush: &BspBrush) -> LevelResult<Vec<Vec4>> {
        range(brush.first_side, brush.num_sides)
            .map(|side_index| {
                let side = lookup(&bsp.brush_sides, side_index, "brush side")?;
                let plane = lookup(&bsp.planes, side.plane as i64, "plane")?;
                Ok(plane.normal.extend(-plane.dist * self.scaling))
            })
            .collect()
    }
}

fn range(first: i32, count: i32) -> impl Iterator<Item = i64> {
    let first = first as i64;
    first..first + count.max(0) as i64
}

fn lookup<'a, T>(items: &'a [T], index: i64, what: &'static str) -> LevelResult<&'a T> {
    usize::try_from(index)
        .ok()
        .and_then(|i| items.get(i))
        .ok_or(LevelError::IndexOutOfRange { what, index })
}
