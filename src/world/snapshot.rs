//! Binary dump of the world's object graph

use super::physics::PhysicsWorld;
use super::{WorldError, WorldResult};
use bincode::Options;
use rapier3d::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::info;

const SNAPSHOT_FORMAT: u32 = 1;

#[derive(Serialize)]
struct WorldSnapshot<'a> {
    format: u32,
    gravity: &'a Vector<Real>,
    bodies: &'a RigidBodySet,
    colliders: &'a ColliderSet,
    impulse_joints: &'a ImpulseJointSet,
}

/// Encode the world into at most `max_bytes` bytes
pub fn serialize_world(world: &PhysicsWorld, max_bytes: usize) -> WorldResult<Vec<u8>> {
    let (gravity, bodies, colliders, impulse_joints) = world.object_graph();
    let snapshot = WorldSnapshot {
        format: SNAPSHOT_FORMAT,
        gravity,
        bodies,
        colliders,
        impulse_joints,
    };

    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_limit(max_bytes as u64)
        .serialize(&snapshot)
        .map_err(|e| match *e {
            bincode::ErrorKind::SizeLimit => WorldError::SnapshotOverflow { limit: max_bytes },
            other => WorldError::SnapshotEncode { reason: other.to_string() },
        })
}

/// Serialize the world and write it to `path`. Nothing is written when the
/// encoded world does not fit in `max_bytes`.
pub fn write_snapshot(world: &PhysicsWorld, path: &Path, max_bytes: usize) -> WorldResult<usize> {
    let bytes = serialize_world(world, max_bytes)?;
    fs::write(path, &bytes)?;
    info!("Wrote {} byte world snapshot to {}", bytes.len(), path.display());
    Ok(bytes.len())
}
