//! Level geometry sources
//!
//! A level is delivered as a series of convex regions, each a cloud of
//! vertices. Sources push regions into a [`ConvexRegionSink`] supplied by the
//! caller and never touch the physics world themselves.

pub mod bsp;
pub mod convert;

pub use bsp::{BspEntity, BspFile};
pub use convert::{vertices_from_planes, BspConverter};

use glam::Vec3;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File too short for a BSP header ({len} bytes)")]
    TruncatedHeader { len: usize },

    #[error("Not a BSP file (magic {found:?})")]
    BadMagic { found: [u8; 4] },

    #[error("Unsupported BSP version {0}")]
    BadVersion(i32),

    #[error("Lump {lump} is truncated or out of range")]
    TruncatedLump { lump: usize },

    #[error("{what} index {index} out of range")]
    IndexOutOfRange { what: &'static str, index: i64 },
}

pub type LevelResult<T> = Result<T, LevelError>;

/// Receives convex regions as a level is converted
pub trait ConvexRegionSink {
    /// `entity_target` is the placement vector of the entity's target and is
    /// zero for plain world brushes.
    fn add_convex_vertices(&mut self, vertices: &[Vec3], is_entity: bool, entity_target: Vec3);
}

pub trait LevelSource {
    fn describe(&self) -> String;

    /// Push every region of the level into `sink`, returning how many were sent
    fn load(&self, sink: &mut dyn ConvexRegionSink) -> LevelResult<usize>;
}

/// Level read from a Quake 3 BSP file on disk
pub struct BspLevel {
    path: PathBuf,
    scaling: f32,
}

impl BspLevel {
    pub fn new(path: impl AsRef<Path>, scaling: f32) -> Self {
        Self { path: path.as_ref().to_path_buf(), scaling }
    }
}

impl LevelSource for BspLevel {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self, sink: &mut dyn ConvexRegionSink) -> LevelResult<usize> {
        let data = fs::read(&self.path)?;
        info!("Loading BSP level {} ({} bytes)", self.path.display(), data.len());
        let bsp = BspFile::parse(&data)?;
        BspConverter::new(self.scaling).convert(&bsp, sink)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConvexRegion {
    pub vertices: Vec<Vec3>,
    pub is_entity: bool,
    pub entity_target: Vec3,
}

/// In-memory level, also usable as a buffering sink
#[derive(Debug, Clone, Default)]
pub struct RegionList {
    pub regions: Vec<ConvexRegion>,
}

impl RegionList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_region(mut self, vertices: Vec<Vec3>) -> Self {
        self.regions.push(ConvexRegion { vertices, is_entity: false, entity_target: Vec3::ZERO });
        self
    }
}

impl ConvexRegionSink for RegionList {
    fn add_convex_vertices(&mut self, vertices: &[Vec3], is_entity: bool, entity_target: Vec3) {
        self.regions.push(ConvexRegion {
            vertices: vertices.to_vec(),
            is_entity,
            entity_target,
        });
    }
}

impl LevelSource for RegionList {
    fn describe(&self) -> String {
        format!("{} in-memory region(s)", self.regions.len())
    }

    fn load(&self, sink: &mut dyn ConvexRegionSink) -> LevelResult<usize> {
        for region in &self.regions {
            sink.add_convex_vertices(&region.vertices, region.is_entity, region.entity_target);
        }
        Ok(self.regions.len())
    }
}
