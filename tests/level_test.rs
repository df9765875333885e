use glam::Vec3;
use physbox::config::{LevelSettings, WorldSettings};
use physbox::level::{BspConverter, BspFile, BspLevel, LevelSource, RegionList};
use physbox::sandbox::populate_level;
use physbox::world::PhysicsWorld;

const LUMP_COUNT: usize = 17;

/// Builds a minimal BSP: one solid cube brush referenced twice from a single
/// leaf, and a non-solid trigger brush owned by a `trigger_push` entity.
fn synthetic_bsp() -> Vec<u8> {
    let mut lumps: Vec<Vec<u8>> = vec![Vec::new(); LUMP_COUNT];

    lumps[0] = br#"{
"classname" "worldspawn"
}
{
"classname" "trigger_push"
"target" "launch_target"
"model" "*1"
}
{
"classname" "target_position"
"targetname" "launch_target"
"origin" "100 0 50"
}
"#
    .to_vec();

    for (name, contents) in [("textures/base/wall", 1i32), ("textures/common/trigger", 0)] {
        let mut shader = [0u8; 64];
        shader[..name.len()].copy_from_slice(name.as_bytes());
        lumps[1].extend_from_slice(&shader);
        lumps[1].extend_from_slice(&0i32.to_le_bytes());
        lumps[1].extend_from_slice(&contents.to_le_bytes());
    }

    // Cube of half size 16 around the origin
    for normal in [Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y, Vec3::Z, Vec3::NEG_Z] {
        for v in [normal.x, normal.y, normal.z, 16.0] {
            lumps[2].extend_from_slice(&v.to_le_bytes());
        }
    }

    // One leaf listing brush 0 twice
    let mut leaf = vec![0u8; 40];
    leaf.extend_from_slice(&0i32.to_le_bytes());
    leaf.extend_from_slice(&2i32.to_le_bytes());
    lumps[4] = leaf;
    for brush in [0i32, 0] {
        lumps[6].extend_from_slice(&brush.to_le_bytes());
    }

    // Model 0 is the world, model 1 the trigger
    for (first, count) in [(0i32, 1i32), (1, 1)] {
        lumps[7].extend_from_slice(&[0u8; 32]);
        lumps[7].extend_from_slice(&first.to_le_bytes());
        lumps[7].extend_from_slice(&count.to_le_bytes());
    }

    for shader in [0i32, 1] {
        for v in [0i32, 6, shader] {
            lumps[8].extend_from_slice(&v.to_le_bytes());
        }
    }

    for plane in 0..6i32 {
        lumps[9].extend_from_slice(&plane.to_le_bytes());
        lumps[9].extend_from_slice(&0i32.to_le_bytes());
    }

    let mut data = Vec::new();
    data.extend_from_slice(b"IBSP");
    data.extend_from_slice(&46i32.to_le_bytes());
    let mut offset = 8 + LUMP_COUNT * 8;
    for lump in &lumps {
        data.extend_from_slice(&(offset as i32).to_le_bytes());
        data.extend_from_slice(&(lump.len() as i32).to_le_bytes());
        offset += lump.len();
    }
    for lump in &lumps {
        data.extend_from_slice(lump);
    }
    data
}

fn temp_file(name: &str, data: &[u8]) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(format!("physbox-{}-{}", std::process::id(), name));
    std::fs::write(&path, data).unwrap();
    path
}

#[test]
fn test_parse_synthetic_bsp() {
    let bsp = BspFile::parse(&synthetic_bsp()).unwrap();
    assert_eq!(bsp.entities.len(), 3);
    assert_eq!(bsp.shaders[0].name, "textures/base/wall");
    assert_eq!(bsp.shaders[0].contents, 1);
    assert_eq!(bsp.planes.len(), 6);
    assert_eq!(bsp.leaves.len(), 1);
    assert_eq!(bsp.leaves[0].num_leaf_brushes, 2);
    assert_eq!(bsp.models.len(), 2);
    assert_eq!(bsp.brushes.len(), 2);
    assert_eq!(bsp.brush_sides.len(), 6);
}

#[test]
fn test_convert_solid_brush_once() {
    let bsp = BspFile::parse(&synthetic_bsp()).unwrap();
    let mut regions = RegionList::new();
    let count = BspConverter::new(0.1).convert(&bsp, &mut regions).unwrap();

    assert_eq!(count, 2);
    let world_brush = &regions.regions[0];
    assert!(!world_brush.is_entity);
    assert_eq!(world_brush.vertices.len(), 8);
    for v in &world_brush.vertices {
        assert!(v.abs().abs_diff_eq(Vec3::splat(1.6), 1e-4));
    }

    let trigger = &regions.regions[1];
    assert!(trigger.is_entity);
    assert!(trigger.entity_target.abs_diff_eq(Vec3::new(10.0, 0.0, 5.0), 1e-4));
}

#[test]
fn test_bsp_level_populates_world() {
    let path = temp_file("level.bsp", &synthetic_bsp());
    let level = BspLevel::new(&path, 0.1);
    let mut world = PhysicsWorld::build(&WorldSettings::default());

    let created = populate_level(&mut world, &LevelSettings::default(), &level);
    assert_eq!(created, 2);
    assert_eq!(world.body_count(), 2);
    assert_eq!(world.shape_count(), 2);
    for handle in world.body_handles() {
        assert!(!world.is_dynamic(*handle));
    }
    std::fs::remove_file(path).unwrap();
}

#[test]
fn test_truncated_level_adds_nothing() {
    let data = synthetic_bsp();
    let path = temp_file("truncated.bsp", &data[..data.len() - 10]);
    let level = BspLevel::new(&path, 0.1);
    let mut world = PhysicsWorld::build(&WorldSettings::default());

    assert!(level.load(&mut RegionList::new()).is_err());
    assert_eq!(populate_level(&mut world, &LevelSettings::default(), &level), 0);
    assert_eq!(world.body_count(), 0);
    std::fs::remove_file(path).unwrap();
}

#[test]
fn test_missing_level_file() {
    let level = BspLevel::new("does/not/exist.bsp", 0.1);
    let mut world = PhysicsWorld::build(&WorldSettings::default());
    assert_eq!(populate_level(&mut world, &LevelSettings::default(), &level), 0);
    assert!(world.is_live());
}
