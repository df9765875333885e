//! Quake 3 BSP reader, limited to the lumps needed for collision geometry

use super::{LevelError, LevelResult};
use byteorder::{LittleEndian, ReadBytesExt};
use glam::Vec3;
use std::io::{self, Cursor, Read};
use tracing::debug;

pub const BSP_MAGIC: &[u8; 4] = b"IBSP";
pub const BSP_VERSION: i32 = 46;
pub const CONTENTS_SOLID: i32 = 1;

const LUMP_COUNT: usize = 17;
const HEADER_SIZE: usize = 8 + LUMP_COUNT * 8;

pub mod lump {
    pub const ENTITIES: usize = 0;
    pub const SHADERS: usize = 1;
    pub const PLANES: usize = 2;
    pub const LEAVES: usize = 4;
    pub const LEAF_BRUSHES: usize = 6;
    pub const MODELS: usize = 7;
    pub const BRUSHES: usize = 8;
    pub const BRUSH_SIDES: usize = 9;
}

const SHADER_SIZE: usize = 72;
const PLANE_SIZE: usize = 16;
const LEAF_SIZE: usize = 48;
const LEAF_BRUSH_SIZE: usize = 4;
const MODEL_SIZE: usize = 40;
const BRUSH_SIZE: usize = 12;
const BRUSH_SIDE_SIZE: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct BspShader {
    pub name: String,
    pub flags: i32,
    pub contents: i32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BspPlane {
    pub normal: Vec3,
    pub dist: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BspLeaf {
    pub cluster: i32,
    pub area: i32,
    pub first_leaf_brush: i32,
    pub num_leaf_brushes: i32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BspModel {
    pub mins: Vec3,
    pub maxs: Vec3,
    pub first_brush: i32,
    pub num_brushes: i32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BspBrush {
    pub first_side: i32,
    pub num_sides: i32,
    pub shader: i32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BspBrushSide {
    pub plane: i32,
    pub shader: i32,
}

/// Key/value block from the entity lump
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BspEntity {
    pub properties: Vec<(String, String)>,
}

impl BspEntity {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Parse a whitespace-separated `"x y z"` value
    pub fn vector(&self, key: &str) -> Option<Vec3> {
        let mut parts = self.get(key)?.split_whitespace().map(|p| p.parse::<f32>());
        let x = parts.next()?.ok()?;
        let y = parts.next()?.ok()?;
        let z = parts.next()?.ok()?;
        Some(Vec3::new(x, y, z))
    }
}

#[derive(Debug, Clone, Default)]
pub struct BspFile {
    pub entities: Vec<BspEntity>,
    pub shaders: Vec<BspShader>,
    pub planes: Vec<BspPlane>,
    pub leaves: Vec<BspLeaf>,
    pub leaf_brushes: Vec<i32>,
    pub models: Vec<BspModel>,
    pub brushes: Vec<BspBrush>,
    pub brush_sides: Vec<BspBrushSide>,
}

impl BspFile {
    pub fn parse(data: &[u8]) -> LevelResult<Self> {
        if data.len() < HEADER_SIZE {
            return Err(LevelError::TruncatedHeader { len: data.len() });
        }
        let mut reader = Cursor::new(data);
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != BSP_MAGIC {
            return Err(LevelError::BadMagic { found: magic });
        }
        let version = reader.read_i32::<LittleEndian>()?;
        if version != BSP_VERSION {
            return Err(LevelError::BadVersion(version));
        }

        let mut directory = [(0usize, 0usize); LUMP_COUNT];
        for entry in directory.iter_mut() {
            let offset = reader.read_i32::<LittleEndian>()?;
            let length = reader.read_i32::<LittleEndian>()?;
            *entry = (offset.max(0) as usize, length.max(0) as usize);
        }
        let lump_bytes = |index: usize| lump_slice(data, &directory, index);

        let file = BspFile {
            entities: parse_entities(&String::from_utf8_lossy(lump_bytes(lump::ENTITIES)?)),
            shaders: read_records(lump_bytes(lump::SHADERS)?, SHADER_SIZE, lump::SHADERS, read_shader)?,
            planes: read_records(lump_bytes(lump::PLANES)?, PLANE_SIZE, lump::PLANES, read_plane)?,
            leaves: read_records(lump_bytes(lump::LEAVES)?, LEAF_SIZE, lump::LEAVES, read_leaf)?,
            leaf_brushes: read_records(lump_bytes(lump::LEAF_BRUSHES)?, LEAF_BRUSH_SIZE, lump::LEAF_BRUSHES, |r| {
                r.read_i32::<LittleEndian>()
            })?,
            models: read_records(lump_bytes(lump::MODELS)?, MODEL_SIZE, lump::MODELS, read_model)?,
            brushes: read_records(lump_bytes(lump::BRUSHES)?, BRUSH_SIZE, lump::BRUSHES, read_brush)?,
            brush_sides: read_records(lump_bytes(lump::BRUSH_SIDES)?, BRUSH_SIDE_SIZE, lump::BRUSH_SIDES, |r| {
                Ok(BspBrushSide {
                    plane: r.read_i32::<LittleEndian>()?,
                    shader: r.read_i32::<LittleEndian>()?,
                })
            })?,
        };

        debug!(
            "Parsed BSP: {} entities, {} shaders, {} planes, {} leaves, {} brushes, {} models",
            file.entities.len(), file.shaders.len(), file.planes.len(),
            file.leaves.len(), file.brushes.len(), file.models.len()
        );
        Ok(file)
    }

    /// First entity whose `key` equals `value`
    pub fn find_entity(&self, key: &str, value: &str) -> Option<&BspEntity> {
        self.entities.iter().find(|e| e.get(key) == Some(value))
    }
}

fn lump_slice<'a>(data: &'a [u8], directory: &[(usize, usize); LUMP_COUNT], index: usize) -> LevelResult<&'a [u8]> {
    let (offset, length) = directory[index];
    data.get(offset..offset.saturating_add(length))
        .ok_or(LevelError::TruncatedLump { lump: index })
}

fn read_records<T>(
    bytes: &[u8],
    size: usize,
    lump: usize,
    read: fn(&mut Cursor<&[u8]>) -> io::Result<T>,
) -> LevelResult<Vec<T>> {
    if bytes.len() % size != 0 {
        return Err(LevelError::TruncatedLump { lump });
    }
    let mut reader = Cursor::new(bytes);
    let mut records = Vec::with_capacity(bytes.len() / size);
    for _ in 0..bytes.len() / size {
        let start = reader.position();
        records.push(read(&mut reader).map_err(|_| LevelError::TruncatedLump { lump })?);
        reader.set_position(start + size as u64);
    }
    Ok(records)
}

fn read_vec3(reader: &mut Cursor<&[u8]>) -> io::Result<Vec3> {
    Ok(Vec3::new(
        reader.read_f32::<LittleEndian>()?,
        reader.read_f32::<LittleEndian>()?,
        reader.read_f32::<LittleEndian>()?,
    ))
}

fn read_shader(reader: &mut Cursor<&[u8]>) -> io::Result<BspShader> {
    let mut name = [0u8; 64];
    reader.read_exact(&mut name)?;
    let end = name.iter().position(|b| *b == 0).unwrap_or(name.len());
    Ok(BspShader {
        name: String::from_utf8_lossy(&name[..end]).into_owned(),
        flags: reader.read_i32::<LittleEndian>()?,
        contents: reader.read_i32::<LittleEndian>()?,
    })
}

fn read_plane(reader: &mut Cursor<&[u8]>) -> io::Result<BspPlane> {
    Ok(BspPlane {
        normal: read_vec3(reader)?,
        dist: reader.read_f32::<LittleEndian>()?,
    })
}

fn read_leaf(reader: &mut Cursor<&[u8]>) -> io::Result<BspLeaf> {
    let cluster = reader.read_i32::<LittleEndian>()?;
    let area = reader.read_i32::<LittleEndian>()?;
    // mins, maxs, first leaf face, leaf face count
    reader.set_position(reader.position() + 32);
    Ok(BspLeaf {
        cluster,
        area,
        first_leaf_brush: reader.read_i32::<LittleEndian>()?,
        num_leaf_brushes: reader.read_i32::<LittleEndian>()?,
    })
}

fn read_model(reader: &mut Cursor<&[u8]>) -> io::Result<BspModel> {
    let mins = read_vec3(reader)?;
    let maxs = read_vec3(reader)?;
    // first face, face count
    reader.set_position(reader.position() + 8);
    Ok(BspModel {
        mins,
        maxs,
        first_brush: reader.read_i32::<LittleEndian>()?,
        num_brushes: reader.read_i32::<LittleEndian>()?,
    })
}

fn read_brush(reader: &mut Cursor<&[u8]>) -> io::Result<BspBrush> {
    Ok(BspBrush {
        first_side: reader.read_i32::<LittleEndian>()?,
        num_sides: reader.read_i32::<LittleEndian>()?,
        shader: reader.read_i32::<LittleEndian>()?,
    })
}

fn parse_entities(text: &str) -> Vec<BspEntity> {
    let mut entities = Vec::new();
    let mut current: Option<BspEntity> = None;
    let mut pending_key: Option<String> = None;
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        match c {
            '{' => {
                current = Some(BspEntity::default());
                pending_key = None;
            }
            '}' => {
                if let Some(entity) = current.take() {
                    entities.push(entity);
                }
            }
            '"' => {
                let token: String = chars.by_ref().take_while(|c| *c != '"').collect();
                if let Some(entity) = current.as_mut() {
                    match pending_key.take() {
                        Some(key) => entity.properties.push((key, token)),
                        None => pending_key = Some(token),
                    }
                }
            }
            _ => {}
        }
    }
    entities
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entities() {
        let text = r#"{
"classname" "worldspawn"
}
{
"classname" "trigger_push"
"target" "t1"
"model" "*1"
}
{
"targetname" "t1"
"origin" "10 -20 30.5"
}"#;
        let entities = parse_entities(text);
        assert_eq!(entities.len(), 3);
        assert_eq!(entities[1].get("model"), Some("*1"));
        assert_eq!(entities[2].vector("origin"), Some(Vec3::new(10.0, -20.0, 30.5)));
        assert_eq!(entities[0].get("origin"), None);
    }

    #[test]
    fn test_rejects_bad_header() {
        let mut data = vec![0u8; HEADER_SIZE];
        data[..4].copy_from_slice(b"RBSP");
        assert!(matches!(BspFile::parse(&data), Err(LevelError::BadMagic { .. })));

        data[..4].copy_from_slice(BSP_MAGIC);
        data[4..8].copy_from_slice(&47i32.to_le_bytes());
        assert!(matches!(BspFile::parse(&data), Err(LevelError::BadVersion(47))));

        assert!(matches!(BspFile::parse(&data[..10]), Err(LevelError::TruncatedHeader { .. })));
    }

    #[test]
    fn test_lump_out_of_range() {
        let mut data = vec![0u8; HEADER_SIZE];
        data[..4].copy_from_slice(BSP_MAGIC);
        data[4..8].copy_from_slice(&BSP_VERSION.to_le_bytes());
        // Plane lump pointing past the end of the file
        let entry = 8 + lump::PLANES * 8;
        data[entry..entry + 4].copy_from_slice(&(HEADER_SIZE as i32).to_le_bytes());
        data[entry + 4..entry + 8].copy_from_slice(&16i32.to_le_bytes());
        assert!(matches!(
            BspFile::parse(&data),
            Err(LevelError::TruncatedLump { lump: lump::PLANES })
        ));
    }
}
