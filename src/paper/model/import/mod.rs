use anyhow::{Context, Result, bail};
use fxhash::FxHashMap;
use log::{info, warn};
use std::hash::Hash;
use std::io::Read;
use std::panic::catch_unwind;
use std::path::Path;

use super::Mesh;
use crate::util_3d::Vector3;

pub mod stl {
    mod data;
    mod importer;
    pub use data::{Stl, Triangle};
    pub use importer::StlImporter;
}
pub mod waveobj {
    mod data;
    mod importer;
    pub use data::{Face, FaceVertex, Model};
    pub use importer::WaveObjImporter;
}

fn read_u16(rdr: &mut impl Read) -> Result<u16> {
    let mut x = [0; 2];
    rdr.read_exact(&mut x)?;
    Ok(u16::from_le_bytes(x))
}
fn read_u32(rdr: &mut impl Read) -> Result<u32> {
    let mut x = [0; 4];
    rdr.read_exact(&mut x)?;
    Ok(u32::from_le_bytes(x))
}
fn read_f32(rdr: &mut impl Read) -> Result<f32> {
    let mut x = [0; 4];
    rdr.read_exact(&mut x)?;
    Ok(f32::from_le_bytes(x))
}
fn read_vector3_f32(rdr: &mut impl Read) -> Result<Vector3> {
    let x = read_f32(rdr)? as f64;
    let y = read_f32(rdr)? as f64;
    let z = read_f32(rdr)? as f64;
    Ok(Vector3::new(x, y, z))
}

/// A source of polygons, whatever the file format.
pub trait Importer: Sized {
    /// Two importer vertices with the same id are the same mesh vertex.
    type VertexId: Copy + Eq + Hash + std::fmt::Debug;

    fn vertex_count(&self) -> usize;
    fn vertex_map(&self, i_v: usize) -> Self::VertexId;
    fn vertex_pos(&self, i_v: usize) -> Vector3;
    fn face_count(&self) -> usize;
    /// Every face as a list of importer vertices, in winding order.
    fn faces<'s>(&'s self) -> impl Iterator<Item = impl AsRef<[usize]>> + 's;
}

/// Builds the mesh, merging the vertices that share an id.
///
/// Faces that collapse because some of their corners are merged are dropped.
pub fn build_mesh(importer: impl Importer) -> Result<Mesh> {
    let mut ids: FxHashMap<_, usize> = FxHashMap::default();
    let mut positions = Vec::new();
    let mut vertex_index = Vec::with_capacity(importer.vertex_count());
    for i_v in 0 .. importer.vertex_count() {
        let idx = *ids.entry(importer.vertex_map(i_v)).or_insert_with(|| {
            positions.push(importer.vertex_pos(i_v));
            positions.len() - 1
        });
        vertex_index.push(idx);
    }

    let mut polygons = Vec::with_capacity(importer.face_count());
    let mut dropped = 0;
    for face in importer.faces() {
        let mut polygon: Vec<usize> = Vec::with_capacity(face.as_ref().len());
        for &i_v in face.as_ref() {
            let Some(&v) = vertex_index.get(i_v) else {
                bail!("face #{} uses vertex #{i_v}, out of range", polygons.len() + dropped);
            };
            // consecutive copies are just a shorter polygon
            if polygon.last() != Some(&v) {
                polygon.push(v);
            }
        }
        if polygon.len() > 1 && polygon.first() == polygon.last() {
            polygon.pop();
        }
        let mut sorted = polygon.clone();
        sorted.sort_unstable();
        sorted.dedup();
        if polygon.len() < 3 || sorted.len() != polygon.len() {
            dropped += 1;
            continue;
        }
        polygons.push(polygon);
    }
    if dropped > 0 {
        warn!("{dropped} collapsed faces dropped");
    }
    info!("imported {} vertices and {} faces", positions.len(), polygons.len());
    Ok(Mesh::from_polygons(positions, &polygons)?)
}

pub fn import_model_file(file_name: &Path) -> Result<Mesh> {
    // Models have a lot of indices, a corrupted file could easily panic
    match catch_unwind(|| import_model_file_priv(file_name)) {
        Ok(res) => res,
        Err(err) => {
            if let Some(msg) = err.downcast_ref::<&str>() {
                bail!("Panic importing the model '{}'!\n{}", file_name.display(), msg);
            } else {
                bail!("Panic importing the model '{}'!", file_name.display());
            }
        }
    }
}

fn import_model_file_priv(file_name: &Path) -> Result<Mesh> {
    let ext = match file_name.extension() {
        None => String::new(),
        Some(ext) => {
            let mut ext = ext.to_string_lossy().into_owned();
            ext.make_ascii_lowercase();
            ext
        }
    };

    let f = std::fs::File::open(file_name)
        .with_context(|| format!("Error opening file {}", file_name.display()))?;
    let f = std::io::BufReader::new(f);

    let mesh = match ext.as_str() {
        "stl" => {
            let importer = stl::StlImporter::new(f)
                .with_context(|| format!("Error reading STL file {}", file_name.display()))?;
            build_mesh(importer)
        }
        "mtl" => {
            bail!("MTL are material files for OBJ models. Try opening the OBJ file instead.");
        }
        // unknown extensions are tried as obj
        _ => {
            let importer = waveobj::WaveObjImporter::new(f)
                .with_context(|| format!("Error reading Wavefront file {}", file_name.display()))?;
            build_mesh(importer)
        }
    };
    mesh.with_context(|| format!("Invalid model in {}", file_name.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Polygons {
        positions: Vec<Vector3>,
        faces: Vec<Vec<usize>>,
    }

    impl Importer for Polygons {
        type VertexId = [u64; 3];

        fn vertex_count(&self) -> usize {
            self.positions.len()
        }
        fn vertex_map(&self, i_v: usize) -> Self::VertexId {
            let v = self.positions[i_v];
            [v.x.to_bits(), v.y.to_bits(), v.z.to_bits()]
        }
        fn vertex_pos(&self, i_v: usize) -> Vector3 {
            self.positions[i_v]
        }
        fn face_count(&self) -> usize {
            self.faces.len()
        }
        fn faces<'s>(&'s self) -> impl Iterator<Item = impl AsRef<[usize]>> + 's {
            self.faces.iter()
        }
    }

    #[test]
    fn merged_corners() {
        let v = Vector3::new;
        let importer = Polygons {
            positions: vec![
                v(0.0, 0.0, 0.0), v(1.0, 0.0, 0.0), v(0.0, 1.0, 0.0),
                v(1.0, 0.0, 0.0), v(1.0, 1.0, 0.0), v(0.0, 1.0, 0.0),
                // a sliver with two equal corners
                v(0.0, 0.0, 0.0), v(5.0, 5.0, 5.0), v(0.0, 0.0, 0.0),
            ],
            faces: vec![vec![0, 1, 2], vec![3, 4, 5], vec![6, 7, 8]],
        };
        let mesh = build_mesh(importer).unwrap();
        assert_eq!(mesh.num_vertices(), 5);
        assert_eq!(mesh.num_faces(), 2);
        assert_eq!(mesh.num_edges(), 5);
    }

    #[test]
    fn out_of_range_vertex() {
        let importer = Polygons {
            positions: vec![Vector3::new(0.0, 0.0, 0.0)],
            faces: vec![vec![0, 1, 2]],
        };
        assert!(build_mesh(importer).is_err());
    }

    #[test]
    fn read_little_endian() {
        let data = [1u8, 2, 0x78, 0x56, 0x34, 0x12, 0, 0, 0x80, 0x3f];
        let rdr = &mut &data[..];
        assert_eq!(read_u16(rdr).unwrap(), 0x0201);
        assert_eq!(read_u32(rdr).unwrap(), 0x12345678);
        assert_eq!(read_f32(rdr).unwrap(), 1.0);
        assert!(read_u16(rdr).is_err());
    }
}
