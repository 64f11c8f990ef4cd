use super::super::*;
use super::data;
use std::io::BufRead;

pub struct WaveObjImporter {
    obj: data::Model,
}

impl WaveObjImporter {
    pub fn new<R: BufRead>(f: R) -> Result<Self> {
        let obj = data::Model::from_reader(f)?;
        if obj.faces().is_empty() {
            bail!("OBJ without faces");
        }
        Ok(WaveObjImporter {
            obj,
        })
    }
}

impl Importer for WaveObjImporter {
    // Texture coordinates and normals do not split a vertex
    type VertexId = u32;

    fn vertex_count(&self) -> usize {
        self.obj.vertices().len()
    }
    fn vertex_map(&self, i_v: usize) -> Self::VertexId {
        i_v as u32
    }
    fn vertex_pos(&self, i_v: usize) -> Vector3 {
        Vector3::from(*self.obj.vertex_by_index(i_v as u32))
    }
    fn face_count(&self) -> usize {
        self.obj.faces().len()
    }
    fn faces<'s>(&'s self) -> impl Iterator<Item = impl AsRef<[usize]>> + 's {
        self.obj.faces().iter().map(|face| {
            face.vertices()
                .iter()
                .map(|fv| fv.v() as usize)
                .collect::<Vec<_>>()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_from_obj() {
        let obj = "v -1 -1 -1
v 1 -1 -1
v 1 1 -1
v -1 1 -1
v -1 -1 1
v 1 -1 1
v 1 1 1
v -1 1 1
vn 0 0 1
f 1 4 3 2
f 5//1 6//1 7//1 8//1
f 1 2 6 5
f 2 3 7 6
f 3 4 8 7
f 4 1 5 8
";
        let importer = WaveObjImporter::new(obj.as_bytes()).unwrap();
        let mesh = build_mesh(importer).unwrap();
        assert_eq!(mesh.num_vertices(), 8);
        assert_eq!(mesh.num_edges(), 12);
        assert_eq!(mesh.num_faces(), 6);
        assert!((mesh.total_area() - 24.0).abs() < 1e-9);
        assert!(mesh.check_correct().is_ok());
    }

    #[test]
    fn no_faces() {
        assert!(WaveObjImporter::new("v 0 0 0\n".as_bytes()).is_err());
    }
}
