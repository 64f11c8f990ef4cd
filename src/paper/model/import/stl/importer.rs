use super::data;
use super::super::*;

pub struct StlImporter {
    stl: data::Stl,
}

impl StlImporter {
    pub fn new<R: Read>(f: R) -> Result<StlImporter> {
        let stl = data::Stl::new(f)?;
        if stl.triangles().is_empty() {
            bail!("STL without triangles");
        }
        Ok(StlImporter {
            stl,
        })
    }
    fn corner(&self, i_v: usize) -> Vector3 {
        self.stl.triangles()[i_v / 3].vertices[i_v % 3]
    }
}

impl Importer for StlImporter {
    // STL doesn't have vertex identity, we consider them the same if they are bitwise identical
    type VertexId = [u64; 3];

    fn vertex_count(&self) -> usize {
        // The importer vertex is {3*nface, +1, +2}
        3 * self.stl.triangles().len()
    }

    fn vertex_map(&self, i_v: usize) -> Self::VertexId {
        let v: [f64; 3] = self.corner(i_v).into();
        // -0.0 and 0.0 are the same corner
        v.map(|f| (f + 0.0).to_bits())
    }

    fn vertex_pos(&self, i_v: usize) -> Vector3 {
        self.corner(i_v)
    }

    fn face_count(&self) -> usize {
        self.stl.triangles().len()
    }

    fn faces<'s>(&'s self) -> impl Iterator<Item = impl AsRef<[usize]>> + 's {
        (0 .. self.stl.triangles().len()).map(|i_face| {
            let i_v0 = 3 * i_face;
            [i_v0, i_v0 + 1, i_v0 + 2]
        })
    }
}
