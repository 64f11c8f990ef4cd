use log::info;

use crate::util_3d::{self, Vector2};

use super::*;

mod island;
mod cuts;
mod join;
mod sweep;
mod boundary;
mod marker;
mod finalize;
mod pack;
mod file;

pub use island::*;
pub use marker::*;
pub use pack::Page;
pub use file::*;

index_type!(pub UvVertexIndex: u32);
index_type!(pub UvEdgeIndex: u32);

/// Unfolding state of a mesh edge.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeState {
    main_faces: Option<(FaceIndex, FaceIndex)>,
    angle: f64,
    priority: f64,
    // false only when both main faces are in the same island, connected through this edge
    is_main_cut: bool,
    // The first two belong to the main faces, once the cuts are done
    uvedges: Vec<UvEdgeIndex>,
}

impl EdgeState {
    pub fn main_faces(&self) -> Option<(FaceIndex, FaceIndex)> {
        self.main_faces
    }
    pub fn angle(&self) -> f64 {
        self.angle
    }
    pub fn priority(&self) -> f64 {
        self.priority
    }
    pub fn is_main_cut(&self) -> bool {
        self.is_main_cut
    }
    pub fn uvedges(&self) -> &[UvEdgeIndex] {
        &self.uvedges
    }
    /// Whether this edge is cut as seen from the given face.
    ///
    /// Faces other than the main ones are always cut.
    pub fn is_cut(&self, i_face: FaceIndex) -> bool {
        match self.main_faces {
            Some((fa, fb)) if fa == i_face || fb == i_face => self.is_main_cut,
            _ => true,
        }
    }
}

/// An unfolding session: the mesh and the islands it is being unfolded into.
#[derive(Debug, Clone)]
pub struct Papercraft {
    model: Mesh,
    options: PaperOptions,
    edges: Vec<EdgeState>, //parallel to EdgeIndex
    uv_vertices: Vec<UvVertex>,
    uv_edges: Vec<UvEdge>,
    uv_faces: Vec<UvFace>, //parallel to FaceIndex
    islands: IslandPool,
    // Largest islands first, once the cuts are done
    island_order: Vec<IslandKey>,
    title_height: f64,
    pages: Vec<Page>,
}

impl Papercraft {
    /// Starts an unfolding session with every face in an island of its own.
    pub fn new(model: Mesh, options: PaperOptions) -> Papercraft {
        let edges = model.edges()
            .map(|(i_edge, _)| {
                let main_faces = model.main_faces(i_edge);
                EdgeState {
                    main_faces,
                    angle: model.dihedral_angle(i_edge, main_faces, None),
                    priority: 0.0,
                    is_main_cut: true,
                    uvedges: Vec::new(),
                }
            })
            .collect();

        let mut papercraft = Papercraft {
            uv_faces: Vec::with_capacity(model.num_faces()),
            model,
            options,
            edges,
            uv_vertices: Vec::new(),
            uv_edges: Vec::new(),
            islands: IslandPool::default(),
            island_order: Vec::new(),
            title_height: 0.0,
            pages: Vec::new(),
        };
        for i_face in 0 .. papercraft.model.num_faces() {
            let key = papercraft.add_face_island(FaceIndex::from(i_face));
            papercraft.island_order.push(key);
        }
        papercraft
    }

    /// Runs the whole unfolding: cuts, markers, orientation and packing into pages.
    pub fn unfold(model: Mesh, options: PaperOptions) -> Result<Papercraft> {
        model.check_correct()?;
        let mut papercraft = Papercraft::new(model, options);
        let options = papercraft.options.clone();

        papercraft.generate_cuts(options.island_size_limit())?;
        papercraft.finalize_topology();
        papercraft.enumerate_islands();
        papercraft.scale_islands(options.scale);
        if options.create_stickers {
            papercraft.generate_stickers(options.sticker_width, options.create_numbers);
        } else if options.create_numbers {
            papercraft.generate_numbers_alone(options.sticker_width);
        }
        let title_height = if papercraft.islands.len() > 1 { options.title_height() } else { 0.0 };
        papercraft.finalize_islands(title_height);
        papercraft.pack_islands()?;
        info!("Unfolded {} faces into {} islands on {} pages",
            papercraft.model.num_faces(), papercraft.islands.len(), papercraft.pages.len());
        Ok(papercraft)
    }

    pub fn model(&self) -> &Mesh {
        &self.model
    }
    pub fn options(&self) -> &PaperOptions {
        &self.options
    }
    pub fn edge_state(&self, i_edge: EdgeIndex) -> &EdgeState {
        &self.edges[usize::from(i_edge)]
    }
    pub fn uv_vertex(&self, i_uvvertex: UvVertexIndex) -> &UvVertex {
        &self.uv_vertices[usize::from(i_uvvertex)]
    }
    pub fn uv_edge(&self, i_uvedge: UvEdgeIndex) -> &UvEdge {
        &self.uv_edges[usize::from(i_uvedge)]
    }
    pub fn uv_face(&self, i_face: FaceIndex) -> &UvFace {
        &self.uv_faces[usize::from(i_face)]
    }
    pub fn num_islands(&self) -> usize {
        self.islands.len()
    }
    /// Islands in their numbering order, largest first.
    pub fn islands(&self) -> impl Iterator<Item = (IslandKey, &Island)> + '_ {
        self.island_order
            .iter()
            .map(|&key| (key, &self.islands[key]))
    }
    /// Finds an island, following the keys of islands that have been merged away.
    pub fn island_by_key(&self, key: IslandKey) -> Option<&Island> {
        self.islands.get(key)
    }
    pub fn island_by_face(&self, i_face: FaceIndex) -> IslandKey {
        self.uv_face(i_face).island()
    }
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }
    pub fn title_height(&self) -> f64 {
        self.title_height
    }

    /// The flattened polygon of a face, in island coordinates.
    pub fn face_polygon(&self, i_face: FaceIndex) -> Vec<Vector2> {
        self.uv_face(i_face)
            .vertices()
            .iter()
            .map(|&v| self.uv_vertex(v).co())
            .collect()
    }
    /// Area of an island, as the sum of the areas of its flattened faces.
    pub fn island_area(&self, key: IslandKey) -> f64 {
        self.islands[key]
            .faces()
            .iter()
            .map(|&f| util_3d::polygon_area(&self.face_polygon(f)).abs())
            .sum()
    }
    // Edge that a uvedge next to `i_uvedge` in the boundary belongs to
    fn neighbor_edges(&self, i_uvedge: UvEdgeIndex) -> (Option<EdgeIndex>, Option<EdgeIndex>) {
        let uvedge = self.uv_edge(i_uvedge);
        (
            uvedge.neighbor_left.map(|e| self.uv_edge(e).edge),
            uvedge.neighbor_right.map(|e| self.uv_edge(e).edge),
        )
    }
    fn uvedge_flipped(&self, i_uvedge: UvEdgeIndex) -> bool {
        self.uv_face(self.uv_edge(i_uvedge).face).flipped
    }
}
