use fxhash::FxHashMap;
use slotmap::{SlotMap, new_key_type};

use crate::util_3d::{Plane, Vector2};

use super::*;

new_key_type! {
    pub struct IslandKey;
}

#[derive(Debug, Clone, PartialEq)]
pub struct UvVertex {
    pub(super) co: Vector2,
    pub(super) vertex: VertexIndex,
}

impl UvVertex {
    pub fn co(&self) -> Vector2 {
        self.co
    }
    pub fn vertex(&self) -> VertexIndex {
        self.vertex
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UvEdge {
    pub(super) va: UvVertexIndex,
    pub(super) vb: UvVertexIndex,
    pub(super) face: FaceIndex,
    pub(super) edge: EdgeIndex,
    pub(super) island: IslandKey,
    pub(super) neighbor_left: Option<UvEdgeIndex>,
    pub(super) neighbor_right: Option<UvEdgeIndex>,
    // index into the markers of its island
    pub(super) sticker: Option<usize>,
    pub(super) on_boundary: bool,
}

impl UvEdge {
    pub fn va(&self) -> UvVertexIndex {
        self.va
    }
    pub fn vb(&self) -> UvVertexIndex {
        self.vb
    }
    pub fn face(&self) -> FaceIndex {
        self.face
    }
    pub fn edge(&self) -> EdgeIndex {
        self.edge
    }
    pub fn island(&self) -> IslandKey {
        self.island
    }
    pub fn neighbor_left(&self) -> Option<UvEdgeIndex> {
        self.neighbor_left
    }
    pub fn neighbor_right(&self) -> Option<UvEdgeIndex> {
        self.neighbor_right
    }
    pub fn sticker(&self) -> Option<usize> {
        self.sticker
    }
    pub fn on_boundary(&self) -> bool {
        self.on_boundary
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UvFace {
    pub(super) face: FaceIndex,
    pub(super) island: IslandKey,
    pub(super) vertices: Vec<UvVertexIndex>,
    pub(super) edges: Vec<UvEdgeIndex>,
    // mirrored relative to the 3D winding
    pub(super) flipped: bool,
}

impl UvFace {
    pub fn face(&self) -> FaceIndex {
        self.face
    }
    pub fn island(&self) -> IslandKey {
        self.island
    }
    pub fn vertices(&self) -> &[UvVertexIndex] {
        &self.vertices
    }
    pub fn edges(&self) -> &[UvEdgeIndex] {
        &self.edges
    }
    pub fn flipped(&self) -> bool {
        self.flipped
    }
}

/// A connected set of faces, flattened together.
#[derive(Debug, Clone, PartialEq)]
pub struct Island {
    pub(super) faces: Vec<FaceIndex>,
    pub(super) edges: Vec<UvEdgeIndex>,
    pub(super) vertices: Vec<UvVertexIndex>,
    pub(super) uvverts_by_id: FxHashMap<VertexIndex, Vec<UvVertexIndex>>,
    pub(super) boundary: Vec<UvEdgeIndex>,
    pub(super) markers: Vec<Marker>,
    pub(super) pos: Vector2,
    pub(super) bounding_box: Vector2,
    pub(super) number: usize,
    pub(super) label: String,
    pub(super) abbreviation: String,
    pub(super) title: Option<String>,
    // no merge into this island ever needed the robust sweepline
    pub(super) has_safe_geometry: bool,
    pub(super) is_inside_out: bool,
    pub(super) sticker_numbering: usize,
}

impl Island {
    fn empty() -> Island {
        Island {
            faces: Vec::new(),
            edges: Vec::new(),
            vertices: Vec::new(),
            uvverts_by_id: FxHashMap::default(),
            boundary: Vec::new(),
            markers: Vec::new(),
            pos: Vector2::new(0.0, 0.0),
            bounding_box: Vector2::new(0.0, 0.0),
            number: 0,
            label: String::new(),
            abbreviation: String::new(),
            title: None,
            has_safe_geometry: true,
            is_inside_out: false,
            sticker_numbering: 0,
        }
    }
    pub fn faces(&self) -> &[FaceIndex] {
        &self.faces
    }
    pub fn edges(&self) -> &[UvEdgeIndex] {
        &self.edges
    }
    pub fn vertices(&self) -> &[UvVertexIndex] {
        &self.vertices
    }
    pub fn boundary(&self) -> &[UvEdgeIndex] {
        &self.boundary
    }
    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }
    /// Position of the island on its page, in millimeters.
    pub fn pos(&self) -> Vector2 {
        self.pos
    }
    pub fn bounding_box(&self) -> Vector2 {
        self.bounding_box
    }
    pub fn number(&self) -> usize {
        self.number
    }
    pub fn label(&self) -> &str {
        &self.label
    }
    pub fn abbreviation(&self) -> &str {
        &self.abbreviation
    }
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }
    pub fn has_safe_geometry(&self) -> bool {
        self.has_safe_geometry
    }
    pub fn is_inside_out(&self) -> bool {
        self.is_inside_out
    }
    pub fn uvverts_by_id(&self, v: VertexIndex) -> &[UvVertexIndex] {
        self.uvverts_by_id.get(&v).map_or(&[], |vs| vs.as_slice())
    }
}

/// The live islands, plus where the absorbed ones went.
#[derive(Debug, Clone, Default)]
pub struct IslandPool {
    islands: SlotMap<IslandKey, Island>,
    redirect: FxHashMap<IslandKey, IslandKey>,
}

impl IslandPool {
    pub fn len(&self) -> usize {
        self.islands.len()
    }
    pub fn is_empty(&self) -> bool {
        self.islands.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = (IslandKey, &Island)> {
        self.islands.iter()
    }
    pub fn keys(&self) -> impl Iterator<Item = IslandKey> + '_ {
        self.islands.keys()
    }
    pub fn contains(&self, key: IslandKey) -> bool {
        self.islands.contains_key(key)
    }
    fn insert(&mut self, island: Island) -> IslandKey {
        self.islands.insert(island)
    }
    fn resolve(&self, mut key: IslandKey) -> IslandKey {
        while let Some(&next) = self.redirect.get(&key) {
            key = next;
        }
        key
    }
    /// Resolves a key to its live island, shortening the redirections on the way.
    pub fn find(&mut self, key: IslandKey) -> IslandKey {
        let root = self.resolve(key);
        let mut key = key;
        while let Some(next) = self.redirect.get_mut(&key) {
            key = std::mem::replace(next, root);
        }
        root
    }
    pub fn get(&self, key: IslandKey) -> Option<&Island> {
        self.islands.get(self.resolve(key))
    }
    pub fn get_mut(&mut self, key: IslandKey) -> Option<&mut Island> {
        let key = self.resolve(key);
        self.islands.get_mut(key)
    }
    /// Removes `source` from the pool; from now on its key leads to `target`.
    pub(super) fn absorb(&mut self, target: IslandKey, source: IslandKey) -> Option<Island> {
        let island = self.islands.remove(source)?;
        self.redirect.insert(source, target);
        Some(island)
    }
}

impl std::ops::Index<IslandKey> for IslandPool {
    type Output = Island;

    fn index(&self, key: IslandKey) -> &Island {
        &self.islands[self.resolve(key)]
    }
}

impl std::ops::IndexMut<IslandKey> for IslandPool {
    fn index_mut(&mut self, key: IslandKey) -> &mut Island {
        let key = self.resolve(key);
        &mut self.islands[key]
    }
}

impl Papercraft {
    // A new island with a single face, flattened onto its own plane
    pub(super) fn add_face_island(&mut self, i_face: FaceIndex) -> IslandKey {
        let key = self.islands.insert(Island::empty());
        let face = &self.model[i_face];
        let plane = Plane::from_normal(face.normal());

        let first = self.uv_vertices.len();
        let vertices: Vec<UvVertexIndex> = face.index_vertices()
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                self.uv_vertices.push(UvVertex {
                    co: plane.project(&self.model[v].pos()),
                    vertex: v,
                });
                UvVertexIndex::from(first + i)
            })
            .collect();

        let n = vertices.len();
        let mut edges = Vec::with_capacity(n);
        for (i, (_, _, i_edge)) in face.vertices_with_edges().enumerate() {
            let i_uvedge = UvEdgeIndex::from(self.uv_edges.len());
            self.uv_edges.push(UvEdge {
                va: vertices[i],
                vb: vertices[(i + 1) % n],
                face: i_face,
                edge: i_edge,
                island: key,
                neighbor_left: None,
                neighbor_right: None,
                sticker: None,
                on_boundary: true,
            });
            self.edges[usize::from(i_edge)].uvedges.push(i_uvedge);
            edges.push(i_uvedge);
        }

        self.uv_faces.push(UvFace {
            face: i_face,
            island: key,
            vertices: vertices.clone(),
            edges: edges.clone(),
            flipped: false,
        });

        let uvverts_by_id = vertices
            .iter()
            .map(|&v| (self.uv_vertices[usize::from(v)].vertex, vec![v]))
            .collect();
        let island = &mut self.islands[key];
        island.faces = vec![i_face];
        island.boundary = edges.clone();
        island.edges = edges;
        island.vertices = vertices;
        island.uvverts_by_id = uvverts_by_id;
        key
    }

    /// Island keys sorted by face count, largest first, ties by lowest face.
    pub(super) fn sort_islands(&mut self) {
        let mut order: Vec<IslandKey> = self.islands.keys().collect();
        order.sort_by_key(|&key| {
            let island = &self.islands[key];
            let first = island.faces.iter().min().copied().unwrap_or_default();
            (std::cmp::Reverse(island.faces.len()), first)
        });
        self.island_order = order;
    }
}
