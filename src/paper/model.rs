use std::f64::consts::PI;

use cgmath::InnerSpace;
use fxhash::FxHashMap;
use log::warn;

use crate::util_3d::{self, Vector3};

use super::{Result, UnfoldError};

pub mod import;

index_type!(pub VertexIndex: u32);
index_type!(pub EdgeIndex: u32);
index_type!(pub FaceIndex: u32);

// Zero-length edges and zero-area faces are detected with this tolerance
const NULL_EPSILON: f64 = 1e-6;
// A polygon vertex farther than this ratio of the polygon diameter from its plane makes it twisted
const TWIST_RATIO: f64 = 0.01;

/// The polygonal mesh to unfold.
///
/// Geometry and connectivity never change once built. The mutable unfolding state of the
/// edges lives in the `Papercraft` that owns the mesh, parallel to `EdgeIndex`.
#[derive(Debug, Clone)]
pub struct Mesh {
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    faces: Vec<Face>,
}

#[derive(Debug, Clone)]
pub struct Vertex {
    pos: Vector3,
    edges: Vec<EdgeIndex>,
}

// `va`, `vb` are in the order of first appearance, the faces may walk it either way.
#[derive(Debug, Clone)]
pub struct Edge {
    va: VertexIndex,
    vb: VertexIndex,
    faces: Vec<FaceIndex>,
    force_cut: bool,
}

#[derive(Debug, Clone)]
pub struct Face {
    vertices: Vec<VertexIndex>,
    // edges[i] goes from vertices[i] to vertices[i + 1]
    edges: Vec<EdgeIndex>,
    normal: Vector3,
    area: f64,
}

impl Mesh {
    /// Builds the mesh graph from vertex positions and polygons given as lists of vertex indices.
    ///
    /// Edges are created for every pair of consecutive polygon vertices and shared between the
    /// polygons that use them.
    pub fn from_polygons(positions: Vec<Vector3>, polygons: &[Vec<usize>]) -> Result<Mesh> {
        let mut vertices: Vec<Vertex> = positions
            .into_iter()
            .map(|pos| Vertex { pos, edges: Vec::new() })
            .collect();
        let mut edges: Vec<Edge> = Vec::new();
        let mut faces: Vec<Face> = Vec::new();
        let mut edge_map: FxHashMap<(VertexIndex, VertexIndex), EdgeIndex> = FxHashMap::default();

        for polygon in polygons {
            let i_face = FaceIndex::from(faces.len());
            if polygon.len() < 3 {
                return Err(UnfoldError::InvalidMesh(format!("face #{i_face} has only {} vertices", polygon.len())));
            }
            let mut face_vertices = Vec::with_capacity(polygon.len());
            for &v in polygon {
                if v >= vertices.len() {
                    return Err(UnfoldError::InvalidMesh(format!("face #{i_face} uses vertex #{v}, out of range")));
                }
                let v = VertexIndex::from(v);
                if face_vertices.contains(&v) {
                    return Err(UnfoldError::InvalidMesh(format!("face #{i_face} uses vertex #{v} twice")));
                }
                face_vertices.push(v);
            }

            let mut face_edges = Vec::with_capacity(face_vertices.len());
            for (i, &v0) in face_vertices.iter().enumerate() {
                let v1 = face_vertices[(i + 1) % face_vertices.len()];
                let key = if v0 < v1 { (v0, v1) } else { (v1, v0) };
                let i_edge = match edge_map.get(&key) {
                    Some(&i_edge) => {
                        let edge = &edges[usize::from(i_edge)];
                        if edge.faces.len() >= 2 {
                            warn!("edge #{i_edge} has more than two faces");
                        } else if let Some(&other) = edge.faces.first() {
                            let other = &faces[usize::from(other)];
                            if walks_forward(other, edge.va, edge.vb) == (v0 == edge.va) {
                                // Harmless, unless you are doing a Moebius strip or something weird
                                warn!("inverted edge #{i_edge}: {v0}-{v1}");
                            }
                        }
                        i_edge
                    }
                    None => {
                        let i_edge = EdgeIndex::from(edges.len());
                        edges.push(Edge {
                            va: v0,
                            vb: v1,
                            faces: Vec::new(),
                            force_cut: false,
                        });
                        vertices[usize::from(v0)].edges.push(i_edge);
                        vertices[usize::from(v1)].edges.push(i_edge);
                        edge_map.insert(key, i_edge);
                        i_edge
                    }
                };
                edges[usize::from(i_edge)].faces.push(i_face);
                face_edges.push(i_edge);
            }

            let ps: Vec<Vector3> = face_vertices.iter().map(|&v| vertices[usize::from(v)].pos).collect();
            let newell = util_3d::newell_normal(&ps);
            let area = newell.magnitude() / 2.0;
            let normal = if area > 0.0 { newell.normalize() } else { newell };
            faces.push(Face {
                vertices: face_vertices,
                edges: face_edges,
                normal,
                area,
            });
        }

        Ok(Mesh {
            vertices,
            edges,
            faces,
        })
    }

    /// Marks the edge between two vertices as a seam, that will always be cut.
    pub fn set_force_cut(&mut self, va: usize, vb: usize, force_cut: bool) -> Result<EdgeIndex> {
        let i_edge = self.edge_between(VertexIndex::from(va), VertexIndex::from(vb))
            .ok_or_else(|| UnfoldError::InvalidMesh(format!("there is no edge {va}-{vb}")))?;
        self.edges[usize::from(i_edge)].force_cut = force_cut;
        Ok(i_edge)
    }

    pub fn edge_between(&self, va: VertexIndex, vb: VertexIndex) -> Option<EdgeIndex> {
        let vertex = self.vertices.get(usize::from(va))?;
        vertex.edges
            .iter()
            .copied()
            .find(|&e| {
                let edge = &self[e];
                (edge.va, edge.vb) == (va, vb) || (edge.va, edge.vb) == (vb, va)
            })
    }

    pub fn vertices(&self) -> impl Iterator<Item = (VertexIndex, &Vertex)> {
        self.vertices
            .iter()
            .enumerate()
            .map(|(i, v)| (VertexIndex::from(i), v))
    }
    pub fn faces(&self) -> impl Iterator<Item = (FaceIndex, &Face)> + '_ {
        self.faces
            .iter()
            .enumerate()
            .map(|(i, f)| (FaceIndex::from(i), f))
    }
    pub fn edges(&self) -> impl Iterator<Item = (EdgeIndex, &Edge)> + '_ {
        self.edges
            .iter()
            .enumerate()
            .map(|(i, e)| (EdgeIndex::from(i), e))
    }
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }
    pub fn edge_vector(&self, i_edge: EdgeIndex) -> Vector3 {
        let edge = &self[i_edge];
        self[edge.vb].pos - self[edge.va].pos
    }
    pub fn total_area(&self) -> f64 {
        self.faces.iter().map(|f| f.area).sum()
    }

    /// Rejects geometry that the unfolding cannot handle.
    pub fn check_correct(&self) -> Result<()> {
        let null_edges: Vec<EdgeIndex> = self.edges()
            .filter(|(i_edge, edge)| !edge.faces.is_empty() && self.edge_vector(*i_edge).magnitude() < NULL_EPSILON)
            .map(|(i_edge, _)| i_edge)
            .collect();
        let null_faces: Vec<FaceIndex> = self.faces()
            .filter(|(_, face)| face.normal.magnitude2() < NULL_EPSILON)
            .map(|(i_face, _)| i_face)
            .collect();
        let twisted_faces: Vec<FaceIndex> = self.faces()
            .filter(|(_, face)| self.is_twisted(face))
            .map(|(i_face, _)| i_face)
            .collect();
        if null_edges.is_empty() && null_faces.is_empty() && twisted_faces.is_empty() {
            return Ok(());
        }
        Err(UnfoldError::Degenerate {
            null_edges,
            null_faces,
            twisted_faces,
        })
    }

    fn is_twisted(&self, face: &Face) -> bool {
        if face.vertices.len() <= 3 || face.area == 0.0 {
            return false;
        }
        let ps: Vec<Vector3> = face.vertices.iter().map(|&v| self[v].pos).collect();
        let center = ps.iter().fold(Vector3::new(0.0, 0.0, 0.0), |acc, p| acc + p) / ps.len() as f64;
        let plane_d = center.dot(face.normal);
        let diameter = ps.iter().map(|p| (center - p).magnitude()).fold(0.0, f64::max);
        ps.iter().any(|p| (p.dot(face.normal) - plane_d).abs() > diameter * TWIST_RATIO)
    }

    /// The two faces of an edge that may stay connected in the net.
    ///
    /// With more than two faces, the pair with the most parallel normals is chosen.
    pub fn main_faces(&self, i_edge: EdgeIndex) -> Option<(FaceIndex, FaceIndex)> {
        let faces = &self[i_edge].faces;
        match faces.len() {
            0 | 1 => None,
            2 => Some((faces[0], faces[1])),
            _ => {
                let mut best: Option<(f64, FaceIndex, FaceIndex)> = None;
                for (i, &fa) in faces.iter().enumerate() {
                    for &fb in &faces[i + 1..] {
                        let k = self[fa].normal.dot(self[fb].normal).abs();
                        if best.is_none_or(|(m, _, _)| k > m) {
                            best = Some((k, fa, fb));
                        }
                    }
                }
                best.map(|(_, fa, fb)| (fa, fb))
            }
        }
    }

    /// Signed dihedral angle between the main faces of an edge: positive is convex.
    ///
    /// `flips` are the `flipped` flags of both faces once unfolded, if known. Rim edges
    /// are given a straight angle.
    pub fn dihedral_angle(&self, i_edge: EdgeIndex, main_faces: Option<(FaceIndex, FaceIndex)>, flips: Option<(bool, bool)>) -> f64 {
        let Some((i_fa, i_fb)) = main_faces else {
            return PI;
        };
        let edge = &self[i_edge];
        let (fa, fb) = (&self[i_fa], &self[i_fb]);
        if fa.normal.magnitude2() == 0.0 || fb.normal.magnitude2() == 0.0 {
            // just a very sharp angle
            return -3.0;
        }
        let mut a_is_clockwise = walks_backward(fa, edge.va, edge.vb);
        let mut b_is_clockwise = walks_backward(fb, edge.va, edge.vb);
        let mut is_equal_flip = true;
        if let Some((flip_a, flip_b)) = flips {
            a_is_clockwise ^= flip_a;
            b_is_clockwise ^= flip_b;
            is_equal_flip = flip_a == flip_b;
        }
        let angle = fa.normal.angle(fb.normal).0;
        if a_is_clockwise != b_is_clockwise {
            let vector = self.edge_vector(i_edge);
            if (a_is_clockwise == (fb.normal.cross(fa.normal).dot(vector) > 0.0)) == is_equal_flip {
                angle
            } else {
                -angle
            }
        } else {
            // normals are inconsistent, so we know nothing: assume it is convex
            fa.normal.angle(-fb.normal).0
        }
    }
}

// The face goes vb -> va
fn walks_backward(face: &Face, va: VertexIndex, vb: VertexIndex) -> bool {
    let n = face.vertices.len();
    match (face.index_of(va), face.index_of(vb)) {
        (Some(ia), Some(ib)) => (ia + n - ib) % n == 1,
        _ => false,
    }
}

// The face goes va -> vb
fn walks_forward(face: &Face, va: VertexIndex, vb: VertexIndex) -> bool {
    walks_backward(face, vb, va)
}

impl std::ops::Index<VertexIndex> for Mesh {
    type Output = Vertex;

    fn index(&self, index: VertexIndex) -> &Vertex {
        &self.vertices[usize::from(index)]
    }
}

impl std::ops::Index<FaceIndex> for Mesh {
    type Output = Face;

    fn index(&self, index: FaceIndex) -> &Face {
        &self.faces[usize::from(index)]
    }
}

impl std::ops::Index<EdgeIndex> for Mesh {
    type Output = Edge;

    fn index(&self, index: EdgeIndex) -> &Edge {
        &self.edges[usize::from(index)]
    }
}

impl Vertex {
    pub fn pos(&self) -> Vector3 {
        self.pos
    }
    pub fn edges(&self) -> &[EdgeIndex] {
        &self.edges
    }
}

impl Edge {
    pub fn va(&self) -> VertexIndex {
        self.va
    }
    pub fn vb(&self) -> VertexIndex {
        self.vb
    }
    pub fn faces(&self) -> &[FaceIndex] {
        &self.faces
    }
    pub fn force_cut(&self) -> bool {
        self.force_cut
    }
}

impl Face {
    pub fn index_vertices(&self) -> &[VertexIndex] {
        &self.vertices
    }
    pub fn index_edges(&self) -> &[EdgeIndex] {
        &self.edges
    }
    /// Unit normal, or zero for degenerate faces.
    pub fn normal(&self) -> Vector3 {
        self.normal
    }
    pub fn area(&self) -> f64 {
        self.area
    }
    pub fn index_of(&self, v: VertexIndex) -> Option<usize> {
        self.vertices.iter().position(|&x| x == v)
    }
    pub fn vertices_with_edges(&self) -> impl Iterator<Item = (VertexIndex, VertexIndex, EdgeIndex)> + '_ {
        self.edges
            .iter()
            .copied()
            .enumerate()
            .map(|(i, e)| {
                let v0 = self.vertices[i];
                let v1 = self.vertices[(i + 1) % self.vertices.len()];
                (v0, v1, e)
            })
    }
}
