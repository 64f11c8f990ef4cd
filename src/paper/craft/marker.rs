use cgmath::InnerSpace;

use crate::util_3d::{Matrix2, Vector2};

use super::*;

/// Something drawn on an island to help assembling it.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub(super) center: Vector2,
    pub(super) rot: Matrix2,
    pub(super) text: Option<String>,
    pub(super) kind: MarkerKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MarkerKind {
    /// A glue tab, attached to an uvedge.
    ///
    /// The first and last vertices are the ends of the uvedge.
    Sticker {
        uvedge: UvEdgeIndex,
        width: f64,
        vertices: Vec<Vector2>,
    },
    /// Points to the edge that the numbered stickers go to.
    Arrow {
        size: f64,
    },
    /// An edge number, for nets without stickers.
    NumberAlone {
        size: f64,
    },
}

impl Marker {
    pub fn center(&self) -> Vector2 {
        self.center
    }
    pub fn rot(&self) -> Matrix2 {
        self.rot
    }
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
    pub fn kind(&self) -> &MarkerKind {
        &self.kind
    }
    /// Points that the island has to make room for.
    pub fn bounds(&self) -> Vec<Vector2> {
        match &self.kind {
            MarkerKind::Sticker { vertices, .. } => {
                let mut bounds = vertices[1 .. vertices.len() - 1].to_vec();
                bounds.push(self.center);
                bounds
            }
            MarkerKind::Arrow { size } => vec![
                self.center,
                self.center + self.rot * Vector2::new(1.0, -1.2) * *size,
                self.center + self.rot * Vector2::new(-1.0, -1.2) * *size,
            ],
            MarkerKind::NumberAlone { .. } => vec![self.center],
        }
    }
    // Rotates around the island origin, then moves
    pub(super) fn transform(&mut self, rot: Matrix2, offset: Vector2) {
        self.center = rot * self.center + offset;
        self.rot = rot * self.rot;
        if let MarkerKind::Sticker { vertices, .. } = &mut self.kind {
            for v in vertices {
                *v = rot * *v + offset;
            }
        }
    }
}

/// Whether the text reads as something else when turned upside down.
pub fn is_upsidedown_wrong(text: &str) -> bool {
    const MISTAKABLE: &str = "69NZMWpbqd";
    const ROTATABLE: &str = "80oOxXIl";
    text.chars().all(|c| MISTAKABLE.contains(c) || ROTATABLE.contains(c))
        && text.chars().any(|c| MISTAKABLE.contains(c))
}

// Rotation that takes the x axis onto `v`
fn rotation_to(v: Vector2) -> Matrix2 {
    let len = v.magnitude();
    let (cos, sin) = (v.x / len, v.y / len);
    Matrix2::new(cos, sin, -sin, cos)
}

impl Papercraft {
    // How much room the face of an uvedge has for a sticker
    fn sticker_priority(&self, i_uvedge: UvEdgeIndex) -> f64 {
        let face = self.uv_edge(i_uvedge).face;
        let ps = self.face_polygon(face);
        let perimeter: f64 = ps
            .iter()
            .enumerate()
            .map(|(i, p)| (ps[(i + 1) % ps.len()] - p).magnitude())
            .sum();
        self.model[face].area() / perimeter
    }

    fn other_uvedge(&self, i_uvedge: UvEdgeIndex) -> UvEdgeIndex {
        let uvedges = &self.edges[usize::from(self.uv_edge(i_uvedge).edge)].uvedges;
        if uvedges[0] == i_uvedge { uvedges[1] } else { uvedges[0] }
    }

    /// Adds a sticker to every cut edge, and arrows with numbers where the matching
    /// pieces are not obvious.
    pub fn generate_stickers(&mut self, default_width: f64, create_numbers: bool) {
        for i in 0 .. self.edges.len() {
            let i_edge = EdgeIndex::from(i);
            let uvedges = self.edges[i].uvedges.clone();
            let mut index = None;
            let mut target = None;
            if self.edges[i].is_main_cut && uvedges.len() >= 2 && self.model.edge_vector(i_edge).magnitude2() > 0.0 {
                let (mut uvedge_a, mut uvedge_b) = (uvedges[0], uvedges[1]);
                if self.sticker_priority(uvedge_a) < self.sticker_priority(uvedge_b) {
                    std::mem::swap(&mut uvedge_a, &mut uvedge_b);
                }
                let target_island = self.uv_edge(uvedge_a).island;
                if create_numbers {
                    let (left_edge, right_edge) = self.neighbor_edges(uvedge_a);
                    let a = self.uv_edge(uvedge_a);
                    let unclear = std::iter::once(uvedge_b).chain(uvedges[2 ..].iter().copied()).any(|e| {
                        let (e_left, e_right) = self.neighbor_edges(e);
                        (e_left != right_edge || e_right != left_edge)
                            && Some(e) != a.neighbor_left
                            && Some(e) != a.neighbor_right
                    });
                    if unclear {
                        // numbers and an arrow, the pieces to stick are not next to each other
                        let island = &mut self.islands[target_island];
                        island.sticker_numbering += 1;
                        let mut text = island.sticker_numbering.to_string();
                        if is_upsidedown_wrong(&text) {
                            text.push('.');
                        }
                        let arrow = self.arrow(uvedge_a, default_width, text.clone());
                        self.islands[target_island].markers.push(arrow);
                        index = Some(text);
                    }
                }
                target = Some(target_island);
                self.add_sticker(uvedge_b, default_width, index.as_deref(), target_island);
            } else if uvedges.len() > 2 {
                target = Some(self.uv_edge(uvedges[0]).island);
            }
            if let Some(target_island) = target {
                for &i_uvedge in uvedges.iter().skip(2) {
                    self.add_sticker(i_uvedge, default_width, index.as_deref(), target_island);
                }
            }
        }
    }

    /// Numbers every cut edge on all its sides, without stickers.
    pub fn generate_numbers_alone(&mut self, size: f64) {
        let mut numbering = 0;
        for i in 0 .. self.edges.len() {
            if !self.edges[i].is_main_cut || self.edges[i].uvedges.len() < 2 {
                continue;
            }
            numbering += 1;
            let mut text = numbering.to_string();
            if is_upsidedown_wrong(&text) {
                text.push('.');
            }
            for i_uvedge in self.edges[i].uvedges.clone() {
                let uvedge = self.uv_edge(i_uvedge);
                let (va, vb) = (self.uv_vertex(uvedge.va).co, self.uv_vertex(uvedge.vb).co);
                let edge = if self.uvedge_flipped(i_uvedge) { vb - va } else { va - vb };
                let rot = rotation_to(edge);
                let marker = Marker {
                    center: (va + vb) / 2.0 - rot * Vector2::new(0.0, 1.2 * size),
                    rot,
                    text: Some(text.clone()),
                    kind: MarkerKind::NumberAlone { size },
                };
                let island = uvedge.island;
                self.islands[island].markers.push(marker);
            }
        }
    }

    fn arrow(&self, i_uvedge: UvEdgeIndex, size: f64, text: String) -> Marker {
        let uvedge = self.uv_edge(i_uvedge);
        let (va, vb) = (self.uv_vertex(uvedge.va).co, self.uv_vertex(uvedge.vb).co);
        let edge = if self.uvedge_flipped(i_uvedge) { va - vb } else { vb - va };
        Marker {
            center: (va + vb) / 2.0,
            rot: rotation_to(edge),
            text: Some(text),
            kind: MarkerKind::Arrow { size },
        }
    }

    fn add_sticker(&mut self, i_uvedge: UvEdgeIndex, default_width: f64, index: Option<&str>, target_island: IslandKey) {
        let marker = self.sticker(i_uvedge, default_width, index, target_island);
        let island_key = self.uv_edge(i_uvedge).island;
        let island = &mut self.islands[island_key];
        island.markers.push(marker);
        self.uv_edges[usize::from(i_uvedge)].sticker = Some(island.markers.len() - 1);
    }

    // A trapezoid on the outer side of the uvedge, narrowed so that it does not cover
    // its sticking target when both are next to each other
    fn sticker(&self, i_uvedge: UvEdgeIndex, default_width: f64, index: Option<&str>, target_island: IslandKey) -> Marker {
        let co = |v: UvVertexIndex| self.uv_vertex(v).co;
        let uvedge = self.uv_edge(i_uvedge);
        let (first, second) = if self.uvedge_flipped(i_uvedge) {
            (uvedge.vb, uvedge.va)
        } else {
            (uvedge.va, uvedge.vb)
        };
        let edge = co(first) - co(second);
        let edge_len = edge.magnitude();
        let sticker_width = default_width.min(edge_len / 2.0);

        let i_other = self.other_uvedge(i_uvedge);
        let other = self.uv_edge(i_other);
        let (other_first, other_second) = if self.uvedge_flipped(i_other) {
            (other.vb, other.va)
        } else {
            (other.va, other.vb)
        };
        let other_edge = co(other_second) - co(other_first);

        // angle a is at the first vertex, b at the second one
        let (mut cos_a, mut cos_b): (f64, f64) = (0.5, 0.5);
        let (mut sin_a, mut sin_b) = (0.75_f64.sqrt(), 0.75_f64.sqrt());
        let mut len_a = sticker_width / sin_a;

        if first == other_second {
            cos_a = cos_a.max(edge.dot(other_edge) / edge_len.powi(2));
        } else if second == other_first {
            cos_b = cos_b.max(edge.dot(other_edge) / edge_len.powi(2));
        }

        // small angles of the target face
        let other_face = self.uv_face(other.face);
        let n = other_face.edges.len();
        let other_idx = other_face.edges.iter().position(|&e| e == i_other).unwrap_or(0);
        let face_left = self.uv_edge(other_face.edges[(other_idx + 1) % n]);
        let face_right = self.uv_edge(other_face.edges[(other_idx + n - 1) % n]);
        let neighbor_a = co(face_left.vb) - co(other.vb);
        let neighbor_b = co(face_right.va) - co(other.va);
        cos_a = cos_a.max((-other_edge).dot(neighbor_a) / (other_edge.magnitude() * neighbor_a.magnitude()));
        cos_b = cos_b.max(other_edge.dot(neighbor_b) / (other_edge.magnitude() * neighbor_b.magnitude()));

        sin_a = (1.0 - cos_a * cos_a).abs().sqrt();
        let mut len_b = len_a.min((edge_len * sin_a) / (sin_a * cos_b + sin_b * cos_a));
        len_a = if sin_a == 0.0 {
            0.0
        } else {
            (sticker_width / sin_a).min((edge_len - len_b * cos_b) / cos_a)
        };
        sin_b = (1.0 - cos_b * cos_b).abs().sqrt();
        len_a = len_a.min((edge_len * sin_b) / (sin_a * cos_b + sin_b * cos_a));
        len_b = if sin_b == 0.0 {
            0.0
        } else {
            (sticker_width / sin_b).min((edge_len - len_a * cos_a) / cos_b)
        };

        let v3 = co(second) + Matrix2::new(cos_b, sin_b, -sin_b, cos_b) * edge * (len_b / edge_len);
        let v4 = co(first) + Matrix2::new(-cos_a, sin_a, -sin_a, -cos_a) * edge * (len_a / edge_len);
        let vertices = if v3 != v4 {
            vec![co(second), v3, v4, co(first)]
        } else {
            vec![co(second), v3, co(first)]
        };

        let rot = rotation_to(edge);
        let width = sticker_width * 0.9;
        let text = index.map(|index| {
            if target_island != uvedge.island {
                format!("{}:{}", self.islands[target_island].abbreviation, index)
            } else {
                index.to_owned()
            }
        });
        Marker {
            center: (co(uvedge.va) + co(uvedge.vb)) / 2.0 + rot * Vector2::new(0.0, width * 0.2),
            rot,
            text,
            kind: MarkerKind::Sticker {
                uvedge: i_uvedge,
                width,
                vertices,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util_3d::{self, Vector3};

    #[test]
    fn upside_down_labels() {
        assert!(is_upsidedown_wrong("6"));
        assert!(is_upsidedown_wrong("9"));
        assert!(!is_upsidedown_wrong("16"));
        assert!(is_upsidedown_wrong("69"));
        assert!(is_upsidedown_wrong("86"));
        assert!(!is_upsidedown_wrong("8"));
        assert!(!is_upsidedown_wrong("10"));
        assert!(!is_upsidedown_wrong(""));
    }

    #[test]
    fn arrow_bounds_follow_rotation() {
        let mut m = Marker {
            center: Vector2::new(1.0, 1.0),
            rot: Matrix2::new(1.0, 0.0, 0.0, 1.0),
            text: Some("1".into()),
            kind: MarkerKind::Arrow { size: 1.0 },
        };
        let b = m.bounds();
        assert_eq!(b[1], Vector2::new(2.0, -0.2));
        assert_eq!(b[2], Vector2::new(0.0, -0.2));

        // a quarter turn
        m.transform(Matrix2::new(0.0, 1.0, -1.0, 0.0), Vector2::new(0.0, 0.0));
        let b = m.bounds();
        assert!((b[0] - Vector2::new(-1.0, 1.0)).magnitude() < 1e-12);
        assert!((b[1] - Vector2::new(0.2, 2.0)).magnitude() < 1e-12);
    }

    // A tetrahedron has no pair of faces that can be flattened without a cut
    fn tetrahedron() -> Mesh {
        let positions = vec![
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
        ];
        Mesh::from_polygons(positions, &[vec![0, 2, 1], vec![0, 1, 3], vec![1, 2, 3], vec![0, 3, 2]]).unwrap()
    }

    fn unfolded_tetrahedron() -> Papercraft {
        let mut pc = Papercraft::new(tetrahedron(), PaperOptions::default());
        pc.generate_cuts(None).unwrap();
        pc.finalize_topology();
        pc.enumerate_islands();
        pc
    }

    #[test]
    fn one_sticker_per_cut() {
        let mut pc = unfolded_tetrahedron();
        pc.generate_stickers(0.1, true);

        let cuts = pc.edges.iter().filter(|e| e.is_main_cut() && e.uvedges().len() >= 2).count();
        assert!(cuts > 0);
        let mut stickers = 0;
        for (_, island) in pc.islands() {
            for marker in island.markers() {
                if let MarkerKind::Sticker { uvedge, vertices, width } = marker.kind() {
                    stickers += 1;
                    assert!(*width > 0.0);
                    assert_eq!(pc.uv_edge(*uvedge).sticker().map(|i| &island.markers()[i]), Some(marker));
                    // the tab goes outside the face
                    let i_face = pc.uv_edge(*uvedge).face();
                    let face_area = util_3d::polygon_area(&pc.face_polygon(i_face));
                    assert!(util_3d::polygon_area(vertices) * face_area <= 0.0);
                }
            }
        }
        assert_eq!(stickers, cuts);
    }

    #[test]
    fn numbers_alone_on_both_sides() {
        let mut pc = unfolded_tetrahedron();
        pc.generate_numbers_alone(0.1);

        let cuts = pc.edges.iter().filter(|e| e.is_main_cut() && e.uvedges().len() >= 2).count();
        let numbers: Vec<&str> = pc.islands()
            .flat_map(|(_, island)| island.markers())
            .filter_map(|m| m.text())
            .collect();
        assert_eq!(numbers.len(), 2 * cuts);
        // "6" and "9" would be mistaken for each other
        assert!(!numbers.contains(&"6"));
    }
}
