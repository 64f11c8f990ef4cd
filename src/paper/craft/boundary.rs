use std::cmp::Ordering;
use std::collections::hash_map::Entry;

use cgmath::InnerSpace;
use fxhash::{FxHashMap, FxHashSet};

use crate::util_3d::Vector2;

use super::*;

// Monotonic with the angle of `v`, going clockwise from the negative x axis
fn direction_to_float(v: Vector2) -> f64 {
    let len = v.magnitude();
    if v.y > 0.0 {
        1.0 - v.x / len
    } else {
        v.x / len - 1.0
    }
}

impl Papercraft {
    /// Settles everything that depends on the final cuts: the angles of edges with
    /// flipped faces, the order of the uvedges, inside-out islands and the linked boundaries.
    pub fn finalize_topology(&mut self) {
        for i in 0 .. self.edges.len() {
            let Some((fa, fb)) = self.edges[i].main_faces else { continue };
            let flips = (self.uv_faces[usize::from(fa)].flipped, self.uv_faces[usize::from(fb)].flipped);
            if flips.0 || flips.1 {
                self.edges[i].angle = self.model.dihedral_angle(EdgeIndex::from(i), Some((fa, fb)), Some(flips));
            }

            let mut reordered = vec![None, None];
            for &i_uvedge in &self.edges[i].uvedges {
                let face = self.uv_edges[usize::from(i_uvedge)].face;
                if face == fa {
                    reordered[0] = Some(i_uvedge);
                } else if face == fb {
                    reordered[1] = Some(i_uvedge);
                } else {
                    reordered.push(Some(i_uvedge));
                }
            }
            self.edges[i].uvedges = reordered.into_iter().flatten().collect();
        }

        for key in self.island_order.clone() {
            if self.islands[key].faces.iter().any(|&f| self.uv_face(f).flipped) {
                let balance = self.joined_angle_balance(key);
                self.islands[key].is_inside_out = balance < 0;
            }
            self.link_boundary(key);
        }
    }

    // +1 for every convex joined edge, -1 for every other one
    fn joined_angle_balance(&self, key: IslandKey) -> i32 {
        let joined: FxHashSet<EdgeIndex> = self.islands[key].edges
            .iter()
            .map(|&e| self.uv_edge(e))
            .filter(|uvedge| !self.edges[usize::from(uvedge.edge)].is_cut(uvedge.face))
            .map(|uvedge| uvedge.edge)
            .collect();
        joined
            .iter()
            .map(|&e| if self.edges[usize::from(e)].angle > 0.0 { 1 } else { -1 })
            .sum()
    }

    // Start and end of an uvedge, walking its face forward
    fn uvedge_ends(&self, i_uvedge: UvEdgeIndex) -> (UvVertexIndex, UvVertexIndex) {
        let uvedge = self.uv_edge(i_uvedge);
        if self.uvedge_flipped(i_uvedge) {
            (uvedge.vb, uvedge.va)
        } else {
            (uvedge.va, uvedge.vb)
        }
    }

    /// Links the boundary of an island into a cycle, `neighbor_right` being the uvedge
    /// that ends where this one starts.
    ///
    /// Where several pieces of the boundary touch at a single vertex, the uvedges are
    /// paired by the direction they leave that vertex.
    fn link_boundary(&mut self, key: IslandKey) {
        let boundary = self.islands[key].boundary.clone();

        let mut neighbor_lookup: FxHashMap<UvVertexIndex, UvEdgeIndex> = FxHashMap::default();
        let mut conflicts: FxHashMap<UvVertexIndex, Vec<UvEdgeIndex>> = FxHashMap::default();
        for &i_uvedge in &boundary {
            let (_, end) = self.uvedge_ends(i_uvedge);
            match neighbor_lookup.entry(end) {
                Entry::Vacant(e) => {
                    e.insert(i_uvedge);
                }
                Entry::Occupied(e) => {
                    conflicts.entry(end).or_insert_with(|| vec![*e.get()]).push(i_uvedge);
                }
            }
        }

        let mut links = Vec::with_capacity(boundary.len());
        for &i_uvedge in &boundary {
            let (start, _) = self.uvedge_ends(i_uvedge);
            match conflicts.get_mut(&start) {
                Some(site) => site.push(i_uvedge),
                // an unpaired vertex links the uvedge to itself
                None => links.push((i_uvedge, neighbor_lookup.get(&start).copied().unwrap_or(i_uvedge))),
            }
        }

        for (v, mut site) in conflicts {
            let is_inwards = |e: UvEdgeIndex| self.uvedge_flipped(e) == (self.uv_edge(e).va == v);
            let sort_key = |e: UvEdgeIndex| {
                let (va, vb) = (self.uv_vertex(self.uv_edge(e).va).co, self.uv_vertex(self.uv_edge(e).vb).co);
                if is_inwards(e) {
                    direction_to_float(va - vb)
                } else {
                    direction_to_float(vb - va)
                }
            };
            site.sort_by(|&a, &b| sort_key(a).partial_cmp(&sort_key(b)).unwrap_or(Ordering::Equal));
            let Some(&first) = site.first() else { continue };
            if is_inwards(first) {
                for pair in site.chunks_exact(2) {
                    links.push((pair[1], pair[0]));
                }
            } else {
                let rights = site.last().into_iter().chain(site.iter().skip(1).step_by(2));
                let lefts = site[.. site.len() - 1].iter().step_by(2);
                for (&right, &left) in rights.zip(lefts) {
                    links.push((left, right));
                }
            }
        }

        for (left, right) in links {
            self.uv_edges[usize::from(left)].neighbor_right = Some(right);
            self.uv_edges[usize::from(right)].neighbor_left = Some(left);
        }
    }
}
