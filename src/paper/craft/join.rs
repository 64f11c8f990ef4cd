use std::cmp::Ordering;

use cgmath::InnerSpace;
use fxhash::{FxHashMap, FxHashSet};
use log::debug;

use crate::util_3d::{Matrix2, Vector2, bounding_box_2d, fitting_matrix, lex_lt, point_key};

use super::sweep::{self, BruteSweepline, QuickSweepline, Segment, SweepError};
use super::*;

// Everything a join changes, computed without touching any island
struct JoinPlan {
    target: IslandKey,
    source: IslandKey,
    flipped: bool,
    // new positions of the source vertices
    phantoms: FxHashMap<UvVertexIndex, Vector2>,
    // coalesced vertex -> the target vertex that replaces it
    merged_vertices: FxHashMap<UvVertexIndex, UvVertexIndex>,
    is_merged_mine: bool,
    merged_uvedges: FxHashSet<UvEdgeIndex>,
    merged_pairs: Vec<(UvEdgeIndex, UvEdgeIndex)>,
    has_safe_geometry: bool,
}

impl JoinPlan {
    fn resolve(&self, v: UvVertexIndex) -> UvVertexIndex {
        self.merged_vertices.get(&v).copied().unwrap_or(v)
    }
}

impl Papercraft {
    /// Tries to join the `source` island into `target` along `i_edge`.
    ///
    /// Returns `Ok(false)`, with both islands untouched, if the result would overlap itself
    /// or not fit into `size_limit`.
    pub fn join(&mut self, target: IslandKey, source: IslandKey, i_edge: EdgeIndex, size_limit: Option<Vector2>) -> Result<bool> {
        let target = self.islands.find(target);
        let source = self.islands.find(source);
        if target == source || !self.islands.contains(target) || !self.islands.contains(source) {
            return Ok(false);
        }
        match self.plan_join(target, source, i_edge, size_limit)? {
            Some(plan) => {
                self.commit_join(plan);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn plan_join(&self, target: IslandKey, source: IslandKey, i_edge: EdgeIndex, size_limit: Option<Vector2>) -> Result<Option<JoinPlan>> {
        let state = &self.edges[usize::from(i_edge)];
        let Some((mf0, mf1)) = state.main_faces else { return Ok(None) };
        let island_t = &self.islands[target];
        let island_s = &self.islands[source];

        // find the edge in both islands
        let mut uvedge_a = None;
        let mut uvedge_b = None;
        for &i_uvedge in &state.uvedges {
            let uvedge = self.uv_edge(i_uvedge);
            if uvedge.face != mf0 && uvedge.face != mf1 {
                continue;
            }
            if uvedge.island == target && uvedge.on_boundary {
                uvedge_a = Some(i_uvedge);
            } else if uvedge.island == source && uvedge.on_boundary {
                uvedge_b = Some(i_uvedge);
            } else {
                return Ok(None);
            }
        }
        let (Some(i_uvedge_a), Some(i_uvedge_b)) = (uvedge_a, uvedge_b) else { return Ok(None) };
        let uvedge_a = self.uv_edge(i_uvedge_a);
        let uvedge_b = self.uv_edge(i_uvedge_b);

        let co = |v: UvVertexIndex| self.uv_vertex(v).co;

        // check if vertices and normals are aligned correctly
        let verts_flipped = self.uv_vertex(uvedge_b.va).vertex == self.uv_vertex(uvedge_a.va).vertex;
        let flipped = verts_flipped ^ self.uv_face(uvedge_a.face).flipped ^ self.uv_face(uvedge_b.face).flipped;

        // if the edges differ in length (twisted polygons) the matrix also scales
        let (first_b, second_b) = if verts_flipped {
            (uvedge_b.vb, uvedge_b.va)
        } else {
            (uvedge_b.va, uvedge_b.vb)
        };
        let target_vector = co(uvedge_a.vb) - co(uvedge_a.va);
        let rot = if flipped {
            let flip = Matrix2::new(-1.0, 0.0, 0.0, 1.0);
            fitting_matrix(flip * (co(first_b) - co(second_b)), target_vector) * flip
        } else {
            fitting_matrix(co(first_b) - co(second_b), target_vector)
        };
        let trans = co(uvedge_a.vb) - rot * co(first_b);
        let phantoms: FxHashMap<UvVertexIndex, Vector2> = island_s.vertices
            .iter()
            .map(|&v| (v, rot * co(v) + trans))
            .collect();
        let pos = |v: UvVertexIndex| phantoms.get(&v).copied().unwrap_or_else(|| co(v));

        if let Some(limit) = size_limit {
            let points = island_t.boundary
                .iter()
                .flat_map(|&e| {
                    let uvedge = self.uv_edge(e);
                    [co(uvedge.va), co(uvedge.vb)]
                })
                .chain(phantoms.values().copied());
            let (bb_min, bb_max) = bounding_box_2d(points);
            let (w, h) = (bb_max.x - bb_min.x, bb_max.y - bb_min.y);
            if w.min(h).powi(2) > limit.magnitude2() {
                return Ok(None);
            }
            if (w > limit.x || h > limit.y) && (h > limit.x || w > limit.y) {
                // it would not fit turned either
                return Ok(None);
            }
        }

        // coalesce the uv vertices of the same mesh vertex that end up close enough,
        // always into a vertex of the target island
        let distance_limit = self.model.edge_vector(i_edge).magnitude2() * self.options.vertex_epsilon;
        let mut merged_vertices = FxHashMap::default();
        let mut is_merged_mine = false;
        let mut shared: Vec<VertexIndex> = island_t.uvverts_by_id
            .keys()
            .filter(|id| island_s.uvverts_by_id.contains_key(id))
            .copied()
            .collect();
        shared.sort();
        for id in shared {
            let mine = &island_t.uvverts_by_id[&id];
            let theirs = &island_s.uvverts_by_id[&id];
            let uvs: Vec<UvVertexIndex> = mine.iter().chain(theirs).copied().collect();
            let len_mine = mine.len();

            let mut parent: Vec<usize> = (0 .. uvs.len()).collect();
            for i in 0 .. len_mine {
                for j in i + 1 .. uvs.len() {
                    let ri = root_find(&mut parent, i);
                    let rj = root_find(&mut parent, j);
                    if ri == rj {
                        continue;
                    }
                    if (pos(uvs[i]) - pos(uvs[j])).magnitude2() < distance_limit {
                        let (lo, hi) = if ri < rj { (ri, rj) } else { (rj, ri) };
                        parent[hi] = lo;
                    }
                }
            }
            for k in 0 .. uvs.len() {
                let root = root_find(&mut parent, k);
                if root != k {
                    merged_vertices.insert(uvs[k], uvs[root]);
                    is_merged_mine |= k < len_mine;
                }
            }
        }

        let resolve = |v: UvVertexIndex| merged_vertices.get(&v).copied().unwrap_or(v);
        // winding of an uvedge once the join is done
        let flip_after = |e: &UvEdge| self.uv_face(e.face).flipped ^ (flipped && e.island == source);

        // find the uvedges that will be glued together
        let mut merged_uvedges = FxHashSet::default();
        let mut merged_pairs = Vec::new();
        let candidates: Vec<UvEdgeIndex> = if is_merged_mine {
            island_t.boundary.iter().chain(&island_s.boundary).copied().collect()
        } else {
            island_s.boundary.clone()
        };
        for i_uvedge in candidates {
            let uvedge = self.uv_edge(i_uvedge);
            for &i_partner in &self.edges[usize::from(uvedge.edge)].uvedges {
                if i_partner == i_uvedge {
                    continue;
                }
                let partner = self.uv_edge(i_partner);
                let (mut paired_a, mut paired_b) = (resolve(partner.vb), resolve(partner.va));
                if flip_after(partner) != flip_after(uvedge) {
                    std::mem::swap(&mut paired_a, &mut paired_b);
                }
                if resolve(uvedge.va) == paired_a && resolve(uvedge.vb) == paired_b {
                    merged_uvedges.insert(i_uvedge);
                    merged_uvedges.insert(i_partner);
                    merged_pairs.push((i_uvedge, i_partner));
                    break;
                }
            }
        }
        if !merged_uvedges.contains(&i_uvedge_b) {
            return Err(UnfoldError::Internal(format!("edge {i_edge} was not glued while joining its islands")));
        }

        let mut segments = Vec::with_capacity(island_t.boundary.len() + island_s.boundary.len());
        for &i_uvedge in &island_s.boundary {
            if merged_uvedges.contains(&i_uvedge) {
                continue;
            }
            let uvedge = self.uv_edge(i_uvedge);
            let (mut va, mut vb) = (resolve(uvedge.va), resolve(uvedge.vb));
            if flipped ^ self.uv_face(uvedge.face).flipped {
                std::mem::swap(&mut va, &mut vb);
            }
            let (pa, pb) = (pos(va), pos(vb));
            segments.push(Segment::new((va, pa), (vb, pb), lex_lt(&pa, &pb), true, false));
        }
        for &i_uvedge in &island_t.boundary {
            let uvedge = self.uv_edge(i_uvedge);
            let (pa, pb) = (co(uvedge.va), co(uvedge.vb));
            let upwards = lex_lt(&pa, &pb) ^ self.uv_face(uvedge.face).flipped;
            segments.push(Segment::new((uvedge.va, pa), (uvedge.vb, pb), upwards, false, merged_uvedges.contains(&i_uvedge)));
        }

        if !fans_are_consistent(&segments, island_t, island_s, &co, &pos, &resolve, &merged_vertices) {
            debug!("Edge {i_edge}: winding conflict around a shared vertex");
            return Ok(None);
        }

        // check for self-intersections
        let both_safe = island_t.has_safe_geometry && island_s.has_safe_geometry;
        let swept = if self.options.quick_sweepline && both_safe {
            match sweep::sweep(&mut QuickSweepline::default(), &segments) {
                Err(SweepError::Geometry) => {
                    debug!("Edge {i_edge}: ambiguous geometry, sweeping again with the robust sweepline");
                    sweep::sweep(&mut BruteSweepline::default(), &segments).map(|()| false)
                }
                res => res.map(|()| true),
            }
        } else {
            sweep::sweep(&mut BruteSweepline::default(), &segments).map(|()| both_safe)
        };
        let has_safe_geometry = match swept {
            Ok(safe) => safe,
            Err(_) => {
                debug!("Edge {i_edge}: the islands would overlap");
                return Ok(None);
            }
        };

        Ok(Some(JoinPlan {
            target,
            source,
            flipped,
            phantoms,
            merged_vertices,
            is_merged_mine,
            merged_uvedges,
            merged_pairs,
            has_safe_geometry,
        }))
    }

    fn commit_join(&mut self, plan: JoinPlan) {
        let Some(source) = self.islands.absorb(plan.target, plan.source) else { return };

        for &i_uvedge in &plan.merged_uvedges {
            let uvedge = &mut self.uv_edges[usize::from(i_uvedge)];
            uvedge.on_boundary = false;
            self.edges[usize::from(uvedge.edge)].is_main_cut = false;
        }
        for (&v, &co) in &plan.phantoms {
            self.uv_vertices[usize::from(v)].co = co;
        }

        for &i_uvedge in &source.edges {
            let uvedge = &mut self.uv_edges[usize::from(i_uvedge)];
            uvedge.island = plan.target;
            uvedge.va = plan.resolve(uvedge.va);
            uvedge.vb = plan.resolve(uvedge.vb);
        }
        for &i_face in &source.faces {
            let uvface = &mut self.uv_faces[usize::from(i_face)];
            uvface.island = plan.target;
            for v in &mut uvface.vertices {
                *v = plan.resolve(*v);
            }
            uvface.flipped ^= plan.flipped;
        }

        let island = &mut self.islands[plan.target];
        if plan.is_merged_mine {
            for &i_uvedge in &island.edges {
                let uvedge = &mut self.uv_edges[usize::from(i_uvedge)];
                uvedge.va = plan.resolve(uvedge.va);
                uvedge.vb = plan.resolve(uvedge.vb);
            }
            for &i_face in &island.faces {
                for v in &mut self.uv_faces[usize::from(i_face)].vertices {
                    *v = plan.resolve(*v);
                }
            }
        }

        if plan.is_merged_mine {
            island.vertices.retain(|v| !plan.merged_vertices.contains_key(v));
        }
        island.vertices.extend(source.vertices.iter().filter(|&&v| !plan.merged_vertices.contains_key(&v)));
        // only the coalesced vertices leave the lookup
        for &v in plan.merged_vertices.keys() {
            let id = self.uv_vertices[usize::from(v)].vertex;
            if let Some(vs) = island.uvverts_by_id.get_mut(&id) {
                vs.retain(|&x| x != v);
            }
        }
        for (&id, vs) in &source.uvverts_by_id {
            island.uvverts_by_id
                .entry(id)
                .or_default()
                .extend(vs.iter().filter(|&&v| !plan.merged_vertices.contains_key(&v)));
        }
        island.faces.extend(&source.faces);
        island.edges.extend(&source.edges);
        island.boundary = island.boundary
            .iter()
            .chain(&source.boundary)
            .copied()
            .filter(|e| !plan.merged_uvedges.contains(e))
            .collect();
        island.has_safe_geometry = plan.has_safe_geometry;

        // the faces actually glued become the main faces
        for &(i_uvedge, i_partner) in &plan.merged_pairs {
            let face_a = self.uv_edges[usize::from(i_uvedge)].face;
            let face_b = self.uv_edges[usize::from(i_partner)].face;
            let i_edge = self.uv_edges[usize::from(i_uvedge)].edge;
            self.edges[usize::from(i_edge)].main_faces = Some((face_a, face_b));
        }
    }
}

fn root_find(parent: &mut [usize], mut i: usize) -> usize {
    let mut root = i;
    while parent[root] != root {
        root = parent[root];
    }
    while parent[i] != root {
        i = std::mem::replace(&mut parent[i], root);
    }
    root
}

// Around a vertex where more than two boundary segments meet, the insides and the
// outsides must alternate
fn fans_are_consistent(
    segments: &[Segment],
    island_t: &Island,
    island_s: &Island,
    co: &impl Fn(UvVertexIndex) -> Vector2,
    pos: &impl Fn(UvVertexIndex) -> Vector2,
    resolve: &impl Fn(UvVertexIndex) -> UvVertexIndex,
    merged_vertices: &FxHashMap<UvVertexIndex, UvVertexIndex>,
) -> bool {
    let own: FxHashSet<(u64, u64)> = island_t.vertices.iter().map(|&v| point_key(&co(v))).collect();
    let mut incidence: FxHashMap<(u64, u64), Vec<usize>> = island_s.vertices
        .iter()
        .map(|&v| pos(resolve(v)))
        .chain(merged_vertices.values().map(|&v| pos(v)))
        .map(|p| point_key(&p))
        .filter(|key| own.contains(key))
        .map(|key| (key, Vec::new()))
        .collect();
    for (i_seg, seg) in segments.iter().enumerate() {
        if seg.va == seg.vb {
            continue;
        }
        for p in [seg.va, seg.vb] {
            if let Some(site) = incidence.get_mut(&point_key(&p)) {
                site.push(i_seg);
            }
        }
    }

    for (key, site) in &mut incidence {
        if site.len() <= 2 {
            continue;
        }
        let slope = |seg: &Segment| {
            let vec = if point_key(&seg.va) == *key { seg.vb - seg.va } else { seg.va - seg.vb };
            let len = vec.magnitude();
            if vec.x > 0.0 || (vec.x == 0.0 && vec.y > 0.0) {
                vec.y / len + 1.0
            } else {
                -1.0 - vec.y / len
            }
        };
        site.sort_by(|&a, &b| slope(&segments[a]).partial_cmp(&slope(&segments[b])).unwrap_or(Ordering::Equal));
        for (k, &i_right) in site.iter().enumerate() {
            let right = &segments[i_right];
            let left = &segments[site[(k + 1) % site.len()]];
            let is_left_ccw = left.upwards ^ (point_key(&left.max) == *key);
            let is_right_ccw = right.upwards ^ (point_key(&right.max) == *key);
            if is_right_ccw && !is_left_ccw && right.phantom != left.phantom && !right.merged && !left.merged {
                return false;
            }
            if (!is_right_ccw && !right.merged) ^ (is_left_ccw && !left.merged) {
                return false;
            }
        }
    }
    true
}
