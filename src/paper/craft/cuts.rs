use cgmath::InnerSpace;
use log::{debug, info};

use crate::util_3d::Vector2;

use super::*;

impl Papercraft {
    /// Joins the islands greedily, lowest priority edges first.
    ///
    /// A join that fails is not tried again. Edges marked as forced cuts are never joined.
    pub fn generate_cuts(&mut self, size_limit: Option<Vector2>) -> Result<()> {
        let candidates: Vec<EdgeIndex> = self.model.edges()
            .filter(|(_, edge)| !edge.force_cut() && edge.faces().len() > 1)
            .map(|(i_edge, _)| i_edge)
            .collect();

        if !candidates.is_empty() {
            let average_length = candidates
                .iter()
                .map(|&i_edge| self.model.edge_vector(i_edge).magnitude())
                .sum::<f64>() / candidates.len() as f64;
            let effect = self.options.priority_effect;
            for &i_edge in &candidates {
                let length = self.model.edge_vector(i_edge).magnitude();
                let state = &mut self.edges[usize::from(i_edge)];
                state.priority = effect.priority(state.angle, length, average_length);
            }
        }

        let mut sorted = candidates;
        sorted.sort_by(|&a, &b| {
            let pa = self.edges[usize::from(a)].priority;
            let pb = self.edges[usize::from(b)].priority;
            pa.total_cmp(&pb)
        });

        let mut joins = 0;
        for i_edge in sorted {
            if self.model.edge_vector(i_edge).magnitude2() == 0.0 {
                continue;
            }
            let Some((fa, fb)) = self.edges[usize::from(i_edge)].main_faces else { continue };
            let mut island_a = self.islands.find(self.uv_face(fa).island);
            let mut island_b = self.islands.find(self.uv_face(fb).island);
            if island_a == island_b {
                continue;
            }
            if self.islands[island_b].faces.len() > self.islands[island_a].faces.len() {
                std::mem::swap(&mut island_a, &mut island_b);
            }
            if self.join(island_a, island_b, i_edge, size_limit)? {
                joins += 1;
            } else {
                debug!("Edge {i_edge} stays cut");
            }
        }

        self.sort_islands();
        info!("{} joins, {} islands", joins, self.islands.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util_3d::Vector3;

    // Two unit squares, folded 90 degrees along the x axis
    fn folded_pair() -> Mesh {
        let positions = vec![
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(1.0, 1.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(0.0, 0.0, -1.0),
            Vector3::new(1.0, 0.0, -1.0),
        ];
        Mesh::from_polygons(positions, &[vec![0, 1, 2, 3], vec![4, 5, 1, 0]]).unwrap()
    }

    #[test]
    fn joins_across_the_fold() {
        let mut pc = Papercraft::new(folded_pair(), PaperOptions::default());
        pc.generate_cuts(None).unwrap();
        assert_eq!(pc.num_islands(), 1);

        let shared = pc.model().edge_between(VertexIndex::from(0), VertexIndex::from(1)).unwrap();
        assert!(!pc.edge_state(shared).is_main_cut());
        let (key, island) = pc.islands().next().unwrap();
        assert_eq!(island.faces().len(), 2);
        assert_eq!(island.boundary().len(), 6);
        // the two copies of each shared vertex have been coalesced
        assert_eq!(island.vertices().len(), 6);
        assert!((pc.island_area(key) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn forced_cut_is_never_joined() {
        let mut mesh = folded_pair();
        mesh.set_force_cut(0, 1, true).unwrap();
        let mut options = PaperOptions::default();
        options.priority_effect = PriorityEffect {
            convex: -100.0,
            concave: -100.0,
            length: -100.0,
        };
        let mut pc = Papercraft::new(mesh, options);
        pc.generate_cuts(None).unwrap();
        assert_eq!(pc.num_islands(), 2);
        let shared = pc.model().edge_between(VertexIndex::from(0), VertexIndex::from(1)).unwrap();
        assert!(pc.edge_state(shared).is_main_cut());
    }

    #[test]
    fn size_limit_keeps_islands_apart() {
        let mut pc = Papercraft::new(folded_pair(), PaperOptions::default());
        pc.generate_cuts(Some(Vector2::new(1.5, 1.5))).unwrap();
        assert_eq!(pc.num_islands(), 2);
    }
}
