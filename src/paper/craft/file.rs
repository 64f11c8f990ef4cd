use std::io::Write;

use anyhow::Result;
use fxhash::FxHashSet;
use serde::Serialize;

use crate::util_3d::{Matrix2, Vector2};

use super::*;

/// Everything a renderer needs to draw the net, in page millimeters with the y axis up.
#[derive(Debug, Clone, Serialize)]
pub struct NetDocument {
    pub page_size: [f64; 2],
    pub margin: f64,
    pub title_height: f64,
    pub pages: Vec<NetPage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NetPage {
    pub index: usize,
    pub islands: Vec<NetIsland>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NetIsland {
    pub number: usize,
    pub label: String,
    pub abbreviation: String,
    pub title: Option<String>,
    pub position: [f64; 2],
    pub bounding_box: [f64; 2],
    pub inside_out: bool,
    pub faces: Vec<NetFace>,
    pub lines: Vec<NetLine>,
    /// Closed loops around the island, stickers included.
    pub outlines: Vec<Vec<[f64; 2]>>,
    pub markers: Vec<NetMarker>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NetFace {
    pub face: FaceIndex,
    pub flipped: bool,
    pub vertices: Vec<[f64; 2]>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    Cut,
    Convex,
    Concave,
    Flat,
}

#[derive(Debug, Clone, Serialize)]
pub struct NetLine {
    pub kind: LineKind,
    pub edge: EdgeIndex,
    pub a: [f64; 2],
    pub b: [f64; 2],
}

/// Markers, with their rotation as two columns.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NetMarker {
    Sticker {
        center: [f64; 2],
        rot: [[f64; 2]; 2],
        text: Option<String>,
        width: f64,
        vertices: Vec<[f64; 2]>,
    },
    Arrow {
        center: [f64; 2],
        rot: [[f64; 2]; 2],
        text: Option<String>,
        size: f64,
    },
    NumberAlone {
        center: [f64; 2],
        rot: [[f64; 2]; 2],
        text: Option<String>,
        size: f64,
    },
}

fn point(v: Vector2) -> [f64; 2] {
    [v.x, v.y]
}

fn matrix(m: Matrix2) -> [[f64; 2]; 2] {
    [[m.x.x, m.x.y], [m.y.x, m.y.y]]
}

impl Papercraft {
    pub fn to_document(&self) -> NetDocument {
        let pages = self.pages
            .iter()
            .map(|page| NetPage {
                index: page.index(),
                islands: page.islands().iter().map(|&key| self.net_island(key)).collect(),
            })
            .collect();
        NetDocument {
            page_size: [self.options.page_size.0, self.options.page_size.1],
            margin: self.options.margin,
            title_height: self.title_height,
            pages,
        }
    }

    pub fn save_json<W: Write>(&self, w: W) -> Result<()> {
        serde_json::to_writer_pretty(w, &self.to_document())?;
        Ok(())
    }

    fn net_island(&self, key: IslandKey) -> NetIsland {
        let island = &self.islands[key];
        let offset = island.pos + Vector2::new(self.options.margin, self.options.margin);
        let at = |v: Vector2| point(v + offset);
        let co = |v: UvVertexIndex| self.uv_vertex(v).co;

        let faces = island.faces
            .iter()
            .map(|&i_face| {
                let uvface = self.uv_face(i_face);
                NetFace {
                    face: i_face,
                    flipped: uvface.flipped,
                    vertices: uvface.vertices.iter().map(|&v| at(co(v))).collect(),
                }
            })
            .collect();

        let mut lines = Vec::new();
        let mut folds = Vec::new();
        for &i_uvedge in &island.edges {
            let uvedge = self.uv_edge(i_uvedge);
            let state = &self.edges[usize::from(uvedge.edge)];
            let (a, b) = (at(co(uvedge.va)), at(co(uvedge.vb)));
            if state.is_cut(uvedge.face) && uvedge.sticker.is_none() {
                lines.push(NetLine { kind: LineKind::Cut, edge: uvedge.edge, a, b });
                continue;
            }
            // both sides of a fold are in the island, take only one of them
            let forward = self.uv_vertex(uvedge.va).vertex > self.uv_vertex(uvedge.vb).vertex;
            if uvedge.sticker.is_none() && self.uv_face(uvedge.face).flipped == forward {
                continue;
            }
            let angle_epsilon = self.options.angle_epsilon;
            let kind = match (state.angle > angle_epsilon, state.angle < -angle_epsilon, island.is_inside_out) {
                (true, _, false) | (_, true, true) => LineKind::Convex,
                (_, true, false) | (true, _, true) => LineKind::Concave,
                _ => LineKind::Flat,
            };
            folds.push(NetLine { kind, edge: uvedge.edge, a, b });
        }
        lines.extend(folds);

        let mut outlines = Vec::new();
        let mut visited = FxHashSet::default();
        for &start in &island.boundary {
            if !visited.insert(start) {
                continue;
            }
            let mut outline = Vec::new();
            let mut i_uvedge = start;
            loop {
                let uvedge = self.uv_edge(i_uvedge);
                match uvedge.sticker.map(|i| &island.markers[i].kind) {
                    Some(MarkerKind::Sticker { vertices, .. }) => {
                        outline.extend(vertices[1 ..].iter().map(|&v| at(v)));
                    }
                    _ => {
                        let v = if self.uvedge_flipped(i_uvedge) { uvedge.vb } else { uvedge.va };
                        outline.push(at(co(v)));
                    }
                }
                match uvedge.neighbor_right {
                    Some(next) if visited.insert(next) => i_uvedge = next,
                    _ => break,
                }
            }
            outlines.push(outline);
        }

        let markers = island.markers
            .iter()
            .map(|marker| {
                let center = at(marker.center);
                let rot = matrix(marker.rot);
                let text = marker.text.clone();
                match &marker.kind {
                    MarkerKind::Sticker { width, vertices, .. } => NetMarker::Sticker {
                        center,
                        rot,
                        text,
                        width: *width,
                        vertices: vertices.iter().map(|&v| at(v)).collect(),
                    },
                    MarkerKind::Arrow { size } => NetMarker::Arrow { center, rot, text, size: *size },
                    MarkerKind::NumberAlone { size } => NetMarker::NumberAlone { center, rot, text, size: *size },
                }
            })
            .collect();

        NetIsland {
            number: island.number,
            label: island.label.clone(),
            abbreviation: island.abbreviation.clone(),
            title: island.title.clone(),
            position: point(island.pos),
            bounding_box: point(island.bounding_box),
            inside_out: island.is_inside_out,
            faces,
            lines,
            outlines,
            markers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util_3d::Vector3;

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
    fn plain_net_lines() {
        let options = PaperOptions {
            scale: 10.0,
            create_stickers: false,
            create_numbers: false,
            ..PaperOptions::default()
        };
        let pc = Papercraft::unfold(folded_pair(), options).unwrap();
        let doc = pc.to_document();
        assert_eq!(doc.pages.len(), 1);
        assert_eq!(doc.title_height, 0.0);
        let island = &doc.pages[0].islands[0];
        assert_eq!(island.faces.len(), 2);

        let count = |kind| island.lines.iter().filter(|l| l.kind == kind).count();
        assert_eq!(count(LineKind::Cut), 6);
        assert_eq!(count(LineKind::Convex), 1);
        assert_eq!(count(LineKind::Concave), 0);
        assert_eq!(island.outlines.len(), 1);
        assert_eq!(island.outlines[0].len(), 6);
        // everything is inside the printable area
        for p in island.outlines.iter().flatten() {
            assert!(p[0] >= doc.margin - 1e-9 && p[1] >= doc.margin - 1e-9);
        }
        assert!(island.markers.is_empty());

        let mut json = Vec::new();
        pc.save_json(&mut json).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&json).unwrap();
        assert_eq!(value["pages"][0]["islands"][0]["lines"].as_array().map(|a| a.len()), Some(7));
        assert_eq!(value["pages"][0]["islands"][0]["label"], "Island 1");
    }

    #[test]
    fn stickers_in_outline() {
        let positions = vec![
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
        ];
        let tetrahedron = Mesh::from_polygons(positions, &[vec![0, 2, 1], vec![0, 1, 3], vec![1, 2, 3], vec![0, 3, 2]]).unwrap();
        let options = PaperOptions {
            scale: 50.0,
            sticker_width: 2.0,
            ..PaperOptions::default()
        };
        let pc = Papercraft::unfold(tetrahedron, options).unwrap();
        let doc = pc.to_document();

        let mut stickers = 0;
        for island in doc.pages.iter().flat_map(|p| &p.islands) {
            let (_, source) = pc.islands().find(|(_, i)| i.number() == island.number).unwrap();
            let points: usize = source.boundary()
                .iter()
                .map(|&e| match pc.uv_edge(e).sticker().map(|i| source.markers()[i].kind()) {
                    Some(MarkerKind::Sticker { vertices, .. }) => vertices.len() - 1,
                    _ => 1,
                })
                .sum();
            assert_eq!(island.outlines.iter().map(|o| o.len()).sum::<usize>(), points);
            stickers += island.markers.iter().filter(|m| matches!(m, NetMarker::Sticker { .. })).count();
        }
        assert!(stickers > 0);
    }

    #[test]
    fn markers_serialize_tagged() {
        let marker = NetMarker::Arrow {
            center: [1.0, 2.0],
            rot: [[1.0, 0.0], [0.0, 1.0]],
            text: Some("3".into()),
            size: 5.0,
        };
        let value = serde_json::to_value(&marker).unwrap();
        assert_eq!(value["kind"], "arrow");
        assert_eq!(value["text"], "3");
    }
}
