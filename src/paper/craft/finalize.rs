use std::f64::consts::FRAC_PI_2;

use cgmath::Rad;

use crate::util_3d::{Matrix2, Vector2, bounding_box_2d, box_fit_angle};

use super::*;

impl Papercraft {
    /// Numbers the islands from 1, largest first, and gives them their default names.
    pub fn enumerate_islands(&mut self) {
        for (num, &key) in self.island_order.iter().enumerate() {
            let number = num + 1;
            let island = &mut self.islands[key];
            let mut abbreviation = number.to_string();
            if is_upsidedown_wrong(&abbreviation) {
                abbreviation.push('.');
            }
            island.number = number;
            island.abbreviation = abbreviation;
            island.label = format!("Island {number}");
        }
    }

    /// Turns model units into paper millimeters.
    pub fn scale_islands(&mut self, scale: f64) {
        for island in self.island_order.iter().map(|&key| &self.islands[key]) {
            for &v in &island.vertices {
                self.uv_vertices[usize::from(v)].co *= scale;
            }
        }
    }

    /// Turns every island to its smallest bounding box, matching the orientation of the
    /// page, and moves it to the origin leaving `title_height` below it.
    pub fn finalize_islands(&mut self, title_height: f64) {
        self.title_height = title_height;
        let is_landscape = self.options.is_landscape();
        for key in self.island_order.clone() {
            let island = &mut self.islands[key];
            if title_height > 0.0 {
                island.title = Some(format!("[{}] {}", island.abbreviation, island.label));
            }

            let points = self.island_points(key);
            let angle = box_fit_angle(&points);
            let mut rot = Matrix2::from_angle(angle);
            let (a, b) = bounding_box_2d(points.iter().map(|&p| rot * p));
            if (b.x - a.x > b.y - a.y) != is_landscape {
                rot = Matrix2::from_angle(angle + Rad(FRAC_PI_2));
            }
            self.orient_island(key, rot);
        }
    }

    // Island vertices and the room needed by its markers
    fn island_points(&self, key: IslandKey) -> Vec<Vector2> {
        let island = &self.islands[key];
        island.vertices
            .iter()
            .map(|&v| self.uv_vertex(v).co)
            .chain(island.markers.iter().flat_map(|m| m.bounds()))
            .collect()
    }

    /// Rotates an island, then moves it so that its bounding box, title included,
    /// starts at the origin.
    pub(super) fn orient_island(&mut self, key: IslandKey, rot: Matrix2) {
        let points = self.island_points(key);
        let (min, max) = bounding_box_2d(points.iter().map(|&p| rot * p));
        let offset = Vector2::new(-min.x, self.title_height - min.y);

        let island = &mut self.islands[key];
        for &v in &island.vertices {
            let co = &mut self.uv_vertices[usize::from(v)].co;
            *co = rot * *co + offset;
        }
        for marker in &mut island.markers {
            marker.transform(rot, offset);
        }
        island.bounding_box = max + offset;
    }
}
