use cgmath::InnerSpace;
use fxhash::FxHashSet;
use log::{debug, info};

use crate::util_3d::{Matrix2, Vector2, point_key};

use super::*;

/// A sheet of paper and the islands placed on it.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    index: usize,
    islands: Vec<IslandKey>,
}

impl Page {
    pub fn index(&self) -> usize {
        self.index
    }
    /// The islands of this page, in the order they were placed.
    pub fn islands(&self) -> &[IslandKey] {
        &self.islands
    }
}

#[derive(Debug, Copy, Clone)]
struct Placed {
    pos: Vector2,
    size: Vector2,
}

fn fits(size: Vector2, cage: Vector2) -> bool {
    size.x <= cage.x && size.y <= cage.y
}

// Looks for the first pair of stops where the island does not overlap any other one
fn try_emplace(
    size: Vector2,
    page_islands: &mut Vec<Placed>,
    cage: Vector2,
    stops_x: &mut Vec<f64>,
    stops_y: &mut Vec<f64>,
    occupied_cache: &mut FxHashSet<(u64, u64)>,
) -> Option<Vector2> {
    for &x in stops_x.iter() {
        if x + size.x > cage.x {
            continue;
        }
        'stop: for &y in stops_y.iter() {
            let key = point_key(&Vector2::new(x, y));
            if y + size.y > cage.y || occupied_cache.contains(&key) {
                continue;
            }
            for i in 0 .. page_islands.len() {
                let obstacle = page_islands[i];
                if x + size.x > obstacle.pos.x
                    && obstacle.pos.x + obstacle.size.x > x
                    && y + size.y > obstacle.pos.y
                    && obstacle.pos.y + obstacle.size.y > y
                {
                    if x >= obstacle.pos.x && y >= obstacle.pos.y {
                        occupied_cache.insert(key);
                    }
                    // the last obstacle is the likeliest to be hit again
                    page_islands[.. i + 1].rotate_right(1);
                    continue 'stop;
                }
            }
            let pos = Vector2::new(x, y);
            page_islands.push(Placed { pos, size });
            stops_x.push(x + size.x);
            stops_y.push(y + size.y);
            return Some(pos);
        }
    }
    None
}

// Drops the stops that are too close to their neighbors
fn drop_portion(stops: &mut Vec<f64>, border: f64, divisor: usize) {
    stops.sort_by(f64::total_cmp);
    // distance from the left neighbor to the right one, skipping the first stop
    let distances: Vec<f64> = stops
        .iter()
        .zip(stops.iter().skip(2).chain(std::iter::once(&border)))
        .map(|(left, right)| right - left)
        .collect();
    if distances.is_empty() {
        return;
    }
    let mut sorted = distances.clone();
    sorted.sort_by(f64::total_cmp);
    let quantile = sorted[sorted.len() / divisor];
    *stops = stops
        .iter()
        .zip(std::iter::once(quantile).chain(distances))
        .filter(|&(_, distance)| distance >= quantile)
        .map(|(&stop, _)| stop)
        .collect();
}

impl Papercraft {
    /// Places the islands onto as many pages as needed, largest first.
    ///
    /// Islands that only fit the printable area turned a quarter are turned. Running it
    /// again gives the same result.
    pub fn pack_islands(&mut self) -> Result<()> {
        let cage = self.options.printable_size();

        for key in self.island_order.clone() {
            let bb = self.islands[key].bounding_box;
            if fits(bb, cage) {
                continue;
            }
            let turned = Vector2::new(bb.y - self.title_height, bb.x + self.title_height);
            if !fits(turned, cage) {
                let island = &self.islands[key];
                return Err(UnfoldError::IslandTooBig {
                    island: island.label.clone(),
                    size: (bb.x, bb.y),
                    cage: (cage.x, cage.y),
                });
            }
            debug!("{} turned to fit the page", self.islands[key].label);
            self.orient_island(key, Matrix2::new(0.0, 1.0, -1.0, 0.0));
        }

        let mut remaining = self.island_order.clone();
        remaining.sort_by(|&a, &b| {
            let sa = self.islands[a].bounding_box.magnitude2();
            let sb = self.islands[b].bounding_box.magnitude2();
            sb.total_cmp(&sa)
        });
        let max_stops = 4 * self.islands.len() + 100;

        let mut pages = Vec::new();
        while !remaining.is_empty() {
            let mut page_islands = Vec::new();
            let mut placed = Vec::new();
            let mut occupied_cache = FxHashSet::default();
            let (mut stops_x, mut stops_y) = (vec![0.0], vec![0.0]);
            for &key in &remaining {
                let size = self.islands[key].bounding_box;
                if let Some(pos) = try_emplace(size, &mut page_islands, cage, &mut stops_x, &mut stops_y, &mut occupied_cache) {
                    self.islands[key].pos = pos;
                    placed.push(key);
                }
                if stops_x.len().pow(2) > max_stops {
                    drop_portion(&mut stops_x, cage.x, 4);
                    drop_portion(&mut stops_y, cage.y, 4);
                }
            }
            if placed.is_empty() {
                return Err(UnfoldError::Internal(format!("{} islands do not fit onto an empty page", remaining.len())));
            }
            remaining.retain(|key| !placed.contains(key));
            pages.push(Page {
                index: pages.len(),
                islands: placed,
            });
        }
        info!("{} islands packed onto {} pages", self.islands.len(), pages.len());
        self.pages = pages;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emplace_side_by_side() {
        let cage = Vector2::new(10.0, 10.0);
        let mut page = Vec::new();
        let mut cache = FxHashSet::default();
        let (mut xs, mut ys) = (vec![0.0], vec![0.0]);
        let size = Vector2::new(4.0, 6.0);

        let first = try_emplace(size, &mut page, cage, &mut xs, &mut ys, &mut cache);
        assert_eq!(first, Some(Vector2::new(0.0, 0.0)));
        let second = try_emplace(size, &mut page, cage, &mut xs, &mut ys, &mut cache);
        assert_eq!(second, Some(Vector2::new(4.0, 0.0)));
        // no room left for a third one
        assert_eq!(try_emplace(size, &mut page, cage, &mut xs, &mut ys, &mut cache), None);
        let small = try_emplace(Vector2::new(2.0, 2.0), &mut page, cage, &mut xs, &mut ys, &mut cache);
        assert_eq!(small, Some(Vector2::new(0.0, 6.0)));
    }

    #[test]
    fn drop_keeps_first_and_spread_stops() {
        let mut stops = vec![0.0, 5.0, 1.0, 1.1, 1.2, 9.0, 1.3];
        drop_portion(&mut stops, 10.0, 4);
        assert_eq!(stops[0], 0.0);
        assert!(stops.len() < 7);
        assert!(stops.contains(&9.0));
        assert!(stops.windows(2).all(|w| w[0] <= w[1]));
    }
}
