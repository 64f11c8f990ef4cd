use crate::util_3d::{Vector2, cross2, lex_cmp, lex_le, lex_lt};

use super::UvVertexIndex;

/// A straight piece of a candidate island boundary.
///
/// Endpoints are identified by their uv vertex, so that segments that meet at a vertex
/// are not reported as crossing.
#[derive(Debug, Clone)]
pub(super) struct Segment {
    pub va: Vector2,
    pub vb: Vector2,
    pub min: Vector2,
    pub max: Vector2,
    pub min_id: UvVertexIndex,
    pub max_id: UvVertexIndex,
    pub bottom: f64,
    pub top: f64,
    // the face is to the left of the segment when walking from min to max
    pub upwards: bool,
    // comes from the island being joined
    pub phantom: bool,
    // will not be a cut after the join
    pub merged: bool,
}

impl Segment {
    pub fn new(a: (UvVertexIndex, Vector2), b: (UvVertexIndex, Vector2), upwards: bool, phantom: bool, merged: bool) -> Segment {
        let (min, max) = if lex_lt(&a.1, &b.1) { (a, b) } else { (b, a) };
        let (bottom, top) = if a.1.y < b.1.y { (a.1.y, b.1.y) } else { (b.1.y, a.1.y) };
        Segment {
            va: a.1,
            vb: b.1,
            min: min.1,
            max: max.1,
            min_id: min.0,
            max_id: max.0,
            bottom,
            top,
            upwards,
            phantom,
            merged,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(super) enum SweepError {
    /// Two segments cross each other.
    Intersection,
    /// Overlapping collinear segments, the quick sweepline cannot tell them apart.
    Geometry,
}

// Whether segment `ia` is below segment `ib` at the current sweep position
fn is_below(segs: &[Segment], ia: usize, ib: usize, correct_geometry: bool) -> Result<bool, SweepError> {
    if ia == ib {
        return Ok(false);
    }
    let (a, b) = (&segs[ia], &segs[ib]);
    if a.top < b.bottom {
        return Ok(true);
    }
    if b.top < a.bottom {
        return Ok(false);
    }
    if lex_le(&a.max, &b.min) {
        return Ok(true);
    }
    if lex_le(&b.max, &a.min) {
        return Ok(false);
    }

    let a_vector = a.max - a.min;
    let min_to_min = b.min - a.min;
    let mut cross_b1 = cross2(a_vector, min_to_min);
    let mut cross_b2 = cross2(a_vector, b.max - a.min);
    if cross_b2 < cross_b1 {
        std::mem::swap(&mut cross_b1, &mut cross_b2);
    }
    if cross_b2 > 0.0 && (cross_b1 > 0.0 || (cross_b1 == 0.0 && !a.upwards)) {
        return Ok(true);
    }
    if cross_b1 < 0.0 && (cross_b2 < 0.0 || (cross_b2 == 0.0 && a.upwards)) {
        return Ok(false);
    }

    let b_vector = b.max - b.min;
    let mut cross_a1 = cross2(b_vector, -min_to_min);
    let mut cross_a2 = cross2(b_vector, a.max - b.min);
    if cross_a2 < cross_a1 {
        std::mem::swap(&mut cross_a1, &mut cross_a2);
    }
    if cross_a2 > 0.0 && (cross_a1 > 0.0 || (cross_a1 == 0.0 && !b.upwards)) {
        return Ok(false);
    }
    if cross_a1 < 0.0 && (cross_a2 < 0.0 || (cross_a2 == 0.0 && b.upwards)) {
        return Ok(true);
    }

    if cross_a1 == 0.0 && cross_b1 == 0.0 && cross_a2 == 0.0 && cross_b2 == 0.0 {
        if correct_geometry {
            return Err(SweepError::Geometry);
        }
        if a.upwards == b.upwards {
            return Err(SweepError::Intersection);
        }
        return Ok(false);
    }
    if a.min == b.min || a.max == b.max {
        return Ok(cross_a2 > cross_b2);
    }
    Err(SweepError::Intersection)
}

pub(super) trait Sweepline {
    fn add(&mut self, segs: &[Segment], item: usize) -> Result<(), SweepError>;
    fn remove(&mut self, segs: &[Segment], item: usize) -> Result<(), SweepError>;
}

/// Keeps the active segments sorted and only compares neighbors.
#[derive(Debug, Default)]
pub(super) struct QuickSweepline {
    children: Vec<usize>,
}

impl Sweepline for QuickSweepline {
    fn add(&mut self, segs: &[Segment], item: usize) -> Result<(), SweepError> {
        let (mut low, mut high) = (0, self.children.len());
        while low < high {
            let mid = (low + high) / 2;
            if is_below(segs, self.children[mid], item, true)? {
                low = mid + 1;
            } else {
                high = mid;
            }
        }
        self.children.insert(low, item);
        Ok(())
    }

    fn remove(&mut self, segs: &[Segment], item: usize) -> Result<(), SweepError> {
        let Some(index) = self.children.iter().position(|&c| c == item) else {
            return Ok(());
        };
        self.children.remove(index);
        // the two segments that become neighbors must still be in order
        if index > 0 && index < self.children.len() && is_below(segs, self.children[index], self.children[index - 1], true)? {
            return Err(SweepError::Geometry);
        }
        Ok(())
    }
}

/// Compares every pair of active segments.
#[derive(Debug, Default)]
pub(super) struct BruteSweepline {
    children: Vec<usize>,
}

impl Sweepline for BruteSweepline {
    fn add(&mut self, segs: &[Segment], item: usize) -> Result<(), SweepError> {
        let it = &segs[item];
        for &child in &self.children {
            let c = &segs[child];
            if c.min_id != it.min_id && c.max_id != it.max_id {
                is_below(segs, item, child, false)?;
            }
        }
        self.children.push(item);
        Ok(())
    }

    fn remove(&mut self, _segs: &[Segment], item: usize) -> Result<(), SweepError> {
        self.children.retain(|&c| c != item);
        Ok(())
    }
}

/// Sweeps left to right across the segments, failing on the first crossing found.
pub(super) fn sweep(sweepline: &mut dyn Sweepline, segs: &[Segment]) -> Result<(), SweepError> {
    let mut events_add: Vec<usize> = (0 .. segs.len()).collect();
    events_add.sort_by(|&a, &b| lex_cmp(&segs[a].min, &segs[b].min));
    let mut events_remove = events_add.clone();
    events_remove.sort_by(|&a, &b| lex_cmp(&segs[a].max, &segs[b].max));

    let mut events_add = events_add.into_iter().peekable();
    for item in events_remove {
        while let Some(&next) = events_add.peek() {
            if !lex_le(&segs[next].min, &segs[item].max) {
                break;
            }
            sweepline.add(segs, next)?;
            events_add.next();
        }
        sweepline.remove(segs, item)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(ids: (usize, usize), a: (f64, f64), b: (f64, f64)) -> Segment {
        let a = Vector2::new(a.0, a.1);
        let b = Vector2::new(b.0, b.1);
        Segment::new((UvVertexIndex::from(ids.0), a), (UvVertexIndex::from(ids.1), b), lex_lt(&a, &b), false, false)
    }

    fn both(segs: &[Segment]) -> (Result<(), SweepError>, Result<(), SweepError>) {
        (
            sweep(&mut QuickSweepline::default(), segs),
            sweep(&mut BruteSweepline::default(), segs),
        )
    }

    #[test]
    fn closed_triangle_is_clean() {
        let segs = [
            seg((0, 1), (0.0, 0.0), (1.0, 0.0)),
            seg((1, 2), (1.0, 0.0), (0.0, 1.0)),
            seg((2, 0), (0.0, 1.0), (0.0, 0.0)),
        ];
        assert_eq!(both(&segs), (Ok(()), Ok(())));
    }

    #[test]
    fn parallel_segments_are_clean() {
        let segs = [
            seg((0, 1), (0.0, 0.0), (1.0, 0.0)),
            seg((2, 3), (0.0, 1.0), (1.0, 1.0)),
        ];
        assert_eq!(both(&segs), (Ok(()), Ok(())));
    }

    #[test]
    fn crossing_segments_intersect() {
        let segs = [
            seg((0, 1), (0.0, 0.0), (2.0, 2.0)),
            seg((2, 3), (0.0, 2.0), (2.0, 0.0)),
        ];
        assert_eq!(both(&segs), (Err(SweepError::Intersection), Err(SweepError::Intersection)));
    }

    #[test]
    fn overlapping_collinear_segments() {
        let segs = [
            seg((0, 1), (0.0, 0.0), (2.0, 0.0)),
            seg((2, 3), (1.0, 0.0), (3.0, 0.0)),
        ];
        // the quick sweepline cannot decide, the brute one can
        assert_eq!(both(&segs), (Err(SweepError::Geometry), Err(SweepError::Intersection)));
    }
}
