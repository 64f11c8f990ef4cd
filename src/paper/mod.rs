use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util_3d::Vector2;

// We use u32 where usize should be used to save some memory in 64-bit systems.
// 32-bit indices should be enough for everybody ;-)
macro_rules! index_type {
    ($vis:vis $name:ident : $inner:ty) => {
        #[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        #[derive(serde::Serialize, serde::Deserialize)]
        #[repr(transparent)]
        #[serde(transparent)]
        $vis struct $name($inner);

        impl From<$name> for usize {
            fn from(idx: $name) -> usize {
                idx.0 as usize
            }
        }

        impl From<usize> for $name {
            fn from(idx: usize) -> $name {
                $name(idx as $inner)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    }
}

mod model;
mod craft;

pub use model::*;
pub use model::import;
pub use craft::*;

pub type Result<T> = std::result::Result<T, UnfoldError>;

#[derive(Debug, Error)]
pub enum UnfoldError {
    #[error("invalid mesh: {0}")]
    InvalidMesh(String),
    #[error("{}", degenerate_message(.null_edges, .null_faces, .twisted_faces))]
    Degenerate {
        null_edges: Vec<EdgeIndex>,
        null_faces: Vec<FaceIndex>,
        twisted_faces: Vec<FaceIndex>,
    },
    #[error("internal error while joining islands, please report it: {0}")]
    Internal(String),
    #[error("{}", too_big_message(.island, .size, .cage))]
    IslandTooBig {
        island: String,
        size: (f64, f64),
        cage: (f64, f64),
    },
}

fn degenerate_message(null_edges: &[EdgeIndex], null_faces: &[FaceIndex], twisted_faces: &[FaceIndex]) -> String {
    let mut msg = String::from("The model contains:\n");
    if !null_edges.is_empty() {
        msg += &format!(" {} zero-length edge(s): {null_edges:?}\n", null_edges.len());
    }
    if !null_faces.is_empty() {
        msg += &format!(" {} zero-area face(s): {null_faces:?}\n", null_faces.len());
    }
    if !twisted_faces.is_empty() {
        msg += &format!(" {} twisted polygon(s): {twisted_faces:?}\n", twisted_faces.len());
    }
    let doubles = !null_edges.is_empty() || !null_faces.is_empty();
    let cure = match (doubles, !twisted_faces.is_empty()) {
        (true, true) => "remove doubles and triangulate",
        (false, true) => "triangulate",
        _ => "remove doubles",
    };
    msg += &format!("Fix them ({cure}) and try again.");
    msg
}

fn too_big_message(island: &str, size: &(f64, f64), cage: &(f64, f64)) -> String {
    format!(
        "{island} ({:.1}x{:.1}) is too big to fit onto a printable area of {:.1}x{:.1}; downscale the model or split that island",
        size.0, size.1, cage.0, cage.1,
    )
}

/// Weights of the cut priority of an edge.
///
/// Lower priority edges are joined first.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityEffect {
    pub convex: f64,
    pub concave: f64,
    pub length: f64,
}

impl Default for PriorityEffect {
    fn default() -> Self {
        PriorityEffect {
            convex: 0.5,
            concave: 1.0,
            length: -0.05,
        }
    }
}

impl PriorityEffect {
    /// `angle` is the signed dihedral angle, `0` counts as convex.
    pub fn priority(&self, angle: f64, length: f64, average_length: f64) -> f64 {
        let by_angle = if angle >= 0.0 {
            self.convex * angle / PI
        } else {
            self.concave * (-angle) / PI
        };
        by_angle + (length / average_length) * self.length
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum PaperSize {
    A4,
    A3,
    Letter,
    Legal,
}

impl PaperSize {
    /// Portrait size in millimeters
    pub fn size(self) -> (f64, f64) {
        match self {
            PaperSize::A4 => (210.0, 297.0),
            PaperSize::A3 => (297.0, 420.0),
            PaperSize::Letter => (215.9, 279.4),
            PaperSize::Legal => (215.9, 355.6),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaperOptions {
    pub page_size: (f64, f64),
    pub margin: f64,
    pub scale: f64,
    pub priority_effect: PriorityEffect,
    pub sticker_width: f64,
    pub vertex_epsilon: f64,
    pub angle_epsilon: f64,
    pub limit_by_page: bool,
    pub create_stickers: bool,
    pub create_numbers: bool,
    pub quick_sweepline: bool,
}

impl Default for PaperOptions {
    fn default() -> Self {
        PaperOptions {
            page_size: PaperSize::A4.size(),
            margin: 5.0,
            scale: 1.0,
            priority_effect: PriorityEffect::default(),
            sticker_width: 5.0,
            vertex_epsilon: 1e-6,
            angle_epsilon: PI / 360.0,
            limit_by_page: false,
            create_stickers: true,
            create_numbers: true,
            quick_sweepline: true,
        }
    }
}

impl PaperOptions {
    pub fn set_paper_size(&mut self, paper: PaperSize) {
        self.page_size = paper.size();
    }
    pub fn printable_size(&self) -> Vector2 {
        Vector2::new(
            self.page_size.0 - 2.0 * self.margin,
            self.page_size.1 - 2.0 * self.margin,
        )
    }
    pub fn is_landscape(&self) -> bool {
        let printable = self.printable_size();
        printable.x > printable.y
    }
    /// Room taken by the island titles, when they are printed.
    pub fn title_height(&self) -> f64 {
        // glyphs go below the baseline, so the title takes a bit more than the text size
        if self.create_numbers { 1.2 * self.sticker_width } else { 0.0 }
    }
    /// The bound for island growth, in model units.
    ///
    /// Stickers may stick out of both sides of an island, and the title goes below it.
    pub fn island_size_limit(&self) -> Option<Vector2> {
        if !self.limit_by_page {
            return None;
        }
        let mut reserved = self.title_height();
        if self.create_stickers {
            reserved += 2.0 * self.sticker_width;
        }
        let printable = self.printable_size();
        let room = Vector2::new((printable.x - reserved).max(0.0), (printable.y - reserved).max(0.0));
        Some(room / self.scale)
    }
}
