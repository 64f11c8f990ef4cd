//! Unfolds polygonal meshes into nets of paper islands, ready to be printed, cut and glued.

pub mod util_3d;
pub mod paper;
pub mod config;
