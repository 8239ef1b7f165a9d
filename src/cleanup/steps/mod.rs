//! Individual cleanup steps, in pipeline order

pub mod load;
pub mod analyze;
pub mod blur;
pub mod threshold;
pub mod denoise;
pub mod dilate;
pub mod recolor;
pub mod composite;
