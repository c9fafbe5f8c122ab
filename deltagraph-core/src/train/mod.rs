//! Measuring a network: point samples and the `Trainable` seam.

pub mod point_sample;
pub mod trainable;

pub use point_sample::PointSample;
pub use trainable::{measure_rows, BasicTrainable, MeasureOptions, Trainable};
