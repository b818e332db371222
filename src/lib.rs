//! Real-time tracker for a single green quadrilateral marker.
//!
//! Each frame is segmented by green dominance, cleaned with morphological
//! opening and closing, reduced to its longest outer contour, simplified to a
//! polygon and accepted only when four corners remain. The marker center is
//! the midpoint of the first diagonal.

pub mod capture;
pub mod detection;
pub mod interrupt;
pub mod output;
pub mod pipeline;

pub use detection::{Detection, Detector, DetectorConfig};
pub use pipeline::{FramePipeline, PipelineOptions, PipelineSummary, StopReason};
