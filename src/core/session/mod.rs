//! Batch session recording

pub mod recorder;

pub use recorder::SessionRecorder;
