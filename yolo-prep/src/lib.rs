//! Data preparation building blocks for YOLO-style detectors.

mod common;
pub mod config;
pub mod dataset;
pub mod grid;
pub mod iou;
pub mod label;
pub mod logging;
pub mod processor;
pub mod record;
pub mod storage;

pub use crate::label::*;
