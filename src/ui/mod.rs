//! The recipe page: state machine and text rendering.

pub mod controller;
pub mod render;

pub use controller::{PageController, PageState, PageView};
