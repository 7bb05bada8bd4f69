//! Document model and interaction math for the emoji canvas editor.
//!
//! This crate is pure and synchronous: no I/O, no clocks, no threads. It owns
//! the persisted scene of one document, selection membership, the pan/zoom
//! camera, the selection gesture state machine, and the transform algebra that
//! combines them into viewport positions. The host crate layers persistence
//! and background-image fetching on top.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`scene`] | Placed objects, id allocation, and the snapshot codec |
//! | [`selection`] | Selected-object membership |
//! | [`camera`] | Pan/zoom camera with live gesture deltas and zoom-to-fit |
//! | [`gesture`] | Drag/pinch state machine for the selection |
//! | [`transform`] | Composition of camera and gesture into render positions |
//! | [`hit`] | Hit-testing against placed objects |
//! | [`palette`] | Named glyph palettes |
//! | [`consts`] | Shared constants (default sizes, minimum size, default palette) |

pub mod camera;
pub mod consts;
pub mod gesture;
pub mod hit;
pub mod palette;
pub mod scene;
pub mod selection;
pub mod transform;
