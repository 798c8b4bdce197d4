//! # scullery
//!
//! A procedural assembly core for kitchen scenes that turns declarative
//! layouts into posed fixtures ready for object placement.
//!
//! It decouples the *layout* (what stands where, relative to what) from the
//! *engine* (whatever simulator hosts the scene), producing a `Scene`
//! registry whose fixtures expose named reset regions for sampling object
//! poses and normalized joint state for doors and drawers.

pub mod compose;
pub mod engine;
pub mod error;
pub mod fixture;
pub mod geom;
pub mod joint;
pub mod layout;
pub mod region;
pub mod sample;

pub use compose::*;
pub use engine::*;
pub use error::*;
pub use fixture::*;
pub use geom::*;
pub use joint::*;
pub use layout::*;
pub use region::*;
pub use sample::*;
