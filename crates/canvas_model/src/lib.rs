//! Canvas Model - Core document structure for the note-taking app
//!
//! This crate provides the in-memory model the rest of the application
//! operates on: a document is an ordered sequence of canvas pages, each
//! holding bottom-to-top layers of drawable elements, plus the outline
//! (bookmark) tree used for navigation.

mod color;
mod document;
mod element;
mod error;
mod geometry;
mod layer;
mod outline;
mod page;

pub use color::*;
pub use document::*;
pub use element::*;
pub use error::*;
pub use geometry::*;
pub use layer::*;
pub use outline::*;
pub use page::*;
