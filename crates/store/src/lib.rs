//! Store - Persistence and the PDF codec
//!
//! This crate owns everything that moves canvas documents across the
//! process boundary: the app's native JSON format, the file-read
//! collaborator used to fetch imported source PDFs, and the `pdf` module
//! that exports documents to PDF and reads outlines back from opened
//! PDFs.

mod error;
mod file_store;
mod native;
pub mod pdf;

pub use error::*;
pub use file_store::*;
pub use native::*;
