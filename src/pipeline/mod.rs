//! Pipeline stages for stamping overlays onto a PDF.
//!
//! Each submodule implements one step. The embed and draw stages are kept
//! apart so that nothing touches the document until every attachment has
//! been prepared.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ load ──▶ embed ──▶ draw ──▶ serialize
//! (URL/path) (lopdf) (concurrent) (page order) (save_to)
//!                      │
//!                      └─ layout (text wrapping)
//! ```
//!
//! 1. [`input`] : canonicalise the user-supplied path or URL to a local file
//! 2. [`load`]  : parse the document and read page boxes and metadata
//! 3. [`embed`] : decode images, encode text and parse paths for every
//!    attachment at once; the first failure aborts the save
//! 4. [`layout`]: greedy word wrapping with standard-font metrics
//! 5. [`draw`]  : register resources and append one overlay stream per page

pub mod draw;
pub mod embed;
pub mod input;
pub mod layout;
pub mod load;
