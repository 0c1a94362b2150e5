//! Pipeline stages for page-to-Markdown conversion.
//!
//! ## Data Flow
//!
//! ```text
//! source ──▶ flatten ──▶ relocate
//! (record map)  (render + rich_text)  (fetch, upload, rewrite)
//! ```
//!
//! 1. [`source`]    fetch the page's record map through a [`source::DocumentSource`]
//! 2. [`flatten`]   order the blocks and concatenate their fragments
//! 3. [`render`]    turn one block into one Markdown fragment, using
//!    [`rich_text`] for annotated runs
//! 4. [`relocate`]  copy transient images to object storage and rewrite links;
//!    the only stage that runs per image and tolerates failure

pub mod flatten;
pub mod relocate;
pub mod render;
pub mod rich_text;
pub mod source;
