//! Documentation post-processing.
//!
//! The external documentation generator is invoked as-is; these two
//! independent transforms fix up its output afterwards.

mod html;
mod images;

pub use html::HtmlRewriter;
pub use images::{ImageCompressor, ImageReport};
