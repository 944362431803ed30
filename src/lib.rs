//! # bambu2prusa
//!
//! Converts Bambu Studio 3MF project files into 3MF files PrusaSlicer opens
//! without complaint.
//!
//! 3MF files are ZIP archives following the Open Packaging Conventions (OPC)
//! with XML model documents inside. Conversion rewrites only the model
//! documents; every other entry is copied byte-for-byte.
//!
//! ## What changes in a model document
//!
//! - The root `model` element is bound to the 3MF core namespace and declares
//!   the `slic3rpe` extension namespace
//! - Bambu attributes (`p:UUID` on the root, `paint_color`, `paint_seam`) are
//!   removed
//! - Build items without a `transform` get the identity transform
//!
//! Objects, meshes and everything else stay as they are.
//!
//! ## Example
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let out = bambu2prusa::convert_archive("benchy.3mf", "benchy_prusa.3mf")?;
//! println!("wrote {}", out.display());
//! # Ok(())
//! # }
//! ```
//!
//! Single model documents can be rewritten directly with [`rewrite`] or a
//! configured [`ModelRewriter`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod converter;
pub mod encoding;
pub mod error;
pub mod frontend;
pub mod model;
pub mod opc;
pub mod parser;
pub mod rewriter;

pub use converter::{ConversionSummary, Converter, convert_archive, model_documents};
pub use error::{Error, ErrorContext, ErrorKind, Result};
pub use model::{
    BuildItem, CORE_NAMESPACE, DEFAULT_TRANSFORM, Mesh, ModelDocument, Object, ObjectType,
    SLIC3RPE_NAMESPACE, SLIC3RPE_PREFIX, Triangle, Vertex,
};
pub use rewriter::{
    AttributeScope, ModelRewriter, NamespaceMatch, RewriteRules, RewriteStats, StrippedAttribute,
    rewrite,
};
