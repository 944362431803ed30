//! Data structures representing 3MF model documents

mod core;

pub use core::{
    BuildItem, CORE_NAMESPACE, DEFAULT_TRANSFORM, Mesh, ModelDocument, Object, ObjectType,
    PACKAGE_RELATIONSHIPS_NAMESPACE, SLIC3RPE_NAMESPACE, SLIC3RPE_PREFIX, Triangle, Vertex,
};
