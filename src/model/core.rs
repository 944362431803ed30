//! Core 3MF types and structures

/// 3MF core namespace, the target model namespace of converted documents
pub const CORE_NAMESPACE: &str = "http://schemas.microsoft.com/3dmanufacturing/core/2015/02";

/// PrusaSlicer extension namespace
pub const SLIC3RPE_NAMESPACE: &str = "http://schemas.slic3r.org/3mf/2017/06";

/// Conventional prefix bound to [`SLIC3RPE_NAMESPACE`]
pub const SLIC3RPE_PREFIX: &str = "slic3rpe";

/// OPC packaging relationships namespace (Bambu binds `p:UUID` to it)
pub const PACKAGE_RELATIONSHIPS_NAMESPACE: &str =
    "http://schemas.microsoft.com/packaging/2006/relationships";

/// Identity placement: rotation/scale identity, zero translation
///
/// Serialized as a 3x4 matrix in row-major order, like every `transform`
/// attribute of the format.
pub const DEFAULT_TRANSFORM: &str = "1 0 0 0 1 0 0 0 1 0 0 0";

/// A 3D vertex with x, y, z coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
    /// Z coordinate
    pub z: f64,
}

impl Vertex {
    /// Create a new vertex
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// A triangle defined by three vertex indices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Triangle {
    /// Index of first vertex
    pub v1: usize,
    /// Index of second vertex
    pub v2: usize,
    /// Index of third vertex
    pub v3: usize,
}

impl Triangle {
    /// Create a new triangle
    pub fn new(v1: usize, v2: usize, v3: usize) -> Self {
        Self { v1, v2, v3 }
    }
}

/// A 3D mesh containing vertices and triangles
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    /// List of vertices
    pub vertices: Vec<Vertex>,
    /// List of triangles
    pub triangles: Vec<Triangle>,
}

impl Mesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self::default()
    }
}

/// Type of 3D object
///
/// Values outside the core set are vendor-defined and kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectType {
    /// A standard model object
    Model,
    /// A support structure
    Support,
    /// A solid support structure
    SolidSupport,
    /// A surface object
    Surface,
    /// Other types
    Other,
    /// Any vendor-defined value
    Vendor(String),
}

impl ObjectType {
    /// Classify a `type` attribute value
    pub fn parse(value: &str) -> Self {
        match value {
            "model" => ObjectType::Model,
            "support" => ObjectType::Support,
            "solidsupport" => ObjectType::SolidSupport,
            "surface" => ObjectType::Surface,
            "other" => ObjectType::Other,
            vendor => ObjectType::Vendor(vendor.to_string()),
        }
    }

    /// The attribute value this type was read from
    pub fn as_str(&self) -> &str {
        match self {
            ObjectType::Model => "model",
            ObjectType::Support => "support",
            ObjectType::SolidSupport => "solidsupport",
            ObjectType::Surface => "surface",
            ObjectType::Other => "other",
            ObjectType::Vendor(value) => value,
        }
    }
}

/// A resource object
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    /// Object ID, unique within one document
    pub id: String,
    /// Type of object, `None` when the attribute is absent
    pub object_type: Option<ObjectType>,
    /// Mesh data, `None` for objects without a `<mesh>` (component groups, placeholders)
    pub mesh: Option<Mesh>,
    /// Number of `<component>` references held by this object
    pub component_count: usize,
}

impl Object {
    /// Create a new object
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            object_type: None,
            mesh: None,
            component_count: 0,
        }
    }
}

/// An item to be built, referencing an object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildItem {
    /// Reference to object ID
    pub objectid: String,
    /// Transform attribute exactly as written, `None` when absent
    pub transform: Option<String>,
}

impl BuildItem {
    /// Create a new build item
    pub fn new(objectid: impl Into<String>) -> Self {
        Self {
            objectid: objectid.into(),
            transform: None,
        }
    }
}

/// One model part, read into memory
///
/// Instances only live while a single part is inspected; conversion itself
/// streams the document and never builds this structure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelDocument {
    /// Namespace URI bound to the root `model` element
    pub namespace: Option<String>,
    /// Prefix/URI pairs declared on the root element (`None` prefix is the default namespace)
    pub root_declarations: Vec<(Option<String>, String)>,
    /// Unit attribute of the root element
    pub unit: Option<String>,
    /// Objects in `<resources>`, in document order
    pub objects: Vec<Object>,
    /// Items in `<build>`, in document order
    pub build_items: Vec<BuildItem>,
}

impl ModelDocument {
    /// Create an empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an object by id
    pub fn object(&self, id: &str) -> Option<&Object> {
        self.objects.iter().find(|o| o.id == id)
    }

    /// Namespace URI declared for `prefix` on the root element
    pub fn root_namespace_for(&self, prefix: &str) -> Option<&str> {
        self.root_declarations
            .iter()
            .find(|(p, _)| p.as_deref() == Some(prefix))
            .map(|(_, uri)| uri.as_str())
    }

    /// Total number of triangles across all object meshes
    pub fn triangle_count(&self) -> usize {
        self.objects
            .iter()
            .filter_map(|o| o.mesh.as_ref())
            .map(|m| m.triangles.len())
            .sum()
    }
}
