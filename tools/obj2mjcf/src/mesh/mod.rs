//! Mesh parsing, partitioning and OBJ output

pub mod obj;
pub mod partition;
mod types;
pub mod writer;

// Re-export public API
pub use obj::{load_obj, parse_obj, AttributeKind, ObjError};
pub use partition::{group_faces, partition, Group};
pub use types::{Face, FaceVertex, MaterialId, ObjMesh, SubMesh, VertexTable};
pub use writer::{save_obj, write_obj, ObjHeader};
