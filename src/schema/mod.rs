//! Schema model
//!
//! Entity types are declared explicitly with a builder: a name plus an ordered
//! list of typed field descriptors. Declared types live in a `ModelRegistry`
//! that keys and queries consult by name.

mod descriptor;
mod entity_type;
mod registry;
mod types;

pub use descriptor::{FieldBuilder, FieldDescriptor};
pub use entity_type::{EntityType, EntityTypeBuilder};
pub use registry::ModelRegistry;
pub use types::{FieldKind, FieldValue};
