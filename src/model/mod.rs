pub mod definition;
pub mod record;

pub use definition::{FieldConstraints, FieldDefinition, FieldType, ListConstraints};
pub use record::AssetRecord;
