//! Target entity
//!
//! A target is one `host[:port]` backend of an upstream. Targets without a
//! port are stored with the default target port appended.

use crate::schema::{hooks, EntitySchema, FieldDef, SchemaResult, TypeRegistry};

use super::upstreams;

pub const NAME: &str = "targets";

pub fn schema(types: &TypeRegistry) -> SchemaResult<EntitySchema> {
    EntitySchema::builder(NAME)
        .primary_key(["id"])
        .field(types.field("uuid", "id")?)
        .field(FieldDef::foreign("upstream", upstreams::NAME).required())
        .field(
            FieldDef::string("target")
                .required()
                .custom(hooks::validate_target)
                .normalize(hooks::normalize_target),
        )
        .field(FieldDef::integer("weight").default(100).between(0.0, 1000.0))
        .field(types.field("tags", "tags")?)
        .build()
}
