//! Upstream (load balancer) entity
//!
//! An upstream is a virtual hostname that balances over its targets. It
//! carries the hashing strategy and the active/passive health-check tuning.

use serde_json::json;

use crate::schema::{
    hooks, DefaultTree, EntityCheck, EntitySchema, FieldDef, Match, SchemaResult, TypeRegistry,
};

pub const NAME: &str = "upstreams";

/// Inherited defaults for every leaf under `healthchecks`.
///
/// A `0` counter or interval means "disabled" for the health checker; the
/// schema treats it as an ordinary value.
pub fn healthcheck_defaults() -> SchemaResult<DefaultTree> {
    DefaultTree::new(json!({
        "active": {
            "type": "http",
            "timeout": 1,
            "concurrency": 10,
            "http_path": "/",
            "https_verify_certificate": true,
            "healthy": {
                "interval": 0,
                "http_statuses": [200, 302],
                "successes": 0,
            },
            "unhealthy": {
                "interval": 0,
                "http_statuses": [429, 404, 500, 501, 502, 503, 504, 505],
                "tcp_failures": 0,
                "timeouts": 0,
                "http_failures": 0,
            },
        },
        "passive": {
            "type": "http",
            "healthy": {
                "http_statuses": [
                    200, 201, 202, 203, 204, 205, 206, 207, 208, 226,
                    300, 301, 302, 303, 304, 305, 306, 307, 308,
                ],
                "successes": 0,
            },
            "unhealthy": {
                "http_statuses": [429, 500, 503],
                "tcp_failures": 0,
                "timeouts": 0,
                "http_failures": 0,
            },
        },
    }))
}

fn healthchecks(types: &TypeRegistry) -> SchemaResult<FieldDef> {
    let active = FieldDef::record(
        "active",
        vec![
            types.field("check_type", "type")?.inherit_default(),
            types.field("seconds", "timeout")?.inherit_default(),
            types.field("positive_int", "concurrency")?.inherit_default(),
            types.field("path", "http_path")?.inherit_default(),
            types.field("sni", "https_sni")?,
            types
                .field("https_verify_certificate", "https_verify_certificate")?
                .inherit_default(),
            FieldDef::record(
                "healthy",
                vec![
                    types.field("seconds", "interval")?.inherit_default(),
                    types.field("http_statuses", "http_statuses")?.inherit_default(),
                    types.field("positive_int_or_zero", "successes")?.inherit_default(),
                ],
            ),
            FieldDef::record(
                "unhealthy",
                vec![
                    types.field("seconds", "interval")?.inherit_default(),
                    types.field("http_statuses", "http_statuses")?.inherit_default(),
                    types.field("positive_int_or_zero", "tcp_failures")?.inherit_default(),
                    types.field("positive_int_or_zero", "timeouts")?.inherit_default(),
                    types.field("positive_int_or_zero", "http_failures")?.inherit_default(),
                ],
            ),
        ],
    );

    let passive = FieldDef::record(
        "passive",
        vec![
            types.field("check_type", "type")?.inherit_default(),
            FieldDef::record(
                "healthy",
                vec![
                    types.field("http_statuses", "http_statuses")?.inherit_default(),
                    types.field("positive_int_or_zero", "successes")?.inherit_default(),
                ],
            ),
            FieldDef::record(
                "unhealthy",
                vec![
                    types.field("http_statuses", "http_statuses")?.inherit_default(),
                    types.field("positive_int_or_zero", "tcp_failures")?.inherit_default(),
                    types.field("positive_int_or_zero", "timeouts")?.inherit_default(),
                    types.field("positive_int_or_zero", "http_failures")?.inherit_default(),
                ],
            ),
        ],
    );

    Ok(FieldDef::record("healthchecks", vec![active, passive]).default_tree(healthcheck_defaults()?))
}

/// `if_field` equals `value` (anchored pattern).
fn when(if_field: &str, value: &str) -> SchemaResult<(String, Match)> {
    Ok((if_field.to_string(), Match::pattern(&format!("^{}$", value))?))
}

fn conditional(trigger: (String, Match), then_field: &str, then_match: Match) -> EntityCheck {
    let (if_field, if_match) = trigger;
    EntityCheck::conditional(if_field, if_match, then_field, then_match)
}

pub fn schema(types: &TypeRegistry) -> SchemaResult<EntitySchema> {
    EntitySchema::builder(NAME)
        .primary_key(["id"])
        .field(types.field("uuid", "id")?)
        .field(FieldDef::string("name").required().custom(hooks::validate_upstream_name))
        .field(types.field("hash_on", "hash_on")?)
        .field(types.field("hash_on", "hash_fallback")?)
        .field(types.field("header_name", "hash_on_header")?)
        .field(types.field("header_name", "hash_fallback_header")?)
        .field(FieldDef::string("hash_on_cookie").custom(hooks::validate_cookie_name))
        .field(types.field("path", "hash_on_cookie_path")?.default("/"))
        .field(FieldDef::integer("slots").default(10000).between(10.0, 65536.0))
        .field(healthchecks(types)?)
        .field(types.field("tags", "tags")?)
        // hashing on a header needs the header name
        .check(conditional(when("hash_on", "header")?, "hash_on_header", Match::required()))
        .check(conditional(when("hash_fallback", "header")?, "hash_fallback_header", Match::required()))
        // hashing on a cookie needs the cookie name
        .check(conditional(when("hash_on", "cookie")?, "hash_on_cookie", Match::required()))
        .check(conditional(when("hash_fallback", "cookie")?, "hash_on_cookie", Match::required()))
        // no fallback without a primary hash; cookies always fall back to themselves
        .check(conditional(when("hash_on", "none")?, "hash_fallback", Match::one_of(["none"])))
        .check(conditional(when("hash_on", "cookie")?, "hash_fallback", Match::one_of(["none"])))
        // the fallback must differ from the primary (headers may repeat the kind)
        .check(conditional(
            when("hash_on", "consumer")?,
            "hash_fallback",
            Match::one_of(["none", "ip", "header", "cookie"]),
        ))
        .check(conditional(
            when("hash_on", "ip")?,
            "hash_fallback",
            Match::one_of(["none", "consumer", "header", "cookie"]),
        ))
        .check(EntityCheck::distinct(["hash_on_header", "hash_fallback_header"]))
        .build()
}
