// Copyright (c) 2025 - Cowboy AI, Inc.
//! Identity Hashing
//!
//! A content fingerprint over the parts of an element that define *what* it
//! is, as opposed to how it is named or annotated. Two feeds reporting the
//! same resource produce the same hash even if names or properties differ.
//!
//! ```text
//! sha256( tag \n id \n field \n field ... )  ->  lowercase hex
//! ```

use sha2::{Digest, Sha256};

use super::entity::Element;

/// Identity hash of a syncable element
///
/// Tenants, environments, relationships and bare structured data are not
/// synced between feeds and have no identity hash.
pub fn identity_hash(element: &Element) -> Option<String> {
    let fields: Vec<String> = match element {
        Element::Feed(_) | Element::ResourceType(_) | Element::OperationType(_) => Vec::new(),
        Element::MetricType(mt) => vec![
            mt.unit.as_str().to_string(),
            mt.data_type.as_str().to_string(),
        ],
        Element::Resource(r) => vec![r.resource_type.to_string()],
        Element::Metric(m) => vec![m.metric_type.to_string()],
        Element::DataEntity(d) => vec![serde_json::to_string(&d.value).ok()?],
        Element::Tenant(_)
        | Element::Environment(_)
        | Element::Relationship(_)
        | Element::StructuredData(_)
        | Element::ShallowStructuredData(_) => return None,
    };
    let segment_type = element.segment_type()?;
    let id = element.id()?;

    let mut hasher = Sha256::new();
    hasher.update(segment_type.tag().as_bytes());
    hasher.update(b"\n");
    hasher.update(id.as_bytes());
    for field in fields {
        hasher.update(b"\n");
        hasher.update(field.as_bytes());
    }
    Some(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Placement, Properties, Resource};
    use crate::path::CanonicalPath;

    fn resource(name: &str, tenant: &str) -> Element {
        Element::Resource(Resource {
            location: Placement::environment(tenant, "prod"),
            id: "web01".to_string(),
            name: Some(name.to_string()),
            resource_type: CanonicalPath::parse("/t;acme/rt;server").unwrap(),
            properties: Properties::new(),
        })
    }

    #[test]
    fn test_hash_ignores_names_and_location() {
        let a = identity_hash(&resource("first", "acme")).unwrap();
        let b = identity_hash(&resource("second", "other")).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_hash_depends_on_type_reference() {
        let mut other = resource("first", "acme");
        if let Element::Resource(r) = &mut other {
            r.resource_type = CanonicalPath::parse("/t;acme/rt;router").unwrap();
        }
        assert_ne!(
            identity_hash(&resource("first", "acme")),
            identity_hash(&other)
        );
    }

    #[test]
    fn test_tenants_have_no_hash() {
        let tenant = Element::Tenant(crate::model::Tenant {
            id: "acme".to_string(),
            name: None,
            properties: Properties::new(),
        });
        assert_eq!(identity_hash(&tenant), None);
    }
}
