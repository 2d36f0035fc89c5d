//! Detail Codec
//!
//! Converts between a module's typed details and the generic persisted
//! representation, splitting sensitive fields into a secure sub-map.
//!
//! Hydration fails closed: a missing required field is an error from
//! deserialization, and a persisted key with no corresponding field on the
//! typed shape is an `UnknownField` error. Partially-hydrated state is
//! never produced, since later steps would silently act on it.

mod errors;

pub use errors::{CodecError, CodecResult};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::model::DetailMap;

/// A module's typed view of instance or binding details.
///
/// Must serialize to a JSON object. Fields named in `SECURE_FIELDS` are
/// routed to the secure sub-map on flatten and merged back on hydrate.
pub trait TypedDetails: Serialize + DeserializeOwned {
    /// Top-level field names considered sensitive.
    const SECURE_FIELDS: &'static [&'static str];
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Split typed details into `(details, secure_details)` maps.
///
/// The non-secure map never contains a field named in `SECURE_FIELDS`.
pub fn flatten<D: TypedDetails>(details: &D) -> CodecResult<(DetailMap, DetailMap)> {
    let value = serde_json::to_value(details)?;
    let Value::Object(fields) = value else {
        return Err(CodecError::NotAnObject(value_kind(&value)));
    };

    let mut public = DetailMap::new();
    let mut secure = DetailMap::new();
    for (key, value) in fields {
        if D::SECURE_FIELDS.contains(&key.as_str()) {
            secure.insert(key, value);
        } else {
            public.insert(key, value);
        }
    }
    Ok((public, secure))
}

/// Rebuild typed details from the persisted maps.
///
/// A key present in both maps, a missing required field, or a key with no
/// corresponding typed field are all errors.
pub fn hydrate<D: TypedDetails>(details: &DetailMap, secure_details: &DetailMap) -> CodecResult<D> {
    let mut merged = serde_json::Map::new();
    for (key, value) in details.iter().chain(secure_details.iter()) {
        if merged.insert(key.clone(), value.clone()).is_some() {
            return Err(CodecError::DuplicateKey(key.clone()));
        }
    }

    let hydrated: D = serde_json::from_value(Value::Object(merged.clone()))?;

    // Unknown keys are detected by re-flattening the hydrated value: any
    // input key the typed shape did not absorb must be stale or mistyped.
    let reserialized = serde_json::to_value(&hydrated)?;
    let Value::Object(known) = reserialized else {
        return Err(CodecError::NotAnObject(value_kind(&reserialized)));
    };
    for key in merged.keys() {
        if !known.contains_key(key) {
            return Err(CodecError::UnknownField(key.clone()));
        }
    }

    Ok(hydrated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct DbDetails {
        host: String,
        port: u16,
        admin_user: String,
        admin_password: String,
    }

    impl TypedDetails for DbDetails {
        const SECURE_FIELDS: &'static [&'static str] = &["admin_password"];
    }

    fn sample() -> DbDetails {
        DbDetails {
            host: "db.internal".to_string(),
            port: 5432,
            admin_user: "root".to_string(),
            admin_password: "s3cret".to_string(),
        }
    }

    #[test]
    fn test_flatten_partitions_secure_fields() {
        let (public, secure) = flatten(&sample()).unwrap();
        assert_eq!(public["host"], json!("db.internal"));
        assert_eq!(public["port"], json!(5432));
        assert!(!public.contains_key("admin_password"));
        assert_eq!(secure["admin_password"], json!("s3cret"));
        assert_eq!(secure.len(), 1);
    }

    #[test]
    fn test_hydrate_reverses_flatten() {
        let (public, secure) = flatten(&sample()).unwrap();
        let hydrated: DbDetails = hydrate(&public, &secure).unwrap();
        assert_eq!(hydrated, sample());
    }

    #[test]
    fn test_hydrate_missing_required_field_fails() {
        let (public, _) = flatten(&sample()).unwrap();
        // Secure map lost: admin_password is required, so hydration must
        // fail rather than fill in a zero value.
        let err = hydrate::<DbDetails>(&public, &DetailMap::new()).unwrap_err();
        assert!(matches!(err, CodecError::Hydration(_)));
    }

    #[test]
    fn test_hydrate_unknown_field_fails() {
        let (mut public, secure) = flatten(&sample()).unwrap();
        public.insert("reigon".to_string(), json!("eu-1"));
        let err = hydrate::<DbDetails>(&public, &secure).unwrap_err();
        assert!(matches!(err, CodecError::UnknownField(k) if k == "reigon"));
    }

    #[test]
    fn test_hydrate_duplicate_key_fails() {
        let (public, mut secure) = flatten(&sample()).unwrap();
        secure.insert("host".to_string(), json!("other.host"));
        let err = hydrate::<DbDetails>(&public, &secure).unwrap_err();
        assert!(matches!(err, CodecError::DuplicateKey(k) if k == "host"));
    }

    #[test]
    fn test_flatten_rejects_non_object() {
        #[derive(Serialize, Deserialize)]
        struct Bare(u32);
        impl TypedDetails for Bare {
            const SECURE_FIELDS: &'static [&'static str] = &[];
        }
        let err = flatten(&Bare(7)).unwrap_err();
        assert!(matches!(err, CodecError::NotAnObject("number")));
    }
}
