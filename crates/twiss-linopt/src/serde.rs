use std::collections::BTreeMap;
use std::iter::FromIterator;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use twiss_core::{ErrorInfo, OpticsError, SchemaVersion};

use crate::hash::optics_hash;
use crate::record::LinearOptics;

fn serde_error(code: &str, err: impl ToString) -> OpticsError {
    OpticsError::Serde(ErrorInfo::new(code, err.to_string()))
}

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let ordered = map
                .into_iter()
                .map(|(key, value)| (key, canonicalize(value)))
                .collect::<BTreeMap<_, _>>();
            Value::Object(Map::from_iter(ordered))
        }
        Value::Array(values) => Value::Array(values.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Serializes a value into JSON bytes with sorted object keys.
pub fn to_canonical_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, OpticsError> {
    let value = serde_json::to_value(value).map_err(|err| serde_error("json-serialize", err))?;
    let mut bytes = Vec::new();
    serde_json::to_writer(&mut bytes, &canonicalize(value))
        .map_err(|err| serde_error("json-write", err))?;
    Ok(bytes)
}

/// Deserializes a value from JSON bytes.
pub fn from_json_slice<T: DeserializeOwned>(data: &[u8]) -> Result<T, OpticsError> {
    serde_json::from_slice(data).map_err(|err| serde_error("json-deserialize", err))
}

/// Deserializes a YAML payload into the requested type.
pub fn from_yaml_slice<T: DeserializeOwned>(data: &[u8]) -> Result<T, OpticsError> {
    serde_yaml::from_slice(data).map_err(|err| serde_error("yaml-deserialize", err))
}

/// Versioned optics payload as written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpticsDocument {
    /// Payload schema.
    pub schema: SchemaVersion,
    /// Content hash of `optics`.
    pub hash: String,
    /// The optics result.
    pub optics: LinearOptics,
}

/// Wraps `optics` with its schema version and content hash and renders it as pretty JSON.
pub fn optics_to_json(optics: &LinearOptics) -> Result<String, OpticsError> {
    let document = OpticsDocument {
        schema: SchemaVersion::default(),
        hash: optics_hash(optics)?,
        optics: optics.clone(),
    };
    serde_json::to_string_pretty(&document).map_err(|err| serde_error("json-serialize", err))
}

/// Parses a document written by [`optics_to_json`] and verifies its hash.
pub fn optics_from_json(text: &str) -> Result<LinearOptics, OpticsError> {
    let document: OpticsDocument = from_json_slice(text.as_bytes())?;
    if document.schema.major != SchemaVersion::default().major {
        return Err(OpticsError::Serde(
            ErrorInfo::new("schema-version", "unsupported optics schema")
                .with_context("major", document.schema.major),
        ));
    }
    let actual = optics_hash(&document.optics)?;
    if actual != document.hash {
        return Err(OpticsError::Serde(
            ErrorInfo::new("hash-mismatch", "optics payload does not match its hash")
                .with_context("expected", &document.hash)
                .with_context("actual", actual),
        ));
    }
    Ok(document.optics)
}
