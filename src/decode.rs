//! JSON decoding with schema-drift detection.
//!
//! Response bodies are parsed into a [`serde_json::Value`] first so unrecognized object keys
//! can be captured into a [`DriftReport`] before the typed deserialization runs. Drift never
//! fails a call—it is a side diagnostic forwarded to the event sink, keeping the client usable
//! while the upstream schema grows fields the local models do not know yet. List-shaped
//! results are checked per element and aggregated by element index.

// std
use std::any::type_name;
// crates.io
use serde::de::DeserializeOwned;
use serde_json::Value;
// self
use crate::{_prelude::*, limit::EndpointKey};

/// Declares the JSON object keys a decodable type maps to known fields.
///
/// Resource DTOs implement this so the decoder can tell additive schema drift apart from the
/// expected shape. Keys listed here are exactly the serde field names (post-rename).
pub trait FieldCatalog {
	/// JSON object keys this type recognizes.
	const FIELDS: &'static [&'static str];
}
// List-shaped results drift per element, against the element's catalog.
impl<T> FieldCatalog for Vec<T>
where
	T: FieldCatalog,
{
	const FIELDS: &'static [&'static str] = T::FIELDS;
}

/// Raised when a successful response body cannot be decoded into the target shape.
#[derive(Debug, ThisError)]
#[error("Response for `{type_name}` from `{endpoint}` could not be decoded.")]
pub struct DecodeError {
	/// Rust type the body was decoded into.
	pub type_name: &'static str,
	/// Endpoint the response came from.
	pub endpoint: EndpointKey,
	/// Structured parsing failure with the JSON path that failed.
	#[source]
	pub source: serde_path_to_error::Error<serde_json::Error>,
}

/// Unrecognized fields found in one JSON object.
#[derive(Clone, Debug, PartialEq)]
pub struct DriftEntry {
	/// Element index for list-shaped results; `None` for a single object.
	pub index: Option<usize>,
	/// Unrecognized field name mapped to its raw value.
	pub fields: BTreeMap<String, Value>,
}

/// Diagnostic describing fields the target type did not recognize.
#[derive(Clone, Debug, PartialEq)]
pub struct DriftReport {
	/// Rust type the body was decoded into.
	pub type_name: &'static str,
	/// Endpoint the response came from.
	pub endpoint: EndpointKey,
	/// Per-object drift entries; never empty.
	pub entries: Vec<DriftEntry>,
}
impl DriftReport {
	/// Deduplicated, sorted names of every drifted field across all entries.
	pub fn field_names(&self) -> Vec<String> {
		let mut names: Vec<String> =
			self.entries.iter().flat_map(|entry| entry.fields.keys().cloned()).collect();

		names.sort();
		names.dedup();

		names
	}
}

/// Typed decode result together with its optional drift diagnostic.
#[derive(Clone, Debug)]
pub struct Decoded<T> {
	/// The typed value with all known fields populated.
	pub value: T,
	/// Drift diagnostic, when the body carried unrecognized fields.
	pub drift: Option<DriftReport>,
}

/// Decodes a response body into `T`, capturing unrecognized fields on the side.
pub fn decode<T>(bytes: &[u8], endpoint: &EndpointKey) -> Result<Decoded<T>, DecodeError>
where
	T: DeserializeOwned + FieldCatalog,
{
	let mut deserializer = serde_json::Deserializer::from_slice(bytes);
	let raw: Value =
		serde_path_to_error::deserialize(&mut deserializer).map_err(|source| DecodeError {
			type_name: type_name::<T>(),
			endpoint: endpoint.clone(),
			source,
		})?;
	let drift = detect_drift::<T>(&raw, endpoint);
	let value = serde_path_to_error::deserialize(raw).map_err(|source| DecodeError {
		type_name: type_name::<T>(),
		endpoint: endpoint.clone(),
		source,
	})?;

	Ok(Decoded { value, drift })
}

fn detect_drift<T>(raw: &Value, endpoint: &EndpointKey) -> Option<DriftReport>
where
	T: FieldCatalog,
{
	let entries = match raw {
		Value::Object(map) => unknown_fields::<T>(map)
			.map(|fields| vec![DriftEntry { index: None, fields }])
			.unwrap_or_default(),
		Value::Array(items) => items
			.iter()
			.enumerate()
			.filter_map(|(index, item)| match item {
				Value::Object(map) => unknown_fields::<T>(map)
					.map(|fields| DriftEntry { index: Some(index), fields }),
				_ => None,
			})
			.collect(),
		_ => Vec::new(),
	};

	if entries.is_empty() {
		None
	} else {
		Some(DriftReport { type_name: type_name::<T>(), endpoint: endpoint.clone(), entries })
	}
}

fn unknown_fields<T>(map: &serde_json::Map<String, Value>) -> Option<BTreeMap<String, Value>>
where
	T: FieldCatalog,
{
	let unknown: BTreeMap<String, Value> = map
		.iter()
		.filter(|(key, _)| !T::FIELDS.contains(&key.as_str()))
		.map(|(key, value)| (key.clone(), value.clone()))
		.collect();

	if unknown.is_empty() { None } else { Some(unknown) }
}
