//! Body codecs.
//!
//! A [`Codec`] turns JSON values into request bodies and response bodies back into JSON
//! values. Typed conversion happens in the request layer, so codecs stay object safe and
//! can be swapped per client.
//!
//! [`JsonApi`] is the default: request values are wrapped in a `{"data": ...}` document,
//! and response documents are unwrapped to their primary data. Use [`Resource`] to model
//! JSON:API resource objects.
//!
//! On the serving side, [`render_response`] writes a [`Document`] back out and honors
//! the `fields[<type>]` sparse fieldset parameters of the incoming query.

use http::header::CONTENT_TYPE;
use http::{HeaderValue, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Media type of JSON:API documents.
pub const JSON_API_MEDIA_TYPE: &str = "application/vnd.api+json";

/// Failure to encode or decode a body.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    /// The bytes are not valid JSON, or a value could not be converted.
    #[error("invalid json: {0}")]
    Json(String),

    /// The JSON is well-formed but not a usable document.
    #[error("invalid document: {0}")]
    Document(String),

    /// The server answered with a JSON:API `errors` document.
    #[error("server returned errors: {0}")]
    Errors(String),
}

impl From<serde_json::Error> for CodecError {
    fn from(err: serde_json::Error) -> Self {
        CodecError::Json(err.to_string())
    }
}

/// Encodes request values and decodes response bodies.
pub trait Codec: Send + Sync {
    /// Value of the `Content-Type` header for encoded bodies.
    fn content_type(&self) -> &'static str;

    /// Encodes a value into a request body.
    fn encode(&self, value: Value) -> Result<Vec<u8>, CodecError>;

    /// Decodes a response body into the value to be converted to the result type.
    fn decode(&self, body: &[u8]) -> Result<Value, CodecError>;
}

/// JSON:API document codec.
///
/// # Examples
///
/// ```
/// use courier::codec::{Codec, JsonApi};
/// use serde_json::json;
///
/// let body = br#"{"data": {"type": "users", "id": "1", "attributes": {"name": "Ada"}}}"#;
/// let value = JsonApi.decode(body).unwrap();
/// assert_eq!(value["attributes"]["name"], json!("Ada"));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonApi;

impl Codec for JsonApi {
    fn content_type(&self) -> &'static str {
        JSON_API_MEDIA_TYPE
    }

    fn encode(&self, value: Value) -> Result<Vec<u8>, CodecError> {
        let document = match value {
            Value::Object(map) if map.contains_key("data") => Value::Object(map),
            other => {
                let mut map = Map::new();
                map.insert("data".to_string(), other);
                Value::Object(map)
            }
        };
        Ok(serde_json::to_vec(&document)?)
    }

    fn decode(&self, body: &[u8]) -> Result<Value, CodecError> {
        let document: Value = serde_json::from_slice(body)?;
        let Value::Object(mut map) = document else {
            return Err(CodecError::Document(
                "top level must be an object".to_string(),
            ));
        };

        if let Some(errors) = map.remove("errors") {
            return Err(CodecError::Errors(errors.to_string()));
        }

        map.remove("data")
            .ok_or_else(|| CodecError::Document("missing primary data".to_string()))
    }
}

/// Plain JSON codec; bodies are passed through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Json;

impl Codec for Json {
    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn encode(&self, value: Value) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec(&value)?)
    }

    fn decode(&self, body: &[u8]) -> Result<Value, CodecError> {
        Ok(serde_json::from_slice(body)?)
    }
}

/// A JSON:API resource object.
///
/// ```
/// use courier::codec::Resource;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Account {
///     name: String,
/// }
///
/// let resource = Resource::new("accounts", Account { name: "main".to_string() }).with_id("7");
/// assert_eq!(resource.id.as_deref(), Some("7"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resource<A> {
    /// Resource type name.
    #[serde(rename = "type")]
    pub kind: String,

    /// Resource id; absent on create requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Resource attributes.
    pub attributes: A,

    /// Relationship linkage, kept as raw JSON.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationships: Option<Value>,
}

impl<A> Resource<A> {
    /// Creates a resource of type `kind` without an id, as sent on create.
    pub fn new(kind: impl Into<String>, attributes: A) -> Self {
        Self {
            kind: kind.into(),
            id: None,
            attributes,
            relationships: None,
        }
    }

    /// Sets the resource id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// A top-level JSON:API document.
///
/// Encoding a `Document` through [`JsonApi`] sends it as is, which allows `meta` or
/// `included` to be set explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document<D> {
    pub data: D,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub included: Option<Vec<Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl<D> Document<D> {
    /// Wraps `data` as primary data, with no `included` or `meta`.
    pub fn new(data: D) -> Self {
        Self {
            data,
            included: None,
            meta: None,
        }
    }
}

/// Requested fields per resource type, parsed from `fields[<type>]=a,b` parameters.
pub type Fieldsets = BTreeMap<String, BTreeSet<String>>;

const FIELDS_PARAMETER: &str = "fields";

/// A sparse fieldset the rendered document cannot satisfy.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldsetError {
    /// The parameter is not of the form `fields[<type>]`.
    #[error("malformed fieldset parameter {0:?}")]
    Malformed(String),

    /// No resource in the document has the requested type.
    #[error("fieldset requested for unknown type {0:?}")]
    UnknownType(String),

    /// No resource of the requested type has such an attribute or relationship.
    #[error("field {field:?} does not exist for type {kind:?}")]
    UnknownField { kind: String, field: String },
}

impl FieldsetError {
    /// Status to answer with; always `400 Bad Request`.
    pub fn status(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    /// The JSON:API error object describing this failure.
    pub fn to_error_object(&self) -> Value {
        let parameter = match self {
            FieldsetError::Malformed(key) => key.clone(),
            FieldsetError::UnknownType(kind) | FieldsetError::UnknownField { kind, .. } => {
                format!("{}[{}]", FIELDS_PARAMETER, kind)
            }
        };
        json!({
            "status": self.status().as_str(),
            "title": "Invalid sparse fieldset",
            "detail": self.to_string(),
            "source": {"parameter": parameter},
        })
    }
}

/// Collects the sparse fieldsets named in a raw query string.
///
/// Other parameters are ignored. Field lists are comma separated; an empty list selects
/// no fields at all.
///
/// ```
/// use courier::codec::parse_fieldsets;
///
/// let fieldsets = parse_fieldsets("fields[accounts]=name,balance&page=2").unwrap();
/// assert!(fieldsets["accounts"].contains("balance"));
/// ```
pub fn parse_fieldsets(query: &str) -> Result<Fieldsets, FieldsetError> {
    let mut fieldsets = Fieldsets::new();
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        if key != FIELDS_PARAMETER && !key.starts_with("fields[") {
            continue;
        }

        let kind = key
            .strip_prefix("fields[")
            .and_then(|rest| rest.strip_suffix(']'))
            .filter(|kind| !kind.is_empty() && !kind.contains(['[', ']']))
            .ok_or_else(|| FieldsetError::Malformed(key.to_string()))?;

        fieldsets.entry(kind.to_string()).or_default().extend(
            value
                .split(',')
                .map(str::trim)
                .filter(|field| !field.is_empty())
                .map(str::to_string),
        );
    }
    Ok(fieldsets)
}

/// Drops the attributes and relationships not named in `fieldsets` from every resource
/// in `data` and `included`.
///
/// Types without a fieldset are left whole. The document is validated before anything is
/// removed.
pub fn sparse_fields(mut document: Value, fieldsets: &Fieldsets) -> Result<Value, FieldsetError> {
    if fieldsets.is_empty() {
        return Ok(document);
    }

    let resources = resource_objects(&mut document);
    if !resources.is_empty() {
        if let Some(kind) = fieldsets
            .keys()
            .find(|kind| !resources.iter().any(|r| resource_kind(r) == Some(kind.as_str())))
        {
            return Err(FieldsetError::UnknownType(kind.clone()));
        }
    }

    for (kind, fields) in fieldsets {
        let of_kind: Vec<_> = resources
            .iter()
            .filter(|r| resource_kind(r) == Some(kind.as_str()))
            .collect();
        if of_kind.is_empty() {
            continue;
        }
        if let Some(field) = fields
            .iter()
            .find(|field| !of_kind.iter().any(|r| has_member(r, field)))
        {
            return Err(FieldsetError::UnknownField {
                kind: kind.clone(),
                field: field.clone(),
            });
        }
    }

    for resource in resources {
        let Some(fields) = resource_kind(resource).and_then(|kind| fieldsets.get(kind)) else {
            continue;
        };
        for member in ["attributes", "relationships"] {
            if let Some(Value::Object(values)) = resource.get_mut(member) {
                values.retain(|name, _| fields.contains(name));
            }
        }
    }

    Ok(document)
}

/// Renders `document` as a JSON:API response, applying the sparse fieldsets in `query`.
///
/// A fieldset the document cannot satisfy answers `400` with an `errors` document
/// carrying the first problem found. A document that cannot be serialized answers `500`
/// with an empty body.
///
/// ```
/// use courier::codec::{render_response, Document, Resource};
/// use serde_json::json;
///
/// let document = Document::new(vec![
///     Resource::new("accounts", json!({"name": "main", "balance": 10})).with_id("1"),
/// ]);
///
/// let response = render_response(&document, Some("fields[accounts]=name"));
/// assert_eq!(response.status(), 200);
///
/// let response = render_response(&document, Some("fields[accounts]=owner"));
/// assert_eq!(response.status(), 400);
/// ```
pub fn render_response<D: Serialize>(
    document: &Document<D>,
    query: Option<&str>,
) -> http::Response<Vec<u8>> {
    let value = match serde_json::to_value(document) {
        Ok(value) => value,
        Err(e) => {
            tracing::error!(error = %e, "Unable to marshal document");
            return respond(StatusCode::INTERNAL_SERVER_ERROR, Vec::new());
        }
    };

    let filtered =
        parse_fieldsets(query.unwrap_or_default()).and_then(|fieldsets| sparse_fields(value, &fieldsets));

    let (status, body) = match filtered {
        Ok(document) => (StatusCode::OK, serde_json::to_vec(&document)),
        Err(e) => {
            tracing::warn!(error = %e, "Rejecting sparse fieldset");
            (
                e.status(),
                serde_json::to_vec(&json!({"errors": [e.to_error_object()]})),
            )
        }
    };

    match body {
        Ok(body) => respond(status, body),
        Err(e) => {
            tracing::error!(error = %e, "Unable to write response");
            respond(StatusCode::INTERNAL_SERVER_ERROR, Vec::new())
        }
    }
}

fn respond(status: StatusCode, body: Vec<u8>) -> http::Response<Vec<u8>> {
    let has_body = !body.is_empty();
    let mut response = http::Response::new(body);
    *response.status_mut() = status;
    if has_body {
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(JSON_API_MEDIA_TYPE));
    }
    response
}

fn resource_objects(document: &mut Value) -> Vec<&mut Map<String, Value>> {
    let Value::Object(top) = document else {
        return Vec::new();
    };

    let mut resources = Vec::new();
    for (key, member) in top.iter_mut() {
        if key != "data" && key != "included" {
            continue;
        }
        match member {
            Value::Object(resource) => resources.push(resource),
            Value::Array(items) => {
                resources.extend(items.iter_mut().filter_map(Value::as_object_mut))
            }
            _ => {}
        }
    }
    resources
}

fn resource_kind(resource: &Map<String, Value>) -> Option<&str> {
    resource.get("type").and_then(Value::as_str)
}

fn has_member(resource: &Map<String, Value>, field: &str) -> bool {
    ["attributes", "relationships"].iter().any(|member| {
        resource
            .get(*member)
            .and_then(Value::as_object)
            .is_some_and(|values| values.contains_key(field))
    })
}
