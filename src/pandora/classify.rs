//! Response classification.
//!
//! The REST endpoints return structurally similar JSON objects without a type
//! field. Each [`ResponseKind`] owns one structural predicate; exactly one of
//! them must hold for a well-formed body. The body is then decoded once into
//! the matching [`RestResponse`] variant, and callers switch on that variant
//! instead of probing fields again.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    PandoraError, Res,
    types::{
        ConcertsResponse, GraphQlResponse, InfoResponse, ItemsResponse, PlaylistsResponse,
        SourceResponse, StationsResponse,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseKind {
    Stations,
    Info,
    Playlists,
    Items,
    GraphQl,
    Source,
    /// `playback/peek` and `action/skip`: a source body without `source`.
    Peek,
    Concerts,
}

impl ResponseKind {
    pub const ALL: [ResponseKind; 8] = [
        ResponseKind::Stations,
        ResponseKind::Info,
        ResponseKind::Playlists,
        ResponseKind::Items,
        ResponseKind::GraphQl,
        ResponseKind::Source,
        ResponseKind::Peek,
        ResponseKind::Concerts,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ResponseKind::Stations => "Stations",
            ResponseKind::Info => "Info",
            ResponseKind::Playlists => "Playlists",
            ResponseKind::Items => "Items",
            ResponseKind::GraphQl => "GraphQL",
            ResponseKind::Source => "Source",
            ResponseKind::Peek => "Peek",
            ResponseKind::Concerts => "Concerts",
        }
    }

    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ResponseKind::Stations => is_stations(value),
            ResponseKind::Info => is_info(value),
            ResponseKind::Playlists => is_playlists(value),
            ResponseKind::Items => is_items(value),
            ResponseKind::GraphQl => is_graphql(value),
            ResponseKind::Source => is_source(value),
            ResponseKind::Peek => is_peek(value),
            ResponseKind::Concerts => is_concerts(value),
        }
    }
}

pub fn is_stations(value: &Value) -> bool {
    value.get("stations").is_some_and(Value::is_array)
}

pub fn is_info(value: &Value) -> bool {
    value.get("subscriber").is_some_and(Value::is_boolean)
}

pub fn is_playlists(value: &Value) -> bool {
    value.get("view").and_then(Value::as_str) == Some("PL")
}

pub fn is_items(value: &Value) -> bool {
    value.get("items").is_some_and(Value::is_array)
        && value.get("annotations").is_none()
        && value.get("view").is_none()
}

pub fn is_graphql(value: &Value) -> bool {
    value.get("data").is_some_and(Value::is_object)
}

fn has_audio_url(value: &Value) -> bool {
    value
        .pointer("/item/audioUrl")
        .and_then(Value::as_str)
        .is_some_and(|url| !url.is_empty())
}

fn has_source(value: &Value) -> bool {
    value.get("source").is_some_and(Value::is_object)
}

pub fn is_source(value: &Value) -> bool {
    has_audio_url(value) && has_source(value)
}

pub fn is_peek(value: &Value) -> bool {
    has_audio_url(value) && !has_source(value)
}

/// Skip responses share the peek shape.
pub fn is_skip(value: &Value) -> bool {
    is_peek(value)
}

pub fn is_concerts(value: &Value) -> bool {
    value.get("artistEvents").is_some_and(Value::is_array)
}

/// Finds the single response kind a body matches.
///
/// # Errors
///
/// [`PandoraError::ApiShape`] when no predicate holds, or when more than one
/// does (the body is ambiguous and cannot be trusted either way).
pub fn classify(value: &Value) -> Res<ResponseKind> {
    let matched: Vec<ResponseKind> = ResponseKind::ALL
        .into_iter()
        .filter(|kind| kind.matches(value))
        .collect();

    match matched.as_slice() {
        [kind] => Ok(*kind),
        [] => Err(PandoraError::shape("a known response", describe(value))),
        many => Err(PandoraError::shape(
            "exactly one response shape",
            many.iter().map(|k| k.name()).collect::<Vec<_>>().join(" + "),
        )),
    }
}

/// Short description of a body for error messages.
pub fn describe(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let keys: Vec<&str> = map.keys().map(String::as_str).take(8).collect();
            format!("object with keys [{}]", keys.join(", "))
        }
        Value::Array(items) => format!("array of {} elements", items.len()),
        Value::Null => "null".to_string(),
        other => format!("scalar {}", other),
    }
}

/// A classified REST body, decoded into its typed shape.
#[derive(Debug, Clone, PartialEq)]
pub enum RestResponse {
    Stations(StationsResponse),
    Info(InfoResponse),
    Playlists(PlaylistsResponse),
    Items(ItemsResponse),
    GraphQl(GraphQlResponse),
    Source(SourceResponse),
    Peek(SourceResponse),
    Concerts(ConcertsResponse),
}

impl RestResponse {
    pub fn from_value(value: Value) -> Res<Self> {
        let kind = classify(&value)?;
        let response = match kind {
            ResponseKind::Stations => RestResponse::Stations(decode(kind, value)?),
            ResponseKind::Info => RestResponse::Info(decode(kind, value)?),
            ResponseKind::Playlists => RestResponse::Playlists(decode(kind, value)?),
            ResponseKind::Items => RestResponse::Items(decode(kind, value)?),
            ResponseKind::GraphQl => RestResponse::GraphQl(decode(kind, value)?),
            ResponseKind::Source => RestResponse::Source(decode(kind, value)?),
            ResponseKind::Peek => RestResponse::Peek(decode(kind, value)?),
            ResponseKind::Concerts => RestResponse::Concerts(decode(kind, value)?),
        };
        Ok(response)
    }

    pub fn kind(&self) -> ResponseKind {
        match self {
            RestResponse::Stations(_) => ResponseKind::Stations,
            RestResponse::Info(_) => ResponseKind::Info,
            RestResponse::Playlists(_) => ResponseKind::Playlists,
            RestResponse::Items(_) => ResponseKind::Items,
            RestResponse::GraphQl(_) => ResponseKind::GraphQl,
            RestResponse::Source(_) => ResponseKind::Source,
            RestResponse::Peek(_) => ResponseKind::Peek,
            RestResponse::Concerts(_) => ResponseKind::Concerts,
        }
    }

    fn mismatch(&self, expected: &str) -> PandoraError {
        PandoraError::shape(expected, self.kind().name())
    }

    pub fn into_stations(self) -> Res<StationsResponse> {
        match self {
            RestResponse::Stations(r) => Ok(r),
            other => Err(other.mismatch("Stations")),
        }
    }

    pub fn into_info(self) -> Res<InfoResponse> {
        match self {
            RestResponse::Info(r) => Ok(r),
            other => Err(other.mismatch("Info")),
        }
    }

    pub fn into_playlists(self) -> Res<PlaylistsResponse> {
        match self {
            RestResponse::Playlists(r) => Ok(r),
            other => Err(other.mismatch("Playlists")),
        }
    }

    pub fn into_items(self) -> Res<ItemsResponse> {
        match self {
            RestResponse::Items(r) => Ok(r),
            other => Err(other.mismatch("Items")),
        }
    }

    pub fn into_graphql(self) -> Res<GraphQlResponse> {
        match self {
            RestResponse::GraphQl(r) => Ok(r),
            other => Err(other.mismatch("GraphQL")),
        }
    }

    /// Accepts both source-shaped variants; `source` is `None` for peek/skip.
    pub fn into_source(self) -> Res<SourceResponse> {
        match self {
            RestResponse::Source(r) | RestResponse::Peek(r) => Ok(r),
            other => Err(other.mismatch("Source")),
        }
    }

    pub fn into_concerts(self) -> Res<ConcertsResponse> {
        match self {
            RestResponse::Concerts(r) => Ok(r),
            other => Err(other.mismatch("Concerts")),
        }
    }
}

fn decode<T: DeserializeOwned>(kind: ResponseKind, value: Value) -> Res<T> {
    serde_json::from_value(value).map_err(|e| PandoraError::shape(kind.name(), e.to_string()))
}
