use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tabled::Tabled;

/// Listener identity minted by the sign-in flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub auth_token: String,
    pub listener_id: String,
    pub web_client_version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Icon {
    pub art_id: Option<String>,
    pub dominant_color: Option<String>,
    pub art_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Art {
    pub url: String,
    pub size: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Explicitness {
    Explicit,
    Clean,
    #[default]
    #[serde(other)]
    None,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackAnnotation {
    pub pandora_id: String,
    pub name: String,
    pub duration: u64,
    pub track_number: Option<u32>,
    pub album_id: Option<String>,
    pub album_name: Option<String>,
    pub artist_id: Option<String>,
    pub artist_name: Option<String>,
    pub explicitness: Explicitness,
    pub icon: Option<Icon>,
    pub isrc: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArtistAnnotation {
    pub pandora_id: String,
    pub name: String,
    pub station_factory_id: Option<String>,
    pub album_count: u32,
    pub track_count: u32,
    pub icon: Option<Icon>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AlbumAnnotation {
    pub pandora_id: String,
    pub name: String,
    pub artist_id: Option<String>,
    pub artist_name: Option<String>,
    pub release_date: Option<String>,
    pub track_count: u32,
    pub explicitness: Explicitness,
    pub icon: Option<Icon>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlaylistAnnotation {
    pub pandora_id: String,
    pub name: String,
    pub description: String,
    pub time_created: i64,
    pub time_last_updated: i64,
    pub total_tracks: u32,
    pub duration: u64,
    pub thor_layers: String,
    pub is_private: bool,
    pub linked_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlaylistCuratorAnnotation {
    pub pandora_id: String,
    pub listener_id: Option<u64>,
    pub webname: String,
    pub fullname: String,
    pub displayname: String,
}

/// Metadata record returned alongside playback and collection responses,
/// discriminated by its `type` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Annotation {
    #[serde(rename = "TR")]
    Track(TrackAnnotation),
    #[serde(rename = "AR")]
    Artist(ArtistAnnotation),
    #[serde(rename = "AL")]
    Album(AlbumAnnotation),
    #[serde(rename = "PL")]
    Playlist(PlaylistAnnotation),
    #[serde(rename = "LI")]
    PlaylistCurator(PlaylistCuratorAnnotation),
    #[serde(other)]
    Other,
}

pub type AnnotationMap = BTreeMap<String, Annotation>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackItem {
    pub index: u32,
    pub pandora_id: String,
    pub track_token: String,
    pub source_id: Option<String>,
    pub item_id: Option<String>,
    pub audio_url: String,
    pub key: Option<String>,
    pub encoding: String,
    #[serde(rename = "filegain")]
    pub file_gain: Option<String>,
    pub song_name: String,
    pub artist_name: String,
    pub album_name: String,
    pub duration: u64,
    pub art_url: Option<String>,
    pub explicitness: Explicitness,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceType {
    Station,
    Playlist,
    Album,
    Track,
    ArtistPlay,
    #[default]
    #[serde(other)]
    Other,
}

/// The station or on-demand entity that produced the current track.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SourceDescriptor {
    #[serde(rename = "type")]
    pub source_type: SourceType,
    pub pandora_id: String,
    pub repeat: Option<String>,
    pub shuffle: bool,
    pub current_index: Option<u32>,
    pub source_name: Option<String>,
    pub artist_name: Option<String>,
}

impl SourceDescriptor {
    pub fn is_station(&self) -> bool {
        self.source_type == SourceType::Station
    }
}

/// Body of `playback/source`, `playback/peek` and `action/skip`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceResponse {
    pub item: TrackItem,
    #[serde(default)]
    pub annotations: AnnotationMap,
    #[serde(default)]
    pub source: Option<SourceDescriptor>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Station {
    pub station_id: String,
    pub station_factory_pandora_id: String,
    pub pandora_id: String,
    pub name: String,
    pub art: Vec<Art>,
    pub date_created: Option<String>,
    pub last_played: Option<String>,
    pub total_play_time: u64,
    pub dominant_color: Option<String>,
    pub is_shuffle: bool,
    pub is_thumbprint: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationsResponse {
    #[serde(default)]
    pub total_stations: u32,
    #[serde(default)]
    pub sorted_by: Option<String>,
    #[serde(default)]
    pub index: u32,
    pub stations: Vec<Station>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActiveProduct {
    pub billing_territory: Option<String>,
    pub product_tier: String,
    pub product_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoResponse {
    pub subscriber: bool,
    #[serde(default)]
    pub active_product: Option<ActiveProduct>,
    #[serde(default)]
    pub auto_renew: bool,
    #[serde(default)]
    pub billing_account_name: Option<String>,
}

/// Entry of the `items` array of the collection endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CollectionItem {
    pub pandora_id: String,
    pub pandora_type: String,
    pub name: Option<String>,
    pub added_time: Option<i64>,
    pub updated_time: Option<i64>,
    pub linked_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistsResponse {
    pub view: String,
    #[serde(default)]
    pub listener_id: Option<u64>,
    #[serde(default)]
    pub total_count: u32,
    #[serde(default)]
    pub annotations: AnnotationMap,
    #[serde(default)]
    pub sort_order: Option<String>,
    #[serde(default)]
    pub items: Vec<CollectionItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemsResponse {
    #[serde(default)]
    pub listener_id: Option<u64>,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub version: u64,
    pub items: Vec<CollectionItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Curator {
    pub pandora_id: String,
    pub name: String,
    pub shareable_url_path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StationCurator {
    pub pandora_id: String,
    pub curator: Option<Curator>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceEntity {
    pub id: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecentlyPlayed {
    pub source_entity: SourceEntity,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecentlyPlayedSources {
    pub items: Vec<RecentlyPlayed>,
    #[serde(rename = "__typename", alias = "_typename")]
    pub typename: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GraphQlData {
    pub entities: Option<Vec<StationCurator>>,
    pub recently_played_sources: Option<RecentlyPlayedSources>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphQlResponse {
    pub data: GraphQlData,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConcertsResponse {
    pub artist_events: Vec<Value>,
}

/// Body of a GraphQL request; the query document is opaque to the client.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQlRequest {
    pub operation_name: String,
    pub query: String,
    pub variables: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    Station,
    Playlist,
}

/// A station or playlist as shown in the listener's collection.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionEntry {
    pub kind: CollectionKind,
    pub name: String,
    pub id: String,
    pub art: Vec<String>,
    pub created: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    pub color: Option<String>,
    pub curator: Option<String>,
    pub tracks: Option<u32>,
    pub duration: Option<u64>,
}

#[derive(Tabled)]
pub struct StationTableRow {
    pub name: String,
    pub id: String,
    pub created: String,
}

#[derive(Tabled)]
pub struct CollectionTableRow {
    pub kind: String,
    pub name: String,
    pub details: String,
}
