//! Listener catalog lookups.
//!
//! Stations, subscription info, the collection endpoints and the two GraphQL
//! operations the web client issues. Every call goes through the shared
//! [`RestTransport`] and is decoded via [`RestResponse`], so an unexpected body
//! surfaces as [`PandoraError::ApiShape`].

use std::{collections::HashMap, sync::Arc};

use serde_json::{Value, json};
use tracing::debug;

use crate::{
    PandoraError, Res,
    pandora::transport::RestTransport,
    types::{
        Annotation, CollectionEntry, CollectionKind, GraphQlRequest, GraphQlResponse,
        InfoResponse, ItemsResponse, PlaylistsResponse, RecentlyPlayed, StationCurator,
        StationsResponse,
    },
    utils,
};

pub const STATIONS_PAGE_SIZE: u32 = 250;
pub const COLLECTION_LIMIT: u32 = 1000;
pub const PLAYLIST_ANNOTATION_LIMIT: u32 = 100;
pub const RECENTLY_PLAYED_LIMIT: u32 = 10;

pub const STATION_CURATORS_OPERATION: &str = "GetStationCuratorsWeb";
pub const RECENTLY_PLAYED_OPERATION: &str = "GetRecentlyPlayedSourcesWeb";

pub const STATION_CURATORS_QUERY: &str = r#"query GetStationCuratorsWeb($pandoraIds: [String!]!) {
  entities(ids: $pandoraIds) {
    ... on StationFactory {
      pandoraId: id
      curator {
        pandoraId: id
        name
        shareableUrlPath
      }
    }
  }
}"#;

pub const RECENTLY_PLAYED_QUERY: &str = r#"query GetRecentlyPlayedSourcesWeb($limit: Int, $types: [EntityType!]) {
  recentlyPlayedSources(limit: $limit, types: $types) {
    items {
      sourceEntity {
        id
        type
        ... on Station { name }
        ... on Playlist { name }
        ... on Album { name }
        ... on Artist { name }
      }
    }
    __typename
  }
}"#;

pub const RECENTLY_PLAYED_TYPES: &[&str] = &["AL", "AR", "PL", "SF", "ST", "TR", "PC", "PE"];

/// Read-only catalog queries for the signed-in listener.
pub struct Catalog {
    transport: Arc<RestTransport>,
}

impl Catalog {
    pub fn new(transport: Arc<RestTransport>) -> Self {
        Self { transport }
    }

    pub async fn get_stations(&self) -> Res<StationsResponse> {
        self.transport
            .post(
                "/api/v1/station/getStations",
                &json!({ "pageSize": STATIONS_PAGE_SIZE }),
            )
            .await?
            .into_stations()
    }

    pub async fn info_v2(&self) -> Res<InfoResponse> {
        self.transport
            .post("/api/v1/billing/infoV2", &json!({}))
            .await?
            .into_info()
    }

    /// Whether the listener's active product is a Premium tier.
    pub async fn is_premium(&self) -> Res<bool> {
        Ok(is_premium_info(&self.info_v2().await?))
    }

    /// Fails with [`PandoraError::PremiumRequired`] for non-Premium accounts.
    pub async fn check_premium(&self) -> Res<()> {
        let info = self.info_v2().await?;
        if is_premium_info(&info) {
            return Ok(());
        }
        let tier = info
            .active_product
            .map(|p| p.product_tier)
            .unwrap_or_else(|| "none".to_string());
        Err(PandoraError::PremiumRequired(tier))
    }

    pub async fn get_sorted_playlists(&self) -> Res<PlaylistsResponse> {
        let body = json!({
            "allowedTypes": ["TR", "AM"],
            "isRecentModifiedPlaylists": false,
            "request": {
                "annotationLimit": PLAYLIST_ANNOTATION_LIMIT,
                "limit": COLLECTION_LIMIT,
                "sortOrder": "MOST_RECENT_MODIFIED",
            },
        });
        self.transport
            .post("/api/v6/collections/getSortedPlaylists", &body)
            .await?
            .into_playlists()
    }

    pub async fn get_items(&self) -> Res<ItemsResponse> {
        self.transport
            .post(
                "/api/v6/collections/getItems",
                &json!({ "request": { "limit": COLLECTION_LIMIT } }),
            )
            .await?
            .into_items()
    }

    pub async fn graphql(
        &self,
        operation_name: &str,
        query: &str,
        variables: Value,
    ) -> Res<GraphQlResponse> {
        let request = GraphQlRequest {
            operation_name: operation_name.to_string(),
            query: query.to_string(),
            variables,
        };
        debug!(operation = operation_name, "graphql");
        self.transport
            .post("/api/v1/graphql/graphql", &serde_json::to_value(request)?)
            .await?
            .into_graphql()
    }

    /// Curator of each station, keyed by the station factory id.
    pub async fn curate_stations(
        &self,
        stations: &StationsResponse,
        query: &str,
    ) -> Res<Vec<StationCurator>> {
        let ids: Vec<&str> = stations
            .stations
            .iter()
            .map(|s| s.station_factory_pandora_id.as_str())
            .collect();

        self.graphql(
            STATION_CURATORS_OPERATION,
            query,
            json!({ "pandoraIds": ids }),
        )
        .await?
        .data
        .entities
        .ok_or_else(|| PandoraError::shape("data.entities", "no entities"))
    }

    pub async fn recently_played(&self, query: &str, types: &[&str]) -> Res<Vec<RecentlyPlayed>> {
        self.graphql(
            RECENTLY_PLAYED_OPERATION,
            query,
            json!({ "limit": RECENTLY_PLAYED_LIMIT, "types": types }),
        )
        .await?
        .data
        .recently_played_sources
        .map(|sources| sources.items)
        .ok_or_else(|| PandoraError::shape("data.recentlyPlayedSources", "none"))
    }

    /// Stations and playlists of the listener, sorted by name.
    pub async fn collection(&self) -> Res<Vec<CollectionEntry>> {
        let stations = self.get_stations().await?;
        let curators = self
            .curate_stations(&stations, STATION_CURATORS_QUERY)
            .await?;
        let playlists = self.get_sorted_playlists().await?;
        Ok(build_collection(&stations, &curators, &playlists))
    }
}

pub fn is_premium_info(info: &InfoResponse) -> bool {
    info.active_product
        .as_ref()
        .is_some_and(|p| p.product_tier.to_lowercase().contains("premium"))
}

/// Merges stations and playlist annotations into one name-sorted list.
///
/// Only `PL` annotations become playlist entries. Curators are matched on the
/// station factory id; a station without a match has no curator.
pub fn build_collection(
    stations: &StationsResponse,
    curators: &[StationCurator],
    playlists: &PlaylistsResponse,
) -> Vec<CollectionEntry> {
    let curator_names: HashMap<&str, &str> = curators
        .iter()
        .filter_map(|c| {
            c.curator
                .as_ref()
                .map(|cur| (c.pandora_id.as_str(), cur.name.as_str()))
        })
        .collect();

    let playlist_entries = playlists.annotations.values().filter_map(|a| match a {
        Annotation::Playlist(pl) => Some(CollectionEntry {
            kind: CollectionKind::Playlist,
            name: pl.name.clone(),
            id: pl.pandora_id.clone(),
            art: utils::parse_thor(&pl.thor_layers),
            created: utils::datetime_from_millis(pl.time_created),
            updated: utils::datetime_from_millis(pl.time_last_updated),
            color: None,
            curator: None,
            tracks: Some(pl.total_tracks),
            duration: Some(pl.duration),
        }),
        _ => None,
    });

    let station_entries = stations.stations.iter().map(|st| CollectionEntry {
        kind: CollectionKind::Station,
        name: st.name.clone(),
        id: st.pandora_id.clone(),
        art: utils::parse_art(&st.art).into_values().rev().collect(),
        created: utils::parse_date(st.date_created.as_deref()),
        updated: utils::parse_date(st.last_played.as_deref()),
        color: utils::normalize_color(st.dominant_color.as_deref()),
        curator: curator_names
            .get(st.station_factory_pandora_id.as_str())
            .map(|name| name.to_string()),
        tracks: None,
        duration: None,
    });

    let mut entries: Vec<CollectionEntry> = playlist_entries.chain(station_entries).collect();
    entries.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ActiveProduct, Art, Curator, PlaylistAnnotation, Station};

    fn station(name: &str, factory: &str) -> Station {
        Station {
            station_id: format!("{}-sid", name),
            station_factory_pandora_id: factory.to_string(),
            pandora_id: format!("ST:{}", name),
            name: name.to_string(),
            art: vec![
                Art {
                    url: "small".into(),
                    size: 90,
                },
                Art {
                    url: "large".into(),
                    size: 500,
                },
            ],
            date_created: Some("2023-05-01T10:00:00Z".into()),
            dominant_color: Some("a1b2c3".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_premium_tier_detection() {
        let mut info = InfoResponse {
            subscriber: true,
            active_product: Some(ActiveProduct {
                product_tier: "PREMIUM".into(),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(is_premium_info(&info));

        info.active_product = Some(ActiveProduct {
            product_tier: "plus".into(),
            ..Default::default()
        });
        assert!(!is_premium_info(&info));

        info.active_product = None;
        assert!(!is_premium_info(&info));
    }

    #[test]
    fn test_collection_merges_and_sorts() {
        let stations = StationsResponse {
            stations: vec![station("Zeppelin Radio", "SF:1"), station("jazz", "SF:2")],
            ..Default::default()
        };
        let curators = vec![StationCurator {
            pandora_id: "SF:1".into(),
            curator: Some(Curator {
                pandora_id: "CU:1".into(),
                name: "Pandora".into(),
                shareable_url_path: None,
            }),
        }];

        let mut playlists = PlaylistsResponse {
            view: "PL".into(),
            ..Default::default()
        };
        playlists.annotations.insert(
            "PL:1".into(),
            Annotation::Playlist(PlaylistAnnotation {
                pandora_id: "PL:1".into(),
                name: "Mixtape".into(),
                total_tracks: 12,
                duration: 2400,
                thor_layers: "_,:grid(images/aa/bb@1x,images/cc/dd@1y)".into(),
                time_created: 1_700_000_000_000,
                ..Default::default()
            }),
        );
        playlists
            .annotations
            .insert("TR:9".into(), Annotation::Other);

        let entries = build_collection(&stations, &curators, &playlists);
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["jazz", "Mixtape", "Zeppelin Radio"]);

        let mixtape = &entries[1];
        assert_eq!(mixtape.kind, CollectionKind::Playlist);
        assert_eq!(mixtape.tracks, Some(12));
        assert_eq!(mixtape.art.len(), 2);

        let zeppelin = &entries[2];
        assert_eq!(zeppelin.curator.as_deref(), Some("Pandora"));
        assert_eq!(zeppelin.art[0], "large");
        assert_eq!(zeppelin.color.as_deref(), Some("#a1b2c3"));
        assert!(entries[0].curator.is_none());
    }
}
