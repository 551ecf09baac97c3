//! Integration tests for the playback session controller

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use parking_lot::Mutex;
use pandorcli::{
    PandoraError, Res,
    pandora::{
        audio::{DecodedMedia, PlaybackClock, PlaybackSink},
        retry::RetryPolicy,
        session::{AuthProvider, FALLBACK_COLOR, Session, SessionController, SessionObserver},
        transport::RestTransport,
    },
    types::{AuthContext, Explicitness, SourceType},
};
use serde_json::{Map, Value, json};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct StaticAuth(AuthContext);

impl AuthProvider for StaticAuth {
    fn auth_context(&self) -> Res<AuthContext> {
        Ok(self.0.clone())
    }
}

#[derive(Default)]
struct RecordingSink {
    played: Mutex<Vec<DecodedMedia>>,
}

#[async_trait]
impl PlaybackSink for RecordingSink {
    async fn play(&self, media: DecodedMedia) -> Res<()> {
        self.played.lock().push(media);
        Ok(())
    }
}

#[derive(Default)]
struct RecordingObserver {
    songs: Mutex<Vec<String>>,
}

impl SessionObserver for RecordingObserver {
    fn session_changed(&self, session: &Session) {
        self.songs.lock().push(session.current.song_name.clone());
    }
}

struct Harness {
    server: MockServer,
    controller: SessionController,
    sink: Arc<RecordingSink>,
    clock: PlaybackClock,
}

fn auth() -> AuthContext {
    AuthContext {
        auth_token: "auth-token".into(),
        listener_id: "777".into(),
        web_client_version: "2024.9.1".into(),
    }
}

fn item(server: &MockServer, pandora_id: &str, song: &str, key: Option<&str>) -> Value {
    json!({
        "index": 4,
        "pandoraId": pandora_id,
        "trackToken": format!("token-{}", pandora_id),
        "audioUrl": format!("{}/audio/{}", server.uri(), pandora_id),
        "key": key,
        "encoding": "aacplus",
        "songName": song,
        "artistName": "The Band",
        "albumName": "The Album",
        "duration": 215
    })
}

fn annotations(track_id: &str, color: Option<&str>, explicitness: &str) -> Value {
    let mut track = json!({
        "type": "TR",
        "pandoraId": track_id,
        "name": "Track",
        "artistId": "AR:1",
        "explicitness": explicitness
    });
    if let Some(color) = color {
        track["icon"] = json!({ "dominantColor": color });
    }
    let mut map = Map::new();
    map.insert(track_id.to_string(), track);
    map.insert(
        "AR:1".to_string(),
        json!({ "type": "AR", "pandoraId": "AR:1", "name": "The Band" }),
    );
    Value::Object(map)
}

fn source_body(server: &MockServer, origin_type: &str) -> Value {
    json!({
        "item": item(server, "TR:1", "First Song", Some("AQID")),
        "annotations": annotations("TR:1", Some("a1b2c3"), "EXPLICIT"),
        "source": { "type": origin_type, "pandoraId": "ST:9", "shuffle": false }
    })
}

fn peek_body(server: &MockServer) -> Value {
    json!({
        "item": item(server, "TR:2", "Second Song", None),
        "annotations": annotations("TR:2", None, "CLEAN")
    })
}

async fn mount_json(server: &MockServer, endpoint: &str, body: Value) {
    Mock::given(method("POST"))
        .and(path(endpoint))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(5))
}

async fn harness() -> Harness {
    let h = harness_without_audio().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 6]))
        .mount(&h.server)
        .await;
    h
}

/// Audio responses are left to the test.
async fn harness_without_audio() -> Harness {
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200).insert_header("set-cookie", "csrftoken=csrf-123; Path=/"),
        )
        .mount(&server)
        .await;

    let transport = Arc::new(RestTransport::new(server.uri(), auth()).unwrap());
    transport.bootstrap().await.unwrap();

    let sink = Arc::new(RecordingSink::default());
    let clock = PlaybackClock::new();
    let controller = SessionController::new(
        &StaticAuth(auth()),
        transport,
        sink.clone(),
        clock.clone(),
    )
    .unwrap()
    .with_audio_retry(fast_retry());

    Harness {
        server,
        controller,
        sink,
        clock,
    }
}

#[tokio::test]
async fn test_source_replaces_session_and_plays() {
    let h = harness().await;
    mount_json(&h.server, "/api/v1/playback/source", source_body(&h.server, "Station")).await;

    let observer = Arc::new(RecordingObserver::default());
    h.controller.add_observer(observer.clone());

    let session = h.controller.fetch_source("ST:9").await.unwrap();
    assert_eq!(session.current.pandora_id, "TR:1");
    assert_eq!(
        session.origin.as_ref().map(|o| o.source_type),
        Some(SourceType::Station)
    );
    assert_eq!(h.controller.active_source_id().as_deref(), Some("ST:9"));
    assert_eq!(*observer.songs.lock(), vec!["First Song".to_string()]);

    // six zero bytes xor "AQID" -> [1, 2, 3] repeated
    let played = h.sink.played.lock();
    assert_eq!(played.len(), 1);
    assert_eq!(played[0].bytes, vec![1, 2, 3, 1, 2, 3]);
    assert_eq!(played[0].encoding, "aacplus");
}

#[tokio::test]
async fn test_source_request_carries_device_record() {
    let h = harness().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/playback/source"))
        .and(body_partial_json(json!({
            "sourceId": "ST:9",
            "deviceUuid": h.controller.device_uuid().to_string(),
            "forceActive": true,
            "includeItem": true,
            "skipExplicitCheck": true,
            "deviceProperties": { "listenerId": "777", "site_version": "2024.9.1" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(source_body(&h.server, "Station")))
        .expect(1)
        .mount(&h.server)
        .await;

    h.controller.fetch_source("ST:9").await.unwrap();
}

#[tokio::test]
async fn test_peek_and_skip_keep_origin() {
    let h = harness().await;
    mount_json(&h.server, "/api/v1/playback/source", source_body(&h.server, "Station")).await;
    mount_json(&h.server, "/api/v1/playback/peek", peek_body(&h.server)).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/action/skip"))
        .and(body_partial_json(json!({ "checkOnly": false, "sourceId": "ST:9" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(peek_body(&h.server)))
        .expect(1)
        .mount(&h.server)
        .await;

    let first = h.controller.fetch_source("ST:9").await.unwrap();
    let origin = first.origin.clone();

    let peeked = h.controller.peek().await.unwrap();
    assert_eq!(peeked.current.pandora_id, "TR:2");
    assert_eq!(peeked.origin, origin);

    let skipped = h.controller.skip().await.unwrap();
    assert_eq!(skipped.origin, origin);

    // the unkeyed peek/skip payloads are played as fetched
    let played = h.sink.played.lock();
    assert_eq!(played.len(), 3);
    assert_eq!(played[1].bytes, vec![0u8; 6]);
}

#[tokio::test]
async fn test_peek_without_source_is_not_found() {
    let h = harness().await;
    let err = h.controller.peek().await.unwrap_err();
    assert!(matches!(err, PandoraError::NotFound(_)));
    assert!(h.controller.session().is_none());
}

#[tokio::test]
async fn test_rating_is_gated_on_station_origin() {
    let h = harness().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/action/thumbUp"))
        .and(body_partial_json(json!({
            "trackToken": "token-TR:1",
            "pandoraId": "TR:1",
            "sourceId": "ST:9",
            "index": 4,
            "elapsedTime": 42
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&h.server)
        .await;
    mount_json(&h.server, "/api/v1/playback/source", source_body(&h.server, "Station")).await;

    // no session yet: nothing is sent
    assert!(!h.controller.rate_up().await.unwrap());

    h.controller.fetch_source("ST:9").await.unwrap();
    h.clock.report(42.6);
    assert!(h.controller.rate_up().await.unwrap());
}

#[tokio::test]
async fn test_rating_is_a_no_op_for_on_demand_sources() {
    let h = harness().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/action/removeThumb"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&h.server)
        .await;
    mount_json(&h.server, "/api/v1/playback/source", source_body(&h.server, "Playlist")).await;

    h.controller.fetch_source("PL:1").await.unwrap();
    assert!(!h.controller.remove_rating().await.unwrap());
}

#[tokio::test]
async fn test_derived_queries() {
    let h = harness().await;
    mount_json(&h.server, "/api/v1/playback/source", source_body(&h.server, "Station")).await;
    mount_json(&h.server, "/api/v1/playback/peek", peek_body(&h.server)).await;

    assert!(matches!(
        h.controller.current_track_annotation(),
        Err(PandoraError::NotFound(_))
    ));
    assert_eq!(h.controller.explicitness(), Explicitness::None);
    assert_eq!(h.controller.dominant_color(), FALLBACK_COLOR);

    h.controller.fetch_source("ST:9").await.unwrap();
    assert_eq!(h.controller.explicitness(), Explicitness::Explicit);
    assert_eq!(h.controller.dominant_color(), "#a1b2c3");

    h.controller.peek().await.unwrap();
    assert_eq!(h.controller.explicitness(), Explicitness::Clean);
    assert_eq!(h.controller.dominant_color(), FALLBACK_COLOR);
}

#[tokio::test]
async fn test_unclassified_response_keeps_previous_session() {
    let h = harness().await;
    mount_json(&h.server, "/api/v1/playback/source", json!({ "errorCode": 12, "message": "nope" }))
        .await;

    let err = h.controller.fetch_source("ST:9").await.unwrap_err();
    assert!(matches!(err, PandoraError::ApiShape { .. }));
    assert!(h.controller.session().is_none());
    assert!(h.controller.active_source_id().is_none());
}

#[tokio::test]
async fn test_concerts_for_current_artist() {
    let h = harness().await;
    mount_json(&h.server, "/api/v1/playback/source", source_body(&h.server, "Station")).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/mip/getArtistPageConcerts"))
        .and(body_partial_json(json!({ "pandoraId": "AR:1" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "artistEvents": [{ "name": "Live at the Park" }] })),
        )
        .mount(&h.server)
        .await;

    assert!(matches!(
        h.controller.concerts().await,
        Err(PandoraError::NotFound(_))
    ));

    h.controller.fetch_source("ST:9").await.unwrap();
    let concerts = h.controller.concerts().await.unwrap();
    assert_eq!(concerts.artist_events.len(), 1);
    assert_eq!(concerts.artist_events[0]["name"], "Live at the Park");
}

#[tokio::test]
async fn test_started_event_needs_an_origin() {
    let h = harness().await;
    mount_json(&h.server, "/api/v1/playback/source", source_body(&h.server, "Playlist")).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/event/started"))
        .and(body_partial_json(json!({ "elapsedTime": 0, "sourceId": "ST:9" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&h.server)
        .await;

    assert!(!h.controller.report_started().await.unwrap());
    h.controller.fetch_source("PL:1").await.unwrap();
    assert!(h.controller.report_started().await.unwrap());
}

#[tokio::test]
async fn test_concurrent_fetches_are_serialized() {
    let h = harness().await;
    mount_json(&h.server, "/api/v1/playback/source", source_body(&h.server, "Station")).await;
    mount_json(&h.server, "/api/v1/playback/peek", peek_body(&h.server)).await;
    h.controller.fetch_source("ST:9").await.unwrap();

    let (a, b) = tokio::join!(h.controller.peek(), h.controller.peek());
    a.unwrap();
    b.unwrap();
    assert_eq!(h.sink.played.lock().len(), 3);
}

#[tokio::test]
async fn test_audio_failure_leaves_session_untouched() {
    let h = harness_without_audio().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/playback/source"))
        .respond_with(ResponseTemplate::new(200).set_body_json(source_body(&h.server, "Station")))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/audio/TR:1"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&h.server)
        .await;

    let observer = Arc::new(RecordingObserver::default());
    h.controller.add_observer(observer.clone());

    let err = h.controller.fetch_source("ST:9").await.unwrap_err();
    assert!(matches!(err, PandoraError::Status { code: 404, .. }));
    assert!(h.controller.session().is_none());
    assert!(h.controller.active_source_id().is_none());
    assert!(observer.songs.lock().is_empty());
    assert!(h.sink.played.lock().is_empty());
}

#[tokio::test]
async fn test_flaky_audio_does_not_repeat_the_playback_call() {
    let h = harness_without_audio().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/playback/source"))
        .respond_with(ResponseTemplate::new(200).set_body_json(source_body(&h.server, "Station")))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/audio/TR:1"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/audio/TR:1"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 3]))
        .mount(&h.server)
        .await;

    let session = fast_retry()
        .retry(|| h.controller.fetch_source("ST:9"))
        .await
        .unwrap();
    assert_eq!(session.current.pandora_id, "TR:1");

    let played = h.sink.played.lock();
    assert_eq!(played.len(), 1);
    assert_eq!(played[0].bytes, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_exhausted_audio_retries_end_the_outer_retry() {
    let h = harness_without_audio().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/playback/source"))
        .respond_with(ResponseTemplate::new(200).set_body_json(source_body(&h.server, "Station")))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/audio/TR:1"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&h.server)
        .await;

    let err = fast_retry()
        .retry(|| h.controller.fetch_source("ST:9"))
        .await
        .unwrap_err();
    assert!(matches!(err, PandoraError::RetryExhausted { attempts: 3, .. }));
    assert!(h.controller.session().is_none());
}

#[tokio::test]
async fn test_color_fallback_without_track_annotation() {
    let h = harness().await;
    let mut annotations = Map::new();
    annotations.insert(
        "AR:1".to_string(),
        json!({ "type": "AR", "pandoraId": "AR:1", "name": "The Band" }),
    );
    mount_json(
        &h.server,
        "/api/v1/playback/source",
        json!({
            "item": item(&h.server, "TR:1", "First Song", None),
            "annotations": annotations,
            "source": { "type": "Station", "pandoraId": "ST:9", "shuffle": false }
        }),
    )
    .await;

    h.controller.fetch_source("ST:9").await.unwrap();
    assert!(h.controller.session().is_some());
    assert_eq!(h.controller.dominant_color(), FALLBACK_COLOR);
    assert_eq!(h.controller.explicitness(), Explicitness::None);
    assert!(matches!(
        h.controller.current_track_annotation(),
        Err(PandoraError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_rating_after_peek_on_a_station() {
    let h = harness().await;
    mount_json(&h.server, "/api/v1/playback/source", source_body(&h.server, "Station")).await;
    mount_json(&h.server, "/api/v1/playback/peek", peek_body(&h.server)).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/action/thumbUp"))
        .and(body_partial_json(json!({
            "trackToken": "token-TR:2",
            "pandoraId": "TR:2",
            "sourceId": "ST:9"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&h.server)
        .await;

    h.controller.fetch_source("ST:9").await.unwrap();
    h.controller.peek().await.unwrap();
    assert!(h.controller.rate_up().await.unwrap());
}
