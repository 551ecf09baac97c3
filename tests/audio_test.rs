use std::sync::Arc;

use async_trait::async_trait;
use pandorcli::{
    PandoraError, Res,
    pandora::{
        audio::{AudioPipeline, DecodedMedia, PlaybackSink, decode, decode_key, xor_decode},
        transport::RestTransport,
    },
    types::AuthContext,
};
use tokio::sync::Mutex;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct LastMedia(Mutex<Option<DecodedMedia>>);

#[async_trait]
impl PlaybackSink for LastMedia {
    async fn play(&self, media: DecodedMedia) -> Res<()> {
        *self.0.lock().await = Some(media);
        Ok(())
    }
}

fn transport(server: &MockServer) -> Arc<RestTransport> {
    let auth = AuthContext {
        auth_token: "t".into(),
        listener_id: "1".into(),
        web_client_version: "1".into(),
    };
    Arc::new(RestTransport::new(server.uri(), auth).unwrap())
}

#[test]
fn test_xor_twice_restores_input() {
    let data: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
    let key = decode_key("c2VjcmV0LWtleQ==").unwrap();
    assert_eq!(key, b"secret-key");

    let once = xor_decode(&data, &key);
    assert_ne!(once, data);
    assert_eq!(xor_decode(&once, &key), data);
}

#[test]
fn test_decode_keeps_length() {
    let data = vec![7u8; 17];
    assert_eq!(decode(&data, "AQID").unwrap().len(), 17);
    assert!(decode(&[], "AQID").unwrap().is_empty());
}

#[test]
fn test_bad_key_is_a_decode_error() {
    assert!(matches!(decode(&[1], "not base64!"), Err(PandoraError::Decode(_))));
}

#[tokio::test]
async fn test_pipeline_decodes_fetched_audio() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/audio/track"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x00, 0x10, 0x20, 0x30]))
        .expect(1)
        .mount(&server)
        .await;

    let sink = Arc::new(LastMedia::default());
    let pipeline = AudioPipeline::new(transport(&server), sink.clone());
    let url = format!("{}/audio/track", server.uri());

    pipeline.play(&url, Some("AQID"), "mp3").await.unwrap();

    let media = sink.0.lock().await.take().unwrap();
    assert_eq!(media.bytes, vec![0x01, 0x12, 0x23, 0x31]);
    assert_eq!(media.encoding, "mp3");
    assert!(media.info.is_none());
}

#[tokio::test]
async fn test_pipeline_passes_unkeyed_audio_through() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/audio/plain"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![9, 8, 7]))
        .mount(&server)
        .await;

    let sink = Arc::new(LastMedia::default());
    let pipeline = AudioPipeline::new(transport(&server), sink.clone());

    pipeline
        .play(&format!("{}/audio/plain", server.uri()), Some("  "), "aac")
        .await
        .unwrap();
    assert_eq!(sink.0.lock().await.take().unwrap().bytes, vec![9, 8, 7]);
}

#[tokio::test]
async fn test_pipeline_reports_http_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let sink = Arc::new(LastMedia::default());
    let pipeline = AudioPipeline::new(transport(&server), sink.clone());

    let err = pipeline
        .play(&format!("{}/audio/missing", server.uri()), None, "mp3")
        .await
        .unwrap_err();
    assert!(matches!(err, PandoraError::Status { code: 404, .. }));
    assert!(sink.0.lock().await.is_none());
}
