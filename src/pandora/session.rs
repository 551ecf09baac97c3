//! Playback session state.
//!
//! [`SessionController`] owns the single cached [`Session`]. `source`, `peek`
//! and `skip` each replace it wholesale; they are serialized so that two
//! replacements never interleave. Readers receive `Arc<Session>` snapshots
//! and derived values, never a mutable view.
//!
//! A replacement only commits once the new track's audio has been fetched
//! and decoded. The audio download is retried on its own so that a flaky
//! CDN never causes a second playback call.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    PandoraError, Res,
    pandora::{
        audio::{AudioPipeline, PlaybackClock, PlaybackSink},
        device::DeviceProperties,
        retry::RetryPolicy,
        transport::RestTransport,
    },
    types::{
        Annotation, AnnotationMap, ArtistAnnotation, AuthContext, ConcertsResponse, Explicitness,
        SourceDescriptor, TrackAnnotation, TrackItem,
    },
    utils,
};

pub const FALLBACK_COLOR: &str = "#ffffff";

/// Supplies the listener identity minted by the sign-in flow.
pub trait AuthProvider: Send + Sync {
    fn auth_context(&self) -> Res<AuthContext>;
}

/// Notified after every session replacement.
pub trait SessionObserver: Send + Sync {
    fn session_changed(&self, session: &Session);
}

/// The cached playback context.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub current: TrackItem,
    pub annotations: AnnotationMap,
    /// Set by `source` only; carried over unchanged by `peek` and `skip`.
    pub origin: Option<SourceDescriptor>,
}

impl Session {
    /// The track annotation of the current item, or the first track annotation.
    pub fn track_annotation(&self) -> Option<&TrackAnnotation> {
        if let Some(Annotation::Track(track)) = self.annotations.get(&self.current.pandora_id) {
            return Some(track);
        }
        self.annotations.values().find_map(|a| match a {
            Annotation::Track(track) => Some(track),
            _ => None,
        })
    }

    /// The artist of the current track, or the first artist annotation.
    pub fn artist_annotation(&self) -> Option<&ArtistAnnotation> {
        let artist_id = self.track_annotation().and_then(|t| t.artist_id.as_deref());
        if let Some(Annotation::Artist(artist)) = artist_id.and_then(|id| self.annotations.get(id))
        {
            return Some(artist);
        }
        self.annotations.values().find_map(|a| match a {
            Annotation::Artist(artist) => Some(artist),
            _ => None,
        })
    }

    /// Origin, when it is a station. Rating and events are keyed on it.
    fn station_origin(&self) -> Option<&SourceDescriptor> {
        self.origin.as_ref().filter(|o| o.is_station())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackRequest {
    Source,
    Peek,
    Skip,
}

impl PlaybackRequest {
    pub fn path(&self) -> &'static str {
        match self {
            PlaybackRequest::Source => "/api/v1/playback/source",
            PlaybackRequest::Peek => "/api/v1/playback/peek",
            PlaybackRequest::Skip => "/api/v1/action/skip",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rating {
    ThumbUp,
    RemoveThumb,
}

impl Rating {
    pub fn path(&self) -> &'static str {
        match self {
            Rating::ThumbUp => "/api/v1/action/thumbUp",
            Rating::RemoveThumb => "/api/v1/action/removeThumb",
        }
    }
}

pub struct SessionController {
    transport: Arc<RestTransport>,
    auth: AuthContext,
    device_uuid: Uuid,
    audio: AudioPipeline,
    audio_retry: RetryPolicy,
    clock: PlaybackClock,
    session: RwLock<Option<Arc<Session>>>,
    source_id: RwLock<Option<String>>,
    observers: RwLock<Vec<Arc<dyn SessionObserver>>>,
    in_flight: Mutex<()>,
}

impl SessionController {
    /// Creates a controller; fails fast when the auth provider has no identity.
    pub fn new(
        auth: &dyn AuthProvider,
        transport: Arc<RestTransport>,
        sink: Arc<dyn PlaybackSink>,
        clock: PlaybackClock,
    ) -> Res<Self> {
        let auth = auth.auth_context()?;
        let audio = AudioPipeline::new(Arc::clone(&transport), sink);

        Ok(Self {
            transport,
            auth,
            device_uuid: Uuid::new_v4(),
            audio,
            audio_retry: RetryPolicy::default(),
            clock,
            session: RwLock::new(None),
            source_id: RwLock::new(None),
            observers: RwLock::new(Vec::new()),
            in_flight: Mutex::new(()),
        })
    }

    /// Replaces the policy used for the audio download of each new track.
    pub fn with_audio_retry(mut self, policy: RetryPolicy) -> Self {
        self.audio_retry = policy;
        self
    }

    pub fn add_observer(&self, observer: Arc<dyn SessionObserver>) {
        self.observers.write().push(observer);
    }

    pub fn device_uuid(&self) -> &Uuid {
        &self.device_uuid
    }

    pub fn clock(&self) -> &PlaybackClock {
        &self.clock
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.clock.elapsed_whole_secs()
    }

    pub fn session(&self) -> Option<Arc<Session>> {
        self.session.read().clone()
    }

    pub fn origin(&self) -> Option<SourceDescriptor> {
        self.session().and_then(|s| s.origin.clone())
    }

    /// Source id used by `peek` and `skip`: the last one passed to `fetch_source`.
    pub fn active_source_id(&self) -> Option<String> {
        self.source_id.read().clone()
    }

    /// Starts a new station or on-demand session and plays its first track.
    pub async fn fetch_source(&self, source_id: &str) -> Res<Arc<Session>> {
        let _guard = self.in_flight.lock().await;
        let session = self.fetch(PlaybackRequest::Source, source_id).await?;
        Ok(session)
    }

    /// Looks ahead to the next track; the origin is left as it was.
    pub async fn peek(&self) -> Res<Arc<Session>> {
        let _guard = self.in_flight.lock().await;
        let source_id = self.require_source_id()?;
        self.fetch(PlaybackRequest::Peek, &source_id).await
    }

    /// Advances to a new track with service-side skip accounting.
    pub async fn skip(&self) -> Res<Arc<Session>> {
        let _guard = self.in_flight.lock().await;
        let source_id = self.require_source_id()?;
        self.fetch(PlaybackRequest::Skip, &source_id).await
    }

    fn require_source_id(&self) -> Res<String> {
        self.active_source_id()
            .ok_or_else(|| PandoraError::NotFound("no source has been started".to_string()))
    }

    async fn fetch(&self, request: PlaybackRequest, source_id: &str) -> Res<Arc<Session>> {
        let body = self.playback_body(request, source_id);
        let response = self
            .transport
            .post(request.path(), &body)
            .await?
            .into_source()?;

        let media = self
            .audio_retry
            .retry(|| self.audio.prepare_track(&response.item))
            .await?;

        let origin = match request {
            PlaybackRequest::Source => response.source,
            PlaybackRequest::Peek | PlaybackRequest::Skip => self.origin(),
        };

        let session = Arc::new(Session {
            current: response.item,
            annotations: response.annotations,
            origin,
        });

        *self.session.write() = Some(Arc::clone(&session));
        if request == PlaybackRequest::Source {
            *self.source_id.write() = Some(source_id.to_string());
        }

        info!(
            ?request,
            song = %session.current.song_name,
            artist = %session.current.artist_name,
            "session replaced"
        );
        self.notify(&session);

        self.audio.deliver(media).await?;
        Ok(session)
    }

    fn notify(&self, session: &Session) {
        let observers = self.observers.read().clone();
        for observer in observers {
            observer.session_changed(session);
        }
    }

    fn device_properties(&self) -> Value {
        json!(DeviceProperties::new(
            &self.auth,
            &self.device_uuid,
            self.transport.user_agent(),
            Utc::now()
        ))
    }

    fn playback_body(&self, request: PlaybackRequest, source_id: &str) -> Value {
        let mut body = json!({
            "deviceProperties": self.device_properties(),
            "clientFeatures": [],
            "deviceUuid": self.device_uuid.to_string(),
            "forceActive": true,
            "includeItem": true,
            "onDemandArtistMessageToken": "",
            "skipExplicitCheck": true,
            "sourceId": source_id,
        });
        if request == PlaybackRequest::Skip {
            body["checkOnly"] = json!(false);
        }
        body
    }

    /// Thumbs up the current track. Returns `false` without any network call
    /// unless the session's origin is a station.
    pub async fn rate_up(&self) -> Res<bool> {
        self.rate(Rating::ThumbUp).await
    }

    /// Removes the rating of the current track, gated like [`Self::rate_up`].
    pub async fn remove_rating(&self) -> Res<bool> {
        self.rate(Rating::RemoveThumb).await
    }

    async fn rate(&self, rating: Rating) -> Res<bool> {
        let Some(session) = self.session() else {
            debug!(?rating, "no session, rating ignored");
            return Ok(false);
        };
        let Some(origin) = session.station_origin() else {
            debug!(?rating, "origin is not a station, rating ignored");
            return Ok(false);
        };

        let body = json!({
            "deviceProperties": self.device_properties(),
            "deviceUuid": self.device_uuid.to_string(),
            "elapsedTime": self.elapsed_secs(),
            "index": session.current.index,
            "pandoraId": session.current.pandora_id,
            "sourceId": origin.pandora_id,
            "trackToken": session.current.track_token,
        });
        self.transport
            .request_value(rating.path(), &body, &[])
            .await?;
        Ok(true)
    }

    /// Reports that playback of the current track started.
    ///
    /// Optional telemetry the web client sends; skipped without a session or
    /// an origin.
    pub async fn report_started(&self) -> Res<bool> {
        let Some(session) = self.session() else {
            return Ok(false);
        };
        let Some(origin) = session.origin.as_ref() else {
            return Ok(false);
        };

        let body = json!({
            "deviceProperties": self.device_properties(),
            "deviceUuid": self.device_uuid.to_string(),
            "elapsedTime": 0,
            "index": session.current.index,
            "sourceId": origin.pandora_id,
        });
        self.transport
            .request_value("/api/v1/event/started", &body, &[])
            .await?;
        Ok(true)
    }

    /// Upcoming concerts of the current track's artist.
    pub async fn concerts(&self) -> Res<ConcertsResponse> {
        let session = self
            .session()
            .ok_or_else(|| PandoraError::NotFound("no session".to_string()))?;
        let artist = session
            .artist_annotation()
            .ok_or_else(|| PandoraError::NotFound("no artist annotation".to_string()))?;

        self.transport
            .post(
                "/api/v1/mip/getArtistPageConcerts",
                &json!({ "pandoraId": artist.pandora_id }),
            )
            .await?
            .into_concerts()
    }

    pub fn current_track_annotation(&self) -> Res<TrackAnnotation> {
        let session = self
            .session()
            .ok_or_else(|| PandoraError::NotFound("no session".to_string()))?;
        session
            .track_annotation()
            .cloned()
            .ok_or_else(|| PandoraError::NotFound("no track annotation".to_string()))
    }

    pub fn explicitness(&self) -> Explicitness {
        self.current_track_annotation()
            .map(|track| track.explicitness)
            .unwrap_or_default()
    }

    /// Dominant color of the current track's art as `#rrggbb`, or [`FALLBACK_COLOR`].
    pub fn dominant_color(&self) -> String {
        self.current_track_annotation()
            .ok()
            .and_then(|track| {
                utils::normalize_color(
                    track
                        .icon
                        .as_ref()
                        .and_then(|icon| icon.dominant_color.as_deref()),
                )
            })
            .unwrap_or_else(|| FALLBACK_COLOR.to_string())
    }
}
