//! Audio retrieval and de-obfuscation.
//!
//! Track audio is served as a plain binary body. When the playback response
//! carries a `key`, the body is XOR-obfuscated with that key repeated over the
//! whole buffer; [`decode`] reverses it. Applying the same key twice yields the
//! original bytes.

use std::{
    io::Cursor,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use async_trait::async_trait;
use base64::{
    Engine,
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};
use symphonia::core::{
    formats::FormatOptions, io::MediaSourceStream, meta::MetadataOptions, probe::Hint,
};
use tracing::debug;

use crate::{PandoraError, Res, pandora::transport::RestTransport, types::TrackItem};

/// Lenient base64 matching the browser's `atob`: padding is optional.
const KEY_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decodes the key string into key bytes, one byte per decoded character.
///
/// ASCII whitespace is ignored, as `atob` does.
pub fn decode_key(raw: &str) -> Res<Vec<u8>> {
    let compact: String = raw.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    KEY_ENGINE
        .decode(compact.as_bytes())
        .map_err(|e| PandoraError::Decode(format!("invalid key: {}", e)))
}

/// `output[i] = key[i % key.len()] ^ input[i]`. An empty key leaves the data as is.
pub fn xor_decode(data: &[u8], key: &[u8]) -> Vec<u8> {
    if key.is_empty() {
        return data.to_vec();
    }
    data.iter()
        .zip(key.iter().cycle())
        .map(|(byte, k)| byte ^ k)
        .collect()
}

pub fn decode(data: &[u8], raw_key: &str) -> Res<Vec<u8>> {
    let key = decode_key(raw_key)?;
    if key.is_empty() {
        return Err(PandoraError::Decode("key decodes to zero bytes".to_string()));
    }
    Ok(xor_decode(data, &key))
}

/// File extension symphonia and the player expect for an encoding name.
pub fn file_extension(encoding: &str) -> &'static str {
    let encoding = encoding.to_ascii_lowercase();
    if encoding.contains("aac") || encoding.contains("mp4") || encoding.contains("m4a") {
        "m4a"
    } else if encoding.contains("flac") {
        "flac"
    } else if encoding.contains("ogg") || encoding.contains("vorbis") {
        "ogg"
    } else if encoding.contains("opus") {
        "opus"
    } else if encoding.contains("wav") {
        "wav"
    } else {
        "mp3"
    }
}

/// What the container probe could tell about a buffer. Advisory only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaInfo {
    pub codec: Option<String>,
    pub sample_rate: Option<u32>,
    pub channels: Option<usize>,
    pub duration_secs: Option<f64>,
}

/// Bytes handed to the container probe; headers sit well inside this window.
const PROBE_WINDOW: usize = 256 * 1024;

/// Probes the container of an audio buffer. Blocking.
pub fn sniff(data: Vec<u8>, encoding: &str) -> Option<MediaInfo> {
    let cursor = Cursor::new(data);
    let mss = MediaSourceStream::new(Box::new(cursor), Default::default());
    let mut hint = Hint::new();
    hint.with_extension(file_extension(encoding));

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .ok()?;
    let track = probed.format.default_track()?;
    let params = &track.codec_params;

    Some(MediaInfo {
        codec: symphonia::default::get_codecs()
            .get_codec(params.codec)
            .map(|descriptor| descriptor.short_name.to_string()),
        sample_rate: params.sample_rate,
        channels: params.channels.map(|c| c.count()),
        duration_secs: params
            .n_frames
            .zip(params.sample_rate)
            .map(|(frames, rate)| frames as f64 / rate as f64),
    })
}

/// Runs [`sniff`] over the head of `data` on the blocking pool.
pub async fn probe(data: &[u8], encoding: &str) -> Option<MediaInfo> {
    let head = data[..data.len().min(PROBE_WINDOW)].to_vec();
    let encoding = encoding.to_string();
    tokio::task::spawn_blocking(move || sniff(head, &encoding))
        .await
        .ok()
        .flatten()
}

/// Decoded audio handed to a [`PlaybackSink`].
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedMedia {
    pub bytes: Vec<u8>,
    pub encoding: String,
    pub info: Option<MediaInfo>,
}

/// Receives decoded audio; drives whatever actually produces sound.
#[async_trait]
pub trait PlaybackSink: Send + Sync {
    async fn play(&self, media: DecodedMedia) -> Res<()>;
}

/// Playback position reported by the sink, in milliseconds.
///
/// Shared between the sink (writer) and the session controller (reader).
/// Not reset when the session changes; readers tolerate a stale value.
#[derive(Debug, Clone, Default)]
pub struct PlaybackClock(Arc<AtomicU64>);

impl PlaybackClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&self, seconds: f64) {
        let millis = (seconds.max(0.0) * 1000.0) as u64;
        self.0.store(millis, Ordering::Relaxed);
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.0.load(Ordering::Relaxed) as f64 / 1000.0
    }

    pub fn elapsed_whole_secs(&self) -> u64 {
        self.0.load(Ordering::Relaxed) / 1000
    }
}

pub struct AudioPipeline {
    transport: Arc<RestTransport>,
    sink: Arc<dyn PlaybackSink>,
}

impl AudioPipeline {
    pub fn new(transport: Arc<RestTransport>, sink: Arc<dyn PlaybackSink>) -> Self {
        Self { transport, sink }
    }

    /// Fetches `url` and de-obfuscates it when `key` is present.
    ///
    /// Nothing reaches the sink; a failed download leaves playback untouched.
    pub async fn prepare(
        &self,
        url: &str,
        key: Option<&str>,
        encoding: &str,
    ) -> Res<DecodedMedia> {
        let raw = self.transport.fetch_bytes(url).await?;
        let bytes = match key.filter(|k| !k.trim().is_empty()) {
            Some(key) => decode(&raw, key)?,
            None => raw,
        };

        let info = probe(&bytes, encoding).await;
        match &info {
            Some(info) => debug!(
                codec = ?info.codec,
                sample_rate = ?info.sample_rate,
                channels = ?info.channels,
                duration = ?info.duration_secs,
                "probed audio"
            ),
            None => debug!(bytes = bytes.len(), %encoding, "audio container not recognized"),
        }

        Ok(DecodedMedia {
            bytes,
            encoding: encoding.to_string(),
            info,
        })
    }

    pub async fn prepare_track(&self, track: &TrackItem) -> Res<DecodedMedia> {
        self.prepare(&track.audio_url, track.key.as_deref(), &track.encoding)
            .await
    }

    pub async fn deliver(&self, media: DecodedMedia) -> Res<()> {
        self.sink.play(media).await
    }

    /// Fetches, de-obfuscates and plays `url`.
    pub async fn play(&self, url: &str, key: Option<&str>, encoding: &str) -> Res<()> {
        let media = self.prepare(url, key, encoding).await?;
        self.deliver(media).await
    }
}
