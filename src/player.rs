//! External player process used as the playback sink.
//!
//! Decoded audio is written to the data directory and handed to a player
//! command (`mpv` by default). Starting a new track stops the previous player.
//! While a player runs, its wall-clock position is reported to the shared
//! [`PlaybackClock`].
//!
//! Every track gets a generation number. A player that exits on its own
//! publishes its generation on the [`ProcessSink::finished`] channel; a
//! listener compares it with [`ProcessSink::generation`] to drop track ends
//! that arrive after the track was already replaced.

use std::{
    path::{Path, PathBuf},
    process::Stdio,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::{
    process::Command,
    sync::{oneshot, watch},
    time::{Instant, interval},
};
use tracing::{debug, warn};

use crate::{
    PandoraError, Res, config,
    pandora::audio::{DecodedMedia, PlaybackClock, PlaybackSink, file_extension},
};

const CLOCK_TICK: Duration = Duration::from_millis(250);

pub struct ProcessSink {
    program: String,
    args: Vec<String>,
    dir: PathBuf,
    clock: PlaybackClock,
    generation: AtomicU64,
    stop: Mutex<Option<oneshot::Sender<()>>>,
    finished: watch::Sender<u64>,
}

impl ProcessSink {
    /// Builds a sink from a whitespace separated command line.
    pub fn new(command: &str, dir: impl Into<PathBuf>, clock: PlaybackClock) -> Res<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| PandoraError::Config("player command is empty".to_string()))?;

        Ok(Self {
            program,
            args: parts.collect(),
            dir: dir.into(),
            clock,
            generation: AtomicU64::new(0),
            stop: Mutex::new(None),
            finished: watch::Sender::new(0),
        })
    }

    /// Sink using `PANDORCLI_PLAYER` and `<data dir>/playback`.
    pub fn from_config(clock: PlaybackClock) -> Res<Self> {
        Self::new(
            &config::player_command(),
            config::data_dir().join("playback"),
            clock,
        )
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Generation of the last track that played to its end.
    pub fn finished(&self) -> watch::Receiver<u64> {
        self.finished.subscribe()
    }

    /// Generation of the track started last; zero before the first one.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, generation: u64) -> bool {
        generation != 0 && generation == self.generation()
    }

    /// Stops the running player, if any.
    pub fn stop(&self) {
        // dropping the sender cancels the watcher
        self.stop.lock().take();
    }

    fn track_path(&self, generation: u64, encoding: &str) -> PathBuf {
        self.dir
            .join(format!("track-{}.{}", generation, file_extension(encoding)))
    }
}

#[async_trait]
impl PlaybackSink for ProcessSink {
    async fn play(&self, media: DecodedMedia) -> Res<()> {
        self.stop();

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let path = self.track_path(generation, &media.encoding);
        async_fs::create_dir_all(&self.dir).await?;
        async_fs::write(&path, &media.bytes).await?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(&path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PandoraError::Player(format!("failed to start {}: {}", self.program, e)))?;
        debug!(program = %self.program, path = %path.display(), generation, "player started");

        let (stop_tx, mut stop_rx) = oneshot::channel();
        *self.stop.lock() = Some(stop_tx);

        let clock = self.clock.clone();
        let finished = self.finished.clone();
        clock.report(0.0);

        tokio::spawn(async move {
            let started = Instant::now();
            let mut ticker = interval(CLOCK_TICK);
            loop {
                tokio::select! {
                    _ = &mut stop_rx => {
                        if let Err(e) = child.kill().await {
                            warn!(error = %e, "failed to stop player");
                        }
                        break;
                    }
                    status = child.wait() => {
                        match status {
                            Ok(status) if status.success() => {
                                finished.send_replace(generation);
                            }
                            Ok(status) => warn!(%status, "player exited with failure"),
                            Err(e) => warn!(error = %e, "failed to wait for player"),
                        }
                        break;
                    }
                    _ = ticker.tick() => clock.report(started.elapsed().as_secs_f64()),
                }
            }
            remove_track(&path).await;
        });

        Ok(())
    }
}

impl Drop for ProcessSink {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn remove_track(path: &Path) {
    if let Err(e) = async_fs::remove_file(path).await {
        debug!(path = %path.display(), error = %e, "track file not removed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_is_split() {
        let sink = ProcessSink::new("mpv --no-video  --really-quiet", "/tmp", PlaybackClock::new())
            .unwrap();
        assert_eq!(sink.program(), "mpv");
        assert_eq!(sink.args(), ["--no-video", "--really-quiet"]);
    }

    #[test]
    fn test_empty_command_is_rejected() {
        let err = ProcessSink::new("   ", "/tmp", PlaybackClock::new()).err();
        assert!(matches!(err, Some(PandoraError::Config(_))));
    }

    #[test]
    fn test_track_path_uses_encoding_extension() {
        let sink = ProcessSink::new("mpv", "/tmp/pb", PlaybackClock::new()).unwrap();
        assert_eq!(
            sink.track_path(3, "aacplus"),
            PathBuf::from("/tmp/pb/track-3.m4a")
        );
    }

    fn media() -> DecodedMedia {
        DecodedMedia {
            bytes: vec![1, 2, 3],
            encoding: "mp3".to_string(),
            info: None,
        }
    }

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("pandorcli-{}", uuid::Uuid::new_v4()))
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_track_end_carries_its_generation() {
        let sink = ProcessSink::new("true", scratch_dir(), PlaybackClock::new()).unwrap();
        let mut finished = sink.finished();
        assert!(!sink.is_current(*finished.borrow()));

        sink.play(media()).await.unwrap();
        tokio::time::timeout(Duration::from_secs(10), finished.changed())
            .await
            .unwrap()
            .unwrap();

        let ended = *finished.borrow_and_update();
        assert_eq!(ended, 1);
        assert!(sink.is_current(ended));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_track_end_is_stale_after_replacement() {
        let sink = ProcessSink::new("true", scratch_dir(), PlaybackClock::new()).unwrap();
        let mut finished = sink.finished();

        sink.play(media()).await.unwrap();
        tokio::time::timeout(Duration::from_secs(10), finished.wait_for(|g| *g == 1))
            .await
            .unwrap()
            .unwrap();

        // the next track started while the end of the first was still pending
        sink.generation.fetch_add(1, Ordering::SeqCst);
        assert_eq!(sink.generation(), 2);
        assert!(!sink.is_current(*finished.borrow_and_update()));
    }
}
