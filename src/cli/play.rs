use std::sync::Arc;

use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader, stdin};
use tracing::{debug, warn};

use crate::{
    PandoraError, Res,
    cli::{connect, spinner},
    config, info,
    pandora::{
        audio::PlaybackClock,
        catalog::Catalog,
        retry::RetryPolicy,
        session::{Session, SessionController, SessionObserver},
    },
    player::ProcessSink,
    success,
    types::{Explicitness, Station},
    utils, warning,
};

/// Prints the new track whenever the session is replaced.
struct NowPlaying;

impl SessionObserver for NowPlaying {
    fn session_changed(&self, session: &Session) {
        let track = &session.current;
        let explicit = match session.track_annotation().map(|t| t.explicitness) {
            Some(Explicitness::Explicit) => " [E]",
            _ => "",
        };
        println!(
            "[{}] {} - {}{} ({}) {}",
            "♪".magenta().bold(),
            track.song_name.bold(),
            track.artist_name,
            explicit,
            track.album_name,
            utils::format_duration(track.duration).dimmed()
        );
    }
}

/// Plays a station, defaulting to the first one of the listener.
///
/// Fails with [`PandoraError::PremiumRequired`] before any playback call for
/// accounts without Premium. Reads single-letter commands from stdin until
/// `q` or end of input; a track that ends on its own advances to the next.
pub async fn play(station: Option<String>) -> Res<()> {
    let connection = connect().await?;
    let catalog = Catalog::new(Arc::clone(&connection.transport));

    let pb = spinner("Checking subscription...");
    let premium = catalog.check_premium().await;
    pb.finish_and_clear();
    premium?;

    let stations = catalog.get_stations().await?;
    let chosen = select_station(&stations.stations, station.as_deref())?;
    info!("Tuning in to {}", chosen.name.bold());

    let clock = PlaybackClock::new();
    let sink = Arc::new(ProcessSink::from_config(clock.clone())?);
    let mut finished = sink.finished();
    let controller = SessionController::new(
        &connection.auth,
        Arc::clone(&connection.transport),
        sink.clone(),
        clock,
    )?
    .with_audio_retry(RetryPolicy::from_config());
    controller.add_observer(Arc::new(NowPlaying));

    let retry = RetryPolicy::from_config();
    retry
        .retry(|| controller.fetch_source(&chosen.pandora_id))
        .await?;
    report_started(&controller).await;
    print_controls();

    let mut lines = BufReader::new(stdin()).lines();
    loop {
        tokio::select! {
            changed = finished.changed() => {
                if changed.is_err() {
                    break;
                }
                let ended = *finished.borrow_and_update();
                if !sink.is_current(ended) {
                    debug!(ended, current = sink.generation(), "stale track end ignored");
                    continue;
                }
                retry.retry(|| controller.peek()).await?;
                report_started(&controller).await;
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match line.trim() {
                    "n" => {
                        retry.retry(|| controller.skip()).await?;
                        report_started(&controller).await;
                    }
                    "p" => {
                        retry.retry(|| controller.peek()).await?;
                        report_started(&controller).await;
                    }
                    "+" => rated(controller.rate_up().await, "Thumbed up"),
                    "-" => rated(controller.remove_rating().await, "Rating removed"),
                    "c" => show_concerts(&controller).await,
                    "i" => show_track(&controller),
                    "q" => break,
                    "" => {}
                    other => warning!("Unknown command: {}", other),
                }
            }
        }
    }

    sink.stop();
    success!("Stopped.");
    Ok(())
}

/// First station whose name contains `name` (case-insensitive), or the first station.
pub fn select_station<'a>(stations: &'a [Station], name: Option<&str>) -> Res<&'a Station> {
    let found = match name {
        Some(name) => {
            let needle = name.to_lowercase();
            stations
                .iter()
                .find(|s| s.name.to_lowercase().contains(&needle))
        }
        None => stations.first(),
    };
    found.ok_or_else(|| {
        PandoraError::NotFound(match name {
            Some(name) => format!("no station matching {:?}", name),
            None => "the listener has no stations".to_string(),
        })
    })
}

fn print_controls() {
    info!("Controls: n skip, p next, + thumb up, - remove thumb, c concerts, i info, q quit");
}

async fn report_started(controller: &SessionController) {
    if !config::telemetry_enabled() {
        return;
    }
    if let Err(e) = controller.report_started().await {
        warn!(error = %e, "start event not sent");
    }
}

fn rated(result: Res<bool>, message: &str) {
    match result {
        Ok(true) => success!("{}", message),
        Ok(false) => warning!("Ratings are only available while playing a station."),
        Err(e) => warning!("Rating failed: {}", e),
    }
}

fn show_track(controller: &SessionController) {
    match controller.current_track_annotation() {
        Ok(track) => {
            info!("{} ({})", track.name, track.pandora_id);
            info!("Explicitness: {:?}", controller.explicitness());
            info!("Color: {}", controller.dominant_color());
            info!(
                "Elapsed: {} / {}",
                utils::format_duration(controller.elapsed_secs()),
                utils::format_duration(track.duration)
            );
        }
        Err(e) => warning!("{}", e),
    }
}

async fn show_concerts(controller: &SessionController) {
    match controller.concerts().await {
        Ok(concerts) if concerts.artist_events.is_empty() => info!("No upcoming concerts."),
        Ok(concerts) => {
            for event in concerts.artist_events {
                let name = event["name"].as_str().unwrap_or("concert");
                let date = event["date"].as_str().unwrap_or_default();
                let venue = event["venueName"].as_str().unwrap_or_default();
                info!("{} {} {}", date, name, venue);
            }
        }
        Err(e) => warning!("Concerts unavailable: {}", e),
    }
}
