use tabled::Table;

use crate::{
    Res,
    cli::{connect, spinner},
    pandora::catalog::Catalog,
    types::{CollectionEntry, CollectionKind, CollectionTableRow},
    utils, warning,
};

/// Lists stations and playlists of the listener's collection.
pub async fn collection() -> Res<()> {
    let connection = connect().await?;
    let catalog = Catalog::new(connection.transport);

    let pb = spinner("Fetching collection...");
    let entries = catalog.collection().await;
    pb.finish_and_clear();
    let entries = entries?;

    if entries.is_empty() {
        warning!("Your collection is empty.");
        return Ok(());
    }

    let rows: Vec<CollectionTableRow> = entries.iter().map(row).collect();
    println!("{}", Table::new(rows));
    Ok(())
}

fn row(entry: &CollectionEntry) -> CollectionTableRow {
    let (kind, details) = match entry.kind {
        CollectionKind::Playlist => (
            "playlist",
            format!(
                "{} tracks, {}",
                entry.tracks.unwrap_or_default(),
                utils::format_duration(entry.duration.unwrap_or_default())
            ),
        ),
        CollectionKind::Station => (
            "station",
            entry
                .curator
                .as_ref()
                .map(|c| format!("curated by {}", c))
                .unwrap_or_default(),
        ),
    };

    CollectionTableRow {
        kind: kind.to_string(),
        name: entry.name.clone(),
        details,
    }
}
