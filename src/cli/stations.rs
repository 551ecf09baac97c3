use tabled::Table;

use crate::{
    Res,
    cli::{connect, spinner},
    info,
    pandora::catalog::Catalog,
    types::StationTableRow,
    utils, warning,
};

/// Lists the listener's stations, optionally filtered by name.
pub async fn stations(search: Option<String>) -> Res<()> {
    let connection = connect().await?;
    let catalog = Catalog::new(connection.transport);

    let pb = spinner("Fetching stations...");
    let response = catalog.get_stations().await;
    pb.finish_and_clear();
    let response = response?;

    let needle = search.map(|s| s.to_lowercase());
    let rows: Vec<StationTableRow> = response
        .stations
        .into_iter()
        .filter(|s| {
            needle
                .as_ref()
                .is_none_or(|n| s.name.to_lowercase().contains(n))
        })
        .map(|s| StationTableRow {
            created: utils::parse_date(s.date_created.as_deref())
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            name: s.name,
            id: s.pandora_id,
        })
        .collect();

    if rows.is_empty() {
        warning!("No stations found.");
        return Ok(());
    }

    info!("{} stations", rows.len());
    println!("{}", Table::new(rows));
    Ok(())
}
