use crate::{
    Res,
    cli::{connect, spinner},
    info,
    pandora::catalog::{self, Catalog, RECENTLY_PLAYED_QUERY, RECENTLY_PLAYED_TYPES},
    success, warning,
};

/// Shows the subscription of the signed-in listener.
///
/// With `recent`, also lists the recently played sources.
pub async fn info(recent: bool) -> Res<()> {
    let connection = connect().await?;
    info!("Listener id: {}", connection.transport.auth().listener_id);

    let catalog = Catalog::new(connection.transport);
    let pb = spinner("Fetching subscription...");
    let response = catalog.info_v2().await;
    pb.finish_and_clear();
    let response = response?;

    let tier = response
        .active_product
        .as_ref()
        .map(|p| p.product_tier.as_str())
        .unwrap_or("none");
    info!("Subscriber: {}", response.subscriber);
    info!("Product tier: {}", tier);
    if catalog::is_premium_info(&response) {
        success!("Playback is supported for this account.");
    } else {
        warning!("Pandora Premium is required for playback.");
    }

    if recent {
        let items = catalog
            .recently_played(RECENTLY_PLAYED_QUERY, RECENTLY_PLAYED_TYPES)
            .await?;
        for item in items {
            let entity = item.source_entity;
            info!(
                "{} [{}] {}",
                entity.name.unwrap_or_default(),
                entity.entity_type,
                entity.id
            );
        }
    }
    Ok(())
}
