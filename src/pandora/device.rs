use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{types::AuthContext, utils};

const FALLBACK_BROWSER_VERSION: &str = "128.0";

/// The `deviceProperties` record sent with every playback-related call.
///
/// Field names and value types follow what the web client sends; the service
/// rejects requests whose record deviates from it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceProperties {
    pub app_version: String,
    pub artist_collaborations_enabled: bool,
    pub backgrounded: &'static str,
    pub browser: &'static str,
    pub browser_id: &'static str,
    pub browser_version: String,
    pub campaign_id: u32,
    pub client_timestamp: i64,
    pub date_recorded: i64,
    pub day: String,
    pub device_code: &'static str,
    pub device_id: &'static str,
    pub device_os: &'static str,
    pub device_uuid: String,
    pub is_on_demand_user: &'static str,
    #[serde(rename = "listenerId")]
    pub listener_id: String,
    pub music_playing: &'static str,
    pub page_view: &'static str,
    pub promo_code: &'static str,
    pub site_version: String,
    pub tuner_var_flags: &'static str,
    pub vendor_id: u32,
}

impl DeviceProperties {
    /// `user_agent` is the one the transport sends; the browser fields match it.
    pub fn new(
        auth: &AuthContext,
        device_uuid: &Uuid,
        user_agent: &str,
        now: DateTime<Utc>,
    ) -> Self {
        let millis = now.timestamp_millis();
        let browser_version = utils::firefox_version(user_agent)
            .unwrap_or(FALLBACK_BROWSER_VERSION)
            .to_string();
        Self {
            app_version: auth.web_client_version.clone(),
            artist_collaborations_enabled: true,
            backgrounded: "false",
            browser: "Firefox",
            browser_id: "Firefox",
            browser_version,
            campaign_id: 0,
            client_timestamp: millis,
            date_recorded: millis,
            day: now.format("%Y-%m-%d").to_string(),
            device_code: "1880",
            device_id: "1880",
            device_os: "Linux",
            device_uuid: device_uuid.to_string(),
            is_on_demand_user: "true",
            listener_id: auth.listener_id.clone(),
            music_playing: "false",
            page_view: "collection",
            promo_code: "",
            site_version: auth.web_client_version.clone(),
            tuner_var_flags: "SF",
            vendor_id: 100,
        }
    }
}
