mod api;
mod config_ui;
mod items;
mod manifest;

pub use api::HealthResponse;
pub use config_ui::{ConfigurationField, ConfigurationUi};
pub use items::{
    MetaBehaviorHints, MetaLinkItem, MetaPreviewItem, StreamBehaviorHints, StreamItem,
    SubtitleItem,
};
pub use manifest::{BehaviorHints, CatalogItem, ExtraItem, Manifest, ResourceItem};
