mod configure;
mod health;
mod manifest;
mod resources;
mod util;

pub use configure::{configuration_ui, configure};
pub use health::{health_check, not_found, root_redirect};
pub use manifest::manifest;
pub use resources::{catalog, stream, subtitles};
