pub mod channel_transport;
pub mod config;
pub mod http_api;
pub mod logging;
pub mod paths;

pub use crate::channel_transport::ChannelPushTransport;
pub use crate::config::ClientConfig;
pub use crate::http_api::HttpTaskApi;
pub use crate::logging::init_tracing;
pub use crate::paths::TaskSharePaths;
