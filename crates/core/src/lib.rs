pub mod config;
pub mod history;
pub mod message;
pub mod metrics;
pub mod paths;
pub mod reader;
pub mod registry;

pub use config::Config;
pub use history::{Direction, HistoryPage, PageRequest};
pub use message::StreamMessage;
pub use metrics::FileMetadata;
pub use registry::{Registry, RegistryError, TrackedLog};
