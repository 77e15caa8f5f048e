pub mod config;
pub mod domain;
pub mod errors;
pub mod message;
pub mod pipeline;
pub mod ports;
pub mod timestamp;

pub use domain::record::{LogRecord, MeasurePolicy};
pub use domain::reply::{format_reply, Attachment, ReplyMessage, ResponseType};
pub use errors::{InterfaceError, PipelineError, StorageError, StoreConfigError, TimestampError};
pub use message::{parse_message, ParsedMessage};
pub use pipeline::{verify_token, PipelineSettings, PipelineStage, RequestInput, RequestPipeline};
pub use ports::{DecorationError, DecorationSource, LogStore};
pub use timestamp::{is_known_area, resolve_timestamp};
