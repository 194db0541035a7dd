pub mod attachment;
pub mod config;
pub mod error;
pub mod logging;
pub mod message;
pub mod session;

pub use attachment::{Attachment, AttachmentInfo, AttachmentKind};
pub use config::{ApiConfig, AuthConfig, ChatConfig, Config, ConfigError};
pub use error::{Error, Result, StoreError};
pub use logging::{LogFormat, LogGuard, PrivacyConfig, init_logging, redact_body};
pub use message::{EchoState, Message, MessageContent, Origin, Role, Timestamp};
pub use session::{SessionContext, SessionMetadata};
