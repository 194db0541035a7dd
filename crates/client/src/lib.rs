pub mod backend;
pub mod credentials;
pub mod decode;
pub mod http;
pub mod mock;

pub use backend::{Backend, HistoryMessage};
pub use credentials::{Anonymous, CredentialProvider, EnvToken, StaticToken, TokenFile, credentials_from_config};
pub use decode::{decode_content, decode_reply};
pub use http::HttpBackend;
pub use mock::{MockBackend, MockReply, MockScript, RecordedCall, generate_history};

pub use studychat_core::{Error, Result};
