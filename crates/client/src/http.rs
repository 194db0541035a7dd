use reqwest::multipart::{Form, Part};
use reqwest::{Client as HttpClient, RequestBuilder, Response, StatusCode, Url};
use std::sync::Arc;
use std::time::Duration;
use studychat_core::{Attachment, Config, Error, Result, SessionMetadata, Timestamp};

use crate::backend::{Backend, HistoryEnvelope, HistoryMessage, MetadataEnvelope};
use crate::credentials::{CredentialProvider, credentials_from_config};

/// Backend reached over HTTP
pub struct HttpBackend {
    client: HttpClient,
    base_url: Url,
    credentials: Arc<dyn CredentialProvider>,
}

impl HttpBackend {
    pub fn new(base_url: &str, credentials: Arc<dyn CredentialProvider>, timeout: Duration) -> Result<Self> {
        let base_url =
            Url::parse(base_url.trim()).map_err(|e| Error::Config(format!("invalid base URL {}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!("base URL cannot carry paths: {}", base_url)));
        }

        let client = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, base_url, credentials })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.api.base_url,
            credentials_from_config(&config.auth),
            Duration::from_millis(config.api.timeout_ms),
        )
    }

    /// Append path segments to the base URL, escaping each one
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("base URL cannot carry paths: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn history_url(&self, session_id: &str, limit: usize, before: Option<&Timestamp>) -> Result<Url> {
        let mut url = self.endpoint(&["chat_history", session_id])?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("limit", &limit.to_string());
            if let Some(before) = before {
                query.append_pair("before", &before.wire());
            }
        }
        Ok(url)
    }

    fn authorize(&self, builder: RequestBuilder) -> Result<RequestBuilder> {
        Ok(match self.credentials.bearer_token()? {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    fn chat_form(session_id: &str, discipline_id: &str, text: &str, attachment: Option<&Attachment>) -> Result<Form> {
        let form = Form::new()
            .text("session_id", session_id.to_string())
            .text("discipline_id", discipline_id.to_string())
            .text("message", text.to_string());

        match attachment {
            Some(attachment) => {
                let part = Part::bytes(attachment.data().to_vec())
                    .file_name(attachment.file_name().to_string())
                    .mime_str(attachment.mime_type())
                    .map_err(|e| Error::Validation(format!("invalid attachment MIME type: {}", e)))?;
                Ok(form.part("file", part))
            }
            None => Ok(form),
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<String> {
        let response = builder.send().await.map_err(network_error)?;
        read_body(response).await
    }
}

fn network_error(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Network(format!("request timed out: {}", err))
    } else {
        Error::Network(err.to_string())
    }
}

/// Map the status to an error or return the body text
async fn read_body(response: Response) -> Result<String> {
    let status = response.status();
    let body = response.text().await.map_err(network_error)?;
    check_status(status, body)
}

fn check_status(status: StatusCode, body: String) -> Result<String> {
    if status == StatusCode::UNAUTHORIZED {
        return Err(Error::Unauthorized);
    }
    if !status.is_success() {
        return Err(Error::backend(status.as_u16(), body));
    }
    Ok(body)
}

fn parse_body<T: serde::de::DeserializeOwned>(what: &str, body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| Error::Parse(format!("malformed {} response: {}", what, e)))
}

#[async_trait::async_trait]
impl Backend for HttpBackend {
    async fn fetch_history(
        &self, session_id: &str, limit: usize, before: Option<&Timestamp>,
    ) -> Result<Vec<HistoryMessage>> {
        let url = self.history_url(session_id, limit, before)?;
        tracing::debug!(session_id, limit, before = ?before.map(Timestamp::wire), "fetching chat history");

        let body = self.send(self.authorize(self.client.get(url))?).await?;
        let messages = parse_body::<HistoryEnvelope>("chat history", &body)?.into_messages();

        tracing::debug!(session_id, count = messages.len(), "chat history received");
        Ok(messages)
    }

    async fn submit_message(
        &self, session_id: &str, discipline_id: &str, text: &str, attachment: Option<&Attachment>,
    ) -> Result<String> {
        let url = self.endpoint(&["chat"])?;
        let form = Self::chat_form(session_id, discipline_id, text, attachment)?;
        tracing::debug!(
            session_id,
            discipline_id,
            attachment = attachment.map(Attachment::file_name),
            "submitting chat message"
        );

        self.send(self.authorize(self.client.post(url).multipart(form))?).await
    }

    async fn fetch_session_metadata(&self, session_id: &str) -> Result<SessionMetadata> {
        let url = self.endpoint(&["study_sessions", "session", session_id])?;
        let body = self.send(self.authorize(self.client.get(url))?).await?;
        Ok(parse_body::<MetadataEnvelope>("study session", &body)?.into_metadata())
    }
}
