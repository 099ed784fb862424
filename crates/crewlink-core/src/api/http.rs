//! reqwest implementation of [`Backend`]

use async_trait::async_trait;
use bytes::Bytes;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::{Client, Response};
use serde::Deserialize;
use tracing::{debug, warn};

use super::{
    Backend, END_EVENT, FileListing, PushEvent, QueryRequest, QueryStream, Reply, SESSION_HEADER,
};
use crate::config::ApiConfig;
use crate::error::{Error, Result};

#[derive(Debug, Deserialize)]
struct SessionBody {
    session_id: Option<String>,
}

/// HTTP/SSE transport for the agent-team backend
#[derive(Clone)]
pub struct HttpBackend {
    base_url: String,
    client: Client,
    stream_client: Client,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::from_config(&ApiConfig {
            base_url: base_url.into(),
            ..ApiConfig::default()
        })
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!("crewlink/", env!("CARGO_PKG_VERSION")))
            .build()?;
        // Streams are bounded by the query deadline, not the request timeout
        let stream_client = Client::builder()
            .user_agent(concat!("crewlink/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            stream_client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn session_header(response: &Response) -> Option<String> {
    response
        .headers()
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn check_status(response: Response, path: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(Error::Status {
            status: status.as_u16(),
            path: path.to_string(),
        })
    }
}

/// Reads `session_id` from a session response body; a bad body is not fatal.
async fn session_body(response: Response) -> Option<String> {
    match response.json::<SessionBody>().await {
        Ok(body) => body.session_id.filter(|id| !id.is_empty()),
        Err(e) => {
            warn!("Failed to parse session response: {}", e);
            None
        }
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn list_files(&self, session_id: &str) -> Result<Reply<FileListing>> {
        let response = self
            .client
            .get(self.url("/files"))
            .query(&[("session_id", session_id)])
            .send()
            .await?;
        let response = check_status(response, "/files")?;
        let header = session_header(&response);
        let listing: FileListing = response.json().await?;

        Ok(Reply {
            session_header: header,
            body: listing,
        })
    }

    async fn check_session(&self, session_id: &str) -> Result<Reply<()>> {
        let response = self
            .client
            .get(self.url("/files"))
            .query(&[("session_id", session_id)])
            .send()
            .await?;
        let response = check_status(response, "/files")?;

        Ok(Reply {
            session_header: session_header(&response),
            body: (),
        })
    }

    async fn create_session(&self) -> Result<Reply<Option<String>>> {
        let response = self.client.post(self.url("/session")).send().await?;
        let response = check_status(response, "/session")?;
        let header = session_header(&response);
        // The body is only consulted when the header is absent
        let body = if header.is_some() {
            None
        } else {
            session_body(response).await
        };

        Ok(Reply {
            session_header: header,
            body,
        })
    }

    async fn session_info(&self, session_id: Option<&str>) -> Result<Reply<Option<String>>> {
        let mut request = self.client.get(self.url("/session"));
        if let Some(id) = session_id.filter(|id| !id.is_empty()) {
            request = request.query(&[("session_id", id)]);
        }
        let response = check_status(request.send().await?, "/session")?;
        let header = session_header(&response);
        let body = session_body(response).await;

        Ok(Reply {
            session_header: header,
            body,
        })
    }

    async fn open_query(&self, request: &QueryRequest) -> Result<QueryStream> {
        let recursion_limit = request.recursion_limit.to_string();
        let mut params = vec![
            ("query", request.query.as_str()),
            ("recursion_limit", recursion_limit.as_str()),
        ];
        if let Some(id) = request.session_id.as_deref().filter(|id| !id.is_empty()) {
            params.push(("session_id", id));
        }

        let response = self
            .stream_client
            .get(self.url("/query"))
            .header("Accept", "text/event-stream")
            .query(&params)
            .send()
            .await
            .map_err(|e| Error::StreamTransport(e.to_string()))?;
        let response = check_status(response, "/query")
            .map_err(|e| Error::StreamTransport(e.to_string()))?;
        let header = session_header(&response);
        debug!("Push channel opened (session header: {:?})", header);

        let events = response.bytes_stream().eventsource().map(|item| match item {
            Ok(event) if event.event == END_EVENT => Ok(PushEvent::End(event.data)),
            Ok(event) => Ok(PushEvent::Message(event.data)),
            Err(e) => Err(Error::StreamTransport(e.to_string())),
        });

        Ok(QueryStream {
            session_header: header,
            events: Box::pin(events),
        })
    }

    async fn download(&self, session_id: &str, file_path: &str) -> Result<Reply<Bytes>> {
        let response = self
            .client
            .get(self.url("/download"))
            .query(&[("session_id", session_id), ("file_path", file_path)])
            .send()
            .await?;
        let response = check_status(response, "/download")?;
        let header = session_header(&response);
        let bytes = response.bytes().await?;

        Ok(Reply {
            session_header: header,
            body: bytes,
        })
    }
}
