use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{ORIGIN, USER_AGENT};
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

use crate::app::ports::{ConnectorPort, Inbound, SessionPort};
use crate::config::Settings;
use crate::error::TransportError;

/// Opens websocket sessions against the live feed with fixed headers.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    pub url: String,
    pub origin: String,
    pub user_agent: String,
}

impl WebSocketConnector {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            url: settings.endpoint.clone(),
            origin: settings.origin.clone(),
            user_agent: settings.user_agent.clone(),
        }
    }
}

fn header(value: &str) -> Result<HeaderValue, TransportError> {
    HeaderValue::from_str(value).map_err(|e| TransportError::Request(format!("{value:?}: {e}")))
}

#[async_trait]
impl ConnectorPort for WebSocketConnector {
    async fn connect(&self) -> Result<Box<dyn SessionPort>, TransportError> {
        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| TransportError::Request(e.to_string()))?;
        request.headers_mut().insert(ORIGIN, header(&self.origin)?);
        request.headers_mut().insert(USER_AGENT, header(&self.user_agent)?);

        let (stream, response) = connect_async(request)
            .await
            .map_err(|e| TransportError::Connect(format!("{}: {e}", self.url)))?;
        info!("Connected to {} (HTTP {})", self.url, response.status());

        Ok(Box::new(WebSocketSession {
            stream,
            closed: false,
        }))
    }
}

pub struct WebSocketSession {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    closed: bool,
}

#[async_trait]
impl SessionPort for WebSocketSession {
    async fn send_text(&mut self, payload: &str) -> Result<(), TransportError> {
        self.stream.send(Message::Text(payload.to_string())).await?;
        Ok(())
    }

    async fn next_frame(&mut self) -> Result<Inbound, TransportError> {
        match self.stream.next().await {
            Some(Ok(Message::Text(text))) => Ok(Inbound::Text(text)),
            Some(Ok(Message::Close(frame))) => {
                debug!("Peer closed the session: {:?}", frame);
                Ok(Inbound::Closed)
            }
            Some(Ok(_)) => Ok(Inbound::Other),
            Some(Err(e)) => Err(e.into()),
            None => Ok(Inbound::Closed),
        }
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.stream.close(None).await {
            debug!("Ignoring error while closing session: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{DEFAULT_HANDSHAKE, DEFAULT_ORIGIN, DEFAULT_USER_AGENT};
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_hdr_async;
    use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

    #[derive(Debug, Default)]
    struct Seen {
        origin: Option<String>,
        user_agent: Option<String>,
        first_message: Option<String>,
    }

    fn header_text(req: &Request, name: impl AsRef<str>) -> Option<String> {
        req.headers()
            .get(name.as_ref())
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    /// One-shot server: records the upgrade headers and the first text
    /// message, then sends ping, text, binary and a close frame.
    async fn serve_once(listener: TcpListener) -> Seen {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut seen = Seen::default();
        let mut ws = accept_hdr_async(tcp, |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
            seen.origin = header_text(req, ORIGIN);
            seen.user_agent = header_text(req, USER_AGENT);
            Ok(resp)
        })
        .await
        .unwrap();

        if let Some(Ok(Message::Text(text))) = ws.next().await {
            seen.first_message = Some(text);
        }
        ws.send(Message::Ping(vec![1])).await.unwrap();
        ws.send(Message::Text("x".to_string())).await.unwrap();
        ws.send(Message::Binary(vec![0, 1, 2])).await.unwrap();
        ws.close(None).await.unwrap();
        while let Some(Ok(_)) = ws.next().await {}
        seen
    }

    fn connector(url: String) -> WebSocketConnector {
        WebSocketConnector {
            url,
            origin: DEFAULT_ORIGIN.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    #[tokio::test]
    async fn test_session_against_local_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(serve_once(listener));

        let mut session = connector(format!("ws://{addr}/")).connect().await.unwrap();
        session.send_text(DEFAULT_HANDSHAKE).await.unwrap();

        assert_eq!(session.next_frame().await.unwrap(), Inbound::Other);
        assert_eq!(
            session.next_frame().await.unwrap(),
            Inbound::Text("x".to_string())
        );
        assert_eq!(session.next_frame().await.unwrap(), Inbound::Other);
        assert_eq!(session.next_frame().await.unwrap(), Inbound::Closed);

        session.close().await;
        session.close().await;
        drop(session);

        let seen = server.await.unwrap();
        assert_eq!(seen.origin.as_deref(), Some(DEFAULT_ORIGIN));
        assert_eq!(seen.user_agent.as_deref(), Some(DEFAULT_USER_AGENT));
        assert_eq!(seen.first_message.as_deref(), Some(DEFAULT_HANDSHAKE));
    }

    #[tokio::test]
    async fn test_dropped_stream_reads_as_closed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            drop(ws);
        });

        let mut session = connector(format!("ws://{addr}/")).connect().await.unwrap();
        server.await.unwrap();

        // Without a close frame the read either ends or reports the reset
        match session.next_frame().await {
            Ok(inbound) => assert_eq!(inbound, Inbound::Closed),
            Err(e) => assert!(matches!(e, TransportError::WebSocket(_))),
        }
        session.close().await;
    }

    #[tokio::test]
    async fn test_refused_connection_is_connect_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = connector(format!("ws://{addr}/")).connect().await.err().unwrap();
        assert!(matches!(err, TransportError::Connect(_)));
    }

    #[tokio::test]
    async fn test_invalid_url_is_request_error() {
        let err = connector("not a url".to_string()).connect().await.err().unwrap();
        assert!(matches!(err, TransportError::Request(_)));
    }
}
