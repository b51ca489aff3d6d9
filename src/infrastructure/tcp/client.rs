use crate::core::transport::{Transport, TransportType};
use crate::domain::config::Endpoint;
use crate::domain::error::{ClientError, ClientResult, ProtocolError, TransportError};
use crate::infrastructure::tcp::frame::{self, FrameError};
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

/// Framed TCP connection to the database server
pub struct TcpTransport {
    stream: Option<TcpStream>,
    endpoint: String,
}

impl TcpTransport {
    pub fn new() -> Self {
        Self {
            stream: None,
            endpoint: String::new(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    pub fn peer_addr(&self) -> Option<std::net::SocketAddr> {
        self.stream.as_ref().and_then(|s| s.peer_addr().ok())
    }

    fn stream_mut(&mut self) -> ClientResult<&mut TcpStream> {
        let endpoint = self.endpoint.clone();
        self.stream.as_mut().ok_or_else(|| {
            TransportError::ConnectionFailed {
                endpoint,
                reason: "not connected".to_string(),
            }
            .into()
        })
    }

    fn map_frame_error(&self, err: FrameError) -> ClientError {
        match err {
            FrameError::TooLarge(len) => ProtocolError::PayloadTooLarge(len).into(),
            FrameError::Truncated => ProtocolError::MalformedResponse(
                "connection closed before a complete response".to_string(),
            )
            .into(),
            FrameError::InvalidUtf8 => {
                ProtocolError::MalformedResponse("response is not valid UTF-8".to_string()).into()
            }
            FrameError::Io(source) => TransportError::Io {
                endpoint: self.endpoint.clone(),
                source,
            }
            .into(),
        }
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for TcpTransport {
    fn transport_type(&self) -> TransportType {
        TransportType::Tcp
    }

    async fn connect(&mut self, endpoint: &Endpoint) -> ClientResult<()> {
        self.endpoint = endpoint.to_string();
        let stream = TcpStream::connect((endpoint.host.as_str(), endpoint.port))
            .await
            .map_err(|e| TransportError::ConnectionFailed {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })?;

        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY: {}", e);
        }

        info!("TCP connection established to {}", endpoint);
        self.stream = Some(stream);
        Ok(())
    }

    async fn send(&mut self, payload: &str) -> ClientResult<()> {
        let stream = self.stream_mut()?;
        let result = frame::write_frame(stream, payload).await;
        result.map_err(|e| self.map_frame_error(e))?;
        debug!("Sent {} bytes over TCP", payload.len());
        Ok(())
    }

    async fn receive(&mut self) -> ClientResult<String> {
        let stream = self.stream_mut()?;
        let result = frame::read_frame(stream).await;
        let text = result.map_err(|e| self.map_frame_error(e))?;
        debug!("Received {} bytes over TCP", text.len());
        Ok(text)
    }

    async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                debug!("Failed to shutdown TCP stream: {}", e);
            }
            info!("TCP connection to {} closed", self.endpoint);
        }
    }
}
