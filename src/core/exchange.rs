use crate::core::transport::Transport;
use crate::domain::config::{Endpoint, RequestSource};
use crate::domain::error::{ClientError, ClientResult, ProtocolError, TransportError};
use crate::domain::message::{Request, Response};
use crate::infrastructure::tcp::frame::MAX_FRAME_LEN;
use std::fmt;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Lifecycle of a single request/response cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    Building,
    Sending,
    AwaitingResponse,
    Succeeded,
    Failed,
}

impl CyclePhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CyclePhase::Succeeded | CyclePhase::Failed)
    }

    /// Whether `next` is a legal successor of this phase
    pub fn can_advance_to(&self, next: CyclePhase) -> bool {
        use CyclePhase::*;
        match (self, next) {
            (Idle, Building) => true,
            (Building, Sending) => true,
            (Sending, AwaitingResponse) => true,
            (AwaitingResponse, Succeeded) => true,
            (Idle | Building | Sending | AwaitingResponse, Failed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CyclePhase::Idle => write!(f, "Idle"),
            CyclePhase::Building => write!(f, "Building"),
            CyclePhase::Sending => write!(f, "Sending"),
            CyclePhase::AwaitingResponse => write!(f, "AwaitingResponse"),
            CyclePhase::Succeeded => write!(f, "Succeeded"),
            CyclePhase::Failed => write!(f, "Failed"),
        }
    }
}

/// Outcome of a successful cycle
#[derive(Debug, Clone)]
pub struct Exchange {
    pub request: Request,
    pub response: Response,
    /// Reply exactly as received
    pub raw_response: String,
    pub elapsed: Duration,
}

/// Callback run once the connection is open
pub type ConnectedHook = Box<dyn FnMut(&Endpoint) + Send>;

/// Single-shot request/response cycle against one endpoint
pub struct RequestCycle<T: Transport> {
    id: Uuid,
    phase: CyclePhase,
    transport: T,
    endpoint: Endpoint,
    timeout: Duration,
    on_connected: Option<ConnectedHook>,
}

impl<T: Transport> RequestCycle<T> {
    pub fn new(transport: T, endpoint: Endpoint, timeout: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            phase: CyclePhase::Idle,
            transport,
            endpoint,
            timeout,
            on_connected: None,
        }
    }

    /// Run `hook` after the connection opens and before the request is sent
    pub fn on_connected<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&Endpoint) + Send + 'static,
    {
        self.on_connected = Some(Box::new(hook));
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phase(&self) -> CyclePhase {
        self.phase
    }

    fn advance(&mut self, next: CyclePhase) {
        debug_assert!(
            self.phase.can_advance_to(next),
            "illegal transition {} -> {}",
            self.phase,
            next
        );
        debug!("cycle {} -> {}", self.phase, next);
        self.phase = next;
    }

    /// Run the cycle to completion
    ///
    /// A cycle runs at most once; later calls fail with `CycleFinished`.
    pub async fn execute(&mut self, source: &RequestSource) -> ClientResult<Exchange> {
        if self.phase != CyclePhase::Idle {
            return Err(ClientError::CycleFinished);
        }

        let span = info_span!("request", id = %self.id, endpoint = %self.endpoint);
        let result = self.run(source).instrument(span).await;

        // Release the connection whatever happened
        self.transport.close().await;

        match &result {
            Ok(exchange) => {
                self.advance(CyclePhase::Succeeded);
                info!(
                    "cycle {} succeeded in {}ms",
                    self.id,
                    exchange.elapsed.as_millis()
                );
            }
            Err(e) => {
                self.advance(CyclePhase::Failed);
                warn!("cycle {} failed: {}", self.id, e);
            }
        }
        result
    }

    async fn run(&mut self, source: &RequestSource) -> ClientResult<Exchange> {
        let started = Instant::now();
        let deadline = started + self.timeout;
        let timeout_ms = self.timeout.as_millis() as u64;

        self.advance(CyclePhase::Building);
        let request = build_request(source).await?;
        if request.len() > MAX_FRAME_LEN {
            return Err(ProtocolError::PayloadTooLarge(request.len()).into());
        }
        debug!("built request: {}", request.as_str());

        self.advance(CyclePhase::Sending);
        match timeout_at(deadline, self.transport.connect(&self.endpoint)).await {
            Ok(connected) => connected?,
            Err(_) => {
                return Err(TransportError::ConnectionFailed {
                    endpoint: self.endpoint.to_string(),
                    reason: format!("connect timed out after {}ms", timeout_ms),
                }
                .into())
            }
        }
        if let Some(hook) = self.on_connected.as_mut() {
            hook(&self.endpoint);
        }
        timeout_at(deadline, self.transport.send(request.as_str()))
            .await
            .map_err(|_| self.timed_out(timeout_ms))??;

        self.advance(CyclePhase::AwaitingResponse);
        let raw_response = timeout_at(deadline, self.transport.receive())
            .await
            .map_err(|_| self.timed_out(timeout_ms))??;
        debug!("received response: {}", raw_response);

        let response = Response::parse(&raw_response)?.into_result()?;
        Ok(Exchange {
            request,
            response,
            raw_response,
            elapsed: started.elapsed(),
        })
    }

    fn timed_out(&self, timeout_ms: u64) -> ClientError {
        TransportError::Timeout {
            endpoint: self.endpoint.to_string(),
            timeout_ms,
        }
        .into()
    }
}

/// Turn a request source into wire text
pub async fn build_request(source: &RequestSource) -> ClientResult<Request> {
    match source {
        RequestSource::Command(command) => {
            Request::from_command(command).map_err(|e| ClientError::InvalidRequest {
                message: format!("cannot encode {} command: {}", command.name(), e),
            })
        }
        RequestSource::File(path) => {
            let text = tokio::fs::read_to_string(path).await.map_err(|e| {
                ClientError::InvalidRequest {
                    message: format!("cannot read request file {}: {}", path.display(), e),
                }
            })?;
            Request::from_json_object(&text).map_err(|e| ClientError::InvalidRequest {
                message: format!("request file {} is not a JSON object: {}", path.display(), e),
            })
        }
        RequestSource::Raw(payload) => {
            Request::from_payload(payload).map_err(|e| ClientError::InvalidRequest {
                message: format!("cannot encode payload: {}", e),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transport::TransportType;
    use crate::domain::message::{Command, Key};
    use async_trait::async_trait;
    use proptest::prelude::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Transport that replays a scripted reply
    #[derive(Default)]
    struct ScriptedTransport {
        refuse: bool,
        connect_delay: Option<Duration>,
        reply_delay: Option<Duration>,
        reply: Option<String>,
        sent: Arc<Mutex<Vec<String>>>,
        closed: Arc<Mutex<bool>>,
    }

    impl ScriptedTransport {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Some(reply.to_string()),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        fn transport_type(&self) -> TransportType {
            TransportType::Tcp
        }

        async fn connect(&mut self, endpoint: &Endpoint) -> ClientResult<()> {
            if let Some(delay) = self.connect_delay {
                tokio::time::sleep(delay).await;
            }
            if self.refuse {
                return Err(TransportError::ConnectionFailed {
                    endpoint: endpoint.to_string(),
                    reason: "connection refused".to_string(),
                }
                .into());
            }
            Ok(())
        }

        async fn send(&mut self, payload: &str) -> ClientResult<()> {
            self.sent.lock().unwrap().push(payload.to_string());
            Ok(())
        }

        async fn receive(&mut self) -> ClientResult<String> {
            if let Some(delay) = self.reply_delay {
                tokio::time::sleep(delay).await;
            }
            self.reply.clone().ok_or_else(|| {
                ProtocolError::MalformedResponse("connection closed".to_string()).into()
            })
        }

        async fn close(&mut self) {
            *self.closed.lock().unwrap() = true;
        }
    }

    fn endpoint() -> Endpoint {
        Endpoint {
            host: "host".to_string(),
            port: 9000,
        }
    }

    fn get_name() -> RequestSource {
        RequestSource::Command(Command::Get {
            key: Key::Single("name".to_string()),
        })
    }

    #[tokio::test]
    async fn test_successful_cycle() {
        let transport = ScriptedTransport::replying(r#"{"status":"ok","data":"pong"}"#);
        let sent = transport.sent.clone();
        let closed = transport.closed.clone();
        let mut cycle = RequestCycle::new(transport, endpoint(), Duration::from_secs(1));
        assert_eq!(cycle.phase(), CyclePhase::Idle);

        let exchange = cycle.execute(&get_name()).await.unwrap();
        assert_eq!(exchange.response.status, "ok");
        assert_eq!(exchange.response.data, Some(json!("pong")));
        assert_eq!(cycle.phase(), CyclePhase::Succeeded);
        assert_eq!(sent.lock().unwrap().as_slice(), [r#"{"type":"get","key":"name"}"#]);
        assert!(*closed.lock().unwrap());
    }

    #[tokio::test]
    async fn test_cycle_is_single_shot() {
        let mut cycle = RequestCycle::new(
            ScriptedTransport::replying(r#"{"response":"OK"}"#),
            endpoint(),
            Duration::from_secs(1),
        );
        cycle.execute(&get_name()).await.unwrap();
        assert!(matches!(
            cycle.execute(&get_name()).await,
            Err(ClientError::CycleFinished)
        ));
        assert_eq!(cycle.phase(), CyclePhase::Succeeded);
    }

    #[tokio::test]
    async fn test_connection_failed() {
        let transport = ScriptedTransport {
            refuse: true,
            ..ScriptedTransport::default()
        };
        let sent = transport.sent.clone();
        let mut cycle = RequestCycle::new(transport, endpoint(), Duration::from_secs(1));

        let err = cycle.execute(&get_name()).await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Transport(TransportError::ConnectionFailed { .. })
        ));
        assert_eq!(cycle.phase(), CyclePhase::Failed);
        assert!(sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_slow_connect_is_connection_failure() {
        let transport = ScriptedTransport {
            connect_delay: Some(Duration::from_secs(5)),
            reply: Some(r#"{"response":"OK"}"#.to_string()),
            ..ScriptedTransport::default()
        };
        let mut cycle = RequestCycle::new(transport, endpoint(), Duration::from_millis(50));
        let err = cycle.execute(&get_name()).await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Transport(TransportError::ConnectionFailed { ref reason, .. })
                if reason.contains("timed out")
        ));
    }

    #[tokio::test]
    async fn test_slow_reply_times_out() {
        let transport = ScriptedTransport {
            reply_delay: Some(Duration::from_secs(5)),
            reply: Some(r#"{"response":"OK"}"#.to_string()),
            ..ScriptedTransport::default()
        };
        let closed = transport.closed.clone();
        let mut cycle = RequestCycle::new(transport, endpoint(), Duration::from_millis(50));

        let err = cycle.execute(&get_name()).await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Transport(TransportError::Timeout { timeout_ms: 50, .. })
        ));
        assert_eq!(cycle.phase(), CyclePhase::Failed);
        assert!(*closed.lock().unwrap());
    }

    #[tokio::test]
    async fn test_malformed_response() {
        for reply in ["not json", "{\"status\":", "[]", r#"{"data":"pong"}"#] {
            let mut cycle = RequestCycle::new(
                ScriptedTransport::replying(reply),
                endpoint(),
                Duration::from_secs(1),
            );
            let err = cycle.execute(&get_name()).await.unwrap_err();
            assert!(
                matches!(err, ClientError::Protocol(ProtocolError::MalformedResponse(_))),
                "reply {:?} gave {:?}",
                reply,
                err
            );
            assert_eq!(cycle.phase(), CyclePhase::Failed);
        }
    }

    #[tokio::test]
    async fn test_remote_error() {
        let mut cycle = RequestCycle::new(
            ScriptedTransport::replying(r#"{"response":"ERROR","reason":"No such key"}"#),
            endpoint(),
            Duration::from_secs(1),
        );
        let err = cycle.execute(&get_name()).await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Protocol(ProtocolError::RemoteError { ref reason, .. })
                if reason.as_deref() == Some("No such key")
        ));
    }

    #[tokio::test]
    async fn test_missing_request_file_fails_before_io() {
        let transport = ScriptedTransport::replying(r#"{"response":"OK"}"#);
        let sent = transport.sent.clone();
        let mut cycle = RequestCycle::new(transport, endpoint(), Duration::from_secs(1));

        let source = RequestSource::File("/nonexistent/request.json".into());
        let err = cycle.execute(&source).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidRequest { .. }));
        assert!(sent.lock().unwrap().is_empty());
        assert_eq!(cycle.phase(), CyclePhase::Failed);
    }

    #[tokio::test]
    async fn test_non_object_request_file_fails_before_io() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("list.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();

        let transport = ScriptedTransport::replying(r#"{"response":"OK"}"#);
        let sent = transport.sent.clone();
        let mut cycle = RequestCycle::new(transport, endpoint(), Duration::from_secs(1));

        let err = cycle.execute(&RequestSource::File(path)).await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::InvalidRequest { ref message } if message.contains("not a JSON object")
        ));
        assert!(sent.lock().unwrap().is_empty());
        assert_eq!(cycle.phase(), CyclePhase::Failed);
    }

    #[tokio::test]
    async fn test_connected_hook_runs_only_after_connect() {
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = calls.clone();
        let mut cycle = RequestCycle::new(
            ScriptedTransport::replying(r#"{"response":"OK"}"#),
            endpoint(),
            Duration::from_secs(1),
        )
        .on_connected(move |endpoint| {
            assert_eq!(endpoint.port, 9000);
            counter.fetch_add(1, Ordering::SeqCst);
        });
        cycle.execute(&get_name()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let counter = calls.clone();
        let refusing = ScriptedTransport {
            refuse: true,
            ..ScriptedTransport::default()
        };
        let mut cycle = RequestCycle::new(refusing, endpoint(), Duration::from_secs(1))
            .on_connected(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        cycle.execute(&get_name()).await.unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_oversized_request_is_not_sent() {
        let transport = ScriptedTransport::replying(r#"{"response":"OK"}"#);
        let sent = transport.sent.clone();
        let mut cycle = RequestCycle::new(transport, endpoint(), Duration::from_secs(1));

        let source = RequestSource::Command(Command::Set {
            key: Key::Single("big".to_string()),
            value: json!("z".repeat(MAX_FRAME_LEN)),
        });
        let err = cycle.execute(&source).await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Protocol(ProtocolError::PayloadTooLarge(_))
        ));
        assert!(sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_terminal_phases_have_no_successors() {
        use CyclePhase::*;
        let all = [Idle, Building, Sending, AwaitingResponse, Succeeded, Failed];
        for terminal in [Succeeded, Failed] {
            assert!(terminal.is_terminal());
            assert!(all.iter().all(|next| !terminal.can_advance_to(*next)));
        }
        assert!(Idle.can_advance_to(Building));
        assert!(!Idle.can_advance_to(Succeeded));
        assert!(!Sending.can_advance_to(Building));
    }

    /// Bodies that are not complete JSON: arbitrary text, or a valid reply cut short
    fn broken_body() -> impl Strategy<Value = String> {
        let garbage = any::<String>()
            .prop_filter("must not be JSON", |s| serde_json::from_str::<serde_json::Value>(s).is_err());
        let truncated = ("[a-zA-Z]{1,8}", "[a-zA-Z0-9 ]{0,16}")
            .prop_map(|(status, data)| json!({ "status": status, "data": data }).to_string())
            .prop_flat_map(|full| {
                let len = full.len();
                (Just(full), 1..len)
            })
            .prop_map(|(full, cut)| full[..cut].to_string());
        prop_oneof![garbage, truncated]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn broken_replies_fail_the_cycle(body in broken_body()) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
                .unwrap();

            let mut cycle = RequestCycle::new(
                ScriptedTransport::replying(&body),
                endpoint(),
                Duration::from_secs(1),
            );
            let result = runtime.block_on(cycle.execute(&get_name()));

            prop_assert!(
                matches!(result, Err(ClientError::Protocol(ProtocolError::MalformedResponse(_)))),
                "reply {:?} gave {:?}",
                body,
                result
            );
            prop_assert_eq!(cycle.phase(), CyclePhase::Failed);
        }
    }
}
