//! Realtime client facade.
//!
//! [`RealtimeClient`] ties a [`MessageChannel`] to the router, request
//! correlator, login flow and subscription manager.
//!
//! # Example
//!
//! ```no_run
//! use futures_util::StreamExt;
//! use ddp_realtime::{MessageKind, RealtimeClient};
//!
//! # async fn example() -> ddp_realtime::Result<()> {
//! let client = RealtimeClient::connect("wss://open.rocket.chat/websocket").await?;
//!
//! let mut connected = client.connect_to_server();
//! connected.next().await;
//! let _pong = client.keep_alive();
//!
//! let mut login = client.login("user@example.com", "secret")?;
//! while let Some(frame) = login.next().await {
//!     println!("{frame:?}");
//! }
//!
//! let mut room = client.get_subscription("stream-room-messages", "GENERAL", false);
//! if let Some(message) = room.next().await {
//!     println!("{message:?}");
//! }
//!
//! client.disconnect().await;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::StreamExt;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, trace};
use url::Url;

use crate::error::{Error, Result, TransportError};
use crate::identifiers::{CorrelationId, IdGenerator, TimeOrderedIds};
use crate::protocol::{Credentials, Frame, MessageKind};
use crate::transport::{Inbound, MessageChannel};

use super::builder::ClientBuilder;
use super::login::{LOGIN_METHOD, LoginMerge, merged_stream};
use super::options::ClientOptions;
use super::router::{FrameRouter, FrameStream, InboundStream, recv_inbound};
use super::subscription::{FramePredicate, Multiplexed, Subscription};

// ============================================================================
// Types
// ============================================================================

/// Hook invoked for every inbound frame.
pub type MessageHook = Box<dyn FnMut(Frame) + Send>;

/// Hook invoked for every in-band transport error.
pub type ErrorHook = Box<dyn FnMut(TransportError) + Send>;

/// Hook invoked once when the inbound stream completes.
pub type CompletionHook = Box<dyn FnOnce() + Send>;

// ============================================================================
// RealtimeClient
// ============================================================================

/// Client side of a realtime DDP session.
///
/// Cheap to clone; clones share the channel and the disconnect state.
#[derive(Clone)]
pub struct RealtimeClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    url: Option<Url>,
    channel: Arc<dyn MessageChannel>,
    router: FrameRouter,
    ids: Arc<dyn IdGenerator>,
    options: ClientOptions,
    disconnected: AtomicBool,
}

impl fmt::Debug for RealtimeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RealtimeClient")
            .field("url", &self.inner.url.as_ref().map(Url::as_str))
            .field("disconnected", &self.is_disconnected())
            .field("options", &self.inner.options)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl RealtimeClient {
    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Opens a WebSocket to `url` with default options.
    ///
    /// # Errors
    ///
    /// See [`ClientBuilder::connect`].
    pub async fn connect(url: &str) -> Result<Self> {
        ClientBuilder::new().url(url).connect().await
    }

    /// Wraps an already-open channel with default options.
    #[must_use]
    pub fn from_channel(channel: Arc<dyn MessageChannel>) -> Self {
        Self::new(
            None,
            channel,
            Arc::new(TimeOrderedIds),
            ClientOptions::default(),
        )
    }

    pub(crate) fn new(
        url: Option<Url>,
        channel: Arc<dyn MessageChannel>,
        ids: Arc<dyn IdGenerator>,
        options: ClientOptions,
    ) -> Self {
        debug!(url = ?url.as_ref().map(Url::as_str), "Realtime client created");
        let router = FrameRouter::new(Arc::clone(&channel));
        Self {
            inner: Arc::new(ClientInner {
                url,
                channel,
                router,
                ids,
                options,
                disconnected: AtomicBool::new(false),
            }),
        }
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl RealtimeClient {
    /// Server URL, when the client was created from one.
    #[inline]
    #[must_use]
    pub fn url(&self) -> Option<&Url> {
        self.inner.url.as_ref()
    }

    /// Options in effect.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &ClientOptions {
        &self.inner.options
    }

    /// The frame router over this client's channel.
    #[inline]
    #[must_use]
    pub fn router(&self) -> &FrameRouter {
        &self.inner.router
    }

    /// Returns `true` once [`disconnect`](Self::disconnect) has been called.
    #[inline]
    #[must_use]
    pub fn is_disconnected(&self) -> bool {
        self.inner.disconnected.load(Ordering::Acquire)
    }

    #[inline]
    fn next_id(&self) -> CorrelationId {
        self.inner.ids.next_id()
    }
}

// ============================================================================
// Inbound Stream & Hooks
// ============================================================================

impl RealtimeClient {
    /// Every inbound item, transport errors included.
    #[must_use]
    pub fn inbound(&self) -> InboundStream {
        self.inner.router.inbound()
    }

    /// Inbound frames whose `msg` is `kind`.
    #[must_use]
    pub fn by_message_type(&self, kind: MessageKind) -> FrameStream {
        self.inner.router.by_message_type(kind)
    }

    /// Inbound frames whose `id` equals `id`.
    #[must_use]
    pub fn by_id(&self, id: impl Into<String>) -> FrameStream {
        self.inner.router.by_id(id)
    }

    /// Calls `handler` for every inbound frame until the stream completes.
    pub fn on_message<F>(&self, handler: F) -> JoinHandle<()>
    where
        F: FnMut(Frame) + Send + 'static,
    {
        self.subscribe(Some(Box::new(handler)), None, None)
    }

    /// Calls `handler` for every transport error until the stream completes.
    pub fn on_error<F>(&self, handler: F) -> JoinHandle<()>
    where
        F: FnMut(TransportError) + Send + 'static,
    {
        self.subscribe(None, Some(Box::new(handler)), None)
    }

    /// Calls `handler` once when the inbound stream completes.
    pub fn on_completion<F>(&self, handler: F) -> JoinHandle<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.subscribe(None, None, Some(Box::new(handler)))
    }

    /// Dispatches the inbound stream to the given hooks on a spawned task.
    ///
    /// The receiver is opened before this returns, so frames pushed after
    /// the call are seen. Aborting the returned handle detaches the hooks.
    pub fn subscribe(
        &self,
        mut on_message: Option<MessageHook>,
        mut on_error: Option<ErrorHook>,
        on_completion: Option<CompletionHook>,
    ) -> JoinHandle<()> {
        let mut rx = self.inner.router.receiver();

        tokio::spawn(async move {
            while let Some(item) = recv_inbound(&mut rx).await {
                match item {
                    Inbound::Frame(frame) => {
                        if let Some(hook) = on_message.as_mut() {
                            hook(frame);
                        }
                    }
                    Inbound::Error(error) => {
                        if let Some(hook) = on_error.as_mut() {
                            hook(error);
                        }
                    }
                }
            }

            trace!("Inbound stream completed, running completion hook");
            if let Some(hook) = on_completion {
                hook();
            }
        })
    }
}

// ============================================================================
// Session
// ============================================================================

impl RealtimeClient {
    /// Sends a frame as is.
    pub fn send_message(&self, frame: Frame) {
        trace!(kind = %frame.kind(), id = ?frame.id(), "Sending frame");
        self.inner.channel.send(frame);
    }

    /// Sends the DDP `connect` handshake and returns the `connected` frames.
    #[must_use]
    pub fn connect_to_server(&self) -> FrameStream {
        let connected = self.by_message_type(MessageKind::Connected);
        self.send_connect();
        connected
    }

    /// Sends the DDP `connect` handshake and waits for the server's answer.
    ///
    /// Returns the session id from `connected`, when the server sends one.
    ///
    /// # Errors
    ///
    /// - [`Error::Protocol`] if the server answers `failed`
    /// - [`Error::ConnectionTimeout`] if no answer arrives within
    ///   [`ClientOptions::connect_timeout`]
    /// - [`Error::ConnectionClosed`] if the inbound stream completes first
    pub async fn handshake(&self) -> Result<Option<String>> {
        let mut answers = self
            .inner
            .router
            .filtered(|frame| matches!(frame, Frame::Connected { .. } | Frame::Failed { .. }));
        self.send_connect();

        let wait = self.inner.options.connect_timeout;
        let answer = timeout(wait, answers.next())
            .await
            .map_err(|_| Error::connection_timeout(wait.as_millis() as u64))?;

        match answer {
            Some(Frame::Connected { session }) => {
                info!(?session, "Handshake complete");
                Ok(session)
            }
            Some(Frame::Failed { version }) => Err(Error::protocol(format!(
                "server rejected protocol version '{}', suggests '{version}'",
                self.inner.options.protocol_version
            ))),
            _ => Err(Error::ConnectionClosed),
        }
    }

    fn send_connect(&self) {
        let options = &self.inner.options;
        debug!(version = %options.protocol_version, "Sending connect");
        self.send_message(Frame::connect(
            options.protocol_version.clone(),
            options.supported_versions.clone(),
        ));
    }

    /// Answers every inbound `ping` with a `pong` on a spawned task.
    ///
    /// The pong echoes the ping's `id` when it has one. The task ends when
    /// the inbound stream completes.
    pub fn keep_alive(&self) -> JoinHandle<()> {
        let mut pings = self.by_message_type(MessageKind::Ping);
        let channel = Arc::clone(&self.inner.channel);

        tokio::spawn(async move {
            while let Some(frame) = pings.next().await {
                if let Frame::Ping { id } = frame {
                    trace!(?id, "Answering ping");
                    channel.send(Frame::pong(id));
                }
            }
        })
    }

    /// Closes the channel.
    ///
    /// Only the first call has an effect; later calls return immediately.
    pub async fn disconnect(&self) {
        if self.inner.disconnected.swap(true, Ordering::AcqRel) {
            trace!("Already disconnected");
            return;
        }

        info!(url = ?self.inner.url.as_ref().map(Url::as_str), "Disconnecting");
        self.inner.channel.close().await;
    }
}

// ============================================================================
// Method Calls
// ============================================================================

impl RealtimeClient {
    /// Sends `{msg:"method", id, method, params}` with a fresh id and returns
    /// every inbound frame carrying that id.
    ///
    /// The frame is sent before this returns. Error payloads in the reply
    /// are passed through untouched.
    #[must_use]
    pub fn call_method(&self, method: &str, params: Vec<Value>) -> FrameStream {
        self.send_method(method, params).1
    }

    /// Calls `method` and waits for its `result`.
    ///
    /// # Errors
    ///
    /// - [`Error::MethodFailed`] if the result carries an `error` payload
    /// - [`Error::RequestTimeout`] if no result arrives within
    ///   [`ClientOptions::method_timeout`]
    /// - [`Error::ConnectionClosed`] if the inbound stream completes first
    pub async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value> {
        let (id, mut replies) = self.send_method(method, params);
        let wait = self.inner.options.method_timeout;

        let outcome = timeout(wait, async {
            while let Some(frame) = replies.next().await {
                if let Frame::Result { result, error, .. } = frame {
                    return match error {
                        Some(error) => Err(Error::method_failed(method, error)),
                        None => Ok(result.unwrap_or(Value::Null)),
                    };
                }
            }
            Err(Error::ConnectionClosed)
        })
        .await;

        outcome.unwrap_or_else(|_| {
            debug!(%id, method, "Method call timed out");
            Err(Error::request_timeout(id, wait.as_millis() as u64))
        })
    }

    fn send_method(&self, method: &str, params: Vec<Value>) -> (CorrelationId, FrameStream) {
        let id = self.next_id();
        let replies = self.by_id(id.as_str());

        debug!(%id, method, "Calling method");
        self.send_message(Frame::method(id.clone(), method, params));

        (id, replies)
    }
}

// ============================================================================
// Login
// ============================================================================

impl RealtimeClient {
    /// Logs in with a username or email and a plaintext password.
    ///
    /// The password is sent as a SHA-256 digest. An identifier containing
    /// `@` is sent as `email`.
    ///
    /// # Errors
    ///
    /// See [`login_with`](Self::login_with).
    pub fn login(&self, identifier: &str, password: &str) -> Result<FrameStream> {
        self.login_with(Credentials::password(identifier, password))
    }

    /// Logs in with a previously issued resume token.
    ///
    /// # Errors
    ///
    /// See [`login_with`](Self::login_with).
    pub fn login_with_auth_token(&self, token: &str) -> Result<FrameStream> {
        self.login_with(Credentials::resume(token))
    }

    /// Logs in with an OAuth credential token and secret.
    ///
    /// # Errors
    ///
    /// See [`login_with`](Self::login_with).
    pub fn login_with_oauth(
        &self,
        credential_token: &str,
        credential_secret: &str,
    ) -> Result<FrameStream> {
        self.login_with(Credentials::oauth(credential_token, credential_secret))
    }

    /// Sends a `login` method call and returns the merged reply sequence.
    ///
    /// The sequence yields the frames carrying the login id and, after a
    /// successful `result`, the pushed document whose id is `result.id`,
    /// whichever order they arrive in. It ends once both are seen, on an
    /// error result, or when the merge gives up.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the credentials cannot be encoded.
    pub fn login_with(&self, credentials: Credentials) -> Result<FrameStream> {
        let param = credentials.to_param()?;
        let id = self.next_id();
        let rx = self.inner.router.receiver();

        debug!(%id, mechanism = credentials.mechanism(), "Sending login");
        self.send_message(Frame::method(id.clone(), LOGIN_METHOD, vec![param]));

        let merge = LoginMerge::new(id, self.inner.options.login_backlog_limit);
        Ok(merged_stream(rx, merge, self.inner.options.added_timeout))
    }
}

// ============================================================================
// Subscriptions
// ============================================================================

impl RealtimeClient {
    /// Creates a handle to the stream `stream_name` for `stream_param`.
    ///
    /// Nothing is sent until the handle is first polled.
    #[must_use]
    pub fn get_subscription(
        &self,
        stream_name: &str,
        stream_param: &str,
        add_event: bool,
    ) -> Subscription {
        Subscription::new(
            Arc::clone(&self.inner.channel),
            self.next_id(),
            stream_name,
            stream_param,
            add_event,
        )
    }

    /// Creates a multiplexed stream with custom open and close frames.
    #[must_use]
    pub fn multiplex(&self, open: Frame, close: Frame, predicate: FramePredicate) -> Multiplexed {
        Multiplexed::new(Arc::clone(&self.inner.channel), open, close, predicate)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashSet;
    use std::time::Duration;

    use parking_lot::Mutex;
    use serde_json::json;
    use tokio_test::{assert_pending, assert_ready, task};

    use crate::identifiers::SequentialIds;
    use crate::transport::MemoryChannel;

    fn setup() -> (Arc<MemoryChannel>, RealtimeClient) {
        setup_with(ClientOptions::default())
    }

    fn setup_with(options: ClientOptions) -> (Arc<MemoryChannel>, RealtimeClient) {
        let channel = Arc::new(MemoryChannel::new());
        let client = RealtimeClient::new(
            None,
            channel.clone(),
            Arc::new(SequentialIds::new("t")),
            options,
        );
        (channel, client)
    }

    fn sent_id(frame: &Frame) -> String {
        frame.id().expect("id").to_string()
    }

    async fn wait_for_sent(channel: &MemoryChannel, count: usize) {
        for _ in 0..1000 {
            if channel.sent().len() >= count {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("expected {count} sent frames, got {:?}", channel.sent());
    }

    fn added(collection: &str, id: &str) -> Frame {
        Frame::Added {
            collection: collection.into(),
            id: id.into(),
            fields: None,
        }
    }

    // ------------------------------------------------------------------------
    // Correlator
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_call_method_sends_eagerly_with_unique_ids() {
        let (channel, client) = setup();

        let _a = client.call_method("getRooms", vec![]);
        let _b = client.call_method("getRooms", vec![json!(1)]);
        let _c = client.call_method("ping", vec![]);

        let ids: HashSet<String> = channel.sent().iter().map(sent_id).collect();
        assert_eq!(ids.len(), 3);
        assert!(matches!(
            &channel.sent()[1],
            Frame::Method { method, params, .. } if method == "getRooms" && params == &vec![json!(1)]
        ));
    }

    #[tokio::test]
    async fn test_call_method_yields_frames_with_its_id() {
        let (channel, client) = setup();
        let replies = client.call_method("getRooms", vec![]);
        let id = sent_id(&channel.sent()[0]);

        channel.push(Frame::Result {
            id: CorrelationId::new("other"),
            result: Some(json!(0)),
            error: None,
        });
        channel.push(Frame::Result {
            id: CorrelationId::new(id.clone()),
            result: None,
            error: Some(json!({"error": 404})),
        });
        channel.complete();

        let replies: Vec<Frame> = replies.collect().await;
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].id(), Some(id.as_str()));
        assert!(replies[0].error().is_some());
    }

    #[tokio::test]
    async fn test_call_returns_result_value() {
        let (channel, client) = setup();
        let mut call = task::spawn(client.call("getRooms", vec![]));
        assert_pending!(call.poll());

        channel.push(Frame::Result {
            id: CorrelationId::new("t-1"),
            result: Some(json!(["GENERAL"])),
            error: None,
        });

        let value = assert_ready!(call.poll()).expect("result");
        assert_eq!(value, json!(["GENERAL"]));
    }

    #[tokio::test]
    async fn test_call_maps_error_payload() {
        let (channel, client) = setup();
        let mut call = task::spawn(client.call("sendMessage", vec![]));
        assert_pending!(call.poll());

        channel.push(Frame::Result {
            id: CorrelationId::new("t-1"),
            result: None,
            error: Some(json!({"error": "error-not-allowed"})),
        });

        let err = assert_ready!(call.poll()).unwrap_err();
        assert!(matches!(
            err,
            Error::MethodFailed { ref method, .. } if method == "sendMessage"
        ));
    }

    #[tokio::test]
    async fn test_call_times_out() {
        let (_channel, client) =
            setup_with(ClientOptions::new().with_method_timeout(Duration::from_millis(20)));

        let err = client.call("slow", vec![]).await.unwrap_err();
        assert!(err.is_timeout());
        assert!(matches!(err, Error::RequestTimeout { ref request_id, .. } if request_id == "t-1"));
    }

    #[tokio::test]
    async fn test_call_fails_when_stream_completes() {
        let (channel, client) = setup();
        let mut call = task::spawn(client.call("m", vec![]));
        assert_pending!(call.poll());

        channel.complete();

        assert!(matches!(
            assert_ready!(call.poll()),
            Err(Error::ConnectionClosed)
        ));
    }

    // ------------------------------------------------------------------------
    // Login
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_login_merges_result_and_added() {
        let (channel, client) = setup();
        let login = client.login("alice", "secret").expect("login");
        let id = sent_id(&channel.sent()[0]);

        let result = Frame::Result {
            id: CorrelationId::new(id),
            result: Some(json!({"id": "Y", "token": "tok"})),
            error: None,
        };
        channel.push(added("users", "unrelated"));
        channel.push(result.clone());
        channel.push(Frame::Ping { id: None });
        channel.push(added("users", "Y"));
        channel.push(added("users", "Y"));

        let frames: Vec<Frame> = login.collect().await;
        assert_eq!(frames, vec![result, added("users", "Y")]);
    }

    #[tokio::test]
    async fn test_login_added_before_result() {
        let (channel, client) = setup();
        let login = client.login_with_auth_token("resume-token").expect("login");

        let result = Frame::Result {
            id: CorrelationId::new("t-1"),
            result: Some(json!({"id": "Y"})),
            error: None,
        };
        channel.push(added("users", "Y"));
        channel.push(result.clone());

        let frames: Vec<Frame> = login.collect().await;
        assert_eq!(frames, vec![result, added("users", "Y")]);
    }

    #[tokio::test]
    async fn test_login_without_added_yields_only_result() {
        let (channel, client) = setup();
        let login = client.login("alice", "secret").expect("login");

        let result = Frame::Result {
            id: CorrelationId::new("t-1"),
            result: Some(json!({"id": "Y"})),
            error: None,
        };
        channel.push(result.clone());
        channel.push(added("users", "Z"));
        channel.complete();

        let frames: Vec<Frame> = login.collect().await;
        assert_eq!(frames, vec![result]);
    }

    #[tokio::test]
    async fn test_login_identifier_selects_email_or_username() {
        let (channel, client) = setup();
        let _by_email = client.login("alice@example.com", "pw").expect("login");
        let _by_name = client.login("alice", "pw").expect("login");

        let sent = channel.sent();
        let Frame::Method { method, params, .. } = &sent[0] else {
            panic!("expected method frame, got {:?}", sent[0]);
        };
        assert_eq!(method, "login");
        assert_eq!(params[0]["user"], json!({"email": "alice@example.com"}));
        assert_eq!(params[0]["password"]["algorithm"], json!("sha-256"));

        let Frame::Method { params, .. } = &sent[1] else {
            panic!("expected method frame, got {:?}", sent[1]);
        };
        assert_eq!(params[0]["user"], json!({"username": "alice"}));
    }

    #[tokio::test]
    async fn test_login_with_oauth_payload() {
        let (channel, client) = setup();
        let _login = client.login_with_oauth("ct", "cs").expect("login");

        let Frame::Method { params, .. } = &channel.sent()[0] else {
            panic!("expected method frame");
        };
        assert_eq!(
            params[0],
            json!({"oauth": {"credentialToken": "ct", "credentialSecret": "cs"}})
        );
    }

    // ------------------------------------------------------------------------
    // Subscriptions
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_subscription_sub_then_unsub() {
        let (channel, client) = setup();
        let mut sub = client.get_subscription("stream-room-messages", "GENERAL", false);

        let mut next = task::spawn(sub.next());
        assert_pending!(next.poll());
        drop(next);
        drop(sub);

        let sent = channel.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(
            sent[0],
            Frame::sub(
                CorrelationId::new("t-1"),
                "stream-room-messages",
                vec![json!("GENERAL"), json!(false)]
            )
        );
        assert_eq!(sent[1], Frame::unsub(CorrelationId::new("t-1")));
    }

    #[tokio::test]
    async fn test_subscriptions_get_distinct_ids() {
        let (_channel, client) = setup();
        let a = client.get_subscription("s", "p", true);
        let b = client.get_subscription("s", "p", true);
        assert_ne!(a.id(), b.id());
    }

    // ------------------------------------------------------------------------
    // Session
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_connect_to_server_handshake() {
        let (channel, client) = setup();
        let mut connected = client.connect_to_server();

        assert_eq!(
            channel.sent(),
            vec![Frame::connect(
                "1",
                vec!["1".into(), "pre2".into(), "pre1".into()]
            )]
        );

        channel.push(Frame::Ping { id: None });
        channel.push(Frame::Connected {
            session: Some("sess".into()),
        });

        assert_eq!(
            connected.next().await,
            Some(Frame::Connected {
                session: Some("sess".into())
            })
        );
    }

    #[tokio::test]
    async fn test_keep_alive_echoes_ping_id() {
        let (channel, client) = setup();
        let pong_task = client.keep_alive();

        channel.push(Frame::Ping { id: Some("p1".into()) });
        channel.push(Frame::Ping { id: None });
        wait_for_sent(&channel, 2).await;

        assert_eq!(
            channel.sent(),
            vec![Frame::pong(Some("p1".into())), Frame::pong(None)]
        );

        channel.complete();
        pong_task.await.expect("keep-alive task");
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let (channel, client) = setup();
        client.disconnect().await;
        client.disconnect().await;
        client.clone().disconnect().await;

        assert_eq!(channel.close_calls(), 1);
        assert!(client.is_disconnected());
    }

    #[tokio::test]
    async fn test_handshake_returns_session() {
        let (channel, client) = setup();
        let mut handshake = task::spawn(client.handshake());
        assert_pending!(handshake.poll());
        assert!(matches!(channel.sent()[0], Frame::Connect { .. }));

        channel.push_json(r#"{"server_id":"0"}"#);
        channel.push(Frame::Connected {
            session: Some("sess".into()),
        });

        let session = assert_ready!(handshake.poll()).expect("handshake");
        assert_eq!(session.as_deref(), Some("sess"));
    }

    #[tokio::test]
    async fn test_handshake_failed_is_protocol_error() {
        let (channel, client) = setup();
        let mut handshake = task::spawn(client.handshake());
        assert_pending!(handshake.poll());

        channel.push(Frame::Failed {
            version: "pre1".into(),
        });

        let err = assert_ready!(handshake.poll()).unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
        assert!(err.to_string().contains("suggests 'pre1'"));
    }

    #[tokio::test]
    async fn test_handshake_times_out() {
        let (_channel, client) =
            setup_with(ClientOptions::new().with_connect_timeout(Duration::from_millis(20)));

        let err = client.handshake().await.unwrap_err();
        assert!(matches!(err, Error::ConnectionTimeout { timeout_ms: 20 }));
    }

    #[tokio::test]
    async fn test_handshake_fails_when_stream_completes() {
        let (channel, client) = setup();
        let mut handshake = task::spawn(client.handshake());
        assert_pending!(handshake.poll());

        channel.complete();

        assert!(matches!(
            assert_ready!(handshake.poll()),
            Err(Error::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_server_banner_reaches_hooks_as_a_frame() {
        let (channel, client) = setup();
        let frames = Arc::new(Mutex::new(Vec::new()));
        let errors = Arc::new(Mutex::new(Vec::new()));

        let handle = client.subscribe(
            Some(Box::new({
                let frames = frames.clone();
                move |frame: Frame| frames.lock().push(frame)
            })),
            Some(Box::new({
                let errors = errors.clone();
                move |error: TransportError| errors.lock().push(error)
            })),
            None,
        );

        channel.push_json(r#"{"server_id":"0"}"#);
        channel.complete();
        handle.await.expect("hook task");

        assert!(errors.lock().is_empty());
        assert_eq!(
            *frames.lock(),
            vec![Frame::ServerId {
                server_id: "0".into()
            }]
        );
    }

    #[tokio::test]
    async fn test_hooks_receive_frames_errors_and_completion() {
        let (channel, client) = setup();
        let frames = Arc::new(Mutex::new(Vec::new()));
        let errors = Arc::new(Mutex::new(Vec::new()));
        let completed = Arc::new(AtomicBool::new(false));

        let handle = client.subscribe(
            Some(Box::new({
                let frames = frames.clone();
                move |frame: Frame| frames.lock().push(frame)
            })),
            Some(Box::new({
                let errors = errors.clone();
                move |error: TransportError| errors.lock().push(error)
            })),
            Some(Box::new({
                let completed = completed.clone();
                move || completed.store(true, Ordering::SeqCst)
            })),
        );

        channel.push(Frame::Ping { id: None });
        channel.push_json("{not json");
        channel.push(Frame::Pong { id: None });
        channel.complete();
        handle.await.expect("hook task");

        assert_eq!(
            *frames.lock(),
            vec![Frame::Ping { id: None }, Frame::Pong { id: None }]
        );
        assert_eq!(errors.lock().len(), 1);
        assert!(matches!(errors.lock()[0], TransportError::Decode(_)));
        assert!(completed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_on_message_shortcut() {
        let (channel, client) = setup();
        let count = Arc::new(Mutex::new(0usize));
        let handle = client.on_message({
            let count = count.clone();
            move |_| *count.lock() += 1
        });

        channel.push(Frame::Ping { id: None });
        channel.push(Frame::Ping { id: None });
        channel.complete();
        handle.await.expect("hook task");

        assert_eq!(*count.lock(), 2);
    }

    #[test]
    fn test_from_channel_has_no_url() {
        let client = RealtimeClient::from_channel(Arc::new(MemoryChannel::new()));
        assert!(client.url().is_none());
        assert!(!client.is_disconnected());
    }
}
