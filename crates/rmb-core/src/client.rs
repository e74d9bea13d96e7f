//! Connection lifecycle controller.
//!
//! `RtmClient` drives the handshake (auth check, session start), seeds the
//! session state store, opens the streaming socket, and supervises the
//! receive loop as a cancellable background task. Outbound sends share the
//! socket's write half behind a mutex and may run from any task.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    config::Config,
    domain::{Channel, ChannelId, User},
    errors::Error,
    events::{Event, MessageEvent},
    frames::Reassembler,
    ports::{ApiPort, Connector, EventHandler, ReadEvent, TransportReader, TransportWriter},
    session::{SessionState, Snapshot},
    Result,
};

/// Connection lifecycle states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ConnState {
    Idle,
    Authenticating,
    SessionStarting,
    SocketConnecting,
    Streaming,
    Disconnected,
}

impl ConnState {
    /// Connecting or open: a second `connect()` must be refused.
    fn is_busy(self) -> bool {
        !matches!(self, ConnState::Idle | ConnState::Disconnected)
    }
}

type Handlers = Arc<Mutex<Vec<Arc<dyn EventHandler>>>>;
type Session = Arc<Mutex<Option<SessionState>>>;

/// Real-time messaging client: one logical session per instance.
pub struct RtmClient {
    config: Arc<Config>,
    api: Arc<dyn ApiPort>,
    connector: Arc<dyn Connector>,

    state: Mutex<ConnState>,
    session: Session,
    handlers: Handlers,
    writer: Arc<Mutex<Option<Box<dyn TransportWriter>>>>,
    recv_task: Mutex<Option<JoinHandle<()>>>,
    cancel: Mutex<Option<CancellationToken>>,
    next_msg_id: AtomicU64,
}

impl RtmClient {
    pub fn new(config: Arc<Config>, api: Arc<dyn ApiPort>, connector: Arc<dyn Connector>) -> Self {
        Self {
            config,
            api,
            connector,
            state: Mutex::new(ConnState::Idle),
            session: Arc::new(Mutex::new(None)),
            handlers: Arc::new(Mutex::new(Vec::new())),
            writer: Arc::new(Mutex::new(None)),
            recv_task: Mutex::new(None),
            cancel: Mutex::new(None),
            next_msg_id: AtomicU64::new(1),
        }
    }

    /// Register a bot-behavior handler. Handlers are invoked from the
    /// receive loop, one message at a time.
    pub async fn register_handler(&self, handler: Arc<dyn EventHandler>) {
        self.handlers.lock().await.push(handler);
    }

    /// Point-in-time copy of the known channels.
    pub async fn channels(&self) -> Vec<Channel> {
        self.session
            .lock()
            .await
            .as_ref()
            .map(SessionState::channels_snapshot)
            .unwrap_or_default()
    }

    /// Point-in-time copy of the known users.
    pub async fn users(&self) -> Vec<User> {
        self.session
            .lock()
            .await
            .as_ref()
            .map(SessionState::users_snapshot)
            .unwrap_or_default()
    }

    /// Run the handshake, open the socket, spawn the receive loop, and
    /// greet every public joined channel.
    ///
    /// All handshake-phase failures are fatal and leave the client
    /// disconnected with no background loop spawned. Greeting failures
    /// are logged and do not abort the remaining greetings.
    pub async fn connect(&self) -> Result<()> {
        {
            let mut state = self.state.lock().await;
            if state.is_busy() {
                return Err(Error::AlreadyConnected);
            }
            *state = ConnState::Authenticating;
        }

        if let Err(e) = self.handshake().await {
            self.teardown().await;
            return Err(e);
        }

        *self.state.lock().await = ConnState::Streaming;
        info!("connected; streaming");

        self.fan_out(&self.config.greeting_text, "greeting").await;
        Ok(())
    }

    async fn handshake(&self) -> Result<()> {
        let auth = self
            .api
            .call("auth.test", &[])
            .await
            .map_err(|e| Error::Auth(e.to_string()))?;
        if !ok_field(&auth) {
            return Err(Error::Auth(error_field(&auth)));
        }

        *self.state.lock().await = ConnState::SessionStarting;
        let started = self
            .api
            .call("rtm.start", &[])
            .await
            .map_err(|e| Error::SessionStart(e.to_string()))?;
        let start: RtmStart =
            serde_json::from_value(started).map_err(|e| Error::SessionStart(e.to_string()))?;
        if !start.ok {
            return Err(Error::SessionStart(
                start.error.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }
        let (me, url) = match (start.me, start.url) {
            (Some(me), Some(url)) => (me, url),
            _ => {
                return Err(Error::SessionStart(
                    "response missing self identity or socket url".to_string(),
                ))
            }
        };

        // Seed the store before the socket opens; duplicate snapshot ids
        // fail the whole connect.
        let seeded = SessionState::seed(Snapshot {
            me,
            users: start.users,
            channels: start.channels,
            ims: start.ims,
        })?;
        info!(
            users = seeded.users_snapshot().len(),
            channels = seeded.channels_snapshot().len(),
            "session started"
        );
        *self.session.lock().await = Some(seeded);

        *self.state.lock().await = ConnState::SocketConnecting;
        let (reader, writer) = self
            .connector
            .connect(&url)
            .await
            .map_err(|e| Error::TransportConnect(e.to_string()))?;
        *self.writer.lock().await = Some(writer);

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_recv_loop(
            reader,
            self.session.clone(),
            self.handlers.clone(),
            self.api.clone(),
            self.config.clone(),
            cancel.clone(),
        ));
        *self.cancel.lock().await = Some(cancel);
        *self.recv_task.lock().await = Some(task);

        Ok(())
    }

    /// Cancel the receive loop, await its exit, then best-effort send a
    /// farewell to every public joined channel.
    pub async fn disconnect(&self) {
        if let Some(cancel) = self.cancel.lock().await.take() {
            cancel.cancel();
        }
        if let Some(task) = self.recv_task.lock().await.take() {
            if let Err(e) = task.await {
                warn!("receive loop task failed: {e}");
            }
        }

        self.fan_out(&self.config.farewell_text, "farewell").await;

        *self.writer.lock().await = None;
        *self.state.lock().await = ConnState::Disconnected;
        info!("disconnected");
    }

    /// Post `text` to every public joined channel, logging failures and
    /// continuing (chat sends are fire-and-forget by policy).
    async fn fan_out(&self, text: &str, what: &str) {
        let channels = self.channels().await;
        for channel in channels.iter().filter(|c| c.is_public_and_joined()) {
            if let Err(e) = self.post_message(&channel.id, text, None).await {
                warn!("{what} to {} failed: {e}", channel.id);
            }
        }
    }

    /// Post a chat message via the API side-channel.
    ///
    /// Returns the error so the call site chooses the policy; internal
    /// greeting/farewell call sites log and ignore it.
    pub async fn post_message(
        &self,
        channel: &ChannelId,
        text: &str,
        attachments: Option<&str>,
    ) -> Result<()> {
        post_message(self.api.as_ref(), channel, text, attachments).await
    }

    /// Send a typing indicator over the socket. Unlike chat posts this
    /// writes to the streaming transport directly, and failures propagate.
    pub async fn send_typing(&self, channel: &ChannelId) -> Result<()> {
        let id = self.next_msg_id.fetch_add(1, Ordering::Relaxed);
        let payload = serde_json::json!({
            "id": id,
            "type": "typing",
            "channel": channel.0,
        })
        .to_string();

        let mut writer = self.writer.lock().await;
        let Some(writer) = writer.as_mut() else {
            return Err(Error::Send("not connected".to_string()));
        };
        writer.send_text(&payload).await
    }

    async fn teardown(&self) {
        if let Some(cancel) = self.cancel.lock().await.take() {
            cancel.cancel();
        }
        *self.recv_task.lock().await = None;
        *self.writer.lock().await = None;
        *self.session.lock().await = None;
        *self.state.lock().await = ConnState::Disconnected;
    }
}

#[derive(serde::Deserialize)]
struct RtmStart {
    #[serde(default)]
    ok: bool,
    error: Option<String>,
    url: Option<String>,
    #[serde(rename = "self")]
    me: Option<crate::domain::SelfIdentity>,
    #[serde(default)]
    users: Vec<User>,
    #[serde(default)]
    channels: Vec<Channel>,
    #[serde(default)]
    ims: Vec<Channel>,
}

async fn post_message(
    api: &dyn ApiPort,
    channel: &ChannelId,
    text: &str,
    attachments: Option<&str>,
) -> Result<()> {
    let params = vec![
        ("channel".to_string(), channel.0.clone()),
        ("text".to_string(), text.to_string()),
        ("as_user".to_string(), "true".to_string()),
        ("attachments".to_string(), attachments.unwrap_or("").to_string()),
    ];
    let resp = api.call("chat.postMessage", &params).await?;
    if !ok_field(&resp) {
        return Err(Error::Send(error_field(&resp)));
    }
    Ok(())
}

/// The receive loop: read fragments, reassemble, decode, dispatch.
///
/// All session-state mutation happens here, which keeps the store under a
/// single writer. A failure to process one logical message is logged and
/// the loop moves on; only cancellation, peer close, or a transport-level
/// read error end it.
async fn run_recv_loop(
    mut reader: Box<dyn TransportReader>,
    session: Session,
    handlers: Handlers,
    api: Arc<dyn ApiPort>,
    config: Arc<Config>,
    cancel: CancellationToken,
) {
    let mut frames = Reassembler::new();
    loop {
        let read = tokio::select! {
            () = cancel.cancelled() => break,
            read = reader.read() => read,
        };

        let raw = match read {
            Ok(ReadEvent::Fragment { text, fin }) => {
                let Some(raw) = frames.push(&text, fin) else {
                    continue;
                };
                raw
            }
            Ok(ReadEvent::Closed) => {
                info!("stream closed by peer");
                break;
            }
            Err(e) => {
                warn!("transport read failed: {e}");
                break;
            }
        };

        if let Err(e) =
            process_message(&raw, &session, &handlers, api.as_ref(), config.as_ref()).await
        {
            // One bad message must not kill the loop.
            warn!("event processing failed: {e}");
        }
    }
    debug!("receive loop exited");
}

async fn process_message(
    raw: &str,
    session: &Session,
    handlers: &Handlers,
    api: &dyn ApiPort,
    config: &Config,
) -> Result<()> {
    match Event::decode(raw)? {
        Event::Message(msg) => handle_message(msg, session, handlers).await,
        Event::ChannelMeta(channel) => {
            if let Some(state) = session.lock().await.as_mut() {
                state.upsert_channel(channel);
            }
            Ok(())
        }
        Event::UserMeta(user) => {
            if let Some(state) = session.lock().await.as_mut() {
                state.upsert_user(user);
            }
            Ok(())
        }
        Event::ChannelJoined(channel) => {
            handle_channel_joined(channel, session, api, config).await
        }
        Event::Ignored => Ok(()),
    }
}

async fn handle_message(msg: MessageEvent, session: &Session, handlers: &Handlers) -> Result<()> {
    let (channel, user, mention) = {
        let guard = session.lock().await;
        let Some(state) = guard.as_ref() else {
            return Ok(());
        };

        let Some(author) = msg.user.as_ref() else {
            debug!("message without author in {}; skipped", msg.channel);
            return Ok(());
        };
        if *author == state.me().id {
            // Self-echo suppression.
            return Ok(());
        }

        // Out-of-snapshot ids are a logged skip, not a crash.
        let Some(channel) = state.channel(&msg.channel) else {
            let e = Error::Lookup {
                kind: "channel",
                id: msg.channel.0.clone(),
            };
            warn!("{e}; message skipped");
            return Ok(());
        };
        let Some(user) = state.user(author) else {
            let e = Error::Lookup {
                kind: "user",
                id: author.0.clone(),
            };
            warn!("{e}; message skipped");
            return Ok(());
        };

        (channel.clone(), user.clone(), state.me().mention_token())
    };

    let mentioned = msg.text.contains(&mention);
    let registered: Vec<Arc<dyn EventHandler>> = handlers.lock().await.clone();
    for handler in &registered {
        handler.on_message(&channel, &user, &msg.text, mentioned).await;
    }
    Ok(())
}

async fn handle_channel_joined(
    channel: Channel,
    session: &Session,
    api: &dyn ApiPort,
    config: &Config,
) -> Result<()> {
    info!("joined channel {} ({})", channel.name, channel.id);
    {
        let mut guard = session.lock().await;
        if let Some(state) = guard.as_mut() {
            state.upsert_channel(channel.clone());
        }
    }
    if let Err(e) = post_message(api, &channel.id, &config.greeting_text, None).await {
        warn!("greeting to {} failed: {e}", channel.id);
    }
    Ok(())
}

fn ok_field(v: &serde_json::Value) -> bool {
    v.get("ok").and_then(serde_json::Value::as_bool).unwrap_or(false)
}

fn error_field(v: &serde_json::Value) -> String {
    v.get("error")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("unknown error")
        .to_string()
}
