//! Live voice support: microphone PCM goes up, synthesized speech and
//! running transcripts come back.

use std::collections::VecDeque;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::settings::AppConfig;

pub const INPUT_SAMPLE_RATE: u32 = 16_000;
pub const OUTPUT_SAMPLE_RATE: u32 = 24_000;
const INPUT_MIME: &str = "audio/pcm;rate=16000";

pub const CONNECTING_TEXT: &str = "Connecting to live support... Please allow microphone access.";
pub const CONNECTED_TEXT: &str = "Connected! How can I help you today?";
pub const CONNECTION_ERROR_TEXT: &str = "Sorry, a connection error occurred.";

#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("live assistant not configured")]
    NotConfigured,
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("session is not connected")]
    NotConnected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveEvent {
    InputTranscript(String),
    OutputTranscript(String),
    /// 24 kHz mono PCM16.
    Audio(Vec<i16>),
    /// Barge-in: drop whatever is still queued for playback.
    Interrupted,
    TurnComplete,
}

#[async_trait]
pub trait VoiceTransport: Send {
    async fn connect(&mut self, system_instruction: &str) -> Result<(), VoiceError>;
    /// 16 kHz mono PCM16.
    async fn send_audio(&mut self, pcm: &[i16]) -> Result<(), VoiceError>;
    /// `Ok(None)` once the remote side has gone away.
    async fn next_event(&mut self) -> Result<Option<LiveEvent>, VoiceError>;
    async fn close(&mut self) -> Result<(), VoiceError>;
}

pub trait AudioOutput: Send {
    fn play(&mut self, pcm: Vec<i16>);
    fn stop_all(&mut self);
}

/// Output sink that queues chunks for whoever drives the speaker.
#[derive(Debug, Default)]
pub struct PlaybackQueue {
    pending: VecDeque<Vec<i16>>,
}

impl PlaybackQueue {
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn next_chunk(&mut self) -> Option<Vec<i16>> {
        self.pending.pop_front()
    }
}

impl AudioOutput for PlaybackQueue {
    fn play(&mut self, pcm: Vec<i16>) {
        self.pending.push_back(pcm);
    }

    fn stop_all(&mut self) {
        self.pending.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Connecting,
    Connected,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptMessage {
    pub sender: Speaker,
    pub text: String,
}

pub fn system_instruction(user_name: &str) -> String {
    format!(
        "You are a friendly and helpful AI support agent for the university's student complaints \
         management system. Assist students and administrators. Be concise, empathetic and professional. \
         Greet the user and ask how you can help. The user's name is {user_name}."
    )
}

/// Float samples in [-1, 1] to PCM16.
pub fn to_pcm16(samples: &[f32]) -> Vec<i16> {
    samples.iter().map(|v| (v * 32768.0).clamp(-32768.0, 32767.0) as i16).collect()
}

#[derive(Default)]
struct Turn {
    text: String,
    message: Option<usize>,
}

pub struct LiveSession<T: VoiceTransport, A: AudioOutput> {
    transport: T,
    output: A,
    status: SessionStatus,
    messages: Vec<TranscriptMessage>,
    input: Turn,
    reply: Turn,
}

impl<T: VoiceTransport, A: AudioOutput> LiveSession<T, A> {
    pub fn new(transport: T, output: A) -> Self {
        Self {
            transport,
            output,
            status: SessionStatus::Idle,
            messages: Vec::new(),
            input: Turn::default(),
            reply: Turn::default(),
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn messages(&self) -> &[TranscriptMessage] {
        &self.messages
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn output_mut(&mut self) -> &mut A {
        &mut self.output
    }

    pub async fn start(&mut self, user_name: &str) -> Result<(), VoiceError> {
        if matches!(self.status, SessionStatus::Connecting | SessionStatus::Connected) {
            return Ok(());
        }
        self.status = SessionStatus::Connecting;
        self.messages = vec![TranscriptMessage { sender: Speaker::Model, text: CONNECTING_TEXT.into() }];
        match self.transport.connect(&system_instruction(user_name)).await {
            Ok(()) => {
                info!("live session connected");
                self.status = SessionStatus::Connected;
                self.messages[0].text = CONNECTED_TEXT.into();
                Ok(())
            }
            Err(e) => {
                warn!("live session failed to connect: {e}");
                self.fail().await;
                Err(e)
            }
        }
    }

    pub async fn send_microphone(&mut self, samples: &[f32]) -> Result<(), VoiceError> {
        if self.status != SessionStatus::Connected {
            return Err(VoiceError::NotConnected);
        }
        self.transport.send_audio(&to_pcm16(samples)).await
    }

    /// Handle the next server event. Returns false once the session is over.
    pub async fn pump(&mut self) -> bool {
        if self.status != SessionStatus::Connected {
            return false;
        }
        match self.transport.next_event().await {
            Ok(Some(event)) => {
                self.handle(event);
                true
            }
            Ok(None) => {
                debug!("live session closed by remote");
                self.close().await;
                false
            }
            Err(e) => {
                warn!("live session error: {e}");
                self.fail().await;
                false
            }
        }
    }

    fn handle(&mut self, event: LiveEvent) {
        match event {
            LiveEvent::InputTranscript(t) => append(&mut self.messages, &mut self.input, Speaker::User, &t),
            LiveEvent::OutputTranscript(t) => append(&mut self.messages, &mut self.reply, Speaker::Model, &t),
            LiveEvent::Audio(pcm) => self.output.play(pcm),
            LiveEvent::Interrupted => self.output.stop_all(),
            LiveEvent::TurnComplete => {
                self.input = Turn::default();
                self.reply = Turn::default();
            }
        }
    }

    async fn fail(&mut self) {
        self.messages.push(TranscriptMessage { sender: Speaker::Model, text: CONNECTION_ERROR_TEXT.into() });
        self.close().await;
        self.status = SessionStatus::Error;
    }

    /// Close the transport and stop all pending playback before returning.
    pub async fn close(&mut self) {
        if let Err(e) = self.transport.close().await {
            warn!("error closing live session: {e}");
        }
        self.output.stop_all();
        self.input = Turn::default();
        self.reply = Turn::default();
        self.status = SessionStatus::Idle;
    }
}

// Accumulate into the current turn's message, creating it on first text.
fn append(messages: &mut Vec<TranscriptMessage>, turn: &mut Turn, sender: Speaker, text: &str) {
    turn.text.push_str(text);
    match turn.message {
        Some(i) => messages[i].text = turn.text.clone(),
        None => {
            messages.push(TranscriptMessage { sender, text: turn.text.clone() });
            turn.message = Some(messages.len() - 1);
        }
    }
}

// ---------------- Gemini Live wire format ----------------
pub fn setup_message(model: &str, system_instruction: &str) -> Value {
    json!({
        "setup": {
            "model": format!("models/{model}"),
            "generationConfig": { "responseModalities": ["AUDIO"] },
            "systemInstruction": { "parts": [{ "text": system_instruction }] },
            "inputAudioTranscription": {},
            "outputAudioTranscription": {}
        }
    })
}

pub fn audio_message(pcm: &[i16]) -> Value {
    let bytes: Vec<u8> = pcm.iter().flat_map(|s| s.to_le_bytes()).collect();
    json!({
        "realtimeInput": {
            "mediaChunks": [{ "mimeType": INPUT_MIME, "data": STANDARD.encode(bytes) }]
        }
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerMessage {
    setup_complete: Option<Value>,
    server_content: Option<ServerContent>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerContent {
    model_turn: Option<ModelTurn>,
    input_transcription: Option<Transcription>,
    output_transcription: Option<Transcription>,
    #[serde(default)]
    interrupted: bool,
    #[serde(default)]
    turn_complete: bool,
}

#[derive(Deserialize)]
struct ModelTurn {
    #[serde(default)]
    parts: Vec<TurnPart>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TurnPart {
    inline_data: Option<InlineData>,
}

#[derive(Deserialize)]
struct InlineData {
    data: String,
}

#[derive(Deserialize)]
struct Transcription {
    #[serde(default)]
    text: String,
}

fn decode_pcm(b64: &str) -> Result<Vec<i16>, VoiceError> {
    let bytes = STANDARD.decode(b64).map_err(|e| VoiceError::Protocol(e.to_string()))?;
    Ok(bytes.chunks_exact(2).map(|c| i16::from_le_bytes([c[0], c[1]])).collect())
}

fn is_setup_complete(raw: &str) -> bool {
    serde_json::from_str::<ServerMessage>(raw).is_ok_and(|m| m.setup_complete.is_some())
}

/// Translate one server frame into session events, in handling order.
pub fn parse_server_message(raw: &str) -> Result<Vec<LiveEvent>, VoiceError> {
    let msg: ServerMessage = serde_json::from_str(raw).map_err(|e| VoiceError::Protocol(e.to_string()))?;
    let Some(content) = msg.server_content else { return Ok(Vec::new()) };
    let mut events = Vec::new();
    if let Some(t) = content.input_transcription.filter(|t| !t.text.is_empty()) {
        events.push(LiveEvent::InputTranscript(t.text));
    }
    if let Some(t) = content.output_transcription.filter(|t| !t.text.is_empty()) {
        events.push(LiveEvent::OutputTranscript(t.text));
    }
    for part in content.model_turn.map(|t| t.parts).unwrap_or_default() {
        if let Some(inline) = part.inline_data {
            events.push(LiveEvent::Audio(decode_pcm(&inline.data)?));
        }
    }
    if content.interrupted {
        events.push(LiveEvent::Interrupted);
    }
    if content.turn_complete {
        events.push(LiveEvent::TurnComplete);
    }
    Ok(events)
}

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

fn frame_text(msg: Message) -> Option<String> {
    match msg {
        Message::Text(t) => Some(t.as_str().to_owned()),
        Message::Binary(b) => String::from_utf8(b.to_vec()).ok(),
        _ => None,
    }
}

pub struct GeminiLiveTransport {
    url: String,
    model: String,
    socket: Option<Socket>,
    backlog: VecDeque<LiveEvent>,
}

impl GeminiLiveTransport {
    pub fn new(endpoint: &str, model: impl Into<String>, api_key: &str) -> Self {
        let ws = endpoint.trim_end_matches('/').replace("https://", "wss://").replace("http://", "ws://");
        Self {
            url: format!("{ws}/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent?key={}", urlencoding::encode(api_key)),
            model: model.into(),
            socket: None,
            backlog: VecDeque::new(),
        }
    }

    pub fn from_config(cfg: &AppConfig) -> Result<Self, VoiceError> {
        let key = cfg.gemini_api_key.as_deref().ok_or(VoiceError::NotConfigured)?;
        Ok(Self::new(&cfg.gemini_endpoint, cfg.gemini_live_model.clone(), key))
    }

    fn socket(&mut self) -> Result<&mut Socket, VoiceError> {
        self.socket.as_mut().ok_or(VoiceError::NotConnected)
    }
}

#[async_trait]
impl VoiceTransport for GeminiLiveTransport {
    async fn connect(&mut self, system_instruction: &str) -> Result<(), VoiceError> {
        let (mut socket, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| VoiceError::Connection(e.to_string()))?;
        let setup = setup_message(&self.model, system_instruction).to_string();
        socket
            .send(Message::Text(setup.into()))
            .await
            .map_err(|e| VoiceError::Connection(e.to_string()))?;
        loop {
            match socket.next().await {
                Some(Ok(msg)) => {
                    if frame_text(msg).is_some_and(|raw| is_setup_complete(&raw)) {
                        break;
                    }
                }
                Some(Err(e)) => return Err(VoiceError::Connection(e.to_string())),
                None => return Err(VoiceError::Connection("closed during setup".into())),
            }
        }
        self.socket = Some(socket);
        Ok(())
    }

    async fn send_audio(&mut self, pcm: &[i16]) -> Result<(), VoiceError> {
        let frame = audio_message(pcm).to_string();
        self.socket()?
            .send(Message::Text(frame.into()))
            .await
            .map_err(|e| VoiceError::Connection(e.to_string()))
    }

    async fn next_event(&mut self) -> Result<Option<LiveEvent>, VoiceError> {
        loop {
            if let Some(event) = self.backlog.pop_front() {
                return Ok(Some(event));
            }
            match self.socket()?.next().await {
                None | Some(Ok(Message::Close(_))) => {
                    self.socket = None;
                    return Ok(None);
                }
                Some(Ok(msg)) => {
                    if let Some(raw) = frame_text(msg) {
                        self.backlog.extend(parse_server_message(&raw)?);
                    }
                }
                Some(Err(e)) => return Err(VoiceError::Connection(e.to_string())),
            }
        }
    }

    async fn close(&mut self) -> Result<(), VoiceError> {
        self.backlog.clear();
        if let Some(mut socket) = self.socket.take() {
            socket.close(None).await.map_err(|e| VoiceError::Connection(e.to_string()))?;
        }
        Ok(())
    }
}

// ---------------- Scripted transport (tests, offline runs) ----------------
#[derive(Debug, Default)]
pub struct StubTransport {
    script: VecDeque<LiveEvent>,
    refuse_connect: bool,
    connected: bool,
    pub sent: Vec<Vec<i16>>,
    pub closed: bool,
}

impl StubTransport {
    pub fn scripted(events: impl IntoIterator<Item = LiveEvent>) -> Self {
        Self { script: events.into_iter().collect(), ..Self::default() }
    }

    pub fn refusing() -> Self {
        Self { refuse_connect: true, ..Self::default() }
    }
}

#[async_trait]
impl VoiceTransport for StubTransport {
    async fn connect(&mut self, _system_instruction: &str) -> Result<(), VoiceError> {
        if self.refuse_connect {
            return Err(VoiceError::Connection("refused".into()));
        }
        self.connected = true;
        Ok(())
    }

    async fn send_audio(&mut self, pcm: &[i16]) -> Result<(), VoiceError> {
        if !self.connected {
            return Err(VoiceError::NotConnected);
        }
        self.sent.push(pcm.to_vec());
        Ok(())
    }

    async fn next_event(&mut self) -> Result<Option<LiveEvent>, VoiceError> {
        Ok(self.script.pop_front())
    }

    async fn close(&mut self) -> Result<(), VoiceError> {
        self.connected = false;
        self.closed = true;
        Ok(())
    }
}
