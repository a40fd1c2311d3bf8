use complaint_hub::voice::*;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

fn session(events: Vec<LiveEvent>) -> LiveSession<StubTransport, PlaybackQueue> {
    LiveSession::new(StubTransport::scripted(events), PlaybackQueue::default())
}

async fn drain(s: &mut LiveSession<StubTransport, PlaybackQueue>) {
    while s.pump().await {}
}

#[tokio::test]
async fn connect_greets_and_transcripts_merge_per_turn() {
    let mut s = session(vec![
        LiveEvent::InputTranscript("My hostel ".into()),
        LiveEvent::InputTranscript("has no water".into()),
        LiveEvent::OutputTranscript("I'm sorry ".into()),
        LiveEvent::Audio(vec![1, 2, 3]),
        LiveEvent::OutputTranscript("to hear that.".into()),
        LiveEvent::TurnComplete,
        LiveEvent::InputTranscript("Thanks".into()),
    ]);
    assert_eq!(s.status(), SessionStatus::Idle);
    s.start("Ada Okoro").await.unwrap();
    assert_eq!(s.status(), SessionStatus::Connected);
    assert_eq!(s.messages()[0].text, CONNECTED_TEXT);

    for _ in 0..7 {
        assert!(s.pump().await);
    }
    let texts: Vec<_> = s.messages().iter().map(|m| (m.sender, m.text.as_str())).collect();
    assert_eq!(
        texts,
        vec![
            (Speaker::Model, CONNECTED_TEXT),
            (Speaker::User, "My hostel has no water"),
            (Speaker::Model, "I'm sorry to hear that."),
            (Speaker::User, "Thanks"),
        ]
    );
    assert_eq!(s.output_mut().pending(), 1);
    assert_eq!(s.output_mut().next_chunk(), Some(vec![1, 2, 3]));
}

#[tokio::test]
async fn interruption_drops_queued_audio() {
    let mut s = session(vec![LiveEvent::Audio(vec![1]), LiveEvent::Audio(vec![2]), LiveEvent::Interrupted]);
    s.start("Ada").await.unwrap();
    assert!(s.pump().await);
    assert!(s.pump().await);
    assert_eq!(s.output_mut().pending(), 2);
    assert!(s.pump().await);
    assert_eq!(s.output_mut().pending(), 0);
}

#[tokio::test]
async fn microphone_audio_is_sent_as_pcm16() {
    let mut s = session(vec![]);
    assert!(matches!(s.send_microphone(&[0.5]).await, Err(VoiceError::NotConnected)));
    s.start("Ada").await.unwrap();
    s.send_microphone(&[0.0, 0.5, -1.0]).await.unwrap();
    assert_eq!(s.transport().sent, vec![vec![0, 16384, -32768]]);
}

#[tokio::test]
async fn close_stops_playback_and_returns_to_idle() {
    let mut s = session(vec![LiveEvent::Audio(vec![7; 4])]);
    s.start("Ada").await.unwrap();
    assert!(s.pump().await);
    s.close().await;
    assert_eq!(s.status(), SessionStatus::Idle);
    assert_eq!(s.output_mut().pending(), 0);
    assert!(s.transport().closed);
    assert!(!s.pump().await);
}

#[tokio::test]
async fn remote_hangup_ends_the_session() {
    let mut s = session(vec![LiveEvent::OutputTranscript("Bye".into())]);
    s.start("Ada").await.unwrap();
    drain(&mut s).await;
    assert_eq!(s.status(), SessionStatus::Idle);
    assert!(s.transport().closed);
}

#[tokio::test]
async fn failed_connect_reports_error() {
    let mut s = LiveSession::new(StubTransport::refusing(), PlaybackQueue::default());
    assert!(s.start("Ada").await.is_err());
    assert_eq!(s.status(), SessionStatus::Error);
    assert_eq!(s.messages().last().unwrap().text, CONNECTION_ERROR_TEXT);
    assert_eq!(s.messages()[0].text, CONNECTING_TEXT);
}

#[test]
fn instruction_names_the_user() {
    assert!(system_instruction("Dr. Amina Bello").contains("The user's name is Dr. Amina Bello."));
}

#[tokio::test]
async fn live_transport_handshakes_and_decodes_frames() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
        let setup = ws.next().await.unwrap().unwrap();
        let setup: Value = serde_json::from_str(setup.to_text().unwrap()).unwrap();
        ws.send(Message::Text(json!({"setupComplete": {}}).to_string().into())).await.unwrap();

        let audio = ws.next().await.unwrap().unwrap();
        let audio: Value = serde_json::from_str(audio.to_text().unwrap()).unwrap();
        let reply = json!({"serverContent": {"outputTranscription": {"text": "Hello"}, "turnComplete": true}});
        ws.send(Message::Text(reply.to_string().into())).await.unwrap();
        ws.close(None).await.unwrap();
        (setup, audio)
    });

    let mut transport = GeminiLiveTransport::new(&format!("http://{addr}"), "live-test", "secret");
    transport.connect(&system_instruction("Ada Okoro")).await.unwrap();
    transport.send_audio(&[1, -1]).await.unwrap();
    assert_eq!(transport.next_event().await.unwrap(), Some(LiveEvent::OutputTranscript("Hello".into())));
    assert_eq!(transport.next_event().await.unwrap(), Some(LiveEvent::TurnComplete));
    assert_eq!(transport.next_event().await.unwrap(), None);
    transport.close().await.unwrap();

    let (setup, audio) = server.await.unwrap();
    assert_eq!(setup["setup"]["model"], "models/live-test");
    assert!(setup["setup"]["systemInstruction"]["parts"][0]["text"].as_str().unwrap().contains("Ada Okoro"));
    assert_eq!(audio["realtimeInput"]["mediaChunks"][0]["mimeType"], "audio/pcm;rate=16000");
    assert_eq!(audio["realtimeInput"]["mediaChunks"][0]["data"], "AQD//w==");
}

#[test]
#[serial_test::serial]
fn live_transport_without_key_is_not_configured() {
    std::env::remove_var("GEMINI_API_KEY");
    let cfg = complaint_hub::AppConfig::from_env().unwrap();
    assert!(matches!(GeminiLiveTransport::from_config(&cfg), Err(VoiceError::NotConfigured)));
}
