//! Terminal session loop: reads commands from stdin, drives the
//! [`ChatClient`] and renders its page updates to stdout.

use crate::{
    commands::{Command, HELP_TEXT},
    config::Config,
    terminal::render_updates,
};
use aidwin_core::{AudioPlayer, AudioRecorder, ChatBackend, ChatClient, HttpChatBackend};
use anyhow::Context;
use std::{future::Future, pin::Pin, sync::Arc, time::Duration};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
    time::{Instant, Interval, interval_at},
};
use tracing::{debug, info};

/// Outcome of handling one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

enum Event {
    Line(Option<String>),
    Probe,
    Shutdown,
}

/// Applies a single command to the client.
pub async fn handle_command(client: &mut ChatClient, command: Command) -> Flow {
    match command {
        Command::Send(text) => {
            client.set_input(&text);
            if client.page().send_enabled {
                client.submit().await;
            }
        }
        Command::ToggleRecording => client.toggle_recording().await,
        Command::PlayAudio => client.play_latest_audio(),
        Command::CheckConnectivity => client.report_connectivity().await,
        Command::Help => println!("{}", HELP_TEXT),
        Command::Quit => return Flow::Exit,
    }
    Flow::Continue
}

/// Runs `work` unless `shutdown` completes first.
async fn unless_interrupted<W, S>(work: W, shutdown: &mut Pin<&mut S>) -> Flow
where
    W: Future<Output = Flow>,
    S: Future,
{
    tokio::select! {
        flow = work => flow,
        _ = shutdown.as_mut() => {
            info!("Received shutdown signal.");
            Flow::Exit
        }
    }
}

async fn next_probe(probe: &mut Option<Interval>) {
    match probe {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

fn probe_timer(period: Option<Duration>) -> Option<Interval> {
    period.map(|period| interval_at(Instant::now() + period, period))
}

/// Runs the interactive chat until stdin closes, `/quit` or Ctrl+C.
pub async fn run(
    config: Config,
    recorder: Box<dyn AudioRecorder>,
    player: Box<dyn AudioPlayer>,
) -> anyhow::Result<()> {
    let backend: Arc<dyn ChatBackend> = Arc::new(
        HttpChatBackend::new(config.endpoints.clone()).with_probe_timeout(config.probe_timeout),
    );
    let (tx, rx) = mpsc::unbounded_channel();
    let renderer = tokio::spawn(render_updates(rx, std::io::stdout()));

    let mut client = ChatClient::new(backend, recorder)
        .with_player(player)
        .with_updates(tx);
    let mut shutdown = std::pin::pin!(tokio::signal::ctrl_c());

    let mut flow = unless_interrupted(
        async {
            client.initialize().await;
            Flow::Continue
        },
        &mut shutdown,
    )
    .await;
    info!(session_id = %client.session_id(), "Chat session ready");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut probe = probe_timer(config.probe_interval);

    while flow == Flow::Continue {
        let event = tokio::select! {
            line = lines.next_line() => Event::Line(line.context("Failed to read from stdin")?),
            _ = next_probe(&mut probe) => Event::Probe,
            _ = shutdown.as_mut() => Event::Shutdown,
        };
        flow = match event {
            Event::Line(Some(line)) => {
                let command = Command::parse(&line);
                unless_interrupted(handle_command(&mut client, command), &mut shutdown).await
            }
            Event::Line(None) => {
                debug!("stdin closed");
                Flow::Exit
            }
            Event::Probe => {
                let check = async {
                    client.check_connectivity().await;
                    Flow::Continue
                };
                unless_interrupted(check, &mut shutdown).await
            }
            Event::Shutdown => {
                info!("Received shutdown signal.");
                Flow::Exit
            }
        };
    }

    // Dropping the client closes the update channel so the renderer drains and exits.
    drop(client);
    renderer
        .await
        .context("Renderer task panicked")?
        .context("Failed to write to terminal")?;
    info!("Chat session ended.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use aidwin_core::{
        ChatError, Connectivity, ExchangeState, RecordedAudio,
        backend::ChatEndpoints,
        protocol::{AudioRequest, ChatRequest, ChatResponse},
    };
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingBackend {
        texts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ChatBackend for RecordingBackend {
        async fn send_text(&self, request: &ChatRequest) -> Result<ChatResponse, ChatError> {
            self.texts.lock().unwrap().push(request.user_message.clone());
            Ok(ChatResponse {
                response: Some("<p>ok</p>".to_string()),
                progress: None,
            })
        }

        async fn send_audio(&self, _request: &AudioRequest) -> Result<ChatResponse, ChatError> {
            Err(ChatError::Server(500))
        }

        async fn probe(&self) -> Result<(), ChatError> {
            Err(ChatError::Network("unreachable".to_string()))
        }
    }

    struct NoMic;

    impl AudioRecorder for NoMic {
        fn start(&mut self) -> Result<(), ChatError> {
            Err(ChatError::DeviceAccessDenied("none".to_string()))
        }
        fn stop(&mut self) -> Result<RecordedAudio, ChatError> {
            Err(ChatError::Recording("none".to_string()))
        }
    }

    fn client_with(backend: Arc<RecordingBackend>) -> ChatClient {
        ChatClient::new(backend, Box::new(NoMic))
    }

    /// Accepts connections and never writes a byte back.
    async fn spawn_silent_server() -> ChatEndpoints {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        ChatEndpoints {
            chat: format!("http://{}/api/chat", addr).parse().unwrap(),
            audio: format!("http://{}/api/audio", addr).parse().unwrap(),
        }
    }

    fn silent_client(endpoints: ChatEndpoints) -> ChatClient {
        let backend =
            HttpChatBackend::new(endpoints).with_probe_timeout(Duration::from_millis(200));
        ChatClient::new(Arc::new(backend), Box::new(NoMic))
    }

    #[tokio::test]
    async fn test_send_command_posts_trimmed_text() {
        let backend = Arc::new(RecordingBackend::default());
        let mut client = client_with(backend.clone());

        let flow = handle_command(&mut client, Command::parse("  hi there  ")).await;

        assert_eq!(flow, Flow::Continue);
        assert_eq!(*backend.texts.lock().unwrap(), vec!["hi there".to_string()]);
        assert_eq!(client.exchange_state(), ExchangeState::Resolved);
        assert!(client.page().input.is_empty());
    }

    #[tokio::test]
    async fn test_blank_line_sends_nothing() {
        let backend = Arc::new(RecordingBackend::default());
        let mut client = client_with(backend.clone());

        handle_command(&mut client, Command::parse("   ")).await;

        assert!(backend.texts.lock().unwrap().is_empty());
        assert!(client.page().conversation.is_empty());
    }

    #[tokio::test]
    async fn test_status_and_quit_commands() {
        let backend = Arc::new(RecordingBackend::default());
        let mut client = client_with(backend);

        let flow = handle_command(&mut client, Command::CheckConnectivity).await;
        assert_eq!(flow, Flow::Continue);
        assert_eq!(client.page().connectivity, Connectivity::Offline);

        assert_eq!(handle_command(&mut client, Command::Quit).await, Flow::Exit);
    }

    #[tokio::test]
    async fn test_mic_command_without_device_shows_notice() {
        let backend = Arc::new(RecordingBackend::default());
        let mut client = client_with(backend);

        handle_command(&mut client, Command::ToggleRecording).await;

        assert!(!client.page().recording);
        assert_eq!(client.page().conversation.len(), 1);
    }

    #[tokio::test]
    async fn test_play_command_without_clip_shows_notice() {
        let backend = Arc::new(RecordingBackend::default());
        let mut client = client_with(backend);

        let flow = handle_command(&mut client, Command::PlayAudio).await;

        assert_eq!(flow, Flow::Continue);
        let latest = client.page().conversation.latest().unwrap();
        assert_eq!(latest.author, aidwin_core::message::Author::System);
    }

    #[tokio::test]
    async fn test_initialize_completes_against_silent_endpoint() {
        let mut client = silent_client(spawn_silent_server().await);

        let finished = tokio::time::timeout(Duration::from_secs(5), client.initialize()).await;

        assert!(finished.is_ok(), "initialize should not wait on a silent endpoint");
        assert_eq!(client.page().connectivity, Connectivity::Offline);
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_hung_exchange() {
        let mut client = silent_client(spawn_silent_server().await);
        let mut shutdown = std::pin::pin!(tokio::time::sleep(Duration::from_millis(100)));

        let flow = tokio::time::timeout(
            Duration::from_secs(5),
            unless_interrupted(
                handle_command(&mut client, Command::parse("anyone there?")),
                &mut shutdown,
            ),
        )
        .await
        .expect("shutdown should cut the exchange short");

        assert_eq!(flow, Flow::Exit);
        assert_eq!(client.exchange_state(), ExchangeState::AwaitingResponse);
    }

    #[tokio::test]
    async fn test_finished_work_wins_over_pending_shutdown() {
        let mut shutdown = std::pin::pin!(std::future::pending::<()>());
        let flow = unless_interrupted(async { Flow::Continue }, &mut shutdown).await;
        assert_eq!(flow, Flow::Continue);
    }

    #[tokio::test]
    async fn test_probe_timer_waits_one_period() {
        let mut probe = probe_timer(Some(Duration::from_millis(20)));
        let started = Instant::now();
        next_probe(&mut probe).await;
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_disabled_probe_never_fires() {
        let mut probe = probe_timer(None);
        assert!(probe.is_none());
        let fired = tokio::time::timeout(Duration::from_millis(20), next_probe(&mut probe)).await;
        assert!(fired.is_err());
    }
}
