//! Console transport — a text stand-in for the realtime voice session.
//!
//! Each line typed on stdin is one completed user turn, blank lines included. The turn hook runs
//! before the reply is generated, and the next line is only read once the
//! reply has been printed. Replies come from a text [`Provider`] given the
//! whole turn context, including the hook's notes.
//!
//! Used for `ragcall run` and for exercising the pipeline without audio.

use std::sync::Arc;
use async_trait::async_trait;
use ragcall_core::error::TransportError;
use ragcall_core::message::{Conversation, Message};
use ragcall_core::provider::{Provider, ProviderRequest};
use ragcall_core::transport::{RealtimeModelConfig, RealtimeTransport, TurnHook};
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub type Input = Box<dyn AsyncBufRead + Unpin + Send>;
pub type Output = Box<dyn AsyncWrite + Unpin + Send>;

/// Lines that end the session.
const EXIT_WORDS: [&str; 5] = ["exit", "quit", "/exit", "/quit", ":q"];

struct Session {
    model: RealtimeModelConfig,
    hook: Arc<dyn TurnHook>,
    conversation: Conversation,
    connected: bool,
}

pub struct ConsoleTransport {
    provider: Arc<dyn Provider>,
    reply_model: String,
    max_tokens: Option<u32>,
    input: Mutex<Input>,
    output: Mutex<Output>,
    session: Mutex<Option<Session>>,
}

impl ConsoleTransport {
    /// A console session on stdin/stdout.
    pub fn new(provider: Arc<dyn Provider>, reply_model: impl Into<String>) -> Self {
        Self::with_io(
            provider,
            reply_model,
            Box::new(BufReader::new(io::stdin())),
            Box::new(io::stdout()),
        )
    }

    /// A console session on arbitrary streams.
    pub fn with_io(
        provider: Arc<dyn Provider>,
        reply_model: impl Into<String>,
        input: Input,
        output: Output,
    ) -> Self {
        Self {
            provider,
            reply_model: reply_model.into(),
            max_tokens: None,
            input: Mutex::new(input),
            output: Mutex::new(output),
            session: Mutex::new(None),
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Snapshot of the turn context so far.
    pub async fn conversation(&self) -> Option<Conversation> {
        self.session.lock().await.as_ref().map(|s| s.conversation.clone())
    }

    async fn print(&self, line: &str) -> Result<(), TransportError> {
        let mut out = self.output.lock().await;
        let written = async {
            out.write_all(line.as_bytes()).await?;
            out.write_all(b"\n").await?;
            out.flush().await
        }
        .await;
        written.map_err(|e| TransportError::Closed(e.to_string()))
    }

    /// Ask the provider for the agent's next reply and record it.
    ///
    /// `instructions` apply to this reply only and are not kept in the context.
    async fn reply(&self, session: &mut Session, instructions: Option<&str>) -> Result<String, TransportError> {
        let mut messages = session.conversation.messages().to_vec();
        if let Some(instructions) = instructions {
            messages.push(Message::system(instructions));
        }

        let mut request = ProviderRequest::new(self.reply_model.clone(), messages);
        request.temperature = session.model.temperature;
        request.max_tokens = self.max_tokens;

        let response = self
            .provider
            .complete(request)
            .await
            .map_err(|e| TransportError::ReplyFailed(e.to_string()))?;

        let text = response.message.content.trim().to_string();
        session.conversation.push(Message::assistant(text.clone()));
        Ok(text)
    }

    async fn read_line(&self) -> Result<Option<String>, TransportError> {
        let mut input = self.input.lock().await;
        let mut line = String::new();
        let n = input
            .read_line(&mut line)
            .await
            .map_err(|e| TransportError::Closed(e.to_string()))?;
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}

#[async_trait]
impl RealtimeTransport for ConsoleTransport {
    fn name(&self) -> &str {
        "console"
    }

    async fn start(&self, model: RealtimeModelConfig, hook: Arc<dyn TurnHook>) -> Result<(), TransportError> {
        let mut session = self.session.lock().await;
        if session.is_some() {
            return Err(TransportError::AlreadyStarted);
        }

        debug!(model = %model.model, voice = %model.voice, "Console session started");
        *session = Some(Session {
            conversation: Conversation::with_system_prompt(model.instructions.clone()),
            model,
            hook,
            connected: false,
        });
        Ok(())
    }

    async fn connect(&self) -> Result<(), TransportError> {
        {
            let mut guard = self.session.lock().await;
            let session = guard.as_mut().ok_or(TransportError::NotStarted)?;
            session.connected = true;
        }
        self.print("Connected. Type a line per turn; 'exit' ends the call.").await
    }

    async fn generate_reply(&self, instructions: &str) -> Result<(), TransportError> {
        let mut guard = self.session.lock().await;
        let session = guard.as_mut().ok_or(TransportError::NotStarted)?;
        if !session.connected {
            return Err(TransportError::NotStarted);
        }

        let text = self.reply(session, Some(instructions)).await?;
        drop(guard);
        self.print(&format!("agent> {text}")).await
    }

    async fn closed(&self) -> Result<(), TransportError> {
        loop {
            let Some(line) = self.read_line().await? else {
                break; // EOF (Ctrl+D)
            };
            // A silent turn still reaches the hook
            if EXIT_WORDS.contains(&line.as_str()) {
                break;
            }

            let mut guard = self.session.lock().await;
            let session = guard.as_mut().ok_or(TransportError::NotStarted)?;

            let message = Message::user(line);
            session.conversation.push(message.clone());
            let hook = session.hook.clone();
            hook.on_user_turn_completed(&mut session.conversation, &message).await;

            let reply = self.reply(session, None).await;
            drop(guard);

            match reply {
                Ok(text) => self.print(&format!("agent> {text}")).await?,
                Err(e) => {
                    warn!(error = %e, "Reply generation failed");
                    self.print("agent> (no reply, see logs)").await?;
                }
            }
        }

        debug!("Console session closed");
        Ok(())
    }
}
