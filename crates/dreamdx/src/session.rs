//! Client-side state of an interactive dream.

use derive_getters::Getters;
use dreamdx_core::{Command, NarrativeDocument};
use dreamdx_error::{GatewayError, GatewayErrorKind};
use dreamdx_gateway::GatewayClient;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, instrument};

/// The dream the person at the terminal is in, if any.
///
/// Owned by the interactive loop and passed by reference; there is no
/// process-wide "current dream".
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct DreamSession {
    /// Dreamer
    user_id: String,
    /// Active dream name
    session_id: Option<String>,
    /// Actions sent in the active dream
    turns: usize,
}

impl DreamSession {
    /// A dreamer who is awake.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            session_id: None,
            turns: 0,
        }
    }

    /// Enter the named dream.
    pub fn begin(&mut self, session_id: impl Into<String>) {
        self.session_id = Some(session_id.into());
        self.turns = 0;
    }

    /// Count one action.
    pub fn record_turn(&mut self) {
        self.turns += 1;
    }

    /// Leave the dream.
    pub fn wake(&mut self) {
        self.session_id = None;
        self.turns = 0;
    }

    /// Whether a dream is active.
    pub fn is_dreaming(&self) -> bool {
        self.session_id.is_some()
    }
}

/// Short message for showing a gateway failure to the dreamer.
pub fn describe_gateway_error(err: &GatewayError) -> String {
    match &err.kind {
        GatewayErrorKind::ClientStatus { message, .. }
        | GatewayErrorKind::ServerStatus { message, .. } => message.clone(),
        other => other.to_string(),
    }
}

/// Drive a dream from line-oriented input until the dreamer wakes up or the
/// input ends.
///
/// The first two lines name and describe the dream; every later line is an
/// action, and the command `wake up` ends the dream.
///
/// # Errors
///
/// Returns an error only when reading input or writing output fails;
/// endpoint failures are written to `output` and the loop carries on.
#[instrument(skip_all, fields(user_id = %session.user_id()))]
pub async fn run_dream_loop<R, W>(
    client: &GatewayClient,
    session: &mut DreamSession,
    input: R,
    output: &mut W,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();

    while !session.is_dreaming() {
        let Some(name) = prompt(&mut lines, output, "Dream name: ").await? else {
            return Ok(());
        };
        let Some(seed) = prompt(&mut lines, output, "Describe your dream: ").await? else {
            return Ok(());
        };

        match client.start_narrative(session.user_id(), &name, &seed).await {
            Ok(dream) => {
                session.begin(name);
                writeln!(output, "{}", dream.description)?;
            }
            Err(e) => writeln!(output, "Error: {}", describe_gateway_error(&e))?,
        }
    }

    while let Some(line) = prompt(&mut lines, output, "> ").await? {
        if matches!(line.parse::<Command>(), Ok(Command::WakeUp)) {
            match client.wake_up().await {
                Ok(ack) => writeln!(output, "{}", ack.message)?,
                Err(e) => writeln!(output, "Error: {}", describe_gateway_error(&e))?,
            }
            session.wake();
            return Ok(());
        }

        let Some(session_id) = session.session_id().clone() else {
            return Ok(());
        };
        let result: Result<NarrativeDocument, GatewayError> = client
            .continue_narrative(session.user_id(), &session_id, &line)
            .await;
        match result {
            Ok(dream) => {
                session.record_turn();
                debug!(turns = session.turns(), "Dream continued");
                writeln!(output, "{}", dream.description)?;
            }
            Err(e) => writeln!(output, "Error: {}", describe_gateway_error(&e))?,
        }
    }

    Ok(())
}

/// Write `label` and read the next non-blank line, trimmed.
async fn prompt<R, W>(
    lines: &mut tokio::io::Lines<R>,
    output: &mut W,
    label: &str,
) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    loop {
        write!(output, "{}", label)?;
        output.flush()?;
        match lines.next_line().await? {
            Some(line) if line.trim().is_empty() => continue,
            Some(line) => return Ok(Some(line.trim().to_string())),
            None => return Ok(None),
        }
    }
}
