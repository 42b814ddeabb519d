//! Line-oriented chat console.
//!
//! Plain lines are sent as text to the open channel; lines starting with `/`
//! are commands. Snapshots from the open channel are printed as they arrive,
//! showing only messages not printed before.

use std::{io::Write, path::PathBuf};

use anyhow::Result;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
};

use crate::{
    domain::{channel::ChannelId, open_channel_state::OpenChannelState, session::SessionContext},
    ui::{render_channel, MessageRenderer},
    usecases::{
        channels::{create_channel, search_channels},
        chat_session::{
            ChannelUpdate, ChannelView, ChatSession, ComposeOutcome, ComposeRequest,
            NotificationOutcome,
        },
        context::AppContext,
        contracts::{ChannelRegistry, Clock, SnapshotEvent},
    },
};

const CONSOLE_STARTED: &str = "CONSOLE_STARTED";
const CONSOLE_STOPPED: &str = "CONSOLE_STOPPED";

const HELP_LINES: [&str; 7] = [
    "type a message and press Enter to send it",
    "/image PATH [caption]  send an image with an optional caption",
    "/new NAME              create a channel",
    "/list [PREFIX]         list channels, optionally by name prefix",
    "/open ID               switch to another channel",
    "/help                  show this help",
    "/quit                  leave the console",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleInput {
    Empty,
    Text(String),
    Image {
        path: PathBuf,
        caption: Option<String>,
    },
    NewChannel(String),
    List(Option<String>),
    Open(String),
    Help,
    Quit,
    /// A `/command` that needs an argument it did not get, or is not known.
    Invalid(String),
}

pub fn parse_input(line: &str) -> ConsoleInput {
    let line = line.trim();
    if line.is_empty() {
        return ConsoleInput::Empty;
    }

    let Some(command_line) = line.strip_prefix('/') else {
        return ConsoleInput::Text(line.to_owned());
    };

    let (command, rest) = match command_line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (command_line, ""),
    };
    let argument = (!rest.is_empty()).then(|| rest.to_owned());

    match (command, argument) {
        ("image", Some(rest)) => {
            let (path, caption) = match rest.split_once(char::is_whitespace) {
                Some((path, caption)) => (path, Some(caption.trim().to_owned())),
                None => (rest.as_str(), None),
            };
            ConsoleInput::Image {
                path: PathBuf::from(path),
                caption,
            }
        }
        ("new", Some(name)) => ConsoleInput::NewChannel(name),
        ("list", prefix) => ConsoleInput::List(prefix),
        ("open", Some(id)) => ConsoleInput::Open(id),
        ("help", _) => ConsoleInput::Help,
        ("quit" | "exit", _) => ConsoleInput::Quit,
        _ => ConsoleInput::Invalid(line.to_owned()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Console<'a, W: Write> {
    chat: &'a ChatSession,
    channels: &'a dyn ChannelRegistry,
    clock: &'a dyn Clock,
    session: SessionContext,
    updates: mpsc::UnboundedSender<ChannelUpdate>,
    view: Option<ChannelView>,
    state: OpenChannelState,
    renderer: MessageRenderer,
    out: W,
}

impl<'a, W: Write> Console<'a, W> {
    pub fn new(
        chat: &'a ChatSession,
        channels: &'a dyn ChannelRegistry,
        clock: &'a dyn Clock,
        session: SessionContext,
        updates: mpsc::UnboundedSender<ChannelUpdate>,
        out: W,
    ) -> Self {
        Self {
            chat,
            channels,
            clock,
            session,
            updates,
            view: None,
            state: OpenChannelState::default(),
            renderer: MessageRenderer::default(),
            out,
        }
    }

    /// Switches the console to `channel_id`, releasing the previous view.
    pub async fn open(&mut self, channel_id: ChannelId) -> Result<()> {
        self.close();
        self.state.set_loading(channel_id.clone());
        self.renderer.reset();

        match self
            .chat
            .open_channel(&self.session, &channel_id, self.updates.clone())
            .await
        {
            Ok(view) => {
                writeln!(self.out, "opened channel {channel_id}")?;
                self.view = Some(view);
            }
            Err(error) => {
                self.state.set_closed();
                writeln!(self.out, "could not open channel {channel_id}: {error}")?;
            }
        }

        Ok(())
    }

    pub fn close(&mut self) {
        if let Some(view) = self.view.take() {
            view.close();
        }
        self.state.set_closed();
    }

    pub async fn handle_input(&mut self, input: ConsoleInput) -> Result<Flow> {
        match input {
            ConsoleInput::Empty => {}
            ConsoleInput::Text(text) => {
                self.send(|channel_id| ComposeRequest::text(channel_id, text))
                    .await?;
            }
            ConsoleInput::Image { path, caption } => {
                self.send(|channel_id| ComposeRequest {
                    channel_id,
                    text: caption,
                    image: Some(path),
                })
                .await?;
            }
            ConsoleInput::NewChannel(name) => {
                match create_channel(self.channels, self.clock, &name).await {
                    Ok(channel) => writeln!(self.out, "created {}", render_channel(&channel))?,
                    Err(error) => writeln!(self.out, "could not create channel: {error}")?,
                }
            }
            ConsoleInput::List(prefix) => {
                let channels = search_channels(self.channels, prefix.as_deref());
                if channels.is_empty() {
                    writeln!(self.out, "no channels")?;
                }
                for channel in &channels {
                    writeln!(self.out, "{}", render_channel(channel))?;
                }
            }
            ConsoleInput::Open(raw) => match ChannelId::parse(&raw) {
                Ok(channel_id) => self.open(channel_id).await?,
                Err(error) => writeln!(self.out, "invalid channel id: {error}")?,
            },
            ConsoleInput::Help => {
                for line in HELP_LINES {
                    writeln!(self.out, "{line}")?;
                }
            }
            ConsoleInput::Quit => return Ok(Flow::Quit),
            ConsoleInput::Invalid(line) => {
                writeln!(self.out, "unrecognized command: {line} (try /help)")?;
            }
        }

        Ok(Flow::Continue)
    }

    pub fn handle_update(&mut self, update: ChannelUpdate) -> Result<()> {
        if !self.state.is_showing(&update.channel_id) {
            return Ok(());
        }

        match update.event {
            SnapshotEvent::Snapshot(messages) => {
                for message in self.state.apply_snapshot(messages) {
                    for line in self.renderer.render(&message) {
                        writeln!(self.out, "{line}")?;
                    }
                }
            }
            SnapshotEvent::Terminated(error) => {
                self.view = None;
                self.state.set_closed();
                writeln!(self.out, "channel {} closed: {error}", update.channel_id)?;
            }
        }

        Ok(())
    }

    async fn send(&mut self, request: impl FnOnce(ChannelId) -> ComposeRequest) -> Result<()> {
        let Some(channel_id) = self.view.as_ref().map(|view| view.channel_id().clone()) else {
            writeln!(self.out, "no channel open; use /open ID first")?;
            return Ok(());
        };

        match self.chat.compose(&self.session, request(channel_id)).await {
            Ok(ComposeOutcome::Skipped) => {}
            Ok(ComposeOutcome::Sent { notification, .. }) => {
                if notification != NotificationOutcome::Delivered {
                    writeln!(self.out, "(sent; members were not notified)")?;
                }
            }
            Err(error) => writeln!(self.out, "send failed: {error}")?,
        }

        Ok(())
    }
}

/// Runs the interactive console on stdin/stdout until `/quit` or end of input.
pub async fn run(context: &AppContext, session: SessionContext, channel_id: ChannelId) -> Result<()> {
    let (updates, mut rx) = mpsc::unbounded_channel();
    let mut console = Console::new(
        &context.chat,
        context.channels.as_ref(),
        context.clock.as_ref(),
        session,
        updates,
        std::io::stdout(),
    );

    tracing::info!(code = CONSOLE_STARTED, channel_id = %channel_id, "console started");
    console.open(channel_id).await?;
    writeln!(console.out, "type /help for commands")?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                if console.handle_input(parse_input(&line)).await? == Flow::Quit {
                    break;
                }
            }
            Some(update) = rx.recv() => console.handle_update(update)?,
        }
    }

    console.close();
    tracing::info!(code = CONSOLE_STOPPED, "console stopped");
    Ok(())
}
