use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::sync::mpsc;

use crate::{
    backend,
    cli::{Cli, Command},
    domain::{self, channel::ChannelId, message::Message},
    infra,
    ui::{self, render_channel, MessageRenderer},
    usecases::{
        self, bootstrap,
        channels::{create_channel, search_channels},
        chat_session::{ComposeOutcome, ComposeRequest, NotificationOutcome},
        context::AppContext,
        contracts::SnapshotEvent,
    },
};

const HISTORY_LOAD_TIMEOUT: Duration = Duration::from_secs(5);
const SEND_NOT_NOTIFIED: &str = "APP_SEND_NOT_NOTIFIED";

pub fn run(cli: Cli) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    runtime.block_on(run_command(cli))
}

async fn run_command(cli: Cli) -> Result<()> {
    let context = bootstrap::bootstrap(cli.config.as_deref())?;

    tracing::debug!(
        ui = ui::module_name(),
        domain = domain::module_name(),
        backend = backend::module_name(),
        usecases = usecases::module_name(),
        infra = infra::module_name(),
        "module boundaries loaded"
    );

    let result = dispatch(&context, cli.command_or_default()).await;
    context.store.shutdown();
    result
}

async fn dispatch(context: &AppContext, command: Command) -> Result<()> {
    match command {
        Command::Run { channel } => {
            let session = context.session()?;
            let channel_id = ChannelId::parse(&channel)?;
            ui::console::run(context, session, channel_id).await?;
        }
        Command::Send {
            channel,
            text,
            image,
        } => {
            let session = context.session()?;
            let request = ComposeRequest {
                channel_id: ChannelId::parse(&channel)?,
                text,
                image,
            };

            match context.chat.compose(&session, request).await? {
                ComposeOutcome::Skipped => bail!("nothing to send: pass --text or --image"),
                ComposeOutcome::Sent {
                    message_id,
                    notification,
                } => {
                    println!("sent {message_id}");
                    if notification != NotificationOutcome::Delivered {
                        tracing::info!(
                            code = SEND_NOT_NOTIFIED,
                            outcome = ?notification,
                            "message stored without push delivery"
                        );
                        eprintln!("note: message stored, but members were not notified");
                    }
                }
            }
        }
        Command::History { channel } => {
            let session = context.session()?;
            let channel_id = ChannelId::parse(&channel)?;
            let (updates, mut rx) = mpsc::unbounded_channel();
            let view = context
                .chat
                .open_channel(&session, &channel_id, updates)
                .await?;

            let update = tokio::time::timeout(HISTORY_LOAD_TIMEOUT, rx.recv())
                .await
                .context("timed out waiting for channel history")?;
            view.close();

            match update.map(|update| update.event) {
                Some(SnapshotEvent::Snapshot(messages)) => {
                    for line in history_lines(&messages) {
                        println!("{line}");
                    }
                }
                Some(SnapshotEvent::Terminated(error)) => return Err(error.into()),
                None => bail!("channel feed ended before history arrived"),
            }
        }
        Command::Channels { search } => {
            let channels = search_channels(context.channels.as_ref(), search.as_deref());
            if channels.is_empty() {
                println!("no channels");
            }
            for channel in &channels {
                println!("{}", render_channel(channel));
            }
        }
        Command::CreateChannel { name } => {
            let channel =
                create_channel(context.channels.as_ref(), context.clock.as_ref(), &name).await?;
            println!("created {}", render_channel(&channel));
        }
    }

    Ok(())
}

fn history_lines(messages: &[Message]) -> Vec<String> {
    if messages.is_empty() {
        return vec!["no messages".to_owned()];
    }

    let mut renderer = MessageRenderer::default();
    messages
        .iter()
        .flat_map(|message| renderer.render(message))
        .collect()
}
