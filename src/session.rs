//! One clipping session: from the displayed message to a created note.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::{ClipperError, Result};
use crate::host::MailHost;
use crate::i18n;
use crate::model::attachment::Attachment;
use crate::model::mail::MailMessage;
use crate::model::note::{resolve_tags, CreatedNote, NoteDraft, Notebook, Tag};
use crate::note::BodyFormat;
use crate::recent::{push_recent, RecentPicksStore};
use crate::service::client::NoteClient;
use crate::service::connect::{connect_with_retry, CancelSignal, ConnectOutcome, StatusSink};
use crate::service::locator::ServiceLocator;

/// State carried from one session to the next within a process.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    /// Notebook chosen in the previous successful session.
    pub last_notebook: Option<String>,
}

/// What the user can choose from.
#[derive(Debug)]
pub struct Offer<'a> {
    pub message: &'a MailMessage,
    pub notebooks: &'a [Notebook],
    /// Deduplicated and sorted.
    pub tags: &'a [Tag],
    pub default_notebook: Option<&'a str>,
}

/// What the user chose.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub notebook_id: String,
    /// Tag titles; existing tags are matched case-insensitively.
    pub tags: Vec<String>,
    /// Indices into [`MailMessage::attachments`].
    pub attachments: Vec<usize>,
}

/// The interactive side of a session.
///
/// `choose` and `confirm` return `None`/`false` when the user backs out.
/// Both are also raced against the session's cancel signal.
#[async_trait]
pub trait SelectionUi: StatusSink + Send + Sync {
    fn preview(&self, message: &MailMessage, body: &str);

    async fn choose(&self, offer: &Offer<'_>) -> Option<Selection>;

    async fn confirm(&self, draft: &NoteDraft, attachments: &[&Attachment]) -> bool;
}

/// How a session ended when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipOutcome {
    Created(CreatedNote),
    Cancelled,
}

/// Collaborators shared by every session of a run.
pub struct Session<'a, U> {
    pub host: &'a dyn MailHost,
    pub ui: &'a U,
    pub store: &'a dyn RecentPicksStore,
    pub format: BodyFormat,
    pub retry_delay: Duration,
}

/// Run the whole export for the host's message.
///
/// Returns [`ClipOutcome::Cancelled`] when the user closes the dialog at any
/// wait point. Errors after the connection is made carry the failing step.
pub async fn clip_message<U: SelectionUi>(
    session: &Session<'_, U>,
    locator: &mut ServiceLocator,
    context: &mut SessionContext,
    cancel: &mut CancelSignal,
) -> Result<ClipOutcome> {
    let ui = session.ui;

    ui.set_status(i18n::status_downloading());
    let message = session.host.download().await?;
    let preview = session.format.render(&message, &[]);
    ui.preview(&message, &preview);

    if let ConnectOutcome::Cancelled =
        connect_with_retry(locator, cancel, ui, session.retry_delay).await
    {
        return Ok(ClipOutcome::Cancelled);
    }

    ui.set_status(i18n::status_loading_lists());
    let client = NoteClient::from_locator(locator)?;
    let notebooks = client.list_notebooks().await?;
    let tags = client.list_tags().await?;

    let recent = session.store.read().unwrap_or_else(|e| {
        warn!(error = %e, "Could not read recent notebooks");
        Vec::new()
    });
    let offer = Offer {
        message: &message,
        notebooks: &notebooks,
        tags: &tags,
        default_notebook: default_notebook(context, &recent, &notebooks),
    };

    let selection = tokio::select! {
        _ = cancel.cancelled() => None,
        chosen = ui.choose(&offer) => chosen,
    };
    let Some(selection) = selection else {
        info!("Selection closed");
        return Ok(ClipOutcome::Cancelled);
    };

    let chosen = selection
        .attachments
        .iter()
        .map(|&idx| {
            message
                .attachments
                .get(idx)
                .ok_or_else(|| ClipperError::AttachmentNotFound(format!("#{}", idx + 1)))
        })
        .collect::<Result<Vec<&Attachment>>>()?;

    let draft = NoteDraft {
        title: message.note_title(),
        body: preview,
        notebook_id: selection.notebook_id.clone(),
        tags: resolve_tags(&selection.tags, &tags),
    };

    let confirmed = tokio::select! {
        _ = cancel.cancelled() => false,
        ok = ui.confirm(&draft, &chosen) => ok,
    };
    if !confirmed {
        info!("Submission not confirmed");
        return Ok(ClipOutcome::Cancelled);
    }

    ui.set_status(i18n::status_sending());
    let note = client.create_note(&draft, &chosen, session.host).await?;

    context.last_notebook = Some(draft.notebook_id.clone());
    let picks = push_recent(&recent, &draft.notebook_id);
    if let Err(e) = session.store.write(&picks) {
        warn!(error = %e, "Could not save recent notebooks");
    } else {
        debug!(count = picks.len(), "Recent notebooks saved");
    }

    Ok(ClipOutcome::Created(note))
}

/// Last selection, else most recent pick, else the first notebook; only
/// ids still present in the tree count.
fn default_notebook<'a>(
    context: &'a SessionContext,
    recent: &'a [String],
    notebooks: &'a [Notebook],
) -> Option<&'a str> {
    context
        .last_notebook
        .iter()
        .chain(recent.iter())
        .map(String::as_str)
        .find(|id| Notebook::find(notebooks, id).is_some_and(|nb| nb.id == *id))
        .or_else(|| notebooks.first().map(|nb| nb.id.as_str()))
}
