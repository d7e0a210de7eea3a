//! Terminal selection UI: a status spinner, numbered stdin prompts and a
//! final `[y/N]` confirmation.
//!
//! Any choice given on the command line skips the matching prompt; with
//! `yes` set nothing is asked at all.

use std::io::{BufRead, Write};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::i18n;
use crate::model::attachment::Attachment;
use crate::model::mail::MailMessage;
use crate::model::note::{FlatNotebook, NoteDraft, Notebook, TagRef};
use crate::service::connect::StatusSink;
use crate::session::{Offer, Selection, SelectionUi};

/// Choices taken from the command line.
#[derive(Debug, Clone, Default)]
pub struct PromptOptions {
    /// Notebook id or title.
    pub notebook: Option<String>,
    pub tags: Option<Vec<String>>,
    /// Attachment file names.
    pub attachments: Vec<String>,
    pub all_attachments: bool,
    /// Accept defaults and skip every prompt.
    pub yes: bool,
}

pub struct PromptUi {
    options: PromptOptions,
    spinner: Mutex<Option<ProgressBar>>,
    /// Answer lines; stdin is only read once the first question is asked.
    answers: tokio::sync::Mutex<Option<mpsc::Receiver<String>>>,
    notebook_label: Mutex<Option<String>>,
}

impl PromptUi {
    pub fn new(options: PromptOptions) -> Self {
        Self {
            options,
            spinner: Mutex::new(None),
            answers: tokio::sync::Mutex::new(None),
            notebook_label: Mutex::new(None),
        }
    }

    /// Prompt UI answered from `input` instead of stdin.
    pub fn with_input<R>(options: PromptOptions, input: R) -> Self
    where
        R: BufRead + Send + 'static,
    {
        Self {
            answers: tokio::sync::Mutex::new(Some(read_lines(input))),
            ..Self::new(options)
        }
    }

    /// Stop and clear the spinner line.
    pub fn clear_status(&self) {
        if let Ok(mut slot) = self.spinner.lock() {
            if let Some(pb) = slot.take() {
                pb.finish_and_clear();
            }
        }
    }

    /// Print one prompt and read the answer. `None` on end of input.
    async fn ask(&self, question: &str) -> Option<String> {
        self.clear_status();
        print!("{question}: ");
        let _ = std::io::stdout().flush();

        let mut answers = self.answers.lock().await;
        answers
            .get_or_insert_with(|| read_lines(std::io::BufReader::new(std::io::stdin())))
            .recv()
            .await
    }

    async fn choose_notebook(&self, offer: &Offer<'_>) -> Option<FlatNotebook> {
        let flat = Notebook::flatten(offer.notebooks);
        let default = offer
            .default_notebook
            .and_then(|id| flat.iter().find(|nb| nb.id == id));

        if let Some(key) = &self.options.notebook {
            let found = pick_notebook(key, &flat, offer.notebooks, None);
            if found.is_none() {
                eprintln!("{}: {key}", i18n::err_unknown_notebook());
            }
            return found;
        }
        if self.options.yes {
            return default.cloned();
        }

        self.clear_status();
        println!();
        for (i, nb) in flat.iter().enumerate() {
            let marker = if Some(nb.id.as_str()) == default.map(|d| d.id.as_str()) {
                format!("  ({})", i18n::msg_default())
            } else {
                String::new()
            };
            println!("  {:>3}  {}{marker}", i + 1, nb.label);
        }

        loop {
            let answer = self.ask(i18n::prompt_notebook()).await?;
            match pick_notebook(&answer, &flat, offer.notebooks, default) {
                Some(nb) => return Some(nb),
                None => println!("{}", i18n::prompt_invalid_choice()),
            }
        }
    }

    async fn choose_tags(&self, offer: &Offer<'_>) -> Option<Vec<String>> {
        if let Some(tags) = &self.options.tags {
            return Some(tags.clone());
        }
        if self.options.yes {
            return Some(Vec::new());
        }

        if !offer.tags.is_empty() {
            let titles: Vec<&str> = offer.tags.iter().map(|t| t.title.as_str()).collect();
            println!("\n  {}", titles.join(", "));
        }
        let answer = self.ask(i18n::prompt_tags()).await?;
        Some(split_list(&answer))
    }

    async fn choose_attachments(&self, message: &MailMessage) -> Option<Vec<usize>> {
        if self.options.all_attachments {
            return Some((0..message.attachments.len()).collect());
        }
        if !self.options.attachments.is_empty() {
            let mut picked = Vec::new();
            for name in &self.options.attachments {
                match message.attachments.iter().position(|a| a.file_name == *name) {
                    Some(idx) => picked.push(idx),
                    None => {
                        eprintln!("{}: {name}", i18n::err_unknown_attachment());
                        return None;
                    }
                }
            }
            return Some(picked);
        }
        if self.options.yes || message.attachments.is_empty() {
            return Some(Vec::new());
        }

        println!();
        for (i, att) in message.attachments.iter().enumerate() {
            println!("  {:>3}  {} ({})", i + 1, att.file_name, att.size_human());
        }
        loop {
            let answer = self.ask(i18n::prompt_attachments()).await?;
            match pick_attachments(&answer, message.attachments.len()) {
                Some(picked) => return Some(picked),
                None => println!("{}", i18n::prompt_invalid_choice()),
            }
        }
    }
}

impl StatusSink for PromptUi {
    fn set_status(&self, status: &str) {
        let Ok(mut slot) = self.spinner.lock() else {
            return;
        };
        let pb = slot.get_or_insert_with(|| {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::with_template("{spinner:.green} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        });
        pb.set_message(status.to_string());
    }
}

#[async_trait]
impl SelectionUi for PromptUi {
    fn preview(&self, message: &MailMessage, body: &str) {
        self.clear_status();
        println!("\n# {}\n", message.note_title());
        println!("{}", body.trim_end());
        if !message.attachments.is_empty() {
            println!("\n{}:", i18n::msg_attachments());
            for att in &message.attachments {
                println!("  - {} ({}, {})", att.file_name, att.content_type, att.size_human());
            }
        }
        println!();
    }

    async fn choose(&self, offer: &Offer<'_>) -> Option<Selection> {
        let notebook = self.choose_notebook(offer).await?;
        let tags = self.choose_tags(offer).await?;
        let attachments = self.choose_attachments(offer.message).await?;

        if let Ok(mut label) = self.notebook_label.lock() {
            *label = Some(notebook.label.trim_start_matches([' ', '.']).to_string());
        }
        Some(Selection {
            notebook_id: notebook.id,
            tags,
            attachments,
        })
    }

    async fn confirm(&self, draft: &NoteDraft, attachments: &[&Attachment]) -> bool {
        self.clear_status();
        let notebook = self
            .notebook_label
            .lock()
            .ok()
            .and_then(|l| l.clone())
            .unwrap_or_else(|| draft.notebook_id.clone());
        let tags: Vec<&str> = draft
            .tags
            .iter()
            .map(|t| match t {
                TagRef::Id(id) => id.as_str(),
                TagRef::Title(title) => title.as_str(),
            })
            .collect();

        println!();
        println!("  {:<12} {}", i18n::prompt_notebook(), notebook);
        if tags.is_empty() {
            println!("  {:<12} {}", i18n::msg_tags(), i18n::msg_no_tags());
        } else {
            println!("  {:<12} {}", i18n::msg_tags(), tags.join(", "));
        }
        for att in attachments {
            println!("  {:<12} {}", i18n::msg_attachments(), att.file_name);
        }

        if self.options.yes {
            return true;
        }
        match self.ask(i18n::prompt_confirm()).await {
            Some(answer) => i18n::is_yes(&answer),
            None => false,
        }
    }
}

/// Forward lines from `input` over a channel, read on a plain thread.
///
/// A read left pending when the session ends blocks only that thread, never
/// the async runtime. The channel closes at end of input or on a read error.
fn read_lines<R>(input: R) -> mpsc::Receiver<String>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(1);
    std::thread::spawn(move || {
        for line in input.lines() {
            match line {
                Ok(line) => {
                    if tx.blocking_send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Failed to read answer");
                    break;
                }
            }
        }
        debug!("Answer input closed");
    });
    rx
}

/// Split a comma-separated answer, dropping blank entries.
fn split_list(answer: &str) -> Vec<String> {
    answer
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Resolve a notebook answer: empty takes `default`, a number indexes the
/// displayed list, anything else is looked up by id or title.
fn pick_notebook(
    answer: &str,
    flat: &[FlatNotebook],
    tree: &[Notebook],
    default: Option<&FlatNotebook>,
) -> Option<FlatNotebook> {
    let answer = answer.trim();
    if answer.is_empty() {
        return default.cloned();
    }
    if let Ok(n) = answer.parse::<usize>() {
        return n.checked_sub(1).and_then(|i| flat.get(i)).cloned();
    }
    let found = Notebook::find(tree, answer)?;
    flat.iter().find(|nb| nb.id == found.id).cloned()
}

/// Parse `1,3`, `1 3`, `all` or an empty answer into attachment indices.
fn pick_attachments(answer: &str, count: usize) -> Option<Vec<usize>> {
    let answer = answer.trim();
    if answer.eq_ignore_ascii_case("all") || answer == "*" {
        return Some((0..count).collect());
    }
    let mut picked = Vec::new();
    for token in answer.split([',', ' ']).filter(|t| !t.is_empty()) {
        let n: usize = token.parse().ok()?;
        if n == 0 || n > count {
            return None;
        }
        if !picked.contains(&(n - 1)) {
            picked.push(n - 1);
        }
    }
    Some(picked)
}
