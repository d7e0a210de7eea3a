//! Note submission client for a located clipper service.
//!
//! Calls are issued strictly one at a time. Any failure is returned as a
//! [`ClipperError::Submission`] naming the step; nothing already created on
//! the service is rolled back.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::error::{ClipperError, Result, SubmitStep};
use crate::host::MailHost;
use crate::model::attachment::Attachment;
use crate::model::note::{dedup_and_sort_tags, CreatedNote, NoteDraft, Notebook, Resource, ResourceLink, Tag};
use crate::note::append_links;

use super::locator::ServiceLocator;
use super::transport::{Body, MultipartUpload, Request, Transport};

/// Upper bound on pages fetched for one listing.
const MAX_PAGES: u32 = 100;

/// `/folders` and `/tags` answer either with a bare array or with one page
/// of a paginated listing.
#[derive(Deserialize)]
#[serde(untagged)]
enum Listing<T> {
    Bare(Vec<T>),
    Page {
        items: Vec<T>,
        #[serde(default)]
        has_more: bool,
    },
}

/// Client for the clipper API of one service instance.
pub struct NoteClient {
    transport: Arc<dyn Transport>,
    base_url: String,
    token: Option<String>,
    timeout: Duration,
}

impl NoteClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
            token,
            timeout,
        }
    }

    /// Client for the service `locator` has found.
    pub fn from_locator(locator: &ServiceLocator) -> Result<Self> {
        Ok(Self::new(
            locator.transport(),
            locator.base_url()?,
            locator.config().token.clone(),
            locator.timeout(),
        ))
    }

    /// The notebook tree, as the service sends it.
    pub async fn list_notebooks(&self) -> Result<Vec<Notebook>> {
        self.list("/folders")
            .await
            .map_err(|e| e.during(SubmitStep::ListNotebooks))
    }

    /// Tags with one entry per title (first seen wins), sorted by title.
    pub async fn list_tags(&self) -> Result<Vec<Tag>> {
        let tags: Vec<Tag> = self
            .list("/tags")
            .await
            .map_err(|e| e.during(SubmitStep::ListTags))?;
        let received = tags.len();
        let unique = dedup_and_sort_tags(tags);
        if unique.len() != received {
            debug!(received, unique = unique.len(), "Dropped duplicate tag titles");
        }
        Ok(unique)
    }

    /// Upload one attachment as a resource.
    pub async fn create_resource(
        &self,
        data: Vec<u8>,
        title: &str,
        file_name: &str,
        content_type: &str,
    ) -> Result<Resource> {
        let size = data.len();
        let upload = MultipartUpload {
            data,
            file_name: file_name.to_string(),
            content_type: content_type.to_string(),
            props: json!({ "title": title, "filename": file_name }),
        };
        let request = Request::post(
            self.url("/resources", None)?,
            Body::Multipart(upload),
            self.timeout,
        )
        .header("Accept", "application/json");
        let body = self.transport.send(request).await?;
        let resource: Resource = parse("/resources", &body)?;
        debug!(file_name, size, resource = %resource.id, "Uploaded resource");
        Ok(resource)
    }

    /// Create a note: upload each attachment and link it from the body, post
    /// the note, then associate tags given by id, in order.
    ///
    /// Attachment bytes are fetched from `host` one at a time, right before
    /// their upload, and released once the upload returns.
    pub async fn create_note(
        &self,
        draft: &NoteDraft,
        attachments: &[&Attachment],
        host: &dyn MailHost,
    ) -> Result<CreatedNote> {
        let mut links = Vec::with_capacity(attachments.len());
        for att in attachments {
            let step = || SubmitStep::UploadResource(att.file_name.clone());
            let data = host
                .materialize(att)
                .await
                .map_err(|e| e.during(step()))?;
            let resource = self
                .create_resource(data, &att.file_name, &att.file_name, &att.content_type)
                .await
                .map_err(|e| e.during(step()))?;
            links.push(ResourceLink {
                file_name: att.file_name.clone(),
                resource_id: resource.id,
            });
        }

        let mut body = draft.body.clone();
        append_links(&mut body, &links);

        let mut payload = json!({
            "title": draft.title,
            "body": body,
            "parent_id": draft.notebook_id,
        });
        if let Some(tags) = draft.inline_tags() {
            payload["tags"] = json!(tags);
        }

        let note: CreatedNote = self
            .post_json("/notes", payload)
            .await
            .and_then(|body| parse("/notes", &body))
            .map_err(|e| e.during(SubmitStep::CreateNote))?;
        info!(note = %note.id, notebook = %draft.notebook_id, resources = links.len(), "Created note");

        for tag_id in draft.tag_ids() {
            self.associate_tag(tag_id, &note.id)
                .await
                .map_err(|e| e.during(SubmitStep::AssociateTag(tag_id.to_string())))?;
        }

        Ok(note)
    }

    /// Attach an existing tag to a note. The response body is ignored.
    pub async fn associate_tag(&self, tag_id: &str, note_id: &str) -> Result<()> {
        self.post_json(&format!("/tags/{tag_id}/notes"), json!({ "id": note_id }))
            .await?;
        debug!(tag = tag_id, note = note_id, "Tagged note");
        Ok(())
    }

    async fn post_json(&self, path: &str, payload: serde_json::Value) -> Result<String> {
        let request = Request::post(self.url(path, None)?, Body::Json(payload), self.timeout)
            .header("Accept", "application/json");
        self.transport.send(request).await
    }

    async fn list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut page: Option<u32> = None;

        for fetched in 1..=MAX_PAGES {
            let request = Request::get(self.url(path, page)?, self.timeout)
                .header("Accept", "application/json");
            let body = self.transport.send(request).await?;
            match parse::<Listing<T>>(path, &body)? {
                Listing::Bare(batch) => {
                    items.extend(batch);
                    break;
                }
                Listing::Page {
                    items: batch,
                    has_more,
                } => {
                    let empty = batch.is_empty();
                    items.extend(batch);
                    if !has_more || empty {
                        return Ok(items);
                    }
                    if fetched == MAX_PAGES {
                        warn!(path, pages = fetched, "Listing still has more pages, stopping");
                        break;
                    }
                    page = Some(page.unwrap_or(1) + 1);
                }
            }
        }

        Ok(items)
    }

    fn url(&self, path: &str, page: Option<u32>) -> Result<String> {
        let raw = format!("{}{}", self.base_url, path);

        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(token) = &self.token {
            params.push(("token", token.clone()));
        }
        if let Some(page) = page {
            params.push(("page", page.to_string()));
        }
        if params.is_empty() {
            return Ok(raw);
        }

        let url = reqwest::Url::parse_with_params(&raw, &params)
            .map_err(|e| ClipperError::HttpClient(format!("Invalid URL '{raw}': {e}")))?;
        Ok(url.into())
    }
}

fn parse<T: DeserializeOwned>(path: &str, body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| ClipperError::MalformedResponse {
        path: path.to_string(),
        reason: e.to_string(),
    })
}
