//! Records exchanged with the clipper service: notebooks, tags, resources
//! and the note draft assembled before submission.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A notebook (folder) as returned by `/folders`. Children nest to the
/// depth the service reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notebook {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Notebook>,
}

/// One line of the indented notebook list shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatNotebook {
    pub id: String,
    /// Title prefixed with `" . "` once per nesting level.
    pub label: String,
    pub depth: usize,
}

impl Notebook {
    /// Flatten a notebook forest depth-first, parents before children.
    pub fn flatten(tree: &[Notebook]) -> Vec<FlatNotebook> {
        fn walk(nb: &Notebook, depth: usize, out: &mut Vec<FlatNotebook>) {
            out.push(FlatNotebook {
                id: nb.id.clone(),
                label: format!("{}{}", " . ".repeat(depth), nb.title),
                depth,
            });
            for child in &nb.children {
                walk(child, depth + 1, out);
            }
        }

        let mut out = Vec::new();
        for nb in tree {
            walk(nb, 0, &mut out);
        }
        out
    }

    /// Look up a notebook by exact id, else by case-insensitive title.
    ///
    /// Ids take precedence over titles anywhere in the tree.
    pub fn find<'a>(tree: &'a [Notebook], key: &str) -> Option<&'a Notebook> {
        fn by<'a>(tree: &'a [Notebook], pred: &dyn Fn(&Notebook) -> bool) -> Option<&'a Notebook> {
            for nb in tree {
                if pred(nb) {
                    return Some(nb);
                }
                if let Some(found) = by(&nb.children, pred) {
                    return Some(found);
                }
            }
            None
        }

        let lowered = key.to_lowercase();
        by(tree, &|nb| nb.id == key).or_else(|| by(tree, &|nb| nb.title.to_lowercase() == lowered))
    }
}

/// A tag as returned by `/tags`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub title: String,
}

/// Collapse tags sharing a title (first occurrence wins) and sort the
/// survivors by title.
pub fn dedup_and_sort_tags(tags: Vec<Tag>) -> Vec<Tag> {
    let mut seen = HashSet::new();
    let mut unique: Vec<Tag> = tags
        .into_iter()
        .filter(|t| seen.insert(t.title.clone()))
        .collect();
    unique.sort_by(|a, b| collate(&a.title, &b.title));
    unique
}

/// Title ordering: case-insensitive first, raw code points as tiebreak.
pub fn collate(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// How a tag is attached to a new note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagRef {
    /// Existing tag, associated after creation via `/tags/{id}/notes`.
    Id(String),
    /// Tag title sent inline with the note; the service creates it if needed.
    Title(String),
}

/// Map requested tag titles onto known tags.
///
/// Titles matching a known tag (case-insensitively) become [`TagRef::Id`];
/// the rest stay inline. Blank and repeated titles are dropped.
pub fn resolve_tags(requested: &[String], known: &[Tag]) -> Vec<TagRef> {
    let mut seen = HashSet::new();
    let mut refs = Vec::new();

    for raw in requested {
        let title = raw.trim();
        if title.is_empty() || !seen.insert(title.to_lowercase()) {
            continue;
        }
        let lowered = title.to_lowercase();
        match known.iter().find(|t| t.title.to_lowercase() == lowered) {
            Some(tag) => refs.push(TagRef::Id(tag.id.clone())),
            None => refs.push(TagRef::Title(title.to_string())),
        }
    }
    refs
}

/// A binary resource created by uploading an attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
}

/// Reference to an uploaded resource from the note body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLink {
    pub file_name: String,
    pub resource_id: String,
}

impl fmt::Display for ResourceLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}](:/{})", self.file_name, self.resource_id)
    }
}

/// A note assembled client-side, alive for one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteDraft {
    pub title: String,
    /// Markdown body without resource links; links are appended on upload.
    pub body: String,
    pub notebook_id: String,
    pub tags: Vec<TagRef>,
}

impl NoteDraft {
    /// Comma-separated inline tag titles, if any.
    pub fn inline_tags(&self) -> Option<String> {
        let titles: Vec<&str> = self
            .tags
            .iter()
            .filter_map(|t| match t {
                TagRef::Title(title) => Some(title.as_str()),
                TagRef::Id(_) => None,
            })
            .collect();
        if titles.is_empty() {
            None
        } else {
            Some(titles.join(","))
        }
    }

    /// Ids of existing tags, in the order they were supplied.
    pub fn tag_ids(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().filter_map(|t| match t {
            TagRef::Id(id) => Some(id.as_str()),
            TagRef::Title(_) => None,
        })
    }
}

/// The service's answer to `POST /notes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedNote {
    pub id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
}
