//! `emailclipper`: send an email and its attachments to a Joplin notebook
//! through the local Web Clipper service.
//!
//! The core finds the service on a small port range, lists notebooks and
//! tags, and submits the note with its resources. A [`host::MailHost`]
//! supplies the message and a [`session::SelectionUi`] the user's choices.

pub mod config;
pub mod error;
pub mod host;
pub mod i18n;
pub mod model;
pub mod note;
pub mod parser;
pub mod prompt;
pub mod recent;
pub mod service;
pub mod session;
