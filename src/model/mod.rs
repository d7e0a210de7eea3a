//! Core data model: the mail message handed over by the host, its
//! attachments, and the notebook/tag/resource records of the clipper service.

pub mod attachment;
pub mod mail;
pub mod note;
