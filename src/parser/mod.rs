//! Message decoding: reading `.eml` files and MIME handling.

pub mod eml;
pub mod mime;
