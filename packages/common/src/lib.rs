//! # MindMap Common
//!
//! Collaborators shared by the content engine and its hosts:
//!
//! - [`observable`]: a synchronous, priority-ordered event bus
//! - [`url_helper`]: link detection inside idea titles
//! - [`title`]: display formatting for idea titles

pub mod error;
pub mod observable;
pub mod result;
pub mod title;
pub mod url_helper;

pub use error::*;
pub use observable::*;
pub use result::*;
pub use title::formatted_node_title;
pub use url_helper::{contains_link, get_link, strip_link};
