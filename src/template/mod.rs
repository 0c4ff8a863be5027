//! Text templates used by declarative template modules
//!
//! # Example
//!
//! ```text
//! <h1>${heading}</h1>
//! <p>${body}</p>
//! Prices start at $5, write $${name} for a literal placeholder.
//! ```

mod lexer;
mod text;

pub use text::{Escape, TextTemplate};
