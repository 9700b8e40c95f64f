//! Borrowed string windows and an owned string builder.
//!
//! - [`StringView`]: A copyable window into a `&str` with prefix/suffix
//!   tests, whitespace stripping and delimiter splitting
//! - [`StringBuilder`]: An append-only owned buffer that accepts views,
//!   characters, other builders and format arguments
//!
//! # Examples
//!
//! ```rust
//! use tessera::text::{StringBuilder, StringView};
//!
//! let mut line = StringView::new("  key = value  ");
//! line.strip();
//! let key = line.split_exclude_delim("=");
//!
//! let mut builder = StringBuilder::new();
//! builder.append_view(key.stripped());
//! builder.append_char(':');
//! builder.append_view(line.stripped());
//! assert_eq!(builder.as_str(), "key:value");
//! ```

mod string_builder;
mod string_view;

pub use string_builder::StringBuilder;
pub use string_view::StringView;
