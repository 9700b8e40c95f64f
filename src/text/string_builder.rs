//! Owned, append-only text buffer.

use std::fmt;

use super::StringView;

/// An owned text buffer built by appending.
///
/// The builder also implements [`fmt::Write`], so `write!` works on it
/// directly.
///
/// # Examples
///
/// ```rust
/// use std::fmt::Write;
/// use tessera::text::StringBuilder;
///
/// let mut builder = StringBuilder::with_capacity(16);
/// builder.append_str("total");
/// builder.append_char('=');
/// write!(builder, "{:>4}", 42).unwrap();
/// assert_eq!(builder.as_str(), "total=  42");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct StringBuilder {
    buffer: String,
}

impl StringBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buffer: String::new(),
        }
    }

    /// Creates an empty builder with room for `capacity` bytes.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: String::with_capacity(capacity),
        }
    }

    /// Appends one character.
    pub fn append_char(&mut self, character: char) {
        self.buffer.push(character);
    }

    /// Appends a string slice.
    pub fn append_str(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    /// Appends the text of a view.
    pub fn append_view(&mut self, view: StringView<'_>) {
        self.buffer.push_str(view.as_str());
    }

    /// Appends the contents of another builder.
    pub fn append_builder(&mut self, other: &Self) {
        self.buffer.push_str(&other.buffer);
    }

    /// Appends formatted text, as produced by [`format_args!`].
    ///
    /// # Errors
    ///
    /// Fails only if one of the formatted values' `Display` or `Debug`
    /// implementation fails.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tessera::text::StringBuilder;
    ///
    /// let mut builder = StringBuilder::new();
    /// builder.append_fmt(format_args!("{}-{}", 1, 2)).unwrap();
    /// assert_eq!(builder.to_string(), "1-2");
    /// ```
    pub fn append_fmt(&mut self, arguments: fmt::Arguments<'_>) -> fmt::Result {
        fmt::Write::write_fmt(&mut self.buffer, arguments)
    }

    /// Borrows the built text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    /// Borrows the built text as a [`StringView`].
    #[must_use]
    pub fn as_view(&self) -> StringView<'_> {
        StringView::new(&self.buffer)
    }

    /// Returns the length in bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns `true` if nothing has been appended since creation or the last clear.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Empties the builder, keeping its capacity.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Consumes the builder, returning the built `String`.
    #[must_use]
    pub fn into_string(self) -> String {
        self.buffer
    }
}

impl fmt::Write for StringBuilder {
    fn write_str(&mut self, text: &str) -> fmt::Result {
        self.buffer.push_str(text);
        Ok(())
    }

    fn write_char(&mut self, character: char) -> fmt::Result {
        self.buffer.push(character);
        Ok(())
    }
}

impl fmt::Display for StringBuilder {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.buffer)
    }
}

impl From<String> for StringBuilder {
    fn from(buffer: String) -> Self {
        Self { buffer }
    }
}

impl From<&str> for StringBuilder {
    fn from(text: &str) -> Self {
        Self {
            buffer: text.to_owned(),
        }
    }
}

impl From<StringBuilder> for String {
    fn from(builder: StringBuilder) -> Self {
        builder.buffer
    }
}

impl Extend<char> for StringBuilder {
    fn extend<I: IntoIterator<Item = char>>(&mut self, iter: I) {
        self.buffer.extend(iter);
    }
}

impl<'a> Extend<&'a str> for StringBuilder {
    fn extend<I: IntoIterator<Item = &'a str>>(&mut self, iter: I) {
        self.buffer.extend(iter);
    }
}
