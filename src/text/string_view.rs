//! A copyable window into borrowed text.

use std::fmt;

/// Whitespace as classified by the C locale: space, tab, line feed,
/// vertical tab, form feed and carriage return.
const fn is_c_space(character: char) -> bool {
    matches!(character, ' ' | '\t' | '\n' | '\x0B' | '\x0C' | '\r')
}

/// A window into a borrowed `&str`.
///
/// Mutating methods such as [`advance`](Self::advance),
/// [`strip`](Self::strip) and [`split`](Self::split) only move the window;
/// the underlying text is never touched. All positions are byte offsets
/// into the current window.
///
/// Case-insensitive comparisons fold ASCII letters only.
///
/// # Examples
///
/// ```rust
/// use tessera::text::StringView;
///
/// let mut path = StringView::new("usr/local/bin");
/// assert_eq!(path.split_exclude_delim("/").as_str(), "usr");
/// assert_eq!(path.split_exclude_delim("/").as_str(), "local");
/// assert_eq!(path.split_exclude_delim("/").as_str(), "bin");
/// assert!(path.is_empty());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StringView<'a> {
    text: &'a str,
}

impl<'a> StringView<'a> {
    /// Creates a view over all of `text`.
    #[inline]
    #[must_use]
    pub const fn new(text: &'a str) -> Self {
        Self { text }
    }

    /// Returns the viewed text.
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'a str {
        self.text
    }

    /// Returns the length of the window in bytes.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.text.len()
    }

    /// Returns `true` if the window is empty.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Returns the sub-view of `len` bytes starting at `offset`.
    ///
    /// Returns `None` when the range leaves the window or does not fall on
    /// character boundaries.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tessera::text::StringView;
    ///
    /// let view = StringView::new("hello world");
    /// assert_eq!(view.slice(6, 5).map(|word| word.as_str()), Some("world"));
    /// assert!(view.slice(6, 50).is_none());
    /// ```
    #[must_use]
    pub fn slice(&self, offset: usize, len: usize) -> Option<Self> {
        let end = offset.checked_add(len)?;
        self.text.get(offset..end).map(Self::new)
    }

    /// Drops the first character from the window and returns it.
    pub fn advance(&mut self) -> Option<char> {
        let mut characters = self.text.chars();
        let first = characters.next()?;
        self.text = characters.as_str();
        Some(first)
    }

    /// Compares with `other`, folding ASCII case.
    #[must_use]
    pub fn equals_ignore_case(&self, other: impl AsRef<str>) -> bool {
        self.text.eq_ignore_ascii_case(other.as_ref())
    }

    /// Returns `true` if the window begins with `prefix`.
    #[must_use]
    pub fn starts_with(&self, prefix: impl AsRef<str>) -> bool {
        self.text.starts_with(prefix.as_ref())
    }

    /// Returns `true` if the window begins with `prefix`, folding ASCII case.
    #[must_use]
    pub fn starts_with_ignore_case(&self, prefix: impl AsRef<str>) -> bool {
        let prefix = prefix.as_ref().as_bytes();
        self.text
            .as_bytes()
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
    }

    /// Returns `true` if the window ends with `suffix`.
    #[must_use]
    pub fn ends_with(&self, suffix: impl AsRef<str>) -> bool {
        self.text.ends_with(suffix.as_ref())
    }

    /// Returns `true` if the window ends with `suffix`, folding ASCII case.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tessera::text::StringView;
    ///
    /// let file = StringView::new("REPORT.TXT");
    /// assert!(file.ends_with_ignore_case(".txt"));
    /// assert!(!file.ends_with(".txt"));
    /// ```
    #[must_use]
    pub fn ends_with_ignore_case(&self, suffix: impl AsRef<str>) -> bool {
        let suffix = suffix.as_ref().as_bytes();
        let bytes = self.text.as_bytes();
        bytes
            .len()
            .checked_sub(suffix.len())
            .is_some_and(|start| bytes[start..].eq_ignore_ascii_case(suffix))
    }

    /// Drops leading whitespace from the window.
    pub fn strip_left(&mut self) {
        self.text = self.text.trim_start_matches(is_c_space);
    }

    /// Drops trailing whitespace from the window.
    pub fn strip_right(&mut self) {
        self.text = self.text.trim_end_matches(is_c_space);
    }

    /// Drops leading and trailing whitespace from the window.
    pub fn strip(&mut self) {
        self.strip_left();
        self.strip_right();
    }

    /// Returns a copy of the view with leading and trailing whitespace
    /// dropped.
    #[must_use]
    pub fn stripped(mut self) -> Self {
        self.strip();
        self
    }

    /// Byte offset of the first occurrence of `character`.
    #[must_use]
    pub fn index_of(&self, character: char) -> Option<usize> {
        self.text.find(character)
    }

    /// Byte offset of the last occurrence of `character`.
    #[must_use]
    pub fn last_index_of(&self, character: char) -> Option<usize> {
        self.text.rfind(character)
    }

    /// Byte offset of the first occurrence of `needle`.
    ///
    /// An empty needle is found at offset `0`.
    #[must_use]
    pub fn index_of_str(&self, needle: &str) -> Option<usize> {
        self.text.find(needle)
    }

    /// Splits off the text before the first `delimiter`.
    ///
    /// The window keeps the delimiter and everything after it. When the
    /// delimiter does not occur, the whole window is returned and the
    /// window becomes empty. An empty delimiter never occurs.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tessera::text::StringView;
    ///
    /// let mut view = StringView::new("a, b");
    /// assert_eq!(view.split(", ").as_str(), "a");
    /// assert_eq!(view.as_str(), ", b");
    ///
    /// let mut view = StringView::new("no delimiter");
    /// assert_eq!(view.split(";").as_str(), "no delimiter");
    /// assert!(view.is_empty());
    /// ```
    pub fn split(&mut self, delimiter: &str) -> Self {
        self.split_at_delimiter(delimiter, 0)
    }

    /// Splits off the text before the first `delimiter` and drops the
    /// delimiter itself from the window.
    ///
    /// When the delimiter does not occur, the whole window is returned and
    /// the window becomes empty. An empty delimiter never occurs, so a
    /// `while !view.is_empty()` tokenizing loop always ends.
    pub fn split_exclude_delim(&mut self, delimiter: &str) -> Self {
        self.split_at_delimiter(delimiter, delimiter.len())
    }

    fn split_at_delimiter(&mut self, delimiter: &str, skip: usize) -> Self {
        match self.text.find(delimiter).filter(|_| !delimiter.is_empty()) {
            Some(index) => {
                let (before, rest) = self.text.split_at(index);
                self.text = &rest[skip..];
                Self::new(before)
            }
            None => {
                let whole = self.text;
                self.text = &whole[whole.len()..];
                Self::new(whole)
            }
        }
    }
}

impl<'a> From<&'a str> for StringView<'a> {
    fn from(text: &'a str) -> Self {
        Self::new(text)
    }
}

impl AsRef<str> for StringView<'_> {
    fn as_ref(&self) -> &str {
        self.text
    }
}

impl PartialEq<str> for StringView<'_> {
    fn eq(&self, other: &str) -> bool {
        self.text == other
    }
}

impl PartialEq<&str> for StringView<'_> {
    fn eq(&self, other: &&str) -> bool {
        self.text == *other
    }
}

impl fmt::Display for StringView<'_> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(" \t\n\x0B\x0Cpadded\r ", "padded")]
    #[case("   ", "")]
    #[case("inner  space", "inner  space")]
    #[case("\u{a0}nbsp", "\u{a0}nbsp")]
    fn test_strip_uses_c_locale_whitespace(#[case] input: &str, #[case] expected: &str) {
        let mut view = StringView::new(input);
        view.strip();
        assert_eq!(view, expected);
    }

    #[rstest]
    #[case("abc")]
    #[case("")]
    fn test_empty_delimiter_takes_whole_window(#[case] input: &str) {
        let mut view = StringView::new(input);
        assert_eq!(view.split(""), input);
        assert!(view.is_empty());
        let mut view = StringView::new(input);
        assert_eq!(view.split_exclude_delim(""), input);
        assert!(view.is_empty());
    }

    #[rstest]
    fn test_strip_left_and_right_are_independent() {
        let mut left = StringView::new("  x  ");
        left.strip_left();
        assert_eq!(left, "x  ");
        let mut right = StringView::new("  x  ");
        right.strip_right();
        assert_eq!(right, "  x");
    }

    #[rstest]
    #[case("Hello", "hello", true)]
    #[case("Hello", "hell", false)]
    #[case("ÄB", "äb", false)]
    fn test_equals_ignore_case(#[case] lhs: &str, #[case] rhs: &str, #[case] expected: bool) {
        assert_eq!(StringView::new(lhs).equals_ignore_case(rhs), expected);
    }

    #[rstest]
    fn test_prefix_and_suffix_against_views() {
        let view = StringView::new("Content-Type");
        assert!(view.starts_with(StringView::new("Content")));
        assert!(view.starts_with_ignore_case("content-"));
        assert!(!view.starts_with_ignore_case("content-type-long"));
        assert!(view.ends_with("Type"));
        assert!(view.ends_with_ignore_case(StringView::new("TYPE")));
    }

    #[rstest]
    fn test_index_lookups_stay_inside_window() {
        let text = "abcabc";
        let view = StringView::new(text).slice(0, 3).unwrap_or_default();
        assert_eq!(view.index_of('a'), Some(0));
        assert_eq!(view.last_index_of('a'), Some(0));
        assert_eq!(view.index_of_str("ca"), None);
        assert_eq!(StringView::new(text).index_of_str("ca"), Some(2));
    }

    #[rstest]
    fn test_advance_walks_characters() {
        let mut view = StringView::new("héllo");
        assert_eq!(view.advance(), Some('h'));
        assert_eq!(view.advance(), Some('é'));
        assert_eq!(view, "llo");
        let mut empty = StringView::default();
        assert_eq!(empty.advance(), None);
    }

    #[rstest]
    fn test_slice_rejects_non_boundaries() {
        let view = StringView::new("héllo");
        assert!(view.slice(2, 1).is_none());
        assert_eq!(view.slice(1, 2).map(|slice| slice.as_str()), Some("é"));
        assert!(view.slice(usize::MAX, 2).is_none());
    }

    #[rstest]
    fn test_split_keeps_delimiter() {
        let mut view = StringView::new("key=value=more");
        assert_eq!(view.split("="), "key");
        assert_eq!(view, "=value=more");
    }

    #[rstest]
    fn test_split_exclude_delim_consumes_tokens() {
        let mut view = StringView::new("a::b::");
        assert_eq!(view.split_exclude_delim("::"), "a");
        assert_eq!(view.split_exclude_delim("::"), "b");
        assert!(view.is_empty());
        assert_eq!(view.split_exclude_delim("::"), "");
    }

    #[rstest]
    fn test_display() {
        assert_eq!(StringView::new("shown").to_string(), "shown");
    }
}
