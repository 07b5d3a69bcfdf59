use std::fmt;
use std::ops::Range;
use xi_rope::Rope;
use xi_rope::delta::Builder;

use crate::models::StoreError;

/// Text run of a single block, backed by an xi-rope buffer.
///
/// Indices and lengths count Unicode scalar values, not bytes. Every mutation
/// validates its range first and leaves the buffer untouched on error.
#[derive(Clone)]
pub struct TextBuffer {
    rope: Rope,
}

impl TextBuffer {
    pub fn new() -> Self {
        Self::from_text("")
    }

    pub fn from_text(text: &str) -> Self {
        Self {
            rope: Rope::from(text),
        }
    }

    /// Length in chars
    pub fn len(&self) -> usize {
        self.rope.slice_to_cow(0..self.rope.len()).chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.rope.len() == 0
    }

    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Insert `text` before the char at `index`
    pub fn insert(&mut self, index: usize, text: &str) -> Result<(), StoreError> {
        let range = self.byte_range(index, 0)?;
        if text.is_empty() {
            return Ok(());
        }
        let mut builder = Builder::new(self.rope.len());
        builder.replace(range, Rope::from(text));
        self.rope = builder.build().apply(&self.rope);
        Ok(())
    }

    /// Delete `length` chars starting at `index`
    pub fn delete(&mut self, index: usize, length: usize) -> Result<(), StoreError> {
        let range = self.byte_range(index, length)?;
        if range.is_empty() {
            return Ok(());
        }
        let mut builder = Builder::new(self.rope.len());
        builder.delete(range);
        self.rope = builder.build().apply(&self.rope);
        Ok(())
    }

    /// Append the content of `other` to this buffer
    pub fn join(&mut self, other: &TextBuffer) {
        if other.is_empty() {
            return;
        }
        let end = self.rope.len();
        let mut builder = Builder::new(end);
        builder.replace(end..end, other.rope.clone());
        self.rope = builder.build().apply(&self.rope);
    }

    /// Map a char range onto the rope's byte offsets
    fn byte_range(&self, index: usize, length: usize) -> Result<Range<usize>, StoreError> {
        let text = self.rope.slice_to_cow(0..self.rope.len());
        let out_of_bounds = || StoreError::OutOfBounds {
            index,
            length,
            len: text.chars().count(),
        };

        let mut offsets = text
            .char_indices()
            .map(|(byte, _)| byte)
            .chain(std::iter::once(text.len()));
        let start = offsets.nth(index).ok_or_else(out_of_bounds)?;
        let end = if length == 0 {
            start
        } else {
            offsets.nth(length - 1).ok_or_else(out_of_bounds)?
        };
        Ok(start..end)
    }
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for TextBuffer {
    fn from(text: &str) -> Self {
        Self::from_text(text)
    }
}

impl PartialEq for TextBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.text() == other.text()
    }
}

impl Eq for TextBuffer {}

impl fmt::Debug for TextBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TextBuffer").field(&self.text()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("hello", 0, "X", "Xhello")]
    #[case("hello", 5, "X", "helloX")]
    #[case("hello", 2, "", "hello")]
    #[case("héllo", 2, "X", "héXllo")]
    #[case("", 0, "abc", "abc")]
    fn test_insert(
        #[case] initial: &str,
        #[case] index: usize,
        #[case] text: &str,
        #[case] expected: &str,
    ) {
        let mut buffer = TextBuffer::from(initial);
        buffer.insert(index, text).unwrap();
        assert_eq!(buffer.text(), expected);
    }

    #[rstest]
    #[case("hello", 2, 3, "he")]
    #[case("hello", 0, 5, "")]
    #[case("hello", 1, 0, "hello")]
    #[case("日本語テキスト", 1, 2, "日テキスト")]
    fn test_delete(
        #[case] initial: &str,
        #[case] index: usize,
        #[case] length: usize,
        #[case] expected: &str,
    ) {
        let mut buffer = TextBuffer::from(initial);
        buffer.delete(index, length).unwrap();
        assert_eq!(buffer.text(), expected);
    }

    #[test]
    fn test_out_of_bounds_leaves_buffer_untouched() {
        let mut buffer = TextBuffer::from("abc");

        let err = buffer.delete(2, 5).unwrap_err();
        assert_eq!(
            err,
            StoreError::OutOfBounds {
                index: 2,
                length: 5,
                len: 3
            }
        );
        assert!(buffer.insert(4, "x").is_err());
        assert_eq!(buffer.text(), "abc");
    }

    #[test]
    fn test_join_appends() {
        let mut first = TextBuffer::from("he");
        let second = TextBuffer::from("ld");
        first.join(&second);
        assert_eq!(first.text(), "held");
        assert_eq!(second.text(), "ld");
    }

    #[test]
    fn test_len_counts_chars() {
        assert_eq!(TextBuffer::from("🦀ab").len(), 3);
        assert!(TextBuffer::new().is_empty());
    }
}
