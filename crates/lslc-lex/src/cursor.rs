//! Byte cursor for traversing source code.
//!
//! The cursor maintains the scan position, the position where the
//! current token started (for error reporting), and whether the scan is
//! at the start of a logical line (for preprocessor detection). LSL
//! syntax is ASCII; non-ASCII bytes only occur inside string literals
//! and comments, where they are copied or skipped verbatim, so the
//! cursor works on bytes.

/// A cursor over the source text.
pub struct Cursor<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    /// Start of the token being scanned; errors are reported here.
    pub errorpos: usize,
    /// True at the start of a logical line.
    pub linestart: bool,
}

impl<'a> Cursor<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            errorpos: 0,
            linestart: true,
        }
    }

    /// The full source text.
    pub fn src(&self) -> &'a str {
        self.src
    }

    /// Current byte position.
    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    /// Byte at `offset` from the current position, or 0 past the end.
    #[inline]
    pub fn peek(&self, offset: usize) -> u8 {
        self.bytes.get(self.pos + offset).copied().unwrap_or(0)
    }

    #[inline]
    pub fn bump(&mut self) -> u8 {
        let b = self.peek(0);
        if self.pos < self.bytes.len() {
            self.pos += 1;
        }
        b
    }

    #[inline]
    pub fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.bytes.len());
    }

    /// True if the text at the current position starts with `s`.
    #[inline]
    pub fn starts_with(&self, s: &str) -> bool {
        self.src[self.pos.min(self.src.len())..].starts_with(s)
    }

    /// Source slice between two byte positions.
    pub fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.src[start..end]
    }

    /// Move to an absolute byte position (used for backtracking).
    #[inline]
    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos.min(self.bytes.len());
    }

    /// Rewind to the beginning, for the second parsing pass.
    pub fn reset(&mut self) {
        self.pos = 0;
        self.errorpos = 0;
        self.linestart = true;
    }

    /// Save the cursor state for backtracking.
    pub fn snapshot(&self) -> CursorSnapshot {
        CursorSnapshot {
            pos: self.pos,
            errorpos: self.errorpos,
            linestart: self.linestart,
        }
    }

    /// Restore a previously saved state.
    pub fn restore(&mut self, snap: CursorSnapshot) {
        self.pos = snap.pos;
        self.errorpos = snap.errorpos;
        self.linestart = snap.linestart;
    }
}

/// A saved cursor state.
#[derive(Clone, Copy, Debug)]
pub struct CursorSnapshot {
    pos: usize,
    errorpos: usize,
    linestart: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peek_past_end_is_zero() {
        let cur = Cursor::new("a");
        assert_eq!(cur.peek(0), b'a');
        assert_eq!(cur.peek(1), 0);
        assert_eq!(cur.peek(100), 0);
    }

    #[test]
    fn bump_stops_at_end() {
        let mut cur = Cursor::new("ab");
        assert_eq!(cur.bump(), b'a');
        assert_eq!(cur.bump(), b'b');
        assert_eq!(cur.bump(), 0);
        assert!(cur.is_at_end());
        assert_eq!(cur.pos(), 2);
    }

    #[test]
    fn snapshot_restore_round_trip() {
        let mut cur = Cursor::new("integer x;");
        cur.advance(4);
        cur.errorpos = 2;
        cur.linestart = false;
        let snap = cur.snapshot();
        cur.advance(3);
        cur.errorpos = 7;
        cur.restore(snap);
        assert_eq!(cur.pos(), 4);
        assert_eq!(cur.errorpos, 2);
        assert!(!cur.linestart);
    }

    #[test]
    fn starts_with_at_position() {
        let mut cur = Cursor::new("// pragma inline");
        cur.advance(3);
        assert!(cur.starts_with("pragma inline"));
    }
}
