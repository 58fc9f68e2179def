//! Position-tracking cursor over one log line.

/// A cursor over a line of text.
///
/// Tracks the current byte position and exposes the remaining input, so the
/// grammar can be written as a sequence of small, explicit steps.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    /// Current byte position.
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Unconsumed input.
    #[must_use]
    pub fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    #[must_use]
    pub fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    pub fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    /// Consume `literal` if the remaining input starts with it.
    pub fn eat(&mut self, literal: &str) -> bool {
        if self.rest().starts_with(literal) {
            self.pos += literal.len();
            true
        } else {
            false
        }
    }

    /// Next whitespace-delimited token, without consuming it.
    #[must_use]
    pub fn peek_token(&self) -> Option<&'a str> {
        let mut probe = self.clone();
        probe.next_token()
    }

    /// Consume the next whitespace-delimited token.
    pub fn next_token(&mut self) -> Option<&'a str> {
        self.skip_whitespace();
        let rest = self.rest();
        if rest.is_empty() {
            return None;
        }
        let len = rest.find(char::is_whitespace).unwrap_or(rest.len());
        self.pos += len;
        Some(&rest[..len])
    }

    /// Consume exactly `count` characters, or nothing if fewer remain.
    pub fn take_chars(&mut self, count: usize) -> Option<&'a str> {
        let rest = self.rest();
        let end = if count == 0 {
            0
        } else {
            let (idx, ch) = rest.char_indices().nth(count - 1)?;
            idx + ch.len_utf8()
        };
        self.pos += end;
        Some(&rest[..end])
    }

    /// Consume input up to `delimiter`, returning the text before it and
    /// stepping past the delimiter.
    pub fn take_until(&mut self, delimiter: &str) -> Option<&'a str> {
        let rest = self.rest();
        let idx = rest.find(delimiter)?;
        self.pos += idx + delimiter.len();
        Some(&rest[..idx])
    }

    /// Consume a name closed by `delimiter`, where the delimiter may also
    /// occur inside the name.
    ///
    /// Each occurrence of the delimiter is a candidate end. A candidate is the
    /// real end when one of `markers` appears between it and the next
    /// occurrence of the delimiter, or when no further occurrence exists.
    /// Otherwise the candidate belongs to the name and the scan continues.
    pub fn take_delimited_name(&mut self, delimiter: &str, markers: &[&str]) -> Option<&'a str> {
        let rest = self.rest();
        let mut search_from = 0;
        loop {
            let candidate = search_from + rest[search_from..].find(delimiter)?;
            let after = candidate + delimiter.len();
            let window_end = rest[after..]
                .find(delimiter)
                .map_or(rest.len(), |idx| after + idx);
            let window = &rest[after..window_end];
            if window_end == rest.len() || markers.iter().any(|m| window.contains(m)) {
                self.pos += after;
                return Some(&rest[..candidate]);
            }
            search_from = after;
        }
    }
}
