//! Small shared helpers.

/// An owned, growable string buffer with a hard byte cap.
///
/// Appends past the cap truncate at a char boundary instead of failing, so
/// adversarial-but-not-malicious input can never grow a message without
/// bound.
#[derive(Debug)]
pub struct BoundedBuf {
    buf: String,
    cap: usize,
}

impl BoundedBuf {
    pub fn new(cap: usize) -> Self {
        BoundedBuf {
            buf: String::new(),
            cap,
        }
    }

    /// Append `s`, keeping the total length within the cap.
    pub fn push_fragment(&mut self, s: &str) {
        let remaining = self.cap.saturating_sub(self.buf.len());
        if s.len() <= remaining {
            self.buf.push_str(s);
            return;
        }
        let mut end = remaining;
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        self.buf.push_str(&s[..end]);
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }
}
