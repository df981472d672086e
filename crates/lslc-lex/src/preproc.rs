//! Preprocessor directive handling.
//!
//! The lexer hands over any logical line starting with `#` (when
//! `processpre` is on). Recognized forms:
//!
//! - `#line N "file"` and `# N "file"` (gcpp style), with optional
//!   trailing flag numbers: recorded in the line map for diagnostics;
//! - `#pragma OPT ±name[,±name...]`: toggles options mid-file;
//! - `#warning text`: printed to stderr;
//! - anything else is ignored (e.g. `#define` passthrough from mcpp).
//!
//! Keywords are matched case-insensitively. A directive may not end in
//! a backslash: line continuations must be resolved by the external
//! preprocessor before the core sees the text.

use lslc_util::{CompileError, ErrorKind};

use crate::Lexer;

/// Split off a leading case-insensitive word, returning the rest when
/// it matches.
fn strip_word<'b>(body: &'b str, word: &str) -> Option<&'b str> {
    if body.len() >= word.len() && body[..word.len()].eq_ignore_ascii_case(word) {
        let rest = &body[word.len()..];
        if rest.is_empty() || rest.starts_with([' ', '\t']) {
            return Some(rest);
        }
    }
    None
}

fn parse_number(body: &str) -> Option<(usize, &str)> {
    let end = body
        .as_bytes()
        .iter()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(body.len());
    if end == 0 {
        return None;
    }
    let n = body[..end].parse::<usize>().ok()?;
    Some((n, &body[end..]))
}

/// Parse a quoted file name, interpreting `\x` escapes as the literal
/// character `x`.
fn parse_quoted(body: &str) -> Option<(String, &str)> {
    let rest = body.strip_prefix('"')?;
    let mut out = String::new();
    let mut chars = rest.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Some((out, &rest[i + 1..])),
            '\\' => {
                let (_, esc) = chars.next()?;
                out.push(esc);
            }
            _ => out.push(c),
        }
    }
    None
}

impl Lexer<'_> {
    /// Process one directive line (starting at `#`, newline excluded).
    pub(crate) fn process_directive(&mut self, directive: &str) -> Result<(), CompileError> {
        if directive.ends_with('\\') {
            return Err(self.error(ErrorKind::InvalidBackslash));
        }

        let body = directive
            .strip_prefix('#')
            .unwrap_or(directive)
            .trim_matches([' ', '\t', '\r']);

        // `#pragma OPT a,-b,+c`
        if let Some(rest) = strip_word(body, "pragma") {
            if let Some(rest) = strip_word(rest.trim_start(), "opt") {
                for opt in rest.trim().split(',') {
                    let opt = opt.trim().to_ascii_lowercase();
                    if opt.is_empty() {
                        continue;
                    }
                    if let Some(name) = opt.strip_prefix('-') {
                        self.opts.set_by_name(name, false);
                    } else if let Some(name) = opt.strip_prefix('+') {
                        self.opts.set_by_name(name, true);
                    } else {
                        self.opts.set_by_name(&opt, true);
                    }
                }
            }
            return Ok(());
        }

        // `#warning text`
        if let Some(rest) = strip_word(body, "warning") {
            let rest = rest.trim();
            if rest.is_empty() {
                eprintln!("Warning: #warning");
            } else {
                eprintln!("Warning: #warning {rest}");
            }
            return Ok(());
        }

        // `#line N "file"` or `# N "file"`
        let rest = strip_word(body, "line").unwrap_or(body);
        let rest = rest.trim_start();
        if let Some((stated_line, rest)) = parse_number(rest) {
            let file = match parse_quoted(rest.trim_start()) {
                Some((name, _ignored_flags)) => {
                    self.last_file = Some(name.clone());
                    name
                }
                None => self
                    .last_file
                    .clone()
                    .unwrap_or_else(|| "<stdin>".to_string()),
            };
            let physical_line = self.src()[..self.errorpos()]
                .bytes()
                .filter(|&b| b == b'\n')
                .count();
            self.linemap.push(physical_line, stated_line, file);
        }
        // Unrecognized directives are ignored.
        Ok(())
    }
}
