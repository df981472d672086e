//! `#line` directive tracking and error position resolution.
//!
//! A preprocessor front-end may inject `#line N "file"` (or `# N "file"`)
//! directives. The lexer records them here so diagnostics can be reported
//! against the original file rather than the preprocessed stream.

/// One recorded `#line` directive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineDirective {
    /// Zero-based physical line of the directive itself.
    pub physical_line: usize,
    /// Line number the directive declares for the line that follows it.
    pub stated_line: usize,
    /// File name the directive declares.
    pub file: String,
}

/// Ordered list of `#line` directives seen so far.
#[derive(Clone, Debug, Default)]
pub struct LineMap {
    directives: Vec<LineDirective>,
}

impl LineMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a directive. Directives arrive in source order.
    pub fn push(&mut self, physical_line: usize, stated_line: usize, file: String) {
        self.directives.push(LineDirective {
            physical_line,
            stated_line,
            file,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    /// Map a zero-based physical line to the declared (line, file) pair,
    /// or `None` when no directive precedes it.
    pub fn resolve(&self, physical_line: usize) -> Option<(usize, &str)> {
        for dir in self.directives.iter().rev() {
            if dir.physical_line < physical_line {
                let line = physical_line - dir.physical_line + dir.stated_line - 2;
                return Some((line, &dir.file));
            }
        }
        None
    }
}

/// Compute the one-based (line, column) of a byte position, plus the file
/// name declared by the closest preceding `#line` directive if any.
/// Columns count characters, not bytes.
pub fn line_col<'a>(src: &str, pos: usize, map: &'a LineMap) -> (usize, usize, Option<&'a str>) {
    let pos = pos.min(src.len());
    let lno = src[..pos].bytes().filter(|&b| b == b'\n').count();
    let lstart = src[..pos].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let cno = src[lstart..pos].chars().count();

    match map.resolve(lno) {
        Some((line, file)) => (line + 1, cno + 1, Some(file)),
        None => (lno + 1, cno + 1, None),
    }
}
