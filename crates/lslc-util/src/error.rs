//! Compile error type.
//!
//! There is a single closed set of error kinds. Any error aborts the
//! compilation; there is no recovery or partial success. Rendering
//! follows one of three formats selected by options:
//!
//! 1. `(Line L char C): ERROR: <message>`
//! 2. `(Line L char C): ERROR in "file": <message>` (preprocessed input)
//! 3. `::ERROR::"file":L:C: <message>` (`emap` mode)

use thiserror::Error;

/// The closed set of compile error kinds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Syntax,
    UnexpectedEof,
    AlreadyDefined,
    Undefined,
    TypeMismatch,
    ReturnShouldBeEmpty,
    ReturnIsEmpty,
    InvalidField,
    FunctionMismatch,
    DeclarationScope,
    CantChangeState,
    CodePathWithoutRet,
    DuplicateLabel,
    /// `case`/`default` used outside a `switch`; carries the keyword.
    InvalidCase(&'static str),
    /// `case`/`default` in a nested block of a `switch`; carries the keyword.
    CaseNotAllowed(&'static str),
    ManyDefaults,
    MissingDefault,
    InvalidBreak {
        enableswitch: bool,
        breakcont: bool,
    },
    InvalidContinue,
    InvalidBrkContArg {
        breakcont: bool,
    },
    InvalidBackslash,
    InvalidLabelOpt,
    NoConversion,
}

impl ErrorKind {
    /// The human-readable message for this kind.
    pub fn message(&self) -> String {
        match self {
            ErrorKind::Syntax => "Syntax error".into(),
            ErrorKind::UnexpectedEof => "Unexpected EOF".into(),
            ErrorKind::AlreadyDefined => "Name previously declared within scope".into(),
            ErrorKind::Undefined => "Name not defined within scope".into(),
            ErrorKind::TypeMismatch => "Type mismatch".into(),
            ErrorKind::ReturnShouldBeEmpty => {
                "Return statement type doesn't match function return type".into()
            }
            ErrorKind::ReturnIsEmpty => {
                "Function returns a value but return statement doesn't".into()
            }
            ErrorKind::InvalidField => {
                "Use of vector or quaternion method on incorrect type".into()
            }
            ErrorKind::FunctionMismatch => {
                "Function call mismatches type or number of arguments".into()
            }
            ErrorKind::DeclarationScope => {
                "Declaration requires a new scope -- use { and }".into()
            }
            ErrorKind::CantChangeState => "Global functions can't change state".into(),
            ErrorKind::CodePathWithoutRet => "Not all code paths return a value".into(),
            ErrorKind::DuplicateLabel => {
                "Duplicate local label name. That won't allow the Mono script to be saved, \
                 and will not work as expected in LSO."
                    .into()
            }
            ErrorKind::InvalidCase(kw) => {
                format!("'{kw}' used outside a 'switch' statement")
            }
            ErrorKind::CaseNotAllowed(kw) => {
                format!("'{kw}' label only allowed at the main 'switch' block")
            }
            ErrorKind::ManyDefaults => {
                "multiple 'default' labels inside 'switch' statement".into()
            }
            ErrorKind::MissingDefault => {
                "Missing 'default:' label inside 'switch' statement; disable option \
                 'errmissingdefault' to disable this error."
                    .into()
            }
            ErrorKind::InvalidBreak {
                enableswitch,
                breakcont,
            } => match (enableswitch, breakcont) {
                (true, true) => "'break' used outside a loop or switch".into(),
                (true, false) => "'break' used outside a switch".into(),
                _ => "'break' used outside a loop".into(),
            },
            ErrorKind::InvalidContinue => "'continue' used outside a loop".into(),
            ErrorKind::InvalidBrkContArg { breakcont } => {
                if *breakcont {
                    "Invalid argument to 'break' or 'continue'".into()
                } else {
                    "Invalid argument to 'break'".into()
                }
            }
            ErrorKind::InvalidBackslash => {
                "Preprocessor directive can't end in backslash. Activate the preprocessor \
                 or put everything in the same line."
                    .into()
            }
            ErrorKind::InvalidLabelOpt => {
                "When optimization is active, a label can't be the immediate child of a \
                 'for', 'if', 'while' or 'do'. Disable optimization or rewrite the code \
                 in some other way."
                    .into()
            }
            ErrorKind::NoConversion => {
                "There's no conversion function in the library for this type".into()
            }
        }
    }
}

/// A fatal compile error with its resolved position and rendering.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{rendered}")]
pub struct CompileError {
    pub kind: ErrorKind,
    pub line: usize,
    pub column: usize,
    /// File name from the `#line` map, when known.
    pub file: Option<String>,
    rendered: String,
}

impl CompileError {
    /// Build an error, choosing the rendering from the option context.
    ///
    /// `fallback_file` is the file name of the input itself, used in
    /// `emap` mode when no `#line` directive named one.
    pub fn new(
        kind: ErrorKind,
        line: usize,
        column: usize,
        file: Option<String>,
        fallback_file: &str,
        emap: bool,
        processpre: bool,
    ) -> Self {
        let msg = kind.message();
        let rendered = if emap {
            let name = file.as_deref().unwrap_or(fallback_file);
            let name = name.replace('\\', "\\\\").replace('"', "\\\"");
            format!("::ERROR::\"{name}\":{line}:{column}: {msg}")
        } else if processpre && file.is_some() {
            let name = file.as_deref().unwrap();
            format!("(Line {line} char {column}): ERROR in \"{name}\": {msg}")
        } else {
            format!("(Line {line} char {column}): ERROR: {msg}")
        };
        Self {
            kind,
            line,
            column,
            file,
            rendered,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_format() {
        let err = CompileError::new(ErrorKind::Syntax, 3, 7, None, "<stdin>", false, false);
        assert_eq!(err.to_string(), "(Line 3 char 7): ERROR: Syntax error");
    }

    #[test]
    fn preprocessed_format_includes_file() {
        let err = CompileError::new(
            ErrorKind::TypeMismatch,
            10,
            1,
            Some("script.lsl".into()),
            "<stdin>",
            false,
            true,
        );
        assert_eq!(
            err.to_string(),
            "(Line 10 char 1): ERROR in \"script.lsl\": Type mismatch"
        );
    }

    #[test]
    fn emap_format_escapes_quotes() {
        let err = CompileError::new(
            ErrorKind::Undefined,
            1,
            2,
            Some("a\"b.lsl".into()),
            "<stdin>",
            true,
            true,
        );
        assert_eq!(
            err.to_string(),
            "::ERROR::\"a\\\"b.lsl\":1:2: Name not defined within scope"
        );
    }

    #[test]
    fn break_message_tracks_options() {
        let k = ErrorKind::InvalidBreak {
            enableswitch: true,
            breakcont: false,
        };
        assert_eq!(k.message(), "'break' used outside a switch");
    }
}
