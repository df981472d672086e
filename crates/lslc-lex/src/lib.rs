//! lslc-lex - Lexical analyzer
//!
//! Tokenizes LSL source on demand. Beyond the usual literals and
//! operators this lexer handles:
//!
//! - preprocessor passthrough: when `processpre` is on, a `#` at the
//!   start of a logical line consumes the whole line and feeds it to the
//!   directive processor (`#line N "file"`, `# N "file"`, `#pragma OPT
//!   ±name,...`, `#warning ...`);
//! - the magic comments `// pragma inline` and `/* pragma inline */`,
//!   emitted as the identifier `inline` when the inline feature is on;
//! - LSL string escapes (`\n` is a newline, `\t` is four spaces, any
//!   other escaped character is itself), with `L"..."` keeping a leading
//!   quote in the value;
//! - 32-bit wrapping of hex literals (overflow yields -1) and rounding
//!   of float literals to 32-bit precision.
//!
//! Identifier classification consults the keyword set (which grows with
//! the `enableswitch`/`breakcont` options), the type names, the library
//! event names, and the library constant table, in that order.

pub mod cursor;
mod preproc;

pub use cursor::{Cursor, CursorSnapshot};

use lslc_lang::{Library, Type, Value};
use lslc_util::{line_col, CompileError, ErrorKind, LineMap, Options};

/// A lexical token.
#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    Eof,

    Ident(String),
    TypeName(Type),
    EventName(String),

    IntegerLit(i32),
    FloatLit(f32),
    StringLit(String),
    KeyLit(String),
    VectorLit([f32; 3]),
    RotationLit([f32; 4]),
    ListLit(Vec<Value>),

    // Keywords
    Default,
    State,
    EventKw,
    Jump,
    Return,
    If,
    Else,
    For,
    Do,
    While,
    Print,
    True,
    False,
    Switch,
    Case,
    Break,
    Continue,

    // Punctuation
    Semi,
    LBrace,
    RBrace,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Dot,
    Colon,
    At,

    // Operators
    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    EqEq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    AndAnd,
    OrOr,
    Amp,
    Pipe,
    Caret,
    Tilde,
    Bang,
    Shl,
    Shr,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    PercentEq,
    PipeEq,
    AmpEq,
    CaretEq,
    ShlEq,
    ShrEq,
    PlusPlus,
    MinusMinus,
}

impl Token {
    /// Build the token for a library constant value.
    fn from_const(v: &Value) -> Token {
        match v {
            Value::Integer(i) => Token::IntegerLit(*i),
            Value::Float(f) => Token::FloatLit(*f),
            Value::Str(s) => Token::StringLit(s.clone()),
            Value::Key(k) => Token::KeyLit(k.clone()),
            Value::Vector(v) => Token::VectorLit(*v),
            Value::Rotation(r) => Token::RotationLit(*r),
            Value::List(l) => Token::ListLit(l.clone()),
        }
    }
}

#[inline]
fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

#[inline]
fn is_ident_cont(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

#[inline]
fn is_ws(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | 0x0B | 0x0C)
}

/// The lexer. Owns the option set (inline `#pragma OPT` directives
/// mutate it mid-file) and the `#line` map.
pub struct Lexer<'a> {
    cur: Cursor<'a>,
    pub opts: Options,
    lib: &'a Library,
    pub linemap: LineMap,
    /// File name of the input itself, for error reporting.
    pub filename: String,
    /// File declared by the most recent `#line` directive.
    pub(crate) last_file: Option<String>,
    /// True during the forward-declaration pre-scan; directives are not
    /// processed then.
    pub scanning: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str, opts: Options, lib: &'a Library, filename: &str) -> Self {
        Self {
            cur: Cursor::new(src),
            opts,
            lib,
            linemap: LineMap::new(),
            filename: filename.to_string(),
            last_file: None,
            scanning: false,
        }
    }

    pub fn src(&self) -> &'a str {
        self.cur.src()
    }

    pub fn errorpos(&self) -> usize {
        self.cur.errorpos
    }

    pub fn set_errorpos(&mut self, pos: usize) {
        self.cur.errorpos = pos;
    }

    /// Rewind for the second pass.
    pub fn reset(&mut self) {
        self.cur.reset();
    }

    pub fn snapshot(&self) -> CursorSnapshot {
        self.cur.snapshot()
    }

    pub fn restore(&mut self, snap: CursorSnapshot) {
        self.cur.restore(snap);
    }

    /// Build a compile error at the current error position.
    pub fn error(&self, kind: ErrorKind) -> CompileError {
        let (line, col, file) = line_col(self.cur.src(), self.cur.errorpos, &self.linemap);
        // "<stdin>" from a directive means the main file: use the plain
        // format (or the input's own name in emap mode).
        let file = file.filter(|f| *f != "<stdin>").map(str::to_string);
        CompileError::new(
            kind,
            line,
            col,
            file,
            &self.filename,
            self.opts.emap,
            self.opts.processpre,
        )
    }

    /// Unexpected-EOF error, reported at the end of the source.
    pub fn ueof(&mut self) -> CompileError {
        self.cur.errorpos = self.cur.src().len();
        self.error(ErrorKind::UnexpectedEof)
    }

    /// Scan the next token.
    pub fn next_token(&mut self) -> Result<Token, CompileError> {
        loop {
            if self.cur.is_at_end() {
                return Ok(Token::Eof);
            }
            self.cur.errorpos = self.cur.pos();
            let c = self.cur.bump();

            // Preprocessor directives occupy a whole logical line.
            if self.opts.processpre && self.cur.linestart && c == b'#' {
                let start = self.cur.errorpos;
                while self.cur.peek(0) != b'\n' {
                    if self.cur.is_at_end() {
                        return Ok(Token::Eof);
                    }
                    self.cur.advance(1);
                }
                let line = self.cur.slice(start, self.cur.pos()).to_string();
                if !self.scanning {
                    self.process_directive(&line)?;
                }
                self.cur.advance(1);
                continue;
            }

            // Comments.
            if c == b'/' {
                if self.cur.peek(0) == b'/' {
                    self.cur.advance(1);
                    while self.cur.peek(0) == b' ' || self.cur.peek(0) == b'\t' {
                        self.cur.advance(1);
                    }
                    if self.opts.inline
                        && self.cur.starts_with("pragma inline")
                        && !is_ident_cont(self.cur.peek(13))
                    {
                        while self.cur.peek(0) != b'\n' {
                            if self.cur.is_at_end() {
                                // 'inline' is not emitted if the file
                                // ends before a newline.
                                return Ok(Token::Eof);
                            }
                            self.cur.advance(1);
                        }
                        return Ok(Token::Ident("inline".into()));
                    }
                    while self.cur.peek(0) != b'\n' {
                        if self.cur.is_at_end() {
                            return Ok(Token::Eof);
                        }
                        self.cur.advance(1);
                    }
                    self.cur.linestart = true;
                    self.cur.advance(1);
                    continue;
                }
                if self.cur.peek(0) == b'*' {
                    self.cur.advance(1);
                    if self.opts.inline {
                        let body = self.cur.pos();
                        while self.cur.peek(0) == b' ' || self.cur.peek(0) == b'\t' {
                            self.cur.advance(1);
                        }
                        if self.cur.starts_with("pragma inline") {
                            self.cur.advance("pragma inline".len());
                            while self.cur.peek(0) == b' ' || self.cur.peek(0) == b'\t' {
                                self.cur.advance(1);
                            }
                            if self.cur.starts_with("*/") {
                                self.cur.advance(2);
                                return Ok(Token::Ident("inline".into()));
                            }
                        }
                        self.cur.set_pos(body);
                    }
                    loop {
                        if self.cur.is_at_end() {
                            return Err(self.ueof());
                        }
                        if self.cur.peek(0) == b'*' && self.cur.peek(1) == b'/' {
                            self.cur.advance(2);
                            break;
                        }
                        self.cur.advance(1);
                    }
                    continue;
                }
            }

            // linestart is preprocessor-related, so only actual content
            // clears it; whitespace and comments do not.
            if !is_ws(c) {
                self.cur.linestart = false;
            }

            // Strings, with optional L prefix.
            if c == b'"' || (c == b'L' && self.cur.peek(0) == b'"') {
                if let Some(tok) = self.scan_string(c == b'L')? {
                    return Ok(tok);
                }
                // Not a string after all: reconsider c itself.
                if c == b'L' {
                    return Ok(self.scan_ident(c));
                }
                continue; // ignore the quote
            }

            if is_ident_start(c) {
                return Ok(self.scan_ident(c));
            }

            if c.is_ascii_digit() || (c == b'.' && self.cur.peek(0).is_ascii_digit()) {
                return self.scan_number(c);
            }

            if let Some(tok) = self.scan_operator(c) {
                return Ok(tok);
            }

            if c == b'\n' {
                self.cur.linestart = true;
            }
            // Any other character is silently skipped.
        }
    }

    /// Scan a string literal. The opening quote (and `L` if present) has
    /// been consumed. Returns `None` when the candidate turns out not to
    /// be a string (EOF before the closing quote, or a backslash-newline
    /// line continuation), with the cursor restored to just after the
    /// opening quote.
    fn scan_string(&mut self, lead_l: bool) -> Result<Option<Token>, CompileError> {
        let mut value: Vec<u8> = Vec::new();
        if lead_l {
            self.cur.advance(1); // the quote after L
            value.push(b'"');
        }
        let savepos = self.cur.pos();

        loop {
            if self.cur.is_at_end() {
                // Per the grammar, at EOF it's not considered a string.
                return self.abandon_string(savepos, false);
            }
            let b = self.cur.peek(0);
            if b == b'"' {
                self.cur.advance(1);
                let text = String::from_utf8_lossy(&value).into_owned();
                return Ok(Some(Token::StringLit(text)));
            }
            if b == b'\\' {
                self.cur.advance(1);
                if self.cur.is_at_end() {
                    return Err(self.ueof());
                }
                match self.cur.peek(0) {
                    b'n' => value.push(b'\n'),
                    b't' => value.extend_from_slice(b"    "),
                    b'\n' => {
                        // Backslash-newline: it's not a string.
                        return self.abandon_string(savepos, true);
                    }
                    other => value.push(other),
                }
            } else {
                value.push(b);
            }
            self.cur.advance(1);
        }
    }

    /// Rewind to just after the opening quote so the quote contents get
    /// rescanned as ordinary tokens.
    fn abandon_string(
        &mut self,
        savepos: usize,
        continuation: bool,
    ) -> Result<Option<Token>, CompileError> {
        self.cur.set_pos(savepos);
        if continuation {
            self.cur.linestart = true;
        }
        Ok(None)
    }

    fn scan_ident(&mut self, first: u8) -> Token {
        let mut ident = String::new();
        ident.push(first as char);
        while is_ident_cont(self.cur.peek(0)) {
            ident.push(self.cur.bump() as char);
        }
        self.classify_ident(&ident)
    }

    fn classify_ident(&self, ident: &str) -> Token {
        match ident {
            "default" => return Token::Default,
            "state" => return Token::State,
            "event" => return Token::EventKw,
            "jump" => return Token::Jump,
            "return" => return Token::Return,
            "if" => return Token::If,
            "else" => return Token::Else,
            "for" => return Token::For,
            "do" => return Token::Do,
            "while" => return Token::While,
            "print" => return Token::Print,
            "TRUE" if !self.opts.prettify => return Token::True,
            "FALSE" if !self.opts.prettify => return Token::False,
            "switch" if self.opts.enableswitch => return Token::Switch,
            "case" if self.opts.enableswitch => return Token::Case,
            "break" if self.opts.enableswitch || self.opts.breakcont => return Token::Break,
            "continue" if self.opts.breakcont => return Token::Continue,
            _ => {}
        }
        if let Some(t) = Type::from_name(ident) {
            return Token::TypeName(t);
        }
        if self.lib.events.contains_key(ident) {
            return Token::EventName(ident.to_string());
        }
        if !self.opts.prettify {
            if let Some(v) = self.lib.constants.get(ident) {
                return Token::from_const(v);
            }
        }
        Token::Ident(ident.to_string())
    }

    fn scan_number(&mut self, first: u8) -> Result<Token, CompileError> {
        let mut number = String::new();
        if first != b'.' {
            number.push(first as char);
            while self.cur.peek(0).is_ascii_digit() {
                number.push(self.cur.bump() as char);
            }

            if number == "0"
                && (self.cur.peek(0) | 0x20) == b'x'
                && self.cur.peek(1).is_ascii_hexdigit()
            {
                self.cur.advance(1);
                // Eat leading zeros to know the real length.
                while self.cur.peek(0) == b'0' {
                    self.cur.advance(1);
                }
                let mut hex = String::new();
                while self.cur.peek(0).is_ascii_hexdigit() {
                    if hex.len() < 9 {
                        hex.push(self.cur.peek(0) as char);
                    }
                    self.cur.advance(1);
                }
                if hex.is_empty() {
                    // It was all zeros.
                    return Ok(Token::IntegerLit(0));
                }
                if hex.len() > 8 {
                    return Ok(Token::IntegerLit(-1));
                }
                let v = u32::from_str_radix(&hex, 16).unwrap_or(0);
                return Ok(Token::IntegerLit(v as i32));
            }

            if self.cur.peek(0) == b'.' {
                number.push('.');
                self.cur.advance(1);
            }
        } else {
            number.push('.');
        }

        while self.cur.peek(0).is_ascii_digit() {
            number.push(self.cur.bump() as char);
        }

        // Optional exponent; committed only when at least one digit
        // follows.
        let mut exp = String::new();
        if (self.cur.peek(0) | 0x20) == b'e' {
            let mut ahead = 1;
            let mut cand = String::new();
            cand.push(self.cur.peek(0) as char);
            if self.cur.peek(ahead) == b'+' || self.cur.peek(ahead) == b'-' {
                cand.push(self.cur.peek(ahead) as char);
                ahead += 1;
            }
            if self.cur.peek(ahead).is_ascii_digit() {
                while self.cur.peek(ahead).is_ascii_digit() {
                    cand.push(self.cur.peek(ahead) as char);
                    ahead += 1;
                }
                self.cur.advance(ahead);
                exp = cand;
            }
        }

        if !exp.is_empty() || number.contains('.') {
            if number.contains('.') && (self.cur.peek(0) | 0x20) == b'f' {
                self.cur.advance(1);
            }
            let text = format!("{number}{exp}");
            let v = text.parse::<f64>().unwrap_or(0.0);
            return Ok(Token::FloatLit(v as f32));
        }

        // Decimal integer with 32-bit wrap; overflow yields -1.
        if number.len() > 10 || (number.len() == 10 && number.as_str() > "4294967295") {
            return Ok(Token::IntegerLit(-1));
        }
        let v = number.parse::<u64>().unwrap_or(0) as u32;
        Ok(Token::IntegerLit(v as i32))
    }

    fn scan_operator(&mut self, c: u8) -> Option<Token> {
        let next = self.cur.peek(0);
        let two = [c, next];
        let tok = match &two {
            b"++" => Some(Token::PlusPlus),
            b"--" => Some(Token::MinusMinus),
            b"+=" => Some(Token::PlusEq),
            b"-=" => Some(Token::MinusEq),
            b"*=" => Some(Token::StarEq),
            b"/=" => Some(Token::SlashEq),
            b"%=" => Some(Token::PercentEq),
            b"==" => Some(Token::EqEq),
            b"!=" => Some(Token::NotEq),
            b">=" => Some(Token::GtEq),
            b"<=" => Some(Token::LtEq),
            b"&&" => Some(Token::AndAnd),
            b"||" => Some(Token::OrOr),
            b"<<" => Some(Token::Shl),
            b">>" => Some(Token::Shr),
            b"|=" if self.opts.extendedassignment => Some(Token::PipeEq),
            b"&=" if self.opts.extendedassignment => Some(Token::AmpEq),
            b"^=" if self.opts.extendedassignment => Some(Token::CaretEq),
            _ => None,
        };
        if let Some(tok) = tok {
            self.cur.advance(1);
            if self.opts.extendedassignment && self.cur.peek(0) == b'=' {
                if tok == Token::Shl {
                    self.cur.advance(1);
                    return Some(Token::ShlEq);
                }
                if tok == Token::Shr {
                    self.cur.advance(1);
                    return Some(Token::ShrEq);
                }
            }
            return Some(tok);
        }

        Some(match c {
            b';' => Token::Semi,
            b'{' => Token::LBrace,
            b'}' => Token::RBrace,
            b',' => Token::Comma,
            b'(' => Token::LParen,
            b')' => Token::RParen,
            b'[' => Token::LBracket,
            b']' => Token::RBracket,
            b'.' => Token::Dot,
            b':' => Token::Colon,
            b'@' => Token::At,
            b'=' => Token::Assign,
            b'+' => Token::Plus,
            b'-' => Token::Minus,
            b'*' => Token::Star,
            b'/' => Token::Slash,
            b'%' => Token::Percent,
            b'<' => Token::Lt,
            b'>' => Token::Gt,
            b'&' => Token::Amp,
            b'|' => Token::Pipe,
            b'^' => Token::Caret,
            b'~' => Token::Tilde,
            b'!' => Token::Bang,
            _ => return None,
        })
    }
}

#[cfg(test)]
mod edge_cases;

#[cfg(test)]
mod proptests;

#[cfg(test)]
mod tests {
    use super::*;
    use lslc_lang::builtin_library;

    fn lex_all(src: &str) -> Vec<Token> {
        lex_all_opts(src, Options::default())
    }

    fn lex_all_opts(src: &str, opts: Options) -> Vec<Token> {
        let mut lex = Lexer::new(src, opts, builtin_library(), "<stdin>");
        let mut out = Vec::new();
        loop {
            let tok = lex.next_token().expect("lex error");
            let done = tok == Token::Eof;
            out.push(tok);
            if done {
                return out;
            }
        }
    }

    #[test]
    fn basic_declaration() {
        assert_eq!(
            lex_all("integer x = 42;"),
            vec![
                Token::TypeName(Type::Integer),
                Token::Ident("x".into()),
                Token::Assign,
                Token::IntegerLit(42),
                Token::Semi,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn hex_literals_wrap() {
        assert_eq!(lex_all("0x7FFFFFFF")[0], Token::IntegerLit(0x7FFFFFFF));
        assert_eq!(lex_all("0xFFFFFFFF")[0], Token::IntegerLit(-1));
        assert_eq!(lex_all("0x100000000")[0], Token::IntegerLit(-1)); // overflow
        assert_eq!(lex_all("0x00000000012")[0], Token::IntegerLit(0x12));
        assert_eq!(lex_all("0x0")[0], Token::IntegerLit(0));
    }

    #[test]
    fn decimal_overflow_is_minus_one() {
        assert_eq!(lex_all("4294967295")[0], Token::IntegerLit(-1));
        assert_eq!(lex_all("4294967296")[0], Token::IntegerLit(-1));
        assert_eq!(lex_all("2147483648")[0], Token::IntegerLit(i32::MIN));
        assert_eq!(lex_all("99999999999")[0], Token::IntegerLit(-1));
    }

    #[test]
    fn float_forms() {
        assert_eq!(lex_all("1.5")[0], Token::FloatLit(1.5));
        assert_eq!(lex_all(".5")[0], Token::FloatLit(0.5));
        assert_eq!(lex_all("1.")[0], Token::FloatLit(1.0));
        assert_eq!(lex_all("1e3")[0], Token::FloatLit(1000.0));
        assert_eq!(lex_all("1.5e-1")[0], Token::FloatLit(0.15));
        assert_eq!(lex_all("2.5f")[0], Token::FloatLit(2.5));
    }

    #[test]
    fn exponent_backtracks_without_digits() {
        // "1e" is integer 1 followed by identifier e.
        assert_eq!(
            lex_all("1e"),
            vec![Token::IntegerLit(1), Token::Ident("e".into()), Token::Eof]
        );
    }

    #[test]
    fn lone_dot_is_a_dot() {
        assert_eq!(
            lex_all("v.x"),
            vec![
                Token::Ident("v".into()),
                Token::Dot,
                Token::Ident("x".into()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn string_escapes() {
        assert_eq!(
            lex_all(r#""a\nb""#)[0],
            Token::StringLit("a\nb".into())
        );
        // \t produces four spaces, LSL semantics.
        assert_eq!(
            lex_all(r#""a\tb""#)[0],
            Token::StringLit("a    b".into())
        );
        // Any other escaped character is itself.
        assert_eq!(
            lex_all(r#""a\"b\\c""#)[0],
            Token::StringLit("a\"b\\c".into())
        );
    }

    #[test]
    fn l_string_keeps_leading_quote() {
        assert_eq!(lex_all(r#"L"x""#)[0], Token::StringLit("\"x".into()));
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            lex_all("1 // c\n/* block\nmore */ 2"),
            vec![Token::IntegerLit(1), Token::IntegerLit(2), Token::Eof]
        );
    }

    #[test]
    fn unterminated_block_comment_is_ueof() {
        let mut lex = Lexer::new("/* oops", Options::default(), builtin_library(), "<stdin>");
        let err = lex.next_token().unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnexpectedEof);
    }

    #[test]
    fn keywords_vs_identifiers() {
        assert_eq!(lex_all("default")[0], Token::Default);
        assert_eq!(lex_all("TRUE")[0], Token::True);
        // switch is an identifier unless the option is on
        assert_eq!(lex_all("switch")[0], Token::Ident("switch".into()));
        let mut opts = Options::default();
        opts.enableswitch = true;
        assert_eq!(lex_all_opts("switch", opts)[0], Token::Switch);
        assert_eq!(lex_all_opts("break", opts)[0], Token::Break);
        assert_eq!(
            lex_all_opts("continue", opts)[0],
            Token::Ident("continue".into())
        );
    }

    #[test]
    fn quaternion_normalizes_to_rotation() {
        assert_eq!(lex_all("quaternion")[0], Token::TypeName(Type::Rotation));
    }

    #[test]
    fn event_names_and_constants() {
        assert_eq!(lex_all("timer")[0], Token::EventName("timer".into()));
        assert_eq!(
            lex_all("ZERO_VECTOR")[0],
            Token::VectorLit([0.0, 0.0, 0.0])
        );
        assert_eq!(
            lex_all("NULL_KEY")[0],
            Token::KeyLit("00000000-0000-0000-0000-000000000000".into())
        );
    }

    #[test]
    fn multichar_operators_greedy() {
        assert_eq!(
            lex_all("a<<=b"),
            vec![
                Token::Ident("a".into()),
                Token::Shl,
                Token::Assign,
                Token::Ident("b".into()),
                Token::Eof
            ]
        );
        let mut opts = Options::default();
        opts.extendedassignment = true;
        assert_eq!(
            lex_all_opts("a<<=b", opts),
            vec![
                Token::Ident("a".into()),
                Token::ShlEq,
                Token::Ident("b".into()),
                Token::Eof
            ]
        );
        assert_eq!(lex_all("x++ --y")[1], Token::PlusPlus);
        assert_eq!(lex_all("x++ --y")[2], Token::MinusMinus);
    }

    #[test]
    fn pragma_inline_comments() {
        let mut opts = Options::default();
        opts.inline = true;
        assert_eq!(
            lex_all_opts("f() // pragma inline\n{}", opts)[3],
            Token::Ident("inline".into())
        );
        assert_eq!(
            lex_all_opts("f() /*pragma inline*/ {}", opts)[3],
            Token::Ident("inline".into())
        );
        // Without the option they are plain comments.
        assert_eq!(
            lex_all("f() /*pragma inline*/ {}")[3],
            Token::LBrace
        );
    }

    #[test]
    fn pragma_opt_toggles_options() {
        let mut opts = Options::default();
        opts.processpre = true;
        let src = "#pragma OPT +enableswitch\nswitch";
        let mut lex = Lexer::new(src, opts, builtin_library(), "<stdin>");
        assert_eq!(lex.next_token().unwrap(), Token::Switch);
    }

    #[test]
    fn line_directive_feeds_error_map() {
        let mut opts = Options::default();
        opts.processpre = true;
        let src = "#line 40 \"inc.lsl\"\n$";
        let mut lex = Lexer::new(src, opts, builtin_library(), "<stdin>");
        // '$' is skipped silently; just force tokenization.
        assert_eq!(lex.next_token().unwrap(), Token::Eof);
        assert!(!lex.linemap.is_empty());
    }

    #[test]
    fn directives_ignored_when_disabled() {
        // Without processpre, '#' is silently skipped and the rest is
        // tokenized normally.
        let toks = lex_all("#x\n1");
        assert_eq!(
            toks,
            vec![Token::Ident("x".into()), Token::IntegerLit(1), Token::Eof]
        );
    }
}
