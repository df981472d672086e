//! Edge-case tests for the lexer.

use crate::{Lexer, Token};
use lslc_lang::builtin_library;
use lslc_util::{ErrorKind, Options};

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

fn lex_all(src: &str) -> Vec<Token> {
    lex_all_opts(src, Options::default())
}

#[test]
fn empty_source() {
    assert_eq!(lex_all(""), vec![Token::Eof]);
    assert_eq!(lex_all("   \n\t  "), vec![Token::Eof]);
}

#[test]
fn unterminated_string_is_not_a_string() {
    // The quote is dropped and the contents re-lexed as tokens.
    assert_eq!(
        lex_all("\"abc"),
        vec![Token::Ident("abc".into()), Token::Eof]
    );
}

#[test]
fn backslash_newline_aborts_string() {
    // A backslash followed by a newline means this is no string; the
    // contents are re-scanned.
    let toks = lex_all("\"a\\\nb\"");
    assert_eq!(
        toks,
        vec![Token::Ident("a".into()), Token::Ident("b".into()), Token::Eof]
    );
}

#[test]
fn escape_at_eof_is_unexpected_eof() {
    let mut lex = Lexer::new("\"a\\", Options::default(), builtin_library(), "<stdin>");
    assert_eq!(lex.next_token().unwrap_err().kind, ErrorKind::UnexpectedEof);
}

#[test]
fn adjacent_strings_stay_separate_tokens() {
    // Concatenation of adjacent strings is the parser's job (option
    // allowmultistrings); the lexer always emits separate tokens.
    assert_eq!(
        lex_all("\"a\" \"b\""),
        vec![
            Token::StringLit("a".into()),
            Token::StringLit("b".into()),
            Token::Eof
        ]
    );
}

#[test]
fn multibyte_string_contents_survive() {
    assert_eq!(
        lex_all("\"áé≥\"")[0],
        Token::StringLit("áé≥".into())
    );
}

#[test]
fn float_exponent_with_f_suffix_is_not_eaten() {
    // The F suffix is only consumed after a decimal point.
    let toks = lex_all("1e5f");
    assert_eq!(toks[0], Token::FloatLit(1e5));
    assert_eq!(toks[1], Token::Ident("f".into()));
}

#[test]
fn number_followed_by_dot_dot() {
    // "1." is a float; a second dot is punctuation.
    let toks = lex_all("1..");
    assert_eq!(toks, vec![Token::FloatLit(1.0), Token::Dot, Token::Eof]);
}

#[test]
fn unknown_characters_are_skipped() {
    assert_eq!(
        lex_all("a $ b ` c"),
        vec![
            Token::Ident("a".into()),
            Token::Ident("b".into()),
            Token::Ident("c".into()),
            Token::Eof
        ]
    );
}

#[test]
fn directive_requires_line_start() {
    let mut opts = Options::default();
    opts.processpre = true;
    // '#' not at line start: skipped as an unknown character, the rest
    // lexes normally.
    let toks = lex_all_opts("a #pragma\n", opts);
    assert_eq!(
        toks,
        vec![
            Token::Ident("a".into()),
            Token::Ident("pragma".into()),
            Token::Eof
        ]
    );
}

#[test]
fn directive_after_comment_keeps_line_start() {
    let mut opts = Options::default();
    opts.processpre = true;
    opts.enableswitch = false;
    // A comment ending in newline re-arms linestart.
    let src = "// c\n#pragma OPT +enableswitch\nswitch";
    let mut lex = Lexer::new(src, opts, builtin_library(), "<stdin>");
    assert_eq!(lex.next_token().unwrap(), Token::Switch);
}

#[test]
fn directive_ending_in_backslash_errors() {
    let mut opts = Options::default();
    opts.processpre = true;
    let mut lex = Lexer::new(
        "#define X \\\n1\n",
        opts,
        builtin_library(),
        "<stdin>",
    );
    assert_eq!(
        lex.next_token().unwrap_err().kind,
        ErrorKind::InvalidBackslash
    );
}

#[test]
fn prettify_disables_true_false_and_constants() {
    let mut opts = Options::default();
    opts.prettify = true;
    assert_eq!(lex_all_opts("TRUE", opts)[0], Token::Ident("TRUE".into()));
    assert_eq!(
        lex_all_opts("ZERO_VECTOR", opts)[0],
        Token::Ident("ZERO_VECTOR".into())
    );
}

#[test]
fn pragma_inline_requires_word_boundary() {
    let mut opts = Options::default();
    opts.inline = true;
    // "pragma inliner" is not the magic comment.
    let toks = lex_all_opts("//pragma inliner\n1", opts);
    assert_eq!(toks, vec![Token::IntegerLit(1), Token::Eof]);
}
