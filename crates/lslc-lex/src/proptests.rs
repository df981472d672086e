//! Property-based lexer tests.
//!
//! The numeric recognizers carry the riskiest edge cases (hex
//! wraparound, decimal overflow, exponent backtracking), so they get
//! exercised over generated inputs rather than hand-picked ones. The
//! first property is the blanket one: no input, however mangled, may
//! panic the lexer or keep it from reaching EOF.

use proptest::prelude::*;

use crate::{Lexer, Token};
use lslc_lang::builtin_library;
use lslc_util::Options;

fn first_token(src: &str) -> Token {
    let mut lex = Lexer::new(src, Options::default(), builtin_library(), "<stdin>");
    lex.next_token().expect("lex error")
}

fn all_tokens(src: &str) -> Vec<Token> {
    let mut lex = Lexer::new(src, Options::default(), builtin_library(), "<stdin>");
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

proptest! {
    #[test]
    fn arbitrary_input_never_panics_or_hangs(src in any::<String>()) {
        let mut lex = Lexer::new(&src, Options::default(), builtin_library(), "<stdin>");
        let mut produced = 0usize;
        loop {
            match lex.next_token() {
                Ok(Token::Eof) | Err(_) => break,
                Ok(_) => {
                    produced += 1;
                    // Every token consumes at least one byte.
                    prop_assert!(produced <= src.len());
                }
            }
        }
    }

    #[test]
    fn decimal_literals_wrap_to_32_bits(n in any::<u32>()) {
        prop_assert_eq!(first_token(&n.to_string()), Token::IntegerLit(n as i32));
    }

    #[test]
    fn decimal_overflow_is_minus_one(n in (u32::MAX as u64 + 1)..=99_999_999_999u64) {
        prop_assert_eq!(first_token(&n.to_string()), Token::IntegerLit(-1));
    }

    #[test]
    fn hex_literals_wrap_and_ignore_leading_zeros(n in any::<u32>(), zeros in 0usize..4) {
        let src = format!("0x{}{:X}", "0".repeat(zeros), n);
        prop_assert_eq!(first_token(&src), Token::IntegerLit(n as i32));
    }

    #[test]
    fn exponent_without_digits_backtracks(n in 1u32..1_000_000u32) {
        // "123e" is the integer followed by the identifier e; the
        // exponent scan must not consume the letter.
        let toks = all_tokens(&format!("{n}e"));
        prop_assert_eq!(
            toks,
            vec![
                Token::IntegerLit(n as i32),
                Token::Ident("e".to_string()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn float_display_round_trips(f in any::<f32>()) {
        prop_assume!(f.is_finite());
        let f = f.abs();
        let printed = format!("{f}");
        // Integral values print without a dot and lex as integers;
        // only float-shaped text is interesting here.
        prop_assume!(printed.contains('.'));
        prop_assert_eq!(first_token(&printed), Token::FloatLit(f));
    }

    #[test]
    fn plain_strings_round_trip(s in "[a-zA-Z0-9 _.,;:]*") {
        prop_assert_eq!(
            first_token(&format!("\"{s}\"")),
            Token::StringLit(s)
        );
    }
}
