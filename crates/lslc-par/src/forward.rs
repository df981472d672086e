//! Forward-declaration pre-scan.
//!
//! A fast partial pass over the token stream that collects global
//! variable types, function signatures, and state names, without
//! building an AST or checking types. Its only purpose is to let the
//! real parse resolve forward references; the authoritative symbol
//! replaces each entry as the definition is actually parsed. If the
//! script has a syntax error the scan just stops early and returns what
//! it has; the real parse will pinpoint the error.

use lslc_lang::Type;
use lslc_lex::{Lexer, Token};
use lslc_util::CompileError;
use rustc_hash::FxHashMap;

use crate::symtab::{ScopeId, Symbol};

/// A provisional global gathered by the scan.
#[derive(Clone, Debug)]
pub enum ForwardEntry {
    Var {
        ty: Type,
    },
    Func {
        ret: Option<Type>,
        param_types: Vec<Type>,
        /// The definition has not been parsed for real yet.
        unseen: bool,
    },
    State,
}

impl ForwardEntry {
    /// View the entry as a symbol (no location: the definition is not
    /// parsed yet).
    pub fn to_symbol(&self) -> Symbol {
        match self {
            ForwardEntry::Var { ty } => Symbol::var(*ty, ScopeId::GLOBAL),
            ForwardEntry::Func {
                ret, param_types, ..
            } => Symbol::func(*ret, param_types.clone(), None, false),
            ForwardEntry::State => Symbol::state(),
        }
    }
}

pub type ForwardGlobals = FxHashMap<String, ForwardEntry>;

/// Run the scan over a fresh lexer positioned at the start.
pub fn scan(lex: &mut Lexer<'_>) -> ForwardGlobals {
    let mut out = FxHashMap::default();
    let _ = scan_inner(lex, &mut out);
    out
}

/// Skip tokens until the brace opened just before is matched.
fn skip_braced(lex: &mut Lexer<'_>, tok: &mut Token) -> Result<(), CompileError> {
    let mut depth = 1usize;
    while depth > 0 && *tok != Token::Eof {
        match tok {
            Token::LBrace => depth += 1,
            Token::RBrace => depth -= 1,
            _ => {}
        }
        *tok = lex.next_token()?;
    }
    Ok(())
}

fn scan_inner(lex: &mut Lexer<'_>, out: &mut ForwardGlobals) -> Result<(), CompileError> {
    let mut tok = lex.next_token()?;

    // Globals: variables and function definitions.
    loop {
        if matches!(tok, Token::Default | Token::Eof) {
            break;
        }
        let mut typ = None;
        if let Token::TypeName(t) = tok {
            typ = Some(t);
            tok = lex.next_token()?;
        }
        let name = match &tok {
            Token::Ident(n) => n.clone(),
            _ => return Ok(()),
        };
        tok = lex.next_token()?;

        if tok == Token::LParen {
            tok = lex.next_token()?;
            let mut params = Vec::new();
            if tok != Token::RParen {
                loop {
                    match tok {
                        Token::TypeName(t) => params.push(t),
                        _ => return Ok(()),
                    }
                    // Parameter names are not interesting here.
                    lex.next_token()?;
                    tok = lex.next_token()?;
                    if tok != Token::Comma {
                        break;
                    }
                    tok = lex.next_token()?;
                }
            }
            tok = lex.next_token()?;
            if matches!(&tok, Token::Ident(n) if n == "inline") {
                tok = lex.next_token()?;
            }
            if tok != Token::LBrace {
                return Ok(());
            }
            tok = lex.next_token()?;
            skip_braced(lex, &mut tok)?;
            out.insert(
                name,
                ForwardEntry::Func {
                    ret: typ,
                    param_types: params,
                    unseen: true,
                },
            );
        } else if let Some(ty) = typ {
            out.insert(name, ForwardEntry::Var { ty });
            // Skip to the terminating semicolon.
            while tok != Token::Semi {
                if tok == Token::Eof {
                    return Ok(());
                }
                tok = lex.next_token()?;
            }
            tok = lex.next_token()?;
        } else {
            // A variable needs a type.
            return Ok(());
        }
    }

    // States.
    loop {
        let name = match &tok {
            Token::Default => "default".to_string(),
            Token::State => {
                tok = lex.next_token()?;
                match &tok {
                    Token::Ident(n) => n.clone(),
                    _ => return Ok(()),
                }
            }
            _ => return Ok(()),
        };
        out.insert(name, ForwardEntry::State);
        tok = lex.next_token()?;
        if tok != Token::LBrace {
            return Ok(());
        }
        tok = lex.next_token()?;
        skip_braced(lex, &mut tok)?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lslc_lang::builtin_library;
    use lslc_util::Options;

    fn scan_src(src: &str) -> ForwardGlobals {
        let mut lex = Lexer::new(src, Options::default(), builtin_library(), "<stdin>");
        lex.scanning = true;
        scan(&mut lex)
    }

    #[test]
    fn collects_globals_and_functions() {
        let g = scan_src(
            "integer counter = 3;\n\
             float helper(integer a, string b) { if (a) { a; } return 1.0; }\n\
             ping() { }\n\
             default { state_entry() { } }",
        );
        assert!(matches!(
            g.get("counter"),
            Some(ForwardEntry::Var { ty: Type::Integer })
        ));
        match g.get("helper") {
            Some(ForwardEntry::Func {
                ret,
                param_types,
                unseen,
            }) => {
                assert_eq!(*ret, Some(Type::Float));
                assert_eq!(param_types, &[Type::Integer, Type::String]);
                assert!(unseen);
            }
            other => panic!("helper not scanned: {other:?}"),
        }
        assert!(matches!(g.get("ping"), Some(ForwardEntry::Func { ret: None, .. })));
        assert!(matches!(g.get("default"), Some(ForwardEntry::State)));
    }

    #[test]
    fn collects_extra_states() {
        let g = scan_src("default { timer() { } } state armed { timer() { } }");
        assert!(matches!(g.get("armed"), Some(ForwardEntry::State)));
    }

    #[test]
    fn syntax_errors_stop_the_scan_quietly() {
        let g = scan_src("integer ok; integer = ; default {}");
        assert!(g.contains_key("ok"));
        // The malformed declaration simply ends the scan.
        assert_eq!(g.len(), 1);
    }
}
