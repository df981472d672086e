//! Top-level item parsing: globals, functions, states, events.
//!
//! Global initializers use LSL's restricted "simple expression" grammar
//! unless `extendedglobalexpr` is on, in which case a simple parse is
//! tried first and the full expression parser is used as fallback
//! (with forward references to globals disabled while inside the
//! initializer, to prevent circular definitions).

use lslc_lang::{Type, Value};
use lslc_lex::Token;
use lslc_util::ErrorKind;

use crate::ast::{Node, NodeKind};
use crate::symtab::{ScopeId, SymKind, Symbol};
use crate::{CompileError, Parser, StSw};

impl Parser<'_> {
    /// script: globals states EOF
    pub(crate) fn parse_script(&mut self) -> Result<(), CompileError> {
        self.parse_globals()?;
        self.parse_states()?;
        self.expect(&Token::Eof)?;
        debug_assert_eq!(self.scopestack, vec![ScopeId::GLOBAL]);
        self.resolve_jumps()
    }

    /// globals: LAMBDA | globals var_def | globals func_def
    fn parse_globals(&mut self) -> Result<(), CompileError> {
        while matches!(self.tok, Token::TypeName(_) | Token::Ident(_)) {
            let mut typ = None;
            if let Token::TypeName(t) = self.tok {
                typ = Some(t);
                self.next()?;
            }
            let name = self.expect_ident()?;
            self.next()?;

            if self.symtab.contains(ScopeId::GLOBAL, &name) {
                // Duplicate identifier, unless function override is in
                // effect and both are user-defined functions.
                let mut report = true;
                if self.lex.opts.funcoverride && self.tok == Token::LParen {
                    let overridable = self
                        .symtab
                        .get(ScopeId::GLOBAL, &name)
                        .map(|s| s.is_udf())
                        .unwrap_or(false);
                    if overridable {
                        report = false;
                        // Erase the previous definition.
                        if let Some(loc) =
                            self.symtab.get(ScopeId::GLOBAL, &name).and_then(|s| s.loc)
                        {
                            self.tree[loc] = Node::default();
                        }
                        self.symtab.remove_global(&name);
                    }
                }
                if report {
                    return self.err(ErrorKind::AlreadyDefined);
                }
            }

            match self.tok {
                Token::Assign | Token::Semi => self.parse_global_var(name, typ)?,
                Token::LParen => self.parse_function(name, typ)?,
                _ => return self.syntax_err(),
            }
        }
        Ok(())
    }

    /// var_def: TYPE IDENT ';' | TYPE IDENT '=' simple_expr ';'
    fn parse_global_var(
        &mut self,
        name: String,
        typ: Option<Type>,
    ) -> Result<(), CompileError> {
        let typ = match typ {
            Some(t) => t,
            // Typeless variables are not allowed.
            None => return self.syntax_err(),
        };

        let value = if self.tok == Token::Assign {
            self.next()?;
            if self.lex.opts.extendedglobalexpr {
                // Try the dull simple expression first; fall back to
                // the full expression parser. Forward references to
                // globals are disallowed in the extended form.
                self.disallowglobalvars = true;
                let snap = self.lex.snapshot();
                let tok_save = self.tok.clone();
                let attempt = self
                    .parse_simple_expr(false)
                    .and_then(|v| self.expect(&Token::Semi).map(|()| v));
                let value = match attempt {
                    Ok(v) => v,
                    Err(_) => {
                        self.lex.restore(snap);
                        self.tok = tok_save;
                        let v = self.parse_expression()?;
                        self.expect(&Token::Semi)?;
                        v
                    }
                };
                self.disallowglobalvars = false;
                Some(value)
            } else {
                let v = self.parse_simple_expr(false)?;
                self.expect(&Token::Semi)?;
                Some(v)
            }
        } else {
            None
        };

        let mut decl = Node::new(
            NodeKind::Decl {
                name: name.clone(),
                scope: ScopeId::GLOBAL,
            },
            Some(typ),
        );
        if let Some(value) = value {
            let value = self.autocast(value, typ)?;
            decl.ch.push(value);
        }
        self.next()?;

        let mut sym = Symbol::var(typ, ScopeId::GLOBAL);
        sym.loc = Some(self.tree.len());
        self.symtab.insert(ScopeId::GLOBAL, &name, sym);
        self.tree.push(decl);
        Ok(())
    }

    /// func_def: optional_type IDENT '(' optional_param_list ')' code_block
    fn parse_function(&mut self, name: String, typ: Option<Type>) -> Result<(), CompileError> {
        self.next()?;
        let paramscope = self.push_scope();
        let (ptypes, pnames) = self.parse_optional_param_list()?;
        self.want(&Token::RParen)?;

        self.localevents = None;
        self.locallabels.clear();
        let mut force_inline = false;
        if self.lex.opts.inline && matches!(&self.tok, Token::Ident(n) if n == "inline") {
            self.next()?;
            force_inline = true;
        }

        let body = self.parse_code_block(typ, StSw::Deny, false, false)?;
        if typ.is_some() && !body.lir {
            let pos = self.closebrace;
            return self.err_at(pos, ErrorKind::CodePathWithoutRet);
        }

        let mut sym = Symbol::func(typ, ptypes.clone(), Some(pnames.clone()), force_inline);
        sym.loc = Some(self.tree.len());
        self.symtab.insert(ScopeId::GLOBAL, &name, sym);
        self.tree.push(Node::with_children(
            NodeKind::FnDef {
                name,
                scope: Some(ScopeId::GLOBAL),
                pscope: paramscope,
                ptypes,
                pnames,
            },
            typ,
            vec![body],
        ));
        self.pop_scope();
        debug_assert_eq!(self.cur_scope(), ScopeId::GLOBAL);
        Ok(())
    }

    /// optional_param_list: LAMBDA | param_list
    fn parse_optional_param_list(
        &mut self,
    ) -> Result<(Vec<Type>, Vec<String>), CompileError> {
        let mut types = Vec::new();
        let mut names = Vec::new();
        if let Token::TypeName(_) = self.tok {
            loop {
                let typ = match self.tok {
                    Token::TypeName(t) => t,
                    _ => return self.syntax_err(),
                };
                self.next()?;
                let name = self.expect_ident()?;
                let scope = self.cur_scope();
                if self.symtab.contains(scope, &name) {
                    return self.err(ErrorKind::AlreadyDefined);
                }
                types.push(typ);
                names.push(name.clone());
                self.symtab.insert(scope, &name, Symbol::param(typ, scope));
                self.next()?;
                if self.tok != Token::Comma {
                    break;
                }
                self.next()?;
                if !matches!(self.tok, Token::TypeName(_)) {
                    return self.syntax_err();
                }
            }
        }
        Ok((types, names))
    }

    /// states: state | states state (the first must be `default`)
    fn parse_states(&mut self) -> Result<(), CompileError> {
        self.expect(&Token::Default)?;

        loop {
            let name = match self.tok {
                Token::Default => "default".to_string(),
                Token::State => {
                    self.next()?;
                    match &self.tok {
                        Token::Ident(n) => n.clone(),
                        _ => return self.syntax_err(),
                    }
                }
                _ => return Ok(()),
            };

            if self.symtab.contains(ScopeId::GLOBAL, &name) {
                return self.err(ErrorKind::AlreadyDefined);
            }
            let mut sym = Symbol::state();
            sym.loc = Some(self.tree.len());
            self.symtab.insert(ScopeId::GLOBAL, &name, sym);
            self.next()?;

            self.want(&Token::LBrace)?;
            self.localevents = Some(Default::default());
            let events = self.parse_events()?;
            self.localevents = None;
            self.expect(&Token::RBrace)?;
            self.tree.push(Node::with_children(
                NodeKind::StateDef { name },
                None,
                events,
            ));
            self.next()?;
        }
    }

    /// events: event | events event
    fn parse_events(&mut self) -> Result<Vec<Node>, CompileError> {
        // At least one event is mandatory.
        if !matches!(self.tok, Token::EventName(_)) {
            return self.syntax_err();
        }

        let mut ret = Vec::new();
        while let Token::EventName(name) = &self.tok {
            let name = name.clone();
            self.next()?;
            let already = self
                .localevents
                .as_ref()
                .map(|s| s.contains(&name))
                .unwrap_or(false);
            if already {
                return self.err(ErrorKind::AlreadyDefined);
            }
            if let Some(ev) = self.localevents.as_mut() {
                ev.insert(name.clone());
            }
            self.want(&Token::LParen)?;
            let paramscope = self.push_scope();
            let (ptypes, pnames) = self.parse_optional_param_list()?;
            self.want(&Token::RParen)?;
            let expected = self.lib.events.get(&name).map(|e| e.param_types.clone());
            if expected.as_deref() != Some(&ptypes[..]) {
                return self.syntax_err();
            }
            self.locallabels.clear();
            let body = self.parse_code_block(None, StSw::Deny, false, false)?;
            self.symtab.insert(
                paramscope,
                &name,
                Symbol::event(ptypes.clone(), pnames.clone(), paramscope),
            );
            ret.push(Node::with_children(
                NodeKind::FnDef {
                    name,
                    // Event names are reserved words, not globals.
                    scope: None,
                    pscope: paramscope,
                    ptypes,
                    pnames,
                },
                None,
                vec![body],
            ));
            self.pop_scope();
        }
        Ok(ret)
    }

    /// simple_expr: the restricted global-initializer grammar: scalar
    /// literals with optional sign, identifiers of earlier globals,
    /// vector/rotation literals of simple exprs, and (outside lists)
    /// list literals of the above.
    pub(crate) fn parse_simple_expr(&mut self, forbid_list: bool) -> Result<Node, CompileError> {
        let tok = self.tok.clone();
        self.next()?;
        match tok {
            Token::True => Ok(Node::const_val(Value::Integer(1))),
            Token::False => Ok(Node::const_val(Value::Integer(0))),
            Token::StringLit(s) => {
                let mut s = s;
                if self.lex.opts.allowmultistrings {
                    while let Token::StringLit(s2) = &self.tok {
                        s.push_str(s2);
                        self.next()?;
                    }
                }
                Ok(Node::const_val(Value::Str(s)))
            }
            Token::KeyLit(k) => Ok(Node::const_val(Value::Key(k))),
            Token::VectorLit(v) => Ok(Node::const_val(Value::Vector(v))),
            Token::RotationLit(r) => Ok(Node::const_val(Value::Rotation(r))),
            Token::ListLit(l) => Ok(Node::const_val(Value::List(l))),
            Token::Ident(name) => {
                // The engine accepts library function names here as
                // variables; only variables and non-UDF functions pass.
                let sym = match self.find_partial(&name) {
                    Some(s) => s.clone(),
                    None => return self.err(ErrorKind::Undefined),
                };
                let ok = match &sym.kind {
                    SymKind::Var { .. } => true,
                    SymKind::Func { param_names, .. } => param_names.is_none(),
                    _ => false,
                };
                if !ok {
                    return self.err(ErrorKind::Undefined);
                }
                let (typ, scope) = match &sym.kind {
                    SymKind::Var { ty, .. } => (*ty, sym.scope),
                    _ => (
                        sym.func_ret().unwrap_or(Type::Integer),
                        ScopeId::GLOBAL,
                    ),
                };
                Ok(Node::new(NodeKind::Ident { name, scope }, Some(typ)))
            }
            Token::Lt => {
                let mut value = Vec::new();
                for _ in 0..3 {
                    let c = self.parse_simple_expr(forbid_list)?;
                    let c = self.autocast(c, Type::Float)?;
                    value.push(c);
                    if value.len() < 3 {
                        self.want(&Token::Comma)?;
                    }
                }
                if self.tok == Token::Gt {
                    self.next()?;
                    return Ok(Node::with_children(
                        NodeKind::VectorLit,
                        Some(Type::Vector),
                        value,
                    ));
                }
                self.want(&Token::Comma)?;
                let c = self.parse_simple_expr(forbid_list)?;
                let c = self.autocast(c, Type::Float)?;
                value.push(c);
                self.want(&Token::Gt)?;
                Ok(Node::with_children(
                    NodeKind::RotationLit,
                    Some(Type::Rotation),
                    value,
                ))
            }
            Token::LBracket if !forbid_list => {
                let mut value = Vec::new();
                if self.tok == Token::RBracket {
                    self.next()?;
                    return Ok(Node::with_children(
                        NodeKind::ListLit,
                        Some(Type::List),
                        value,
                    ));
                }
                loop {
                    value.push(self.parse_simple_expr(true)?);
                    if self.tok == Token::RBracket {
                        self.next()?;
                        return Ok(Node::with_children(
                            NodeKind::ListLit,
                            Some(Type::List),
                            value,
                        ));
                    }
                    self.want(&Token::Comma)?;
                }
            }
            tok0 => {
                // Integer or float constant, with optional sign.
                let (neg, tok0) = if tok0 == Token::Minus {
                    let t = self.tok.clone();
                    self.next()?;
                    (true, t)
                } else {
                    (false, tok0)
                };
                match tok0 {
                    Token::IntegerLit(v) => {
                        let v = if neg && v != i32::MIN { -v } else { v };
                        Ok(Node::const_val(Value::Integer(v)))
                    }
                    Token::FloatLit(v) => {
                        let v = if neg { -v } else { v };
                        Ok(Node::const_val(Value::Float(v)))
                    }
                    _ => self.syntax_err(),
                }
            }
        }
    }
}
