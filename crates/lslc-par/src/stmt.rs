//! Statement parsing.
//!
//! Statements carry three pieces of context besides the enclosing
//! function's return type: whether a declaration is allowed (only
//! directly inside a block), whether a state-change statement is legal
//! (`StSw`), and whether `case`/`break`/`continue` make sense here.
//!
//! `switch` is desugared at parse time into a prelude of
//! `if (expr == caseexpr) jump L_i;` statements plus a default jump,
//! followed by the original block with the case labels replaced by
//! generated labels. `break` and `continue` become jumps to generated
//! labels tracked on dedicated stacks; only referenced labels are
//! emitted.

use lslc_lang::Type;
use lslc_lex::Token;
use lslc_util::ErrorKind;

use crate::ast::{BinOp, Node, NodeKind};
use crate::forward::ForwardEntry;
use crate::symtab::{ScopeId, Symbol};
use crate::{does_something, CompileError, LoopLabel, Parser, StSw};

use crate::expr::ArgTypes;

impl Parser<'_> {
    /// statement: ';' | single_statement | code_block
    pub(crate) fn parse_statement(
        &mut self,
        ret_type: Option<Type>,
        allow_decl: bool,
        allow_stsw: StSw,
        inside_switch: bool,
        inside_loop: bool,
    ) -> Result<Node, CompileError> {
        match self.tok {
            Token::LBrace => self.parse_code_block(ret_type, allow_stsw, inside_switch, inside_loop),
            Token::Semi => {
                self.next()?;
                Ok(Node::new(NodeKind::Empty, None))
            }
            Token::At => self.parse_label(allow_decl),
            Token::Jump => self.parse_jump(),
            Token::State => self.parse_state_switch(allow_stsw),
            Token::Return => self.parse_return(ret_type, allow_stsw),
            Token::If => self.parse_if(ret_type, allow_stsw, inside_loop),
            Token::While => self.parse_while(ret_type),
            Token::Do => self.parse_do(ret_type),
            Token::For => self.parse_for(ret_type),
            Token::Switch => self.parse_switch(ret_type, allow_stsw, inside_loop),
            Token::Case => self.parse_case(inside_switch),
            Token::Default if self.lex.opts.enableswitch => {
                self.parse_default_case(inside_switch)
            }
            Token::Break => self.parse_break(),
            Token::Continue => self.parse_continue(),
            Token::TypeName(typ) => self.parse_declaration(typ, allow_decl),
            _ => {
                // Expression statement.
                let save = self.allow_void;
                self.allow_void = true;
                let value = self.parse_expression();
                self.allow_void = save;
                let value = value?;
                self.want(&Token::Semi)?;
                let ty = value.ty;
                Ok(Node::with_children(NodeKind::ExprStmt, ty, vec![value]))
            }
        }
    }

    /// code_block: '{' statements '}'
    pub(crate) fn parse_code_block(
        &mut self,
        ret_type: Option<Type>,
        allow_stsw: StSw,
        inside_switch: bool,
        inside_loop: bool,
    ) -> Result<Node, CompileError> {
        self.want(&Token::LBrace)?;
        let scope = self.push_scope();

        // The scope for pending break (switch) / continue (loop) labels
        // is this block's.
        if inside_switch {
            if let Some(top) = self.breakstack.last_mut() {
                if top.scope.is_none() {
                    top.scope = Some(scope);
                }
            }
        }
        if inside_loop {
            if let Some(top) = self.continuestack.last_mut() {
                if top.scope.is_none() {
                    top.scope = Some(scope);
                }
            }
        }

        let mut body = Vec::new();
        let mut last_is_return = false;
        while self.tok != Token::RBrace {
            let stmt =
                self.parse_statement(ret_type, true, allow_stsw, inside_switch, inside_loop)?;
            last_is_return = stmt.lir;
            body.push(stmt);
        }
        self.closebrace = self.lex.errorpos();
        self.pop_scope();
        self.next()?;

        let mut node = Node::with_children(NodeKind::Block { scope }, None, body);
        node.lir = last_is_return;
        Ok(node)
    }

    fn parse_label(&mut self, allow_decl: bool) -> Result<Node, CompileError> {
        // A label as the only child of a control construct breaks the
        // optimizer's block assumptions.
        if !allow_decl && self.lex.opts.optimize {
            return self.err(ErrorKind::InvalidLabelOpt);
        }
        self.next()?;
        let name = self.expect_ident()?;
        let scope = self.cur_scope();
        if self.symtab.contains(scope, &name) {
            return self.err(ErrorKind::AlreadyDefined);
        }
        let opts = self.lex.opts;
        if opts.duplabels || opts.shrinknames {
            // Duplicate labels allowed; shrinknames needs all labels
            // renamed so they are out of the way.
            if self.locallabels.contains(&name) || opts.shrinknames {
                let unique = self.generate_label();
                let mut sym = Symbol::label(scope);
                sym.new_name = Some(unique);
                self.symtab.insert(scope, &name, sym);
            } else {
                self.locallabels.insert(name.clone());
                self.symtab.insert(scope, &name, Symbol::label(scope));
            }
        } else {
            // All labels of a function share one pool.
            if self.locallabels.contains(&name) {
                return self.err(ErrorKind::DuplicateLabel);
            }
            self.locallabels.insert(name.clone());
            self.symtab.insert(scope, &name, Symbol::label(scope));
        }
        self.next()?;
        self.want(&Token::Semi)?;
        Ok(Node::new(NodeKind::Label { name, scope }, None))
    }

    fn parse_jump(&mut self) -> Result<Node, CompileError> {
        self.next()?;
        let name = self.expect_ident()?;
        let scope = self.find_label_scope(&name);
        match scope {
            Some(s) => {
                if let Some(sym) = self.symtab.get_mut(s, &name) {
                    sym.label_refs += 1;
                }
            }
            // Possibly a forward reference; resolve after the parse.
            None => self.defer_jump(name.clone()),
        }
        self.next()?;
        self.want(&Token::Semi)?;
        Ok(Node::new(NodeKind::Jump { name, scope }, None))
    }

    fn parse_state_switch(&mut self, allow_stsw: StSw) -> Result<Node, CompileError> {
        if self.localevents.is_none() {
            // Inside a user function.
            match allow_stsw {
                StSw::Deny => return self.err(ErrorKind::CantChangeState),
                StSw::Defer => {
                    let pos = self.lex.errorpos();
                    self.prune_bug.push((pos, ErrorKind::CantChangeState));
                }
                StSw::Allow => {}
            }
        }
        self.next()?;
        let name = match &self.tok {
            Token::Default => "default".to_string(),
            Token::Ident(n) => n.clone(),
            _ => return self.syntax_err(),
        };
        // State names live in the global scope only.
        let known = self.symtab.contains(ScopeId::GLOBAL, &name)
            || matches!(self.globals.get(&name), Some(ForwardEntry::State));
        if !known {
            return self.err(ErrorKind::Undefined);
        }
        self.next()?;
        self.want(&Token::Semi)?;
        Ok(Node::new(NodeKind::StateSwitch { name }, None))
    }

    fn parse_return(
        &mut self,
        ret_type: Option<Type>,
        allow_stsw: StSw,
    ) -> Result<Node, CompileError> {
        let mut savepos = self.lex.errorpos();
        self.next()?;
        let value = if self.tok == Token::Semi {
            None
        } else {
            savepos = self.lex.errorpos();
            let save = self.allow_void;
            // A void expression must parse here to mirror the engine's
            // acceptance of `return f();` for void f in events.
            self.allow_void = true;
            let v = self.parse_expression();
            self.allow_void = save;
            Some(v?)
        };
        self.want(&Token::Semi)?;

        if ret_type.is_none() {
            if let Some(v) = value {
                if allow_stsw == StSw::Deny {
                    return self.err_at(savepos, ErrorKind::ReturnShouldBeEmpty);
                }
                if v.ty.is_some() {
                    return self.err_at(savepos, ErrorKind::TypeMismatch);
                }
                if allow_stsw == StSw::Defer {
                    let pos = self.lex.errorpos();
                    self.prune_bug.push((pos, ErrorKind::ReturnShouldBeEmpty));
                }
                // Split into an expression statement plus a bare return.
                let scope = self.push_scope();
                self.pop_scope();
                let expr_stmt = Node::with_children(NodeKind::ExprStmt, None, vec![v]);
                let ret_stmt = Node::new(NodeKind::Return, None);
                return Ok(Node::with_children(
                    NodeKind::Block { scope },
                    None,
                    vec![expr_stmt, ret_stmt],
                ));
            }
            return Ok(Node::new(NodeKind::Return, None));
        }

        let rt = ret_type.unwrap_or(Type::Integer);
        match value {
            None => self.err_at(savepos, ErrorKind::ReturnIsEmpty),
            Some(v) => {
                let v = self.autocast(v, rt)?;
                let mut node = Node::with_children(NodeKind::Return, None, vec![v]);
                node.lir = true;
                Ok(node)
            }
        }
    }

    fn parse_if(
        &mut self,
        ret_type: Option<Type>,
        allow_stsw: StSw,
        inside_loop: bool,
    ) -> Result<Node, CompileError> {
        self.next()?;
        self.want(&Token::LParen)?;
        let cond = self.parse_expression()?;
        self.want(&Token::RParen)?;

        let mut save_prune = std::mem::take(&mut self.prune_bug);
        let then_stmt =
            self.parse_statement(ret_type, false, StSw::Defer, false, inside_loop)?;
        let mut node = Node::with_children(NodeKind::If, None, vec![cond, then_stmt]);

        if self.tok == Token::Else {
            if allow_stsw == StSw::Deny && !self.prune_bug.is_empty() {
                // The else makes the deferred diagnostic real.
                let (pos, kind) = self.prune_bug[0].clone();
                return self.err_at(pos, kind);
            }
            let last_is_return = node.ch[1].lir;
            self.next()?;
            let else_stmt =
                self.parse_statement(ret_type, false, allow_stsw, false, inside_loop)?;
            node.ch.push(else_stmt);
            if allow_stsw == StSw::Defer {
                save_prune.append(&mut self.prune_bug);
            }
            if last_is_return && node.ch[2].lir {
                node.lir = true;
            }
        }
        self.prune_bug = save_prune;
        Ok(node)
    }

    /// Open the wrapper scope and push break/continue labels for a
    /// loop, when break/continue support is on.
    fn loop_prologue(&mut self) -> bool {
        if !self.lex.opts.breakcont {
            return false;
        }
        // The wrapper scope receives the break label if one is needed:
        // `if (a) while (b) { ... break; }` becomes
        // `if (a) { while (b) { ... jump brk; } @brk; }`.
        self.push_scope();
        let brk = self.generate_label();
        let scope = self.cur_scope();
        self.breakstack.push(LoopLabel {
            name: brk,
            scope: Some(scope),
            refs: 0,
        });
        let cont = self.generate_label();
        // Scope still unknown; the body block fills it in.
        self.continuestack.push(LoopLabel {
            name: cont,
            scope: None,
            refs: 0,
        });
        true
    }

    /// Parse a loop body statement, working around the corner case of a
    /// label directly as the body: the label must live at the loop's
    /// own scope, not the wrapper scope.
    fn parse_loop_body(
        &mut self,
        ret_type: Option<Type>,
        breakcont: bool,
    ) -> Result<Node, CompileError> {
        if breakcont && self.tok == Token::At {
            self.pop_scope();
            let stmt = self.parse_statement(ret_type, false, StSw::Allow, false, true)?;
            self.push_scope();
            Ok(stmt)
        } else {
            self.parse_statement(ret_type, false, StSw::Allow, false, true)
        }
    }

    /// Append the continue label to the loop body block and wrap the
    /// loop in a block carrying the break label, when referenced.
    fn loop_epilogue(&mut self, mut ret: Node, body_index: usize) -> Node {
        if let Some(last) = self.continuestack.pop() {
            if last.refs > 0 {
                let scope = last.scope.unwrap_or_else(|| self.cur_scope());
                ret.ch[body_index].ch.push(Node::new(
                    NodeKind::Label {
                        name: last.name.clone(),
                        scope,
                    },
                    None,
                ));
                let mut sym = Symbol::label(scope);
                sym.label_refs = last.refs;
                self.symtab.insert(scope, &last.name, sym);
            }
        }
        if let Some(last) = self.breakstack.pop() {
            if last.refs > 0 {
                let scope = last.scope.unwrap_or_else(|| self.cur_scope());
                let label = Node::new(
                    NodeKind::Label {
                        name: last.name.clone(),
                        scope,
                    },
                    None,
                );
                let mut sym = Symbol::label(scope);
                sym.label_refs = last.refs;
                self.symtab.insert(scope, &last.name, sym);
                ret = Node::with_children(NodeKind::Block { scope }, None, vec![ret, label]);
            }
        }
        self.pop_scope();
        ret
    }

    fn parse_while(&mut self, ret_type: Option<Type>) -> Result<Node, CompileError> {
        self.next()?;
        let breakcont = self.loop_prologue();
        self.want(&Token::LParen)?;
        let condition = self.parse_expression()?;
        self.want(&Token::RParen)?;
        let stmt = self.parse_loop_body(ret_type, breakcont)?;
        let ret = Node::with_children(NodeKind::While, None, vec![condition, stmt]);
        if breakcont {
            Ok(self.loop_epilogue(ret, 1))
        } else {
            Ok(ret)
        }
    }

    fn parse_do(&mut self, ret_type: Option<Type>) -> Result<Node, CompileError> {
        self.next()?;
        let breakcont = self.loop_prologue();
        let stmt = self.parse_loop_body(ret_type, breakcont)?;
        self.want(&Token::While)?;
        self.want(&Token::LParen)?;
        let condition = self.parse_expression()?;
        self.want(&Token::RParen)?;
        self.want(&Token::Semi)?;
        let ret = Node::with_children(NodeKind::DoWhile, None, vec![stmt, condition]);
        if breakcont {
            Ok(self.loop_epilogue(ret, 0))
        } else {
            Ok(ret)
        }
    }

    fn parse_for(&mut self, ret_type: Option<Type>) -> Result<Node, CompileError> {
        self.next()?;
        let breakcont = self.loop_prologue();
        self.want(&Token::LParen)?;
        let initializer = self.parse_optional_expression_list(ArgTypes::Unconstrained)?;
        self.want(&Token::Semi)?;
        let condition = self.parse_expression()?;
        self.want(&Token::Semi)?;
        let iterator = self.parse_optional_expression_list(ArgTypes::Unconstrained)?;
        self.want(&Token::RParen)?;
        let stmt = self.parse_loop_body(ret_type, breakcont)?;
        let ret = Node::with_children(
            NodeKind::For,
            None,
            vec![
                Node::with_children(NodeKind::ExprList, None, initializer),
                condition,
                Node::with_children(NodeKind::ExprList, None, iterator),
                stmt,
            ],
        );
        if breakcont {
            Ok(self.loop_epilogue(ret, 3))
        } else {
            Ok(ret)
        }
    }

    fn parse_switch(
        &mut self,
        ret_type: Option<Type>,
        allow_stsw: StSw,
        inside_loop: bool,
    ) -> Result<Node, CompileError> {
        self.next()?;
        self.want(&Token::LParen)?;
        let expr = self.parse_expression()?;
        self.want(&Token::RParen)?;

        let brk = self.generate_label();
        self.breakstack.push(LoopLabel {
            name: brk.clone(),
            scope: None,
            refs: 0,
        });
        let blk_node = self.parse_code_block(ret_type, allow_stsw, true, inside_loop)?;
        let blkscope = match blk_node.kind {
            NodeKind::Block { scope } => scope,
            _ => return self.syntax_err(),
        };
        let mut blk = blk_node.ch;

        // Replace case labels with generated jump targets. Label scope
        // rules prevent jumping into nested blocks, so only the main
        // switch block level is considered.
        let mut caselist: Vec<(String, Node)> = Vec::new();
        let mut default_lbl: Option<String> = None;
        for item in blk.iter_mut() {
            match item.kind {
                NodeKind::Case => {
                    let lbl = self.generate_label();
                    let cexpr = item.ch.pop().unwrap_or_default();
                    caselist.push((lbl.clone(), cexpr));
                    self.symtab.insert(blkscope, &lbl, Symbol::label(blkscope));
                    *item = Node::new(
                        NodeKind::Label {
                            name: lbl,
                            scope: blkscope,
                        },
                        None,
                    );
                }
                NodeKind::DefaultCase => {
                    if default_lbl.is_some() {
                        return self.err(ErrorKind::ManyDefaults);
                    }
                    let lbl = self.generate_label();
                    default_lbl = Some(lbl.clone());
                    self.symtab.insert(blkscope, &lbl, Symbol::label(blkscope));
                    *item = Node::new(
                        NodeKind::Label {
                            name: lbl,
                            scope: blkscope,
                        },
                        None,
                    );
                }
                _ => {}
            }
        }

        // The prelude compares the switch expression against each case
        // expression in order.
        let mut prelude = Vec::new();
        let ltype = expr.ty;
        for (lbl, rexpr) in caselist {
            let mut lexpr = expr.clone();
            let mut rexpr = rexpr;
            if ltype == Some(Type::Float) {
                rexpr = self.autocast(rexpr, Type::Float)?;
            } else {
                let rt = match rexpr.ty {
                    Some(t) => t,
                    None => return self.err(ErrorKind::TypeMismatch),
                };
                lexpr = self.autocast(lexpr, rt)?;
            }
            let cmp = Node::with_children(
                NodeKind::Bin(BinOp::Eq),
                Some(Type::Integer),
                vec![lexpr, rexpr],
            );
            let jump = Node::new(
                NodeKind::Jump {
                    name: lbl.clone(),
                    scope: Some(blkscope),
                },
                None,
            );
            prelude.push(Node::with_children(NodeKind::If, None, vec![cmp, jump]));
            if let Some(sym) = self.symtab.get_mut(blkscope, &lbl) {
                sym.label_refs += 1;
            }
        }

        let mut default_target = default_lbl;
        match &default_target {
            None => {
                if self.lex.opts.errmissingdefault {
                    return self.err(ErrorKind::MissingDefault);
                }
                // Jump straight to the end when no case matches, but
                // only if the block does anything at all.
                if does_something(&blk) {
                    default_target = Some(brk.clone());
                }
            }
            Some(dname) => {
                // If nothing executable precedes the default label,
                // drop it and the jump to it.
                let dname = dname.clone();
                let mut remove_at = None;
                for (i, node) in blk.iter().enumerate() {
                    let is_default_label = matches!(
                        &node.kind,
                        NodeKind::Label { name, scope }
                            if *name == dname && *scope == blkscope
                    );
                    if is_default_label {
                        remove_at = Some(i);
                        break;
                    }
                    if does_something(std::slice::from_ref(node)) {
                        break;
                    }
                }
                if let Some(i) = remove_at {
                    default_target = None;
                    blk.remove(i);
                }
            }
        }

        if let Some(d) = default_target {
            prelude.push(Node::new(
                NodeKind::Jump {
                    name: d.clone(),
                    scope: Some(blkscope),
                },
                None,
            ));
            if d == brk {
                if let Some(top) = self.breakstack.last_mut() {
                    top.refs += 1;
                }
            } else if let Some(sym) = self.symtab.get_mut(blkscope, &d) {
                sym.label_refs += 1;
            }
        }

        if let Some(last) = self.breakstack.pop() {
            if last.refs > 0 {
                blk.push(Node::new(
                    NodeKind::Label {
                        name: brk.clone(),
                        scope: blkscope,
                    },
                    None,
                ));
                let mut sym = Symbol::label(blkscope);
                sym.label_refs = last.refs;
                self.symtab.insert(blkscope, &brk, sym);
            }
        }

        let mut ch = prelude;
        ch.extend(blk);
        Ok(Node::with_children(
            NodeKind::Block { scope: blkscope },
            None,
            ch,
        ))
    }

    fn parse_case(&mut self, inside_switch: bool) -> Result<Node, CompileError> {
        if !inside_switch {
            return self.err(ErrorKind::InvalidCase("case"));
        }
        if Some(self.cur_scope()) != self.breakstack.last().and_then(|l| l.scope) {
            // Nested block: label scope rules don't expose the target.
            return self.err(ErrorKind::CaseNotAllowed("case"));
        }
        self.next()?;
        let expr = self.parse_expression()?;
        if self.tok == Token::Colon {
            self.next()?;
        } else if self.tok != Token::LBrace {
            return self.syntax_err();
        }
        Ok(Node::with_children(NodeKind::Case, None, vec![expr]))
    }

    fn parse_default_case(&mut self, inside_switch: bool) -> Result<Node, CompileError> {
        if !inside_switch {
            return self.err(ErrorKind::InvalidCase("default"));
        }
        if Some(self.cur_scope()) != self.breakstack.last().and_then(|l| l.scope) {
            return self.err(ErrorKind::CaseNotAllowed("default"));
        }
        self.next()?;
        if self.tok == Token::Colon {
            self.next()?;
        } else if self.tok != Token::LBrace {
            return self.syntax_err();
        }
        Ok(Node::new(NodeKind::DefaultCase, None))
    }

    fn parse_break(&mut self) -> Result<Node, CompileError> {
        let opts = self.lex.opts;
        if self.breakstack.is_empty() {
            return self.err(ErrorKind::InvalidBreak {
                enableswitch: opts.enableswitch,
                breakcont: opts.breakcont,
            });
        }
        self.next()?;
        let n = self.parse_break_levels()?;
        self.want(&Token::Semi)?;
        let idx = match self.breakstack.len().checked_sub(n) {
            Some(i) => i,
            None => {
                return self.err(ErrorKind::InvalidBrkContArg {
                    breakcont: opts.breakcont,
                })
            }
        };
        self.breakstack[idx].refs += 1;
        let name = self.breakstack[idx].name.clone();
        let scope = self.breakstack[idx].scope;
        Ok(Node::new(NodeKind::Jump { name, scope }, None))
    }

    fn parse_continue(&mut self) -> Result<Node, CompileError> {
        let opts = self.lex.opts;
        if self.continuestack.is_empty() {
            return self.err(ErrorKind::InvalidContinue);
        }
        self.next()?;
        let n = self.parse_break_levels()?;
        self.want(&Token::Semi)?;

        if n == 1 && self.continuestack.last().map(|l| l.scope.is_none()) == Some(true) {
            // Not inside a block: `while (cond) continue;` is just
            // `while (cond) ;`.
            return Ok(Node::new(NodeKind::Empty, None));
        }
        let idx = match self.continuestack.len().checked_sub(n) {
            Some(i) => i,
            None => {
                return self.err(ErrorKind::InvalidBrkContArg {
                    breakcont: opts.breakcont,
                })
            }
        };
        if self.continuestack[idx].scope.is_none() {
            // The target loop has no block, e.g.
            // `while (c) while (c) while (c) continue 3;`. Transform to
            // the equivalent break one level in.
            let bidx = match self.breakstack.len().checked_sub(n - 1) {
                Some(i) => i,
                None => {
                    return self.err(ErrorKind::InvalidBrkContArg {
                        breakcont: opts.breakcont,
                    })
                }
            };
            self.breakstack[bidx].refs += 1;
            let name = self.breakstack[bidx].name.clone();
            let scope = self.breakstack[bidx].scope;
            return Ok(Node::new(NodeKind::Jump { name, scope }, None));
        }
        self.continuestack[idx].refs += 1;
        let name = self.continuestack[idx].name.clone();
        let scope = self.continuestack[idx].scope;
        Ok(Node::new(NodeKind::Jump { name, scope }, None))
    }

    /// Optional positive integer argument of break/continue.
    fn parse_break_levels(&mut self) -> Result<usize, CompileError> {
        if let Token::IntegerLit(v) = self.tok {
            if v <= 0 {
                return self.err(ErrorKind::InvalidBrkContArg {
                    breakcont: self.lex.opts.breakcont,
                });
            }
            self.next()?;
            Ok(v as usize)
        } else {
            Ok(1)
        }
    }

    fn parse_declaration(&mut self, typ: Type, allow_decl: bool) -> Result<Node, CompileError> {
        if !allow_decl {
            // A single statement cannot be a declaration, e.g.
            // `if (1) integer x;`.
            return self.err(ErrorKind::DeclarationScope);
        }
        self.next()?;
        let name = self.expect_ident()?;
        let scope = self.cur_scope();
        if self.symtab.contains(scope, &name) {
            return self.err(ErrorKind::AlreadyDefined);
        }
        self.next()?;
        let mut decl = Node::new(
            NodeKind::Decl {
                name: name.clone(),
                scope,
            },
            Some(typ),
        );
        if self.tok == Token::Assign {
            self.next()?;
            let value = self.parse_expression()?;
            decl.ch.push(self.autocast(value, typ)?);
        }
        self.want(&Token::Semi)?;
        self.symtab.insert(scope, &name, Symbol::var(typ, scope));
        Ok(decl)
    }
}
