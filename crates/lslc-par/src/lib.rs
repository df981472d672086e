//! lslc-par - Recursive-descent parser and type checker
//!
//! Parsing, type checking, implicit-cast insertion, and symbol table
//! construction happen in a single pass over the token stream. A fast
//! pre-scan (see [`forward`]) collects global names first so that
//! globals, functions, and states can be referenced before their
//! definitions.
//!
//! The grammar is LSL's, plus the optional extensions controlled by the
//! option set: `switch`/`case` (desugared here into labels and jumps),
//! `break`/`continue` (desugared into jumps to generated labels), lazy
//! list assignment (`l[i] = v`, expanded to a call to an injected
//! helper), extended typecasts, extended assignment operators, and full
//! expressions in global initializers.
//!
//! Errors are fatal and carry positions resolved through the `#line`
//! map. A small set of diagnostics cannot be decided when first seen
//! (state changes and valued returns inside an `if` without a known
//! `else` inside a function); they are buffered and committed or
//! dropped when the enclosing branch closes.

pub mod ast;
pub mod forward;
pub mod symtab;

mod expr;
mod items;
mod stmt;

#[cfg(test)]
mod edge_cases;

use lslc_lang::Library;
use lslc_lex::{Lexer, Token};
use lslc_util::{CompileError, ErrorKind, Options};
use rustc_hash::FxHashSet;

use ast::{Node, NodeKind};
use forward::ForwardGlobals;
use symtab::{ScopeId, SymTab, Symbol};

/// Result of a successful parse: the top-level item list and the symbol
/// table. This is the data model every optimization pass works on.
#[derive(Clone, Debug)]
pub struct Script {
    pub tree: Vec<Node>,
    pub symtab: SymTab,
}

/// Whether a state-change statement is legal at the current position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum StSw {
    /// Hard error (directly inside a function body).
    Deny,
    /// Queue the diagnostic; the enclosing `if` decides later.
    Defer,
    /// Allowed (loop bodies, event handlers).
    Allow,
}

/// Break/continue target bookkeeping.
#[derive(Clone, Debug)]
pub(crate) struct LoopLabel {
    pub name: String,
    /// Scope that will hold the generated label; filled in when the
    /// loop/switch body block is entered.
    pub scope: Option<ScopeId>,
    /// Number of jumps generated to this label.
    pub refs: u32,
}

/// A jump whose target label was not yet defined.
#[derive(Clone, Debug)]
struct JumpFixup {
    name: String,
    scopestack: Vec<ScopeId>,
    errorpos: usize,
}

pub struct Parser<'a> {
    pub(crate) lex: Lexer<'a>,
    pub(crate) tok: Token,
    pub(crate) lib: &'a Library,
    pub(crate) symtab: SymTab,
    pub(crate) scopestack: Vec<ScopeId>,
    pub(crate) tree: Vec<Node>,
    pub(crate) globals: ForwardGlobals,

    pub(crate) labelcnt: u32,
    pub(crate) locallabels: FxHashSet<String>,
    /// `Some` while parsing an event handler body (holding the event
    /// names already used in the state), `None` inside functions.
    pub(crate) localevents: Option<FxHashSet<String>>,
    pub(crate) breakstack: Vec<LoopLabel>,
    pub(crate) continuestack: Vec<LoopLabel>,
    jump_fixups: Vec<JumpFixup>,
    /// Deferred diagnostics, committed at the branch join. Each entry
    /// is (position, error kind).
    pub(crate) prune_bug: Vec<(usize, ErrorKind)>,
    pub(crate) disallowglobalvars: bool,
    pub(crate) allow_void: bool,
    /// Tree slots reserved for injected helpers that are in use.
    pub(crate) usedspots: usize,
    /// Position of the closing brace of the last code block, for the
    /// not-all-paths-return diagnostic.
    pub(crate) closebrace: usize,
}

impl<'a> Parser<'a> {
    /// Parse a whole script. Returns the script and the option set as
    /// it stands after inline pragmas.
    pub fn parse(
        src: &'a str,
        opts: Options,
        lib: &'a Library,
        filename: &str,
    ) -> Result<(Script, Options), CompileError> {
        // First pass: collect forward declarations. Directives are not
        // processed during this pass.
        let mut lex = Lexer::new(src, opts, lib, filename);
        lex.scanning = true;
        let globals = forward::scan(&mut lex);
        lex.reset();
        lex.scanning = false;

        let mut symtab = SymTab::with_library(lib);
        if opts.prettify {
            // Treat language constants as ordinary variables. The
            // lexer already stopped classifying them.
            for (name, v) in &lib.constants {
                symtab.insert(
                    ScopeId::GLOBAL,
                    name,
                    Symbol::var(v.ty(), ScopeId::GLOBAL),
                );
            }
        }

        let mut parser = Parser {
            lex,
            tok: Token::Eof,
            lib,
            symtab,
            scopestack: vec![ScopeId::GLOBAL],
            // One reserved slot for the lazy-list helper.
            tree: vec![Node::default()],
            globals,
            labelcnt: 0,
            locallabels: FxHashSet::default(),
            localevents: None,
            breakstack: Vec::new(),
            continuestack: Vec::new(),
            jump_fixups: Vec::new(),
            prune_bug: Vec::new(),
            disallowglobalvars: false,
            allow_void: false,
            usedspots: 0,
            closebrace: 0,
        };
        parser.next()?;
        parser.parse_script()?;

        let opts = parser.lex.opts;
        Ok((
            Script {
                tree: parser.tree,
                symtab: parser.symtab,
            },
            opts,
        ))
    }

    // ----- token plumbing -------------------------------------------------

    pub(crate) fn next(&mut self) -> Result<(), CompileError> {
        self.tok = self.lex.next_token()?;
        Ok(())
    }

    pub(crate) fn err<T>(&mut self, kind: ErrorKind) -> Result<T, CompileError> {
        if kind == ErrorKind::UnexpectedEof {
            return Err(self.lex.ueof());
        }
        Err(self.lex.error(kind))
    }

    pub(crate) fn err_at<T>(&mut self, pos: usize, kind: ErrorKind) -> Result<T, CompileError> {
        self.lex.set_errorpos(pos);
        self.err(kind)
    }

    /// Syntax error, or unexpected EOF when at the end.
    pub(crate) fn syntax_err<T>(&mut self) -> Result<T, CompileError> {
        if self.tok == Token::Eof {
            Err(self.lex.ueof())
        } else {
            self.err(ErrorKind::Syntax)
        }
    }

    pub(crate) fn expect(&mut self, t: &Token) -> Result<(), CompileError> {
        if &self.tok == t {
            Ok(())
        } else {
            self.syntax_err()
        }
    }

    /// Expect a token and consume it.
    pub(crate) fn want(&mut self, t: &Token) -> Result<(), CompileError> {
        self.expect(t)?;
        self.next()
    }

    pub(crate) fn expect_ident(&mut self) -> Result<String, CompileError> {
        match &self.tok {
            Token::Ident(name) => Ok(name.clone()),
            _ => self.syntax_err(),
        }
    }

    // ----- scopes and symbols --------------------------------------------

    pub(crate) fn cur_scope(&self) -> ScopeId {
        self.scopestack.last().copied().unwrap_or(ScopeId::GLOBAL)
    }

    pub(crate) fn push_scope(&mut self) -> ScopeId {
        let id = self.symtab.push_scope();
        self.scopestack.push(id);
        id
    }

    pub(crate) fn pop_scope(&mut self) {
        self.scopestack.pop();
        debug_assert!(!self.scopestack.is_empty());
    }

    /// Generate a fresh label name unique within the current function.
    pub(crate) fn generate_label(&mut self) -> String {
        loop {
            self.labelcnt += 1;
            let unique = format!("J_autoGen{:05}", self.labelcnt);
            if !self.locallabels.contains(&unique) {
                self.locallabels.insert(unique.clone());
                return unique;
            }
        }
    }

    /// Find a label visible from the current scope stack. Non-label
    /// symbols with the same name do not hide labels in outer scopes.
    pub(crate) fn find_label_scope(&self, name: &str) -> Option<ScopeId> {
        self.find_label_scope_in(&self.scopestack, name)
    }

    pub(crate) fn find_label_scope_in(&self, stack: &[ScopeId], name: &str) -> Option<ScopeId> {
        for &sid in stack.iter().rev() {
            if let Some(sym) = self.symtab.get(sid, name) {
                if sym.is_label() {
                    return Some(sid);
                }
            }
        }
        None
    }

    /// Walk the visible scopes for a symbol, innermost first. Only
    /// globals seen so far are visible.
    pub(crate) fn find_partial(&self, name: &str) -> Option<&Symbol> {
        for &sid in self.scopestack.iter().rev() {
            if let Some(sym) = self.symtab.get(sid, name) {
                return Some(sym);
            }
        }
        None
    }

    /// Full lookup: visible scopes, then the global scope, then the
    /// forward-declaration table (unless forward references are
    /// disallowed at this position). Returns a clone so the caller can
    /// keep parsing.
    pub(crate) fn find_full(&self, name: &str, globalonly: bool) -> Option<Symbol> {
        let levels: &[ScopeId] = if globalonly {
            &self.scopestack[..1]
        } else {
            &self.scopestack
        };
        for &sid in levels.iter().rev() {
            if let Some(sym) = self.symtab.get(sid, name) {
                return Some(sym.clone());
            }
        }
        if let Some(sym) = self.symtab.get(ScopeId::GLOBAL, name) {
            return Some(sym.clone());
        }
        if self.disallowglobalvars {
            return None;
        }
        self.globals.get(name).map(|e| e.to_symbol())
    }

    // ----- casts ----------------------------------------------------------

    /// Check that `value` can implicitly convert to `tgt`
    /// (integer→float, string↔key), inserting an explicit cast node
    /// when the `explicitcast` option asks for it.
    pub(crate) fn autocast(
        &mut self,
        value: Node,
        tgt: lslc_lang::Type,
    ) -> Result<Node, CompileError> {
        use lslc_lang::Type;
        let tval = match value.ty {
            Some(t) => t,
            None => return self.err(ErrorKind::TypeMismatch),
        };
        if tval == tgt {
            return Ok(value);
        }
        let string_key = |t: Type| matches!(t, Type::String | Type::Key);
        if (string_key(tval) && string_key(tgt)) || (tval == Type::Integer && tgt == Type::Float) {
            if self.lex.opts.explicitcast {
                return Ok(Node::with_children(NodeKind::Cast, Some(tgt), vec![value]));
            }
            return Ok(value);
        }
        self.err(ErrorKind::TypeMismatch)
    }

    // ----- jump fixups ----------------------------------------------------

    pub(crate) fn defer_jump(&mut self, name: String) {
        self.jump_fixups.push(JumpFixup {
            name,
            scopestack: self.scopestack.clone(),
            errorpos: self.lex.errorpos(),
        });
    }

    /// Resolve deferred jump targets after the full parse: bump label
    /// reference counts, error on unresolved names, and stamp the scope
    /// on every jump node left unresolved.
    pub(crate) fn resolve_jumps(&mut self) -> Result<(), CompileError> {
        let fixups = std::mem::take(&mut self.jump_fixups);
        for fix in &fixups {
            match self.find_label_scope_in(&fix.scopestack, &fix.name) {
                Some(scope) => {
                    if let Some(sym) = self.symtab.get_mut(scope, &fix.name) {
                        sym.label_refs += 1;
                    }
                }
                None => return self.err_at(fix.errorpos, ErrorKind::Undefined),
            }
        }
        let mut tree = std::mem::take(&mut self.tree);
        let mut stack = vec![ScopeId::GLOBAL];
        for item in &mut tree {
            stamp_jump_scopes(&self.symtab, item, &mut stack);
        }
        self.tree = tree;
        Ok(())
    }
}

/// Fill in the scope of unresolved jump nodes by re-walking the tree
/// with the scope stack the nodes record.
fn stamp_jump_scopes(symtab: &SymTab, node: &mut Node, stack: &mut Vec<ScopeId>) {
    let pushed = match &node.kind {
        NodeKind::Block { scope } => {
            stack.push(*scope);
            true
        }
        NodeKind::FnDef { pscope, .. } => {
            stack.push(*pscope);
            true
        }
        _ => false,
    };
    if let NodeKind::Jump { name, scope } = &mut node.kind {
        if scope.is_none() {
            for &sid in stack.iter().rev() {
                if let Some(sym) = symtab.get(sid, name) {
                    if sym.is_label() {
                        *scope = Some(sid);
                        break;
                    }
                }
            }
        }
    }
    for child in &mut node.ch {
        stamp_jump_scopes(symtab, child, stack);
    }
    if pushed {
        stack.pop();
    }
}

/// Tell if a statement list does something, or is just a pure
/// combination of `;`, `{}` and labels.
pub(crate) fn does_something(blk: &[Node]) -> bool {
    for node in blk {
        match &node.kind {
            NodeKind::Label { .. } | NodeKind::Empty => {}
            NodeKind::Block { .. } => {
                if does_something(&node.ch) {
                    return true;
                }
            }
            _ => return true,
        }
    }
    false
}
