//! Dead code removal.
//!
//! Two phases over the tree and symbol table:
//!
//! **Mark.** A recursive walk starting at the `default` state (all
//! events of a reachable state are assumed entered) colors each visited
//! node with whether control falls through it, counts reads of every
//! symbol, and records the single writer of each variable (or the fact
//! that it is written more than once). Calls into user functions mark
//! the callee once and take its fall-through status; jump targets are
//! not followed, so a function ending in a terminator call is
//! indistinguishable from one ending in a plain return as far as the
//! caller's successor statements are concerned.
//!
//! **Rewrite.** Children never marked are deleted (except the operand
//! of a `return`, and a trailing `return` in a function body, which the
//! engine requires). Declarations of removable symbols are dropped or
//! reduced to their side effects; reads of single-writer constants are
//! replaced by the constant; mandatory substatements of control
//! constructs are replaced by `;` to keep the syntax valid. Globals
//! whose definitions disappeared are removed from scope 0 and the
//! surviving `loc` indices are compacted.

use lslc_lang::{Library, Type, Value};
use lslc_par::ast::{Node, NodeKind, Reach};
use lslc_par::symtab::{ScopeId, SymTab, Writer};
use lslc_par::Script;
use rustc_hash::FxHashMap;

use crate::cast_to;

struct DeadCode<'a> {
    tree: &'a mut Vec<Node>,
    symtab: &'a mut SymTab,
    lib: &'a Library,
    /// Parameter scope and names of every function definition, indexed
    /// by tree location (usable even while the definition itself is
    /// checked out of the tree).
    fn_params: FxHashMap<usize, (ScopeId, Vec<String>)>,
    /// Items currently being marked, with their provisional status.
    in_flight: FxHashMap<usize, Reach>,
}

/// Run the pass over the whole script.
pub fn remove_dead_code(script: &mut Script, lib: &Library) {
    let Script { tree, symtab } = script;

    let mut fn_params = FxHashMap::default();
    for (i, item) in tree.iter().enumerate() {
        if let NodeKind::FnDef { pscope, pnames, .. } = &item.kind {
            fn_params.insert(i, (*pscope, pnames.clone()));
        }
    }

    let default_loc = match symtab.get(ScopeId::GLOBAL, "default").and_then(|s| s.loc) {
        Some(loc) => loc,
        None => return,
    };

    let mut dc = DeadCode {
        tree,
        symtab,
        lib,
        fn_params,
        in_flight: FxHashMap::default(),
    };
    dc.mark_loc(default_loc);

    // Rewrite phase. Track removal of top-level items so surviving
    // locations can be reassigned afterwards.
    let mut loc_map: Vec<usize> = (0..dc.tree.len()).collect();
    let mut global_deletions: Vec<String> = Vec::new();

    let mut idx = 0;
    while idx < dc.tree.len() {
        let delete = {
            let node = &dc.tree[idx];
            if !node.x.is_set() {
                true
            } else if let NodeKind::Decl { name, scope } = &node.kind {
                dc.ok_to_remove(*scope, name, node.ty.unwrap_or(Type::Integer))
            } else {
                false
            }
        };
        if delete {
            // The symbol is deleted later: rewrites of surviving
            // references still need the recorded writer value.
            match &dc.tree[idx].kind {
                NodeKind::Decl { name, .. } | NodeKind::StateDef { name } => {
                    global_deletions.push(name.clone());
                }
                _ => {}
            }
            dc.tree.remove(idx);
            loc_map.remove(idx);
        } else {
            let mut node = std::mem::take(&mut dc.tree[idx]);
            dc.clean_node(&mut node, false);
            dc.tree[idx] = node;
            idx += 1;
        }
    }

    for name in global_deletions {
        dc.symtab.remove_global(&name);
    }

    // Reassign locations shifted by the deletions.
    for sym in dc.symtab.scopes[0].values_mut() {
        if let Some(loc) = sym.loc {
            sym.loc = loc_map.iter().position(|&l| l == loc);
        }
    }
}

fn reach(falls: bool) -> Reach {
    if falls {
        Reach::Falls
    } else {
        Reach::Stops
    }
}

impl DeadCode<'_> {
    /// Mark a top-level item by index, tolerating reentrancy through
    /// recursive functions.
    fn mark_loc(&mut self, loc: usize) -> bool {
        if let Some(r) = self.in_flight.get(&loc) {
            return r.falls();
        }
        if loc >= self.tree.len() {
            return true;
        }
        if self.tree[loc].x.is_set() {
            return self.tree[loc].x.falls();
        }
        // Optimistic: a function is assumed to fall through while its
        // own body is being marked.
        self.in_flight.insert(loc, Reach::Falls);
        let mut node = std::mem::take(&mut self.tree[loc]);
        let falls = self.mark(&mut node);
        self.tree[loc] = node;
        self.in_flight.remove(&loc);
        falls
    }

    /// Mark phase. Returns whether control falls through to the
    /// successor; the same fact is stored on the node.
    fn mark(&mut self, node: &mut Node) -> bool {
        if node.x.is_set() {
            // Branch already analyzed.
            return node.x.falls();
        }

        match &node.kind {
            NodeKind::StateSwitch { name } => {
                node.x = Reach::Stops;
                let loc = self
                    .symtab
                    .get(ScopeId::GLOBAL, name)
                    .and_then(|s| s.loc);
                if let Some(loc) = loc {
                    self.mark_loc(loc);
                }
                return false;
            }

            NodeKind::Jump { name, scope } => {
                node.x = Reach::Stops;
                if let Some(scope) = scope {
                    if let Some(sym) = self.symtab.get_mut(*scope, name) {
                        sym.reads += 1;
                    }
                }
                return false;
            }

            NodeKind::Return => {
                node.x = Reach::Stops;
                if !node.ch.is_empty() {
                    self.mark_child(node, 0);
                }
                return false;
            }

            NodeKind::If => {
                node.x = Reach::Pending;
                self.mark_child(node, 0);
                let decided = node.ch[0].const_value().map(lslc_lang::arith::cond);
                let falls = match decided {
                    Some(true) => {
                        let f = self.mark_child(node, 1);
                        node.x = reach(f);
                        return f;
                    }
                    Some(false) => {
                        if node.ch.len() == 3 {
                            let f = self.mark_child(node, 2);
                            node.x = reach(f);
                            return f;
                        }
                        true
                    }
                    None => {
                        let cont = self.mark_child(node, 1);
                        if node.ch.len() == 3 {
                            if !cont {
                                let f = self.mark_child(node, 2);
                                node.x = reach(f);
                                return f;
                            }
                            self.mark_child(node, 2);
                        }
                        true
                    }
                };
                node.x = reach(falls);
                return falls;
            }

            NodeKind::While => {
                node.x = Reach::Pending;
                self.mark_child(node, 0);
                let decided = node.ch[0].const_value().map(lslc_lang::arith::cond);
                match decided {
                    Some(true) => {
                        // Infinite loop: executed, never falls through
                        // (an inner return still exits).
                        self.mark_child(node, 1);
                        node.x = Reach::Stops;
                        return false;
                    }
                    Some(false) => {
                        // The body is never entered; leave it unmarked.
                    }
                    None => {
                        self.mark_child(node, 1);
                    }
                }
                node.x = Reach::Falls;
                return true;
            }

            NodeKind::DoWhile => {
                node.x = Reach::Pending;
                if !self.mark_child(node, 0) {
                    node.x = Reach::Stops;
                    return false;
                }
                self.mark_child(node, 1);
                let infinite = node.ch[1].const_value().map(lslc_lang::arith::cond)
                    == Some(true);
                node.x = reach(!infinite);
                return !infinite;
            }

            NodeKind::For => {
                node.x = Reach::Pending;
                self.mark_child(node, 0);
                self.mark_child(node, 1);
                let decided = node.ch[1].const_value().map(lslc_lang::arith::cond);
                let falls = match decided {
                    Some(true) => {
                        node.x = Reach::Stops;
                        self.mark_child(node, 3);
                        self.mark_child(node, 2);
                        false
                    }
                    Some(false) => {
                        // Body and iterator never run; leave their
                        // contents unmarked.
                        node.x = Reach::Falls;
                        true
                    }
                    None => {
                        node.x = Reach::Falls;
                        self.mark_child(node, 3);
                        self.mark_child(node, 2);
                        true
                    }
                };
                // The iterator list is a syntactic requirement: keep
                // the node itself while its contents simplify away.
                node.ch[2].x = Reach::Falls;
                return falls;
            }

            NodeKind::Block { .. } => {
                // After a non-falling statement, only labels can bring
                // execution back.
                node.x = Reach::Pending;
                let mut continues = true;
                for i in 0..node.ch.len() {
                    if continues || matches!(node.ch[i].kind, NodeKind::Label { .. }) {
                        continues = self.mark_child(node, i);
                    }
                }
                node.x = reach(continues);
                return continues;
            }

            NodeKind::FnCall { name } => {
                let name = name.clone();
                node.x = Reach::Pending;
                // Arguments are evaluated right to left.
                for i in (0..node.ch.len()).rev() {
                    self.mark_child(node, i);
                }
                let sym_loc = self
                    .symtab
                    .get(ScopeId::GLOBAL, &name)
                    .and_then(|s| s.loc);
                let falls = match sym_loc {
                    Some(loc) => {
                        // Each argument writes the callee's parameter;
                        // treated as a second write, since tracking
                        // per-call-site values is unsafe here.
                        if let Some((pscope, pnames)) = self.fn_params.get(&loc).cloned() {
                            for pname in pnames.iter().take(node.ch.len()) {
                                if let Some(psym) = self.symtab.get_mut(pscope, pname) {
                                    psym.writer = Writer::Multi;
                                }
                            }
                        }
                        self.mark_loc(loc)
                    }
                    None => !self
                        .lib
                        .funcs
                        .get(&name)
                        .map(|f| f.stop)
                        .unwrap_or(false),
                };
                node.x = reach(falls);
                return falls;
            }

            NodeKind::Decl { name, scope } => {
                let (name, scope) = (name.clone(), *scope);
                let ty = node.ty.unwrap_or(Type::Integer);
                let writer = match node.ch.first() {
                    Some(init) => Writer::Node(Box::new(init.clone())),
                    None => Writer::Node(Box::new(Node::const_val(ty.default_value()))),
                };
                if let Some(sym) = self.symtab.get_mut(scope, &name) {
                    sym.writer = writer;
                }
                node.x = Reach::Falls;
                if !node.ch.is_empty() {
                    if node.ch[0].orig.is_some() {
                        self.mark_decl_orig(node);
                    } else {
                        self.mark_child(node, 0);
                    }
                }
                return true;
            }

            _ => {}
        }

        // Assignments and increments write their target.
        if node.is_assign() || node.is_incdec() {
            let target = {
                let mut t = &node.ch[0];
                if let NodeKind::Field(_) = t.kind {
                    t = &t.ch[0];
                }
                match &t.kind {
                    NodeKind::Ident { name, scope } => Some((name.clone(), *scope)),
                    _ => None,
                }
            };
            if let Some((name, scope)) = target {
                if scope == ScopeId::GLOBAL {
                    // Mark the global first.
                    let loc = self.symtab.get(scope, &name).and_then(|s| s.loc);
                    if let Some(loc) = loc {
                        self.mark_loc(loc);
                    }
                }
                // At least the second write (the declaration was the
                // first); single static assignment would be needed to
                // do better.
                if let Some(sym) = self.symtab.get_mut(scope, &name) {
                    sym.writer = Writer::Multi;
                }
            }
            if matches!(node.kind, NodeKind::Assign(None)) {
                // Keep the left side from being counted as a read.
                self.mark_child(node, 1);
                node.x = Reach::Falls;
                return true;
            }
        } else if let NodeKind::Field(_) = node.kind {
            // The underlying variable is accessed through a component.
            if let NodeKind::Ident { name, scope } = &node.ch[0].kind {
                let (name, scope) = (name.clone(), *scope);
                if let Some(sym) = self.symtab.get_mut(scope, &name) {
                    sym.fld = true;
                }
            }
        } else if let NodeKind::Ident { name, scope } = &node.kind {
            let (name, scope) = (name.clone(), *scope);
            let needs_def_mark = self
                .symtab
                .get(scope, &name)
                .map(|s| matches!(s.writer, Writer::None))
                .unwrap_or(false);
            if needs_def_mark && scope == ScopeId::GLOBAL {
                let loc = self.symtab.get(scope, &name).and_then(|s| s.loc);
                if let Some(loc) = loc {
                    self.mark_loc(loc);
                }
            }
            if let Some(sym) = self.symtab.get_mut(scope, &name) {
                sym.reads += 1;
            }
        }

        node.x = Reach::Falls;
        for i in 0..node.ch.len() {
            self.mark_child(node, i);
        }
        true
    }

    fn mark_child(&mut self, node: &mut Node, i: usize) -> bool {
        let mut child = std::mem::take(&mut node.ch[i]);
        let falls = self.mark(&mut child);
        node.ch[i] = child;
        falls
    }

    /// Initializer carrying the original (pre-fold) list literal: mark
    /// the original, and add fake writes to globals named in it so they
    /// are not deleted while the printed form still references them.
    fn mark_decl_orig(&mut self, node: &mut Node) {
        let Some(mut orig) = node.ch[0].orig.take() else {
            return;
        };
        self.mark(&mut orig);
        node.ch[0].x = orig.x;

        if matches!(orig.kind, NodeKind::ListLit) {
            let mut referenced: Vec<(String, ScopeId)> = Vec::new();
            for sub in &orig.ch {
                match &sub.kind {
                    NodeKind::Ident { name, scope } => referenced.push((name.clone(), *scope)),
                    NodeKind::VectorLit | NodeKind::RotationLit => {
                        for sub2 in &sub.ch {
                            if let NodeKind::Ident { name, scope } = &sub2.kind {
                                referenced.push((name.clone(), *scope));
                            }
                        }
                    }
                    _ => {}
                }
            }
            for (name, scope) in referenced {
                // Only globals can appear here.
                debug_assert_eq!(scope, ScopeId::GLOBAL);
                let loc = self.symtab.get(scope, &name).and_then(|s| s.loc);
                if let Some(sym) = self.symtab.get_mut(scope, &name) {
                    sym.writer = Writer::Multi;
                }
                if let Some(loc) = loc {
                    if let Some(def) = self.tree.get_mut(loc) {
                        def.x = Reach::Falls;
                    }
                }
            }
        }
        node.ch[0].orig = Some(orig);
    }

    /// Whether reads of the symbol can be replaced and its declaration
    /// dropped.
    fn ok_to_remove(&self, scope: ScopeId, name: &str, ty: Type) -> bool {
        let Some(sym) = self.symtab.get(scope, name) else {
            return false;
        };
        if sym.reads == 0 {
            // Never read: always removable.
            return true;
        }
        let writer = match &sym.writer {
            // Event parameters have no writer; multi-written variables
            // would need a control-flow graph.
            Writer::None | Writer::Multi => return false,
            Writer::Node(w) => w,
        };
        match &writer.kind {
            NodeKind::Const(value) => match ty {
                Type::Integer | Type::String | Type::Key => true,
                Type::Float => sym.reads <= 3 || matches!(value, Value::Integer(_)),
                Type::Vector | Type::Rotation => sym.reads <= 1,
                Type::List => {
                    let len = match value {
                        Value::List(l) => l.len(),
                        _ => return false,
                    };
                    len <= 4 && sym.reads <= 1
                }
            },
            // Substituting non-constant expressions would need unique
            // names and a control-flow graph; disabled.
            _ => false,
        }
    }

    fn writer_clone(&self, scope: ScopeId, name: &str) -> Option<Node> {
        match &self.symtab.get(scope, name)?.writer {
            Writer::Node(w) => Some((**w).clone()),
            _ => None,
        }
    }

    /// Rewrite phase: delete unexecuted children and substitute
    /// removable symbols.
    fn clean_node(&mut self, curnode: &mut Node, is_fndef: bool) {
        if matches!(
            curnode.kind,
            NodeKind::Decl {
                scope: ScopeId::GLOBAL,
                ..
            }
        ) {
            // Global initializers are kept verbatim.
            return;
        }

        // Do not treat assignment targets as substitutable reads.
        let mut index = usize::from(curnode.is_assign());

        while index < curnode.ch.len() {
            if !curnode.ch[index].x.is_set() {
                let keep = matches!(curnode.kind, NodeKind::Return)
                    || (matches!(curnode.ch[index].kind, NodeKind::Return)
                        && index == curnode.ch.len() - 1
                        && is_fndef);
                if !keep {
                    let deleted = curnode.ch.remove(index);
                    if let NodeKind::Jump {
                        name,
                        scope: Some(scope),
                    } = &deleted.kind
                    {
                        if let Some(sym) = self.symtab.get_mut(*scope, name) {
                            debug_assert!(sym.label_refs > 0);
                            sym.label_refs = sym.label_refs.saturating_sub(1);
                        }
                    }
                    continue;
                }
            }

            if self.rewrite_child(curnode, index) == Rewrite::Removed {
                continue;
            }

            let recurse_fndef = matches!(curnode.kind, NodeKind::FnDef { .. });
            self.clean_node(&mut curnode.ch[index], recurse_fndef);
            index += 1;
        }
    }

    fn rewrite_child(&mut self, curnode: &mut Node, index: usize) -> Rewrite {
        let child = &curnode.ch[index];
        match &child.kind {
            NodeKind::Decl { name, scope } => {
                let (name, scope) = (name.clone(), *scope);
                let ty = child.ty.unwrap_or(Type::Integer);
                if self.ok_to_remove(scope, &name, ty) {
                    if child.ch.is_empty() || child.ch[0].sef {
                        curnode.ch.remove(index);
                        return Rewrite::Removed;
                    }
                    // Keep the initializer for its side effects.
                    let mut decl = std::mem::take(&mut curnode.ch[index]);
                    let init = decl.ch.remove(0);
                    let mut stmt = Node::with_children(
                        NodeKind::ExprStmt,
                        Some(ty),
                        vec![cast_to(init, ty)],
                    );
                    stmt.x = Reach::Falls;
                    curnode.ch[index] = stmt;
                }
            }

            NodeKind::Field(fld) => {
                let fld = *fld;
                let target = match &child.ch.first().map(|n| &n.kind) {
                    Some(NodeKind::Ident { name, scope }) => Some((name.clone(), *scope)),
                    _ => None,
                };
                if let Some((name, scope)) = target {
                    let ident_ty = child.ch[0].ty.unwrap_or(Type::Vector);
                    if self.ok_to_remove(scope, &name, ident_ty) {
                        // Only constant writers pass the removability
                        // check, so the component is a plain number.
                        let component = self.writer_clone(scope, &name).and_then(|w| {
                            match w.const_value() {
                                Some(Value::Vector(v)) => v.get(fld.index()).copied(),
                                Some(Value::Rotation(r)) => r.get(fld.index()).copied(),
                                _ => None,
                            }
                        });
                        if let Some(f) = component {
                            let mut repl = Node::const_val(Value::Float(f));
                            repl.x = Reach::Falls;
                            curnode.ch[index] = repl;
                        }
                    }
                }
            }

            NodeKind::Ident { name, scope } => {
                let (name, scope) = (name.clone(), *scope);
                let ty = child.ty.unwrap_or(Type::Integer);
                if self.ok_to_remove(scope, &name, ty) {
                    if let Some(mut repl) = self.writer_clone(scope, &name) {
                        repl.orig = None;
                        repl.x = Reach::Falls;
                        if repl.ty != Some(ty) {
                            repl = cast_to(repl, ty);
                            repl.x = Reach::Falls;
                        }
                        curnode.ch[index] = repl;
                    }
                }
            }

            NodeKind::Assign(_) => {
                let target = {
                    let mut t = &child.ch[0];
                    if let NodeKind::Field(_) = t.kind {
                        t = &t.ch[0];
                    }
                    match &t.kind {
                        NodeKind::Ident { name, scope } => Some((name.clone(), *scope)),
                        _ => None,
                    }
                };
                if let Some((name, scope)) = target {
                    let ty = child.ty.unwrap_or(Type::Integer);
                    if self.ok_to_remove(scope, &name, ty) && child.ch.len() > 1 {
                        // The target is never read again: the
                        // assignment reduces to its right side.
                        let mut assign = std::mem::take(&mut curnode.ch[index]);
                        let rhs = assign.ch.remove(1);
                        let mut repl = cast_to(rhs, ty);
                        repl.x = Reach::Falls;
                        curnode.ch[index] = repl;
                    }
                }
            }

            NodeKind::If | NodeKind::While | NodeKind::DoWhile | NodeKind::For => {
                // Mandatory substatements that died are replaced with
                // `;` so the syntax survives; a dead do-while condition
                // becomes constant 0.
                let kind = child.kind.clone();
                let sub = match kind {
                    NodeKind::For => 3,
                    NodeKind::DoWhile => 0,
                    _ => 1,
                };
                let child = &mut curnode.ch[index];
                if !child.ch[sub].x.is_set() {
                    let mut empty = Node::new(NodeKind::Empty, None);
                    empty.sef = true;
                    empty.x = Reach::Falls;
                    child.ch[sub] = empty;
                }
                if matches!(kind, NodeKind::DoWhile) && !child.ch[1].x.is_set() {
                    let mut zero = Node::const_val(Value::Integer(0));
                    zero.x = Reach::Falls;
                    child.ch[1] = zero;
                }
            }

            _ => {}
        }
        Rewrite::Kept
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Rewrite {
    Removed,
    Kept,
}
