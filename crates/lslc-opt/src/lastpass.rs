//! Late rewrites that would get in the way of the other passes.
//!
//! - With `optlistadd`, list literals (and `listExpr + listLiteral`)
//!   outside global initializers are rewritten to chains of `+` with
//!   the first element cast to list. The form is smaller in the output
//!   but hostile to the list rewrites, which is why it runs last.
//! - A state-switch statement that survived optimization inside a user
//!   function (possible once dead code removal reshapes control flow)
//!   is legalized by wrapping the whole body in `if (1) { ... }` with a
//!   synthetic return of the default value appended when the function
//!   returns one.
//! - The set of library functions actually referenced is collected for
//!   the renamer.

use std::collections::BTreeSet;

use lslc_lang::Value;
use lslc_par::ast::{BinOp, Node, NodeKind, Reach};
use lslc_par::symtab::{ScopeId, SymTab};
use lslc_par::Script;
use lslc_util::Options;

/// Results of the last pass.
#[derive(Clone, Debug, Default)]
pub struct LastPassInfo {
    pub used_lib_funcs: BTreeSet<String>,
}

struct LastPass<'a> {
    symtab: &'a mut SymTab,
    opts: &'a Options,
    /// Inside a global initializer: list rewriting must not apply.
    globalmode: bool,
    /// State changes are bad in the current subtree (user function
    /// body, outside constructs that hide them from the compiler).
    st_ch_are_bad: bool,
    /// A bad state change was found in the current function.
    bad_st_ch: bool,
    used: BTreeSet<String>,
}

pub fn last_pass(script: &mut Script, opts: &Options) -> LastPassInfo {
    let Script { tree, symtab } = script;
    let mut lp = LastPass {
        symtab,
        opts,
        globalmode: false,
        st_ch_are_bad: false,
        bad_st_ch: false,
        used: BTreeSet::new(),
    };
    for item in tree.iter_mut() {
        lp.globalmode = matches!(item.kind, NodeKind::Decl { .. });
        lp.walk(item);
    }
    LastPassInfo {
        used_lib_funcs: lp.used,
    }
}

impl LastPass<'_> {
    fn walk(&mut self, node: &mut Node) {
        let saved = self.st_ch_are_bad;
        if self.pre(node) {
            // The node was replaced; process the replacement instead.
            self.walk(node);
            self.st_ch_are_bad = saved;
            return;
        }
        for c in &mut node.ch {
            self.walk(c);
        }
        self.post(node);
        self.st_ch_are_bad = saved;
    }

    /// Pre-order hook. Returns true when the node was replaced and the
    /// walk should restart on it.
    fn pre(&mut self, node: &mut Node) -> bool {
        // The list rewrite is an optimization; it needs the master
        // switch on top of its own toggle.
        if self.opts.optimize
            && self.opts.optlistadd
            && !self.globalmode
            && self.try_listadd(node)
        {
            return true;
        }

        match &node.kind {
            NodeKind::FnDef { scope, .. } => {
                // State changes are bad only in user functions; event
                // handlers have no scope entry.
                self.st_ch_are_bad = scope.is_some();
                self.bad_st_ch = false;
            }
            NodeKind::If => {
                if node.ch.len() == 2 {
                    // The engine accepts a state change under an
                    // else-less if; stop monitoring the subtree.
                    self.st_ch_are_bad = false;
                }
            }
            NodeKind::While | NodeKind::DoWhile | NodeKind::For => {
                self.st_ch_are_bad = false;
            }
            NodeKind::StateSwitch { .. } => {
                if self.st_ch_are_bad {
                    self.bad_st_ch = true;
                }
            }
            NodeKind::FnCall { name } => {
                let is_udf = self
                    .symtab
                    .get(ScopeId::GLOBAL, name)
                    .map(|s| s.is_udf())
                    .unwrap_or(false);
                if !is_udf {
                    self.used.insert(name.clone());
                }
            }
            _ => {}
        }
        false
    }

    /// `[a, b, ...]` → `(list)a + b + ...`, and
    /// `listExpr + [a, b, ...]` → `listExpr + a + b + ...`.
    /// (The left expression does not need to be side-effect free; the
    /// literal does.)
    fn try_listadd(&mut self, node: &mut Node) -> bool {
        use lslc_lang::Type;

        let is_list_literal = |n: &Node| {
            matches!(n.kind, NodeKind::ListLit)
                || matches!(n.kind, NodeKind::Const(Value::List(_)))
        };
        let is_add = matches!(node.kind, NodeKind::Bin(BinOp::Add))
            && node.ch.len() == 2
            && node.ch[0].ty == Some(Type::List)
            && is_list_literal(&node.ch[1]);
        let is_lone = is_list_literal(node);
        if !is_add && !is_lone {
            return false;
        }
        let listnode = if is_add { &node.ch[1] } else { &*node };
        if !listnode.sef {
            return false;
        }
        let n_elems = match &listnode.kind {
            NodeKind::Const(Value::List(l)) => l.len(),
            _ => listnode.ch.len(),
        };
        if !is_add && n_elems == 0 {
            // A lone empty list stays as it is.
            return false;
        }

        let old = std::mem::take(node);
        let (left, listnode) = if is_add {
            let mut it = old.ch.into_iter();
            let l = it.next();
            let ln = it.next();
            (l, ln)
        } else {
            (None, Some(old))
        };
        let Some(listnode) = listnode else {
            return false;
        };
        let elems: Vec<Node> = match listnode.kind {
            NodeKind::Const(Value::List(values)) => values
                .into_iter()
                .map(|v| {
                    let mut n = Node::const_val(v);
                    n.x = Reach::Falls;
                    n
                })
                .collect(),
            _ => listnode.ch,
        };

        let mut left = left;
        for elem in elems {
            left = Some(match left {
                None => {
                    // A plain cast node, not a folded constant: folding
                    // it back would recreate the literal.
                    let sef = elem.sef;
                    let mut c = if elem.ty == Some(Type::List) {
                        elem
                    } else {
                        Node::with_children(NodeKind::Cast, Some(Type::List), vec![elem])
                    };
                    c.sef = sef;
                    c.x = Reach::Falls;
                    c
                }
                Some(l) => {
                    let mut add = Node::with_children(
                        NodeKind::Bin(BinOp::Add),
                        Some(Type::List),
                        vec![l, elem],
                    );
                    add.sef = true;
                    add.x = Reach::Falls;
                    add
                }
            });
        }
        match left {
            Some(l) => {
                *node = l;
                true
            }
            // Unreachable: n_elems == 0 without a left side was
            // filtered above.
            None => false,
        }
    }

    fn post(&mut self, node: &mut Node) {
        let (ret_ty, is_function) = match &node.kind {
            NodeKind::FnDef { scope, .. } => (node.ty, scope.is_some()),
            _ => return,
        };
        if !is_function || !self.bad_st_ch {
            return;
        }

        // At least one state change survived in a function body (a
        // result of earlier optimization). LSL forbids a direct state
        // change in a function that returns a value, so the body is
        // wrapped in if (1) { ... } with a synthetic return appended.
        let scope = self.symtab.push_scope();
        let old_body = std::mem::take(&mut node.ch[0]);

        let mut one = Node::const_val(Value::Integer(1));
        one.x = Reach::Falls;
        let mut if_node = Node::with_children(NodeKind::If, None, vec![one, old_body]);
        if_node.x = Reach::Falls;

        let mut wrapper =
            Node::with_children(NodeKind::Block { scope }, None, vec![if_node]);
        wrapper.x = Reach::Falls;

        if let Some(t) = ret_ty {
            let mut default = Node::const_val(t.default_value());
            default.x = Reach::Falls;
            let mut ret = Node::with_children(NodeKind::Return, None, vec![default]);
            ret.x = Reach::Stops;
            ret.lir = true;
            wrapper.ch.push(ret);
        }
        node.ch[0] = wrapper;
        self.bad_st_ch = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lslc_lang::builtin_library;
    use lslc_par::Parser;

    fn run(src: &str, opts: Options) -> (Script, LastPassInfo) {
        let (mut script, opts) =
            Parser::parse(src, opts, builtin_library(), "<stdin>").expect("parse");
        crate::fold::fold_script(&mut script, &opts, builtin_library());
        let info = last_pass(&mut script, &opts);
        (script, info)
    }

    fn find<'a>(node: &'a Node, pred: &dyn Fn(&Node) -> bool, out: &mut Vec<&'a Node>) {
        if pred(node) {
            out.push(node);
        }
        for c in &node.ch {
            find(c, pred, out);
        }
    }

    #[test]
    fn used_library_functions_are_collected() {
        let (_, info) = run(
            "default { timer() { llOwnerSay((string)llGetUnixTime()); } }",
            Options::default(),
        );
        assert!(info.used_lib_funcs.contains("llOwnerSay"));
        assert!(info.used_lib_funcs.contains("llGetUnixTime"));
        assert!(!info.used_lib_funcs.contains("llAbs"));
    }

    #[test]
    fn udf_calls_are_not_library_uses() {
        let (_, info) = run(
            "ping() { } default { timer() { ping(); } }",
            Options::default(),
        );
        assert!(!info.used_lib_funcs.contains("ping"));
    }

    #[test]
    fn list_literal_becomes_addition_chain() {
        let mut opts = Options::default();
        opts.optimize = true;
        opts.optlistadd = true;
        // A side-effecting element keeps the literal from being
        // rewritten.
        let (script, _) = run(
            "default { timer() { list x = [llFrand(1.0), 2]; llOwnerSay((string)x); } }",
            opts,
        );
        let mut lists = Vec::new();
        let mut casts = Vec::new();
        for item in &script.tree {
            find(item, &|n| matches!(n.kind, NodeKind::ListLit), &mut lists);
            find(
                item,
                &|n| {
                    matches!(n.kind, NodeKind::Cast)
                        && n.ty == Some(lslc_lang::Type::List)
                },
                &mut casts,
            );
        }
        // The literal contains a non-SEF call, so it must NOT be
        // rewritten.
        assert_eq!(lists.len(), 1);
        assert!(casts.is_empty());

        // With pure elements the rewrite applies: [g, 2] expands into
        // (list)g + 2.
        let (script, _) = run(
            "integer g;\ndefault { timer() { llOwnerSay((string)[g, 2]); } }",
            opts,
        );
        let mut adds = Vec::new();
        for item in &script.tree {
            find(
                item,
                &|n| {
                    matches!(n.kind, NodeKind::Bin(BinOp::Add))
                        && n.ty == Some(lslc_lang::Type::List)
                },
                &mut adds,
            );
        }
        assert!(!adds.is_empty());
    }

    #[test]
    fn global_initializers_keep_their_lists() {
        let mut opts = Options::defaults();
        opts.optlistadd = true;
        let (script, _) = run(
            "list gl = [1, 2, 3];\ndefault { timer() { llOwnerSay((string)gl); } }",
            opts,
        );
        let decl = script
            .tree
            .iter()
            .find(|n| matches!(n.kind, NodeKind::Decl { .. }))
            .expect("global decl");
        assert!(decl.ch[0].is_const());
    }
}
