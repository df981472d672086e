//! Constant folding and side-effect-freeness propagation.
//!
//! A bottom-up walk over each top-level item. Operators, casts, and
//! vector/rotation/list literals with constant operands are computed
//! with the arithmetic kernel; computations the kernel refuses (e.g.
//! division by zero, which is a runtime error) stay unfolded. The SEF
//! flag is propagated upwards and is what the dead-code pass later
//! trusts when deleting initializers.
//!
//! While folding a global initializer (`globalmode`), identifier
//! references resolve to the constant values of earlier globals, and a
//! list literal that collapses to a constant keeps its original form in
//! `orig` so that globals referenced only from list literals survive
//! dead code removal and can be printed in their original shape.
//!
//! Every library function call is handed to the call optimizer
//! ([`crate::funcopt`]) after its arguments are folded.

use lslc_lang::arith::{self, cond};
use lslc_lang::{Library, Type, Value};
use lslc_par::ast::{BinOp, Node, NodeKind};
use lslc_par::symtab::{ScopeId, SymTab};
use lslc_par::Script;
use lslc_util::Options;

use crate::funcopt;

pub(crate) struct Folder<'a> {
    pub tree: &'a [Node],
    pub symtab: &'a SymTab,
    pub opts: &'a Options,
    pub lib: &'a Library,
    pub globalmode: bool,
}

/// Fold every top-level item of the script in place.
pub fn fold_script(script: &mut Script, opts: &Options, lib: &Library) {
    for i in 0..script.tree.len() {
        let mut item = std::mem::take(&mut script.tree[i]);
        let globalmode = matches!(item.kind, NodeKind::Decl { .. });
        {
            let mut folder = Folder {
                tree: &script.tree,
                symtab: &script.symtab,
                opts,
                lib,
                globalmode,
            };
            folder.fold(&mut item);
        }
        script.tree[i] = item;
    }
}

impl Folder<'_> {
    /// The constant value of a global variable, if its definition has
    /// already been folded down to one.
    fn global_const_value(&self, name: &str) -> Option<Value> {
        let sym = self.symtab.get(ScopeId::GLOBAL, name)?;
        let ty = sym.var_type()?;
        let loc = sym.loc?;
        let decl = self.tree.get(loc)?;
        match &decl.kind {
            NodeKind::Decl { .. } => {}
            _ => return None,
        }
        let value = match decl.ch.first() {
            Some(init) => init.const_value()?.clone(),
            None => ty.default_value(),
        };
        arith::typecast(&value, ty, false).ok()
    }

    fn fold_children(&mut self, node: &mut Node) {
        for c in &mut node.ch {
            self.fold(c);
        }
    }

    fn all_const(node: &Node) -> bool {
        node.ch.iter().all(Node::is_const)
    }

    fn all_sef(node: &Node) -> bool {
        node.ch.iter().all(|c| c.sef)
    }

    /// Fold a subtree in place. Reachability markings survive
    /// replacement, so folding may run again after dead code removal.
    pub(crate) fn fold(&mut self, node: &mut Node) {
        let x0 = node.x;
        self.fold_inner(node);
        if !node.x.is_set() {
            node.x = x0;
        }
    }

    fn fold_inner(&mut self, node: &mut Node) {
        match &node.kind {
            NodeKind::Const(_) => {
                node.sef = true;
            }

            NodeKind::Ident { name, scope } => {
                node.sef = true;
                if self.globalmode && *scope == ScopeId::GLOBAL {
                    if let Some(v) = self.global_const_value(name) {
                        *node = Node::const_val(v);
                    }
                }
            }

            NodeKind::Field(fld) => {
                let fld = *fld;
                self.fold_children(node);
                node.sef = Self::all_sef(node);
                let component = match node.ch.first().and_then(Node::const_value) {
                    Some(Value::Vector(v)) => v.get(fld.index()).copied(),
                    Some(Value::Rotation(r)) => r.get(fld.index()).copied(),
                    _ => None,
                };
                if let Some(f) = component {
                    *node = Node::const_val(Value::Float(f));
                }
            }

            NodeKind::VectorLit | NodeKind::RotationLit => {
                let is_vector = matches!(node.kind, NodeKind::VectorLit);
                self.fold_children(node);
                node.sef = Self::all_sef(node);
                if Self::all_const(node) {
                    let mut comps = [0.0f32; 4];
                    let mut ok = true;
                    for (i, c) in node.ch.iter().enumerate() {
                        match c.const_value() {
                            Some(Value::Float(f)) => comps[i] = *f,
                            Some(Value::Integer(n)) => comps[i] = *n as f32,
                            _ => ok = false,
                        }
                    }
                    if ok {
                        let v = if is_vector {
                            Value::Vector([comps[0], comps[1], comps[2]])
                        } else {
                            Value::Rotation(comps)
                        };
                        *node = Node::const_val(v);
                    }
                }
            }

            NodeKind::ListLit => {
                // Keep the pre-fold shape for globals: the emitter
                // prints it, and dead code removal protects the globals
                // it references.
                let orig = if self.globalmode {
                    Some(Box::new(node.clone()))
                } else {
                    None
                };
                self.fold_children(node);
                node.sef = Self::all_sef(node);
                let foldable = Self::all_const(node)
                    && node.ch.iter().all(|c| c.ty != Some(Type::List));
                if foldable {
                    let values: Vec<Value> = node
                        .ch
                        .iter()
                        .filter_map(|c| c.const_value().cloned())
                        .collect();
                    *node = Node::const_val(Value::List(values));
                    node.orig = orig;
                }
            }

            NodeKind::Bin(op) => {
                let op = *op;
                self.fold_children(node);
                node.sef = Self::all_sef(node);
                self.fold_binop(node, op);
            }

            NodeKind::Neg => {
                self.fold_children(node);
                node.sef = Self::all_sef(node);
                if let Some(v) = node.ch[0].const_value() {
                    if let Ok(out) = arith::neg(v) {
                        *node = Node::const_val(out);
                    }
                }
            }

            NodeKind::Not => {
                self.fold_children(node);
                node.sef = Self::all_sef(node);
                if let Some(Value::Integer(i)) = node.ch[0].const_value() {
                    let out = (*i == 0) as i32;
                    *node = Node::const_val(Value::Integer(out));
                }
            }

            NodeKind::BitNot => {
                self.fold_children(node);
                node.sef = Self::all_sef(node);
                if let Some(Value::Integer(i)) = node.ch[0].const_value() {
                    let out = !*i;
                    *node = Node::const_val(Value::Integer(out));
                }
            }

            NodeKind::Cast => {
                self.fold_children(node);
                node.sef = Self::all_sef(node);
                let target = node.ty;
                if let (Some(v), Some(t)) = (node.ch[0].const_value(), target) {
                    if let Ok(out) = arith::typecast(v, t, false) {
                        *node = Node::const_val(out);
                        return;
                    }
                }
                // A cast to the operand's own type is a no-op.
                if node.ch[0].ty == target {
                    let inner = node.ch.remove(0);
                    *node = inner;
                }
            }

            NodeKind::FnCall { name } => {
                let name = name.clone();
                self.fold_children(node);
                let sym = self.symtab.get(ScopeId::GLOBAL, &name);
                let is_udf = sym.map(|s| s.is_udf()).unwrap_or(false);
                let lib_sef = self.lib.funcs.get(&name).map(|f| f.sef).unwrap_or(false);
                node.sef = !is_udf && lib_sef && Self::all_sef(node);
                funcopt::optimize_args(node, self.lib, self.symtab);
                funcopt::optimize_call(self, node);
            }

            NodeKind::Print | NodeKind::SubIdx => {
                self.fold_children(node);
            }

            NodeKind::Assign(_)
            | NodeKind::PostIncr
            | NodeKind::PostDecr
            | NodeKind::PreIncr
            | NodeKind::PreDecr => {
                self.fold_children(node);
            }

            NodeKind::Empty => {
                node.sef = true;
            }

            NodeKind::ExprStmt => {
                self.fold_children(node);
                // A statement whose expression does nothing is an
                // empty statement.
                if !self.globalmode && node.ch[0].sef {
                    let mut empty = Node::new(NodeKind::Empty, None);
                    empty.sef = true;
                    *node = empty;
                }
            }

            NodeKind::If => {
                self.fold(&mut node.ch[0]);
                if let Some(v) = node.ch[0].const_value() {
                    let taken = if cond(v) {
                        Some(1)
                    } else if node.ch.len() == 3 {
                        Some(2)
                    } else {
                        None
                    };
                    match taken {
                        Some(i) => {
                            let mut branch = node.ch.remove(i);
                            self.fold(&mut branch);
                            *node = branch;
                        }
                        None => {
                            let mut empty = Node::new(NodeKind::Empty, None);
                            empty.sef = true;
                            *node = empty;
                        }
                    }
                    return;
                }
                for c in node.ch.iter_mut().skip(1) {
                    self.fold(c);
                }
            }

            _ => {
                // Statements and top-level constructs: fold children.
                self.fold_children(node);
            }
        }
    }

    fn fold_binop(&mut self, node: &mut Node, op: BinOp) {
        use BinOp::*;

        let (a, b) = (node.ch[0].const_value(), node.ch[1].const_value());
        if let (Some(a), Some(b)) = (a, b) {
            let result = match op {
                Add => arith::add(a, b),
                Sub => arith::sub(a, b),
                Mul => arith::mul(a, b),
                Div => arith::div(a, b),
                Mod => arith::modulo(a, b),
                Eq => arith::eq(a, b),
                Ne => arith::ne(a, b),
                Lt => arith::compare(arith::Ordering::Lt, a, b),
                Le => arith::compare(arith::Ordering::Le, a, b),
                Gt => arith::compare(arith::Ordering::Gt, a, b),
                Ge => arith::compare(arith::Ordering::Ge, a, b),
                Shl | Shr => match (a, b) {
                    (Value::Integer(x), Value::Integer(y)) => Ok(Value::Integer(if op == Shl {
                        arith::shl(*x, *y)
                    } else {
                        arith::shr(*x, *y)
                    })),
                    _ => Err(arith::CantCompute),
                },
                BitAnd | BitOr | BitXor => match (a, b) {
                    (Value::Integer(x), Value::Integer(y)) => Ok(Value::Integer(match op {
                        BitAnd => x & y,
                        BitOr => x | y,
                        _ => x ^ y,
                    })),
                    _ => Err(arith::CantCompute),
                },
                And | Or => match (a, b) {
                    (Value::Integer(_), Value::Integer(_)) => {
                        let r = if op == And {
                            cond(a) && cond(b)
                        } else {
                            cond(a) || cond(b)
                        };
                        Ok(Value::Integer(r as i32))
                    }
                    _ => Err(arith::CantCompute),
                },
            };
            match result {
                Ok(v) => *node = Node::const_val(v),
                // A constant expression the kernel refuses (division
                // by zero) would be a runtime error; never delete it.
                Err(arith::CantCompute) => node.sef = false,
            }
            return;
        }

        // LSL's && and || evaluate both sides, so a deciding constant
        // on either side folds the whole expression when the other
        // side is side-effect free.
        if matches!(op, And | Or) {
            let l = node.ch[0].const_value().map(cond);
            let r = node.ch[1].const_value().map(cond);
            let l_sef = node.ch[0].sef;
            let r_sef = node.ch[1].sef;
            if op == And && ((l == Some(false) && r_sef) || (r == Some(false) && l_sef)) {
                *node = Node::const_val(Value::Integer(0));
            } else if op == Or && ((l == Some(true) && r_sef) || (r == Some(true) && l_sef)) {
                *node = Node::const_val(Value::Integer(1));
            }
        }
    }
}
