//! Library-aware call optimization.
//!
//! Rewrites of calls whose arguments or list structure make the result
//! predictable, applied during constant folding. All of these depend on
//! the documented semantics of the LSL library:
//!
//! - `llGetListLength(e)` → `(e != [])` (option `listlength`);
//! - `llDumpList2String(L, "")` → `(string)L`, and for known, short,
//!   side-effect-free lists a right-associative sum of per-element
//!   string casts;
//! - `llList2<Type>(L, k)` with constant `k`: compile-time extraction
//!   through the list compatibility table, including the special cases
//!   where `L` is a `llGetObjectDetails` or `llGetPrimitiveParams`
//!   call whose parameter list determines the element type;
//! - `llDialog` with a lone `"OK"` button list drops the list;
//! - `llDeleteSubList(x,0,-1)` / `llListReplaceList(x,[],0,-1)` → `[]`;
//! - argument canonicalization: sensor arcs above PI become 4.0, and
//!   invalid constant keys become `""`.

use lslc_lang::arith::{self, is_valid_key};
use lslc_lang::library::{
    default_list_value, is_sensor_function, keeps_key_arguments, list_compat,
    prim_param_takes_arg, OBJ_DETAILS_TYPES, PRIM_PARAMS_TYPES,
};
use lslc_lang::{Library, Type, Value};
use lslc_par::ast::{BinOp, Node, NodeKind};
use lslc_par::symtab::{ScopeId, SymTab};

use crate::fold::Folder;
use crate::{cast_to, live_const};

/// An element of a (possibly only partially constant) list expression.
pub(crate) enum ListElem<'n> {
    Val(Value),
    Expr(&'n Node),
}

impl ListElem<'_> {
    pub(crate) fn const_value(&self) -> Option<Value> {
        match self {
            ListElem::Val(v) => Some(v.clone()),
            ListElem::Expr(n) => n.const_value().cloned(),
        }
    }

    fn ty(&self) -> Option<Type> {
        match self {
            ListElem::Val(v) => Some(v.ty()),
            ListElem::Expr(n) => n.ty,
        }
    }

    fn to_node(&self) -> Node {
        match self {
            ListElem::Val(v) => Node::const_val(v.clone()),
            ListElem::Expr(n) => (*n).clone(),
        }
    }
}

/// Number of elements of a list-typed expression, when it can be
/// determined syntactically.
pub(crate) fn list_node_length(node: &Node) -> Option<usize> {
    match &node.kind {
        NodeKind::Const(Value::List(l)) => Some(l.len()),
        NodeKind::ListLit => Some(node.ch.len()),
        NodeKind::Cast if node.ty == Some(Type::List) => {
            let inner = node.ch.first()?;
            if inner.ty == Some(Type::List) {
                list_node_length(inner)
            } else {
                Some(1)
            }
        }
        _ => None,
    }
}

/// Element `idx` (negative indexes count from the end) of a list-typed
/// expression, when it can be determined.
pub(crate) fn list_node_element(node: &Node, idx: i32) -> Option<ListElem<'_>> {
    let len = list_node_length(node)? as i32;
    let idx = if idx < 0 { idx + len } else { idx };
    if idx < 0 || idx >= len {
        return None;
    }
    match &node.kind {
        NodeKind::Const(Value::List(l)) => l.get(idx as usize).cloned().map(ListElem::Val),
        NodeKind::ListLit => node.ch.get(idx as usize).map(ListElem::Expr),
        NodeKind::Cast => {
            let inner = node.ch.first()?;
            if inner.ty == Some(Type::List) {
                list_node_element(inner, idx)
            } else {
                Some(ListElem::Expr(inner))
            }
        }
        _ => None,
    }
}

/// Cast a list element to string for the `llDumpList2String` rewrite.
/// Vector and rotation elements go through a list cast first so the
/// six-decimal list formatting applies.
fn cast_elem_to_string(elem: &ListElem<'_>) -> Node {
    let node = elem.to_node();
    if matches!(node.ty, Some(Type::Vector | Type::Rotation)) {
        cast_to(cast_to(node, Type::List), Type::String)
    } else {
        cast_to(node, Type::String)
    }
}

/// Canonicalize arguments of a library call: sensor arcs above PI
/// saturate to 4.0, and invalid constant keys become `""` (except for
/// functions where the distinction matters).
pub(crate) fn optimize_args(node: &mut Node, lib: &Library, symtab: &SymTab) {
    let name = match &node.kind {
        NodeKind::FnCall { name } => name.clone(),
        _ => return,
    };
    if symtab
        .get(ScopeId::GLOBAL, &name)
        .map(|s| s.is_udf())
        .unwrap_or(false)
    {
        // User-defined: nothing is known about its arguments.
        return;
    }

    if is_sensor_function(&name) {
        // The actual cutoff is a bit below 3.1275, but PI is used.
        if let Some(arg) = node.ch.get_mut(4) {
            if let NodeKind::Const(Value::Float(f)) = &mut arg.kind {
                if *f > 3.14159 {
                    *f = 4.0;
                }
            }
        }
    }

    let Some(libfn) = lib.funcs.get(&name) else {
        return;
    };
    if keeps_key_arguments(&name) {
        return;
    }
    for (i, t) in libfn.param_types.iter().enumerate() {
        if *t != Type::Key {
            continue;
        }
        let Some(arg) = node.ch.get_mut(i) else {
            continue;
        };
        let key_text = match &arg.kind {
            NodeKind::Const(Value::Key(s)) | NodeKind::Const(Value::Str(s)) => s.clone(),
            _ => continue,
        };
        if !is_valid_key(&key_text) && !key_text.is_empty() {
            // e.g. llGetOwnerKey(NULL_KEY) -> llGetOwnerKey("")
            let mut repl = live_const(Value::Str(String::new()));
            repl.x = arg.x;
            *arg = repl;
        }
    }
}

/// Apply the per-call rewrites. `folder` is the constant folder, used
/// to re-fold rewritten subtrees.
pub(crate) fn optimize_call(folder: &mut Folder<'_>, node: &mut Node) {
    let name = match &node.kind {
        NodeKind::FnCall { name } => name.clone(),
        _ => return,
    };

    if folder.opts.listlength && name == "llGetListLength" {
        // llGetListLength(expr) -> (expr != [])
        let arg = node.ch.remove(0);
        let sef = arg.sef;
        let mut repl = Node::with_children(
            NodeKind::Bin(BinOp::Ne),
            Some(Type::Integer),
            vec![arg, Node::const_val(Value::List(Vec::new()))],
        );
        repl.sef = sef;
        *node = repl;
        return;
    }

    if name == "llDumpList2String" {
        optimize_dump_list(folder, node);
        return;
    }

    if matches!(
        name.as_str(),
        "llList2String" | "llList2Key" | "llList2Integer" | "llList2Float" | "llList2Vector"
            | "llList2Rot"
    ) {
        optimize_list_extraction(folder, node, &name);
        return;
    }

    if name == "llDialog" {
        // A lone "OK" button is the default.
        if list_node_length(&node.ch[2]) == Some(1) {
            let button = list_node_element(&node.ch[2], 0).and_then(|e| e.const_value());
            if button == Some(Value::Str("OK".into())) {
                node.ch[2] = live_const(Value::List(Vec::new()));
            }
        }
        return;
    }

    let whole_replace = name == "llDeleteSubList"
        || (name == "llListReplaceList"
            && matches!(node.ch[1].const_value(), Some(Value::List(l)) if l.is_empty()));
    if whole_replace {
        // llDeleteSubList(x, 0, -1) -> [] when x is side-effect free,
        // and likewise llListReplaceList(x, [], 0, -1).
        let n = node.ch.len();
        if node.ch[0].sef
            && node.ch[n - 2].const_value() == Some(&Value::Integer(0))
            && node.ch[n - 1].const_value() == Some(&Value::Integer(-1))
        {
            *node = live_const(Value::List(Vec::new()));
        }
    }
}

fn optimize_dump_list(folder: &mut Folder<'_>, node: &mut Node) {
    let sep_is_empty = matches!(
        node.ch[1].const_value(),
        Some(Value::Str(s) | Value::Key(s)) if s.is_empty()
    );
    if sep_is_empty {
        // llDumpList2String(expr, "") -> (string)expr
        node.kind = NodeKind::Cast;
        node.ch.truncate(1);
        return;
    }

    let list_len = list_node_length(&node.ch[0]);

    if list_len == Some(1) && node.ch[1].sef {
        // A single-element list converts regardless of side effects in
        // the element.
        let repl = list_node_element(&node.ch[0], 0).map(|e| cast_elem_to_string(&e));
        if let Some(mut repl) = repl {
            folder.fold(&mut repl);
            *node = repl;
            return;
        }
    }

    if !node.sef {
        return;
    }
    let Some(n) = list_len else {
        return;
    };
    if n == 0 {
        // Empty list, any separator: empty string.
        *node = Node::const_val(Value::Str(String::new()));
        return;
    }
    // Only expand when the separator is trivial, or the sums get big.
    if !matches!(node.ch[1].kind, NodeKind::Const(_) | NodeKind::Ident { .. }) {
        return;
    }
    if n > 10 {
        return;
    }

    // Every element must be extractable and must not itself be a list.
    let mut elems: Vec<Node> = Vec::with_capacity(n);
    for i in 0..n {
        match list_node_element(&node.ch[0], i as i32) {
            Some(e) if e.ty() != Some(Type::List) => elems.push(cast_elem_to_string(&e)),
            _ => return,
        }
    }

    // Build the sum right-to-left to keep the stack shallow.
    let sep = cast_to(node.ch[1].clone(), Type::String);
    let mut acc = match elems.pop() {
        Some(e) => e,
        None => return,
    };
    while let Some(elem) = elems.pop() {
        let mut inner = Node::with_children(
            NodeKind::Bin(BinOp::Add),
            Some(Type::String),
            vec![sep.clone(), acc],
        );
        inner.sef = true;
        let mut outer = Node::with_children(
            NodeKind::Bin(BinOp::Add),
            Some(Type::String),
            vec![elem, inner],
        );
        outer.sef = true;
        acc = outer;
    }
    *node = acc;
    folder.fold(node);
}

fn optimize_list_extraction(folder: &mut Folder<'_>, node: &mut Node, name: &str) {
    let idx = match node.ch[1].const_value() {
        Some(Value::Integer(i)) => *i,
        _ => return,
    };
    let ret_ty = match node.ty {
        Some(t) => t,
        None => return,
    };

    // Direct extraction from a known list.
    let direct = list_node_element(&node.ch[0], idx).and_then(|e| e.const_value());
    if let Some(cv) = direct {
        if node.sef {
            let out = if list_compat(ret_ty.tag(), cv.ty().tag()) {
                arith::typecast(&cv, ret_ty, true).ok()
            } else {
                default_list_value(name)
            };
            if let Some(v) = out {
                *node = Node::const_val(v);
                return;
            }
        }
    }

    let inner_call = match &node.ch[0].kind {
        NodeKind::FnCall { name } => name.as_str(),
        _ => return,
    };

    if inner_call == "llGetObjectDetails" {
        let (elem_exists, code, single) = {
            let params = &node.ch[0].ch[1];
            let elem = list_node_element(params, idx);
            let code = elem
                .as_ref()
                .and_then(|e| e.const_value())
                .and_then(|v| v.as_int());
            (elem.is_some(), code, list_node_length(params) == Some(1))
        };

        if let Some(code) = code {
            if single {
                // A single known detail can be extracted with casts.
                if name == "llList2String" {
                    node.kind = NodeKind::Cast;
                    node.ch.truncate(1);
                    return;
                }
                let finaltype = usize::try_from(code)
                    .ok()
                    .and_then(|c| OBJ_DETAILS_TYPES.as_bytes().get(c))
                    .map(|b| *b as char);
                let castable = match (name, finaltype) {
                    ("llList2Key", Some(_)) => true,
                    ("llList2Integer" | "llList2Float", Some('s' | 'i')) => true,
                    _ => false,
                };
                if castable
                    && finaltype
                        .map(|ft| list_compat(ret_ty.tag(), ft))
                        .unwrap_or(false)
                {
                    // -> (type)((string)llGetObjectDetails(...))
                    node.kind = NodeKind::Cast;
                    node.ch.truncate(1);
                    let inner = std::mem::take(&mut node.ch[0]);
                    node.ch[0] = cast_to(inner, Type::String);
                    folder.fold(&mut node.ch[0]);
                    return;
                }
            }
        }

        // Type incompatibility or out-of-range index: the default.
        let incompatible = match code {
            None => !elem_exists,
            Some(c) => {
                let stored = usize::try_from(c)
                    .ok()
                    .and_then(|c| OBJ_DETAILS_TYPES.as_bytes().get(c))
                    .map(|b| *b as char);
                match stored {
                    Some(s) => !list_compat(ret_ty.tag(), s),
                    None => true,
                }
            }
        };
        if incompatible && node.sef {
            if let Some(v) = default_list_value(name) {
                *node = Node::const_val(v);
            }
        }
        return;
    }

    if matches!(inner_call, "llGetPrimitiveParams" | "llGetLinkPrimitiveParams") {
        let params_idx = if inner_call == "llGetPrimitiveParams" { 0 } else { 1 };

        // Build the per-index return-type string; '*' marks a
        // parameter whose arity is context-dependent, after which
        // nothing is predictable.
        let returntypes = {
            let params = &node.ch[0].ch[params_idx];
            let Some(length) = list_node_length(params) else {
                return;
            };
            let mut rt = String::new();
            for i in 0..length {
                let code = list_node_element(params, i as i32)
                    .and_then(|e| e.const_value())
                    .and_then(|v| v.as_int());
                let types = code.and_then(|c| {
                    // Parameters taking a face/link argument can raise
                    // runtime errors; never fold those.
                    if prim_param_takes_arg(c) {
                        return None;
                    }
                    usize::try_from(c)
                        .ok()
                        .and_then(|c| PRIM_PARAMS_TYPES.get(c))
                        .copied()
                        .flatten()
                });
                match types {
                    Some(t) => rt.push_str(t),
                    None => return,
                }
            }
            rt
        };

        if returntypes.len() == 1 && returntypes != "*" && (idx == 0 || idx == -1) {
            if name == "llList2String" {
                node.kind = NodeKind::Cast;
                node.ch.truncate(1);
                return;
            }
            let only = returntypes.as_bytes()[0] as char;
            let castable = match name {
                "llList2Key" => true,
                "llList2Integer" | "llList2Float" => matches!(only, 's' | 'i'),
                _ => false,
            };
            if castable && list_compat(ret_ty.tag(), only) {
                node.kind = NodeKind::Cast;
                node.ch.truncate(1);
                let inner = std::mem::take(&mut node.ch[0]);
                node.ch[0] = cast_to(inner, Type::String);
                folder.fold(&mut node.ch[0]);
                return;
            }
        }

        // Positions past the first '*' cannot be determined.
        let rt_len = returntypes.len() as i32;
        let ast_pos = returntypes.find('*').map(|p| p as i32);
        let determinable = match ast_pos {
            None => true,
            Some(p) => (0 <= idx && idx < p) || (p - rt_len < idx && idx < 0),
        };
        if determinable {
            let real_idx = if idx < 0 { idx + rt_len } else { idx };
            let stored = usize::try_from(real_idx)
                .ok()
                .and_then(|i| returntypes.as_bytes().get(i))
                .map(|b| *b as char);
            let compatible = stored
                .map(|s| list_compat(ret_ty.tag(), s))
                .unwrap_or(false);
            if !compatible && node.sef {
                if let Some(v) = default_list_value(name) {
                    *node = Node::const_val(v);
                }
            }
        }
    }
}
