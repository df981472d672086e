//! lslc-opt - Optimization passes
//!
//! The passes run in a fixed order, each depending on the annotations
//! of the previous one:
//!
//! 1. constant folding ([`fold`]), which also applies the
//!    library-aware per-call rewrites ([`funcopt`]) and propagates the
//!    side-effect-free flag the later passes trust;
//! 2. dead code removal ([`deadcode`]): reachability marking from the
//!    `default` state, then tree rewriting;
//! 3. the last pass ([`lastpass`]): rewrites that would hinder the
//!    other passes (list-to-addition rewriting, legalization of state
//!    switches left inside functions), plus collection of the used
//!    library functions;
//! 4. the identifier shrinker ([`rename`]), when enabled.

pub mod deadcode;
pub mod fold;
pub mod funcopt;
pub mod lastpass;
pub mod rename;

use std::collections::BTreeSet;

use lslc_lang::{Library, Type};
use lslc_par::ast::{Node, NodeKind, Reach};
use lslc_par::Script;
use lslc_util::Options;

/// Results of the pipeline other tools consume.
#[derive(Clone, Debug, Default)]
pub struct OptimizerInfo {
    /// Library functions referenced by the final tree, in sorted order.
    pub used_lib_funcs: BTreeSet<String>,
}

/// Run all enabled passes over a parsed script.
///
/// The master `optimize` switch gates the rewriting passes
/// (`constfold`, `dcr`, `optlistadd`, `listlength`). The last pass
/// always runs (it is what reports the used library functions), and
/// `shrinknames` is an independent toggle.
pub fn optimize(script: &mut Script, opts: &Options, lib: &Library) -> OptimizerInfo {
    if opts.optimize && opts.constfold {
        fold::fold_script(script, opts, lib);
    }
    if opts.optimize && opts.dcr {
        deadcode::remove_dead_code(script, lib);
        if opts.constfold {
            // Dead code removal substitutes single-writer constants
            // into their use sites; folding once more collapses the
            // expressions this opens up (e.g. list extractions).
            fold::fold_script(script, opts, lib);
        }
    }
    let info = lastpass::last_pass(script, opts);
    if opts.shrinknames {
        rename::shrink_names(script, lib, &info.used_lib_funcs);
    }
    OptimizerInfo {
        used_lib_funcs: info.used_lib_funcs,
    }
}

/// Wrap a node in a cast to `ty` unless it already has that type.
/// Constant operands are converted right away when possible.
pub(crate) fn cast_to(node: Node, ty: Type) -> Node {
    if node.ty == Some(ty) {
        return node;
    }
    if let NodeKind::Const(v) = &node.kind {
        if let Ok(out) = lslc_lang::arith::typecast(v, ty, false) {
            let mut n = Node::const_val(out);
            n.x = node.x;
            return n;
        }
    }
    let sef = node.sef;
    let x = node.x;
    let mut cast = Node::with_children(NodeKind::Cast, Some(ty), vec![node]);
    cast.sef = sef;
    cast.x = x;
    cast
}

/// A constant node that is marked executed, for insertion into an
/// already-analyzed tree.
pub(crate) fn live_const(v: lslc_lang::Value) -> Node {
    let mut n = Node::const_val(v);
    n.x = Reach::Falls;
    n
}
