//! Multi-scope symbol table.
//!
//! Scopes are an append-only list of ordered maps; scope 0 is the
//! global scope and is seeded with the library functions. The parser
//! keeps a separate stack of scope indices for visibility; passes that
//! re-walk the tree rebuild the stack from the scopes recorded on block
//! and function nodes. Symbols refer to their defining tree item by
//! index (`loc`), never by pointer.

use indexmap::IndexMap;
use lslc_lang::{Library, Type};

use crate::ast::Node;

/// Index of a scope in the symbol table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub u32);

impl ScopeId {
    pub const GLOBAL: ScopeId = ScopeId(0);

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Kind-specific symbol payload.
#[derive(Clone, Debug)]
pub enum SymKind {
    Var {
        ty: Type,
        param: bool,
    },
    Func {
        ret: Option<Type>,
        param_types: Vec<Type>,
        /// Present only for user-defined functions.
        param_names: Option<Vec<String>>,
        inline: bool,
    },
    Label,
    State,
    Event {
        param_types: Vec<Type>,
        param_names: Vec<String>,
    },
}

/// What the dead-code pass knows about writes to a variable.
#[derive(Clone, Debug, Default)]
pub enum Writer {
    /// No write seen (event parameters stay here).
    #[default]
    None,
    /// Exactly one write; the written expression.
    Node(Box<Node>),
    /// Written more than once, or written through a call.
    Multi,
}

impl Writer {
    pub fn is_multi(&self) -> bool {
        matches!(self, Writer::Multi)
    }
}

/// One symbol table entry.
#[derive(Clone, Debug)]
pub struct Symbol {
    pub kind: SymKind,
    /// The scope the symbol lives in (meaningful for variables and
    /// labels; global kinds use scope 0).
    pub scope: ScopeId,
    /// Index of the defining item in the tree root, for globals.
    pub loc: Option<usize>,
    /// Replacement name assigned by label dedup or the renamer.
    pub new_name: Option<String>,
    /// Live `jump` statements targeting this label.
    pub label_refs: u32,
    /// Read count, maintained by the dead-code mark phase. Zero means
    /// never read.
    pub reads: u32,
    /// Write tracking, maintained by the dead-code mark phase.
    pub writer: Writer,
    /// Referenced through a vector/rotation component selector.
    pub fld: bool,
}

impl Symbol {
    fn base(kind: SymKind, scope: ScopeId) -> Symbol {
        Symbol {
            kind,
            scope,
            loc: None,
            new_name: None,
            label_refs: 0,
            reads: 0,
            writer: Writer::None,
            fld: false,
        }
    }

    pub fn var(ty: Type, scope: ScopeId) -> Symbol {
        Symbol::base(SymKind::Var { ty, param: false }, scope)
    }

    pub fn param(ty: Type, scope: ScopeId) -> Symbol {
        Symbol::base(SymKind::Var { ty, param: true }, scope)
    }

    pub fn func(
        ret: Option<Type>,
        param_types: Vec<Type>,
        param_names: Option<Vec<String>>,
        inline: bool,
    ) -> Symbol {
        Symbol::base(
            SymKind::Func {
                ret,
                param_types,
                param_names,
                inline,
            },
            ScopeId::GLOBAL,
        )
    }

    pub fn label(scope: ScopeId) -> Symbol {
        Symbol::base(SymKind::Label, scope)
    }

    pub fn state() -> Symbol {
        Symbol::base(SymKind::State, ScopeId::GLOBAL)
    }

    pub fn event(param_types: Vec<Type>, param_names: Vec<String>, scope: ScopeId) -> Symbol {
        Symbol::base(
            SymKind::Event {
                param_types,
                param_names,
            },
            scope,
        )
    }

    pub fn is_var(&self) -> bool {
        matches!(self.kind, SymKind::Var { .. })
    }

    pub fn is_func(&self) -> bool {
        matches!(self.kind, SymKind::Func { .. })
    }

    pub fn is_label(&self) -> bool {
        matches!(self.kind, SymKind::Label)
    }

    pub fn is_state(&self) -> bool {
        matches!(self.kind, SymKind::State)
    }

    /// Variable type, if this is a variable.
    pub fn var_type(&self) -> Option<Type> {
        match &self.kind {
            SymKind::Var { ty, .. } => Some(*ty),
            _ => None,
        }
    }

    /// Function return type, if this is a function.
    pub fn func_ret(&self) -> Option<Type> {
        match &self.kind {
            SymKind::Func { ret, .. } => *ret,
            _ => None,
        }
    }

    pub fn func_param_types(&self) -> Option<&[Type]> {
        match &self.kind {
            SymKind::Func { param_types, .. } => Some(param_types),
            _ => None,
        }
    }

    /// True for user-defined functions (library entries have no
    /// definition in the tree).
    pub fn is_udf(&self) -> bool {
        self.is_func() && self.loc.is_some()
    }
}

/// The symbol table: an indexed list of per-scope ordered maps.
#[derive(Clone, Debug, Default)]
pub struct SymTab {
    pub scopes: Vec<IndexMap<String, Symbol>>,
}

impl SymTab {
    /// A table with an empty global scope.
    pub fn new() -> SymTab {
        SymTab {
            scopes: vec![IndexMap::new()],
        }
    }

    /// A table whose global scope is seeded with the library functions.
    pub fn with_library(lib: &Library) -> SymTab {
        let mut tab = SymTab::new();
        for (name, f) in &lib.funcs {
            tab.scopes[0].insert(
                name.clone(),
                Symbol::func(f.ret, f.param_types.clone(), None, false),
            );
        }
        tab
    }

    /// Append a fresh scope and return its id.
    pub fn push_scope(&mut self) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(IndexMap::new());
        id
    }

    pub fn get(&self, scope: ScopeId, name: &str) -> Option<&Symbol> {
        self.scopes.get(scope.index())?.get(name)
    }

    pub fn get_mut(&mut self, scope: ScopeId, name: &str) -> Option<&mut Symbol> {
        self.scopes.get_mut(scope.index())?.get_mut(name)
    }

    pub fn insert(&mut self, scope: ScopeId, name: &str, sym: Symbol) {
        if let Some(map) = self.scopes.get_mut(scope.index()) {
            map.insert(name.to_string(), sym);
        }
    }

    pub fn contains(&self, scope: ScopeId, name: &str) -> bool {
        self.get(scope, name).is_some()
    }

    /// Remove a global symbol, preserving the order of the rest.
    pub fn remove_global(&mut self, name: &str) {
        self.scopes[0].shift_remove(name);
    }
}
