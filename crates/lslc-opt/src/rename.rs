//! Identifier shrinking (`shrinknames`).
//!
//! Assigns a short replacement name to every user symbol (globals,
//! functions, parameters, locals, labels), stored in the symbol's
//! `new_name`; the emitter prints the replacement when present. Names
//! are assigned globally unique, in scope order, so no shadowing
//! hazards can appear. Reserved words, type names, event names,
//! constant names, and referenced library functions are skipped.

use std::collections::BTreeSet;

use lslc_lang::Library;
use lslc_par::symtab::SymKind;
use lslc_par::Script;
use rustc_hash::FxHashSet;

const KEYWORDS: &[&str] = &[
    "default", "state", "event", "jump", "return", "if", "else", "for", "do", "while",
    "print", "TRUE", "FALSE", "switch", "case", "break", "continue", "integer", "float",
    "string", "key", "vector", "rotation", "quaternion", "list",
];

struct NameGen {
    reserved: FxHashSet<String>,
    counter: usize,
}

const FIRST: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const NEXT: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789_";

impl NameGen {
    fn new(reserved: FxHashSet<String>) -> NameGen {
        NameGen {
            reserved,
            counter: 0,
        }
    }

    /// The n-th name of the sequence a..Z, aa..Z9, aaa...
    fn nth(mut n: usize) -> String {
        let mut name = String::new();
        name.push(FIRST[n % FIRST.len()] as char);
        n /= FIRST.len();
        while n > 0 {
            n -= 1;
            name.push(NEXT[n % NEXT.len()] as char);
            n /= NEXT.len();
        }
        name
    }

    fn next_name(&mut self) -> String {
        loop {
            let name = Self::nth(self.counter);
            self.counter += 1;
            if !self.reserved.contains(&name) {
                return name;
            }
        }
    }
}

/// Assign short names to every renameable symbol in the table.
pub fn shrink_names(script: &mut Script, lib: &Library, used_lib_funcs: &BTreeSet<String>) {
    let mut reserved: FxHashSet<String> = KEYWORDS.iter().map(|s| s.to_string()).collect();
    reserved.extend(lib.events.keys().cloned());
    reserved.extend(lib.constants.keys().cloned());
    reserved.extend(used_lib_funcs.iter().cloned());
    // States keep their original names but share the global namespace,
    // so generated names must steer clear of them.
    for scope in &script.symtab.scopes {
        for (name, sym) in scope {
            if matches!(sym.kind, SymKind::State) {
                reserved.insert(name.clone());
            }
        }
    }

    let mut gen = NameGen::new(reserved);
    for scope in script.symtab.scopes.iter_mut() {
        for sym in scope.values_mut() {
            let renameable = match &sym.kind {
                SymKind::Var { .. } => true,
                // Only user-defined functions; library entries keep
                // their names.
                SymKind::Func { param_names, .. } => param_names.is_some(),
                SymKind::Label => true,
                // States stay: their names are part of the script's
                // external behavior with the viewer.
                SymKind::State | SymKind::Event { .. } => false,
            };
            if renameable {
                sym.new_name = Some(gen.next_name());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lslc_lang::builtin_library;
    use lslc_par::symtab::ScopeId;
    use lslc_par::Parser;
    use lslc_util::Options;

    #[test]
    fn name_sequence_is_compact_and_unique() {
        assert_eq!(NameGen::nth(0), "a");
        assert_eq!(NameGen::nth(25), "z");
        assert_eq!(NameGen::nth(51), "Z");
        assert_eq!(NameGen::nth(52), "aa");
        let mut seen = std::collections::HashSet::new();
        for i in 0..2000 {
            assert!(seen.insert(NameGen::nth(i)), "duplicate at {i}");
        }
    }

    #[test]
    fn keywords_are_skipped() {
        // "do" and "if" are two-letter candidates that must never be
        // produced.
        let mut gen = NameGen::new(
            KEYWORDS.iter().map(|s| s.to_string()).collect::<FxHashSet<_>>(),
        );
        for _ in 0..10_000 {
            let n = gen.next_name();
            assert!(!KEYWORDS.contains(&n.as_str()), "reserved name {n}");
        }
    }

    #[test]
    fn symbols_get_distinct_new_names() {
        let (mut script, _) = Parser::parse(
            "integer counter;\n\
             integer bump(integer amount) { return counter + amount; }\n\
             default { timer() { integer local = bump(2); llAbs(local); } }",
            Options::default(),
            builtin_library(),
            "<stdin>",
        )
        .unwrap();
        shrink_names(&mut script, builtin_library(), &BTreeSet::new());

        let mut names = Vec::new();
        for scope in &script.symtab.scopes {
            for (old, sym) in scope {
                if let Some(new) = &sym.new_name {
                    names.push((old.clone(), new.clone()));
                }
            }
        }
        // counter, bump, amount, local all renamed.
        assert!(names.iter().any(|(o, _)| o == "counter"));
        assert!(names.iter().any(|(o, _)| o == "bump"));
        assert!(names.iter().any(|(o, _)| o == "amount"));
        assert!(names.iter().any(|(o, _)| o == "local"));
        let mut new_names: Vec<&String> = names.iter().map(|(_, n)| n).collect();
        new_names.sort_unstable();
        new_names.dedup();
        assert_eq!(new_names.len(), names.len(), "new names must be unique");

        // Library functions and states are untouched.
        let state = script.symtab.get(ScopeId::GLOBAL, "default").unwrap();
        assert!(state.new_name.is_none());
        let libfn = script.symtab.get(ScopeId::GLOBAL, "llAbs").unwrap();
        assert!(libfn.new_name.is_none());
    }

    #[test]
    fn generated_names_avoid_existing_state_names() {
        let (mut script, _) = Parser::parse(
            "integer counter;\n\
             default { timer() { counter++; state a; } }\n\
             state a { timer() { state default; } }",
            Options::default(),
            builtin_library(),
            "<stdin>",
        )
        .unwrap();
        shrink_names(&mut script, builtin_library(), &BTreeSet::new());

        // The state keeps its name, and no renamed symbol takes it.
        let state = script.symtab.get(ScopeId::GLOBAL, "a").unwrap();
        assert!(state.new_name.is_none());
        for scope in &script.symtab.scopes {
            for sym in scope.values() {
                assert_ne!(sym.new_name.as_deref(), Some("a"));
            }
        }
        // The variable still got a short name, just not "a".
        let counter = script.symtab.get(ScopeId::GLOBAL, "counter").unwrap();
        assert!(counter.new_name.is_some());
    }
}
