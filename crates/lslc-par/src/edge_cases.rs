//! Parser and type-checker tests.

use lslc_lang::{builtin_library, Type, Value};
use lslc_util::{CompileError, ErrorKind, Options};

use crate::ast::{Node, NodeKind};
use crate::symtab::ScopeId;
use crate::{Parser, Script};

fn parse_opts(src: &str, opts: Options) -> Result<Script, CompileError> {
    Parser::parse(src, opts, builtin_library(), "<stdin>").map(|(s, _)| s)
}

fn parse(src: &str) -> Result<Script, CompileError> {
    parse_opts(src, Options::default())
}

fn parse_err(src: &str) -> ErrorKind {
    parse(src).expect_err("expected a compile error").kind
}

/// Walk the whole tree, yielding every node.
fn walk<'a>(node: &'a Node, out: &mut Vec<&'a Node>) {
    out.push(node);
    for c in &node.ch {
        walk(c, out);
    }
}

fn all_nodes(script: &Script) -> Vec<&Node> {
    let mut out = Vec::new();
    for item in &script.tree {
        walk(item, &mut out);
    }
    out
}

#[test]
fn minimal_script() {
    let script = parse("default { state_entry() { } }").unwrap();
    // Slot 0 is reserved; the state definition follows.
    assert!(matches!(script.tree[0].kind, NodeKind::Placeholder));
    assert!(matches!(
        script.tree[1].kind,
        NodeKind::StateDef { ref name } if name == "default"
    ));
    let sym = script.symtab.get(ScopeId::GLOBAL, "default").unwrap();
    assert!(sym.is_state());
    assert_eq!(sym.loc, Some(1));
}

#[test]
fn forward_references_to_globals_and_functions() {
    let script = parse(
        "integer f() { return g() + counter; }\n\
         integer g() { return 1; }\n\
         integer counter = 2;\n\
         default { state_entry() { f(); } }",
    )
    .unwrap();
    let f = script.symtab.get(ScopeId::GLOBAL, "f").unwrap();
    assert!(f.is_udf());
    assert_eq!(f.func_ret(), Some(Type::Integer));
}

#[test]
fn every_expression_is_typed() {
    let script = parse(
        "integer a = 3;\n\
         default { timer() { float x = a; llOwnerSay((string)(x * 2)); } }",
    )
    .unwrap();
    for node in all_nodes(&script) {
        match &node.kind {
            NodeKind::Const(_)
            | NodeKind::Ident { .. }
            | NodeKind::Bin(_)
            | NodeKind::Cast
            | NodeKind::Field(_) => {
                assert!(node.ty.is_some(), "untyped expression: {:?}", node.kind)
            }
            _ => {}
        }
    }
}

#[test]
fn identifier_scopes_match_symbol_table() {
    let script = parse(
        "integer g;\n\
         default { timer() { integer x; { integer y = x + g; } } }",
    )
    .unwrap();
    for node in all_nodes(&script) {
        if let NodeKind::Ident { name, scope } = &node.kind {
            assert!(
                script.symtab.get(*scope, name).is_some(),
                "identifier {name} not in its recorded scope"
            );
        }
    }
}

#[test]
fn type_mismatch_in_initializer() {
    assert_eq!(
        parse_err("default { timer() { integer x = \"a\"; } }"),
        ErrorKind::TypeMismatch
    );
}

#[test]
fn implicit_casts_are_accepted() {
    // integer→float and string↔key are implicit.
    parse(
        "default { timer() {\n\
             float f = 3;\n\
             key k = \"abc\";\n\
             string s = k;\n\
         } }",
    )
    .unwrap();
    // float→integer is not.
    assert_eq!(
        parse_err("default { timer() { integer i = 1.5; } }"),
        ErrorKind::TypeMismatch
    );
}

#[test]
fn explicitcast_materializes_casts() {
    let mut opts = Options::default();
    opts.explicitcast = true;
    let script = parse_opts("default { timer() { float f = 3; } }", opts).unwrap();
    let has_cast = all_nodes(&script)
        .iter()
        .any(|n| matches!(n.kind, NodeKind::Cast) && n.ty == Some(Type::Float));
    assert!(has_cast);
}

#[test]
fn vector_literal_vs_inequality() {
    // The third component may be a comparison.
    parse("default { timer() { vector v = <2, 2, 2 > 2>; } }").unwrap();
    // A vector literal followed by a multiplication.
    parse("default { timer() { vector v = <2, 2, 2> * 2.0; } }").unwrap();
    // Rotations take a full expression as third component.
    parse("default { timer() { rotation r = <1, 2, 2 + 1, 4>; } }").unwrap();
}

#[test]
fn key_plus_key_is_rejected() {
    assert_eq!(
        parse_err("default { timer() { key a; key b; a + b; } }"),
        ErrorKind::TypeMismatch
    );
}

#[test]
fn string_plus_key_needs_option() {
    let src = "default { timer() { string s; key k; s + k; } }";
    assert_eq!(parse_err(src), ErrorKind::TypeMismatch);
    let mut opts = Options::default();
    opts.allowkeyconcat = true;
    parse_opts(src, opts).unwrap();
}

#[test]
fn division_by_vector_is_rejected() {
    assert_eq!(
        parse_err("default { timer() { vector v; float f = 1.0; f / v; } }"),
        ErrorKind::TypeMismatch
    );
}

#[test]
fn not_all_paths_return() {
    assert_eq!(
        parse_err("integer f() { if (1) return 1; } default { timer() { } }"),
        ErrorKind::CodePathWithoutRet
    );
    // Both branches return: fine.
    parse("integer f() { if (1) return 1; else return 2; } default { timer() { } }").unwrap();
}

#[test]
fn state_change_in_function_is_rejected() {
    assert_eq!(
        parse_err("integer f() { return 1; state default; } default { timer() { } }"),
        ErrorKind::CantChangeState
    );
}

#[test]
fn state_change_under_if_without_else_is_tolerated() {
    // The engine accepts this form, so the diagnostic is deferred and
    // dropped when no else shows up.
    parse(
        "f() { if (1) state ready; }\n\
         default { timer() { f(); } }\n\
         state ready { timer() { } }",
    )
    .unwrap();
    // An else makes it real.
    assert_eq!(
        parse_err(
            "f() { if (1) state ready; else ; }\n\
             default { timer() { f(); } }\n\
             state ready { timer() { } }",
        ),
        ErrorKind::CantChangeState
    );
}

#[test]
fn state_change_in_loops_is_allowed_even_in_functions() {
    parse(
        "f() { while (1) state ready; }\n\
         default { timer() { f(); } }\n\
         state ready { timer() { } }",
    )
    .unwrap();
}

#[test]
fn void_return_value_in_void_function() {
    // `return g();` for void g is split into statement + bare return.
    parse(
        "g() { }\n\
         f() { if (1) return g(); }\n\
         default { timer() { f(); } }",
    )
    .unwrap();
    assert_eq!(
        parse_err(
            "g() { }\n\
             f() { if (1) return g(); else ; }\n\
             default { timer() { f(); } }",
        ),
        ErrorKind::ReturnShouldBeEmpty
    );
}

#[test]
fn state_switch_in_event_is_fine() {
    let script = parse(
        "default { timer() { state other; } }\n\
         state other { timer() { state default; } }",
    )
    .unwrap();
    assert!(script.symtab.get(ScopeId::GLOBAL, "other").is_some());
}

#[test]
fn jump_forward_reference_resolves() {
    let script = parse("default { timer() { jump fwd; @fwd; } }").unwrap();
    let mut jump_scope = None;
    for node in all_nodes(&script) {
        if let NodeKind::Jump { scope, .. } = &node.kind {
            jump_scope = *scope;
        }
    }
    let scope = jump_scope.expect("jump scope must be resolved");
    let sym = script.symtab.get(scope, "fwd").unwrap();
    assert!(sym.is_label());
    assert_eq!(sym.label_refs, 1);
}

#[test]
fn jump_to_undefined_label() {
    assert_eq!(
        parse_err("default { timer() { jump nowhere; } }"),
        ErrorKind::Undefined
    );
}

#[test]
fn label_visibility_skips_non_labels() {
    // The inner variable x does not hide the outer label from jump.
    parse("default { timer() { @x; { integer x; jump x; } } }").unwrap();
}

#[test]
fn duplicate_labels_rejected_by_default() {
    assert_eq!(
        parse_err("default { timer() { @x; { @x; } } }"),
        ErrorKind::DuplicateLabel
    );
    // duplabels renames the second one.
    let mut opts = Options::default();
    opts.duplabels = true;
    let script = parse_opts("default { timer() { @x; { @x; jump x; } } }", opts).unwrap();
    let mut renamed = 0;
    for scope in &script.symtab.scopes {
        for sym in scope.values() {
            if sym.is_label() && sym.new_name.is_some() {
                renamed += 1;
            }
        }
    }
    assert_eq!(renamed, 1);
}

#[test]
fn declaration_needs_a_scope() {
    assert_eq!(
        parse_err("default { timer() { if (1) integer x; } }"),
        ErrorKind::DeclarationScope
    );
}

#[test]
fn redeclaration_in_same_scope() {
    assert_eq!(
        parse_err("default { timer() { integer x; integer x; } }"),
        ErrorKind::AlreadyDefined
    );
    // Shadowing in a nested scope is fine.
    parse("default { timer() { integer x; { integer x; } } }").unwrap();
}

#[test]
fn switch_desugars_to_jumps_and_labels() {
    let mut opts = Options::default();
    opts.enableswitch = true;
    let script = parse_opts(
        "default { timer() {\n\
             switch (2) {\n\
                 case 1: llOwnerSay(\"one\"); break;\n\
                 case 2: llOwnerSay(\"two\"); break;\n\
                 default: llOwnerSay(\"other\");\n\
             }\n\
         } }",
        opts,
    )
    .unwrap();
    let nodes = all_nodes(&script);
    assert!(!nodes
        .iter()
        .any(|n| matches!(n.kind, NodeKind::Case | NodeKind::DefaultCase)));
    let jumps = nodes
        .iter()
        .filter(|n| matches!(n.kind, NodeKind::Jump { .. }))
        .count();
    // Two case jumps, one default jump, two breaks.
    assert_eq!(jumps, 5);
    // Every label the desugaring kept is referenced.
    for node in &nodes {
        if let NodeKind::Label { name, scope } = &node.kind {
            let sym = script.symtab.get(*scope, name).unwrap();
            assert!(sym.label_refs > 0, "unreferenced generated label {name}");
        }
    }
}

#[test]
fn switch_missing_default_option() {
    let mut opts = Options::default();
    opts.enableswitch = true;
    opts.errmissingdefault = true;
    assert_eq!(
        parse_opts(
            "default { timer() { switch (1) { case 1: ; } } }",
            opts
        )
        .unwrap_err()
        .kind,
        ErrorKind::MissingDefault
    );
}

#[test]
fn case_outside_switch() {
    let mut opts = Options::default();
    opts.enableswitch = true;
    assert_eq!(
        parse_opts("default { timer() { case 1: ; } }", opts)
            .unwrap_err()
            .kind,
        ErrorKind::InvalidCase("case")
    );
}

#[test]
fn break_outside_loop() {
    let mut opts = Options::default();
    opts.breakcont = true;
    assert_eq!(
        parse_opts("default { timer() { break; } }", opts)
            .unwrap_err()
            .kind,
        ErrorKind::InvalidBreak {
            enableswitch: false,
            breakcont: true
        }
    );
}

#[test]
fn break_desugars_to_jump_with_wrapper_label() {
    let mut opts = Options::default();
    opts.breakcont = true;
    let script = parse_opts(
        "default { timer() { while (1) { break; } } }",
        opts,
    )
    .unwrap();
    let nodes = all_nodes(&script);
    assert!(nodes.iter().any(|n| matches!(n.kind, NodeKind::Jump { .. })));
    assert!(nodes.iter().any(
        |n| matches!(&n.kind, NodeKind::Label { name, .. } if name.starts_with("J_autoGen"))
    ));
}

#[test]
fn continue_without_block_is_a_nop() {
    let mut opts = Options::default();
    opts.breakcont = true;
    let script = parse_opts("default { timer() { while (1) continue; } }", opts).unwrap();
    let nodes = all_nodes(&script);
    assert!(!nodes.iter().any(|n| matches!(n.kind, NodeKind::Jump { .. })));
}

#[test]
fn lazy_list_assignment_expands_to_helper() {
    let mut opts = Options::default();
    opts.lazylists = true;
    let script = parse_opts(
        "default { timer() { list l; l[5] = 42; } }",
        opts,
    )
    .unwrap();
    // The helper occupies the reserved slot.
    assert!(matches!(
        &script.tree[0].kind,
        NodeKind::FnDef { name, .. } if name == "lazy_list_set"
    ));
    let sym = script.symtab.get(ScopeId::GLOBAL, "lazy_list_set").unwrap();
    assert!(sym.is_udf());
    assert_eq!(sym.loc, Some(0));
    let calls = all_nodes(&script)
        .iter()
        .filter(|n| matches!(&n.kind, NodeKind::FnCall { name } if name == "lazy_list_set"))
        .count();
    assert_eq!(calls, 1);
}

#[test]
fn lazy_list_read_through_cast() {
    let mut opts = Options::default();
    opts.lazylists = true;
    let script = parse_opts(
        "default { timer() { list l; integer x = (integer)l[2]; } }",
        opts,
    )
    .unwrap();
    let extracted = all_nodes(&script)
        .iter()
        .any(|n| matches!(&n.kind, NodeKind::FnCall { name } if name == "llList2Integer"));
    assert!(extracted);
}

#[test]
fn global_initializers_are_simple_without_option() {
    assert_eq!(parse_err("integer x = 2 + 3; default { timer() { } }"), ErrorKind::Syntax);
    // Negative constants and identifier references are simple.
    parse("integer a = -5; integer b = a; default { timer() { } }").unwrap();
}

#[test]
fn extended_global_expressions() {
    let mut opts = Options::default();
    opts.extendedglobalexpr = true;
    let script = parse_opts("integer x = 2 + 3; default { timer() { } }", opts).unwrap();
    let has_add = all_nodes(&script)
        .iter()
        .any(|n| matches!(n.kind, NodeKind::Bin(crate::ast::BinOp::Add)));
    assert!(has_add);
}

#[test]
fn funcoverride_replaces_earlier_definition() {
    let src = "f() { llOwnerSay(\"old\"); }\n\
               f() { llOwnerSay(\"new\"); }\n\
               default { timer() { f(); } }";
    assert_eq!(parse_err(src), ErrorKind::AlreadyDefined);
    let mut opts = Options::default();
    opts.funcoverride = true;
    let script = parse_opts(src, opts).unwrap();
    // The first definition's slot is erased.
    let fndefs = script
        .tree
        .iter()
        .filter(|n| matches!(&n.kind, NodeKind::FnDef { name, .. } if name == "f"))
        .count();
    assert_eq!(fndefs, 1);
}

#[test]
fn event_signature_is_checked() {
    assert_eq!(
        parse_err("default { listen(integer c) { } }"),
        ErrorKind::Syntax
    );
    parse("default { listen(integer c, string n, key k, string m) { } }").unwrap();
}

#[test]
fn duplicate_event_in_state() {
    assert_eq!(
        parse_err("default { timer() { } timer() { } }"),
        ErrorKind::AlreadyDefined
    );
}

#[test]
fn default_state_must_come_first() {
    assert_eq!(
        parse_err("state other { timer() { } } default { timer() { } }"),
        ErrorKind::Syntax
    );
}

#[test]
fn undefined_state_in_switch_statement() {
    assert_eq!(
        parse_err("default { timer() { state nowhere; } }"),
        ErrorKind::Undefined
    );
}

#[test]
fn integer_times_float_compound_assignment() {
    // LSL's odd integer *= float is accepted.
    parse("default { timer() { integer i = 2; i *= 1.5; } }").unwrap();
    // But integer /= float is not.
    assert_eq!(
        parse_err("default { timer() { integer i = 2; i /= 1.5; } }"),
        ErrorKind::TypeMismatch
    );
}

#[test]
fn extended_assignment_operators() {
    let src = "default { timer() { integer i; i |= 2; i <<= 1; } }";
    assert_eq!(parse_err(src), ErrorKind::Syntax);
    let mut opts = Options::default();
    opts.extendedassignment = true;
    parse_opts(src, opts).unwrap();
}

#[test]
fn field_access_types() {
    parse("default { timer() { vector v; float f = v.x; rotation r; f = r.s; } }").unwrap();
    assert_eq!(
        parse_err("default { timer() { vector v; float f = v.s; } }"),
        ErrorKind::InvalidField
    );
    assert_eq!(
        parse_err("default { timer() { float f; f.x; } }"),
        ErrorKind::InvalidField
    );
}

#[test]
fn label_as_loop_child_rejected_when_optimizing() {
    let mut opts = Options::default();
    opts.optimize = true;
    assert_eq!(
        parse_opts("default { timer() { while (1) @x; } }", opts)
            .unwrap_err()
            .kind,
        ErrorKind::InvalidLabelOpt
    );
}

#[test]
fn print_builtin() {
    let script = parse("default { timer() { print(42); } }").unwrap();
    let has_print = all_nodes(&script)
        .iter()
        .any(|n| matches!(n.kind, NodeKind::Print) && n.ty == Some(Type::Integer));
    assert!(has_print);
}

#[test]
fn list_literals_flattened_by_constants() {
    let script = parse("default { timer() { list l = [1, \"a\", 2.5]; } }").unwrap();
    let list = all_nodes(&script)
        .into_iter()
        .find(|n| matches!(n.kind, NodeKind::ListLit))
        .expect("list literal");
    assert_eq!(list.ch.len(), 3);
    assert_eq!(list.ch[0].const_value(), Some(&Value::Integer(1)));
}
