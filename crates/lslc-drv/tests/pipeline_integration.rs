//! End-to-end pipeline tests: parse → fold → dead code removal → last
//! pass → emit.

use lslc_drv::compile;
use lslc_util::Options;

fn optimize(src: &str) -> String {
    compile(src, Options::defaults(), "<stdin>")
        .expect("compile")
        .output
}

fn optimize_opts(src: &str, tweak: &str) -> String {
    let mut opts = Options::defaults();
    opts.apply_spec(tweak);
    compile(src, opts, "<stdin>").expect("compile").output
}

#[test]
fn single_use_constant_is_inlined() {
    let out = optimize(
        "default { state_entry() { integer i = 2; llOwnerSay((string)i); } }",
    );
    // The declaration disappears and the value lands in the call,
    // folded through the cast.
    assert!(!out.contains("integer i"), "declaration not removed: {out}");
    assert!(out.contains("llOwnerSay(\"2\")"), "got: {out}");
}

#[test]
fn constant_condition_drops_the_other_branch() {
    let out = optimize(
        "default { timer() { if (1) llOwnerSay(\"a\"); else llOwnerSay(\"b\"); } }",
    );
    assert!(out.contains("llOwnerSay(\"a\");"));
    assert!(!out.contains("if ("));
    assert!(!out.contains("\"b\""));
}

#[test]
fn list_extraction_folds_through_the_global() {
    let out = optimize(
        "list L = [1, 2, 3];\n\
         default { state_entry() { llOwnerSay(llList2String(L, 0)); } }",
    );
    assert!(out.contains("llOwnerSay(\"1\")"), "got: {out}");
    // The list itself is read once and short, so it is inlined away.
    assert!(!out.contains("list L"), "got: {out}");
}

#[test]
fn dump_list_with_empty_separator_becomes_cast() {
    let out = optimize_opts(
        "default { state_entry() { llOwnerSay(llDumpList2String([1, 2, 3], \"\")); } }",
        "-optlistadd",
    );
    // (string)[1,2,3] folds all the way down to the constant text.
    assert!(out.contains("llOwnerSay(\"123\")"), "got: {out}");
    assert!(!out.contains("llDumpList2String"), "got: {out}");
}

#[test]
fn dump_list_with_separator_expands_to_sum() {
    // Event parameters cannot be inlined, so the sum survives intact.
    let out = optimize(
        "default { touch_start(integer total_number) {\n\
             llOwnerSay(llDumpList2String([total_number, total_number], \"-\"));\n\
         } }",
    );
    assert!(!out.contains("llDumpList2String"), "got: {out}");
    assert!(
        out.contains("(string)total_number + (\"-\" + (string)total_number)"),
        "got: {out}"
    );
}

#[test]
fn unread_variable_dies_but_labels_survive() {
    let out = optimize("default { timer() { @top; integer x = 1; jump top; } }");
    assert!(out.contains("@top;"));
    assert!(out.contains("jump top;"));
    assert!(!out.contains("integer x"), "got: {out}");
}

#[test]
fn unreferenced_state_and_global_are_removed() {
    let out = optimize(
        "integer unused_global = 5;\n\
         integer used_global = 7;\n\
         default { timer() { llOwnerSay((string)used_global); } }\n\
         state never_entered { timer() { llOwnerSay(\"dead\"); } }",
    );
    assert!(!out.contains("unused_global"));
    assert!(!out.contains("never_entered"));
    // used_global has a single constant write: inlined and folded.
    assert!(out.contains("llOwnerSay(\"7\")"), "got: {out}");
}

#[test]
fn reachable_states_survive() {
    let out = optimize(
        "default { timer() { state armed; } }\n\
         state armed { timer() { llOwnerSay(\"on\"); state default; } }",
    );
    assert!(out.contains("state armed"));
    assert!(out.contains("llOwnerSay(\"on\")"));
}

#[test]
fn unused_function_is_dropped() {
    let out = optimize(
        "ping() { llOwnerSay(\"ping\"); }\n\
         pong() { llOwnerSay(\"pong\"); }\n\
         default { timer() { ping(); } }",
    );
    assert!(out.contains("ping"));
    assert!(!out.contains("pong"));
}

#[test]
fn code_after_terminator_call_stays() {
    // Calls are not followed through jumps, and the statement wrapper
    // around a call falls through regardless of the callee: code after
    // a script reset is conservatively kept.
    let out = optimize(
        "die() { llResetScript(); }\n\
         default { timer() { die(); llOwnerSay(\"kept\"); } }",
    );
    assert!(out.contains("llOwnerSay(\"kept\")"));
    let out = optimize(
        "default { timer() { llResetScript(); llOwnerSay(\"kept\"); } }",
    );
    assert!(out.contains("llOwnerSay(\"kept\")"), "got: {out}");
}

#[test]
fn infinite_loop_stops_the_path() {
    let out = optimize(
        "default { timer() { while (TRUE) llGetTime(); llOwnerSay(\"after\"); } }",
    );
    assert!(!out.contains("llOwnerSay"), "got: {out}");
}

#[test]
fn get_list_length_rewrite() {
    let out = optimize_opts(
        "default { timer() {\n\
             integer n = llGetListLength(llGetPrimitiveParams([PRIM_NAME]));\n\
             llOwnerSay((string)n);\n\
             llOwnerSay((string)n);\n\
         } }",
        "+listlength",
    );
    assert!(!out.contains("llGetListLength"), "got: {out}");
    assert!(out.contains("!= []"), "got: {out}");
}

#[test]
fn dialog_ok_button_list_is_dropped() {
    let out = optimize(
        "default { timer() { llDialog(llGetOwner(), \"m\", [\"OK\"], -12); } }",
    );
    assert!(out.contains("llDialog(llGetOwner(), \"m\", [], -12)"), "got: {out}");
}

#[test]
fn delete_sub_list_whole_range() {
    let out = optimize(
        "list keep() { return llDeleteSubList([1, 2], 0, -1); }\n\
         default { timer() { llOwnerSay((string)keep()); } }",
    );
    assert!(out.contains("return [];"), "got: {out}");
}

#[test]
fn object_details_single_key_detail_casts() {
    let out = optimize(
        "default { timer() { llOwnerSay((string)llList2Key(llGetObjectDetails(llGetOwner(), [OBJECT_OWNER]), 0)); } }",
    );
    // (key)((string)llGetObjectDetails(...)) collapses further under
    // the outer string cast.
    assert!(!out.contains("llList2Key"), "got: {out}");
    assert!(out.contains("llGetObjectDetails"), "got: {out}");
}

#[test]
fn object_details_incompatible_type_folds_to_default() {
    // OBJECT_NAME is a string; llList2Vector of it cannot succeed.
    let out = optimize(
        "default { timer() { llOwnerSay((string)llList2Vector(llGetObjectDetails(llGetOwner(), [OBJECT_NAME, OBJECT_DESC]), 0)); } }",
    );
    assert!(!out.contains("llList2Vector"), "got: {out}");
    // The default zero vector folds on through the outer string cast.
    assert!(out.contains("\"<0.00000, 0.00000, 0.00000>\""), "got: {out}");
}

#[test]
fn prim_params_known_type_folds() {
    // PRIM_NAME yields a string; extracting it as a string becomes a
    // cast.
    let out = optimize(
        "default { timer() { llOwnerSay(llList2String(llGetPrimitiveParams([PRIM_NAME]), 0)); } }",
    );
    assert!(!out.contains("llList2String"), "got: {out}");
    // PRIM_TYPE is arity-dependent ('*'): nothing after it folds.
    let out = optimize(
        "default { timer() { llOwnerSay((string)llList2Vector(llGetPrimitiveParams([PRIM_TYPE, PRIM_SIZE]), 1)); } }",
    );
    assert!(out.contains("llList2Vector"), "got: {out}");
}

#[test]
fn sensor_arc_saturates() {
    let out = optimize(
        "default { timer() { llSensor(\"\", NULL_KEY, AGENT, 20.0, 3.5); } }",
    );
    assert!(out.contains("4.)"), "got: {out}");
}

#[test]
fn null_key_argument_becomes_empty_string() {
    let out = optimize("default { timer() { llOwnerSay(llKey2Name(NULL_KEY)); } }");
    assert!(out.contains("llKey2Name(\"\")"), "got: {out}");
    // llMessageLinked keeps its key arguments.
    let out = optimize(
        "default { timer() { llMessageLinked(LINK_SET, 0, \"m\", NULL_KEY); } }",
    );
    assert!(
        out.contains("llMessageLinked(-1, 0, \"m\", (key)\"00000000-0000-0000-0000-000000000000\")"),
        "got: {out}"
    );
}

#[test]
fn state_switch_in_function_is_legalized_after_optimization() {
    // The state change is parsed under if-without-else (accepted), and
    // constant folding then removes the if, leaving a bare state
    // switch in the function. The last pass wraps the body.
    let src = "f() { if (1) state armed; }\n\
               default { timer() { f(); } }\n\
               state armed { timer() { llOwnerSay(\"armed\"); } }";
    let out = optimize(src);
    assert!(out.contains("if (1)"), "got: {out}");
    assert!(out.contains("state armed;"), "got: {out}");
}

#[test]
fn lazy_list_pipeline() {
    let out = optimize_opts(
        "list store;\n\
         default { timer() { store[2] = 42; llOwnerSay((string)store); } }",
        "+lazylists",
    );
    assert!(out.contains("lazy_list_set"), "got: {out}");
    assert!(out.contains("llListReplaceList"), "got: {out}");
}

#[test]
fn determinism_byte_identical_runs() {
    let src = "integer seq;\n\
               float ratio = 0.25;\n\
               vector home = <1, 2, 3>;\n\
               integer bump(integer n) { seq += n; return seq; }\n\
               default {\n\
                   state_entry() { llSetTimerEvent(ratio * 4); }\n\
                   timer() { llOwnerSay((string)bump(2) + (string)home); state idle; }\n\
               }\n\
               state idle { timer() { state default; } }";
    let a = optimize(src);
    let b = optimize(src);
    assert_eq!(a, b);
    let mut opts = Options::defaults();
    opts.shrinknames = true;
    let c = compile(src, opts, "<stdin>").unwrap().output;
    let d = compile(src, opts, "<stdin>").unwrap().output;
    assert_eq!(c, d);
}

#[test]
fn idempotence_fixpoint_after_one_round() {
    let src = "integer counter = 3;\n\
               integer next() { counter++; return counter; }\n\
               default {\n\
                   state_entry() {\n\
                       integer i;\n\
                       for (i = 0; i < 10; i++) llOwnerSay((string)next());\n\
                       if (counter > 5) llOwnerSay(\"big\"); else llOwnerSay(\"small\");\n\
                   }\n\
               }";
    let once = optimize(src);
    let twice = optimize(&once);
    assert_eq!(once, twice, "pipeline must be a fixpoint on its own output");
}

#[test]
fn shrink_names_produces_short_and_consistent_names() {
    let mut opts = Options::defaults();
    opts.shrinknames = true;
    let out = compile(
        "integer counter;\n\
         integer bump(integer amount) { counter += amount; return counter; }\n\
         default { timer() { llAbs(bump(1) + bump(2)); } }",
        opts,
        "<stdin>",
    )
    .unwrap()
    .output;
    assert!(!out.contains("counter"), "got: {out}");
    assert!(!out.contains("bump"), "got: {out}");
    assert!(!out.contains("amount"), "got: {out}");
    // Library names are untouched.
    assert!(out.contains("llAbs"));
    // The output is still a valid compile input.
    let again = compile(out.as_str(), Options::defaults(), "<stdin>").unwrap();
    assert!(!again.output.is_empty());
}

#[test]
fn used_library_report() {
    let result = compile(
        "default { timer() { llOwnerSay((string)llGetUnixTime()); } }",
        Options::defaults(),
        "<stdin>",
    )
    .unwrap();
    let used: Vec<&str> = result
        .info
        .used_lib_funcs
        .iter()
        .map(String::as_str)
        .collect();
    assert_eq!(used, ["llGetUnixTime", "llOwnerSay"]);
}

#[test]
fn errors_abort_with_position() {
    let err = compile(
        "default { timer() { integer x = \"nope\"; } }",
        Options::defaults(),
        "<stdin>",
    )
    .unwrap_err();
    assert_eq!(err.line, 1);
    assert!(err.to_string().starts_with("(Line 1 char"));
    assert!(err.to_string().contains("Type mismatch"));
}

#[test]
fn emap_error_format() {
    let mut opts = Options::defaults();
    opts.emap = true;
    let err = compile("integer x = ;\ndefault { timer() { } }", opts, "in.lsl").unwrap_err();
    assert!(err.to_string().starts_with("::ERROR::\"in.lsl\":1:"), "got: {err}");
}

#[test]
fn line_directives_shift_error_positions() {
    let err = compile(
        "#line 100 \"inc.lsl\"\ndefault { timer() { integer x = \"s\"; } }",
        Options::defaults(),
        "<stdin>",
    )
    .unwrap_err();
    assert_eq!(err.line, 100);
    assert!(err.to_string().contains("ERROR in \"inc.lsl\""), "got: {err}");
}

#[test]
fn pragma_opt_enables_features_inline() {
    let src = "#pragma OPT +lazylists\n\
               list store;\n\
               default { timer() { store[0] = 1; llOwnerSay((string)store); } }";
    let out = optimize(src);
    assert!(out.contains("lazy_list_set"), "got: {out}");
}

#[test]
fn shrink_names_is_independent_of_optimize() {
    let mut opts = Options::defaults();
    opts.optimize = false;
    opts.shrinknames = true;
    let out = compile(
        "integer counter;\n\
         default { timer() { counter++; llOwnerSay((string)counter); } }",
        opts,
        "<stdin>",
    )
    .unwrap()
    .output;
    assert!(!out.contains("counter"), "got: {out}");
    assert!(out.contains("llOwnerSay"), "got: {out}");
}

#[test]
fn optimization_can_be_disabled() {
    let out = optimize_opts(
        "default { timer() { integer x = 2; llOwnerSay((string)x); } }",
        "-optimize",
    );
    assert!(out.contains("integer x = 2;"), "got: {out}");
    assert!(out.contains("llOwnerSay((string)x)"), "got: {out}");
}
