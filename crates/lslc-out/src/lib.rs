//! lslc-out - LSL source emitter
//!
//! Prints the optimized tree back to LSL source. Parentheses are
//! emitted only where precedence demands them; vector and rotation
//! literal components are additionally parenthesized whenever their
//! topmost operator could be confused with the closing `>`. Symbols
//! renamed by label deduplication or the identifier shrinker print
//! their replacement name. A folded global list initializer prints its
//! original (pre-fold) form, which is what keeps the globals it
//! mentions meaningful.
//!
//! Emission is deterministic: the tree and the symbol table fully
//! determine the output.

use lslc_lang::{Type, Value};
use lslc_par::ast::{BinOp, Node, NodeKind};
use lslc_par::symtab::ScopeId;
use lslc_par::Script;

/// Emit a whole script as LSL source.
pub fn emit_script(script: &Script) -> String {
    let mut em = Emitter {
        script,
        out: String::new(),
        indent: 0,
    };
    for item in &script.tree {
        em.emit_item(item);
    }
    em.out
}

/// Operator precedence, highest binds tightest. Used to decide where
/// parentheses are required.
fn prec(node: &Node) -> u8 {
    match &node.kind {
        NodeKind::Bin(op) => match op {
            BinOp::Or | BinOp::And => 1,
            BinOp::BitOr => 2,
            BinOp::BitXor => 3,
            BinOp::BitAnd => 4,
            BinOp::Eq | BinOp::Ne => 5,
            BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge => 6,
            BinOp::Shl | BinOp::Shr => 7,
            BinOp::Add | BinOp::Sub => 8,
            BinOp::Mul | BinOp::Div | BinOp::Mod => 9,
        },
        NodeKind::Assign(_) => 0,
        NodeKind::Neg | NodeKind::Not | NodeKind::BitNot | NodeKind::PreIncr
        | NodeKind::PreDecr => 10,
        NodeKind::Cast => 11,
        _ => 13,
    }
}

/// Format a float so that it lexes as a float again.
fn fmt_float(f: f32) -> String {
    if f.is_nan() {
        return "(0./0.)".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "1e40" } else { "-1e40" }.to_string();
    }
    let mut s = format!("{f}");
    if !s.contains('.') && !s.contains('e') {
        s.push('.');
    }
    s
}

fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

struct Emitter<'a> {
    script: &'a Script,
    out: String,
    indent: usize,
}

impl Emitter<'_> {
    fn line_start(&mut self) {
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
    }

    /// The printed name of a symbol, honoring renames.
    fn symbol_name(&self, scope: ScopeId, name: &str) -> String {
        match self.script.symtab.get(scope, name) {
            Some(sym) => sym.new_name.clone().unwrap_or_else(|| name.to_string()),
            None => name.to_string(),
        }
    }

    fn emit_item(&mut self, item: &Node) {
        match &item.kind {
            NodeKind::Placeholder => {}
            NodeKind::Decl { name, scope } => {
                let ty = item.ty.unwrap_or(Type::Integer);
                self.out.push_str(ty.name());
                self.out.push(' ');
                let printed = self.symbol_name(*scope, name);
                self.out.push_str(&printed);
                if let Some(init) = item.ch.first() {
                    self.out.push_str(" = ");
                    // A folded list keeps its original shape in the
                    // output.
                    match (&init.orig, init.const_value(), ty) {
                        (Some(orig), _, _) => self.emit_expr(orig, 0),
                        (None, Some(Value::Key(k)), Type::Key) => {
                            let escaped = escape_string(k);
                            self.out.push_str(&escaped);
                        }
                        _ => self.emit_expr(init, 0),
                    }
                }
                self.out.push_str(";\n");
            }
            NodeKind::FnDef {
                name,
                scope,
                pscope,
                ptypes,
                pnames,
            } => {
                if let Some(t) = item.ty {
                    self.out.push_str(t.name());
                    self.out.push(' ');
                }
                let printed = match scope {
                    Some(s) => self.symbol_name(*s, name).to_string(),
                    // Event handlers keep their reserved names.
                    None => name.clone(),
                };
                self.out.push_str(&printed);
                self.out.push('(');
                for (i, (t, p)) in ptypes.iter().zip(pnames).enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.out.push_str(t.name());
                    self.out.push(' ');
                    let pname = self.symbol_name(*pscope, p).to_string();
                    self.out.push_str(&pname);
                }
                self.out.push_str(")\n");
                self.emit_block_lines(&item.ch[0]);
            }
            NodeKind::StateDef { name } => {
                if name == "default" {
                    self.out.push_str("default\n{\n");
                } else {
                    self.out.push_str("state ");
                    self.out.push_str(name);
                    self.out.push_str("\n{\n");
                }
                self.indent += 1;
                for ev in &item.ch {
                    self.line_start();
                    self.emit_item(ev);
                }
                self.indent -= 1;
                self.out.push_str("}\n");
            }
            _ => {
                // A stray statement at top level (should not happen).
                self.emit_stmt(item);
            }
        }
    }

    /// Emit a block node with braces on their own lines.
    fn emit_block_lines(&mut self, block: &Node) {
        self.line_start();
        self.out.push_str("{\n");
        self.indent += 1;
        for stmt in &block.ch {
            self.line_start();
            self.emit_stmt(stmt);
        }
        self.indent -= 1;
        self.line_start();
        self.out.push_str("}\n");
    }

    /// Emit the substatement of a control construct: blocks inline,
    /// other statements on the next line, indented.
    fn emit_substmt(&mut self, stmt: &Node) {
        if matches!(stmt.kind, NodeKind::Block { .. }) {
            self.out.push('\n');
            self.emit_block_lines(stmt);
        } else {
            self.out.push('\n');
            self.indent += 1;
            self.line_start();
            self.emit_stmt(stmt);
            self.indent -= 1;
        }
    }

    fn emit_stmt(&mut self, stmt: &Node) {
        match &stmt.kind {
            NodeKind::Empty => self.out.push_str(";\n"),
            NodeKind::Label { name, scope } => {
                self.out.push('@');
                let printed = self.symbol_name(*scope, name).to_string();
                self.out.push_str(&printed);
                self.out.push_str(";\n");
            }
            NodeKind::Jump { name, scope } => {
                self.out.push_str("jump ");
                let printed = match scope {
                    Some(s) => self.symbol_name(*s, name).to_string(),
                    None => name.clone(),
                };
                self.out.push_str(&printed);
                self.out.push_str(";\n");
            }
            NodeKind::StateSwitch { name } => {
                if name == "default" {
                    self.out.push_str("state default;\n");
                } else {
                    self.out.push_str("state ");
                    self.out.push_str(name);
                    self.out.push_str(";\n");
                }
            }
            NodeKind::Return => {
                if let Some(v) = stmt.ch.first() {
                    self.out.push_str("return ");
                    self.emit_expr(v, 0);
                    self.out.push_str(";\n");
                } else {
                    self.out.push_str("return;\n");
                }
            }
            NodeKind::If => {
                self.out.push_str("if (");
                self.emit_expr(&stmt.ch[0], 0);
                self.out.push(')');
                self.emit_substmt(&stmt.ch[1]);
                if let Some(els) = stmt.ch.get(2) {
                    self.line_start();
                    self.out.push_str("else");
                    if matches!(els.kind, NodeKind::If) {
                        // `else if` chains stay on one line.
                        self.out.push(' ');
                        self.emit_stmt(els);
                    } else {
                        self.emit_substmt(els);
                    }
                }
            }
            NodeKind::While => {
                self.out.push_str("while (");
                self.emit_expr(&stmt.ch[0], 0);
                self.out.push(')');
                self.emit_substmt(&stmt.ch[1]);
            }
            NodeKind::DoWhile => {
                self.out.push_str("do");
                self.emit_substmt(&stmt.ch[0]);
                self.line_start();
                self.out.push_str("while (");
                self.emit_expr(&stmt.ch[1], 0);
                self.out.push_str(");\n");
            }
            NodeKind::For => {
                self.out.push_str("for (");
                self.emit_expr_list(&stmt.ch[0]);
                self.out.push_str("; ");
                self.emit_expr(&stmt.ch[1], 0);
                self.out.push_str("; ");
                self.emit_expr_list(&stmt.ch[2]);
                self.out.push(')');
                self.emit_substmt(&stmt.ch[3]);
            }
            NodeKind::Block { .. } => {
                // A block used directly as a statement.
                self.out.push('\n');
                self.emit_block_lines(stmt);
            }
            NodeKind::ExprStmt => {
                self.emit_expr(&stmt.ch[0], 0);
                self.out.push_str(";\n");
            }
            NodeKind::Decl { name, scope } => {
                let ty = stmt.ty.unwrap_or(Type::Integer);
                self.out.push_str(ty.name());
                self.out.push(' ');
                let printed = self.symbol_name(*scope, name).to_string();
                self.out.push_str(&printed);
                if let Some(init) = stmt.ch.first() {
                    self.out.push_str(" = ");
                    self.emit_expr(init, 0);
                }
                self.out.push_str(";\n");
            }
            _ => {
                // An expression in statement position.
                self.emit_expr(stmt, 0);
                self.out.push_str(";\n");
            }
        }
    }

    fn emit_expr_list(&mut self, node: &Node) {
        for (i, e) in node.ch.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.emit_expr(e, 0);
        }
    }

    /// Emit an expression, parenthesizing when its precedence is below
    /// `min_prec`.
    fn emit_expr(&mut self, node: &Node, min_prec: u8) {
        let p = prec(node);
        if p < min_prec {
            self.out.push('(');
            self.emit_inner(node);
            self.out.push(')');
        } else {
            self.emit_inner(node);
        }
    }

    fn emit_inner(&mut self, node: &Node) {
        match &node.kind {
            NodeKind::Const(v) => self.emit_value(v),
            NodeKind::Ident { name, scope } => {
                let printed = self.symbol_name(*scope, name).to_string();
                self.out.push_str(&printed);
            }
            NodeKind::Field(f) => {
                self.emit_expr(&node.ch[0], 13);
                self.out.push('.');
                self.out.push(f.letter());
            }
            NodeKind::ListLit => {
                self.out.push('[');
                for (i, e) in node.ch.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.emit_expr(e, 0);
                }
                self.out.push(']');
            }
            NodeKind::VectorLit | NodeKind::RotationLit => {
                self.out.push('<');
                for (i, e) in node.ch.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    // Components whose topmost operator sits at or
                    // below inequality level would swallow the closing
                    // '>', so they get parentheses.
                    self.emit_expr(e, 7);
                }
                self.out.push('>');
            }
            NodeKind::Bin(op) => {
                let p = prec(node);
                self.emit_expr(&node.ch[0], p);
                self.out.push(' ');
                self.out.push_str(op.symbol());
                self.out.push(' ');
                self.emit_expr(&node.ch[1], p + 1);
            }
            NodeKind::Neg => {
                self.out.push('-');
                let mark = self.out.len();
                self.emit_expr(&node.ch[0], 10);
                // Avoid creating "--" by accident.
                if self.out[mark..].starts_with('-') {
                    self.out.insert(mark, ' ');
                }
            }
            NodeKind::Not => {
                self.out.push('!');
                self.emit_expr(&node.ch[0], 10);
            }
            NodeKind::BitNot => {
                self.out.push('~');
                self.emit_expr(&node.ch[0], 10);
            }
            NodeKind::Cast => {
                self.out.push('(');
                self.out
                    .push_str(node.ty.unwrap_or(Type::Integer).name());
                self.out.push(')');
                self.emit_expr(&node.ch[0], 12);
            }
            NodeKind::FnCall { name } => {
                let printed = self.symbol_name(ScopeId::GLOBAL, name).to_string();
                self.out.push_str(&printed);
                self.out.push('(');
                for (i, a) in node.ch.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.emit_expr(a, 0);
                }
                self.out.push(')');
            }
            NodeKind::Print => {
                self.out.push_str("print(");
                self.emit_expr(&node.ch[0], 0);
                self.out.push(')');
            }
            NodeKind::PostIncr => {
                self.emit_expr(&node.ch[0], 13);
                self.out.push_str("++");
            }
            NodeKind::PostDecr => {
                self.emit_expr(&node.ch[0], 13);
                self.out.push_str("--");
            }
            NodeKind::PreIncr => {
                self.out.push_str("++");
                self.emit_expr(&node.ch[0], 13);
            }
            NodeKind::PreDecr => {
                self.out.push_str("--");
                self.emit_expr(&node.ch[0], 13);
            }
            NodeKind::Assign(op) => {
                self.emit_expr(&node.ch[0], 13);
                match op {
                    None => self.out.push_str(" = "),
                    Some(op) => {
                        self.out.push(' ');
                        self.out.push_str(op.symbol());
                        self.out.push_str("= ");
                    }
                }
                self.emit_expr(&node.ch[1], 0);
            }
            NodeKind::SubIdx => {
                self.emit_expr(&node.ch[0], 13);
                self.out.push('[');
                for (i, e) in node.ch.iter().skip(1).enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.emit_expr(e, 0);
                }
                self.out.push(']');
            }
            _ => {
                // Statement kinds never reach expression position.
            }
        }
    }

    fn emit_value(&mut self, v: &Value) {
        match v {
            Value::Integer(i) => self.out.push_str(&i.to_string()),
            Value::Float(f) => self.out.push_str(&fmt_float(*f)),
            Value::Str(s) => self.out.push_str(&escape_string(s)),
            Value::Key(k) => {
                // A key constant needs the cast to keep its list type.
                self.out.push_str("(key)");
                self.out.push_str(&escape_string(k));
            }
            Value::Vector(c) => {
                let parts: Vec<String> = c.iter().map(|f| fmt_float(*f)).collect();
                self.out.push('<');
                self.out.push_str(&parts.join(", "));
                self.out.push('>');
            }
            Value::Rotation(c) => {
                let parts: Vec<String> = c.iter().map(|f| fmt_float(*f)).collect();
                self.out.push('<');
                self.out.push_str(&parts.join(", "));
                self.out.push('>');
            }
            Value::List(l) => {
                self.out.push('[');
                for (i, e) in l.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.emit_value(e);
                }
                self.out.push(']');
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lslc_lang::builtin_library;
    use lslc_par::Parser;
    use lslc_util::Options;

    fn emit(src: &str) -> String {
        emit_opts(src, Options::default())
    }

    fn emit_opts(src: &str, opts: Options) -> String {
        let (script, _) =
            Parser::parse(src, opts, builtin_library(), "<stdin>").expect("parse");
        emit_script(&script)
    }

    #[test]
    fn minimal_state_round_trips() {
        let out = emit("default { state_entry() { llOwnerSay(\"hi\"); } }");
        assert_eq!(
            out,
            "default\n{\n    state_entry()\n    {\n        llOwnerSay(\"hi\");\n    }\n}\n"
        );
    }

    #[test]
    fn precedence_needs_no_redundant_parens() {
        let out = emit("default { timer() { llAbs(1 + 2 * 3); } }");
        assert!(out.contains("llAbs(1 + 2 * 3)"));
        let out = emit("default { timer() { llAbs((1 + 2) * 3); } }");
        assert!(out.contains("llAbs((1 + 2) * 3)"));
    }

    #[test]
    fn left_associativity_parens() {
        // a - (b - c) needs parens, (a - b) - c does not.
        let out = emit("default { timer() { integer a; integer b; integer c; llAbs(a - (b - c)); } }");
        assert!(out.contains("a - (b - c)"));
        let out = emit("default { timer() { integer a; integer b; integer c; llAbs(a - b - c); } }");
        assert!(out.contains("a - b - c"));
    }

    #[test]
    fn floats_lex_as_floats() {
        assert_eq!(fmt_float(1.0), "1.");
        assert_eq!(fmt_float(1.5), "1.5");
        assert_eq!(fmt_float(-2.25), "-2.25");
        assert_eq!(fmt_float(f32::INFINITY), "1e40");
    }

    #[test]
    fn strings_are_escaped() {
        let out = emit(r#"default { timer() { llOwnerSay("a\"b\\c"); } }"#);
        assert!(out.contains(r#"llOwnerSay("a\"b\\c")"#));
    }

    #[test]
    fn vector_component_comparison_is_parenthesized() {
        let out = emit("default { timer() { vector v = <2, 2, 2 > 2>; llOwnerSay((string)v); } }");
        assert!(out.contains("<2, 2, (2 > 2)>"), "got: {out}");
    }

    #[test]
    fn state_and_jump_statements() {
        let out = emit(
            "default { timer() { @top; jump top; state other; } }\n\
             state other { timer() { state default; } }",
        );
        assert!(out.contains("@top;"));
        assert!(out.contains("jump top;"));
        assert!(out.contains("state other;"));
        assert!(out.contains("state default;"));
        assert!(out.contains("state other\n{"));
    }

    #[test]
    fn functions_and_control_flow() {
        let out = emit(
            "integer fib(integer n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); }\n\
             default { timer() { llAbs(fib(10)); } }",
        );
        assert!(out.contains("integer fib(integer n)"));
        assert!(out.contains("if (n < 2)"));
        assert!(out.contains("return fib(n - 1) + fib(n - 2);"));
    }

    #[test]
    fn for_loop_header() {
        let out = emit(
            "default { timer() { integer i; for (i = 0; i < 5; i++) llAbs(i); } }",
        );
        assert!(out.contains("for (i = 0; i < 5; i++)"));
    }

    #[test]
    fn do_while_loop() {
        let out = emit("default { timer() { integer i; do i++; while (i < 3); } }");
        assert!(out.contains("do\n"));
        assert!(out.contains("while (i < 3);"));
    }

    #[test]
    fn unary_minus_spacing() {
        // NEG of a negative constant must not merge into a decrement.
        use lslc_par::ast::Node;
        let inner = Node::const_val(Value::Integer(-1));
        let neg = Node::with_children(NodeKind::Neg, Some(Type::Integer), vec![inner]);
        let (script, _) = Parser::parse(
            "default { timer() { } }",
            Options::default(),
            builtin_library(),
            "<stdin>",
        )
        .unwrap();
        let mut em = Emitter {
            script: &script,
            out: String::new(),
            indent: 0,
        };
        em.emit_expr(&neg, 0);
        assert_eq!(em.out, "- -1");
    }

    #[test]
    fn renamed_symbols_print_their_new_name() {
        use lslc_par::symtab::ScopeId;
        let (mut script, _) = Parser::parse(
            "integer counter;\ndefault { timer() { counter++; } }",
            Options::default(),
            builtin_library(),
            "<stdin>",
        )
        .unwrap();
        if let Some(sym) = script.symtab.get_mut(ScopeId::GLOBAL, "counter") {
            sym.new_name = Some("a".into());
        }
        let out = emit_script(&script);
        assert!(out.contains("integer a;"));
        assert!(out.contains("a++;"));
        assert!(!out.contains("counter"));
    }

    #[test]
    fn key_global_prints_as_string() {
        let out = emit("key owner = NULL_KEY;\ndefault { timer() { llOwnerSay((string)owner); } }");
        assert!(out.contains("key owner = \"00000000-0000-0000-0000-000000000000\";"));
    }

    #[test]
    fn cast_operand_parens() {
        let out = emit("default { timer() { integer a; llOwnerSay((string)(a + 1)); } }");
        assert!(out.contains("(string)(a + 1)"));
        let out = emit("default { timer() { integer a; llOwnerSay((string)a); } }");
        assert!(out.contains("(string)a"));
    }
}
