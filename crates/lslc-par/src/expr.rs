//! Expression parsing and type checking.
//!
//! Hand-written recursive descent following the precedence ladder
//! (lowest to highest): `|| &&`, `|`, `^`, `&`, `== !=`, `< <= > >=`,
//! `<< >>`, `+ -`, `* / %`, unary, postfix. Type checks run inline;
//! implicit casts (integer→float, string↔key) are validated here and
//! materialized as cast nodes when `explicitcast` is set.
//!
//! The classic `<a,b,c>` vs. inequality ambiguity is resolved in
//! [`Parser::parse_vector_rotation_tail`]: the third component is first
//! tried as a full expression (backtracking on failure), then the rest
//! is parsed as an inequality chain where a `>` closes the literal
//! whenever the following token cannot start an operand.

use lslc_lang::{Type, Value};
use lslc_lex::Token;
use lslc_util::ErrorKind;

use crate::ast::{BinOp, Node, NodeKind, VecField};
use crate::symtab::{ScopeId, Symbol};
use crate::{CompileError, Parser};

/// Expectation for an expression list.
pub(crate) enum ArgTypes<'t> {
    /// No constraints (for-loop headers).
    Unconstrained,
    /// List literals and lazy-list indices: void expressions are
    /// rejected when optimization is on.
    ListContext,
    /// Function arguments: arity and (auto-castable) types must match.
    Expected(&'t [Type]),
}

fn bin(op: BinOp, ty: Type, l: Node, r: Node) -> Node {
    Node::with_children(NodeKind::Bin(op), Some(ty), vec![l, r])
}

fn cast_node(value: Node, ty: Type) -> Node {
    Node::with_children(NodeKind::Cast, Some(ty), vec![value])
}

impl Parser<'_> {
    /// expression: bitbool_term | expression '||' bitbool_term
    ///     | expression '&&' bitbool_term
    pub(crate) fn parse_expression(&mut self) -> Result<Node, CompileError> {
        let mut expr = self.parse_bitbool_term()?;
        while matches!(self.tok, Token::AndAnd | Token::OrOr) {
            if expr.ty != Some(Type::Integer) {
                return self.err(ErrorKind::TypeMismatch);
            }
            let op = if self.tok == Token::AndAnd {
                BinOp::And
            } else {
                BinOp::Or
            };
            self.next()?;
            let rexpr = self.parse_bitbool_term()?;
            if rexpr.ty != Some(Type::Integer) {
                return self.err(ErrorKind::TypeMismatch);
            }
            expr = bin(op, Type::Integer, expr, rexpr);
        }
        if !self.allow_void && expr.ty.is_none() {
            return self.err(ErrorKind::TypeMismatch);
        }
        Ok(expr)
    }

    fn parse_int_chain(
        &mut self,
        tokens: &[(Token, BinOp)],
        descend: fn(&mut Self) -> Result<Node, CompileError>,
    ) -> Result<Node, CompileError> {
        let mut node = descend(self)?;
        'outer: loop {
            for (t, op) in tokens {
                if &self.tok == t {
                    if node.ty != Some(Type::Integer) {
                        return self.err(ErrorKind::TypeMismatch);
                    }
                    self.next()?;
                    let rexpr = descend(self)?;
                    if rexpr.ty != Some(Type::Integer) {
                        return self.err(ErrorKind::TypeMismatch);
                    }
                    node = bin(*op, Type::Integer, node, rexpr);
                    continue 'outer;
                }
            }
            return Ok(node);
        }
    }

    /// bitbool_term: bitxor_term | bitbool_term '|' bitxor_term
    fn parse_bitbool_term(&mut self) -> Result<Node, CompileError> {
        self.parse_int_chain(&[(Token::Pipe, BinOp::BitOr)], Self::parse_bitxor_term)
    }

    /// bitxor_term: bitbool_factor | bitxor_term '^' bitbool_factor
    fn parse_bitxor_term(&mut self) -> Result<Node, CompileError> {
        self.parse_int_chain(&[(Token::Caret, BinOp::BitXor)], Self::parse_bitbool_factor)
    }

    /// bitbool_factor: comparison | bitbool_factor '&' comparison
    fn parse_bitbool_factor(&mut self) -> Result<Node, CompileError> {
        self.parse_int_chain(&[(Token::Amp, BinOp::BitAnd)], Self::parse_comparison)
    }

    /// comparison: inequality | comparison '==' inequality
    ///     | comparison '!=' inequality
    fn parse_comparison(&mut self) -> Result<Node, CompileError> {
        let mut comparison = self.parse_inequality()?;
        loop {
            let op = match self.tok {
                Token::EqEq => BinOp::Eq,
                Token::NotEq => BinOp::Ne,
                _ => return Ok(comparison),
            };
            if comparison.ty.is_none() {
                return self.err(ErrorKind::TypeMismatch);
            }
            self.next()?;
            let mut rexpr = self.parse_inequality()?;
            if comparison.ty == Some(Type::Float) {
                rexpr = self.autocast(rexpr, Type::Float)?;
            } else {
                // For string and key, the right-hand side mandates the
                // conversion.
                let rt = match rexpr.ty {
                    Some(t) => t,
                    None => return self.err(ErrorKind::TypeMismatch),
                };
                comparison = self.autocast(comparison, rt)?;
            }
            comparison = bin(op, Type::Integer, comparison, rexpr);
        }
    }

    /// inequality: shift | inequality ('<'|'<='|'>'|'>=') shift
    fn parse_inequality(&mut self) -> Result<Node, CompileError> {
        let mut inequality = self.parse_shift()?;
        loop {
            let op = match self.tok {
                Token::Lt => BinOp::Lt,
                Token::LtEq => BinOp::Le,
                Token::Gt => BinOp::Gt,
                Token::GtEq => BinOp::Ge,
                _ => return Ok(inequality),
            };
            if !matches!(inequality.ty, Some(Type::Integer | Type::Float)) {
                return self.err(ErrorKind::TypeMismatch);
            }
            self.next()?;
            let rexpr = self.parse_shift()?;
            inequality = self.numeric_comparison(op, inequality, rexpr)?;
        }
    }

    /// Shared tail for numeric comparisons: both operands must be
    /// integer or float; mixed operands promote to float.
    fn numeric_comparison(
        &mut self,
        op: BinOp,
        mut left: Node,
        mut right: Node,
    ) -> Result<Node, CompileError> {
        if !matches!(right.ty, Some(Type::Integer | Type::Float)) {
            return self.err(ErrorKind::TypeMismatch);
        }
        if left.ty != right.ty {
            if right.ty == Some(Type::Float) {
                left = self.autocast(left, Type::Float)?;
            } else {
                right = self.autocast(right, Type::Float)?;
            }
        }
        Ok(bin(op, Type::Integer, left, right))
    }

    /// shift: term | shift ('<<'|'>>') term
    fn parse_shift(&mut self) -> Result<Node, CompileError> {
        self.parse_int_chain(
            &[(Token::Shl, BinOp::Shl), (Token::Shr, BinOp::Shr)],
            Self::parse_term,
        )
    }

    /// term: factor | term ('+'|'-') factor
    fn parse_term(&mut self) -> Result<Node, CompileError> {
        let mut term = self.parse_factor()?;
        loop {
            let op = match self.tok {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => return Ok(term),
            };
            let lt = match term.ty {
                Some(t) => t,
                None => return self.err(ErrorKind::TypeMismatch),
            };
            if op == BinOp::Sub
                && !matches!(
                    lt,
                    Type::Integer | Type::Float | Type::Vector | Type::Rotation
                )
            {
                return self.err(ErrorKind::TypeMismatch);
            }
            self.next()?;
            let rexpr = self.parse_factor()?;
            let rt = match rexpr.ty {
                Some(t) => t,
                None => return self.err(ErrorKind::TypeMismatch),
            };
            let allowkeyconcat = self.lex.opts.allowkeyconcat;
            let is_text = |t: Type| matches!(t, Type::Key | Type::String);

            if op == BinOp::Add && (lt == rt || lt == Type::List || rt == Type::List) {
                if lt == Type::Key && rt == Type::Key {
                    // key + key is the only disallowed combination of
                    // equal types.
                    return self.err(ErrorKind::TypeMismatch);
                }
                let resty = if rt == Type::List { rt } else { lt };
                term = bin(op, resty, term, rexpr);
            } else if allowkeyconcat && op == BinOp::Add && is_text(lt) && is_text(rt) {
                // string+key / key+string, with the cast made explicit.
                if lt == Type::Key {
                    term = bin(op, rt, cast_node(term, rt), rexpr);
                } else {
                    term = bin(op, lt, term, cast_node(rexpr, lt));
                }
            } else if lt == Type::Key || rt == Type::Key {
                return self.err(ErrorKind::TypeMismatch);
            } else if lt == Type::Float {
                let rexpr = self.autocast(rexpr, lt)?;
                term = bin(op, lt, term, rexpr);
            } else {
                let cast = self.autocast(term, rt)?;
                term = bin(op, rt, cast, rexpr);
            }
        }
    }

    /// factor: unary_expression | factor ('*'|'/'|'%') unary_expression
    fn parse_factor(&mut self) -> Result<Node, CompileError> {
        let mut factor = self.parse_unary_expression(true)?;
        loop {
            let op = match self.tok {
                Token::Star => BinOp::Mul,
                Token::Slash => BinOp::Div,
                Token::Percent => BinOp::Mod,
                _ => return Ok(factor),
            };
            let lt = factor.ty;
            let mul_ok = matches!(
                lt,
                Some(Type::Integer | Type::Float | Type::Vector | Type::Rotation)
            );
            let mod_ok = matches!(lt, Some(Type::Integer | Type::Vector));
            if (op != BinOp::Mod && !mul_ok) || (op == BinOp::Mod && !mod_ok) {
                return self.err(ErrorKind::TypeMismatch);
            }
            self.next()?;
            let mut rexpr = self.parse_unary_expression(true)?;
            if op == BinOp::Mod && lt != rexpr.ty {
                return self.err(ErrorKind::TypeMismatch);
            }
            if op == BinOp::Mod || (lt == Some(Type::Integer) && rexpr.ty == Some(Type::Integer)) {
                let ty = lt.unwrap_or(Type::Integer);
                factor = bin(op, ty, factor, rexpr);
                continue;
            }

            // Integers promote to float from here on.
            let mut lt = lt.unwrap_or(Type::Integer);
            if lt == Type::Integer {
                lt = Type::Float;
                factor = self.autocast(factor, lt)?;
            }
            let mut rt = match rexpr.ty {
                Some(t) => t,
                None => return self.err(ErrorKind::TypeMismatch),
            };
            if rt == Type::Integer {
                rt = Type::Float;
                rexpr = self.autocast(rexpr, rt)?;
            }
            let valid = (lt == Type::Float && matches!(rt, Type::Float | Type::Vector))
                || (lt == Type::Vector
                    && matches!(rt, Type::Float | Type::Vector | Type::Rotation))
                || (lt == Type::Rotation && rt == Type::Rotation);
            if !valid || (op == BinOp::Div && rt == Type::Vector) {
                // Division by a vector is never valid.
                return self.err(ErrorKind::TypeMismatch);
            }
            let resulttype = if lt == Type::Float && rt == Type::Vector {
                Type::Vector
            } else if lt == Type::Vector && rt == Type::Vector {
                Type::Float
            } else {
                lt
            };
            factor = bin(op, resulttype, factor, rexpr);
        }
    }

    /// unary_expression: '-' factor | '!' unary | '~' unary
    ///     | '++' lvalue | '--' lvalue
    ///     | '(' TYPE ')' typecast_expression | '(' expression ')'
    ///     | unary_postfix_expression
    pub(crate) fn parse_unary_expression(
        &mut self,
        allow_assignment: bool,
    ) -> Result<Node, CompileError> {
        match self.tok.clone() {
            Token::Minus => {
                self.next()?;
                let value = self.parse_factor()?;
                if !matches!(
                    value.ty,
                    Some(Type::Integer | Type::Float | Type::Vector | Type::Rotation)
                ) {
                    return self.err(ErrorKind::TypeMismatch);
                }
                let ty = value.ty;
                Ok(Node::with_children(NodeKind::Neg, ty, vec![value]))
            }
            Token::Bang | Token::Tilde => {
                let kind = if self.tok == Token::Bang {
                    NodeKind::Not
                } else {
                    NodeKind::BitNot
                };
                self.next()?;
                let value = self.parse_unary_expression(true)?;
                if value.ty != Some(Type::Integer) {
                    return self.err(ErrorKind::TypeMismatch);
                }
                Ok(Node::with_children(kind, Some(Type::Integer), vec![value]))
            }
            Token::PlusPlus | Token::MinusMinus => {
                let kind = if self.tok == Token::PlusPlus {
                    NodeKind::PreIncr
                } else {
                    NodeKind::PreDecr
                };
                self.next()?;
                let name = self.expect_ident()?;
                let sym = match self.find_full(&name, false) {
                    Some(s) if s.is_var() => s,
                    _ => return self.err(ErrorKind::Undefined),
                };
                let typ = sym.var_type().unwrap_or(Type::Integer);
                let mut lvalue = Node::new(
                    NodeKind::Ident {
                        name,
                        scope: sym.scope,
                    },
                    Some(typ),
                );
                self.next()?;
                if self.tok == Token::Dot {
                    self.next()?;
                    let fldname = self.expect_ident()?;
                    let fld = self.validate_field(typ, &fldname)?;
                    lvalue = Node::with_children(
                        NodeKind::Field(fld),
                        Some(Type::Float),
                        vec![lvalue],
                    );
                    self.next()?;
                }
                if !matches!(lvalue.ty, Some(Type::Integer | Type::Float)) {
                    return self.err(ErrorKind::TypeMismatch);
                }
                let ty = lvalue.ty;
                Ok(Node::with_children(kind, ty, vec![lvalue]))
            }
            Token::LParen => {
                self.next()?;
                let typ = match self.tok {
                    Token::TypeName(t) => t,
                    _ => {
                        // Parenthesized expression.
                        let expr = self.parse_expression()?;
                        self.want(&Token::RParen)?;
                        return Ok(expr);
                    }
                };
                self.next()?;
                self.want(&Token::RParen)?;
                self.parse_typecast(typ)
            }
            _ => self.parse_unary_postfix_expression(allow_assignment),
        }
    }

    /// The operand of a `(type)` cast, then the cast itself.
    fn parse_typecast(&mut self, typ: Type) -> Result<Node, CompileError> {
        let expr = if self.lex.opts.extendedtypecast {
            // The cast acts as a prefix unary operator: any unary
            // expression (except assignment) may follow. Minus before
            // a numeric constant binds to the constant.
            if self.tok == Token::Minus {
                self.next()?;
                match self.tok {
                    Token::IntegerLit(v) => {
                        self.next()?;
                        Node::const_val(Value::Integer(v.wrapping_neg()))
                    }
                    Token::FloatLit(v) => {
                        self.next()?;
                        Node::const_val(Value::Float(-v))
                    }
                    _ => {
                        let e = self.parse_unary_expression(false)?;
                        let ty = e.ty;
                        Node::with_children(NodeKind::Neg, ty, vec![e])
                    }
                }
            } else {
                self.parse_unary_expression(false)?
            }
        } else if self.tok == Token::LParen {
            self.next()?;
            let e = self.parse_expression()?;
            self.want(&Token::RParen)?;
            e
        } else {
            self.parse_unary_postfix_expression(false)?
        };

        let basetype = expr.ty;

        // An untyped lazy-list subscript resolves through the library
        // extraction function for the requested type.
        if self.lex.opts.lazylists
            && basetype.is_none()
            && matches!(expr.kind, NodeKind::SubIdx)
        {
            let fname = match self.lib.type_to_extraction.get(&typ) {
                Some(f) => f.clone(),
                None => return self.err(ErrorKind::NoConversion),
            };
            let sym = match self.find_full(&fname, true) {
                Some(s) => s,
                None => return self.err(ErrorKind::NoConversion),
            };
            let fnparams: Vec<Option<Type>> = sym
                .func_param_types()
                .unwrap_or(&[])
                .iter()
                .map(|t| Some(*t))
                .collect();
            let subparams: Vec<Option<Type>> = expr.ch.iter().map(|n| n.ty).collect();
            if fnparams != subparams {
                return self.err(ErrorKind::FunctionMismatch);
            }
            return Ok(Node::with_children(
                NodeKind::FnCall { name: fname },
                sym.func_ret(),
                expr.ch,
            ));
        }

        let valid = match basetype {
            _ if typ == Type::List && basetype.is_some() => true,
            Some(Type::Integer | Type::Float) => {
                matches!(typ, Type::Integer | Type::Float | Type::String)
            }
            Some(Type::String) => true,
            Some(Type::Key) => matches!(typ, Type::String | Type::Key),
            Some(Type::Vector) => matches!(typ, Type::String | Type::Vector),
            Some(Type::Rotation) => matches!(typ, Type::String | Type::Rotation),
            Some(Type::List) => typ == Type::String,
            _ => false,
        };
        if valid {
            Ok(cast_node(expr, typ))
        } else {
            self.err(ErrorKind::TypeMismatch)
        }
    }

    pub(crate) fn validate_field(
        &mut self,
        typ: Type,
        name: &str,
    ) -> Result<VecField, CompileError> {
        let fld = VecField::from_name(name);
        match (typ, fld) {
            (Type::Vector, Some(f)) if f != VecField::S => Ok(f),
            (Type::Rotation, Some(f)) => Ok(f),
            _ => self.err(ErrorKind::InvalidField),
        }
    }

    /// Whether the current token can begin the right operand of a
    /// comparison (if not, a `>` terminates a vector/rotation literal).
    fn token_starts_operand(&self) -> bool {
        matches!(
            self.tok,
            Token::Ident(_)
                | Token::IntegerLit(_)
                | Token::FloatLit(_)
                | Token::StringLit(_)
                | Token::KeyLit(_)
                | Token::VectorLit(_)
                | Token::RotationLit(_)
                | Token::ListLit(_)
                | Token::True
                | Token::False
                | Token::PlusPlus
                | Token::MinusMinus
                | Token::Print
                | Token::Bang
                | Token::Tilde
                | Token::LParen
                | Token::LBracket
        )
    }

    /// Parse the rest of a vector/rotation literal after the second
    /// comma. The closing `>` has the precedence of an inequality, so
    /// this performs the job of the inequality rule, closing the
    /// literal when a `>` is followed by something that cannot start an
    /// operand. A rotation may carry a full expression in its third
    /// component, so that is tried first with backtracking.
    pub(crate) fn parse_vector_rotation_tail(&mut self) -> Result<Vec<Node>, CompileError> {
        let mut ret = Vec::new();
        let snap = self.lex.snapshot();
        let tok_save = self.tok.clone();

        let mut component3 = None;
        let committed = match self.parse_expression() {
            Ok(e) => {
                if self.tok == Token::Comma && self.next().is_ok() {
                    component3 = Some(e);
                    true
                } else {
                    false
                }
            }
            Err(_) => false,
        };
        if !committed {
            self.lex.restore(snap);
            self.tok = tok_save;
            component3 = None;
        }
        if let Some(c3) = component3 {
            ret.push(self.autocast(c3, Type::Float)?);
        }

        let mut inequality = self.parse_shift()?;
        loop {
            let op = match self.tok {
                Token::Lt => BinOp::Lt,
                Token::LtEq => BinOp::Le,
                Token::GtEq => BinOp::Ge,
                Token::Gt => BinOp::Gt,
                _ => break,
            };
            self.next()?;
            if op == BinOp::Gt && !self.token_starts_operand() {
                // The '>' closes the literal.
                ret.push(self.autocast(inequality, Type::Float)?);
                return Ok(ret);
            }
            if !matches!(inequality.ty, Some(Type::Integer | Type::Float)) {
                return self.err(ErrorKind::TypeMismatch);
            }
            let rexpr = self.parse_shift()?;
            inequality = self.numeric_comparison(op, inequality, rexpr)?;
        }
        // An operator of lower precedence arrived before the literal
        // was closed, e.g. <1,1,1,2==2>.
        self.syntax_err()
    }

    /// optional_expression_list: LAMBDA | expression_list
    pub(crate) fn parse_optional_expression_list(
        &mut self,
        expected: ArgTypes<'_>,
    ) -> Result<Vec<Node>, CompileError> {
        let mut ret: Vec<Node> = Vec::new();
        if !matches!(self.tok, Token::RBracket | Token::RParen | Token::Semi) {
            loop {
                let save = self.allow_void;
                self.allow_void = true;
                let expr = self.parse_expression();
                self.allow_void = save;
                let mut expr = expr?;
                if matches!(expr.kind, NodeKind::SubIdx) && expr.ty.is_none() {
                    // An untyped lazy subscript needs a cast to decide
                    // the extraction function.
                    return self.err(ErrorKind::TypeMismatch);
                }
                match &expected {
                    ArgTypes::Expected(types) => {
                        if ret.len() >= types.len() {
                            return self.err(ErrorKind::FunctionMismatch);
                        }
                        expr = match self.autocast(expr, types[ret.len()]) {
                            Ok(e) => e,
                            Err(_) => return self.err(ErrorKind::FunctionMismatch),
                        };
                    }
                    ArgTypes::ListContext => {
                        if self.lex.opts.optimize && expr.ty.is_none() {
                            return self.err(ErrorKind::TypeMismatch);
                        }
                    }
                    ArgTypes::Unconstrained => {}
                }
                ret.push(expr);
                if self.tok != Token::Comma {
                    break;
                }
                self.next()?;
            }
        }
        if let ArgTypes::Expected(types) = expected {
            if ret.len() != types.len() {
                return self.err(ErrorKind::FunctionMismatch);
            }
        }
        Ok(ret)
    }

    /// unary_postfix_expression: literals, vector/rotation/list
    /// literals, `print`, calls, lvalues, postfix `++`/`--`,
    /// assignments, lazy-list subscripts.
    pub(crate) fn parse_unary_postfix_expression(
        &mut self,
        allow_assignment: bool,
    ) -> Result<Node, CompileError> {
        match self.tok.clone() {
            Token::Minus => {
                self.next()?;
                match self.tok {
                    Token::IntegerLit(v) => {
                        self.next()?;
                        Ok(Node::const_val(Value::Integer(v.wrapping_neg())))
                    }
                    Token::FloatLit(v) => {
                        self.next()?;
                        Ok(Node::const_val(Value::Float(-v)))
                    }
                    _ => self.syntax_err(),
                }
            }
            Token::IntegerLit(v) => {
                self.next()?;
                Ok(Node::const_val(Value::Integer(v)))
            }
            Token::FloatLit(v) => {
                self.next()?;
                Ok(Node::const_val(Value::Float(v)))
            }
            Token::StringLit(s) => {
                self.next()?;
                let mut s = s;
                if self.lex.opts.allowmultistrings {
                    while let Token::StringLit(s2) = &self.tok {
                        s.push_str(s2);
                        self.next()?;
                    }
                }
                Ok(Node::const_val(Value::Str(s)))
            }
            Token::KeyLit(k) => {
                self.next()?;
                Ok(Node::const_val(Value::Key(k)))
            }
            Token::VectorLit(v) => {
                self.next()?;
                Ok(Node::const_val(Value::Vector(v)))
            }
            Token::RotationLit(r) => {
                self.next()?;
                Ok(Node::const_val(Value::Rotation(r)))
            }
            Token::ListLit(l) => {
                self.next()?;
                Ok(Node::const_val(Value::List(l)))
            }
            Token::True => {
                self.next()?;
                Ok(Node::const_val(Value::Integer(1)))
            }
            Token::False => {
                self.next()?;
                Ok(Node::const_val(Value::Integer(0)))
            }
            Token::Lt => {
                self.next()?;
                let save_allow_void = self.allow_void;
                self.allow_void = false;
                let mut val = Vec::new();
                let e = self.parse_expression()?;
                val.push(self.autocast(e, Type::Float)?);
                self.want(&Token::Comma)?;
                let e = self.parse_expression()?;
                val.push(self.autocast(e, Type::Float)?);
                self.want(&Token::Comma)?;
                let tail = self.parse_vector_rotation_tail()?;
                val.extend(tail);
                self.allow_void = save_allow_void;
                if val.len() == 3 {
                    Ok(Node::with_children(
                        NodeKind::VectorLit,
                        Some(Type::Vector),
                        val,
                    ))
                } else {
                    Ok(Node::with_children(
                        NodeKind::RotationLit,
                        Some(Type::Rotation),
                        val,
                    ))
                }
            }
            Token::LBracket => {
                self.next()?;
                let val = self.parse_optional_expression_list(ArgTypes::ListContext)?;
                self.want(&Token::RBracket)?;
                Ok(Node::with_children(NodeKind::ListLit, Some(Type::List), val))
            }
            Token::Print => {
                self.next()?;
                self.want(&Token::LParen)?;
                let save = self.allow_void;
                self.allow_void = true;
                let expr = self.parse_expression();
                self.allow_void = save;
                let expr = expr?;
                if expr.ty.is_none() {
                    return self.err(ErrorKind::TypeMismatch);
                }
                self.want(&Token::RParen)?;
                // print returns the type of its expression, nominally.
                let ty = expr.ty;
                Ok(Node::with_children(NodeKind::Print, ty, vec![expr]))
            }
            Token::Ident(name) => self.parse_postfix_ident(name, allow_assignment),
            _ => self.syntax_err(),
        }
    }

    fn parse_postfix_ident(
        &mut self,
        name: String,
        allow_assignment: bool,
    ) -> Result<Node, CompileError> {
        let savepos = self.lex.errorpos();
        self.next()?;

        if self.tok == Token::LParen {
            // Function call; functions live in the global scope only.
            self.next()?;
            let sym = match self.find_full(&name, true) {
                Some(s) if s.is_func() => s,
                _ => return self.err_at(savepos, ErrorKind::Undefined),
            };
            let ptypes = sym.func_param_types().unwrap_or(&[]).to_vec();
            let args = self.parse_optional_expression_list(ArgTypes::Expected(&ptypes))?;
            self.want(&Token::RParen)?;
            return Ok(Node::with_children(
                NodeKind::FnCall { name },
                sym.func_ret(),
                args,
            ));
        }

        let sym = match self.find_full(&name, false) {
            Some(s) if s.is_var() => s,
            _ => return self.err_at(savepos, ErrorKind::Undefined),
        };
        let mut typ = sym.var_type().unwrap_or(Type::Integer);
        let mut lvalue = Node::new(
            NodeKind::Ident {
                name,
                scope: sym.scope,
            },
            Some(typ),
        );

        // Lazy lists: IDENT '[' expr ']' [ '=' expr ].
        if self.lex.opts.lazylists && self.tok == Token::LBracket {
            return self.parse_lazy_subscript(lvalue, typ, allow_assignment);
        }

        if self.tok == Token::Dot {
            self.next()?;
            let fldname = self.expect_ident()?;
            let fld = self.validate_field(typ, &fldname)?;
            lvalue = Node::with_children(NodeKind::Field(fld), Some(Type::Float), vec![lvalue]);
            self.next()?;
            typ = Type::Float;
        }

        if matches!(self.tok, Token::PlusPlus | Token::MinusMinus) {
            let kind = if self.tok == Token::PlusPlus {
                NodeKind::PostIncr
            } else {
                NodeKind::PostDecr
            };
            self.next()?;
            if !matches!(lvalue.ty, Some(Type::Integer | Type::Float)) {
                return self.err(ErrorKind::TypeMismatch);
            }
            let ty = lvalue.ty;
            return Ok(Node::with_children(kind, ty, vec![lvalue]));
        }

        let comp = match self.tok {
            Token::Assign => Some(None),
            Token::PlusEq => Some(Some(BinOp::Add)),
            Token::MinusEq => Some(Some(BinOp::Sub)),
            Token::StarEq => Some(Some(BinOp::Mul)),
            Token::SlashEq => Some(Some(BinOp::Div)),
            Token::PercentEq => Some(Some(BinOp::Mod)),
            Token::PipeEq => Some(Some(BinOp::BitOr)),
            Token::AmpEq => Some(Some(BinOp::BitAnd)),
            Token::CaretEq => Some(Some(BinOp::BitXor)),
            Token::ShlEq => Some(Some(BinOp::Shl)),
            Token::ShrEq => Some(Some(BinOp::Shr)),
            _ => None,
        };
        let comp = match comp {
            Some(c) if allow_assignment => c,
            _ => return Ok(lvalue),
        };
        self.parse_assignment(lvalue, typ, comp)
    }

    fn parse_assignment(
        &mut self,
        lvalue: Node,
        typ: Type,
        comp: Option<BinOp>,
    ) -> Result<Node, CompileError> {
        self.next()?;
        let mut expr = self.parse_expression()?;
        let mut rtyp = expr.ty;

        if matches!(typ, Type::Integer | Type::Float) {
            // LSL admits integer *= float; it acts like
            // lhs = (integer)((float)lhs * rhs). Everything else casts
            // the right side to the lvalue type.
            if comp != Some(BinOp::Mul) || typ == Type::Float {
                expr = self.autocast(expr, typ)?;
                rtyp = Some(typ);
            }
        }

        let assign = |e: Node| {
            Node::with_children(NodeKind::Assign(comp), Some(typ), vec![lvalue, e])
        };

        match comp {
            None => {
                let expr = self.autocast(expr, typ)?;
                Ok(assign(expr))
            }
            Some(BinOp::Add) => {
                if typ == Type::Float {
                    expr = self.autocast(expr, typ)?;
                    rtyp = Some(typ);
                }
                if (rtyp != Some(typ) && typ != Type::List)
                    || (typ == Type::Key && rtyp == Some(Type::Key))
                {
                    return self.err(ErrorKind::TypeMismatch);
                }
                if self.lex.opts.explicitcast && typ == Type::List && rtyp != Some(Type::List) {
                    expr = cast_node(expr, Type::List);
                }
                Ok(assign(expr))
            }
            Some(BinOp::Sub) => {
                if rtyp == Some(typ)
                    && matches!(
                        typ,
                        Type::Integer | Type::Float | Type::Vector | Type::Rotation
                    )
                {
                    Ok(assign(expr))
                } else {
                    self.err(ErrorKind::TypeMismatch)
                }
            }
            Some(BinOp::Mul) | Some(BinOp::Div) => {
                if comp == Some(BinOp::Mul) && typ == Type::Integer && rtyp == Some(Type::Float) {
                    return Ok(assign(expr));
                }
                if (rtyp == Some(typ) || typ == Type::Vector)
                    && matches!(rtyp, Some(Type::Integer | Type::Float | Type::Rotation))
                {
                    if typ == Type::Vector && rtyp == Some(Type::Integer) {
                        expr = self.autocast(expr, Type::Float)?;
                    }
                    return Ok(assign(expr));
                }
                self.err(ErrorKind::TypeMismatch)
            }
            Some(BinOp::Mod) => {
                if rtyp == Some(typ) && matches!(typ, Type::Integer | Type::Vector) {
                    Ok(assign(expr))
                } else {
                    self.err(ErrorKind::TypeMismatch)
                }
            }
            Some(_) => {
                // The extended bitwise/shift assignments take integers.
                if typ == Type::Integer && rtyp == Some(Type::Integer) {
                    Ok(assign(expr))
                } else {
                    self.err(ErrorKind::TypeMismatch)
                }
            }
        }
    }

    fn parse_lazy_subscript(
        &mut self,
        lvalue: Node,
        typ: Type,
        allow_assignment: bool,
    ) -> Result<Node, CompileError> {
        self.next()?;
        if typ != Type::List {
            return self.err(ErrorKind::TypeMismatch);
        }
        let idxexpr = self.parse_optional_expression_list(ArgTypes::ListContext)?;
        self.want(&Token::RBracket)?;
        if self.tok != Token::Assign || !allow_assignment {
            let mut ch = vec![lvalue];
            ch.extend(idxexpr);
            return Ok(Node::with_children(NodeKind::SubIdx, None, ch));
        }

        // Lazy list assignment: expand to the injected helper.
        if idxexpr.len() != 1 {
            return self.err(ErrorKind::FunctionMismatch);
        }
        let idxexpr = match idxexpr.into_iter().next() {
            Some(e) if e.ty == Some(Type::Integer) => e,
            _ => return self.err(ErrorKind::TypeMismatch),
        };
        self.next()?;
        let save = self.allow_void;
        self.allow_void = true;
        let expr = self.parse_expression();
        self.allow_void = save;
        let mut expr = expr?;

        self.inject_lazy_list_helper();

        if expr.ty.is_none() {
            return self.err(ErrorKind::TypeMismatch);
        }
        if expr.ty != Some(Type::List) {
            expr = cast_node(expr, Type::List);
        }
        let call = Node::with_children(
            NodeKind::FnCall {
                name: "lazy_list_set".into(),
            },
            Some(Type::List),
            vec![lvalue.clone(), idxexpr, expr],
        );
        Ok(Node::with_children(
            NodeKind::Assign(None),
            Some(Type::List),
            vec![lvalue, call],
        ))
    }

    /// Define the `lazy_list_set` helper once, in the reserved tree
    /// slot. Leaving the name free lets users supply their own
    /// replacement (e.g. one that pads with something other than
    /// integer zero):
    ///
    /// ```lsl
    /// list lazy_list_set(list L, integer i, list v)
    /// {
    ///     while (llGetListLength(L) < i)
    ///         L = L + 0;
    ///     return llListReplaceList(L, v, i, i);
    /// }
    /// ```
    fn inject_lazy_list_helper(&mut self) {
        if self.symtab.contains(ScopeId::GLOBAL, "lazy_list_set") {
            return;
        }
        let paramscope = self.push_scope();
        let blockscope = self.push_scope();
        let ptypes = vec![Type::List, Type::Integer, Type::List];
        let pnames = vec!["L".to_string(), "i".to_string(), "v".to_string()];

        let mut fsym = Symbol::func(
            Some(Type::List),
            ptypes.clone(),
            Some(pnames.clone()),
            false,
        );
        fsym.loc = Some(self.usedspots);
        self.symtab.insert(ScopeId::GLOBAL, "lazy_list_set", fsym);
        self.symtab
            .insert(paramscope, "L", Symbol::param(Type::List, paramscope));
        self.symtab
            .insert(paramscope, "i", Symbol::param(Type::Integer, paramscope));
        self.symtab
            .insert(paramscope, "v", Symbol::param(Type::List, paramscope));

        let ident = |name: &str, t: Type| {
            Node::new(
                NodeKind::Ident {
                    name: name.to_string(),
                    scope: paramscope,
                },
                Some(t),
            )
        };

        let length_call = Node::with_children(
            NodeKind::FnCall {
                name: "llGetListLength".into(),
            },
            Some(Type::Integer),
            vec![ident("L", Type::List)],
        );
        let cond = bin(
            BinOp::Lt,
            Type::Integer,
            length_call,
            ident("i", Type::Integer),
        );
        let grow = Node::with_children(
            NodeKind::Assign(None),
            Some(Type::List),
            vec![
                ident("L", Type::List),
                bin(
                    BinOp::Add,
                    Type::List,
                    ident("L", Type::List),
                    Node::const_val(Value::Integer(0)),
                ),
            ],
        );
        let grow_stmt = Node::with_children(NodeKind::ExprStmt, Some(Type::List), vec![grow]);
        let while_stmt =
            Node::with_children(NodeKind::While, None, vec![cond, grow_stmt]);

        let replace_call = Node::with_children(
            NodeKind::FnCall {
                name: "llListReplaceList".into(),
            },
            Some(Type::List),
            vec![
                ident("L", Type::List),
                ident("v", Type::List),
                ident("i", Type::Integer),
                ident("i", Type::Integer),
            ],
        );
        let mut ret_stmt = Node::with_children(NodeKind::Return, None, vec![replace_call]);
        ret_stmt.lir = true;

        let mut body = Node::with_children(
            NodeKind::Block { scope: blockscope },
            None,
            vec![while_stmt, ret_stmt],
        );
        body.lir = true;

        self.tree[self.usedspots] = Node::with_children(
            NodeKind::FnDef {
                name: "lazy_list_set".into(),
                scope: Some(ScopeId::GLOBAL),
                pscope: paramscope,
                ptypes,
                pnames,
            },
            Some(Type::List),
            vec![body],
        );
        self.usedspots += 1;
        self.pop_scope();
        self.pop_scope();
    }
}
