//! Expression parsing: the precedence ladder, postfix chains and primaries.
//!
//! Precedence, weakest to strongest: `||`, `&&`, `== !=`, `< <= > >=`,
//! `+ -`, `* / %`, `~` conversion, prefix `! - ++ -- typeof`, postfix
//! (call / member / index / `++` / `--`), primary.

use std::rc::Rc;

use crate::ast::{
    BinaryOp, Expr, ExprKind, Ident, LambdaBody, LambdaExpr, RuntimeLiteral, UnaryOp, UpdateOp,
};
use crate::diagnostic::Diagnostic;
use crate::token::TokenKind;

use super::Parser;

impl Parser {
    pub(super) fn expression(&mut self) -> Result<Expr, Diagnostic> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> Result<Expr, Diagnostic> {
        let mut left = self.and_expr()?;
        while self.check(TokenKind::OrOr) {
            self.advance();
            let right = self.and_expr()?;
            left = binary(BinaryOp::Or, left, right);
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr, Diagnostic> {
        let mut left = self.equality_expr()?;
        while self.check(TokenKind::AndAnd) {
            self.advance();
            let right = self.equality_expr()?;
            left = binary(BinaryOp::And, left, right);
        }
        Ok(left)
    }

    fn equality_expr(&mut self) -> Result<Expr, Diagnostic> {
        let mut left = self.comparison_expr()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::EqEq => BinaryOp::Eq,
                TokenKind::NotEq => BinaryOp::NotEq,
                _ => break,
            };
            self.advance();
            let right = self.comparison_expr()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn comparison_expr(&mut self) -> Result<Expr, Diagnostic> {
        let mut left = self.term_expr()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::LtEq => BinaryOp::LtEq,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::GtEq => BinaryOp::GtEq,
                _ => break,
            };
            self.advance();
            let right = self.term_expr()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn term_expr(&mut self) -> Result<Expr, Diagnostic> {
        let mut left = self.factor_expr()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.factor_expr()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn factor_expr(&mut self) -> Result<Expr, Diagnostic> {
        let mut left = self.conversion_expr()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.conversion_expr()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    /// `expr ~ T`, chainable: `x ~ int ~ str`.
    fn conversion_expr(&mut self) -> Result<Expr, Diagnostic> {
        let mut value = self.unary_expr()?;
        while self.check(TokenKind::Tilde) {
            self.advance();
            let ty = self.type_expr()?;
            let span = value.span.to(ty.span);
            value = Expr {
                kind: ExprKind::Convert {
                    value: Box::new(value),
                    ty,
                },
                span,
            };
        }
        Ok(value)
    }

    fn unary_expr(&mut self) -> Result<Expr, Diagnostic> {
        let kind = self.peek_kind();
        match kind {
            TokenKind::Bang | TokenKind::Minus => {
                let op_token = self.advance();
                let operand = self.unary_expr()?;
                let span = op_token.span.to(operand.span);
                let op = if kind == TokenKind::Bang {
                    UnaryOp::Not
                } else {
                    UnaryOp::Neg
                };
                Ok(Expr {
                    kind: ExprKind::Unary {
                        op,
                        operand: Box::new(operand),
                    },
                    span,
                })
            }
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                let op_token = self.advance();
                let target = self.unary_expr()?;
                if !target.is_lvalue() {
                    return Err(Diagnostic::new(
                        "Update target must be a variable, member or index",
                        target.span,
                    ));
                }
                let span = op_token.span.to(target.span);
                let op = if kind == TokenKind::PlusPlus {
                    UpdateOp::Increment
                } else {
                    UpdateOp::Decrement
                };
                Ok(Expr {
                    kind: ExprKind::Update {
                        op,
                        prefix: true,
                        target: Box::new(target),
                    },
                    span,
                })
            }
            TokenKind::Typeof => {
                let op_token = self.advance();
                let value = self.unary_expr()?;
                let span = op_token.span.to(value.span);
                Ok(Expr {
                    kind: ExprKind::TypeOf {
                        value: Box::new(value),
                    },
                    span,
                })
            }
            _ => self.postfix_expr(),
        }
    }

    fn postfix_expr(&mut self) -> Result<Expr, Diagnostic> {
        let mut expr = self.primary_expr()?;
        loop {
            match self.peek_kind() {
                TokenKind::LParen => {
                    self.advance();
                    let mut args = Vec::new();
                    if !self.check(TokenKind::RParen) {
                        loop {
                            args.push(self.expression()?);
                            if self.eat(TokenKind::Comma).is_none() {
                                break;
                            }
                        }
                    }
                    let end = self.expect(TokenKind::RParen)?.span;
                    let span = expr.span.to(end);
                    expr = Expr {
                        kind: ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                        },
                        span,
                    };
                }
                TokenKind::Dot => {
                    self.advance();
                    let name_token = self.expect(TokenKind::Ident)?;
                    let property = Ident::new(name_token.lexeme, name_token.span);
                    let span = expr.span.to(name_token.span);
                    expr = Expr {
                        kind: ExprKind::Member {
                            object: Box::new(expr),
                            property,
                        },
                        span,
                    };
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.expression()?;
                    let end = self.expect(TokenKind::RBracket)?.span;
                    let span = expr.span.to(end);
                    expr = Expr {
                        kind: ExprKind::Index {
                            object: Box::new(expr),
                            index: Box::new(index),
                        },
                        span,
                    };
                }
                TokenKind::PlusPlus | TokenKind::MinusMinus => {
                    if !expr.is_lvalue() {
                        break;
                    }
                    let op_token = self.advance();
                    let span = expr.span.to(op_token.span);
                    let op = if op_token.kind == TokenKind::PlusPlus {
                        UpdateOp::Increment
                    } else {
                        UpdateOp::Decrement
                    };
                    expr = Expr {
                        kind: ExprKind::Update {
                            op,
                            prefix: false,
                            target: Box::new(expr),
                        },
                        span,
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn primary_expr(&mut self) -> Result<Expr, Diagnostic> {
        match self.peek_kind() {
            TokenKind::Int => {
                let token = self.advance();
                let value: i64 = token.lexeme.parse().map_err(|_| {
                    Diagnostic::new("Integer literal out of range", token.span)
                })?;
                Ok(Expr {
                    kind: ExprKind::Int(value),
                    span: token.span,
                })
            }
            TokenKind::Dbl => {
                let token = self.advance();
                let value: f64 = token.lexeme.parse().map_err(|_| {
                    Diagnostic::new("Invalid double literal", token.span)
                })?;
                Ok(Expr {
                    kind: ExprKind::Dbl(value),
                    span: token.span,
                })
            }
            TokenKind::Str => {
                let token = self.advance();
                Ok(Expr {
                    kind: ExprKind::Str(token.lexeme),
                    span: token.span,
                })
            }
            TokenKind::True | TokenKind::False => {
                let token = self.advance();
                Ok(Expr {
                    kind: ExprKind::Bool(token.kind == TokenKind::True),
                    span: token.span,
                })
            }
            TokenKind::Ident => {
                let token = self.advance();
                Ok(Expr {
                    kind: ExprKind::Var(token.lexeme),
                    span: token.span,
                })
            }
            // Casting built-ins share their names with type keywords.
            kind if kind.is_type_keyword() && self.peek_at(1).kind == TokenKind::LParen => {
                let token = self.advance();
                Ok(Expr {
                    kind: ExprKind::Var(token.lexeme),
                    span: token.span,
                })
            }
            TokenKind::LParen => self.paren_or_lambda(),
            TokenKind::LBracket => self.array_literal(),
            TokenKind::LBrace => self.object_literal(),
            TokenKind::Lt => self.runtime_literal(),
            _ => {
                let found = self.peek();
                Err(Diagnostic::new(
                    format!("Expected an expression, found {}", found.kind.describe()),
                    found.span,
                ))
            }
        }
    }

    /// Commits to a lambda when `(` is followed by `)` or by a type token
    /// and an identifier; everything else is a parenthesized expression.
    /// Array-typed parameters announce themselves with `array` `<`.
    fn paren_or_lambda(&mut self) -> Result<Expr, Diagnostic> {
        let next = self.peek_at(1).kind;
        let is_lambda = next == TokenKind::RParen
            || (next.is_type_keyword()
                && matches!(
                    self.peek_at(2).kind,
                    TokenKind::Ident | TokenKind::Lt
                ));

        if is_lambda {
            return self.lambda_expr();
        }

        let start = self.expect(TokenKind::LParen)?.span;
        let inner = self.expression()?;
        let end = self.expect(TokenKind::RParen)?.span;
        Ok(Expr {
            span: start.to(end),
            ..inner
        })
    }

    /// `(int x, int y): int => x + y` or with a brace-block body.
    fn lambda_expr(&mut self) -> Result<Expr, Diagnostic> {
        let start = self.expect(TokenKind::LParen)?.span;
        let params = self.param_list()?;
        self.expect(TokenKind::RParen)?;
        self.expect(TokenKind::Colon)?;
        let ret = self.type_expr()?;
        self.expect(TokenKind::Arrow)?;

        let (body, end) = if self.check(TokenKind::LBrace) {
            let block = self.block_statement()?;
            let end = block.span;
            let statements = match block.kind {
                crate::ast::StmtKind::Block { statements } => statements,
                _ => unreachable!("block_statement returns a block"),
            };
            (LambdaBody::Block(statements), end)
        } else {
            let expr = self.expression()?;
            let end = expr.span;
            (LambdaBody::Expr(Box::new(expr)), end)
        };

        let span = start.to(end);
        Ok(Expr {
            kind: ExprKind::Lambda(Rc::new(LambdaExpr {
                params,
                ret,
                body,
                span,
            })),
            span,
        })
    }

    fn array_literal(&mut self) -> Result<Expr, Diagnostic> {
        let start = self.expect(TokenKind::LBracket)?.span;
        let mut elements = Vec::new();
        if !self.check(TokenKind::RBracket) {
            loop {
                elements.push(self.expression()?);
                if self.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
        }
        let end = self.expect(TokenKind::RBracket)?.span;
        Ok(Expr {
            kind: ExprKind::Array(elements),
            span: start.to(end),
        })
    }

    fn object_literal(&mut self) -> Result<Expr, Diagnostic> {
        let start = self.expect(TokenKind::LBrace)?.span;
        let mut fields = Vec::new();
        if !self.check(TokenKind::RBrace) {
            loop {
                let name_token = self.expect(TokenKind::Ident)?;
                let name = Ident::new(name_token.lexeme, name_token.span);
                self.expect(TokenKind::Colon)?;
                let value = self.expression()?;
                fields.push((name, value));
                if self.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
        }
        let end = self.expect(TokenKind::RBrace)?.span;
        Ok(Expr {
            kind: ExprKind::Object(fields),
            span: start.to(end),
        })
    }

    /// `<name attr={expr} ...> RAW </name>`
    fn runtime_literal(&mut self) -> Result<Expr, Diagnostic> {
        let start = self.expect(TokenKind::Lt)?.span;
        let name_token = self.expect(TokenKind::Ident)?;
        let name = Ident::new(name_token.lexeme.clone(), name_token.span);

        let mut attrs = Vec::new();
        while self.check(TokenKind::Ident) {
            let attr_token = self.advance();
            let attr_name = Ident::new(attr_token.lexeme, attr_token.span);
            self.expect(TokenKind::Assign)?;
            self.expect(TokenKind::LBrace)?;
            let value = self.expression()?;
            self.expect(TokenKind::RBrace)?;
            attrs.push((attr_name, value));
        }
        self.expect(TokenKind::Gt)?;

        let body_token = self.expect(TokenKind::TagBody)?;
        let code = body_token.lexeme;

        self.expect(TokenKind::Lt)?;
        self.expect(TokenKind::Slash)?;
        let closing = self.expect(TokenKind::Ident)?;
        if closing.lexeme != name_token.lexeme {
            return Err(Diagnostic::new(
                format!(
                    "Mismatched closing tag: expected '</{}>', found '</{}>'",
                    name_token.lexeme, closing.lexeme
                ),
                closing.span,
            ));
        }
        let end = self.expect(TokenKind::Gt)?.span;

        let span = start.to(end);
        Ok(Expr {
            kind: ExprKind::Runtime(RuntimeLiteral {
                name,
                attrs,
                code,
                span,
            }),
            span,
        })
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    let span = left.span.to(right.span);
    Expr {
        kind: ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        span,
    }
}
