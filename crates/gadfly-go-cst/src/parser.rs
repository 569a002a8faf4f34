//! Recursive-descent parser for the Go subset gadfly analyzes.
//!
//! The grammar follows go/parser's structure: operator-precedence climbing
//! for binary expressions, a single token of lookahead almost everywhere,
//! and the `exprLev` rule for composite literals (a `{` directly inside an
//! `if`/`for`/`switch` header opens the statement body, not a literal;
//! parentheses and call arguments re-enable literals).
//!
//! One parse error aborts the file; there is no error recovery. `select`
//! statements and statement labels are outside the supported subset and
//! produce a parse error.

use gadfly_core::patch::Span;
use gadfly_core::text::offset_to_position;
use thiserror::Error;

use crate::ast::*;
use crate::token::{Comment, Token, TokenKind};
use crate::tokenizer::tokenize;

// ============================================================================
// Errors
// ============================================================================

/// A parse failure with its position in the file.
#[derive(Debug, Error)]
#[error("{line}:{col}: {message}")]
pub struct ParseError {
    pub message: String,
    pub offset: u32,
    pub line: u32,
    pub col: u32,
}

type PResult<T> = Result<T, ParseError>;

/// Parse a single Go source file.
pub fn parse_file(src: &str) -> Result<SourceFile, ParseError> {
    let scanned = tokenize(src).map_err(|e| {
        let (line, col) = offset_to_position(src, e.offset as usize);
        ParseError {
            message: e.message,
            offset: e.offset,
            line,
            col,
        }
    })?;

    let mut parser = Parser {
        src,
        tokens: scanned.tokens,
        comments: scanned.comments,
        pos: 0,
        no_lit: 0,
    };
    let mut file = parser.source_file()?;
    attach_docs(&mut file, &parser.comments, src);
    Ok(file)
}

// ============================================================================
// Parser
// ============================================================================

struct Parser<'s> {
    src: &'s str,
    tokens: Vec<Token>,
    comments: Vec<Comment>,
    pos: usize,
    /// When > 0, a `{` cannot open a composite literal (control headers).
    no_lit: u32,
}

impl<'s> Parser<'s> {
    // ------------------------------------------------------------------
    // Token helpers
    // ------------------------------------------------------------------

    fn cur(&self) -> Token {
        self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn kind(&self) -> TokenKind {
        self.cur().kind
    }

    fn peek_kind(&self, ahead: usize) -> TokenKind {
        self.tokens
            .get(self.pos + ahead)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.kind() == kind
    }

    fn advance(&mut self) -> Token {
        let tok = self.cur();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, kind: TokenKind) -> Option<Token> {
        self.at(kind).then(|| self.advance())
    }

    fn expect(&mut self, kind: TokenKind) -> PResult<Token> {
        if self.at(kind) {
            Ok(self.advance())
        } else {
            Err(self.error_here(format!("expected '{}', found '{}'", kind, self.kind())))
        }
    }

    fn text(&self, tok: Token) -> &'s str {
        &self.src[tok.span.start as usize..tok.span.end as usize]
    }

    fn error_here(&self, message: impl Into<String>) -> ParseError {
        let offset = self.cur().span.start;
        let (line, col) = offset_to_position(self.src, offset as usize);
        ParseError {
            message: message.into(),
            offset,
            line,
            col,
        }
    }

    fn ident(&mut self) -> PResult<Ident> {
        let tok = self.expect(TokenKind::Ident)?;
        Ok(Ident::new(self.text(tok), tok.span))
    }

    /// Consume a statement terminator. A `;` token is consumed; closing
    /// delimiters and case labels terminate implicitly.
    fn expect_semi(&mut self) -> PResult<()> {
        match self.kind() {
            TokenKind::Semicolon => {
                self.advance();
                Ok(())
            }
            TokenKind::RParen
            | TokenKind::RBrace
            | TokenKind::Case
            | TokenKind::Default
            | TokenKind::Eof => Ok(()),
            other => Err(self.error_here(format!("expected ';', found '{}'", other))),
        }
    }

    /// Whether the current token can start a type expression.
    fn starts_type(&self) -> bool {
        matches!(
            self.kind(),
            TokenKind::Ident
                | TokenKind::Mul
                | TokenKind::LBracket
                | TokenKind::Map
                | TokenKind::Chan
                | TokenKind::Arrow
                | TokenKind::Func
                | TokenKind::Struct
                | TokenKind::Interface
                | TokenKind::LParen
                | TokenKind::Ellipsis
        )
    }

    // ------------------------------------------------------------------
    // File
    // ------------------------------------------------------------------

    fn source_file(&mut self) -> PResult<SourceFile> {
        self.expect(TokenKind::Package)?;
        let package = self.ident()?;
        self.expect_semi()?;

        let mut imports = Vec::new();
        while self.at(TokenKind::Import) {
            let decl = self.gen_decl()?;
            self.expect_semi()?;
            for spec in decl.specs {
                if let Spec::Import(spec) = spec {
                    imports.push(spec);
                }
            }
        }

        let mut decls = Vec::new();
        while !self.at(TokenKind::Eof) {
            if self.eat(TokenKind::Semicolon).is_some() {
                continue;
            }
            let decl = match self.kind() {
                TokenKind::Func => Decl::Func(Box::new(self.func_decl()?)),
                TokenKind::Const | TokenKind::Type | TokenKind::Var => {
                    Decl::Gen(self.gen_decl()?)
                }
                other => {
                    return Err(self.error_here(format!(
                        "expected declaration, found '{}'",
                        other
                    )))
                }
            };
            self.expect_semi()?;
            decls.push(decl);
        }

        Ok(SourceFile {
            package,
            imports,
            decls,
            span: Span::new(0, self.src.len() as u32),
        })
    }

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    fn gen_decl(&mut self) -> PResult<GenDecl> {
        let kw_tok = self.advance();
        let keyword = match kw_tok.kind {
            TokenKind::Import => DeclKeyword::Import,
            TokenKind::Const => DeclKeyword::Const,
            TokenKind::Type => DeclKeyword::Type,
            TokenKind::Var => DeclKeyword::Var,
            _ => return Err(self.error_here("expected declaration keyword")),
        };

        let mut specs = Vec::new();
        let end;
        if self.eat(TokenKind::LParen).is_some() {
            while !self.at(TokenKind::RParen) && !self.at(TokenKind::Eof) {
                if self.eat(TokenKind::Semicolon).is_some() {
                    continue;
                }
                specs.push(self.spec(keyword)?);
                self.expect_semi()?;
            }
            end = self.expect(TokenKind::RParen)?.span.end;
        } else {
            let spec = self.spec(keyword)?;
            end = spec_span(&spec).end;
            specs.push(spec);
        }

        Ok(GenDecl {
            keyword,
            specs,
            doc: None,
            span: Span::new(kw_tok.span.start, end),
        })
    }

    fn spec(&mut self, keyword: DeclKeyword) -> PResult<Spec> {
        match keyword {
            DeclKeyword::Import => {
                let start = self.cur().span.start;
                let alias = if self.at(TokenKind::Ident) {
                    Some(self.ident()?)
                } else if self.at(TokenKind::Period) {
                    let tok = self.advance();
                    Some(Ident::new(".", tok.span))
                } else {
                    None
                };
                let path_tok = self.expect(TokenKind::Str)?;
                let raw = self.text(path_tok);
                let path = raw.trim_matches(['"', '`']).to_string();
                Ok(Spec::Import(ImportSpec {
                    alias,
                    path,
                    span: Span::new(start, path_tok.span.end),
                }))
            }
            DeclKeyword::Const | DeclKeyword::Var => {
                let names = self.ident_list()?;
                let start = names[0].span.start;
                let ty = if self.starts_type() && !self.at(TokenKind::LParen) {
                    Some(self.parse_type()?)
                } else {
                    None
                };
                let values = if self.eat(TokenKind::Assign).is_some() {
                    self.expr_list()?
                } else {
                    Vec::new()
                };
                let end = values
                    .last()
                    .map(|v| v.span().end)
                    .or_else(|| ty.as_ref().map(|t| t.span().end))
                    .unwrap_or_else(|| names.last().map(|n| n.span.end).unwrap_or(start));
                Ok(Spec::Value(ValueSpec {
                    names,
                    ty,
                    values,
                    doc: None,
                    span: Span::new(start, end),
                }))
            }
            DeclKeyword::Type => {
                let name = self.ident()?;
                let start = name.span.start;
                let type_params = if self.at(TokenKind::LBracket) && self.looks_like_type_params()
                {
                    self.type_param_list()?
                } else {
                    Vec::new()
                };
                // Tolerate `type A = B` aliases.
                let _ = self.eat(TokenKind::Assign);
                let ty = self.parse_type()?;
                let end = ty.span().end;
                Ok(Spec::Type(TypeSpec {
                    name,
                    type_params,
                    ty,
                    doc: None,
                    span: Span::new(start, end),
                }))
            }
        }
    }

    /// Distinguish `type A[T any] ...` from `type A [N]int`: type parameter
    /// lists have a second token after the opening bracket.
    fn looks_like_type_params(&self) -> bool {
        self.peek_kind(1) == TokenKind::Ident && self.peek_kind(2) != TokenKind::RBracket
    }

    fn ident_list(&mut self) -> PResult<Vec<Ident>> {
        let mut names = vec![self.ident()?];
        while self.eat(TokenKind::Comma).is_some() {
            names.push(self.ident()?);
        }
        Ok(names)
    }

    fn func_decl(&mut self) -> PResult<FuncDecl> {
        let func_tok = self.expect(TokenKind::Func)?;
        let recv = if self.at(TokenKind::LParen) {
            Some(self.receiver()?)
        } else {
            None
        };
        let name = self.ident()?;
        let type_params = if self.at(TokenKind::LBracket) {
            self.type_param_list()?
        } else {
            Vec::new()
        };
        let sig = self.signature(func_tok.span.start, type_params)?;
        let body = if self.at(TokenKind::LBrace) {
            Some(self.block()?)
        } else {
            None
        };
        let end = body.as_ref().map(|b| b.span.end).unwrap_or(sig.span.end);
        Ok(FuncDecl {
            recv,
            name,
            sig,
            body,
            doc: None,
            span: Span::new(func_tok.span.start, end),
        })
    }

    fn receiver(&mut self) -> PResult<Field> {
        let l = self.expect(TokenKind::LParen)?;
        let (names, ty) = if self.at(TokenKind::Ident)
            && !matches!(self.peek_kind(1), TokenKind::RParen | TokenKind::Period)
        {
            let name = self.ident()?;
            (vec![name], self.parse_type()?)
        } else {
            (Vec::new(), self.parse_type()?)
        };
        let r = self.expect(TokenKind::RParen)?;
        Ok(Field {
            names,
            ty,
            tag: None,
            span: Span::new(l.span.start, r.span.end),
        })
    }

    fn type_param_list(&mut self) -> PResult<Vec<Field>> {
        self.expect(TokenKind::LBracket)?;
        let mut fields = Vec::new();
        while !self.at(TokenKind::RBracket) && !self.at(TokenKind::Eof) {
            let names = self.ident_list()?;
            let constraint = self.parse_type()?;
            let span = Span::new(names[0].span.start, constraint.span().end);
            fields.push(Field {
                names,
                ty: constraint,
                tag: None,
                span,
            });
            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        self.expect(TokenKind::RBracket)?;
        Ok(fields)
    }

    // ------------------------------------------------------------------
    // Signatures
    // ------------------------------------------------------------------

    fn signature(&mut self, start: u32, type_params: Vec<Field>) -> PResult<FuncType> {
        self.expect(TokenKind::LParen)?;
        let (params, params_end) = self.param_list()?;
        let results = self.result_list()?;
        let end = results.last().map(|f| f.span.end).unwrap_or(params_end);
        Ok(FuncType {
            type_params,
            params,
            results,
            span: Span::new(start, end),
        })
    }

    /// Parse a parenthesized parameter list (opening paren already consumed),
    /// normalizing `a, b int` name groups per the Go grammar.
    fn param_list(&mut self) -> PResult<(Vec<Field>, u32)> {
        // (maybe-name, maybe-type); (name, None) is a bare identifier whose
        // role is decided once the whole list is seen.
        let mut items: Vec<(Option<Ident>, Option<Expr>)> = Vec::new();

        while !self.at(TokenKind::RParen) && !self.at(TokenKind::Eof) {
            if self.at(TokenKind::Ident)
                && matches!(self.peek_kind(1), TokenKind::Comma | TokenKind::RParen)
            {
                items.push((Some(self.ident()?), None));
            } else if self.at(TokenKind::Ident) && self.peek_kind(1) == TokenKind::Period {
                items.push((None, Some(self.parse_type()?)));
            } else if self.at(TokenKind::Ident) {
                let name = self.ident()?;
                items.push((Some(name), Some(self.parse_type()?)));
            } else {
                items.push((None, Some(self.parse_type()?)));
            }
            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        let end = self.expect(TokenKind::RParen)?.span.end;

        let named = items.iter().any(|(n, t)| n.is_some() && t.is_some());
        let mut fields = Vec::new();
        if named {
            let mut pending: Vec<Ident> = Vec::new();
            for (name, ty) in items {
                match (name, ty) {
                    (Some(id), None) => pending.push(id),
                    (Some(id), Some(ty)) => {
                        pending.push(id);
                        let span =
                            Span::new(pending[0].span.start, ty.span().end);
                        fields.push(Field {
                            names: std::mem::take(&mut pending),
                            ty,
                            tag: None,
                            span,
                        });
                    }
                    (None, Some(ty)) => {
                        let span = ty.span();
                        fields.push(Field {
                            names: Vec::new(),
                            ty,
                            tag: None,
                            span,
                        });
                    }
                    (None, None) => unreachable!("parameter item with neither name nor type"),
                }
            }
            if !pending.is_empty() {
                return Err(self.error_here("parameter names missing a type"));
            }
        } else {
            for (name, ty) in items {
                let ty = match (name, ty) {
                    (Some(id), None) => Expr::Ident(id),
                    (None, Some(ty)) => ty,
                    _ => unreachable!(),
                };
                let span = ty.span();
                fields.push(Field {
                    names: Vec::new(),
                    ty,
                    tag: None,
                    span,
                });
            }
        }
        Ok((fields, end))
    }

    fn result_list(&mut self) -> PResult<Vec<Field>> {
        if self.eat(TokenKind::LParen).is_some() {
            let (fields, _) = self.param_list()?;
            Ok(fields)
        } else if self.starts_type() {
            let ty = self.parse_type()?;
            let span = ty.span();
            Ok(vec![Field {
                names: Vec::new(),
                ty,
                tag: None,
                span,
            }])
        } else {
            Ok(Vec::new())
        }
    }

    // ------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------

    fn parse_type(&mut self) -> PResult<Expr> {
        match self.kind() {
            TokenKind::Ident => {
                let id = self.ident()?;
                self.qualified_from(id)
            }
            TokenKind::Mul => {
                let tok = self.advance();
                let x = self.parse_type()?;
                let span = Span::new(tok.span.start, x.span().end);
                Ok(Expr::Star {
                    x: Box::new(x),
                    span,
                })
            }
            TokenKind::LBracket => self.array_type(),
            TokenKind::Map => self.map_type(),
            TokenKind::Chan => self.chan_type(),
            TokenKind::Arrow => {
                let tok = self.advance();
                self.expect(TokenKind::Chan)?;
                let elem = self.parse_type()?;
                let span = Span::new(tok.span.start, elem.span().end);
                Ok(Expr::ChanType {
                    dir: ChanDir::Recv,
                    elem: Box::new(elem),
                    span,
                })
            }
            TokenKind::Func => {
                let tok = self.advance();
                let sig = self.signature(tok.span.start, Vec::new())?;
                Ok(Expr::FuncTypeExpr(sig))
            }
            TokenKind::Struct => self.struct_type().map(Expr::Struct),
            TokenKind::Interface => self.interface_type().map(Expr::Interface),
            TokenKind::LParen => {
                let l = self.advance();
                let x = self.parse_type()?;
                let r = self.expect(TokenKind::RParen)?;
                Ok(Expr::Paren {
                    x: Box::new(x),
                    span: Span::new(l.span.start, r.span.end),
                })
            }
            TokenKind::Ellipsis => {
                let tok = self.advance();
                let ty = self.parse_type()?;
                let span = Span::new(tok.span.start, ty.span().end);
                Ok(Expr::Ellipsis {
                    ty: Some(Box::new(ty)),
                    span,
                })
            }
            other => Err(self.error_here(format!("expected type, found '{}'", other))),
        }
    }

    /// Complete a type that started with an identifier: optional `.Sel`
    /// qualification and optional `[T, ...]` instantiation.
    fn qualified_from(&mut self, id: Ident) -> PResult<Expr> {
        let mut ty = Expr::Ident(id);
        if self.at(TokenKind::Period) && self.peek_kind(1) == TokenKind::Ident {
            self.advance();
            let sel = self.ident()?;
            let span = Span::new(ty.span().start, sel.span.end);
            ty = Expr::Selector {
                x: Box::new(ty),
                sel,
                span,
            };
        }
        if self.at(TokenKind::LBracket) {
            self.advance();
            let mut indices = Vec::new();
            while !self.at(TokenKind::RBracket) && !self.at(TokenKind::Eof) {
                indices.push(self.parse_type()?);
                if self.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
            let r = self.expect(TokenKind::RBracket)?;
            let span = Span::new(ty.span().start, r.span.end);
            ty = Expr::Index {
                x: Box::new(ty),
                indices,
                span,
            };
        }
        Ok(ty)
    }

    fn array_type(&mut self) -> PResult<Expr> {
        let l = self.expect(TokenKind::LBracket)?;
        let len = if self.at(TokenKind::RBracket) {
            None
        } else if self.eat(TokenKind::Ellipsis).is_some() {
            None
        } else {
            Some(Box::new(self.parse_expr()?))
        };
        self.expect(TokenKind::RBracket)?;
        let elem = self.parse_type()?;
        let span = Span::new(l.span.start, elem.span().end);
        Ok(Expr::ArrayType {
            len,
            elem: Box::new(elem),
            span,
        })
    }

    fn map_type(&mut self) -> PResult<Expr> {
        let m = self.expect(TokenKind::Map)?;
        self.expect(TokenKind::LBracket)?;
        let key = self.parse_type()?;
        self.expect(TokenKind::RBracket)?;
        let value = self.parse_type()?;
        let span = Span::new(m.span.start, value.span().end);
        Ok(Expr::MapType {
            key: Box::new(key),
            value: Box::new(value),
            span,
        })
    }

    fn chan_type(&mut self) -> PResult<Expr> {
        let c = self.expect(TokenKind::Chan)?;
        let dir = if self.eat(TokenKind::Arrow).is_some() {
            ChanDir::Send
        } else {
            ChanDir::Both
        };
        let elem = self.parse_type()?;
        let span = Span::new(c.span.start, elem.span().end);
        Ok(Expr::ChanType {
            dir,
            elem: Box::new(elem),
            span,
        })
    }

    fn struct_type(&mut self) -> PResult<StructType> {
        let st = self.expect(TokenKind::Struct)?;
        self.expect(TokenKind::LBrace)?;
        let mut fields = Vec::new();
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            if self.eat(TokenKind::Semicolon).is_some() {
                continue;
            }
            fields.push(self.struct_field()?);
            self.expect_semi()?;
        }
        let r = self.expect(TokenKind::RBrace)?;
        Ok(StructType {
            fields,
            span: Span::new(st.span.start, r.span.end),
        })
    }

    fn struct_field(&mut self) -> PResult<Field> {
        let start = self.cur().span.start;
        let (names, ty) = if self.at(TokenKind::Mul) {
            // Embedded pointer field.
            (Vec::new(), self.parse_type()?)
        } else {
            let first = self.ident()?;
            if self.at(TokenKind::Comma) {
                let mut names = vec![first];
                while self.eat(TokenKind::Comma).is_some() {
                    names.push(self.ident()?);
                }
                (names, self.parse_type()?)
            } else if self.at(TokenKind::Period) {
                (Vec::new(), self.qualified_from(first)?)
            } else if self.starts_type() {
                (vec![first], self.parse_type()?)
            } else {
                // Embedded field.
                (Vec::new(), Expr::Ident(first))
            }
        };
        let tag = self
            .eat(TokenKind::Str)
            .map(|tok| self.text(tok).to_string());
        let end = ty.span().end;
        Ok(Field {
            names,
            ty,
            tag,
            span: Span::new(start, end),
        })
    }

    fn interface_type(&mut self) -> PResult<InterfaceType> {
        let kw = self.expect(TokenKind::Interface)?;
        self.expect(TokenKind::LBrace)?;
        let mut elems = Vec::new();
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            if self.eat(TokenKind::Semicolon).is_some() {
                continue;
            }
            if self.at(TokenKind::Ident) && self.peek_kind(1) == TokenKind::LParen {
                let name = self.ident()?;
                let sig = self.signature(name.span.start, Vec::new())?;
                elems.push(InterfaceElem::Method { name, sig });
            } else {
                elems.push(InterfaceElem::Embedded(self.parse_type()?));
            }
            self.expect_semi()?;
        }
        let r = self.expect(TokenKind::RBrace)?;
        Ok(InterfaceType {
            elems,
            span: Span::new(kw.span.start, r.span.end),
        })
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn block(&mut self) -> PResult<Block> {
        let l = self.expect(TokenKind::LBrace)?;
        let saved = std::mem::replace(&mut self.no_lit, 0);
        let mut stmts = Vec::new();
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            if self.eat(TokenKind::Semicolon).is_some() {
                continue;
            }
            let stmt = self.stmt()?;
            self.expect_semi()?;
            stmts.push(stmt);
        }
        self.no_lit = saved;
        let r = self.expect(TokenKind::RBrace)?;
        Ok(Block {
            stmts,
            span: Span::new(l.span.start, r.span.end),
        })
    }

    fn stmt(&mut self) -> PResult<Stmt> {
        match self.kind() {
            TokenKind::Var | TokenKind::Const | TokenKind::Type => {
                Ok(Stmt::Decl(self.gen_decl()?))
            }
            TokenKind::If => self.if_stmt(),
            TokenKind::For => self.for_stmt(),
            TokenKind::Switch => self.switch_stmt(),
            TokenKind::Return => self.return_stmt(),
            TokenKind::LBrace => Ok(Stmt::Block(self.block()?)),
            TokenKind::Defer | TokenKind::Go => {
                let tok = self.advance();
                let call = self.parse_expr()?;
                let span = Span::new(tok.span.start, call.span().end);
                Ok(if tok.kind == TokenKind::Defer {
                    Stmt::Defer { call, span }
                } else {
                    Stmt::Go { call, span }
                })
            }
            TokenKind::Break | TokenKind::Continue | TokenKind::Goto | TokenKind::Fallthrough => {
                let tok = self.advance();
                let kind = match tok.kind {
                    TokenKind::Break => BranchKind::Break,
                    TokenKind::Continue => BranchKind::Continue,
                    TokenKind::Goto => BranchKind::Goto,
                    _ => BranchKind::Fallthrough,
                };
                let label = if self.at(TokenKind::Ident) && kind != BranchKind::Fallthrough {
                    Some(self.ident()?)
                } else {
                    None
                };
                let end = label.as_ref().map(|l| l.span.end).unwrap_or(tok.span.end);
                Ok(Stmt::Branch {
                    kind,
                    label,
                    span: Span::new(tok.span.start, end),
                })
            }
            TokenKind::Select => Err(self.error_here("select statements are not supported")),
            _ => match self.simple_stmt(false)? {
                SimpleOut::Stmt(stmt) => Ok(stmt),
                SimpleOut::Range { .. } => Err(self.error_here("range outside for statement")),
            },
        }
    }

    fn return_stmt(&mut self) -> PResult<Stmt> {
        let tok = self.expect(TokenKind::Return)?;
        let results = if matches!(
            self.kind(),
            TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Case | TokenKind::Default
        ) {
            Vec::new()
        } else {
            self.expr_list()?
        };
        let end = results.last().map(|e| e.span().end).unwrap_or(tok.span.end);
        Ok(Stmt::Return {
            results,
            span: Span::new(tok.span.start, end),
        })
    }

    fn simple_stmt(&mut self, allow_range: bool) -> PResult<SimpleOut> {
        let lhs = self.expr_list()?;
        let start = lhs[0].span().start;

        let assign_op = match self.kind() {
            TokenKind::Define => Some(AssignOp::Define),
            TokenKind::Assign => Some(AssignOp::Assign),
            TokenKind::AddAssign => Some(AssignOp::Op(BinaryOp::Add)),
            TokenKind::SubAssign => Some(AssignOp::Op(BinaryOp::Sub)),
            TokenKind::MulAssign => Some(AssignOp::Op(BinaryOp::Mul)),
            TokenKind::QuoAssign => Some(AssignOp::Op(BinaryOp::Quo)),
            TokenKind::RemAssign => Some(AssignOp::Op(BinaryOp::Rem)),
            TokenKind::AndAssign => Some(AssignOp::Op(BinaryOp::And)),
            TokenKind::OrAssign => Some(AssignOp::Op(BinaryOp::Or)),
            TokenKind::XorAssign => Some(AssignOp::Op(BinaryOp::Xor)),
            TokenKind::ShlAssign => Some(AssignOp::Op(BinaryOp::Shl)),
            TokenKind::ShrAssign => Some(AssignOp::Op(BinaryOp::Shr)),
            TokenKind::AndNotAssign => Some(AssignOp::Op(BinaryOp::AndNot)),
            _ => None,
        };

        if let Some(op) = assign_op {
            self.advance();
            if allow_range && self.at(TokenKind::Range) {
                self.advance();
                let x = self.parse_expr()?;
                let mut iter = lhs.into_iter();
                return Ok(SimpleOut::Range {
                    key: iter.next(),
                    value: iter.next(),
                    define: op == AssignOp::Define,
                    x,
                });
            }
            let rhs = self.expr_list()?;
            let end = rhs.last().map(|e| e.span().end).unwrap_or(start);
            return Ok(SimpleOut::Stmt(Stmt::Assign(AssignStmt {
                lhs,
                op,
                rhs,
                span: Span::new(start, end),
            })));
        }

        match self.kind() {
            TokenKind::Inc | TokenKind::Dec => {
                let tok = self.advance();
                let x = single(self, lhs)?;
                let span = Span::new(start, tok.span.end);
                Ok(SimpleOut::Stmt(Stmt::IncDec {
                    x,
                    inc: tok.kind == TokenKind::Inc,
                    span,
                }))
            }
            TokenKind::Arrow => {
                self.advance();
                let chan = single(self, lhs)?;
                let value = self.parse_expr()?;
                let span = Span::new(start, value.span().end);
                Ok(SimpleOut::Stmt(Stmt::Send { chan, value, span }))
            }
            _ => {
                let expr = single(self, lhs)?;
                let span = expr.span();
                Ok(SimpleOut::Stmt(Stmt::Expr { expr, span }))
            }
        }
    }

    fn if_stmt(&mut self) -> PResult<Stmt> {
        let if_tok = self.expect(TokenKind::If)?;
        let (init, cond) = self.control_clause()?;
        let then = self.block()?;
        let els = if self.eat(TokenKind::Else).is_some() {
            if self.at(TokenKind::If) {
                Some(Box::new(self.if_stmt()?))
            } else {
                Some(Box::new(Stmt::Block(self.block()?)))
            }
        } else {
            None
        };
        let end = els
            .as_ref()
            .map(|e| e.span().end)
            .unwrap_or(then.span.end);
        Ok(Stmt::If(IfStmt {
            init,
            cond,
            then,
            els,
            span: Span::new(if_tok.span.start, end),
        }))
    }

    /// Parse `[init ;] cond` for if statements, with composite literals
    /// suppressed.
    fn control_clause(&mut self) -> PResult<(Option<Box<Stmt>>, Expr)> {
        self.no_lit += 1;
        let result = (|| {
            let first = match self.simple_stmt(false)? {
                SimpleOut::Stmt(s) => s,
                SimpleOut::Range { .. } => {
                    return Err(self.error_here("range clause not allowed here"))
                }
            };
            if self.eat(TokenKind::Semicolon).is_some() {
                let cond = self.parse_expr()?;
                Ok((Some(Box::new(first)), cond))
            } else {
                match first {
                    Stmt::Expr { expr, .. } => Ok((None, expr)),
                    _ => Err(self.error_here("expected condition expression")),
                }
            }
        })();
        self.no_lit -= 1;
        result
    }

    fn for_stmt(&mut self) -> PResult<Stmt> {
        let for_tok = self.expect(TokenKind::For)?;
        let start = for_tok.span.start;

        if self.at(TokenKind::LBrace) {
            let body = self.block()?;
            let span = Span::new(start, body.span.end);
            return Ok(Stmt::For(ForStmt {
                init: None,
                cond: None,
                post: None,
                body,
                span,
            }));
        }

        self.no_lit += 1;
        let header = (|| {
            if self.eat(TokenKind::Range).is_some() {
                // `for range x`
                let x = self.parse_expr()?;
                return Ok(ForHeader::Range {
                    key: None,
                    value: None,
                    define: false,
                    x,
                });
            }
            if self.at(TokenKind::Semicolon) {
                self.advance();
                return self.for_clauses(None);
            }
            match self.simple_stmt(true)? {
                SimpleOut::Range {
                    key,
                    value,
                    define,
                    x,
                    ..
                } => Ok(ForHeader::Range {
                    key,
                    value,
                    define,
                    x,
                }),
                SimpleOut::Stmt(stmt) => {
                    if self.at(TokenKind::Semicolon) {
                        self.advance();
                        self.for_clauses(Some(stmt))
                    } else {
                        match stmt {
                            Stmt::Expr { expr, .. } => Ok(ForHeader::Cond(expr)),
                            _ => Err(self.error_here("expected for-loop condition")),
                        }
                    }
                }
            }
        })();
        self.no_lit -= 1;
        let header = header?;

        let body = self.block()?;
        let span = Span::new(start, body.span.end);
        Ok(match header {
            ForHeader::Cond(cond) => Stmt::For(ForStmt {
                init: None,
                cond: Some(cond),
                post: None,
                body,
                span,
            }),
            ForHeader::Clauses { init, cond, post } => Stmt::For(ForStmt {
                init,
                cond,
                post,
                body,
                span,
            }),
            ForHeader::Range {
                key,
                value,
                define,
                x,
            } => Stmt::Range(RangeStmt {
                key,
                value,
                define,
                x,
                body,
                span,
            }),
        })
    }

    /// Parse `cond ; post` after the first semicolon of a three-clause for.
    fn for_clauses(&mut self, init: Option<Stmt>) -> PResult<ForHeader> {
        let cond = if self.at(TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(TokenKind::Semicolon)?;
        let post = if self.at(TokenKind::LBrace) {
            None
        } else {
            match self.simple_stmt(false)? {
                SimpleOut::Stmt(s) => Some(Box::new(s)),
                SimpleOut::Range { .. } => {
                    return Err(self.error_here("range clause not allowed here"))
                }
            }
        };
        Ok(ForHeader::Clauses {
            init: init.map(Box::new),
            cond,
            post,
        })
    }

    fn switch_stmt(&mut self) -> PResult<Stmt> {
        let sw_tok = self.expect(TokenKind::Switch)?;
        let start = sw_tok.span.start;

        self.no_lit += 1;
        let header = (|| {
            let mut init: Option<Box<Stmt>> = None;
            let mut guard: Option<Stmt> = None;
            if !self.at(TokenKind::LBrace) {
                let first = match self.simple_stmt(false)? {
                    SimpleOut::Stmt(s) => s,
                    SimpleOut::Range { .. } => {
                        return Err(self.error_here("range clause not allowed here"))
                    }
                };
                if self.eat(TokenKind::Semicolon).is_some() {
                    init = Some(Box::new(first));
                    if !self.at(TokenKind::LBrace) {
                        guard = Some(match self.simple_stmt(false)? {
                            SimpleOut::Stmt(s) => s,
                            SimpleOut::Range { .. } => {
                                return Err(self.error_here("range clause not allowed here"))
                            }
                        });
                    }
                } else {
                    guard = Some(first);
                }
            }
            Ok((init, guard))
        })();
        self.no_lit -= 1;
        let (init, guard) = header?;

        // Classify: type switch guard or expression tag.
        enum Guard {
            Tag(Option<Expr>),
            TypeSwitch { binding: Option<Ident>, x: Expr },
        }
        let guard = match guard {
            None => Guard::Tag(None),
            Some(Stmt::Expr { expr, .. }) => match expr {
                Expr::TypeAssert { x, ty: None, .. } => Guard::TypeSwitch {
                    binding: None,
                    x: *x,
                },
                other => Guard::Tag(Some(other)),
            },
            Some(Stmt::Assign(assign))
                if assign.is_define() && assign.lhs.len() == 1 && assign.rhs.len() == 1 =>
            {
                let mut assign = assign;
                match (assign.lhs.pop(), assign.rhs.pop()) {
                    (
                        Some(Expr::Ident(binding)),
                        Some(Expr::TypeAssert { x, ty: None, .. }),
                    ) => Guard::TypeSwitch {
                        binding: Some(binding),
                        x: *x,
                    },
                    _ => return Err(self.error_here("invalid type switch guard")),
                }
            }
            Some(_) => return Err(self.error_here("invalid switch header")),
        };

        self.expect(TokenKind::LBrace)?;
        let mut cases = Vec::new();
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            if self.eat(TokenKind::Semicolon).is_some() {
                continue;
            }
            cases.push(self.case_clause()?);
        }
        let r = self.expect(TokenKind::RBrace)?;
        let span = Span::new(start, r.span.end);

        Ok(match guard {
            Guard::Tag(tag) => Stmt::Switch(SwitchStmt {
                init,
                tag,
                cases,
                span,
            }),
            Guard::TypeSwitch { binding, x } => Stmt::TypeSwitch(TypeSwitchStmt {
                init,
                binding,
                x,
                cases,
                span,
            }),
        })
    }

    fn case_clause(&mut self) -> PResult<CaseClause> {
        let start = self.cur().span.start;
        let exprs = if self.eat(TokenKind::Case).is_some() {
            self.expr_list()?
        } else {
            self.expect(TokenKind::Default)?;
            Vec::new()
        };
        let colon = self.expect(TokenKind::Colon)?;
        let mut body = Vec::new();
        while !matches!(
            self.kind(),
            TokenKind::Case | TokenKind::Default | TokenKind::RBrace | TokenKind::Eof
        ) {
            if self.eat(TokenKind::Semicolon).is_some() {
                continue;
            }
            let stmt = self.stmt()?;
            self.expect_semi()?;
            body.push(stmt);
        }
        let end = body.last().map(|s| s.span().end).unwrap_or(colon.span.end);
        Ok(CaseClause {
            exprs,
            body,
            span: Span::new(start, end),
        })
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn expr_list(&mut self) -> PResult<Vec<Expr>> {
        let mut exprs = vec![self.parse_expr()?];
        while self.eat(TokenKind::Comma).is_some() {
            exprs.push(self.parse_expr()?);
        }
        Ok(exprs)
    }

    fn parse_expr(&mut self) -> PResult<Expr> {
        self.binary_expr(1)
    }

    fn binary_expr(&mut self, min_prec: u8) -> PResult<Expr> {
        let mut x = self.unary_expr()?;
        while let Some(op) = binary_op_of(self.kind()) {
            if op.precedence() < min_prec {
                break;
            }
            self.advance();
            let y = self.binary_expr(op.precedence() + 1)?;
            let span = Span::new(x.span().start, y.span().end);
            x = Expr::Binary {
                op,
                x: Box::new(x),
                y: Box::new(y),
                span,
            };
        }
        Ok(x)
    }

    fn unary_expr(&mut self) -> PResult<Expr> {
        let op = match self.kind() {
            TokenKind::Not => Some(UnaryOp::Not),
            TokenKind::Sub => Some(UnaryOp::Neg),
            TokenKind::Add => Some(UnaryOp::Pos),
            TokenKind::And => Some(UnaryOp::Addr),
            TokenKind::Arrow if self.peek_kind(1) != TokenKind::Chan => Some(UnaryOp::Recv),
            _ => None,
        };
        match op {
            Some(op) => {
                let tok = self.advance();
                let x = self.unary_expr()?;
                let span = Span::new(tok.span.start, x.span().end);
                Ok(Expr::Unary {
                    op,
                    x: Box::new(x),
                    span,
                })
            }
            None if self.at(TokenKind::Mul) => {
                let tok = self.advance();
                let x = self.unary_expr()?;
                let span = Span::new(tok.span.start, x.span().end);
                Ok(Expr::Star {
                    x: Box::new(x),
                    span,
                })
            }
            None if self.at(TokenKind::Arrow) => {
                // `<-chan T` in expression position.
                let tok = self.advance();
                self.expect(TokenKind::Chan)?;
                let elem = self.parse_type()?;
                let span = Span::new(tok.span.start, elem.span().end);
                Ok(Expr::ChanType {
                    dir: ChanDir::Recv,
                    elem: Box::new(elem),
                    span,
                })
            }
            None => self.primary_expr(),
        }
    }

    fn primary_expr(&mut self) -> PResult<Expr> {
        let mut x = self.operand()?;
        loop {
            match self.kind() {
                TokenKind::Period => {
                    self.advance();
                    if self.eat(TokenKind::LParen).is_some() {
                        let ty = if self.eat(TokenKind::Type).is_some() {
                            None
                        } else {
                            Some(Box::new(self.parse_type()?))
                        };
                        let r = self.expect(TokenKind::RParen)?;
                        let span = Span::new(x.span().start, r.span.end);
                        x = Expr::TypeAssert {
                            x: Box::new(x),
                            ty,
                            span,
                        };
                    } else {
                        let sel = self.ident()?;
                        let span = Span::new(x.span().start, sel.span.end);
                        x = Expr::Selector {
                            x: Box::new(x),
                            sel,
                            span,
                        };
                    }
                }
                TokenKind::LParen => {
                    self.advance();
                    let saved = std::mem::replace(&mut self.no_lit, 0);
                    let mut args = Vec::new();
                    while !self.at(TokenKind::RParen) && !self.at(TokenKind::Eof) {
                        let mut arg = self.parse_expr()?;
                        if self.at(TokenKind::Ellipsis) {
                            let tok = self.advance();
                            let span = Span::new(arg.span().start, tok.span.end);
                            arg = Expr::Ellipsis {
                                ty: Some(Box::new(arg)),
                                span,
                            };
                        }
                        args.push(arg);
                        if self.eat(TokenKind::Comma).is_none() {
                            break;
                        }
                    }
                    self.no_lit = saved;
                    let r = self.expect(TokenKind::RParen)?;
                    let span = Span::new(x.span().start, r.span.end);
                    x = Expr::Call {
                        func: Box::new(x),
                        args,
                        span,
                    };
                }
                TokenKind::LBracket => {
                    self.advance();
                    let saved = std::mem::replace(&mut self.no_lit, 0);
                    let mut indices = Vec::new();
                    while !self.at(TokenKind::RBracket) && !self.at(TokenKind::Eof) {
                        if self.eat(TokenKind::Colon).is_some() {
                            continue;
                        }
                        indices.push(self.parse_expr()?);
                        if self.eat(TokenKind::Comma).is_none() && !self.at(TokenKind::Colon) {
                            break;
                        }
                    }
                    self.no_lit = saved;
                    let r = self.expect(TokenKind::RBracket)?;
                    let span = Span::new(x.span().start, r.span.end);
                    x = Expr::Index {
                        x: Box::new(x),
                        indices,
                        span,
                    };
                }
                TokenKind::LBrace if self.no_lit == 0 && can_start_composite(&x) => {
                    x = self.composite_lit(Some(x))?;
                }
                _ => break,
            }
        }
        Ok(x)
    }

    fn composite_lit(&mut self, ty: Option<Expr>) -> PResult<Expr> {
        let l = self.expect(TokenKind::LBrace)?;
        let start = ty.as_ref().map(|t| t.span().start).unwrap_or(l.span.start);
        let saved = std::mem::replace(&mut self.no_lit, 0);
        let mut elems = Vec::new();
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            let elem = self.composite_elem()?;
            elems.push(elem);
            if self.eat(TokenKind::Comma).is_none() && self.eat(TokenKind::Semicolon).is_none() {
                break;
            }
        }
        self.no_lit = saved;
        let r = self.expect(TokenKind::RBrace)?;
        Ok(Expr::Composite {
            ty: ty.map(Box::new),
            elems,
            span: Span::new(start, r.span.end),
        })
    }

    fn composite_elem(&mut self) -> PResult<Expr> {
        let key = if self.at(TokenKind::LBrace) {
            self.composite_lit(None)?
        } else {
            self.parse_expr()?
        };
        if self.eat(TokenKind::Colon).is_some() {
            let value = if self.at(TokenKind::LBrace) {
                self.composite_lit(None)?
            } else {
                self.parse_expr()?
            };
            let span = Span::new(key.span().start, value.span().end);
            Ok(Expr::KeyValue {
                key: Box::new(key),
                value: Box::new(value),
                span,
            })
        } else {
            Ok(key)
        }
    }

    fn operand(&mut self) -> PResult<Expr> {
        match self.kind() {
            TokenKind::Ident => {
                let id = self.ident()?;
                Ok(Expr::Ident(id))
            }
            TokenKind::Int | TokenKind::Float | TokenKind::Char | TokenKind::Str => {
                let tok = self.advance();
                let kind = match tok.kind {
                    TokenKind::Int => LitKind::Int,
                    TokenKind::Float => LitKind::Float,
                    TokenKind::Char => LitKind::Char,
                    _ => LitKind::Str,
                };
                Ok(Expr::BasicLit {
                    kind,
                    value: self.text(tok).to_string(),
                    span: tok.span,
                })
            }
            TokenKind::LParen => {
                let l = self.advance();
                let saved = std::mem::replace(&mut self.no_lit, 0);
                let x = self.parse_expr()?;
                self.no_lit = saved;
                let r = self.expect(TokenKind::RParen)?;
                Ok(Expr::Paren {
                    x: Box::new(x),
                    span: Span::new(l.span.start, r.span.end),
                })
            }
            TokenKind::Func => {
                let tok = self.advance();
                let sig = self.signature(tok.span.start, Vec::new())?;
                if self.at(TokenKind::LBrace) {
                    let body = self.block()?;
                    let span = Span::new(tok.span.start, body.span.end);
                    Ok(Expr::FuncLit { sig, body, span })
                } else {
                    Ok(Expr::FuncTypeExpr(sig))
                }
            }
            TokenKind::LBracket => self.array_type(),
            TokenKind::Map => self.map_type(),
            TokenKind::Chan => self.chan_type(),
            TokenKind::Struct => self.struct_type().map(Expr::Struct),
            TokenKind::Interface => self.interface_type().map(Expr::Interface),
            other => Err(self.error_here(format!("unexpected token '{}'", other))),
        }
    }
}

enum SimpleOut {
    Stmt(Stmt),
    Range {
        key: Option<Expr>,
        value: Option<Expr>,
        define: bool,
        x: Expr,
    },
}

enum ForHeader {
    Cond(Expr),
    Clauses {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        post: Option<Box<Stmt>>,
    },
    Range {
        key: Option<Expr>,
        value: Option<Expr>,
        define: bool,
        x: Expr,
    },
}

fn single(parser: &Parser<'_>, mut exprs: Vec<Expr>) -> PResult<Expr> {
    match (exprs.pop(), exprs.is_empty()) {
        (Some(expr), true) => Ok(expr),
        _ => Err(parser.error_here("expected single expression")),
    }
}

fn binary_op_of(kind: TokenKind) -> Option<BinaryOp> {
    Some(match kind {
        TokenKind::LOr => BinaryOp::LOr,
        TokenKind::LAnd => BinaryOp::LAnd,
        TokenKind::Eql => BinaryOp::Eql,
        TokenKind::Neq => BinaryOp::Neq,
        TokenKind::Lss => BinaryOp::Lss,
        TokenKind::Leq => BinaryOp::Leq,
        TokenKind::Gtr => BinaryOp::Gtr,
        TokenKind::Geq => BinaryOp::Geq,
        TokenKind::Add => BinaryOp::Add,
        TokenKind::Sub => BinaryOp::Sub,
        TokenKind::Or => BinaryOp::Or,
        TokenKind::Xor => BinaryOp::Xor,
        TokenKind::Mul => BinaryOp::Mul,
        TokenKind::Quo => BinaryOp::Quo,
        TokenKind::Rem => BinaryOp::Rem,
        TokenKind::Shl => BinaryOp::Shl,
        TokenKind::Shr => BinaryOp::Shr,
        TokenKind::And => BinaryOp::And,
        TokenKind::AndNot => BinaryOp::AndNot,
        _ => return None,
    })
}

fn can_start_composite(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::Ident(_)
            | Expr::Selector { .. }
            | Expr::Index { .. }
            | Expr::ArrayType { .. }
            | Expr::MapType { .. }
    )
}

fn spec_span(spec: &Spec) -> Span {
    match spec {
        Spec::Import(s) => s.span,
        Spec::Value(s) => s.span,
        Spec::Type(s) => s.span,
    }
}

// ============================================================================
// Doc comment attachment
// ============================================================================

/// Attach the comment group ending on the line directly above each
/// declaration (and each spec inside grouped declarations) as its doc.
fn attach_docs(file: &mut SourceFile, comments: &[Comment], src: &str) {
    if comments.is_empty() {
        return;
    }

    let line_of = |offset: u32| -> u32 {
        src.as_bytes()[..offset as usize]
            .iter()
            .filter(|&&b| b == b'\n')
            .count() as u32
            + 1
    };

    // (start_line, end_line, cleaned text), in file order.
    let groups: Vec<(u32, u32, String)> = comments
        .iter()
        .map(|c| {
            let cleaned = clean_comment(&c.text);
            (line_of(c.span.start), line_of(c.span.end), cleaned)
        })
        .collect();

    let doc_above = |decl_line: u32| -> Option<String> {
        if decl_line < 2 {
            return None;
        }
        // Walk upward collecting a contiguous run of comment lines.
        let mut parts: Vec<&str> = Vec::new();
        let mut want = decl_line - 1;
        for (start, end, text) in groups.iter().rev() {
            if *end == want {
                parts.push(text);
                want = start.saturating_sub(1);
            } else if *end < want {
                break;
            }
        }
        if parts.is_empty() {
            None
        } else {
            parts.reverse();
            Some(parts.join("\n"))
        }
    };

    for decl in &mut file.decls {
        match decl {
            Decl::Func(f) => f.doc = doc_above(line_of(f.span.start)),
            Decl::Gen(g) => {
                g.doc = doc_above(line_of(g.span.start));
                for spec in &mut g.specs {
                    match spec {
                        Spec::Value(v) => {
                            let doc = doc_above(line_of(v.span.start));
                            if doc != g.doc {
                                v.doc = doc;
                            }
                        }
                        Spec::Type(t) => {
                            let doc = doc_above(line_of(t.span.start));
                            if doc != g.doc {
                                t.doc = doc;
                            }
                        }
                        Spec::Import(_) => {}
                    }
                }
            }
        }
    }
}

fn clean_comment(text: &str) -> String {
    let body = if let Some(stripped) = text.strip_prefix("//") {
        stripped
    } else {
        text.trim_start_matches("/*").trim_end_matches("*/")
    };
    body.trim().to_string()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> SourceFile {
        parse_file(src).unwrap_or_else(|e| panic!("parse failed: {}\nsource:\n{}", e, src))
    }

    #[test]
    fn package_and_imports() {
        let file = parse("package main\n\nimport (\n\t\"fmt\"\n\tctx \"context\"\n)\n");
        assert_eq!(file.package.name, "main");
        assert_eq!(file.imports.len(), 2);
        assert_eq!(file.imports[0].path, "fmt");
        assert_eq!(file.imports[0].local_name(), "fmt");
        assert_eq!(file.imports[1].local_name(), "ctx");
    }

    #[test]
    fn func_with_receiver_and_results() {
        let file = parse("package p\n\nfunc (s *Server) Handle(req string) (int, error) {\n\treturn 0, nil\n}\n");
        let f = file.funcs().next().unwrap();
        assert_eq!(f.name.name, "Handle");
        assert_eq!(f.receiver_type_name(), Some("Server"));
        assert_eq!(f.sig.params.len(), 1);
        assert_eq!(f.sig.results.len(), 2);
    }

    #[test]
    fn grouped_params_share_type() {
        let file = parse("package p\n\nfunc add(a, b int, name string) int { return a }\n");
        let f = file.funcs().next().unwrap();
        assert_eq!(f.sig.params.len(), 2);
        assert_eq!(f.sig.params[0].names.len(), 2);
        assert_eq!(f.sig.params[1].names[0].name, "name");
    }

    #[test]
    fn if_with_init_and_else_chain() {
        let file = parse(
            "package p\n\nfunc f(m map[string]int) {\n\tif v, ok := m[\"k\"]; ok {\n\t\tuse(v)\n\t} else if v == 2 {\n\t\tother()\n\t} else {\n\t\tlast()\n\t}\n}\n",
        );
        let f = file.funcs().next().unwrap();
        let body = f.body.as_ref().unwrap();
        match &body.stmts[0] {
            Stmt::If(ifs) => {
                assert!(ifs.init.is_some());
                match ifs.els.as_deref() {
                    Some(Stmt::If(inner)) => {
                        assert!(inner.init.is_none());
                        assert!(matches!(inner.els.as_deref(), Some(Stmt::Block(_))));
                    }
                    other => panic!("expected else-if, got {:?}", other),
                }
            }
            other => panic!("expected if, got {:?}", other),
        }
    }

    #[test]
    fn composite_literal_suppressed_in_if_header() {
        // `p == (Point{})` needs parens; bare `Point{` would open the body.
        let file = parse("package p\n\nfunc f(x int) {\n\tif x == limit {\n\t\tdone()\n\t}\n}\n");
        let f = file.funcs().next().unwrap();
        assert!(matches!(f.body.as_ref().unwrap().stmts[0], Stmt::If(_)));
    }

    #[test]
    fn composite_literal_in_assignment() {
        let file = parse("package p\n\nfunc f() {\n\tu := User{Name: \"x\", Age: 3}\n\t_ = u\n}\n");
        let f = file.funcs().next().unwrap();
        match &f.body.as_ref().unwrap().stmts[0] {
            Stmt::Assign(a) => match &a.rhs[0] {
                Expr::Composite { ty: Some(ty), elems, .. } => {
                    assert_eq!(ty.as_ident().unwrap().name, "User");
                    assert_eq!(elems.len(), 2);
                }
                other => panic!("expected composite literal, got {:?}", other),
            },
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn range_statement_forms() {
        let file = parse(
            "package p\n\nfunc f(xs []int) {\n\tfor i, x := range xs {\n\t\tuse(i, x)\n\t}\n\tfor range xs {\n\t\ttick()\n\t}\n}\n",
        );
        let f = file.funcs().next().unwrap();
        let body = f.body.as_ref().unwrap();
        match &body.stmts[0] {
            Stmt::Range(r) => {
                assert!(r.define);
                assert_eq!(r.key.as_ref().unwrap().as_ident().unwrap().name, "i");
                assert_eq!(r.value.as_ref().unwrap().as_ident().unwrap().name, "x");
            }
            other => panic!("expected range, got {:?}", other),
        }
        assert!(matches!(&body.stmts[1], Stmt::Range(r) if r.key.is_none()));
    }

    #[test]
    fn three_clause_for() {
        let file = parse("package p\n\nfunc f() {\n\tfor i := 0; i < 10; i++ {\n\t\tuse(i)\n\t}\n}\n");
        let f = file.funcs().next().unwrap();
        match &f.body.as_ref().unwrap().stmts[0] {
            Stmt::For(fs) => {
                assert!(fs.init.is_some());
                assert!(fs.cond.is_some());
                assert!(fs.post.is_some());
            }
            other => panic!("expected for, got {:?}", other),
        }
    }

    #[test]
    fn switch_with_tag_and_default() {
        let file = parse(
            "package p\n\nfunc f(s string) {\n\tswitch s {\n\tcase \"a\":\n\t\tdoA()\n\tcase \"b\", \"c\":\n\t\tdoBC()\n\tdefault:\n\t\tother()\n\t}\n}\n",
        );
        let f = file.funcs().next().unwrap();
        match &f.body.as_ref().unwrap().stmts[0] {
            Stmt::Switch(sw) => {
                assert!(sw.tag.is_some());
                assert_eq!(sw.cases.len(), 3);
                assert_eq!(sw.cases[1].exprs.len(), 2);
                assert!(sw.cases[2].exprs.is_empty());
            }
            other => panic!("expected switch, got {:?}", other),
        }
    }

    #[test]
    fn type_switch_with_binding() {
        let file = parse(
            "package p\n\nfunc f(v interface{}) {\n\tswitch x := v.(type) {\n\tcase string:\n\t\tuseString(x)\n\tcase *Server:\n\t\tuseServer(x)\n\t}\n}\n",
        );
        let f = file.funcs().next().unwrap();
        match &f.body.as_ref().unwrap().stmts[0] {
            Stmt::TypeSwitch(ts) => {
                assert_eq!(ts.binding.as_ref().unwrap().name, "x");
                assert_eq!(ts.cases.len(), 2);
            }
            other => panic!("expected type switch, got {:?}", other),
        }
    }

    #[test]
    fn struct_with_embedded_fields() {
        let file = parse(
            "package p\n\ntype Server struct {\n\tLogger\n\t*Conn\n\tname string\n\taddr, port string\n}\n",
        );
        match &file.decls[0] {
            Decl::Gen(g) => match &g.specs[0] {
                Spec::Type(t) => match &t.ty {
                    Expr::Struct(st) => {
                        assert_eq!(st.fields.len(), 4);
                        assert_eq!(st.embedded_fields().count(), 2);
                        assert_eq!(st.fields[3].names.len(), 2);
                    }
                    other => panic!("expected struct, got {:?}", other),
                },
                other => panic!("expected type spec, got {:?}", other),
            },
            other => panic!("expected gen decl, got {:?}", other),
        }
    }

    #[test]
    fn interface_with_methods_and_embedding() {
        let file = parse(
            "package p\n\ntype ReadWriter interface {\n\tReader\n\tWrite(p []byte) (int, error)\n}\n",
        );
        match &file.decls[0] {
            Decl::Gen(g) => match &g.specs[0] {
                Spec::Type(t) => match &t.ty {
                    Expr::Interface(it) => {
                        assert_eq!(it.elems.len(), 2);
                        assert_eq!(it.methods().count(), 1);
                        let (name, sig) = it.methods().next().unwrap();
                        assert_eq!(name.name, "Write");
                        assert_eq!(sig.results.len(), 2);
                    }
                    other => panic!("expected interface, got {:?}", other),
                },
                other => panic!("expected type spec, got {:?}", other),
            },
            other => panic!("expected gen decl, got {:?}", other),
        }
    }

    #[test]
    fn operator_precedence() {
        let file = parse("package p\n\nvar x = a || b && c == d+e*f\n");
        match &file.decls[0] {
            Decl::Gen(g) => match &g.specs[0] {
                Spec::Value(v) => match &v.values[0] {
                    Expr::Binary { op, .. } => assert_eq!(*op, BinaryOp::LOr),
                    other => panic!("expected binary, got {:?}", other),
                },
                other => panic!("expected value spec, got {:?}", other),
            },
            other => panic!("expected gen decl, got {:?}", other),
        }
    }

    #[test]
    fn selector_call_chain() {
        let file = parse("package p\n\nfunc f() error {\n\treturn fmt.Errorf(\"x: %w\", err)\n}\n");
        let f = file.funcs().next().unwrap();
        match &f.body.as_ref().unwrap().stmts[0] {
            Stmt::Return { results, .. } => match &results[0] {
                Expr::Call { func, args, .. } => {
                    assert!(matches!(func.as_ref(), Expr::Selector { .. }));
                    assert_eq!(args.len(), 2);
                }
                other => panic!("expected call, got {:?}", other),
            },
            other => panic!("expected return, got {:?}", other),
        }
    }

    #[test]
    fn doc_comments_attach_to_decls() {
        let file = parse(
            "package p\n\n// Serve runs the server.\n// It blocks forever.\nfunc Serve() {}\n\ntype T int\n",
        );
        let f = file.funcs().next().unwrap();
        assert_eq!(
            f.doc.as_deref(),
            Some("Serve runs the server.\nIt blocks forever.")
        );
        match &file.decls[1] {
            Decl::Gen(g) => assert!(g.doc.is_none()),
            other => panic!("expected gen decl, got {:?}", other),
        }
    }

    #[test]
    fn generic_func_and_type_params_are_parsed() {
        let file = parse("package p\n\nfunc Map[T any, U any](xs []T, f func(T) U) []U { return nil }\n");
        let f = file.funcs().next().unwrap();
        assert_eq!(f.sig.type_params.len(), 2);
    }

    #[test]
    fn generic_type_vs_array_type() {
        let file = parse("package p\n\ntype List[T any] struct{}\n\ntype Buf [4]byte\n");
        match &file.decls[0] {
            Decl::Gen(g) => match &g.specs[0] {
                Spec::Type(t) => assert_eq!(t.type_params.len(), 1),
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
        match &file.decls[1] {
            Decl::Gen(g) => match &g.specs[0] {
                Spec::Type(t) => {
                    assert!(t.type_params.is_empty());
                    assert!(matches!(t.ty, Expr::ArrayType { .. }));
                }
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn defer_and_go_statements() {
        let file = parse("package p\n\nfunc f() {\n\tdefer cleanup()\n\tgo run()\n}\n");
        let f = file.funcs().next().unwrap();
        let body = f.body.as_ref().unwrap();
        assert!(matches!(body.stmts[0], Stmt::Defer { .. }));
        assert!(matches!(body.stmts[1], Stmt::Go { .. }));
    }

    #[test]
    fn parse_error_carries_position() {
        let err = parse_file("package p\n\nfunc f( {}\n").unwrap_err();
        assert!(err.line >= 3);
        assert!(!err.message.is_empty());
    }

    #[test]
    fn select_is_rejected() {
        let err = parse_file("package p\n\nfunc f() {\n\tselect {}\n}\n").unwrap_err();
        assert!(err.message.contains("select"));
    }

    #[test]
    fn spans_index_original_source() {
        let src = "package p\n\nfunc f() {\n\tx := compute()\n\t_ = x\n}\n";
        let file = parse(src);
        let f = file.funcs().next().unwrap();
        match &f.body.as_ref().unwrap().stmts[0] {
            Stmt::Assign(a) => {
                let span = a.span;
                assert_eq!(&src[span.start as usize..span.end as usize], "x := compute()");
            }
            other => panic!("expected assign, got {:?}", other),
        }
    }

    #[test]
    fn var_group_with_docs_on_specs() {
        let file = parse(
            "package p\n\nvar (\n\t// count of retries\n\tretries = 3\n\tname string\n)\n",
        );
        match &file.decls[0] {
            Decl::Gen(g) => {
                assert_eq!(g.specs.len(), 2);
                match &g.specs[0] {
                    Spec::Value(v) => assert_eq!(v.doc.as_deref(), Some("count of retries")),
                    other => panic!("unexpected {:?}", other),
                }
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn method_value_spec_with_type_only() {
        let file = parse("package p\n\nvar buf []byte\n\nconst limit = 100\n");
        assert_eq!(file.decls.len(), 2);
    }

    #[test]
    fn slice_expressions_parse() {
        let file = parse("package p\n\nfunc f(xs []int) []int {\n\treturn xs[1:3]\n}\n");
        assert!(file.funcs().next().is_some());
    }

    #[test]
    fn func_literal_as_value() {
        let file = parse("package p\n\nvar handler = func(x int) int {\n\treturn x + 1\n}\n");
        match &file.decls[0] {
            Decl::Gen(g) => match &g.specs[0] {
                Spec::Value(v) => assert!(matches!(v.values[0], Expr::FuncLit { .. })),
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
    }
}
