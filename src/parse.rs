//! Análisis sintáctico.
//!
//! El parser recorre la secuencia completa de tokens con un único cursor,
//! con lookahead arbitrario, y construye un [`Ast`] cuyos nodos se alojan
//! en arenas (ver [`crate::arena`]). Las expresiones se analizan por
//! precedence climbing: `*` y `/` enlazan más fuerte que `+` y `-`, y
//! operadores de un mismo nivel asocian a la izquierda.
//!
//! Cualquier error es fatal; no se intenta resincronizar.

use std::{
    fmt::{self, Display},
    ops::Index,
};

use log::debug;
use thiserror::Error;

use crate::{
    arena::{Arena, ArenaError, Id},
    lex::{Identifier, Keyword, Token},
    source::{Located, Location},
};

/// Árbol sintáctico de un programa completo.
///
/// El árbol es dueño de todos sus nodos. Los nodos se acceden
/// indexando el árbol con sus respectivos [`Id`].
#[derive(Debug)]
pub struct Ast {
    exprs: Arena<Expr>,
    stmts: Arena<Stmt>,
    body: Vec<Id<Stmt>>,
}

impl Ast {
    fn with_capacity(capacity: usize) -> Self {
        Ast {
            exprs: Arena::with_capacity(capacity),
            stmts: Arena::with_capacity(capacity),
            body: Vec::new(),
        }
    }

    /// Sentencias de nivel superior, en orden.
    pub fn body(&self) -> &[Id<Stmt>] {
        &self.body
    }

    /// Imprime una expresión en forma prefija.
    pub fn pretty(&self, expr: Id<Expr>) -> Pretty<'_> {
        Pretty { ast: self, expr }
    }
}

impl Index<Id<Expr>> for Ast {
    type Output = Expr;

    fn index(&self, id: Id<Expr>) -> &Expr {
        &self.exprs[id]
    }
}

impl Index<Id<Stmt>> for Ast {
    type Output = Stmt;

    fn index(&self, id: Id<Stmt>) -> &Stmt {
        &self.stmts[id]
    }
}

#[derive(Debug)]
pub enum Stmt {
    Exit(Id<Expr>),

    Let {
        name: Located<Identifier>,
        value: Id<Expr>,
    },

    Block(Vec<Id<Stmt>>),
}

#[derive(Debug)]
pub enum Expr {
    Term(Term),
    Binary(BinOp, Id<Expr>, Id<Expr>),
}

#[derive(Debug)]
pub enum Term {
    Integer(Located<String>),
    Read(Located<Identifier>),
    Paren(Id<Expr>),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinOp {
    /// Nivel de precedencia; un nivel mayor enlaza más fuerte.
    pub fn precedence(self) -> u8 {
        match self {
            BinOp::Add | BinOp::Sub => 0,
            BinOp::Mul | BinOp::Div => 1,
        }
    }

    fn from_token(token: &Token) -> Option<Self> {
        match token {
            Token::Plus => Some(BinOp::Add),
            Token::Minus => Some(BinOp::Sub),
            Token::Times => Some(BinOp::Mul),
            Token::Slash => Some(BinOp::Div),
            _ => None,
        }
    }
}

impl Display for BinOp {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
        };

        fmt.write_str(symbol)
    }
}

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ParserError {
    #[error("Expected token {0}, found {1} instead")]
    UnexpectedToken(Token, Token),

    #[error("Expected token {0}, none was found instead")]
    MissingToken(Token),

    #[error("Expected an expression")]
    ExpectedExpr,

    #[error("Expected an expression on the right-hand side of `{0}`")]
    MissingOperand(BinOp),

    #[error("Expected any of `exit`, `val` or a block")]
    ExpectedStatement,

    #[error("Abrupt end of program")]
    UnexpectedEof,

    #[error(transparent)]
    Exhausted(#[from] ArenaError),
}

/// Construye el árbol sintáctico de un programa.
///
/// `start` es la ubicación del inicio del programa, utilizada para
/// reportar errores antes del primer token. Cada arena del árbol
/// admite a lo sumo `capacity` nodos.
pub fn parse(
    tokens: &[Located<Token>],
    start: Location,
    capacity: usize,
) -> Result<Ast, Located<ParserError>> {
    let parser = Parser {
        tokens,
        cursor: 0,
        last_known: start,
        ast: Ast::with_capacity(capacity),
    };

    parser.program()
}

struct Parser<'a> {
    tokens: &'a [Located<Token>],
    cursor: usize,
    last_known: Location,
    ast: Ast,
}

type Parse<T> = Result<T, Located<ParserError>>;

impl<'a> Parser<'a> {
    fn program(mut self) -> Parse<Ast> {
        while self.peek(0).is_some() {
            let statement = self.statement()?;
            self.ast.body.push(statement);
        }

        debug!(
            "Parsed {} statements and {} expressions",
            self.ast.stmts.len(),
            self.ast.exprs.len()
        );

        Ok(self.ast)
    }

    fn statement(&mut self) -> Parse<Id<Stmt>> {
        let statement = match self.peek(0) {
            Some(Token::Keyword(Keyword::Exit)) => self.exit_statement()?,
            Some(Token::Keyword(Keyword::Val)) if self.is_binding() => self.binding()?,
            Some(Token::OpenCurly) => self.block()?,

            Some(_) => {
                self.next()?;
                return self.fail(ParserError::ExpectedStatement);
            }

            None => return self.fail(ParserError::UnexpectedEof),
        };

        self.alloc_stmt(statement)
    }

    fn exit_statement(&mut self) -> Parse<Stmt> {
        self.keyword(Keyword::Exit)?;

        self.expect(Token::OpenParen)?;
        let expr = self.expr(0)?;
        self.expect(Token::CloseParen)?;
        self.expect(Token::Semicolon)?;

        Ok(Stmt::Exit(expr))
    }

    fn is_binding(&self) -> bool {
        matches!(
            (self.peek(0), self.peek(1), self.peek(2)),
            (
                Some(Token::Keyword(Keyword::Val)),
                Some(Token::Id(_)),
                Some(Token::Assign)
            )
        )
    }

    fn binding(&mut self) -> Parse<Stmt> {
        self.keyword(Keyword::Val)?;

        // `is_binding()` ya confirmó la forma `val IDENT =`
        let token = self.next()?;
        let name = match token.val() {
            Token::Id(id) => Located::at(id.clone(), token.location().clone()),
            _ => return self.fail(ParserError::ExpectedStatement),
        };

        self.expect(Token::Assign)?;
        let value = self.expr(0)?;
        self.expect(Token::Semicolon)?;

        Ok(Stmt::Let { name, value })
    }

    fn block(&mut self) -> Parse<Stmt> {
        self.expect(Token::OpenCurly)?;

        let mut statements = Vec::new();
        loop {
            match self.peek(0) {
                Some(Token::CloseCurly) => {
                    self.next()?;
                    break Ok(Stmt::Block(statements));
                }

                None => break self.fail(ParserError::MissingToken(Token::CloseCurly)),
                Some(_) => statements.push(self.statement()?),
            }
        }
    }

    fn expr(&mut self, min_precedence: u8) -> Parse<Id<Expr>> {
        let mut lhs = self.term()?;

        while let Some(op) = self.peek(0).and_then(BinOp::from_token) {
            if op.precedence() < min_precedence {
                break;
            }

            self.next()?;
            let operand_start = self.cursor;

            let rhs = match self.expr(op.precedence() + 1) {
                Ok(rhs) => rhs,

                // El operador no tiene siquiera un término a su derecha
                Err(error)
                    if self.cursor <= operand_start + 1
                        && matches!(
                            error.val(),
                            ParserError::ExpectedExpr | ParserError::UnexpectedEof
                        ) =>
                {
                    return Err(error.map(|_| ParserError::MissingOperand(op)));
                }

                Err(error) => return Err(error),
            };

            lhs = self.alloc_expr(Expr::Binary(op, lhs, rhs))?;
        }

        Ok(lhs)
    }

    fn term(&mut self) -> Parse<Id<Expr>> {
        let token = self.next()?;
        let term = match token.val() {
            Token::IntLiteral(digits) => {
                Term::Integer(Located::at(digits.clone(), token.location().clone()))
            }

            Token::Id(id) => Term::Read(Located::at(id.clone(), token.location().clone())),

            Token::OpenParen => {
                let inner = self.expr(0)?;
                self.expect(Token::CloseParen)?;
                Term::Paren(inner)
            }

            _ => return self.fail(ParserError::ExpectedExpr),
        };

        self.alloc_expr(Expr::Term(term))
    }

    fn keyword(&mut self, keyword: Keyword) -> Parse<()> {
        self.expect(Token::Keyword(keyword))
    }

    fn expect(&mut self, token: Token) -> Parse<()> {
        match self.next() {
            Ok(found) if *found.val() == token => Ok(()),
            Ok(found) => self.fail(ParserError::UnexpectedToken(token, found.val().clone())),
            Err(_) => self.fail(ParserError::MissingToken(token)),
        }
    }

    fn peek(&self, ahead: usize) -> Option<&'a Token> {
        self.tokens.get(self.cursor + ahead).map(Located::val)
    }

    fn next(&mut self) -> Parse<&'a Located<Token>> {
        match self.tokens.get(self.cursor) {
            Some(token) => {
                self.cursor += 1;
                self.last_known = token.location().clone();
                Ok(token)
            }

            None => self.fail(ParserError::UnexpectedEof),
        }
    }

    fn alloc_expr(&mut self, expr: Expr) -> Parse<Id<Expr>> {
        let result = self.ast.exprs.alloc(expr);
        result.map_err(|error| Located::at(error.into(), self.last_known.clone()))
    }

    fn alloc_stmt(&mut self, stmt: Stmt) -> Parse<Id<Stmt>> {
        let result = self.ast.stmts.alloc(stmt);
        result.map_err(|error| Located::at(error.into(), self.last_known.clone()))
    }

    fn fail<T>(&self, error: ParserError) -> Parse<T> {
        Err(Located::at(error, self.last_known.clone()))
    }
}

/// Forma prefija de una expresión, por ejemplo `(+ 2 (* 3 4))`.
///
/// Los paréntesis del código fuente no se imprimen, ya que su
/// efecto queda explícito en la estructura del árbol.
pub struct Pretty<'a> {
    ast: &'a Ast,
    expr: Id<Expr>,
}

impl Display for Pretty<'_> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ast[self.expr] {
            Expr::Term(Term::Integer(digits)) => fmt.write_str(digits.val()),
            Expr::Term(Term::Read(id)) => write!(fmt, "{}", id.val()),
            Expr::Term(Term::Paren(inner)) => self.ast.pretty(*inner).fmt(fmt),
            Expr::Binary(op, lhs, rhs) => write!(
                fmt,
                "({} {} {})",
                op,
                self.ast.pretty(*lhs),
                self.ast.pretty(*rhs)
            ),
        }
    }
}

impl Display for Ast {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &statement in &self.body {
            self.fmt_stmt(fmt, statement, 0)?;
        }

        Ok(())
    }
}

impl Ast {
    fn fmt_stmt(&self, fmt: &mut fmt::Formatter<'_>, stmt: Id<Stmt>, depth: usize) -> fmt::Result {
        let indent = depth * 4;
        write!(fmt, "{:indent$}", "", indent = indent)?;

        match &self[stmt] {
            Stmt::Exit(expr) => writeln!(fmt, "exit {}", self.pretty(*expr)),
            Stmt::Let { name, value } => {
                writeln!(fmt, "val {} {}", name.val(), self.pretty(*value))
            }

            Stmt::Block(body) if body.is_empty() => writeln!(fmt, "{{}}"),
            Stmt::Block(body) => {
                writeln!(fmt, "{{")?;
                for &inner in body {
                    self.fmt_stmt(fmt, inner, depth + 1)?;
                }

                writeln!(fmt, "{:indent$}}}", "", indent = indent)
            }
        }
    }
}
