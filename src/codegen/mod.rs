//! Generación de código.
//!
//! El generador recorre el árbol una única vez, en profundidad y de
//! izquierda a derecha, como una máquina de pila: toda expresión deja
//! exactamente un valor en la pila del proceso y cada consumidor retira
//! exactamente los operandos que utiliza. `stack_depth` lleva cuenta de
//! los valores vivos y siempre coincide con los `push`/`pop` emitidos.

use std::marker::PhantomData;

use log::debug;

use crate::{
    arch::{Abi, Dialect, Reg, VALUE_SIZE},
    arena::Id,
    parse::{Ast, BinOp, Expr, Stmt, Term},
    semantic::{Semantic, Slot, SymbolTable},
};

/// Listado de ensamblador en construcción, una línea a la vez.
#[derive(Default)]
pub struct Listing {
    text: String,
}

impl Listing {
    pub fn line(&mut self, line: String) {
        self.text.push_str(&line);
        self.text.push('\n');
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

/// Genera el listado de ensamblador de un programa.
///
/// El resultado solo existe si no hubo errores; no se produce salida
/// parcial.
pub fn generate(ast: &Ast, dialect: Dialect) -> Semantic<String> {
    dispatch_dialect!(A: dialect => Generator::<A>::new(ast).program())
}

struct Generator<'a, A: Abi> {
    ast: &'a Ast,
    listing: Listing,
    symbols: SymbolTable,
    stack_depth: usize,
    exited: bool,
    abi: PhantomData<A>,
}

impl<'a, A: Abi> Generator<'a, A> {
    fn new(ast: &'a Ast) -> Self {
        Generator {
            ast,
            listing: Listing::default(),
            symbols: SymbolTable::default(),
            stack_depth: 0,
            exited: false,
            abi: PhantomData,
        }
    }

    fn program(mut self) -> Semantic<String> {
        self.listing.line(String::from(".text"));
        self.listing.line(format!(".global {0}\n{0}:", A::ENTRY));
        A::prologue(&mut self.listing);

        // El nivel superior es el ámbito más externo
        self.symbols.enter();
        for &statement in self.ast.body() {
            self.stmt(statement)?;
        }

        self.leave_scope();

        // Sin `exit` explícito el programa termina con código cero
        if !self.exited {
            emit!(self.listing, "movq", "$0, %{}", A::EXIT_CODE);
            A::terminate(&mut self.listing);
        }

        debug_assert_eq!(self.stack_depth, 0);

        // Sin esta nota, ld asume que la pila debe ser ejecutable
        self.listing.line(String::from(".section .note.GNU-stack,\"\",@progbits"));

        let text = self.listing.into_text();
        debug!("Generated {} bytes of assembly", text.len());

        Ok(text)
    }

    fn stmt(&mut self, stmt: Id<Stmt>) -> Semantic<()> {
        let ast = self.ast;

        match &ast[stmt] {
            Stmt::Exit(expr) => {
                self.expr(*expr)?;
                self.pop(A::EXIT_CODE);
                A::terminate(&mut self.listing);

                self.exited = true;
            }

            Stmt::Let { name, value } => {
                self.symbols.check_free(name)?;

                // El valor que deja la expresión es el almacenamiento de la variable
                let slot = Slot(self.stack_depth);
                self.expr(*value)?;
                self.symbols.declare(name, slot)?;
            }

            Stmt::Block(body) => {
                self.symbols.enter();
                for &inner in body {
                    self.stmt(inner)?;
                }

                self.leave_scope();
            }
        }

        Ok(())
    }

    fn expr(&mut self, expr: Id<Expr>) -> Semantic<()> {
        let ast = self.ast;

        match &ast[expr] {
            Expr::Term(Term::Integer(digits)) => {
                // GNU as lee un `0` inicial como prefijo octal
                let digits = digits.val().trim_start_matches('0');
                let digits = if digits.is_empty() { "0" } else { digits };

                emit!(self.listing, "movq", "${}, %{}", digits, Reg::Rax);
                self.push(Reg::Rax);
            }

            Expr::Term(Term::Read(id)) => {
                let slot = self.symbols.lookup(id)?;
                self.push_slot(slot);
            }

            Expr::Term(Term::Paren(inner)) => self.expr(*inner)?,

            Expr::Binary(op, lhs, rhs) => {
                // Operando derecho primero: el izquierdo queda en el tope
                self.expr(*rhs)?;
                self.expr(*lhs)?;

                self.pop(Reg::Rax);
                self.pop(Reg::Rcx);

                match op {
                    BinOp::Add => emit!(self.listing, "addq", "%{}, %{}", Reg::Rcx, Reg::Rax),
                    BinOp::Sub => emit!(self.listing, "subq", "%{}, %{}", Reg::Rcx, Reg::Rax),
                    BinOp::Mul => emit!(self.listing, "imulq", "%{}, %{}", Reg::Rcx, Reg::Rax),
                    BinOp::Div => {
                        emit!(self.listing, "xorq", "%{}, %{}", Reg::Rdx, Reg::Rdx);
                        emit!(self.listing, "divq", "%{}", Reg::Rcx);
                    }
                }

                self.push(Reg::Rax);
            }
        }

        Ok(())
    }

    fn push(&mut self, reg: Reg) {
        emit!(self.listing, "pushq", "%{}", reg);
        self.stack_depth += 1;
    }

    fn pop(&mut self, reg: Reg) {
        emit!(self.listing, "popq", "%{}", reg);
        self.stack_depth -= 1;
    }

    /// Copia el valor de una variable al tope de la pila.
    fn push_slot(&mut self, Slot(slot): Slot) {
        let offset = (self.stack_depth - slot - 1) * VALUE_SIZE;
        emit!(self.listing, "pushq", "0x{:x}(%{})", offset, Reg::Rsp);
        self.stack_depth += 1;
    }

    /// Descarta de una sola vez las variables del ámbito más interno.
    fn leave_scope(&mut self) {
        let declared = self.symbols.leave();
        if declared > 0 {
            emit!(
                self.listing,
                "addq",
                "$0x{:x}, %{}",
                declared * VALUE_SIZE,
                Reg::Rsp
            );

            self.stack_depth -= declared;
        }
    }
}
