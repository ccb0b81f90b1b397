//! Compilador para el lenguaje yz.
//!
//! # Front end
//! Cada programa deriva de un único archivo de código fuente.
//! Este archivo se somete primero a análisis léxico en [`lex`], de
//! lo cual se obtiene un flujo de tokens. El flujo de tokens se
//! dispone en un AST por medio de análisis sintáctico en [`parse`].
//! Los nodos del árbol se alojan en las arenas de [`arena`].
//!
//! # Back end
//! La generación de código recorre el árbol una única vez y emite
//! ensamblador x86-64 para una máquina de pila, resolviendo nombres
//! por medio de [`semantic`] al mismo tiempo. Los dialectos de
//! entrada y salida del proceso se exponen en [`target`]. El
//! ensamblado y enlazado del ejecutable final, así como su ejecución,
//! se delegan a `gcc` en [`link`].

#[macro_use]
mod macros;

pub mod arena;
pub mod error;
pub mod lex;
pub mod link;
pub mod parse;
pub mod semantic;
pub mod source;

mod arch;
mod codegen;

use log::debug;

use crate::{
    error::Diagnostics,
    lex::{Lexer, Token},
    source::{Located, Location, Source},
    target::Dialect,
};

/// Emisión de código.
///
/// Este módulo reexporta suficientes ítems internos relacionados a generación de código para
/// traducir un AST a alguno de los dialectos soportados.
pub mod target {
    pub use crate::arch::Dialect;
    pub use crate::codegen::generate;
}

/// Parámetros de una compilación.
#[derive(Copy, Clone, Debug)]
pub struct Options {
    /// Dialecto de ensamblador a emitir.
    pub dialect: Dialect,

    /// Cantidad máxima de nodos por cada arena del AST.
    pub arena_capacity: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            dialect: Dialect::Syscall,
            arena_capacity: arena::DEFAULT_CAPACITY,
        }
    }
}

/// Análisis léxico de un texto fuente completo.
///
/// Retorna la ubicación de inicio del programa junto a los tokens.
pub fn scan<S>(text: &str, name: S) -> Result<(Location, Vec<Located<Token>>), Diagnostics>
where
    S: Into<String>,
{
    let source = Source::new(name, text);
    let tokens = Lexer::new(&source).try_exhaustive()?;

    Ok((source.start(), tokens))
}

/// Compila un programa completo hasta ensamblador.
///
/// `name` identifica al origen en los diagnósticos. Si cualquier fase
/// falla no se produce salida alguna.
pub fn compile<S>(text: &str, name: S, options: Options) -> Result<String, Diagnostics>
where
    S: Into<String>,
{
    let (start, tokens) = scan(text, name)?;
    let ast = parse::parse(&tokens, start, options.arena_capacity)?;
    let listing = target::generate(&ast, options.dialect)?;

    debug!(
        "Compiled {} tokens into {} top-level statements",
        tokens.len(),
        ast.body().len()
    );

    Ok(listing)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::error::Kind;

    fn failure(text: &str, options: Options) -> String {
        compile(text, "<test>", options).unwrap_err().to_string()
    }

    #[test]
    fn test_compile() {
        let listing = compile("exit(1 + 2 * 3);", "<test>", Options::default()).unwrap();
        assert!(listing.starts_with(".text\n.global _start\n_start:\n"));

        let options = Options {
            dialect: Dialect::Libc,
            ..Default::default()
        };

        let listing = compile("exit(1 + 2 * 3);", "<test>", options).unwrap();
        assert!(listing.starts_with(".text\n.global main\nmain:\n"));
        assert!(listing.contains("\tret\n"));
    }

    #[test]
    fn test_error_kinds() {
        let options = Options::default();

        assert!(failure("exit(1 $ 2);", options).starts_with("Lexical error: "));
        assert!(failure("exit(1 + 2)", options).starts_with("Syntax error: "));
        assert!(failure("exit(y);", options).starts_with("Semantic error: "));

        let tiny = Options {
            arena_capacity: 2,
            ..options
        };

        assert!(failure("exit(1 + 2);", tiny).starts_with("Resource exhaustion: "));

        let diagnostics = compile("exit(1 + 2);", "<test>", tiny).unwrap_err();
        assert_eq!(diagnostics.kinds().collect::<Vec<_>>(), vec![Kind::Exhaustion]);
    }

    #[test]
    fn test_report_names_source() {
        let report = failure("val x = 1;\nval x = 2;", Options::default());
        assert!(report.contains(" --> <test>:2:5\n"));
        assert!(report.ends_with("Build failed with 1 error\n"));
    }
}
