//! Resolución de nombres.
//!
//! Las variables del lenguaje no tienen otro almacenamiento que la
//! pila de operandos: el valor que deja la expresión de un `val` en
//! la pila es la variable misma. Una [`SymbolTable`] asocia cada nombre
//! visible con la posición simbólica de su valor dentro de esa pila y
//! lleva cuenta de qué variables pertenecen a cada ámbito léxico.

use thiserror::Error;

use crate::{lex::Identifier, source::Located};

pub type Semantic<T> = Result<T, Located<SemanticError>>;

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SemanticError {
    #[error("Symbol `{0}` is undeclared")]
    Undeclared(Identifier),

    #[error("Symbol `{0}` is already declared in this scope")]
    Redeclared(Identifier),
}

/// Posición de un valor en la pila de operandos, contada desde el fondo.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Slot(pub usize);

/// Variables visibles y fronteras de ámbitos.
///
/// Las variables se guardan en orden de declaración. Cada marcador de
/// ámbito es la cantidad de variables que existían al entrar al ámbito.
#[derive(Default)]
pub struct SymbolTable {
    variables: Vec<(Identifier, Slot)>,
    markers: Vec<usize>,
}

impl SymbolTable {
    /// Abre un ámbito anidado.
    pub fn enter(&mut self) {
        self.markers.push(self.variables.len());
    }

    /// Cierra el ámbito más interno y retorna cuántas variables declaró.
    pub fn leave(&mut self) -> usize {
        let marker = self.markers.pop().unwrap_or(0);
        let declared = self.variables.len() - marker;

        self.variables.truncate(marker);
        declared
    }

    /// Busca una variable; la declaración más reciente tiene prioridad.
    pub fn lookup(&self, id: &Located<Identifier>) -> Semantic<Slot> {
        self.variables
            .iter()
            .rev()
            .find(|(name, _)| name == id.val())
            .map(|&(_, slot)| slot)
            .ok_or_else(|| {
                Located::at(
                    SemanticError::Undeclared(id.val().clone()),
                    id.location().clone(),
                )
            })
    }

    /// Declara una variable en el ámbito más interno.
    ///
    /// Ocultar una variable de un ámbito exterior es válido,
    /// pero no redeclararla en el mismo ámbito.
    pub fn declare(&mut self, id: &Located<Identifier>, slot: Slot) -> Semantic<()> {
        self.check_free(id)?;
        self.variables.push((id.val().clone(), slot));

        Ok(())
    }

    /// Verifica que el nombre esté libre en el ámbito más interno.
    pub fn check_free(&self, id: &Located<Identifier>) -> Semantic<()> {
        let marker = self.markers.last().copied().unwrap_or(0);
        if self.variables[marker..].iter().any(|(name, _)| name == id.val()) {
            return Err(Located::at(
                SemanticError::Redeclared(id.val().clone()),
                id.location().clone(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Source;

    fn id(name: &str) -> Located<Identifier> {
        let start = Source::new("<test>", name).start();
        Located::at(Identifier::new(name), start)
    }

    #[test]
    fn test_shadowing() {
        let mut table = SymbolTable::default();
        table.enter();
        table.declare(&id("x"), Slot(0)).unwrap();

        table.enter();
        assert_eq!(table.lookup(&id("x")).unwrap(), Slot(0));

        table.declare(&id("x"), Slot(3)).unwrap();
        assert_eq!(table.lookup(&id("x")).unwrap(), Slot(3));

        assert_eq!(table.leave(), 1);
        assert_eq!(table.lookup(&id("x")).unwrap(), Slot(0));
    }

    #[test]
    fn test_redeclaration() {
        let mut table = SymbolTable::default();
        table.enter();
        table.declare(&id("x"), Slot(0)).unwrap();

        let error = table.declare(&id("x"), Slot(1)).unwrap_err();
        assert!(matches!(error.val(), SemanticError::Redeclared(name) if name.to_string() == "x"));
        assert!(table.check_free(&id("x")).is_err());
        assert!(table.check_free(&id("y")).is_ok());
    }

    #[test]
    fn test_leave_discards_inner_variables() {
        let mut table = SymbolTable::default();
        table.enter();
        table.declare(&id("a"), Slot(0)).unwrap();

        table.enter();
        table.declare(&id("b"), Slot(1)).unwrap();
        table.declare(&id("c"), Slot(2)).unwrap();
        assert_eq!(table.leave(), 2);

        let error = table.lookup(&id("b")).unwrap_err();
        assert!(matches!(error.val(), SemanticError::Undeclared(name) if name.to_string() == "b"));
        assert_eq!(table.leave(), 1);
        assert_eq!(table.leave(), 0);
    }
}
