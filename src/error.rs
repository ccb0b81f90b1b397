//! Reporte de errores.
//!
//! Cualquier error de cualquier fase invalida la compilación entera.
//! Cada fase convierte sus errores ubicados en [`Diagnostics`] por
//! medio de `From`, lo cual permite propagarlos con `?` y presentarlos
//! señalando las líneas de código fuente donde ocurrieron.

use std::{
    error::Error,
    fmt::{self, Debug, Display},
};

use crate::{
    lex::LexerError,
    parse::ParserError,
    semantic::SemanticError,
    source::{Located, Location, TAB_STOP},
};

/// Clase de un error de compilación.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Kind {
    Lexical,
    Syntax,
    Semantic,

    /// Se agotó la capacidad de las arenas del árbol.
    Exhaustion,
}

impl Display for Kind {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Kind::Lexical => "Lexical error",
            Kind::Syntax => "Syntax error",
            Kind::Semantic => "Semantic error",
            Kind::Exhaustion => "Resource exhaustion",
        };

        fmt.write_str(label)
    }
}

struct Diagnostic {
    kind: Kind,
    message: String,
    location: Location,
}

/// Uno o más errores que impidieron la compilación.
#[derive(Default)]
pub struct Diagnostics {
    reports: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Cantidad de errores reportados.
    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    /// Clases de los errores, en orden de reporte.
    pub fn kinds(&self) -> impl Iterator<Item = Kind> + '_ {
        self.reports.iter().map(|report| report.kind)
    }

    fn push<E: Error>(&mut self, kind: Kind, error: Located<E>) {
        self.reports.push(Diagnostic {
            kind,
            message: error.val().to_string(),
            location: error.location().clone(),
        });
    }

    fn single<E: Error>(kind: Kind, error: Located<E>) -> Self {
        let mut diagnostics = Diagnostics::default();
        diagnostics.push(kind, error);
        diagnostics
    }
}

impl From<Vec<Located<LexerError>>> for Diagnostics {
    fn from(errors: Vec<Located<LexerError>>) -> Self {
        let mut diagnostics = Diagnostics::default();
        for error in errors {
            diagnostics.push(Kind::Lexical, error);
        }

        diagnostics
    }
}

impl From<Located<ParserError>> for Diagnostics {
    fn from(error: Located<ParserError>) -> Self {
        let kind = match error.val() {
            ParserError::Exhausted(_) => Kind::Exhaustion,
            _ => Kind::Syntax,
        };

        Diagnostics::single(kind, error)
    }
}

impl From<Located<SemanticError>> for Diagnostics {
    fn from(error: Located<SemanticError>) -> Self {
        Diagnostics::single(Kind::Semantic, error)
    }
}

impl Display for Diagnostics {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.reports.is_empty() {
            return writeln!(fmt, "No errors were reported");
        }

        for report in &self.reports {
            report.render(fmt)?;
            writeln!(fmt)?;
        }

        let count = self.reports.len();
        let plural = if count == 1 { "" } else { "s" };
        writeln!(fmt, "Build failed with {} error{}", count, plural)
    }
}

impl Debug for Diagnostics {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        <Self as Display>::fmt(self, fmt)
    }
}

impl Error for Diagnostics {}

impl Diagnostic {
    /// Encabezado, línea citada y subrayado de la región culpable.
    fn render(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (start, end) = (self.location.start(), self.location.end());
        let line = start.line();
        let gutter = line.to_string().len();

        writeln!(fmt, "{}: {}", self.kind, self.message)?;
        writeln!(fmt, " --> {}", self.location)?;
        writeln!(fmt, "{:gutter$} |", "", gutter = gutter)?;

        let text = expand_tabs(self.location.source().line(line));
        writeln!(fmt, "{} | {}", line, text)?;

        // Un rango que cruza de línea se subraya solo en su primer carácter
        let width = if end.line() == line {
            end.column().saturating_sub(start.column()).max(1)
        } else {
            1
        };

        writeln!(
            fmt,
            "{:gutter$} | {:indent$}{:^<width$}",
            "",
            "",
            "",
            gutter = gutter,
            indent = (start.column() - 1) as usize,
            width = width as usize
        )
    }
}

/// Reemplaza tabuladores por espacios, de modo que las columnas
/// impresas coincidan con las columnas de cada [`Location`].
fn expand_tabs(line: &str) -> String {
    let mut expanded = String::with_capacity(line.len());
    for c in line.chars() {
        if c == '\t' {
            let stop = TAB_STOP as usize;
            let padding = stop - expanded.chars().count() % stop;
            expanded.extend(std::iter::repeat(' ').take(padding));
        } else {
            expanded.push(c);
        }
    }

    expanded
}
