//! Texto fuente y ubicaciones dentro del mismo.
//!
//! Un programa se mantiene completo en memoria durante toda la
//! compilación. Tokens, nodos y errores de cualquier fase refieren
//! a rangos de columnas dentro de una [`Source`], de modo que los
//! diagnósticos pueden citar el texto exacto donde ocurrió un error.

use std::{
    fmt::{self, Debug, Display, Formatter},
    io::{self, Read},
    rc::Rc,
    str,
};

/// Ancho de los divisores de tabulador.
pub(crate) const TAB_STOP: u32 = 4;

/// Un programa completo junto a su nombre, usualmente una ruta.
pub struct Source {
    name: String,
    text: String,

    /// Desplazamiento en bytes del inicio de cada línea.
    line_starts: Vec<usize>,
}

impl Source {
    pub fn new<N, T>(name: N, text: T) -> Rc<Self>
    where
        N: Into<String>,
        T: Into<String>,
    {
        let text = text.into();
        let line_starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(index, _)| index + 1))
            .collect();

        Rc::new(Source {
            name: name.into(),
            text,
            line_starts,
        })
    }

    /// Lee un programa completo desde un flujo de bytes UTF-8.
    pub fn read<N, R>(name: N, mut reader: R) -> io::Result<Rc<Self>>
    where
        N: Into<String>,
        R: Read,
    {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;

        Ok(Source::new(name, text))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Contenido de una línea, contando desde 1 y sin su terminador.
    ///
    /// Líneas inexistentes se observan como vacías.
    pub fn line(&self, number: u32) -> &str {
        let index = match (number as usize).checked_sub(1) {
            Some(index) => index,
            None => return "",
        };

        let start = match self.line_starts.get(index) {
            Some(&start) => start,
            None => return "",
        };

        let end = match self.line_starts.get(index + 1) {
            Some(&next) => next - 1,
            None => self.text.len(),
        };

        self.text[start..end].trim_end_matches('\r')
    }

    /// Ubicación del inicio del programa.
    pub fn start(self: &Rc<Self>) -> Location {
        Location::at(self, Position::default())
    }

    /// Recorre el texto carácter por carácter.
    pub fn chars(&self) -> Chars<'_> {
        Chars {
            inner: self.text.chars(),
            next: Position::default(),
        }
    }
}

/// Iterador sobre los caracteres de una [`Source`] y sus posiciones.
pub struct Chars<'a> {
    inner: str::Chars<'a>,
    next: Position,
}

impl Iterator for Chars<'_> {
    type Item = (char, Position);

    fn next(&mut self) -> Option<Self::Item> {
        let c = self.inner.next()?;

        let here = self.next;
        self.next = match c {
            '\n' => here.newline(),
            '\t' => here.tab(),
            _ => here.advance(),
        };

        Some((c, here))
    }
}

/// Una posición línea-columna, ambas contando desde 1.
///
/// Las columnas son visuales: un tabulador avanza hasta el
/// siguiente múltiplo de [`TAB_STOP`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Position {
    line: u32,
    column: u32,
}

impl Position {
    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn column(&self) -> u32 {
        self.column
    }

    pub(crate) fn advance(self) -> Position {
        Position {
            column: self.column + 1,
            ..self
        }
    }

    fn newline(self) -> Position {
        Position {
            line: self.line + 1,
            column: 1,
        }
    }

    fn tab(self) -> Position {
        Position {
            column: 1 + ((self.column - 1) / TAB_STOP + 1) * TAB_STOP,
            ..self
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Position { line: 1, column: 1 }
    }
}

impl Display for Position {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}", self.line, self.column)
    }
}

/// Rango de columnas `[start, end)` dentro de una misma fuente.
#[derive(Clone)]
pub struct Location {
    source: Rc<Source>,
    start: Position,
    end: Position,
}

impl Location {
    /// Rango que inicia en `start` y termina justo antes de `end`.
    pub fn new(source: &Rc<Source>, start: Position, end: Position) -> Self {
        Location {
            source: Rc::clone(source),
            start,
            end,
        }
    }

    /// Un único carácter.
    pub fn at(source: &Rc<Source>, position: Position) -> Self {
        Location::new(source, position, position.advance())
    }

    /// Rango desde el inicio de `self` hasta el final de `to`.
    pub fn span(&self, to: &Location) -> Self {
        Location::new(&self.source, self.start, to.end)
    }

    pub fn start(&self) -> Position {
        self.start
    }

    pub fn end(&self) -> Position {
        self.end
    }

    pub fn source(&self) -> &Source {
        &self.source
    }
}

impl Display for Location {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}", self.source.name, self.start)?;

        let (start, end) = (self.start, self.end);
        if end.line == start.line && end.column > start.column + 1 {
            write!(formatter, "-{}", end.column - 1)?;
        }

        Ok(())
    }
}

impl Debug for Location {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        <Self as Display>::fmt(self, formatter)
    }
}

/// Un valor cualquiera con una ubicación asociada.
#[derive(Debug, Clone)]
pub struct Located<T> {
    location: Location,
    value: T,
}

impl<T> Located<T> {
    pub fn at(value: T, location: Location) -> Self {
        Located { value, location }
    }

    pub fn val(&self) -> &T {
        &self.value
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Descarta la ubicación.
    pub fn into_inner(self) -> T {
        self.value
    }

    /// Transforma el valor sin cambiar su ubicación.
    pub fn map<U, F>(self, map: F) -> Located<U>
    where
        F: FnOnce(T) -> U,
    {
        Located {
            value: map(self.value),
            location: self.location,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn positions(text: &str) -> Vec<(char, u32, u32)> {
        Source::new("<test>", text)
            .chars()
            .map(|(c, at)| (c, at.line(), at.column()))
            .collect()
    }

    #[test]
    fn test_char_positions() {
        assert_eq!(
            positions("ab\nc"),
            vec![('a', 1, 1), ('b', 1, 2), ('\n', 1, 3), ('c', 2, 1)]
        );
    }

    #[test]
    fn test_tab_stops() {
        assert_eq!(positions("\tx")[1], ('x', 1, 5));
        assert_eq!(positions("ab\tx")[3], ('x', 1, 5));
        assert_eq!(positions("abcd\tx")[5], ('x', 1, 9));
    }

    #[test]
    fn test_lines() {
        let source = Source::new("<test>", "first\r\nsecond\n");
        assert_eq!(source.line(1), "first");
        assert_eq!(source.line(2), "second");
        assert_eq!(source.line(3), "");
        assert_eq!(source.line(0), "");
        assert_eq!(source.line(7), "");
    }

    #[test]
    fn test_read() {
        let source = Source::read("<bytes>", "exit(0);".as_bytes()).unwrap();
        assert_eq!(source.name(), "<bytes>");
        assert_eq!(source.text(), "exit(0);");

        let invalid: &[u8] = &[0x65, 0xff, 0x74];
        assert!(Source::read("<bytes>", invalid).is_err());
    }

    #[test]
    fn test_location_display() {
        let source = Source::new("main.yz", "val abc = 1;");
        assert_eq!(source.start().to_string(), "main.yz:1:1");

        let start = Location::at(&source, Position { line: 1, column: 5 });
        let end = Location::at(&source, Position { line: 1, column: 7 });
        let word = start.span(&end);

        assert_eq!(word.end().column(), 8);
        assert_eq!(word.to_string(), "main.yz:1:5-7");
    }
}
