//! Análisis léxico.
//!
//! # Tokenization
//! Esta es la primera fase del compilador. Descompone el texto de una
//! [`Source`] en unidades léxicas denominadas tokens. Los espacios
//! en blanco se descartan durante esta operación. Cada token emitido está
//! asociado a una ubicación en el código fuente original, lo cual permite
//! rastrear errores tanto en los mismos como en constructos más elevados de
//! fases posteriores.
//!
//! # Contenido de un token
//! Operadores, puntuación y palabras clave se identifican por el hecho de lo
//! que son y no incluyen lexemas. Los identificadores y las constantes enteras
//! sí preservan su lexema original. Las constantes no se validan contra el
//! ancho de los enteros de la plataforma objetivo.
//!
//! # Reglas importantes del lenguaje
//! - Los identificadores empiezan con una letra y continúan con letras o dígitos.
//! - El lenguaje es case-sensitive: `exit` es palabra clave, `Exit` no lo es.
//! - No existen comentarios; `/` es siempre el operador de división.
//!
//! # Errores
//! El lexer es capaz de recuperarse parcialmente de condiciones de error.
//! Esto ocurre en suficiente grado como para reportar más de un error por
//! ejecución, pero no lo suficiente como para permitir el avance a las
//! demás fases de la compilación.

use crate::source::{Chars, Located, Location, Position, Source};
use std::{
    fmt::{self, Display},
    iter::Peekable,
    rc::Rc,
    str::FromStr,
};

use log::debug;
use thiserror::Error;

/// Error de escaneo.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum LexerError {
    /// Carácter desconocido o inesperado en el flujo de entrada.
    #[error("Bad character {0:?} in input stream")]
    BadChar(char),
}

/// Un identificador.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(Rc<str>);

impl Identifier {
    /// Construye un identificador a partir de su lexema.
    pub fn new(name: &str) -> Self {
        Identifier(Rc::from(name))
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Identifier {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(&self.0)
    }
}

/// Objeto resultante del análisis léxico.
///
/// Un token contiene suficiente información para describir completamente
/// a una entidad léxica en el programa fuente.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Identificador.
    Id(Identifier),

    /// Palabra clave.
    Keyword(Keyword),

    /// Literal de entero, con sus dígitos tal y como aparecen.
    IntLiteral(String),

    /// `=`
    Assign,

    /// `+`
    Plus,

    /// `-`
    Minus,

    /// `*`
    Times,

    /// `/`
    Slash,

    /// `;`
    Semicolon,

    /// `(`
    OpenParen,

    /// `{`
    OpenCurly,

    /// `)`
    CloseParen,

    /// `}`
    CloseCurly,
}

impl Token {
    /// Lexema del token cuando este lo preserva.
    pub fn payload(&self) -> Option<&str> {
        match self {
            Token::Id(id) => Some(id.as_ref()),
            Token::IntLiteral(digits) => Some(digits),
            _ => None,
        }
    }
}

impl Token {
    /// Tokens de un único carácter.
    fn punctuation(c: char) -> Option<Token> {
        let token = match c {
            '=' => Token::Assign,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Times,
            '/' => Token::Slash,
            ';' => Token::Semicolon,
            '(' => Token::OpenParen,
            '{' => Token::OpenCurly,
            ')' => Token::CloseParen,
            '}' => Token::CloseCurly,
            _ => return None,
        };

        Some(token)
    }
}

impl Display for Token {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Token::*;

        match self {
            Id(id) => write!(fmt, "identifier `{}`", id),
            Keyword(keyword) => write!(fmt, "keyword `{}`", keyword),
            IntLiteral(digits) => write!(fmt, "literal `{}`", digits),
            Assign => fmt.write_str("`=`"),
            Plus => fmt.write_str("`+`"),
            Minus => fmt.write_str("`-`"),
            Times => fmt.write_str("`*`"),
            Slash => fmt.write_str("`/`"),
            Semicolon => fmt.write_str("`;`"),
            OpenParen => fmt.write_str("`(`"),
            OpenCurly => fmt.write_str("`{`"),
            CloseParen => fmt.write_str("`)`"),
            CloseCurly => fmt.write_str("`}`"),
        }
    }
}

/// Una palabra clave.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Keyword {
    Exit,
    Val,
}

impl Display for Keyword {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let string = match self {
            Keyword::Exit => "exit",
            Keyword::Val => "val",
        };

        fmt.write_str(string)
    }
}

impl FromStr for Keyword {
    type Err = ();

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        const KEYWORDS: &[(&str, Keyword)] = &[("exit", Keyword::Exit), ("val", Keyword::Val)];

        KEYWORDS
            .iter()
            .find(|&&(name, _)| name == string)
            .map(|&(_, keyword)| keyword)
            .ok_or(())
    }
}

/// Analiza léxicamente un texto fuente completo, nombrado `<input>`.
pub fn tokenize(text: &str) -> Result<Vec<Located<Token>>, Vec<Located<LexerError>>> {
    let source = Source::new("<input>", text);
    Lexer::new(&source).try_exhaustive()
}

/// Máquina de estados para análisis léxico.
///
/// El siguiente estado y la salida del lexer dependen del estado
/// actual y del siguiente carácter sin consumir de la fuente.
pub struct Lexer<'a> {
    source: &'a Rc<Source>,
    chars: Peekable<Chars<'a>>,
    state: State,

    /// Posición del primer carácter del token en construcción.
    start: Position,

    /// Posición siguiente al último carácter consumido.
    end: Position,
}

enum State {
    /// Entre tokens.
    Start,

    /// Se descarta el resto de la línea donde ocurrió un error.
    Error,

    /// Dígitos de una constante entera.
    Integer(String),

    /// Identificador o palabra clave.
    Word(String),
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a Rc<Source>) -> Self {
        Lexer {
            source,
            chars: source.chars().peekable(),
            state: State::Start,
            start: Position::default(),
            end: Position::default(),
        }
    }

    /// Reduce la entrada a sea una secuencia de tokens o una
    /// secuencia de errores.
    ///
    /// Tras el primer error el lexer deja de acumular tokens y
    /// continúa únicamente en busca de más errores, a lo sumo uno
    /// por línea.
    pub fn try_exhaustive(mut self) -> Result<Vec<Located<Token>>, Vec<Located<LexerError>>> {
        let mut tokens = Vec::new();

        while let Some(result) = self.next() {
            match result {
                Ok(token) => tokens.push(token),
                Err(error) => {
                    let mut errors = vec![error];
                    errors.extend(self.filter_map(Result::err));

                    debug!("Lexing failed with {} error(s)", errors.len());
                    return Err(errors);
                }
            }
        }

        debug!("Lexed {} tokens", tokens.len());
        Ok(tokens)
    }

    fn bump(&mut self) {
        if let Some((_, position)) = self.chars.next() {
            self.end = position.advance();
        }
    }

    fn finish(&mut self, token: Token) -> Option<Result<Located<Token>, Located<LexerError>>> {
        self.state = State::Start;

        let location = Location::new(self.source, self.start, self.end);
        Some(Ok(Located::at(token, location)))
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Located<Token>, Located<LexerError>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (next, position) = match self.chars.peek() {
                Some(&(c, position)) => (Some(c), position),
                None => (None, self.end),
            };

            if let State::Start = self.state {
                self.start = position;
            }

            match (&mut self.state, next) {
                (State::Start, None) | (State::Error, None) => return None,

                // Recuperación al final de la línea
                (State::Error, Some('\n')) => self.state = State::Start,
                (State::Error, Some(_)) => (),

                (State::Start, Some(c)) if c.is_ascii_whitespace() => (),

                // Las constantes y palabras acumulan desde su primer carácter
                (State::Start, Some(c)) if c.is_ascii_digit() => {
                    self.state = State::Integer(String::new());
                    continue;
                }

                (State::Start, Some(c)) if c.is_ascii_alphabetic() => {
                    self.state = State::Word(String::new());
                    continue;
                }

                (State::Start, Some(c)) => {
                    self.bump();

                    return match Token::punctuation(c) {
                        Some(token) => self.finish(token),
                        None => {
                            self.state = State::Error;

                            let location = Location::at(self.source, position);
                            Some(Err(Located::at(LexerError::BadChar(c), location)))
                        }
                    };
                }

                (State::Integer(digits), Some(c)) if c.is_ascii_digit() => digits.push(c),
                (State::Word(word), Some(c)) if c.is_ascii_alphanumeric() => word.push(c),

                (State::Integer(digits), _) => {
                    let token = Token::IntLiteral(std::mem::take(digits));
                    return self.finish(token);
                }

                (State::Word(word), _) => {
                    let token = match word.parse() {
                        Ok(keyword) => Token::Keyword(keyword),
                        Err(()) => Token::Id(Identifier::new(word)),
                    };

                    return self.finish(token);
                }
            }

            self.bump();
        }
    }
}
