//! Análisis léxico.
//!
//! # Tokenization
//! Esta es la primera fase del compilador. Descompone un [`InputStream`]
//! (flujo de caracteres) en unidades léxicas denominadas tokens. Los
//! espacios en blanco se descartan durante esta operación. Cada token
//! emitido está asociado a una ubicación en el código fuente original,
//! lo cual permite rastrear errores tanto en los mismos como en
//! constructos más elevados de fases posteriores.
//!
//! # Contenido de un token
//! Este lexer no produce lexemas para casos donde no son necesarios.
//! Operadores, puntuación y palabras clave se identifican por el hecho
//! de lo que son y no incluyen lexemas. Por su parte, los
//! identificadores sí incluyen su lexema original, compartido por
//! referencia contada para que la tabla de símbolos no duplique
//! cadenas. Las constantes literales se resuelven a sus valores en vez
//! de preservar sus lexemas.
//!
//! # Reglas importantes del lenguaje
//! - Las palabras clave son case-insensitive: tanto `while` como
//!   `WHILE` y `While` resultan en [`Keyword::While`].
//! - Los identificadores sí distinguen mayúsculas de minúsculas y
//!   deben comenzar con una letra.
//! - El operador de asignación se escribe `:=`; la grafía `:==` que
//!   aparece en material del curso se acepta como el mismo token.
//!
//! # Errores
//! El lexer es capaz de recuperarse parcialmente de condiciones de
//! error. Esto ocurre en suficiente grado como para reportar más de un
//! error por ejecución, pero no lo suficiente como para permitir el
//! avance a las demás fases de la compilación.

use crate::{
    set::TokenSet,
    source::{InputStream, Located, Location},
};

use std::{
    fmt::{self, Display},
    rc::Rc,
    str::FromStr,
};

use thiserror::Error;

// Case-insensitive
pub use unicase::Ascii as NoCase;

/// Literal entero máximo.
const INT_MAX: i32 = i32::MAX;

/// Error de escaneo.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum LexerError {
    /// Error de E/S originado por el [`InputStream`].
    #[error("I/O error")]
    Input(#[from] std::io::Error),

    /// Carácter desconocido o inesperado en el flujo de entrada.
    #[error("Bad character {0:?} in input stream")]
    BadChar(char),

    /// Se esperaba un carácter específico en esta posición.
    #[error("Expected {0:?}")]
    Expected(char),

    /// Una constante entera se encuentra fuera de rango.
    #[error("Integer literal overflow, valid range is [0, {INT_MAX}]")]
    IntOverflow,
}

/// Un identificador.
///
/// El lexema se comparte por `Rc` entre todos los usos del mismo
/// nombre, incluyendo las entradas de la tabla de símbolos.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(Rc<String>);

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Identifier {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_ref().fmt(fmt)
    }
}

/// Objeto resultante del análisis léxico.
///
/// Un token contiene suficiente información para describir
/// completamente a una entidad léxica en el programa fuente.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Identificador.
    Id(Identifier),

    /// Palabra clave.
    Keyword(Keyword),

    /// Literal de entero.
    IntLiteral(i32),

    /// `:=`
    Assign,

    /// `,`
    Comma,

    /// `;`
    Semicolon,

    /// `+`
    Plus,

    /// `-`
    Minus,

    /// `*`
    Times,

    /// `/`
    Divide,

    /// `(`
    LeftParen,

    /// `)`
    RightParen,

    /// `=`
    Equal,

    /// `<`
    Less,

    /// `<=`
    LessEqual,

    /// `>`
    Greater,

    /// `>=`
    GreaterEqual,

    /// `.`, cierre del programa completo.
    EndOfProgram,

    /// Fin de la entrada.
    ///
    /// El lexer nunca produce este token; el traductor lo sintetiza
    /// cuando el flujo se agota, de forma idempotente, para que la
    /// recuperación de errores pueda descartar tokens sin temer un
    /// fin de flujo abrupto.
    EndOfInput,
}

impl Token {
    /// Obtiene la clase de este token como conjunto unitario.
    pub fn kind(&self) -> TokenSet {
        use Token::*;

        match self {
            Id(_) => TokenSet::IDENTIFIER,
            Keyword(keyword) => keyword.kind(),
            IntLiteral(_) => TokenSet::INT_LITERAL,
            Assign => TokenSet::ASSIGN,
            Comma => TokenSet::COMMA,
            Semicolon => TokenSet::SEMICOLON,
            Plus => TokenSet::PLUS,
            Minus => TokenSet::MINUS,
            Times => TokenSet::TIMES,
            Divide => TokenSet::DIVIDE,
            LeftParen => TokenSet::LEFT_PAREN,
            RightParen => TokenSet::RIGHT_PAREN,
            Equal => TokenSet::EQUAL,
            Less => TokenSet::LESS,
            LessEqual => TokenSet::LESS_EQUAL,
            Greater => TokenSet::GREATER,
            GreaterEqual => TokenSet::GREATER_EQUAL,
            EndOfProgram => TokenSet::END_OF_PROGRAM,
            EndOfInput => TokenSet::END_OF_INPUT,
        }
    }
}

impl Display for Token {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Token::*;

        match self {
            Id(id) => write!(fmt, "identifier `{}`", id),
            Keyword(keyword) => write!(fmt, "keyword `{}`", keyword),
            IntLiteral(integer) => write!(fmt, "literal `{}`", integer),
            Assign => fmt.write_str("`:=`"),
            Comma => fmt.write_str("`,`"),
            Semicolon => fmt.write_str("`;`"),
            Plus => fmt.write_str("`+`"),
            Minus => fmt.write_str("`-`"),
            Times => fmt.write_str("`*`"),
            Divide => fmt.write_str("`/`"),
            LeftParen => fmt.write_str("`(`"),
            RightParen => fmt.write_str("`)`"),
            Equal => fmt.write_str("`=`"),
            Less => fmt.write_str("`<`"),
            LessEqual => fmt.write_str("`<=`"),
            Greater => fmt.write_str("`>`"),
            GreaterEqual => fmt.write_str("`>=`"),
            EndOfProgram => fmt.write_str("`.`"),
            EndOfInput => fmt.write_str("end of input"),
        }
    }
}

/// Una palabra clave.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Keyword {
    Program,
    Var,
    Procedure,
    Ref,
    Begin,
    End,
    While,
    Do,
    If,
    Then,
    Else,
    Read,
    Write,
}

impl Keyword {
    /// Obtiene la clase de esta palabra clave como conjunto unitario.
    pub fn kind(&self) -> TokenSet {
        use Keyword::*;

        match self {
            Program => TokenSet::PROGRAM,
            Var => TokenSet::VAR,
            Procedure => TokenSet::PROCEDURE,
            Ref => TokenSet::REF,
            Begin => TokenSet::BEGIN,
            End => TokenSet::END,
            While => TokenSet::WHILE,
            Do => TokenSet::DO,
            If => TokenSet::IF,
            Then => TokenSet::THEN,
            Else => TokenSet::ELSE,
            Read => TokenSet::READ,
            Write => TokenSet::WRITE,
        }
    }
}

impl Display for Keyword {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Keyword::*;

        let string = match self {
            Program   => "PROGRAM",
            Var       => "VAR",
            Procedure => "PROCEDURE",
            Ref       => "REF",
            Begin     => "BEGIN",
            End       => "END",
            While     => "WHILE",
            Do        => "DO",
            If        => "IF",
            Then      => "THEN",
            Else      => "ELSE",
            Read      => "READ",
            Write     => "WRITE",
        };

        fmt.write_str(string)
    }
}

impl FromStr for Keyword {
    type Err = ();

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        use Keyword::*;

        const KEYWORDS: &'static [(NoCase<&'static str>, Keyword)] = &[
            (NoCase::new("PROGRAM"),   Program),
            (NoCase::new("VAR"),       Var),
            (NoCase::new("PROCEDURE"), Procedure),
            (NoCase::new("REF"),       Ref),
            (NoCase::new("BEGIN"),     Begin),
            (NoCase::new("END"),       End),
            (NoCase::new("WHILE"),     While),
            (NoCase::new("DO"),        Do),
            (NoCase::new("IF"),        If),
            (NoCase::new("THEN"),      Then),
            (NoCase::new("ELSE"),      Else),
            (NoCase::new("READ"),      Read),
            (NoCase::new("WRITE"),     Write),
        ];

        KEYWORDS
            .iter()
            .find(|&&(name, _)| name == NoCase::new(string))
            .map(|&(_, keyword)| keyword)
            .ok_or(())
    }
}

/// Máquina de estados para análisis léxico.
///
/// Un lexer puede encontrarse en uno de diversos estados. La salida
/// del lexer, así como su siguiente estado, se define a partir de
/// tanto su estado actual como el siguiente carácter encontrado en el
/// flujo de entrada.
pub struct Lexer<S: Iterator> {
    source: std::iter::Peekable<S>,
    state: State,
    start: Location,
    next: Location,
}

/// Posibles estados del lexer.
enum State {
    /// Estado que ocurre antes de encontrar el inicio de un token.
    Start,

    /// Estado de error.
    Error,

    /// Estado de completitud; siempre emite el token incluido,
    /// consume la entrada actual y pasa a [`State::Start`].
    Complete(Token),

    /// Se encontró `:`.
    ///
    /// Debería seguir `=` para formar una asignación.
    Colon,

    /// Se encontró `:=`.
    ///
    /// Un `=` adicional se absorbe en el mismo token.
    AssignTail,

    /// Se encontró `<`, que puede extenderse a `<=`.
    Less,

    /// Se encontró `>`, que puede extenderse a `>=`.
    Greater,

    /// Constante entera.
    ///
    /// Este estado incluirá dígitos en el token mientras que el
    /// siguiente carácter sea un dígito.
    Integer(i32),

    /// Término que puede ser un identificador o una palabra clave.
    Word(String),
}

impl<S: InputStream> Lexer<S> {
    /// Crea un lexer en estado inicial a partir de un flujo.
    pub fn new(start: Location, source: S) -> Self {
        let next = start.clone();
        Lexer {
            source: source.peekable(),
            state: State::Start,
            start,
            next,
        }
    }

    /// Reduce la entrada a sea una secuencia conocida de tokens
    /// infalibles o una secuencia de errores.
    ///
    /// En caso de que ocurra al menos un error, el lexer dejará de
    /// buscar tokens exitosos y comenzará a acumular solamente
    /// errores. El propósito de esta función es permitir la
    /// recolección de múltiples errores léxicos en una misma
    /// ejecución del compilador.
    pub fn try_exhaustive(mut self) -> Result<Vec<Located<Token>>, Vec<Located<LexerError>>> {
        let mut tokens = Vec::new();

        while let Some(result) = self.next() {
            match result {
                Ok(token) => tokens.push(token),
                Err(error) => {
                    drop(tokens);

                    let mut errors = vec![error];
                    errors.extend(self.filter_map(Result::err));

                    return Err(errors);
                }
            }
        }

        Ok(tokens)
    }

    /// Intenta construir un siguiente token.
    fn lex(&mut self) -> Result<Option<(Token, Location)>, LexerError> {
        use {State::*, Token::*};

        let mut last_accepted = self.start.clone();
        let token = loop {
            // Se espera un siguiente carácter, fallando si hay error de E/S
            let next_char = match self.source.peek() {
                None => None,
                Some(Ok((c, _))) => Some(*c),
                Some(Err(_)) => break Err(self.source.next().unwrap().err().unwrap().into()),
            };

            // La posición de origen se mueve junto a la posición
            // siguiente siempre que no se haya encontrado una
            // frontera de token
            if let Start = self.state {
                self.start = self.next.clone();
            }

            // Switch table principal, determina cambios de estado
            // y de salida del lexer a partir de combinaciones del
            // estado actual y el siguiente carácter
            match (&mut self.state, next_char) {
                // Condiciones de error: se descarta la línea donde
                // ocurrió el error. Al llegar al final de la línea
                // el lexer se recupera y reinicia.
                (Error, None) => return Ok(None),
                (Error, Some('\n')) => self.state = Start,
                (Error, Some(_)) => (),

                // Tokens triviales
                (Start, None) => return Ok(None),
                (Start, Some(',')) => self.state = Complete(Comma),
                (Start, Some(';')) => self.state = Complete(Semicolon),
                (Start, Some('.')) => self.state = Complete(EndOfProgram),
                (Start, Some('(')) => self.state = Complete(LeftParen),
                (Start, Some(')')) => self.state = Complete(RightParen),
                (Start, Some('+')) => self.state = Complete(Plus),
                (Start, Some('-')) => self.state = Complete(Minus),
                (Start, Some('*')) => self.state = Complete(Times),
                (Start, Some('/')) => self.state = Complete(Divide),
                (Start, Some('=')) => self.state = Complete(Equal),
                (Start, Some('<')) => self.state = State::Less,
                (Start, Some('>')) => self.state = State::Greater,
                (Start, Some(':')) => self.state = Colon,

                // Identificadores y palabras clave
                (Start, Some(c)) if c.is_ascii_alphabetic() => self.state = Word(c.to_string()),

                // Inicio de una constante numérica. No se consume
                // el dígito, ya que esta lógica ya está implementada
                // en el respectivo caso para un estado de constante
                // entera para el cual el siguiente carácter es un
                // dígito. Por tanto, la constante es inicialmente cero.
                (Start, Some(c)) if c.is_ascii_digit() => {
                    self.state = Integer(0);
                    continue;
                }

                // Espacios en blanco y caracteres inesperados
                (Start, Some(c)) if c.is_ascii_whitespace() => (),
                (Start, Some(c)) => break Err(LexerError::BadChar(c)),

                // Emisión retardada de tokens cualesquiera
                (Complete(token), _) => break Ok(token.clone()),

                // Operadores relacionales de dos caracteres
                (State::Less, Some('=')) => self.state = Complete(LessEqual),
                (State::Less, _) => break Ok(Token::Less),
                (State::Greater, Some('=')) => self.state = Complete(GreaterEqual),
                (State::Greater, _) => break Ok(Token::Greater),

                // `:` solo existe como parte de `:=`
                (Colon, Some('=')) => self.state = AssignTail,
                (Colon, _) => break Err(LexerError::Expected('=')),

                // `:=` y `:==` producen el mismo token
                (AssignTail, Some('=')) => self.state = Complete(Assign),
                (AssignTail, _) => break Ok(Assign),

                // Acumulación dígito por dígito de constantes enteras
                (Integer(accumulated), Some(digit)) if digit.is_ascii_digit() => {
                    let digit = digit.to_digit(10).unwrap() as i32;

                    match accumulated
                        .checked_mul(10)
                        .and_then(|n| n.checked_add(digit))
                    {
                        Some(result) => *accumulated = result,
                        None => break Err(LexerError::IntOverflow),
                    }
                }

                // Si sigue algo que no es un dígito, la constante ha terminado
                (Integer(integer), _) => break Ok(IntLiteral(*integer)),

                // Extensión de términos
                (Word(word), Some(c)) if is_word_char(c) => {
                    word.push(c);
                }

                // Si sigue algo que no puede formar parte del término, ha terminado
                (Word(word), _) => {
                    if let Ok(keyword) = self::Keyword::from_str(word) {
                        break Ok(Keyword(keyword));
                    } else {
                        break Ok(Id(Identifier(Rc::new(std::mem::take(word)))));
                    }
                }
            }

            // Si no hubo `continue`, aquí se consume el carácter que
            // se observó con lookahead anteriormente
            if let Some(Ok((_, next_position))) = self.source.next() {
                last_accepted = std::mem::replace(&mut self.next, next_position);
            }
        };

        token.map(|token| Some((token, last_accepted)))
    }
}

impl<S: InputStream> Iterator for Lexer<S> {
    type Item = Result<Located<Token>, Located<LexerError>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.lex() {
            Ok(None) => None,
            Ok(Some((token, last_accepted))) => {
                self.state = State::Start;

                let location = Location::span(self.start.clone(), &last_accepted);
                Some(Ok(Located::at(token, location)))
            }

            Err(error) => {
                self.state = State::Error;
                Some(Err(Located::at(error, self.next.clone())))
            }
        }
    }
}

/// Determina si un carácter puede pertenecer a un término.
fn is_word_char(c: char) -> bool {
    c.is_ascii_alphabetic() || c.is_ascii_digit()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source;
    use assert_matches::assert_matches;
    use std::io::Cursor;

    fn tokens(text: &str) -> Vec<Token> {
        let (start, chars) = source::consume(Cursor::new(text), "<test>");
        Lexer::new(start, chars)
            .try_exhaustive()
            .expect("unexpected lexer errors")
            .into_iter()
            .map(Located::into_inner)
            .collect()
    }

    fn errors(text: &str) -> Vec<LexerError> {
        let (start, chars) = source::consume(Cursor::new(text), "<test>");
        Lexer::new(start, chars)
            .try_exhaustive()
            .expect_err("expected lexer errors")
            .into_iter()
            .map(Located::into_inner)
            .collect()
    }

    #[test]
    fn keywords_are_case_insensitive() {
        use Keyword::*;

        assert_eq!(
            tokens("PROGRAM program PrOgRaM"),
            vec![
                Token::Keyword(Program),
                Token::Keyword(Program),
                Token::Keyword(Program),
            ],
        );
    }

    #[test]
    fn identifiers_keep_their_spelling() {
        let tokens = tokens("x1 counter");
        assert_matches!(&tokens[0], Token::Id(id) if id.as_ref() == "x1");
        assert_matches!(&tokens[1], Token::Id(id) if id.as_ref() == "counter");
    }

    #[test]
    fn both_assignment_spellings_lex_the_same() {
        assert_eq!(tokens("x := 1"), tokens("x :== 1"));
    }

    #[test]
    fn relational_operators() {
        assert_eq!(
            tokens("< <= > >= ="),
            vec![
                Token::Less,
                Token::LessEqual,
                Token::Greater,
                Token::GreaterEqual,
                Token::Equal,
            ],
        );
    }

    #[test]
    fn integer_literals_check_for_overflow() {
        assert_eq!(tokens("2147483647"), vec![Token::IntLiteral(i32::MAX)]);
        assert_matches!(errors("2147483648").as_slice(), [LexerError::IntOverflow]);
    }

    #[test]
    fn a_lone_colon_is_rejected() {
        assert_matches!(errors("x : 1").as_slice(), [LexerError::Expected('=')]);
    }

    #[test]
    fn errors_discard_the_rest_of_the_line() {
        let errors = errors("x ? y\nz ? w");
        assert_matches!(
            errors.as_slice(),
            [LexerError::BadChar('?'), LexerError::BadChar('?')]
        );
    }
}
