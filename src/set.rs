//! Conjuntos de clases de token.
//!
//! La recuperación de errores por sincronización necesita probar
//! pertenencia y unir conjuntos de clases de token de forma barata.
//! Como las clases son pocas y fijas, un conjunto cabe en una palabra
//! de bits. Estos conjuntos se construyen una única vez al iniciar la
//! traducción y nunca se mutan durante el análisis normal.

use bitflags::bitflags;
use std::fmt::{self, Display};

bitflags! {
    /// Un conjunto finito de clases de token.
    ///
    /// Un token individual se proyecta a su conjunto unitario mediante
    /// [`Token::kind()`](crate::lex::Token::kind), de manera que la
    /// pertenencia se reduce a [`TokenSet::contains()`].
    pub struct TokenSet: u32 {
        const IDENTIFIER     = 1 << 0;
        const INT_LITERAL    = 1 << 1;
        const PROGRAM        = 1 << 2;
        const VAR            = 1 << 3;
        const PROCEDURE      = 1 << 4;
        const REF            = 1 << 5;
        const BEGIN          = 1 << 6;
        const END            = 1 << 7;
        const WHILE          = 1 << 8;
        const DO             = 1 << 9;
        const IF             = 1 << 10;
        const THEN           = 1 << 11;
        const ELSE           = 1 << 12;
        const READ           = 1 << 13;
        const WRITE          = 1 << 14;
        const ASSIGN         = 1 << 15;
        const COMMA          = 1 << 16;
        const SEMICOLON      = 1 << 17;
        const PLUS           = 1 << 18;
        const MINUS          = 1 << 19;
        const TIMES          = 1 << 20;
        const DIVIDE         = 1 << 21;
        const LEFT_PAREN     = 1 << 22;
        const RIGHT_PAREN    = 1 << 23;
        const EQUAL          = 1 << 24;
        const LESS           = 1 << 25;
        const LESS_EQUAL     = 1 << 26;
        const GREATER        = 1 << 27;
        const GREATER_EQUAL  = 1 << 28;
        const END_OF_PROGRAM = 1 << 29;
        const END_OF_INPUT   = 1 << 30;
    }
}

/// Nombre legible de cada clase, en el orden de declaración.
const DESCRIPTIONS: &[(TokenSet, &str)] = &[
    (TokenSet::IDENTIFIER, "an identifier"),
    (TokenSet::INT_LITERAL, "an integer literal"),
    (TokenSet::PROGRAM, "`PROGRAM`"),
    (TokenSet::VAR, "`VAR`"),
    (TokenSet::PROCEDURE, "`PROCEDURE`"),
    (TokenSet::REF, "`REF`"),
    (TokenSet::BEGIN, "`BEGIN`"),
    (TokenSet::END, "`END`"),
    (TokenSet::WHILE, "`WHILE`"),
    (TokenSet::DO, "`DO`"),
    (TokenSet::IF, "`IF`"),
    (TokenSet::THEN, "`THEN`"),
    (TokenSet::ELSE, "`ELSE`"),
    (TokenSet::READ, "`READ`"),
    (TokenSet::WRITE, "`WRITE`"),
    (TokenSet::ASSIGN, "`:=`"),
    (TokenSet::COMMA, "`,`"),
    (TokenSet::SEMICOLON, "`;`"),
    (TokenSet::PLUS, "`+`"),
    (TokenSet::MINUS, "`-`"),
    (TokenSet::TIMES, "`*`"),
    (TokenSet::DIVIDE, "`/`"),
    (TokenSet::LEFT_PAREN, "`(`"),
    (TokenSet::RIGHT_PAREN, "`)`"),
    (TokenSet::EQUAL, "`=`"),
    (TokenSet::LESS, "`<`"),
    (TokenSet::LESS_EQUAL, "`<=`"),
    (TokenSet::GREATER, "`>`"),
    (TokenSet::GREATER_EQUAL, "`>=`"),
    (TokenSet::END_OF_PROGRAM, "`.`"),
    (TokenSet::END_OF_INPUT, "end of input"),
];

impl Display for TokenSet {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut members = DESCRIPTIONS
            .iter()
            .filter(|(member, _)| self.contains(*member));

        match members.next() {
            None => fmt.write_str("nothing"),
            Some((_, first)) => {
                fmt.write_str(first)?;
                for (_, name) in members {
                    write!(fmt, ", {}", name)?;
                }

                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_and_membership() {
        let first = TokenSet::VAR | TokenSet::PROCEDURE | TokenSet::BEGIN;
        let beacons = TokenSet::END | TokenSet::END_OF_INPUT;

        assert!(first.contains(TokenSet::VAR));
        assert!(!first.contains(TokenSet::END));
        assert!((first | beacons).contains(TokenSet::END));
    }

    #[test]
    fn display_lists_all_members() {
        let set = TokenSet::VAR | TokenSet::PROCEDURE | TokenSet::BEGIN;
        assert_eq!(set.to_string(), "`VAR`, `PROCEDURE`, `BEGIN`");

        assert_eq!(TokenSet::SEMICOLON.to_string(), "`;`");
        assert_eq!(TokenSet::empty().to_string(), "nothing");
    }
}
