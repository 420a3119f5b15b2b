//! Análisis sintáctico y traducción en un solo paso.
//!
//! # Descenso recursivo con emisión inmediata
//! Cada producción de la gramática tiene su propio método. Reconocer
//! una producción tiene como consecuencia directa una mutación de la
//! tabla de símbolos, una emisión de instrucciones, o una acción de
//! resincronización; no existe un árbol sintáctico intermedio. El
//! traductor sostiene exactamente un token de lookahead y nunca
//! retrocede.
//!
//! # Recuperación de errores
//! Un token inesperado en [`Parser::accept()`] reporta el error y pone
//! al traductor en estado de recuperación: las llamadas siguientes a
//! `accept` descartan tokens en silencio hasta encontrar el esperado o
//! agotar la entrada. Al inicio de cada constructo repetible
//! (declaraciones, procedimientos, sentencias) se invoca además
//! [`Parser::synchronise()`] con un conjunto de arranques válidos y un
//! conjunto de balizas que acota cuánto se permite descartar. Ningún
//! error sintáctico aborta la corrida.
//!
//! # Errores semánticos
//! Redeclarar un nombre, usar un nombre sin declarar o llamar algo que
//! no es un procedimiento dejan al generador de código sin información
//! utilizable, por lo cual la emisión se abandona para el resto de la
//! corrida; el análisis sintáctico continúa para reportar todos los
//! diagnósticos en una sola ejecución.

use std::iter::Fuse;

use thiserror::Error;

use crate::{
    code::{Code, CodeBuffer, Instruction, Target},
    lex::{Identifier, Keyword, Token},
    set::TokenSet,
    source::{Located, Location},
    symbol::{self, Storage, Symbol, SymbolError, SymbolTable},
};

/// Error de traducción.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TranslationError {
    /// El lookahead no es el token que la gramática exige aquí.
    #[error("Expected {0}, found {1} instead")]
    UnexpectedToken(TokenSet, Token),

    /// El lookahead no puede comenzar el siguiente elemento de una
    /// lista repetible.
    #[error("Expected one of {0}, found {1} instead")]
    Desynchronized(TokenSet, Token),

    /// El mismo nombre fue declarado dos veces a la misma profundidad.
    #[error("`{0}` is already declared in this scope")]
    Redeclared(Identifier),

    /// Un nombre usado no tiene entrada viva en la tabla de símbolos.
    #[error("`{0}` has not been declared")]
    Undeclared(Identifier),

    /// Se aplicó sintaxis de llamada a algo que no es un procedimiento.
    #[error("`{0}` is not a procedure")]
    NotAProcedure(Identifier),

    /// El contexto exige una variable o parámetro.
    #[error("Expected a variable, found `{0}`")]
    ExpectedVariable(Identifier),
}

/// Veredicto global de una corrida.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// No se detectó ningún error.
    Valid,

    /// Se detectó al menos un error, sintáctico o semántico.
    Invalid,
}

/// Resultado de traducir un programa completo.
///
/// La corrida siempre llega hasta el final de la entrada: `errors`
/// acumula cada diagnóstico en orden de descubrimiento y `code` está
/// presente salvo que la generación haya sido abandonada por un error
/// semántico.
pub struct Translation {
    pub verdict: Verdict,
    pub errors: Vec<Located<TranslationError>>,
    pub code: Option<Code>,
}

/// Traduce un flujo de tokens a un listado de instrucciones.
///
/// `start` es la ubicación del inicio de la entrada, utilizada para
/// sintetizar el token de fin cuando el flujo resulta vacío.
pub fn translate<I>(tokens: I, start: Location) -> Translation
where
    I: IntoIterator<Item = Located<Token>>,
{
    let mut parser = Parser::new(tokens.into_iter(), start);
    parser.program();
    parser.finish()
}

/// Conjuntos de sincronización, calculados una única vez.
///
/// Los conjuntos "first" están aumentados con el token que cierra
/// legalmente la lista respectiva; las balizas son tokens seguros más
/// exteriores que acotan el descarte. El fin de entrada pertenece a
/// toda baliza, lo cual garantiza que la recuperación termina.
struct SyncSets {
    declaration_first: TokenSet,
    procedure_first: TokenSet,
    procedure_beacons: TokenSet,
    statement_first: TokenSet,
    statement_beacons: TokenSet,
    statement_dispatch: TokenSet,
    relation_ops: TokenSet,
}

impl SyncSets {
    fn new() -> Self {
        let statement_dispatch = TokenSet::IDENTIFIER
            | TokenSet::WHILE
            | TokenSet::IF
            | TokenSet::READ
            | TokenSet::WRITE;

        SyncSets {
            declaration_first: TokenSet::VAR | TokenSet::PROCEDURE | TokenSet::BEGIN,
            procedure_first: TokenSet::PROCEDURE | TokenSet::BEGIN,
            procedure_beacons: TokenSet::END | TokenSet::END_OF_PROGRAM | TokenSet::END_OF_INPUT,
            statement_first: statement_dispatch | TokenSet::END,
            statement_beacons: TokenSet::SEMICOLON
                | TokenSet::ELSE
                | TokenSet::END_OF_PROGRAM
                | TokenSet::END_OF_INPUT,
            statement_dispatch,
            relation_ops: TokenSet::EQUAL
                | TokenSet::LESS
                | TokenSet::LESS_EQUAL
                | TokenSet::GREATER
                | TokenSet::GREATER_EQUAL,
        }
    }
}

/// Estado completo del traductor.
///
/// Todo el estado mutable de la corrida (lookahead, bandera de
/// recuperación, tabla de símbolos, buffer de emisión, diagnósticos)
/// vive aquí; no hay estado ambiente.
struct Parser<I: Iterator<Item = Located<Token>>> {
    tokens: Fuse<I>,
    lookahead: Located<Token>,
    recovering: bool,
    errors: Vec<Located<TranslationError>>,
    symbols: SymbolTable,
    code: CodeBuffer,
    sets: SyncSets,
}

impl<I: Iterator<Item = Located<Token>>> Parser<I> {
    fn new(tokens: I, start: Location) -> Self {
        let mut tokens = tokens.fuse();
        let lookahead = tokens
            .next()
            .unwrap_or_else(|| Located::at(Token::EndOfInput, start));

        Parser {
            tokens,
            lookahead,
            recovering: false,
            errors: Vec::new(),
            symbols: SymbolTable::new(),
            code: CodeBuffer::new(),
            sets: SyncSets::new(),
        }
    }

    fn finish(self) -> Translation {
        let verdict = if self.errors.is_empty() {
            Verdict::Valid
        } else {
            Verdict::Invalid
        };

        Translation {
            verdict,
            errors: self.errors,
            code: self.code.finalize(),
        }
    }

    // ===== Producciones de la gramática =====

    /// `Program ::= "PROGRAM" Identifier ";" {Declarations}
    ///              {ProcDeclaration} Block "."`
    fn program(&mut self) {
        self.accept(TokenSet::PROGRAM);
        self.declare_current(symbol::Kind::Program);
        self.accept(TokenSet::IDENTIFIER);
        self.accept(TokenSet::SEMICOLON);

        self.synchronise(self.sets.declaration_first, self.sets.procedure_beacons);
        while self.at(TokenSet::VAR) {
            self.declarations(symbol::Kind::Global);
        }

        self.synchronise(self.sets.procedure_first, self.sets.procedure_beacons);
        while self.at(TokenSet::PROCEDURE) {
            self.procedure_declaration();
            self.synchronise(self.sets.declaration_first, self.sets.procedure_beacons);
        }

        self.block();
        self.code.emit(Instruction::Halt);
        self.accept(TokenSet::END_OF_PROGRAM);
    }

    /// `Declarations ::= "VAR" Identifier {"," Identifier} ";"`
    ///
    /// La misma producción declara globales en el ámbito del programa
    /// y locales dentro de un procedimiento; la clase la decide el
    /// llamador.
    fn declarations(&mut self, kind: symbol::Kind) {
        self.accept(TokenSet::VAR);

        self.declare_current(kind);
        self.accept(TokenSet::IDENTIFIER);
        while self.at(TokenSet::COMMA) {
            self.accept(TokenSet::COMMA);
            self.declare_current(kind);
            self.accept(TokenSet::IDENTIFIER);
        }

        self.accept(TokenSet::SEMICOLON);
    }

    /// `ProcDeclaration ::= "PROCEDURE" Identifier [ParameterList] ";"
    ///                      {Declarations} {ProcDeclaration} Block ";"`
    ///
    /// El flujo lineal de instrucciones no debe caer dentro del cuerpo
    /// del procedimiento, por lo cual aquí se emite un salto hacia
    /// adelante cuyo destino se resuelve por backpatch al conocer el
    /// final del cuerpo. La dirección inmediatamente posterior al
    /// salto es el punto de entrada del procedimiento.
    fn procedure_declaration(&mut self) {
        self.accept(TokenSet::PROCEDURE);

        let name = match self.lookahead.val() {
            Token::Id(name) => Some(Located::at(name.clone(), self.lookahead.location().clone())),
            _ => None,
        };

        self.accept(TokenSet::IDENTIFIER);

        let skip = self.code.emit(Instruction::Branch(Target::Unresolved));
        let entry = self.code.current_address();

        if let Some(name) = name {
            let (location, name) = name.split();
            if let Err(SymbolError::Redeclared(name)) =
                self.symbols.declare(&name, symbol::Kind::Procedure(entry))
            {
                self.errors
                    .push(Located::at(TranslationError::Redeclared(name), location));
                self.code.abandon();
            }
        }

        self.symbols.enter_scope();

        if self.at(TokenSet::LEFT_PAREN) {
            self.parameter_list();
        }

        self.accept(TokenSet::SEMICOLON);

        self.synchronise(self.sets.declaration_first, self.sets.procedure_beacons);
        while self.at(TokenSet::VAR) {
            self.declarations(symbol::Kind::Local);
        }

        // Al terminar las declaraciones se conoce el tamaño del marco;
        // los procedimientos anidados llevan contadores propios
        let slots = self.symbols.frame_slots();
        if slots > 0 {
            self.code.emit(Instruction::GrowFrame(slots));
        }

        self.synchronise(self.sets.procedure_first, self.sets.procedure_beacons);
        while self.at(TokenSet::PROCEDURE) {
            self.procedure_declaration();
            self.synchronise(self.sets.procedure_first, self.sets.procedure_beacons);
        }

        self.block();
        self.accept(TokenSet::SEMICOLON);

        if slots > 0 {
            self.code.emit(Instruction::ShrinkFrame(slots));
        }

        self.code.emit(Instruction::Return);
        self.code.backpatch(skip, self.code.current_address());
        self.symbols.exit_scope();
    }

    /// `ParameterList ::= "(" FormalParameter {"," FormalParameter} ")"`
    fn parameter_list(&mut self) {
        self.accept(TokenSet::LEFT_PAREN);

        self.formal_parameter();
        while self.at(TokenSet::COMMA) {
            self.accept(TokenSet::COMMA);
            self.formal_parameter();
        }

        self.accept(TokenSet::RIGHT_PAREN);
    }

    /// `FormalParameter ::= ["REF"] Identifier`
    fn formal_parameter(&mut self) {
        if self.at(TokenSet::REF) {
            self.accept(TokenSet::REF);
            self.declare_current(symbol::Kind::Reference);
        } else {
            self.declare_current(symbol::Kind::Value);
        }

        self.accept(TokenSet::IDENTIFIER);
    }

    /// `Block ::= "BEGIN" [Statement {";" Statement} [";"]] "END"`
    ///
    /// El punto y coma separa sentencias; antes de `END` es opcional.
    fn block(&mut self) {
        self.accept(TokenSet::BEGIN);

        self.synchronise(self.sets.statement_first, self.sets.statement_beacons);
        while self.at(self.sets.statement_dispatch) {
            self.statement();

            if self.at(TokenSet::END) {
                break;
            }

            self.accept(TokenSet::SEMICOLON);
            self.synchronise(self.sets.statement_first, self.sets.statement_beacons);
        }

        self.accept(TokenSet::END);
    }

    /// `Statement ::= SimpleStatement | WhileStatement | IfStatement
    ///              | ReadStatement | WriteStatement | ε`
    ///
    /// La elección se decide con un único token de lookahead.
    fn statement(&mut self) {
        match self.lookahead.val() {
            Token::Id(_) => self.simple_statement(),
            Token::Keyword(Keyword::While) => self.while_statement(),
            Token::Keyword(Keyword::If) => self.if_statement(),
            Token::Keyword(Keyword::Read) => self.read_statement(),
            Token::Keyword(Keyword::Write) => self.write_statement(),
            _ => (),
        }
    }

    /// `SimpleStatement ::= Identifier RestOfStatement`
    fn simple_statement(&mut self) {
        let target = self.lookup_current();
        self.accept(TokenSet::IDENTIFIER);
        self.rest_of_statement(target);
    }

    /// `RestOfStatement ::= CallList | Assignment | ε`
    ///
    /// Un nombre en posición de sentencia se desambigua recién aquí:
    /// con lista entre paréntesis es una llamada, seguido de `;` es
    /// una llamada sin argumentos, y en cualquier otro caso una
    /// asignación.
    fn rest_of_statement(&mut self, target: Option<Symbol>) {
        if self.at(TokenSet::LEFT_PAREN) {
            self.call_list();
            self.call(target);
        } else if self.at(TokenSet::SEMICOLON) {
            self.call(target);
        } else {
            self.assignment(target);
        }
    }

    /// `CallList ::= "(" ActualParameter {"," ActualParameter} ")"`
    fn call_list(&mut self) {
        self.accept(TokenSet::LEFT_PAREN);

        self.actual_parameter();
        while self.at(TokenSet::COMMA) {
            self.accept(TokenSet::COMMA);
            self.actual_parameter();
        }

        self.accept(TokenSet::RIGHT_PAREN);
    }

    /// `ActualParameter ::= Expression`
    fn actual_parameter(&mut self) {
        self.expression();
    }

    /// Convención de llamada: los argumentos ya fueron empujados por
    /// [`Parser::call_list()`]; sigue preservar el puntero de marco
    /// del llamador, marcar la pila para el marco nuevo, saltar al
    /// punto de entrada y restaurar la marca al volver.
    fn call(&mut self, target: Option<Symbol>) {
        match target {
            Some(Symbol {
                storage: Storage::Procedure { entry },
                ..
            }) => {
                self.code.emit(Instruction::PushFp);
                self.code.emit(Instruction::EnterFrame);
                self.code.emit(Instruction::Call(entry));
                self.code.emit(Instruction::LeaveFrame);
            }

            Some(symbol) => {
                self.report_fatal(TranslationError::NotAProcedure(symbol.name));
            }

            // El nombre no resolvió; el error ya fue reportado
            None => (),
        }
    }

    /// `Assignment ::= ":=" Expression`
    fn assignment(&mut self, target: Option<Symbol>) {
        self.accept(TokenSet::ASSIGN);
        self.expression();

        if let Some(symbol) = target {
            self.store(&symbol);
        }
    }

    /// `WhileStatement ::= "WHILE" BooleanExpression "DO" Block`
    fn while_statement(&mut self) {
        self.accept(TokenSet::WHILE);
        self.boolean_expression();
        self.accept(TokenSet::DO);
        self.block();
    }

    /// `IfStatement ::= "IF" BooleanExpression "THEN" Block
    ///                  ["ELSE" Block]`
    fn if_statement(&mut self) {
        self.accept(TokenSet::IF);
        self.boolean_expression();
        self.accept(TokenSet::THEN);
        self.block();

        if self.at(TokenSet::ELSE) {
            self.accept(TokenSet::ELSE);
            self.block();
        }
    }

    /// `ReadStatement ::= "READ" "(" Identifier {"," Identifier} ")"`
    ///
    /// Cada lectura empuja un valor que se almacena de inmediato en la
    /// variable respectiva, con el mismo mecanismo que una asignación.
    fn read_statement(&mut self) {
        self.accept(TokenSet::READ);
        self.accept(TokenSet::LEFT_PAREN);

        self.read_target();
        while self.at(TokenSet::COMMA) {
            self.accept(TokenSet::COMMA);
            self.read_target();
        }

        self.accept(TokenSet::RIGHT_PAREN);
    }

    fn read_target(&mut self) {
        let target = self.lookup_current();
        self.accept(TokenSet::IDENTIFIER);

        self.code.emit(Instruction::Read);
        if let Some(symbol) = target {
            self.store(&symbol);
        }
    }

    /// `WriteStatement ::= "WRITE" "(" Expression {"," Expression} ")"`
    fn write_statement(&mut self) {
        self.accept(TokenSet::WRITE);
        self.accept(TokenSet::LEFT_PAREN);

        self.expression();
        self.code.emit(Instruction::Write);
        while self.at(TokenSet::COMMA) {
            self.accept(TokenSet::COMMA);
            self.expression();
            self.code.emit(Instruction::Write);
        }

        self.accept(TokenSet::RIGHT_PAREN);
    }

    /// `Expression ::= CompoundTerm {("+"|"-") CompoundTerm}`
    ///
    /// La instrucción aritmética se emite luego de traducir el operando
    /// derecho, con lo cual ambos operandos quedan en la pila en el
    /// orden que la máquina espera.
    fn expression(&mut self) {
        self.compound_term();

        loop {
            let operation = match self.lookahead.val() {
                Token::Plus => Instruction::Add,
                Token::Minus => Instruction::Sub,
                _ => break,
            };

            let kind = self.lookahead.val().kind();
            self.accept(kind);
            self.compound_term();
            self.code.emit(operation);
        }
    }

    /// `CompoundTerm ::= Term {("*"|"/") Term}`
    fn compound_term(&mut self) {
        self.term();

        loop {
            let operation = match self.lookahead.val() {
                Token::Times => Instruction::Mul,
                Token::Divide => Instruction::Div,
                _ => break,
            };

            let kind = self.lookahead.val().kind();
            self.accept(kind);
            self.term();
            self.code.emit(operation);
        }
    }

    /// `Term ::= ["-"] SubTerm`
    fn term(&mut self) {
        let negate = self.at(TokenSet::MINUS);
        if negate {
            self.accept(TokenSet::MINUS);
        }

        self.sub_term();
        if negate {
            self.code.emit(Instruction::Neg);
        }
    }

    /// `SubTerm ::= Identifier | IntConst | "(" Expression ")"`
    fn sub_term(&mut self) {
        match self.lookahead.val().clone() {
            Token::IntLiteral(value) => {
                self.code.emit(Instruction::LoadConst(value));
                self.accept(TokenSet::INT_LITERAL);
            }

            Token::LeftParen => {
                self.accept(TokenSet::LEFT_PAREN);
                self.expression();
                self.accept(TokenSet::RIGHT_PAREN);
            }

            _ => {
                if let Some(symbol) = self.lookup_current() {
                    self.load(&symbol);
                }

                self.accept(TokenSet::IDENTIFIER);
            }
        }
    }

    /// `BooleanExpression ::= Expression RelOp Expression`
    fn boolean_expression(&mut self) {
        self.expression();
        self.relational_operator();
        self.expression();
    }

    /// `RelOp ::= "=" | "<=" | ">=" | "<" | ">"`
    fn relational_operator(&mut self) {
        let kind = self.lookahead.val().kind();
        if self.sets.relation_ops.contains(kind) {
            self.accept(kind);
        }
    }

    // ===== Direccionamiento =====

    /// Emite la carga del valor de un símbolo.
    ///
    /// La distancia estática de anidamiento decide el modo: cero
    /// significa el marco en ejecución, mientras que una distancia
    /// mayor exige seguir esa cantidad de punteros de marco guardados
    /// antes de aplicar el offset. Un parámetro por referencia agrega
    /// un nivel de indirección tras resolver su slot, sin importar la
    /// distancia.
    fn load(&mut self, symbol: &Symbol) {
        let hops = self.symbols.depth() - symbol.depth;

        match symbol.storage {
            Storage::Global { address } => {
                self.code.emit(Instruction::LoadGlobal(address));
            }

            Storage::Local { offset } | Storage::Value { offset } => {
                if hops == 0 {
                    self.code.emit(Instruction::LoadFrame(offset));
                } else {
                    self.hop_chain(hops);
                    self.code.emit(Instruction::LoadIndirect(offset));
                }
            }

            Storage::Reference { offset } => {
                if hops == 0 {
                    self.code.emit(Instruction::LoadFrame(offset));
                } else {
                    self.hop_chain(hops);
                    self.code.emit(Instruction::LoadIndirect(offset));
                }

                self.code.emit(Instruction::LoadIndirect(0));
            }

            Storage::Program | Storage::Procedure { .. } => {
                self.report_fatal(TranslationError::ExpectedVariable(symbol.name.clone()));
            }
        }
    }

    /// Emite el almacenamiento del tope de la pila en un símbolo.
    ///
    /// Mismo esquema de direccionamiento que [`Parser::load()`]; para
    /// un parámetro por referencia se empuja primero la dirección
    /// guardada en su slot y se almacena a través de ella.
    fn store(&mut self, symbol: &Symbol) {
        let hops = self.symbols.depth() - symbol.depth;

        match symbol.storage {
            Storage::Global { address } => {
                self.code.emit(Instruction::StoreGlobal(address));
            }

            Storage::Local { offset } | Storage::Value { offset } => {
                if hops == 0 {
                    self.code.emit(Instruction::StoreFrame(offset));
                } else {
                    self.hop_chain(hops);
                    self.code.emit(Instruction::StoreIndirect(offset));
                }
            }

            Storage::Reference { offset } => {
                if hops == 0 {
                    self.code.emit(Instruction::LoadFrame(offset));
                } else {
                    self.hop_chain(hops);
                    self.code.emit(Instruction::LoadIndirect(offset));
                }

                self.code.emit(Instruction::StoreIndirect(0));
            }

            Storage::Program | Storage::Procedure { .. } => {
                self.report_fatal(TranslationError::ExpectedVariable(symbol.name.clone()));
            }
        }
    }

    /// Sigue `hops` punteros de marco guardados, dejando en la pila la
    /// dirección del marco donde reside el símbolo.
    fn hop_chain(&mut self, hops: u16) {
        self.code.emit(Instruction::PushFp);
        for _ in 0..hops {
            self.code.emit(Instruction::LoadIndirect(0));
        }
    }

    // ===== Soporte =====

    /// Indica si el lookahead pertenece al conjunto dado.
    fn at(&self, set: TokenSet) -> bool {
        set.contains(self.lookahead.val().kind())
    }

    /// Avanza el lookahead.
    ///
    /// Una vez agotado el flujo se sintetiza el token de fin de
    /// entrada indefinidamente, de forma que la recuperación de
    /// errores pueda descartar tokens sin condición de borde.
    fn advance(&mut self) {
        let location = self.lookahead.location().clone();
        self.lookahead = match self.tokens.next() {
            Some(token) => token,
            None => Located::at(Token::EndOfInput, location),
        };
    }

    /// Exige que el lookahead sea de la clase esperada.
    ///
    /// En estado de recuperación primero se descartan tokens hasta
    /// encontrar la clase esperada o el fin de la entrada. Si tras
    /// ello el lookahead no coincide, se reporta el error y se entra
    /// (o se permanece) en estado de recuperación.
    fn accept(&mut self, expected: TokenSet) {
        if self.recovering {
            while !self.at(expected) && !self.at(TokenSet::END_OF_INPUT) {
                self.advance();
            }

            self.recovering = false;
        }

        if self.at(expected) {
            self.advance();
        } else {
            let found = self.lookahead.val().clone();
            self.report(TranslationError::UnexpectedToken(expected, found));
            self.recovering = true;
        }
    }

    /// Resincroniza el lookahead con el inicio de una lista repetible.
    ///
    /// Si el lookahead no puede comenzar (ni cerrar) la lista, se
    /// reporta el error y se descarta la entrada hasta alcanzar un
    /// token del conjunto aumentado o una baliza. Las balizas siempre
    /// incluyen el fin de la entrada, por lo cual el descarte termina.
    fn synchronise(&mut self, first: TokenSet, beacons: TokenSet) {
        if !self.at(first) {
            let found = self.lookahead.val().clone();
            self.report(TranslationError::Desynchronized(first, found));

            while !self.at(first | beacons) {
                self.advance();
            }
        }
    }

    /// Declara el identificador en el lookahead, si lo hay.
    ///
    /// Con un lookahead que no es identificador no se hace nada; el
    /// `accept` que sigue en el llamador reportará el error
    /// sintáctico. Una redeclaración es fatal para la generación de
    /// código.
    fn declare_current(&mut self, kind: symbol::Kind) {
        let name = match self.lookahead.val() {
            Token::Id(name) => name.clone(),
            _ => return,
        };

        if let Err(SymbolError::Redeclared(name)) = self.symbols.declare(&name, kind) {
            self.report_fatal(TranslationError::Redeclared(name));
        }
    }

    /// Resuelve el identificador en el lookahead, si lo hay.
    ///
    /// Un identificador sin entrada viva es un error fatal para la
    /// generación de código.
    fn lookup_current(&mut self) -> Option<Symbol> {
        let name = match self.lookahead.val() {
            Token::Id(name) => name.clone(),
            _ => return None,
        };

        match self.symbols.resolve(&name) {
            Some(symbol) => Some(symbol),
            None => {
                self.report_fatal(TranslationError::Undeclared(name));
                None
            }
        }
    }

    /// Reporta un error en la ubicación del lookahead.
    fn report(&mut self, error: TranslationError) {
        let location = self.lookahead.location().clone();
        self.errors.push(Located::at(error, location));
    }

    /// Reporta un error y abandona la generación de código.
    fn report_fatal(&mut self, error: TranslationError) {
        self.report(error);
        self.code.abandon();
    }
}
