//! Tabla de símbolos con conciencia de ámbitos.
//!
//! Cada entrada queda estampada con la profundidad de anidamiento en
//! la que fue declarada. Un mismo nombre puede sostener varias
//! entradas vivas a la vez, una por ámbito, de las cuales siempre es
//! visible la más profunda ("shadowing"). Al abandonar el cuerpo de un
//! procedimiento se destruyen en bloque todas las entradas de esa
//! profundidad, restaurando la visibilidad de las entradas exteriores
//! que hubieran quedado ocultas.
//!
//! La tabla también administra los contadores de direccionamiento: el
//! ámbito global asigna direcciones absolutas desde cero, mientras que
//! cada ámbito de procedimiento asigna offsets de marco desde uno,
//! puesto que el slot cero del marco guarda el puntero al marco
//! circundante que los saltos de anidamiento recorren.

use std::collections::HashMap;

use thiserror::Error;

use crate::{code::CodeAddr, lex::Identifier};

/// Error de declaración.
#[derive(Error, Debug)]
pub enum SymbolError {
    /// El mismo nombre ya fue declarado en el ámbito actual.
    #[error("`{0}` is already declared in this scope")]
    Redeclared(Identifier),
}

/// Clase sintáctica con la que se declara un nombre.
///
/// Las clases portadoras de dirección reciben su slot de la tabla;
/// un procedimiento trae consigo la dirección de código de su punto
/// de entrada, conocida en el momento de la declaración.
#[derive(Copy, Clone, Debug)]
pub enum Kind {
    Program,
    Global,
    Local,
    Value,
    Reference,
    Procedure(CodeAddr),
}

/// Ubicación de almacenamiento resuelta para un símbolo.
///
/// Variante cerrada: cada sitio de uso (carga, almacenamiento, paso
/// de parámetros, llamada) discrimina exhaustivamente sobre este tipo,
/// de manera que agregar una clase nueva es un cambio verificado en
/// tiempo de compilación.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Storage {
    /// El nombre del programa; no denota almacenamiento.
    Program,

    /// Variable global, dirección absoluta.
    Global { address: u32 },

    /// Variable local, offset relativo al marco.
    Local { offset: u32 },

    /// Parámetro por valor, offset relativo al marco.
    Value { offset: u32 },

    /// Parámetro por referencia; el slot contiene la dirección
    /// del objeto referido.
    Reference { offset: u32 },

    /// Procedimiento, con la dirección de su primera instrucción.
    Procedure { entry: CodeAddr },
}

/// Una entrada viva de la tabla de símbolos.
#[derive(Clone, Debug)]
pub struct Symbol {
    pub name: Identifier,
    pub depth: u16,
    pub storage: Storage,
}

/// Directorio de identificadores estampado por ámbito.
///
/// Cada nombre se asocia a una pila de entradas ordenada de exterior
/// a interior, por lo cual resolver es leer el tope y declarar es
/// apilar.
pub struct SymbolTable {
    entries: HashMap<Identifier, Vec<Symbol>>,
    scopes: Vec<u32>,
}

impl SymbolTable {
    /// Crea una tabla vacía situada en el ámbito global.
    pub fn new() -> Self {
        SymbolTable {
            entries: HashMap::new(),
            scopes: vec![0],
        }
    }

    /// Profundidad de anidamiento actual. El ámbito global es cero.
    pub fn depth(&self) -> u16 {
        (self.scopes.len() - 1) as u16
    }

    /// Cantidad de slots asignados hasta ahora en el ámbito actual.
    pub fn frame_slots(&self) -> u32 {
        let counter = *self.scopes.last().expect("scope stack is never empty");
        counter - self.first_slot()
    }

    /// Declara un nombre en el ámbito actual.
    ///
    /// Falla si el mismo nombre ya fue declarado a la profundidad
    /// actual. Una declaración a mayor profundidad que otra anterior
    /// no es un error: la nueva entrada oculta a la exterior hasta
    /// que su ámbito termine.
    pub fn declare(&mut self, name: &Identifier, kind: Kind) -> Result<Symbol, SymbolError> {
        let depth = self.depth();

        if let Some(innermost) = self.entries.get(name).and_then(|stack| stack.last()) {
            if innermost.depth == depth {
                return Err(SymbolError::Redeclared(name.clone()));
            }
        }

        let storage = match kind {
            Kind::Program => Storage::Program,
            Kind::Global => Storage::Global {
                address: self.next_slot(),
            },

            Kind::Local => Storage::Local {
                offset: self.next_slot(),
            },

            Kind::Value => Storage::Value {
                offset: self.next_slot(),
            },

            Kind::Reference => Storage::Reference {
                offset: self.next_slot(),
            },

            Kind::Procedure(entry) => Storage::Procedure { entry },
        };

        let symbol = Symbol {
            name: name.clone(),
            depth,
            storage,
        };

        self.entries
            .entry(name.clone())
            .or_default()
            .push(symbol.clone());

        Ok(symbol)
    }

    /// Resuelve un nombre a su entrada viva más interior.
    pub fn resolve(&self, name: &Identifier) -> Option<Symbol> {
        self.entries
            .get(name)
            .and_then(|stack| stack.last())
            .cloned()
    }

    /// Entra a un nuevo ámbito de procedimiento.
    pub fn enter_scope(&mut self) {
        self.scopes.push(self.first_slot_at(self.depth() + 1));
    }

    /// Abandona el ámbito actual, destruyendo todas sus entradas.
    ///
    /// Debe llamarse exactamente una vez por cuerpo de procedimiento,
    /// luego de que su bloque fue analizado por completo.
    pub fn exit_scope(&mut self) {
        debug_assert!(self.scopes.len() > 1, "attempt to exit the global scope");

        let depth = self.depth();
        self.entries.retain(|_, stack| {
            if let Some(innermost) = stack.last() {
                if innermost.depth == depth {
                    stack.pop();
                }
            }

            !stack.is_empty()
        });

        self.scopes.pop();
    }

    /// Toma el siguiente slot de direccionamiento del ámbito actual.
    fn next_slot(&mut self) -> u32 {
        let counter = self.scopes.last_mut().expect("scope stack is never empty");
        let slot = *counter;
        *counter += 1;
        slot
    }

    /// Slot inicial del ámbito actual.
    fn first_slot(&self) -> u32 {
        self.first_slot_at(self.depth())
    }

    fn first_slot_at(&self, depth: u16) -> u32 {
        if depth == 0 {
            0
        } else {
            1
        }
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        SymbolTable::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn name(text: &str) -> Identifier {
        let (start, chars) = crate::source::consume(std::io::Cursor::new(text), "<test>");
        let mut tokens = crate::lex::Lexer::new(start, chars)
            .try_exhaustive()
            .expect("identifier did not lex");

        match tokens.remove(0).into_inner() {
            crate::lex::Token::Id(id) => id,
            other => panic!("not an identifier: {}", other),
        }
    }

    #[test]
    fn shadowing_and_scope_exit() {
        let x = name("x");
        let mut table = SymbolTable::new();

        table.declare(&x, Kind::Global).unwrap();
        table.enter_scope();
        table.declare(&x, Kind::Local).unwrap();

        assert_matches!(
            table.resolve(&x),
            Some(Symbol {
                depth: 1,
                storage: Storage::Local { .. },
                ..
            })
        );

        table.exit_scope();

        assert_matches!(
            table.resolve(&x),
            Some(Symbol {
                depth: 0,
                storage: Storage::Global { .. },
                ..
            })
        );
    }

    #[test]
    fn duplicates_in_the_same_scope_are_rejected() {
        let x = name("x");
        let mut table = SymbolTable::new();

        assert_matches!(table.declare(&x, Kind::Global), Ok(_));
        assert_matches!(
            table.declare(&x, Kind::Global),
            Err(SymbolError::Redeclared(_))
        );
    }

    #[test]
    fn unresolved_names_are_undeclared() {
        let mut table = SymbolTable::new();
        assert_matches!(table.resolve(&name("ghost")), None);

        table.enter_scope();
        table.declare(&name("alive"), Kind::Local).unwrap();
        table.exit_scope();

        assert_matches!(table.resolve(&name("alive")), None);
    }

    #[test]
    fn global_addresses_count_from_zero() {
        let mut table = SymbolTable::new();

        let first = table.declare(&name("a"), Kind::Global).unwrap();
        let second = table.declare(&name("b"), Kind::Global).unwrap();

        assert_eq!(first.storage, Storage::Global { address: 0 });
        assert_eq!(second.storage, Storage::Global { address: 1 });
    }

    #[test]
    fn frame_offsets_count_from_one_per_scope() {
        let mut table = SymbolTable::new();
        table.enter_scope();

        let param = table.declare(&name("p"), Kind::Value).unwrap();
        let by_ref = table.declare(&name("r"), Kind::Reference).unwrap();
        let local = table.declare(&name("v"), Kind::Local).unwrap();

        assert_eq!(param.storage, Storage::Value { offset: 1 });
        assert_eq!(by_ref.storage, Storage::Reference { offset: 2 });
        assert_eq!(local.storage, Storage::Local { offset: 3 });
        assert_eq!(table.frame_slots(), 3);

        // Un ámbito anidado comienza su propio conteo
        table.enter_scope();
        let inner = table.declare(&name("w"), Kind::Local).unwrap();
        assert_eq!(inner.storage, Storage::Local { offset: 1 });
        assert_eq!(table.frame_slots(), 1);
    }

    #[test]
    fn program_and_procedures_carry_no_data_address() {
        let mut table = SymbolTable::new();

        let program = table.declare(&name("main"), Kind::Program).unwrap();
        assert_eq!(program.storage, Storage::Program);

        let entry = crate::code::CodeBuffer::new().current_address();
        let procedure = table.declare(&name("p"), Kind::Procedure(entry)).unwrap();
        assert_eq!(procedure.storage, Storage::Procedure { entry });

        // Ninguno de los dos consume slots de direccionamiento
        assert_eq!(table.frame_slots(), 0);
    }
}
