//! Emisión de instrucciones para la máquina virtual de pila.
//!
//! El traductor no construye representaciones intermedias: cada
//! decisión sintáctica empuja instrucciones directamente a un
//! [`CodeBuffer`]. El buffer es una secuencia lineal direccionada por
//! posición, con soporte para reescribir ("backpatch") el operando de
//! un salto ya emitido una vez que su destino real se conoce. Esto es
//! necesario porque el salto que brinca el cuerpo de un procedimiento
//! se emite en el momento de la declaración, cuando la longitud del
//! cuerpo todavía no se conoce.
//!
//! Al finalizar, el listado se serializa como texto con los
//! mnemónicos que la máquina de ejecución externa consume.

use std::fmt::{self, Display};

/// Dirección de una instrucción dentro del listado.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CodeAddr(u32);

impl CodeAddr {
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl Display for CodeAddr {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(fmt)
    }
}

/// Destino de un salto.
///
/// Un salto hacia adelante se emite con un destino pendiente, el cual
/// debe resolverse por backpatch antes de finalizar el listado.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Target {
    Unresolved,
    Resolved(CodeAddr),
}

/// Una instrucción de la máquina de pila.
///
/// El operando, cuando existe, viaja dentro de la variante. Los
/// accesos indirectos con offset cero sirven tanto para seguir un
/// salto de anidamiento (el slot cero de cada marco guarda el puntero
/// al marco circundante) como para desreferenciar un parámetro por
/// referencia.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    /// Empuja una constante.
    LoadConst(i32),

    /// Carga desde una dirección absoluta.
    LoadGlobal(u32),

    /// Almacena en una dirección absoluta.
    StoreGlobal(u32),

    /// Carga desde un offset del marco actual.
    LoadFrame(u32),

    /// Almacena en un offset del marco actual.
    StoreFrame(u32),

    /// Reemplaza la dirección en el tope por el valor en
    /// `memoria[dirección + offset]`.
    LoadIndirect(u32),

    /// Consume una dirección y un valor, y almacena el valor en
    /// `memoria[dirección + offset]`.
    StoreIndirect(u32),

    /// Empuja el puntero de marco actual.
    PushFp,

    Add,
    Sub,
    Mul,
    Div,
    Neg,

    /// Salto incondicional; la única instrucción sujeta a backpatch.
    Branch(Target),

    /// Llamada a la dirección de entrada de un procedimiento.
    Call(CodeAddr),

    /// Retorno al llamador.
    Return,

    /// Marca la pila como inicio del marco nuevo.
    EnterFrame,

    /// Restaura la marca de marco del llamador.
    LeaveFrame,

    /// Reserva `n` slots de marco para locales y parámetros.
    GrowFrame(u32),

    /// Libera los slots reservados por [`Instruction::GrowFrame`].
    ShrinkFrame(u32),

    /// Lee un entero del canal de entrada y lo empuja.
    Read,

    /// Consume el tope y lo escribe al canal de salida.
    Write,

    Halt,
}

impl Display for Instruction {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instruction::*;

        match self {
            LoadConst(value) => write!(fmt, "{:8}{}", "LOADI", value),
            LoadGlobal(address) => write!(fmt, "{:8}{}", "LOADA", address),
            StoreGlobal(address) => write!(fmt, "{:8}{}", "STOREA", address),
            LoadFrame(offset) => write!(fmt, "{:8}{}", "LOADFP", offset),
            StoreFrame(offset) => write!(fmt, "{:8}{}", "STOREFP", offset),
            LoadIndirect(offset) => write!(fmt, "{:8}{}", "LOADSP", offset),
            StoreIndirect(offset) => write!(fmt, "{:8}{}", "STORESP", offset),
            PushFp => fmt.write_str("PUSHFP"),
            Add => fmt.write_str("ADD"),
            Sub => fmt.write_str("SUB"),
            Mul => fmt.write_str("MULT"),
            Div => fmt.write_str("DIV"),
            Neg => fmt.write_str("NEG"),
            Branch(Target::Resolved(target)) => write!(fmt, "{:8}{}", "BR", target),
            Branch(Target::Unresolved) => write!(fmt, "{:8}?", "BR"),
            Call(entry) => write!(fmt, "{:8}{}", "CALL", entry),
            Return => fmt.write_str("RET"),
            EnterFrame => fmt.write_str("BSF"),
            LeaveFrame => fmt.write_str("RSF"),
            GrowFrame(slots) => write!(fmt, "{:8}{}", "INC", slots),
            ShrinkFrame(slots) => write!(fmt, "{:8}{}", "DEC", slots),
            Read => fmt.write_str("READ"),
            Write => fmt.write_str("WRITE"),
            Halt => fmt.write_str("HALT"),
        }
    }
}

/// Secuencia de instrucciones en construcción.
///
/// El buffer es el único punto de escritura del traductor. Un error
/// semántico fatal lo abandona mediante [`CodeBuffer::abandon()`]:
/// toda emisión posterior es silenciosamente descartada, lo cual
/// permite que el análisis sintáctico continúe reportando
/// diagnósticos sin producir un listado sin sentido.
pub struct CodeBuffer {
    instructions: Vec<Instruction>,
    alive: bool,
}

impl CodeBuffer {
    /// Crea un buffer vacío y activo.
    pub fn new() -> Self {
        CodeBuffer {
            instructions: Vec::new(),
            alive: true,
        }
    }

    /// Dirección que ocupará la siguiente instrucción emitida.
    pub fn current_address(&self) -> CodeAddr {
        CodeAddr(self.instructions.len() as u32)
    }

    /// Agrega una instrucción al final y obtiene su dirección.
    pub fn emit(&mut self, instruction: Instruction) -> CodeAddr {
        let at = self.current_address();
        if self.alive {
            self.instructions.push(instruction);
        }

        at
    }

    /// Resuelve el destino de un salto emitido anteriormente.
    ///
    /// La dirección debe referir a un [`Instruction::Branch`] cuyo
    /// destino siga pendiente; resolver dos veces el mismo salto es
    /// un error de programación del traductor.
    pub fn backpatch(&mut self, at: CodeAddr, target: CodeAddr) {
        if !self.alive {
            return;
        }

        match self.instructions.get_mut(at.index()) {
            Some(Instruction::Branch(slot)) if *slot == Target::Unresolved => {
                *slot = Target::Resolved(target);
            }

            _ => unreachable!("backpatch at {} does not hit a pending branch", at),
        }
    }

    /// Suprime permanentemente la emisión para el resto de la corrida.
    pub fn abandon(&mut self) {
        self.alive = false;
    }

    /// Sella la secuencia y la entrega para su consumo.
    ///
    /// No se permite emisión posterior. Si la generación fue
    /// abandonada no hay listado que entregar; en caso contrario no
    /// debe sobrevivir ningún salto pendiente.
    pub fn finalize(self) -> Option<Code> {
        if !self.alive {
            return None;
        }

        let pending = self
            .instructions
            .iter()
            .any(|instruction| matches!(instruction, Instruction::Branch(Target::Unresolved)));
        assert!(!pending, "a branch target was never resolved");

        Some(Code(self.instructions))
    }
}

impl Default for CodeBuffer {
    fn default() -> Self {
        CodeBuffer::new()
    }
}

/// Listado finalizado, listo para serializarse.
#[derive(Debug)]
pub struct Code(Vec<Instruction>);

impl Code {
    /// Obtiene las instrucciones en orden de dirección.
    pub fn instructions(&self) -> &[Instruction] {
        &self.0
    }
}

impl Display for Code {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        for instruction in &self.0 {
            writeln!(fmt, "{}", instruction)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn emit_reports_increasing_addresses() {
        let mut code = CodeBuffer::new();

        assert_eq!(code.emit(Instruction::LoadConst(1)), CodeAddr(0));
        assert_eq!(code.emit(Instruction::LoadConst(2)), CodeAddr(1));
        assert_eq!(code.current_address(), CodeAddr(2));
    }

    #[test]
    fn backpatch_resolves_a_pending_branch() {
        let mut code = CodeBuffer::new();

        let skip = code.emit(Instruction::Branch(Target::Unresolved));
        code.emit(Instruction::Return);

        let after = code.current_address();
        code.backpatch(skip, after);

        let code = code.finalize().expect("generation was not abandoned");
        assert_matches!(
            code.instructions()[0],
            Instruction::Branch(Target::Resolved(CodeAddr(2)))
        );
    }

    #[test]
    #[should_panic(expected = "never resolved")]
    fn finalize_rejects_pending_branches() {
        let mut code = CodeBuffer::new();
        code.emit(Instruction::Branch(Target::Unresolved));
        let _ = code.finalize();
    }

    #[test]
    fn abandoned_buffers_ignore_everything() {
        let mut code = CodeBuffer::new();
        code.emit(Instruction::LoadConst(1));

        code.abandon();
        code.emit(Instruction::Halt);
        let skip = code.emit(Instruction::Branch(Target::Unresolved));
        code.backpatch(skip, CodeAddr(0));

        assert_matches!(code.finalize(), None);
    }

    #[test]
    fn listing_uses_the_expected_mnemonics() {
        let mut code = CodeBuffer::new();
        code.emit(Instruction::LoadConst(1));
        code.emit(Instruction::LoadConst(2));
        code.emit(Instruction::Add);
        code.emit(Instruction::StoreGlobal(0));
        code.emit(Instruction::Halt);

        let listing = code.finalize().expect("nothing was abandoned").to_string();
        let lines: Vec<&str> = listing.lines().collect();

        assert_eq!(
            lines,
            vec![
                "LOADI   1",
                "LOADI   2",
                "ADD",
                "STOREA  0",
                "HALT",
            ],
        );
    }
}
