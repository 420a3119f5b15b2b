//! Pruebas de extremo a extremo: texto fuente a listado de
//! instrucciones, pasando por lexer y traductor.

use assert_matches::assert_matches;
use std::io::Cursor;

use cplc::{
    code::Instruction,
    lex::Lexer,
    parse::{self, Translation, TranslationError, Verdict},
    source,
};

fn compile(text: &str) -> Translation {
    let (start, chars) = source::consume(Cursor::new(text), "<test>");
    let tokens = Lexer::new(start.clone(), chars)
        .try_exhaustive()
        .expect("lexical errors in test program");

    parse::translate(tokens, start)
}

fn listing(text: &str) -> Vec<String> {
    compile(text)
        .code
        .expect("code generation was abandoned")
        .to_string()
        .lines()
        .map(str::to_owned)
        .collect()
}

#[test]
fn a_complete_program_compiles_to_the_expected_listing() {
    let translation = compile("PROGRAM p; VAR x; BEGIN x :== 1 + 2; WRITE(x) END.");

    assert_eq!(translation.verdict, Verdict::Valid);
    assert!(translation.errors.is_empty());

    let code = translation.code.expect("code generation was abandoned");
    assert_eq!(
        code.instructions().to_vec(),
        vec![
            Instruction::LoadConst(1),
            Instruction::LoadConst(2),
            Instruction::Add,
            Instruction::StoreGlobal(0),
            Instruction::LoadGlobal(0),
            Instruction::Write,
            Instruction::Halt,
        ],
    );
}

#[test]
fn redeclaring_a_name_in_the_same_scope_is_fatal_to_generation() {
    let translation = compile("PROGRAM p; VAR x; VAR x; BEGIN x := 1 END.");

    assert_eq!(translation.verdict, Verdict::Invalid);
    assert_matches!(
        translation.errors[0].val(),
        TranslationError::Redeclared(name) if name.as_ref() == "x"
    );
    assert!(translation.code.is_none());
}

#[test]
fn calling_an_undeclared_name_abandons_generation() {
    let translation = compile("PROGRAM p; VAR x; BEGIN foo(x) END.");

    assert_eq!(translation.verdict, Verdict::Invalid);
    assert_matches!(
        translation.errors[0].val(),
        TranslationError::Undeclared(name) if name.as_ref() == "foo"
    );
    assert!(translation.code.is_none());
}

#[test]
fn calling_a_variable_is_not_a_procedure() {
    let translation = compile("PROGRAM p; VAR x; BEGIN x(1) END.");

    assert_eq!(translation.verdict, Verdict::Invalid);
    assert_matches!(
        translation.errors[0].val(),
        TranslationError::NotAProcedure(name) if name.as_ref() == "x"
    );
    assert!(translation.code.is_none());
}

#[test]
fn assigning_to_a_procedure_is_rejected() {
    let translation = compile("PROGRAM p; PROCEDURE q; BEGIN END; BEGIN q := 1 END.");

    assert_eq!(translation.verdict, Verdict::Invalid);
    assert_matches!(
        translation.errors[0].val(),
        TranslationError::ExpectedVariable(name) if name.as_ref() == "q"
    );
    assert!(translation.code.is_none());
}

#[test]
fn procedure_bodies_are_skipped_by_a_backpatched_branch() {
    // El salto de cada declaración debe aterrizar justo después del
    // RET de su cuerpo, brincando también los cuerpos anidados
    let lines = listing(
        "PROGRAM p;\n\
         PROCEDURE outer;\n\
         VAR a;\n\
           PROCEDURE inner;\n\
           BEGIN\n\
             a := 1\n\
           END;\n\
         BEGIN\n\
           inner;\n\
         END;\n\
         BEGIN\n\
         END.",
    );

    assert_eq!(
        lines,
        vec![
            "BR      14", // brinca el cuerpo completo de outer
            "INC     1",
            "BR      8", // brinca el cuerpo de inner
            "LOADI   1",
            "PUSHFP",
            "LOADSP  0", // un salto de anidamiento: inner usa una local de outer
            "STORESP 1",
            "RET",
            "PUSHFP", // llamada inner desde outer
            "BSF",
            "CALL    3",
            "RSF",
            "DEC     1",
            "RET",
            "HALT",
        ],
    );
}

#[test]
fn value_parameters_and_locals_share_the_frame() {
    let lines = listing(
        "PROGRAM p;\n\
         VAR x;\n\
         PROCEDURE q(n);\n\
         VAR x;\n\
         BEGIN\n\
           x := n\n\
         END;\n\
         BEGIN\n\
           x := 3\n\
         END.",
    );

    assert_eq!(
        lines,
        vec![
            "BR      6",
            "INC     2",
            "LOADFP  1", // el parámetro n ocupa el primer slot del marco
            "STOREFP 2", // la local x ensombrece a la global
            "DEC     2",
            "RET",
            "LOADI   3",
            "STOREA  0", // de vuelta en el programa, x es la global otra vez
            "HALT",
        ],
    );
}

#[test]
fn reference_parameters_add_one_level_of_indirection() {
    let lines = listing(
        "PROGRAM p;\n\
         PROCEDURE q(REF r);\n\
         VAR t;\n\
         BEGIN\n\
           t := r;\n\
           r := t + 1\n\
         END;\n\
         BEGIN\n\
         END.",
    );

    assert_eq!(
        lines,
        vec![
            "BR      12",
            "INC     2",
            "LOADFP  1", // el slot de r contiene la dirección del objeto
            "LOADSP  0", // ... y se lee a través de ella
            "STOREFP 2",
            "LOADFP  2",
            "LOADI   1",
            "ADD",
            "LOADFP  1",
            "STORESP 0", // el almacenamiento también es indirecto
            "DEC     2",
            "RET",
            "HALT",
        ],
    );
}

#[test]
fn while_and_if_translate_their_operands_only() {
    let translation = compile(
        "PROGRAM p; VAR x; BEGIN \
           x := 0; \
           WHILE x < 10 DO BEGIN x := x + 1 END; \
           IF x = 10 THEN BEGIN WRITE(x) END ELSE BEGIN WRITE(0) END \
         END.",
    );

    assert_eq!(translation.verdict, Verdict::Valid);

    let code = translation.code.expect("code generation was abandoned");
    assert_eq!(
        code.instructions().to_vec(),
        vec![
            Instruction::LoadConst(0),
            Instruction::StoreGlobal(0),
            Instruction::LoadGlobal(0), // condición del while
            Instruction::LoadConst(10),
            Instruction::LoadGlobal(0), // cuerpo del while
            Instruction::LoadConst(1),
            Instruction::Add,
            Instruction::StoreGlobal(0),
            Instruction::LoadGlobal(0), // condición del if
            Instruction::LoadConst(10),
            Instruction::LoadGlobal(0), // rama then
            Instruction::Write,
            Instruction::LoadConst(0), // rama else
            Instruction::Write,
            Instruction::Halt,
        ],
    );
}

#[test]
fn read_stores_into_each_variable_in_turn() {
    let translation = compile("PROGRAM p; VAR a, b; BEGIN READ(a, b) END.");

    assert_eq!(translation.verdict, Verdict::Valid);

    let code = translation.code.expect("code generation was abandoned");
    assert_eq!(
        code.instructions().to_vec(),
        vec![
            Instruction::Read,
            Instruction::StoreGlobal(0),
            Instruction::Read,
            Instruction::StoreGlobal(1),
            Instruction::Halt,
        ],
    );
}

#[test]
fn unary_minus_and_precedence() {
    let translation = compile("PROGRAM p; VAR x; BEGIN x := -x + 2 * 3 / x END.");

    assert_eq!(translation.verdict, Verdict::Valid);

    let code = translation.code.expect("code generation was abandoned");
    assert_eq!(
        code.instructions().to_vec(),
        vec![
            Instruction::LoadGlobal(0),
            Instruction::Neg,
            Instruction::LoadConst(2),
            Instruction::LoadConst(3),
            Instruction::Mul,
            Instruction::LoadGlobal(0),
            Instruction::Div,
            Instruction::Add,
            Instruction::StoreGlobal(0),
            Instruction::Halt,
        ],
    );
}

#[test]
fn a_missing_semicolon_is_recovered_and_still_emits() {
    // Falta el `;` luego del nombre del programa; el error es
    // puramente sintáctico, así que el listado se produce igual
    let translation = compile("PROGRAM p VAR x; BEGIN x := 1 END.");

    assert_eq!(translation.verdict, Verdict::Invalid);
    assert_eq!(translation.errors.len(), 1);
    assert_matches!(
        translation.errors[0].val(),
        TranslationError::UnexpectedToken(..)
    );
    assert!(translation.code.is_some());
}

#[test]
fn garbage_between_sections_is_skipped_to_an_anchor() {
    let translation = compile("PROGRAM p; 1 2 3 BEGIN END.");

    assert_eq!(translation.verdict, Verdict::Invalid);
    assert_eq!(translation.errors.len(), 1);
    assert_matches!(
        translation.errors[0].val(),
        TranslationError::Desynchronized(..)
    );

    // La recuperación ancló en BEGIN y el resto tradujo normalmente
    assert!(translation.code.is_some());
}

#[test]
fn truncated_input_terminates_with_diagnostics() {
    let translation = compile("PROGRAM p; VAR x; BEGIN x := ");

    assert_eq!(translation.verdict, Verdict::Invalid);
    assert!(translation.errors.len() >= 2);
}

#[test]
fn errors_carry_source_positions() {
    let translation = compile("PROGRAM p; VAR x; VAR x; BEGIN END.");

    let location = translation.errors[0].location();
    assert_eq!(location.start().line(), 1);
    assert_eq!(location.start().column(), 23);
}
