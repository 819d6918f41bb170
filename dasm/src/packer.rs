//! Writes the parsed instruction list into the code section of a
//! `dvmfile::Artifact`, resolving every label-reference operand to an
//! absolute file offset (see `SPEC_FULL.md` §4.3).
//!
//! Each reference is resolved independently — `label.local_offset(name) +
//! code_base` computed fresh per occurrence — rather than by mutating a
//! shared `name -> offset` entry while iterating references. The latter,
//! naive approach corrupts the second reference to a label used twice (see
//! `DESIGN.md`); this implementation cannot reproduce that bug because it
//! never writes back into `LabelTable`.

use byteorder::WriteBytesExt;
use util::Endian;

use crate::error::AssembleError;
use crate::labels::{LabelRefs, LabelTable};
use crate::parser::{Instruction, Operand};

pub fn pack(
    instructions: &[Instruction],
    numbers: Vec<f64>,
    strings: Vec<String>,
    labels: &LabelTable,
    label_refs: &LabelRefs,
) -> Result<dvmfile::Artifact, AssembleError> {
    let code_base = dvmfile::Artifact::code_base_for(&numbers, &strings);

    let mut code = Vec::new();
    for instruction in instructions {
        code.write_u8(instruction.opcode.to_byte())
            .expect("writing to a Vec<u8> cannot fail");

        for operand in &instruction.operands {
            let field = match operand {
                Operand::Number(id) | Operand::Str(id) => *id,
                Operand::Label(ref_id) => {
                    let name = label_refs.name(*ref_id);
                    let local_offset = labels
                        .local_offset(name)
                        .ok_or_else(|| AssembleError::UndefinedLabel(name.to_owned()))?;
                    code_base + local_offset
                }
            };
            code.write_u64::<Endian>(field)
                .expect("writing to a Vec<u8> cannot fail");
        }
    }

    Ok(dvmfile::Artifact::new(numbers, strings, code))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::parser;

    #[test]
    fn undefined_label_reference_fails() {
        let program = parser::parse("JMP $NOWHERE").unwrap();
        let err = pack(
            &program.instructions,
            program.numbers,
            program.strings,
            &program.labels,
            &program.label_refs,
        )
        .unwrap_err();
        assert!(matches!(err, AssembleError::UndefinedLabel(name) if name == "NOWHERE"));
    }

    #[test]
    fn a_label_referenced_twice_resolves_to_the_same_offset_both_times() {
        let program = parser::parse("START: JMP $START JMP $START").unwrap();
        let artifact = pack(
            &program.instructions,
            program.numbers,
            program.strings,
            &program.labels,
            &program.label_refs,
        )
        .unwrap();

        let code = artifact.code();
        // Each JMP is 1 opcode byte + 8-byte absolute offset.
        let first = u64::from_le_bytes(code[1..9].try_into().unwrap());
        let second = u64::from_le_bytes(code[10..18].try_into().unwrap());
        assert_eq!(first, second);
        assert_eq!(first, artifact.code_base());
    }

    #[test]
    fn label_reference_resolves_to_the_instruction_after_its_definition() {
        let program = parser::parse("JMP $END NOP END: EXIT").unwrap();
        let artifact = pack(
            &program.instructions,
            program.numbers,
            program.strings,
            &program.labels,
            &program.label_refs,
        )
        .unwrap();

        let code = artifact.code();
        let target = u64::from_le_bytes(code[1..9].try_into().unwrap());
        // JMP (1+8) + NOP (1) = 10 bytes into the code section.
        assert_eq!(target, artifact.code_base() + 10);
    }
}
