//! Tokenizes, parses and assembles dvm assembly source into a
//! `dvmfile::Artifact`.
//!
//! ```
//! let (artifact, _source_map) = dasm::assemble("LOAD_NUM 1 EXIT").unwrap();
//! assert_eq!(artifact.numbers(), &[1.0]);
//! ```

mod error;
mod labels;
mod packer;
mod parser;
mod pool;
mod source_map;
mod tokenizer;

pub use error::{AssembleError, Location};
pub use source_map::{SourceMap, SourceMapItem};

/// Assembles a complete program and returns both the binary artifact and
/// a source map giving each instruction's originating line(s). Pass on a
/// parse/link failure; the returned error already names the offending
/// line where one is known.
pub fn assemble(source: &str) -> Result<(dvmfile::Artifact, SourceMap), AssembleError> {
    let program = parser::parse(source)?;
    let artifact = packer::pack(
        &program.instructions,
        program.numbers,
        program.strings,
        &program.labels,
        &program.label_refs,
    )?;
    Ok((artifact, program.source_map))
}

#[cfg(test)]
mod test {
    use super::*;
    use dvm::opcode::Opcode;

    #[test]
    fn arithmetic_scenario_assembles_to_the_expected_wire_shape() {
        let (artifact, _) = assemble(r#"LOAD_NUM 2 LOAD_NUM 3 ADD STORE_GLOBAL "r" EXIT"#).unwrap();
        assert_eq!(artifact.numbers(), &[2.0, 3.0]);
        assert_eq!(artifact.strings(), &["r".to_owned()]);

        let code = artifact.code();
        assert_eq!(code[0], Opcode::LoadNum.to_byte());
        assert_eq!(u64::from_le_bytes(code[1..9].try_into().unwrap()), 0);
        assert_eq!(code[9], Opcode::LoadNum.to_byte());
        assert_eq!(u64::from_le_bytes(code[10..18].try_into().unwrap()), 1);
        assert_eq!(code[18], Opcode::Add.to_byte());
        assert_eq!(code[19], Opcode::StoreGlobal.to_byte());
        assert_eq!(u64::from_le_bytes(code[20..28].try_into().unwrap()), 0);
        assert_eq!(code[28], Opcode::Exit.to_byte());
    }

    #[test]
    fn label_round_trip_scenario() {
        let (artifact, _) = assemble("START: JMP $END NOP END: EXIT").unwrap();
        let code = artifact.code();
        let target = u64::from_le_bytes(code[1..9].try_into().unwrap());
        assert_eq!(target, artifact.code_base() + 10);
    }

    #[test]
    fn bare_byte_count_matches_instruction_shapes() {
        let (artifact, _) = assemble("NOP EXIT").unwrap();
        assert_eq!(artifact.code().len(), 2);
    }
}
