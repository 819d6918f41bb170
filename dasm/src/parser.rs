//! Parses a token stream into an ordered instruction list, interning each
//! operand into the number pool, string pool or label-reference sequence
//! as it goes (see `SPEC_FULL.md` §4.2).

use dvm::opcode::Opcode;
use dvm::Word;

use crate::error::{AssembleError, Location};
use crate::labels::{LabelRefs, LabelTable};
use crate::pool::{NumberPool, StringPool};
use crate::source_map::{SourceMap, SourceMapItem};
use crate::tokenizer::{TokenKind, Tokenizer};

#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    Number(u64),
    Str(u64),
    Label(usize),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub operands: Vec<Operand>,
}

pub struct ParsedProgram {
    pub instructions: Vec<Instruction>,
    pub numbers: Vec<f64>,
    pub strings: Vec<String>,
    pub labels: LabelTable,
    pub label_refs: LabelRefs,
    pub source_map: SourceMap,
}

pub fn parse(source: &str) -> Result<ParsedProgram, AssembleError> {
    let mut tokenizer = Tokenizer::new(source);
    let mut numbers = NumberPool::new();
    let mut strings = StringPool::new();
    let mut labels = LabelTable::new();
    let mut label_refs = LabelRefs::new();
    let mut instructions = Vec::new();
    let mut source_map = SourceMap::new();
    let mut offset: u64 = 0;

    loop {
        let token = tokenizer.next_token()?;
        match token.kind {
            TokenKind::Eof => break,

            TokenKind::LabelDef(name) => {
                if !labels.define(name.clone(), offset) {
                    return Err(AssembleError::DuplicateLabel(Location::new(token.line), name));
                }
            }

            TokenKind::Ident(mnemonic) => {
                let opcode = mnemonic
                    .to_uppercase()
                    .parse::<Opcode>()
                    .map_err(|_| AssembleError::UnknownMnemonic(Location::new(token.line), mnemonic))?;

                let mut operands = Vec::new();
                let mut last_line = token.line;
                loop {
                    let mark = tokenizer.mark();
                    let next = tokenizer.next_token()?;
                    match next.kind {
                        TokenKind::Number(value) => {
                            operands.push(Operand::Number(numbers.intern(value)));
                            last_line = next.line;
                        }
                        TokenKind::Str(value) => {
                            operands.push(Operand::Str(strings.intern(value)));
                            last_line = next.line;
                        }
                        TokenKind::LabelRef(name) => {
                            operands.push(Operand::Label(label_refs.push(name)));
                            last_line = next.line;
                        }
                        _ => {
                            // Not an operand token: this statement's operand
                            // list is over, and the token belongs to the
                            // next statement. Replay it on the next loop
                            // iteration of the outer loop.
                            tokenizer.reset(mark);
                            break;
                        }
                    }
                }

                let expected = opcode.operand_count();
                if operands.len() != expected {
                    return Err(AssembleError::WrongOperandCount {
                        location: Location::new(token.line),
                        mnemonic: mnemonic_name(opcode),
                        expected,
                        found: operands.len(),
                    });
                }

                offset += 1 + expected as u64 * std::mem::size_of::<Word>() as u64;
                instructions.push(Instruction { opcode, operands });
                source_map.push(SourceMapItem {
                    start_line: token.line,
                    line_count: last_line - token.line + 1,
                });
            }

            TokenKind::Number(_) | TokenKind::Str(_) | TokenKind::LabelRef(_) => {
                return Err(AssembleError::ExpectedStatement(Location::new(token.line)))
            }
        }
    }

    Ok(ParsedProgram {
        instructions,
        numbers: numbers.into_values(),
        strings: strings.into_values(),
        labels,
        label_refs,
        source_map,
    })
}

/// The canonical mnemonic spelling, for error messages; `Opcode`'s
/// `Display` prints the Rust-side variant name (`LoadLocal`) rather than
/// the wire mnemonic (`LOAD_LOCAL`), which reads oddly in a diagnostic
/// about an assembly-source operand count.
fn mnemonic_name(opcode: Opcode) -> &'static str {
    match opcode {
        Opcode::LoadLocal => "LOAD_LOCAL",
        Opcode::LoadGlobal => "LOAD_GLOBAL",
        Opcode::LoadNum => "LOAD_NUM",
        Opcode::LoadString => "LOAD_STRING",
        Opcode::LoadAddr => "LOAD_ADDR",
        Opcode::StoreLocal => "STORE_LOCAL",
        Opcode::StoreGlobal => "STORE_GLOBAL",
        Opcode::Add => "ADD",
        Opcode::Sub => "SUB",
        Opcode::Mul => "MUL",
        Opcode::Div => "DIV",
        Opcode::Mod => "MOD",
        Opcode::Pow => "POW",
        Opcode::Not => "NOT",
        Opcode::Compare => "COMPARE",
        Opcode::Jmp => "JMP",
        Opcode::Jmpc => "JMPC",
        Opcode::Call => "CALL",
        Opcode::Calle => "CALLE",
        Opcode::Ret => "RET",
        Opcode::MakeList => "MAKE_LIST",
        Opcode::ActionList => "ACTION_LIST",
        Opcode::MakeMap => "MAKE_MAP",
        Opcode::ActionMap => "ACTION_MAP",
        Opcode::PopTop => "POP_TOP",
        Opcode::Import => "IMPORT",
        Opcode::Exit => "EXIT",
        Opcode::Nop => "NOP",
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn label_offsets_are_local_to_the_code_section() {
        let program = parse("START: JMP $START").unwrap();
        assert_eq!(program.labels.local_offset("START"), Some(0));
        assert_eq!(program.instructions.len(), 1);
        assert_eq!(program.instructions[0].opcode, Opcode::Jmp);
    }

    #[test]
    fn offsets_after_a_no_operand_instruction_advance_by_one() {
        let program = parse("NOP NOP START: EXIT").unwrap();
        assert_eq!(program.labels.local_offset("START"), Some(2));
    }

    #[test]
    fn offsets_after_a_one_operand_instruction_advance_by_one_plus_word() {
        let program = parse("LOAD_NUM 1 START: EXIT").unwrap();
        assert_eq!(program.labels.local_offset("START"), Some(9));
    }

    #[test]
    fn duplicate_literals_share_one_pool_slot() {
        let program = parse("LOAD_NUM 4 LOAD_NUM 4 LOAD_NUM 5").unwrap();
        assert_eq!(program.numbers, vec![4.0, 5.0]);
        assert_eq!(
            program.instructions[0].operands,
            vec![Operand::Number(0)]
        );
        assert_eq!(
            program.instructions[1].operands,
            vec![Operand::Number(0)]
        );
        assert_eq!(
            program.instructions[2].operands,
            vec![Operand::Number(1)]
        );
    }

    #[test]
    fn unknown_mnemonic_fails() {
        assert!(matches!(
            parse("FROB"),
            Err(AssembleError::UnknownMnemonic(_, _))
        ));
    }

    #[test]
    fn wrong_operand_count_fails() {
        assert!(matches!(
            parse("ADD 1"),
            Err(AssembleError::WrongOperandCount { .. })
        ));
    }

    #[test]
    fn duplicate_label_fails() {
        assert!(matches!(
            parse("A: NOP A: EXIT"),
            Err(AssembleError::DuplicateLabel(_, _))
        ));
    }

    #[test]
    fn line_starting_with_an_operand_token_fails() {
        assert!(matches!(parse("5 NOP"), Err(AssembleError::ExpectedStatement(_))));
    }

    #[test]
    fn source_map_has_one_entry_per_instruction() {
        let program = parse("NOP\nADD\nEXIT").unwrap();
        assert_eq!(program.source_map.len(), 3);
        assert_eq!(program.source_map[0].start_line, 1);
        assert_eq!(program.source_map[1].start_line, 2);
        assert_eq!(program.source_map[2].start_line, 3);
    }
}
