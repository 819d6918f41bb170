use num_derive::{FromPrimitive, ToPrimitive};
use std::fmt;
use std::str::FromStr;
use util::ParseEnumError;

/// The 28-instruction opcode set. Variant order is load-bearing: it fixes
/// the 1-byte wire encoding used by the binary artifact (§6.2), so adding,
/// removing, or reordering a variant changes the file format.
#[derive(Clone, Copy, PartialEq, Eq, Debug, FromPrimitive, ToPrimitive)]
pub enum Opcode {
    LoadLocal,
    LoadGlobal,
    LoadNum,
    LoadString,
    LoadAddr,
    StoreLocal,
    StoreGlobal,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Not,
    Compare,
    Jmp,
    Jmpc,
    Call,
    Calle,
    Ret,
    MakeList,
    ActionList,
    MakeMap,
    ActionMap,
    PopTop,
    Import,
    Exit,
    Nop,
}

impl Opcode {
    /// The 1-byte wire encoding, wrapped so dependent crates (`dasm`) don't
    /// need their own `num`/`num-traits` dependency just to call
    /// `ToPrimitive::to_u8`.
    pub fn to_byte(self) -> u8 {
        use num::ToPrimitive;
        self.to_u8().expect("every Opcode variant fits in a byte")
    }

    /// The inverse of `to_byte`; `None` for any byte not naming an opcode.
    pub fn from_byte(byte: u8) -> Option<Opcode> {
        use num::FromPrimitive;
        Opcode::from_u8(byte)
    }

    /// Number of W-byte operand fields following this opcode's byte in the
    /// code stream. Only the opcodes that encode an id/offset directly in
    /// the instruction stream (as opposed to taking their operands off the
    /// runtime stack) have a nonzero count.
    pub fn operand_count(self) -> usize {
        match self {
            Opcode::LoadLocal
            | Opcode::LoadGlobal
            | Opcode::LoadNum
            | Opcode::LoadString
            | Opcode::LoadAddr
            | Opcode::StoreLocal
            | Opcode::StoreGlobal
            | Opcode::Jmp
            | Opcode::Jmpc => 1,
            _ => 0,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl FromStr for Opcode {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Opcode, ParseEnumError> {
        match s {
            "LOAD_LOCAL" => Ok(Opcode::LoadLocal),
            "LOAD_GLOBAL" => Ok(Opcode::LoadGlobal),
            "LOAD_NUM" => Ok(Opcode::LoadNum),
            "LOAD_STRING" => Ok(Opcode::LoadString),
            "LOAD_ADDR" => Ok(Opcode::LoadAddr),
            "STORE_LOCAL" => Ok(Opcode::StoreLocal),
            "STORE_GLOBAL" => Ok(Opcode::StoreGlobal),
            "ADD" => Ok(Opcode::Add),
            "SUB" => Ok(Opcode::Sub),
            "MUL" => Ok(Opcode::Mul),
            "DIV" => Ok(Opcode::Div),
            "MOD" => Ok(Opcode::Mod),
            "POW" => Ok(Opcode::Pow),
            "NOT" => Ok(Opcode::Not),
            "COMPARE" => Ok(Opcode::Compare),
            "JMP" => Ok(Opcode::Jmp),
            "JMPC" => Ok(Opcode::Jmpc),
            "CALL" => Ok(Opcode::Call),
            "CALLE" => Ok(Opcode::Calle),
            "RET" => Ok(Opcode::Ret),
            "MAKE_LIST" => Ok(Opcode::MakeList),
            "ACTION_LIST" => Ok(Opcode::ActionList),
            "MAKE_MAP" => Ok(Opcode::MakeMap),
            "ACTION_MAP" => Ok(Opcode::ActionMap),
            "POP_TOP" => Ok(Opcode::PopTop),
            "IMPORT" => Ok(Opcode::Import),
            "EXIT" => Ok(Opcode::Exit),
            "NOP" => Ok(Opcode::Nop),
            _ => Err(ParseEnumError {
                value: s.to_string(),
                enum_name: "Opcode",
            }),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use num::{FromPrimitive, ToPrimitive};

    #[test]
    fn wire_order_is_stable() {
        assert_eq!(Opcode::LoadLocal.to_u8(), Some(0));
        assert_eq!(Opcode::Compare.to_u8(), Some(14));
        assert_eq!(Opcode::Nop.to_u8(), Some(27));
    }

    #[test]
    fn round_trips_through_primitive() {
        for byte in 0u8..28 {
            let op = Opcode::from_u8(byte).expect("every byte 0..28 names an opcode");
            assert_eq!(op.to_u8(), Some(byte));
        }
        assert_eq!(Opcode::from_u8(28), None);
    }

    #[test]
    fn mnemonics_parse_case_sensitively_on_upper_form() {
        assert_eq!("ACTION_MAP".parse::<Opcode>(), Ok(Opcode::ActionMap));
        assert!("action_map".parse::<Opcode>().is_err());
    }
}
