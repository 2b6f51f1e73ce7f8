use std::fmt::Display;

use crate::literal::Literal;

/// Where an instruction came from in the assembly source. Only used to give
/// runtime errors a file:line context.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
}

impl SourceLocation {
    pub fn new(file: &str, line: u32) -> SourceLocation {
        SourceLocation {
            file: file.to_string(),
            line,
        }
    }
}

impl Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// The machine's operation set. Discriminant values are part of the binary
/// program format and must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Opcode {
    Noop = 0,
    Push = 1,
    Pop = 2,
    Dup = 3,
    InDup = 4,
    Swap = 5,
    InSwap = 6,
    Add = 7,
    Sub = 8,
    Mul = 9,
    Div = 10,
    Mod = 11,
    Cmpe = 12,
    Cmpne = 13,
    Cmpg = 14,
    Cmpl = 15,
    Cmpge = 16,
    Cmple = 17,
    Jmp = 18,
    Zjmp = 19,
    Nzjmp = 20,
    Call = 21,
    Ret = 22,
    Ref = 23,
    Deref = 24,
    Index = 25,
    MovReg = 26,
    PushReg = 27,
    MovStr = 28,
    GetStr = 29,
    PopStr = 30,
    DupStr = 31,
    SwapStr = 32,
    InDupStr = 33,
    InSwapStr = 34,
    Itof = 35,
    Ftoi = 36,
    Print = 37,
    Native = 38,
    Halt = 39,
}

impl Opcode {
    pub fn from_u32(value: u32) -> Option<Opcode> {
        let opcode = match value {
            0 => Opcode::Noop,
            1 => Opcode::Push,
            2 => Opcode::Pop,
            3 => Opcode::Dup,
            4 => Opcode::InDup,
            5 => Opcode::Swap,
            6 => Opcode::InSwap,
            7 => Opcode::Add,
            8 => Opcode::Sub,
            9 => Opcode::Mul,
            10 => Opcode::Div,
            11 => Opcode::Mod,
            12 => Opcode::Cmpe,
            13 => Opcode::Cmpne,
            14 => Opcode::Cmpg,
            15 => Opcode::Cmpl,
            16 => Opcode::Cmpge,
            17 => Opcode::Cmple,
            18 => Opcode::Jmp,
            19 => Opcode::Zjmp,
            20 => Opcode::Nzjmp,
            21 => Opcode::Call,
            22 => Opcode::Ret,
            23 => Opcode::Ref,
            24 => Opcode::Deref,
            25 => Opcode::Index,
            26 => Opcode::MovReg,
            27 => Opcode::PushReg,
            28 => Opcode::MovStr,
            29 => Opcode::GetStr,
            30 => Opcode::PopStr,
            31 => Opcode::DupStr,
            32 => Opcode::SwapStr,
            33 => Opcode::InDupStr,
            34 => Opcode::InSwapStr,
            35 => Opcode::Itof,
            36 => Opcode::Ftoi,
            37 => Opcode::Print,
            38 => Opcode::Native,
            39 => Opcode::Halt,
            _ => return None,
        };
        Some(opcode)
    }
}

impl Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Opcode::Noop => "NOOP",
            Opcode::Push => "PUSH",
            Opcode::Pop => "POP",
            Opcode::Dup => "DUP",
            Opcode::InDup => "INDUP",
            Opcode::Swap => "SWAP",
            Opcode::InSwap => "INSWAP",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Div => "DIV",
            Opcode::Mod => "MOD",
            Opcode::Cmpe => "CMPE",
            Opcode::Cmpne => "CMPNE",
            Opcode::Cmpg => "CMPG",
            Opcode::Cmpl => "CMPL",
            Opcode::Cmpge => "CMPGE",
            Opcode::Cmple => "CMPLE",
            Opcode::Jmp => "JMP",
            Opcode::Zjmp => "ZJMP",
            Opcode::Nzjmp => "NZJMP",
            Opcode::Call => "CALL",
            Opcode::Ret => "RET",
            Opcode::Ref => "REF",
            Opcode::Deref => "DEREF",
            Opcode::Index => "INDEX",
            Opcode::MovReg => "MOVREG",
            Opcode::PushReg => "PUSHREG",
            Opcode::MovStr => "MOVSTR",
            Opcode::GetStr => "GETSTR",
            Opcode::PopStr => "POPSTR",
            Opcode::DupStr => "DUPSTR",
            Opcode::SwapStr => "SWAPSTR",
            Opcode::InDupStr => "INDUPSTR",
            Opcode::InSwapStr => "INSWAPSTR",
            Opcode::Itof => "ITOF",
            Opcode::Ftoi => "FTOI",
            Opcode::Print => "PRINT",
            Opcode::Native => "NATIVE",
            Opcode::Halt => "HALT",
        };
        write!(f, "{}", name)
    }
}

/// One decoded machine instruction. Produced once by the assembler (or the
/// binary decoder) and read-only during execution.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub operand: Literal,
    pub location: SourceLocation,
}

impl Instruction {
    pub fn new(opcode: Opcode, operand: Literal) -> Instruction {
        Instruction {
            opcode,
            operand,
            location: SourceLocation::default(),
        }
    }

    /// Operand-less instruction.
    pub fn op(opcode: Opcode) -> Instruction {
        Instruction::new(opcode, Literal::None)
    }

    pub fn with_location(mut self, file: &str, line: u32) -> Instruction {
        self.location = SourceLocation::new(file, line);
        self
    }

    pub fn push(value: Literal) -> Instruction {
        Instruction::new(Opcode::Push, value)
    }

    pub fn pop() -> Instruction {
        Instruction::op(Opcode::Pop)
    }

    pub fn dup() -> Instruction {
        Instruction::op(Opcode::Dup)
    }

    pub fn indup(index: i64) -> Instruction {
        Instruction::new(Opcode::InDup, Literal::Int(index))
    }

    pub fn swap() -> Instruction {
        Instruction::op(Opcode::Swap)
    }

    pub fn inswap(index: i64) -> Instruction {
        Instruction::new(Opcode::InSwap, Literal::Int(index))
    }

    pub fn add() -> Instruction {
        Instruction::op(Opcode::Add)
    }

    pub fn sub() -> Instruction {
        Instruction::op(Opcode::Sub)
    }

    pub fn mul() -> Instruction {
        Instruction::op(Opcode::Mul)
    }

    pub fn div() -> Instruction {
        Instruction::op(Opcode::Div)
    }

    pub fn modulo() -> Instruction {
        Instruction::op(Opcode::Mod)
    }

    pub fn cmpe() -> Instruction {
        Instruction::op(Opcode::Cmpe)
    }

    pub fn cmpne() -> Instruction {
        Instruction::op(Opcode::Cmpne)
    }

    pub fn cmpg() -> Instruction {
        Instruction::op(Opcode::Cmpg)
    }

    pub fn cmpl() -> Instruction {
        Instruction::op(Opcode::Cmpl)
    }

    pub fn cmpge() -> Instruction {
        Instruction::op(Opcode::Cmpge)
    }

    pub fn cmple() -> Instruction {
        Instruction::op(Opcode::Cmple)
    }

    pub fn jmp(target: i64) -> Instruction {
        Instruction::new(Opcode::Jmp, Literal::Int(target))
    }

    pub fn zjmp(target: i64) -> Instruction {
        Instruction::new(Opcode::Zjmp, Literal::Int(target))
    }

    pub fn nzjmp(target: i64) -> Instruction {
        Instruction::new(Opcode::Nzjmp, Literal::Int(target))
    }

    pub fn call(target: i64) -> Instruction {
        Instruction::new(Opcode::Call, Literal::Int(target))
    }

    pub fn ret() -> Instruction {
        Instruction::op(Opcode::Ret)
    }

    pub fn heap_ref() -> Instruction {
        Instruction::op(Opcode::Ref)
    }

    pub fn deref() -> Instruction {
        Instruction::op(Opcode::Deref)
    }

    /// `index` with the value taken from the stack.
    pub fn index() -> Instruction {
        Instruction::op(Opcode::Index)
    }

    /// `index` with an immediate value operand.
    pub fn index_imm(value: Literal) -> Instruction {
        Instruction::new(Opcode::Index, value)
    }

    pub fn mov_reg(register: i64) -> Instruction {
        Instruction::new(Opcode::MovReg, Literal::Int(register))
    }

    pub fn push_reg(register: i64) -> Instruction {
        Instruction::new(Opcode::PushReg, Literal::Int(register))
    }

    pub fn mov_str() -> Instruction {
        Instruction::op(Opcode::MovStr)
    }

    pub fn get_str(index: i64) -> Instruction {
        Instruction::new(Opcode::GetStr, Literal::Int(index))
    }

    pub fn pop_str() -> Instruction {
        Instruction::op(Opcode::PopStr)
    }

    pub fn dup_str() -> Instruction {
        Instruction::op(Opcode::DupStr)
    }

    pub fn swap_str() -> Instruction {
        Instruction::op(Opcode::SwapStr)
    }

    pub fn in_dup_str(index: i64) -> Instruction {
        Instruction::new(Opcode::InDupStr, Literal::Int(index))
    }

    pub fn in_swap_str(index: i64) -> Instruction {
        Instruction::new(Opcode::InSwapStr, Literal::Int(index))
    }

    pub fn itof() -> Instruction {
        Instruction::op(Opcode::Itof)
    }

    pub fn ftoi() -> Instruction {
        Instruction::op(Opcode::Ftoi)
    }

    pub fn print() -> Instruction {
        Instruction::op(Opcode::Print)
    }

    pub fn native(id: i64) -> Instruction {
        Instruction::new(Opcode::Native, Literal::Int(id))
    }

    pub fn halt() -> Instruction {
        Instruction::op(Opcode::Halt)
    }

    pub fn noop() -> Instruction {
        Instruction::op(Opcode::Noop)
    }
}

#[cfg(test)]
mod tests {
    use super::{Instruction, Opcode, SourceLocation};
    use crate::literal::Literal;

    #[test]
    fn constructors() {
        let instr = Instruction::push(Literal::Int(5));
        assert_eq!(instr.opcode, Opcode::Push);
        assert_eq!(instr.operand, Literal::Int(5));
        assert_eq!(instr.location, SourceLocation::default());

        assert_eq!(Instruction::jmp(3).operand, Literal::Int(3));
        assert_eq!(Instruction::dup().operand, Literal::None);
        assert_eq!(Instruction::native(99).opcode, Opcode::Native);
    }

    #[test]
    fn location_builder() {
        let instr = Instruction::pop().with_location("main.asm", 7);
        assert_eq!(instr.location.to_string(), "main.asm:7");
    }

    #[test]
    fn opcode_round_trips_through_u32() {
        for value in 0..=39u32 {
            let opcode = Opcode::from_u32(value).unwrap();
            assert_eq!(opcode as u32, value);
        }
        assert!(Opcode::from_u32(40).is_none());
        assert!(Opcode::from_u32(u32::MAX).is_none());
    }

    #[test]
    fn opcode_names() {
        assert_eq!(Opcode::Push.to_string(), "PUSH");
        assert_eq!(Opcode::Nzjmp.to_string(), "NZJMP");
        assert_eq!(Opcode::InSwapStr.to_string(), "INSWAPSTR");
    }
}
