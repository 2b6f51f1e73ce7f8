use std::fmt::Display;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use memmap::Mmap;

use crate::instruction::{Instruction, Opcode};
use crate::literal::Literal;

/// Size of the file header holding the entrypoint.
const HEADER_SIZE: usize = 8;
/// Size of one serialized instruction record.
pub const INSTRUCTION_RECORD_SIZE: usize = 16;

const TAG_NONE: u8 = 0;
const TAG_INT: u8 = 1;
const TAG_FLOAT: u8 = 2;
const TAG_CHAR: u8 = 3;
const TAG_POINTER: u8 = 4;
const TAG_NULL: u8 = 5;

/// Everything the assembler hands the runtime for one program run. The
/// binary file format persists only the entrypoint and the instruction
/// stream; the string table and heap seed exist for source-assembled
/// programs only.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub entrypoint: usize,
    pub instructions: Vec<Instruction>,
    pub string_table: Vec<i64>,
    pub heap_seed: Vec<Literal>,
}

#[derive(Debug)]
pub enum ProgramError {
    Io(std::io::Error),
    TruncatedHeader,
    UnknownOpcode(u32, usize),
    UnknownLiteralTag(u8, usize),
    InvalidChar(u32, usize),
}

impl Display for ProgramError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProgramError::Io(err) => write!(f, "failed to read or write program file: {}", err),
            ProgramError::TruncatedHeader => {
                write!(f, "program file is shorter than its {} byte header", HEADER_SIZE)
            }
            ProgramError::UnknownOpcode(value, record) => {
                write!(f, "unknown opcode {} in instruction record {}", value, record)
            }
            ProgramError::UnknownLiteralTag(tag, record) => {
                write!(f, "unknown literal tag {} in instruction record {}", tag, record)
            }
            ProgramError::InvalidChar(value, record) => {
                write!(f, "invalid char code point {} in instruction record {}", value, record)
            }
        }
    }
}

impl std::error::Error for ProgramError {}

impl From<std::io::Error> for ProgramError {
    fn from(err: std::io::Error) -> ProgramError {
        ProgramError::Io(err)
    }
}

fn literal_tag_and_payload(literal: Literal) -> (u8, u64) {
    match literal {
        Literal::None => (TAG_NONE, 0),
        Literal::Int(value) => (TAG_INT, value as u64),
        Literal::Float(value) => (TAG_FLOAT, value.to_bits()),
        Literal::Char(value) => (TAG_CHAR, value as u64),
        Literal::Pointer(value) => (TAG_POINTER, value as u64),
        Literal::Null => (TAG_NULL, 0),
    }
}

fn literal_from_record(tag: u8, payload: u64, record: usize) -> Result<Literal, ProgramError> {
    match tag {
        TAG_NONE => Ok(Literal::None),
        TAG_INT => Ok(Literal::Int(payload as i64)),
        TAG_FLOAT => Ok(Literal::Float(f64::from_bits(payload))),
        TAG_CHAR => char::from_u32(payload as u32)
            .map(Literal::Char)
            .ok_or(ProgramError::InvalidChar(payload as u32, record)),
        TAG_POINTER => Ok(Literal::Pointer(payload as i64)),
        TAG_NULL => Ok(Literal::Null),
        _ => Err(ProgramError::UnknownLiteralTag(tag, record)),
    }
}

impl Program {
    pub fn new(entrypoint: usize, instructions: Vec<Instruction>) -> Program {
        Program {
            entrypoint,
            instructions,
            string_table: Vec::new(),
            heap_seed: Vec::new(),
        }
    }

    /// Serializes the program: an 8 byte little-endian entrypoint followed
    /// by one 16 byte record per instruction (u32 opcode, u8 literal tag,
    /// 3 bytes padding, 8 byte payload).
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes =
            Vec::with_capacity(HEADER_SIZE + self.instructions.len() * INSTRUCTION_RECORD_SIZE);
        bytes.extend_from_slice(&(self.entrypoint as u64).to_le_bytes());
        for instruction in &self.instructions {
            let (tag, payload) = literal_tag_and_payload(instruction.operand);
            bytes.extend_from_slice(&(instruction.opcode as u32).to_le_bytes());
            bytes.push(tag);
            bytes.extend_from_slice(&[0u8; 3]);
            bytes.extend_from_slice(&payload.to_le_bytes());
        }
        bytes
    }

    /// Decodes a serialized program. A trailing partial record is ignored.
    /// Decoded instructions carry no source locations.
    pub fn decode(bytes: &[u8]) -> Result<Program, ProgramError> {
        if bytes.len() < HEADER_SIZE {
            return Err(ProgramError::TruncatedHeader);
        }
        let entrypoint = u64::from_le_bytes(bytes[..HEADER_SIZE].try_into().unwrap()) as usize;
        let mut instructions = Vec::new();
        let records = bytes[HEADER_SIZE..].chunks_exact(INSTRUCTION_RECORD_SIZE);
        for (index, record) in records.enumerate() {
            let opcode_value = u32::from_le_bytes(record[0..4].try_into().unwrap());
            let opcode = Opcode::from_u32(opcode_value)
                .ok_or(ProgramError::UnknownOpcode(opcode_value, index))?;
            let tag = record[4];
            let payload = u64::from_le_bytes(record[8..16].try_into().unwrap());
            let operand = literal_from_record(tag, payload, index)?;
            instructions.push(Instruction::new(opcode, operand));
        }
        Ok(Program::new(entrypoint, instructions))
    }

    /// Memory-maps and decodes a program file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Program, ProgramError> {
        let file = File::open(path)?;
        let map = unsafe { Mmap::map(&file)? };
        Program::decode(&map)
    }

    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ProgramError> {
        let mut file = File::create(path)?;
        file.write_all(&self.encode())?;
        Ok(())
    }
}
