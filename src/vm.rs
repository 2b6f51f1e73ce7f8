use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use crate::error::{StackKind, VmError, VmErrorKind};
use crate::instruction::{Instruction, Opcode};
use crate::literal::Literal;
use crate::memory::{BoundedStack, Heap};
use crate::program::{Program, ProgramError};

/// Size of the register file.
pub const REGISTER_COUNT: usize = 16;

/// How a finished run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunResult {
    /// `halt` was executed or the instruction pointer ran off the end.
    Halted,
    /// The program requested process termination with this code.
    Exited(i32),
}

/// Configuration options for the virtual machine
#[derive(Debug, Clone, Copy, Default)]
pub struct VmConfig {
    /// Dump machine state to stderr before each executed instruction.
    pub debug: bool,
    /// Dump the non-empty heap cells to stderr before each executed
    /// instruction.
    pub debug_heap: bool,
    /// Suppress everything except what the program itself produces.
    pub quiet: bool,
}

impl VmConfig {
    pub fn new(debug: bool, debug_heap: bool, quiet: bool) -> VmConfig {
        VmConfig {
            debug,
            debug_heap,
            quiet,
        }
    }
}

/// The root component of the virtual machine
pub struct Vm {
    config: VmConfig,
    instructions: Vec<Instruction>,
    entrypoint: usize,
    instruction_pointer: usize,
    jumped: bool,
    pub(crate) stack: BoundedStack<Literal>,
    return_stack: BoundedStack<usize>,
    pub(crate) string_stack: BoundedStack<i64>,
    string_table: Vec<i64>,
    heap_seed: Vec<Literal>,
    pub(crate) heap: Heap,
    pub(crate) registers: [Literal; REGISTER_COUNT],
    pub(crate) file_descriptors: HashMap<i64, File>,
    pub(crate) input: Box<dyn Read>,
    pub(crate) output: Box<dyn Write>,
    pub(crate) error_out: Box<dyn Write>,
    pub(crate) exited: Option<i32>,
}

impl Vm {
    /// Creates a machine wired to the process standard streams
    ///
    /// - `program` the assembler or decoder output to execute
    /// - `config` the configuration of the virtual machine
    pub fn new(program: Program, config: VmConfig) -> Vm {
        Vm::with_io(
            program,
            config,
            Box::new(io::stdin()),
            Box::new(io::stdout()),
            Box::new(io::stderr()),
        )
    }

    /// Creates a machine with explicit input/output byte streams, so
    /// embedders and tests can capture what the program does
    pub fn with_io(
        program: Program,
        config: VmConfig,
        input: Box<dyn Read>,
        output: Box<dyn Write>,
        error_out: Box<dyn Write>,
    ) -> Vm {
        let Program {
            entrypoint,
            instructions,
            string_table,
            heap_seed,
        } = program;
        Vm {
            config,
            instruction_pointer: entrypoint,
            entrypoint,
            instructions,
            jumped: false,
            stack: BoundedStack::new(StackKind::Operand),
            return_stack: BoundedStack::new(StackKind::Return),
            string_stack: BoundedStack::from_entries(StackKind::Str, string_table.clone()),
            string_table,
            heap: Heap::seed(heap_seed.clone()),
            heap_seed,
            registers: [Literal::None; REGISTER_COUNT],
            file_descriptors: HashMap::new(),
            input,
            output,
            error_out,
            exited: None,
        }
    }

    /// Loads a serialized program file and wraps it in a machine
    pub fn from_file<P: AsRef<Path>>(path: P, config: VmConfig) -> Result<Vm, ProgramError> {
        let program = Program::from_file(path)?;
        Ok(Vm::new(program, config))
    }

    /// Resets the machine state without reloading the program
    pub fn reset(&mut self) {
        self.instruction_pointer = self.entrypoint;
        self.jumped = false;
        self.stack = BoundedStack::new(StackKind::Operand);
        self.return_stack = BoundedStack::new(StackKind::Return);
        self.string_stack =
            BoundedStack::from_entries(StackKind::Str, self.string_table.clone());
        self.heap = Heap::seed(self.heap_seed.clone());
        self.registers = [Literal::None; REGISTER_COUNT];
        self.file_descriptors.clear();
        self.exited = None;
    }

    /// Returns the index of the next instruction to execute. None once the
    /// program has halted, exited or run off the end.
    pub fn next_instruction(&self) -> Option<usize> {
        if self.exited.is_some() {
            return None;
        }
        if self.instruction_pointer < self.instructions.len() {
            Some(self.instruction_pointer)
        } else {
            None
        }
    }

    /// Executes instructions from the entrypoint until the program ends or
    /// a fatal error occurs.
    pub fn run(&mut self) -> Result<RunResult, VmError> {
        while let Some(ip) = self.next_instruction() {
            self.exec(ip)?;
        }
        Ok(match self.exited {
            Some(code) => RunResult::Exited(code),
            None => RunResult::Halted,
        })
    }

    /// Executes the instruction at `ip` and advances the instruction
    /// pointer, unless the instruction set it itself.
    pub fn exec(&mut self, ip: usize) -> Result<(), VmError> {
        if self.config.debug {
            dbg!(ip);
            dbg!(&self.instructions[ip]);
            dbg!(self.stack.as_slice());
            dbg!(self.return_stack.as_slice());
            dbg!(self.string_stack.as_slice());
        }
        if self.config.debug_heap {
            dbg!(self.heap.debug_dump());
        }
        self.jumped = false;
        let instruction = self.instructions[ip].clone();
        self.step(&instruction)
            .map_err(|kind| kind.at(&instruction.location))?;
        if !self.jumped {
            self.instruction_pointer += 1;
        }
        Ok(())
    }

    fn step(&mut self, instruction: &Instruction) -> Result<(), VmErrorKind> {
        match instruction.opcode {
            Opcode::Noop => Ok(()),
            Opcode::Push => self.stack.push(instruction.operand),
            Opcode::Pop => self.stack.pop().map(|_| ()),
            Opcode::Dup => self.stack.dup_top(),
            Opcode::InDup => {
                let index = operand_int(instruction, "indup requires an integer operand")?;
                self.stack.index_dup(index)
            }
            Opcode::Swap => self.stack.swap_top(),
            Opcode::InSwap => {
                let index = operand_int(instruction, "inswap requires an integer operand")?;
                self.stack.index_swap(index)
            }
            Opcode::Add => self.binary_op(Literal::add),
            Opcode::Sub => self.binary_op(Literal::sub),
            Opcode::Mul => self.binary_op(Literal::mul),
            Opcode::Div => self.binary_op(Literal::div),
            Opcode::Mod => self.binary_op(Literal::modulo),
            Opcode::Cmpe => self.compare_op(|b, a| Ok(b == a)),
            Opcode::Cmpne => self.compare_op(|b, a| Ok(b != a)),
            Opcode::Cmpg => self.compare_op(Literal::greater),
            Opcode::Cmpl => self.compare_op(Literal::less),
            Opcode::Cmpge => self.compare_op(Literal::greater_or_equal),
            Opcode::Cmple => self.compare_op(Literal::less_or_equal),
            Opcode::Jmp => {
                let target = self.jump_target(instruction)?;
                self.jump(target);
                Ok(())
            }
            Opcode::Zjmp => {
                let condition = self.pop_condition("zjmp requires an integer condition")?;
                if condition == 0 {
                    let target = self.jump_target(instruction)?;
                    self.jump(target);
                }
                Ok(())
            }
            Opcode::Nzjmp => {
                let condition = self.pop_condition("nzjmp requires an integer condition")?;
                if condition != 0 {
                    let target = self.jump_target(instruction)?;
                    self.jump(target);
                }
                Ok(())
            }
            Opcode::Call => {
                let target = self.jump_target(instruction)?;
                self.return_stack.push(self.instruction_pointer + 1)?;
                self.jump(target);
                Ok(())
            }
            Opcode::Ret => {
                let target = self.return_stack.pop()?;
                if target > self.instructions.len() {
                    return Err(VmErrorKind::InvalidJumpTarget(target as i64));
                }
                self.jump(target);
                Ok(())
            }
            Opcode::Ref => {
                let value = self.stack.pop()?;
                let address = self.heap.push(value);
                self.stack.push(Literal::Int(address as i64))
            }
            Opcode::Deref => {
                let pointer = self.stack.pop()?;
                let address = pointer
                    .as_address()
                    .ok_or(VmErrorKind::TypeError("deref requires a pointer (int)"))?;
                let value = self.heap.load(address)?;
                self.stack.push(value)
            }
            Opcode::Index => {
                let value = match instruction.operand {
                    Literal::None => self.stack.pop()?,
                    operand => operand,
                };
                let index = match self.stack.pop()? {
                    Literal::Int(index) => index,
                    _ => return Err(VmErrorKind::TypeError("index requires an integer index")),
                };
                if index < 0 {
                    return Err(VmErrorKind::IndexOutOfBounds(index));
                }
                // the pointer stays on the stack
                let address = self
                    .stack
                    .peek()?
                    .as_address()
                    .ok_or(VmErrorKind::TypeError("index requires a pointer (int)"))?;
                self.heap.store(address + index, value)
            }
            Opcode::MovReg => {
                let register = self.register_index(instruction)?;
                self.registers[register] = self.stack.peek()?;
                Ok(())
            }
            Opcode::PushReg => {
                let register = self.register_index(instruction)?;
                self.stack.push(self.registers[register])
            }
            Opcode::MovStr => match self.stack.pop()? {
                Literal::Char(c) => {
                    let address = self.heap.push(Literal::Char(c));
                    self.heap.push(Literal::Char('\0'));
                    self.string_stack.push(address as i64)
                }
                Literal::Int(pointer) | Literal::Pointer(pointer) => {
                    self.string_stack.push(pointer)
                }
                _ => Err(VmErrorKind::TypeError(
                    "mov_str requires char or int (pointer)",
                )),
            },
            Opcode::GetStr => {
                let index = operand_int(instruction, "get_str requires an integer operand")?;
                let pointer = self.string_stack.get(index)?;
                self.stack.push(Literal::Int(pointer))
            }
            Opcode::PopStr => self.string_stack.pop().map(|_| ()),
            Opcode::DupStr => self.string_stack.dup_top(),
            Opcode::SwapStr => self.string_stack.swap_top(),
            Opcode::InDupStr => {
                let index = operand_int(instruction, "indup_str requires an integer operand")?;
                self.string_stack.index_dup(index)
            }
            Opcode::InSwapStr => {
                let index = operand_int(instruction, "inswap_str requires an integer operand")?;
                self.string_stack.index_swap(index)
            }
            Opcode::Itof => match self.stack.pop()? {
                Literal::Int(value) => self.stack.push(Literal::Float(value as f64)),
                _ => Err(VmErrorKind::TypeError("itof requires an integer")),
            },
            Opcode::Ftoi => match self.stack.pop()? {
                Literal::Float(value) => self.stack.push(Literal::Int(value.trunc() as i64)),
                _ => Err(VmErrorKind::TypeError("ftoi requires a float")),
            },
            Opcode::Print => {
                let value = self.stack.pop()?;
                writeln!(self.output, "{}", value)
                    .and_then(|_| self.output.flush())
                    .map_err(|err| VmErrorKind::Io(err.to_string()))
            }
            Opcode::Native => {
                let id = operand_int(instruction, "native requires an integer syscall id")?;
                self.native(id)
            }
            Opcode::Halt => {
                self.instruction_pointer = self.instructions.len();
                self.jumped = true;
                Ok(())
            }
        }
    }

    /// Pops `a` then `b` and pushes `b OP a`, so the first-pushed operand is
    /// the left-hand side.
    fn binary_op(
        &mut self,
        op: fn(Literal, Literal) -> Result<Literal, VmErrorKind>,
    ) -> Result<(), VmErrorKind> {
        let a = self.stack.pop()?;
        let b = self.stack.pop()?;
        let result = op(b, a)?;
        self.stack.push(result)
    }

    /// Comparisons push both operands back before the 0/1 result, so the
    /// tested values survive the test.
    fn compare_op(
        &mut self,
        op: fn(Literal, Literal) -> Result<bool, VmErrorKind>,
    ) -> Result<(), VmErrorKind> {
        let a = self.stack.pop()?;
        let b = self.stack.pop()?;
        let result = op(b, a)?;
        self.stack.push(b)?;
        self.stack.push(a)?;
        self.stack.push(Literal::Int(result as i64))
    }

    fn pop_condition(&mut self, expected: &'static str) -> Result<i64, VmErrorKind> {
        match self.stack.pop()? {
            Literal::Int(value) => Ok(value),
            _ => Err(VmErrorKind::TypeError(expected)),
        }
    }

    fn jump_target(&self, instruction: &Instruction) -> Result<usize, VmErrorKind> {
        let target = operand_int(instruction, "jump target must be an integer")?;
        if target < 0 || target as usize >= self.instructions.len() {
            return Err(VmErrorKind::InvalidJumpTarget(target));
        }
        Ok(target as usize)
    }

    fn jump(&mut self, target: usize) {
        self.instruction_pointer = target;
        self.jumped = true;
    }

    fn register_index(&self, instruction: &Instruction) -> Result<usize, VmErrorKind> {
        let register = operand_int(instruction, "register index must be an integer")?;
        if register < 0 || register as usize >= REGISTER_COUNT {
            return Err(VmErrorKind::IndexOutOfBounds(register));
        }
        Ok(register as usize)
    }
}

fn operand_int(instruction: &Instruction, expected: &'static str) -> Result<i64, VmErrorKind> {
    match instruction.operand {
        Literal::Int(value) => Ok(value),
        _ => Err(VmErrorKind::TypeError(expected)),
    }
}
