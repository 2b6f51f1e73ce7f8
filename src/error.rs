use std::fmt::Display;

use crate::instruction::SourceLocation;

/// Which of the bounded machine stacks an overflow or underflow refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackKind {
    Operand,
    Return,
    Str,
}

impl Display for StackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StackKind::Operand => write!(f, "stack"),
            StackKind::Return => write!(f, "return stack"),
            StackKind::Str => write!(f, "string stack"),
        }
    }
}

/// Every way a run can die. All of these are fatal; the machine never
/// recovers or rolls back state mutated before the failing instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum VmErrorKind {
    StackOverflow(StackKind),
    StackUnderflow(StackKind),
    TypeError(&'static str),
    DivisionByZero,
    IndexOutOfBounds(i64),
    InvalidJumpTarget(i64),
    SegmentationFault(i64),
    DoubleFreeOrInvalidPointer(i64),
    BufferOverflow { requested: usize, available: usize },
    UnknownSyscall(i64),
    UnknownFileDescriptor(i64),
    AssertionFailed,
    Io(String),
}

impl VmErrorKind {
    /// Attaches the failing instruction's source location, producing the
    /// error value the dispatch loop propagates.
    pub(crate) fn at(self, location: &SourceLocation) -> VmError {
        VmError {
            kind: self,
            location: location.clone(),
        }
    }
}

impl Display for VmErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VmErrorKind::StackOverflow(kind) => write!(f, "{} overflow", kind),
            VmErrorKind::StackUnderflow(kind) => write!(f, "{} underflow", kind),
            VmErrorKind::TypeError(message) => write!(f, "{}", message),
            VmErrorKind::DivisionByZero => write!(f, "division by zero"),
            VmErrorKind::IndexOutOfBounds(index) => {
                if *index < 0 {
                    write!(f, "index cannot be less than 0")
                } else {
                    write!(f, "index {} out of bounds", index)
                }
            }
            VmErrorKind::InvalidJumpTarget(target) => {
                write!(f, "jump target {} out of bounds", target)
            }
            VmErrorKind::SegmentationFault(address) => {
                write!(f, "segmentation fault: invalid pointer {}", address)
            }
            VmErrorKind::DoubleFreeOrInvalidPointer(address) => {
                write!(f, "double free or invalid heap pointer {}", address)
            }
            VmErrorKind::BufferOverflow { requested, available } => {
                write!(
                    f,
                    "buffer overflow: {} bytes into an allocation of {}",
                    requested, available
                )
            }
            VmErrorKind::UnknownSyscall(id) => write!(f, "unknown syscall {}", id),
            VmErrorKind::UnknownFileDescriptor(fd) => {
                write!(f, "unknown or reserved file descriptor {}", fd)
            }
            VmErrorKind::AssertionFailed => write!(f, "assertion failed"),
            VmErrorKind::Io(message) => write!(f, "io error: {}", message),
        }
    }
}

/// A fatal runtime error tagged with the source location of the instruction
/// that raised it.
#[derive(Debug, Clone, PartialEq)]
pub struct VmError {
    pub kind: VmErrorKind,
    pub location: SourceLocation,
}

impl Display for VmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ERROR ({}): {}", self.location, self.kind)
    }
}

impl std::error::Error for VmError {}

#[cfg(test)]
mod tests {
    use super::{StackKind, VmErrorKind};
    use crate::instruction::SourceLocation;

    #[test]
    fn error_carries_file_and_line() {
        let location = SourceLocation::new("main.asm", 5);
        let err = VmErrorKind::StackUnderflow(StackKind::Operand).at(&location);
        assert_eq!(err.to_string(), "ERROR (main.asm:5): stack underflow");
    }

    #[test]
    fn kind_messages() {
        assert_eq!(
            VmErrorKind::StackOverflow(StackKind::Return).to_string(),
            "return stack overflow"
        );
        assert_eq!(
            VmErrorKind::IndexOutOfBounds(-1).to_string(),
            "index cannot be less than 0"
        );
        assert_eq!(
            VmErrorKind::SegmentationFault(9999).to_string(),
            "segmentation fault: invalid pointer 9999"
        );
        assert_eq!(
            VmErrorKind::DoubleFreeOrInvalidPointer(3).to_string(),
            "double free or invalid heap pointer 3"
        );
        assert_eq!(VmErrorKind::AssertionFailed.to_string(), "assertion failed");
    }
}
