use std::fmt::Display;

use crate::error::VmErrorKind;

/// A single tagged runtime value. Everything the machine moves between the
/// operand stack, the registers and the heap is one of these. Literals are
/// small and copied by value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Literal {
    None,
    Int(i64),
    Float(f64),
    Char(char),
    Pointer(i64),
    Null,
}

impl Literal {
    /// Heap address carried by this literal, if it can act as one. Pointers
    /// are plain heap indices, so `Int` qualifies too.
    pub fn as_address(&self) -> Option<i64> {
        match self {
            Literal::Int(value) | Literal::Pointer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn add(self, other: Literal) -> Result<Literal, VmErrorKind> {
        match (self, other) {
            (Literal::Int(a), Literal::Int(b)) => Ok(Literal::Int(a.wrapping_add(b))),
            (Literal::Float(a), Literal::Float(b)) => Ok(Literal::Float(a + b)),
            _ => Err(VmErrorKind::TypeError("\"add\" requires operands of same type")),
        }
    }

    pub fn sub(self, other: Literal) -> Result<Literal, VmErrorKind> {
        match (self, other) {
            (Literal::Int(a), Literal::Int(b)) => Ok(Literal::Int(a.wrapping_sub(b))),
            (Literal::Float(a), Literal::Float(b)) => Ok(Literal::Float(a - b)),
            _ => Err(VmErrorKind::TypeError("\"sub\" requires operands of same type")),
        }
    }

    pub fn mul(self, other: Literal) -> Result<Literal, VmErrorKind> {
        match (self, other) {
            (Literal::Int(a), Literal::Int(b)) => Ok(Literal::Int(a.wrapping_mul(b))),
            (Literal::Float(a), Literal::Float(b)) => Ok(Literal::Float(a * b)),
            _ => Err(VmErrorKind::TypeError("\"mul\" requires operands of same type")),
        }
    }

    pub fn div(self, other: Literal) -> Result<Literal, VmErrorKind> {
        match (self, other) {
            (Literal::Int(_), Literal::Int(0)) => Err(VmErrorKind::DivisionByZero),
            (Literal::Int(a), Literal::Int(b)) => Ok(Literal::Int(a.wrapping_div(b))),
            (Literal::Float(a), Literal::Float(b)) => {
                if b == 0.0 {
                    return Err(VmErrorKind::DivisionByZero);
                }
                Ok(Literal::Float(a / b))
            }
            _ => Err(VmErrorKind::TypeError("\"div\" requires operands of same type")),
        }
    }

    pub fn modulo(self, other: Literal) -> Result<Literal, VmErrorKind> {
        match (self, other) {
            (Literal::Int(_), Literal::Int(0)) => Err(VmErrorKind::DivisionByZero),
            (Literal::Int(a), Literal::Int(b)) => Ok(Literal::Int(a.wrapping_rem(b))),
            (Literal::Float(a), Literal::Float(b)) => {
                if b == 0.0 {
                    return Err(VmErrorKind::DivisionByZero);
                }
                Ok(Literal::Float(a % b))
            }
            _ => Err(VmErrorKind::TypeError("\"mod\" requires operands of same type")),
        }
    }

    pub fn greater(self, other: Literal) -> Result<bool, VmErrorKind> {
        match (self, other) {
            (Literal::Int(a), Literal::Int(b)) => Ok(a > b),
            (Literal::Float(a), Literal::Float(b)) => Ok(a > b),
            _ => Err(VmErrorKind::TypeError(
                "\"greater\" comparison requires operands of same type",
            )),
        }
    }

    pub fn less(self, other: Literal) -> Result<bool, VmErrorKind> {
        match (self, other) {
            (Literal::Int(a), Literal::Int(b)) => Ok(a < b),
            (Literal::Float(a), Literal::Float(b)) => Ok(a < b),
            _ => Err(VmErrorKind::TypeError(
                "\"less\" comparison requires operands of same type",
            )),
        }
    }

    pub fn greater_or_equal(self, other: Literal) -> Result<bool, VmErrorKind> {
        match (self, other) {
            (Literal::Int(a), Literal::Int(b)) => Ok(a >= b),
            (Literal::Float(a), Literal::Float(b)) => Ok(a >= b),
            _ => Err(VmErrorKind::TypeError(
                "\"greater or equal\" comparison requires operands of same type",
            )),
        }
    }

    pub fn less_or_equal(self, other: Literal) -> Result<bool, VmErrorKind> {
        match (self, other) {
            (Literal::Int(a), Literal::Int(b)) => Ok(a <= b),
            (Literal::Float(a), Literal::Float(b)) => Ok(a <= b),
            _ => Err(VmErrorKind::TypeError(
                "\"less or equal\" comparison requires operands of same type",
            )),
        }
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::None => write!(f, "NONE"),
            Literal::Int(value) => write!(f, "INT {}", value),
            Literal::Float(value) => write!(f, "FLOAT {:.6}", value),
            Literal::Char(value) => write!(f, "CHAR {}", value),
            Literal::Pointer(value) => write!(f, "PTR {}", value),
            Literal::Null => write!(f, "NULL"),
        }
    }
}
