//! Test-only byte-stream plumbing for capturing what a program writes.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use crate::program::Program;
use crate::vm::{Vm, VmConfig};

/// A cloneable in-memory sink. Tests keep one handle and give the machine
/// the other.
#[derive(Clone, Default)]
pub(crate) struct SharedBuffer {
    bytes: Rc<RefCell<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> SharedBuffer {
        SharedBuffer::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes.borrow()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.bytes.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// A machine reading empty input, with stdout and stderr captured.
pub(crate) fn vm_with_streams(program: Program) -> (Vm, SharedBuffer, SharedBuffer) {
    vm_with_input(program, &[])
}

/// Same, but with the given bytes available on the machine's input stream.
pub(crate) fn vm_with_input(program: Program, input: &[u8]) -> (Vm, SharedBuffer, SharedBuffer) {
    let output = SharedBuffer::new();
    let error_out = SharedBuffer::new();
    let vm = Vm::with_io(
        program,
        VmConfig::default(),
        Box::new(std::io::Cursor::new(input.to_vec())),
        Box::new(output.clone()),
        Box::new(error_out.clone()),
    );
    (vm, output, error_out)
}
