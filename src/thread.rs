use std::collections::HashMap;

use crate::extension::NativeFn;
use crate::frame::Frame;
use crate::value::Value;

/// The full state a single-threaded run carries: the call stack (never
/// empty; index 0 is the base frame RET must never pop past), the global
/// table, and the extension table populated by IMPORT.
///
/// Loaded libraries are kept alive for the thread's whole lifetime so the
/// native function pointers resolved out of them stay valid; nothing ever
/// needs to unload one.
pub struct Thread {
    pub call_stack: Vec<Frame>,
    pub globals: HashMap<u64, Value>,
    pub extensions: HashMap<String, NativeFn>,
    libraries: Vec<libloading::Library>,
}

impl Thread {
    pub fn new() -> Thread {
        Thread {
            call_stack: vec![Frame::new()],
            globals: HashMap::new(),
            extensions: HashMap::new(),
            libraries: Vec::new(),
        }
    }

    pub fn current(&self) -> &Frame {
        self.call_stack.last().expect("call stack is never empty")
    }

    pub fn current_mut(&mut self) -> &mut Frame {
        self.call_stack
            .last_mut()
            .expect("call stack is never empty")
    }

    pub fn keep_library_alive(&mut self, library: libloading::Library) {
        self.libraries.push(library);
    }
}

impl Default for Thread {
    fn default() -> Thread {
        Thread::new()
    }
}
