use std::error::Error;
use std::fmt;
use std::io;

/// Everything that can go wrong while resolving and registering a native
/// extension library, surfaced by IMPORT.
#[derive(Debug)]
pub enum ExtensionError {
    Open(String, String),
    MissingDriver(String),
    MissingSymbol(String, String),
    Duplicate(String),
    /// This target has no dynamic-loading support to back `libloading`.
    Unsupported,
}

impl fmt::Display for ExtensionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ExtensionError::Open(path, reason) => {
                write!(f, "IMPORT: {}: {}", path, reason)
            }
            ExtensionError::MissingDriver(path) => {
                write!(f, "IMPORT: {}: driver: symbol not found", path)
            }
            ExtensionError::MissingSymbol(path, name) => {
                write!(f, "IMPORT: {}: {}: symbol not found", path, name)
            }
            ExtensionError::Duplicate(name) => {
                write!(f, "IMPORT: external function {} already exists", name)
            }
            ExtensionError::Unsupported => {
                write!(f, "IMPORT: unsupported on this platform")
            }
        }
    }
}

impl Error for ExtensionError {}

/// Every way the interpreter's dispatch loop can fail. One enum covering
/// the runtime-type, runtime-stack, runtime-value and extension error
/// kinds from the error taxonomy; the loader's own binary-format failures
/// live in `dvmfile::Error` and are wrapped by `LoadError` below.
#[derive(Debug)]
pub enum RuntimeError {
    StackUnderflow(&'static str),
    TypeMismatch(&'static str),
    UndefinedLocal(u64),
    UndefinedGlobal(u64),
    DivideByZero,
    IndexOutOfRange {
        action: &'static str,
        index: f64,
        len: usize,
    },
    ListEmpty,
    MapKeyNotFound(String),
    ProtoNotPointer,
    ProtoChainTooLong,
    UnknownCompareAction(String),
    UnknownListAction(String),
    UnknownMapAction(String),
    UnknownExtension(String),
    CompareTypeMismatch,
    RetAtBaseFrame,
    InvalidOpcode(u8),
    PoolIndexOutOfRange(u64),
    BadJumpTarget(u64),
    Truncated(io::Error),
    Extension(ExtensionError),
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RuntimeError::StackUnderflow(op) => {
                write!(f, "the {} instruction requires more operands than the stack holds", op)
            }
            RuntimeError::TypeMismatch(op) => {
                write!(f, "the {} instruction received an operand of the wrong type", op)
            }
            RuntimeError::UndefinedLocal(id) => {
                write!(f, "variable {} does not exist in the local variable table", id)
            }
            RuntimeError::UndefinedGlobal(id) => {
                write!(f, "variable {} does not exist in the global variable table", id)
            }
            RuntimeError::DivideByZero => {
                write!(f, "the divisor in the DIV instruction cannot be 0")
            }
            RuntimeError::IndexOutOfRange { action, index, len } => write!(
                f,
                "{}: index {} is out of range for a collection of length {}",
                action, index, len
            ),
            RuntimeError::ListEmpty => {
                write!(f, "ACTION_LIST(POP): there must be one or more elements in the list to pop")
            }
            RuntimeError::MapKeyNotFound(key) => {
                write!(f, "ACTION_MAP(GET): {} key does not exist in the map", key)
            }
            RuntimeError::ProtoNotPointer => {
                write!(f, "ACTION_MAP(GET): __proto__ property must be a map")
            }
            RuntimeError::ProtoChainTooLong => {
                write!(f, "ACTION_MAP(GET): prototype chain exceeds the maximum depth")
            }
            RuntimeError::UnknownCompareAction(action) => {
                write!(f, "there is no {} operation in the COMPARE instruction", action)
            }
            RuntimeError::UnknownListAction(action) => {
                write!(f, "there is no {} operation in the ACTION_LIST instruction", action)
            }
            RuntimeError::UnknownMapAction(action) => {
                write!(f, "there is no {} operation in the ACTION_MAP instruction", action)
            }
            RuntimeError::UnknownExtension(name) => {
                write!(f, "CALLE: external function {} does not exist", name)
            }
            RuntimeError::CompareTypeMismatch => write!(
                f,
                "COMPARE: the prerequisite for comparison is that the types of both operands must match"
            ),
            RuntimeError::RetAtBaseFrame => write!(
                f,
                "the RET instruction cannot be used when the call stack holds only the base frame"
            ),
            RuntimeError::InvalidOpcode(byte) => write!(f, "unrecognised opcode byte {}", byte),
            RuntimeError::PoolIndexOutOfRange(id) => {
                write!(f, "pool id {} does not exist in the artifact", id)
            }
            RuntimeError::BadJumpTarget(offset) => {
                write!(f, "jump target {} falls outside the code section", offset)
            }
            RuntimeError::Truncated(err) => write!(f, "unexpected end of code stream: {}", err),
            RuntimeError::Extension(err) => write!(f, "{}", err),
        }
    }
}

impl Error for RuntimeError {}

impl From<ExtensionError> for RuntimeError {
    fn from(err: ExtensionError) -> RuntimeError {
        RuntimeError::Extension(err)
    }
}

impl From<io::Error> for RuntimeError {
    fn from(err: io::Error) -> RuntimeError {
        RuntimeError::Truncated(err)
    }
}

/// Wraps a binary-artifact failure reported by `dvmfile` with the VM-side
/// context of which file failed to load.
#[derive(Debug)]
pub struct LoadError(pub dvmfile::Error);

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Error for LoadError {}

impl From<dvmfile::Error> for LoadError {
    fn from(err: dvmfile::Error) -> LoadError {
        LoadError(err)
    }
}
