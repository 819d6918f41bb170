use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// A list heap object: an ordered, index-addressable, growable sequence of values.
pub type List = RefCell<Vec<Value>>;

/// A map heap object: a keyed collection from string to value, supporting a
/// `"__proto__"` entry that chains to another map (see `interpreter::collections`).
pub type Map = RefCell<HashMap<String, Value>>;

/// The richer subtype a Pointer carries internally, so that a wrong-kind
/// access fails with a precise diagnostic instead of reinterpreting memory.
/// Purely additive: no opcode observes this tag directly, only the
/// interpreter's own argument checks.
#[derive(Debug)]
pub enum PointerKind {
    /// A heap-allocated absolute byte offset, used as a CALL target.
    Addr(u64),
    List(List),
    Map(Map),
}

impl PointerKind {
    pub fn kind_name(&self) -> &'static str {
        match self {
            PointerKind::Addr(_) => "address",
            PointerKind::List(_) => "list",
            PointerKind::Map(_) => "map",
        }
    }
}

/// An opaque, reference-counted handle to one of the three Pointer referents.
/// Cloning a Pointer shares the same heap object; identity is compared with
/// `Rc::ptr_eq`/`Rc::as_ptr`, never by comparing contents.
#[derive(Clone, Debug)]
pub struct Pointer(Rc<PointerKind>);

impl Pointer {
    pub fn addr(offset: u64) -> Pointer {
        Pointer(Rc::new(PointerKind::Addr(offset)))
    }

    pub fn list() -> Pointer {
        Pointer(Rc::new(PointerKind::List(RefCell::new(Vec::new()))))
    }

    pub fn map() -> Pointer {
        Pointer(Rc::new(PointerKind::Map(RefCell::new(HashMap::new()))))
    }

    pub fn kind(&self) -> &PointerKind {
        &self.0
    }

    pub fn as_addr(&self) -> Option<u64> {
        match &*self.0 {
            PointerKind::Addr(offset) => Some(*offset),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&List> {
        match &*self.0 {
            PointerKind::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match &*self.0 {
            PointerKind::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn ptr_eq(&self, other: &Pointer) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// A stable total order over heap identity, used only to give COMPARE's
    /// relational actions (GRE/LES/GE/LE) a well-defined meaning on Pointer
    /// operands. Not an address a program can otherwise observe.
    pub fn identity(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }
}

/// The VM's tagged value. Three variants, matching the data model exactly;
/// `String` and `Pointer` are reference-counted so cloning a Value onto
/// another stack slot never copies the underlying text or heap object.
#[derive(Clone, Debug)]
pub enum Value {
    Number(f64),
    String(Rc<String>),
    Pointer(Pointer),
}

impl Value {
    pub fn string<S: Into<String>>(s: S) -> Value {
        Value::String(Rc::new(s.into()))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Pointer(p) => p.kind().kind_name(),
        }
    }

    /// Truthiness used by NOT, JMPC, and COMPARE's AND/OR actions. A Pointer
    /// is always truthy here: every Pointer this implementation's own
    /// opcodes construct is non-null (see DESIGN.md).
    pub fn truthy(&self) -> bool {
        match self {
            Value::Number(n) => *n != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Pointer(_) => true,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Pointer(p) => write!(f, "<{}>", p.kind().kind_name()),
        }
    }
}
