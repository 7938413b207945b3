use std::fmt;

/// Index into the heap registry. This is the GC handle: every object
/// kind lives in the same registry, so one id type covers them all.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjId(pub u32);

/// The fundamental value. 16 bytes: discriminant + payload.
/// Copy semantics — object payloads live in the heap registry.
///
/// Nil is a dedicated sentinel, not an object: it is the empty list,
/// boolean false, and the default uninitialized value all at once.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Value {
    Nil,
    Fixnum(i64),
    Symbol(ObjId),
    Str(ObjId),
    Pair(ObjId),
    Builtin(ObjId),
    Lambda(ObjId),
}

impl Value {
    pub fn is_nil(self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn is_pair(self) -> bool {
        matches!(self, Value::Pair(_))
    }

    pub fn is_symbol(self) -> bool {
        matches!(self, Value::Symbol(_))
    }

    pub fn is_fixnum(self) -> bool {
        matches!(self, Value::Fixnum(_))
    }

    /// Anything other than nil is true.
    pub fn is_truthy(self) -> bool {
        !self.is_nil()
    }

    pub fn as_pair(self) -> Option<ObjId> {
        match self {
            Value::Pair(id) => Some(id),
            _ => None,
        }
    }

    pub fn as_symbol(self) -> Option<ObjId> {
        match self {
            Value::Symbol(id) => Some(id),
            _ => None,
        }
    }

    pub fn as_fixnum(self) -> Option<i64> {
        match self {
            Value::Fixnum(n) => Some(n),
            _ => None,
        }
    }

    /// The registry handle, if this value carries one.
    /// Nil and fixnums are immediate and have no heap presence.
    pub fn obj_id(self) -> Option<ObjId> {
        match self {
            Value::Nil | Value::Fixnum(_) => None,
            Value::Symbol(id)
            | Value::Str(id)
            | Value::Pair(id)
            | Value::Builtin(id)
            | Value::Lambda(id) => Some(id),
        }
    }

    /// Identity equality: same fixnum value, or same heap object.
    /// Two strings with identical bytes but distinct handles are not `eq`.
    pub fn eq_val(self, other: Value) -> bool {
        self == other
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "Nil"),
            Value::Fixnum(n) => write!(f, "Fixnum({})", n),
            Value::Symbol(id) => write!(f, "Sym({})", id.0),
            Value::Str(id) => write!(f, "Str({})", id.0),
            Value::Pair(id) => write!(f, "Pair({})", id.0),
            Value::Builtin(id) => write!(f, "Builtin({})", id.0),
            Value::Lambda(id) => write!(f, "Lambda({})", id.0),
        }
    }
}

impl fmt::Debug for ObjId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjId({})", self.0)
    }
}
