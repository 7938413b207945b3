use crate::builtins::BuiltinKind;
use crate::error::fatal;
use crate::value::{ObjId, Value};

/// GC mark state. `Unvisited` is the resting state between collections;
/// a cycle drives every slot through `Sweep` and survivors back out.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Mark {
    Unvisited,
    Keep,
    Sweep,
}

/// A heap object payload. One variant per value kind, plus the
/// tombstone left behind when a slot is swept.
pub enum Obj {
    Pair { car: Value, cdr: Value },
    Str(Vec<u8>),
    Symbol(String),
    Builtin(BuiltinKind),
    Lambda { params: Value, body: Value },
    Free,
}

struct Slot {
    obj: Obj,
    mark: Mark,
}

/// The object heap. Every live value is registered here; `ObjId` is an
/// index into `slots`. Swept slots go on the free list and are reused.
pub struct Heap {
    slots: Vec<Slot>,
    free_list: Vec<ObjId>,
}

impl Heap {
    pub fn new() -> Self {
        Heap {
            slots: Vec::with_capacity(1024),
            free_list: Vec::new(),
        }
    }

    /// Register a new object. Reuses a tombstoned slot when one is
    /// available; amortized O(1).
    fn alloc(&mut self, obj: Obj) -> ObjId {
        if let Some(id) = self.free_list.pop() {
            let slot = &mut self.slots[id.0 as usize];
            slot.obj = obj;
            slot.mark = Mark::Unvisited;
            return id;
        }
        let id = ObjId(self.slots.len() as u32);
        self.slots.push(Slot {
            obj,
            mark: Mark::Unvisited,
        });
        id
    }

    pub fn alloc_pair(&mut self, car: Value, cdr: Value) -> Value {
        Value::Pair(self.alloc(Obj::Pair { car, cdr }))
    }

    pub fn alloc_str(&mut self, bytes: Vec<u8>) -> Value {
        Value::Str(self.alloc(Obj::Str(bytes)))
    }

    /// Only the intern table should call this; going through it is what
    /// makes symbol identity unique per name.
    pub fn alloc_symbol(&mut self, name: String) -> Value {
        Value::Symbol(self.alloc(Obj::Symbol(name)))
    }

    pub fn alloc_builtin(&mut self, kind: BuiltinKind) -> Value {
        Value::Builtin(self.alloc(Obj::Builtin(kind)))
    }

    /// `params` must already be validated: nil or a proper list of
    /// symbols. Neither field is mutated after construction.
    pub fn alloc_lambda(&mut self, params: Value, body: Value) -> Value {
        Value::Lambda(self.alloc(Obj::Lambda { params, body }))
    }

    fn slot(&self, id: ObjId) -> &Slot {
        match self.slots.get(id.0 as usize) {
            Some(slot) => slot,
            None => fatal("heap handle out of range"),
        }
    }

    // Typed accessors. A handle whose slot holds the wrong payload kind
    // means a swept object escaped the root set or the interpreter
    // fabricated a handle; either is unrecoverable.

    pub fn car(&self, id: ObjId) -> Value {
        match &self.slot(id).obj {
            Obj::Pair { car, .. } => *car,
            _ => fatal("car: handle does not refer to a pair"),
        }
    }

    pub fn cdr(&self, id: ObjId) -> Value {
        match &self.slot(id).obj {
            Obj::Pair { cdr, .. } => *cdr,
            _ => fatal("cdr: handle does not refer to a pair"),
        }
    }

    /// Rewrite a pair's cdr. The reader uses this to splice a dotted
    /// tail onto a freshly built prefix; nothing else mutates pairs.
    pub fn set_cdr(&mut self, id: ObjId, val: Value) {
        match &mut self.slots[id.0 as usize].obj {
            Obj::Pair { cdr, .. } => *cdr = val,
            _ => fatal("set_cdr: handle does not refer to a pair"),
        }
    }

    pub fn str_bytes(&self, id: ObjId) -> &[u8] {
        match &self.slot(id).obj {
            Obj::Str(bytes) => bytes,
            _ => fatal("str_bytes: handle does not refer to a string"),
        }
    }

    pub fn sym_name(&self, id: ObjId) -> &str {
        match &self.slot(id).obj {
            Obj::Symbol(name) => name,
            _ => fatal("sym_name: handle does not refer to a symbol"),
        }
    }

    pub fn builtin_kind(&self, id: ObjId) -> BuiltinKind {
        match &self.slot(id).obj {
            Obj::Builtin(kind) => *kind,
            _ => fatal("builtin_kind: handle does not refer to a builtin"),
        }
    }

    pub fn lambda_params(&self, id: ObjId) -> Value {
        match &self.slot(id).obj {
            Obj::Lambda { params, .. } => *params,
            _ => fatal("lambda_params: handle does not refer to a lambda"),
        }
    }

    pub fn lambda_body(&self, id: ObjId) -> Value {
        match &self.slot(id).obj {
            Obj::Lambda { body, .. } => *body,
            _ => fatal("lambda_body: handle does not refer to a lambda"),
        }
    }

    /// Build a proper list from a slice of values.
    pub fn list(&mut self, values: &[Value]) -> Value {
        let mut result = Value::Nil;
        for &val in values.iter().rev() {
            result = self.alloc_pair(val, result);
        }
        result
    }

    /// Returns true if this value is a proper list (nil-terminated).
    pub fn is_proper_list(&self, val: Value) -> bool {
        let mut current = val;
        loop {
            match current {
                Value::Nil => return true,
                Value::Pair(id) => current = self.cdr(id),
                _ => return false,
            }
        }
    }

    /// Collect a proper list into a Vec. Returns None if not a proper list.
    pub fn list_to_vec(&self, val: Value) -> Option<Vec<Value>> {
        let mut result = Vec::new();
        let mut current = val;
        loop {
            match current {
                Value::Nil => return Some(result),
                Value::Pair(id) => {
                    result.push(self.car(id));
                    current = self.cdr(id);
                }
                _ => return None,
            }
        }
    }

    /// Structural equality: `eq`, or byte-equal strings, or pairs whose
    /// cars and cdrs are recursively `equal`.
    pub fn equal(&self, a: Value, b: Value) -> bool {
        let mut a = a;
        let mut b = b;
        loop {
            if a == b {
                return true;
            }
            match (a, b) {
                (Value::Str(x), Value::Str(y)) => {
                    return self.str_bytes(x) == self.str_bytes(y);
                }
                (Value::Pair(x), Value::Pair(y)) => {
                    if !self.equal(self.car(x), self.car(y)) {
                        return false;
                    }
                    a = self.cdr(x);
                    b = self.cdr(y);
                }
                _ => return false,
            }
        }
    }

    /// Number of registered slots, tombstones included.
    pub fn total_slots(&self) -> usize {
        self.slots.len()
    }

    pub fn free_count(&self) -> usize {
        self.free_list.len()
    }

    pub fn live_count(&self) -> usize {
        self.slots.len() - self.free_list.len()
    }

    pub fn mark_of(&self, id: ObjId) -> Mark {
        self.slot(id).mark
    }

    // === Collection phases ===

    /// Phase 1: condemn everything.
    pub fn begin_collection(&mut self) {
        for slot in &mut self.slots {
            slot.mark = Mark::Sweep;
        }
    }

    /// Phase 2 step: mark one value reachable, queueing it for traversal
    /// if it has outgoing references.
    pub fn mark_value(&mut self, val: Value, worklist: &mut Vec<ObjId>) {
        if let Some(id) = val.obj_id() {
            let slot = &mut self.slots[id.0 as usize];
            if slot.mark != Mark::Keep {
                slot.mark = Mark::Keep;
                worklist.push(id);
            }
        }
    }

    /// Phase 2 drain: pairs reach their car and cdr, lambdas their
    /// parameter list and body; the other kinds are leaves.
    pub fn process_worklist(&mut self, worklist: &mut Vec<ObjId>) {
        while let Some(id) = worklist.pop() {
            let (a, b) = match &self.slots[id.0 as usize].obj {
                Obj::Pair { car, cdr } => (*car, *cdr),
                Obj::Lambda { params, body } => (*params, *body),
                _ => continue,
            };
            self.mark_value(a, worklist);
            self.mark_value(b, worklist);
        }
    }

    /// Phase 3: free every condemned slot's payload, tombstone it, and
    /// rebuild the free list. Survivors return to the resting state.
    pub fn sweep(&mut self) {
        self.free_list.clear();
        for (i, slot) in self.slots.iter_mut().enumerate() {
            match slot.mark {
                Mark::Sweep => {
                    slot.obj = Obj::Free;
                    slot.mark = Mark::Unvisited;
                    self.free_list.push(ObjId(i as u32));
                }
                Mark::Keep | Mark::Unvisited => {
                    slot.mark = Mark::Unvisited;
                }
            }
        }
    }
}

impl Default for Heap {
    fn default() -> Self {
        Heap::new()
    }
}
