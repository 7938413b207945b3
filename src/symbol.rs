use std::collections::HashMap;

use crate::heap::Heap;
use crate::value::Value;

/// Interned symbol table. Each unique name maps to a single canonical
/// symbol object, so `(eq 'foo 'foo)` is t: symbol identity is handle
/// identity.
pub struct SymbolTable {
    by_name: HashMap<String, Value>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable {
            by_name: HashMap::new(),
        }
    }

    /// Intern a name. Returns the existing symbol if already interned,
    /// or allocates a new one carrying an owned copy of the name.
    pub fn intern(&mut self, heap: &mut Heap, name: &str) -> Value {
        if let Some(&sym) = self.by_name.get(name) {
            return sym;
        }
        let sym = heap.alloc_symbol(name.to_string());
        self.by_name.insert(name.to_string(), sym);
        sym
    }

    /// Look up a symbol by name without interning.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        self.by_name.get(name).copied()
    }

    /// Every interned symbol. The whole table is a GC root, which is
    /// why interned symbols live forever in practice.
    pub fn iter(&self) -> impl Iterator<Item = Value> + '_ {
        self.by_name.values().copied()
    }

    /// Total number of interned symbols.
    pub fn count(&self) -> usize {
        self.by_name.len()
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        SymbolTable::new()
    }
}

/// Well-known symbols, interned once at machine construction so the
/// evaluator and builtins can compare by handle instead of by name.
pub struct Syms {
    pub t: Value,
    pub quote: Value,

    // Signal names (§ user-visible error channel).
    pub invalid_syntax: Value,
    pub invalid_function: Value,
    pub void_variable: Value,
    pub wrong_type_argument: Value,
    pub wrong_number_of_arguments: Value,
    pub lisp_error: Value,

    // Predicate names carried as wrong-type-argument data.
    pub listp: Value,
    pub symbolp: Value,
    pub integerp: Value,
    pub stringp: Value,
}

impl Syms {
    pub fn new(heap: &mut Heap, symbols: &mut SymbolTable) -> Self {
        Syms {
            t: symbols.intern(heap, "t"),
            quote: symbols.intern(heap, "quote"),
            invalid_syntax: symbols.intern(heap, "invalid-syntax"),
            invalid_function: symbols.intern(heap, "invalid-function"),
            void_variable: symbols.intern(heap, "void-variable"),
            wrong_type_argument: symbols.intern(heap, "wrong-type-argument"),
            wrong_number_of_arguments: symbols.intern(heap, "wrong-number-of-arguments"),
            lisp_error: symbols.intern(heap, "lisp-error"),
            listp: symbols.intern(heap, "listp"),
            symbolp: symbols.intern(heap, "symbolp"),
            integerp: symbols.intern(heap, "integerp"),
            stringp: symbols.intern(heap, "stringp"),
        }
    }
}
