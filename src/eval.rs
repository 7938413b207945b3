use crate::builtins::{self, Arity, BuiltinKind};
use crate::env::Env;
use crate::error::{fatal, LispError, LispResult};
use crate::heap::Heap;
use crate::printer::stringify;
use crate::reader;
use crate::symbol::{SymbolTable, Syms};
use crate::value::{ObjId, Value};

/// The evaluation machine. All interpreter state lives here so the
/// collector can find its roots.
pub struct Machine {
    pub heap: Heap,
    pub symbols: SymbolTable,
    pub syms: Syms,
    pub env: Env,

    /// Most recently parsed top-level form. Rooted so the form under
    /// evaluation survives the collection at the next quiescent point.
    pub last_form: Value,
    /// The single pending-signal slot; nil while the channel is clear.
    pending_signal: Value,
    /// Set by (garbage-collect); honored by the driver after the
    /// current top-level form.
    pub gc_requested: bool,
    /// Print each form entering eval to stderr (set via MEL_TRACE=1).
    pub trace: bool,
}

impl Machine {
    pub fn new() -> Self {
        let mut heap = Heap::new();
        let mut symbols = SymbolTable::new();
        let syms = Syms::new(&mut heap, &mut symbols);
        let mut env = Env::new();

        // t evaluates to itself.
        env.assign(expect_symbol_id(syms.t), syms.t);

        // Install the builtin suite under the display names.
        for kind in BuiltinKind::ALL {
            let sym = symbols.intern(&mut heap, kind.name());
            let builtin = heap.alloc_builtin(kind);
            env.assign(expect_symbol_id(sym), builtin);
        }

        Machine {
            heap,
            symbols,
            syms,
            env,
            last_form: Value::Nil,
            pending_signal: Value::Nil,
            gc_requested: false,
            trace: false,
        }
    }

    pub fn bool_value(&self, b: bool) -> Value {
        if b {
            self.syms.t
        } else {
            Value::Nil
        }
    }

    // ========================================================================
    // The signal channel
    // ========================================================================

    /// Raise a signal: build the `(symbol . data)` cons, park it in the
    /// pending slot, and return the error to propagate. The slot holds
    /// at most one signal; a second raise before the handler clears the
    /// first means some caller kept working past an error.
    pub fn signal(&mut self, sym: Value, data: Value) -> LispError {
        if !self.pending_signal.is_nil() {
            fatal("signal raised while another is pending");
        }
        let cons = self.heap.alloc_pair(sym, data);
        self.pending_signal = cons;
        LispError::Signal(cons)
    }

    pub fn pending_signal(&self) -> Value {
        self.pending_signal
    }

    /// The top-level handler's transition out of the signalled state.
    pub fn clear_signal(&mut self) {
        self.pending_signal = Value::Nil;
    }

    // ========================================================================
    // Reading
    // ========================================================================

    /// Read one top-level form from `input` starting at byte `pos`.
    /// The parsed form becomes `last_form`; reader signals land in the
    /// pending slot like any other.
    pub fn read_form(&mut self, input: &str, pos: usize) -> LispResult<Option<(Value, usize)>> {
        let result =
            reader::read_one_at(input, pos, &mut self.heap, &mut self.symbols, &self.syms);
        match result {
            Ok(Some((val, new_pos))) => {
                self.last_form = val;
                Ok(Some((val, new_pos)))
            }
            Ok(None) => Ok(None),
            Err(err) => {
                if let LispError::Signal(cons) = &err {
                    if !self.pending_signal.is_nil() {
                        fatal("signal raised while another is pending");
                    }
                    self.pending_signal = *cons;
                }
                Err(err)
            }
        }
    }

    // ========================================================================
    // Evaluation
    // ========================================================================

    /// Evaluate one expression under the current dynamic environment.
    pub fn eval(&mut self, expr: Value) -> LispResult<Value> {
        if !self.pending_signal.is_nil() {
            fatal("eval entered with a signal pending");
        }
        if self.trace {
            eprintln!("trace: {}", stringify(expr, &self.heap));
        }

        match expr {
            // Self-evaluating kinds.
            Value::Nil | Value::Fixnum(_) | Value::Str(_) | Value::Builtin(_) => Ok(expr),
            Value::Symbol(id) => match self.env.lookup(id) {
                Some(val) => Ok(val),
                None => Err(self.signal(self.syms.void_variable, expr)),
            },
            Value::Pair(id) => self.eval_call(id),
            // Lambdas are produced by evaluation, never by the reader,
            // so one arriving here means corrupted interpreter state.
            Value::Lambda(_) => fatal("unknown object kind in eval"),
        }
    }

    /// Evaluate a sequence in order; the value is the last result, nil
    /// for an empty sequence.
    pub fn eval_progn(&mut self, exprs: &[Value]) -> LispResult<Value> {
        let mut result = Value::Nil;
        for &expr in exprs {
            result = self.eval(expr)?;
        }
        Ok(result)
    }

    /// Evaluate every form in `input`, collecting between forms, and
    /// return the last result.
    pub fn eval_string(&mut self, input: &str) -> LispResult<Value> {
        let mut pos = 0;
        let mut result = Value::Nil;
        while let Some((expr, new_pos)) = self.read_form(input, pos)? {
            pos = new_pos;
            result = self.eval(expr)?;
            self.collect(&[result]);
        }
        Ok(result)
    }

    fn eval_call(&mut self, id: ObjId) -> LispResult<Value> {
        let head = self.heap.car(id);
        let tail = self.heap.cdr(id);

        let callable = self.eval(head)?;

        let Some(args) = self.heap.list_to_vec(tail) else {
            return Err(self.signal(self.syms.wrong_type_argument, self.syms.listp));
        };

        match callable {
            Value::Builtin(bid) => {
                let kind = self.heap.builtin_kind(bid);
                if let Arity::Exactly(n) = kind.arity() {
                    if args.len() != n {
                        return Err(self.signal(
                            self.syms.wrong_number_of_arguments,
                            Value::Fixnum(args.len() as i64),
                        ));
                    }
                }
                if kind.evaluates_args() {
                    let mut argv = Vec::with_capacity(args.len());
                    for &arg in &args {
                        argv.push(self.eval(arg)?);
                    }
                    builtins::call_builtin(self, kind, &argv)
                } else {
                    builtins::call_special(self, kind, &args)
                }
            }
            Value::Lambda(lid) => self.apply_lambda(lid, &args),
            other => Err(self.signal(self.syms.invalid_function, other)),
        }
    }

    /// Bind evaluated arguments to the parameters as one dynamic frame,
    /// run the body as an implicit progn, and pop the frame whether the
    /// body succeeded or signalled.
    fn apply_lambda(&mut self, lid: ObjId, args: &[Value]) -> LispResult<Value> {
        let mut argv = Vec::with_capacity(args.len());
        for &arg in args {
            argv.push(self.eval(arg)?);
        }

        let params = self.heap.lambda_params(lid);
        let param_list = self
            .heap
            .list_to_vec(params)
            .unwrap_or_else(|| fatal("lambda parameter list is not a proper list"));
        if argv.len() != param_list.len() {
            return Err(self.signal(
                self.syms.wrong_number_of_arguments,
                Value::Fixnum(argv.len() as i64),
            ));
        }

        let frame = param_list
            .iter()
            .zip(&argv)
            .map(|(&param, &val)| (expect_symbol_id(param), val))
            .collect();

        let body = self.heap.lambda_body(lid);
        let body_exprs = self
            .heap
            .list_to_vec(body)
            .unwrap_or_else(|| fatal("lambda body is not a proper list"));

        self.env.push_frame(frame);
        let result = self.eval_progn(&body_exprs);
        self.env.pop_frame();
        result
    }

    // ========================================================================
    // Collection
    // ========================================================================

    /// Run one full mark-and-sweep cycle. Must only be called at a
    /// quiescent point; `extra_roots` keeps values alive that the
    /// caller still holds (e.g. a result it is about to return).
    pub fn collect(&mut self, extra_roots: &[Value]) {
        self.heap.begin_collection();
        let mut worklist = Vec::new();

        // The complete root set: interned symbols, both environment
        // planes, the last-parsed form, t, and any pending signal.
        for sym in self.symbols.iter() {
            self.heap.mark_value(sym, &mut worklist);
        }
        for root in self.env.iter_roots() {
            self.heap.mark_value(root, &mut worklist);
        }
        self.heap.mark_value(self.syms.t, &mut worklist);
        self.heap.mark_value(self.last_form, &mut worklist);
        self.heap.mark_value(self.pending_signal, &mut worklist);
        for &root in extra_roots {
            self.heap.mark_value(root, &mut worklist);
        }

        self.heap.process_worklist(&mut worklist);
        self.heap.sweep();
        self.gc_requested = false;
    }
}

impl Default for Machine {
    fn default() -> Self {
        Machine::new()
    }
}

fn expect_symbol_id(val: Value) -> ObjId {
    val.as_symbol()
        .unwrap_or_else(|| fatal("expected a symbol value"))
}
