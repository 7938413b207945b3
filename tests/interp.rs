use mel::error::LispError;
use mel::eval::Machine;
use mel::printer::stringify;
use mel::value::Value;

/// Evaluate `program` in a fresh machine. `result:` compares the last
/// form's value structurally against the parsed expectation; `signal:`
/// compares the rendered signal cons.
macro_rules! mel_assert {
    (program: $program:expr, result: $expected:expr $(,)?) => {
        let mut m = Machine::new();
        let output = match m.eval_string($program) {
            Ok(val) => val,
            Err(e) => panic!("program {:?} signalled: {:?}", $program, e),
        };
        let (expected, _) = m.read_form($expected, 0).unwrap().unwrap();
        assert!(
            m.heap.equal(output, expected),
            "program {:?}: got {}, want {}",
            $program,
            stringify(output, &m.heap),
            stringify(expected, &m.heap),
        );
    };
    (program: $program:expr, signal: $expected:expr $(,)?) => {
        let mut m = Machine::new();
        match m.eval_string($program) {
            Ok(val) => panic!(
                "program {:?} returned {} instead of signalling",
                $program,
                stringify(val, &m.heap),
            ),
            Err(LispError::Signal(cons)) => {
                assert_eq!(
                    stringify(cons, &m.heap),
                    $expected,
                    "program {:?}",
                    $program
                );
                assert_eq!(m.pending_signal(), cons);
            }
            Err(other) => panic!("program {:?}: unexpected error {:?}", $program, other),
        }
    };
}

#[test]
fn arithmetic() {
    mel_assert! { program: "(+ 1 2 3)", result: "6" }
    mel_assert! { program: "(+)", result: "0" }
    mel_assert! { program: "(*)", result: "1" }
    mel_assert! { program: "(* 2 3 4)", result: "24" }
    mel_assert! { program: "(-)", result: "0" }
    mel_assert! { program: "(- 5)", result: "-5" }
    mel_assert! { program: "(- 10 1 2)", result: "7" }
    mel_assert! { program: "(< 1 2)", result: "t" }
    mel_assert! { program: "(< 2 1)", result: "nil" }
    mel_assert! { program: "(+ 1 \"a\")", signal: "(wrong-type-argument . integerp)" }
    mel_assert! { program: "(< 1 nil)", signal: "(wrong-type-argument . integerp)" }
}

#[test]
fn pairs_and_lists() {
    mel_assert! { program: "(cons 1 2)", result: "(1 . 2)" }
    mel_assert! { program: "(car '(1 2))", result: "1" }
    mel_assert! { program: "(cdr '(1 2))", result: "(2)" }
    mel_assert! { program: "(car nil)", result: "nil" }
    mel_assert! { program: "(cdr nil)", result: "nil" }
    mel_assert! { program: "(car 5)", signal: "(wrong-type-argument . listp)" }
    mel_assert! { program: "'(1 . (2 3 . ()))", result: "(1 2 3)" }
    mel_assert! { program: "(length '(1 2 3))", result: "3" }
    mel_assert! { program: "(length nil)", result: "0" }
    mel_assert! { program: "(length \"abcd\")", result: "4" }
    mel_assert! { program: "(length '(1 . 2))", signal: "(wrong-type-argument . listp)" }
    mel_assert! { program: "(length 7)", signal: "(wrong-type-argument . listp)" }
}

#[test]
fn equality() {
    mel_assert! { program: "(eq 7 7)", result: "t" }
    mel_assert! { program: "(eq 'a 'a)", result: "t" }
    // Symbol identity survives reading in different positions.
    mel_assert! { program: "(eq 'a (car '(a)))", result: "t" }
    // Two reads of the same literal are distinct objects.
    mel_assert! { program: "(eq '(1) '(1))", result: "nil" }
    mel_assert! { program: "(let ((l '(1 2))) (eq l l))", result: "t" }
    mel_assert! { program: "(eq \"a\" \"a\")", result: "nil" }
    mel_assert! { program: "(equal \"a\" \"a\")", result: "t" }
    mel_assert! { program: "(equal (cons 1 (cons 2 nil)) '(1 2))", result: "t" }
    mel_assert! { program: "(equal '(1 (2 . 3)) '(1 (2 . 3)))", result: "t" }
    mel_assert! { program: "(equal '(1 2) '(1 3))", result: "nil" }
    mel_assert! { program: "(not nil)", result: "t" }
    mel_assert! { program: "(not 3)", result: "nil" }
}

#[test]
fn special_forms() {
    mel_assert! { program: "(quote x)", result: "x" }
    mel_assert! { program: "(quote)", signal: "(wrong-number-of-arguments . 0)" }
    mel_assert! { program: "(progn)", result: "nil" }
    mel_assert! { program: "(progn 1 2 3)", result: "3" }
    mel_assert! { program: "(if t 1 2)", result: "1" }
    mel_assert! { program: "(if nil 1 2)", result: "2" }
    mel_assert! { program: "(if nil 1 2 3)", result: "3" }
    mel_assert! { program: "(if 0 1 2)", result: "1" } // only nil is false
    mel_assert! { program: "(if 1)", signal: "(wrong-number-of-arguments . 1)" }
    mel_assert! { program: "(while nil 1)", result: "nil" }
    mel_assert! {
        program: "(set 'i 0) (while (< i 5) (set 'i (+ i 1))) i",
        result: "5",
    }
    // while returns the last body result.
    mel_assert! {
        program: "(set 'i 0) (while (< i 3) (set 'i (+ i 1)) i)",
        result: "3",
    }
}

#[test]
fn let_and_scoping() {
    mel_assert! { program: "(let ((x 1)) x)", result: "1" }
    mel_assert! { program: "(let ((x 1)) (let ((x 2)) x))", result: "2" }
    mel_assert! { program: "(let ((x 1)) (let ((x 2)) nil) x)", result: "1" }
    mel_assert! { program: "(let ((x 5) y) y)", result: "nil" }
    // Initializers see the outer environment.
    mel_assert! { program: "(set 'x 1) (let ((x 2) (y x)) y)", result: "1" }
    mel_assert! { program: "(let ((x 1 2)) x)", signal: "(lisp-error x 1 2)" }
    mel_assert! { program: "(let (5) nil)", signal: "(lisp-error . 5)" }
    mel_assert! { program: "(let 5 nil)", signal: "(wrong-type-argument . listp)" }
    // Dynamic scoping: the body of f sees the binding active at call time.
    mel_assert! {
        program: "(set 'f (lambda () x)) (let ((x 42)) (f))",
        result: "42",
    }
}

#[test]
fn set_writes_the_global_slot() {
    mel_assert! { program: "(set 'x 20) x", result: "20" }
    // Assignment under an active binding is visible both inside the
    // binding's extent and after it.
    mel_assert! { program: "(let ((x 10)) (set 'x 20) x)", result: "20" }
    mel_assert! { program: "(let ((x 10)) (set 'x 20)) x", result: "20" }
    mel_assert! { program: "(set 5 1)", signal: "(wrong-type-argument . symbolp)" }
}

#[test]
fn lambdas() {
    mel_assert! { program: "((lambda (x) (+ x 1)) 41)", result: "42" }
    mel_assert! { program: "((lambda () 7))", result: "7" }
    mel_assert! { program: "((lambda (x)) 1)", result: "nil" }
    // Duplicate parameters are allowed; the later binding shadows.
    mel_assert! { program: "((lambda (x x) x) 1 2)", result: "2" }
    mel_assert! { program: "((lambda (x) x) 1 2)", signal: "(wrong-number-of-arguments . 2)" }
    mel_assert! { program: "(lambda 5 1)", signal: "(wrong-type-argument . listp)" }
    mel_assert! { program: "(lambda (5) 1)", signal: "(wrong-type-argument . symbolp)" }
    mel_assert! {
        program: "(set 'f (lambda (n) (if (< n 2) 1 (+ (f (- n 1)) (f (- n 2)))))) (f 6)",
        result: "13",
    }
    mel_assert! {
        program: "(set 'f (lambda (n) (if (< n 2) 1 (+ (f (- n 1)) (f (- n 2)))))) (f 7)",
        result: "21",
    }
    // Recursion rides the host stack; moderate depth is routine.
    mel_assert! {
        program: "(set 'f (lambda (n) (if (< n 2) 1 (+ (f (- n 1)) (f (- n 2)))))) (f 15)",
        result: "987",
    }
}

#[test]
fn call_errors() {
    mel_assert! { program: "unknown-var", signal: "(void-variable . unknown-var)" }
    mel_assert! { program: "(5 1)", signal: "(invalid-function . 5)" }
    mel_assert! { program: "(\"f\" 1)", signal: "(invalid-function . \"f\")" }
    mel_assert! { program: "(car . 5)", signal: "(wrong-type-argument . listp)" }
    mel_assert! { program: "(cons 1)", signal: "(wrong-number-of-arguments . 1)" }
    mel_assert! { program: "(cons 1 2 3)", signal: "(wrong-number-of-arguments . 3)" }
    // Argument evaluation aborts on the first signal.
    mel_assert! { program: "(cons unknown-var 1)", signal: "(void-variable . unknown-var)" }
}

#[test]
fn strings_and_printing() {
    mel_assert! { program: "(concat \"ab\" \"cd\")", result: "\"abcd\"" }
    mel_assert! { program: "(concat \"ab\" 1)", signal: "(wrong-type-argument . stringp)" }
    mel_assert! { program: "(stringify '(1 (2 . 3) a))", result: "\"(1 (2 . 3) a)\"" }
    mel_assert! { program: "(stringify 42)", result: "\"42\"" }
    // print returns its argument.
    mel_assert! { program: "(print (+ 1 2 3))", result: "6" }
    mel_assert! { program: "(print '(1 . (2 3 . ())))", result: "(1 2 3)" }
}

#[test]
fn reader_errors_are_signals() {
    mel_assert! { program: "'(1 . 1 2)", signal: "(invalid-syntax)" }
    mel_assert! { program: "'( . 1)", signal: "(invalid-syntax)" }
    mel_assert! { program: "'(1 . )", signal: "(invalid-syntax)" }
    mel_assert! { program: "\"unterminated", signal: "(invalid-syntax)" }
    mel_assert! { program: "(1 2", signal: "(invalid-syntax)" }
}

#[test]
fn garbage_collection_is_transparent() {
    mel_assert! { program: "(garbage-collect)", result: "nil" }
    // A loop that conses garbage every iteration still terminates with
    // the right value, and the collection after the form reclaims it.
    mel_assert! {
        program: "(set 'i 0) (while (< i 100) (set 'i (+ i 1)) (cons i i)) i",
        result: "100",
    }
    mel_assert! {
        program: "(set 'x '(1 2 3)) (garbage-collect) (car x)",
        result: "1",
    }
    mel_assert! {
        program: "(set 'x \"keep\") (garbage-collect) (concat x x)",
        result: "\"keepkeep\"",
    }
}

/// Reading back `stringify`'s rendering reproduces an `equal` value for
/// anything without a builtin or lambda subterm.
#[test]
fn stringify_round_trips() {
    let programs = [
        "42",
        "-7",
        "'sym",
        "\"hello world\"",
        "'(1 2 3)",
        "'(1 . 2)",
        "'(a (b . 4) \"s\" ())",
        "nil",
        "t",
    ];
    for program in programs {
        let mut m = Machine::new();
        let val = m.eval_string(program).unwrap();
        let rendered = stringify(val, &m.heap);
        let (reread, _) = m.read_form(&rendered, 0).unwrap().unwrap();
        assert!(
            m.heap.equal(val, reread),
            "{} did not round-trip (rendered {})",
            program,
            rendered
        );
    }
}

/// Values stay identical across an explicit collection, and interned
/// symbols keep their identity.
#[test]
fn collection_preserves_identity() {
    let mut m = Machine::new();
    m.eval_string("(set 'x '(a b c))").unwrap();
    let before = m.eval_string("x").unwrap();
    let sym_before = m.eval_string("'a").unwrap();
    m.last_form = Value::Nil;
    m.collect(&[]);
    let after = m.eval_string("x").unwrap();
    let sym_after = m.eval_string("'a").unwrap();
    assert_eq!(before, after);
    assert_eq!(sym_before, sym_after);
}
