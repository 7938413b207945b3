use std::io::{self, BufRead, Read, Write};

use mel::error::LispError;
use mel::eval::Machine;
use mel::printer::stringify;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    let mut repl = false;
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--repl" => {
                repl = true;
                i += 1;
            }
            "--help" | "-h" => {
                println!("Usage: mel [OPTIONS]");
                println!();
                println!("Reads S-expressions from standard input and evaluates them.");
                println!();
                println!("Options:");
                println!("  --repl         Prompt before each form, print results, continue past errors");
                println!("  --help, -h     Show this help message");
                println!();
                println!("Environment variables:");
                println!("  MEL_TRACE=1    Print each form entering eval to stderr");
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                eprintln!("Try 'mel --help' for usage information.");
                std::process::exit(1);
            }
        }
    }

    let mut machine = Machine::new();
    if std::env::var("MEL_TRACE").map(|v| v == "1").unwrap_or(false) {
        machine.trace = true;
    }

    let code = if repl {
        run_repl(&mut machine)
    } else {
        run_batch(&mut machine)
    };
    std::process::exit(code);
}

/// Render an uncaught signal on stdout and clear the channel; host
/// failures go to stderr.
fn report_error(machine: &mut Machine, err: LispError) {
    match err {
        LispError::Signal(cons) => {
            println!("ERROR: {}", stringify(cons, &machine.heap));
        }
        LispError::Io(msg) => {
            eprintln!("I/O error: {}", msg);
        }
    }
    machine.clear_signal();
}

/// Batch mode: read all input, then parse and evaluate one expression
/// at a time, so unparsed text never holds heap references the
/// collector cannot see. Silent on success; the first uncaught signal
/// ends the run with exit code 1.
fn run_batch(machine: &mut Machine) -> i32 {
    let mut input = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut input) {
        eprintln!("Failed to read input: {}", e);
        return 1;
    }

    let mut pos = 0;
    loop {
        match machine.read_form(&input, pos) {
            Ok(Some((expr, new_pos))) => {
                pos = new_pos;
                match machine.eval(expr) {
                    Ok(_) => {}
                    Err(e) => {
                        report_error(machine, e);
                        return 1;
                    }
                }
                // Quiescent point: one full collection per form.
                machine.collect(&[]);
            }
            Ok(None) => return 0,
            Err(e) => {
                report_error(machine, e);
                return 1;
            }
        }
    }
}

/// Interactive mode: accumulate lines until parens balance, then
/// evaluate, printing each result and continuing past errors.
fn run_repl(machine: &mut Machine) -> i32 {
    let stdin = io::stdin();
    let mut buf = String::new();
    let mut depth: i32 = 0;

    loop {
        if depth == 0 {
            print!(">>> ");
        } else {
            print!("  ");
        }
        io::stdout().flush().ok();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => return 0, // EOF
            Ok(_) => {}
            Err(e) => {
                eprintln!("Read error: {}", e);
                return 1;
            }
        }

        // Track paren depth (naive but sufficient for well-formed input).
        for ch in line.chars() {
            match ch {
                '(' => depth += 1,
                ')' => depth -= 1,
                _ => {}
            }
        }

        buf.push_str(&line);

        if depth <= 0 {
            depth = 0;
            let input = std::mem::take(&mut buf);
            if input.trim().is_empty() {
                continue;
            }
            eval_and_print(machine, &input);
        }
    }
}

/// Evaluate every form in one REPL submission; a signal abandons the
/// rest of the submission but not the session.
fn eval_and_print(machine: &mut Machine, input: &str) {
    let mut pos = 0;
    loop {
        match machine.read_form(input, pos) {
            Ok(Some((expr, new_pos))) => {
                pos = new_pos;
                match machine.eval(expr) {
                    Ok(val) => println!("{}", stringify(val, &machine.heap)),
                    Err(e) => {
                        report_error(machine, e);
                        return;
                    }
                }
                machine.collect(&[]);
            }
            Ok(None) => return,
            Err(e) => {
                report_error(machine, e);
                return;
            }
        }
    }
}
