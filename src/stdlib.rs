use log::trace;
use rand::Rng;
use std::{
    cell::RefCell,
    f64::consts::{E, PI},
    io::{self, BufRead, Write},
    rc::Rc,
    thread,
    time::Duration,
};

use crate::{
    environment::{Context, SymbolTable},
    error::{runtime_error, Error, Result, RuntimeErrorKind},
    position::Span,
    value::{resolve_index, BuiltIn, Number, Value},
};

/// What a native function knows about the call it serves.
pub struct Invocation {
    pub span: Span,
    /// The built-in's own frame, a child of the caller's.
    pub context: Rc<Context>,
    pub arity: usize,
}

impl Invocation {
    pub fn fail<T>(&self, kind: RuntimeErrorKind, details: impl Into<String>) -> Result<T> {
        runtime_error(kind, details, &self.span, &self.context)
    }

    fn invalid<T>(&self, details: impl Into<String>) -> Result<T> {
        self.fail(RuntimeErrorKind::InvalidArgument, details)
    }

    /// "Argument" for single parameter built-ins, else "First argument", ...
    fn argument_name(&self, position: usize) -> &'static str {
        if self.arity == 1 {
            return "Argument";
        }
        match position {
            0 => "First argument",
            1 => "Second argument",
            _ => "Third argument",
        }
    }

    fn list(&self, args: &[Value], position: usize) -> Result<Rc<RefCell<Vec<Value>>>> {
        match &args[position] {
            Value::List(items) => Ok(Rc::clone(items)),
            _ => self.invalid(format!("{} must be a list", self.argument_name(position))),
        }
    }

    fn number(&self, args: &[Value], position: usize) -> Result<Number> {
        match &args[position] {
            Value::Number(n) => Ok(*n),
            _ => self.invalid(format!("{} must be a number", self.argument_name(position))),
        }
    }

    fn integer(&self, args: &[Value], position: usize) -> Result<i64> {
        match &args[position] {
            Value::Number(Number::Int(n)) => Ok(*n),
            _ => self.invalid(format!("{} must be an integer", self.argument_name(position))),
        }
    }
}

/// The immutable catalogue of native functions.
pub struct Registry {
    builtins: Vec<Rc<BuiltIn>>,
}

impl Registry {
    pub fn standard() -> Registry {
        let mut builtins = Vec::new();

        macro_rules! define_builtin {
            ($name:expr, [$($param:expr),*], $func:expr) => {
                builtins.push(Rc::new(BuiltIn {
                    name: $name,
                    params: &[$($param),*],
                    func: $func,
                }));
            };
        }

        // Input and output
        define_builtin!("write", ["value"], execute_write);
        define_builtin!("return", ["value"], execute_return);
        define_builtin!("return_", ["value"], execute_return);
        define_builtin!("tostr", ["value"], execute_tostr);
        define_builtin!("input", [], execute_input);
        define_builtin!("inputn", [], execute_inputn);

        // Type checks
        define_builtin!("isnum", ["value"], execute_isnum);
        define_builtin!("isstr", ["value"], execute_isstr);
        define_builtin!("isarray", ["value"], execute_isarray);
        define_builtin!("type", ["value"], execute_type);

        // Lists
        define_builtin!("append", ["list", "value"], execute_append);
        define_builtin!("pop", ["list", "index"], execute_pop);
        define_builtin!("collect", ["lista", "listb"], execute_collect);
        define_builtin!("unite", ["lista", "listb"], execute_unite);
        define_builtin!("len", ["list"], execute_len);
        define_builtin!("reverse", ["list"], execute_reverse);
        define_builtin!("sum", ["list"], execute_sum);
        define_builtin!("sort", ["list"], execute_sort);

        // Math
        define_builtin!("sqrt", ["value"], execute_sqrt);
        define_builtin!("root", ["value", "n"], execute_root);
        define_builtin!("abs", ["value"], execute_abs);
        define_builtin!("round", ["value"], execute_round);
        define_builtin!("random", [], execute_random);
        define_builtin!("random.num", ["a", "b"], execute_random_num);
        define_builtin!("random_num", ["a", "b"], execute_random_num);

        // Process
        define_builtin!("exit", ["code"], execute_exit);
        define_builtin!("sleep", ["seconds"], execute_sleep);

        Registry { builtins }
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.builtins.iter().map(|builtin| builtin.name)
    }

    /// A root table with every built-in and the predefined constants.
    pub fn global_table(&self) -> SymbolTable {
        let mut table = SymbolTable::new();
        table.define("null", Value::null());
        table.define("true", Value::Boolean(true));
        table.define("false", Value::Boolean(false));
        table.define("pi", Value::Number(Number::Float(PI)));
        table.define("e", Value::Number(Number::Float(E)));

        for builtin in &self.builtins {
            table.define(builtin.name, Value::BuiltIn(Rc::clone(builtin)));
        }
        table
    }
}

/// A top level context whose scope sits on top of a fresh global table, so
/// user bindings shadow built-ins without touching them.
pub fn create_standard_context(registry: &Registry, name: &str) -> Rc<Context> {
    let globals = registry.global_table().into_scope();
    Context::new(name, SymbolTable::with_parent(&globals).into_scope())
}

/// Reads one line without its line terminator. `None` at end of input.
pub fn read_line(reader: &mut impl BufRead) -> Result<Option<String>> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    let trimmed = line.trim_end_matches(|c| c == '\n' || c == '\r');
    Ok(Some(trimmed.to_string()))
}

/// Reads lines until one parses as an integer, complaining to `writer` about
/// the rest.
pub fn read_integer(reader: &mut impl BufRead, writer: &mut impl Write) -> Result<Option<i64>> {
    while let Some(line) = read_line(reader)? {
        match line.trim().parse() {
            Ok(n) => return Ok(Some(n)),
            Err(_) => writeln!(writer, "'{}' must be an integer. Try again!", line)?,
        }
    }
    Ok(None)
}

fn execute_write(_: &Invocation, args: &[Value]) -> Result<Value> {
    println!("{}", args[0]);
    Ok(Value::null())
}

fn execute_return(_: &Invocation, args: &[Value]) -> Result<Value> {
    Ok(args[0].clone())
}

fn execute_tostr(_: &Invocation, args: &[Value]) -> Result<Value> {
    Ok(Value::String(args[0].to_string()))
}

fn execute_input(inv: &Invocation, _: &[Value]) -> Result<Value> {
    match read_line(&mut io::stdin().lock())? {
        Some(line) => Ok(Value::String(line)),
        None => inv.invalid("no more input"),
    }
}

fn execute_inputn(inv: &Invocation, _: &[Value]) -> Result<Value> {
    match read_integer(&mut io::stdin().lock(), &mut io::stdout())? {
        Some(n) => Ok(Value::Number(Number::Int(n))),
        None => inv.invalid("no more input"),
    }
}

fn execute_isnum(_: &Invocation, args: &[Value]) -> Result<Value> {
    Ok(Value::Boolean(matches!(args[0], Value::Number(_))))
}

fn execute_isstr(_: &Invocation, args: &[Value]) -> Result<Value> {
    Ok(Value::Boolean(matches!(args[0], Value::String(_))))
}

fn execute_isarray(_: &Invocation, args: &[Value]) -> Result<Value> {
    Ok(Value::Boolean(matches!(args[0], Value::List(_))))
}

fn execute_type(_: &Invocation, args: &[Value]) -> Result<Value> {
    let name = match args[0] {
        Value::Number(_) => "int",
        Value::String(_) => "string",
        Value::Boolean(_) => "bool",
        Value::List(_) => "array",
        Value::Function(_) => "function",
        Value::BuiltIn(_) => "undefined",
    };
    Ok(Value::String(name.to_string()))
}

fn execute_append(inv: &Invocation, args: &[Value]) -> Result<Value> {
    let list = inv.list(args, 0)?;
    list.borrow_mut().push(args[1].clone());
    Ok(Value::null())
}

fn execute_pop(inv: &Invocation, args: &[Value]) -> Result<Value> {
    let list = inv.list(args, 0)?;
    let index = inv.number(args, 1)?;

    let mut items = list.borrow_mut();
    match resolve_index(index, items.len()) {
        Some(i) => Ok(items.remove(i)),
        None => inv.fail(
            RuntimeErrorKind::IndexOutOfRange,
            format!(
                "cannot remove element {} from a list of length {}",
                index,
                items.len()
            ),
        ),
    }
}

fn execute_collect(inv: &Invocation, args: &[Value]) -> Result<Value> {
    let target = inv.list(args, 0)?;
    let source = inv.list(args, 1)?;

    let items = source.borrow().clone();
    target.borrow_mut().extend(items);
    Ok(Value::null())
}

fn execute_unite(inv: &Invocation, args: &[Value]) -> Result<Value> {
    let first = inv.list(args, 0)?;
    let second = inv.list(args, 1)?;

    let mut items = first.borrow().clone();
    items.extend(second.borrow().iter().cloned());
    Ok(Value::new_list(items))
}

fn execute_len(inv: &Invocation, args: &[Value]) -> Result<Value> {
    let list = inv.list(args, 0)?;
    let len = i64::try_from(list.borrow().len()).unwrap_or(i64::MAX);
    Ok(Value::Number(Number::Int(len)))
}

fn execute_reverse(inv: &Invocation, args: &[Value]) -> Result<Value> {
    let list = inv.list(args, 0)?;
    let items = list.borrow().iter().rev().cloned().collect();
    Ok(Value::new_list(items))
}

fn execute_sum(inv: &Invocation, args: &[Value]) -> Result<Value> {
    let list = inv.list(args, 0)?;
    let mut total = Number::Int(0);

    for item in list.borrow().iter() {
        match item {
            Value::Number(n) => total = total.add(*n),
            _ => return inv.invalid("List must contain only numbers"),
        }
    }
    Ok(Value::Number(total))
}

fn execute_sort(inv: &Invocation, args: &[Value]) -> Result<Value> {
    let list = inv.list(args, 0)?;
    let items = list.borrow();

    if let Some(mut numbers) = items
        .iter()
        .map(|item| match item {
            Value::Number(n) => Some(*n),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()
    {
        numbers.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        return Ok(Value::new_list(numbers.into_iter().map(Value::Number).collect()));
    }

    if let Some(mut strings) = items
        .iter()
        .map(|item| match item {
            Value::String(s) => Some(s.clone()),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()
    {
        strings.sort();
        return Ok(Value::new_list(strings.into_iter().map(Value::String).collect()));
    }

    inv.invalid("List must contain only numbers or only strings")
}

fn execute_sqrt(inv: &Invocation, args: &[Value]) -> Result<Value> {
    let n = inv.number(args, 0)?.as_f64();
    if n < 0.0 {
        return inv.invalid("Argument must not be negative");
    }
    Ok(Value::Number(Number::Float(n.sqrt())))
}

fn execute_root(inv: &Invocation, args: &[Value]) -> Result<Value> {
    let value = inv.number(args, 0)?.as_f64();
    let degree = inv.number(args, 1)?;

    if degree.is_zero() {
        return inv.invalid("Second argument must not be zero");
    }

    let exponent = 1.0 / degree.as_f64();
    if value >= 0.0 {
        return Ok(Value::Number(Number::Float(value.powf(exponent))));
    }

    // Odd integer roots of negative numbers stay real
    match degree {
        Number::Int(d) if d % 2 != 0 => Ok(Value::Number(Number::Float(-(-value).powf(exponent)))),
        _ => inv.invalid("First argument must not be negative for an even or fractional root"),
    }
}

fn execute_abs(inv: &Invocation, args: &[Value]) -> Result<Value> {
    let result = match inv.number(args, 0)? {
        Number::Int(n) => n
            .checked_abs()
            .map_or(Number::Float((n as f64).abs()), Number::Int),
        Number::Float(n) => Number::Float(n.abs()),
    };
    Ok(Value::Number(result))
}

fn execute_round(inv: &Invocation, args: &[Value]) -> Result<Value> {
    match inv.number(args, 0)? {
        Number::Int(n) => Ok(Value::Number(Number::Int(n))),
        Number::Float(n) if n.is_finite() => {
            Ok(Value::Number(Number::Int(n.round_ties_even() as i64)))
        }
        Number::Float(_) => inv.invalid("Argument must be a finite number"),
    }
}

fn execute_random(_: &Invocation, _: &[Value]) -> Result<Value> {
    let n: f64 = rand::thread_rng().gen();
    Ok(Value::Number(Number::Float(n)))
}

fn execute_random_num(inv: &Invocation, args: &[Value]) -> Result<Value> {
    let low = inv.integer(args, 0)?;
    let high = inv.integer(args, 1)?;

    if low > high {
        return inv.invalid("First argument must not be greater than the second");
    }
    Ok(Value::Number(Number::Int(
        rand::thread_rng().gen_range(low..=high),
    )))
}

fn execute_exit(inv: &Invocation, args: &[Value]) -> Result<Value> {
    match inv.number(args, 0)? {
        n if n == Number::Int(0) => Ok(Value::null()),
        n if n == Number::Int(1) => {
            trace!("exit requested");
            Err(Error::Exit { code: 1 })
        }
        n => inv.invalid(format!("exit code must be 0 or 1, got {}", n)),
    }
}

fn execute_sleep(inv: &Invocation, args: &[Value]) -> Result<Value> {
    let seconds = inv.number(args, 0)?.as_f64();
    let duration = match Duration::try_from_secs_f64(seconds) {
        Ok(duration) => duration,
        Err(_) => return inv.invalid("Argument must be a non-negative number of seconds"),
    };
    thread::sleep(duration);
    Ok(Value::null())
}
