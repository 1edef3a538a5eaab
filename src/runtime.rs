use log::trace;
use std::rc::Rc;

use crate::{
    environment::{Context, SymbolTable},
    error::{runtime_error, Result, RuntimeErrorKind},
    parser::{parse, BinaryOp, ElseCase, IfCase, Node, NodeKind, TypeTag, UnaryOp},
    position::Span,
    stdlib::Invocation,
    tokenizer::tokenize,
    value::{BuiltIn, Culprit, Function, Number, OpError, Value},
};

/// Tokenizes, parses and evaluates `text` in `context`. The result is the
/// list of top level statement values.
pub fn run(source_name: &str, text: &str, context: &Rc<Context>) -> Result<Value> {
    let tokens = tokenize(source_name, text)?;
    let program = parse(&tokens)?;
    evaluate(&program, context)
}

pub fn evaluate(node: &Node, context: &Rc<Context>) -> Result<Value> {
    match &node.kind {
        NodeKind::Number(n) => Ok(Value::Number(*n)),
        NodeKind::String(s) => Ok(Value::String(s.clone())),
        NodeKind::List(elements) | NodeKind::Block(elements) => {
            let mut values = Vec::with_capacity(elements.len());
            for element in elements {
                values.push(evaluate(element, context)?);
            }
            Ok(Value::new_list(values))
        }
        NodeKind::VarAccess(name) => match context.lookup(name) {
            Some(value) => Ok(value),
            None => runtime_error(
                RuntimeErrorKind::UndefinedVariable,
                format!("'{}' is not defined", name),
                &node.span,
                context,
            ),
        },
        NodeKind::VarAssign {
            name,
            value,
            is_const,
            var_type,
        } => {
            let value = evaluate(value, context)?;
            assign(node, name, value, *is_const, *var_type, context)
        }
        NodeKind::BinOp {
            left,
            operator,
            right,
        } => evaluate_binary(node, left, *operator, right, context),
        NodeKind::UnaryOp { operator, operand } => {
            let value = evaluate(operand, context)?;
            let result = match operator {
                UnaryOp::Negate => value.negated(),
                UnaryOp::Identity => Ok(value),
                UnaryOp::Not => value.notted(),
            };
            result.or_else(|err| op_failure(err, &node.span, &operand.span, context))
        }
        NodeKind::If { cases, else_case } => evaluate_if(cases, else_case.as_deref(), context),
        NodeKind::For {
            var_name,
            start,
            end,
            step,
            body,
            returns_null,
        } => {
            let start = expect_number(evaluate(start, context)?, "start", start, context)?;
            let end = expect_number(evaluate(end, context)?, "end", end, context)?;
            let step = match step {
                Some(step) => expect_number(evaluate(step, context)?, "step", step, context)?,
                None => Number::Int(1),
            };

            let ascending = step.as_f64() >= 0.0;
            let in_range = |i: Number| if ascending { i <= end } else { i >= end };
            let mut elements = Vec::new();
            let mut i = start;

            while in_range(i) {
                assign(node, var_name, Value::Number(i), false, None, context)?;
                let result = evaluate(body, context)?;
                accumulate(&mut elements, result, body);
                i = i.add(step);
            }

            Ok(loop_result(elements, *returns_null))
        }
        NodeKind::While {
            condition,
            body,
            returns_null,
        } => {
            let mut elements = Vec::new();

            while evaluate(condition, context)?.is_true() {
                let result = evaluate(body, context)?;
                accumulate(&mut elements, result, body);
            }

            Ok(loop_result(elements, *returns_null))
        }
        NodeKind::FuncDef { name, params, body } => {
            let function = Value::Function(Rc::new(Function {
                name: name.clone().unwrap_or_else(|| "<lambda>".to_string()),
                params: params.clone(),
                body: Rc::clone(body),
                closure: Rc::clone(context),
            }));

            if let Some(name) = name {
                assign(node, name, function.clone(), false, None, context)?;
            }
            Ok(function)
        }
        NodeKind::Call { callee, arguments } => evaluate_call(node, callee, arguments, context),
    }
}

fn assign(
    node: &Node,
    name: &str,
    value: Value,
    is_const: bool,
    var_type: Option<TypeTag>,
    context: &Rc<Context>,
) -> Result<Value> {
    let declared = var_type.or_else(|| context.symbol_table.borrow().declared_type(name));
    let value = match declared {
        Some(tag) => enforce_type(tag, value, name, &node.span, context)?,
        None => value,
    };

    if !is_const {
        bind(node, name, value.clone(), context)?;
    } else if !context
        .symbol_table
        .borrow_mut()
        .set_constant(name, value.clone())
    {
        return runtime_error(
            RuntimeErrorKind::ConstantReassignment,
            format!("'{}' is already defined in this scope", name),
            &node.span,
            context,
        );
    }

    if let Some(tag) = var_type {
        context.symbol_table.borrow_mut().declare_type(name, tag);
    }
    Ok(value)
}

/// Plain binding in the current scope, refused for visible constants.
fn bind(node: &Node, name: &str, value: Value, context: &Rc<Context>) -> Result<()> {
    if context.symbol_table.borrow_mut().set(name, value) {
        return Ok(());
    }
    runtime_error(
        RuntimeErrorKind::ConstantReassignment,
        format!("cannot assign to constant '{}'", name),
        &node.span,
        context,
    )
}

fn enforce_type(
    var_type: TypeTag,
    value: Value,
    name: &str,
    span: &Span,
    context: &Rc<Context>,
) -> Result<Value> {
    match (var_type, value) {
        (TypeTag::Int, value @ Value::Number(Number::Int(_)))
        | (TypeTag::Str, value @ Value::String(_))
        | (TypeTag::Bool, value @ Value::Boolean(_))
        | (TypeTag::Arr, value @ Value::List(_)) => Ok(value),
        (TypeTag::Bool, Value::Number(n)) if n == Number::Int(0) || n == Number::Int(1) => {
            Ok(Value::Boolean(!n.is_zero()))
        }
        (tag, value) => runtime_error(
            RuntimeErrorKind::TypeMismatch,
            format!(
                "Expected {} for variable '{}', got {:?}",
                tag.as_str(),
                name,
                value
            ),
            span,
            context,
        ),
    }
}

fn evaluate_binary(
    node: &Node,
    left: &Node,
    operator: BinaryOp,
    right: &Node,
    context: &Rc<Context>,
) -> Result<Value> {
    let left_val = evaluate(left, context)?;
    let right_val = evaluate(right, context)?;

    left_val
        .binary(operator, &right_val)
        .or_else(|err| op_failure(err, &node.span, &right.span, context))
}

/// Positions a value level failure: the whole expression, or only the right
/// operand for bad divisors and indexes.
fn op_failure<T>(err: OpError, expression: &Span, right: &Span, context: &Rc<Context>) -> Result<T> {
    let span = match err.culprit {
        Culprit::Expression => expression,
        Culprit::Right => right,
    };
    runtime_error(err.kind, err.details, span, context)
}

fn evaluate_if(
    cases: &[IfCase],
    else_case: Option<&ElseCase>,
    context: &Rc<Context>,
) -> Result<Value> {
    for case in cases {
        if evaluate(&case.condition, context)?.is_true() {
            return evaluate(&case.body, context);
        }
    }

    match else_case {
        Some(else_case) => evaluate(&else_case.body, context),
        None => Ok(Value::null()),
    }
}

fn expect_number(value: Value, role: &str, node: &Node, context: &Rc<Context>) -> Result<Number> {
    match value {
        Value::Number(n) => Ok(n),
        other => runtime_error(
            RuntimeErrorKind::TypeMismatch,
            format!("loop {} must be a number, got {}", role, other.type_name()),
            &node.span,
            context,
        ),
    }
}

/// Block bodies contribute each statement value, anything else one value.
fn accumulate(elements: &mut Vec<Value>, result: Value, body: &Node) {
    if let (NodeKind::Block(_), Value::List(items)) = (&body.kind, &result) {
        elements.extend(items.borrow().iter().cloned());
        return;
    }
    elements.push(result);
}

fn loop_result(elements: Vec<Value>, returns_null: bool) -> Value {
    if returns_null {
        Value::null()
    } else {
        Value::new_list(elements)
    }
}

fn evaluate_arguments(arguments: &[Node], context: &Rc<Context>) -> Result<Vec<Value>> {
    let mut values = Vec::with_capacity(arguments.len());
    for argument in arguments {
        values.push(evaluate(argument, context)?);
    }
    Ok(values)
}

fn evaluate_call(
    node: &Node,
    callee: &Node,
    arguments: &[Node],
    context: &Rc<Context>,
) -> Result<Value> {
    if let Some((list, method)) = list_method(callee, context) {
        let args = evaluate_arguments(arguments, context)?;
        return call_list_method(node, &list, method, &args, arguments, context);
    }

    let callee_value = evaluate(callee, context)?;
    let args = evaluate_arguments(arguments, context)?;

    match callee_value {
        Value::Function(function) => call_function(&function, args, &node.span, context),
        Value::BuiltIn(builtin) => call_builtin(&builtin, args, &node.span, context),
        Value::List(_) => runtime_error(
            RuntimeErrorKind::InvalidMethod,
            "a list is called through '<list>.<method>(value)'",
            &node.span,
            context,
        ),
        other => runtime_error(
            RuntimeErrorKind::IllegalOperation,
            format!("{} is not callable", other.type_name()),
            &callee.span,
            context,
        ),
    }
}

/// `name.method` where `name.method` itself is unbound and `name` is a list.
fn list_method<'n>(callee: &'n Node, context: &Rc<Context>) -> Option<(Value, &'n str)> {
    let NodeKind::VarAccess(name) = &callee.kind else {
        return None;
    };
    let (prefix, method) = name.rsplit_once('.')?;
    if context.lookup(name).is_some() {
        return None;
    }
    match context.lookup(prefix)? {
        list @ Value::List(_) => Some((list, method)),
        _ => None,
    }
}

fn call_list_method(
    node: &Node,
    list: &Value,
    method: &str,
    args: &[Value],
    arguments: &[Node],
    context: &Rc<Context>,
) -> Result<Value> {
    trace!("list method {} with {} args", method, args.len());

    let [arg] = args else {
        return runtime_error(
            RuntimeErrorKind::InvalidMethod,
            format!("'{}' takes exactly one argument", method),
            &node.span,
            context,
        );
    };

    let result = match method {
        "add" => list.added_to(arg),
        "remove" => list.subtracted_by(arg),
        "get" => list.divided_by(arg),
        "with" => list.multiplied_by(arg),
        _ => {
            return runtime_error(
                RuntimeErrorKind::InvalidMethod,
                format!("lists have no method '{}'", method),
                &node.span,
                context,
            )
        }
    };

    result.or_else(|err| op_failure(err, &node.span, &arguments[0].span, context))
}

fn check_arity(
    name: &str,
    expected: usize,
    got: usize,
    call_span: &Span,
    context: &Rc<Context>,
) -> Result<()> {
    let details = if got > expected {
        format!("{} too many args passed into '{}'", got - expected, name)
    } else if got < expected {
        format!("{} too few args passed into '{}'", expected - got, name)
    } else {
        return Ok(());
    };
    runtime_error(RuntimeErrorKind::ArgumentCount, details, call_span, context)
}

/// Runs `function` with a fresh scope under its closure. The new context's
/// parent is the caller so tracebacks follow the call chain.
pub fn call_function(
    function: &Rc<Function>,
    args: Vec<Value>,
    call_span: &Span,
    context: &Rc<Context>,
) -> Result<Value> {
    check_arity(&function.name, function.params.len(), args.len(), call_span, context)?;
    trace!("calling {} with {} args", function.name, args.len());

    let mut table = SymbolTable::with_parent(&function.closure.symbol_table);
    for (param, arg) in function.params.iter().zip(args) {
        table.define(param, arg);
    }

    let call_context = Context::child(
        &function.name,
        context,
        call_span.start.clone(),
        table.into_scope(),
    );
    evaluate(&function.body, &call_context)
}

pub fn call_builtin(
    builtin: &Rc<BuiltIn>,
    args: Vec<Value>,
    call_span: &Span,
    context: &Rc<Context>,
) -> Result<Value> {
    check_arity(builtin.name, builtin.params.len(), args.len(), call_span, context)?;
    trace!("calling built-in {} with {} args", builtin.name, args.len());

    let call_context = Context::child(
        builtin.name,
        context,
        call_span.start.clone(),
        SymbolTable::with_parent(&context.symbol_table).into_scope(),
    );
    let invocation = Invocation {
        span: call_span.clone(),
        context: call_context,
        arity: builtin.params.len(),
    };
    (builtin.func)(&invocation, &args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::stdlib::{create_standard_context, Registry};

    fn run_program(text: &str) -> Result<Value> {
        let registry = Registry::standard();
        let context = create_standard_context(&registry, "<program>");
        run("<test>", text, &context)
    }

    /// The value of the last top level statement.
    fn run_last(text: &str) -> Result<Value> {
        let value = run_program(text)?;
        let last = match &value {
            Value::List(items) => items.borrow().last().cloned(),
            other => Some(other.clone()),
        };
        Ok(last.unwrap_or_else(Value::null))
    }

    fn runtime_failure(text: &str) -> Box<crate::error::RuntimeError> {
        match run_program(text) {
            Err(Error::Runtime(err)) => err,
            Err(other) => panic!("expected a runtime error, got {:?}", other),
            Ok(value) => panic!("expected a runtime error, got {:?}", value),
        }
    }

    fn int(n: i64) -> Value {
        Value::Number(Number::Int(n))
    }

    fn ints(items: &[i64]) -> Value {
        Value::new_list(items.iter().map(|n| int(*n)).collect())
    }

    fn string(s: &str) -> Value {
        Value::String(s.to_string())
    }

    #[test]
    fn test_basic_arithmetic() -> Result<()> {
        assert_eq!(run_last("2 + 3 * 4")?, int(14));
        assert_eq!(run_last("2 ^ 3 ^ 2")?, int(512));
        assert_eq!(run_last("(1 + 2) * 3")?, int(9));
        assert_eq!(run_last("7 / 2")?, Value::Number(Number::Float(3.5)));
        assert_eq!(run_last("-2 + +5")?, int(3));
        Ok(())
    }

    #[test]
    fn test_program_value_lists_every_statement() -> Result<()> {
        assert_eq!(run_program("1\n2; 3")?, ints(&[1, 2, 3]));
        assert_eq!(run_program("")?, ints(&[]));
        Ok(())
    }

    #[test]
    fn test_string_literals_and_escapes() -> Result<()> {
        assert_eq!(run_last(r#""a\tb" + "!""#)?, string("a\tb!"));
        assert_eq!(run_last(r#""ab" * 2"#)?, string("abab"));
        assert_eq!(run_last(r#""x" == "x""#)?, Value::Boolean(true));
        Ok(())
    }

    #[test]
    fn test_variables_and_assignment() -> Result<()> {
        assert_eq!(run_last("let x = 1\nx = x + 1\nx")?, int(2));
        assert_eq!(run_last("LET Big = 3\nbig")?, int(3));
        Ok(())
    }

    #[test]
    fn test_predefined_globals() -> Result<()> {
        assert_eq!(run_last("true == 1")?, Value::Boolean(true));
        assert_eq!(run_last("null")?, int(0));
        assert_eq!(run_last("not false")?, Value::Boolean(true));
        assert_eq!(run_last("pi > 3.14 and pi < 3.15")?, Value::Boolean(true));
        Ok(())
    }

    #[test]
    fn test_undefined_variable() {
        let err = runtime_failure("y + 1");
        assert_eq!(err.kind, RuntimeErrorKind::UndefinedVariable);
        assert_eq!(err.details, "'y' is not defined");
    }

    #[test]
    fn test_division_by_zero_points_at_divisor() {
        let err = runtime_failure("1/0");
        assert_eq!(err.kind, RuntimeErrorKind::DivisionByZero);
        assert_eq!(err.span.start.column, 2);
        assert_eq!(err.span.end.column, 3);
    }

    #[test]
    fn test_illegal_operation_covers_expression() {
        let err = runtime_failure("1 + \"a\"");
        assert_eq!(err.kind, RuntimeErrorKind::IllegalOperation);
        assert_eq!(err.span.start.column, 0);
        assert_eq!(err.span.end.column, 7);
    }

    #[test]
    fn test_if_is_an_expression() -> Result<()> {
        let input = "let x = 5\nif x > 3 { \"big\" } else { \"small\" }";
        assert_eq!(run_last(input)?, string("big"));

        let input = "let x = 2\nif x == 1 { \"one\" } elif x == 2 { \"two\" } else { \"many\" }";
        assert_eq!(run_last(input)?, string("two"));

        assert_eq!(run_last("if 0 { 1 }")?, int(0));
        Ok(())
    }

    #[test]
    fn test_if_short_circuits_branches() {
        // the else branch would fail if it were evaluated
        assert!(run_program("if 1 { 1 } else { missing }").is_ok());
    }

    #[test]
    fn test_for_loops() -> Result<()> {
        assert_eq!(run_last("for i = 1 to 3 { i * 2 }")?, ints(&[2, 4, 6]));
        assert_eq!(run_last("for i = 3 to 1 step -1 { i }")?, ints(&[3, 2, 1]));
        assert_eq!(run_last("for i = 1 to 9 step 4 { i }")?, ints(&[1, 5, 9]));
        assert_eq!(run_last("for i = 1 to 2 {\n  i\n}")?, int(0));
        Ok(())
    }

    #[test]
    fn test_loop_bodies_share_the_enclosing_scope() -> Result<()> {
        assert_eq!(run_last("for i = 1 to 3 {\n  let last = i\n}\nlast + i")?, int(6));
        Ok(())
    }

    #[test]
    fn test_while_loop() -> Result<()> {
        assert_eq!(
            run_last("let n = 0\nwhile n < 3 { n = n + 1 }")?,
            ints(&[1, 2, 3])
        );
        assert_eq!(run_last("let n = 0\nwhile n < 3 {\n  n = n + 1\n}\nn")?, int(3));
        Ok(())
    }

    #[test]
    fn test_functions() -> Result<()> {
        assert_eq!(run_last("func plus(a, b) => a + b\nplus(3, 4)")?, int(7));
        assert_eq!(run_last("let double = func (x): x * 2 }\ndouble(4)")?, int(8));
        assert_eq!(
            run_last("func f(n):\n  let m = n + 1\n  m * 2\n}\nf(1)")?,
            ints(&[2, 4])
        );
        Ok(())
    }

    #[test]
    fn test_recursion() -> Result<()> {
        let input = "func fib(n): if n < 2 { n } else { fib(n - 1) + fib(n - 2) } }\nfib(10)";
        assert_eq!(run_last(input)?, int(55));
        Ok(())
    }

    #[test]
    fn test_closures_capture_the_defining_scope() -> Result<()> {
        let input = "func make(x) => func (y) => x + y\nlet add2 = make(2)\nadd2(3)";
        assert_eq!(run_last(input)?, int(5));
        assert_eq!(run_last("func make(x) => func (y) => x * y\nmake(3)(4)")?, int(12));
        Ok(())
    }

    #[test]
    fn test_function_scope_does_not_leak() {
        let err = runtime_failure("func f(): let inner = 1 }\nf()\ninner");
        assert_eq!(err.kind, RuntimeErrorKind::UndefinedVariable);
    }

    #[test]
    fn test_argument_count() {
        let err = runtime_failure("func f(a) => a\nf(1, 2)");
        assert_eq!(err.kind, RuntimeErrorKind::ArgumentCount);
        assert_eq!(err.details, "1 too many args passed into 'f'");

        let err = runtime_failure("func f(a, b) => a\nf()");
        assert_eq!(err.details, "2 too few args passed into 'f'");
    }

    #[test]
    fn test_calling_a_number_is_illegal() {
        let err = runtime_failure("let x = 1\nx(2)");
        assert_eq!(err.kind, RuntimeErrorKind::IllegalOperation);
    }

    #[test]
    fn test_constants() {
        let err = runtime_failure("const k = 1\nk = 2");
        assert_eq!(err.kind, RuntimeErrorKind::ConstantReassignment);

        let err = runtime_failure("const k = 1\nconst k = 2");
        assert_eq!(err.kind, RuntimeErrorKind::ConstantReassignment);

        let err = runtime_failure("const k = 1\nfunc f(): k = 2 }\nf()");
        assert_eq!(err.kind, RuntimeErrorKind::ConstantReassignment);
    }

    #[test]
    fn test_type_annotations() -> Result<()> {
        let err = runtime_failure("let int x = 1.5");
        assert_eq!(err.kind, RuntimeErrorKind::TypeMismatch);

        assert_eq!(run_last("let bool b = 1\nb")?, Value::Boolean(true));
        assert_eq!(runtime_failure("let bool b = 2").kind, RuntimeErrorKind::TypeMismatch);
        assert_eq!(run_last("let arr a = [1]\na")?, ints(&[1]));

        // the declared type sticks to the name
        let err = runtime_failure("let int n = 1\nn = \"s\"");
        assert_eq!(err.kind, RuntimeErrorKind::TypeMismatch);
        Ok(())
    }

    #[test]
    fn test_declared_types_cover_loop_counters_and_functions() -> Result<()> {
        let err = runtime_failure("let int i = 0\nfor i = 1 to 2 step 0.5 { i }");
        assert_eq!(err.kind, RuntimeErrorKind::TypeMismatch);
        assert_eq!(run_last("let int i = 0\nfor i = 1 to 3 { i }\ni")?, int(3));

        let err = runtime_failure("let str f = \"\"\nfunc f() => 1");
        assert_eq!(err.kind, RuntimeErrorKind::TypeMismatch);
        Ok(())
    }

    #[test]
    fn test_huge_string_repetition_is_a_runtime_error() {
        let err = runtime_failure("\"ab\" * 9223372036854775807");
        assert_eq!(err.kind, RuntimeErrorKind::IllegalOperation);
        assert_eq!(err.span.start.column, 7);
    }

    #[test]
    fn test_self_containing_list_converts_to_string() -> Result<()> {
        assert_eq!(run_last("let a = []\nappend(a, a)\ntostr(a)")?, string("[[...]]"));
        Ok(())
    }

    #[test]
    fn test_list_operators() -> Result<()> {
        assert_eq!(run_last("let a = [1, 2]\na + 3")?, ints(&[1, 2, 3]));
        assert_eq!(run_last("[1, 2, 3] - 0")?, ints(&[2, 3]));
        assert_eq!(run_last("[1] * [2]")?, ints(&[1, 2]));
        assert_eq!(run_last("[5, 6] / 1")?, int(6));
        assert_eq!(run_last("let a = [1]\nlet b = a + 2\na")?, ints(&[1]));

        let err = runtime_failure("[1, 2] / 2");
        assert_eq!(err.kind, RuntimeErrorKind::IndexOutOfRange);
        assert_eq!(err.span.start.column, 9);
        Ok(())
    }

    #[test]
    fn test_list_methods() -> Result<()> {
        assert_eq!(run_last("let a = [1]\na.add(2)")?, ints(&[1, 2]));
        assert_eq!(run_last("let a = [1, 2]\na.remove(0)")?, ints(&[2]));
        assert_eq!(run_last("let a = [1, 2]\na.get(-1)")?, int(2));
        assert_eq!(run_last("let a = [1]\na.with([7])")?, ints(&[1, 7]));

        let err = runtime_failure("let a = [1]\na.first(1)");
        assert_eq!(err.kind, RuntimeErrorKind::InvalidMethod);
        let err = runtime_failure("let a = [1]\na.add(1, 2)");
        assert_eq!(err.kind, RuntimeErrorKind::InvalidMethod);
        let err = runtime_failure("let a = [1]\na(1)");
        assert_eq!(err.kind, RuntimeErrorKind::InvalidMethod);
        Ok(())
    }

    #[test]
    fn test_lists_are_shared_between_bindings() -> Result<()> {
        assert_eq!(run_last("let a = [1]\nlet b = a\nappend(b, 2)\nlen(a)")?, int(2));
        Ok(())
    }

    #[test]
    fn test_traceback_follows_the_call_chain() {
        let err = runtime_failure("func inner() => 1 / 0\nfunc outer() => inner()\nouter()");
        assert_eq!(err.context.display_name, "inner");
        assert_eq!(
            err.traceback(),
            "Traceback (most recent call last):\n  \
             File <test>, line 3, in <program>\n  \
             File <test>, line 2, in outer\n  \
             File <test>, line 1, in inner\n"
        );
    }

    #[test]
    fn test_error_report_format() {
        let err = Error::Runtime(runtime_failure("let x = 1\nx + \"a\""));
        let report = err.report();
        assert!(report.ends_with("Illegal operation: number + string\n\nx + \"a\"\n^^^^^^^"));
        assert!(report.contains("File <test>, line 2, in <program>"));
    }

    #[test]
    fn test_lambda_name() -> Result<()> {
        assert_eq!(run_last("tostr(func (x) => x)")?, string("<function <lambda>>"));
        Ok(())
    }

    #[test]
    fn test_evaluation_is_deterministic() -> Result<()> {
        let input = "let a = []\nfor i = 1 to 5 { append(a, i * i) }\nsum(a)";
        assert_eq!(run_last(input)?, run_last(input)?);
        assert_eq!(run_last(input)?, int(55));
        Ok(())
    }
}
