use std::{cell::RefCell, cmp::Ordering, fmt, rc::Rc};

use crate::{
    environment::Context,
    error::{Result, RuntimeErrorKind},
    parser::{BinaryOp, Node},
    stdlib::Invocation,
};

/// Longest string `*` may build, in bytes.
pub const MAX_STRING_LEN: usize = 1 << 30;

/// Numbers keep the int/float tag of their origin. Integer arithmetic that
/// overflows falls back to floats.
#[derive(Debug, Clone, Copy)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(n) => n as f64,
            Number::Float(n) => n,
        }
    }

    pub fn is_zero(self) -> bool {
        self.as_f64() == 0.0
    }

    fn int_op(
        self,
        other: Number,
        checked: fn(i64, i64) -> Option<i64>,
        float: fn(f64, f64) -> f64,
    ) -> Number {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => match checked(a, b) {
                Some(n) => Number::Int(n),
                None => Number::Float(float(a as f64, b as f64)),
            },
            (a, b) => Number::Float(float(a.as_f64(), b.as_f64())),
        }
    }

    pub fn add(self, other: Number) -> Number {
        self.int_op(other, i64::checked_add, |a, b| a + b)
    }

    pub fn subtract(self, other: Number) -> Number {
        self.int_op(other, i64::checked_sub, |a, b| a - b)
    }

    pub fn multiply(self, other: Number) -> Number {
        self.int_op(other, i64::checked_mul, |a, b| a * b)
    }

    /// True division; `None` when `other` is zero.
    pub fn divide(self, other: Number) -> Option<Number> {
        if other.is_zero() {
            return None;
        }
        Some(Number::Float(self.as_f64() / other.as_f64()))
    }

    pub fn pow(self, other: Number) -> Number {
        if let (Number::Int(base), Number::Int(exp)) = (self, other) {
            if let Some(n) = u32::try_from(exp).ok().and_then(|e| base.checked_pow(e)) {
                return Number::Int(n);
            }
        }
        Number::Float(self.as_f64().powf(other.as_f64()))
    }

    pub fn negate(self) -> Number {
        match self {
            Number::Int(n) => n
                .checked_neg()
                .map_or(Number::Float(-(n as f64)), Number::Int),
            Number::Float(n) => Number::Float(-n),
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a == b,
            (a, b) => a.as_f64() == b.as_f64(),
        }
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a.partial_cmp(b),
            (a, b) => a.as_f64().partial_cmp(&b.as_f64()),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(n) => write!(f, "{}", n),
            Number::Float(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e16 => {
                write!(f, "{:.1}", n)
            }
            Number::Float(n) => write!(f, "{}", n),
        }
    }
}

pub struct Function {
    pub name: String,
    pub params: Vec<String>,
    pub body: Rc<Node>,
    /// The context the function was defined in. Calls run in a child of its
    /// symbol table.
    pub closure: Rc<Context>,
}

pub type NativeFn = fn(&Invocation, &[Value]) -> Result<Value>;

pub struct BuiltIn {
    pub name: &'static str,
    pub params: &'static [&'static str],
    pub func: NativeFn,
}

/// Lists are shared by reference: every binding of the same list sees
/// in-place mutation. List operators always build a new list.
#[derive(Clone)]
pub enum Value {
    Number(Number),
    String(String),
    Boolean(bool),
    List(Rc<RefCell<Vec<Value>>>),
    Function(Rc<Function>),
    BuiltIn(Rc<BuiltIn>),
}

/// Which operand an operator failure should point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Culprit {
    Expression,
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpError {
    pub kind: RuntimeErrorKind,
    pub details: String,
    pub culprit: Culprit,
}

pub type OpResult = std::result::Result<Value, OpError>;

impl Value {
    pub fn null() -> Value {
        Value::Number(Number::Int(0))
    }

    pub fn new_list(elements: Vec<Value>) -> Value {
        Value::List(Rc::new(RefCell::new(elements)))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Boolean(_) => "bool",
            Value::List(_) => "list",
            Value::Function(_) => "function",
            Value::BuiltIn(_) => "built-in function",
        }
    }

    pub fn is_true(&self) -> bool {
        match self {
            Value::Number(n) => !n.is_zero(),
            Value::String(s) => !s.is_empty(),
            Value::Boolean(b) => *b,
            Value::List(items) => !items.borrow().is_empty(),
            Value::Function(_) | Value::BuiltIn(_) => true,
        }
    }

    pub fn binary(&self, operator: BinaryOp, other: &Value) -> OpResult {
        match operator {
            BinaryOp::Add => self.added_to(other),
            BinaryOp::Subtract => self.subtracted_by(other),
            BinaryOp::Multiply => self.multiplied_by(other),
            BinaryOp::Divide => self.divided_by(other),
            BinaryOp::Power => self.powered_by(other),
            BinaryOp::Equal => self.equals(other).map(Value::Boolean),
            BinaryOp::NotEqual => self.equals(other).map(|eq| Value::Boolean(!eq)),
            BinaryOp::Less => self.compare(operator, other, Ordering::is_lt),
            BinaryOp::Greater => self.compare(operator, other, Ordering::is_gt),
            BinaryOp::LessEqual => self.compare(operator, other, Ordering::is_le),
            BinaryOp::GreaterEqual => self.compare(operator, other, Ordering::is_ge),
            BinaryOp::And => self.logical(operator, other, |a, b| a && b),
            BinaryOp::Or => self.logical(operator, other, |a, b| a || b),
        }
    }

    fn illegal(&self, operator: &str, other: &Value) -> OpError {
        OpError {
            kind: RuntimeErrorKind::IllegalOperation,
            details: format!(
                "{} {} {}",
                self.type_name(),
                operator,
                other.type_name()
            ),
            culprit: Culprit::Expression,
        }
    }

    pub fn added_to(&self, other: &Value) -> OpResult {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a.add(*b))),
            (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{}{}", a, b))),
            (Value::List(items), _) => {
                let mut items = items.borrow().clone();
                items.push(other.clone());
                Ok(Value::new_list(items))
            }
            _ => Err(self.illegal("+", other)),
        }
    }

    pub fn subtracted_by(&self, other: &Value) -> OpResult {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a.subtract(*b))),
            (Value::List(items), Value::Number(index)) => {
                let mut items = items.borrow().clone();
                let i = resolve_index(*index, items.len()).ok_or_else(|| {
                    index_error(format!(
                        "cannot remove element {} from a list of length {}",
                        index,
                        items.len()
                    ))
                })?;
                items.remove(i);
                Ok(Value::new_list(items))
            }
            _ => Err(self.illegal("-", other)),
        }
    }

    pub fn multiplied_by(&self, other: &Value) -> OpResult {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a.multiply(*b))),
            (Value::String(s), Value::Number(Number::Int(n))) => {
                let count = usize::try_from(*n).unwrap_or(0);
                match s.len().checked_mul(count) {
                    Some(len) if len <= MAX_STRING_LEN => Ok(Value::String(s.repeat(count))),
                    _ => Err(OpError {
                        kind: RuntimeErrorKind::IllegalOperation,
                        details: format!("repeating a string {} times is too long", n),
                        culprit: Culprit::Right,
                    }),
                }
            }
            (Value::List(a), Value::List(b)) => {
                let mut items = a.borrow().clone();
                items.extend(b.borrow().iter().cloned());
                Ok(Value::new_list(items))
            }
            _ => Err(self.illegal("*", other)),
        }
    }

    pub fn divided_by(&self, other: &Value) -> OpResult {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => {
                a.divide(*b).map(Value::Number).ok_or_else(|| OpError {
                    kind: RuntimeErrorKind::DivisionByZero,
                    details: "the divisor is zero".to_string(),
                    culprit: Culprit::Right,
                })
            }
            (Value::List(items), Value::Number(index)) => {
                let items = items.borrow();
                resolve_index(*index, items.len())
                    .map(|i| items[i].clone())
                    .ok_or_else(|| {
                        index_error(format!(
                            "cannot get element {} from a list of length {}",
                            index,
                            items.len()
                        ))
                    })
            }
            _ => Err(self.illegal("/", other)),
        }
    }

    pub fn powered_by(&self, other: &Value) -> OpResult {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a.pow(*b))),
            _ => Err(self.illegal("^", other)),
        }
    }

    /// Structural equality. Numbers and booleans compare by truthiness when
    /// mixed.
    pub fn equals(&self, other: &Value) -> std::result::Result<bool, OpError> {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => Ok(a == b),
            (Value::String(a), Value::String(b)) => Ok(a == b),
            (Value::Boolean(a), Value::Boolean(b)) => Ok(a == b),
            (Value::Number(n), Value::Boolean(b)) | (Value::Boolean(b), Value::Number(n)) => {
                Ok(!n.is_zero() == *b)
            }
            _ => Err(self.illegal("==", other)),
        }
    }

    fn compare(&self, operator: BinaryOp, other: &Value, test: fn(Ordering) -> bool) -> OpResult {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Boolean(
                a.partial_cmp(b).map_or(false, test),
            )),
            _ => Err(self.illegal(operator.symbol(), other)),
        }
    }

    fn logical(&self, operator: BinaryOp, other: &Value, combine: fn(bool, bool) -> bool) -> OpResult {
        match (self, other) {
            (Value::Number(_) | Value::Boolean(_), Value::Number(_) | Value::Boolean(_)) => {
                Ok(Value::Boolean(combine(self.is_true(), other.is_true())))
            }
            _ => Err(self.illegal(operator.symbol(), other)),
        }
    }

    pub fn negated(&self) -> OpResult {
        match self {
            Value::Number(n) => Ok(Value::Number(n.negate())),
            _ => Err(self.unary_illegal("-")),
        }
    }

    pub fn notted(&self) -> OpResult {
        match self {
            Value::Number(n) => Ok(Value::Boolean(n.is_zero())),
            Value::Boolean(b) => Ok(Value::Boolean(!b)),
            _ => Err(self.unary_illegal("not")),
        }
    }

    fn unary_illegal(&self, operator: &str) -> OpError {
        OpError {
            kind: RuntimeErrorKind::IllegalOperation,
            details: format!("{} {}", operator, self.type_name()),
            culprit: Culprit::Expression,
        }
    }
}

/// Maps a user index onto `0..len`. Only integers are indexes; negative ones
/// count from the end.
pub fn resolve_index(index: Number, len: usize) -> Option<usize> {
    let Number::Int(index) = index else {
        return None;
    };
    let len = i64::try_from(len).ok()?;
    let index = if index < 0 { index + len } else { index };
    if (0..len).contains(&index) {
        usize::try_from(index).ok()
    } else {
        None
    }
}

fn index_error(details: String) -> OpError {
    OpError {
        kind: RuntimeErrorKind::IndexOutOfRange,
        details,
        culprit: Culprit::Right,
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::BuiltIn(a), Value::BuiltIn(b)) => a.name == b.name,
            _ => false,
        }
    }
}

/// Writes `value`, quoting strings when `quoted`. `open` holds the lists
/// currently being written; a list that contains itself prints as `[...]`.
fn write_value(
    f: &mut fmt::Formatter<'_>,
    value: &Value,
    quoted: bool,
    open: &mut Vec<*const RefCell<Vec<Value>>>,
) -> fmt::Result {
    match value {
        Value::Number(n) => write!(f, "{}", n),
        Value::String(s) if quoted => write!(f, "\"{}\"", s),
        Value::String(s) => write!(f, "{}", s),
        Value::Boolean(b) => write!(f, "{}", b),
        Value::List(items) => {
            let ptr = Rc::as_ptr(items);
            if open.contains(&ptr) {
                return f.write_str("[...]");
            }

            open.push(ptr);
            f.write_str("[")?;
            for (i, item) in items.borrow().iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write_value(f, item, quoted, open)?;
            }
            open.pop();
            f.write_str("]")
        }
        Value::Function(func) => write!(f, "<function {}>", func.name),
        Value::BuiltIn(builtin) => write!(f, "<built-in function {}>", builtin.name),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_value(f, self, false, &mut Vec::new())
    }
}

/// The REPL form: strings are quoted, everything else prints as displayed.
impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_value(f, self, true, &mut Vec::new())
    }
}
