use std::{
    cell::RefCell,
    collections::{HashMap, HashSet},
    fmt,
    rc::Rc,
};

use crate::{parser::TypeTag, position::Position, value::Value};

pub type Scope = Rc<RefCell<SymbolTable>>;

/// One layer of name bindings. Lookups fall through to the parent layer;
/// writes always land in this one.
#[derive(Default)]
pub struct SymbolTable {
    symbols: HashMap<String, Value>,
    constants: HashSet<String>,
    var_types: HashMap<String, TypeTag>,
    parent: Option<Scope>,
}

impl SymbolTable {
    pub fn new() -> SymbolTable {
        SymbolTable::default()
    }

    pub fn with_parent(parent: &Scope) -> SymbolTable {
        SymbolTable {
            parent: Some(Rc::clone(parent)),
            ..SymbolTable::default()
        }
    }

    pub fn into_scope(self) -> Scope {
        Rc::new(RefCell::new(self))
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        match self.symbols.get(name) {
            Some(value) => Some(value.clone()),
            None => self.parent.as_ref()?.borrow().get(name),
        }
    }

    pub fn contains_local(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    /// Whether `name` is a constant in this layer or any layer above it.
    pub fn is_constant(&self, name: &str) -> bool {
        self.constants.contains(name)
            || self
                .parent
                .as_ref()
                .map_or(false, |parent| parent.borrow().is_constant(name))
    }

    /// Binds `name` in this layer. Returns false, leaving the table untouched,
    /// when a visible binding of `name` is constant.
    pub fn set(&mut self, name: &str, value: Value) -> bool {
        if self.is_constant(name) {
            return false;
        }
        self.symbols.insert(name.to_string(), value);
        true
    }

    /// Binds `name` as a constant. Returns false when this layer already
    /// binds `name`.
    pub fn set_constant(&mut self, name: &str, value: Value) -> bool {
        if self.contains_local(name) {
            return false;
        }
        self.symbols.insert(name.to_string(), value);
        self.constants.insert(name.to_string());
        true
    }

    /// Unchecked binding, for parameters and predefined names.
    pub fn define(&mut self, name: &str, value: Value) {
        self.symbols.insert(name.to_string(), value);
    }

    pub fn declare_type(&mut self, name: &str, var_type: TypeTag) {
        self.var_types.insert(name.to_string(), var_type);
    }

    pub fn declared_type(&self, name: &str) -> Option<TypeTag> {
        self.var_types.get(name).copied()
    }
}

/// A named evaluation frame. `parent` is the frame that entered this one and
/// `parent_entry_pos` where it did so; both only feed tracebacks.
pub struct Context {
    pub display_name: String,
    pub parent: Option<Rc<Context>>,
    pub parent_entry_pos: Option<Position>,
    pub symbol_table: Scope,
}

impl Context {
    pub fn new(display_name: &str, symbol_table: Scope) -> Rc<Context> {
        Rc::new(Context {
            display_name: display_name.to_string(),
            parent: None,
            parent_entry_pos: None,
            symbol_table,
        })
    }

    pub fn child(
        display_name: &str,
        parent: &Rc<Context>,
        entry: Position,
        symbol_table: Scope,
    ) -> Rc<Context> {
        Rc::new(Context {
            display_name: display_name.to_string(),
            parent: Some(Rc::clone(parent)),
            parent_entry_pos: Some(entry),
            symbol_table,
        })
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        self.symbol_table.borrow().get(name)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = vec![self.display_name.as_str()];
        let mut parent = self.parent.as_ref();
        while let Some(ctx) = parent {
            names.push(&ctx.display_name);
            parent = ctx.parent.as_ref();
        }
        write!(f, "Context({})", names.join(" <- "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Number;

    fn int(n: i64) -> Value {
        Value::Number(Number::Int(n))
    }

    #[test]
    fn test_lookup_falls_through_to_parent() {
        let global = SymbolTable::new().into_scope();
        global.borrow_mut().define("x", int(1));
        let local = SymbolTable::with_parent(&global);

        assert_eq!(local.get("x"), Some(int(1)));
        assert_eq!(local.get("y"), None);
        assert!(!local.contains_local("x"));
    }

    #[test]
    fn test_set_shadows_without_touching_parent() {
        let global = SymbolTable::new().into_scope();
        global.borrow_mut().define("x", int(1));
        let mut local = SymbolTable::with_parent(&global);

        assert!(local.set("x", int(2)));
        assert_eq!(local.get("x"), Some(int(2)));
        assert_eq!(global.borrow().get("x"), Some(int(1)));
    }

    #[test]
    fn test_constants_are_protected_through_the_chain() {
        let global = SymbolTable::new().into_scope();
        assert!(global.borrow_mut().set_constant("k", int(1)));
        assert!(!global.borrow_mut().set_constant("k", int(2)));

        let mut local = SymbolTable::with_parent(&global);
        assert!(!local.set("k", int(3)));
        assert_eq!(local.get("k"), Some(int(1)));

        // a new constant may shadow one from an outer layer
        assert!(local.set_constant("k", int(4)));
        assert_eq!(local.get("k"), Some(int(4)));
    }

    #[test]
    fn test_declared_types_are_per_layer() {
        let global = SymbolTable::new().into_scope();
        global.borrow_mut().declare_type("n", TypeTag::Int);
        let local = SymbolTable::with_parent(&global);

        assert_eq!(global.borrow().declared_type("n"), Some(TypeTag::Int));
        assert_eq!(local.declared_type("n"), None);
    }

    #[test]
    fn test_context_debug_lists_the_chain() {
        let table = SymbolTable::new().into_scope();
        let root = Context::new("<program>", Rc::clone(&table));
        let source = crate::position::Source::new("<test>", "f()");
        let entry = Position::start_of(source);
        let call = Context::child("f", &root, entry, table);

        assert_eq!(format!("{:?}", call), "Context(f <- <program>)");
    }
}
