//! LSL value types and compile-time constant values.

use std::fmt;

/// The seven LSL value types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Type {
    Integer,
    Float,
    String,
    Key,
    Vector,
    Rotation,
    List,
}

impl Type {
    /// Parse a type name as it appears in source. `quaternion` is the
    /// historical alias for `rotation`.
    pub fn from_name(name: &str) -> Option<Type> {
        Some(match name {
            "integer" => Type::Integer,
            "float" => Type::Float,
            "string" => Type::String,
            "key" => Type::Key,
            "vector" => Type::Vector,
            "rotation" | "quaternion" => Type::Rotation,
            "list" => Type::List,
            _ => return None,
        })
    }

    /// The canonical source spelling.
    pub fn name(self) -> &'static str {
        match self {
            Type::Integer => "integer",
            Type::Float => "float",
            Type::String => "string",
            Type::Key => "key",
            Type::Vector => "vector",
            Type::Rotation => "rotation",
            Type::List => "list",
        }
    }

    /// One-letter tag used by the list extraction compatibility table and
    /// the primitive-parameter type strings.
    pub fn tag(self) -> char {
        match self {
            Type::Integer => 'i',
            Type::Float => 'f',
            Type::String => 's',
            Type::Key => 'k',
            Type::Vector => 'v',
            Type::Rotation => 'r',
            Type::List => 'l',
        }
    }

    /// The value a variable of this type holds when declared without an
    /// initializer.
    pub fn default_value(self) -> Value {
        match self {
            Type::Integer => Value::Integer(0),
            Type::Float => Value::Float(0.0),
            Type::String => Value::Str(String::new()),
            Type::Key => Value::Key(String::new()),
            Type::Vector => Value::Vector([0.0; 3]),
            Type::Rotation => Value::Rotation([0.0, 0.0, 0.0, 1.0]),
            Type::List => Value::List(Vec::new()),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A compile-time LSL value. Lists hold any of the other kinds but never
/// nest.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Integer(i32),
    Float(f32),
    Str(String),
    Key(String),
    Vector([f32; 3]),
    Rotation([f32; 4]),
    List(Vec<Value>),
}

impl Value {
    pub fn ty(&self) -> Type {
        match self {
            Value::Integer(_) => Type::Integer,
            Value::Float(_) => Type::Float,
            Value::Str(_) => Type::String,
            Value::Key(_) => Type::Key,
            Value::Vector(_) => Type::Vector,
            Value::Rotation(_) => Type::Rotation,
            Value::List(_) => Type::List,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }
}
