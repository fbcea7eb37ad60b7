use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kind of a schema. Used in issue messages (`expected`) and to route
/// kind-sensitive modifiers such as `min` and `max`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeTag {
    String,
    Float64,
    Float32,
    Int,
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Bool,
    Null,
    Any,
    Unknown,
    Never,
    Literal,
    Enum,
    Array,
    Tuple,
    Object,
    Record,
    Union,
    Xor,
    Intersection,
    Pipe,
    Transform,
    Lazy,
    Custom,
}

impl TypeTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Float64 => "float64",
            Self::Float32 => "float32",
            Self::Int => "int",
            Self::Int8 => "int8",
            Self::Uint8 => "uint8",
            Self::Int16 => "int16",
            Self::Uint16 => "uint16",
            Self::Int32 => "int32",
            Self::Uint32 => "uint32",
            Self::Bool => "bool",
            Self::Null => "null",
            Self::Any => "any",
            Self::Unknown => "unknown",
            Self::Never => "never",
            Self::Literal => "literal",
            Self::Enum => "enum",
            Self::Array => "array",
            Self::Tuple => "tuple",
            Self::Object => "object",
            Self::Record => "record",
            Self::Union => "union",
            Self::Xor => "xor",
            Self::Intersection => "intersection",
            Self::Pipe => "pipe",
            Self::Transform => "transform",
            Self::Lazy => "lazy",
            Self::Custom => "custom",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::Float64
                | Self::Float32
                | Self::Int
                | Self::Int8
                | Self::Uint8
                | Self::Int16
                | Self::Uint16
                | Self::Int32
                | Self::Uint32
        )
    }

    pub fn is_keyed(&self) -> bool {
        matches!(self, Self::Object | Self::Record)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TypeTag {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(Self::String),
            "float64" => Ok(Self::Float64),
            "float32" => Ok(Self::Float32),
            "int" => Ok(Self::Int),
            "int8" => Ok(Self::Int8),
            "uint8" => Ok(Self::Uint8),
            "int16" => Ok(Self::Int16),
            "uint16" => Ok(Self::Uint16),
            "int32" => Ok(Self::Int32),
            "uint32" => Ok(Self::Uint32),
            "bool" => Ok(Self::Bool),
            "null" => Ok(Self::Null),
            "any" => Ok(Self::Any),
            "unknown" => Ok(Self::Unknown),
            "never" => Ok(Self::Never),
            "literal" => Ok(Self::Literal),
            "enum" => Ok(Self::Enum),
            "array" => Ok(Self::Array),
            "tuple" => Ok(Self::Tuple),
            "object" => Ok(Self::Object),
            "record" => Ok(Self::Record),
            "union" => Ok(Self::Union),
            "xor" => Ok(Self::Xor),
            "intersection" => Ok(Self::Intersection),
            "pipe" => Ok(Self::Pipe),
            "transform" => Ok(Self::Transform),
            "lazy" => Ok(Self::Lazy),
            "custom" => Ok(Self::Custom),
            _ => Err(()),
        }
    }
}
