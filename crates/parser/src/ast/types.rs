//! The type model.
//!
//! `Type` is a plain tree: `Named` carries only the package and name of
//! the type it refers to, never the underlying structure, so recursive
//! named types introduce no cycles here. The checker's named-type
//! registry holds the underlying type and method set.
//!
//! `Type` derives `Eq` and `Hash`; the emitter keys error-elider
//! helpers by type identity of the elided result tuple.

use std::fmt;

/// Named primitive types.
///
/// `Integer`, `Float` and `Complex` are the arbitrary-precision
/// scripting types; the sized forms mirror the host language. The
/// `Untyped*` forms are the types of literal constants before context
/// commits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Basic {
    Bool,
    Integer,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float,
    Float32,
    Float64,
    Complex,
    Complex64,
    Complex128,
    String,
    Rune,
    Byte,
    UntypedNil,
    UntypedBool,
    UntypedInteger,
    UntypedFloat,
    UntypedComplex,
    UntypedString,
    UntypedRune,
}

impl Basic {
    pub fn name(&self) -> &'static str {
        match self {
            Basic::Bool => "bool",
            Basic::Integer => "integer",
            Basic::Int => "int",
            Basic::Int8 => "int8",
            Basic::Int16 => "int16",
            Basic::Int32 => "int32",
            Basic::Int64 => "int64",
            Basic::Uint => "uint",
            Basic::Uint8 => "uint8",
            Basic::Uint16 => "uint16",
            Basic::Uint32 => "uint32",
            Basic::Uint64 => "uint64",
            Basic::Float => "float",
            Basic::Float32 => "float32",
            Basic::Float64 => "float64",
            Basic::Complex => "complex",
            Basic::Complex64 => "complex64",
            Basic::Complex128 => "complex128",
            Basic::String => "string",
            Basic::Rune => "rune",
            Basic::Byte => "byte",
            Basic::UntypedNil => "untyped nil",
            Basic::UntypedBool => "untyped bool",
            Basic::UntypedInteger => "untyped integer",
            Basic::UntypedFloat => "untyped float",
            Basic::UntypedComplex => "untyped complex",
            Basic::UntypedString => "untyped string",
            Basic::UntypedRune => "untyped rune",
        }
    }

    pub fn from_name(name: &str) -> Option<Basic> {
        let b = match name {
            "bool" => Basic::Bool,
            "integer" => Basic::Integer,
            "int" => Basic::Int,
            "int8" => Basic::Int8,
            "int16" => Basic::Int16,
            "int32" => Basic::Int32,
            "int64" => Basic::Int64,
            "uint" => Basic::Uint,
            "uint8" => Basic::Uint8,
            "uint16" => Basic::Uint16,
            "uint32" => Basic::Uint32,
            "uint64" => Basic::Uint64,
            "float" => Basic::Float,
            "float32" => Basic::Float32,
            "float64" => Basic::Float64,
            "complex" => Basic::Complex,
            "complex64" => Basic::Complex64,
            "complex128" => Basic::Complex128,
            "string" => Basic::String,
            "rune" => Basic::Rune,
            "byte" => Basic::Byte,
            _ => return None,
        };
        Some(b)
    }

    pub fn is_untyped(&self) -> bool {
        matches!(
            self,
            Basic::UntypedNil
                | Basic::UntypedBool
                | Basic::UntypedInteger
                | Basic::UntypedFloat
                | Basic::UntypedComplex
                | Basic::UntypedString
                | Basic::UntypedRune
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChanDir {
    Both,
    Send,
    Recv,
}

/// A function signature: parameter tuple and result tuple. Variadic
/// functions carry an `Ellipsis` type as their final parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FuncSig {
    pub params: Vec<Type>,
    pub results: Vec<Type>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Basic(Basic),
    /// Reference to a declared named type, by package path (empty for
    /// the current package) and name.
    Named { package: String, name: String },
    /// A name the parser could not resolve; none of these survive
    /// checking.
    Unresolved { package: Option<String>, name: String },
    /// The type of an imported package value.
    Package(String),
    /// The error interface.
    Error,
    Pointer(Box<Type>),
    Array {
        len: Option<u64>,
        /// `[...]T` form; length comes from the literal.
        ellipsis: bool,
        elem: Box<Type>,
    },
    Slice(Box<Type>),
    /// Method set ordered by name.
    Interface(Vec<(String, FuncSig)>),
    Map {
        key: Box<Type>,
        value: Box<Type>,
    },
    Chan {
        dir: ChanDir,
        elem: Box<Type>,
    },
    Func(FuncSig),
    Alias {
        name: String,
        ty: Box<Type>,
    },
    Tuple(Vec<Type>),
    /// Variadic parameter element.
    Ellipsis(Box<Type>),
    Methodik {
        name: String,
        underlying: Box<Type>,
        methods: Vec<(String, FuncSig)>,
        pointer_receiver: bool,
    },
    /// Ordered field list.
    Struct(Vec<(String, Type)>),
    Table(Box<Type>),
}

impl Type {
    /// The empty tuple, used as the type of statements and of calls
    /// with no results.
    pub fn unit() -> Type {
        Type::Tuple(Vec::new())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Type::Error)
    }

    pub fn is_untyped(&self) -> bool {
        matches!(self, Type::Basic(b) if b.is_untyped())
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Basic(b) => f.write_str(b.name()),
            Type::Named { package, name } => {
                if package.is_empty() {
                    f.write_str(name)
                } else {
                    write!(f, "{}.{}", package, name)
                }
            }
            Type::Unresolved { package, name } => match package {
                Some(p) => write!(f, "{}.{}", p, name),
                None => f.write_str(name),
            },
            Type::Package(path) => write!(f, "package {:?}", path),
            Type::Error => f.write_str("error"),
            Type::Pointer(elem) => write!(f, "*{}", elem),
            Type::Array { len, ellipsis, elem } => {
                if *ellipsis {
                    write!(f, "[...]{}", elem)
                } else {
                    write!(f, "[{}]{}", len.unwrap_or(0), elem)
                }
            }
            Type::Slice(elem) => write!(f, "[]{}", elem),
            Type::Interface(methods) => {
                if methods.is_empty() {
                    return f.write_str("interface{}");
                }
                f.write_str("interface {")?;
                for (i, (name, sig)) in methods.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    write!(f, " {}{}", name, SigDisplay(sig))?;
                }
                f.write_str(" }")
            }
            Type::Map { key, value } => write!(f, "map[{}]{}", key, value),
            Type::Chan { dir, elem } => match dir {
                ChanDir::Recv => write!(f, "<-chan {}", elem),
                ChanDir::Send => write!(f, "chan<- {}", elem),
                ChanDir::Both => write!(f, "chan {}", elem),
            },
            Type::Func(sig) => write!(f, "func{}", SigDisplay(sig)),
            Type::Alias { name, .. } => f.write_str(name),
            Type::Tuple(elems) => {
                f.write_str("(")?;
                for (i, t) in elems.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", t)?;
                }
                f.write_str(")")
            }
            Type::Ellipsis(elem) => write!(f, "...{}", elem),
            Type::Methodik { name, .. } => f.write_str(name),
            Type::Struct(fields) => {
                if fields.is_empty() {
                    return f.write_str("struct{}");
                }
                f.write_str("struct {")?;
                for (i, (name, ty)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(";")?;
                    }
                    write!(f, " {} {}", name, ty)?;
                }
                f.write_str(" }")
            }
            Type::Table(elem) => write!(f, "[|]{}", elem),
        }
    }
}

struct SigDisplay<'a>(&'a FuncSig);

impl fmt::Display for SigDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, t) in self.0.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", t)?;
        }
        f.write_str(")")?;
        match self.0.results.len() {
            0 => Ok(()),
            1 => write!(f, " {}", self.0.results[0]),
            _ => {
                f.write_str(" (")?;
                for (i, t) in self.0.results.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", t)?;
                }
                f.write_str(")")
            }
        }
    }
}
