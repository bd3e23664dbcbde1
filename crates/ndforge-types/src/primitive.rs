//! Leaf element types and the kind families used by signature patterns

use std::fmt;

/// Fixed-size scalar element type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Primitive {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Complex64,
    Complex128,
}

impl Primitive {
    pub const ALL: [Primitive; 13] = [
        Primitive::Bool,
        Primitive::Int8,
        Primitive::Int16,
        Primitive::Int32,
        Primitive::Int64,
        Primitive::UInt8,
        Primitive::UInt16,
        Primitive::UInt32,
        Primitive::UInt64,
        Primitive::Float32,
        Primitive::Float64,
        Primitive::Complex64,
        Primitive::Complex128,
    ];

    /// Canonical spelling used by the printer
    pub const fn name(self) -> &'static str {
        match self {
            Primitive::Bool => "bool",
            Primitive::Int8 => "int8",
            Primitive::Int16 => "int16",
            Primitive::Int32 => "int32",
            Primitive::Int64 => "int64",
            Primitive::UInt8 => "uint8",
            Primitive::UInt16 => "uint16",
            Primitive::UInt32 => "uint32",
            Primitive::UInt64 => "uint64",
            Primitive::Float32 => "float32",
            Primitive::Float64 => "float64",
            Primitive::Complex64 => "complex64",
            Primitive::Complex128 => "complex128",
        }
    }

    /// Resolve a canonical name or one of the C-style aliases.
    ///
    /// Aliases follow an LP64 data model (`long` is 64 bits).
    pub fn from_name(name: &str) -> Option<Self> {
        let primitive = match name {
            "bool" => Primitive::Bool,
            "int8" | "char" | "schar" => Primitive::Int8,
            "int16" | "short" => Primitive::Int16,
            "int32" | "int" => Primitive::Int32,
            "int64" | "long" | "longlong" | "ssize_t" | "intptr" => Primitive::Int64,
            "uint8" | "uchar" => Primitive::UInt8,
            "uint16" | "ushort" => Primitive::UInt16,
            "uint32" | "uint" => Primitive::UInt32,
            "uint64" | "ulong" | "ulonglong" | "size_t" | "uintptr" => Primitive::UInt64,
            "float32" | "float" => Primitive::Float32,
            "float64" | "double" => Primitive::Float64,
            "complex64" => Primitive::Complex64,
            "complex128" => Primitive::Complex128,
            _ => return None,
        };
        Some(primitive)
    }

    /// Size in bytes
    pub const fn size(self) -> usize {
        match self {
            Primitive::Bool | Primitive::Int8 | Primitive::UInt8 => 1,
            Primitive::Int16 | Primitive::UInt16 => 2,
            Primitive::Int32 | Primitive::UInt32 | Primitive::Float32 => 4,
            Primitive::Int64 | Primitive::UInt64 | Primitive::Float64 | Primitive::Complex64 => 8,
            Primitive::Complex128 => 16,
        }
    }

    /// Natural alignment in bytes (complex numbers align like their parts)
    pub const fn align(self) -> usize {
        match self {
            Primitive::Complex64 => 4,
            Primitive::Complex128 => 8,
            other => other.size(),
        }
    }

    pub const fn is_signed(self) -> bool {
        matches!(
            self,
            Primitive::Int8 | Primitive::Int16 | Primitive::Int32 | Primitive::Int64
        )
    }

    pub const fn is_unsigned(self) -> bool {
        matches!(
            self,
            Primitive::UInt8 | Primitive::UInt16 | Primitive::UInt32 | Primitive::UInt64
        )
    }

    pub const fn is_float(self) -> bool {
        matches!(self, Primitive::Float32 | Primitive::Float64)
    }

    pub const fn is_complex(self) -> bool {
        matches!(self, Primitive::Complex64 | Primitive::Complex128)
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Abstract element families. Only valid in patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Kind {
    /// Matches any type, including whole arrays
    Any,
    ScalarKind,
    SignedKind,
    UnsignedKind,
    FloatKind,
    ComplexKind,
}

impl Kind {
    pub const fn name(self) -> &'static str {
        match self {
            Kind::Any => "Any",
            Kind::ScalarKind => "ScalarKind",
            Kind::SignedKind => "SignedKind",
            Kind::UnsignedKind => "UnsignedKind",
            Kind::FloatKind => "FloatKind",
            Kind::ComplexKind => "ComplexKind",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Any" => Some(Kind::Any),
            "ScalarKind" => Some(Kind::ScalarKind),
            "SignedKind" => Some(Kind::SignedKind),
            "UnsignedKind" => Some(Kind::UnsignedKind),
            "FloatKind" => Some(Kind::FloatKind),
            "ComplexKind" => Some(Kind::ComplexKind),
            _ => None,
        }
    }

    /// Whether a primitive belongs to this family
    pub const fn admits(self, primitive: Primitive) -> bool {
        match self {
            Kind::Any | Kind::ScalarKind => true,
            Kind::SignedKind => primitive.is_signed(),
            Kind::UnsignedKind => primitive.is_unsigned(),
            Kind::FloatKind => primitive.is_float(),
            Kind::ComplexKind => primitive.is_complex(),
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
