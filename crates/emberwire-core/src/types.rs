//! Declared-Type Grammar and Resolved Types
//!
//! Every result-set column arrives with a declared type string such as
//! `"Nullable(Int32)"`, `"Array(Decimal(18, 4))"`, or
//! `"DateTime64(6, 'UTC')"`. This module parses that grammar once per result
//! set into [`ResolvedType`], the structured form that drives cell decoding.
//!
//! ## Design
//!
//! The registry is the `ResolvedType` enum itself: decoding dispatches by
//! structural match over the parsed type, never by string comparison per
//! cell, and the compiler checks exhaustiveness. Parsing happens eagerly at
//! header time; an unknown or malformed declared type fails the whole
//! result set before any row is read.
//!
//! ## Grammar
//!
//! ```text
//! type      := scalar | composite
//! scalar    := Int8..Int64 | UInt8..UInt64 | Float32 | Float64 | Bool
//!            | String | FixedString(N)
//!            | Date | Date32 | DateTime['(' tz ')'] | DateTime64(p[, tz])
//!            | Decimal(P, S) | Decimal32(S) | Decimal64(S) | Decimal128(S)
//! composite := Nullable(type) | Array(type) | Tuple(field, ...)
//! field     := type | name type
//! tz        := '\'' identifier '\''
//! ```
//!
//! Constraints enforced at parse time: `Nullable` may not wrap `Nullable` or
//! `Array`; `DateTime64` precision is 0..=9; `Decimal` precision is 1..=38
//! with scale <= precision; `FixedString` length is >= 1.

use serde::Serialize;

use crate::error::{Error, Result};

/// One field of a `Tuple(...)` type; the name is present only for named
/// tuples such as `Tuple(id Int32, label String)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TupleField {
    pub name: Option<String>,
    pub ty: ResolvedType,
}

/// The structured form of a declared wire type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ResolvedType {
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
    Bool,
    /// Variable-width UTF-8 text, varint length prefixed.
    String,
    /// Exactly N raw bytes per cell, no length prefix.
    FixedString(usize),
    /// u16 days since the Unix epoch.
    Date,
    /// i32 days since the Unix epoch.
    Date32,
    /// u32 seconds since the Unix epoch. The timezone identifier lives in
    /// the type string only; wire values are always UTC offsets.
    DateTime { tz: Option<String> },
    /// i64 ticks at 10^-precision seconds since the Unix epoch.
    DateTime64 { precision: u8, tz: Option<String> },
    /// Fixed-point decimal; the wire width is derived from the precision.
    Decimal { precision: u8, scale: u8 },
    Nullable(Box<ResolvedType>),
    Array(Box<ResolvedType>),
    Tuple(Vec<TupleField>),
}

impl ResolvedType {
    /// Parse a declared type string into its structured form.
    pub fn parse(declared: &str) -> Result<ResolvedType> {
        let mut parser = Parser::new(declared);
        let ty = parser.parse_type()?;
        parser.skip_spaces();
        if !parser.at_end() {
            return Err(Error::MalformedHeader(format!(
                "trailing characters after type in '{}'",
                declared
            )));
        }
        Ok(ty)
    }

    /// Canonical display name for metadata reporting.
    pub fn display_name(&self) -> String {
        match self {
            ResolvedType::Int8 => "Int8".to_string(),
            ResolvedType::Int16 => "Int16".to_string(),
            ResolvedType::Int32 => "Int32".to_string(),
            ResolvedType::Int64 => "Int64".to_string(),
            ResolvedType::UInt8 => "UInt8".to_string(),
            ResolvedType::UInt16 => "UInt16".to_string(),
            ResolvedType::UInt32 => "UInt32".to_string(),
            ResolvedType::UInt64 => "UInt64".to_string(),
            ResolvedType::Float32 => "Float32".to_string(),
            ResolvedType::Float64 => "Float64".to_string(),
            ResolvedType::Bool => "Bool".to_string(),
            ResolvedType::String => "String".to_string(),
            ResolvedType::FixedString(n) => format!("FixedString({})", n),
            ResolvedType::Date => "Date".to_string(),
            ResolvedType::Date32 => "Date32".to_string(),
            ResolvedType::DateTime { tz: None } => "DateTime".to_string(),
            ResolvedType::DateTime { tz: Some(tz) } => format!("DateTime('{}')", tz),
            ResolvedType::DateTime64 { precision, tz: None } => {
                format!("DateTime64({})", precision)
            }
            ResolvedType::DateTime64 {
                precision,
                tz: Some(tz),
            } => format!("DateTime64({}, '{}')", precision, tz),
            ResolvedType::Decimal { precision, scale } => {
                format!("Decimal({}, {})", precision, scale)
            }
            ResolvedType::Nullable(inner) => format!("Nullable({})", inner.display_name()),
            ResolvedType::Array(inner) => format!("Array({})", inner.display_name()),
            ResolvedType::Tuple(fields) => {
                let parts: Vec<String> = fields
                    .iter()
                    .map(|f| match &f.name {
                        Some(name) => format!("{} {}", name, f.ty.display_name()),
                        None => f.ty.display_name(),
                    })
                    .collect();
                format!("Tuple({})", parts.join(", "))
            }
        }
    }

    /// Whether cells of this type may legally decode to `Value::Null`.
    pub fn is_nullable(&self) -> bool {
        matches!(self, ResolvedType::Nullable(_))
    }
}

impl std::fmt::Display for ResolvedType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display_name())
    }
}

/// Nesting deeper than this is rejected rather than recursed into.
const MAX_TYPE_DEPTH: usize = 32;

/// Recursive-descent parser over a declared type string.
struct Parser<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
            depth: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek();
        if b.is_some() {
            self.pos += 1;
        }
        b
    }

    fn skip_spaces(&mut self) {
        while self.peek() == Some(b' ') {
            self.pos += 1;
        }
    }

    fn expect(&mut self, b: u8) -> Result<()> {
        self.skip_spaces();
        if self.bump() == Some(b) {
            Ok(())
        } else {
            Err(self.malformed(&format!("expected '{}'", b as char)))
        }
    }

    fn malformed(&self, what: &str) -> Error {
        Error::MalformedHeader(format!(
            "{} at position {} in type '{}'",
            what, self.pos, self.input
        ))
    }

    fn ident(&mut self) -> Result<&'a str> {
        self.skip_spaces();
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b.is_ascii_alphanumeric() || b == b'_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        if self.pos == start {
            return Err(self.malformed("expected identifier"));
        }
        Ok(&self.input[start..self.pos])
    }

    fn number(&mut self) -> Result<u64> {
        self.skip_spaces();
        let start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.malformed("expected number"));
        }
        self.input[start..self.pos]
            .parse::<u64>()
            .map_err(|_| self.malformed("numeric argument out of range"))
    }

    fn quoted(&mut self) -> Result<String> {
        self.expect(b'\'')?;
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b == b'\'' {
                let s = self.input[start..self.pos].to_string();
                self.pos += 1;
                return Ok(s);
            }
            self.pos += 1;
        }
        Err(self.malformed("unterminated quoted string"))
    }

    fn parse_type(&mut self) -> Result<ResolvedType> {
        let name = self.ident()?;
        self.parse_after_ident(name)
    }

    fn parse_after_ident(&mut self, name: &str) -> Result<ResolvedType> {
        self.depth += 1;
        if self.depth > MAX_TYPE_DEPTH {
            return Err(self.malformed("type nesting too deep"));
        }
        let ty = self.parse_named(name);
        self.depth -= 1;
        ty
    }

    fn parse_named(&mut self, name: &str) -> Result<ResolvedType> {
        match name {
            "Int8" => Ok(ResolvedType::Int8),
            "Int16" => Ok(ResolvedType::Int16),
            "Int32" => Ok(ResolvedType::Int32),
            "Int64" => Ok(ResolvedType::Int64),
            "UInt8" => Ok(ResolvedType::UInt8),
            "UInt16" => Ok(ResolvedType::UInt16),
            "UInt32" => Ok(ResolvedType::UInt32),
            "UInt64" => Ok(ResolvedType::UInt64),
            "Float32" => Ok(ResolvedType::Float32),
            "Float64" => Ok(ResolvedType::Float64),
            "Bool" | "Boolean" => Ok(ResolvedType::Bool),
            "String" => Ok(ResolvedType::String),
            "Date" => Ok(ResolvedType::Date),
            "Date32" => Ok(ResolvedType::Date32),
            "FixedString" => {
                self.expect(b'(')?;
                let n = self.number()? as usize;
                self.expect(b')')?;
                if n == 0 {
                    return Err(self.malformed("FixedString length must be >= 1"));
                }
                Ok(ResolvedType::FixedString(n))
            }
            "DateTime" => {
                self.skip_spaces();
                if self.peek() == Some(b'(') {
                    self.bump();
                    let tz = self.quoted()?;
                    self.expect(b')')?;
                    Ok(ResolvedType::DateTime { tz: Some(tz) })
                } else {
                    Ok(ResolvedType::DateTime { tz: None })
                }
            }
            "DateTime64" => {
                self.expect(b'(')?;
                let precision = self.number()?;
                if precision > 9 {
                    return Err(self.malformed("DateTime64 precision must be 0..=9"));
                }
                self.skip_spaces();
                let tz = if self.peek() == Some(b',') {
                    self.bump();
                    self.skip_spaces();
                    Some(self.quoted()?)
                } else {
                    None
                };
                self.expect(b')')?;
                Ok(ResolvedType::DateTime64 {
                    precision: precision as u8,
                    tz,
                })
            }
            "Decimal" => {
                self.expect(b'(')?;
                let precision = self.number()?;
                self.expect(b',')?;
                let scale = self.number()?;
                self.expect(b')')?;
                self.decimal(precision, scale)
            }
            "Decimal32" => self.sized_decimal(9),
            "Decimal64" => self.sized_decimal(18),
            "Decimal128" => self.sized_decimal(38),
            "Nullable" => {
                self.expect(b'(')?;
                let inner = self.parse_type()?;
                self.expect(b')')?;
                match inner {
                    ResolvedType::Nullable(_) => {
                        Err(self.malformed("Nullable may not wrap Nullable"))
                    }
                    ResolvedType::Array(_) => Err(self.malformed("Nullable may not wrap Array")),
                    ResolvedType::Tuple(_) => Err(self.malformed("Nullable may not wrap Tuple")),
                    inner => Ok(ResolvedType::Nullable(Box::new(inner))),
                }
            }
            "Array" => {
                self.expect(b'(')?;
                let inner = self.parse_type()?;
                self.expect(b')')?;
                Ok(ResolvedType::Array(Box::new(inner)))
            }
            "Tuple" => {
                self.expect(b'(')?;
                let mut fields = Vec::new();
                loop {
                    fields.push(self.parse_tuple_field()?);
                    self.skip_spaces();
                    match self.bump() {
                        Some(b',') => continue,
                        Some(b')') => break,
                        _ => return Err(self.malformed("expected ',' or ')' in Tuple")),
                    }
                }
                if fields.is_empty() {
                    return Err(self.malformed("Tuple must have at least one field"));
                }
                Ok(ResolvedType::Tuple(fields))
            }
            other => Err(Error::UnknownType(other.to_string())),
        }
    }

    /// A tuple field is either `Type` or `name Type`; an identifier followed
    /// by another identifier is a field name.
    fn parse_tuple_field(&mut self) -> Result<TupleField> {
        let first = self.ident()?;
        self.skip_spaces();
        match self.peek() {
            Some(b) if b.is_ascii_alphanumeric() || b == b'_' => {
                let ty = self.parse_type()?;
                Ok(TupleField {
                    name: Some(first.to_string()),
                    ty,
                })
            }
            _ => Ok(TupleField {
                name: None,
                ty: self.parse_after_ident(first)?,
            }),
        }
    }

    fn sized_decimal(&mut self, precision: u64) -> Result<ResolvedType> {
        self.expect(b'(')?;
        let scale = self.number()?;
        self.expect(b')')?;
        self.decimal(precision, scale)
    }

    fn decimal(&mut self, precision: u64, scale: u64) -> Result<ResolvedType> {
        if precision == 0 || precision > 38 {
            return Err(self.malformed("Decimal precision must be 1..=38"));
        }
        if scale > precision {
            return Err(self.malformed("Decimal scale must not exceed precision"));
        }
        Ok(ResolvedType::Decimal {
            precision: precision as u8,
            scale: scale as u8,
        })
    }
}
