use std::ops::{Index, IndexMut};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// UTC instant with second precision, `YYYY-MM-DDTHH:MM:SSZ` on the wire.
pub type TimePoint = DateTime<Utc>;

pub(crate) const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Complex32 {
    pub real: f32,
    pub imag: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Complex64 {
    pub real: f64,
    pub imag: f64,
}

/// Dense row-major matrix.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Matrix<T> {
    rows: usize,
    cols: usize,
    elem: Vec<T>,
}

impl<T: Clone + Default> Matrix<T> {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            elem: vec![T::default(); rows * cols],
        }
    }
}

impl<T> Matrix<T> {
    pub fn from_vec(rows: usize, cols: usize, elem: Vec<T>) -> Result<Self> {
        if rows * cols != elem.len() {
            return Err(Error::OutOfBounds(format!(
                "matrix {rows}x{cols} cannot hold {} elements",
                elem.len()
            )));
        }
        Ok(Self { rows, cols, elem })
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.elem
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.elem
    }
}

impl<T> Index<(usize, usize)> for Matrix<T> {
    type Output = T;

    fn index(&self, (row, col): (usize, usize)) -> &T {
        &self.elem[row * self.cols + col]
    }
}

impl<T> IndexMut<(usize, usize)> for Matrix<T> {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut T {
        &mut self.elem[row * self.cols + col]
    }
}

/// Discriminant of [`Value`]; the wire `type` attribute names these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Monostate,
    Boolean,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
    Complex32,
    Complex64,
    String,
    TimePoint,
    I8Vector,
    UI8Vector,
    I16Vector,
    UI16Vector,
    I32Vector,
    UI32Vector,
    I64Vector,
    UI64Vector,
    F32Vector,
    F64Vector,
    C32Vector,
    C64Vector,
    I8Matrix,
    UI8Matrix,
    I16Matrix,
    UI16Matrix,
    I32Matrix,
    UI32Matrix,
    I64Matrix,
    UI64Matrix,
    F32Matrix,
    F64Matrix,
    C32Matrix,
    C64Matrix,
}

/// Closed sum over every property type the format defines. The active
/// alternative is fully determined by [`ValueKind`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum Value {
    #[default]
    Monostate,
    Boolean(bool),
    Int8(i8),
    UInt8(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    Complex32(Complex32),
    Complex64(Complex64),
    String(String),
    TimePoint(TimePoint),
    I8Vector(Vec<i8>),
    UI8Vector(Vec<u8>),
    I16Vector(Vec<i16>),
    UI16Vector(Vec<u16>),
    I32Vector(Vec<i32>),
    UI32Vector(Vec<u32>),
    I64Vector(Vec<i64>),
    UI64Vector(Vec<u64>),
    F32Vector(Vec<f32>),
    F64Vector(Vec<f64>),
    C32Vector(Vec<Complex32>),
    C64Vector(Vec<Complex64>),
    I8Matrix(Matrix<i8>),
    UI8Matrix(Matrix<u8>),
    I16Matrix(Matrix<i16>),
    UI16Matrix(Matrix<u16>),
    I32Matrix(Matrix<i32>),
    UI32Matrix(Matrix<u32>),
    I64Matrix(Matrix<i64>),
    UI64Matrix(Matrix<u64>),
    F32Matrix(Matrix<f32>),
    F64Matrix(Matrix<f64>),
    C32Matrix(Matrix<Complex32>),
    C64Matrix(Matrix<Complex64>),
}

impl ValueKind {
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Monostate => "Monostate",
            ValueKind::Boolean => "Boolean",
            ValueKind::Int8 => "Int8",
            ValueKind::UInt8 => "UInt8",
            ValueKind::Int16 => "Int16",
            ValueKind::UInt16 => "UInt16",
            ValueKind::Int32 => "Int32",
            ValueKind::UInt32 => "UInt32",
            ValueKind::Int64 => "Int64",
            ValueKind::UInt64 => "UInt64",
            ValueKind::Float32 => "Float32",
            ValueKind::Float64 => "Float64",
            ValueKind::Complex32 => "Complex32",
            ValueKind::Complex64 => "Complex64",
            ValueKind::String => "String",
            ValueKind::TimePoint => "TimePoint",
            ValueKind::I8Vector => "I8Vector",
            ValueKind::UI8Vector => "UI8Vector",
            ValueKind::I16Vector => "I16Vector",
            ValueKind::UI16Vector => "UI16Vector",
            ValueKind::I32Vector => "I32Vector",
            ValueKind::UI32Vector => "UI32Vector",
            ValueKind::I64Vector => "I64Vector",
            ValueKind::UI64Vector => "UI64Vector",
            ValueKind::F32Vector => "F32Vector",
            ValueKind::F64Vector => "F64Vector",
            ValueKind::C32Vector => "C32Vector",
            ValueKind::C64Vector => "C64Vector",
            ValueKind::I8Matrix => "I8Matrix",
            ValueKind::UI8Matrix => "UI8Matrix",
            ValueKind::I16Matrix => "I16Matrix",
            ValueKind::UI16Matrix => "UI16Matrix",
            ValueKind::I32Matrix => "I32Matrix",
            ValueKind::UI32Matrix => "UI32Matrix",
            ValueKind::I64Matrix => "I64Matrix",
            ValueKind::UI64Matrix => "UI64Matrix",
            ValueKind::F32Matrix => "F32Matrix",
            ValueKind::F64Matrix => "F64Matrix",
            ValueKind::C32Matrix => "C32Matrix",
            ValueKind::C64Matrix => "C64Matrix",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "Monostate" => ValueKind::Monostate,
            "Boolean" => ValueKind::Boolean,
            "Int8" => ValueKind::Int8,
            "UInt8" => ValueKind::UInt8,
            "Int16" => ValueKind::Int16,
            "UInt16" => ValueKind::UInt16,
            "Int32" => ValueKind::Int32,
            "UInt32" => ValueKind::UInt32,
            "Int64" => ValueKind::Int64,
            "UInt64" => ValueKind::UInt64,
            "Float32" => ValueKind::Float32,
            "Float64" => ValueKind::Float64,
            "Complex32" => ValueKind::Complex32,
            "Complex64" => ValueKind::Complex64,
            "String" => ValueKind::String,
            "TimePoint" => ValueKind::TimePoint,
            "I8Vector" => ValueKind::I8Vector,
            "UI8Vector" => ValueKind::UI8Vector,
            "I16Vector" => ValueKind::I16Vector,
            "UI16Vector" => ValueKind::UI16Vector,
            "I32Vector" => ValueKind::I32Vector,
            "UI32Vector" => ValueKind::UI32Vector,
            "I64Vector" => ValueKind::I64Vector,
            "UI64Vector" => ValueKind::UI64Vector,
            "F32Vector" => ValueKind::F32Vector,
            "F64Vector" => ValueKind::F64Vector,
            "C32Vector" => ValueKind::C32Vector,
            "C64Vector" => ValueKind::C64Vector,
            "I8Matrix" => ValueKind::I8Matrix,
            "UI8Matrix" => ValueKind::UI8Matrix,
            "I16Matrix" => ValueKind::I16Matrix,
            "UI16Matrix" => ValueKind::UI16Matrix,
            "I32Matrix" => ValueKind::I32Matrix,
            "UI32Matrix" => ValueKind::UI32Matrix,
            "I64Matrix" => ValueKind::I64Matrix,
            "UI64Matrix" => ValueKind::UI64Matrix,
            "F32Matrix" => ValueKind::F32Matrix,
            "F64Matrix" => ValueKind::F64Matrix,
            "C32Matrix" => ValueKind::C32Matrix,
            "C64Matrix" => ValueKind::C64Matrix,
            _ => return None,
        })
    }

    pub fn is_vector(self) -> bool {
        matches!(
            self,
            ValueKind::I8Vector
                | ValueKind::UI8Vector
                | ValueKind::I16Vector
                | ValueKind::UI16Vector
                | ValueKind::I32Vector
                | ValueKind::UI32Vector
                | ValueKind::I64Vector
                | ValueKind::UI64Vector
                | ValueKind::F32Vector
                | ValueKind::F64Vector
                | ValueKind::C32Vector
                | ValueKind::C64Vector
        )
    }

    pub fn is_matrix(self) -> bool {
        matches!(
            self,
            ValueKind::I8Matrix
                | ValueKind::UI8Matrix
                | ValueKind::I16Matrix
                | ValueKind::UI16Matrix
                | ValueKind::I32Matrix
                | ValueKind::UI32Matrix
                | ValueKind::I64Matrix
                | ValueKind::UI64Matrix
                | ValueKind::F32Matrix
                | ValueKind::F64Matrix
                | ValueKind::C32Matrix
                | ValueKind::C64Matrix
        )
    }

    /// True for kinds carried in the `value` attribute.
    pub fn uses_value_attribute(self) -> bool {
        matches!(
            self,
            ValueKind::Boolean
                | ValueKind::Int8
                | ValueKind::UInt8
                | ValueKind::Int16
                | ValueKind::UInt16
                | ValueKind::Int32
                | ValueKind::UInt32
                | ValueKind::Int64
                | ValueKind::UInt64
                | ValueKind::Float32
                | ValueKind::Float64
                | ValueKind::Complex32
                | ValueKind::Complex64
                | ValueKind::TimePoint
        )
    }

    /// Raw sample width of a vector or matrix element.
    pub fn element_size(self) -> Option<usize> {
        Some(match self {
            ValueKind::I8Vector | ValueKind::UI8Vector | ValueKind::I8Matrix
            | ValueKind::UI8Matrix => 1,
            ValueKind::I16Vector | ValueKind::UI16Vector | ValueKind::I16Matrix
            | ValueKind::UI16Matrix => 2,
            ValueKind::I32Vector | ValueKind::UI32Vector | ValueKind::F32Vector
            | ValueKind::I32Matrix | ValueKind::UI32Matrix | ValueKind::F32Matrix => 4,
            ValueKind::I64Vector | ValueKind::UI64Vector | ValueKind::F64Vector
            | ValueKind::C32Vector | ValueKind::I64Matrix | ValueKind::UI64Matrix
            | ValueKind::F64Matrix | ValueKind::C32Matrix => 8,
            ValueKind::C64Vector | ValueKind::C64Matrix => 16,
            _ => return None,
        })
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Monostate => ValueKind::Monostate,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Int8(_) => ValueKind::Int8,
            Value::UInt8(_) => ValueKind::UInt8,
            Value::Int16(_) => ValueKind::Int16,
            Value::UInt16(_) => ValueKind::UInt16,
            Value::Int32(_) => ValueKind::Int32,
            Value::UInt32(_) => ValueKind::UInt32,
            Value::Int64(_) => ValueKind::Int64,
            Value::UInt64(_) => ValueKind::UInt64,
            Value::Float32(_) => ValueKind::Float32,
            Value::Float64(_) => ValueKind::Float64,
            Value::Complex32(_) => ValueKind::Complex32,
            Value::Complex64(_) => ValueKind::Complex64,
            Value::String(_) => ValueKind::String,
            Value::TimePoint(_) => ValueKind::TimePoint,
            Value::I8Vector(_) => ValueKind::I8Vector,
            Value::UI8Vector(_) => ValueKind::UI8Vector,
            Value::I16Vector(_) => ValueKind::I16Vector,
            Value::UI16Vector(_) => ValueKind::UI16Vector,
            Value::I32Vector(_) => ValueKind::I32Vector,
            Value::UI32Vector(_) => ValueKind::UI32Vector,
            Value::I64Vector(_) => ValueKind::I64Vector,
            Value::UI64Vector(_) => ValueKind::UI64Vector,
            Value::F32Vector(_) => ValueKind::F32Vector,
            Value::F64Vector(_) => ValueKind::F64Vector,
            Value::C32Vector(_) => ValueKind::C32Vector,
            Value::C64Vector(_) => ValueKind::C64Vector,
            Value::I8Matrix(_) => ValueKind::I8Matrix,
            Value::UI8Matrix(_) => ValueKind::UI8Matrix,
            Value::I16Matrix(_) => ValueKind::I16Matrix,
            Value::UI16Matrix(_) => ValueKind::UI16Matrix,
            Value::I32Matrix(_) => ValueKind::I32Matrix,
            Value::UI32Matrix(_) => ValueKind::UI32Matrix,
            Value::I64Matrix(_) => ValueKind::I64Matrix,
            Value::UI64Matrix(_) => ValueKind::UI64Matrix,
            Value::F32Matrix(_) => ValueKind::F32Matrix,
            Value::F64Matrix(_) => ValueKind::F64Matrix,
            Value::C32Matrix(_) => ValueKind::C32Matrix,
            Value::C64Matrix(_) => ValueKind::C64Matrix,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.kind().name()
    }

    /// Parse the attribute text form of a scalar kind.
    pub fn parse_scalar(kind: ValueKind, text: &str) -> Result<Value> {
        let text = text.trim();
        Ok(match kind {
            ValueKind::Monostate => Value::Monostate,
            ValueKind::Boolean => match text {
                "1" | "true" => Value::Boolean(true),
                "0" | "false" => Value::Boolean(false),
                other => {
                    return Err(Error::InvalidValue(format!("bad Boolean text {other:?}")));
                }
            },
            ValueKind::Int8 => Value::Int8(parse_number(text)?),
            ValueKind::UInt8 => Value::UInt8(parse_number(text)?),
            ValueKind::Int16 => Value::Int16(parse_number(text)?),
            ValueKind::UInt16 => Value::UInt16(parse_number(text)?),
            ValueKind::Int32 => Value::Int32(parse_number(text)?),
            ValueKind::UInt32 => Value::UInt32(parse_number(text)?),
            ValueKind::Int64 => Value::Int64(parse_number(text)?),
            ValueKind::UInt64 => Value::UInt64(parse_number(text)?),
            ValueKind::Float32 => Value::Float32(parse_number(text)?),
            ValueKind::Float64 => Value::Float64(parse_number(text)?),
            ValueKind::Complex32 => {
                let (re, im) = complex_parts(text)?;
                Value::Complex32(Complex32 {
                    real: parse_number(re)?,
                    imag: parse_number(im)?,
                })
            }
            ValueKind::Complex64 => {
                let (re, im) = complex_parts(text)?;
                Value::Complex64(Complex64 {
                    real: parse_number(re)?,
                    imag: parse_number(im)?,
                })
            }
            ValueKind::TimePoint => Value::TimePoint(parse_time_point(text)?),
            ValueKind::String => Value::String(text.to_string()),
            other => {
                return Err(Error::InvalidValue(format!(
                    "{} is not a scalar type",
                    other.name()
                )));
            }
        })
    }

    /// Attribute text form for scalar kinds; `None` for strings, vectors
    /// and matrices.
    pub fn format_scalar(&self) -> Option<String> {
        Some(match self {
            Value::Boolean(b) => if *b { "1" } else { "0" }.to_string(),
            Value::Int8(v) => v.to_string(),
            Value::UInt8(v) => v.to_string(),
            Value::Int16(v) => v.to_string(),
            Value::UInt16(v) => v.to_string(),
            Value::Int32(v) => v.to_string(),
            Value::UInt32(v) => v.to_string(),
            Value::Int64(v) => v.to_string(),
            Value::UInt64(v) => v.to_string(),
            Value::Float32(v) => v.to_string(),
            Value::Float64(v) => v.to_string(),
            Value::Complex32(c) => format!("({},{})", c.real, c.imag),
            Value::Complex64(c) => format!("({},{})", c.real, c.imag),
            Value::TimePoint(t) => t.format(TIME_FORMAT).to_string(),
            _ => return None,
        })
    }

    /// Build a vector value from `length` raw little-endian samples.
    pub fn vector_from_le_bytes(kind: ValueKind, length: usize, bytes: &[u8]) -> Result<Value> {
        let elem = kind
            .element_size()
            .filter(|_| kind.is_vector())
            .ok_or_else(|| Error::InvalidValue(format!("{} is not a vector type", kind.name())))?;
        if bytes.len() != length * elem {
            return Err(Error::InvalidValue(format!(
                "{} of length {length} needs {} bytes, got {}",
                kind.name(),
                length * elem,
                bytes.len()
            )));
        }
        Ok(match kind {
            ValueKind::I8Vector => Value::I8Vector(vec_from_le(bytes, i8::from_le_bytes)),
            ValueKind::UI8Vector => Value::UI8Vector(bytes.to_vec()),
            ValueKind::I16Vector => Value::I16Vector(vec_from_le(bytes, i16::from_le_bytes)),
            ValueKind::UI16Vector => Value::UI16Vector(vec_from_le(bytes, u16::from_le_bytes)),
            ValueKind::I32Vector => Value::I32Vector(vec_from_le(bytes, i32::from_le_bytes)),
            ValueKind::UI32Vector => Value::UI32Vector(vec_from_le(bytes, u32::from_le_bytes)),
            ValueKind::I64Vector => Value::I64Vector(vec_from_le(bytes, i64::from_le_bytes)),
            ValueKind::UI64Vector => Value::UI64Vector(vec_from_le(bytes, u64::from_le_bytes)),
            ValueKind::F32Vector => Value::F32Vector(vec_from_le(bytes, f32::from_le_bytes)),
            ValueKind::F64Vector => Value::F64Vector(vec_from_le(bytes, f64::from_le_bytes)),
            ValueKind::C32Vector => Value::C32Vector(vec_from_le(bytes, c32_from_le)),
            ValueKind::C64Vector => Value::C64Vector(vec_from_le(bytes, c64_from_le)),
            _ => unreachable!("checked above"),
        })
    }

    /// Build a row-major matrix value from raw little-endian samples.
    pub fn matrix_from_le_bytes(
        kind: ValueKind,
        rows: usize,
        cols: usize,
        bytes: &[u8],
    ) -> Result<Value> {
        let elem = kind
            .element_size()
            .filter(|_| kind.is_matrix())
            .ok_or_else(|| Error::InvalidValue(format!("{} is not a matrix type", kind.name())))?;
        if bytes.len() != rows * cols * elem {
            return Err(Error::OutOfBounds(format!(
                "{} of {rows}x{cols} needs {} bytes, got {}",
                kind.name(),
                rows * cols * elem,
                bytes.len()
            )));
        }
        Ok(match kind {
            ValueKind::I8Matrix => {
                Value::I8Matrix(Matrix::from_vec(rows, cols, vec_from_le(bytes, i8::from_le_bytes))?)
            }
            ValueKind::UI8Matrix => {
                Value::UI8Matrix(Matrix::from_vec(rows, cols, bytes.to_vec())?)
            }
            ValueKind::I16Matrix => Value::I16Matrix(Matrix::from_vec(
                rows,
                cols,
                vec_from_le(bytes, i16::from_le_bytes),
            )?),
            ValueKind::UI16Matrix => Value::UI16Matrix(Matrix::from_vec(
                rows,
                cols,
                vec_from_le(bytes, u16::from_le_bytes),
            )?),
            ValueKind::I32Matrix => Value::I32Matrix(Matrix::from_vec(
                rows,
                cols,
                vec_from_le(bytes, i32::from_le_bytes),
            )?),
            ValueKind::UI32Matrix => Value::UI32Matrix(Matrix::from_vec(
                rows,
                cols,
                vec_from_le(bytes, u32::from_le_bytes),
            )?),
            ValueKind::I64Matrix => Value::I64Matrix(Matrix::from_vec(
                rows,
                cols,
                vec_from_le(bytes, i64::from_le_bytes),
            )?),
            ValueKind::UI64Matrix => Value::UI64Matrix(Matrix::from_vec(
                rows,
                cols,
                vec_from_le(bytes, u64::from_le_bytes),
            )?),
            ValueKind::F32Matrix => Value::F32Matrix(Matrix::from_vec(
                rows,
                cols,
                vec_from_le(bytes, f32::from_le_bytes),
            )?),
            ValueKind::F64Matrix => Value::F64Matrix(Matrix::from_vec(
                rows,
                cols,
                vec_from_le(bytes, f64::from_le_bytes),
            )?),
            ValueKind::C32Matrix => {
                Value::C32Matrix(Matrix::from_vec(rows, cols, vec_from_le(bytes, c32_from_le))?)
            }
            ValueKind::C64Matrix => {
                Value::C64Matrix(Matrix::from_vec(rows, cols, vec_from_le(bytes, c64_from_le))?)
            }
            _ => unreachable!("checked above"),
        })
    }

    /// Element count of a vector value.
    pub fn vector_len(&self) -> Option<usize> {
        Some(match self {
            Value::I8Vector(v) => v.len(),
            Value::UI8Vector(v) => v.len(),
            Value::I16Vector(v) => v.len(),
            Value::UI16Vector(v) => v.len(),
            Value::I32Vector(v) => v.len(),
            Value::UI32Vector(v) => v.len(),
            Value::I64Vector(v) => v.len(),
            Value::UI64Vector(v) => v.len(),
            Value::F32Vector(v) => v.len(),
            Value::F64Vector(v) => v.len(),
            Value::C32Vector(v) => v.len(),
            Value::C64Vector(v) => v.len(),
            _ => return None,
        })
    }

    /// `(rows, cols)` of a matrix value.
    pub fn matrix_dims(&self) -> Option<(usize, usize)> {
        Some(match self {
            Value::I8Matrix(m) => (m.rows(), m.cols()),
            Value::UI8Matrix(m) => (m.rows(), m.cols()),
            Value::I16Matrix(m) => (m.rows(), m.cols()),
            Value::UI16Matrix(m) => (m.rows(), m.cols()),
            Value::I32Matrix(m) => (m.rows(), m.cols()),
            Value::UI32Matrix(m) => (m.rows(), m.cols()),
            Value::I64Matrix(m) => (m.rows(), m.cols()),
            Value::UI64Matrix(m) => (m.rows(), m.cols()),
            Value::F32Matrix(m) => (m.rows(), m.cols()),
            Value::F64Matrix(m) => (m.rows(), m.cols()),
            Value::C32Matrix(m) => (m.rows(), m.cols()),
            Value::C64Matrix(m) => (m.rows(), m.cols()),
            _ => return None,
        })
    }

    /// Raw little-endian sample bytes of a vector or matrix value.
    pub fn block_bytes(&self) -> Option<Vec<u8>> {
        Some(match self {
            Value::I8Vector(v) => vec_to_le(v, i8::to_le_bytes),
            Value::UI8Vector(v) => v.clone(),
            Value::I16Vector(v) => vec_to_le(v, i16::to_le_bytes),
            Value::UI16Vector(v) => vec_to_le(v, u16::to_le_bytes),
            Value::I32Vector(v) => vec_to_le(v, i32::to_le_bytes),
            Value::UI32Vector(v) => vec_to_le(v, u32::to_le_bytes),
            Value::I64Vector(v) => vec_to_le(v, i64::to_le_bytes),
            Value::UI64Vector(v) => vec_to_le(v, u64::to_le_bytes),
            Value::F32Vector(v) => vec_to_le(v, f32::to_le_bytes),
            Value::F64Vector(v) => vec_to_le(v, f64::to_le_bytes),
            Value::C32Vector(v) => vec_to_le(v, c32_to_le),
            Value::C64Vector(v) => vec_to_le(v, c64_to_le),
            Value::I8Matrix(m) => vec_to_le(m.as_slice(), i8::to_le_bytes),
            Value::UI8Matrix(m) => m.as_slice().to_vec(),
            Value::I16Matrix(m) => vec_to_le(m.as_slice(), i16::to_le_bytes),
            Value::UI16Matrix(m) => vec_to_le(m.as_slice(), u16::to_le_bytes),
            Value::I32Matrix(m) => vec_to_le(m.as_slice(), i32::to_le_bytes),
            Value::UI32Matrix(m) => vec_to_le(m.as_slice(), u32::to_le_bytes),
            Value::I64Matrix(m) => vec_to_le(m.as_slice(), i64::to_le_bytes),
            Value::UI64Matrix(m) => vec_to_le(m.as_slice(), u64::to_le_bytes),
            Value::F32Matrix(m) => vec_to_le(m.as_slice(), f32::to_le_bytes),
            Value::F64Matrix(m) => vec_to_le(m.as_slice(), f64::to_le_bytes),
            Value::C32Matrix(m) => vec_to_le(m.as_slice(), c32_to_le),
            Value::C64Matrix(m) => vec_to_le(m.as_slice(), c64_to_le),
            _ => return None,
        })
    }
}

pub(crate) fn parse_time_point(text: &str) -> Result<TimePoint> {
    NaiveDateTime::parse_from_str(text, TIME_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| Error::InvalidValue(format!("bad TimePoint {text:?}: {e}")))
}

fn parse_number<T: std::str::FromStr>(text: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    text.parse::<T>()
        .map_err(|e| Error::InvalidValue(format!("bad numeric text {text:?}: {e}")))
}

fn complex_parts(text: &str) -> Result<(&str, &str)> {
    text.strip_prefix('(')
        .and_then(|t| t.strip_suffix(')'))
        .and_then(|t| t.split_once(','))
        .map(|(re, im)| (re.trim(), im.trim()))
        .ok_or_else(|| Error::InvalidValue(format!("bad complex text {text:?}")))
}

#[inline]
fn vec_from_le<T, const N: usize>(bytes: &[u8], from: fn([u8; N]) -> T) -> Vec<T> {
    bytes
        .chunks_exact(N)
        .map(|c| from(c.try_into().unwrap()))
        .collect()
}

#[inline]
fn vec_to_le<T: Copy, const N: usize>(values: &[T], to: fn(T) -> [u8; N]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * N);
    for &v in values {
        out.extend_from_slice(&to(v));
    }
    out
}

fn c32_from_le(b: [u8; 8]) -> Complex32 {
    Complex32 {
        real: f32::from_le_bytes(b[0..4].try_into().unwrap()),
        imag: f32::from_le_bytes(b[4..8].try_into().unwrap()),
    }
}

fn c64_from_le(b: [u8; 16]) -> Complex64 {
    Complex64 {
        real: f64::from_le_bytes(b[0..8].try_into().unwrap()),
        imag: f64::from_le_bytes(b[8..16].try_into().unwrap()),
    }
}

fn c32_to_le(c: Complex32) -> [u8; 8] {
    let mut b = [0u8; 8];
    b[0..4].copy_from_slice(&c.real.to_le_bytes());
    b[4..8].copy_from_slice(&c.imag.to_le_bytes());
    b
}

fn c64_to_le(c: Complex64) -> [u8; 16] {
    let mut b = [0u8; 16];
    b[0..8].copy_from_slice(&c.real.to_le_bytes());
    b[8..16].copy_from_slice(&c.imag.to_le_bytes());
    b
}
