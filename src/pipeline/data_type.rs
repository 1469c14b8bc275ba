//! Runtime-typed value boxes and the casting rules between them.
//!
//! Every port owns one [`DataType`]. Its [`TypeKind`] decides which raw
//! [`Value`]s it accepts and how they are normalised; the box guarantees its
//! stored value is always something `cast` produced.

use crate::pipeline::error::CastError;
use crate::pipeline::value::{ImageHandle, Value};
use std::fmt;

/// An sRGB colour used for plugs, wires and labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Colour {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Colour {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// `#RRGGBB`
    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Colour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Closed set of port types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// Decimal numbers (`f64`).
    Number,
    /// Decoded still images. `null` means "no image".
    Image,
    /// Pass-through type that mirrors whatever concrete type flows into it.
    Any,
    /// Accept-anything placeholder for values whose type is not known.
    Unknown,
}

impl TypeKind {
    const NUMBER_COLOUR: Colour = Colour::rgb(0x03, 0xA9, 0xF4);
    const IMAGE_COLOUR: Colour = Colour::rgb(0xE9, 0x1E, 0x63);
    const WILDCARD_COLOUR: Colour = Colour::rgb(0xFF, 0xC1, 0x07);

    /// Convert `raw` into this type's representation.
    ///
    /// Deterministic and side-effect free.
    pub fn cast(self, raw: &Value) -> Result<Value, CastError> {
        match self {
            TypeKind::Number => cast_number(raw),
            TypeKind::Image => cast_image(raw),
            TypeKind::Any | TypeKind::Unknown => Ok(raw.clone()),
        }
    }

    pub fn default_value(self) -> Value {
        match self {
            TypeKind::Number => Value::Number(0.0),
            TypeKind::Image | TypeKind::Any | TypeKind::Unknown => Value::Null,
        }
    }

    /// Name shown to the user.
    pub fn name(self) -> &'static str {
        match self {
            TypeKind::Number => "Number",
            TypeKind::Image => "Image",
            TypeKind::Any | TypeKind::Unknown => "Anything",
        }
    }

    pub fn colour(self) -> Colour {
        match self {
            TypeKind::Number => Self::NUMBER_COLOUR,
            TypeKind::Image => Self::IMAGE_COLOUR,
            TypeKind::Any | TypeKind::Unknown => Self::WILDCARD_COLOUR,
        }
    }

    pub fn all() -> &'static [TypeKind] {
        &[
            TypeKind::Number,
            TypeKind::Image,
            TypeKind::Any,
            TypeKind::Unknown,
        ]
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

fn cast_number(raw: &Value) -> Result<Value, CastError> {
    let n = match raw {
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Null => return Ok(TypeKind::Number.default_value()),
        Value::Text(s) if s.is_empty() => return Ok(TypeKind::Number.default_value()),
        Value::Text(s) => {
            parse_float_prefix(s).ok_or_else(|| CastError::new(TypeKind::Number, raw))?
        }
        Value::Number(n) if n.is_nan() => return Err(CastError::new(TypeKind::Number, raw)),
        Value::Number(n) => *n,
        Value::Image(_) => return Err(CastError::new(TypeKind::Number, raw)),
    };
    Ok(Value::Number(n))
}

fn cast_image(raw: &Value) -> Result<Value, CastError> {
    match raw {
        Value::Null => Ok(Value::Null),
        // A pending or zero-height image degrades to "no image".
        Value::Image(handle) if !handle.is_complete() => Ok(Value::Null),
        Value::Image(handle @ ImageHandle::Loaded(_)) => Ok(Value::Image(handle.clone())),
        _ => Err(CastError::new(TypeKind::Image, raw)),
    }
}

/// Parse the longest leading decimal literal of `text`, ignoring leading
/// whitespace and any trailing garbage (`"12px"` is 12).
fn parse_float_prefix(text: &str) -> Option<f64> {
    let s = text.trim_start();
    let bytes = s.as_bytes();
    let len = bytes.len();
    let mut end = 0;

    let negative = bytes.first() == Some(&b'-');
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }
    if s[end..].starts_with("Infinity") {
        return Some(if negative {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        });
    }

    let int_start = end;
    while end < len && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut mantissa_digits = end - int_start;

    if end < len && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < len && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        mantissa_digits += frac_end - frac_start;
        if mantissa_digits > 0 {
            end = frac_end;
        }
    }
    if mantissa_digits == 0 {
        return None;
    }

    if end < len && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < len && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let exp_digits = exp_end;
        while exp_end < len && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().ok()
}

/// A typed value box: one per port.
///
/// Invariant: `value` is always a value returned by `kind.cast`, or the
/// kind's default.
#[derive(Debug, Clone, PartialEq)]
pub struct DataType {
    kind: TypeKind,
    /// Concrete type last assigned into an `Any` box.
    carried: TypeKind,
    value: Value,
}

impl DataType {
    pub fn new(kind: TypeKind) -> Self {
        Self {
            kind,
            carried: TypeKind::Unknown,
            value: kind.default_value(),
        }
    }

    /// Create a box holding `initial`, or the default when `initial` is null.
    pub fn with_value(kind: TypeKind, initial: Value) -> Result<Self, CastError> {
        let mut ty = Self::new(kind);
        if !initial.is_null() {
            ty.value = kind.cast(&initial)?;
        }
        Ok(ty)
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    /// The concrete type of the stored value: the carried type for `Any`,
    /// the declared kind otherwise.
    pub fn resolved_kind(&self) -> TypeKind {
        match self.kind {
            TypeKind::Any => self.carried,
            kind => kind,
        }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn cast(&self, raw: &Value) -> Result<Value, CastError> {
        self.kind.cast(raw)
    }

    pub fn default_value(&self) -> Value {
        self.kind.default_value()
    }

    /// Would `self.cast(other.value())` succeed?
    pub fn can_cast(&self, other: &DataType) -> bool {
        self.cast(other.value()).is_ok()
    }

    /// Cast and store `raw`. `origin` is the type the value came from.
    ///
    /// Atomic: on a cast failure the previous value is kept untouched.
    pub fn set_value(&mut self, raw: Value, origin: TypeKind) -> Result<(), CastError> {
        let value = self.kind.cast(&raw)?;
        self.value = value;
        if self.kind == TypeKind::Any {
            self.carried = origin;
        }
        Ok(())
    }

    /// Restore the default value and forget any carried type.
    pub fn reset(&mut self) {
        self.value = self.kind.default_value();
        self.carried = TypeKind::Unknown;
    }

    /// Label shown to the user. `Any` delegates to its carried type.
    pub fn name(&self) -> &'static str {
        self.resolved_kind().name()
    }

    /// Colour used for labels and previews. `Any` delegates to its carried type.
    pub fn display_colour(&self) -> Colour {
        self.resolved_kind().colour()
    }

    /// Colour used for wires and plugs, which never changes with the value.
    pub fn wire_colour(&self) -> Colour {
        self.kind.colour()
    }
}
