use std::fmt;

use crate::ast::BinaryOp;

/// Scalar kinds, including the `void` and `null` sentinels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Boolean,
    Char,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Void,
    Null,
}

impl PrimitiveKind {
    pub fn from_type_name(name: &str) -> Option<Self> {
        let kind = match name {
            "boolean" => PrimitiveKind::Boolean,
            "char" => PrimitiveKind::Char,
            "byte" => PrimitiveKind::Byte,
            "short" => PrimitiveKind::Short,
            "int" => PrimitiveKind::Int,
            "long" => PrimitiveKind::Long,
            "float" => PrimitiveKind::Float,
            "double" => PrimitiveKind::Double,
            "void" => PrimitiveKind::Void,
            _ => return None,
        };
        Some(kind)
    }

    pub fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Char => "char",
            PrimitiveKind::Byte => "byte",
            PrimitiveKind::Short => "short",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
            PrimitiveKind::Void => "void",
            PrimitiveKind::Null => "null",
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            PrimitiveKind::Char
                | PrimitiveKind::Byte
                | PrimitiveKind::Short
                | PrimitiveKind::Int
                | PrimitiveKind::Long
                | PrimitiveKind::Float
                | PrimitiveKind::Double
        )
    }

    pub fn is_integral(self) -> bool {
        self.is_numeric() && !matches!(self, PrimitiveKind::Float | PrimitiveKind::Double)
    }

    /// Widening primitive conversion; identity counts as widening.
    pub fn can_widen_to(self, target: PrimitiveKind) -> bool {
        use PrimitiveKind::*;
        if self == target {
            return true;
        }
        match self {
            Byte => matches!(target, Short | Int | Long | Float | Double),
            Short | Char => matches!(target, Int | Long | Float | Double),
            Int => matches!(target, Long | Float | Double),
            Long => matches!(target, Float | Double),
            Float => target == Double,
            _ => false,
        }
    }

    fn rank(self) -> u8 {
        match self {
            PrimitiveKind::Double => 4,
            PrimitiveKind::Float => 3,
            PrimitiveKind::Long => 2,
            _ => 1,
        }
    }

    /// Binary numeric promotion of two operand kinds.
    fn promote(self, other: PrimitiveKind) -> PrimitiveKind {
        match self.rank().max(other.rank()) {
            4 => PrimitiveKind::Double,
            3 => PrimitiveKind::Float,
            2 => PrimitiveKind::Long,
            _ => PrimitiveKind::Int,
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A boxed scalar or one of the `VOID` / `NULL` sentinels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Primitive {
    Bool(bool),
    Char(char),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Void,
    Null,
}

impl Primitive {
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Primitive::Bool(_) => PrimitiveKind::Boolean,
            Primitive::Char(_) => PrimitiveKind::Char,
            Primitive::Byte(_) => PrimitiveKind::Byte,
            Primitive::Short(_) => PrimitiveKind::Short,
            Primitive::Int(_) => PrimitiveKind::Int,
            Primitive::Long(_) => PrimitiveKind::Long,
            Primitive::Float(_) => PrimitiveKind::Float,
            Primitive::Double(_) => PrimitiveKind::Double,
            Primitive::Void => PrimitiveKind::Void,
            Primitive::Null => PrimitiveKind::Null,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Primitive::Null)
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Primitive::Void)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Primitive::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integral view of an integral or `char` value.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Primitive::Char(c) => Some(c as i64),
            Primitive::Byte(n) => Some(n as i64),
            Primitive::Short(n) => Some(n as i64),
            Primitive::Int(n) => Some(n as i64),
            Primitive::Long(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Primitive::Float(n) => Some(n as f64),
            Primitive::Double(n) => Some(n),
            _ => self.as_i64().map(|n| n as f64),
        }
    }

    /// Applies a widening conversion, or `None` when `target` is not wider.
    pub fn widen_to(self, target: PrimitiveKind) -> Option<Primitive> {
        if !self.kind().can_widen_to(target) {
            return None;
        }
        self.convert(target)
    }

    /// Casting conversion: any numeric kind to any other, identity otherwise.
    pub fn cast_to(self, target: PrimitiveKind) -> Result<Primitive, String> {
        let kind = self.kind();
        if kind == target {
            return Ok(self);
        }
        if kind.is_numeric() && target.is_numeric() {
            if let Some(converted) = self.convert(target) {
                return Ok(converted);
            }
        }
        Err(format!("cannot cast {kind} to {target}"))
    }

    /// Assignment conversion: widening, or narrowing of an integral value
    /// that fits into `byte`, `short` or `char`.
    pub fn assign_to(self, target: PrimitiveKind) -> Result<Primitive, String> {
        if let Some(widened) = self.widen_to(target) {
            return Ok(widened);
        }
        let kind = self.kind();
        if matches!(
            kind,
            PrimitiveKind::Int | PrimitiveKind::Short | PrimitiveKind::Char | PrimitiveKind::Byte
        ) {
            if let Some(n) = self.as_i64() {
                let fits = match target {
                    PrimitiveKind::Byte => i8::try_from(n).is_ok(),
                    PrimitiveKind::Short => i16::try_from(n).is_ok(),
                    PrimitiveKind::Char => u16::try_from(n).is_ok(),
                    _ => false,
                };
                if fits {
                    if let Some(converted) = self.convert(target) {
                        return Ok(converted);
                    }
                }
            }
        }
        Err(format!("cannot assign {kind} value {self} to {target}"))
    }

    fn convert(self, target: PrimitiveKind) -> Option<Primitive> {
        if self.kind() == target {
            return Some(self);
        }
        let converted = if matches!(self, Primitive::Float(_) | Primitive::Double(_)) {
            let n = self.as_f64()?;
            match target {
                PrimitiveKind::Char => Primitive::Char(char_from(n as i64)),
                PrimitiveKind::Byte => Primitive::Byte(n as i64 as i8),
                PrimitiveKind::Short => Primitive::Short(n as i64 as i16),
                PrimitiveKind::Int => Primitive::Int(n as i32),
                PrimitiveKind::Long => Primitive::Long(n as i64),
                PrimitiveKind::Float => Primitive::Float(n as f32),
                PrimitiveKind::Double => Primitive::Double(n),
                _ => return None,
            }
        } else {
            let n = self.as_i64()?;
            match target {
                PrimitiveKind::Char => Primitive::Char(char_from(n)),
                PrimitiveKind::Byte => Primitive::Byte(n as i8),
                PrimitiveKind::Short => Primitive::Short(n as i16),
                PrimitiveKind::Int => Primitive::Int(n as i32),
                PrimitiveKind::Long => Primitive::Long(n),
                PrimitiveKind::Float => Primitive::Float(n as f32),
                PrimitiveKind::Double => Primitive::Double(n as f64),
                _ => return None,
            }
        };
        Some(converted)
    }

    /// Applies a binary operator with numeric promotion. `&&` and `||`
    /// arrive here only when both sides were already evaluated.
    pub fn binary(self, op: BinaryOp, rhs: Primitive) -> Result<Primitive, String> {
        if let (Primitive::Bool(a), Primitive::Bool(b)) = (self, rhs) {
            let value = match op {
                BinaryOp::Equal => a == b,
                BinaryOp::NotEqual => a != b,
                BinaryOp::And | BinaryOp::BitAnd => a & b,
                BinaryOp::Or | BinaryOp::BitOr => a | b,
                BinaryOp::BitXor => a ^ b,
                _ => return Err(operand_error(op, self, rhs)),
            };
            return Ok(Primitive::Bool(value));
        }
        let (lk, rk) = (self.kind(), rhs.kind());
        if !lk.is_numeric() || !rk.is_numeric() {
            return match op {
                BinaryOp::Equal => Ok(Primitive::Bool(self == rhs)),
                BinaryOp::NotEqual => Ok(Primitive::Bool(self != rhs)),
                _ => Err(operand_error(op, self, rhs)),
            };
        }
        let promoted = lk.promote(rk);
        let (a, b) = match (self.convert(promoted), rhs.convert(promoted)) {
            (Some(a), Some(b)) => (a, b),
            _ => return Err(operand_error(op, self, rhs)),
        };
        match op {
            BinaryOp::Equal
            | BinaryOp::NotEqual
            | BinaryOp::Less
            | BinaryOp::LessEqual
            | BinaryOp::Greater
            | BinaryOp::GreaterEqual => Ok(Primitive::Bool(compare(op, a, b))),
            BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor => match (a, b) {
                (Primitive::Int(x), Primitive::Int(y)) => Ok(Primitive::Int(bitwise(op, x as i64, y as i64) as i32)),
                (Primitive::Long(x), Primitive::Long(y)) => Ok(Primitive::Long(bitwise(op, x, y))),
                _ => Err(operand_error(op, self, rhs)),
            },
            BinaryOp::And | BinaryOp::Or => Err(operand_error(op, self, rhs)),
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                arithmetic(op, a, b)
            }
        }
    }

    pub fn negate(self) -> Result<Primitive, String> {
        let promoted = match self.kind() {
            kind if kind.is_numeric() => kind.promote(PrimitiveKind::Int),
            kind => return Err(format!("bad operand type {kind} for unary `-`")),
        };
        match self.convert(promoted) {
            Some(Primitive::Int(n)) => Ok(Primitive::Int(n.wrapping_neg())),
            Some(Primitive::Long(n)) => Ok(Primitive::Long(n.wrapping_neg())),
            Some(Primitive::Float(n)) => Ok(Primitive::Float(-n)),
            Some(Primitive::Double(n)) => Ok(Primitive::Double(-n)),
            _ => Err(format!("bad operand type {} for unary `-`", self.kind())),
        }
    }

    pub fn unary_plus(self) -> Result<Primitive, String> {
        let kind = self.kind();
        if !kind.is_numeric() {
            return Err(format!("bad operand type {kind} for unary `+`"));
        }
        self.convert(kind.promote(PrimitiveKind::Int))
            .ok_or_else(|| format!("bad operand type {kind} for unary `+`"))
    }

    pub fn not(self) -> Result<Primitive, String> {
        match self {
            Primitive::Bool(b) => Ok(Primitive::Bool(!b)),
            other => Err(format!("bad operand type {} for `!`", other.kind())),
        }
    }

    /// `value + 1` or `value - 1` kept in the operand's own kind, as `++`/`--` do.
    pub fn step(self, delta: i32) -> Result<Primitive, String> {
        let kind = self.kind();
        let stepped = self.binary(BinaryOp::Add, Primitive::Int(delta))?;
        stepped
            .cast_to(kind)
            .map_err(|_| format!("bad operand type {kind} for increment"))
    }
}

fn char_from(n: i64) -> char {
    char::from_u32(n as u16 as u32).unwrap_or('\u{FFFD}')
}

fn operand_error(op: BinaryOp, lhs: Primitive, rhs: Primitive) -> String {
    format!(
        "bad operand types for `{}`: {} and {}",
        op.symbol(),
        lhs.kind(),
        rhs.kind()
    )
}

fn compare(op: BinaryOp, a: Primitive, b: Primitive) -> bool {
    let ordering = match (a, b) {
        (Primitive::Int(x), Primitive::Int(y)) => x.partial_cmp(&y),
        (Primitive::Long(x), Primitive::Long(y)) => x.partial_cmp(&y),
        (Primitive::Float(x), Primitive::Float(y)) => x.partial_cmp(&y),
        (Primitive::Double(x), Primitive::Double(y)) => x.partial_cmp(&y),
        _ => None,
    };
    use std::cmp::Ordering::*;
    match (op, ordering) {
        (BinaryOp::NotEqual, None) => true,
        (_, None) => false,
        (BinaryOp::Equal, Some(o)) => o == Equal,
        (BinaryOp::NotEqual, Some(o)) => o != Equal,
        (BinaryOp::Less, Some(o)) => o == Less,
        (BinaryOp::LessEqual, Some(o)) => o != Greater,
        (BinaryOp::Greater, Some(o)) => o == Greater,
        (BinaryOp::GreaterEqual, Some(o)) => o != Less,
        _ => false,
    }
}

fn bitwise(op: BinaryOp, x: i64, y: i64) -> i64 {
    match op {
        BinaryOp::BitAnd => x & y,
        BinaryOp::BitOr => x | y,
        _ => x ^ y,
    }
}

fn arithmetic(op: BinaryOp, a: Primitive, b: Primitive) -> Result<Primitive, String> {
    const DIV_ZERO: &str = "/ by zero";
    let value = match (a, b) {
        (Primitive::Int(x), Primitive::Int(y)) => Primitive::Int(match op {
            BinaryOp::Add => x.wrapping_add(y),
            BinaryOp::Sub => x.wrapping_sub(y),
            BinaryOp::Mul => x.wrapping_mul(y),
            BinaryOp::Div if y == 0 => return Err(DIV_ZERO.into()),
            BinaryOp::Div => x.wrapping_div(y),
            BinaryOp::Mod if y == 0 => return Err(DIV_ZERO.into()),
            _ => x.wrapping_rem(y),
        }),
        (Primitive::Long(x), Primitive::Long(y)) => Primitive::Long(match op {
            BinaryOp::Add => x.wrapping_add(y),
            BinaryOp::Sub => x.wrapping_sub(y),
            BinaryOp::Mul => x.wrapping_mul(y),
            BinaryOp::Div if y == 0 => return Err(DIV_ZERO.into()),
            BinaryOp::Div => x.wrapping_div(y),
            BinaryOp::Mod if y == 0 => return Err(DIV_ZERO.into()),
            _ => x.wrapping_rem(y),
        }),
        (Primitive::Float(x), Primitive::Float(y)) => Primitive::Float(match op {
            BinaryOp::Add => x + y,
            BinaryOp::Sub => x - y,
            BinaryOp::Mul => x * y,
            BinaryOp::Div => x / y,
            _ => x % y,
        }),
        (Primitive::Double(x), Primitive::Double(y)) => Primitive::Double(match op {
            BinaryOp::Add => x + y,
            BinaryOp::Sub => x - y,
            BinaryOp::Mul => x * y,
            BinaryOp::Div => x / y,
            _ => x % y,
        }),
        _ => return Err(operand_error(op, a, b)),
    };
    Ok(value)
}

fn write_floating(f: &mut fmt::Formatter<'_>, n: f64) -> fmt::Result {
    if n.is_nan() {
        f.write_str("NaN")
    } else if n.is_infinite() {
        f.write_str(if n > 0.0 { "Infinity" } else { "-Infinity" })
    } else if n.fract() == 0.0 && n.abs() < 1e7 {
        write!(f, "{n:.1}")
    } else {
        write!(f, "{n}")
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Primitive::Bool(b) => write!(f, "{b}"),
            Primitive::Char(c) => write!(f, "{c}"),
            Primitive::Byte(n) => write!(f, "{n}"),
            Primitive::Short(n) => write!(f, "{n}"),
            Primitive::Int(n) => write!(f, "{n}"),
            Primitive::Long(n) => write!(f, "{n}"),
            Primitive::Float(n) => write_floating(f, *n as f64),
            Primitive::Double(n) => write_floating(f, *n),
            Primitive::Void => f.write_str("void"),
            Primitive::Null => f.write_str("null"),
        }
    }
}
