//! AST node types for the selection language.

use std::fmt;

use crate::selection::keywords;

/// Top-level expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    /// `all` / `none`
    Bool(bool),
    Compare {
        op: CmpOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `property(slot) == "value"` (or `!=`)
    StringTest {
        property: Accessor,
        value: String,
        equals: bool,
    },
    Number(f64),
    Str(String),
    Binary {
        op: ArithOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Neg(Box<Expr>),
    Property(Accessor),
    Function { name: String, args: Vec<usize> },
}

/// A property read on one atom of the match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accessor {
    pub name: String,
    /// 1-based position in the match
    pub slot: usize,
}

impl Accessor {
    pub fn new(name: impl Into<String>, slot: usize) -> Self {
        Self {
            name: name.into(),
            slot,
        }
    }
}

/// What an expression produces, as far as the parser can tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Kind {
    Boolean,
    Value,
    /// Custom properties can hold either
    Unknown,
}

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
    Ne,
}

impl CmpOp {
    pub fn compare(&self, lhs: f64, rhs: f64) -> bool {
        match self {
            CmpOp::Gt => lhs > rhs,
            CmpOp::Lt => lhs < rhs,
            CmpOp::Ge => lhs >= rhs,
            CmpOp::Le => lhs <= rhs,
            CmpOp::Eq => lhs == rhs,
            CmpOp::Ne => lhs != rhs,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            CmpOp::Gt => ">",
            CmpOp::Lt => "<",
            CmpOp::Ge => ">=",
            CmpOp::Le => "<=",
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
        }
    }
}

/// Arithmetic operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl ArithOp {
    /// IEEE semantics: division by zero gives an infinity or NaN.
    pub fn apply(&self, lhs: f64, rhs: f64) -> f64 {
        match self {
            ArithOp::Add => lhs + rhs,
            ArithOp::Sub => lhs - rhs,
            ArithOp::Mul => lhs * rhs,
            ArithOp::Div => lhs / rhs,
            ArithOp::Pow => lhs.powf(rhs),
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
            ArithOp::Pow => "^",
        }
    }
}

impl Expr {
    pub(crate) fn kind(&self) -> Kind {
        match self {
            Expr::And(..)
            | Expr::Or(..)
            | Expr::Not(_)
            | Expr::Bool(_)
            | Expr::Compare { .. }
            | Expr::StringTest { .. } => Kind::Boolean,
            Expr::Number(_) | Expr::Str(_) | Expr::Binary { .. } | Expr::Neg(_) => Kind::Value,
            Expr::Property(accessor) => {
                if keywords::is_builtin_property(&accessor.name) {
                    Kind::Value
                } else {
                    Kind::Unknown
                }
            }
            Expr::Function { name, .. } => {
                if keywords::is_boolean_function(name) {
                    Kind::Boolean
                } else {
                    Kind::Value
                }
            }
        }
    }

    /// Does any accessor in the tree read a velocity component?
    pub(crate) fn reads_velocities(&self) -> bool {
        match self {
            Expr::And(a, b) | Expr::Or(a, b) => a.reads_velocities() || b.reads_velocities(),
            Expr::Compare { lhs, rhs, .. } | Expr::Binary { lhs, rhs, .. } => {
                lhs.reads_velocities() || rhs.reads_velocities()
            }
            Expr::Not(inner) | Expr::Neg(inner) => inner.reads_velocities(),
            Expr::StringTest { property, .. } | Expr::Property(property) => {
                matches!(property.name.as_str(), "vx" | "vy" | "vz")
            }
            Expr::Bool(_) | Expr::Number(_) | Expr::Str(_) | Expr::Function { .. } => false,
        }
    }

    /// Largest 1-based slot referenced anywhere in the tree, 0 if none.
    pub fn max_slot(&self) -> usize {
        match self {
            Expr::And(a, b) | Expr::Or(a, b) => a.max_slot().max(b.max_slot()),
            Expr::Compare { lhs, rhs, .. } | Expr::Binary { lhs, rhs, .. } => {
                lhs.max_slot().max(rhs.max_slot())
            }
            Expr::Not(inner) | Expr::Neg(inner) => inner.max_slot(),
            Expr::StringTest { property, .. } | Expr::Property(property) => property.slot,
            Expr::Function { args, .. } => args.iter().copied().max().unwrap_or(0),
            Expr::Bool(_) | Expr::Number(_) | Expr::Str(_) => 0,
        }
    }
}

impl fmt::Display for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.slot)
    }
}

/// Prints a fully parenthesized form that parses back to the same tree.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::And(a, b) => write!(f, "({} and {})", a, b),
            Expr::Or(a, b) => write!(f, "({} or {})", a, b),
            Expr::Not(inner) => write!(f, "not {}", inner),
            Expr::Bool(true) => f.write_str(keywords::ALL),
            Expr::Bool(false) => f.write_str(keywords::NONE),
            Expr::Compare { op, lhs, rhs } => write!(f, "{} {} {}", lhs, op.symbol(), rhs),
            Expr::StringTest {
                property,
                value,
                equals,
            } => {
                let op = if *equals { CmpOp::Eq } else { CmpOp::Ne };
                write!(f, "{} {} \"{}\"", property, op.symbol(), value)
            }
            Expr::Number(value) => write!(f, "{}", value),
            Expr::Str(value) => write!(f, "\"{}\"", value),
            Expr::Binary { op, lhs, rhs } => write!(f, "({} {} {})", lhs, op.symbol(), rhs),
            Expr::Neg(inner) => write!(f, "-({})", inner),
            Expr::Property(accessor) => write!(f, "{}", accessor),
            Expr::Function { name, args } => {
                write!(f, "{}(", name)?;
                for (i, slot) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", slot)?;
                }
                f.write_str(")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn distance() -> Expr {
        Expr::Function {
            name: "distance".into(),
            args: vec![1, 3],
        }
    }

    #[test]
    fn test_cmp_op_ieee() {
        assert!(!CmpOp::Eq.compare(1e-10, 0.0));
        assert!(CmpOp::Ne.compare(1.0, 1.0 + 1e-12));
        assert!(CmpOp::Eq.compare(f64::INFINITY, f64::INFINITY));
        assert!(CmpOp::Le.compare(2.0, 2.0));
        // NaN fails every test except !=
        for op in [CmpOp::Gt, CmpOp::Lt, CmpOp::Ge, CmpOp::Le, CmpOp::Eq] {
            assert!(!op.compare(f64::NAN, 0.0));
        }
        assert!(CmpOp::Ne.compare(f64::NAN, 0.0));
        assert!(CmpOp::Ne.compare(f64::NAN, f64::NAN));
    }

    #[test]
    fn test_arith_ieee() {
        assert_eq!(ArithOp::Div.apply(1.0, 0.0), f64::INFINITY);
        assert!(ArithOp::Div.apply(0.0, 0.0).is_nan());
        assert_eq!(ArithOp::Pow.apply(2.0, 10.0), 1024.0);
        assert_eq!(ArithOp::Sub.apply(2.0, 5.0), -3.0);
    }

    #[test]
    fn test_max_slot() {
        let expr = Expr::And(
            Box::new(Expr::StringTest {
                property: Accessor::new("name", 2),
                value: "O".into(),
                equals: true,
            }),
            Box::new(Expr::Compare {
                op: CmpOp::Lt,
                lhs: Box::new(distance()),
                rhs: Box::new(Expr::Number(3.0)),
            }),
        );
        assert_eq!(expr.max_slot(), 3);
        assert_eq!(Expr::Bool(true).max_slot(), 0);
    }

    #[test]
    fn test_reads_velocities() {
        let vx = Expr::Compare {
            op: CmpOp::Gt,
            lhs: Box::new(Expr::Neg(Box::new(Expr::Property(Accessor::new("vx", 2))))),
            rhs: Box::new(Expr::Number(0.0)),
        };
        assert!(Expr::Not(Box::new(vx)).reads_velocities());
        assert!(!Expr::Property(Accessor::new("x", 1)).reads_velocities());
        assert!(!distance().reads_velocities());
    }

    #[test]
    fn test_kind() {
        assert_eq!(distance().kind(), Kind::Value);
        assert_eq!(Expr::Bool(false).kind(), Kind::Boolean);
        assert_eq!(
            Expr::Function {
                name: "is_bonded".into(),
                args: vec![1, 2]
            }
            .kind(),
            Kind::Boolean
        );
        assert_eq!(Expr::Property(Accessor::new("mass", 1)).kind(), Kind::Value);
        assert_eq!(Expr::Property(Accessor::new("flagged", 1)).kind(), Kind::Unknown);
    }

    #[test]
    fn test_display() {
        let expr = Expr::Or(
            Box::new(Expr::Not(Box::new(Expr::Bool(false)))),
            Box::new(Expr::Compare {
                op: CmpOp::Ge,
                lhs: Box::new(Expr::Binary {
                    op: ArithOp::Mul,
                    lhs: Box::new(Expr::Property(Accessor::new("mass", 1))),
                    rhs: Box::new(Expr::Number(2.5)),
                }),
                rhs: Box::new(distance()),
            }),
        );
        assert_eq!(
            expr.to_string(),
            "(not none or (mass(1) * 2.5) >= distance(1, 3))"
        );
    }
}
