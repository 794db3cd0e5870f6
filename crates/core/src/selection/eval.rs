//! Evaluator for selection expressions against a single match.

use std::borrow::Cow;

use crate::frame::{FrameView, PropertyValue};
use crate::selection::ast::*;
use crate::selection::error::EvaluationError;
use crate::selection::keywords;
use crate::selection::matches::Match;
use crate::util;

/// Result of evaluating a sub-expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<'a> {
    Bool(bool),
    Number(f64),
    Str(Cow<'a, str>),
}

impl Value<'_> {
    fn kind_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "a boolean",
            Value::Number(_) => "a number",
            Value::Str(_) => "a string",
        }
    }
}

/// Evaluates expressions for the atoms of one [`Match`] of a frame.
pub struct MatchContext<'a, F: FrameView + ?Sized> {
    frame: &'a F,
    atoms: &'a Match,
}

impl<'a, F: FrameView + ?Sized> MatchContext<'a, F> {
    pub fn new(frame: &'a F, atoms: &'a Match) -> Self {
        Self { frame, atoms }
    }

    /// Does this match satisfy `expr`?
    pub fn is_match(&self, expr: &Expr) -> Result<bool, EvaluationError> {
        match expr {
            Expr::And(lhs, rhs) => Ok(self.is_match(lhs)? && self.is_match(rhs)?),
            Expr::Or(lhs, rhs) => Ok(self.is_match(lhs)? || self.is_match(rhs)?),
            Expr::Not(inner) => Ok(!self.is_match(inner)?),
            Expr::Bool(value) => Ok(*value),
            Expr::Compare { op, lhs, rhs } => self.compare(*op, lhs, rhs),
            Expr::StringTest {
                property,
                value,
                equals,
            } => match self.property(property)? {
                Value::Str(actual) => Ok((actual == value.as_str()) == *equals),
                other => Err(EvaluationError::TypeMismatch(format!(
                    "'{}' is {}, it can not be compared to the string \"{}\"",
                    property.name,
                    other.kind_name(),
                    value
                ))),
            },
            _ => match self.value(expr)? {
                Value::Bool(value) => Ok(value),
                other => Err(EvaluationError::TypeMismatch(format!(
                    "expected a boolean, but '{}' is {}",
                    expr,
                    other.kind_name()
                ))),
            },
        }
    }

    /// Evaluate `expr` to a value.
    pub fn value(&self, expr: &Expr) -> Result<Value<'a>, EvaluationError> {
        match expr {
            Expr::Number(value) => Ok(Value::Number(*value)),
            Expr::Str(value) => Ok(Value::Str(Cow::Owned(value.clone()))),
            Expr::Property(accessor) => self.property(accessor),
            Expr::Function { name, args } => self.function(name, args),
            Expr::Neg(inner) => Ok(Value::Number(-self.number(inner)?)),
            Expr::Binary { op, lhs, rhs } => {
                Ok(Value::Number(op.apply(self.number(lhs)?, self.number(rhs)?)))
            }
            Expr::And(..)
            | Expr::Or(..)
            | Expr::Not(_)
            | Expr::Bool(_)
            | Expr::Compare { .. }
            | Expr::StringTest { .. } => Ok(Value::Bool(self.is_match(expr)?)),
        }
    }

    fn number(&self, expr: &Expr) -> Result<f64, EvaluationError> {
        match self.value(expr)? {
            Value::Number(value) => Ok(value),
            other => Err(EvaluationError::TypeMismatch(format!(
                "expected a number, but '{}' is {}",
                expr,
                other.kind_name()
            ))),
        }
    }

    fn compare(&self, op: CmpOp, lhs: &Expr, rhs: &Expr) -> Result<bool, EvaluationError> {
        match (self.value(lhs)?, self.value(rhs)?) {
            (Value::Number(a), Value::Number(b)) => Ok(op.compare(a, b)),
            (Value::Str(a), Value::Str(b)) => match op {
                CmpOp::Eq => Ok(a == b),
                CmpOp::Ne => Ok(a != b),
                _ => Err(EvaluationError::TypeMismatch(format!(
                    "strings can only be compared with == and !=, not {}",
                    op.symbol()
                ))),
            },
            (a, b) => Err(EvaluationError::TypeMismatch(format!(
                "can not compare {} with {}",
                a.kind_name(),
                b.kind_name()
            ))),
        }
    }

    /// Frame index of the atom in 1-based `slot` of the match.
    fn atom(&self, name: &str, slot: usize) -> Result<usize, EvaluationError> {
        let atom = slot
            .checked_sub(1)
            .and_then(|i| self.atoms.get(i))
            .copied()
            .ok_or_else(|| EvaluationError::BadArguments {
                name: name.to_string(),
                reason: format!(
                    "atom #{} does not exist in a match of size {}",
                    slot,
                    self.atoms.len()
                ),
            })?;
        let size = self.frame.size();
        if atom >= size {
            return Err(EvaluationError::AtomOutOfBounds { atom, size });
        }
        Ok(atom)
    }

    fn property(&self, accessor: &Accessor) -> Result<Value<'a>, EvaluationError> {
        let frame = self.frame;
        let name = accessor.name.as_str();
        let atom = self.atom(name, accessor.slot)?;
        let value = match name {
            "name" => Value::Str(Cow::Borrowed(frame.name(atom))),
            "type" => Value::Str(Cow::Borrowed(frame.atom_type(atom))),
            "element" => Value::Str(Cow::Borrowed(frame.element(atom))),
            "resname" => Value::Str(Cow::Borrowed(frame.residue_name(atom).unwrap_or(""))),
            "index" => Value::Number(atom as f64),
            "mass" => Value::Number(frame.mass(atom)),
            "charge" => Value::Number(frame.charge(atom)),
            "resid" => Value::Number(frame.residue_id(atom).map_or(f64::NAN, |id| id as f64)),
            "x" => Value::Number(frame.position(atom)[0]),
            "y" => Value::Number(frame.position(atom)[1]),
            "z" => Value::Number(frame.position(atom)[2]),
            // NaN without velocities, so only `!=` can match
            "vx" | "vy" | "vz" => {
                let axis = match name {
                    "vx" => 0,
                    "vy" => 1,
                    _ => 2,
                };
                Value::Number(frame.velocity(atom).map_or(f64::NAN, |v| v[axis]))
            }
            _ => match frame.property(atom, name) {
                Some(PropertyValue::Bool(value)) => Value::Bool(*value),
                Some(PropertyValue::Number(value)) => Value::Number(*value),
                Some(PropertyValue::String(value)) => Value::Str(Cow::Borrowed(value.as_str())),
                None => {
                    return Err(EvaluationError::UnknownProperty {
                        name: name.to_string(),
                        atom,
                    })
                }
            },
        };
        Ok(value)
    }

    fn function(&self, name: &str, args: &[usize]) -> Result<Value<'a>, EvaluationError> {
        let Some(arity) = keywords::function_arity(name) else {
            if keywords::is_builtin_property(name) {
                return Err(EvaluationError::BadArguments {
                    name: name.to_string(),
                    reason: format!("properties take a single atom, got {}", args.len()),
                });
            }
            return Err(EvaluationError::UnknownFunction(name.to_string()));
        };
        if args.len() != arity {
            return Err(EvaluationError::BadArguments {
                name: name.to_string(),
                reason: format!("expected {} atoms, got {}", arity, args.len()),
            });
        }

        let mut atoms = [0; 4];
        for (atom, &slot) in atoms.iter_mut().zip(args) {
            *atom = self.atom(name, slot)?;
        }
        let frame = self.frame;
        let position = |i: usize| frame.position(atoms[i]);
        let vector = |from: usize, to: usize| frame.wrap(util::sub(&position(to), &position(from)));

        let value = match name {
            "distance" => Value::Number(util::norm(&vector(0, 1))),
            "angle" => Value::Number(util::angle(&vector(1, 0), &vector(1, 2))),
            "dihedral" => {
                Value::Number(util::dihedral(&vector(0, 1), &vector(1, 2), &vector(2, 3)))
            }
            "out_of_plane" => {
                Value::Number(util::out_of_plane(&vector(0, 1), &vector(0, 2), &vector(0, 3)))
            }
            "is_bonded" => Value::Bool(frame.is_bond(atoms[0], atoms[1])),
            "is_angle" => Value::Bool(frame.is_angle(atoms[0], atoms[1], atoms[2])),
            "is_dihedral" => {
                Value::Bool(frame.is_dihedral(atoms[0], atoms[1], atoms[2], atoms[3]))
            }
            _ => return Err(EvaluationError::UnknownFunction(name.to_string())),
        };
        Ok(value)
    }
}

/// Does `atoms` satisfy `expr` in `frame`?
pub fn is_match<F: FrameView + ?Sized>(
    expr: &Expr,
    frame: &F,
    atoms: &Match,
) -> Result<bool, EvaluationError> {
    MatchContext::new(frame, atoms).is_match(expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::UnitCell;
    use crate::frame::{testing_frame, Atom, Frame};
    use crate::selection::parser::parse_selection;
    use std::f64::consts::PI;

    fn check(frame: &Frame, selection: &str, atoms: &[usize]) -> Result<bool, EvaluationError> {
        let expr = parse_selection(selection).unwrap();
        is_match(&expr, frame, &Match::from_slice(atoms).unwrap())
    }

    fn square_frame() -> Frame {
        let mut frame = Frame::new();
        frame.add_atom(Atom::new("A"), [0.0, 0.0, 0.0]);
        frame.add_atom(Atom::new("B"), [1.0, 0.0, 0.0]);
        frame.add_atom(Atom::new("C"), [1.0, 1.0, 0.0]);
        frame.add_atom(Atom::new("D"), [1.0, 1.0, 1.0]);
        frame.add_atom(Atom::new("E"), [9.5, 0.0, 0.0]);
        frame
    }

    #[test]
    fn test_string_properties() {
        let frame = testing_frame();
        assert!(check(&frame, "name H", &[0]).unwrap());
        assert!(!check(&frame, "name H", &[1]).unwrap());
        assert!(check(&frame, "type(2) == O", &[0, 1]).unwrap());
        assert!(check(&frame, "name(1) != name(2)", &[0, 1]).unwrap());
        assert!(check(&frame, "resname WAT", &[2]).unwrap());
        assert!(check(&frame, "resname == \"\"", &[3]).unwrap());
        // elements fall back to the atom type
        assert!(check(&frame, "element O", &[1]).unwrap());
        assert!(check(&frame, "not element H", &[2]).unwrap());
        assert!(!check(&frame, "not element H", &[3]).unwrap());
    }

    #[test]
    fn test_numeric_properties() {
        let frame = testing_frame();
        assert!(check(&frame, "index 2", &[2]).unwrap());
        assert!(check(&frame, "mass > 15", &[1]).unwrap());
        assert!(check(&frame, "charge(2) < 0", &[0, 2]).unwrap());
        assert!(check(&frame, "resid == 3", &[0]).unwrap());
        // atoms without residue have a NaN resid
        assert!(!check(&frame, "resid == 3 or resid < 3 or resid > 3", &[3]).unwrap());
        assert!(check(&frame, "resid != 3", &[3]).unwrap());
        assert!(!check(&frame, "resid != 3", &[0]).unwrap());
        assert!(check(&frame, "x == 2 and y == 3 and z == 4", &[2]).unwrap());
    }

    #[test]
    fn test_arithmetic() {
        let frame = testing_frame();
        assert!(check(&frame, "x(1) + x(2) == 3", &[1, 2]).unwrap());
        assert!(check(&frame, "(z - y) * 2 ^ 3 > 7.9 and (z - y) * 2 ^ 3 < 8.1", &[0]).unwrap());
        assert!(check(&frame, "-x < 0", &[3]).unwrap());
        assert!(check(&frame, "index / 0 > 1e300", &[1]).unwrap());
        assert!(!check(&frame, "index / 0 == index / 0", &[0]).unwrap());
        assert!(check(&frame, "index / 0 == index / 0", &[1]).unwrap());
        assert!(check(&frame, "index / 0 != index / 0", &[0]).unwrap());
    }

    #[test]
    fn test_exact_equality() {
        let mut frame = Frame::new();
        frame.add_atom(Atom::new("X").with_mass(1e-10), [0.1, 0.2, 0.0]);
        assert!(!check(&frame, "mass == 0", &[0]).unwrap());
        assert!(check(&frame, "mass != 0 and mass > 0", &[0]).unwrap());
        // 0.1 + 0.2 is not 0.3 in binary floating point
        assert!(!check(&frame, "x + y == 0.3", &[0]).unwrap());
    }

    #[test]
    fn test_custom_properties() {
        let frame = testing_frame();
        assert!(check(&frame, "bfactor(1) == 20", &[2]).unwrap());
        // a bare unknown identifier is a string
        assert!(check(&frame, "bfactor == 20", &[2]).is_err());
        assert!(check(&frame, "hetero(1)", &[0]).unwrap());
        assert!(check(&frame, "not hetero(2)", &[0, 1]).unwrap());
        assert_eq!(
            check(&frame, "occupancy(1) > 0", &[0]).unwrap_err(),
            EvaluationError::UnknownProperty {
                name: "occupancy".into(),
                atom: 0
            }
        );
    }

    #[test]
    fn test_velocities() {
        let mut frame = testing_frame();
        // without velocities every component is NaN
        assert!(!check(&frame, "vx > 0 or vx < 2 or vy == 0 or vz <= 1", &[0]).unwrap());
        assert!(check(&frame, "vz != 0", &[0]).unwrap());
        frame.add_velocities();
        frame.velocities_mut().unwrap()[1] = [0.5, -1.0, 2.0];
        assert!(check(&frame, "vx == 0.5 and vy < 0 and vz == 2", &[1]).unwrap());
    }

    #[test]
    fn test_geometry() {
        let frame = square_frame();
        assert!(check(&frame, "distance(1, 2) == 1", &[0, 1]).unwrap());
        assert!(check(&frame, "distance(#1, #2) > 1.4142 and distance(#1, #2) < 1.4143", &[0, 2]).unwrap());
        assert!(check(&frame, "angle(1, 2, 3) > 1.5707 and angle(1, 2, 3) < 1.5708", &[0, 1, 2]).unwrap());

        let expr = parse_selection("dihedral(1, 2, 3, 4) > 0").unwrap();
        let atoms = Match::from([0, 1, 2, 3]);
        let ctx = MatchContext::new(&frame, &atoms);
        let Value::Number(phi) = ctx.value(&Expr::Function {
            name: "dihedral".into(),
            args: vec![1, 2, 3, 4],
        })
        .unwrap() else {
            panic!("dihedral should be a number");
        };
        assert!((phi.abs() - PI / 2.0).abs() < 1e-12);
        assert!(ctx.is_match(&expr).is_ok());

        // distance of atom 2 to the plane through atoms 1, 3, 4
        assert!(check(&frame, "out_of_plane(1, 2, 3, 4) == 0", &[0, 1, 2, 4]).unwrap());
        assert!(check(&frame, "out_of_plane(1, 2, 3, 4) > 0.7071 and out_of_plane(1, 2, 3, 4) < 0.7072", &[0, 1, 2, 3]).unwrap());
        assert!(check(&frame, "out_of_plane(1, 2, 3, 4) == -1", &[1, 0, 2, 3]).unwrap());
    }

    #[test]
    fn test_minimum_image() {
        let mut frame = square_frame();
        assert!(check(&frame, "distance(1, 2) == 9.5", &[0, 4]).unwrap());
        frame.set_cell(UnitCell::orthorhombic([10.0, 10.0, 10.0]).unwrap());
        assert!(check(&frame, "distance(1, 2) > 0.4999 and distance(1, 2) < 0.5001", &[0, 4]).unwrap());
    }

    #[test]
    fn test_topology_functions() {
        let frame = testing_frame();
        assert!(check(&frame, "is_bonded(1, 2)", &[2, 1]).unwrap());
        assert!(!check(&frame, "is_bonded(1, 2)", &[0, 2]).unwrap());
        assert!(check(&frame, "is_angle(1, 2, 3)", &[2, 1, 0]).unwrap());
        assert!(check(&frame, "is_dihedral(1, 2, 3, 4)", &[0, 1, 2, 3]).unwrap());
        assert!(!check(&frame, "is_dihedral(1, 2, 3, 4)", &[1, 0, 2, 3]).unwrap());
    }

    #[test]
    fn test_short_circuit() {
        let frame = testing_frame();
        // the right-hand side would fail with an unknown property
        assert!(!check(&frame, "none and missing(1) > 0", &[0]).unwrap());
        assert!(check(&frame, "all or missing(1) > 0", &[0]).unwrap());
        assert!(check(&frame, "all and missing(1) > 0", &[0]).is_err());
    }

    #[test]
    fn test_type_errors() {
        let frame = testing_frame();
        for selection in [
            "name < H",
            "name == 1",
            "mass == H",
            "name + 1 > 0",
            "bfactor(1)",
        ] {
            let err = check(&frame, selection, &[0]).unwrap_err();
            assert!(matches!(err, EvaluationError::TypeMismatch(_)), "{}", selection);
        }
    }

    #[test]
    fn test_bad_calls() {
        let frame = testing_frame();
        assert_eq!(
            check(&frame, "distance(1, 2, 3) > 0", &[0, 1, 2]).unwrap_err(),
            EvaluationError::BadArguments {
                name: "distance".into(),
                reason: "expected 2 atoms, got 3".into()
            }
        );
        assert!(matches!(
            check(&frame, "name(1, 2) == H", &[0, 1]).unwrap_err(),
            EvaluationError::BadArguments { .. }
        ));
        assert_eq!(
            check(&frame, "volume(1, 2) > 0", &[0, 1]).unwrap_err(),
            EvaluationError::UnknownFunction("volume".into())
        );
        assert!(matches!(
            check(&frame, "name(3) == H", &[0, 1]).unwrap_err(),
            EvaluationError::BadArguments { .. }
        ));
        assert_eq!(
            check(&frame, "name H", &[12]).unwrap_err(),
            EvaluationError::AtomOutOfBounds { atom: 12, size: 4 }
        );
    }
}
