//! Read-only frame interface consumed by selections, and an in-memory frame.
//!
//! Selections only ever talk to a frame through [`FrameView`]. The concrete
//! [`Frame`] type below stores atoms, residues, bonds, positions, optional
//! velocities and a unit cell, and derives angles and dihedrals from the
//! bond graph the first time they are requested.

use std::collections::{BTreeSet, HashMap};
use std::sync::OnceLock;

use crate::cell::UnitCell;

/// Two bonded atoms, stored with the lower index first.
pub type Bond = [usize; 2];
/// Three atoms `i-j-k` with `j` the vertex, stored with `i < k`.
pub type Angle = [usize; 3];
/// Four atoms `i-j-k-m` along a bond path, stored with `i < m`.
pub type Dihedral = [usize; 4];

/// Value of a user-defined atom property.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Bool(bool),
    Number(f64),
    String(String),
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Number(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

/// Read-only view over a molecular frame.
///
/// Atom indices handed to the per-atom accessors are always `< size()`.
pub trait FrameView: Sync {
    /// Number of atoms in the frame.
    fn size(&self) -> usize;

    fn name(&self, atom: usize) -> &str;

    fn atom_type(&self, atom: usize) -> &str;

    /// Chemical element of `atom`. Frames that do not track elements report
    /// the atom type.
    fn element(&self, atom: usize) -> &str {
        self.atom_type(atom)
    }

    fn mass(&self, atom: usize) -> f64;

    fn charge(&self, atom: usize) -> f64;

    /// User-defined property `name` of `atom`, if it is set.
    fn property(&self, atom: usize, name: &str) -> Option<&PropertyValue>;

    fn position(&self, atom: usize) -> [f64; 3];

    /// Velocity of `atom`, or `None` when the frame carries no velocities.
    fn velocity(&self, atom: usize) -> Option<[f64; 3]>;

    fn has_velocities(&self) -> bool {
        self.size() > 0 && self.velocity(0).is_some()
    }

    /// Name of the residue containing `atom`.
    fn residue_name(&self, atom: usize) -> Option<&str>;

    /// Identifier of the residue containing `atom`.
    fn residue_id(&self, atom: usize) -> Option<i64>;

    fn bonds(&self) -> &[Bond];

    fn angles(&self) -> &[Angle];

    fn dihedrals(&self) -> &[Dihedral];

    fn is_bond(&self, i: usize, j: usize) -> bool {
        self.bonds()
            .iter()
            .any(|b| (b[0] == i && b[1] == j) || (b[0] == j && b[1] == i))
    }

    fn is_angle(&self, i: usize, j: usize, k: usize) -> bool {
        self.angles()
            .iter()
            .any(|a| a[1] == j && ((a[0] == i && a[2] == k) || (a[0] == k && a[2] == i)))
    }

    fn is_dihedral(&self, i: usize, j: usize, k: usize, m: usize) -> bool {
        self.dihedrals().iter().any(|d| {
            (d[0] == i && d[1] == j && d[2] == k && d[3] == m)
                || (d[0] == m && d[1] == k && d[2] == j && d[3] == i)
        })
    }

    /// Minimum-image version of a distance vector. Non-periodic frames
    /// return the vector unchanged.
    fn wrap(&self, vector: [f64; 3]) -> [f64; 3] {
        vector
    }
}

/// A single atom of a topology.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    pub name: String,
    /// Atom type; defaults to the atom name.
    pub atom_type: String,
    /// Element symbol, when it differs from the atom type.
    pub element: Option<String>,
    pub mass: f64,
    pub charge: f64,
    pub properties: HashMap<String, PropertyValue>,
}

impl Atom {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            atom_type: name.clone(),
            element: None,
            name,
            mass: 0.0,
            charge: 0.0,
            properties: HashMap::new(),
        }
    }

    pub fn with_type(mut self, atom_type: impl Into<String>) -> Self {
        self.atom_type = atom_type.into();
        self
    }

    pub fn with_element(mut self, element: impl Into<String>) -> Self {
        self.element = Some(element.into());
        self
    }

    pub fn with_mass(mut self, mass: f64) -> Self {
        self.mass = mass;
        self
    }

    pub fn with_charge(mut self, charge: f64) -> Self {
        self.charge = charge;
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }
}

/// A group of atoms sharing a residue name and identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Residue {
    pub name: String,
    pub id: Option<i64>,
    pub atoms: Vec<usize>,
}

impl Residue {
    pub fn new(name: impl Into<String>, id: Option<i64>) -> Self {
        Self {
            name: name.into(),
            id,
            atoms: Vec::new(),
        }
    }

    pub fn with_atoms(mut self, atoms: impl IntoIterator<Item = usize>) -> Self {
        self.atoms.extend(atoms);
        self
    }
}

/// Angles and dihedrals derived from the bond list.
#[derive(Debug, Clone, Default)]
struct Connectivity {
    angles: Vec<Angle>,
    dihedrals: Vec<Dihedral>,
}

impl Connectivity {
    fn from_bonds(bonds: &[Bond], n_atoms: usize) -> Self {
        let mut neighbors: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); n_atoms];
        for &[i, j] in bonds {
            neighbors[i].insert(j);
            neighbors[j].insert(i);
        }

        let mut angles = BTreeSet::new();
        for (j, around) in neighbors.iter().enumerate() {
            for &i in around {
                for &k in around.range(i + 1..) {
                    angles.insert([i, j, k]);
                }
            }
        }

        let mut dihedrals = BTreeSet::new();
        for &[j, k] in bonds {
            for &i in neighbors[j].iter().filter(|&&i| i != k) {
                for &m in neighbors[k].iter().filter(|&&m| m != j && m != i) {
                    if i < m {
                        dihedrals.insert([i, j, k, m]);
                    } else {
                        dihedrals.insert([m, k, j, i]);
                    }
                }
            }
        }

        Self {
            angles: angles.into_iter().collect(),
            dihedrals: dihedrals.into_iter().collect(),
        }
    }
}

/// Atoms, residues and bonds of a system.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    atoms: Vec<Atom>,
    residues: Vec<Residue>,
    atom_residue: Vec<Option<usize>>,
    /// Sorted, deduplicated.
    bonds: Vec<Bond>,
    connectivity: OnceLock<Connectivity>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn size(&self) -> usize {
        self.atoms.len()
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn atom(&self, index: usize) -> Option<&Atom> {
        self.atoms.get(index)
    }

    pub fn push(&mut self, atom: Atom) {
        self.atoms.push(atom);
        self.atom_residue.push(None);
    }

    pub fn residues(&self) -> &[Residue] {
        &self.residues
    }

    /// Residue containing `atom`, if any.
    pub fn residue_for_atom(&self, atom: usize) -> Option<&Residue> {
        self.atom_residue
            .get(atom)
            .copied()
            .flatten()
            .map(|r| &self.residues[r])
    }

    /// Register a residue. Every atom of the residue must exist and must not
    /// already belong to another residue.
    pub fn add_residue(&mut self, residue: Residue) -> Result<(), String> {
        for &atom in &residue.atoms {
            if atom >= self.atoms.len() {
                return Err(format!(
                    "Residue '{}' refers to atom {} but the topology only has {} atoms",
                    residue.name,
                    atom,
                    self.atoms.len()
                ));
            }
            if self.atom_residue[atom].is_some() {
                return Err(format!(
                    "Atom {} is already in a residue, can not add it to '{}'",
                    atom, residue.name
                ));
            }
        }
        let index = self.residues.len();
        for &atom in &residue.atoms {
            self.atom_residue[atom] = Some(index);
        }
        self.residues.push(residue);
        Ok(())
    }

    pub fn add_bond(&mut self, i: usize, j: usize) -> Result<(), String> {
        let n = self.atoms.len();
        if i >= n || j >= n {
            return Err(format!(
                "Bond ({}, {}) is out of bounds for a topology with {} atoms",
                i, j, n
            ));
        }
        if i == j {
            return Err(format!("Can not bond atom {} to itself", i));
        }
        let bond = if i < j { [i, j] } else { [j, i] };
        if let Err(position) = self.bonds.binary_search(&bond) {
            self.bonds.insert(position, bond);
            self.connectivity = OnceLock::new();
        }
        Ok(())
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    pub fn angles(&self) -> &[Angle] {
        &self.connectivity().angles
    }

    pub fn dihedrals(&self) -> &[Dihedral] {
        &self.connectivity().dihedrals
    }

    fn connectivity(&self) -> &Connectivity {
        self.connectivity
            .get_or_init(|| Connectivity::from_bonds(&self.bonds, self.atoms.len()))
    }
}

/// A topology together with positions, optional velocities and a cell.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    topology: Topology,
    positions: Vec<[f64; 3]>,
    velocities: Option<Vec<[f64; 3]>>,
    cell: UnitCell,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a frame for `topology` with every atom at the origin.
    pub fn from_topology(topology: Topology) -> Self {
        let n = topology.size();
        Self {
            topology,
            positions: vec![[0.0; 3]; n],
            velocities: None,
            cell: UnitCell::Infinite,
        }
    }

    pub fn add_atom(&mut self, atom: Atom, position: [f64; 3]) {
        self.topology.push(atom);
        self.positions.push(position);
        if let Some(velocities) = &mut self.velocities {
            velocities.push([0.0; 3]);
        }
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn add_bond(&mut self, i: usize, j: usize) -> Result<(), String> {
        self.topology.add_bond(i, j)
    }

    pub fn add_residue(&mut self, residue: Residue) -> Result<(), String> {
        self.topology.add_residue(residue)
    }

    pub fn positions(&self) -> &[[f64; 3]] {
        &self.positions
    }

    pub fn positions_mut(&mut self) -> &mut [[f64; 3]] {
        &mut self.positions
    }

    /// Allocate zeroed velocities if the frame does not have any yet.
    pub fn add_velocities(&mut self) {
        if self.velocities.is_none() {
            self.velocities = Some(vec![[0.0; 3]; self.positions.len()]);
        }
    }

    pub fn velocities(&self) -> Option<&[[f64; 3]]> {
        self.velocities.as_deref()
    }

    pub fn velocities_mut(&mut self) -> Option<&mut [[f64; 3]]> {
        self.velocities.as_deref_mut()
    }

    pub fn cell(&self) -> &UnitCell {
        &self.cell
    }

    pub fn set_cell(&mut self, cell: UnitCell) {
        self.cell = cell;
    }
}

impl FrameView for Frame {
    fn size(&self) -> usize {
        self.topology.size()
    }

    fn name(&self, atom: usize) -> &str {
        &self.topology.atoms[atom].name
    }

    fn atom_type(&self, atom: usize) -> &str {
        &self.topology.atoms[atom].atom_type
    }

    fn element(&self, atom: usize) -> &str {
        let atom = &self.topology.atoms[atom];
        atom.element.as_deref().unwrap_or(&atom.atom_type)
    }

    fn mass(&self, atom: usize) -> f64 {
        self.topology.atoms[atom].mass
    }

    fn charge(&self, atom: usize) -> f64 {
        self.topology.atoms[atom].charge
    }

    fn property(&self, atom: usize, name: &str) -> Option<&PropertyValue> {
        self.topology.atoms[atom].properties.get(name)
    }

    fn position(&self, atom: usize) -> [f64; 3] {
        self.positions[atom]
    }

    fn velocity(&self, atom: usize) -> Option<[f64; 3]> {
        self.velocities.as_ref().map(|v| v[atom])
    }

    fn has_velocities(&self) -> bool {
        self.velocities.is_some()
    }

    fn residue_name(&self, atom: usize) -> Option<&str> {
        self.topology.residue_for_atom(atom).map(|r| r.name.as_str())
    }

    fn residue_id(&self, atom: usize) -> Option<i64> {
        self.topology.residue_for_atom(atom).and_then(|r| r.id)
    }

    fn bonds(&self) -> &[Bond] {
        self.topology.bonds()
    }

    fn angles(&self) -> &[Angle] {
        self.topology.angles()
    }

    fn dihedrals(&self) -> &[Dihedral] {
        self.topology.dihedrals()
    }

    fn is_bond(&self, i: usize, j: usize) -> bool {
        let bond = if i < j { [i, j] } else { [j, i] };
        self.topology.bonds().binary_search(&bond).is_ok()
    }

    fn is_angle(&self, i: usize, j: usize, k: usize) -> bool {
        let angle = if i < k { [i, j, k] } else { [k, j, i] };
        self.topology.angles().binary_search(&angle).is_ok()
    }

    fn is_dihedral(&self, i: usize, j: usize, k: usize, m: usize) -> bool {
        let dihedral = if i < m { [i, j, k, m] } else { [m, k, j, i] };
        self.topology.dihedrals().binary_search(&dihedral).is_ok()
    }

    fn wrap(&self, vector: [f64; 3]) -> [f64; 3] {
        self.cell.wrap(vector)
    }
}

/// Four atoms `H O O H` bonded as a chain, atoms 0 to 2 in residue `WAT` 3,
/// on the line `(i, i + 1, i + 2)`.
#[cfg(test)]
pub(crate) fn testing_frame() -> Frame {
    let mut frame = Frame::new();
    let atoms = [
        Atom::new("H").with_mass(1.008).with_charge(0.4),
        Atom::new("O").with_mass(15.999).with_charge(-0.8),
        Atom::new("O").with_mass(15.999).with_charge(-0.8),
        Atom::new("H").with_mass(1.008).with_charge(0.4),
    ];
    for (i, atom) in atoms.into_iter().enumerate() {
        let x = i as f64;
        let atom = atom
            .with_property("bfactor", 10.0 * x)
            .with_property("hetero", i % 2 == 0);
        frame.add_atom(atom, [x, x + 1.0, x + 2.0]);
    }
    frame.add_bond(0, 1).unwrap();
    frame.add_bond(1, 2).unwrap();
    frame.add_bond(2, 3).unwrap();
    frame
        .add_residue(Residue::new("WAT", Some(3)).with_atoms([0, 1, 2]))
        .unwrap();
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn butane_like() -> Topology {
        let mut topology = Topology::new();
        for name in ["C1", "C2", "C3", "C4", "H"] {
            topology.push(Atom::new(name));
        }
        topology.add_bond(0, 1).unwrap();
        topology.add_bond(2, 1).unwrap();
        topology.add_bond(2, 3).unwrap();
        topology.add_bond(1, 4).unwrap();
        topology
    }

    #[test]
    fn test_bonds_are_canonical_and_deduplicated() {
        let mut topology = butane_like();
        topology.add_bond(1, 0).unwrap();
        assert_eq!(topology.bonds(), &[[0, 1], [1, 2], [1, 4], [2, 3]]);
    }

    #[test]
    fn test_bond_validation() {
        let mut topology = butane_like();
        assert!(topology.add_bond(0, 0).is_err());
        assert!(topology.add_bond(0, 12).is_err());
    }

    #[test]
    fn test_derived_angles() {
        let topology = butane_like();
        assert_eq!(
            topology.angles(),
            &[[0, 1, 2], [0, 1, 4], [1, 2, 3], [2, 1, 4]]
        );
    }

    #[test]
    fn test_derived_dihedrals() {
        let topology = butane_like();
        assert_eq!(topology.dihedrals(), &[[0, 1, 2, 3], [3, 2, 1, 4]]);
    }

    #[test]
    fn test_connectivity_refreshes_after_new_bond() {
        let mut topology = butane_like();
        assert_eq!(topology.dihedrals().len(), 2);
        topology.push(Atom::new("C5"));
        topology.add_bond(3, 5).unwrap();
        assert_eq!(topology.dihedrals().len(), 3);
        assert!(topology.dihedrals().contains(&[1, 2, 3, 5]));
    }

    #[test]
    fn test_residues() {
        let mut topology = butane_like();
        topology
            .add_residue(Residue::new("BUT", Some(7)).with_atoms([0, 1, 2]))
            .unwrap();
        assert!(topology
            .add_residue(Residue::new("BAD", None).with_atoms([2, 3]))
            .is_err());
        assert!(topology
            .add_residue(Residue::new("BAD", None).with_atoms([42]))
            .is_err());

        let frame = Frame::from_topology(topology);
        assert_eq!(frame.residue_name(1), Some("BUT"));
        assert_eq!(frame.residue_id(2), Some(7));
        assert_eq!(frame.residue_name(3), None);
        assert_eq!(frame.residue_id(4), None);
    }

    #[test]
    fn test_frame_view_connectivity_lookups() {
        let frame = Frame::from_topology(butane_like());
        assert!(frame.is_bond(1, 0));
        assert!(!frame.is_bond(0, 2));
        assert!(frame.is_angle(2, 1, 0));
        assert!(!frame.is_angle(1, 0, 2));
        assert!(frame.is_dihedral(3, 2, 1, 0));
        assert!(frame.is_dihedral(4, 1, 2, 3));
        assert!(!frame.is_dihedral(0, 1, 2, 4));
    }

    #[test]
    fn test_velocities() {
        let mut frame = Frame::new();
        frame.add_atom(Atom::new("O"), [1.0, 2.0, 3.0]);
        assert_eq!(frame.velocity(0), None);
        assert!(!frame.has_velocities());
        frame.add_velocities();
        assert!(frame.has_velocities());
        frame.add_atom(Atom::new("H"), [0.0, 0.0, 0.0]);
        frame.velocities_mut().unwrap()[1] = [4.0, 5.0, 6.0];
        assert_eq!(frame.velocity(0), Some([0.0, 0.0, 0.0]));
        assert_eq!(frame.velocity(1), Some([4.0, 5.0, 6.0]));
    }

    #[test]
    fn test_atom_builder() {
        let atom = Atom::new("CA")
            .with_type("C")
            .with_mass(12.011)
            .with_charge(-0.1)
            .with_property("bfactor", 3.5)
            .with_property("chain", "A");
        assert_eq!(atom.atom_type, "C");
        assert_eq!(atom.properties.get("bfactor"), Some(&PropertyValue::Number(3.5)));
        assert_eq!(
            atom.properties.get("chain"),
            Some(&PropertyValue::String("A".into()))
        );
        assert_eq!(Atom::new("OW").atom_type, "OW");
    }

    #[test]
    fn test_element_defaults_to_type() {
        let mut frame = Frame::new();
        frame.add_atom(Atom::new("CA").with_type("CT").with_element("C"), [0.0; 3]);
        frame.add_atom(Atom::new("OW").with_type("O"), [0.0; 3]);
        assert_eq!(frame.element(0), "C");
        assert_eq!(frame.element(1), "O");
    }
}
