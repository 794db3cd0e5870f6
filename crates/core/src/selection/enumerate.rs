//! Candidate enumeration for each selection context.
//!
//! Every context is a producer of [`Candidate`]s over a range of its outer
//! index: atoms for `atoms`, `pairs`, `three` and `four`, connectivity records
//! for `bonds`, `angles` and `dihedrals`. All producers feed the same
//! judgment step, so the sequential and the parallel drivers only differ in
//! how they split the outer range.

use std::ops::Range;

use rayon::prelude::*;

use crate::config::EvaluationOptions;
use crate::frame::FrameView;
use crate::selection::ast::Expr;
use crate::selection::context::Context;
use crate::selection::error::EvaluationError;
use crate::selection::eval::MatchContext;
use crate::selection::matches::{Match, MAX_MATCH_SIZE};

/// A tuple to test against the selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Candidate {
    Single(Match),
    /// A connectivity record, tested as recorded and then reversed
    Oriented { forward: Match, reverse: Match },
}

/// Ordered tuples of `arity` pairwise distinct atoms in `0..n`, with the
/// first atom in a given range. Tuples come out in lexicographic order.
pub(crate) struct DistinctTuples {
    n: usize,
    arity: usize,
    end: usize,
    current: [usize; MAX_MATCH_SIZE],
    started: bool,
}

impl DistinctTuples {
    pub(crate) fn new(n: usize, arity: usize, first: Range<usize>) -> Self {
        let mut current = [0; MAX_MATCH_SIZE];
        current[0] = first.start;
        Self {
            n,
            arity,
            end: first.end.min(n),
            current,
            started: false,
        }
    }

    /// Advance to the next tuple, distinct or not. Returns false once the
    /// first atom leaves its range.
    fn step(&mut self) -> bool {
        let mut pos = self.arity - 1;
        loop {
            self.current[pos] += 1;
            if pos == 0 {
                return self.current[0] < self.end;
            }
            if self.current[pos] < self.n {
                return true;
            }
            self.current[pos] = 0;
            pos -= 1;
        }
    }

    fn is_distinct(&self) -> bool {
        let atoms = &self.current[..self.arity];
        (1..atoms.len()).all(|i| !atoms[..i].contains(&atoms[i]))
    }
}

impl Iterator for DistinctTuples {
    type Item = Match;

    fn next(&mut self) -> Option<Match> {
        loop {
            if self.started {
                if !self.step() {
                    return None;
                }
            } else {
                self.started = true;
                if self.current[0] >= self.end {
                    return None;
                }
            }
            if self.is_distinct() {
                return Match::from_slice(&self.current[..self.arity]);
            }
        }
    }
}

/// One evaluation of a selection over a frame.
pub(crate) struct Enumerator<'a, F: FrameView + ?Sized> {
    context: Context,
    ast: &'a Expr,
    frame: &'a F,
    options: &'a EvaluationOptions,
}

impl<'a, F: FrameView + ?Sized> Enumerator<'a, F> {
    pub(crate) fn new(
        context: Context,
        ast: &'a Expr,
        frame: &'a F,
        options: &'a EvaluationOptions,
    ) -> Self {
        Self {
            context,
            ast,
            frame,
            options,
        }
    }

    /// Number of outer indexes to enumerate.
    fn extent(&self) -> usize {
        match self.context {
            Context::Atom | Context::Pair | Context::Three | Context::Four => self.frame.size(),
            Context::Bond => self.frame.bonds().len(),
            Context::Angle => self.frame.angles().len(),
            Context::Dihedral => self.frame.dihedrals().len(),
        }
    }

    /// Connectivity records must only mention atoms of the frame.
    fn check_records(&self) -> Result<(), EvaluationError> {
        if !self.context.is_connectivity() {
            return Ok(());
        }
        let size = self.frame.size();
        let check = |atoms: &[usize]| match atoms.iter().find(|&&atom| atom >= size) {
            Some(&atom) => Err(EvaluationError::AtomOutOfBounds { atom, size }),
            None => Ok(()),
        };
        match self.context {
            Context::Bond => self.frame.bonds().iter().try_for_each(|r| check(&r[..])),
            Context::Angle => self.frame.angles().iter().try_for_each(|r| check(&r[..])),
            Context::Dihedral => self.frame.dihedrals().iter().try_for_each(|r| check(&r[..])),
            _ => Ok(()),
        }
    }

    /// Candidates whose outer index lies in `range`, in enumeration order.
    fn candidates(&self, range: Range<usize>) -> Box<dyn Iterator<Item = Candidate> + 'a> {
        let frame = self.frame;
        let n = frame.size();
        match self.context {
            Context::Atom | Context::Pair | Context::Three | Context::Four => Box::new(
                DistinctTuples::new(n, self.context.arity(), range).map(Candidate::Single),
            ),
            Context::Bond => Box::new(frame.bonds()[range].iter().map(|&[i, j]| {
                Candidate::Oriented {
                    forward: Match::from([i, j]),
                    reverse: Match::from([j, i]),
                }
            })),
            Context::Angle => Box::new(frame.angles()[range].iter().map(|&[i, j, k]| {
                Candidate::Oriented {
                    forward: Match::from([i, j, k]),
                    reverse: Match::from([k, j, i]),
                }
            })),
            Context::Dihedral => {
                Box::new(frame.dihedrals()[range].iter().map(|&[i, j, k, m]| {
                    Candidate::Oriented {
                        forward: Match::from([i, j, k, m]),
                        reverse: Match::from([m, k, j, i]),
                    }
                }))
            }
        }
    }

    fn judge(&self, candidate: Candidate) -> Result<Option<Match>, EvaluationError> {
        let accepts = |atoms: &Match| MatchContext::new(self.frame, atoms).is_match(self.ast);
        match candidate {
            Candidate::Single(atoms) => Ok(accepts(&atoms)?.then_some(atoms)),
            Candidate::Oriented { forward, reverse } => {
                if accepts(&forward)? {
                    Ok(Some(forward))
                } else if accepts(&reverse)? {
                    Ok(Some(reverse))
                } else {
                    Ok(None)
                }
            }
        }
    }

    fn collect_range(&self, range: Range<usize>) -> Result<Vec<Match>, EvaluationError> {
        let mut matches = Vec::new();
        for candidate in self.candidates(range) {
            if self.options.is_cancelled() {
                return Err(EvaluationError::Cancelled);
            }
            if let Some(atoms) = self.judge(candidate)? {
                matches.push(atoms);
            }
        }
        Ok(matches)
    }

    /// Evaluate every candidate, returning the accepted matches in
    /// enumeration order.
    pub(crate) fn run(&self) -> Result<Vec<Match>, EvaluationError> {
        self.check_records()?;
        if self.ast.reads_velocities() && !self.frame.has_velocities() {
            tracing::warn!(
                selection = %self.ast,
                "no velocities in frame, velocity components are NaN"
            );
        }
        let extent = self.extent();
        let parallel = self.options.use_parallel(extent);
        tracing::trace!(context = %self.context, extent, parallel, "enumerating candidates");

        let result = if parallel {
            (0..extent)
                .into_par_iter()
                .map(|i| self.collect_range(i..i + 1))
                .collect::<Result<Vec<_>, _>>()
                .map(|chunks| chunks.into_iter().flatten().collect())
        } else {
            self.collect_range(0..extent)
        };

        match &result {
            Ok(matches) => {
                tracing::debug!(context = %self.context, matches = matches.len(), "selection evaluated")
            }
            Err(EvaluationError::Cancelled) => {
                tracing::warn!(context = %self.context, "selection evaluation cancelled")
            }
            Err(_) => {}
        }
        result
    }
}
