//! CP model: variables, interval variables, constraints and objective.

use serde::{Deserialize, Serialize};

/// Handle to an integer decision variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VarId(usize);

impl VarId {
    /// Position of the variable in the model.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Handle to an interval variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntervalId(usize);

impl IntervalId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Integer variable with domain `[lb, ub]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntVar {
    pub name: String,
    pub lb: i64,
    pub ub: i64,
}

/// Fixed-size interval: `end = start + size`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalVar {
    pub name: String,
    pub start: VarId,
    pub end: VarId,
    pub size: i64,
}

/// Operand of a linear constraint: a variable or a constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Term {
    Var(VarId),
    Const(i64),
}

impl From<VarId> for Term {
    fn from(v: VarId) -> Self {
        Self::Var(v)
    }
}

impl From<i64> for Term {
    fn from(c: i64) -> Self {
        Self::Const(c)
    }
}

/// An interval competing for one of a set of identical tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackMember {
    pub interval: IntervalId,
    /// Track selection variable, domain `[0, tracks)`.
    pub track: VarId,
}

/// A model constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CpConstraint {
    /// `lhs >= rhs + offset`.
    GreaterOrEqual { lhs: Term, rhs: Term, offset: i64 },
    /// Two members whose track variables take the same value must not
    /// overlap in time. Zero-size members never conflict.
    NoOverlapOnTracks { tracks: i64, members: Vec<TrackMember> },
}

/// Optimization objective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Objective {
    /// Minimize the maximum of the given terms.
    MinimizeMax(Vec<Term>),
}

/// A constraint model.
///
/// Built once per optimization run and never mutated after submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CpModel {
    name: String,
    horizon: i64,
    vars: Vec<IntVar>,
    intervals: Vec<IntervalVar>,
    constraints: Vec<CpConstraint>,
    objective: Option<Objective>,
}

impl CpModel {
    /// Creates an empty model with the given planning horizon.
    pub fn new(name: impl Into<String>, horizon: i64) -> Self {
        Self {
            name: name.into(),
            horizon,
            vars: Vec::new(),
            intervals: Vec::new(),
            constraints: Vec::new(),
            objective: None,
        }
    }

    /// Declares an integer variable with domain `[lb, ub]`.
    pub fn new_int_var(&mut self, lb: i64, ub: i64, name: impl Into<String>) -> VarId {
        self.vars.push(IntVar {
            name: name.into(),
            lb,
            ub,
        });
        VarId(self.vars.len() - 1)
    }

    /// Declares an interval over existing start/end variables.
    ///
    /// Posts `end = start + size` implicitly.
    pub fn new_interval(
        &mut self,
        start: VarId,
        end: VarId,
        size: i64,
        name: impl Into<String>,
    ) -> IntervalId {
        debug_assert!(start.index() < self.vars.len() && end.index() < self.vars.len());
        self.intervals.push(IntervalVar {
            name: name.into(),
            start,
            end,
            size,
        });
        IntervalId(self.intervals.len() - 1)
    }

    /// Posts `lhs >= rhs + offset`.
    pub fn add_greater_or_equal(&mut self, lhs: impl Into<Term>, rhs: impl Into<Term>, offset: i64) {
        self.constraints.push(CpConstraint::GreaterOrEqual {
            lhs: lhs.into(),
            rhs: rhs.into(),
            offset,
        });
    }

    /// Posts a disjunctive constraint over `tracks` identical tracks.
    pub fn add_no_overlap_on_tracks(&mut self, tracks: i64, members: Vec<TrackMember>) {
        self.constraints
            .push(CpConstraint::NoOverlapOnTracks { tracks, members });
    }

    /// Sets the objective to minimizing the maximum of `terms`.
    pub fn minimize_max(&mut self, terms: Vec<Term>) {
        self.objective = Some(Objective::MinimizeMax(terms));
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn horizon(&self) -> i64 {
        self.horizon
    }

    pub fn var(&self, id: VarId) -> &IntVar {
        &self.vars[id.index()]
    }

    pub fn interval(&self, id: IntervalId) -> &IntervalVar {
        &self.intervals[id.index()]
    }

    pub fn vars(&self) -> &[IntVar] {
        &self.vars
    }

    pub fn intervals(&self) -> &[IntervalVar] {
        &self.intervals
    }

    pub fn constraints(&self) -> &[CpConstraint] {
        &self.constraints
    }

    pub fn objective(&self) -> Option<&Objective> {
        self.objective.as_ref()
    }

    pub fn var_count(&self) -> usize {
        self.vars.len()
    }

    pub fn interval_count(&self) -> usize {
        self.intervals.len()
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Evaluates the objective for a full assignment.
    pub fn objective_value(&self, values: &[i64]) -> Option<i64> {
        match self.objective.as_ref()? {
            Objective::MinimizeMax(terms) => terms.iter().map(|t| eval(*t, values)).max(),
        }
    }

    /// Lists every constraint a full assignment violates.
    ///
    /// Empty when `values` is a valid solution of the model.
    pub fn violations(&self, values: &[i64]) -> Vec<String> {
        let mut found = Vec::new();
        if values.len() != self.vars.len() {
            found.push(format!(
                "expected {} values, got {}",
                self.vars.len(),
                values.len()
            ));
            return found;
        }

        for (var, &v) in self.vars.iter().zip(values) {
            if v < var.lb || v > var.ub {
                found.push(format!("{} = {v} outside [{}, {}]", var.name, var.lb, var.ub));
            }
        }

        for iv in &self.intervals {
            let (s, e) = (values[iv.start.index()], values[iv.end.index()]);
            if e != s + iv.size {
                found.push(format!("{}: end {e} != start {s} + {}", iv.name, iv.size));
            }
        }

        for c in &self.constraints {
            match c {
                CpConstraint::GreaterOrEqual { lhs, rhs, offset } => {
                    let (l, r) = (eval(*lhs, values), eval(*rhs, values));
                    if l < r + offset {
                        found.push(format!("{lhs:?} = {l} < {rhs:?} = {r} + {offset}"));
                    }
                }
                CpConstraint::NoOverlapOnTracks { tracks, members } => {
                    for (i, a) in members.iter().enumerate() {
                        let ta = values[a.track.index()];
                        if ta < 0 || ta >= *tracks {
                            found.push(format!("track {ta} outside [0, {tracks})"));
                        }
                        for b in &members[i + 1..] {
                            if ta != values[b.track.index()] {
                                continue;
                            }
                            let (ia, ib) = (self.interval(a.interval), self.interval(b.interval));
                            if ia.size == 0 || ib.size == 0 {
                                continue;
                            }
                            let (sa, sb) = (values[ia.start.index()], values[ib.start.index()]);
                            if sa < sb + ib.size && sb < sa + ia.size {
                                found.push(format!(
                                    "{} and {} overlap on track {ta}",
                                    ia.name, ib.name
                                ));
                            }
                        }
                    }
                }
            }
        }

        found
    }
}

#[inline]
fn eval(term: Term, values: &[i64]) -> i64 {
    match term {
        Term::Var(v) => values[v.index()],
        Term::Const(c) => c,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_task_model() -> (CpModel, Vec<VarId>) {
        let mut m = CpModel::new("test", 100);
        let s1 = m.new_int_var(0, 100, "s1");
        let e1 = m.new_int_var(0, 100, "e1");
        let s2 = m.new_int_var(0, 100, "s2");
        let e2 = m.new_int_var(0, 100, "e2");
        let t1 = m.new_int_var(0, 0, "t1");
        let t2 = m.new_int_var(0, 0, "t2");
        let i1 = m.new_interval(s1, e1, 5, "i1");
        let i2 = m.new_interval(s2, e2, 5, "i2");
        m.add_no_overlap_on_tracks(
            1,
            vec![
                TrackMember { interval: i1, track: t1 },
                TrackMember { interval: i2, track: t2 },
            ],
        );
        m.minimize_max(vec![e1.into(), e2.into(), Term::Const(3)]);
        (m, vec![s1, e1, s2, e2, t1, t2])
    }

    #[test]
    fn test_model_counts() {
        let (m, _) = two_task_model();
        assert_eq!(m.var_count(), 6);
        assert_eq!(m.interval_count(), 2);
        assert_eq!(m.constraint_count(), 1);
        assert_eq!(m.horizon(), 100);
    }

    #[test]
    fn test_violations_detect_overlap() {
        let (m, _) = two_task_model();
        let overlapping = vec![0, 5, 3, 8, 0, 0];
        assert!(m.violations(&overlapping).iter().any(|v| v.contains("overlap")));

        let sequential = vec![0, 5, 5, 10, 0, 0];
        assert!(m.violations(&sequential).is_empty());
        assert_eq!(m.objective_value(&sequential), Some(10));
    }

    #[test]
    fn test_violations_precedence_and_interval() {
        let mut m = CpModel::new("prec", 50);
        let a = m.new_int_var(0, 50, "a");
        let b = m.new_int_var(0, 50, "b");
        m.add_greater_or_equal(b, a, 4);
        m.add_greater_or_equal(b, 2i64, 0);

        assert!(m.violations(&[0, 4]).is_empty());
        assert_eq!(m.violations(&[1, 4]).len(), 1);
        assert_eq!(m.violations(&[0, 60]).len(), 1); // outside domain
        assert_eq!(m.violations(&[0]).len(), 1); // wrong arity
    }
}
