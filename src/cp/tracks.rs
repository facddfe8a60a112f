//! Track assignment and left justification of a solved assignment.
//!
//! The engine only guarantees that at most `tracks` members of a track set
//! run at once. Tracks are then chosen by greedy interval colouring: members
//! in order of (start, insertion) take the lowest-numbered track that is free
//! at their start. Since intervals on a line form a perfect graph, the
//! colouring never needs more than `tracks` colours.
//!
//! Left justification keeps the order of members on every track and moves
//! each variable to its earliest value under the model's difference
//! constraints (longest paths from a virtual origin). The result is never
//! later than the input, so it keeps the objective, and it only depends on
//! the track sequences, not on where the engine happened to leave slack.

use std::collections::{HashSet, VecDeque};

use super::model::{CpConstraint, CpModel, Term};

/// Assigns every track variable of every track set.
pub(crate) fn assign_tracks(model: &CpModel, values: &mut [i64]) {
    for constraint in model.constraints() {
        let CpConstraint::NoOverlapOnTracks { tracks, members } = constraint else {
            continue;
        };
        let mut order: Vec<usize> = (0..members.len()).collect();
        order.sort_by_key(|&k| (values[model.interval(members[k].interval).start.index()], k));

        let mut free_at = vec![i64::MIN; (*tracks).max(1) as usize];
        for k in order {
            let member = members[k];
            let iv = model.interval(member.interval);
            if iv.size <= 0 {
                values[member.track.index()] = 0;
                continue;
            }
            let start = values[iv.start.index()];
            let track = free_at.iter().position(|&f| f <= start).unwrap_or(0);
            debug_assert!(free_at[track] <= start, "track set over capacity");
            free_at[track] = start + iv.size;
            values[member.track.index()] = track as i64;
        }
    }
}

/// Moves every non-track variable to its earliest value that keeps the
/// current track sequences. Returns `false` (leaving `values` untouched)
/// if the assignment does not satisfy the model to begin with.
pub(crate) fn left_justify(model: &CpModel, values: &mut [i64]) -> bool {
    let var_count = model.var_count();
    let origin = var_count;
    let n = var_count + 1;

    // out[u] holds (v, w) for every x_v >= x_u + w
    let mut out: Vec<Vec<(usize, i64)>> = vec![Vec::new(); n];
    let node = |t: Term| match t {
        Term::Var(v) => (v.index(), 0),
        Term::Const(c) => (origin, c),
    };

    for iv in model.intervals() {
        out[iv.start.index()].push((iv.end.index(), iv.size));
        out[iv.end.index()].push((iv.start.index(), -iv.size));
    }

    let mut track_vars = HashSet::new();
    for constraint in model.constraints() {
        match constraint {
            CpConstraint::GreaterOrEqual { lhs, rhs, offset } => {
                let (l, lc) = node(*lhs);
                let (r, rc) = node(*rhs);
                out[r].push((l, rc + offset - lc));
            }
            CpConstraint::NoOverlapOnTracks { members, .. } => {
                let mut sequenced: Vec<(i64, i64, usize, usize)> = Vec::with_capacity(members.len());
                for m in members {
                    track_vars.insert(m.track.index());
                    let iv = model.interval(m.interval);
                    if iv.size > 0 {
                        sequenced.push((
                            values[m.track.index()],
                            values[iv.start.index()],
                            iv.start.index(),
                            iv.end.index(),
                        ));
                    }
                }
                sequenced.sort_unstable();
                for pair in sequenced.windows(2) {
                    let (prev, next) = (pair[0], pair[1]);
                    if prev.0 == next.0 {
                        out[prev.3].push((next.2, 0));
                    }
                }
            }
        }
    }

    let mut lb: Vec<i64> = model.vars().iter().map(|v| v.lb).collect();
    lb.push(0);

    let mut queue: VecDeque<usize> = (0..n).collect();
    let mut queued = vec![true; n];
    let mut relaxed = vec![0usize; n];
    while let Some(u) = queue.pop_front() {
        queued[u] = false;
        for &(v, w) in &out[u] {
            let candidate = lb[u] + w;
            if candidate <= lb[v] {
                continue;
            }
            if v == origin || candidate > values.get(v).copied().unwrap_or(i64::MIN) {
                return false;
            }
            lb[v] = candidate;
            relaxed[v] += 1;
            if relaxed[v] > n {
                return false;
            }
            if !queued[v] {
                queued[v] = true;
                queue.push_back(v);
            }
        }
    }

    for (i, value) in values.iter_mut().enumerate().take(var_count) {
        if !track_vars.contains(&i) {
            *value = lb[i];
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cp::model::{TrackMember, VarId};

    fn two_on_one_track() -> (CpModel, [VarId; 6]) {
        let mut m = CpModel::new("pair", 50);
        let s1 = m.new_int_var(0, 50, "s1");
        let e1 = m.new_int_var(0, 50, "e1");
        let s2 = m.new_int_var(0, 50, "s2");
        let e2 = m.new_int_var(0, 50, "e2");
        let t1 = m.new_int_var(0, 1, "t1");
        let t2 = m.new_int_var(0, 1, "t2");
        let i1 = m.new_interval(s1, e1, 4, "i1");
        let i2 = m.new_interval(s2, e2, 3, "i2");
        m.add_no_overlap_on_tracks(
            2,
            vec![
                TrackMember { interval: i1, track: t1 },
                TrackMember { interval: i2, track: t2 },
            ],
        );
        (m, [s1, e1, s2, e2, t1, t2])
    }

    #[test]
    fn test_colouring_lowest_free_track() {
        let (m, v) = two_on_one_track();
        let mut values = vec![0, 4, 2, 5, 1, 1];
        assign_tracks(&m, &mut values);
        assert_eq!(values[v[4].index()], 0);
        assert_eq!(values[v[5].index()], 1);

        let mut sequential = vec![0, 4, 4, 7, 1, 0];
        assign_tracks(&m, &mut sequential);
        assert_eq!(sequential[v[4].index()], 0);
        assert_eq!(sequential[v[5].index()], 0);
    }

    #[test]
    fn test_left_justify_keeps_sequence() {
        let (m, _) = two_on_one_track();
        // both on track 0, second one after slack
        let mut values = vec![2, 6, 10, 13, 0, 0];
        assert!(left_justify(&m, &mut values));
        assert_eq!(values, vec![0, 4, 4, 7, 0, 0]);
    }

    #[test]
    fn test_left_justify_respects_precedence() {
        let mut m = CpModel::new("prec", 40);
        let a = m.new_int_var(5, 40, "a");
        let b = m.new_int_var(0, 40, "b");
        m.add_greater_or_equal(b, a, 3);
        m.add_greater_or_equal(b, Term::Const(10), 0);

        let mut values = vec![20, 30];
        assert!(left_justify(&m, &mut values));
        assert_eq!(values, vec![5, 10]);
    }

    #[test]
    fn test_left_justify_rejects_invalid_input() {
        let mut m = CpModel::new("bad", 40);
        let a = m.new_int_var(0, 40, "a");
        let b = m.new_int_var(0, 40, "b");
        m.add_greater_or_equal(b, a, 3);

        let mut values = vec![10, 2];
        assert!(!left_justify(&m, &mut values));
        assert_eq!(values, vec![10, 2]);
    }
}
