//! Aggregate connectivity state.
//!
//! Folds the states of every backend that has reported at least once into
//! the single state the policy exposes. Backends that never reported are
//! still in their initial Idle and do not take part; with no reporters at
//! all the policy is Idle.
//!
//! The aggregate is the best state present under the fixed ranking
//! Ready > Connecting > Idle > TransientFailure, which makes it
//! TransientFailure exactly when every reporter is in TransientFailure.

use crate::health::state::ConnectivityState;

/// Compute the aggregate state from the states of reporting backends.
///
/// Recomputed from scratch on every call; no counters are carried between calls.
pub fn aggregate_state<I>(reported: I) -> ConnectivityState
where
    I: IntoIterator<Item = ConnectivityState>,
{
    reported
        .into_iter()
        .max_by_key(|s| s.rank())
        .unwrap_or(ConnectivityState::Idle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConnectivityState::*;

    #[test]
    fn test_no_reporters_is_idle() {
        assert_eq!(aggregate_state([]), Idle);
    }

    #[test]
    fn test_aggregate_table() {
        let cases: &[(&str, &[ConnectivityState], ConnectivityState)] = &[
            ("one ready", &[Ready], Ready),
            ("one connecting", &[Connecting], Connecting),
            ("one ready one transient failure", &[Ready, TransientFailure], Ready),
            ("one connecting one transient failure", &[Connecting, TransientFailure], Connecting),
            ("connecting beats idle", &[Idle, Connecting, Idle], Connecting),
            ("all idle", &[Idle, Idle], Idle),
            ("idle and failures", &[TransientFailure, Idle], Idle),
            ("all transient failure", &[TransientFailure, TransientFailure], TransientFailure),
            ("ready among many", &[TransientFailure, Idle, Connecting, Ready], Ready),
        ];

        for (name, states, want) in cases {
            assert_eq!(aggregate_state(states.iter().copied()), *want, "case: {}", name);
        }
    }

    #[test]
    fn test_counts_do_not_matter() {
        let many_failures = std::iter::repeat(TransientFailure).take(100).chain([Connecting]);
        assert_eq!(aggregate_state(many_failures), Connecting);
    }
}
