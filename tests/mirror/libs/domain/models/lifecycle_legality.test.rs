// INICIO DEL ARCHIVO [tests/mirror/libs/domain/models/lifecycle_legality.test.rs]
/**
 * =================================================================
 * APARATO: LIFECYCLE LEGALITY TEST (V3.0)
 * CLASIFICACIÓN: TRINITY EVIDENCE
 * OBJETIVO: Certificar que la función de transición es el cierre
 *           exacto de la tabla del ciclo de vida.
 * =================================================================
 */

use crisol_domain_models::{LifecycleState, SandboxPhase, SandboxStatus};
use proptest::prelude::*;

use crisol_domain_models::SandboxPhase as P;
use crisol_domain_models::SandboxStatus as S;

const ALL_STATUSES: [SandboxStatus; 5] = [S::Pending, S::Running, S::Stopped, S::Error, S::Expired];
const ALL_PHASES: [SandboxPhase; 6] =
    [P::Creating, P::Starting, P::Healthy, P::Stopping, P::Stopped, P::Failed];

/// La tabla soberana de aristas legales (excluida la identidad).
fn legal_edges() -> Vec<(LifecycleState, LifecycleState)> {
    let edge = |a: (S, P), b: (S, P)| (LifecycleState::new(a.0, a.1), LifecycleState::new(b.0, b.1));
    vec![
        edge((S::Pending, P::Creating), (S::Pending, P::Starting)),
        edge((S::Pending, P::Creating), (S::Error, P::Failed)),
        edge((S::Pending, P::Starting), (S::Running, P::Healthy)),
        edge((S::Pending, P::Starting), (S::Error, P::Failed)),
        edge((S::Running, P::Healthy), (S::Stopped, P::Stopped)),
        edge((S::Running, P::Healthy), (S::Error, P::Failed)),
        edge((S::Stopped, P::Stopped), (S::Running, P::Healthy)),
        edge((S::Running, P::Healthy), (S::Expired, P::Stopped)),
        edge((S::Pending, P::Creating), (S::Expired, P::Stopped)),
        edge((S::Pending, P::Starting), (S::Expired, P::Stopped)),
    ]
}

#[test]
fn certify_legal_edges_are_admitted() {
    for (from, to) in legal_edges() {
        assert!(from.can_transition(&to), "Arista legal vetada: {from:?} -> {to:?}");
    }
}

#[test]
fn certify_identity_is_admitted() {
    for status in ALL_STATUSES {
        for phase in ALL_PHASES {
            let state = LifecycleState::new(status, phase);
            assert!(state.can_transition(&state), "Identidad vetada en {state:?}");
        }
    }
}

#[test]
fn certify_terminal_states_have_no_exits() {
    // error/failed y expired/stopped jamás avanzan (solo destrucción física)
    let terminal_coordinates = [
        LifecycleState::new(S::Error, P::Failed),
        LifecycleState::new(S::Expired, P::Stopped),
    ];
    for terminal in terminal_coordinates {
        for status in ALL_STATUSES {
            for phase in ALL_PHASES {
                let target = LifecycleState::new(status, phase);
                if target != terminal {
                    assert!(
                        !terminal.can_transition(&target),
                        "Fuga desde terminal {terminal:?} -> {target:?}"
                    );
                }
            }
        }
    }
}

proptest! {
    /// Cierre exacto: toda transición admitida es identidad o arista de la tabla.
    #[test]
    fn certify_closure_is_exact(
        from_status_index in 0usize..5,
        from_phase_index in 0usize..6,
        to_status_index in 0usize..5,
        to_phase_index in 0usize..6,
    ) {
        let from = LifecycleState::new(ALL_STATUSES[from_status_index], ALL_PHASES[from_phase_index]);
        let to = LifecycleState::new(ALL_STATUSES[to_status_index], ALL_PHASES[to_phase_index]);

        let admitted = from.can_transition(&to);
        let in_table = from == to || legal_edges().contains(&(from, to));

        prop_assert_eq!(admitted, in_table, "Divergencia de cierre: {:?} -> {:?}", from, to);
    }
}
// FIN DEL ARCHIVO [tests/mirror/libs/domain/models/lifecycle_legality.test.rs]
