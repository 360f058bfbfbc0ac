//! Session admission gate.
//!
//! Folds the outcome of the identity/grant chain into a binary access
//! decision. Fail-closed: anything other than a backend-issued grant ends
//! in `Denied`. Each check is tagged with a ticket; an outcome carrying a
//! ticket older than the latest check is discarded, so a slow lookup can
//! never overwrite a newer decision.

use crate::admission_fsm::{AdmissionMachine, AdmissionMachineInput, AdmissionMachineState};
use crate::broker::{AccessGrant, DenialReason, GrantOutcome};
use crate::{AuthError, AuthResult};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Label shown on the consultation action once admitted.
pub const LABEL_START: &str = "Iniciar Consulta";
/// Label shown on the checkout action when admission is denied.
pub const LABEL_CHECKOUT: &str = "Contratar Consulta";
/// Label shown while the check is running.
pub const LABEL_CHECKING: &str = "Verificando…";

/// Observable admission state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionState {
    Checking,
    Granted(AccessGrant),
    Denied(DenialReason),
}

impl AdmissionState {
    pub fn is_granted(&self) -> bool {
        matches!(self, AdmissionState::Granted(_))
    }

    pub fn grant(&self) -> Option<&AccessGrant> {
        match self {
            AdmissionState::Granted(grant) => Some(grant),
            _ => None,
        }
    }
}

/// What the page should render for the consultation action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionAction {
    /// Spinner; no action available yet.
    Wait,
    /// Open the consultation window.
    StartConsultation,
    /// Route to checkout.
    Checkout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AdmissionView {
    pub action: AdmissionAction,
    pub label: &'static str,
}

impl From<&AdmissionState> for AdmissionView {
    fn from(state: &AdmissionState) -> Self {
        match state {
            AdmissionState::Checking => AdmissionView {
                action: AdmissionAction::Wait,
                label: LABEL_CHECKING,
            },
            AdmissionState::Granted(_) => AdmissionView {
                action: AdmissionAction::StartConsultation,
                label: LABEL_START,
            },
            // Every denial reason renders identically.
            AdmissionState::Denied(_) => AdmissionView {
                action: AdmissionAction::Checkout,
                label: LABEL_CHECKOUT,
            },
        }
    }
}

/// Identifies one admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckTicket(u64);

struct GateInner {
    fsm: AdmissionMachine,
    state: AdmissionState,
    generation: u64,
}

/// Admission gate for one page session.
pub struct AdmissionGate {
    inner: Mutex<GateInner>,
}

impl Default for AdmissionGate {
    fn default() -> Self {
        Self::new()
    }
}

impl AdmissionGate {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(GateInner {
                fsm: AdmissionMachine::new(),
                state: AdmissionState::Checking,
                generation: 0,
            }),
        }
    }

    pub fn state(&self) -> AdmissionState {
        self.inner.lock().state.clone()
    }

    pub fn view(&self) -> AdmissionView {
        AdmissionView::from(&self.inner.lock().state)
    }

    /// Enter `Checking` and hand out the ticket the outcome must carry.
    pub fn begin_check(&self) -> CheckTicket {
        let mut inner = self.inner.lock();
        if *inner.fsm.state() != AdmissionMachineState::Checking {
            if let Err(err) = transition(&mut inner.fsm, &AdmissionMachineInput::Recheck) {
                warn!(error = %err, "Admission recheck rejected");
            }
        }
        inner.state = AdmissionState::Checking;
        inner.generation += 1;
        debug!(generation = inner.generation, "Admission check started");
        CheckTicket(inner.generation)
    }

    /// Apply the outcome of the check identified by `ticket`.
    ///
    /// Outcomes from superseded checks are dropped and the current state is
    /// returned unchanged.
    pub fn resolve(&self, ticket: CheckTicket, outcome: GrantOutcome) -> AdmissionState {
        let mut inner = self.inner.lock();
        if ticket.0 != inner.generation || *inner.fsm.state() != AdmissionMachineState::Checking {
            debug!(
                ticket = ticket.0,
                generation = inner.generation,
                "Discarding stale admission outcome"
            );
            return inner.state.clone();
        }

        let (input, next) = match outcome {
            GrantOutcome::Granted(grant) => {
                (AdmissionMachineInput::GrantIssued, AdmissionState::Granted(grant))
            }
            GrantOutcome::Denied(reason) => {
                (AdmissionMachineInput::CheckFailed, AdmissionState::Denied(reason))
            }
        };

        match transition(&mut inner.fsm, &input) {
            Ok(()) => inner.state = next,
            Err(err) => {
                warn!(error = %err, "Admission outcome rejected, denying");
                inner.state = AdmissionState::Denied(DenialReason::SessionClosed);
            }
        }

        match &inner.state {
            AdmissionState::Granted(_) => info!("Admission granted"),
            AdmissionState::Denied(reason) => info!(reason = ?reason, "Admission denied"),
            AdmissionState::Checking => {}
        }
        inner.state.clone()
    }

    /// Force a denial, invalidating any check still in flight.
    pub fn deny(&self, reason: DenialReason) -> AdmissionState {
        let mut inner = self.inner.lock();
        inner.generation += 1;
        if *inner.fsm.state() != AdmissionMachineState::Denied {
            if let Err(err) = transition(&mut inner.fsm, &AdmissionMachineInput::CheckFailed) {
                warn!(error = %err, "Forced denial rejected by admission machine");
            }
        }
        inner.state = AdmissionState::Denied(reason);
        info!(reason = ?reason, "Admission denied");
        inner.state.clone()
    }
}

fn transition(fsm: &mut AdmissionMachine, input: &AdmissionMachineInput) -> AuthResult<()> {
    fsm.consume(input).map(|_| ()).map_err(|_| {
        AuthError::InvalidStateTransition(format!(
            "Cannot apply {:?} in state {:?}",
            input,
            fsm.state()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn grant(token: &str) -> AccessGrant {
        AccessGrant {
            token: token.to_string(),
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn test_starts_checking_with_wait_view() {
        let gate = AdmissionGate::new();
        assert_eq!(gate.state(), AdmissionState::Checking);
        assert_eq!(gate.view().label, LABEL_CHECKING);
        assert_eq!(gate.view().action, AdmissionAction::Wait);
    }

    #[test]
    fn test_grant_resolves_to_granted() {
        let gate = AdmissionGate::new();
        let ticket = gate.begin_check();

        let state = gate.resolve(ticket, GrantOutcome::Granted(grant("abc")));

        assert_eq!(state.grant().map(|g| g.token.as_str()), Some("abc"));
        assert_eq!(gate.view().label, LABEL_START);
    }

    #[test]
    fn test_every_denial_renders_checkout() {
        for reason in [
            DenialReason::NoCredential,
            DenialReason::NoIdentity,
            DenialReason::IdentityLookupFailed,
            DenialReason::GrantFetchFailed,
        ] {
            let gate = AdmissionGate::new();
            let ticket = gate.begin_check();
            gate.resolve(ticket, GrantOutcome::Denied(reason));

            assert_eq!(gate.view().label, LABEL_CHECKOUT);
            assert_eq!(gate.view().action, AdmissionAction::Checkout);
        }
    }

    #[test]
    fn test_stale_outcome_is_discarded() {
        let gate = AdmissionGate::new();
        let old = gate.begin_check();
        let new = gate.begin_check();

        gate.resolve(new, GrantOutcome::Denied(DenialReason::GrantFetchFailed));
        let state = gate.resolve(old, GrantOutcome::Granted(grant("late")));

        assert_eq!(state, AdmissionState::Denied(DenialReason::GrantFetchFailed));
    }

    #[test]
    fn test_outcome_resolves_only_once() {
        let gate = AdmissionGate::new();
        let ticket = gate.begin_check();

        gate.resolve(ticket, GrantOutcome::Granted(grant("abc")));
        let state = gate.resolve(ticket, GrantOutcome::Denied(DenialReason::GrantFetchFailed));

        assert!(state.is_granted());
    }

    #[test]
    fn test_recheck_after_denial() {
        let gate = AdmissionGate::new();
        let first = gate.begin_check();
        gate.resolve(first, GrantOutcome::Denied(DenialReason::NoCredential));

        let second = gate.begin_check();
        assert_eq!(gate.state(), AdmissionState::Checking);
        assert!(gate.resolve(second, GrantOutcome::Granted(grant("abc"))).is_granted());
    }

    #[test]
    fn test_forced_denial_drops_in_flight_check() {
        let gate = AdmissionGate::new();
        let ticket = gate.begin_check();

        gate.deny(DenialReason::SessionClosed);
        let state = gate.resolve(ticket, GrantOutcome::Granted(grant("abc")));

        assert_eq!(state, AdmissionState::Denied(DenialReason::SessionClosed));
    }

    #[test]
    fn test_forced_denial_revokes_grant() {
        let gate = AdmissionGate::new();
        let ticket = gate.begin_check();
        gate.resolve(ticket, GrantOutcome::Granted(grant("abc")));

        gate.deny(DenialReason::NoCredential);
        assert_eq!(gate.view().label, LABEL_CHECKOUT);
    }
}
