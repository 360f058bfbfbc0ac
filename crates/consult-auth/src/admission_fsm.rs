//! Admission state machine using rust-fsm.
//!
//! ## State Diagram
//!
//! ```text
//! ┌─────────────────┐
//! │    Checking     │ (initial)
//! └────────┬────────┘
//!          │
//!    ┌─────┴───────────────┐
//!    │ GrantIssued         │ CheckFailed
//!    ▼                     ▼
//! ┌───────────┐       ┌───────────┐
//! │  Granted  │       │  Denied   │
//! └─────┬─────┘       └─────┬─────┘
//!       │ Recheck           │ Recheck
//!       └────────► Checking ◄┘
//! ```

use rust_fsm::*;

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub admission_machine(Checking)

    Checking => {
        GrantIssued => Granted,
        CheckFailed => Denied
    },
    Granted => {
        Recheck => Checking,
        // Logout or credential invalidation while the grant is held
        CheckFailed => Denied
    },
    Denied => {
        Recheck => Checking
    }
}

pub use admission_machine::Input as AdmissionMachineInput;
pub use admission_machine::State as AdmissionMachineState;
pub use admission_machine::StateMachine as AdmissionMachine;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_checking() {
        let machine = AdmissionMachine::new();
        assert_eq!(*machine.state(), AdmissionMachineState::Checking);
    }

    #[test]
    fn test_checking_resolves_to_granted_or_denied() {
        let mut machine = AdmissionMachine::new();
        machine.consume(&AdmissionMachineInput::GrantIssued).unwrap();
        assert_eq!(*machine.state(), AdmissionMachineState::Granted);

        let mut machine = AdmissionMachine::new();
        machine.consume(&AdmissionMachineInput::CheckFailed).unwrap();
        assert_eq!(*machine.state(), AdmissionMachineState::Denied);
    }

    #[test]
    fn test_recheck_returns_to_checking() {
        let mut machine = AdmissionMachine::new();
        machine.consume(&AdmissionMachineInput::CheckFailed).unwrap();
        machine.consume(&AdmissionMachineInput::Recheck).unwrap();
        assert_eq!(*machine.state(), AdmissionMachineState::Checking);
    }

    #[test]
    fn test_denied_cannot_jump_to_granted() {
        let mut machine = AdmissionMachine::new();
        machine.consume(&AdmissionMachineInput::CheckFailed).unwrap();

        assert!(machine.consume(&AdmissionMachineInput::GrantIssued).is_err());
        assert_eq!(*machine.state(), AdmissionMachineState::Denied);
    }

    #[test]
    fn test_checking_cannot_recheck() {
        let mut machine = AdmissionMachine::new();
        assert!(machine.consume(&AdmissionMachineInput::Recheck).is_err());
    }
}
