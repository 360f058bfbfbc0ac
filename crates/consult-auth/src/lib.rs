//! Admission for teleconsultation sessions.
//!
//! This crate provides:
//! - Credential persistence with purge-on-read expiry
//! - Structural identity resolution from the credential payload
//! - Single-flight access grant brokering, scoped to one page session
//! - An explicit FSM-based admission gate
//! - Authenticate-by-code login and a REST backend client

mod admission_fsm;
mod backend;
mod broker;
mod credential;
mod error;
mod gate;
mod http_backend;
mod identity;
mod login;
mod page_session;

pub use admission_fsm::admission_machine;
pub use admission_fsm::{AdmissionMachine, AdmissionMachineInput, AdmissionMachineState};
pub use backend::{AuthenticateResponse, ConsultBackend, GrantResponse, UserProfile};
pub use broker::{AccessGrant, AccessTokenBroker, BrokerState, DenialReason, GrantOutcome};
pub use credential::{Credential, CredentialStore};
pub use error::{AuthError, AuthResult};
pub use gate::{
    AdmissionAction, AdmissionGate, AdmissionState, AdmissionView, CheckTicket, LABEL_CHECKING,
    LABEL_CHECKOUT, LABEL_START,
};
pub use http_backend::HttpBackend;
pub use identity::{get_subject_id, subject_from_token};
pub use login::{LoginFlow, LoginOutcome};
pub use page_session::PageSession;
