pub mod state;
pub mod store;
pub mod turn;

pub use state::{TurnPhase, TurnStateMachine};
pub use store::{Session, SessionConfig, SessionStore};
pub use turn::{Role, Turn};
