use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Estados del ciclo de vida del controlador de un worker latente
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControllerState {
    /// No workload owned for this identity
    Idle,
    /// Spec submitted, awaiting cluster acknowledgment
    Starting,
    /// Workload confirmed created
    Running,
    /// Deletion requested, awaiting confirmation
    Stopping,
    /// Workload released; a new substantiation may begin
    Stopped,
}

impl ControllerState {
    /// Valida si una transición de estado es válida según el State Machine
    ///
    /// Transiciones válidas:
    /// - Idle → Starting, Stopping
    /// - Starting → Running, Stopping, Stopped
    /// - Running → Stopping, Stopped
    /// - Stopping → Stopped
    /// - Stopped → Starting, Stopping
    pub fn can_transition_to(&self, new_state: &ControllerState) -> bool {
        match (self, new_state) {
            (s, n) if s == n => false,

            (ControllerState::Idle, ControllerState::Starting) => true,
            (ControllerState::Idle, ControllerState::Stopping) => true,

            (ControllerState::Starting, ControllerState::Running) => true,
            (ControllerState::Starting, ControllerState::Stopping) => true,
            (ControllerState::Starting, ControllerState::Stopped) => true,

            (ControllerState::Running, ControllerState::Stopping) => true,
            (ControllerState::Running, ControllerState::Stopped) => true,

            (ControllerState::Stopping, ControllerState::Stopped) => true,

            (ControllerState::Stopped, ControllerState::Starting) => true,
            (ControllerState::Stopped, ControllerState::Stopping) => true,

            _ => false,
        }
    }

    /// Retorna true si el estado admite una nueva sustanciación
    pub fn can_substantiate(&self) -> bool {
        matches!(self, ControllerState::Idle | ControllerState::Stopped)
    }

    /// Retorna true si hay un workload en marcha o arrancando
    pub fn is_active(&self) -> bool {
        matches!(self, ControllerState::Starting | ControllerState::Running)
    }
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerState::Idle => write!(f, "IDLE"),
            ControllerState::Starting => write!(f, "STARTING"),
            ControllerState::Running => write!(f, "RUNNING"),
            ControllerState::Stopping => write!(f, "STOPPING"),
            ControllerState::Stopped => write!(f, "STOPPED"),
        }
    }
}

impl FromStr for ControllerState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IDLE" => Ok(ControllerState::Idle),
            "STARTING" => Ok(ControllerState::Starting),
            "RUNNING" => Ok(ControllerState::Running),
            "STOPPING" => Ok(ControllerState::Stopping),
            "STOPPED" => Ok(ControllerState::Stopped),
            _ => Err(format!("Invalid ControllerState: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_controller_state_from_str() {
        assert_eq!(
            "IDLE".parse::<ControllerState>().unwrap(),
            ControllerState::Idle
        );
        assert_eq!(
            "STARTING".parse::<ControllerState>().unwrap(),
            ControllerState::Starting
        );
        assert_eq!(
            "RUNNING".parse::<ControllerState>().unwrap(),
            ControllerState::Running
        );
        assert_eq!(
            "STOPPING".parse::<ControllerState>().unwrap(),
            ControllerState::Stopping
        );
        assert_eq!(
            "STOPPED".parse::<ControllerState>().unwrap(),
            ControllerState::Stopped
        );

        assert!("INVALID".parse::<ControllerState>().is_err());
    }

    #[test]
    fn test_valid_transitions_from_idle() {
        assert!(ControllerState::Idle.can_transition_to(&ControllerState::Starting));
        assert!(ControllerState::Idle.can_transition_to(&ControllerState::Stopping));
        assert!(!ControllerState::Idle.can_transition_to(&ControllerState::Running));
        assert!(!ControllerState::Idle.can_transition_to(&ControllerState::Idle));
    }

    #[test]
    fn test_valid_transitions_from_starting() {
        assert!(ControllerState::Starting.can_transition_to(&ControllerState::Running));
        assert!(ControllerState::Starting.can_transition_to(&ControllerState::Stopped));
        assert!(ControllerState::Starting.can_transition_to(&ControllerState::Stopping));
        assert!(!ControllerState::Starting.can_transition_to(&ControllerState::Idle));
    }

    #[test]
    fn test_valid_transitions_from_running() {
        assert!(ControllerState::Running.can_transition_to(&ControllerState::Stopping));
        assert!(ControllerState::Running.can_transition_to(&ControllerState::Stopped));
        assert!(!ControllerState::Running.can_transition_to(&ControllerState::Starting));
    }

    #[test]
    fn test_stopped_allows_resubstantiation() {
        assert!(ControllerState::Stopped.can_transition_to(&ControllerState::Starting));
        assert!(ControllerState::Stopped.can_substantiate());
        assert!(ControllerState::Idle.can_substantiate());
        assert!(!ControllerState::Running.can_substantiate());
        assert!(!ControllerState::Stopping.can_substantiate());
    }

    #[test]
    fn test_is_active() {
        assert!(ControllerState::Starting.is_active());
        assert!(ControllerState::Running.is_active());
        assert!(!ControllerState::Idle.is_active());
        assert!(!ControllerState::Stopped.is_active());
    }

    #[test]
    fn test_no_transitions_back_to_idle() {
        for state in [
            ControllerState::Starting,
            ControllerState::Running,
            ControllerState::Stopping,
            ControllerState::Stopped,
        ] {
            assert!(!state.can_transition_to(&ControllerState::Idle));
        }
    }
}
