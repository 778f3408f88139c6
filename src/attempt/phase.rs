//! Attempt phases and the legal transition table.

/// Lifecycle phase of an authentication attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    PrecheckPending,
    ChallengeIssuing,
    AwaitingCode,
    Verifying,
    EstablishingSession,
    Succeeded,
    Failed,
}

impl Phase {
    /// Terminal phases accept no further operations.
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Succeeded | Phase::Failed)
    }

    /// Whether moving from `self` to `next` is legal.
    ///
    /// Phases only advance forward, except the recoverable returns:
    /// back to `AwaitingCode` after a failed verification or
    /// establishment, back to `ChallengeIssuing` on resend, and back
    /// to the pre-challenge state when issuance fails.
    pub fn can_advance(self, next: Phase) -> bool {
        use Phase::*;

        matches!(
            (self, next),
            (Idle, PrecheckPending)
                | (Idle, ChallengeIssuing)
                | (PrecheckPending, ChallengeIssuing)
                | (PrecheckPending, Idle)
                | (ChallengeIssuing, AwaitingCode)
                | (ChallengeIssuing, Idle)
                | (AwaitingCode, Verifying)
                | (AwaitingCode, ChallengeIssuing)
                | (Verifying, EstablishingSession)
                | (Verifying, AwaitingCode)
                | (EstablishingSession, Succeeded)
                | (EstablishingSession, AwaitingCode)
                | (EstablishingSession, Failed)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Phase::*;

    const ALL: [Phase; 8] = [
        Idle,
        PrecheckPending,
        ChallengeIssuing,
        AwaitingCode,
        Verifying,
        EstablishingSession,
        Succeeded,
        Failed,
    ];

    #[test]
    fn test_forward_path_login() {
        assert!(Idle.can_advance(PrecheckPending));
        assert!(PrecheckPending.can_advance(ChallengeIssuing));
        assert!(ChallengeIssuing.can_advance(AwaitingCode));
        assert!(AwaitingCode.can_advance(Verifying));
        assert!(Verifying.can_advance(EstablishingSession));
        assert!(EstablishingSession.can_advance(Succeeded));
    }

    #[test]
    fn test_forward_path_signup_skips_precheck() {
        assert!(Idle.can_advance(ChallengeIssuing));
        assert!(!Idle.can_advance(AwaitingCode));
    }

    #[test]
    fn test_recoverable_returns() {
        // Failed pre-check shows the error and returns to the form.
        assert!(PrecheckPending.can_advance(Idle));
        // Failed issuance reverts to the pre-challenge state.
        assert!(ChallengeIssuing.can_advance(Idle));
        // Resend retires the old challenge and issues a new one.
        assert!(AwaitingCode.can_advance(ChallengeIssuing));
        // Invalid or expired code returns to entry.
        assert!(Verifying.can_advance(AwaitingCode));
        // Recoverable establishment failure returns to entry.
        assert!(EstablishingSession.can_advance(AwaitingCode));
        // Fatal session failure.
        assert!(EstablishingSession.can_advance(Failed));
    }

    #[test]
    fn test_no_backward_jumps() {
        assert!(!AwaitingCode.can_advance(Idle));
        assert!(!AwaitingCode.can_advance(PrecheckPending));
        assert!(!Verifying.can_advance(ChallengeIssuing));
        assert!(!EstablishingSession.can_advance(Verifying));
        assert!(!ChallengeIssuing.can_advance(PrecheckPending));
    }

    #[test]
    fn test_terminal_phases_accept_nothing() {
        for terminal in [Succeeded, Failed] {
            assert!(terminal.is_terminal());
            for next in ALL {
                assert!(
                    !terminal.can_advance(next),
                    "{terminal:?} must not advance to {next:?}"
                );
            }
        }
    }

    #[test]
    fn test_no_self_loops() {
        for phase in ALL {
            assert!(!phase.can_advance(phase));
        }
    }
}
