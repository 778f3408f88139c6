//! Authentication attempt lifecycle, from form submission to session.

mod phase;

use std::sync::Arc;

use rand::RngCore;

use crate::backend::{Session, SessionBackend};
use crate::code::{CodeEntry, EntryEvent};
use crate::config::Configuration;
use crate::countdown::Countdown;
use crate::error::{AuthError, Result, SessionError, ValidationError};
use crate::forms::{LoginForm, SignupForm};
use crate::phone::PhoneNumber;
use crate::provider::{
    AntiAbuseToken, ChallengeHandle, Credential, IdentityProof, IdentityProvider, MountPoint,
};
use crate::storage::{self, SessionStore};

pub use phase::Phase;

/// One keystroke forwarded from the host's code entry widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Backspace,
}

/// Terminal result of a successful attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A session was established and persisted; the user is signed in.
    LoggedIn { session: Session },
    /// The account was registered; the user signs in from the login
    /// form afterwards.
    Registered { user_id: String },
}

/// What the attempt is trying to achieve.
enum Flow {
    Login {
        /// Profile snapshot returned by the pre-check, persisted next
        /// to the session on success.
        profile: Option<serde_json::Value>,
    },
    Signup {
        form: SignupForm,
    },
}

/// A single authentication attempt.
///
/// The attempt owns every transient handle of the flow: the anti-abuse
/// token, the outstanding challenge, the code entry, the resend
/// countdown and, for logins, the pre-checked credential. Dropping or
/// abandoning the attempt releases all of them.
pub struct AuthAttempt {
    attempt_id: String,
    config: Arc<Configuration>,
    provider: Arc<dyn IdentityProvider>,
    backend: Arc<dyn SessionBackend>,
    storage: Arc<dyn SessionStore>,
    mount: MountPoint,
    flow: Flow,
    phase: Phase,
    /// Verified subject of the attempt. Known up front for signups,
    /// learned from the pre-check for logins.
    identity: Option<PhoneNumber>,
    /// Credential held between pre-check and session establishment.
    pending_credential: Option<Credential>,
    anti_abuse_token: Option<AntiAbuseToken>,
    challenge_handle: Option<ChallengeHandle>,
    code: CodeEntry,
    countdown: Option<Countdown>,
    last_error: Option<String>,
}

impl AuthAttempt {
    /// Build a login attempt from a validated form.
    ///
    /// # Errors
    /// Returns [`ValidationError`] when the form does not validate.
    pub(crate) fn login(
        config: Arc<Configuration>,
        provider: Arc<dyn IdentityProvider>,
        backend: Arc<dyn SessionBackend>,
        storage: Arc<dyn SessionStore>,
        form: LoginForm,
    ) -> Result<Self> {
        let form = form.validated()?;
        let credential = Credential::new(form.email, form.password);

        Ok(Self::new(
            config,
            provider,
            backend,
            storage,
            Flow::Login { profile: None },
            None,
            Some(credential),
        ))
    }

    /// Build a signup attempt from a validated form.
    ///
    /// # Errors
    /// Returns [`ValidationError`] when the form does not validate or
    /// the phone number cannot be assembled.
    pub(crate) fn signup(
        config: Arc<Configuration>,
        provider: Arc<dyn IdentityProvider>,
        backend: Arc<dyn SessionBackend>,
        storage: Arc<dyn SessionStore>,
        form: SignupForm,
    ) -> Result<Self> {
        let form = form.validated()?;
        let identity = form.phone()?;

        Ok(Self::new(
            config,
            provider,
            backend,
            storage,
            Flow::Signup { form },
            Some(identity),
            None,
        ))
    }

    fn new(
        config: Arc<Configuration>,
        provider: Arc<dyn IdentityProvider>,
        backend: Arc<dyn SessionBackend>,
        storage: Arc<dyn SessionStore>,
        flow: Flow,
        identity: Option<PhoneNumber>,
        pending_credential: Option<Credential>,
    ) -> Self {
        let mount = MountPoint::new(config.provider.mount_point.as_str());

        Self {
            attempt_id: generate_attempt_id(),
            config,
            provider,
            backend,
            storage,
            mount,
            flow,
            phase: Phase::Idle,
            identity,
            pending_credential,
            anti_abuse_token: None,
            challenge_handle: None,
            code: CodeEntry::new(),
            countdown: None,
            last_error: None,
        }
    }

    /// Run the flow up to the first code entry.
    ///
    /// Logins pre-check the credential before any challenge is issued;
    /// signups go straight to issuance. On failure the attempt returns
    /// to [`Phase::Idle`] and can be started again.
    pub async fn start(&mut self) -> Result<()> {
        if self.phase != Phase::Idle {
            return Err(ValidationError::AlreadyStarted.into());
        }
        self.last_error = None;

        if matches!(self.flow, Flow::Login { .. }) {
            self.set_phase(Phase::PrecheckPending);
            if let Err(err) = self.precheck().await {
                self.set_phase(Phase::Idle);
                return Err(self.surface(err));
            }
        }

        self.issue_challenge(Phase::Idle).await
    }

    /// Forward one keystroke to the code entry.
    ///
    /// Storing a digit into the last slot submits automatically; the
    /// returned outcome is `Some` only when the attempt just succeeded.
    pub async fn input(&mut self, slot: usize, key: Key) -> Result<Option<Outcome>> {
        if self.phase != Phase::AwaitingCode {
            return Err(ValidationError::NoActiveChallenge.into());
        }

        // Any new keystroke clears the previous failure message.
        self.last_error = None;

        let event = match key {
            Key::Char(ch) => self.code.insert(slot, ch),
            Key::Backspace => self.code.backspace(slot),
        };

        if event == EntryEvent::Filled {
            let outcome = self.verify().await?;
            return Ok(Some(outcome));
        }

        Ok(None)
    }

    /// Submit the entered code manually.
    pub async fn submit(&mut self) -> Result<Outcome> {
        if self.phase != Phase::AwaitingCode {
            return Err(ValidationError::NoActiveChallenge.into());
        }

        self.last_error = None;
        self.verify().await
    }

    /// Re-issue the challenge once the countdown has expired.
    ///
    /// The previous anti-abuse token is retired before a new one is
    /// created; the code entry and the countdown start over.
    pub async fn resend(&mut self) -> Result<()> {
        if self.phase != Phase::AwaitingCode {
            return Err(ValidationError::NoActiveChallenge.into());
        }
        if !self.can_resend() {
            return Err(ValidationError::ResendUnavailable.into());
        }

        self.last_error = None;
        self.issue_challenge(Phase::AwaitingCode).await
    }

    /// Walk away from the attempt.
    ///
    /// Releases the provider handles, drops the pending credential and
    /// stops the countdown. No background work survives.
    pub async fn abandon(mut self) {
        tracing::debug!(
            attempt = %self.attempt_id,
            phase = ?self.phase,
            "attempt abandoned"
        );
        self.finish().await;
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Message for the failure currently shown to the user.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn code(&self) -> &CodeEntry {
        &self.code
    }

    /// Phone number the challenge is (or will be) addressed to.
    pub fn identity(&self) -> Option<&PhoneNumber> {
        self.identity.as_ref()
    }

    pub fn id(&self) -> &str {
        &self.attempt_id
    }

    /// Seconds left before a resend is allowed. Zero with no countdown.
    pub fn countdown_remaining(&self) -> u32 {
        self.countdown.as_ref().map_or(0, Countdown::remaining)
    }

    pub fn can_resend(&self) -> bool {
        self.phase == Phase::AwaitingCode
            && self.countdown.as_ref().is_none_or(Countdown::finished)
    }

    pub fn can_submit(&self) -> bool {
        self.phase == Phase::AwaitingCode && self.code.is_complete()
    }

    /// Validate the login credential against the backend and learn the
    /// phone number the second factor must be sent to.
    async fn precheck(&mut self) -> Result<()> {
        let credential = match &self.pending_credential {
            Some(credential) => credential.clone(),
            None => return Err(ValidationError::NoActiveChallenge.into()),
        };

        tracing::debug!(attempt = %self.attempt_id, "pre-checking credential");
        let precheck = self
            .backend
            .check_credentials(credential.email(), credential.password())
            .await?;

        let phone = PhoneNumber::normalize(&precheck.phone_number)?;
        if let Flow::Login { profile } = &mut self.flow {
            *profile = precheck.profile;
        }
        self.identity = Some(phone);

        Ok(())
    }

    /// Issue (or re-issue) the phone challenge.
    ///
    /// On failure every handle created along the way is retired and the
    /// phase reverts to `revert_to`.
    async fn issue_challenge(&mut self, revert_to: Phase) -> Result<()> {
        let Some(phone) = self.identity.clone() else {
            return Err(ValidationError::MalformedPhone.into());
        };

        self.set_phase(Phase::ChallengeIssuing);

        // One live token at a time: retire the previous challenge
        // before minting a replacement.
        self.release_challenge().await;

        let token = match self.provider.create_anti_abuse_token(&self.mount).await {
            Ok(token) => token,
            Err(err) => {
                self.set_phase(revert_to);
                return Err(self.surface(err.into()));
            },
        };

        match self.provider.issue_challenge(&phone, &token).await {
            Ok(handle) => {
                tracing::info!(attempt = %self.attempt_id, phone = %phone, "challenge issued");
                self.anti_abuse_token = Some(token);
                self.challenge_handle = Some(handle);
                self.code.reset();
                self.restart_countdown(self.config.resend_interval);
                self.set_phase(Phase::AwaitingCode);
                Ok(())
            },
            Err(err) => {
                self.provider.invalidate(token).await;
                self.set_phase(revert_to);
                Err(self.surface(err.into()))
            },
        }
    }

    /// Submit the assembled code and, if the provider accepts it,
    /// establish the session (login) or register the account (signup).
    async fn verify(&mut self) -> Result<Outcome> {
        let Some(code) = self.code.assemble() else {
            let err = ValidationError::IncompleteCode.into();
            return Err(self.surface(err));
        };
        let Some(handle) = self.challenge_handle.clone() else {
            let err = ValidationError::NoActiveChallenge.into();
            return Err(self.surface(err));
        };

        self.set_phase(Phase::Verifying);
        let paused = self.pause_countdown();

        let proof = match self.provider.submit_code(&handle, &code).await {
            Ok(proof) => proof,
            Err(err) => {
                // Wrong or stale code: wipe the entry, focus slot 0,
                // keep the challenge and the countdown running.
                self.code.reset();
                self.resume_countdown(paused);
                self.set_phase(Phase::AwaitingCode);
                return Err(self.surface(err.into()));
            },
        };

        self.set_phase(Phase::EstablishingSession);

        match self.establish(proof, &code).await {
            Ok(outcome) => {
                self.finish().await;
                self.set_phase(Phase::Succeeded);
                Ok(outcome)
            },
            Err(err @ AuthError::Transport { .. }) => {
                // The challenge is still outstanding; the entered code
                // survives so submission can simply be retried.
                self.resume_countdown(paused);
                self.set_phase(Phase::AwaitingCode);
                Err(self.surface(err))
            },
            Err(err) => {
                self.finish().await;
                self.set_phase(Phase::Failed);
                Err(self.surface(err))
            },
        }
    }

    /// Exchange the phone proof for the flow's end result.
    async fn establish(&self, phone_proof: IdentityProof, code: &str) -> Result<Outcome> {
        match &self.flow {
            Flow::Login { profile } => {
                let Some(credential) = self.pending_credential.as_ref() else {
                    return Err(SessionError::Reauth.into());
                };

                // The second factor gates the credential: the proof
                // exchanged with the backend comes from re-authenticating
                // the pre-checked credential, not from the phone.
                let proof = self.provider.redeem_credential(credential).await?;
                let session = self.backend.verify_code(&proof, code).await?;

                storage::persist_session(self.storage.as_ref(), &session, profile.as_ref())?;
                tracing::info!(
                    attempt = %self.attempt_id,
                    user_id = %session.user_id,
                    "session established"
                );

                Ok(Outcome::LoggedIn { session })
            },
            Flow::Signup { form } => {
                let Some(phone) = self.identity.as_ref() else {
                    return Err(ValidationError::NoActiveChallenge.into());
                };

                let registration = form.registration(phone);
                let user_id = self.backend.register(&registration, &phone_proof).await?;
                tracing::info!(attempt = %self.attempt_id, %user_id, "account registered");

                Ok(Outcome::Registered { user_id })
            },
        }
    }

    /// Release every transient handle the attempt holds.
    async fn finish(&mut self) {
        self.pending_credential = None;
        if let Some(countdown) = self.countdown.take() {
            countdown.cancel();
        }
        self.release_challenge().await;
    }

    /// Retire the live anti-abuse token and forget the challenge.
    async fn release_challenge(&mut self) {
        self.challenge_handle = None;
        if let Some(token) = self.anti_abuse_token.take() {
            self.provider.invalidate(token).await;
        }
    }

    fn restart_countdown(&mut self, seconds: u32) {
        if let Some(countdown) = self.countdown.take() {
            countdown.cancel();
        }
        self.countdown = Some(Countdown::start(seconds));
    }

    /// Stop the countdown and report how many seconds were left.
    fn pause_countdown(&mut self) -> u32 {
        self.countdown.take().map_or(0, Countdown::cancel)
    }

    fn resume_countdown(&mut self, seconds: u32) {
        self.countdown = Some(Countdown::start(seconds));
    }

    /// Record the message shown to the user and hand the error back.
    fn surface(&mut self, err: AuthError) -> AuthError {
        self.last_error = Some(err.to_string());
        err
    }

    fn set_phase(&mut self, next: Phase) {
        debug_assert!(
            self.phase.can_advance(next),
            "illegal transition {:?} -> {next:?}",
            self.phase
        );
        tracing::trace!(
            attempt = %self.attempt_id,
            from = ?self.phase,
            to = ?next,
            "phase transition"
        );
        self.phase = next;
    }
}

impl Drop for AuthAttempt {
    fn drop(&mut self) {
        // The countdown aborts itself; the anti-abuse token can only be
        // retired through `abandon`, which must be preferred.
        if self.anti_abuse_token.is_some() {
            tracing::debug!(attempt = %self.attempt_id, "dropped with a live anti-abuse token");
        }
    }
}

fn generate_attempt_id() -> String {
    let mut bytes = [0u8; 4];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
