use std::fmt;

use formpilot_core::RegistrationRequest;

use crate::messages;
use crate::validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingFirstName,
    AwaitingLastName,
    AwaitingEmail,
    AwaitingPassword,
    Done,
    Cancelled,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Done | SessionState::Cancelled)
    }

    /// Prompt shown when the state is entered.
    pub fn prompt(self) -> Option<&'static str> {
        match self {
            SessionState::AwaitingFirstName => Some(messages::ASK_FIRST_NAME),
            SessionState::AwaitingLastName => Some(messages::ASK_LAST_NAME),
            SessionState::AwaitingEmail => Some(messages::ASK_EMAIL),
            SessionState::AwaitingPassword => Some(messages::ASK_PASSWORD),
            SessionState::Done | SessionState::Cancelled => None,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::AwaitingFirstName => "awaiting_first_name",
            SessionState::AwaitingLastName => "awaiting_last_name",
            SessionState::AwaitingEmail => "awaiting_email",
            SessionState::AwaitingPassword => "awaiting_password",
            SessionState::Done => "done",
            SessionState::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

#[derive(Default)]
struct Draft {
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
}

/// What the collector should do with one free-text turn.
#[derive(Debug, PartialEq, Eq)]
pub enum Step {
    /// Input rejected; state unchanged.
    Reprompt(&'static str),
    /// Input stored; ask for the next field.
    Advance(&'static str),
    /// All four fields collected. Call [`Conversation::finish`] once the
    /// registration has been reported.
    Ready(RegistrationRequest),
    /// Conversation is over; the input is dropped.
    Ignored,
}

/// One registration dialogue, created by `/new`.
pub struct Conversation {
    state: SessionState,
    draft: Draft,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            state: SessionState::AwaitingFirstName,
            draft: Draft::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn accept(&mut self, text: &str) -> Step {
        match self.state {
            SessionState::AwaitingFirstName => match validate::name(text) {
                Ok(name) => {
                    self.draft.first_name = Some(name);
                    self.advance(SessionState::AwaitingLastName)
                }
                Err(rejection) => Step::Reprompt(messages::reprompt(rejection, true)),
            },
            SessionState::AwaitingLastName => match validate::name(text) {
                Ok(name) => {
                    self.draft.last_name = Some(name);
                    self.advance(SessionState::AwaitingEmail)
                }
                Err(rejection) => Step::Reprompt(messages::reprompt(rejection, false)),
            },
            SessionState::AwaitingEmail => match validate::email(text) {
                Ok(email) => {
                    self.draft.email = Some(email);
                    self.advance(SessionState::AwaitingPassword)
                }
                Err(rejection) => Step::Reprompt(messages::reprompt(rejection, false)),
            },
            SessionState::AwaitingPassword => match validate::password(text) {
                Ok(password) => match self.request(password) {
                    Some(request) => Step::Ready(request),
                    None => Step::Ignored,
                },
                Err(rejection) => Step::Reprompt(messages::reprompt(rejection, false)),
            },
            SessionState::Done | SessionState::Cancelled => Step::Ignored,
        }
    }

    /// The registration for this conversation has been reported.
    pub fn finish(&mut self) {
        if self.state == SessionState::AwaitingPassword {
            self.state = SessionState::Done;
        }
    }

    /// Abort. Returns false when the conversation was already over.
    pub fn cancel(&mut self) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.state = SessionState::Cancelled;
        self.draft = Draft::default();
        true
    }

    fn advance(&mut self, next: SessionState) -> Step {
        self.state = next;
        match next.prompt() {
            Some(prompt) => Step::Advance(prompt),
            None => Step::Ignored,
        }
    }

    fn request(&self, password: String) -> Option<RegistrationRequest> {
        Some(RegistrationRequest {
            first_name: self.draft.first_name.clone()?,
            last_name: self.draft.last_name.clone()?,
            email: self.draft.email.clone()?,
            password,
        })
    }
}
