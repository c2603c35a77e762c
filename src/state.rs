use crate::session::PendingAnswer;

/// Where a user is in the quiz. Derived from the session store on every
/// message and never stored itself: no key means no pending question.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    NoPendingQuestion,
    AwaitingAnswer {
        answer: String,
    },
}

impl From<Option<PendingAnswer>> for SessionState {
    fn from(pending: Option<PendingAnswer>) -> Self {
        match pending {
            Some(pending) => Self::AwaitingAnswer {
                answer: pending.into_answer(),
            },
            None => Self::NoPendingQuestion,
        }
    }
}
