use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::{
    corpus::QuestionStore,
    error::QuizError,
    matcher::is_correct_answer,
    session::{PendingAnswer, SessionKey, Sessions},
    state::SessionState,
};

pub const NEW_QUESTION_BUTTON: &str = "Новый вопрос";
pub const SURRENDER_BUTTON: &str = "Сдаться";
pub const SCORE_BUTTON: &str = "Мой счёт";

pub const GREETING: &str = "Привет! Я бот для викторин";
pub const NOTHING_TO_SURRENDER: &str = "Сначала задай мне вопрос 🙂";
pub const SCORE_PLACEHOLDER: &str = "Скоро будет... 😉";
pub const ASK_QUESTION_FIRST: &str = "Сначала запроси новый вопрос 😉";
pub const CORRECT_ANSWER: &str =
    "Правильно! Поздравляю! 🎉 Для следующего вопроса нажми «Новый вопрос»";
pub const INCORRECT_ANSWER: &str = "Неправильно… 😢 Попробуй ещё раз или нажми «Сдаться».";
pub const NO_QUESTIONS: &str = "Вопросы сейчас недоступны 😔";
pub const APOLOGY: &str = "Что-то пошло не так, попробуй ещё раз чуть позже 🙏";

/// Platform-independent meaning of an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Start,
    NewQuestion,
    Surrender,
    ScoreRequest,
    Text(String),
}

impl Intent {
    /// Maps the trigger strings shared by every platform. Anything unknown is
    /// a guess.
    pub fn from_text(text: &str) -> Self {
        match text.trim() {
            NEW_QUESTION_BUTTON => Self::NewQuestion,
            SURRENDER_BUTTON => Self::Surrender,
            SCORE_BUTTON => Self::ScoreRequest,
            "/start" | "Начать" => Self::Start,
            _ => Self::Text(text.to_owned()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub show_keyboard: bool,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            show_keyboard: false,
        }
    }

    pub fn with_keyboard(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            show_keyboard: true,
        }
    }
}

/// The quiz state machine, shared by every adapter of one platform.
///
/// Holds no per-user state of its own: the current [`SessionState`] is read
/// from [`Sessions`] on every call.
pub struct QuizController {
    platform: String,
    questions: Arc<QuestionStore>,
    sessions: Sessions,
}

impl QuizController {
    pub fn new(
        platform: impl Into<String>,
        questions: Arc<QuestionStore>,
        sessions: Sessions,
    ) -> Self {
        Self {
            platform: platform.into(),
            questions,
            sessions,
        }
    }

    pub fn platform(&self) -> &str {
        &self.platform
    }

    fn session_key(&self, user_id: &str) -> SessionKey {
        SessionKey::new(&self.platform, user_id)
    }

    pub async fn state(&self, user_id: &str) -> Result<SessionState, QuizError> {
        self.state_of(&self.session_key(user_id)).await
    }

    async fn state_of(&self, key: &SessionKey) -> Result<SessionState, QuizError> {
        Ok(self.sessions.pending(key).await?.into())
    }

    #[instrument(level = "debug", skip(self), fields(platform = %self.platform))]
    pub async fn handle(&self, user_id: &str, intent: Intent) -> Result<Reply, QuizError> {
        let key = self.session_key(user_id);

        match intent {
            Intent::Start => {
                self.sessions.clear(&key).await?;
                Ok(Reply::with_keyboard(GREETING))
            }
            Intent::NewQuestion => self.ask_new_question(user_id, &key).await,
            Intent::Surrender => match self.state_of(&key).await? {
                SessionState::AwaitingAnswer { answer } => {
                    info!("{user_id} surrenders");
                    self.sessions.clear(&key).await?;
                    Ok(Reply::text(format!("Правильный ответ: {answer}")))
                }
                SessionState::NoPendingQuestion => Ok(Reply::text(NOTHING_TO_SURRENDER)),
            },
            Intent::ScoreRequest => Ok(Reply::text(SCORE_PLACEHOLDER)),
            Intent::Text(guess) => match self.state_of(&key).await? {
                // An empty guess is contained in every answer.
                SessionState::AwaitingAnswer { .. } if guess.trim().is_empty() => {
                    Ok(Reply::text(INCORRECT_ANSWER))
                }
                SessionState::AwaitingAnswer { answer } => {
                    let correct = is_correct_answer(&guess, &answer);
                    info!("{user_id} answers '{guess}'. Correctness: {correct}");
                    if correct {
                        self.sessions.clear(&key).await?;
                        Ok(Reply::text(CORRECT_ANSWER))
                    } else {
                        Ok(Reply::text(INCORRECT_ANSWER))
                    }
                }
                SessionState::NoPendingQuestion => Ok(Reply::text(ASK_QUESTION_FIRST)),
            },
        }
    }

    async fn ask_new_question(&self, user_id: &str, key: &SessionKey) -> Result<Reply, QuizError> {
        let record = match self.questions.pick_random() {
            Ok(record) => record,
            Err(QuizError::EmptyCorpus) => {
                warn!("{user_id} asked for a question but the corpus is empty");
                return Ok(Reply::text(NO_QUESTIONS));
            }
            Err(e) => return Err(e),
        };

        info!("{user_id}: asking question '{}'", record.question());
        self.sessions
            .set_pending(key, &PendingAnswer::new(record.answer()))
            .await?;
        Ok(Reply::text(record.question()))
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::{
        question::QuestionRecord,
        session::{memory::InMemoryStore, KeyValueStore},
    };

    fn controller_with(records: Vec<QuestionRecord>) -> (QuizController, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let controller = QuizController::new(
            "tg",
            Arc::new(QuestionStore::from_records(records)),
            Sessions::new(store.clone()),
        );
        (controller, store)
    }

    fn single_question() -> Vec<QuestionRecord> {
        vec![QuestionRecord::new("Столица Франции?", "Париж")]
    }

    struct UnavailableStore;

    #[async_trait]
    impl KeyValueStore for UnavailableStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, QuizError> {
            Err(QuizError::session_store("connection refused"))
        }

        async fn set(&self, _key: &str, _value: &str) -> Result<(), QuizError> {
            Err(QuizError::session_store("connection refused"))
        }

        async fn delete(&self, _key: &str) -> Result<(), QuizError> {
            Err(QuizError::session_store("connection refused"))
        }
    }

    #[test]
    fn trigger_strings_map_to_intents() {
        assert_eq!(Intent::from_text("Новый вопрос"), Intent::NewQuestion);
        assert_eq!(Intent::from_text(" Сдаться "), Intent::Surrender);
        assert_eq!(Intent::from_text("Мой счёт"), Intent::ScoreRequest);
        assert_eq!(Intent::from_text("/start"), Intent::Start);
        assert_eq!(Intent::from_text("Начать"), Intent::Start);
        assert_eq!(
            Intent::from_text("новый вопрос?"),
            Intent::Text("новый вопрос?".to_owned())
        );
    }

    #[tokio::test]
    async fn start_greets_with_keyboard_and_clears_pending() {
        let (controller, store) = controller_with(single_question());
        controller.handle("1", Intent::NewQuestion).await.unwrap();

        let reply = controller.handle("1", Intent::Start).await.unwrap();

        assert_eq!(reply, Reply::with_keyboard(GREETING));
        assert!(store.is_empty());
        assert_eq!(
            controller.state("1").await.unwrap(),
            SessionState::NoPendingQuestion
        );
    }

    #[tokio::test]
    async fn text_without_pending_question_leaves_store_alone() {
        let (controller, store) = controller_with(single_question());

        let reply = controller
            .handle("1", Intent::Text("Париж".into()))
            .await
            .unwrap();

        assert_eq!(reply, Reply::text(ASK_QUESTION_FIRST));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn new_question_stores_the_chosen_answer() {
        let (controller, store) = controller_with(single_question());

        let reply = controller.handle("1", Intent::NewQuestion).await.unwrap();

        assert_eq!(reply, Reply::text("Столица Франции?"));
        assert_eq!(
            controller.state("1").await.unwrap(),
            SessionState::AwaitingAnswer {
                answer: "Париж".into()
            }
        );
        assert_eq!(
            store.get("tg-quiz:1:answer").await.unwrap().as_deref(),
            Some("Париж")
        );
    }

    #[tokio::test]
    async fn second_new_question_overwrites_the_first() {
        let (controller, _store) = controller_with(vec![
            QuestionRecord::new("Столица Франции?", "Париж"),
            QuestionRecord::new("Столица Италии?", "Рим"),
        ]);

        let first = controller.handle("1", Intent::NewQuestion).await.unwrap();
        let second = controller.handle("1", Intent::NewQuestion).await.unwrap();
        let expected = if second.text == "Столица Франции?" {
            "Париж"
        } else {
            "Рим"
        };
        assert!(!first.text.is_empty());

        let reply = controller.handle("1", Intent::Surrender).await.unwrap();

        assert_eq!(reply.text, format!("Правильный ответ: {expected}"));
        assert_eq!(
            controller.state("1").await.unwrap(),
            SessionState::NoPendingQuestion
        );
    }

    #[tokio::test]
    async fn wrong_guess_keeps_question_pending() {
        let (controller, _store) = controller_with(single_question());
        controller.handle("1", Intent::NewQuestion).await.unwrap();

        let reply = controller
            .handle("1", Intent::Text("Лондон".into()))
            .await
            .unwrap();

        assert_eq!(reply, Reply::text(INCORRECT_ANSWER));
        assert!(matches!(
            controller.state("1").await.unwrap(),
            SessionState::AwaitingAnswer { .. }
        ));
    }

    #[tokio::test]
    async fn blank_guess_is_never_correct() {
        let (controller, store) = controller_with(single_question());
        controller.handle("1", Intent::NewQuestion).await.unwrap();

        for blank in ["", "   ", "\u{3000}", "\n\t"] {
            let reply = controller.handle("1", Intent::from_text(blank)).await.unwrap();
            assert_eq!(reply, Reply::text(INCORRECT_ANSWER), "{blank:?}");
        }

        assert_eq!(
            store.get("tg-quiz:1:answer").await.unwrap().as_deref(),
            Some("Париж")
        );
    }

    #[tokio::test]
    async fn surrender_without_pending_question() {
        let (controller, store) = controller_with(single_question());

        let reply = controller.handle("1", Intent::Surrender).await.unwrap();

        assert_eq!(reply, Reply::text(NOTHING_TO_SURRENDER));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn score_request_is_a_placeholder_in_both_states() {
        let (controller, _store) = controller_with(single_question());

        let idle = controller.handle("1", Intent::ScoreRequest).await.unwrap();
        controller.handle("1", Intent::NewQuestion).await.unwrap();
        let busy = controller.handle("1", Intent::ScoreRequest).await.unwrap();

        assert_eq!(idle, Reply::text(SCORE_PLACEHOLDER));
        assert_eq!(busy, Reply::text(SCORE_PLACEHOLDER));
        assert!(matches!(
            controller.state("1").await.unwrap(),
            SessionState::AwaitingAnswer { .. }
        ));
    }

    #[tokio::test]
    async fn users_do_not_share_sessions() {
        let (controller, _store) = controller_with(single_question());
        controller.handle("1", Intent::NewQuestion).await.unwrap();

        let reply = controller
            .handle("2", Intent::Text("Париж".into()))
            .await
            .unwrap();

        assert_eq!(reply, Reply::text(ASK_QUESTION_FIRST));
    }

    #[tokio::test]
    async fn empty_corpus_does_not_touch_the_session() {
        let (controller, store) = controller_with(Vec::new());

        let reply = controller.handle("1", Intent::NewQuestion).await.unwrap();

        assert_eq!(reply, Reply::text(NO_QUESTIONS));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn unavailable_store_surfaces_as_error() {
        let controller = QuizController::new(
            "vk",
            Arc::new(QuestionStore::from_records(single_question())),
            Sessions::new(Arc::new(UnavailableStore)),
        );

        let err = controller
            .handle("1", Intent::Text("Париж".into()))
            .await
            .unwrap_err();

        assert!(matches!(err, QuizError::SessionStoreUnavailable(_)));
    }
}
