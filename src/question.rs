use std::fmt;

/// One question/answer pair from the corpus. Identity is positional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionRecord {
    question: String,
    answer: String,
}

impl fmt::Display for QuestionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.question(), self.answer())
    }
}

impl QuestionRecord {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }
}
