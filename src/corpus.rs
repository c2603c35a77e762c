use std::{
    borrow::Cow,
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
};

use encoding_rs::Encoding;
use rand::seq::SliceRandom;
use tracing::{info, instrument, warn};

use crate::{error::QuizError, question::QuestionRecord};

const QUESTION_PREFIX: &str = "Вопрос";
const ANSWER_PREFIX: &str = "Ответ";

/// Parses the text of one question file into question/answer pairs.
///
/// Blocks are separated by a blank line. A `Вопрос` block stages a question,
/// an `Ответ` block emits the staged pair and clears the staging buffer.
/// Any other block is ignored.
pub fn parse_questions(content: &str) -> Vec<QuestionRecord> {
    let content = content.replace("\r\n", "\n");
    let mut records = Vec::new();
    let mut staged_question: Option<String> = None;

    for block in content.trim().split("\n\n") {
        if block.starts_with(QUESTION_PREFIX) {
            staged_question = Some(field_value(block));
        } else if block.starts_with(ANSWER_PREFIX) {
            let answer = field_value(block);
            if let Some(question) = staged_question.take() {
                records.push(QuestionRecord::new(question, answer));
            }
        }
    }

    records
}

fn field_value(block: &str) -> String {
    block
        .split_once(':')
        .map(|(_, value)| value.trim())
        .unwrap_or_default()
        .to_owned()
}

/// Reads and decodes one question file.
pub fn read_question_file(path: &Path, encoding: &'static Encoding) -> Result<String, QuizError> {
    let bytes = fs::read(path).map_err(|source| QuizError::CorpusLoad {
        path: path.to_path_buf(),
        source,
    })?;

    encoding
        .decode_without_bom_handling_and_without_replacement(&bytes)
        .map(Cow::into_owned)
        .ok_or_else(|| QuizError::CorpusDecode {
            path: path.to_path_buf(),
            encoding: encoding.name(),
        })
}

/// Every question loaded at startup. Never mutated after construction.
#[derive(Debug, Clone, Default)]
pub struct QuestionStore {
    questions: Vec<QuestionRecord>,
}

impl QuestionStore {
    pub fn from_records(questions: Vec<QuestionRecord>) -> Self {
        Self { questions }
    }

    /// Loads every `*.<extension>` file of `dir` in file-name order.
    ///
    /// A file that can't be read or decoded is skipped with a warning; only a
    /// missing or unreadable directory fails the whole load.
    #[instrument(level = "info", skip(encoding), fields(encoding = encoding.name()))]
    pub fn load_dir(
        dir: &Path,
        extension: &str,
        encoding: &'static Encoding,
    ) -> Result<Self, QuizError> {
        let entries = fs::read_dir(dir).map_err(|source| QuizError::CorpusDir {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && path.extension() == Some(OsStr::new(extension)))
            .collect();
        paths.sort();

        let mut questions = Vec::new();
        for path in &paths {
            match read_question_file(path, encoding) {
                Ok(content) => {
                    let parsed = parse_questions(&content);
                    info!("Loaded {} questions from {}", parsed.len(), path.display());
                    questions.extend(parsed);
                }
                Err(e) => warn!("Skipping question file: {e}"),
            }
        }

        info!(
            "Question corpus ready: {} questions from {} files",
            questions.len(),
            paths.len()
        );
        Ok(Self { questions })
    }

    pub fn all_questions(&self) -> &[QuestionRecord] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Uniform choice over the whole corpus.
    pub fn pick_random(&self) -> Result<&QuestionRecord, QuizError> {
        self.questions
            .choose(&mut rand::thread_rng())
            .ok_or(QuizError::EmptyCorpus)
    }
}
