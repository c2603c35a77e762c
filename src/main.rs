use std::{error::Error, sync::Arc};

use quizbot::{
    config::{Config, SessionStoreConfig},
    controller::QuizController,
    corpus::QuestionStore,
    error::QuizError,
    platform::{telegram, telegram::TelegramAdapter, vk, vk::VkAdapter, ChatAdapter},
    session::{memory::InMemoryStore, redis_store::RedisStore, KeyValueStore, Sessions},
};
use tracing::{error, info, level_filters::LevelFilter, warn, Level};
use tracing_log::LogTracer;
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

type MainResult = Result<(), Box<dyn Error + Send + Sync + 'static>>;

fn init_tracing(level: Level) -> MainResult {
    LogTracer::init()?;

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_span_events(FmtSpan::CLOSE)
        .with_line_number(true)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[tokio::main]
async fn main() -> MainResult {
    let config = Config::from_env()?;
    init_tracing(config.log_level)?;

    let questions = QuestionStore::load_dir(
        &config.corpus.dir,
        &config.corpus.extension,
        config.corpus.encoding,
    )?;
    if questions.is_empty() {
        error!("No questions found in {}", config.corpus.dir.display());
        return Err(QuizError::EmptyCorpus.into());
    }
    let questions = Arc::new(questions);

    let store: Arc<dyn KeyValueStore> = match &config.session_store {
        SessionStoreConfig::Redis { url } => Arc::new(RedisStore::connect(url).await?),
        SessionStoreConfig::InMemory => {
            warn!("Redis is not configured, sessions are kept in memory");
            Arc::new(InMemoryStore::new())
        }
    };
    let sessions = Sessions::new(store);

    let Config { telegram, vk, .. } = config;

    let telegram = async {
        match telegram {
            Some(telegram_config) => {
                let quiz = QuizController::new(
                    TelegramAdapter::PLATFORM,
                    Arc::clone(&questions),
                    sessions.clone(),
                );
                telegram::run(telegram_config, Arc::new(quiz)).await
            }
            None => Ok(()),
        }
    };

    let vk = async {
        match vk {
            Some(vk_config) => {
                let quiz = QuizController::new(
                    VkAdapter::PLATFORM,
                    Arc::clone(&questions),
                    sessions.clone(),
                );
                vk::run(vk_config, Arc::new(quiz)).await
            }
            None => Ok(()),
        }
    };

    tokio::select! {
        result = async { tokio::try_join!(telegram, vk) } => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => info!("Received Ctrl+C, shutting down"),
    }

    info!("Bot stopped");
    Ok(())
}
