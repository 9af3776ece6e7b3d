//! Mongo change-stream monitoring, grounded on `original_source/db_monitor.py`'s
//! `subscribe_stream`, adapted from a one-off CLI subcommand into a
//! supervised watcher any component can start against any collection.
//!
//! Resume tokens are persisted in Redis so a restart resumes the stream
//! instead of replaying or dropping events (SPEC_FULL.md §6.4's
//! change-stream note).

use futures::StreamExt;
use mongodb::bson::doc;
use mongodb::bson::Document;
use mongodb::change_stream::event::ResumeToken;
use mongodb::options::ChangeStreamOptions;
use mongodb::options::FullDocumentType;
use mongodb::Collection;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio::sync::watch;

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("mongo error: {0}")]
    Mongo(#[from] mongodb::error::Error),
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

fn resume_token_key(collection_name: &str) -> String {
    format!("change_stream:resume_token:{collection_name}")
}

/// Whether `err` is Mongo's "resume of change stream was not possible"
/// class of error — the resume point has fallen out of the oplog/change
/// stream history, so resuming from the stored token can never succeed
/// again (SPEC_FULL.md §8 scenario 6).
fn resume_token_lost(err: &mongodb::error::Error) -> bool {
    let message = err.to_string().to_ascii_lowercase();
    message.contains("resume") && (message.contains("not possible") || message.contains("history lost") || message.contains("no longer in the oplog"))
}

/// Watches `collection`, invoking `on_change` for every matching document
/// until `shutdown` fires. Persists its resume token to Redis after each
/// event so a crash-restart resumes rather than replays
/// (`db_monitor.py`'s hardcoded `resume_after` made dynamic). A resume
/// token Mongo has aged out of its history is deleted and the stream is
/// reopened fresh rather than treated as fatal (SPEC_FULL.md §4.I:
/// "non-resumable → fresh subscription").
pub async fn watch_collection<F>(
    collection: Collection<Document>,
    mut redis_conn: ConnectionManager,
    mut shutdown: watch::Receiver<bool>,
    mut on_change: F,
) -> Result<(), MonitorError>
where
    F: FnMut(Document),
{
    let collection_name = collection.name().to_string();
    let key = resume_token_key(&collection_name);

    loop {
        if *shutdown.borrow() {
            return Ok(());
        }

        let resume_token: Option<ResumeToken> = {
            let raw: Option<String> = redis_conn.get(&key).await?;
            raw.and_then(|s| serde_json::from_str(&s).ok())
        };

        tracing::info!(collection = %collection_name, resumed = resume_token.is_some(), "subscribing to change stream");

        let mut opts = ChangeStreamOptions::builder()
            .full_document(Some(FullDocumentType::UpdateLookup))
            .build();
        opts.resume_after = resume_token;

        let mut stream = collection.watch(Vec::<Document>::new(), Some(opts)).await?;
        let mut resubscribe = false;

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::info!(collection = %collection_name, "shutdown received, closing change stream");
                        return Ok(());
                    }
                }
                next = stream.next() => {
                    match next {
                        Some(Ok(event)) => {
                            if let Some(token) = stream.resume_token() {
                                if let Ok(serialized) = serde_json::to_string(&token) {
                                    let _: Result<(), _> = redis_conn.set(&key, serialized).await;
                                }
                            }
                            if let Some(doc) = event.full_document {
                                on_change(doc);
                            }
                        }
                        Some(Err(err)) => {
                            if resume_token_lost(&err) {
                                tracing::error!(collection = %collection_name, "change-stream resume token lost, deleting it and resubscribing fresh: {err}");
                                let _: Result<(), _> = redis_conn.del(&key).await;
                                resubscribe = true;
                                break;
                            }
                            let resumable = matches!(
                                *err.kind,
                                mongodb::error::ErrorKind::Io(_) | mongodb::error::ErrorKind::ServerSelection { .. }
                            );
                            if !resumable {
                                return Err(MonitorError::Mongo(err));
                            }
                            tracing::warn!(collection = %collection_name, "resumable change-stream error: {err}");
                        }
                        None => return Ok(()),
                    }
                }
            }
        }

        if !resubscribe {
            tracing::info!(collection = %collection_name, "closed change stream");
            return Ok(());
        }
    }
}
