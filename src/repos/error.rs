/**
 * Responsibility
 * - repo が上位に伝える意味の定義
 */
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("db error")]
    Db(#[from] sqlx::Error),
    #[error("corrupt row: {0}")]
    Decode(String),
}

pub type RepoResult<T> = Result<T, RepoError>;
