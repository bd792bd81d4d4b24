use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutdbError {
    #[error("database error: {0}")]
    Db(String),
}
