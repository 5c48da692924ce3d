use std::path::PathBuf;

#[derive(thiserror::Error, Debug, serde::Deserialize, serde::Serialize)]
pub enum Error {
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Config not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("Completed with {0} failure(s)")]
    TasksFailed(usize),
}
