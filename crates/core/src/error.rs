use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Roster parse error: {0}")]
    RosterParse(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unknown person: {0}")]
    UnknownPerson(String),

    #[error("{0}")]
    Other(String),
}
