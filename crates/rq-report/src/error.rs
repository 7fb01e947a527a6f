use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Document is missing part '{0}'")]
    MissingPart(String),

    #[error("No free report name left for '{0}'")]
    NameExhausted(String),
}

pub type Result<T> = std::result::Result<T, ReportError>;
