use thiserror::Error;

pub type BetclickResult<T> = Result<T, BetclickError>;

#[derive(Error, Debug)]
pub enum BetclickError {
    #[error("Monitor not found")]
    MonitorNotFound,

    #[cfg(feature = "desktop")]
    #[error("Xcap error: {0}")]
    XcapError(#[from] xcap::XCapError),

    #[cfg(feature = "desktop")]
    #[error("Pointer connection error: {0}")]
    PointerConnection(#[from] enigo::NewConError),

    #[cfg(feature = "desktop")]
    #[error("Pointer input error: {0}")]
    PointerInput(#[from] enigo::InputError),

    #[cfg(feature = "vision")]
    #[error("OpenCV error: {0}")]
    OpenCvError(#[from] opencv::Error),

    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("WebSocket error: {0}")]
    WebSocketError(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Login rejected: {0}")]
    LoginRejected(String),

    #[error("Captured frame has invalid dimensions {0}x{1}")]
    InvalidFrame(u32, u32),

    #[error("Invalid configuration edit: {0}")]
    InvalidEdit(String),

    #[error("Engine worker is gone")]
    WorkerGone,
}
