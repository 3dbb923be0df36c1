use std::fmt;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    BadUrl(String),
    NotInRange(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::BadUrl(e) => write!(f, "URL error: {}", e),
            ConfigError::NotInRange(e) => write!(f, "Value out of range: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

#[derive(Debug)]
pub enum CaptureError {
    PermissionDenied,
    NoDevice,
    DeviceBusy,
    NoVideoTrack,
    EncodeFailed(String),
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::PermissionDenied => write!(f, "Camera permission denied"),
            CaptureError::NoDevice => write!(f, "No camera device found"),
            CaptureError::DeviceBusy => write!(f, "Camera device is busy"),
            CaptureError::NoVideoTrack => write!(f, "Acquired stream has no video track"),
            CaptureError::EncodeFailed(e) => write!(f, "Frame encoding failed: {}", e),
        }
    }
}

impl std::error::Error for CaptureError {}

#[derive(Debug)]
pub enum ChannelError {
    ConnectFailed(String),
    SendFailed(String),
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelError::ConnectFailed(e) => write!(f, "Channel connect failed: {}", e),
            ChannelError::SendFailed(e) => write!(f, "Channel send failed: {}", e),
        }
    }
}

impl std::error::Error for ChannelError {}

#[derive(Debug)]
pub enum ApiError {
    Request(reqwest::Error),
    Status(u16, String),
    Decode(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Request(e) => write!(f, "API request error: {}", e),
            ApiError::Status(code, body) => write!(f, "API returned status {}: {}", code, body),
            ApiError::Decode(e) => write!(f, "API response decode error: {}", e),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Request(err)
    }
}

#[derive(Debug)]
pub enum StateError {
    WriteFailed(String),
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateError::WriteFailed(e) => write!(f, "State write failed: {}", e),
        }
    }
}

impl std::error::Error for StateError {}
