use crate::cleanup::InkColor;

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub max_file_size: usize,
    /// Ink color used when a request does not name one
    pub default_ink_color: InkColor,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9393,
            max_file_size: 20 * 1024 * 1024,
            default_ink_color: InkColor::Black,
        }
    }
}
