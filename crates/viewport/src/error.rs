#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewportError {
    /// Zoom window bounds must be finite with `max > min`.
    InvalidZoomWindow { min: f64, max: f64 },
    /// Display scale must be finite and strictly positive.
    InvalidScale(f64),
    /// Pan input must be finite on both axes.
    NonFiniteDelta { dx: f64, dy: f64 },
}

impl std::fmt::Display for ViewportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViewportError::InvalidZoomWindow { min, max } => {
                write!(f, "invalid zoom window: min={min} max={max}")
            }
            ViewportError::InvalidScale(scale) => write!(f, "invalid display scale: {scale}"),
            ViewportError::NonFiniteDelta { dx, dy } => {
                write!(f, "non-finite pan delta: dx={dx} dy={dy}")
            }
        }
    }
}

impl std::error::Error for ViewportError {}
