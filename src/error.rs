use std::fmt;

/// Errors raised while building or wiring the synthesis core.
///
/// Nothing on the render path returns these: out-of-range input is clamped and
/// unknown notes or parameter names are ignored.
#[derive(Debug, Clone, PartialEq)]
pub enum SynthError {
    /// An FM routing graph referenced an operator outside `0..operator_count`
    /// or declared no audible outputs.
    InvalidAlgorithm { name: String, reason: String },
    /// An `EngineConfig` field is outside its usable range.
    InvalidConfig { field: &'static str, reason: String },
    /// A string did not name one of the synthesis engines.
    UnknownEngine(String),
    /// The control queue towards the render thread is full.
    QueueFull,
    /// A control channel was requested on a manager that already has one.
    ControlChannelTaken,
}

pub type Result<T> = std::result::Result<T, SynthError>;

impl fmt::Display for SynthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SynthError::InvalidAlgorithm { name, reason } => {
                write!(f, "invalid FM algorithm '{name}': {reason}")
            }
            SynthError::InvalidConfig { field, reason } => {
                write!(f, "invalid config field '{field}': {reason}")
            }
            SynthError::UnknownEngine(name) => write!(f, "unknown synthesis engine '{name}'"),
            SynthError::QueueFull => write!(f, "control queue is full"),
            SynthError::ControlChannelTaken => {
                write!(f, "control channel already attached to this manager")
            }
        }
    }
}

impl std::error::Error for SynthError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_problem() {
        let err = SynthError::InvalidConfig {
            field: "sample_rate",
            reason: "must be positive".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid config field 'sample_rate': must be positive"
        );
        assert_eq!(
            SynthError::UnknownEngine("vocoder".into()).to_string(),
            "unknown synthesis engine 'vocoder'"
        );
    }
}
