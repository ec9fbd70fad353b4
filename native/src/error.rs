use thiserror::Error;

#[derive(Error, Debug)]
pub enum ControlError {
    #[error("{0} channel is not open")]
    ChannelUnavailable(&'static str),
    #[error("Duplicate component name: {0}")]
    DuplicateName(String),
    #[error("Component not found: {0}")]
    ComponentNotFound(String),
    #[error("Component '{0}' must have an input")]
    DanglingInputRequired(String),
    #[error("Source component should not have an input (pending output from '{0}')")]
    UnexpectedInputOnSource(String),
    #[error("Rx Message Error : {0}")]
    ReadFailure(std::io::Error),
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Radio controller not initialized")]
    NotInitialized,
}

impl ControlError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// True for errors raised by the graph builder's admission and wiring rules.
    pub fn is_graph_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicateName(_)
                | Self::ComponentNotFound(_)
                | Self::DanglingInputRequired(_)
                | Self::UnexpectedInputOnSource(_)
        )
    }
}

pub type ControlResult<T> = Result<T, ControlError>;
