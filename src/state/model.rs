/// Coarse session state seen by the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No image loaded.
    #[default]
    Empty,
    Loaded,
    /// An action is in flight.
    Busy,
    /// An error message replaces the working view until acknowledged.
    Failed,
}
