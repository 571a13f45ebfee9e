/// What a caller should do with a failed request.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// The answer is final; asking again returns the same failure.
    Never,
    /// Transient. Repeat after a growing delay.
    WithBackoff,
}
