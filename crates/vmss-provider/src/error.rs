/// The category of a failed operation, used by callers to decide how to
/// react without matching on individual error variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
pub enum ErrorKind {
    /// Configuration fields which cannot be used together, or a field which
    /// requires another one to be set.
    InvalidCombination,

    /// Neither of two alternative fields was provided.
    MissingRequiredAlternative,

    /// A scale set with the same identity already exists and must be
    /// imported instead.
    AlreadyExists,

    NotFound,

    /// The remote API rejected a request or a long-running operation failed.
    RemoteOperationFailed,

    Cancelled,
    DeadlineExceeded,

    /// The configuration tree does not have the expected shape.
    InvalidConfiguration,

    InvalidIdentity,

    /// The remote API returned a response which cannot be represented in
    /// the configuration tree.
    InvalidResponse,
}
