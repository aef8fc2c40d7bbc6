//! Operation identifiers.

tessera_common::define_id!(
    /// Index of an operation in its application, in declaration order.
    OpId
);
