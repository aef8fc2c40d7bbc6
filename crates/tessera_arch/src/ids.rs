//! Arena ids for resource-graph nodes and edges.

tessera_common::define_id!(
    /// Opaque, copyable id of a node in a [`ResourceGraph`](crate::ResourceGraph).
    NodeId
);

tessera_common::define_id!(
    /// Opaque, copyable id of an edge in a [`ResourceGraph`](crate::ResourceGraph).
    EdgeId
);
