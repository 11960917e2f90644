/// Wraps `tracing::trace!` to record how a data structure evolves, for instance the subgraph
/// schemas while they are extracted from a supergraph. This is unrelated to snapshot testing.
///
/// Snapshots are only emitted with the `snapshot_tracing` feature. Each one carries a `snapshot`
/// tag naming what is recorded and its `data`.
///
/// Passing a serializable value tags it with its type name and records it as JSON:
/// ```ignore
/// snapshot!(options, "extraction options");
/// // trace!(snapshot = "ExtractSubgraphsOptions", data = "{ .. }", "extraction options");
/// ```
/// Otherwise, pass the tag and data yourself. The data must implement `tracing::Value`, which
/// printed schemas do:
/// ```ignore
/// snapshot!("Subgraph", subgraph.schema.to_string(), "populated subgraph");
/// ```
macro_rules! snapshot {
    ($value:expr, $msg:literal) => {
        #[cfg(feature = "snapshot_tracing")]
        trace!(
            snapshot = std::any::type_name_of_val(&$value),
            data = serde_json::to_string(&$value)
                .unwrap_or_else(|error| format!("<not serializable: {error}>")),
            $msg
        );
    };
    ($name:literal, $value:expr, $msg:literal) => {
        #[cfg(feature = "snapshot_tracing")]
        trace!(snapshot = $name, data = $value, $msg);
    };
}

pub(crate) use snapshot;
