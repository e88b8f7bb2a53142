use std::collections::BTreeMap;

use cluster_gateway::GatewayError;
use proptest::prelude::*;

/// Strategy for generating valid index names
pub fn index_name_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_-]{0,31}"
}

/// Strategy for generating per-node cache clear outcomes; `None` acknowledged
pub fn node_outcomes_strategy() -> impl Strategy<Value = BTreeMap<String, Option<String>>> {
    prop::collection::btree_map(
        "node[A-Z][0-9]{0,2}",
        prop::option::of("[a-z ]{1,24}"),
        0..8,
    )
}

/// Strategy for generating failures a transport can report
pub fn transport_error_strategy() -> impl Strategy<Value = GatewayError> {
    prop_oneof![
        "[a-z ]{1,32}".prop_map(|reason| GatewayError::transport(reason)),
        (400u16..600, "[a-z ]{1,32}").prop_map(|(status, reason)| GatewayError::remote(status, reason)),
        "[a-z ]{1,32}".prop_map(|reason| GatewayError::dispatch(reason)),
    ]
}

/// Strategy for generating a scripted count outcome
pub fn count_outcome_strategy() -> impl Strategy<Value = Result<u64, GatewayError>> {
    prop_oneof![
        3 => (0u64..1_000_000).prop_map(Ok),
        1 => transport_error_strategy().prop_map(Err),
    ]
}

/// Strategy for generating search paging windows around the result window limit
pub fn paging_strategy() -> impl Strategy<Value = (usize, usize)> {
    (0usize..12_000, 0usize..2_000)
}
