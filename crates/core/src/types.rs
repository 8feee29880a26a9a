/// A single flattened survey response: field name to JSON value.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// One boolean per record, in record-set order.
pub type Mask = Vec<bool>;

/// One 0/1 error flag per record, in record-set order.
pub type Flags = Vec<u8>;
