use crate::api::ProxyError;

pub const QUOTE_PARAMS: [&str; 6] = [
    "fromChain",
    "toChain",
    "fromToken",
    "toToken",
    "fromAmount",
    "fromAddress",
];

/// Picks the six quote parameters out of `query`, in canonical order.
/// Any missing or empty parameter rejects the request.
pub fn quote_params(query: &[(String, String)]) -> Result<Vec<(String, String)>, ProxyError> {
    QUOTE_PARAMS
        .iter()
        .map(|name| {
            query
                .iter()
                .find(|(key, value)| key == name && !value.is_empty())
                .map(|(key, value)| (key.clone(), value.clone()))
                .ok_or_else(|| {
                    ProxyError::BadRequest("Missing required query parameters".to_string())
                })
        })
        .collect()
}
