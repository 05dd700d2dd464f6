//! Models served by the PearAI server.

/// Model identifiers accepted by `/stream_complete` and `/server_chat`.
pub const SUPPORTED_MODELS: &[&str] = &[
    "llama3-70b",
    "gpt-3.5-turbo",
    "gpt-4o",
    "gemini-1.5-pro-latest",
    "claude-3-sonnet-20240229",
    "claude-3-haiku-20240307",
];

/// Owned copy of [`SUPPORTED_MODELS`].
pub fn model_list() -> Vec<String> {
    SUPPORTED_MODELS.iter().map(|m| m.to_string()).collect()
}

pub fn is_supported(model: &str) -> bool {
    SUPPORTED_MODELS.contains(&model)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_is_stable_and_ordered() {
        assert_eq!(
            model_list(),
            vec![
                "llama3-70b",
                "gpt-3.5-turbo",
                "gpt-4o",
                "gemini-1.5-pro-latest",
                "claude-3-sonnet-20240229",
                "claude-3-haiku-20240307",
            ]
        );
        assert!(is_supported("gpt-4o"));
        assert!(!is_supported("starcoder-7b"));
    }
}
