//! Secret redaction for connection configuration.

use crate::client::ProviderConfig;

/// Configuration key that holds a provider's secret.
pub const SECRET_KEY: &str = "api_key";

/// Copy of `config` safe to show to a caller: the secret value is blanked,
/// every other key passes through.
///
/// The provider id is accepted so per-provider secret keys can be added
/// without changing callers; today every provider stores its secret under
/// [`SECRET_KEY`].
pub fn mask_config(config: &ProviderConfig, _provider: &str) -> ProviderConfig {
    config
        .iter()
        .map(|(key, value)| {
            if key == SECRET_KEY {
                (key.clone(), String::new())
            } else {
                (key.clone(), value.clone())
            }
        })
        .collect()
}

/// Build the configuration to store on update.
///
/// `incoming` replaces `current` wholesale, except that an empty incoming
/// secret keeps the stored one. A masked config sent back unchanged
/// therefore never wipes the key.
pub fn merge_config_update(current: &ProviderConfig, incoming: ProviderConfig) -> ProviderConfig {
    let mut merged = incoming;

    let blank_secret = merged.get(SECRET_KEY).is_some_and(|v| v.is_empty());
    if blank_secret {
        if let Some(stored) = current.get(SECRET_KEY).filter(|v| !v.is_empty()) {
            merged.insert(SECRET_KEY.to_string(), stored.clone());
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(pairs: &[(&str, &str)]) -> ProviderConfig {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_mask_blanks_only_the_secret() {
        let stored = config(&[("api_key", "sk-live"), ("model", "deepseek-chat")]);
        let masked = mask_config(&stored, "deepseek");

        assert_eq!(masked.get("api_key").map(String::as_str), Some(""));
        assert_eq!(masked.get("model").map(String::as_str), Some("deepseek-chat"));
        assert_eq!(stored.get("api_key").map(String::as_str), Some("sk-live"));
    }

    #[test]
    fn test_mask_without_secret_is_identity() {
        let stored = config(&[("endpoint", "http://localhost:11434"), ("model", "llama3.2")]);
        assert_eq!(mask_config(&stored, "ollama"), stored);
    }

    #[test]
    fn test_mask_is_idempotent() {
        let stored = config(&[("api_key", "sk-live")]);
        let once = mask_config(&stored, "deepseek");
        assert_eq!(mask_config(&once, "deepseek"), once);
    }

    #[test]
    fn test_empty_incoming_secret_preserves_stored() {
        let current = config(&[("api_key", "sk-live"), ("model", "deepseek-chat")]);
        let incoming = config(&[("api_key", ""), ("model", "deepseek-coder")]);

        let merged = merge_config_update(&current, incoming);
        assert_eq!(merged.get("api_key").map(String::as_str), Some("sk-live"));
        assert_eq!(merged.get("model").map(String::as_str), Some("deepseek-coder"));
    }

    #[test]
    fn test_new_secret_overwrites() {
        let current = config(&[("api_key", "sk-old")]);
        let merged = merge_config_update(&current, config(&[("api_key", "sk-new")]));
        assert_eq!(merged.get("api_key").map(String::as_str), Some("sk-new"));
    }

    #[test]
    fn test_masked_round_trip_keeps_secret() {
        let current = config(&[("api_key", "sk-live"), ("model", "deepseek-chat")]);
        let merged = merge_config_update(&current, mask_config(&current, "deepseek"));
        assert_eq!(merged, current);
    }

    #[test]
    fn test_other_keys_replaced_wholesale() {
        let current = config(&[("endpoint", "http://gpu:11434"), ("model", "mistral")]);
        let merged = merge_config_update(&current, config(&[("model", "llama3.2")]));
        assert_eq!(merged, config(&[("model", "llama3.2")]));
    }
}
