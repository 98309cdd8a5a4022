//! Engine and application configuration.

use rust_decimal::Decimal;

/// Menu engine parameters.
///
/// Use [`Default::default()`] and override what the deployment needs.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Symbol of the root menu node.
    pub root: String,
    /// Maximum rendered bytes per turn.
    pub output_size: usize,
    /// Capacity of the flag bitset in bits.
    pub flag_count: u32,
    /// Joins a menu selector and its label (`1:Send`).
    pub menu_separator: String,
    /// Empty input sends the session back to the root node.
    pub reset_on_empty_input: bool,
    /// Byte capacity of the memory cache; `output_size` if unset.
    pub cache_size: Option<usize>,
    /// Log the path and raised flags after every turn.
    pub debug: bool,
}

impl EngineConfig {
    pub fn cache_capacity(&self) -> usize {
        self.cache_size.unwrap_or(self.output_size)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            root: "root".to_string(),
            output_size: 160,
            flag_count: 128,
            menu_separator: ":".to_string(),
            reset_on_empty_input: false,
            cache_size: None,
            debug: false,
        }
    }
}

/// Parameters of the financial application built on the engine.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Language for sessions that never picked one (`eng` or `swa`).
    pub default_language: String,
    pub default_pool_symbol: String,
    pub default_pool_address: String,
    pub default_pool_name: String,
    /// Settlement address receiving mpesa cash-out transfers.
    pub default_mpesa_address: String,
    /// Token the mpesa settlement account accepts.
    pub mpesa_asset_symbol: String,
    pub mpesa_asset_address: String,
    pub mpesa_asset_decimals: u32,
    /// KES paid out per token.
    pub mpesa_rate: Decimal,
    /// Domains appended to bare aliases during recipient resolution.
    pub search_domains: Vec<String>,
    /// Sessions allowed to reset other members' PINs.
    pub admin_numbers: Vec<String>,
    /// Wrong PIN entries before the account blocks.
    pub allowed_pin_attempts: u32,
    /// Smallest maximum swap amount for which the swap flow is offered.
    pub min_swap_amount: Decimal,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_language: "eng".to_string(),
            default_pool_symbol: "SRFPOOL".to_string(),
            default_pool_address: "0x0000000000000000000000000000000000000000".to_string(),
            default_pool_name: "Sarafu Pool".to_string(),
            default_mpesa_address: "0x0000000000000000000000000000000000000000".to_string(),
            mpesa_asset_symbol: "cUSD".to_string(),
            mpesa_asset_address: "0x0000000000000000000000000000000000000000".to_string(),
            mpesa_asset_decimals: 6,
            mpesa_rate: Decimal::from(130),
            search_domains: vec!["sarafu.eth".to_string()],
            admin_numbers: Vec::new(),
            allowed_pin_attempts: 3,
            // 0.1
            min_swap_amount: Decimal::new(1, 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults() {
        let engine = EngineConfig::default();
        assert_eq!(engine.root, "root");
        assert_eq!(engine.cache_capacity(), 160);
        let app = AppConfig::default();
        assert_eq!(app.min_swap_amount, dec!(0.1));
        assert_eq!(app.allowed_pin_attempts, 3);
    }
}
