//! Typed keys for per-session user data.
//!
//! A storage key is `[partition][dt_hi][dt_lo][context id...]`, where the data
//! type is a big-endian `u16`. Big-endian keeps lexicographic order equal to
//! numeric order, so one prefix scan walks a whole data-type range.
//!
//! Data types are allocated in sparse ranges:
//!
//! | range       | contents                                  |
//! |-------------|-------------------------------------------|
//! | `0..63`     | scalar per-user fields                    |
//! | `256..287`  | voucher list columns                      |
//! | `512..543`  | transaction history list columns          |
//! | `1024..`    | aggregate records (transfer feed)         |
//! | `2048..`    | pool and swap candidate list columns      |

use std::fmt;

/// Top-level partition byte of a storage key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Partition {
    UserData = 0x01,
    State = 0x02,
    Log = 0x08,
}

/// Semantic user data field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DataType(pub u16);

impl DataType {
    // Scalar fields.
    pub const TRACKING_ID: Self = Self(0);
    pub const PUBLIC_KEY: Self = Self(1);
    pub const ACCOUNT_PIN: Self = Self(2);
    pub const ACCOUNT_STATUS: Self = Self(3);
    pub const FIRST_NAME: Self = Self(4);
    pub const FAMILY_NAME: Self = Self(5);
    pub const YOB: Self = Self(6);
    pub const LOCATION: Self = Self(7);
    pub const GENDER: Self = Self(8);
    pub const OFFERINGS: Self = Self(9);
    pub const RECIPIENT: Self = Self(10);
    pub const AMOUNT: Self = Self(11);
    pub const TEMPORARY_VALUE: Self = Self(12);
    pub const ACTIVE_SYM: Self = Self(13);
    pub const ACTIVE_BAL: Self = Self(14);
    pub const BLOCKED_NUMBER: Self = Self(15);
    pub const PUBLIC_KEY_REVERSE: Self = Self(16);
    pub const ACTIVE_DECIMAL: Self = Self(17);
    pub const ACTIVE_ADDRESS: Self = Self(18);
    pub const INCORRECT_PIN_ATTEMPTS: Self = Self(19);
    pub const SELECTED_LANGUAGE_CODE: Self = Self(20);
    pub const INITIAL_LANGUAGE_CODE: Self = Self(21);
    pub const ACCOUNT_ALIAS: Self = Self(22);
    pub const SUGGESTED_ALIAS: Self = Self(23);
    pub const SELF_PIN_RESET: Self = Self(24);
    pub const SEND_TRANSACTION_TYPE: Self = Self(25);
    pub const RECIPIENT_ACTIVE_TOKEN: Self = Self(26);
    pub const RECIPIENT_ACTIVE_ADDRESS: Self = Self(27);
    pub const RECIPIENT_ACTIVE_DECIMAL: Self = Self(28);
    pub const ACTIVE_POOL_NAME: Self = Self(29);
    pub const ACTIVE_POOL_SYM: Self = Self(30);
    pub const ACTIVE_POOL_ADDRESS: Self = Self(31);
    pub const ACTIVE_SWAP_FROM_SYM: Self = Self(32);
    pub const ACTIVE_SWAP_FROM_DECIMAL: Self = Self(33);
    pub const ACTIVE_SWAP_FROM_ADDRESS: Self = Self(34);
    pub const ACTIVE_SWAP_TO_SYM: Self = Self(35);
    pub const ACTIVE_SWAP_TO_DECIMAL: Self = Self(36);
    pub const ACTIVE_SWAP_TO_ADDRESS: Self = Self(37);
    pub const ACTIVE_SWAP_MAX_AMOUNT: Self = Self(38);
    pub const ACTIVE_SWAP_AMOUNT: Self = Self(39);
    pub const SWAP_QUOTE: Self = Self(40);
    pub const PROFILE_BUFFER: Self = Self(41);
    pub const MPESA_KES_AMOUNT: Self = Self(42);

    // Voucher list columns.
    pub const VOUCHER_SYMBOLS: Self = Self(256);
    pub const VOUCHER_BALANCES: Self = Self(257);
    pub const VOUCHER_DECIMALS: Self = Self(258);
    pub const VOUCHER_ADDRESSES: Self = Self(259);

    // Transaction history list columns.
    pub const TX_SENDERS: Self = Self(512);
    pub const TX_RECIPIENTS: Self = Self(513);
    pub const TX_VALUES: Self = Self(514);
    pub const TX_ADDRESSES: Self = Self(515);
    pub const TX_HASHES: Self = Self(516);
    pub const TX_DATES: Self = Self(517);
    pub const TX_SYMBOLS: Self = Self(518);
    pub const TX_DECIMALS: Self = Self(519);

    // Aggregates.
    pub const TRANSFERS: Self = Self(1024);

    // Pool list columns.
    pub const POOL_NAMES: Self = Self(2048);
    pub const POOL_SYMBOLS: Self = Self(2049);
    pub const POOL_ADDRESSES: Self = Self(2050);
    pub const SWAP_TO_SYMBOLS: Self = Self(2052);
    pub const SWAP_TO_BALANCES: Self = Self(2053);
    pub const SWAP_TO_DECIMALS: Self = Self(2054);
    pub const SWAP_TO_ADDRESSES: Self = Self(2055);

    pub fn to_be_bytes(self) -> [u8; 2] {
        self.0.to_be_bytes()
    }

    /// Human readable name, used by debug dumps.
    pub fn name(self) -> &'static str {
        match self {
            Self::TRACKING_ID => "tracking_id",
            Self::PUBLIC_KEY => "public_key",
            Self::ACCOUNT_PIN => "account_pin",
            Self::ACCOUNT_STATUS => "account_status",
            Self::FIRST_NAME => "first_name",
            Self::FAMILY_NAME => "family_name",
            Self::YOB => "yob",
            Self::LOCATION => "location",
            Self::GENDER => "gender",
            Self::OFFERINGS => "offerings",
            Self::RECIPIENT => "recipient",
            Self::AMOUNT => "amount",
            Self::TEMPORARY_VALUE => "temporary_value",
            Self::ACTIVE_SYM => "active_sym",
            Self::ACTIVE_BAL => "active_bal",
            Self::BLOCKED_NUMBER => "blocked_number",
            Self::PUBLIC_KEY_REVERSE => "public_key_reverse",
            Self::ACTIVE_DECIMAL => "active_decimal",
            Self::ACTIVE_ADDRESS => "active_address",
            Self::INCORRECT_PIN_ATTEMPTS => "incorrect_pin_attempts",
            Self::SELECTED_LANGUAGE_CODE => "selected_language_code",
            Self::INITIAL_LANGUAGE_CODE => "initial_language_code",
            Self::ACCOUNT_ALIAS => "account_alias",
            Self::SUGGESTED_ALIAS => "suggested_alias",
            Self::SELF_PIN_RESET => "self_pin_reset",
            Self::SEND_TRANSACTION_TYPE => "send_transaction_type",
            Self::RECIPIENT_ACTIVE_TOKEN => "recipient_active_token",
            Self::RECIPIENT_ACTIVE_ADDRESS => "recipient_active_address",
            Self::RECIPIENT_ACTIVE_DECIMAL => "recipient_active_decimal",
            Self::ACTIVE_POOL_NAME => "active_pool_name",
            Self::ACTIVE_POOL_SYM => "active_pool_sym",
            Self::ACTIVE_POOL_ADDRESS => "active_pool_address",
            Self::ACTIVE_SWAP_FROM_SYM => "active_swap_from_sym",
            Self::ACTIVE_SWAP_FROM_DECIMAL => "active_swap_from_decimal",
            Self::ACTIVE_SWAP_FROM_ADDRESS => "active_swap_from_address",
            Self::ACTIVE_SWAP_TO_SYM => "active_swap_to_sym",
            Self::ACTIVE_SWAP_TO_DECIMAL => "active_swap_to_decimal",
            Self::ACTIVE_SWAP_TO_ADDRESS => "active_swap_to_address",
            Self::ACTIVE_SWAP_MAX_AMOUNT => "active_swap_max_amount",
            Self::ACTIVE_SWAP_AMOUNT => "active_swap_amount",
            Self::SWAP_QUOTE => "swap_quote",
            Self::PROFILE_BUFFER => "profile_buffer",
            Self::MPESA_KES_AMOUNT => "mpesa_kes_amount",
            Self::VOUCHER_SYMBOLS => "voucher_symbols",
            Self::VOUCHER_BALANCES => "voucher_balances",
            Self::VOUCHER_DECIMALS => "voucher_decimals",
            Self::VOUCHER_ADDRESSES => "voucher_addresses",
            Self::TX_SENDERS => "tx_senders",
            Self::TX_RECIPIENTS => "tx_recipients",
            Self::TX_VALUES => "tx_values",
            Self::TX_ADDRESSES => "tx_addresses",
            Self::TX_HASHES => "tx_hashes",
            Self::TX_DATES => "tx_dates",
            Self::TX_SYMBOLS => "tx_symbols",
            Self::TX_DECIMALS => "tx_decimals",
            Self::TRANSFERS => "transfers",
            Self::POOL_NAMES => "pool_names",
            Self::POOL_SYMBOLS => "pool_symbols",
            Self::POOL_ADDRESSES => "pool_addresses",
            Self::SWAP_TO_SYMBOLS => "swap_to_symbols",
            Self::SWAP_TO_BALANCES => "swap_to_balances",
            Self::SWAP_TO_DECIMALS => "swap_to_decimals",
            Self::SWAP_TO_ADDRESSES => "swap_to_addresses",
            _ => "unknown",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.0)
    }
}

/// Encode a user data key: `[0x01][dt_hi][dt_lo][id...]`.
pub fn user_data_key(dt: DataType, id: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(3 + id.len());
    key.push(Partition::UserData as u8);
    key.extend_from_slice(&dt.to_be_bytes());
    key.extend_from_slice(id);
    key
}

/// Split a user data key back into its data type and context id.
pub fn decode_user_data_key(key: &[u8]) -> Option<(DataType, &[u8])> {
    if key.len() < 3 || key[0] != Partition::UserData as u8 {
        return None;
    }
    let dt = u16::from_be_bytes([key[1], key[2]]);
    Some((DataType(dt), &key[3..]))
}

/// Key of the persisted engine snapshot for a session.
pub fn state_key(session_id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + session_id.len());
    key.push(Partition::State as u8);
    key.extend_from_slice(session_id.as_bytes());
    key
}
