//! End-to-end handler scenarios: registration, PIN lockout, balance
//! rendering, recipient and amount validation, transfer initiation.
//!
//! Handlers run against the in-memory store and the recording fake service,
//! exactly as the menu engine would call them.

use std::sync::Arc;

use async_trait::async_trait;
use ussd_engine::handlers::MenuHandlers;
use ussd_engine::pin::hash_pin;
use ussd_engine::store::keys::decode_user_data_key;
use ussd_engine::store::ScanResult;
use ussd_engine::{
    AppConfig, DataType, FakeAccountService, FlagManager, FlagSet, KeyValueStore, MemoryStore,
    Request, StoreError, UserDataStore,
};

const SESSION: &str = "+254700000000";
const PUBLIC_KEY: &str = "0xAbC0000000000000000000000000000000000DeF";

struct Fixture {
    handlers: MenuHandlers,
    fake: Arc<FakeAccountService>,
    flags: Arc<FlagManager>,
}

impl Fixture {
    fn new() -> Self {
        let fake = Arc::new(FakeAccountService::new());
        let flags = Arc::new(FlagManager::builtin().unwrap());
        let handlers = MenuHandlers::new(
            UserDataStore::new(Arc::new(MemoryStore::new())),
            Arc::clone(&flags),
            fake.clone(),
            AppConfig::default(),
            ":",
        );
        Self {
            handlers,
            fake,
            flags,
        }
    }

    fn flag(&self, name: &str) -> u32 {
        self.flags.get(name).unwrap()
    }

    fn request(&self, set: &[&str]) -> Request {
        let mut flags = FlagSet::new(128);
        for name in set {
            flags.set(self.flag(name)).unwrap();
        }
        Request::new(SESSION, "eng", flags)
    }

    async fn write(&self, dt: DataType, value: &str) {
        self.handlers.store().write(SESSION, dt, value).await.unwrap();
    }

    async fn read(&self, dt: DataType) -> String {
        self.handlers.store().read_string(SESSION, dt).await.unwrap()
    }
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_registration_success() {
    let f = Fixture::new();
    f.fake.set_account("T1", PUBLIC_KEY);

    let res = f
        .handlers
        .create_account(&f.request(&[]), "")
        .await
        .unwrap();

    assert_eq!(f.read(DataType::TRACKING_ID).await, "T1");
    assert_eq!(f.read(DataType::PUBLIC_KEY).await, PUBLIC_KEY);
    let owner = f
        .handlers
        .store()
        .read_reverse("abc0000000000000000000000000000000000def")
        .await
        .unwrap();
    assert_eq!(owner, SESSION);
    assert!(res.leaves_set(f.flag("flag_account_created")));
    assert!(res.leaves_reset(f.flag("flag_account_creation_failed")));
}

#[tokio::test]
async fn test_registration_failure_flags() {
    let f = Fixture::new();
    f.fake.fail("create_account");

    let res = f
        .handlers
        .create_account(&f.request(&[]), "")
        .await
        .unwrap();
    assert!(res.leaves_set(f.flag("flag_account_creation_failed")));
    assert!(res.leaves_set(f.flag("flag_api_call_error")));
    assert!(!res.leaves_set(f.flag("flag_account_created")));
}

/// Memory store that refuses writes of one data type.
struct RefusingStore {
    inner: MemoryStore,
    refused: DataType,
}

#[async_trait]
impl KeyValueStore for RefusingStore {
    async fn get(&self, key: &[u8]) -> Result<Vec<u8>, StoreError> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        if matches!(decode_user_data_key(key), Some((dt, _)) if dt == self.refused) {
            return Err(StoreError::Io(std::io::Error::other("disk full")));
        }
        self.inner.put(key, value).await
    }

    async fn delete(&self, key: &[u8]) -> Result<(), StoreError> {
        self.inner.delete(key).await
    }

    async fn prefix_scan(&self, prefix: &[u8]) -> Result<ScanResult, StoreError> {
        self.inner.prefix_scan(prefix).await
    }
}

#[tokio::test]
async fn test_registration_leaves_nothing_when_reverse_write_fails() {
    let fake = Arc::new(FakeAccountService::new());
    fake.set_account("T1", PUBLIC_KEY);
    let flags = Arc::new(FlagManager::builtin().unwrap());
    let store = UserDataStore::new(Arc::new(RefusingStore {
        inner: MemoryStore::new(),
        refused: DataType::PUBLIC_KEY_REVERSE,
    }));
    let handlers = MenuHandlers::new(
        store.clone(),
        Arc::clone(&flags),
        fake.clone(),
        AppConfig::default(),
        ":",
    );
    let request = Request::new(SESSION, "eng", FlagSet::new(128));

    assert!(handlers.create_account(&request, "").await.is_err());
    for dt in [DataType::PUBLIC_KEY, DataType::TRACKING_ID] {
        assert!(store.read(SESSION, dt).await.unwrap_err().is_not_found(), "{dt} kept");
    }

    // The next turn must not treat the session as registered.
    let res = handlers.check_account_created(&request, "").await.unwrap();
    assert!(res.leaves_reset(flags.get("flag_account_created").unwrap()));
    assert!(handlers.create_account(&request, "").await.is_err());
    assert_eq!(fake.calls_to("create_account").len(), 2);
}

// ---------------------------------------------------------------------------
// PIN lockout
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_pin_lockout() {
    let f = Fixture::new();
    f.write(DataType::ACCOUNT_PIN, &hash_pin("1234").unwrap())
        .await;

    for _ in 0..3 {
        let res = f
            .handlers
            .authorize_account(&f.request(&[]), "0000")
            .await
            .unwrap();
        assert!(res.leaves_set(f.flag("flag_incorrect_pin")));
    }
    assert_eq!(f.read(DataType::INCORRECT_PIN_ATTEMPTS).await, "3");

    let res = f
        .handlers
        .reset_incorrect_pin(&f.request(&["flag_incorrect_pin"]), "")
        .await
        .unwrap();
    assert_eq!(res.content, "0");
    assert!(res.leaves_set(f.flag("flag_account_blocked")));
    assert!(res.leaves_reset(f.flag("flag_incorrect_pin")));

    let res = f
        .handlers
        .authorize_account(&f.request(&["flag_account_blocked"]), "1234")
        .await
        .unwrap();
    assert!(res.leaves_set(f.flag("flag_account_blocked")));
    assert!(!res.leaves_set(f.flag("flag_account_authorized")));
    assert_eq!(f.read(DataType::INCORRECT_PIN_ATTEMPTS).await, "3");
}

// ---------------------------------------------------------------------------
// Balance
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_balance_rendering_truncates() {
    let f = Fixture::new();
    f.write(DataType::ACTIVE_SYM, "SRF").await;
    f.write(DataType::ACTIVE_BAL, "10.967").await;
    f.write(DataType::ACCOUNT_ALIAS, "user72").await;

    let res = f
        .handlers
        .check_balance(&f.request(&[]), "")
        .await
        .unwrap();
    assert_eq!(res.content, "user72\nBalance: 10.96 SRF\n");
}

// ---------------------------------------------------------------------------
// Send
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_unregistered_phone_is_offered_an_invite() {
    let f = Fixture::new();

    let res = f
        .handlers
        .validate_recipient(&f.request(&[]), "0712345678")
        .await
        .unwrap();
    assert_eq!(res.content, "0712345678");
    assert!(res.leaves_set(f.flag("flag_invalid_recipient_with_invite")));
    assert_eq!(f.read(DataType::TEMPORARY_VALUE).await, "0712345678");
}

#[tokio::test]
async fn test_amount_validation() {
    let f = Fixture::new();
    f.write(DataType::ACTIVE_BAL, "5").await;

    let res = f
        .handlers
        .validate_amount(&f.request(&[]), "5.02")
        .await
        .unwrap();
    assert_eq!(res.content, "5.02");
    assert!(res.leaves_set(f.flag("flag_invalid_amount")));
    assert!(f
        .handlers
        .store()
        .read_string(SESSION, DataType::AMOUNT)
        .await
        .is_err());

    let res = f
        .handlers
        .validate_amount(&f.request(&[]), "0.149")
        .await
        .unwrap();
    assert_eq!(res.content, "0.14");
    assert!(res.leaves_reset(f.flag("flag_invalid_amount")));
    assert_eq!(f.read(DataType::AMOUNT).await, "0.14");
}

#[tokio::test]
async fn test_amount_over_balance_by_less_than_a_cent() {
    let f = Fixture::new();
    f.write(DataType::ACTIVE_BAL, "5").await;

    let res = f
        .handlers
        .validate_amount(&f.request(&[]), "5.001")
        .await
        .unwrap();
    assert_eq!(res.content, "5.001");
    assert!(res.leaves_set(f.flag("flag_invalid_amount")));
    assert!(f
        .handlers
        .store()
        .read_string(SESSION, DataType::AMOUNT)
        .await
        .is_err());

    let res = f
        .handlers
        .validate_amount(&f.request(&[]), "4.999")
        .await
        .unwrap();
    assert_eq!(res.content, "4.99");
    assert!(res.leaves_reset(f.flag("flag_invalid_amount")));
}

#[tokio::test]
async fn test_transaction_initiation() {
    let f = Fixture::new();
    let recipient = "0x8617E340B3D01FA5F11F306F4090FD50E238070D";
    let token = "0xd4c288865Ce0985a481Eef3be02443dF5E2e4Ea9";
    f.write(DataType::TEMPORARY_VALUE, "0711223344").await;
    f.write(DataType::ACTIVE_SYM, "SRF").await;
    f.write(DataType::AMOUNT, "1.00").await;
    f.write(DataType::ACTIVE_DECIMAL, "6").await;
    f.write(DataType::PUBLIC_KEY, PUBLIC_KEY).await;
    f.write(DataType::RECIPIENT, recipient).await;
    f.write(DataType::ACTIVE_ADDRESS, token).await;

    let res = f
        .handlers
        .initiate_transaction(&f.request(&["flag_account_authorized"]), "")
        .await
        .unwrap();
    assert_eq!(
        res.content,
        "Your request has been sent. 0711223344 will receive 1.00 SRF from +254700000000."
    );
    assert!(res.leaves_reset(f.flag("flag_account_authorized")));

    let calls = f.fake.calls_to("token_transfer");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].args, vec!["1000000", PUBLIC_KEY, recipient, token]);
}

#[tokio::test]
async fn test_unauthorized_initiation_sends_nothing() {
    let f = Fixture::new();
    let res = f
        .handlers
        .initiate_transaction(&f.request(&[]), "")
        .await
        .unwrap();
    assert!(res.content.is_empty());
    assert!(f.fake.calls().is_empty());
}
