//! The Sarafu self-service menu.
//!
//! Every screen that waits for input is a node with menu items or an
//! any-input edge. Nodes that only run handlers and branch on the flags they
//! raise are passed through and never shown.

use crate::error::Result;
use crate::flags::FlagManager;
use crate::menu::{go, MenuTree, NodeBuilder, Target};

pub const ROOT: &str = "root";

const PIN_PROMPT: (&str, &str) = (
    "Please enter your PIN to confirm:",
    "Tafadhali weka PIN yako kudhibitisha:",
);

/// One editable profile field: node name part, saver handler, flag, prompt.
struct ProfileStep {
    name: &'static str,
    saver: &'static str,
    flag: &'static str,
    eng: &'static str,
    swa: &'static str,
}

/// Profile fields in registration order.
const PROFILE_STEPS: [ProfileStep; 6] = [
    ProfileStep {
        name: "first_name",
        saver: "save_firstname",
        flag: "flag_firstname_set",
        eng: "Enter your first names:",
        swa: "Weka majina yako ya kwanza:",
    },
    ProfileStep {
        name: "family_name",
        saver: "save_familyname",
        flag: "flag_familyname_set",
        eng: "Enter family name:",
        swa: "Weka jina la familia:",
    },
    ProfileStep {
        name: "gender",
        saver: "save_gender",
        flag: "flag_gender_set",
        eng: "Select gender:",
        swa: "Chagua jinsia:",
    },
    ProfileStep {
        name: "yob",
        saver: "save_yob",
        flag: "flag_yob_set",
        eng: "Enter your year of birth:",
        swa: "Weka mwaka wa kuzaliwa:",
    },
    ProfileStep {
        name: "location",
        saver: "save_location",
        flag: "flag_location_set",
        eng: "Enter your location:",
        swa: "Weka eneo lako:",
    },
    ProfileStep {
        name: "offerings",
        saver: "save_offerings",
        flag: "flag_offerings_set",
        eng: "Enter the services or goods you offer:",
        swa: "Weka huduma au bidhaa unazouza:",
    },
];

/// `{handler}` placeholder for a template.
fn slot(handler: &str) -> String {
    format!("{{{handler}}}")
}

/// A screen asking for the PIN before `authorize`.
fn pin_screen<'a>(flags: &'a FlagManager, symbol: &str, authorize: &str) -> NodeBuilder<'a> {
    NodeBuilder::new(flags, symbol)
        .text(PIN_PROMPT.0, PIN_PROMPT.1)
        .item("0", "Back", "Rudi", Target::Back)
        .on_any_input(go(authorize))
}

/// Check the entered PIN and continue to `next` once authorized.
fn authorize<'a>(flags: &'a FlagManager, symbol: &str, next: &str) -> NodeBuilder<'a> {
    NodeBuilder::new(flags, symbol)
        .load("authorize_account")
        .on_flag("flag_account_blocked", go("blocked"))
        .on_flag("flag_invalid_pin", go("invalid_pin"))
        .on_flag("flag_account_authorized", go(next))
        .then(go("incorrect_pin"))
}

/// Run the initiating `handler`, then end the session on success or offer a
/// retry on failure.
fn initiate<'a>(flags: &'a FlagManager, symbol: &str, handler: &str) -> [NodeBuilder<'a>; 3] {
    let done = format!("{symbol}_done");
    let failed = format!("{symbol}_failed");
    [
        NodeBuilder::new(flags, symbol)
            .load(handler)
            .on_flag("flag_api_call_error", go(&failed))
            .then(go(&done)),
        NodeBuilder::new(flags, &done)
            .text(&slot(handler), &slot(handler))
            .terminal(),
        NodeBuilder::new(flags, &failed)
            .text(&slot(handler), &slot(handler))
            .item("1", "Retry", "Jaribu tena", Target::Back)
            .item("9", "Quit", "Ondoka", go("quit")),
    ]
}

/// A screen showing `handler` output after an input error.
fn retry_screen<'a>(flags: &'a FlagManager, symbol: &str, eng: &str, swa: &str) -> NodeBuilder<'a> {
    NodeBuilder::new(flags, symbol)
        .text(eng, swa)
        .item("1", "Retry", "Jaribu tena", Target::Back)
        .item("9", "Quit", "Ondoka", go("quit"))
}

/// A confirmation screen closing a flow.
fn success_screen<'a>(flags: &'a FlagManager, symbol: &str, eng: &str, swa: &str) -> NodeBuilder<'a> {
    NodeBuilder::new(flags, symbol)
        .text(eng, swa)
        .item("0", "Main menu", "Menyu kuu", Target::Root)
        .item("9", "Quit", "Ondoka", go("quit"))
}

// ---- registration ----

fn registration(flags: &FlagManager) -> Vec<NodeBuilder<'_>> {
    vec![
        NodeBuilder::new(flags, ROOT)
            .load("check_account_created")
            .load("check_blocked_status")
            .on_flag_reset("flag_language_set", go("select_language"))
            .on_flag_reset("flag_account_created", go("terms"))
            .on_flag_reset("flag_pin_set", go("create_pin"))
            .on_flag("flag_account_blocked", go("blocked"))
            .on_flag("flag_account_pin_reset", go("self_reset"))
            .then(go("main")),
        NodeBuilder::new(flags, "select_language")
            .text(
                "Welcome to Sarafu Network\nSelect language:",
                "Karibu Sarafu Network\nChagua lugha:",
            )
            .item("1", "English", "English", go("set_language"))
            .item("2", "Kiswahili", "Kiswahili", go("set_language")),
        NodeBuilder::new(flags, "set_language")
            .load("set_language")
            .then(Target::Root),
        NodeBuilder::new(flags, "terms")
            .text(
                "Do you agree to the terms and conditions?\nhttps://grassecon.org/pages/terms-and-conditions",
                "Kwa kutumia hii huduma, umekubali sheria na masharti?\nhttps://grassecon.org/pages/terms-and-conditions",
            )
            .item("1", "Yes", "Ndio", go("create_account"))
            .item("2", "No", "La", go("quit")),
        NodeBuilder::new(flags, "create_account")
            .load("create_account")
            .on_flag("flag_account_creation_failed", go("account_creation_failed"))
            .then(go("create_pin")),
        NodeBuilder::new(flags, "account_creation_failed")
            .text(
                "Your account creation request failed. Please try again later.",
                "Ombi lako la kusajiliwa haliwezi kukamilika. Tafadhali jaribu tena baadaye.",
            )
            .terminal(),
        NodeBuilder::new(flags, "create_pin")
            .text(
                "Please enter a new four number PIN for your account:",
                "Tafadhali weka PIN mpya yenye nambari nne kwa akaunti yako:",
            )
            .on_any_input(go("save_pin")),
        NodeBuilder::new(flags, "save_pin")
            .load("save_temporary_pin")
            .on_flag("flag_invalid_pin", go("invalid_pin"))
            .then(go("confirm_create_pin")),
        NodeBuilder::new(flags, "confirm_create_pin")
            .text(
                "Enter your four number PIN again:",
                "Weka PIN yako tena:",
            )
            .on_any_input(go("verify_pin")),
        NodeBuilder::new(flags, "verify_pin")
            .load("verify_create_pin")
            .on_flag("flag_pin_mismatch", go("pin_mismatch"))
            .then(go("account_status")),
        NodeBuilder::new(flags, "account_status")
            .load("reset_valid_pin")
            .load("check_account_status")
            .on_flag("flag_account_success", Target::Root)
            .then(go("account_pending")),
        NodeBuilder::new(flags, "account_pending")
            .text(
                "Your account is still being created. You will receive an SMS when your account is ready.",
                "Akaunti yako bado inatengenezwa. Utapokea ujumbe wakati akaunti yako itakapokuwa tayari.",
            )
            .terminal(),
    ]
}

// ---- pin ----

fn pin(flags: &FlagManager) -> Vec<NodeBuilder<'_>> {
    let mut nodes = vec![
        retry_screen(
            flags,
            "invalid_pin",
            "The PIN you have entered is invalid. Please try again.",
            "PIN uliyoweka sio sahihi. Tafadhali jaribu tena.",
        ),
        retry_screen(
            flags,
            "pin_mismatch",
            "The PIN is not a match. Try again.",
            "PIN uliyoweka haifanani. Jaribu tena.",
        ),
        NodeBuilder::new(flags, "incorrect_pin")
            .load("reset_incorrect_pin")
            .on_flag("flag_account_blocked", go("blocked"))
            .text(
                "Incorrect PIN. You have: {reset_incorrect_pin} remaining attempt(s)",
                "PIN ulioeka sio sahihi. Una majaribio {reset_incorrect_pin} yaliyobaki",
            )
            .item("1", "Retry", "Jaribu tena", Target::Back)
            .item("9", "Quit", "Ondoka", go("quit")),
        NodeBuilder::new(flags, "blocked")
            .load("show_blocked_account")
            .text("{show_blocked_account}", "{show_blocked_account}")
            .terminal(),
        NodeBuilder::new(flags, "self_reset")
            .text(
                "Your PIN was reset. Enter the temporary PIN you received:",
                "PIN yako imebadilishwa. Weka PIN ya muda uliyopokea:",
            )
            .on_any_input(go("authorize_self_reset")),
        authorize(flags, "authorize_self_reset", "new_pin"),
        NodeBuilder::new(flags, "pin_options")
            .item("1", "Change PIN", "Badili PIN", go("old_pin"))
            .item("2", "Reset other's PIN", "Badili PIN ya mwenzio", go("admin_check"))
            .item("0", "Back", "Rudi", Target::Back),
        NodeBuilder::new(flags, "old_pin")
            .text("Enter your old PIN:", "Weka PIN yako ya zamani:")
            .item("0", "Back", "Rudi", Target::Back)
            .on_any_input(go("authorize_pin_change")),
        authorize(flags, "authorize_pin_change", "new_pin"),
        NodeBuilder::new(flags, "new_pin")
            .text(
                "Enter a new four number PIN:",
                "Weka PIN mpya ya nambari nne:",
            )
            .on_any_input(go("save_new_pin")),
        NodeBuilder::new(flags, "save_new_pin")
            .load("save_temporary_pin")
            .on_flag("flag_invalid_pin", go("invalid_pin"))
            .then(go("confirm_new_pin")),
        NodeBuilder::new(flags, "confirm_new_pin")
            .text("Confirm your new PIN:", "Thibitisha PIN yako mpya:")
            .on_any_input(go("change_pin")),
        NodeBuilder::new(flags, "change_pin")
            .load("confirm_pin_change")
            .on_flag("flag_pin_mismatch", go("pin_mismatch"))
            .then(go("pin_changed")),
        success_screen(
            flags,
            "pin_changed",
            "Your PIN change request has been successful",
            "Ombi lako la kubadili PIN limefanikiwa",
        )
        .load("reset_account_authorized")
        .load("reset_allow_update"),
    ];
    nodes.extend(admin(flags));
    nodes
}

fn admin(flags: &FlagManager) -> Vec<NodeBuilder<'_>> {
    vec![
        NodeBuilder::new(flags, "admin_check")
            .load("check_admin")
            .on_flag_reset("flag_admin_privilege", go("not_admin"))
            .then(go("admin_number")),
        NodeBuilder::new(flags, "not_admin")
            .text(
                "You do not have privileges to perform this action",
                "Huna idhini ya kufanya hatua hii",
            )
            .item("0", "Back", "Rudi", Target::Back),
        NodeBuilder::new(flags, "admin_number")
            .text(
                "Enter the number of the member whose PIN you want to reset:",
                "Weka nambari ya mwanachama ambaye unataka kubadilisha PIN:",
            )
            .item("0", "Back", "Rudi", Target::Back)
            .on_any_input(go("validate_blocked")),
        NodeBuilder::new(flags, "validate_blocked")
            .load("validate_blocked_number")
            .on_flag("flag_unregistered_number", go("unregistered_number"))
            .then(go("admin_temp_pin")),
        retry_screen(
            flags,
            "unregistered_number",
            "The number {validate_blocked_number} is not registered",
            "Nambari {validate_blocked_number} haijasajiliwa",
        )
        .load("reset_unregistered_number"),
        NodeBuilder::new(flags, "admin_temp_pin")
            .load("retrieve_blocked_number")
            .text(
                "Enter a temporary PIN for {retrieve_blocked_number}:",
                "Weka PIN ya muda kwa {retrieve_blocked_number}:",
            )
            .item("0", "Back", "Rudi", Target::Back)
            .on_any_input(go("admin_reset")),
        NodeBuilder::new(flags, "admin_reset")
            .load("reset_others_pin")
            .on_flag("flag_invalid_pin", go("invalid_pin"))
            .then(go("admin_reset_done")),
        success_screen(flags, "admin_reset_done", "{reset_others_pin}", "{reset_others_pin}"),
    ]
}

// ---- main menu ----

fn main_menu(flags: &FlagManager) -> Vec<NodeBuilder<'_>> {
    vec![
        NodeBuilder::new(flags, "main")
            .load("manage_vouchers")
            .load("check_balance")
            .text("{check_balance}", "{check_balance}")
            .item("1", "Send", "Tuma", go("send"))
            .item("2", "Swap", "Badilisha", go("swap"))
            .item("3", "My Vouchers", "Sarafu yangu", go("my_vouchers"))
            .item("4", "Select pool", "Chagua bwawa", go("pools"))
            .item("5", "My Account", "Akaunti yangu", go("my_account"))
            .item("6", "Get M-Pesa", "Pata M-Pesa", go("mpesa"))
            .item("7", "Help", "Usaidizi", go("help"))
            .item("9", "Quit", "Ondoka", go("quit_balance")),
        NodeBuilder::new(flags, "quit")
            .load("quit")
            .text("{quit}", "{quit}")
            .terminal(),
        NodeBuilder::new(flags, "quit_balance")
            .load("quit_with_balance")
            .text("{quit_with_balance}", "{quit_with_balance}")
            .terminal(),
        NodeBuilder::new(flags, "help")
            .load("quit_with_help")
            .text("{quit_with_help}", "{quit_with_help}")
            .terminal(),
        NodeBuilder::new(flags, "api_failure")
            .load("reset_api_call_failure")
            .text(
                "Your request failed. Please try again later.",
                "Ombi lako halikufaulu. Tafadhali jaribu tena baadaye.",
            )
            .terminal(),
        NodeBuilder::new(flags, "no_voucher")
            .text(
                "You do not have any vouchers yet",
                "Bado huna sarafu yoyote",
            )
            .item("0", "Back", "Rudi", Target::Back)
            .item("9", "Quit", "Ondoka", go("quit")),
    ]
}

// ---- send ----

fn send(flags: &FlagManager) -> Vec<NodeBuilder<'_>> {
    let mut nodes = vec![
        NodeBuilder::new(flags, "send")
            .text(
                "Enter recipient's phone number/address/alias:",
                "Weka nambari ya simu/anwani/lakabu:",
            )
            .item("0", "Back", "Rudi", Target::Back)
            .on_any_input(go("validate_recipient")),
        NodeBuilder::new(flags, "validate_recipient")
            .load("transaction_reset")
            .load("validate_recipient")
            .on_flag("flag_invalid_recipient_with_invite", go("invite_recipient"))
            .on_flag("flag_invalid_recipient", go("invalid_recipient"))
            .on_flag("flag_api_call_error", go("api_failure"))
            .then(go("amount")),
        retry_screen(
            flags,
            "invalid_recipient",
            "{validate_recipient} is not registered or invalid, please try again:",
            "{validate_recipient} haijasajiliwa au sio sahihi, tafadhali weka tena:",
        ),
        NodeBuilder::new(flags, "invite_recipient")
            .text(
                "{validate_recipient} is not registered, please try again:",
                "{validate_recipient} haijasajiliwa, tafadhali weka tena:",
            )
            .item("1", "Retry", "Jaribu tena", Target::Back)
            .item("2", "Invite to Sarafu Network", "Karibisha kwa matandao wa Sarafu", go("invite"))
            .item("9", "Quit", "Ondoka", go("quit")),
        NodeBuilder::new(flags, "invite")
            .load("invite_valid_recipient")
            .text("{invite_valid_recipient}", "{invite_valid_recipient}")
            .terminal(),
        NodeBuilder::new(flags, "amount")
            .load("reset_transaction_amount")
            .load("max_amount")
            .on_flag("flag_api_call_error", go("api_failure"))
            .text(
                "Maximum amount: {max_amount}\nEnter amount:",
                "Kiwango cha juu: {max_amount}\nWeka kiwango:",
            )
            .item("0", "Back", "Rudi", Target::Back)
            .on_any_input(go("validate_amount")),
        NodeBuilder::new(flags, "validate_amount")
            .load("validate_amount")
            .on_flag("flag_invalid_amount", go("invalid_amount"))
            .on_flag("flag_swap_transaction", go("swap_transfer_pin"))
            .then(go("transfer_pin")),
        retry_screen(
            flags,
            "invalid_amount",
            "Amount {validate_amount} is invalid, please try again:",
            "Kiwango {validate_amount} sio sahihi, tafadhali weka tena:",
        ),
        NodeBuilder::new(flags, "transfer_pin")
            .load("get_recipient")
            .load("get_amount")
            .load("get_sender")
            .text(
                "{get_recipient} will receive {get_amount} from {get_sender}\nPlease enter your PIN to confirm:",
                "{get_recipient} atapokea {get_amount} kutoka kwa {get_sender}\nTafadhali weka PIN yako kudhibitisha:",
            )
            .item("0", "Back", "Rudi", Target::Back)
            .on_any_input(go("authorize_transfer")),
        NodeBuilder::new(flags, "swap_transfer_pin")
            .load("transaction_swap_preview")
            .on_flag("flag_api_call_error", go("api_failure"))
            .text(
                "{transaction_swap_preview}\nPlease enter your PIN to confirm:",
                "{transaction_swap_preview}\nTafadhali weka PIN yako kudhibitisha:",
            )
            .item("0", "Back", "Rudi", Target::Back)
            .on_any_input(go("authorize_transfer")),
        authorize(flags, "authorize_transfer", "transfer"),
    ];
    nodes.extend(initiate(flags, "transfer", "initiate_transaction"));
    nodes
}

// ---- vouchers ----

fn vouchers(flags: &FlagManager) -> Vec<NodeBuilder<'_>> {
    vec![
        NodeBuilder::new(flags, "my_vouchers")
            .item("1", "Select voucher", "Chagua sarafu", go("select_voucher"))
            .item("2", "Voucher details", "Maelezo ya sarafu", go("voucher_details"))
            .item("0", "Back", "Rudi", Target::Back),
        NodeBuilder::new(flags, "select_voucher")
            .load("get_vouchers")
            .text(
                "Select number or symbol from your vouchers:\n{get_vouchers}",
                "Chagua nambari au ishara ya sarafu yako:\n{get_vouchers}",
            )
            .item("0", "Back", "Rudi", Target::Back)
            .on_any_input(go("view_voucher")),
        NodeBuilder::new(flags, "view_voucher")
            .load("view_voucher")
            .on_flag("flag_incorrect_voucher", go("invalid_voucher"))
            .text(
                "Enter PIN to confirm selection:\n{view_voucher}",
                "Weka PIN kudhibitisha chaguo:\n{view_voucher}",
            )
            .item("0", "Back", "Rudi", Target::Back)
            .on_any_input(go("authorize_voucher")),
        retry_screen(
            flags,
            "invalid_voucher",
            "Voucher {view_voucher} is not in your list",
            "Sarafu {view_voucher} haipo kwenye orodha yako",
        ),
        authorize(flags, "authorize_voucher", "voucher_set"),
        success_screen(
            flags,
            "voucher_set",
            "Success! {set_voucher} is now your active voucher.",
            "Hongera! {set_voucher} ni sarafu inayotumika sasa.",
        )
        .load("set_voucher")
        .load("reset_account_authorized")
        .load("reset_allow_update"),
        NodeBuilder::new(flags, "voucher_details")
            .load("get_voucher_details")
            .text("{get_voucher_details}", "{get_voucher_details}")
            .item("0", "Back", "Rudi", Target::Back),
    ]
}

// ---- pools and swaps ----

fn pools(flags: &FlagManager) -> Vec<NodeBuilder<'_>> {
    vec![
        NodeBuilder::new(flags, "pools")
            .load("get_default_pool")
            .load("get_pools")
            .on_flag("flag_api_call_error", go("api_failure"))
            .text(
                "Active pool: {get_default_pool}\nSelect pool:\n{get_pools}",
                "Bwawa linalotumika: {get_default_pool}\nChagua bwawa:\n{get_pools}",
            )
            .item("0", "Back", "Rudi", Target::Back)
            .on_any_input(go("view_pool")),
        NodeBuilder::new(flags, "view_pool")
            .load("view_pool")
            .on_flag("flag_incorrect_pool", go("invalid_pool"))
            .on_flag("flag_api_call_error", go("api_failure"))
            .text(
                "{view_pool}\nPlease enter your PIN to confirm:",
                "{view_pool}\nTafadhali weka PIN yako kudhibitisha:",
            )
            .item("0", "Back", "Rudi", Target::Back)
            .on_any_input(go("authorize_pool")),
        retry_screen(
            flags,
            "invalid_pool",
            "Pool {view_pool} was not found",
            "Bwawa {view_pool} halikupatikana",
        ),
        authorize(flags, "authorize_pool", "pool_set"),
        success_screen(
            flags,
            "pool_set",
            "Success! {set_default_pool} is now your active pool.",
            "Hongera! {set_default_pool} ni bwawa linalotumika sasa.",
        )
        .load("set_default_pool")
        .load("reset_account_authorized")
        .load("reset_allow_update"),
    ]
}

fn swap(flags: &FlagManager) -> Vec<NodeBuilder<'_>> {
    let mut nodes = vec![
        NodeBuilder::new(flags, "swap")
            .load("load_swap_to_list")
            .on_flag("flag_no_active_voucher", go("no_voucher"))
            .on_flag("flag_incorrect_voucher", go("swap_unavailable"))
            .on_flag("flag_api_call_error", go("api_failure"))
            .text(
                "Select a voucher to swap to:\n{load_swap_to_list}",
                "Chagua sarafu ya kubadilisha kwa:\n{load_swap_to_list}",
            )
            .item("0", "Back", "Rudi", Target::Back)
            .on_any_input(go("swap_limit")),
        NodeBuilder::new(flags, "swap_unavailable")
            .text(
                "{load_swap_to_list} can not be swapped in the active pool",
                "{load_swap_to_list} haiwezi kubadilishwa kwenye bwawa linalotumika",
            )
            .item("0", "Back", "Rudi", Target::Back),
        NodeBuilder::new(flags, "swap_limit")
            .load("swap_max_limit")
            .on_flag("flag_incorrect_voucher", go("invalid_swap_voucher"))
            .on_flag("flag_api_call_error", go("api_failure"))
            .on_flag("flag_low_swap_amount", go("low_swap"))
            .text(
                "Maximum amount: {swap_max_limit}\nEnter amount:",
                "Kiwango cha juu: {swap_max_limit}\nWeka kiwango:",
            )
            .item("0", "Back", "Rudi", Target::Back)
            .on_any_input(go("swap_preview")),
        retry_screen(
            flags,
            "invalid_swap_voucher",
            "Voucher {swap_max_limit} is not in the list",
            "Sarafu {swap_max_limit} haipo kwenye orodha",
        ),
        NodeBuilder::new(flags, "low_swap")
            .text(
                "Available amount {swap_max_limit} is too low, please try again later",
                "Kiwango kinachopatikana {swap_max_limit} ni cha chini sana, tafadhali jaribu tena baadaye",
            )
            .item("0", "Back", "Rudi", Target::Back)
            .item("9", "Quit", "Ondoka", go("quit")),
        NodeBuilder::new(flags, "swap_preview")
            .load("swap_preview")
            .on_flag("flag_invalid_amount", go("invalid_swap_amount"))
            .on_flag("flag_api_call_error", go("api_failure"))
            .text(
                "{swap_preview}\nPlease enter your PIN to confirm:",
                "{swap_preview}\nTafadhali weka PIN yako kudhibitisha:",
            )
            .item("0", "Back", "Rudi", Target::Back)
            .on_any_input(go("authorize_swap")),
        retry_screen(
            flags,
            "invalid_swap_amount",
            "Amount {swap_preview} is invalid, please try again:",
            "Kiwango {swap_preview} sio sahihi, tafadhali weka tena:",
        ),
        authorize(flags, "authorize_swap", "swap_initiated"),
    ];
    nodes.extend(initiate(flags, "swap_initiated", "initiate_swap"));
    nodes
}

fn mpesa(flags: &FlagManager) -> Vec<NodeBuilder<'_>> {
    let mut nodes = vec![
        NodeBuilder::new(flags, "mpesa")
            .load("get_mpesa_max_limit")
            .on_flag("flag_no_active_voucher", go("no_voucher"))
            .on_flag("flag_incorrect_voucher", go("mpesa_unavailable"))
            .on_flag("flag_api_call_error", go("api_failure"))
            .on_flag("flag_low_swap_amount", go("mpesa_low"))
            .text(
                "Maximum: {get_mpesa_max_limit} KES\nEnter the amount in KES:",
                "Kiwango cha juu: KES {get_mpesa_max_limit}\nWeka kiwango kwa KES:",
            )
            .item("0", "Back", "Rudi", Target::Back)
            .on_any_input(go("mpesa_preview")),
        NodeBuilder::new(flags, "mpesa_unavailable")
            .text(
                "{get_mpesa_max_limit} can not be cashed out in the active pool",
                "{get_mpesa_max_limit} haiwezi kutolewa kwenye bwawa linalotumika",
            )
            .item("0", "Back", "Rudi", Target::Back),
        NodeBuilder::new(flags, "mpesa_low")
            .text(
                "Available amount {get_mpesa_max_limit} KES is too low",
                "Kiwango kinachopatikana KES {get_mpesa_max_limit} ni cha chini sana",
            )
            .item("0", "Back", "Rudi", Target::Back),
        NodeBuilder::new(flags, "mpesa_preview")
            .load("get_mpesa_preview")
            .on_flag("flag_invalid_amount", go("invalid_mpesa_amount"))
            .on_flag("flag_api_call_error", go("api_failure"))
            .text(
                "{get_mpesa_preview}\nPlease enter your PIN to confirm:",
                "{get_mpesa_preview}\nTafadhali weka PIN yako kudhibitisha:",
            )
            .item("0", "Back", "Rudi", Target::Back)
            .on_any_input(go("authorize_mpesa")),
        retry_screen(
            flags,
            "invalid_mpesa_amount",
            "Amount {get_mpesa_preview} is invalid, please try again:",
            "Kiwango {get_mpesa_preview} sio sahihi, tafadhali weka tena:",
        ),
        authorize(flags, "authorize_mpesa", "mpesa_initiated"),
    ];
    nodes.extend(initiate(flags, "mpesa_initiated", "initiate_get_mpesa"));
    nodes
}

// ---- account ----

fn account(flags: &FlagManager) -> Vec<NodeBuilder<'_>> {
    vec![
        NodeBuilder::new(flags, "my_account")
            .item("1", "Profile", "Wasifu wangu", go("my_profile"))
            .item("2", "Change language", "Badili lugha", go("change_language"))
            .item("3", "Check balances", "Angalia salio", go("balances"))
            .item("4", "Check statement", "Taarifa ya matumizi", go("statement_pin"))
            .item("5", "PIN options", "Mipangilio ya PIN", go("pin_options"))
            .item("6", "My Address", "Anwani yangu", go("address"))
            .item("7", "My Alias", "Lakabu yangu", go("my_alias"))
            .item("0", "Back", "Rudi", Target::Back),
        NodeBuilder::new(flags, "change_language")
            .item("1", "English", "English", go("set_language"))
            .item("2", "Kiswahili", "Kiswahili", go("set_language"))
            .item("0", "Back", "Rudi", Target::Back),
        NodeBuilder::new(flags, "balances")
            .load("check_balance")
            .text("{check_balance}", "{check_balance}")
            .item("0", "Back", "Rudi", Target::Back),
        NodeBuilder::new(flags, "address")
            .load("check_identifier")
            .text("{check_identifier}", "{check_identifier}")
            .item("1", "Send by SMS", "Tuma kwa SMS", go("address_sms"))
            .item("0", "Back", "Rudi", Target::Back),
        NodeBuilder::new(flags, "address_sms")
            .load("send_address_sms")
            .on_flag("flag_api_call_error", go("api_failure"))
            .text(
                "Your address has been sent by SMS",
                "Anwani yako imetumwa kwa SMS",
            )
            .item("0", "Back", "Rudi", Target::Back),
        // statement
        pin_screen(flags, "statement_pin", "authorize_statement"),
        authorize(flags, "authorize_statement", "statement"),
        NodeBuilder::new(flags, "statement")
            .load("reset_account_authorized")
            .load("reset_allow_update")
            .load("check_transactions")
            .load("get_transactions")
            .on_flag("flag_api_call_error", go("api_failure"))
            .on_flag("flag_no_transfers", go("no_transfers"))
            .text("{get_transactions}", "{get_transactions}")
            .item("0", "Main menu", "Menyu kuu", Target::Root)
            .on_any_input(go("view_statement")),
        NodeBuilder::new(flags, "view_statement")
            .load("view_statement")
            .on_flag("flag_incorrect_statement", go("invalid_statement"))
            .text("{view_statement}", "{view_statement}")
            .item("0", "Back", "Rudi", Target::Back),
        retry_screen(
            flags,
            "invalid_statement",
            "Statement entry {view_statement} was not found",
            "Taarifa {view_statement} haikupatikana",
        ),
        success_screen(
            flags,
            "no_transfers",
            "No transaction history",
            "Hakuna historia ya matumizi",
        ),
        // alias
        NodeBuilder::new(flags, "my_alias")
            .load("get_current_alias")
            .text(
                "Current alias: {get_current_alias}\nEnter a new alias:",
                "Lakabu ya sasa: {get_current_alias}\nWeka lakabu mpya:",
            )
            .item("0", "Back", "Rudi", Target::Back)
            .on_any_input(go("request_alias")),
        NodeBuilder::new(flags, "request_alias")
            .load("request_custom_alias")
            .on_flag("flag_api_call_error", go("api_failure"))
            .then(go("confirm_alias")),
        NodeBuilder::new(flags, "confirm_alias")
            .load("get_suggested_alias")
            .text(
                "Your alias will be {get_suggested_alias}\nPlease enter your PIN to confirm:",
                "Lakabu yako itakuwa {get_suggested_alias}\nTafadhali weka PIN yako kudhibitisha:",
            )
            .item("0", "Back", "Rudi", Target::Back)
            .on_any_input(go("authorize_alias")),
        authorize(flags, "authorize_alias", "alias_saved"),
        success_screen(flags, "alias_saved", "{confirm_new_alias}", "{confirm_new_alias}")
            .load("confirm_new_alias")
            .load("reset_account_authorized")
            .load("reset_allow_update"),
    ]
}

// ---- profile ----

/// Profile screens. Editing a field that was never set walks on through the
/// remaining fields and commits them together; editing a set field commits
/// it alone.
fn profile(flags: &FlagManager) -> Vec<NodeBuilder<'_>> {
    let mut nodes = vec![
        NodeBuilder::new(flags, "my_profile")
            .load("reset_allow_update")
            .load("clear_temporary_value")
            .item("1", "Edit first name", "Weka jina la kwanza", go("edit_first_name"))
            .item("2", "Edit family name", "Weka jina la familia", go("edit_family_name"))
            .item("3", "Edit gender", "Weka jinsia", go("edit_gender"))
            .item("4", "Edit year of birth", "Weka mwaka wa kuzaliwa", go("edit_yob"))
            .item("5", "Edit location", "Weka eneo", go("edit_location"))
            .item("6", "Edit offerings", "Weka bidhaa", go("edit_offerings"))
            .item("7", "View profile", "Angalia wasifu", go("view_profile"))
            .item("0", "Back", "Rudi", Target::Back),
        NodeBuilder::new(flags, "view_profile")
            .load("get_profile_info")
            .text("{get_profile_info}", "{get_profile_info}")
            .item("0", "Back", "Rudi", Target::Back),
        NodeBuilder::new(flags, "verify_yob")
            .load("verify_yob")
            .on_flag("flag_incorrect_date_format", go("incorrect_yob"))
            .then(go("save_yob")),
        retry_screen(
            flags,
            "incorrect_yob",
            "The year of birth {verify_yob} is invalid. Please try again.",
            "Mwaka wa kuzaliwa {verify_yob} sio sahihi. Tafadhali jaribu tena.",
        )
        .load("reset_incorrect_date_format"),
        pin_screen(flags, "profile_pin", "authorize_profile"),
        authorize(flags, "authorize_profile", "profile_saved"),
        success_screen(
            flags,
            "profile_saved",
            "Profile updated successfully",
            "Wasifu umewekwa kikamilifu",
        )
        .load("update_all_profile_items")
        .load("reset_allow_update")
        .load("reset_account_authorized"),
    ];

    for (i, step) in PROFILE_STEPS.iter().enumerate() {
        let name = step.name;
        let save = format!("save_{name}");
        let next = match PROFILE_STEPS.get(i + 1) {
            Some(n) => format!("edit_{}", n.name),
            None => "profile_pin".to_string(),
        };
        let entered = if name == "yob" {
            go("verify_yob")
        } else {
            go(&save)
        };

        let mut edit = NodeBuilder::new(flags, &format!("edit_{name}"))
            .load("get_current_profile_info");
        edit = if name == "gender" {
            edit.text(step.eng, step.swa)
                .item("1", "Male", "Mwanaume", go(&save))
                .item("2", "Female", "Mwanamke", go(&save))
                .item("3", "Unspecified", "Haijabainishwa", go(&save))
                .item("0", "Back", "Rudi", Target::Back)
        } else {
            edit.text(
                &format!("{}\n{{get_current_profile_info}}", step.eng),
                &format!("{}\n{{get_current_profile_info}}", step.swa),
            )
            .item("0", "Back", "Rudi", Target::Back)
            .on_any_input(entered)
        };

        let pin = format!("{name}_pin");
        let authorize_step = format!("authorize_{name}");
        let commit = format!("commit_{name}");
        nodes.extend([
            edit,
            NodeBuilder::new(flags, &save)
                .load(step.saver)
                .on_flag_reset(step.flag, go(&next))
                .then(go(&pin)),
            pin_screen(flags, &pin, &authorize_step),
            authorize(flags, &authorize_step, &commit),
            success_screen(
                flags,
                &commit,
                "Profile updated successfully",
                "Wasifu umewekwa kikamilifu",
            )
            .load(step.saver)
            .load("update_all_profile_items")
            .load("reset_allow_update")
            .load("reset_account_authorized"),
        ]);
    }
    nodes
}

/// Build the complete application menu, resolving every flag name.
///
/// # Errors
///
/// Fails on an unknown flag name or a duplicate node.
pub fn app_menu(flags: &FlagManager) -> Result<MenuTree> {
    let mut tree = MenuTree::new(ROOT);
    let sections = [
        registration(flags),
        pin(flags),
        main_menu(flags),
        send(flags),
        vouchers(flags),
        pools(flags),
        swap(flags),
        mpesa(flags),
        account(flags),
        profile(flags),
    ];
    for node in sections.into_iter().flatten() {
        tree.insert(node.build()?)?;
    }
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::AppConfig;
    use crate::handlers::{register_all, MenuHandlers};
    use crate::registry::HandlerRegistry;
    use crate::state::FlagSet;
    use crate::store::{MemoryStore, UserDataStore};
    use crate::testing::FakeAccountService;

    fn registry() -> HandlerRegistry {
        let handlers = MenuHandlers::new(
            UserDataStore::new(Arc::new(MemoryStore::new())),
            Arc::new(FlagManager::builtin().unwrap()),
            Arc::new(FakeAccountService::new()),
            AppConfig::default(),
            ":",
        );
        let mut registry = HandlerRegistry::new();
        register_all(Arc::new(handlers), &mut registry);
        registry
    }

    #[test]
    fn test_menu_is_complete() {
        let flags = FlagManager::builtin().unwrap();
        let tree = app_menu(&flags).unwrap();
        tree.validate(&registry()).unwrap();
        assert_eq!(tree.root(), ROOT);
    }

    #[test]
    fn test_root_routes_new_sessions_to_language() {
        let flags = FlagManager::builtin().unwrap();
        let tree = app_menu(&flags).unwrap();
        let root = tree.get(ROOT).unwrap();
        let edge = root.entry_edge(&FlagSet::new(128), "").unwrap();
        assert_eq!(edge.to, go("select_language"));
    }

    #[test]
    fn test_registered_user_reaches_main() {
        let flags = FlagManager::builtin().unwrap();
        let tree = app_menu(&flags).unwrap();
        let mut set = FlagSet::new(128);
        for name in ["flag_language_set", "flag_account_created", "flag_pin_set"] {
            set.set(flags.get(name).unwrap()).unwrap();
        }
        let root = tree.get(ROOT).unwrap();
        assert_eq!(root.entry_edge(&set, "").unwrap().to, go("main"));

        set.set(flags.get("flag_account_blocked").unwrap()).unwrap();
        assert_eq!(root.entry_edge(&set, "").unwrap().to, go("blocked"));
    }

    #[test]
    fn test_profile_capture_walks_fields() {
        let flags = FlagManager::builtin().unwrap();
        let tree = app_menu(&flags).unwrap();
        let save = tree.get("save_first_name").unwrap();
        assert_eq!(
            save.entry_edge(&FlagSet::new(128), "").unwrap().to,
            go("edit_family_name")
        );
        let last = tree.get("save_offerings").unwrap();
        assert_eq!(
            last.entry_edge(&FlagSet::new(128), "").unwrap().to,
            go("profile_pin")
        );
    }
}
