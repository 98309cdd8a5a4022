//! Texts produced by handlers, per language.
//!
//! Screen templates live on the menu nodes; this catalog covers the content
//! handlers compute. Placeholders use the `{name}` syntax of the menu
//! templates.

use crate::menu::fill_template;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Text {
    RequestFailed,
    Balance,
    TransferSent,
    SwapSent,
    MpesaSent,
    SwapPreview,
    TransferSwapPreview,
    MpesaPreview,
    NotProvided,
    ProfileInfo,
    VoucherDetails,
    StatementSent,
    StatementReceived,
    StatementDetail,
    DirectionSent,
    DirectionReceived,
    Goodbye,
    GoodbyeWithBalance,
    GoodbyeWithHelp,
    AccountBlocked,
    PinResetDone,
    AliasRequested,
    InviteSent,
    NoAlias,
}

impl Text {
    pub fn get(self, lang: &str) -> &'static str {
        let (eng, swa) = match self {
            Text::RequestFailed => (
                "Your request failed. Please try again later.",
                "Ombi lako halikufaulu. Tafadhali jaribu tena baadaye.",
            ),
            Text::Balance => ("Balance: {balance} {symbol}", "Salio: {balance} {symbol}"),
            Text::TransferSent => (
                "Your request has been sent. {recipient} will receive {amount} {symbol} from {sender}.",
                "Ombi lako limetumwa. {recipient} atapokea {amount} {symbol} kutoka kwa {sender}.",
            ),
            Text::SwapSent => (
                "Your request has been sent. You will receive {amount} {symbol}.",
                "Ombi lako limetumwa. Utapokea {amount} {symbol}.",
            ),
            Text::MpesaSent => (
                "Your request has been sent. You will receive {kes} KES on M-Pesa.",
                "Ombi lako limetumwa. Utapokea KES {kes} kwa M-Pesa.",
            ),
            Text::SwapPreview => (
                "You will swap {amount} {from} for {out} {to}",
                "Utabadilisha {amount} {from} kwa {out} {to}",
            ),
            Text::TransferSwapPreview => (
                "{recipient} will receive {out} {to} for {amount} {from}",
                "{recipient} atapokea {out} {to} kwa {amount} {from}",
            ),
            Text::MpesaPreview => (
                "You are sending {amount} {symbol} to receive {kes} KES",
                "Unatuma {amount} {symbol} ili kupokea KES {kes}",
            ),
            Text::NotProvided => ("Not provided", "Haijawekwa"),
            Text::ProfileInfo => (
                "Name: {name}\nGender: {gender}\nAge: {age}\nLocation: {location}\nYou provide: {offerings}",
                "Jina: {name}\nJinsia: {gender}\nUmri: {age}\nEneo: {location}\nUnauza: {offerings}",
            ),
            Text::VoucherDetails => (
                "Name: {name}\nSymbol: {symbol}\nCommodity: {commodity}\nLocation: {location}",
                "Jina: {name}\nIshara: {symbol}\nBidhaa: {commodity}\nEneo: {location}",
            ),
            Text::StatementSent => (
                "{index}:Sent {value} {symbol} {date}",
                "{index}:Ulituma {value} {symbol} {date}",
            ),
            Text::StatementReceived => (
                "{index}:Received {value} {symbol} {date}",
                "{index}:Ulipokea {value} {symbol} {date}",
            ),
            Text::StatementDetail => (
                "{direction} {value} {symbol}\n{party}\n{date}\n{hash}",
                "{direction} {value} {symbol}\n{party}\n{date}\n{hash}",
            ),
            Text::DirectionSent => ("Sent", "Ulituma"),
            Text::DirectionReceived => ("Received", "Ulipokea"),
            Text::Goodbye => ("Thank you for using Sarafu. Goodbye!", "Asante kwa kutumia huduma ya Sarafu. Kwaheri!"),
            Text::GoodbyeWithBalance => (
                "Your account balance is {balance} {symbol}",
                "Salio lako ni {balance} {symbol}",
            ),
            Text::GoodbyeWithHelp => (
                "For more help, please call: 0757628885",
                "Kwa usaidizi zaidi, piga: 0757628885",
            ),
            Text::AccountBlocked => (
                "Your PIN has been blocked. For help, please call: 0757628885",
                "PIN yako imefungwa. Kwa usaidizi tafadhali piga: 0757628885",
            ),
            Text::PinResetDone => (
                "PIN reset for {number} was successful",
                "PIN ya {number} imebadilishwa",
            ),
            Text::AliasRequested => (
                "Your alias {alias} is being set up",
                "Jina lako {alias} linawekwa",
            ),
            Text::InviteSent => (
                "Your invitation to {recipient} to join Sarafu Network has been sent.",
                "Ombi lako la kumwalika {recipient} kwa matandao wa Sarafu limetumwa.",
            ),
            Text::NoAlias => ("No alias set", "Hakuna jina"),
        };
        if lang == "swa" {
            swa
        } else {
            eng
        }
    }

    /// The text in `lang` with `{name}` placeholders filled from `args`.
    pub fn render(self, lang: &str, args: &[(&str, &str)]) -> String {
        fill_template(self.get(lang), |name| {
            args.iter().find(|(k, _)| *k == name).map(|(_, v)| *v)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_transfer_sent() {
        let text = Text::TransferSent.render(
            "eng",
            &[
                ("recipient", "0711223344"),
                ("amount", "1.00"),
                ("symbol", "SRF"),
                ("sender", "+254700000000"),
            ],
        );
        assert_eq!(
            text,
            "Your request has been sent. 0711223344 will receive 1.00 SRF from +254700000000."
        );
    }

    #[test]
    fn test_languages() {
        assert_eq!(Text::NotProvided.get("eng"), "Not provided");
        assert_eq!(Text::NotProvided.get("swa"), "Haijawekwa");
        assert_eq!(Text::NotProvided.get("fra"), "Not provided");
        assert_eq!(
            Text::Balance.render("swa", &[("balance", "1.00"), ("symbol", "SRF")]),
            "Salio: 1.00 SRF"
        );
    }
}
