use axum::extract::State;
use axum::Form;
use std::str::FromStr;
use strum::EnumString;

use crate::app_state::AppState;
use crate::models::fax::SmsWebhook;
use crate::routes::twiml::TwiML;

pub const HELP_TEXT: &str = "Msg&Data rates may apply. Fax options are:
ok (approve pending fax)
media (link to pending fax)
help
options
settings
fax enable|disable
notify on|off";

pub const FALLBACK_TEXT: &str =
    "I don't understand. Try \"help\" or \"options\" to see what I can do.";

/// Keywords understood in inbound text messages, after lowercasing and
/// removing spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum SmsCommand {
    #[strum(serialize = "ok", serialize = "approve", serialize = "yes")]
    Approve,
    #[strum(serialize = "media", serialize = "link")]
    Media,
    #[strum(serialize = "help", serialize = "options")]
    Help,
    #[strum(serialize = "settings")]
    Settings,
    #[strum(serialize = "faxenable", serialize = "faxon")]
    FaxEnable,
    #[strum(serialize = "faxdisable", serialize = "faxoff")]
    FaxDisable,
    #[strum(serialize = "notifyenable", serialize = "notifyon")]
    NotifyOn,
    #[strum(serialize = "notifydisable", serialize = "notifyoff")]
    NotifyOff,
}

impl SmsCommand {
    pub fn parse(body: &str) -> Option<Self> {
        let normalized: String = body
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        Self::from_str(&normalized).ok()
    }

    /// Commands that change how the service behaves.
    fn is_admin(self) -> bool {
        matches!(
            self,
            SmsCommand::FaxEnable
                | SmsCommand::FaxDisable
                | SmsCommand::NotifyOn
                | SmsCommand::NotifyOff
                | SmsCommand::Settings
        )
    }
}

fn log_sms(sms: &SmsWebhook) {
    tracing::info!(
        from = %sms.from,
        location = %sms.location(),
        to = %sms.to,
        error_code = %sms.error_code,
        status = %sms.status(),
        "SMS status"
    );
}

/// POST /smsReceive — Inbound text message.
pub async fn sms_receive(State(state): State<AppState>, Form(sms): Form<SmsWebhook>) -> TwiML {
    log_sms(&sms);

    let command = SmsCommand::parse(&sms.body)
        .filter(|c| !c.is_admin() || state.trust.contains(&sms.from));

    let reply = match command {
        Some(SmsCommand::Approve) => {
            if let Err(e) = state.coordinator.request_approval(&sms.from) {
                tracing::error!(from = %sms.from, error = %e, "Unable to queue approval");
            }
            return TwiML::Empty;
        }
        Some(SmsCommand::Media) => {
            if let Err(e) = state.coordinator.query_media(&sms.from) {
                tracing::error!(from = %sms.from, error = %e, "Unable to queue media query");
            }
            return TwiML::Empty;
        }
        Some(SmsCommand::Help) => HELP_TEXT.to_string(),
        Some(SmsCommand::Settings) => format!("Fax settings:\n{}", state.settings.describe()),
        Some(SmsCommand::FaxEnable) => {
            state.settings.set_receive_faxes(true);
            "Receiving faxes enabled.".to_string()
        }
        Some(SmsCommand::FaxDisable) => {
            state.settings.set_receive_faxes(false);
            "Receiving faxes disabled.".to_string()
        }
        Some(SmsCommand::NotifyOn) => {
            state.settings.set_notify(true);
            "Fax notifications enabled.".to_string()
        }
        Some(SmsCommand::NotifyOff) => {
            state.settings.set_notify(false);
            "Fax notifications disabled.".to_string()
        }
        None => FALLBACK_TEXT.to_string(),
    };

    TwiML::Message(reply)
}

/// POST /smsStatus — Delivery report for a message we sent.
pub async fn sms_status(Form(sms): Form<SmsWebhook>) -> &'static str {
    log_sms(&sms);
    "OK"
}
