//! Alert emails.
//!
//! [`Notifier::send`] reports success as a plain bool; delivery errors are
//! logged here and never reach the evaluation pass.

use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use serde_json::json;

use crate::{
    config::SmtpSettings,
    models::AlertCondition,
    templates::{self, Hbs},
};

#[derive(Debug, Clone, PartialEq)]
pub struct AlertNotification {
    pub to_address: String,
    pub asset: String,
    pub target_price: f64,
    pub current_price: f64,
    pub condition: AlertCondition,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &AlertNotification) -> bool;
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    #[error("email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("email build error: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("template error: {0}")]
    Template(#[from] handlebars::RenderError),
}

/// `1234567.891` => `"1,234,567.89"`. Amounts under 1 keep up to 8 decimals
/// (`0.00002` => `"0.00002"`), never fewer than 2.
pub fn fmt_usd(x: f64) -> String {
    let abs = x.abs();
    let s = if abs < 1.0 {
        let mut s = format!("{abs:.8}");
        let min_len = s.find('.').map_or(s.len(), |dot| dot + 3);
        while s.len() > min_len && s.ends_with('0') {
            s.pop();
        }
        s
    } else {
        format!("{abs:.2}")
    };
    let (int, frac) = s.split_once('.').unwrap_or((s.as_str(), "00"));

    let mut grouped = String::with_capacity(int.len() + int.len() / 3);
    for (i, ch) in int.chars().enumerate() {
        if i > 0 && (int.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if x < 0.0 { "-" } else { "" };
    format!("{sign}{grouped}.{frac}")
}

pub fn subject_for(n: &AlertNotification) -> String {
    format!("{} Price Alert Triggered!", n.asset.to_uppercase())
}

pub fn render_body(hbs: &Hbs, n: &AlertNotification) -> Result<String, NotifyError> {
    let ctx = json!({
        "asset": n.asset.to_uppercase(),
        "condition": n.condition.as_str(),
        "target_price": fmt_usd(n.target_price),
        "current_price": fmt_usd(n.current_price),
    });
    Ok(hbs.render(templates::ALERT_EMAIL, &ctx)?)
}

/// Sends HTML alert emails over SMTP (STARTTLS).
pub struct SmtpNotifier {
    from_address: String,
    hbs: Hbs,
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpNotifier {
    pub fn new(config: &SmtpSettings, hbs: Hbs) -> Result<Self, NotifyError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port);

        if let (Some(user), Some(pass)) = (&config.user, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            from_address: config.from_address.clone(),
            hbs,
            mailer: builder.build(),
        })
    }

    async fn deliver(&self, n: &AlertNotification) -> Result<(), NotifyError> {
        let body = render_body(&self.hbs, n)?;

        let email = Message::builder()
            .from(self.from_address.parse()?)
            .to(n.to_address.parse()?)
            .subject(subject_for(n))
            .header(ContentType::TEXT_HTML)
            .body(body)?;

        self.mailer.send(email).await?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, n: &AlertNotification) -> bool {
        match self.deliver(n).await {
            Ok(()) => {
                tracing::info!(to = %n.to_address, asset = %n.asset, "alert email sent");
                true
            }
            Err(e) => {
                tracing::error!(to = %n.to_address, asset = %n.asset, error = %e, "error sending alert email");
                false
            }
        }
    }
}

/// Used when SMTP is not configured: the notification is only logged.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, n: &AlertNotification) -> bool {
        tracing::info!(
            to = %n.to_address,
            asset = %n.asset,
            condition = %n.condition,
            target_price = n.target_price,
            current_price = n.current_price,
            "alert notification (email delivery not configured)"
        );
        true
    }
}
