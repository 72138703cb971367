use anyhow::{Context, Result};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{info, warn};

use crate::calendar::TravelWindow;
use crate::config::Config;

/// HTML email alerts for flight deals, sent over SMTP with STARTTLS.
/// Without credentials the notifier degrades to a warning no-op.
pub struct EmailNotifier {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    config: Config,
}

impl EmailNotifier {
    pub fn new(config: Config) -> Result<Self> {
        let transport = match (&config.smtp_user, &config.smtp_password) {
            (Some(user), Some(password)) => {
                let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(
                    &config.smtp_host,
                )
                .context("configuring SMTP relay")?
                .port(config.smtp_port)
                .credentials(Credentials::new(user.clone(), password.clone()))
                .build();
                Some(transport)
            }
            _ => None,
        };

        Ok(Self { transport, config })
    }

    /// Deliver one deal alert. An `Err` here means the alert did not go out
    /// and the caller must leave the ledger unmarked so a later run can
    /// retry the same day.
    pub async fn send_deal_alert(
        &self,
        window: &TravelWindow,
        per_person_price: f64,
        total_price: f64,
        reason: &str,
    ) -> Result<()> {
        let Some(transport) = &self.transport else {
            warn!("SMTP credentials not configured - skipping email");
            return Ok(());
        };

        // Transport exists, so both credentials are present.
        let from = self.config.smtp_user.as_deref().unwrap_or_default();
        let to = self.config.alert_to.as_deref().unwrap_or(from);

        let subject = format!(
            "✈️ Flight Deal! {}→{} ${per_person_price:.0}/person ({}–{})",
            self.config.origin,
            self.config.destination,
            window.depart.format("%b %d"),
            window.ret.format("%b %d"),
        );

        let email = Message::builder()
            .from(from.parse::<Mailbox>().context("invalid from address")?)
            .to(to.parse::<Mailbox>().context("invalid to address")?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(self.render_html(window, per_person_price, total_price, reason))
            .context("building email")?;

        transport
            .send(email)
            .await
            .context("sending alert email")?;

        info!("Alert email sent to {}", to);
        Ok(())
    }

    fn render_html(
        &self,
        window: &TravelWindow,
        per_person_price: f64,
        total_price: f64,
        reason: &str,
    ) -> String {
        let route = format!("{} → {}", self.config.origin, self.config.destination);
        format!(
            r#"<html><body style="font-family: -apple-system, sans-serif; max-width: 500px;">
<h2 style="color: #1a73e8;">Flight Deal Alert</h2>
<table style="border-collapse: collapse; width: 100%;">
  <tr><td style="padding: 8px; font-weight: bold;">Route</td>
      <td style="padding: 8px;">{route} (nonstop, Delta)</td></tr>
  <tr style="background: #f8f9fa;">
      <td style="padding: 8px; font-weight: bold;">Depart</td>
      <td style="padding: 8px;">{depart}</td></tr>
  <tr><td style="padding: 8px; font-weight: bold;">Return</td>
      <td style="padding: 8px;">{ret}</td></tr>
  <tr style="background: #f8f9fa;">
      <td style="padding: 8px; font-weight: bold;">Price</td>
      <td style="padding: 8px; color: #0d904f; font-size: 1.2em; font-weight: bold;">
        ${per_person_price:.0}/person · ${total_price:.0} total ({pax} passengers)
      </td></tr>
  <tr><td style="padding: 8px; font-weight: bold;">Why it's a deal</td>
      <td style="padding: 8px;">{reason}</td></tr>
</table>
<p style="color: #666; font-size: 0.85em; margin-top: 20px;">
  Sent by FareWatch · {route} for ISD 833 school breaks
</p>
</body></html>"#,
            depart = window.depart.format("%A, %B %d, %Y"),
            ret = window.ret.format("%A, %B %d, %Y"),
            pax = self.config.passenger_count(),
        )
    }
}
