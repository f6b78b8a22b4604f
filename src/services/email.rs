use anyhow::Context;
use lettre::{
    message::{header::ContentType, Mailbox, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use uuid::Uuid;

use crate::config::Config;

const DEFAULT_FROM: &str = "Baby Spa <no-reply@babyspa.local>";

/// Outgoing mail. When SMTP is not fully configured the transport is absent
/// and every send becomes a logged dry run, which keeps local and test
/// environments working without a mail server.
pub struct EmailService {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from: Mailbox,
    app_url: String,
}

impl EmailService {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let from: Mailbox = config
            .smtp_from
            .as_deref()
            .unwrap_or(DEFAULT_FROM)
            .parse()
            .context("Invalid SMTP_FROM address")?;

        let transport = match (
            config.smtp_host.as_deref(),
            config.smtp_username.clone(),
            config.smtp_password.clone(),
        ) {
            (Some(host), Some(username), Some(password)) => {
                let port = config.smtp_port.unwrap_or(587);
                let creds = Credentials::new(username, password);
                let builder = if port == 465 {
                    AsyncSmtpTransport::<Tokio1Executor>::relay(host)
                } else {
                    AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                }
                .context("Invalid SMTP relay host")?;
                Some(builder.port(port).credentials(creds).build())
            }
            _ => None,
        };

        Ok(Self {
            transport,
            from,
            app_url: config.app_url.clone(),
        })
    }

    pub fn is_dry_run(&self) -> bool {
        self.transport.is_none()
    }

    fn new_message_id(&self) -> String {
        format!("<{}@{}>", Uuid::new_v4(), self.from.email.domain())
    }

    async fn send(&self, to_email: &str, subject: &str, html: &str) -> anyhow::Result<()> {
        let Some(ref transport) = self.transport else {
            tracing::info!("[email:dry-run] {subject} -> {to_email}");
            return Ok(());
        };

        let to: Mailbox = to_email.parse().context("Invalid recipient address")?;
        let email = Message::builder()
            .message_id(Some(self.new_message_id()))
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .singlepart(
                SinglePart::builder()
                    .header(ContentType::TEXT_HTML)
                    .body(html.to_string()),
            )
            .context("Failed to build email message")?;

        transport
            .send(email)
            .await
            .context("Failed to send email")?;

        Ok(())
    }

    pub async fn send_verification_email(&self, to_email: &str, token: &str) -> anyhow::Result<()> {
        let verify_url = format!("{}/api/auth/verify?token={token}", self.app_url);
        let html = format!(
            "<p>Zdravo,</p>\
             <p>Klikni na link da potvrdis nalog:</p>\
             <p><a href=\"{verify_url}\">Potvrdi nalog</a></p>\
             <p>Ako nisi ti, ignorisi ovaj mejl.</p>"
        );
        self.send(to_email, "Potvrda naloga - Baby Spa", &html).await
    }

    pub async fn send_login_email(&self, to_email: &str, token: &str) -> anyhow::Result<()> {
        let login_url = format!("{}/api/auth/login?token={token}", self.app_url);
        let html = format!(
            "<p>Zdravo,</p>\
             <p>Klikni na link da se prijavis:</p>\
             <p><a href=\"{login_url}\">Prijava</a></p>"
        );
        self.send(to_email, "Prijava - Baby Spa", &html).await
    }

    pub async fn send_reservation_confirmation(
        &self,
        to_email: &str,
        date_label: &str,
        time_label: &str,
        cancel_url: &str,
        baby_label: &str,
    ) -> anyhow::Result<()> {
        let html = format!(
            "<p>Rezervacija je uspesno zakazana.</p>\
             <p><strong>{date_label}</strong> u <strong>{time_label}</strong></p>\
             <p><strong>{baby_label}</strong></p>\
             <p>Ako zelis da otkazes termin:</p>\
             <p><a href=\"{cancel_url}\">Otkazi termin</a></p>"
        );
        self.send(to_email, "Potvrda rezervacije - Baby Spa", &html)
            .await
    }

    pub async fn send_reservation_canceled(
        &self,
        to_email: &str,
        date_label: &str,
        time_label: &str,
    ) -> anyhow::Result<()> {
        let html = format!(
            "<p>Tvoja rezervacija je otkazana.</p>\
             <p><strong>{date_label}</strong> u <strong>{time_label}</strong></p>"
        );
        self.send(to_email, "Otkazivanje rezervacije - Baby Spa", &html)
            .await
    }

    pub async fn send_reminder(
        &self,
        to_email: &str,
        date_label: &str,
        time_label: &str,
    ) -> anyhow::Result<()> {
        let html = format!(
            "<p>Podsetnik za termin za 2 sata.</p>\
             <p><strong>{date_label}</strong> u <strong>{time_label}</strong></p>"
        );
        self.send(to_email, "Podsetnik - Baby Spa", &html).await
    }
}
