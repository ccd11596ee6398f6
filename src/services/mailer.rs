// src/services/mailer.rs
//
// Envio dos emails de verificação e de reset de senha. A entrega usa um
// binário estilo sendmail apontado por SENDMAIL_PATH; sem ele configurado
// o serviço degrada para log (útil em dev, onde ninguém quer SMTP).

use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

const APP_NAME: &str = "VAIB";

#[derive(Clone)]
pub struct Mailer {
    sendmail_path: Option<String>,
    from: String,
    app_url: String,
}

impl Mailer {
    pub fn from_env() -> Self {
        let sendmail_path = std::env::var("SENDMAIL_PATH")
            .ok()
            .filter(|path| !path.is_empty());
        if sendmail_path.is_none() {
            tracing::warn!("[Email] No sendmail configured. Emails will be logged but not sent.");
        }

        Mailer {
            sendmail_path,
            from: std::env::var("MAIL_FROM").unwrap_or_else(|_| "noreply@vaib.app".to_string()),
            app_url: std::env::var("APP_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
        }
    }

    #[cfg(test)]
    pub(crate) fn unconfigured() -> Self {
        Mailer {
            sendmail_path: None,
            from: "noreply@vaib.app".to_string(),
            app_url: "http://localhost:3000".to_string(),
        }
    }

    pub async fn send_verification_email(
        &self,
        to: &str,
        token: &str,
        full_name: Option<&str>,
    ) -> anyhow::Result<()> {
        let verify_url = format!("{}/verify-email/{}", self.app_url, token);

        if self.sendmail_path.is_none() {
            tracing::info!("[Email] Verification email would be sent to: {to}");
            tracing::info!("[Email] Verify URL: {verify_url}");
            return Ok(());
        }

        let subject = format!("Conferma la tua email - {APP_NAME}");
        let body = format!(
            "Ciao {}!\n\n\
             Grazie per esserti registrato su {APP_NAME}, il business assistant AI per freelancer.\n\
             Per completare la registrazione, conferma il tuo indirizzo email aprendo questo link:\n\n\
             {verify_url}\n\n\
             Se non hai creato un account su {APP_NAME}, ignora questa email.\n",
            full_name.unwrap_or("utente"),
        );

        self.pipe_to_sendmail(to, &subject, &body).await?;
        tracing::info!("[Email] Verification email sent to: {to}");
        Ok(())
    }

    pub async fn send_password_reset_email(
        &self,
        to: &str,
        token: &str,
        full_name: Option<&str>,
    ) -> anyhow::Result<()> {
        let reset_url = format!("{}/reset-password/{}", self.app_url, token);

        if self.sendmail_path.is_none() {
            tracing::info!("[Email] Password reset email would be sent to: {to}");
            tracing::info!("[Email] Reset URL: {reset_url}");
            return Ok(());
        }

        let subject = format!("Reimposta la tua password - {APP_NAME}");
        let body = format!(
            "Ciao {}!\n\n\
             Hai richiesto di reimpostare la password del tuo account {APP_NAME}.\n\
             Apri questo link per creare una nuova password:\n\n\
             {reset_url}\n\n\
             Nota: questo link scadrà tra 1 ora.\n\n\
             Se non hai richiesto il reset della password, ignora questa email. \
             La tua password rimarrà invariata.\n",
            full_name.unwrap_or("utente"),
        );

        self.pipe_to_sendmail(to, &subject, &body).await?;
        tracing::info!("[Email] Password reset email sent to: {to}");
        Ok(())
    }

    fn compose(&self, to: &str, subject: &str, body: &str) -> String {
        format!(
            "From: \"{APP_NAME}\" <{}>\n\
             To: {}\n\
             Subject: {}\n\
             Content-Type: text/plain; charset=utf-8\n\n{}",
            self.from, to, subject, body
        )
    }

    async fn pipe_to_sendmail(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        let path = match &self.sendmail_path {
            Some(path) => path,
            None => return Ok(()),
        };

        let mut child = Command::new(path)
            .arg("-t")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(self.compose(to, subject, body).as_bytes())
                .await?;
        }

        let status = child.wait().await?;
        if !status.success() {
            anyhow::bail!("sendmail terminou com status {status}");
        }
        Ok(())
    }
}
