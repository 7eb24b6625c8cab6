use tracing::info;

/// Outbound mail hand-off. Delivery is an external collaborator; the API
/// records the message and the relay picks it up from the log stream.
#[derive(Clone)]
pub struct Mailer {
    from: String,
}

impl Mailer {
    pub fn from_env() -> Self {
        let from = std::env::var("MAIL_FROM")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "no-reply@time2go.app".into());
        Self { from }
    }

    pub fn send(&self, to: &str, subject: &str, body: &str) {
        info!(from = %self.from, %to, %subject, "outbound mail: {body}");
    }
}
