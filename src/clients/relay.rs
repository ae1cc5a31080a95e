//! Twilio messaging relay client.
//!
//! Two surfaces: the Messages API for one-recipient texts, and the
//! Conversations API for group threads. A group send reuses an existing
//! conversation whose participant set matches exactly, so repeated runs
//! land in the same thread instead of spawning new ones.

use anyhow::{bail, Context, Result};
use serde_json::Value;

use runclub_core::time::EASTERN;
use runclub_core::MessageHistoryEntry;

const CONVERSATIONS_BASE: &str = "https://conversations.twilio.com/v1";
const MESSAGES_BASE: &str = "https://api.twilio.com/2010-04-01";

/// Messages fetched per conversation when reading history.
const HISTORY_PAGE_SIZE: usize = 20;

pub struct RelayClient {
    http: reqwest::Client,
    account_sid: String,
    auth_token: String,
    /// Our own number; outbound author and proxy address.
    phone_number: String,
}

impl RelayClient {
    pub fn new(account_sid: &str, auth_token: &str, phone_number: &str) -> RelayClient {
        RelayClient {
            http: reqwest::Client::new(),
            account_sid: account_sid.to_string(),
            auth_token: auth_token.to_string(),
            phone_number: phone_number.to_string(),
        }
    }

    async fn get(&self, url: &str) -> Result<Value> {
        self.http
            .get(url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .send()
            .await
            .with_context(|| format!("Failed to reach relay: {url}"))?
            .error_for_status()
            .with_context(|| format!("Relay request failed: {url}"))?
            .json()
            .await
            .context("Failed to parse relay response")
    }

    async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<Value> {
        self.http
            .post(url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(form)
            .send()
            .await
            .with_context(|| format!("Failed to reach relay: {url}"))?
            .error_for_status()
            .with_context(|| format!("Relay request failed: {url}"))?
            .json()
            .await
            .context("Failed to parse relay response")
    }

    /// Conversation sids the recipient participates in.
    async fn conversations_for(&self, phone: &str) -> Result<Vec<String>> {
        // The "+" in E.164 must be percent-encoded, so the query goes
        // through reqwest's encoder rather than the URL string.
        let body: Value = self
            .http
            .get(format!("{CONVERSATIONS_BASE}/ParticipantConversations"))
            .query(&[("Address", phone)])
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .send()
            .await
            .context("Failed to reach relay")?
            .error_for_status()
            .context("Participant conversation lookup failed")?
            .json()
            .await
            .context("Failed to parse relay response")?;
        Ok(body
            .get("conversations")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|c| c.get("conversation_sid").and_then(Value::as_str))
            .map(str::to_string)
            .collect())
    }

    /// Most-recent message history with one recipient across all of their
    /// conversations, newest first.
    pub async fn message_history(&self, phone: &str) -> Result<Vec<MessageHistoryEntry>> {
        let mut entries: Vec<MessageHistoryEntry> = Vec::new();

        for sid in self.conversations_for(phone).await? {
            let body = self
                .get(&format!(
                    "{CONVERSATIONS_BASE}/Conversations/{sid}/Messages?Order=desc&PageSize={HISTORY_PAGE_SIZE}"
                ))
                .await?;
            for message in body
                .get("messages")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
            {
                let Some(text) = message.get("body").and_then(Value::as_str) else {
                    continue;
                };
                let Some(created_at) = message
                    .get("date_created")
                    .and_then(Value::as_str)
                    .and_then(|raw| chrono::DateTime::parse_from_rfc3339(raw).ok())
                else {
                    continue;
                };
                entries.push(MessageHistoryEntry {
                    body: text.to_string(),
                    created_at: created_at.with_timezone(&EASTERN),
                });
            }
        }

        entries.sort_by_key(|e| std::cmp::Reverse(e.created_at));
        entries.truncate(HISTORY_PAGE_SIZE);
        Ok(entries)
    }

    /// Send `body` to the recipients. One recipient goes out as a direct
    /// text; several as a group conversation message.
    pub async fn send_message(&self, recipients: &[String], body: &str) -> Result<()> {
        match recipients {
            [] => bail!("No recipients for outbound message"),
            [single] => self.send_direct(single, body).await,
            group => self.send_group(group, body).await,
        }
    }

    async fn send_direct(&self, to: &str, body: &str) -> Result<()> {
        self.post_form(
            &format!(
                "{MESSAGES_BASE}/Accounts/{}/Messages.json",
                self.account_sid
            ),
            &[("To", to), ("From", &self.phone_number), ("Body", body)],
        )
        .await?;
        tracing::info!(to, "sent direct message");
        Ok(())
    }

    async fn send_group(&self, recipients: &[String], body: &str) -> Result<()> {
        let sid = match self.find_group_conversation(recipients).await? {
            Some(sid) => sid,
            None => self.create_group_conversation(recipients).await?,
        };

        self.post_form(
            &format!("{CONVERSATIONS_BASE}/Conversations/{sid}/Messages"),
            &[("Author", &self.phone_number), ("Body", body)],
        )
        .await?;
        tracing::info!(conversation = %sid, recipients = recipients.len(), "sent group message");
        Ok(())
    }

    /// An existing conversation whose participant set is exactly the
    /// requested recipients (plus our own number as proxy).
    async fn find_group_conversation(&self, recipients: &[String]) -> Result<Option<String>> {
        for sid in self.conversations_for(&recipients[0]).await? {
            let body = self
                .get(&format!(
                    "{CONVERSATIONS_BASE}/Conversations/{sid}/Participants"
                ))
                .await?;
            let addresses: Vec<&str> = body
                .get("participants")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
                .filter_map(|p| {
                    p.pointer("/messaging_binding/address").and_then(Value::as_str)
                })
                .collect();

            let same_set = addresses.len() == recipients.len()
                && recipients
                    .iter()
                    .all(|r| addresses.iter().any(|a| a == r));
            if same_set {
                tracing::debug!(conversation = %sid, "reusing existing group conversation");
                return Ok(Some(sid));
            }
        }
        Ok(None)
    }

    async fn create_group_conversation(&self, recipients: &[String]) -> Result<String> {
        let created = self
            .post_form(
                &format!("{CONVERSATIONS_BASE}/Conversations"),
                &[("FriendlyName", "Run crew")],
            )
            .await?;
        let sid = created
            .get("sid")
            .and_then(Value::as_str)
            .context("Conversation create response missing sid")?
            .to_string();

        for recipient in recipients {
            self.post_form(
                &format!("{CONVERSATIONS_BASE}/Conversations/{sid}/Participants"),
                &[
                    ("MessagingBinding.Address", recipient.as_str()),
                    ("MessagingBinding.ProxyAddress", self.phone_number.as_str()),
                ],
            )
            .await
            .with_context(|| format!("Failed to add {recipient} to conversation"))?;
        }

        tracing::info!(conversation = %sid, participants = recipients.len(), "created group conversation");
        Ok(sid)
    }
}
