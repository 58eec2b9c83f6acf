use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use url::form_urlencoded;

use super::{PortfolioApi, Resource};
use crate::error::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReactionTarget {
    Meme,
    Blog,
}

impl ReactionTarget {
    pub fn resource(&self) -> Resource {
        match self {
            ReactionTarget::Meme => Resource::MemeReactions,
            ReactionTarget::Blog => Resource::BlogReactions,
        }
    }

    fn field(&self) -> &'static str {
        match self {
            ReactionTarget::Meme => "meme",
            ReactionTarget::Blog => "blog",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReactionType {
    Like,
    Love,
    Laugh,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionState {
    #[serde(default)]
    pub is_liked: bool,
    #[serde(default)]
    pub is_loved: bool,
    #[serde(default)]
    pub is_laughed: bool,
}

impl ReactionState {
    pub fn is_active(&self, reaction: ReactionType) -> bool {
        match reaction {
            ReactionType::Like => self.is_liked,
            ReactionType::Love => self.is_loved,
            ReactionType::Laugh => self.is_laughed,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.is_liked || self.is_loved || self.is_laughed)
    }

    /// Flip one reaction, leaving the others as they were.
    pub fn toggle(mut self, reaction: ReactionType) -> Self {
        let active = !self.is_active(reaction);
        match reaction {
            ReactionType::Like => self.is_liked = active,
            ReactionType::Love => self.is_loved = active,
            ReactionType::Laugh => self.is_laughed = active,
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "change", content = "record", rename_all = "lowercase")]
pub enum ReactionChange {
    Created(Value),
    Updated(Value),
    Removed,
}

impl PortfolioApi {
    /// The signed-in user's reaction record for one meme or blog post, if any.
    pub async fn find_reaction(
        &self,
        target: ReactionTarget,
        target_id: u64,
        username: &str,
    ) -> Result<Option<Value>, ClientError> {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair(target.field(), &target_id.to_string())
            .append_pair("user", username)
            .finish();
        let path = format!("{}?{}", target.resource().path(), query);

        let found = self.gateway().get(&path).await?;
        Ok(match found {
            Value::Array(mut items) if !items.is_empty() => Some(items.swap_remove(0)),
            _ => None,
        })
    }

    /// Toggle a reaction; switching off the only active one removes the record.
    pub async fn react(
        &self,
        target: ReactionTarget,
        target_id: u64,
        reaction: ReactionType,
    ) -> Result<ReactionChange, ClientError> {
        let username = self.require_username()?;
        let resource = target.resource();

        let existing = self.find_reaction(target, target_id, &username).await?;
        let current = existing
            .as_ref()
            .and_then(|record| serde_json::from_value::<ReactionState>(record.clone()).ok())
            .unwrap_or_default();
        let next = current.toggle(reaction);

        let existing_id = existing.as_ref().and_then(record_id);

        match existing_id {
            Some(id) if next.is_empty() => {
                self.gateway().delete(&resource.item_path(&id)).await?;
                Ok(ReactionChange::Removed)
            }
            Some(id) => {
                let body = reaction_body(target, target_id, &username, next);
                let record = self.gateway().put(&resource.item_path(&id), &body).await?;
                Ok(ReactionChange::Updated(record))
            }
            None => {
                let body = reaction_body(target, target_id, &username, next);
                let record = self.gateway().post(resource.path(), &body).await?;
                Ok(ReactionChange::Created(record))
            }
        }
    }

    pub async fn delete_reaction(&self, target: ReactionTarget, reaction_id: &str) -> Result<(), ClientError> {
        self.gateway().delete(&target.resource().item_path(reaction_id)).await?;
        Ok(())
    }

    /// Comment on a meme as the signed-in user.
    pub async fn add_comment(&self, meme_id: u64, text: &str) -> Result<Value, ClientError> {
        let text = non_empty_comment(text)?;
        let username = self.require_username()?;

        let body = json!({
            "meme": meme_id,
            "comment_text": text,
            "user": username,
            "date": now_rfc3339(),
        });
        self.gateway().post(Resource::Comments.path(), &body).await
    }

    pub async fn edit_comment(&self, comment_id: &str, text: &str) -> Result<Value, ClientError> {
        let text = non_empty_comment(text)?;
        self.require_username()?;

        let body = json!({ "comment_text": text, "date": now_rfc3339() });
        self.gateway().patch(&Resource::Comments.item_path(comment_id), &body).await
    }

    pub async fn delete_comment(&self, comment_id: &str) -> Result<Value, ClientError> {
        self.require_username()?;
        self.gateway().delete(&Resource::Comments.item_path(comment_id)).await
    }

    // Local precondition only; whether the session is still valid is the gateway's call
    fn require_username(&self) -> Result<String, ClientError> {
        let session = self.gateway().session().session();
        if !session.is_authenticated() {
            return Err(ClientError::Unauthorized("No authentication token".to_string()));
        }
        session
            .username
            .ok_or_else(|| ClientError::Unauthorized("No username found".to_string()))
    }
}

fn reaction_body(target: ReactionTarget, target_id: u64, username: &str, state: ReactionState) -> Value {
    json!({
        target.field(): target_id,
        "user": username,
        "is_liked": state.is_liked,
        "is_loved": state.is_loved,
        "is_laughed": state.is_laughed,
    })
}

fn record_id(record: &Value) -> Option<String> {
    match record.get("id")? {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

fn non_empty_comment(text: &str) -> Result<&str, ClientError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(ClientError::Validation("Comment cannot be empty".to_string()))
    } else {
        Ok(trimmed)
    }
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
