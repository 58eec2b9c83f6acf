//! Pass-through resource calls.
//!
//! Nothing here inspects status codes or touches the session: failures come
//! back from the gateway already classified, and resource functions only
//! forward them.

mod reactions;

pub use reactions::{ReactionChange, ReactionState, ReactionTarget, ReactionType};

use std::sync::Arc;

use futures::future::join_all;
use reqwest::Method;
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::ClientError;
use crate::gateway::Gateway;

pub const CONTACT_PATH: &str = "contact_us/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Resource {
    About,
    Skills,
    Certifications,
    Experiences,
    Projects,
    Blogs,
    Memes,
    Users,
    ContactMe,
    Comments,
    MemeReactions,
    BlogReactions,
}

impl Resource {
    /// Sections shown on the admin dashboard.
    pub const DASHBOARD: [Resource; 8] = [
        Resource::About,
        Resource::Skills,
        Resource::Certifications,
        Resource::Experiences,
        Resource::Projects,
        Resource::Blogs,
        Resource::Memes,
        Resource::ContactMe,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Resource::About => "about/",
            Resource::Skills => "skills/",
            Resource::Certifications => "certifications/",
            Resource::Experiences => "experiences/",
            Resource::Projects => "projects/",
            Resource::Blogs => "blogs/",
            Resource::Memes => "memes/",
            Resource::Users => "users/",
            Resource::ContactMe => "contact_me/",
            Resource::Comments => "comments/",
            Resource::MemeReactions => "meme-reactions/",
            Resource::BlogReactions => "blog-reactions/",
        }
    }

    pub fn item_path(&self, id: &str) -> String {
        format!("{}{}/", self.path(), id)
    }

    pub fn label(&self) -> &'static str {
        self.path().trim_end_matches('/')
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResourceCount {
    pub resource: Resource,
    pub count: Option<usize>,
    pub error: Option<String>,
}

pub struct PortfolioApi {
    gateway: Arc<Gateway>,
}

impl PortfolioApi {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    pub async fn list(&self, resource: Resource) -> Result<Value, ClientError> {
        self.gateway.get(resource.path()).await
    }

    pub async fn create(&self, resource: Resource, data: &Value) -> Result<Value, ClientError> {
        self.gateway.post(resource.path(), data).await
    }

    pub async fn update(&self, resource: Resource, id: &str, data: &Value) -> Result<Value, ClientError> {
        self.gateway.put(&resource.item_path(id), data).await
    }

    pub async fn delete(&self, resource: Resource, id: &str) -> Result<Value, ClientError> {
        self.gateway.delete(&resource.item_path(id)).await
    }

    /// Public contact form; goes out without credentials.
    pub async fn send_contact(&self, name: &str, email: &str, message: &str) -> Result<Value, ClientError> {
        if name.trim().is_empty() || email.trim().is_empty() || message.trim().is_empty() {
            return Err(ClientError::Validation("Name, email and message are required".to_string()));
        }

        let body = json!({ "name": name, "email": email, "message": message });
        self.gateway.send_public(Method::POST, CONTACT_PATH, Some(&body)).await
    }

    /// Item counts per dashboard section, fetched concurrently.
    ///
    /// A session-terminal failure aborts the whole call; any other failure is
    /// recorded against its section.
    pub async fn dashboard_stats(&self) -> Result<Vec<ResourceCount>, ClientError> {
        let results = join_all(Resource::DASHBOARD.iter().map(|resource| self.list(*resource))).await;

        let mut counts = Vec::with_capacity(results.len());
        for (resource, result) in Resource::DASHBOARD.iter().zip(results) {
            match result {
                Ok(value) => counts.push(ResourceCount {
                    resource: *resource,
                    count: Some(count_items(&value)),
                    error: None,
                }),
                Err(e) if e.is_session_terminal() => return Err(e),
                Err(e) => {
                    tracing::warn!(resource = resource.label(), "dashboard fetch failed: {}", e);
                    counts.push(ResourceCount {
                        resource: *resource,
                        count: None,
                        error: Some(e.user_message()),
                    });
                }
            }
        }

        Ok(counts)
    }

    pub(crate) fn gateway(&self) -> &Gateway {
        &self.gateway
    }
}

/// Lists come back as arrays; single-record sections (about) as an object.
pub fn count_items(value: &Value) -> usize {
    match value {
        Value::Array(items) => items.len(),
        Value::Null => 0,
        _ => 1,
    }
}
