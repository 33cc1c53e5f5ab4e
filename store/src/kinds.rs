//! The concrete entity kinds.
//!
//! One struct per synchronized collection, each with its own patch type.
//! The patch decides which fields a partial update may touch and what an
//! update audit entry should record.

use crate::entity::{Entity, EntityPatch};
use crate::EntityId;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

fn summary(pairs: &[(&str, Value)]) -> Map<String, Value> {
    let mut map = Map::new();
    for (key, value) in pairs {
        map.insert((*key).to_string(), value.clone());
    }
    map
}

// ============================================================================
// Account
// ============================================================================

/// A company record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    #[serde(default)]
    pub id: EntityId,
    pub name: String,
    pub industry: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employees: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annual_revenue: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Account {
    /// Create an account with the required fields; everything else unset.
    pub fn new(name: impl Into<String>, industry: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(),
            name: name.into(),
            industry: industry.into(),
            website: None,
            employees: None,
            annual_revenue: None,
            address: None,
            city: None,
            state: None,
            country: None,
            postal_code: None,
            phone: None,
            created_at: None,
            updated_at: None,
        }
    }
}

/// Partial update for [`Account`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct AccountPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employees: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annual_revenue: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Entity for Account {
    const COLLECTION: &'static str = "accounts";
    const NOUN: &'static str = "account";
    type Patch = AccountPatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn stamp_created(&mut self, now: &str) {
        self.created_at = Some(now.to_string());
        self.updated_at = Some(now.to_string());
    }

    fn stamp_updated(&mut self, now: &str) {
        self.updated_at = Some(now.to_string());
    }

    fn audit_summary(&self) -> Map<String, Value> {
        summary(&[
            ("name", json!(self.name)),
            ("industry", json!(self.industry)),
        ])
    }
}

impl EntityPatch<Account> for AccountPatch {
    fn apply(&self, target: &mut Account) {
        if let Some(name) = &self.name {
            target.name = name.clone();
        }
        if let Some(industry) = &self.industry {
            target.industry = industry.clone();
        }
        if let Some(website) = &self.website {
            target.website = Some(website.clone());
        }
        if let Some(employees) = self.employees {
            target.employees = Some(employees);
        }
        if let Some(annual_revenue) = self.annual_revenue {
            target.annual_revenue = Some(annual_revenue);
        }
        if let Some(address) = &self.address {
            target.address = Some(address.clone());
        }
        if let Some(city) = &self.city {
            target.city = Some(city.clone());
        }
        if let Some(state) = &self.state {
            target.state = Some(state.clone());
        }
        if let Some(country) = &self.country {
            target.country = Some(country.clone());
        }
        if let Some(postal_code) = &self.postal_code {
            target.postal_code = Some(postal_code.clone());
        }
        if let Some(phone) = &self.phone {
            target.phone = Some(phone.clone());
        }
        if let Some(updated_at) = &self.updated_at {
            target.updated_at = Some(updated_at.clone());
        }
    }

    fn stamp_updated(&mut self, now: &str) {
        self.updated_at = Some(now.to_string());
    }

    fn audit_delta(&self, previous: &Account) -> Map<String, Value> {
        let mut details = summary(&[("name", json!(previous.name))]);
        if let Some(name) = &self.name {
            if *name != previous.name {
                details.insert("action".into(), json!("renamed"));
                details.insert("previous_name".into(), json!(previous.name));
                details.insert("new_name".into(), json!(name));
            }
        }
        if let Some(industry) = &self.industry {
            details.insert("industry".into(), json!(industry));
        }
        details
    }
}

// ============================================================================
// Contact
// ============================================================================

/// A person attached to an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default)]
    pub id: EntityId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Contact {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            id: EntityId::new(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
            phone: None,
            job_title: None,
            account_id: None,
            lead_status: None,
            lead_source: None,
            notes: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// Display name, "First Last".
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Partial update for [`Contact`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct ContactPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<EntityId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Entity for Contact {
    const COLLECTION: &'static str = "contacts";
    const NOUN: &'static str = "contact";
    type Patch = ContactPatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn stamp_created(&mut self, now: &str) {
        self.created_at = Some(now.to_string());
        self.updated_at = Some(now.to_string());
    }

    fn stamp_updated(&mut self, now: &str) {
        self.updated_at = Some(now.to_string());
    }

    fn audit_summary(&self) -> Map<String, Value> {
        summary(&[
            ("name", json!(self.full_name())),
            ("email", json!(self.email)),
            ("account_id", json!(self.account_id)),
        ])
    }
}

impl EntityPatch<Contact> for ContactPatch {
    fn apply(&self, target: &mut Contact) {
        if let Some(first_name) = &self.first_name {
            target.first_name = first_name.clone();
        }
        if let Some(last_name) = &self.last_name {
            target.last_name = last_name.clone();
        }
        if let Some(email) = &self.email {
            target.email = email.clone();
        }
        if let Some(phone) = &self.phone {
            target.phone = Some(phone.clone());
        }
        if let Some(job_title) = &self.job_title {
            target.job_title = Some(job_title.clone());
        }
        if let Some(account_id) = &self.account_id {
            target.account_id = Some(account_id.clone());
        }
        if let Some(lead_status) = &self.lead_status {
            target.lead_status = Some(lead_status.clone());
        }
        if let Some(lead_source) = &self.lead_source {
            target.lead_source = Some(lead_source.clone());
        }
        if let Some(notes) = &self.notes {
            target.notes = Some(notes.clone());
        }
        if let Some(updated_at) = &self.updated_at {
            target.updated_at = Some(updated_at.clone());
        }
    }

    fn stamp_updated(&mut self, now: &str) {
        self.updated_at = Some(now.to_string());
    }

    fn audit_delta(&self, previous: &Contact) -> Map<String, Value> {
        let mut details = summary(&[
            ("name", json!(previous.full_name())),
            ("email", json!(previous.email)),
        ]);
        if let Some(lead_status) = &self.lead_status {
            if previous.lead_status.as_deref() != Some(lead_status.as_str()) {
                details.insert("action".into(), json!("lead_status_change"));
                details.insert("previous_lead_status".into(), json!(previous.lead_status));
                details.insert("new_lead_status".into(), json!(lead_status));
            }
        }
        details
    }
}

// ============================================================================
// Deal
// ============================================================================

/// An opportunity in the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    #[serde(default)]
    pub id: EntityId,
    pub name: String,
    pub account_id: EntityId,
    pub stage: String,
    pub amount: f64,
    #[serde(default)]
    pub close_date: String,
    #[serde(default)]
    pub probability: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub team_member_id: EntityId,
    #[serde(default)]
    pub owner_id: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Deal {
    pub fn new(
        name: impl Into<String>,
        account_id: impl Into<EntityId>,
        stage: impl Into<String>,
        amount: f64,
    ) -> Self {
        Self {
            id: EntityId::new(),
            name: name.into(),
            account_id: account_id.into(),
            stage: stage.into(),
            amount,
            close_date: String::new(),
            probability: 0.0,
            description: String::new(),
            status: String::new(),
            team_member_id: EntityId::new(),
            owner_id: EntityId::new(),
            region: None,
            lead_source: None,
            created_at: None,
            updated_at: None,
        }
    }
}

/// Partial update for [`Deal`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct DealPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<EntityId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_member_id: Option<EntityId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<EntityId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Entity for Deal {
    const COLLECTION: &'static str = "deals";
    const NOUN: &'static str = "deal";
    type Patch = DealPatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn stamp_created(&mut self, now: &str) {
        self.created_at = Some(now.to_string());
        self.updated_at = Some(now.to_string());
    }

    fn stamp_updated(&mut self, now: &str) {
        self.updated_at = Some(now.to_string());
    }

    fn audit_summary(&self) -> Map<String, Value> {
        summary(&[
            ("name", json!(self.name)),
            ("amount", json!(self.amount)),
            ("stage", json!(self.stage)),
            ("account_id", json!(self.account_id)),
        ])
    }
}

impl EntityPatch<Deal> for DealPatch {
    fn apply(&self, target: &mut Deal) {
        if let Some(name) = &self.name {
            target.name = name.clone();
        }
        if let Some(account_id) = &self.account_id {
            target.account_id = account_id.clone();
        }
        if let Some(stage) = &self.stage {
            target.stage = stage.clone();
        }
        if let Some(amount) = self.amount {
            target.amount = amount;
        }
        if let Some(close_date) = &self.close_date {
            target.close_date = close_date.clone();
        }
        if let Some(probability) = self.probability {
            target.probability = probability;
        }
        if let Some(description) = &self.description {
            target.description = description.clone();
        }
        if let Some(status) = &self.status {
            target.status = status.clone();
        }
        if let Some(team_member_id) = &self.team_member_id {
            target.team_member_id = team_member_id.clone();
        }
        if let Some(owner_id) = &self.owner_id {
            target.owner_id = owner_id.clone();
        }
        if let Some(region) = &self.region {
            target.region = Some(region.clone());
        }
        if let Some(lead_source) = &self.lead_source {
            target.lead_source = Some(lead_source.clone());
        }
        if let Some(updated_at) = &self.updated_at {
            target.updated_at = Some(updated_at.clone());
        }
    }

    fn stamp_updated(&mut self, now: &str) {
        self.updated_at = Some(now.to_string());
    }

    fn audit_delta(&self, previous: &Deal) -> Map<String, Value> {
        let mut details = summary(&[
            ("name", json!(previous.name)),
            ("amount", json!(previous.amount)),
        ]);
        // A stage transition is the change worth calling out explicitly.
        if let Some(stage) = &self.stage {
            if *stage != previous.stage {
                details.insert("action".into(), json!("stage_change"));
                details.insert("previous_stage".into(), json!(previous.stage));
                details.insert("new_stage".into(), json!(stage));
            }
        }
        details
    }
}

// ============================================================================
// Task
// ============================================================================

/// Progress state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

/// Urgency of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

/// What kind of record a task or activity points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelatedKind {
    Account,
    Deal,
}

/// A to-do assigned to a team member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(default)]
    pub id: EntityId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub due_date: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub assigned_to: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_to_type: Option<RelatedKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_to_id: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Task {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(),
            title: title.into(),
            description: String::new(),
            due_date: String::new(),
            status: TaskStatus::default(),
            priority: TaskPriority::default(),
            assigned_to: EntityId::new(),
            related_to_type: None,
            related_to_id: None,
            created_at: None,
            updated_at: None,
        }
    }
}

/// Partial update for [`Task`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<EntityId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_to_type: Option<RelatedKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_to_id: Option<EntityId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Entity for Task {
    const COLLECTION: &'static str = "tasks";
    const NOUN: &'static str = "task";
    type Patch = TaskPatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn stamp_created(&mut self, now: &str) {
        self.created_at = Some(now.to_string());
        self.updated_at = Some(now.to_string());
    }

    fn stamp_updated(&mut self, now: &str) {
        self.updated_at = Some(now.to_string());
    }

    fn audit_summary(&self) -> Map<String, Value> {
        summary(&[
            ("title", json!(self.title)),
            ("status", json!(self.status)),
            ("priority", json!(self.priority)),
        ])
    }
}

impl EntityPatch<Task> for TaskPatch {
    fn apply(&self, target: &mut Task) {
        if let Some(title) = &self.title {
            target.title = title.clone();
        }
        if let Some(description) = &self.description {
            target.description = description.clone();
        }
        if let Some(due_date) = &self.due_date {
            target.due_date = due_date.clone();
        }
        if let Some(status) = self.status {
            target.status = status;
        }
        if let Some(priority) = self.priority {
            target.priority = priority;
        }
        if let Some(assigned_to) = &self.assigned_to {
            target.assigned_to = assigned_to.clone();
        }
        if let Some(related_to_type) = self.related_to_type {
            target.related_to_type = Some(related_to_type);
        }
        if let Some(related_to_id) = &self.related_to_id {
            target.related_to_id = Some(related_to_id.clone());
        }
        if let Some(updated_at) = &self.updated_at {
            target.updated_at = Some(updated_at.clone());
        }
    }

    fn stamp_updated(&mut self, now: &str) {
        self.updated_at = Some(now.to_string());
    }

    fn audit_delta(&self, previous: &Task) -> Map<String, Value> {
        let mut details = summary(&[("title", json!(previous.title))]);
        if let Some(status) = self.status {
            if status != previous.status {
                details.insert("action".into(), json!("status_change"));
                details.insert("previous_status".into(), json!(previous.status));
                details.insert("new_status".into(), json!(status));
            }
        }
        details
    }
}

// ============================================================================
// TeamMember
// ============================================================================

/// A member of the sales team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
    #[serde(default)]
    pub id: EntityId,
    pub name: String,
    pub role: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joined_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl TeamMember {
    pub fn new(
        name: impl Into<String>,
        role: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            id: EntityId::new(),
            name: name.into(),
            role: role.into(),
            email: email.into(),
            position: None,
            phone: None,
            department: None,
            joined_date: None,
            status: None,
            avatar_url: None,
            created_at: None,
            updated_at: None,
        }
    }
}

/// Partial update for [`TeamMember`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct TeamMemberPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub joined_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Entity for TeamMember {
    const COLLECTION: &'static str = "team_members";
    const NOUN: &'static str = "team_member";
    type Patch = TeamMemberPatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn stamp_created(&mut self, now: &str) {
        self.created_at = Some(now.to_string());
        self.updated_at = Some(now.to_string());
    }

    fn stamp_updated(&mut self, now: &str) {
        self.updated_at = Some(now.to_string());
    }

    fn audit_summary(&self) -> Map<String, Value> {
        summary(&[
            ("name", json!(self.name)),
            ("role", json!(self.role)),
            ("email", json!(self.email)),
        ])
    }
}

impl EntityPatch<TeamMember> for TeamMemberPatch {
    fn apply(&self, target: &mut TeamMember) {
        if let Some(name) = &self.name {
            target.name = name.clone();
        }
        if let Some(role) = &self.role {
            target.role = role.clone();
        }
        if let Some(email) = &self.email {
            target.email = email.clone();
        }
        if let Some(position) = &self.position {
            target.position = Some(position.clone());
        }
        if let Some(phone) = &self.phone {
            target.phone = Some(phone.clone());
        }
        if let Some(department) = &self.department {
            target.department = Some(department.clone());
        }
        if let Some(joined_date) = &self.joined_date {
            target.joined_date = Some(joined_date.clone());
        }
        if let Some(status) = &self.status {
            target.status = Some(status.clone());
        }
        if let Some(avatar_url) = &self.avatar_url {
            target.avatar_url = Some(avatar_url.clone());
        }
        if let Some(updated_at) = &self.updated_at {
            target.updated_at = Some(updated_at.clone());
        }
    }

    fn stamp_updated(&mut self, now: &str) {
        self.updated_at = Some(now.to_string());
    }

    fn audit_delta(&self, previous: &TeamMember) -> Map<String, Value> {
        let mut details = summary(&[("name", json!(previous.name))]);
        if let Some(role) = &self.role {
            if *role != previous.role {
                details.insert("action".into(), json!("role_change"));
                details.insert("previous_role".into(), json!(previous.role));
                details.insert("new_role".into(), json!(role));
            }
        }
        details
    }
}
