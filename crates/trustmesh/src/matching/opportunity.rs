//! Opportunities and their lifecycle. Only the creator edits one, and a
//! closed opportunity can only be archived.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::identity::IdentityId;
use crate::privacy::AvailabilityWindow;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityStatus {
    Open,
    InProgress,
    Closed,
    Archived,
}

impl OpportunityStatus {
    /// Whether candidates are still matched against it.
    pub fn is_matchable(self) -> bool {
        matches!(self, Self::Open | Self::InProgress)
    }

    fn can_become(self, next: OpportunityStatus) -> bool {
        use OpportunityStatus::*;
        match (self, next) {
            (Archived, _) => false,
            (Closed, next) => next == Archived,
            (Open | InProgress, _) => true,
        }
    }
}

impl fmt::Display for OpportunityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Closed => "closed",
            Self::Archived => "archived",
        };
        f.write_str(name)
    }
}

/// Something a creator is looking for collaborators on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Opportunity {
    pub id: String,
    pub creator: IdentityId,
    pub category: String,
    #[serde(default)]
    pub required_skills: Vec<String>,
    #[serde(default)]
    pub required_resources: Vec<String>,
    pub timeline: AvailabilityWindow,
    #[serde(default)]
    pub budget: Option<u64>,
    pub status: OpportunityStatus,
}

/// Changes a creator may make while the opportunity is not closed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityUpdate {
    pub category: Option<String>,
    pub required_skills: Option<Vec<String>>,
    pub required_resources: Option<Vec<String>>,
    pub timeline: Option<AvailabilityWindow>,
    pub budget: Option<u64>,
}

impl Opportunity {
    pub fn new(id: impl Into<String>, creator: IdentityId, category: impl Into<String>, timeline: AvailabilityWindow) -> Self {
        Self {
            id: id.into(),
            creator,
            category: category.into(),
            required_skills: Vec::new(),
            required_resources: Vec::new(),
            timeline,
            budget: None,
            status: OpportunityStatus::Open,
        }
    }

    pub fn with_skills<I, S>(mut self, skills: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_skills = skills.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_resources<I, S>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_resources = resources.into_iter().map(Into::into).collect();
        self
    }

    fn ensure_creator(&self, actor: &IdentityId) -> Result<()> {
        if actor != &self.creator {
            return Err(Error::NotOwner { actor: actor.clone(), resource: format!("opportunity {}", self.id) });
        }
        Ok(())
    }

    /// Apply field changes. Refused once the opportunity is closed.
    pub fn update(&mut self, actor: &IdentityId, update: OpportunityUpdate) -> Result<()> {
        self.ensure_creator(actor)?;
        if !self.status.is_matchable() {
            return Err(Error::OpportunityClosed(self.id.clone()));
        }
        let timeline = update
            .timeline
            .map(|t| AvailabilityWindow::new(t.start, t.end))
            .transpose()?;

        if let Some(category) = update.category {
            self.category = category;
        }
        if let Some(skills) = update.required_skills {
            self.required_skills = skills;
        }
        if let Some(resources) = update.required_resources {
            self.required_resources = resources;
        }
        if let Some(timeline) = timeline {
            self.timeline = timeline;
        }
        if update.budget.is_some() {
            self.budget = update.budget;
        }
        Ok(())
    }

    /// Move to `next`. A closed opportunity can only be archived.
    pub fn transition(&mut self, actor: &IdentityId, next: OpportunityStatus) -> Result<()> {
        self.ensure_creator(actor)?;
        if !self.status.can_become(next) {
            return Err(Error::OpportunityClosed(self.id.clone()));
        }
        self.status = next;
        Ok(())
    }
}
