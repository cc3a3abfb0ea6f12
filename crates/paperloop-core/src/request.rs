use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use paperloop_critic::MAX_AGGREGATE;

pub const DEFAULT_THRESHOLD: f64 = 32.0;
pub const DEFAULT_MAX_ITERATIONS: usize = 5;
pub const DEFAULT_CONCURRENCY: usize = 2;

/// A request to generate a paper. Immutable once submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperRequest {
    pub title: String,
    /// Section names in output order
    pub sections: Vec<String>,
    /// Per-request override of the acceptance threshold
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    /// Per-request override of the iteration budget
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<usize>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Title must not be empty")]
    EmptyTitle,

    #[error("At least one section is required")]
    NoSections,

    #[error("Section name at position {0} is empty")]
    EmptySectionName(usize),

    #[error("Section '{0}' is listed more than once")]
    DuplicateSection(String),

    #[error("max_iterations must be at least 1 (got {0})")]
    InvalidMaxIterations(usize),

    #[error("threshold must be between 0 and 40 (got {0})")]
    InvalidThreshold(f64),
}

impl PaperRequest {
    pub fn new(title: impl Into<String>, sections: Vec<String>) -> Self {
        Self {
            title: title.into(),
            sections,
            threshold: None,
            max_iterations: None,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = Some(max);
        self
    }

    /// Check the request shape before anything is enqueued
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        if self.sections.is_empty() {
            return Err(ValidationError::NoSections);
        }

        let mut seen = HashSet::new();
        for (position, name) in self.sections.iter().enumerate() {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                return Err(ValidationError::EmptySectionName(position));
            }
            if !seen.insert(trimmed.to_lowercase()) {
                return Err(ValidationError::DuplicateSection(trimmed.to_string()));
            }
        }

        if let Some(max) = self.max_iterations {
            if max == 0 {
                return Err(ValidationError::InvalidMaxIterations(max));
            }
        }
        if let Some(threshold) = self.threshold {
            if !(0.0..=MAX_AGGREGATE).contains(&threshold) {
                return Err(ValidationError::InvalidThreshold(threshold));
            }
        }

        Ok(())
    }
}

/// Loop tuning shared by every section of a job
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoopSettings {
    /// Minimum aggregate score to accept a section
    pub threshold: f64,
    /// Maximum generate/evaluate pairs per section
    pub max_iterations: usize,
    /// Sections processed at once within a job
    pub concurrency: usize,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl LoopSettings {
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Apply a request's overrides on top of these settings
    pub fn for_request(&self, request: &PaperRequest) -> Self {
        Self {
            threshold: request.threshold.unwrap_or(self.threshold),
            max_iterations: request.max_iterations.unwrap_or(self.max_iterations).max(1),
            concurrency: self.concurrency.max(1),
        }
    }
}
