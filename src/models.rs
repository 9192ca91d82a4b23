// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Resume Models
//!
//! This module defines the resume document published through the pipeline
//! and the request and response structures of the REST API. All types derive
//! `Serialize`, `Deserialize`, and `ToSchema` for JSON handling and OpenAPI
//! documentation.
//!
//! ## Model Categories
//!
//! - **Resume document**: personal info, skills, desired position, work and
//!   project history, education, certificates
//! - **Publishing**: publish/update requests and receipts
//! - **Retrieval**: open requests and blob probes

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::codec::Document;
use crate::transport::DownloadSource;

/// Length of the skills excerpt in a [`ResumeSummary`].
const SKILLS_EXCERPT_CHARS: usize = 100;

// =============================================================================
// Resume Document
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Employed,
    Unemployed,
    Looking,
}

/// Career stage of the candidate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CareerIdentity {
    Professional,
    Student,
    Fresh,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    Fulltime,
    Parttime,
    Internship,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Degree {
    Associate,
    Bachelor,
    Master,
    Doctor,
}

impl Degree {
    pub fn as_str(&self) -> &'static str {
        match self {
            Degree::Associate => "associate",
            Degree::Bachelor => "bachelor",
            Degree::Master => "master",
            Degree::Doctor => "doctor",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EducationType {
    Fulltime,
    Parttime,
}

/// Contact and identity section.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PersonalInfo {
    pub name: String,
    pub gender: Gender,
    /// `YYYY-MM` or `YYYY-MM-DD`, as entered.
    pub birth_date: String,
    pub work_start_date: String,
    pub job_status: JobStatus,
    pub identity: CareerIdentity,
    pub phone: String,
    pub wechat: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DesiredPosition {
    pub job_type: JobType,
    pub position: String,
    pub industry: String,
    pub salary_min: String,
    pub salary_max: String,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_cities: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WorkExperience {
    pub company: String,
    pub industry: String,
    pub department: String,
    pub position: String,
    pub start_date: String,
    pub end_date: String,
    pub current: bool,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectExperience {
    pub name: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    pub start_date: String,
    pub end_date: String,
    pub current: bool,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub achievements: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technologies: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Education {
    pub school: String,
    pub degree: Degree,
    pub education_type: EducationType,
    pub major: String,
    pub start_date: String,
    pub end_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thesis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thesis_description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    pub name: String,
    pub issuer: String,
    pub issue_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_expiry: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_no: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A complete resume, the document stored on Walrus.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResumeDocument {
    pub personal: PersonalInfo,
    pub skills: String,
    pub desired_position: DesiredPosition,
    #[serde(default)]
    pub work_experience: Vec<WorkExperience>,
    #[serde(default)]
    pub project_experience: Vec<ProjectExperience>,
    #[serde(default)]
    pub education: Vec<Education>,
    #[serde(default)]
    pub certificates: Vec<Certificate>,
}

/// Listing card derived from a resume, for the metadata store.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ResumeSummary {
    pub name: String,
    pub position: String,
    /// Number of work entries.
    pub years_of_experience: usize,
    pub education_level: String,
    pub skills: String,
}

impl ResumeDocument {
    pub fn summary(&self) -> ResumeSummary {
        ResumeSummary {
            name: self.personal.name.clone(),
            position: self.desired_position.position.clone(),
            years_of_experience: self.work_experience.len(),
            education_level: self
                .education
                .first()
                .map(|e| e.degree.as_str())
                .unwrap_or("unknown")
                .to_string(),
            skills: self.skills.chars().take(SKILLS_EXCERPT_CHARS).collect(),
        }
    }
}

impl Document for ResumeDocument {
    const KIND: &'static str = "resume";

    fn validate(&self) -> Result<(), String> {
        if self.personal.name.trim().is_empty() {
            return Err("personal.name is required".to_string());
        }
        if self.personal.email.trim().is_empty() {
            return Err("personal.email is required".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// Publishing Models
// =============================================================================

fn default_encrypt() -> bool {
    true
}

/// Request to publish (or republish) a resume.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PublishResumeRequest {
    pub document: ResumeDocument,
    /// Seal the resume before upload. Defaults to `true`.
    #[serde(default = "default_encrypt")]
    pub encrypt: bool,
    /// Extra upload tags (observability only).
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// Receipt for a published resume.
///
/// The caller must store `blob_id` and `encryption_key` together; the key is
/// not kept anywhere else.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PublishResumeResponse {
    pub blob_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption_key: Option<String>,
    pub url: String,
    /// `signed_write` or `anonymous_publish`.
    pub strategy: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_blob_id: Option<String>,
    pub summary: ResumeSummary,
}

// =============================================================================
// Retrieval Models
// =============================================================================

/// Request to fetch and open a resume.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct OpenResumeRequest {
    /// Key returned at publish time; omit for unencrypted resumes.
    #[serde(default)]
    pub encryption_key: Option<String>,
    #[serde(default)]
    pub source: DownloadSource,
}

/// Result of a blob probe.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct BlobInfoResponse {
    pub blob_id: String,
    pub exists: bool,
    pub size: Option<u64>,
    pub content_type: Option<String>,
    pub url: String,
}
