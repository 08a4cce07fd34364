// crates/apiforge-core/src/core/scaffold.rs
// ============================================================================
// Module: apiforge Definition Scaffolding
// Description: Seed API definitions from issue-tracker metadata.
// Purpose: Give authors a valid starting definition for a tracked issue.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Issue metadata (key, title, description, type, priority) exported from an
//! issue tracker is turned into a minimal [`ApiDefinition`] that passes
//! schema validation. Authors then edit the route, payloads, and assertions
//! by hand. The scaffold never talks to a tracker; it reads a local export.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

use crate::core::case::pascal_case;
use crate::core::schema::ApiDefinition;
use crate::core::schema::ExpectedResponse;
use crate::core::schema::HttpMethod;
use crate::core::schema::SchemaError;
use crate::core::schema::TestCase;

// ============================================================================
// SECTION: Issue Metadata
// ============================================================================

/// Issue metadata exported from a tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueMetadata {
    /// Issue key such as `API-123`.
    pub key: String,
    /// Issue title.
    pub title: String,
    /// Issue description.
    #[serde(default)]
    pub description: String,
    /// Issue type such as `Story` or `Bug`.
    #[serde(default, rename = "type", alias = "issueType")]
    pub issue_type: Option<String>,
    /// Issue priority.
    #[serde(default)]
    pub priority: Option<String>,
}

impl IssueMetadata {
    /// Reads issue metadata from a local JSON export.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Input`] when the file is unreadable or malformed.
    pub fn read(path: &Path) -> Result<Self, SchemaError> {
        let bytes = fs::read(path)
            .map_err(|err| SchemaError::Input(format!("{}: {err}", path.display())))?;
        serde_json::from_slice(&bytes)
            .map_err(|err| SchemaError::Input(format!("{}: {err}", path.display())))
    }
}

// ============================================================================
// SECTION: Scaffold
// ============================================================================

/// Builds a starter definition for an issue.
///
/// The page name derives from the title, the folder from the issue key, and
/// tags from the key, type, and priority. The single case expects `200`.
#[must_use]
pub fn scaffold_definition(issue: &IssueMetadata) -> ApiDefinition {
    let page_name = pascal_case(&issue.title);
    let mut method_name = page_name.clone();
    if let Some(first) = method_name.get(.. 1) {
        let lowered = first.to_ascii_lowercase();
        method_name.replace_range(.. 1, &lowered);
    }
    let route: Vec<String> = issue
        .title
        .split(|ch: char| !ch.is_ascii_alphanumeric())
        .filter(|segment| !segment.is_empty())
        .map(str::to_ascii_lowercase)
        .collect();
    let mut tags = vec![issue.key.clone()];
    tags.extend(issue.issue_type.iter().map(|value| value.to_ascii_lowercase()));
    tags.extend(issue.priority.iter().map(|value| value.to_ascii_lowercase()));

    let description = if issue.description.trim().is_empty() {
        format!("[{}] {}", issue.key, issue.title)
    } else {
        format!("[{}] {} - {}", issue.key, issue.title, issue.description.trim())
    };

    ApiDefinition {
        page_name,
        folder: Some(issue.key.clone()),
        base_route: format!("/{}", route.join("-")),
        cases: vec![TestCase {
            method_name,
            description,
            method: HttpMethod::Get,
            data: None,
            params: None,
            expect_status: Some(200),
            tags,
            required_fields: Vec::new(),
            required_params: Vec::new(),
            validations: Vec::new(),
            expected_response: ExpectedResponse::Unchecked,
            database_validation: None,
        }],
    }
}
