//! Google Drive, Docs, and Sheets over REST.
//!
//! Auth is a stored OAuth refresh token exchanged for an access token at
//! construction. One invocation is short enough that the token is never
//! refreshed mid-run.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

use runclub_core::calendar::DocumentSummary;

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const DRIVE_FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const DOCS_URL: &str = "https://docs.googleapis.com/v1/documents";
const SHEETS_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Range covering the form-response columns the engine reads.
const SHEET_RANGE: &str = "A1:Z1000";

pub struct GoogleClient {
    http: reqwest::Client,
    access_token: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl GoogleClient {
    /// Exchange the refresh token for an access token.
    pub async fn connect(
        client_id: &str,
        client_secret: &str,
        refresh_token: &str,
    ) -> Result<GoogleClient> {
        let http = reqwest::Client::new();

        let response = http
            .post(TOKEN_URL)
            .form(&[
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .context("Failed to reach Google token endpoint")?
            .error_for_status()
            .context("Google refresh token was rejected")?;

        let token: TokenResponse = response
            .json()
            .await
            .context("Failed to parse Google token response")?;

        Ok(GoogleClient {
            http,
            access_token: token.access_token,
        })
    }

    /// List Google Docs visible to the account, newest-modified first.
    pub async fn list_documents(&self) -> Result<Vec<DocumentSummary>> {
        let response: Value = self
            .http
            .get(DRIVE_FILES_URL)
            .bearer_auth(&self.access_token)
            .query(&[
                ("q", "mimeType='application/vnd.google-apps.document' and trashed=false"),
                ("orderBy", "modifiedTime desc"),
                ("pageSize", "50"),
                ("fields", "files(id,name,modifiedTime)"),
            ])
            .send()
            .await
            .context("Failed to list Drive documents")?
            .error_for_status()
            .context("Drive file listing failed")?
            .json()
            .await
            .context("Failed to parse Drive file listing")?;

        let files = response
            .get("files")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let documents = files
            .iter()
            .filter_map(|file| {
                Some(DocumentSummary {
                    id: file.get("id")?.as_str()?.to_string(),
                    name: file.get("name")?.as_str()?.to_string(),
                    modified: file
                        .get("modifiedTime")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                })
            })
            .collect();
        Ok(documents)
    }

    /// Fetch a document's text with paragraph and table structure
    /// flattened: one line per paragraph, table cells joined with tabs.
    pub async fn fetch_document_text(&self, doc_id: &str) -> Result<String> {
        let document: Value = self
            .http
            .get(format!("{DOCS_URL}/{doc_id}"))
            .bearer_auth(&self.access_token)
            .send()
            .await
            .with_context(|| format!("Failed to fetch document {doc_id}"))?
            .error_for_status()
            .with_context(|| format!("Document fetch failed for {doc_id}"))?
            .json()
            .await
            .context("Failed to parse document body")?;

        let mut text = String::new();
        if let Some(content) = document
            .pointer("/body/content")
            .and_then(Value::as_array)
        {
            for element in content {
                flatten_structural_element(element, &mut text);
            }
        }
        Ok(text)
    }

    /// Fetch all rows of the first worksheet as strings. Short rows are
    /// returned short; the caller indexes defensively.
    pub async fn fetch_sheet_rows(&self, sheet_id: &str) -> Result<Vec<Vec<String>>> {
        let response: Value = self
            .http
            .get(format!("{SHEETS_URL}/{sheet_id}/values/{SHEET_RANGE}"))
            .bearer_auth(&self.access_token)
            .send()
            .await
            .with_context(|| format!("Failed to fetch sheet {sheet_id}"))?
            .error_for_status()
            .with_context(|| format!("Sheet fetch failed for {sheet_id}"))?
            .json()
            .await
            .context("Failed to parse sheet values")?;

        let rows = response
            .get("values")
            .and_then(Value::as_array)
            .map(|rows| {
                rows.iter()
                    .map(|row| {
                        row.as_array()
                            .map(|cells| {
                                cells
                                    .iter()
                                    .map(|cell| cell.as_str().unwrap_or_default().to_string())
                                    .collect()
                            })
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(rows)
    }
}

fn flatten_structural_element(element: &Value, out: &mut String) {
    if let Some(paragraph_elements) = element
        .pointer("/paragraph/elements")
        .and_then(Value::as_array)
    {
        for pe in paragraph_elements {
            if let Some(run_text) = pe.pointer("/textRun/content").and_then(Value::as_str) {
                out.push_str(run_text);
            }
        }
        // Docs paragraphs end with their own newline in textRun content.
        return;
    }

    if let Some(rows) = element.pointer("/table/tableRows").and_then(Value::as_array) {
        for row in rows {
            let mut cells_text: Vec<String> = Vec::new();
            if let Some(cells) = row.get("tableCells").and_then(Value::as_array) {
                for cell in cells {
                    let mut cell_text = String::new();
                    if let Some(content) = cell.get("content").and_then(Value::as_array) {
                        for nested in content {
                            flatten_structural_element(nested, &mut cell_text);
                        }
                    }
                    cells_text.push(cell_text.replace('\n', " ").trim().to_string());
                }
            }
            out.push_str(&cells_text.join("\t"));
            out.push('\n');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_paragraphs_and_tables() {
        let element = json!({
            "table": {
                "tableRows": [
                    {"tableCells": [
                        {"content": [{"paragraph": {"elements": [{"textRun": {"content": "Mon\n"}}]}}]},
                        {"content": [{"paragraph": {"elements": [{"textRun": {"content": "Office Loop 7 PM\nBL: Gareth\n"}}]}}]}
                    ]}
                ]
            }
        });
        let mut out = String::new();
        flatten_structural_element(&element, &mut out);
        assert_eq!(out, "Mon\tOffice Loop 7 PM BL: Gareth\n");

        let paragraph = json!({
            "paragraph": {"elements": [
                {"textRun": {"content": "Hello "}},
                {"textRun": {"content": "world\n"}}
            ]}
        });
        let mut out = String::new();
        flatten_structural_element(&paragraph, &mut out);
        assert_eq!(out, "Hello world\n");
    }
}
