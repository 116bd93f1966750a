//! Google Sheets v4 backend

use crate::config::ServiceAccountKey;
use crate::error::{MailerError, Result};
use crate::sheet::auth::ServiceAccountAuth;
use crate::sheet::schema::cell_ref;
use crate::sheet::SheetStore;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValueRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    major_dimension: Option<String>,
    #[serde(default)]
    values: Vec<Vec<String>>,
}

/// First worksheet of a Google spreadsheet
pub struct GoogleSheet {
    client: Client,
    auth: ServiceAccountAuth,
    spreadsheet_id: String,
    sheet_title: String,
}

impl GoogleSheet {
    /// Authenticate and resolve the first worksheet of the spreadsheet
    ///
    /// Any failure here is a startup error: bad credentials, an unknown
    /// spreadsheet id, or a spreadsheet without worksheets.
    pub async fn open(spreadsheet_id: &str, key: &ServiceAccountKey) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        let auth = ServiceAccountAuth::new(client.clone(), key)?;

        let mut url = spreadsheet_url(spreadsheet_id)?;
        url.query_pairs_mut()
            .append_pair("fields", "sheets.properties.title");

        let token = auth.access_token().await?;
        let response = client.get(url).bearer_auth(token).send().await?;
        let meta: SpreadsheetMeta = check(response).await?.json().await?;

        let sheet_title = meta
            .sheets
            .into_iter()
            .next()
            .map(|s| s.properties.title)
            .ok_or_else(|| {
                MailerError::Config(format!("Spreadsheet {} has no worksheets", spreadsheet_id))
            })?;

        info!("Connected to spreadsheet {} (sheet '{}')", spreadsheet_id, sheet_title);

        Ok(Self {
            client,
            auth,
            spreadsheet_id: spreadsheet_id.to_string(),
            sheet_title,
        })
    }

    pub fn sheet_title(&self) -> &str {
        &self.sheet_title
    }

    fn values_url(&self, range: &str) -> Result<Url> {
        let mut url = spreadsheet_url(&self.spreadsheet_id)?;
        url.path_segments_mut()
            .map_err(|_| MailerError::Config("Sheets API base URL cannot hold a path".to_string()))?
            .push("values")
            .push(range);
        Ok(url)
    }
}

#[async_trait]
impl SheetStore for GoogleSheet {
    async fn read_all_rows(&self) -> Result<Vec<Vec<String>>> {
        let mut url = self.values_url(&quote_sheet_title(&self.sheet_title))?;
        url.query_pairs_mut()
            .append_pair("majorDimension", "ROWS")
            .append_pair("valueRenderOption", "FORMATTED_VALUE");

        let token = self.auth.access_token().await?;
        let response = self.client.get(url).bearer_auth(token).send().await?;
        let range: ValueRange = check(response).await?.json().await?;

        Ok(fill_gaps(range.values))
    }

    async fn write_cell(&self, row: usize, col: usize, value: &str) -> Result<()> {
        let range = format!("{}!{}", quote_sheet_title(&self.sheet_title), cell_ref(row, col));
        let mut url = self.values_url(&range)?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");

        let body = ValueRange {
            range: Some(range.clone()),
            major_dimension: Some("ROWS".to_string()),
            values: vec![vec![value.to_string()]],
        };

        let token = self.auth.access_token().await?;
        let response = self
            .client
            .put(url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        check(response).await?;

        debug!("Wrote '{}' to {}", value, range);
        Ok(())
    }
}

fn spreadsheet_url(spreadsheet_id: &str) -> Result<Url> {
    let mut url = Url::parse(SHEETS_API_BASE)?;
    url.path_segments_mut()
        .map_err(|_| MailerError::Config("Sheets API base URL cannot hold a path".to_string()))?
        .push(spreadsheet_id);
    Ok(url)
}

async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(MailerError::SheetApi {
        status: status.as_u16(),
        body,
    })
}

/// Quote a worksheet title for use in A1 notation
fn quote_sheet_title(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

/// Pad every row to the width of the widest one
///
/// The values endpoint drops trailing empty cells, so a guest whose status
/// cell is still blank would otherwise look like a short row.
fn fill_gaps(mut rows: Vec<Vec<String>>) -> Vec<Vec<String>> {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    for row in &mut rows {
        row.resize(width, String::new());
    }
    rows
}
