use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Error, Debug)]
#[error("Invalid message: {0}")]
pub struct DecodeError(#[from] serde_json::Error);

/// A request from the extension. Keys are matched case-insensitively, so
/// `imageUrl`, `ImageUrl` and `imageurl` all land in `image_url`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct Request {
    pub action: Option<String>,
    #[serde(rename = "imageurl")]
    pub image_url: Option<String>,
    #[serde(rename = "resourceid")]
    pub resource_id: Option<String>,
    /// The extension sends the Gyazo id under this key. Kept apart from
    /// `resource_id` so a request may carry both.
    #[serde(rename = "gyazoid")]
    pub gyazo_id: Option<String>,
    #[serde(rename = "sourceurl")]
    pub source_url: Option<String>,
    pub timestamp: Option<String>,
    #[serde(rename = "savedirectory")]
    pub save_directory: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            file_path: None,
            message: Some(message.into()),
            error: None,
        }
    }

    pub fn saved(file_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            file_path: Some(file_path.into()),
            ..Self::ok(message)
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            file_path: None,
            message: None,
            error: Some(error.into()),
        }
    }
}

/// The closed set of actions the host understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Ping,
    SaveImage,
    GetConfig,
    SetConfig,
    SelectFolder,
    OpenFolder,
    /// Anything else, keeping the caller's spelling for the error message.
    Unknown(String),
}

impl Action {
    pub fn parse(action: Option<&str>) -> Self {
        let Some(raw) = action else {
            return Action::Unknown(String::new());
        };
        match raw.to_lowercase().as_str() {
            "ping" => Action::Ping,
            "saveimage" => Action::SaveImage,
            "getconfig" => Action::GetConfig,
            "setconfig" => Action::SetConfig,
            "selectfolder" => Action::SelectFolder,
            "openfolder" => Action::OpenFolder,
            _ => Action::Unknown(raw.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Action::Ping => "ping",
            Action::SaveImage => "saveimage",
            Action::GetConfig => "getconfig",
            Action::SetConfig => "setconfig",
            Action::SelectFolder => "selectfolder",
            Action::OpenFolder => "openfolder",
            Action::Unknown(raw) => raw.as_str(),
        }
    }
}

impl Request {
    pub fn action(&self) -> Action {
        Action::parse(self.action.as_deref())
    }

    /// The image id, preferring `resourceId` over `gyazoId`. Empty strings
    /// count as absent.
    pub fn image_id(&self) -> Option<&str> {
        [&self.resource_id, &self.gyazo_id]
            .into_iter()
            .filter_map(|id| id.as_deref())
            .find(|id| !id.is_empty())
    }
}

pub fn decode_request(payload: &[u8]) -> Result<Request, DecodeError> {
    let value = match serde_json::from_slice::<Value>(payload)? {
        Value::Object(fields) => Value::Object(lowercase_keys(fields)),
        other => other,
    };
    Ok(Request::deserialize(value)?)
}

pub fn encode_response(response: &Response) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(response)
}

fn lowercase_keys(fields: Map<String, Value>) -> Map<String, Value> {
    fields
        .into_iter()
        .map(|(key, value)| (key.to_lowercase(), value))
        .collect()
}
