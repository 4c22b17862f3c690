//! Navigation contract between the join page and the room view.
//!
//! The join page fetches a credential and navigates to
//! `/room?token=<credential>&roomName=<room>`. The room view refuses to
//! render unless both parameters are present.

use reqwest::Url;
use serde::Deserialize;

use crate::error::ApiError;

pub const ROOM_PATH: &str = "/room";

const ROOM_TEMPLATE: &str = include_str!("../static/room.html");

/// Raw query of the room view.
#[derive(Debug, Default, Deserialize)]
pub struct RoomQuery {
    pub token: Option<String>,
    #[serde(rename = "roomName")]
    pub room_name: Option<String>,
}

/// Validated room view parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomParams {
    pub token: String,
    pub room_name: String,
}

impl RoomQuery {
    pub fn into_params(self) -> Result<RoomParams, ApiError> {
        let token = non_empty(self.token);
        let room_name = non_empty(self.room_name);
        match (token, room_name) {
            (Some(token), Some(room_name)) => Ok(RoomParams { token, room_name }),
            _ => Err(ApiError::missing_room_params()),
        }
    }
}

/// Build the room view URL on the same origin as `base`.
pub fn room_url(base: &Url, token: &str, room_name: &str) -> Url {
    let mut url = base.clone();
    url.set_path(ROOM_PATH);
    url.set_fragment(None);
    url.query_pairs_mut()
        .clear()
        .append_pair("token", token)
        .append_pair("roomName", room_name);
    url
}

/// Render the room view for `params`, pointing the client SDK at `server_url`.
///
/// Placeholders are substituted in one pass over the template, so values
/// that themselves contain `{{...}}` are inserted verbatim.
pub fn render_room_page(params: &RoomParams, server_url: &str) -> String {
    let mut out = String::with_capacity(ROOM_TEMPLATE.len() + params.token.len() * 2);
    let mut rest = ROOM_TEMPLATE;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 2..];
        let Some(end) = tail.find("}}") else {
            rest = &rest[start..];
            break;
        };
        match &tail[..end] {
            "room_name" => out.push_str(&escape_html(&params.room_name)),
            "token" => out.push_str(&escape_html(&params.token)),
            "server_url" => out.push_str(&escape_html(server_url)),
            _ => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &tail[end + 2..];
    }

    out.push_str(rest);
    out
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
