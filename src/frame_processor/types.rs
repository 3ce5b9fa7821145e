// SPDX-License-Identifier: MPL-2.0

//! Detection results and payload classification
//!
//! A session hands the caller a [`DetectionResult`]. Its [`QrAction`]
//! tells the result screen which button to show; it plays no part in the
//! session's own state machine.

/// Where a decoded payload came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provenance {
    /// Latched from the live camera stream
    Live,
    /// Decoded from a still (gallery) image
    Still,
}

/// A decoded payload delivered to the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionResult {
    /// Raw text decoded from the code
    pub payload: String,
    pub provenance: Provenance,
}

impl DetectionResult {
    pub fn live(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            provenance: Provenance::Live,
        }
    }

    pub fn still(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            provenance: Provenance::Still,
        }
    }

    /// Classify the payload for UI routing
    pub fn action(&self) -> QrAction {
        QrAction::parse(&self.payload)
    }

    /// The result screen's "open in browser" check
    pub fn is_url(&self) -> bool {
        self.payload.starts_with("http")
    }
}

/// WiFi security type from a `WIFI:` payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiSecurity {
    Open,
    Wep,
    Wpa,
    Wpa3,
}

impl WifiSecurity {
    fn from_field(value: &str) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "" | "NOPASS" => Self::Open,
            "WEP" => Self::Wep,
            "WPA3" | "SAE" => Self::Wpa3,
            _ => Self::Wpa,
        }
    }
}

/// What the user can do with a decoded payload
#[derive(Debug, Clone, PartialEq)]
pub enum QrAction {
    Url(String),
    Wifi {
        ssid: String,
        password: Option<String>,
        security: WifiSecurity,
        hidden: bool,
    },
    Phone(String),
    Email {
        address: String,
        subject: Option<String>,
        body: Option<String>,
    },
    Sms {
        number: String,
        message: Option<String>,
    },
    Location {
        latitude: f64,
        longitude: f64,
        label: Option<String>,
    },
    Contact(String),
    Text(String),
}

impl QrAction {
    /// Classify a payload; anything unrecognized is `Text`
    pub fn parse(payload: &str) -> Self {
        let text = payload.trim();

        if text.starts_with("http://") || text.starts_with("https://") {
            return Self::Url(text.to_string());
        }
        if let Some(rest) = strip_prefix_ignore_case(text, "WIFI:") {
            return Self::wifi(rest);
        }
        if let Some(number) = strip_prefix_ignore_case(text, "tel:") {
            return Self::Phone(number.to_string());
        }
        if let Some(rest) = strip_prefix_ignore_case(text, "mailto:") {
            let (address, query) = split_query(rest);
            return Self::Email {
                address: address.to_string(),
                subject: query_value(query, "subject"),
                body: query_value(query, "body"),
            };
        }
        if let Some(rest) = strip_prefix_ignore_case(text, "smsto:")
            .or_else(|| strip_prefix_ignore_case(text, "sms:"))
        {
            // smsto:NUMBER:MESSAGE or sms:NUMBER?body=MESSAGE
            if let Some((number, message)) = rest.split_once(':') {
                return Self::Sms {
                    number: number.to_string(),
                    message: Some(message.to_string()).filter(|m| !m.is_empty()),
                };
            }
            let (number, query) = split_query(rest);
            return Self::Sms {
                number: number.to_string(),
                message: query_value(query, "body"),
            };
        }
        if let Some(rest) = strip_prefix_ignore_case(text, "geo:") {
            if let Some(location) = Self::geo(rest) {
                return location;
            }
        }
        if text.starts_with("BEGIN:VCARD") || text.starts_with("MECARD:") {
            return Self::Contact(text.to_string());
        }

        Self::Text(text.to_string())
    }

    /// Label for the primary button on the result screen
    pub fn action_label(&self) -> &'static str {
        match self {
            Self::Url(_) => "Open Link",
            Self::Wifi { .. } => "Connect to WiFi",
            Self::Phone(_) => "Call",
            Self::Email { .. } => "Send Email",
            Self::Sms { .. } => "Send SMS",
            Self::Location { .. } => "Open Map",
            Self::Contact(_) => "Add Contact",
            Self::Text(_) => "Copy Text",
        }
    }

    // Fields are `K:V;` pairs; `\` escapes the next character
    fn wifi(fields: &str) -> Self {
        let mut ssid = String::new();
        let mut password = None;
        let mut security = WifiSecurity::Open;
        let mut hidden = false;

        for field in split_unescaped(fields, ';') {
            let Some((key, value)) = field.split_once(':') else {
                continue;
            };
            let value = unescape(value);
            match key {
                "S" => ssid = value,
                "P" => password = Some(value).filter(|p| !p.is_empty()),
                "T" => security = WifiSecurity::from_field(&value),
                "H" => hidden = value.eq_ignore_ascii_case("true"),
                _ => {}
            }
        }

        Self::Wifi {
            ssid,
            password,
            security,
            hidden,
        }
    }

    fn geo(rest: &str) -> Option<Self> {
        let (coords, query) = split_query(rest);
        let mut parts = coords.split(',');
        let latitude = parts.next()?.trim().parse::<f64>().ok()?;
        let longitude = parts.next()?.trim().parse::<f64>().ok()?;
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return None;
        }
        Some(Self::Location {
            latitude,
            longitude,
            label: query_value(query, "q").or_else(|| query_value(query, "label")),
        })
    }
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &text[prefix.len()..])
}

fn split_query(text: &str) -> (&str, &str) {
    text.split_once('?').unwrap_or((text, ""))
}

fn query_value(query: &str, name: &str) -> Option<String> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| percent_decode(value))
}

fn split_unescaped(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    for (index, c) in text.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == separator {
            parts.push(&text[start..index]);
            start = index + c.len_utf8();
        }
    }
    if start < text.len() {
        parts.push(&text[start..]);
    }
    parts
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Decode `%XX` escapes and `+` in a query value; invalid escapes pass through
pub(crate) fn percent_decode(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
                match hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                    Some(byte) => {
                        out.push(byte);
                        i += 3;
                        continue;
                    }
                    None => out.push(b'%'),
                }
            }
            other => out.push(other),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
