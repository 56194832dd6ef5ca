use crate::{DisplayError, Result};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Streaming protocols an engine can be constructed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// Plain RTMP over TCP
    Rtmp,
    /// RTMP over TLS
    Rtmps,
}

impl Protocol {
    /// Maps a URL scheme onto a protocol. Matching is exact and
    /// case-insensitive; no prefix matching.
    pub fn from_scheme(scheme: &str) -> Option<Self> {
        match scheme.to_ascii_lowercase().as_str() {
            "rtmp" => Some(Protocol::Rtmp),
            "rtmps" => Some(Protocol::Rtmps),
            _ => None,
        }
    }

    /// URL scheme of the protocol.
    pub fn scheme(&self) -> &'static str {
        match self {
            Protocol::Rtmp => "rtmp",
            Protocol::Rtmps => "rtmps",
        }
    }

    /// Port used when the endpoint names none.
    pub fn default_port(&self) -> u16 {
        match self {
            Protocol::Rtmp => 1935,
            Protocol::Rtmps => 443,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

/// A validated stream destination such as `rtmp://host:1935/app/stream`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    url: Url,
    protocol: Protocol,
}

impl Endpoint {
    /// Parses and validates a destination URL.
    ///
    /// # Errors
    ///
    /// * `EmptyEndpoint` for an empty or blank string
    /// * `InvalidEndpoint` when the string is not a URL or has no host
    /// * `UnsupportedScheme` when the scheme is not one of [`Protocol`]
    pub fn parse(endpoint: &str) -> Result<Self> {
        let endpoint = endpoint.trim();
        if endpoint.is_empty() {
            return Err(DisplayError::EmptyEndpoint);
        }

        let url = Url::parse(endpoint)
            .map_err(|e| DisplayError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;

        let protocol = Protocol::from_scheme(url.scheme())
            .ok_or_else(|| DisplayError::UnsupportedScheme(url.scheme().to_string()))?;

        match url.host_str() {
            Some(host) if !host.is_empty() => {}
            _ => {
                return Err(DisplayError::InvalidEndpoint(format!(
                    "{}: missing host",
                    endpoint
                )))
            }
        }

        Ok(Self { url, protocol })
    }

    /// Protocol selected by the scheme.
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Server host name or address.
    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    /// Explicit port, or the protocol default.
    pub fn port(&self) -> u16 {
        self.url
            .port()
            .unwrap_or_else(|| self.protocol.default_port())
    }

    /// RTMP application name, the first path segment.
    pub fn app(&self) -> Option<&str> {
        let path = self.url.path().trim_start_matches('/');
        let app = path.split('/').next().unwrap_or_default();
        (!app.is_empty()).then_some(app)
    }

    /// Stream name or key, everything after the application segment.
    pub fn stream_name(&self) -> Option<&str> {
        self.url
            .path()
            .trim_start_matches('/')
            .split_once('/')
            .map(|(_, name)| name)
            .filter(|name| !name.is_empty())
    }

    /// The normalized URL handed to the engine.
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}

impl FromStr for Endpoint {
    type Err = DisplayError;

    fn from_str(s: &str) -> Result<Self> {
        Endpoint::parse(s)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_rtmp_endpoint_parse() {
        let endpoint = Endpoint::parse("rtmp://example.com:1935/myapp/mystream").unwrap();
        assert_eq!(endpoint.protocol(), Protocol::Rtmp);
        assert_eq!(endpoint.host(), "example.com");
        assert_eq!(endpoint.port(), 1935);
        assert_eq!(endpoint.app(), Some("myapp"));
        assert_eq!(endpoint.stream_name(), Some("mystream"));
        assert_eq!(endpoint.as_str(), "rtmp://example.com:1935/myapp/mystream");
    }

    #[test]
    fn test_default_ports() {
        let rtmp: Endpoint = "rtmp://host/app/stream".parse().unwrap();
        assert_eq!(rtmp.port(), 1935);

        let rtmps: Endpoint = "rtmps://live.example.com/app/key".parse().unwrap();
        assert_eq!(rtmps.protocol(), Protocol::Rtmps);
        assert_eq!(rtmps.port(), 443);
    }

    #[test]
    fn test_nested_stream_name() {
        let endpoint = Endpoint::parse("rtmp://host/live/room/42").unwrap();
        assert_eq!(endpoint.app(), Some("live"));
        assert_eq!(endpoint.stream_name(), Some("room/42"));

        let bare = Endpoint::parse("rtmp://host").unwrap();
        assert_eq!(bare.app(), None);
        assert_eq!(bare.stream_name(), None);
    }

    #[test]
    fn test_rejected_endpoints() {
        assert!(matches!(Endpoint::parse(""), Err(DisplayError::EmptyEndpoint)));
        assert!(matches!(Endpoint::parse("   "), Err(DisplayError::EmptyEndpoint)));
        assert!(matches!(
            Endpoint::parse("not a url"),
            Err(DisplayError::InvalidEndpoint(_))
        ));
        assert!(matches!(
            Endpoint::parse("rtsp://host/stream"),
            Err(DisplayError::UnsupportedScheme(s)) if s == "rtsp"
        ));
        // prefix match would accept this one
        assert!(matches!(
            Endpoint::parse("rtmpt://host/app/stream"),
            Err(DisplayError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            Endpoint::parse("rtmp:app/stream"),
            Err(DisplayError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn test_scheme_case() {
        assert_eq!(Protocol::from_scheme("RTMP"), Some(Protocol::Rtmp));
        assert_eq!(Protocol::from_scheme("http"), None);
    }
}
