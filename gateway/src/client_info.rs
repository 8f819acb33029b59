//! Visitor fingerprinting from request metadata.

use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};

const UNKNOWN: &str = "unknown";

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ClientInfo {
    pub user_agent: String,
    pub os: String,
    pub browser: String,
    pub device: String,
}

impl ClientInfo {
    pub fn from_user_agent(user_agent: &str) -> Self {
        let ua = user_agent.trim();
        ClientInfo {
            user_agent: ua.to_string(),
            os: detect_os(ua).to_string(),
            browser: detect_browser(ua).to_string(),
            device: detect_device(ua).to_string(),
        }
    }
}

/// The visitor's address: the first valid `X-Forwarded-For` entry, then
/// `X-Real-IP`, then the socket peer.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').find_map(parse_ip));

    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|value| value.to_str().ok())
            .and_then(parse_ip)
    };

    forwarded
        .or_else(real_ip)
        .or_else(|| peer.map(|addr| addr.ip().to_canonical()))
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

fn parse_ip(candidate: &str) -> Option<IpAddr> {
    candidate.trim().parse().ok()
}

// Order matters: more specific tokens are checked before the generic ones
// they contain (e.g. Android UAs also say "Linux").
fn detect_os(ua: &str) -> &'static str {
    const OS_TOKENS: &[(&str, &str)] = &[
        ("Windows Phone", "Windows Phone"),
        ("Windows", "Windows"),
        ("iPhone", "iOS"),
        ("iPad", "iPadOS"),
        ("iPod", "iOS"),
        ("Android", "Android"),
        ("CrOS", "ChromeOS"),
        ("Mac OS X", "macOS"),
        ("Macintosh", "macOS"),
        ("Linux", "Linux"),
    ];
    first_match(ua, OS_TOKENS)
}

fn detect_browser(ua: &str) -> &'static str {
    const BROWSER_TOKENS: &[(&str, &str)] = &[
        ("Discordbot", "Discord"),
        ("Edg/", "Edge"),
        ("OPR/", "Opera"),
        ("SamsungBrowser/", "Samsung Internet"),
        ("Firefox/", "Firefox"),
        ("FxiOS/", "Firefox"),
        ("CriOS/", "Chrome"),
        ("Chrome/", "Chrome"),
        ("Safari/", "Safari"),
        ("curl/", "curl"),
    ];
    first_match(ua, BROWSER_TOKENS)
}

fn detect_device(ua: &str) -> &'static str {
    if ua.is_empty() {
        return UNKNOWN;
    }
    let lower = ua.to_ascii_lowercase();
    if ["bot", "crawler", "spider", "curl/"]
        .iter()
        .any(|token| lower.contains(token))
    {
        "bot"
    } else if lower.contains("ipad") || lower.contains("tablet") {
        "tablet"
    } else if lower.contains("android") && !lower.contains("mobile") {
        "tablet"
    } else if lower.contains("mobile") || lower.contains("iphone") {
        "mobile"
    } else {
        "desktop"
    }
}

fn first_match(ua: &str, tokens: &[(&str, &'static str)]) -> &'static str {
    tokens
        .iter()
        .find(|(token, _)| ua.contains(token))
        .map(|(_, name)| *name)
        .unwrap_or(UNKNOWN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const CHROME_WINDOWS: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";
    const SAFARI_IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_5 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Mobile/15E148 Safari/604.1";
    const FIREFOX_LINUX: &str =
        "Mozilla/5.0 (X11; Linux x86_64; rv:127.0) Gecko/20100101 Firefox/127.0";
    const EDGE_MAC: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36 Edg/126.0.0.0";
    const CHROME_ANDROID_TABLET: &str = "Mozilla/5.0 (Linux; Android 14; SM-X910) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";
    const CHROME_ANDROID_PHONE: &str = "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Mobile Safari/537.36";

    #[test]
    fn test_user_agents() {
        let cases = [
            (CHROME_WINDOWS, "Windows", "Chrome", "desktop"),
            (SAFARI_IPHONE, "iOS", "Safari", "mobile"),
            (FIREFOX_LINUX, "Linux", "Firefox", "desktop"),
            (EDGE_MAC, "macOS", "Edge", "desktop"),
            (CHROME_ANDROID_TABLET, "Android", "Chrome", "tablet"),
            (CHROME_ANDROID_PHONE, "Android", "Chrome", "mobile"),
            ("curl/8.5.0", "unknown", "curl", "bot"),
            ("", "unknown", "unknown", "unknown"),
        ];

        for (ua, os, browser, device) in cases {
            let info = ClientInfo::from_user_agent(ua);
            assert_eq!(info.os, os, "os for {ua}");
            assert_eq!(info.browser, browser, "browser for {ua}");
            assert_eq!(info.device, device, "device for {ua}");
            assert_eq!(info.user_agent, ua);
        }
    }

    #[test]
    fn test_client_ip_precedence() {
        let peer: SocketAddr = "10.0.0.2:5555".parse().unwrap();
        let mut headers = HeaderMap::new();
        assert_eq!(client_ip(&headers, Some(peer)), "10.0.0.2");
        assert_eq!(client_ip(&headers, None), "unknown");

        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.4"));
        assert_eq!(client_ip(&headers, Some(peer)), "198.51.100.4");

        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("garbage, 203.0.113.9, 10.0.0.1"),
        );
        assert_eq!(client_ip(&headers, Some(peer)), "203.0.113.9");

        // No valid entry falls through to the next source
        headers.insert("x-forwarded-for", HeaderValue::from_static("unknown"));
        assert_eq!(client_ip(&headers, Some(peer)), "198.51.100.4");
    }

    #[test]
    fn test_client_ip_mapped_peer() {
        let peer: SocketAddr = "[::ffff:203.0.113.1]:443".parse().unwrap();
        assert_eq!(client_ip(&HeaderMap::new(), Some(peer)), "203.0.113.1");

        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("2001:db8::1"));
        assert_eq!(client_ip(&headers, Some(peer)), "2001:db8::1");
    }
}
