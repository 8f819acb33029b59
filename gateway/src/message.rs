use crate::recorder::AccessRecord;
use geo::UNKNOWN;
use geo::types::or_unknown;
use relay::LogMessage;

pub const TITLE: &str = "New verification";

/// Renders a verification as the chat log message.
pub fn log_message(record: &AccessRecord) -> LogMessage {
    let geo = &record.geo;
    let name = record.global_name.as_deref().unwrap_or(&record.username);

    let lines = [
        format!("**User:** {name} (@{})", record.username),
        format!("**ID:** {}", record.visitor_id),
        format!("**Email:** {}", or_unknown(&record.email)),
        format!("**Locale:** {}", or_unknown(&record.locale)),
        format!("**IP:** {}", geo.ip),
        format!(
            "**Location:** {} / {} / {}",
            or_unknown(&geo.country),
            or_unknown(&geo.region),
            or_unknown(&geo.city)
        ),
        format!("**ISP:** {} ({})", or_unknown(&geo.isp), or_unknown(&geo.asn)),
        format!("**Proxy / Hosting:** {} / {}", yes_no(geo.is_proxy), yes_no(geo.is_hosting)),
        format!("**Map:** {}", geo.map_link.as_deref().unwrap_or(UNKNOWN)),
        format!(
            "**Client:** {} / {} / {}",
            record.client.os, record.client.browser, record.client.device
        ),
        format!("**Time:** {}", record.timestamp),
    ];

    let message = LogMessage::new(TITLE, lines.join("\n"));
    match record.avatar_url.as_deref() {
        Some(url) => message.with_thumbnail(url),
        None => message,
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::tests::record;

    #[test]
    fn test_log_message() {
        let mut record = record("42", "Shibuya");
        record.geo.latitude = Some(35.6);
        record.geo.longitude = Some(139.7);
        record.geo.map_link = Some("https://www.google.com/maps?q=35.6,139.7".into());
        record.geo.is_proxy = true;
        record.avatar_url = Some("https://cdn.discordapp.com/avatars/42/abc.png".into());

        let message = log_message(&record);
        assert_eq!(message.title, "New verification");
        assert_eq!(
            message.thumbnail_url.as_deref(),
            Some("https://cdn.discordapp.com/avatars/42/abc.png")
        );

        let lines: Vec<&str> = message.description.lines().collect();
        assert_eq!(lines[0], "**User:** Nelly (@nelly)");
        assert_eq!(lines[1], "**ID:** 42");
        assert_eq!(lines[4], "**IP:** 203.0.113.5");
        assert_eq!(lines[5], "**Location:** unknown / unknown / Shibuya");
        assert_eq!(lines[7], "**Proxy / Hosting:** yes / no");
        assert!(lines[8].contains("35.6,139.7"));
        assert_eq!(lines[9], "**Client:** unknown / curl / bot");
        assert_eq!(lines[10], "**Time:** 2026-10-18T09:00:00Z");
    }

    #[test]
    fn test_log_message_without_avatar() {
        let mut record = record("42", "Shibuya");
        record.global_name = None;
        record.email = None;

        let message = log_message(&record);
        assert_eq!(message.thumbnail_url, None);
        assert!(message.description.starts_with("**User:** nelly (@nelly)"));
        assert!(message.description.contains("**Email:** unknown"));
        assert!(message.description.contains("**Map:** unknown"));
    }
}
