/// Well-known SMTP endpoints, so `/setup` only needs an address and password.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerPreset {
    pub host: &'static str,
    pub port: u16,
    pub use_ssl: bool,
}

const PRESETS: &[(&[&str], ServerPreset)] = &[
    (
        &["gmail.com", "googlemail.com"],
        ServerPreset { host: "smtp.gmail.com", port: 465, use_ssl: true },
    ),
    (
        &["outlook.com", "hotmail.com", "live.com", "msn.com"],
        ServerPreset { host: "smtp-mail.outlook.com", port: 587, use_ssl: false },
    ),
    (
        &["yahoo.com", "ymail.com"],
        ServerPreset { host: "smtp.mail.yahoo.com", port: 465, use_ssl: true },
    ),
    (
        &["icloud.com", "me.com", "mac.com"],
        ServerPreset { host: "smtp.mail.me.com", port: 587, use_ssl: false },
    ),
];

/// Look up the preset for an address's domain (case-insensitive).
pub fn preset_for(email: &str) -> Option<ServerPreset> {
    let domain = email.rsplit_once('@')?.1.trim().to_ascii_lowercase();
    PRESETS
        .iter()
        .find(|(domains, _)| domains.contains(&domain.as_str()))
        .map(|(_, preset)| *preset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_domains() {
        assert_eq!(preset_for("Someone@GMail.com").unwrap().host, "smtp.gmail.com");
        assert_eq!(preset_for("x@hotmail.com").unwrap().port, 587);
    }

    #[test]
    fn unknown_domain() {
        assert_eq!(preset_for("x@example.org"), None);
        assert_eq!(preset_for("no-at-sign"), None);
    }
}
